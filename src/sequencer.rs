//! Reassignment Sequencer
//!
//! Moves a selection of items to one target location, one item at a time, in
//! selection order. Each step sees the result of every step before it. A step
//! that needs a decision parks the sequencer in `AwaitingStepDecision` until
//! [`ReassignSequencer::resolve`] is called; there is no timeout.
//!
//! ```text
//! Idle --start--> Draining --collision--> AwaitingStepDecision
//!                   |  ^                        |
//!                   |  +-------resolve----------+
//!                   +--queue empty--> Done
//! ```

use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

use crate::error::{InventoryError, ValidationError};
use crate::inventory::{Inventory, Outcome};
use crate::platform::Prompt;
use crate::resolution::{Action, DuplicateContext, Resolution, ResolutionOption, pick};
use crate::store::Store;
use crate::types::{Item, ItemId};

/// Bulk move requested by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    /// Selection order is processing order
    pub item_ids: Vec<ItemId>,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Draining,
    AwaitingStepDecision,
    Done,
}

/// The step the sequencer is parked on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStep {
    pub moving: Item,
    pub context: DuplicateContext,
    pub options: Vec<ResolutionOption>,
}

impl PendingStep {
    pub fn labels(&self) -> Vec<String> {
        self.options.iter().map(|o| o.label.clone()).collect()
    }
}

/// Merge of a moving item into an existing one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRecord {
    pub moved: ItemId,
    pub into: ItemId,
}

/// What happened to every selected item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReassignReport {
    pub relocated: Vec<ItemId>,
    pub merged: Vec<MergeRecord>,
    /// Cancelled by the user
    pub skipped: Vec<ItemId>,
    /// No longer in the inventory when its turn came
    pub missing: Vec<ItemId>,
    /// Storage write failed for this step
    pub failed: Vec<ItemId>,
}

impl ReassignReport {
    pub fn processed(&self) -> usize {
        self.relocated.len() + self.merged.len() + self.skipped.len() + self.missing.len() + self.failed.len()
    }
}

#[derive(Debug)]
pub enum SequencerStatus {
    /// Parked on a decision, see [`ReassignSequencer::pending`]
    Suspended,
    Finished(ReassignReport),
}

enum State {
    Idle,
    Draining,
    AwaitingStepDecision(PendingStep),
    Done,
}

pub struct ReassignSequencer {
    state: State,
    queue: VecDeque<ItemId>,
    target: String,
    report: ReassignReport,
}

impl Default for ReassignSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReassignSequencer {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            queue: VecDeque::new(),
            target: String::new(),
            report: ReassignReport::default(),
        }
    }

    pub fn state(&self) -> SequencerState {
        match self.state {
            State::Idle => SequencerState::Idle,
            State::Draining => SequencerState::Draining,
            State::AwaitingStepDecision(_) => SequencerState::AwaitingStepDecision,
            State::Done => SequencerState::Done,
        }
    }

    pub fn pending(&self) -> Option<&PendingStep> {
        match &self.state {
            State::AwaitingStepDecision(step) => Some(step),
            _ => None,
        }
    }

    /// Items not yet taken off the queue
    pub fn queued(&self) -> impl Iterator<Item = &ItemId> {
        self.queue.iter()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn report(&self) -> &ReassignReport {
        &self.report
    }

    /// `Idle -> Draining`. Duplicate ids in the selection keep their first position.
    pub fn start(&mut self, request: MoveRequest) -> Result<(), ValidationError> {
        if matches!(self.state, State::Draining | State::AwaitingStepDecision(_)) {
            return Err(ValidationError::MoveInProgress);
        }
        let target = request.target.trim();
        if target.is_empty() {
            return Err(ValidationError::EmptyLocationName);
        }
        if target == request.source {
            return Err(ValidationError::SameLocation);
        }
        if request.item_ids.is_empty() {
            return Err(ValidationError::EmptySelection);
        }

        let mut seen = HashSet::new();
        self.queue = request
            .item_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        self.target = target.to_string();
        self.report = ReassignReport::default();
        self.state = State::Draining;
        info!(items = self.queue.len(), from = %request.source, to = %self.target, "Move started");
        Ok(())
    }

    /// Process queued items until one needs a decision or the queue is empty.
    ///
    /// A storage failure records the current item as failed and returns the
    /// error; the sequencer stays in `Draining` so calling `drain` again
    /// continues with the next item.
    pub fn drain<S: Store>(&mut self, inventory: &mut Inventory<S>) -> Result<SequencerStatus, InventoryError> {
        loop {
            match self.state {
                State::Idle => return Ok(SequencerStatus::Finished(ReassignReport::default())),
                State::Done => return Ok(SequencerStatus::Finished(self.report.clone())),
                State::AwaitingStepDecision(_) => return Ok(SequencerStatus::Suspended),
                State::Draining => {}
            }

            let Some(id) = self.queue.pop_front() else {
                self.finish();
                return Ok(SequencerStatus::Finished(self.report.clone()));
            };

            match inventory.begin_reassign_step(&id, &self.target) {
                None => {
                    warn!(item = %id, "Selected item no longer exists, skipping");
                    self.report.missing.push(id);
                }
                Some(Resolution::Proceed(action)) => self.apply_step(inventory, id, action)?,
                Some(Resolution::NeedsChoice { context, options }) => {
                    let Some(moving) = inventory.item(&id).cloned() else {
                        self.report.missing.push(id);
                        continue;
                    };
                    debug!(item = %id, candidates = context.candidates().len(), "Move needs a decision");
                    self.state = State::AwaitingStepDecision(PendingStep {
                        moving,
                        context,
                        options,
                    });
                    return Ok(SequencerStatus::Suspended);
                }
                Some(Resolution::Rejected { reason }) => {
                    warn!(item = %id, %reason, "Move step rejected");
                    self.report.skipped.push(id);
                }
            }
        }
    }

    /// `AwaitingStepDecision -> Draining` with the user's pick, then keep
    /// draining. `None` (or an out-of-range pick) cancels this item only.
    pub fn resolve<S: Store>(
        &mut self,
        picked: Option<usize>,
        inventory: &mut Inventory<S>,
    ) -> Result<SequencerStatus, InventoryError> {
        let step = match std::mem::replace(&mut self.state, State::Draining) {
            State::AwaitingStepDecision(step) => step,
            other => {
                self.state = other;
                return self.drain(inventory);
            }
        };

        let action = pick(step.options, picked);
        self.apply_step(inventory, step.moving.id, action)?;
        self.drain(inventory)
    }

    /// Cancel the current step only
    pub fn cancel_step<S: Store>(&mut self, inventory: &mut Inventory<S>) -> Result<SequencerStatus, InventoryError> {
        self.resolve(None, inventory)
    }

    /// Drain to completion, asking `prompt` at every decision point
    pub fn run<S: Store, P: Prompt>(
        &mut self,
        inventory: &mut Inventory<S>,
        prompt: &mut P,
    ) -> Result<ReassignReport, InventoryError> {
        let mut status = self.drain(inventory)?;
        loop {
            match status {
                SequencerStatus::Finished(report) => return Ok(report),
                SequencerStatus::Suspended => {
                    let picked = match self.pending() {
                        Some(step) => {
                            let message = format!("Moving '{}': {}", step.moving.title, step.context.prompt_message());
                            prompt.choose(step.context.prompt_title(), &message, &step.labels())
                        }
                        None => None,
                    };
                    status = self.resolve(picked, inventory)?;
                }
            }
        }
    }

    fn apply_step<S: Store>(
        &mut self,
        inventory: &mut Inventory<S>,
        id: ItemId,
        action: Action,
    ) -> Result<(), InventoryError> {
        match inventory.apply(action) {
            Ok(Outcome::Relocated(_)) | Ok(Outcome::Created(_)) => self.report.relocated.push(id),
            Ok(Outcome::Aggregated { into, .. }) => self.report.merged.push(MergeRecord { moved: id, into: into.id }),
            Ok(Outcome::Skipped) => {
                info!(item = %id, "Move skipped by user");
                self.report.skipped.push(id);
            }
            Err(e) => {
                warn!(item = %id, error = %e, "Move step failed");
                self.report.failed.push(id);
                return Err(e);
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        info!(
            relocated = self.report.relocated.len(),
            merged = self.report.merged.len(),
            skipped = self.report.skipped.len(),
            missing = self.report.missing.len(),
            failed = self.report.failed.len(),
            "Move finished"
        );
        self.state = State::Done;
        self.target.clear();
    }
}
