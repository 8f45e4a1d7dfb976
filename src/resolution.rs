//! Duplicate Resolution Engine
//!
//! Pure decision functions. Given a draft (or a moving item) and the current
//! inventory, they return what should happen: proceed with an action, ask the
//! user to pick between labeled options, or reject the input. Presenting the
//! options is the caller's job; applying the chosen action is
//! [`Inventory::apply`](crate::inventory::Inventory::apply).

use crate::error::ValidationError;
use crate::types::{Item, ItemDraft, ItemId, title_key};

/// A data change the controller knows how to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Insert a new item built from the draft
    Create(ItemDraft),

    /// Add `quantity` to `into`; when `remove` is set, delete that item afterwards
    Aggregate {
        into: ItemId,
        quantity: u32,
        remove: Option<ItemId>,
    },

    /// Set an item's location
    Relocate { item: ItemId, location: String },

    /// No effect
    Skip,
}

/// One labeled choice presented to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOption {
    pub label: String,
    pub action: Action,
}

impl ResolutionOption {
    fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// Why a choice is needed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateContext {
    Create {
        candidates: Vec<Item>,
        pending_quantity: u32,
    },
    Reassign {
        candidates: Vec<Item>,
        moving_item_id: ItemId,
    },
}

impl DuplicateContext {
    pub fn candidates(&self) -> &[Item] {
        match self {
            DuplicateContext::Create { candidates, .. } => candidates,
            DuplicateContext::Reassign { candidates, .. } => candidates,
        }
    }

    pub fn prompt_title(&self) -> &'static str {
        match (self, self.candidates().len()) {
            (DuplicateContext::Create { .. }, 1) => "Duplicate item",
            (DuplicateContext::Create { .. }, _) => "Select item to aggregate",
            (DuplicateContext::Reassign { .. }, 1) => "Duplicate in destination",
            (DuplicateContext::Reassign { .. }, _) => "Select item to merge into",
        }
    }

    pub fn prompt_message(&self) -> String {
        let candidates = self.candidates();
        match self {
            DuplicateContext::Create { pending_quantity, .. } => match candidates {
                [only] => format!(
                    "'{}' already exists in {} (qty {}). Add {} to it, or create a new item anyway?",
                    only.title,
                    describe_location(&only.location),
                    only.quantity,
                    pending_quantity
                ),
                _ => format!(
                    "{} items share this title. Pick the one to add {} to.",
                    candidates.len(),
                    pending_quantity
                ),
            },
            DuplicateContext::Reassign { .. } => match candidates {
                [only] => format!(
                    "'{}' already exists in {} (qty {}). Merge into it, move anyway, or skip this item?",
                    only.title,
                    describe_location(&only.location),
                    only.quantity
                ),
                _ => format!(
                    "{} items with this title already exist there. Pick the one to merge into.",
                    candidates.len()
                ),
            },
        }
    }
}

fn describe_location(location: &str) -> &str {
    if location.is_empty() { "no location" } else { location }
}

fn candidate_label(item: &Item) -> String {
    format!(
        "{} at {} (qty {})",
        item.title,
        describe_location(&item.location),
        item.quantity
    )
}

/// Result of a resolution step
#[derive(Debug)]
pub enum Resolution {
    Proceed(Action),
    NeedsChoice {
        context: DuplicateContext,
        options: Vec<ResolutionOption>,
    },
    Rejected {
        reason: ValidationError,
    },
}

impl Resolution {
    /// Labels to show for a pending choice, empty otherwise
    pub fn labels(&self) -> Vec<String> {
        match self {
            Resolution::NeedsChoice { options, .. } => {
                options.iter().map(|o| o.label.clone()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Turn the user's pick into an action. A dismissed prompt or an
    /// out-of-range index is a cancel.
    pub fn choose(self, picked: Option<usize>) -> Result<Action, ValidationError> {
        match self {
            Resolution::Proceed(action) => Ok(action),
            Resolution::NeedsChoice { options, .. } => Ok(pick(options, picked)),
            Resolution::Rejected { reason } => Err(reason),
        }
    }
}

pub(crate) fn pick(options: Vec<ResolutionOption>, picked: Option<usize>) -> Action {
    picked
        .and_then(|i| options.into_iter().nth(i))
        .map(|option| option.action)
        .unwrap_or(Action::Skip)
}

/// Decide how to create `draft`. Collisions are matched on title alone,
/// across every location.
pub fn resolve_create(draft: &ItemDraft, existing: &[Item]) -> Resolution {
    if let Err(reason) = draft.validate() {
        return Resolution::Rejected { reason };
    }

    let key = title_key(&draft.title);
    let candidates: Vec<Item> = existing
        .iter()
        .filter(|item| item.title_key() == key)
        .cloned()
        .collect();

    let options = match candidates.as_slice() {
        [] => return Resolution::Proceed(Action::Create(draft.clone())),
        [only] => vec![
            ResolutionOption::new("Cancel", Action::Skip),
            ResolutionOption::new(
                "Aggregate",
                Action::Aggregate {
                    into: only.id.clone(),
                    quantity: draft.quantity,
                    remove: None,
                },
            ),
            ResolutionOption::new("Create anyway", Action::Create(draft.clone())),
        ],
        many => std::iter::once(ResolutionOption::new("Cancel", Action::Skip))
            .chain(many.iter().map(|candidate| {
                ResolutionOption::new(
                    candidate_label(candidate),
                    Action::Aggregate {
                        into: candidate.id.clone(),
                        quantity: draft.quantity,
                        remove: None,
                    },
                )
            }))
            .collect(),
    };

    Resolution::NeedsChoice {
        context: DuplicateContext::Create {
            candidates,
            pending_quantity: draft.quantity,
        },
        options,
    }
}

/// Decide how to move `moving` into `target`. Collisions are items other than
/// `moving` with the same title that already sit in `target`.
pub fn resolve_reassign_step(moving: &Item, target: &str, existing: &[Item]) -> Resolution {
    let key = moving.title_key();
    let candidates: Vec<Item> = existing
        .iter()
        .filter(|item| item.id != moving.id && item.location == target && item.title_key() == key)
        .cloned()
        .collect();

    let relocate = Action::Relocate {
        item: moving.id.clone(),
        location: target.to_string(),
    };
    let merge_into = |candidate: &Item| Action::Aggregate {
        into: candidate.id.clone(),
        quantity: moving.quantity,
        remove: Some(moving.id.clone()),
    };

    let options = match candidates.as_slice() {
        [] => return Resolution::Proceed(relocate),
        [only] => vec![
            ResolutionOption::new("Skip this item", Action::Skip),
            ResolutionOption::new("Merge", merge_into(only)),
            ResolutionOption::new("Move anyway", relocate),
        ],
        many => std::iter::once(ResolutionOption::new("Skip this item", Action::Skip))
            .chain(
                many.iter()
                    .map(|candidate| ResolutionOption::new(candidate_label(candidate), merge_into(candidate))),
            )
            .collect(),
    };

    Resolution::NeedsChoice {
        context: DuplicateContext::Reassign {
            candidates,
            moving_item_id: moving.id.clone(),
        },
        options,
    }
}
