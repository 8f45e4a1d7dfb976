//! Command-line front end
//!
//! Plays the UI role: turns subcommands into core calls, shows duplicate and
//! import choices through a [`Prompt`], and prints results to its output.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

use crate::config::Settings;
use crate::constants::limits::MAX_IMAGES;
use crate::error::{InventoryError, ValidationError};
use crate::images::{ImageEncoder, ImagePipeline, IngestOptions};
use crate::inventory::{Inventory, Outcome, RenameOutcome};
use crate::platform::{CopyToDestination, FileOps, NoShare, Prompt, ShareOutcome};
use crate::resolution::Resolution;
use crate::sequencer::{MoveRequest, ReassignSequencer};
use crate::store::Store;
use crate::transfer::{self, ImportStrategy, StagedImport};
use crate::types::{Item, ItemDraft, ItemId, QuantityAdjustment, ThemePreference, parse_quantity};

#[derive(Parser, Debug)]
#[command(name = "casa", version, about = "Household inventory manager")]
pub struct Cli {
    /// Settings file (default: <config dir>/casa-inventory/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List items
    List {
        /// Only items at this location
        #[arg(long)]
        location: Option<String>,
    },
    /// Find items by title, location or description
    Search { query: String },
    /// Show one item in full
    Show { id: String },
    /// Add an item, asking what to do if the title already exists
    Add(AddArgs),
    /// Edit an item's fields (no duplicate check)
    Edit(EditArgs),
    /// Add to or remove from an item's quantity
    Adjust(AdjustArgs),
    /// Delete an item and its stored images
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Manage locations
    Location {
        #[command(subcommand)]
        command: LocationCommands,
    },
    /// Move items to another location one at a time
    Move(MoveArgs),
    /// Write an export file with every image inlined
    Export {
        /// Copy the export here (file or directory)
        #[arg(long)]
        dest: Option<PathBuf>,
    },
    /// Import an export file
    Import {
        file: PathBuf,
        /// Reconciliation strategy; asked interactively when omitted
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },
    /// Show or set the theme preference
    Theme { value: Option<ThemeArg> },
    /// Delete all items, locations and stored images
    Wipe {
        #[arg(long)]
        yes: bool,
    },
    /// Show where an item's images are stored and their sizes
    #[command(name = "image-info")]
    ImageInfo { id: String },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub title: String,
    #[arg(short, long, default_value = "1")]
    pub quantity: String,
    #[arg(short, long)]
    pub location: String,
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// Photo to attach (repeatable, at most 5)
    #[arg(long = "image")]
    pub images: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub quantity: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Photo to attach (repeatable)
    #[arg(long = "add-image")]
    pub add_images: Vec<PathBuf>,
    /// Stored image to detach and delete (repeatable)
    #[arg(long = "remove-image")]
    pub remove_images: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AdjustArgs {
    pub id: String,
    #[arg(long, conflicts_with = "remove", required_unless_present = "remove")]
    pub add: Option<String>,
    #[arg(long)]
    pub remove: Option<String>,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Location the items are moved out of
    #[arg(long)]
    pub from: String,
    /// Destination location
    #[arg(long)]
    pub to: String,
    /// Items to move, in order (default: everything at --from)
    pub ids: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum LocationCommands {
    /// List locations with item counts
    List,
    Add { name: String },
    /// Rename a location and every item in it
    Rename { old: String, new: String },
    /// Delete an empty location
    Delete { name: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum StrategyArg {
    Replace,
    Merge,
}

impl From<StrategyArg> for ImportStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Replace => ImportStrategy::Replace,
            StrategyArg::Merge => ImportStrategy::Merge,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ThemeArg {
    Auto,
    Light,
    Dark,
}

impl From<ThemeArg> for ThemePreference {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Auto => ThemePreference::Auto,
            ThemeArg::Light => ThemePreference::Light,
            ThemeArg::Dark => ThemePreference::Dark,
        }
    }
}

pub struct App<S, F, E, P, W> {
    settings: Settings,
    inventory: Inventory<S>,
    pipeline: ImagePipeline<F, E>,
    prompt: P,
    out: W,
}

impl<S, F, E, P, W> App<S, F, E, P, W>
where
    S: Store,
    F: FileOps,
    E: ImageEncoder,
    P: Prompt,
    W: Write,
{
    pub fn new(settings: Settings, inventory: Inventory<S>, pipeline: ImagePipeline<F, E>, prompt: P, out: W) -> Self {
        Self {
            settings,
            inventory,
            pipeline,
            prompt,
            out,
        }
    }

    pub fn inventory(&self) -> &Inventory<S> {
        &self.inventory
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    pub fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::List { location } => {
                let items = match &location {
                    Some(location) => self.inventory.items_in(location),
                    None => self.inventory.items().iter().collect(),
                };
                let lines: Vec<String> = items.iter().map(|item| item_line(item)).collect();
                for line in lines {
                    writeln!(self.out, "{line}")?;
                }
                writeln!(
                    self.out,
                    "{} item(s), {} unit(s) total",
                    self.inventory.items().len(),
                    self.inventory.total_quantity()
                )?;
            }
            Commands::Search { query } => {
                let lines: Vec<String> = self.inventory.search(&query).iter().map(|item| item_line(item)).collect();
                if lines.is_empty() {
                    writeln!(self.out, "No items match '{query}'")?;
                }
                for line in lines {
                    writeln!(self.out, "{line}")?;
                }
            }
            Commands::Show { id } => {
                let item = self.find(&id)?.clone();
                writeln!(self.out, "{}\n  id: {}", item.title, item.id)?;
                writeln!(self.out, "  quantity: {}", item.quantity)?;
                writeln!(self.out, "  location: {}", display_location(&item.location))?;
                if !item.description.is_empty() {
                    writeln!(self.out, "  description: {}", item.description)?;
                }
                for image in &item.images {
                    writeln!(self.out, "  image: {}", image.display())?;
                }
            }
            Commands::Add(args) => self.add(args)?,
            Commands::Edit(args) => self.edit(args)?,
            Commands::Adjust(args) => {
                let id = self.find(&args.id)?.id.clone();
                let adjustment = match (args.add, args.remove) {
                    (Some(amount), _) => QuantityAdjustment::Add(parse_quantity(&amount)?),
                    (None, Some(amount)) => QuantityAdjustment::Remove(parse_quantity(&amount)?),
                    (None, None) => bail!("pass --add or --remove"),
                };
                let item = self.inventory.adjust_quantity(&id, adjustment)?;
                writeln!(self.out, "{} now has quantity {}", item.title, item.quantity)?;
            }
            Commands::Delete { id, yes } => {
                let item = self.find(&id)?.clone();
                if !yes && !self.prompt.confirm("Delete item", &format!("Delete '{}'?", item.title)) {
                    writeln!(self.out, "Cancelled")?;
                    return Ok(());
                }
                let removed = self.inventory.delete_item(&item.id)?;
                self.delete_images(&removed.images);
                writeln!(self.out, "Deleted {}", removed.title)?;
            }
            Commands::Location { command } => self.location(command)?,
            Commands::Move(args) => self.move_items(args)?,
            Commands::Export { dest } => {
                let report = match dest {
                    Some(dest) => transfer::export(&self.inventory, &self.pipeline, &CopyToDestination::new(dest))?,
                    None => transfer::export(&self.inventory, &self.pipeline, &NoShare)?,
                };
                if report.images_unreadable > 0 {
                    writeln!(self.out, "{} image(s) could not be read and were exported empty", report.images_unreadable)?;
                }
                match report.outcome {
                    ShareOutcome::Shared(path) => writeln!(self.out, "Exported {} item(s) to {}", report.items, path.display())?,
                    ShareOutcome::Unavailable => writeln!(
                        self.out,
                        "Sharing not available. Export saved at: {}",
                        report.document.display()
                    )?,
                }
            }
            Commands::Import { file, strategy } => self.import(file, strategy)?,
            Commands::Theme { value } => match value {
                Some(value) => {
                    let theme = ThemePreference::from(value);
                    self.inventory.set_theme(theme)?;
                    writeln!(self.out, "Theme set to {theme}")?;
                }
                None => writeln!(self.out, "{}", self.inventory.theme())?,
            },
            Commands::Wipe { yes } => {
                if !yes
                    && !self.prompt.confirm(
                        "Delete all data",
                        "This removes every item, location and stored image. This cannot be undone.",
                    )
                {
                    writeln!(self.out, "Cancelled")?;
                    return Ok(());
                }
                self.inventory.clear_all()?;
                if let Err(e) = self.pipeline.purge() {
                    warn!(error = ?e, "Could not remove images directory");
                }
                writeln!(self.out, "All data deleted")?;
            }
            Commands::ImageInfo { id } => {
                let item = self.find(&id)?.clone();
                if item.images.is_empty() {
                    writeln!(self.out, "{} has no images", item.title)?;
                }
                for image in &item.images {
                    let info = self.pipeline.inspect(image);
                    let size = info.size_kb.map_or_else(|| "?".to_string(), |kb| format!("{kb} KB"));
                    writeln!(
                        self.out,
                        "{}  exists: {}  size: {}  persisted: {}",
                        info.path.display(),
                        info.exists,
                        size,
                        info.persisted
                    )?;
                }
            }
        }
        Ok(())
    }

    fn find(&self, id: &str) -> Result<&Item, InventoryError> {
        let id = ItemId::from(id);
        self.inventory
            .item(&id)
            .ok_or(InventoryError::ItemNotFound(id))
    }

    fn add(&mut self, args: AddArgs) -> Result<()> {
        let quantity = parse_quantity(&args.quantity)?;
        let mut draft = ItemDraft::new(args.title, quantity, args.location)
            .with_description(args.description)
            .with_images(args.images.clone());
        draft.validate()?;

        draft.images = self.ingest_all(&args.images);
        let resolution = self.inventory.begin_create(&draft);
        let picked = self.ask(&resolution);
        let outcome = resolution
            .choose(picked)
            .map_err(InventoryError::from)
            .and_then(|action| self.inventory.apply(action));

        match outcome {
            Ok(Outcome::Created(item)) => writeln!(self.out, "Created {} ({})", item.title, item.id)?,
            Ok(Outcome::Aggregated { into, .. }) => {
                self.delete_images(&draft.images);
                writeln!(self.out, "Added {} to {} (now {})", quantity, into.title, into.quantity)?;
            }
            Ok(Outcome::Relocated(item)) => writeln!(self.out, "Moved {}", item.title)?,
            Ok(Outcome::Skipped) => {
                self.delete_images(&draft.images);
                writeln!(self.out, "Cancelled")?;
            }
            Err(e) => {
                self.delete_images(&draft.images);
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn edit(&mut self, args: EditArgs) -> Result<()> {
        let item = self.find(&args.id)?.clone();
        let mut draft = ItemDraft::from_item(&item);
        if let Some(title) = args.title {
            draft.title = title;
        }
        if let Some(quantity) = args.quantity {
            draft.quantity = parse_quantity(&quantity)?;
        }
        if let Some(location) = args.location {
            draft.location = location;
        }
        if let Some(description) = args.description {
            draft.description = description;
        }
        for path in &args.remove_images {
            if !draft.images.contains(path) {
                writeln!(self.out, "{} is not attached to this item", path.display())?;
            }
        }
        draft.images.retain(|path| !args.remove_images.contains(path));

        let total = draft.images.len() + args.add_images.len();
        if total > MAX_IMAGES {
            return Err(ValidationError::TooManyImages { count: total, max: MAX_IMAGES }.into());
        }
        draft.validate()?;

        let added = self.ingest_all(&args.add_images);
        draft.images.extend(added.iter().cloned());
        match self.inventory.update_item(&item.id, draft) {
            Ok(outcome) => {
                self.delete_images(&outcome.dropped_images);
                writeln!(self.out, "Updated {}", outcome.item.title)?;
                Ok(())
            }
            Err(e) => {
                self.delete_images(&added);
                Err(e.into())
            }
        }
    }

    fn location(&mut self, command: LocationCommands) -> Result<()> {
        match command {
            LocationCommands::List => {
                let lines: Vec<String> = self
                    .inventory
                    .locations()
                    .iter()
                    .map(|name| format!("{name} ({})", self.inventory.items_in(name).len()))
                    .collect();
                for line in lines {
                    writeln!(self.out, "{line}")?;
                }
            }
            LocationCommands::Add { name } => {
                let name = self.inventory.add_location(&name)?;
                writeln!(self.out, "Added location {name}")?;
            }
            LocationCommands::Rename { old, new } => match self.inventory.rename_location(&old, &new)? {
                RenameOutcome::Unchanged => writeln!(self.out, "Nothing to rename")?,
                RenameOutcome::Renamed { items_updated } => {
                    writeln!(self.out, "Renamed {old} to {} ({items_updated} item(s) updated)", new.trim())?
                }
            },
            LocationCommands::Delete { name } => {
                self.inventory.delete_location(&name)?;
                writeln!(self.out, "Deleted location {name}")?;
            }
        }
        Ok(())
    }

    fn move_items(&mut self, args: MoveArgs) -> Result<()> {
        let item_ids: Vec<ItemId> = if args.ids.is_empty() {
            self.inventory
                .items_in(&args.from)
                .iter()
                .map(|item| item.id.clone())
                .collect()
        } else {
            args.ids.into_iter().map(ItemId::from).collect()
        };

        let mut sequencer = ReassignSequencer::new();
        sequencer.start(MoveRequest {
            item_ids,
            source: args.from,
            target: args.to,
        })?;
        let target = sequencer.target().to_string();

        let report = loop {
            match sequencer.run(&mut self.inventory, &mut self.prompt) {
                Ok(report) => break report,
                Err(e) => {
                    warn!(error = ?e, "Move step failed, continuing with the rest");
                    self.prompt.notify("Move failed", &e.to_string());
                }
            }
        };

        writeln!(
            self.out,
            "Moved {} item(s) to {}, merged {}, skipped {}",
            report.relocated.len(),
            target,
            report.merged.len(),
            report.skipped.len()
        )?;
        if !report.missing.is_empty() {
            writeln!(self.out, "{} selected item(s) no longer exist", report.missing.len())?;
        }
        if !report.failed.is_empty() {
            bail!("{} item(s) could not be moved", report.failed.len());
        }
        Ok(())
    }

    fn import(&mut self, file: PathBuf, strategy: Option<StrategyArg>) -> Result<()> {
        let staged = StagedImport::stage(&file, &self.pipeline).map_err(InventoryError::from)?;

        let strategy = match strategy {
            Some(strategy) => Some(ImportStrategy::from(strategy)),
            None => {
                let options: Vec<String> = std::iter::once("Cancel")
                    .chain(ImportStrategy::ALL.iter().map(|s| s.label()))
                    .map(str::to_string)
                    .collect();
                let message = format!(
                    "{} item(s) and {} location(s) found. Replace current data, or merge new items in?",
                    staged.items().len(),
                    staged.locations().len()
                );
                self.prompt
                    .choose("Import data", &message, &options)
                    .and_then(|i| i.checked_sub(1))
                    .and_then(|i| ImportStrategy::ALL.get(i).copied())
            }
        };

        let Some(strategy) = strategy else {
            staged.discard(&self.pipeline);
            writeln!(self.out, "Import cancelled")?;
            return Ok(());
        };

        match staged.apply(strategy, &mut self.inventory) {
            Ok(summary) => {
                writeln!(
                    self.out,
                    "Imported {} item(s) ({}), {} skipped as already present",
                    summary.items_added, summary.strategy, summary.items_dropped
                )?;
                Ok(())
            }
            Err(e) => {
                staged.discard(&self.pipeline);
                Err(e.into())
            }
        }
    }

    fn ask(&mut self, resolution: &Resolution) -> Option<usize> {
        match resolution {
            Resolution::NeedsChoice { context, .. } => {
                self.prompt
                    .choose(context.prompt_title(), &context.prompt_message(), &resolution.labels())
            }
            _ => None,
        }
    }

    /// Ingest every source; failures are reported and the image left out
    fn ingest_all(&mut self, sources: &[PathBuf]) -> Vec<PathBuf> {
        let options = IngestOptions::from(&self.settings.image);
        let mut stored = Vec::new();
        for source in sources {
            match self.pipeline.ingest(source, &options) {
                Ok(path) => stored.push(path),
                Err(e) => {
                    warn!(source = %source.display(), error = ?e, "Image ingestion failed");
                    self.prompt
                        .notify("Image could not be added", &format!("{}: {e}", source.display()));
                }
            }
        }
        stored
    }

    fn delete_images(&mut self, images: &[PathBuf]) {
        for image in images {
            if !self.pipeline.delete_stored(image) {
                self.prompt
                    .notify("Could not delete local file", &image.display().to_string());
            }
        }
    }
}

fn display_location(location: &str) -> &str {
    if location.is_empty() { "(none)" } else { location }
}

fn item_line(item: &Item) -> String {
    format!(
        "{}  {}  x{}  @ {}",
        item.id,
        item.title,
        item.quantity,
        display_location(&item.location)
    )
}

/// Data directory for the JSON store
pub fn data_dir(dirs: &crate::platform::StorageDirs) -> Result<PathBuf> {
    dirs.durable_base()
        .map(PathBuf::from)
        .context("No data directory available; set CASA_DATA_DIR or data_dir in the settings file")
}
