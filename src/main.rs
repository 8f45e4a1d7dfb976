#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::{Level as TraceLevel, debug};
use tracing_subscriber::FmtSubscriber;

use casa_inventory::cli::{App, Cli, data_dir};
use casa_inventory::config::Settings;
use casa_inventory::images::{ImagePipeline, JpegEncoder};
use casa_inventory::inventory::Inventory;
use casa_inventory::platform::{LocalFiles, StorageDirs, TerminalPrompt};
use casa_inventory::store::JsonFileStore;

fn parse_level(name: &str) -> TraceLevel {
    match name.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Settings decide the log level, so only warnings are shown while loading them
    let bootstrap = FmtSubscriber::builder()
        .with_max_level(TraceLevel::WARN)
        .with_writer(std::io::stderr)
        .finish();
    let settings = tracing::subscriber::with_default(bootstrap, || match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    })?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&settings.log_level))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let dirs = StorageDirs::resolve(&settings);
    debug!(?dirs, "Resolved storage directories");
    let store = JsonFileStore::new(data_dir(&dirs)?);
    let inventory = Inventory::load(store)?;
    let pipeline = ImagePipeline::new(LocalFiles, JpegEncoder, dirs);

    let mut app = App::new(settings, inventory, pipeline, TerminalPrompt::stdio(), std::io::stdout());
    app.run(cli.command)
}
