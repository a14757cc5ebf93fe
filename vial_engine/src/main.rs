//! # Vial Engine
//!
//! Replays a JSON command file through the protocol engine and prints the
//! resulting command records as JSON.
//!
//! The config directory provides `config.toml` (driver name, virtual module
//! switch, deck file and liquid class directory). The command file is a JSON
//! array of `{ "commandType", "params", "intent"?, "key"? }` objects.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};
use vial_common::config::{load_config_dir, LogLevel};
use vial_common::logging::init_tracing;
use vial_engine::{CommandCreate, CommandStatus, EngineSettings, ProtocolEngine};
use vial_hal::{DeckConfig, DriverRegistry, SimulatedDeck};

/// Vial Engine: replay liquid-handling commands
#[derive(Parser, Debug)]
#[command(name = "vial_engine")]
#[command(version)]
#[command(about = "Execute a JSON command file against a pipetting driver")]
struct Args {
    /// Config directory containing config.toml.
    #[arg(long, value_name = "DIR", default_value = "config")]
    config_dir: PathBuf,

    /// JSON array of commands to execute in order.
    commands: PathBuf,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args).await {
        error!("FATAL: {e}");
        eprintln!("vial_engine: {e}");
        process::exit(1);
    }
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_dir(&args.config_dir)?;
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.shared.log_level
    };
    init_tracing(level, args.json);
    info!(
        "Vial Engine v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let registry = DriverRegistry::with_builtin_drivers();
    let hardware = registry.create_driver(&config.engine.driver)?;
    let deck = match &config.engine.deck_file {
        Some(path) => SimulatedDeck::load(path)?,
        None => {
            warn!("No deck_file configured, starting with an empty deck");
            SimulatedDeck::from_config(DeckConfig::default())?
        }
    };

    let settings = EngineSettings {
        use_virtual_modules: config.engine.use_virtual_modules,
    };
    let mut engine = ProtocolEngine::new(hardware, Arc::new(deck), settings);
    if let Some(dir) = &config.engine.liquid_class_dir {
        engine = engine.with_liquid_class_dir(dir.clone());
    }

    let text = std::fs::read_to_string(&args.commands)?;
    let requests: Vec<CommandCreate> = serde_json::from_str(&text)?;
    info!("Executing {} commands", requests.len());

    for request in requests {
        let command = engine.execute_command(request).await?;
        if command.status == CommandStatus::Failed && command.defined_error.is_none() {
            warn!("Stopping replay after unclassified failure of {}", command.id);
            break;
        }
    }

    let output = serde_json::to_string_pretty(engine.get_all_commands())?;
    println!("{output}");
    info!("Vial Engine finished");
    Ok(())
}
