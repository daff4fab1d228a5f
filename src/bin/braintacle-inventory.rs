//! # Braintacle Inventory CLI
//!
//! Command-line tools for inventory documents: decoding uploaded streams,
//! schema validation, inspection, export of client snapshots and upload to
//! the communication server.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use braintacle_inventory::config::{ConfigManager, InventoryConfig, LoggingConfig};
use braintacle_inventory::constants::exit_codes;
use braintacle_inventory::error::format_diagnostics;
use braintacle_inventory::logging;
use braintacle_inventory::{
    decompress, export_client, read_inventory, Client, ClientSnapshot, ExportOptions,
    HydratorRegistry, InventoryDocument, InventoryError, InventoryImporter, InventoryRequest,
};

#[derive(Parser, Debug)]
#[command(name = "braintacle-inventory")]
#[command(about = "Decode, validate, export and upload Braintacle inventory documents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path (default: config/braintacle-inventory.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Decompress a zlib compressed inventory file
    Decode {
        /// Compressed input file
        input: PathBuf,
        /// Output file (default: standard output)
        output: Option<PathBuf>,
    },

    /// Validate an inventory document against its schema
    Validate {
        /// Inventory file, compressed or not
        input: PathBuf,
    },

    /// Print an inventory document as client snapshot JSON
    Inspect {
        /// Inventory file, compressed or not
        input: PathBuf,
    },

    /// Write a client snapshot as <DEVICEID>.xml into a directory
    Export {
        /// Client snapshot JSON file
        snapshot: PathBuf,
        /// Target directory
        directory: PathBuf,
        /// Validate the document before writing it
        #[arg(long)]
        validate: bool,
    },

    /// Upload an inventory file to the communication server
    Import {
        /// Inventory file, sent unchanged
        input: PathBuf,
    },

    /// Show the effective configuration with credentials masked
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Decoding needs no configuration, so a broken config file cannot fail it.
    if let Commands::Decode { input, output } = &cli.command {
        logging::init_with_config(&with_verbosity(LoggingConfig::default(), cli.verbose));
        return decode(input, output.as_deref());
    }

    let manager = match ConfigManager::load_from_file(cli.config.as_deref()) {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(exit_codes::FAILURE);
        }
    };

    logging::init_with_config(&with_verbosity(manager.config().logging.clone(), cli.verbose));

    info!(
        environment = %manager.environment(),
        config_file = ?manager.config_file(),
        "Braintacle inventory CLI starting"
    );

    let config = manager.config();
    let result = match cli.command {
        Commands::Decode { input, output } => return decode(&input, output.as_deref()),
        Commands::Validate { input } => return validate(&input, config),
        Commands::Inspect { input } => inspect(&input, config),
        Commands::Export {
            snapshot,
            directory,
            validate,
        } => export(&snapshot, &directory, validate, config),
        Commands::Import { input } => import(&input, config).await,
        Commands::Config => show_config(&manager),
    };

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{e:#}");
            ExitCode::from(exit_codes::FAILURE)
        }
    }
}

/// `-v` overrides the configured level.
fn with_verbosity(mut config: LoggingConfig, verbose: u8) -> LoggingConfig {
    match verbose {
        0 => {}
        1 => config.level = Some("info".to_string()),
        2 => config.level = Some("debug".to_string()),
        _ => config.level = Some("trace".to_string()),
    }
    config
}

fn decode(input: &Path, output: Option<&Path>) -> ExitCode {
    let data = match std::fs::read(input) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Input file '{}' could not be read: {e}", input.display());
            return ExitCode::from(exit_codes::INPUT_UNREADABLE);
        }
    };
    let xml = match decompress(&data) {
        Ok(xml) => xml,
        Err(e) => {
            eprintln!("Input file '{}' is not a valid compressed stream: {e}", input.display());
            return ExitCode::from(exit_codes::INVALID_STREAM);
        }
    };
    let written = match output {
        Some(path) => std::fs::write(path, &xml),
        None => std::io::stdout().lock().write_all(&xml),
    };
    if let Err(e) = written {
        eprintln!("Output could not be written: {e}");
        return ExitCode::from(exit_codes::FAILURE);
    }
    logging::log_document_operation("decode", None, "completed", Some(xml.len()), None);
    ExitCode::from(exit_codes::SUCCESS)
}

fn validate(input: &Path, config: &InventoryConfig) -> ExitCode {
    let request = match load_request(input, config) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(match e {
                InventoryError::Io(_) => exit_codes::INPUT_UNREADABLE,
                _ => exit_codes::INVALID_STREAM,
            });
        }
    };
    match request.validation_report() {
        Ok(diagnostics) if diagnostics.is_empty() => {
            println!("{}: valid", input.display());
            ExitCode::from(exit_codes::SUCCESS)
        }
        Ok(diagnostics) => {
            println!("{}: invalid\n{}", input.display(), format_diagnostics(&diagnostics));
            ExitCode::from(exit_codes::INVALID_DOCUMENT)
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(exit_codes::FAILURE)
        }
    }
}

fn inspect(input: &Path, config: &InventoryConfig) -> anyhow::Result<()> {
    let request = load_request(input, config)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let snapshot = read_inventory(request.document())?;
    // Fail on values the hydrators would reject
    Client::from_snapshot(&snapshot, &HydratorRegistry::new(config.hydrator_settings()))?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn export(snapshot: &Path, directory: &Path, validate: bool, config: &InventoryConfig) -> anyhow::Result<()> {
    if !directory.is_dir() {
        bail!("Directory '{}' does not exist", directory.display());
    }
    let json = std::fs::read_to_string(snapshot)
        .with_context(|| format!("Failed to read {}", snapshot.display()))?;
    let snapshot: ClientSnapshot = serde_json::from_str(&json).context("Invalid client snapshot")?;

    let registry = HydratorRegistry::new(config.hydrator_settings());
    let client = Client::from_snapshot(&snapshot, &registry)?;
    let path = export_client(
        &client,
        &registry,
        &config.schema.directory,
        directory,
        ExportOptions { validate },
    )?;
    println!("{}", path.display());
    Ok(())
}

async fn import(input: &Path, config: &InventoryConfig) -> anyhow::Result<()> {
    let importer = InventoryImporter::from_config(config)?;
    importer.import_file(input).await?;
    println!("{} uploaded", input.display());
    Ok(())
}

fn show_config(manager: &ConfigManager) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
    Ok(())
}

fn load_request(input: &Path, config: &InventoryConfig) -> Result<InventoryRequest, InventoryError> {
    let data = std::fs::read(input)?;
    InventoryRequest::from_bytes(&data, &config.schema.directory)
}
