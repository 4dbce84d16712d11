use anyhow::{bail, Context, Result};
use azurerm_provider::azure::format_arm_error;
use azurerm_provider::config::load_config_file;
use azurerm_provider::diagnostics::{Diagnostics, Severity};
use azurerm_provider::mux::MuxServer;
use azurerm_provider::protocol::*;
use azurerm_provider::provider::functions::{NORMALISE_RESOURCE_ID, PARSE_RESOURCE_ID};
use azurerm_provider::provider::{FunctionServer, SdkServer};
use azurerm_provider::state::StateMap;
use azurerm_provider::VERSION;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Azure Resource Manager provider
#[derive(Parser, Debug)]
#[command(name = "azurerm-provider", version = VERSION, about, long_about = None)]
struct Args {
    /// Provider configuration file (JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the merged provider schema, or the schema of one type
    Schema {
        /// Resource or data source type name
        #[arg(long = "type")]
        type_name: Option<String>,
    },
    /// Print the resource, data source and function names served
    Metadata,
    /// Split a resource ID into its components
    ParseId { id: String },
    /// Re-case a resource ID to its canonical form
    NormaliseId { id: String },
    /// Import an existing resource by ID and print its state
    Read { type_name: String, id: String },
    /// Read a data source with a JSON configuration
    Data {
        type_name: String,
        /// Data source configuration as a JSON object
        #[arg(default_value = "{}")]
        config: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", log_path.display());
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("azurerm-provider {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("azurerm-provider").join("azurerm-provider.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".azurerm-provider").join("azurerm-provider.log");
    }
    PathBuf::from("azurerm-provider.log")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print warnings and errors to stderr; fail if any error was reported
fn check(diagnostics: &Diagnostics) -> Result<()> {
    for diagnostic in diagnostics.iter() {
        let label = match diagnostic.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        match &diagnostic.attribute {
            Some(attribute) => eprintln!("{label}: {} ({attribute})\n  {}", diagnostic.summary, diagnostic.detail),
            None => eprintln!("{label}: {}\n  {}", diagnostic.summary, diagnostic.detail),
        }
    }

    if diagnostics.has_errors() {
        bail!("the provider reported errors");
    }
    Ok(())
}

async fn configure(mux: &MuxServer, config: Option<&PathBuf>) -> Result<()> {
    let values = load_config_file(config.map(PathBuf::as_path))?;
    let response = mux
        .configure_provider(ConfigureProviderRequest { config: values })
        .await;
    check(&response.diagnostics)
}

async fn call_function(mux: &MuxServer, name: &str, id: String) -> Result<()> {
    let response = mux
        .call_function(CallFunctionRequest {
            name: name.to_string(),
            arguments: vec![Value::String(id)],
        })
        .await;
    check(&response.diagnostics)?;
    print_json(&response.result)
}

async fn run(args: Args) -> Result<()> {
    let mux = MuxServer::new(vec![Arc::new(SdkServer::from_registry()), Arc::new(FunctionServer::new())]);

    match args.command {
        Command::Schema { type_name } => {
            let schema = mux.get_provider_schema().await;
            check(&schema.diagnostics)?;
            match type_name {
                None => print_json(&schema),
                Some(name) => match schema.resources.get(&name).or_else(|| schema.data_sources.get(&name)) {
                    Some(type_schema) => print_json(type_schema),
                    None => bail!("{name:?} is neither a resource nor a data source"),
                },
            }
        }
        Command::Metadata => {
            let metadata = mux.get_metadata().await;
            check(&metadata.diagnostics)?;
            print_json(&metadata)
        }
        Command::ParseId { id } => call_function(&mux, PARSE_RESOURCE_ID, id).await,
        Command::NormaliseId { id } => call_function(&mux, NORMALISE_RESOURCE_ID, id).await,
        Command::Read { type_name, id } => {
            configure(&mux, args.config.as_ref()).await?;

            let imported = mux
                .import_resource_state(ImportResourceStateRequest {
                    type_name: type_name.clone(),
                    id,
                })
                .await;
            check(&imported.diagnostics)?;

            let Some(resource) = imported.imported.into_iter().next() else {
                bail!("importing {type_name} returned no resources");
            };

            let response = mux
                .read_resource(ReadResourceRequest {
                    type_name: resource.type_name,
                    current_state: resource.state,
                })
                .await;
            check(&response.diagnostics)?;

            match response.new_state {
                Some(state) => print_json(&state),
                None => {
                    println!("The {type_name} no longer exists");
                    Ok(())
                }
            }
        }
        Command::Data { type_name, config } => {
            let config: StateMap = serde_json::from_str(&config).context("parsing the data source configuration")?;
            configure(&mux, args.config.as_ref()).await?;

            let response = mux
                .read_data_source(ReadDataSourceRequest { type_name, config })
                .await;
            check(&response.diagnostics)?;
            print_json(&response.state.unwrap_or_default())
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        tracing::error!("{:#}", err);
        eprintln!("{}", json!({ "error": format_arm_error(&err) }));
        std::process::exit(1);
    }
}
