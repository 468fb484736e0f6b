mod commands;
pub mod error;
pub mod utils;

#[cfg(test)]
mod mod_test;
#[cfg(test)]
mod utils_test;

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use commands::OutputFormat;
use commands::{FindParams, Target};
use error::{CliError, CliResult};

use crate::config::{BackendConfig, SqliteConfig, StorageConfig, SurrealConfig};
use crate::db::Storage;

#[derive(Parser)]
#[command(name = "showroom-db")]
#[command(author, version, about = "Showroom storage administration", long_about = None)]
pub struct Cli {
    /// Storage configuration file (YAML)
    #[arg(long, global = true, env = "SHOWROOM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the configured backend
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Sqlite,
    Surreal,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing tables, collections and indexes
    Init,
    /// Insert a record
    Create {
        collection: String,
        /// Record as a JSON object
        data: String,
    },
    /// Fetch one record by id
    Get { collection: String, id: String },
    /// List records matching a filter
    Find {
        collection: String,
        /// Filter as JSON, e.g. '{"price": {"gte": 20000}}'
        #[arg(long)]
        filter: Option<String>,
        /// Sort terms, e.g. 'price:desc,make'
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        skip: Option<u64>,
        #[arg(long)]
        limit: Option<u64>,
        /// Resolve a declared relation (repeatable)
        #[arg(long = "with")]
        relations: Vec<String>,
    },
    /// Apply a partial update to one record or every match
    #[command(group(ArgGroup::new("target").required(true).args(["id", "filter"])))]
    Update {
        collection: String,
        /// Changes as a JSON object; null clears a field
        data: String,
        #[arg(long)]
        id: Option<String>,
        /// Filter as JSON; '{}' matches every record
        #[arg(long)]
        filter: Option<String>,
    },
    /// Delete one record or every match
    #[command(group(ArgGroup::new("target").required(true).args(["id", "filter"])))]
    Delete {
        collection: String,
        #[arg(long)]
        id: Option<String>,
        /// Filter as JSON; '{}' matches every record
        #[arg(long)]
        filter: Option<String>,
    },
    /// Count records matching a filter
    Count {
        collection: String,
        #[arg(long)]
        filter: Option<String>,
    },
    /// Load sample data, or records from a JSON file, in one atomic block
    Seed {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "showroom=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Resolve configuration: file (if any), then environment, then flags.
pub fn resolve_config(
    config: Option<&std::path::Path>,
    backend: Option<BackendKind>,
) -> CliResult<StorageConfig> {
    let base = match config {
        Some(path) => StorageConfig::load(path)?,
        None => StorageConfig::default(),
    };
    let mut resolved = base.with_env()?;

    resolved.backend = match (backend, resolved.backend) {
        (Some(BackendKind::Sqlite), BackendConfig::Surreal(_)) => {
            BackendConfig::Sqlite(SqliteConfig::default())
        }
        (Some(BackendKind::Surreal), BackendConfig::Sqlite(_)) => {
            BackendConfig::Surreal(SurrealConfig::default())
        }
        (_, unchanged) => unchanged,
    };
    Ok(resolved)
}

async fn connect(config: &StorageConfig) -> CliResult<Storage> {
    if let BackendConfig::Sqlite(sqlite) = &config.backend {
        if let Some(parent) = sqlite.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CliError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(Storage::connect(config).await?)
}

async fn dispatch(storage: &Storage, command: Commands, format: OutputFormat) -> CliResult<String> {
    match command {
        Commands::Init => commands::init::init(storage, format),
        Commands::Create { collection, data } => {
            commands::records::create(storage, &collection, &data, format).await
        }
        Commands::Get { collection, id } => {
            commands::records::get(storage, &collection, &id, format).await
        }
        Commands::Find {
            collection,
            filter,
            sort,
            skip,
            limit,
            relations,
        } => {
            let params = FindParams {
                filter: filter.as_deref(),
                sort: sort.as_deref(),
                skip,
                limit,
                relations: &relations,
            };
            commands::records::find(storage, &collection, params, format).await
        }
        Commands::Update {
            collection,
            data,
            id,
            filter,
        } => {
            let target = target(id.as_deref(), filter.as_deref())?;
            commands::records::update(storage, &collection, target, &data, format).await
        }
        Commands::Delete {
            collection,
            id,
            filter,
        } => {
            let target = target(id.as_deref(), filter.as_deref())?;
            commands::records::delete(storage, &collection, target, format).await
        }
        Commands::Count { collection, filter } => {
            commands::records::count(storage, &collection, filter.as_deref(), format).await
        }
        Commands::Seed { file } => commands::seed::seed(storage, file.as_deref(), format).await,
    }
}

fn target<'a>(id: Option<&'a str>, filter: Option<&'a str>) -> CliResult<Target<'a>> {
    match (id, filter) {
        (Some(id), None) => Ok(Target::Id(id)),
        (None, Some(filter)) => Ok(Target::Filter(filter)),
        _ => Err(CliError::InvalidArgument {
            message: "pass exactly one of --id or --filter".to_string(),
        }),
    }
}

pub async fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = resolve_config(cli.config.as_deref(), cli.backend)?;
    let storage = connect(&config).await?;
    let result = dispatch(&storage, cli.command, cli.format).await;
    storage.disconnect().await;

    println!("{}", result?);
    Ok(())
}
