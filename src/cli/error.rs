use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::db::DbError;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] DbError),

    #[error("Invalid JSON for {what}: {source}")]
    #[diagnostic(
        code(showroom::cli::invalid_json),
        help("Pass a JSON object, e.g. '{{\"make\": \"Toyota\", \"price\": {{\"gte\": 20000}}}}'")
    )]
    InvalidJson {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid argument: {message}")]
    #[diagnostic(code(showroom::cli::invalid_argument))]
    InvalidArgument { message: String },

    #[error("Failed to access {path}: {source}")]
    #[diagnostic(code(showroom::cli::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type CliResult<T> = Result<T, CliError>;
