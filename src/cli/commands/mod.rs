pub mod init;
pub mod records;
pub mod seed;

use clap::ValueEnum;

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Sorting, pagination and relation parameters for `find`
#[derive(Debug, Default)]
pub struct FindParams<'a> {
    pub filter: Option<&'a str>,
    pub sort: Option<&'a str>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub relations: &'a [String],
}

/// Selects the records an update or delete applies to.
///
/// A bulk target always carries an explicit filter; `{}` selects everything.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Id(&'a str),
    Filter(&'a str),
}

#[cfg(test)]
#[path = "records_test.rs"]
mod records_test;
