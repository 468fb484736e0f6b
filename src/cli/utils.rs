//! Shared utilities for CLI commands

use serde_json::Value;
use tabled::builder::Builder;
use tabled::{Table, settings::Style};

use crate::cli::error::{CliError, CliResult};
use crate::db::{CollectionSchema, Filter, Record, SortDirection};

/// Maximum width of a single table cell.
const CELL_WIDTH: usize = 40;

/// Truncate a string with ellipsis if it exceeds max length
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}

/// Parse a JSON object argument into a record.
pub fn parse_record(json: &str) -> CliResult<Record> {
    serde_json::from_str(json).map_err(|source| CliError::InvalidJson {
        what: "record",
        source,
    })
}

/// Parse an optional JSON filter argument. Missing means match-all.
pub fn parse_filter(json: Option<&str>) -> CliResult<Filter> {
    let Some(json) = json else {
        return Ok(Filter::new());
    };
    let value: Value = serde_json::from_str(json).map_err(|source| CliError::InvalidJson {
        what: "filter",
        source,
    })?;
    Ok(Filter::from_json(&value)?)
}

/// Parse `field[:asc|desc]` terms separated by commas.
pub fn parse_sort(spec: Option<&str>) -> CliResult<Vec<(String, SortDirection)>> {
    let Some(spec) = spec else {
        return Ok(Vec::new());
    };
    spec.split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| {
            let (field, direction) = match term.split_once(':') {
                Some((field, dir)) => (field, dir),
                None => (term, "asc"),
            };
            let direction = match direction.to_ascii_lowercase().as_str() {
                "asc" => SortDirection::Asc,
                "desc" => SortDirection::Desc,
                other => {
                    return Err(CliError::InvalidArgument {
                        message: format!("sort direction must be asc or desc, got '{}'", other),
                    });
                }
            };
            Ok((field.to_string(), direction))
        })
        .collect()
}

/// Render a value for a table cell.
pub fn format_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => truncate_with_ellipsis(s, CELL_WIDTH),
        Some(other) => truncate_with_ellipsis(&other.to_string(), CELL_WIDTH),
    }
}

/// Render records as a table: `id`, then the collection's declared columns
/// that at least one record has, then any other fields.
pub fn records_table(schema: &CollectionSchema, records: &[Record]) -> String {
    if records.is_empty() {
        return "No records found.".to_string();
    }

    let mut headers = vec!["id".to_string()];
    for column in &schema.columns {
        if records.iter().any(|r| r.contains_key(&column.name)) {
            headers.push(column.name.clone());
        }
    }
    for record in records {
        for field in record.keys() {
            if field != "createdAt" && field != "updatedAt" && !headers.contains(field) {
                headers.push(field.clone());
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for record in records {
        builder.push_record(headers.iter().map(|h| format_cell(record.get(h))));
    }

    let mut table = builder.build();
    apply_table_style(&mut table);
    table.to_string()
}

pub fn to_json<T: serde::Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value).map_err(|source| CliError::InvalidJson {
        what: "output",
        source,
    })
}

/// Apply consistent table styling
pub fn apply_table_style(table: &mut Table) {
    table.with(Style::rounded());
}
