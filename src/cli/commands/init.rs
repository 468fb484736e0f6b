use serde_json::json;
use tabled::{Table, Tabled};

use crate::cli::commands::OutputFormat;
use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, to_json};
use crate::db::Storage;

#[derive(Tabled)]
pub(crate) struct CollectionDisplay {
    #[tabled(rename = "Collection")]
    pub(crate) name: String,
    #[tabled(rename = "Columns")]
    pub(crate) columns: usize,
    #[tabled(rename = "Indexes")]
    pub(crate) indexes: String,
}

/// Report the collections that connecting has made ready.
///
/// Tables and indexes are created as part of connecting, so by the time
/// this runs the work is already done.
pub fn init(storage: &Storage, format: OutputFormat) -> CliResult<String> {
    let rows: Vec<CollectionDisplay> = storage
        .catalog()
        .iter()
        .map(|schema| CollectionDisplay {
            name: schema.name.clone(),
            columns: schema.columns.len(),
            indexes: schema
                .indexes
                .iter()
                .map(|i| {
                    if i.unique {
                        format!("{} (unique)", i.field)
                    } else {
                        i.field.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();

    match format {
        OutputFormat::Json => to_json(&json!({
            "backend": storage.backend_kind(),
            "collections": rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        })),
        OutputFormat::Table => {
            let mut table = Table::new(rows);
            apply_table_style(&mut table);
            Ok(format!(
                "Storage ready ({} backend)\n{}",
                storage.backend_kind(),
                table
            ))
        }
    }
}
