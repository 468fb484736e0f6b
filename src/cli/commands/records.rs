use serde_json::json;

use crate::cli::commands::{FindParams, OutputFormat, Target};
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::{parse_filter, parse_record, parse_sort, records_table, to_json};
use crate::db::{QueryOptions, Record, Storage};

fn render(
    storage: &Storage,
    collection: &str,
    records: &[Record],
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(&records),
        OutputFormat::Table => {
            let schema = storage.catalog().collection(collection)?;
            Ok(records_table(schema, records))
        }
    }
}

pub async fn create(
    storage: &Storage,
    collection: &str,
    data: &str,
    format: OutputFormat,
) -> CliResult<String> {
    let record = storage.create(collection, parse_record(data)?).await?;
    match format {
        OutputFormat::Json => to_json(&record),
        OutputFormat::Table => Ok(format!(
            "Created {} record: {}",
            collection,
            record.id().unwrap_or("-")
        )),
    }
}

pub async fn get(
    storage: &Storage,
    collection: &str,
    id: &str,
    format: OutputFormat,
) -> CliResult<String> {
    match storage.find_by_id(collection, id).await? {
        Some(record) => render(storage, collection, &[record], format),
        None => match format {
            OutputFormat::Json => Ok("null".to_string()),
            OutputFormat::Table => Ok(format!("No {} record with id {}", collection, id)),
        },
    }
}

pub async fn find(
    storage: &Storage,
    collection: &str,
    params: FindParams<'_>,
    format: OutputFormat,
) -> CliResult<String> {
    let filter = parse_filter(params.filter)?;
    let options = QueryOptions {
        sort: parse_sort(params.sort)?,
        skip: params.skip,
        limit: params.limit,
        relations: params.relations.to_vec(),
    };
    let records = storage.find(collection, &filter, &options).await?;
    render(storage, collection, &records, format)
}

pub async fn update(
    storage: &Storage,
    collection: &str,
    target: Target<'_>,
    data: &str,
    format: OutputFormat,
) -> CliResult<String> {
    let patch = parse_record(data)?;
    match target {
        Target::Id(id) => match storage.update_by_id(collection, id, patch).await? {
            Some(record) => render(storage, collection, &[record], format),
            None => Err(CliError::InvalidArgument {
                message: format!("no {} record with id {}", collection, id),
            }),
        },
        Target::Filter(filter) => {
            let changed = storage
                .update(collection, &parse_filter(Some(filter))?, patch)
                .await?;
            summary(format, "updated", changed)
        }
    }
}

pub async fn delete(
    storage: &Storage,
    collection: &str,
    target: Target<'_>,
    format: OutputFormat,
) -> CliResult<String> {
    let removed = match target {
        Target::Id(id) => u64::from(storage.delete_by_id(collection, id).await?),
        Target::Filter(filter) => storage.delete(collection, &parse_filter(Some(filter))?).await?,
    };
    summary(format, "deleted", removed)
}

pub async fn count(
    storage: &Storage,
    collection: &str,
    filter: Option<&str>,
    format: OutputFormat,
) -> CliResult<String> {
    let total = storage.count(collection, &parse_filter(filter)?).await?;
    summary(format, "count", total)
}

fn summary(format: OutputFormat, label: &str, n: u64) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(&json!({ label: n })),
        OutputFormat::Table => Ok(format!("{}: {}", label, n)),
    }
}
