//! Sample data loading.
//!
//! Seeding runs as one atomic block: either every record lands or none do.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::json;
use tabled::{Table, Tabled};

use crate::cli::commands::OutputFormat;
use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::{apply_table_style, to_json};
use crate::db::{DbError, Record, Storage};

/// Collection name → records to insert, in insertion order.
pub type SeedSet = BTreeMap<String, Vec<Record>>;

#[derive(Tabled)]
pub(crate) struct SeedDisplay {
    #[tabled(rename = "Collection")]
    pub(crate) collection: String,
    #[tabled(rename = "Inserted")]
    pub(crate) inserted: usize,
}

/// Read a seed file: a JSON object mapping collection names to record arrays.
pub fn load_seed_file(path: &Path) -> CliResult<SeedSet> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::InvalidJson {
        what: "seed file",
        source,
    })
}

/// A small showroom: cars, a testimonial for the first car, accessories and
/// services.
pub fn demo_data() -> SeedSet {
    let cars = [
        ("toyota-corolla-2022", "Toyota", "Corolla", 2022, 21_500, "sedan"),
        ("honda-civic-2021", "Honda", "Civic", 2021, 19_900, "sedan"),
        ("mazda-cx5-2023", "Mazda", "CX-5", 2023, 31_200, "suv"),
        ("tesla-model3-2022", "Tesla", "Model 3", 2022, 38_000, "sedan"),
    ]
    .into_iter()
    .map(|(slug, make, model, year, price, category)| {
        Record::new()
            .with("slug", slug)
            .with("make", make)
            .with("model", model)
            .with("year", year)
            .with("price", price)
            .with("category", category)
            .with("status", "available")
            .with("available", true)
            .with("featured", price > 30_000)
            .with("images", json!([format!("/images/{}.jpg", slug)]))
    })
    .collect();

    let accessories = vec![
        Record::new()
            .with("slug", "all-weather-mats")
            .with("name", "All-weather floor mats")
            .with("category", "interior")
            .with("price", 120)
            .with("compatibleModels", json!(["Corolla", "Civic"]))
            .with("inStock", true),
        Record::new()
            .with("slug", "roof-rack")
            .with("name", "Roof rack")
            .with("category", "exterior")
            .with("price", 340)
            .with("compatibleModels", json!(["CX-5"]))
            .with("inStock", false),
    ];

    let services = vec![
        Record::new()
            .with("slug", "oil-change")
            .with("name", "Oil change")
            .with("category", "maintenance")
            .with("priceFrom", 60)
            .with("durationMinutes", 45)
            .with("highlights", json!(["Synthetic oil", "Filter replacement"]))
            .with("active", true),
    ];

    let mut set = SeedSet::new();
    set.insert("cars".to_string(), cars);
    set.insert("accessories".to_string(), accessories);
    set.insert("services".to_string(), services);
    set.insert(
        "testimonials".to_string(),
        vec![
            Record::new()
                .with("name", "Dana")
                .with("content", "Smooth purchase, great follow-up.")
                .with("rating", 5)
                .with("approved", true),
        ],
    );
    set
}

/// Insert every record of `set` atomically.
///
/// Testimonials without a `carId` are linked to the first car inserted.
pub async fn insert(storage: &Storage, mut set: SeedSet) -> CliResult<Vec<(String, usize)>> {
    let cars = set.remove("cars").unwrap_or_default();
    let testimonials = set.remove("testimonials").unwrap_or_default();

    let inserted = storage
        .run_atomic(move |tx| {
            Box::pin(async move {
                let mut inserted = Vec::new();
                let mut first_car = None;

                for car in cars.iter().cloned() {
                    let created = tx.create("cars", car).await?;
                    if first_car.is_none() {
                        first_car = created.id().map(str::to_string);
                    }
                }
                if !cars.is_empty() {
                    inserted.push(("cars".to_string(), cars.len()));
                }

                for (collection, records) in &set {
                    for record in records.iter().cloned() {
                        tx.create(collection, record).await?;
                    }
                    inserted.push((collection.clone(), records.len()));
                }

                if !testimonials.is_empty() {
                    for mut testimonial in testimonials.iter().cloned() {
                        if let (false, Some(car_id)) =
                            (testimonial.contains_key("carId"), &first_car)
                        {
                            testimonial.insert("carId".to_string(), car_id.clone().into());
                        }
                        tx.create("testimonials", testimonial).await?;
                    }
                    inserted.push(("testimonials".to_string(), testimonials.len()));
                }

                Ok::<_, DbError>(inserted)
            })
        })
        .await?;
    Ok(inserted)
}

pub async fn seed(
    storage: &Storage,
    file: Option<&Path>,
    format: OutputFormat,
) -> CliResult<String> {
    let set = match file {
        Some(path) => load_seed_file(path)?,
        None => demo_data(),
    };
    let inserted = insert(storage, set).await?;

    match format {
        OutputFormat::Json => to_json(&inserted.into_iter().collect::<BTreeMap<_, _>>()),
        OutputFormat::Table => {
            let rows: Vec<SeedDisplay> = inserted
                .into_iter()
                .map(|(collection, inserted)| SeedDisplay {
                    collection,
                    inserted,
                })
                .collect();
            let mut table = Table::new(rows);
            apply_table_style(&mut table);
            Ok(table.to_string())
        }
    }
}
