//! Check command implementation.

use seedbus_core::{Bus, SeedConfig};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Configuration check result.
#[derive(Debug, Serialize)]
pub struct CheckResult {
    /// Configuration path.
    pub path: String,
    /// Store driver, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// Every configured entity.
    pub entities: Vec<EntitySummary>,
}

/// Mapping summary for a single entity.
#[derive(Debug, Serialize)]
pub struct EntitySummary {
    /// Entity name.
    pub name: String,
    /// Table the entity writes to.
    pub table: String,
    /// Primary key column.
    pub primary_key: String,
    /// Name column, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_column: Option<String>,
    /// Number of translated headers.
    pub translations: usize,
    /// Number of transforms across all columns.
    pub transforms: usize,
    /// Number of default values.
    pub defaults: usize,
}

/// Runs the check command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = check(path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Loads a configuration and checks that every transform resolves.
///
/// The store is not opened.
pub fn check(path: &Path) -> Result<CheckResult, Box<dyn std::error::Error>> {
    let config = SeedConfig::from_path(path)?;
    info!("Loaded configuration from {:?}", path);

    let mut bus = Bus::in_memory();
    bus.create_entities_from_config(&config)?;
    bus.validate()?;

    let entities = config
        .entities
        .iter()
        .map(|(name, entity)| EntitySummary {
            name: name.clone(),
            table: entity.mapping.table_name.clone(),
            primary_key: entity.mapping.primary_key.clone(),
            name_column: entity.mapping.name_column.clone(),
            translations: entity.name_translations.len(),
            transforms: entity.data_transformations.values().map(Vec::len).sum(),
            defaults: entity.defaults.len(),
        })
        .collect();

    Ok(CheckResult {
        path: path.display().to_string(),
        driver: config.store.map(|store| store.driver),
        entities,
    })
}

fn print_text_output(result: &CheckResult) {
    println!("Configuration: {}", result.path);
    println!(
        "Store driver:  {}",
        result.driver.as_deref().unwrap_or("(none)")
    );
    println!();
    println!("Entities ({}):", result.entities.len());
    for entity in &result.entities {
        println!(
            "  {:<16} -> {}.{} (name: {})",
            entity.name,
            entity.table,
            entity.primary_key,
            entity.name_column.as_deref().unwrap_or("-")
        );
        println!(
            "  {:<16}    {} translations, {} transforms, {} defaults",
            "", entity.translations, entity.transforms, entity.defaults
        );
    }
    println!();
    println!("Configuration OK");
}
