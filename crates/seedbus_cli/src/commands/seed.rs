//! Seed command implementation.
//!
//! A scenario file is a JSON list of steps:
//!
//! ```json
//! [
//!   { "entity": "session", "action": "insert", "table": [["Name"], ["Keynote"]] },
//!   { "entity": "session", "action": "update", "table": [["Name", "Desc"], ["Keynote", "Updated"]] }
//! ]
//! ```
//!
//! Inserts apply entity defaults unless the step sets `"defaults": false`.

use seedbus_core::{Bus, ResetReport, SeedConfig, Table};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// What a scenario step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Insert new rows.
    Insert,
    /// Update rows by name.
    Update,
    /// Delete rows by name.
    Delete,
}

/// One step of a scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Entity the step writes to.
    pub entity: String,
    /// What to do.
    pub action: Action,
    /// Header row followed by data rows.
    pub table: Vec<Vec<String>>,
    /// Whether inserts apply entity defaults.
    #[serde(default = "default_true")]
    pub defaults: bool,
}

fn default_true() -> bool {
    true
}

/// Outcome of a scenario run.
#[derive(Debug, Default)]
pub struct SeedOutcome {
    /// Rows inserted.
    pub inserted: usize,
    /// Rows updated.
    pub updated: usize,
    /// Rows deleted.
    pub deleted: usize,
    /// Reset report, when the run was reset.
    pub reset: Option<ResetReport>,
}

/// Runs the seed command.
pub fn run(config: &Path, scenario: &Path, reset: bool) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = seed(config, scenario, reset)?;

    println!(
        "Seeded: {} inserted, {} updated, {} deleted",
        outcome.inserted, outcome.updated, outcome.deleted
    );
    if let Some(report) = outcome.reset {
        println!("Reset:  {report}");
    }

    Ok(())
}

/// Parses a scenario file.
pub fn load_scenario(path: &Path) -> Result<Vec<Step>, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    let steps: Vec<Step> = serde_json::from_str(&json)?;
    Ok(steps)
}

/// Runs every step of a scenario, optionally resetting afterwards.
///
/// A failing step stops the run. With `reset`, everything written before
/// the failure is still undone.
pub fn seed(
    config: &Path,
    scenario: &Path,
    reset: bool,
) -> Result<SeedOutcome, Box<dyn std::error::Error>> {
    let config = SeedConfig::from_path(config)?;
    let steps = load_scenario(scenario)?;

    let mut bus = Bus::from_config(&config)?;
    bus.validate()?;
    info!("Running {} scenario steps", steps.len());

    let mut outcome = SeedOutcome::default();
    let result = run_steps(&mut bus, &steps, &mut outcome);

    if reset {
        if let Err(e) = &result {
            warn!("Scenario failed, resetting: {}", e);
        }
        outcome.reset = Some(bus.reset()?);
    }

    result.map(|()| outcome)
}

fn run_steps(
    bus: &mut Bus,
    steps: &[Step],
    outcome: &mut SeedOutcome,
) -> Result<(), Box<dyn std::error::Error>> {
    for (index, step) in steps.iter().enumerate() {
        let table = Table::from_rows(step.table.clone())?;
        let ids = match step.action {
            Action::Insert => bus.insert_from_table(&step.entity, &table, step.defaults)?,
            Action::Update => bus.update_from_table(&step.entity, &table)?,
            Action::Delete => bus.delete_from_table(&step.entity, &table)?,
        };
        info!(
            "Step {}: {:?} {} -> {} rows",
            index + 1,
            step.action,
            step.entity,
            ids.len()
        );

        match step.action {
            Action::Insert => outcome.inserted += ids.len(),
            Action::Update => outcome.updated += ids.len(),
            Action::Delete => outcome.deleted += ids.len(),
        }
    }
    Ok(())
}
