//! Scenario test helpers.
//!
//! A [`ScenarioHarness`] records the state of the conference tables before
//! a scenario runs, drives the scenario through the bus, and checks that
//! reset brings every table back to that state.

use crate::fixtures::{table, FixtureStore, TestBus};
use seedbus_core::{ResetReport, SeedResult};
use seedbus_store::{Row, RowId};

/// A conference bus plus the table contents it must restore.
pub struct ScenarioHarness {
    /// The bus and store under test.
    pub conference: TestBus,
    baseline: Vec<(String, Vec<Row>)>,
}

impl ScenarioHarness {
    /// Creates a harness over in-memory tables.
    pub fn memory() -> Self {
        Self::new(TestBus::memory())
    }

    /// Creates a harness over a temporary SQLite database.
    pub fn sqlite() -> Self {
        Self::new(TestBus::sqlite())
    }

    fn new(conference: TestBus) -> Self {
        let baseline = conference.store.dump();
        Self {
            conference,
            baseline,
        }
    }

    /// The store under test.
    pub fn store(&self) -> &FixtureStore {
        &self.conference.store
    }

    /// Writes rows that exist before the scenario and records the new
    /// baseline.
    pub fn preload(&mut self, table: &str, rows: Vec<Row>) -> Vec<RowId> {
        let ids = rows
            .into_iter()
            .map(|row| self.conference.store.preload(table, row))
            .collect();
        self.snapshot();
        ids
    }

    /// Records the current table contents as the baseline.
    pub fn snapshot(&mut self) {
        self.baseline = self.conference.store.dump();
    }

    /// Inserts literal rows, applying defaults.
    pub fn insert(&mut self, entity: &str, rows: &[&[&str]]) -> Vec<RowId> {
        self.conference
            .bus
            .insert_from_table(entity, &table(rows), true)
            .expect("scenario insert succeeds")
    }

    /// Updates by name from literal rows.
    pub fn update(&mut self, entity: &str, rows: &[&[&str]]) -> Vec<RowId> {
        self.try_update(entity, rows)
            .expect("scenario update succeeds")
    }

    /// Updates by name from literal rows, returning any error.
    pub fn try_update(&mut self, entity: &str, rows: &[&[&str]]) -> SeedResult<Vec<RowId>> {
        self.conference.bus.update_from_table(entity, &table(rows))
    }

    /// Deletes the named rows.
    pub fn delete(&mut self, entity: &str, rows: &[&[&str]]) -> Vec<RowId> {
        self.conference
            .bus
            .delete_from_table(entity, &table(rows))
            .expect("scenario delete succeeds")
    }

    /// Returns true if every table matches the baseline.
    pub fn is_at_baseline(&self) -> bool {
        self.conference.store.dump() == self.baseline
    }

    /// Resets the bus and asserts every table matches the baseline.
    pub fn reset_and_verify(&mut self) -> ResetReport {
        let report = self.conference.bus.reset().expect("reset succeeds");
        for (table, expected) in &self.baseline {
            assert_eq!(
                &self.conference.store.rows(table),
                expected,
                "Table '{}' differs from baseline after reset",
                table
            );
        }
        report
    }
}

impl Default for ScenarioHarness {
    fn default() -> Self {
        Self::memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_harness_is_at_baseline() {
        let mut harness = ScenarioHarness::default();
        assert!(harness.is_at_baseline());
        assert_eq!(harness.reset_and_verify().total(), 0);
    }

    #[test]
    fn preload_moves_baseline() {
        let mut harness = ScenarioHarness::memory();
        harness.preload("attendee", vec![Row::from_pairs([("name", "Zed")])]);
        assert!(harness.is_at_baseline());
        assert_eq!(harness.store().count("attendee"), 1);
    }
}
