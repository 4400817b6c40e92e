use serde::Serialize;
use std::fmt;

/// Outcome of loading one batch. Failures are counted, not fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub attempted: usize,
    pub loaded: usize,
    pub failed: usize,
    pub relationships_loaded: usize,
    pub relationships_failed: usize,
    /// Ids of the nodes written, in batch order
    pub ids: Vec<String>,
    /// One line per failure: `"{entity_type}: {error}"`
    pub errors: Vec<String>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.relationships_failed == 0
    }

    /// Count an input that never reached the loader, e.g. an undecodable
    /// line, as an attempted and failed entity.
    pub fn record_rejected(&mut self, error: impl Into<String>) {
        self.attempted += 1;
        self.failed += 1;
        self.errors.push(error.into());
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "loaded {} of {} entities ({} failed), {} relationships ({} failed)",
            self.loaded,
            self.attempted,
            self.failed,
            self.relationships_loaded,
            self.relationships_failed
        )
    }
}
