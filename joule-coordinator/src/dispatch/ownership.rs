//! Special ownership resolution
//!
//! Determines which party absorbs grid-loss or system-correction
//! responsibility for a grid area. System-correction ownership is
//! time-varying: ownership can change at a boundary instant, so the lookup
//! is a point-in-time query. Used only as a filter predicate by dispatch
//! strategies; never mutates result rows.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// One system-correction ownership interval
#[derive(Debug, Clone)]
pub struct OwnershipEntry {
    pub owner: String,
    pub valid_from: DateTime<Utc>,
}

/// Grid-loss and system-correction ownership tables
///
/// Immutable once built; refresh by building a new registry and swapping
/// the `Arc`.
#[derive(Debug, Clone, Default)]
pub struct SpecialOwnershipRegistry {
    grid_loss: HashMap<String, String>,
    /// Entries per grid area, kept sorted by `valid_from`
    system_correction: HashMap<String, Vec<OwnershipEntry>>,
}

impl SpecialOwnershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid_loss_owner(
        mut self,
        grid_area: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        self.grid_loss.insert(grid_area.into(), owner.into());
        self
    }

    pub fn with_system_correction_owner(
        mut self,
        grid_area: impl Into<String>,
        owner: impl Into<String>,
        valid_from: DateTime<Utc>,
    ) -> Self {
        let entries = self.system_correction.entry(grid_area.into()).or_default();
        entries.push(OwnershipEntry {
            owner: owner.into(),
            valid_from,
        });
        entries.sort_by_key(|e| e.valid_from);
        self
    }

    /// Party responsible for grid loss in `grid_area`
    pub fn grid_loss_owner(&self, grid_area: &str) -> Option<&str> {
        self.grid_loss.get(grid_area).map(String::as_str)
    }

    /// Party owning system correction in `grid_area`, effective at `at`
    ///
    /// Returns the entry with the latest `valid_from` not after `at`.
    pub fn system_correction_owner(&self, grid_area: &str, at: DateTime<Utc>) -> Option<&str> {
        self.system_correction
            .get(grid_area)?
            .iter()
            .rev()
            .find(|e| e.valid_from <= at)
            .map(|e| e.owner.as_str())
    }
}
