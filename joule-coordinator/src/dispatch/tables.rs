//! Party and ownership table loading
//!
//! The recipient and ownership tables are read-only at request time. They
//! are loaded once at startup (and can be reloaded by building fresh
//! registries and swapping the `Arc`s — never by in-place mutation visible
//! to concurrent readers).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::CoordinatorConfig;
use crate::dispatch::{GlnRegistry, SpecialOwnershipRegistry};

/// On-disk shape of the party/ownership tables
#[derive(Debug, Default, Deserialize)]
pub struct PartyTables {
    /// Market participant id (supplier or BRP) -> GLN
    #[serde(default)]
    pub parties: HashMap<String, String>,
    /// Grid area -> distribution recipient GLN
    #[serde(default)]
    pub grid_areas: HashMap<String, String>,
    /// Grid area -> grid-loss owner
    #[serde(default)]
    pub grid_loss_owners: HashMap<String, String>,
    #[serde(default)]
    pub system_correction_owners: Vec<SystemCorrectionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SystemCorrectionEntry {
    pub grid_area: String,
    pub owner: String,
    pub valid_from: DateTime<Utc>,
}

impl PartyTables {
    /// Reads tables from a JSON file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Builds the immutable registries the dispatch engine consumes
    pub fn build_registries(
        self,
        config: &CoordinatorConfig,
    ) -> (Arc<GlnRegistry>, Arc<SpecialOwnershipRegistry>) {
        let mut glns = GlnRegistry::new(
            &config.sender_gln,
            &config.esett_gln,
            &config.system_operator_gln,
        );
        for (party, gln) in self.parties {
            glns = glns.with_party(party, gln);
        }
        for (grid_area, gln) in self.grid_areas {
            glns = glns.with_grid_area(grid_area, gln);
        }

        let mut ownership = SpecialOwnershipRegistry::new();
        for (grid_area, owner) in self.grid_loss_owners {
            ownership = ownership.with_grid_loss_owner(grid_area, owner);
        }
        for entry in self.system_correction_owners {
            ownership =
                ownership.with_system_correction_owner(entry.grid_area, entry.owner, entry.valid_from);
        }

        (Arc::new(glns), Arc::new(ownership))
    }
}
