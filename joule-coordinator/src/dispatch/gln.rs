//! GLN / recipient resolution
//!
//! Pure lookups from market-participant and grid-area identifiers to GLN
//! routing identifiers. The registry is immutable once built; a refresh from
//! an external source builds a new registry and swaps the `Arc`, it never
//! mutates in place.

use std::collections::HashMap;

use crate::dispatch::DispatchError;

/// Recipient routing table
#[derive(Debug, Clone)]
pub struct GlnRegistry {
    sender_gln: String,
    esett_gln: String,
    system_operator_gln: String,
    /// Market participant id (supplier or BRP) -> GLN
    parties: HashMap<String, String>,
    /// Grid area -> distribution recipient GLN
    grid_areas: HashMap<String, String>,
}

impl GlnRegistry {
    pub fn new(
        sender_gln: impl Into<String>,
        esett_gln: impl Into<String>,
        system_operator_gln: impl Into<String>,
    ) -> Self {
        Self {
            sender_gln: sender_gln.into(),
            esett_gln: esett_gln.into(),
            system_operator_gln: system_operator_gln.into(),
            parties: HashMap::new(),
            grid_areas: HashMap::new(),
        }
    }

    pub fn with_party(mut self, party_id: impl Into<String>, gln: impl Into<String>) -> Self {
        self.parties.insert(party_id.into(), gln.into());
        self
    }

    pub fn with_grid_area(mut self, grid_area: impl Into<String>, gln: impl Into<String>) -> Self {
        self.grid_areas.insert(grid_area.into(), gln.into());
        self
    }

    /// GLN the coordinator sends all messages as
    pub fn sender_gln(&self) -> &str {
        &self.sender_gln
    }

    /// GLN of the ESETT settlement recipient
    pub fn esett_gln(&self) -> &str {
        &self.esett_gln
    }

    /// GLN of the system operator
    pub fn system_operator_gln(&self) -> &str {
        &self.system_operator_gln
    }

    /// Resolves a market participant (supplier or BRP) to its GLN
    ///
    /// A miss is fatal to the enclosing dispatch call: it indicates a data
    /// or configuration gap, not a transient condition.
    pub fn resolve_party(&self, party_id: &str) -> Result<&str, DispatchError> {
        self.parties
            .get(party_id)
            .map(String::as_str)
            .ok_or_else(|| DispatchError::UnknownParty(party_id.to_string()))
    }

    /// Resolves a grid area to its distribution recipient GLN
    pub fn distribution_item(&self, grid_area: &str) -> Result<&str, DispatchError> {
        self.grid_areas
            .get(grid_area)
            .map(String::as_str)
            .ok_or_else(|| DispatchError::UnknownParty(format!("grid area {}", grid_area)))
    }
}
