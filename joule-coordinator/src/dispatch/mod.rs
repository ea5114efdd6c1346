//! Dispatch strategy engine
//!
//! One strategy per result category. Each consumes raw result rows and
//! produces outbound messages grouped and filtered under that category's
//! market rules. Strategies are pure, single-pass transformations over an
//! in-memory row set and hold no shared mutable state, so they are safely
//! callable concurrently for different jobs.

pub mod gln;
pub mod ownership;
pub mod strategies;
pub mod tables;

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use joule_core::domain::market::{ProcessType, ResultCategory};
use joule_core::domain::message::OutboundMessage;
use joule_core::domain::result_row::ResultRow;

pub use gln::GlnRegistry;
pub use ownership::SpecialOwnershipRegistry;

/// Dispatch preparation errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Recipient or ownership lookup miss; fatal to the enclosing dispatch
    /// call since it indicates a data or configuration gap
    #[error("unknown party: {0}")]
    UnknownParty(String),

    /// No strategy is registered for the result category
    #[error("no dispatch strategy for result category {0:?}")]
    UnknownCategory(ResultCategory),
}

/// One dispatch strategy per result category
pub trait DispatchStrategy: Send + Sync {
    fn category(&self) -> ResultCategory;

    /// Partitions `rows` into per-recipient messages under the category's
    /// grouping and inclusion rules. Returns every message or no message:
    /// an unresolvable recipient aborts the whole preparation, there is no
    /// partial silent drop.
    fn prepare_messages(
        &self,
        rows: &[ResultRow],
        process_type: ProcessType,
        interval_start: DateTime<Utc>,
        interval_end: DateTime<Utc>,
    ) -> Result<Vec<OutboundMessage>, DispatchError>;
}

/// Strategy registry keyed by result category
pub struct DispatchEngine {
    strategies: HashMap<ResultCategory, Box<dyn DispatchStrategy>>,
    glns: Arc<GlnRegistry>,
}

impl DispatchEngine {
    /// Creates the engine with all six strategies registered
    pub fn new(glns: Arc<GlnRegistry>, ownership: Arc<SpecialOwnershipRegistry>) -> Self {
        let all: Vec<Box<dyn DispatchStrategy>> = vec![
            Box::new(strategies::HourlyConsumptionStrategy::new(glns.clone())),
            Box::new(strategies::FlexConsumptionStrategy::new(
                glns.clone(),
                ownership.clone(),
            )),
            Box::new(strategies::HourlyProductionStrategy::new(glns.clone())),
            Box::new(strategies::AdjustedHourlyProductionStrategy::new(
                glns.clone(),
                ownership,
            )),
            Box::new(strategies::TotalConsumptionStrategy::new(glns.clone())),
            Box::new(strategies::ExchangeStrategy::new(glns.clone())),
        ];

        let mut strategies = HashMap::new();
        for strategy in all {
            strategies.insert(strategy.category(), strategy);
        }
        Self { strategies, glns }
    }

    /// Recipient registry shared with the strategies
    pub fn glns(&self) -> &GlnRegistry {
        &self.glns
    }

    /// Prepares messages for one category of rows
    pub fn prepare(
        &self,
        category: ResultCategory,
        rows: &[ResultRow],
        process_type: ProcessType,
        interval_start: DateTime<Utc>,
        interval_end: DateTime<Utc>,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        let strategy = self
            .strategies
            .get(&category)
            .ok_or(DispatchError::UnknownCategory(category))?;
        strategy.prepare_messages(rows, process_type, interval_start, interval_end)
    }
}

// =============================================================================
// Grouping Helpers
// =============================================================================

/// Partitions rows by a key, preserving input order within each group.
///
/// `BTreeMap` keeps group iteration deterministic across runs.
pub(crate) fn group_by<'a, K: Ord>(
    rows: impl IntoIterator<Item = &'a ResultRow>,
    key: impl Fn(&ResultRow) -> K,
) -> BTreeMap<K, Vec<&'a ResultRow>> {
    let mut groups: BTreeMap<K, Vec<&ResultRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(key(row)).or_default().push(row);
    }
    groups
}

/// Group quantities ordered by observation start time
///
/// The sort is stable, so rows sharing a start time keep input order.
pub(crate) fn ordered_quantities(group: &[&ResultRow]) -> Vec<Decimal> {
    let mut rows: Vec<&ResultRow> = group.to_vec();
    rows.sort_by_key(|r| r.start_datetime);
    rows.iter().map(|r| r.sum_quantity).collect()
}

/// Group quality when every row agrees on one
pub(crate) fn aggregated_quality(group: &[&ResultRow]) -> Option<String> {
    let first = group.first()?;
    group
        .iter()
        .all(|r| r.quality == first.quality)
        .then(|| first.quality.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::strategies::tests::row;

    #[test]
    fn test_group_by_preserves_input_order_within_groups() {
        let rows = vec![
            row("500", "s1", "b1", "2020-10-02T03:00:00Z", 1),
            row("501", "s1", "b1", "2020-10-02T03:00:00Z", 2),
            row("500", "s1", "b1", "2020-10-02T04:00:00Z", 3),
        ];
        let groups = group_by(&rows, |r| r.grid_area.clone());
        let in_500: Vec<Decimal> = groups["500"].iter().map(|r| r.sum_quantity).collect();
        assert_eq!(in_500, vec![Decimal::from(1), Decimal::from(3)]);
    }

    #[test]
    fn test_ordered_quantities_sorts_chronologically() {
        let rows = vec![
            row("500", "s1", "b1", "2020-10-02T04:00:00Z", 2),
            row("500", "s1", "b1", "2020-10-02T03:00:00Z", 1),
        ];
        let group: Vec<&ResultRow> = rows.iter().collect();
        assert_eq!(
            ordered_quantities(&group),
            vec![Decimal::from(1), Decimal::from(2)]
        );
    }

    #[test]
    fn test_aggregated_quality_requires_agreement() {
        let mut rows = vec![
            row("500", "s1", "b1", "2020-10-02T03:00:00Z", 1),
            row("500", "s1", "b1", "2020-10-02T04:00:00Z", 2),
        ];
        let group: Vec<&ResultRow> = rows.iter().collect();
        assert_eq!(aggregated_quality(&group), Some("A04".to_string()));

        rows[1].quality = "56".to_string();
        let group: Vec<&ResultRow> = rows.iter().collect();
        assert_eq!(aggregated_quality(&group), None);
    }
}
