//! CIM document building
//!
//! Transforms a flat result set into `NotifyAggregatedTimeSeries` market
//! documents: one document per grid area, one series per result name inside
//! it, one period per series, points in strict chronological order with
//! positions 1..N. Output is deterministic given deterministic input
//! ordering and the injected clock and id generator.

pub mod xml;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use joule_core::domain::market::ProcessType;
use joule_core::domain::result_row::ResultRow;

// Fixed codes of the NotifyAggregatedTimeSeries document family.
const DOCUMENT_TYPE: &str = "E31";
const BUSINESS_SECTOR_ELECTRICITY: &str = "23";
const SENDER_ROLE: &str = "DGL";
const PRODUCT_ACTIVE_ENERGY: &str = "8716867000030";
const UNIT_KWH: &str = "KWH";
const SERIES_VERSION: &str = "1";

/// Source of the document creation timestamp
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of unique message and series ids
pub trait MessageIds: Send + Sync {
    fn next(&self) -> String;
}

/// Random UUID ids
#[derive(Debug, Default)]
pub struct UuidMessageIds;

impl MessageIds for UuidMessageIds {
    fn next(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Per-request context the builder cannot derive from row data
#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub process_type: ProcessType,
    pub receiver_id: String,
    /// Receiver market role code, e.g. `MDR`
    pub receiver_role: String,
    /// Declared period interval; taken from the request, not from rows
    pub interval_start: DateTime<Utc>,
    pub interval_end: DateTime<Utc>,
}

/// One market document per (grid area) group
#[derive(Debug, Clone, PartialEq)]
pub struct CimDocument {
    pub message_id: String,
    pub type_code: String,
    pub process_type_code: String,
    pub business_sector_code: String,
    pub sender_id: String,
    pub sender_role: String,
    pub receiver_id: String,
    pub receiver_role: String,
    pub created: DateTime<Utc>,
    pub series: Vec<Series>,
}

/// One series per result name within a grid area
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub id: String,
    pub version: String,
    pub result_name: String,
    pub grid_area: String,
    pub metering_point_type: String,
    pub settlement_method: String,
    pub product_code: String,
    pub quantity_unit: String,
    pub period: Period,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub resolution: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Contiguous 1-based position, assigned by ascending observation start
    pub position: usize,
    pub quantity: Decimal,
    pub quality: String,
}

/// Builds CIM documents from flat result rows
pub struct CimDocumentBuilder {
    sender_id: String,
    clock: Box<dyn Clock>,
    ids: Box<dyn MessageIds>,
}

impl CimDocumentBuilder {
    pub fn new(sender_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            clock: Box::new(SystemClock),
            ids: Box::new(UuidMessageIds),
        }
    }

    /// Replaces the clock, for deterministic output
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replaces the id generator, for deterministic output
    pub fn with_ids(mut self, ids: impl MessageIds + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Builds one document per grid area present in `rows`
    ///
    /// Rows are grouped by grid area, then by result name within each grid
    /// area; both levels iterate in key order so output is deterministic.
    pub fn build_documents(&self, rows: &[ResultRow], context: &DocumentContext) -> Vec<CimDocument> {
        let mut by_grid_area: BTreeMap<&str, BTreeMap<&str, Vec<&ResultRow>>> = BTreeMap::new();
        for row in rows {
            by_grid_area
                .entry(row.grid_area.as_str())
                .or_default()
                .entry(row.result_name.as_str())
                .or_default()
                .push(row);
        }

        by_grid_area
            .into_iter()
            .map(|(grid_area, by_result_name)| CimDocument {
                message_id: self.ids.next(),
                type_code: DOCUMENT_TYPE.to_string(),
                process_type_code: context.process_type.code().to_string(),
                business_sector_code: BUSINESS_SECTOR_ELECTRICITY.to_string(),
                sender_id: self.sender_id.clone(),
                sender_role: SENDER_ROLE.to_string(),
                receiver_id: context.receiver_id.clone(),
                receiver_role: context.receiver_role.clone(),
                created: self.clock.now(),
                series: by_result_name
                    .into_iter()
                    .map(|(result_name, group)| self.build_series(grid_area, result_name, group, context))
                    .collect(),
            })
            .collect()
    }

    fn build_series(
        &self,
        grid_area: &str,
        result_name: &str,
        mut group: Vec<&ResultRow>,
        context: &DocumentContext,
    ) -> Series {
        // Stable sort: rows sharing a start time keep input order.
        group.sort_by_key(|r| r.start_datetime);
        let first = group[0];

        Series {
            id: self.ids.next(),
            version: SERIES_VERSION.to_string(),
            result_name: result_name.to_string(),
            grid_area: grid_area.to_string(),
            metering_point_type: first.metering_point_type.clone(),
            settlement_method: first.settlement_method.clone(),
            product_code: PRODUCT_ACTIVE_ENERGY.to_string(),
            quantity_unit: UNIT_KWH.to_string(),
            period: Period {
                resolution: first.resolution.clone(),
                start: context.interval_start,
                end: context.interval_end,
                points: group
                    .iter()
                    .enumerate()
                    .map(|(index, row)| Point {
                        position: index + 1,
                        quantity: row.sum_quantity,
                        quality: row.quality.clone(),
                    })
                    .collect(),
            },
        }
    }
}
