//! Outbound message types
//!
//! One message per surviving dispatch group, handed to the transport
//! collaborator fully formed. Immutable after construction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market::{MarketEvaluationPointType, ProcessType, SettlementMethod};

/// Aggregated time series prepared by a dispatch strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Result-category tag, e.g. `flex_consumption`
    pub aggregation_type: String,
    pub grid_area: String,
    pub balance_responsible_id: String,
    pub energy_supplier_id: String,
    pub evaluation_point_type: MarketEvaluationPointType,
    pub settlement_method: SettlementMethod,
    pub process_type: ProcessType,
    /// Group quantities, index = chronological position
    pub quantities: Vec<Decimal>,
    pub time_interval_start: DateTime<Utc>,
    pub time_interval_end: DateTime<Utc>,
    pub sender_id: String,
    pub receiver_id: String,
    /// Present when every row in the group reported the same quality
    pub aggregated_quality: Option<String>,
}
