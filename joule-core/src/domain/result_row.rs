//! Aggregation result rows
//!
//! One row per (grid area, supplier, BRP, observation window) as written by
//! the compute engine. Rows are immutable once read from storage; grouping
//! only partitions references to them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Flat result row read from engine output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub job_id: String,
    pub snapshot_id: String,
    pub result_id: String,
    pub result_name: String,
    pub grid_area: String,
    /// Set for exchange rows only
    #[serde(default)]
    pub in_grid_area: Option<String>,
    #[serde(default)]
    pub out_grid_area: Option<String>,
    pub balance_responsible_id: String,
    pub energy_supplier_id: String,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub resolution: String,
    pub sum_quantity: Decimal,
    pub quality: String,
    pub metering_point_type: String,
    pub settlement_method: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_engine_row() {
        let json = r#"{
            "job_id": "1",
            "snapshot_id": "2",
            "result_id": "3",
            "result_name": "hourly_consumption",
            "grid_area": "500",
            "balance_responsible_id": "8520000000005",
            "energy_supplier_id": "8510000000004",
            "start_datetime": "2020-10-02T03:00:00Z",
            "end_datetime": "2020-10-02T04:00:00Z",
            "resolution": "PT1H",
            "sum_quantity": 96,
            "quality": "A04",
            "metering_point_type": "E17",
            "settlement_method": "E02"
        }"#;

        let row: ResultRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.grid_area, "500");
        assert_eq!(row.sum_quantity, Decimal::from(96));
        assert!(row.in_grid_area.is_none());
    }

    #[test]
    fn test_deserializes_exchange_row_with_neighbours() {
        let json = r#"{
            "job_id": "1",
            "snapshot_id": "2",
            "result_id": "3",
            "result_name": "net_exchange_per_grid_area",
            "grid_area": "500",
            "in_grid_area": "501",
            "out_grid_area": "502",
            "balance_responsible_id": "",
            "energy_supplier_id": "",
            "start_datetime": "2020-10-03T07:00:00Z",
            "end_datetime": "2020-10-03T08:00:00Z",
            "resolution": "PT1H",
            "sum_quantity": "-32.000",
            "quality": "56",
            "metering_point_type": "E20",
            "settlement_method": ""
        }"#;

        let row: ResultRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.in_grid_area.as_deref(), Some("501"));
        assert_eq!(row.sum_quantity.to_string(), "-32.000");
    }
}
