//! Market code enums
//!
//! EDI code values used in outbound messages and CIM documents. Each enum
//! carries its wire code; parsing is fallible since the codes arrive as
//! strings from the engine and the HTTP surface.

use serde::{Deserialize, Serialize};

/// Business process driving an aggregation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessType {
    Aggregation,
    BalanceFixing,
    WholesaleFixing,
    CorrectionSettlement,
}

impl ProcessType {
    /// EDI process code, e.g. `D04` for balance fixing
    pub fn code(self) -> &'static str {
        match self {
            ProcessType::Aggregation => "D03",
            ProcessType::BalanceFixing => "D04",
            ProcessType::WholesaleFixing => "D05",
            ProcessType::CorrectionSettlement => "D32",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProcessType::Aggregation => "Aggregation",
            ProcessType::BalanceFixing => "BalanceFixing",
            ProcessType::WholesaleFixing => "WholesaleFixing",
            ProcessType::CorrectionSettlement => "CorrectionSettlement",
        }
    }
}

impl std::str::FromStr for ProcessType {
    type Err = UnknownCode;

    /// Accepts both the enum name and the EDI code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Aggregation" | "D03" => Ok(ProcessType::Aggregation),
            "BalanceFixing" | "D04" => Ok(ProcessType::BalanceFixing),
            "WholesaleFixing" | "D05" => Ok(ProcessType::WholesaleFixing),
            "CorrectionSettlement" | "D32" => Ok(ProcessType::CorrectionSettlement),
            other => Err(UnknownCode {
                kind: "process type",
                value: other.to_string(),
            }),
        }
    }
}

/// Market evaluation point type of an aggregated series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvaluationPointType {
    Consumption,
    Production,
    Exchange,
}

impl MarketEvaluationPointType {
    pub fn code(self) -> &'static str {
        match self {
            MarketEvaluationPointType::Consumption => "E17",
            MarketEvaluationPointType::Production => "E18",
            MarketEvaluationPointType::Exchange => "E20",
        }
    }
}

/// Settlement method of a consumption series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementMethod {
    FlexSettled,
    NonProfiled,
    /// Not applicable for the series (production, exchange, totals)
    Ignored,
}

impl SettlementMethod {
    /// EDI settlement-method code; `None` when not applicable
    pub fn code(self) -> Option<&'static str> {
        match self {
            SettlementMethod::FlexSettled => Some("D01"),
            SettlementMethod::NonProfiled => Some("E02"),
            SettlementMethod::Ignored => None,
        }
    }
}

/// Result categories produced by the compute engine
///
/// One dispatch strategy exists per category. The storage-path name is the
/// directory segment the engine writes the category's rows under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCategory {
    HourlyConsumption,
    FlexConsumption,
    HourlyProduction,
    AdjustedHourlyProduction,
    TotalConsumption,
    Exchange,
}

impl ResultCategory {
    pub const ALL: [ResultCategory; 6] = [
        ResultCategory::HourlyConsumption,
        ResultCategory::FlexConsumption,
        ResultCategory::HourlyProduction,
        ResultCategory::AdjustedHourlyProduction,
        ResultCategory::TotalConsumption,
        ResultCategory::Exchange,
    ];

    /// Storage-path / result-name string for this category
    pub fn result_name(self) -> &'static str {
        match self {
            ResultCategory::HourlyConsumption => "hourly_consumption",
            ResultCategory::FlexConsumption => "flex_consumption",
            ResultCategory::HourlyProduction => "hourly_production",
            ResultCategory::AdjustedHourlyProduction => "adjusted_hourly_production",
            ResultCategory::TotalConsumption => "total_consumption",
            ResultCategory::Exchange => "net_exchange_per_grid_area",
        }
    }
}

impl std::str::FromStr for ResultCategory {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResultCategory::ALL
            .iter()
            .copied()
            .find(|c| c.result_name() == s)
            .ok_or_else(|| UnknownCode {
                kind: "result category",
                value: s.to_string(),
            })
    }
}

/// Unrecognized code value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCode {
    pub kind: &'static str,
    pub value: String,
}

impl std::fmt::Display for UnknownCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownCode {}
