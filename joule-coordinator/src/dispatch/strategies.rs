//! Dispatch strategies
//!
//! Each strategy encodes one result category's market rules: how rows are
//! grouped, which groups are excluded, and who receives the message. The
//! common shape is group -> take the first row for the shared key fields ->
//! filter -> one message per surviving group.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use joule_core::domain::market::{
    MarketEvaluationPointType, ProcessType, ResultCategory, SettlementMethod,
};
use joule_core::domain::message::OutboundMessage;
use joule_core::domain::result_row::ResultRow;

use crate::dispatch::{
    DispatchError, DispatchStrategy, GlnRegistry, SpecialOwnershipRegistry, aggregated_quality,
    group_by, ordered_quantities,
};

/// Hourly (non-profiled) consumption per supplier per grid area
pub struct HourlyConsumptionStrategy {
    glns: Arc<GlnRegistry>,
}

/// Flex-settled consumption per supplier per grid area
///
/// Groups where the supplier is the grid-loss owner are suppressed: the
/// grid-loss volume is settled through a separate correction series.
pub struct FlexConsumptionStrategy {
    glns: Arc<GlnRegistry>,
    ownership: Arc<SpecialOwnershipRegistry>,
}

/// Hourly production per {grid area, BRP, supplier}
///
/// Both the BRP and the supplier receive the result.
pub struct HourlyProductionStrategy {
    glns: Arc<GlnRegistry>,
}

/// Hourly production adjusted with system correction and grid loss
///
/// Emitted only for the supplier owning system correction in the grid area
/// at the interval start.
pub struct AdjustedHourlyProductionStrategy {
    glns: Arc<GlnRegistry>,
    ownership: Arc<SpecialOwnershipRegistry>,
}

/// Total consumption per grid area
///
/// The grid-area operator and the system operator each receive a message.
pub struct TotalConsumptionStrategy {
    glns: Arc<GlnRegistry>,
}

/// Net exchange per grid area
pub struct ExchangeStrategy {
    glns: Arc<GlnRegistry>,
}

impl HourlyConsumptionStrategy {
    pub fn new(glns: Arc<GlnRegistry>) -> Self {
        Self { glns }
    }
}

impl DispatchStrategy for HourlyConsumptionStrategy {
    fn category(&self) -> ResultCategory {
        ResultCategory::HourlyConsumption
    }

    fn prepare_messages(
        &self,
        rows: &[ResultRow],
        process_type: ProcessType,
        interval_start: DateTime<Utc>,
        interval_end: DateTime<Utc>,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        let mut messages = Vec::new();
        for (supplier, supplier_rows) in group_by(rows, |r| r.energy_supplier_id.clone()) {
            for (_grid_area, group) in group_by(supplier_rows, |r| r.grid_area.clone()) {
                let first = group[0];
                let receiver = self.glns.resolve_party(&supplier)?;
                messages.push(build_message(
                    self.category(),
                    first,
                    &group,
                    process_type,
                    MarketEvaluationPointType::Consumption,
                    SettlementMethod::NonProfiled,
                    interval_start,
                    interval_end,
                    self.glns.sender_gln(),
                    receiver,
                ));
            }
        }
        Ok(messages)
    }
}

impl FlexConsumptionStrategy {
    pub fn new(glns: Arc<GlnRegistry>, ownership: Arc<SpecialOwnershipRegistry>) -> Self {
        Self { glns, ownership }
    }
}

impl DispatchStrategy for FlexConsumptionStrategy {
    fn category(&self) -> ResultCategory {
        ResultCategory::FlexConsumption
    }

    fn prepare_messages(
        &self,
        rows: &[ResultRow],
        process_type: ProcessType,
        interval_start: DateTime<Utc>,
        interval_end: DateTime<Utc>,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        let mut messages = Vec::new();
        for (supplier, supplier_rows) in group_by(rows, |r| r.energy_supplier_id.clone()) {
            for (grid_area, group) in group_by(supplier_rows, |r| r.grid_area.clone()) {
                if self.ownership.grid_loss_owner(&grid_area) == Some(supplier.as_str()) {
                    continue;
                }
                let first = group[0];
                let receiver = self.glns.resolve_party(&supplier)?;
                messages.push(build_message(
                    self.category(),
                    first,
                    &group,
                    process_type,
                    MarketEvaluationPointType::Consumption,
                    SettlementMethod::FlexSettled,
                    interval_start,
                    interval_end,
                    self.glns.sender_gln(),
                    receiver,
                ));
            }
        }
        Ok(messages)
    }
}

impl HourlyProductionStrategy {
    pub fn new(glns: Arc<GlnRegistry>) -> Self {
        Self { glns }
    }
}

impl DispatchStrategy for HourlyProductionStrategy {
    fn category(&self) -> ResultCategory {
        ResultCategory::HourlyProduction
    }

    fn prepare_messages(
        &self,
        rows: &[ResultRow],
        process_type: ProcessType,
        interval_start: DateTime<Utc>,
        interval_end: DateTime<Utc>,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        let mut messages = Vec::new();
        let groups = group_by(rows, |r| {
            (
                r.grid_area.clone(),
                r.balance_responsible_id.clone(),
                r.energy_supplier_id.clone(),
            )
        });
        for ((_, brp, supplier), group) in groups {
            let first = group[0];
            for receiver_party in [&brp, &supplier] {
                let receiver = self.glns.resolve_party(receiver_party)?;
                messages.push(build_message(
                    self.category(),
                    first,
                    &group,
                    process_type,
                    MarketEvaluationPointType::Production,
                    SettlementMethod::Ignored,
                    interval_start,
                    interval_end,
                    self.glns.sender_gln(),
                    receiver,
                ));
            }
        }
        Ok(messages)
    }
}

impl AdjustedHourlyProductionStrategy {
    pub fn new(glns: Arc<GlnRegistry>, ownership: Arc<SpecialOwnershipRegistry>) -> Self {
        Self { glns, ownership }
    }
}

impl DispatchStrategy for AdjustedHourlyProductionStrategy {
    fn category(&self) -> ResultCategory {
        ResultCategory::AdjustedHourlyProduction
    }

    fn prepare_messages(
        &self,
        rows: &[ResultRow],
        process_type: ProcessType,
        interval_start: DateTime<Utc>,
        interval_end: DateTime<Utc>,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        let mut messages = Vec::new();
        for (supplier, supplier_rows) in group_by(rows, |r| r.energy_supplier_id.clone()) {
            for (grid_area, group) in group_by(supplier_rows, |r| r.grid_area.clone()) {
                let owner = self.ownership.system_correction_owner(&grid_area, interval_start);
                if owner != Some(supplier.as_str()) {
                    continue;
                }
                let first = group[0];
                let receiver = self.glns.distribution_item(&grid_area)?;
                messages.push(build_message(
                    self.category(),
                    first,
                    &group,
                    process_type,
                    MarketEvaluationPointType::Production,
                    SettlementMethod::Ignored,
                    interval_start,
                    interval_end,
                    self.glns.sender_gln(),
                    receiver,
                ));
            }
        }
        Ok(messages)
    }
}

impl TotalConsumptionStrategy {
    pub fn new(glns: Arc<GlnRegistry>) -> Self {
        Self { glns }
    }
}

impl DispatchStrategy for TotalConsumptionStrategy {
    fn category(&self) -> ResultCategory {
        ResultCategory::TotalConsumption
    }

    fn prepare_messages(
        &self,
        rows: &[ResultRow],
        process_type: ProcessType,
        interval_start: DateTime<Utc>,
        interval_end: DateTime<Utc>,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        let mut messages = Vec::new();
        for (grid_area, group) in group_by(rows, |r| r.grid_area.clone()) {
            let first = group[0];
            let distribution = self.glns.distribution_item(&grid_area)?;
            for receiver in [distribution, self.glns.system_operator_gln()] {
                messages.push(build_message(
                    self.category(),
                    first,
                    &group,
                    process_type,
                    MarketEvaluationPointType::Consumption,
                    SettlementMethod::Ignored,
                    interval_start,
                    interval_end,
                    self.glns.sender_gln(),
                    receiver,
                ));
            }
        }
        Ok(messages)
    }
}

impl ExchangeStrategy {
    pub fn new(glns: Arc<GlnRegistry>) -> Self {
        Self { glns }
    }
}

impl DispatchStrategy for ExchangeStrategy {
    fn category(&self) -> ResultCategory {
        ResultCategory::Exchange
    }

    fn prepare_messages(
        &self,
        rows: &[ResultRow],
        process_type: ProcessType,
        interval_start: DateTime<Utc>,
        interval_end: DateTime<Utc>,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        let mut messages = Vec::new();
        for (grid_area, group) in group_by(rows, |r| r.grid_area.clone()) {
            let first = group[0];
            let receiver = self.glns.distribution_item(&grid_area)?;
            messages.push(build_message(
                self.category(),
                first,
                &group,
                process_type,
                MarketEvaluationPointType::Exchange,
                SettlementMethod::Ignored,
                interval_start,
                interval_end,
                self.glns.sender_gln(),
                receiver,
            ));
        }
        Ok(messages)
    }
}

/// Constructs one message for a surviving group
///
/// Key fields are sourced from the group's first row; quantities follow
/// chronological observation order.
#[allow(clippy::too_many_arguments)]
fn build_message(
    category: ResultCategory,
    first: &ResultRow,
    group: &[&ResultRow],
    process_type: ProcessType,
    evaluation_point_type: MarketEvaluationPointType,
    settlement_method: SettlementMethod,
    interval_start: DateTime<Utc>,
    interval_end: DateTime<Utc>,
    sender: &str,
    receiver: &str,
) -> OutboundMessage {
    OutboundMessage {
        aggregation_type: category.result_name().to_string(),
        grid_area: first.grid_area.clone(),
        balance_responsible_id: first.balance_responsible_id.clone(),
        energy_supplier_id: first.energy_supplier_id.clone(),
        evaluation_point_type,
        settlement_method,
        process_type,
        quantities: ordered_quantities(group),
        time_interval_start: interval_start,
        time_interval_end: interval_end,
        sender_id: sender.to_string(),
        receiver_id: receiver.to_string(),
        aggregated_quality: aggregated_quality(group),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal::Decimal;

    pub(crate) fn row(
        grid_area: &str,
        supplier: &str,
        brp: &str,
        start: &str,
        quantity: i64,
    ) -> ResultRow {
        ResultRow {
            job_id: "job".to_string(),
            snapshot_id: "snapshot".to_string(),
            result_id: "result".to_string(),
            result_name: "test".to_string(),
            grid_area: grid_area.to_string(),
            in_grid_area: None,
            out_grid_area: None,
            balance_responsible_id: brp.to_string(),
            energy_supplier_id: supplier.to_string(),
            start_datetime: start.parse().unwrap(),
            end_datetime: start.parse().unwrap(),
            resolution: "PT1H".to_string(),
            sum_quantity: Decimal::from(quantity),
            quality: "A04".to_string(),
            metering_point_type: "E17".to_string(),
            settlement_method: "E02".to_string(),
        }
    }

    fn glns() -> Arc<GlnRegistry> {
        Arc::new(
            GlnRegistry::new("5790001330552", "5790002000000", "5790003000000")
                .with_party("8510000000004", "5798000000001")
                .with_party("8510000000005", "5798000000002")
                .with_party("8520000000005", "5798000000003")
                .with_grid_area("500", "5799999933318")
                .with_grid_area("501", "5799999933319"),
        )
    }

    fn interval() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            "2020-10-02T03:00:00Z".parse().unwrap(),
            "2020-10-03T04:00:00Z".parse().unwrap(),
        )
    }

    #[test]
    fn test_hourly_consumption_single_group() {
        // Two observations for one supplier in one grid area yield exactly
        // one message with both quantities in chronological order.
        let rows = vec![
            row("500", "8510000000004", "8520000000005", "2020-10-02T04:00:00Z", 64),
            row("500", "8510000000004", "8520000000005", "2020-10-02T03:00:00Z", 96),
        ];
        let (start, end) = interval();
        let strategy = HourlyConsumptionStrategy::new(glns());

        let messages = strategy
            .prepare_messages(&rows, ProcessType::BalanceFixing, start, end)
            .unwrap();

        assert_eq!(messages.len(), 1);
        let message = &messages[0];
        assert_eq!(message.grid_area, "500");
        assert_eq!(message.balance_responsible_id, "8520000000005");
        assert_eq!(message.energy_supplier_id, "8510000000004");
        assert_eq!(message.quantities.len(), 2);
        assert_eq!(message.quantities[0], Decimal::from(96));
        assert_eq!(message.quantities[1], Decimal::from(64));
        assert_eq!(message.receiver_id, "5798000000001");
        assert_eq!(message.sender_id, "5790001330552");
        assert_eq!(message.settlement_method, SettlementMethod::NonProfiled);
        assert_eq!(
            message.evaluation_point_type,
            MarketEvaluationPointType::Consumption
        );
        assert_eq!(message.process_type, ProcessType::BalanceFixing);
        assert_eq!(message.time_interval_start, start);
        assert_eq!(message.time_interval_end, end);
    }

    #[test]
    fn test_message_count_equals_innermost_group_count() {
        let rows = vec![
            row("500", "8510000000004", "b", "2020-10-02T03:00:00Z", 1),
            row("501", "8510000000004", "b", "2020-10-02T03:00:00Z", 2),
            row("500", "8510000000005", "b", "2020-10-02T03:00:00Z", 3),
            row("501", "8510000000005", "b", "2020-10-02T03:00:00Z", 4),
        ];
        let (start, end) = interval();
        let strategy = HourlyConsumptionStrategy::new(glns());

        let messages = strategy
            .prepare_messages(&rows, ProcessType::Aggregation, start, end)
            .unwrap();

        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn test_empty_rows_produce_no_messages() {
        let (start, end) = interval();
        let strategy = HourlyConsumptionStrategy::new(glns());
        let messages = strategy
            .prepare_messages(&[], ProcessType::Aggregation, start, end)
            .unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_unknown_supplier_aborts_preparation() {
        let rows = vec![row("500", "unregistered", "b", "2020-10-02T03:00:00Z", 1)];
        let (start, end) = interval();
        let strategy = HourlyConsumptionStrategy::new(glns());

        let err = strategy
            .prepare_messages(&rows, ProcessType::Aggregation, start, end)
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownParty(_)));
    }

    #[test]
    fn test_flex_consumption_suppresses_grid_loss_owner() {
        let ownership = Arc::new(
            SpecialOwnershipRegistry::new().with_grid_loss_owner("500", "8510000000004"),
        );
        let rows = vec![
            row("500", "8510000000004", "b", "2020-10-02T03:00:00Z", 1),
            row("500", "8510000000005", "b", "2020-10-02T03:00:00Z", 2),
        ];
        let (start, end) = interval();
        let strategy = FlexConsumptionStrategy::new(glns(), ownership);

        let messages = strategy
            .prepare_messages(&rows, ProcessType::Aggregation, start, end)
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].energy_supplier_id, "8510000000005");
        assert_eq!(messages[0].settlement_method, SettlementMethod::FlexSettled);
    }

    #[test]
    fn test_flex_consumption_sole_owner_group_yields_nothing() {
        let ownership = Arc::new(
            SpecialOwnershipRegistry::new().with_grid_loss_owner("500", "8510000000004"),
        );
        let rows = vec![row("500", "8510000000004", "b", "2020-10-02T03:00:00Z", 1)];
        let (start, end) = interval();
        let strategy = FlexConsumptionStrategy::new(glns(), ownership);

        let messages = strategy
            .prepare_messages(&rows, ProcessType::Aggregation, start, end)
            .unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_hourly_production_fans_out_to_brp_and_supplier() {
        let rows = vec![
            row("500", "8510000000004", "8520000000005", "2020-10-02T03:00:00Z", 10),
            row("500", "8510000000004", "8520000000005", "2020-10-02T04:00:00Z", 11),
        ];
        let (start, end) = interval();
        let strategy = HourlyProductionStrategy::new(glns());

        let messages = strategy
            .prepare_messages(&rows, ProcessType::BalanceFixing, start, end)
            .unwrap();

        assert_eq!(messages.len(), 2);
        let receivers: Vec<&str> = messages.iter().map(|m| m.receiver_id.as_str()).collect();
        assert!(receivers.contains(&"5798000000003")); // BRP
        assert!(receivers.contains(&"5798000000001")); // supplier
        for message in &messages {
            assert_eq!(
                message.evaluation_point_type,
                MarketEvaluationPointType::Production
            );
            assert_eq!(message.quantities.len(), 2);
        }
    }

    #[test]
    fn test_adjusted_production_emits_only_for_correction_owner() {
        let (start, end) = interval();
        let ownership = Arc::new(SpecialOwnershipRegistry::new().with_system_correction_owner(
            "500",
            "8510000000004",
            start,
        ));
        let rows = vec![
            row("500", "8510000000004", "b", "2020-10-02T03:00:00Z", 1),
            row("500", "8510000000005", "b", "2020-10-02T03:00:00Z", 2),
        ];
        let strategy = AdjustedHourlyProductionStrategy::new(glns(), ownership);

        let messages = strategy
            .prepare_messages(&rows, ProcessType::Aggregation, start, end)
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].energy_supplier_id, "8510000000004");
        assert_eq!(messages[0].receiver_id, "5799999933318");
    }

    #[test]
    fn test_adjusted_production_uses_owner_effective_at_interval_start() {
        let (start, end) = interval();
        // Ownership moved away from the supplier before the interval.
        let ownership = Arc::new(
            SpecialOwnershipRegistry::new()
                .with_system_correction_owner(
                    "500",
                    "8510000000004",
                    "2020-01-01T00:00:00Z".parse().unwrap(),
                )
                .with_system_correction_owner(
                    "500",
                    "8510000000005",
                    "2020-06-01T00:00:00Z".parse().unwrap(),
                ),
        );
        let rows = vec![row("500", "8510000000004", "b", "2020-10-02T03:00:00Z", 1)];
        let strategy = AdjustedHourlyProductionStrategy::new(glns(), ownership);

        let messages = strategy
            .prepare_messages(&rows, ProcessType::Aggregation, start, end)
            .unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_total_consumption_fans_out_per_grid_area() {
        let rows = vec![
            row("500", "", "", "2020-10-02T03:00:00Z", 100),
            row("501", "", "", "2020-10-02T03:00:00Z", 200),
        ];
        let (start, end) = interval();
        let strategy = TotalConsumptionStrategy::new(glns());

        let messages = strategy
            .prepare_messages(&rows, ProcessType::BalanceFixing, start, end)
            .unwrap();

        // Two recipients per grid area.
        assert_eq!(messages.len(), 4);
        let to_system_operator = messages
            .iter()
            .filter(|m| m.receiver_id == "5790003000000")
            .count();
        assert_eq!(to_system_operator, 2);
    }

    #[test]
    fn test_exchange_groups_by_grid_area() {
        let rows = vec![
            row("500", "", "", "2020-10-03T07:00:00Z", -32),
            row("500", "", "", "2020-10-03T08:00:00Z", 12),
        ];
        let (start, end) = interval();
        let strategy = ExchangeStrategy::new(glns());

        let messages = strategy
            .prepare_messages(&rows, ProcessType::Aggregation, start, end)
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].evaluation_point_type,
            MarketEvaluationPointType::Exchange
        );
        assert_eq!(messages[0].quantities[0], Decimal::from(-32));
        assert_eq!(messages[0].receiver_id, "5799999933318");
    }
}
