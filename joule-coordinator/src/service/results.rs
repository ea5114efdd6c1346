//! Result handling
//!
//! Turns one engine output notification into outbound messages: validate the
//! arguments, record a JobResult, capture the storage stream, parse the rows
//! and hand every prepared message to the transport. A failure here is fatal
//! to this result only; other in-flight jobs are unaffected.

use chrono::Utc;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use joule_client::ComputeEngine;
use joule_core::domain::job::JobResult;
use joule_core::domain::market::{ProcessType, ResultCategory};
use joule_core::dto::api::ResultNotification;

use crate::cim;
use crate::cim::{CimDocumentBuilder, DocumentContext};
use crate::error::{CoordinatorError, Result};
use crate::service::CoordinatorService;
use crate::storage;

impl<E: ComputeEngine> CoordinatorService<E> {
    /// Handles one result notification end to end
    pub async fn handle_result(&self, notification: &ResultNotification) -> Result<()> {
        validate(notification)?;

        tracing::info!(
            input_path = %notification.input_path,
            result_id = %notification.result_id,
            process_type = %notification.process_type,
            start_time = %notification.start_time,
            end_time = %notification.end_time,
            "Handling aggregation result"
        );

        match self.process_result(notification).await {
            Ok(sent) => {
                tracing::info!(
                    input_path = %notification.input_path,
                    result_id = %notification.result_id,
                    messages = sent,
                    "Result handled"
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    input_path = %notification.input_path,
                    result_id = %notification.result_id,
                    process_type = %notification.process_type,
                    start_time = %notification.start_time,
                    end_time = %notification.end_time,
                    error = %err,
                    "Failed to handle result"
                );
                Err(err)
            }
        }
    }

    async fn process_result(&self, notification: &ResultNotification) -> Result<usize> {
        let result_name = storage::result_name_from_path(&notification.input_path)
            .ok_or_else(|| {
                CoordinatorError::Validation(format!(
                    "cannot derive result name from path {}",
                    notification.input_path
                ))
            })?;
        let job_id = Uuid::parse_str(&notification.result_id)
            .map_err(|e| CoordinatorError::Validation(format!("result_id: {}", e)))?;

        let mut record = JobResult::new(job_id, &result_name, &notification.input_path);
        self.store.create_result(&record).await?;

        let mut stream = self.results.get_read_stream(&notification.input_path).await?;
        self.update_result_state(&mut record, "Stream captured").await?;

        let process_type: ProcessType = notification
            .process_type
            .parse()
            .map_err(|e| CoordinatorError::Parse(format!("{}", e)))?;
        let category: ResultCategory = result_name
            .parse()
            .map_err(|e| CoordinatorError::Parse(format!("{}", e)))?;

        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).await?;
        let rows = storage::parse_result_rows(&bytes)?;
        self.update_result_state(&mut record, format!("Parsed {} rows", rows.len()))
            .await?;

        let messages = self.dispatch.prepare(
            category,
            &rows,
            process_type,
            notification.start_time,
            notification.end_time,
        )?;
        for message in &messages {
            self.transport.send(message).await?;
        }

        self.update_result_state(&mut record, format!("Dispatched {} messages", messages.len()))
            .await?;
        Ok(messages.len())
    }

    async fn update_result_state(
        &self,
        record: &mut JobResult,
        state: impl Into<String>,
    ) -> Result<()> {
        record.state = state.into();
        record.updated_at = Utc::now();
        self.store.update_result(record).await?;
        Ok(())
    }

    /// Builds CIM XML documents for one result path
    ///
    /// The file-based distribution counterpart to [`Self::handle_result`]:
    /// the same rows, grouped by grid area and result name instead of by
    /// recipient.
    pub async fn build_result_documents(
        &self,
        notification: &ResultNotification,
    ) -> Result<Vec<String>> {
        validate(notification)?;

        let process_type: ProcessType = notification
            .process_type
            .parse()
            .map_err(|e| CoordinatorError::Parse(format!("{}", e)))?;

        let mut stream = self.results.get_read_stream(&notification.input_path).await?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).await?;
        let rows = storage::parse_result_rows(&bytes)?;

        let glns = self.dispatch.glns();
        let context = DocumentContext {
            process_type,
            receiver_id: glns.system_operator_gln().to_string(),
            receiver_role: RECEIVER_ROLE_METER_DATA_RESPONSIBLE.to_string(),
            interval_start: notification.start_time,
            interval_end: notification.end_time,
        };
        let builder = CimDocumentBuilder::new(glns.sender_gln());

        builder
            .build_documents(&rows, &context)
            .iter()
            .map(|document| cim::xml::to_xml(document).map_err(CoordinatorError::from))
            .collect()
    }
}

/// Market role the documents are addressed to
const RECEIVER_ROLE_METER_DATA_RESPONSIBLE: &str = "MDR";

fn validate(notification: &ResultNotification) -> Result<()> {
    if notification.input_path.trim().is_empty() {
        return Err(CoordinatorError::Validation(
            "input_path must not be empty".to_string(),
        ));
    }
    if notification.result_id.trim().is_empty() {
        return Err(CoordinatorError::Validation(
            "result_id must not be empty".to_string(),
        ));
    }
    if notification.process_type.trim().is_empty() {
        return Err(CoordinatorError::Validation(
            "process_type must not be empty".to_string(),
        ));
    }
    if notification.end_time <= notification.start_time {
        return Err(CoordinatorError::Validation(
            "end_time must be after start_time".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use joule_core::dto::engine::ClusterState;

    use crate::service::coordinator::tests::{MockEngine, harness, test_config};

    const ROWS: &str = r#"
        {"job_id": "1", "snapshot_id": "2", "result_id": "3",
         "result_name": "hourly_consumption", "grid_area": "500",
         "balance_responsible_id": "8520000000005",
         "energy_supplier_id": "8510000000004",
         "start_datetime": "2020-10-02T03:00:00Z",
         "end_datetime": "2020-10-02T04:00:00Z",
         "resolution": "PT1H", "sum_quantity": 96, "quality": "A04",
         "metering_point_type": "E17", "settlement_method": "E02"}
        {"job_id": "1", "snapshot_id": "2", "result_id": "3",
         "result_name": "hourly_consumption", "grid_area": "500",
         "balance_responsible_id": "8520000000005",
         "energy_supplier_id": "8510000000004",
         "start_datetime": "2020-10-02T04:00:00Z",
         "end_datetime": "2020-10-02T05:00:00Z",
         "resolution": "PT1H", "sum_quantity": 64, "quality": "A04",
         "metering_point_type": "E17", "settlement_method": "E02"}
    "#;

    fn notification(path: &str) -> ResultNotification {
        ResultNotification {
            input_path: path.to_string(),
            result_id: Uuid::new_v4().to_string(),
            process_type: "BalanceFixing".to_string(),
            start_time: "2020-10-02T03:00:00Z".parse().unwrap(),
            end_time: "2020-10-03T04:00:00Z".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_result_rows_become_outbound_messages() {
        let h = harness(MockEngine::new(ClusterState::Running), test_config());
        let path = "results/job-1/hourly_consumption/part-0000.json";
        h.results.put(path, ROWS.as_bytes().to_vec()).await;

        h.service.handle_result(&notification(path)).await.unwrap();

        let sent = h.transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].quantities.len(), 2);
        assert_eq!(sent[0].receiver_id, "5798000000001");

        let records = h.store.results().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result_name, "hourly_consumption");
        assert_eq!(records[0].state, "Dispatched 1 messages");
    }

    #[tokio::test]
    async fn test_empty_input_path_fails_validation() {
        let h = harness(MockEngine::new(ClusterState::Running), test_config());
        let err = h
            .service
            .handle_result(&notification("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_process_type_fails_parse() {
        let h = harness(MockEngine::new(ClusterState::Running), test_config());
        let path = "results/job-1/hourly_consumption/part-0000.json";
        h.results.put(path, ROWS.as_bytes().to_vec()).await;

        let mut bad = notification(path);
        bad.process_type = "Unheard".to_string();
        let err = h.service.handle_result(&bad).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Parse(_)));
    }

    #[tokio::test]
    async fn test_unknown_result_category_fails_parse() {
        let h = harness(MockEngine::new(ClusterState::Running), test_config());
        let path = "results/job-1/mystery_series/part-0000.json";
        h.results.put(path, ROWS.as_bytes().to_vec()).await;

        let err = h
            .service
            .handle_result(&notification(path))
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Parse(_)));
    }

    #[tokio::test]
    async fn test_missing_object_fails_with_storage_error() {
        let h = harness(MockEngine::new(ClusterState::Running), test_config());
        let err = h
            .service
            .handle_result(&notification("results/job-1/hourly_consumption/missing.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Storage(_)));
    }

    #[tokio::test]
    async fn test_documents_are_built_from_result_rows() {
        let h = harness(MockEngine::new(ClusterState::Running), test_config());
        let path = "results/job-1/hourly_consumption/part-0000.json";
        h.results.put(path, ROWS.as_bytes().to_vec()).await;

        let documents = h
            .service
            .build_result_documents(&notification(path))
            .await
            .unwrap();

        assert_eq!(documents.len(), 1);
        assert!(documents[0].contains("<cim:NotifyAggregatedTimeSeries_MarketDocument"));
        assert!(documents[0].contains("<cim:process.processType>D04</cim:process.processType>"));
        assert!(documents[0].contains("<cim:position>1</cim:position>"));
        assert!(documents[0].contains("<cim:position>2</cim:position>"));
    }

    #[tokio::test]
    async fn test_malformed_rows_fail_parse() {
        let h = harness(MockEngine::new(ClusterState::Running), test_config());
        let path = "results/job-1/hourly_consumption/part-0000.json";
        h.results.put(path, b"{\"job_id\":".to_vec()).await;

        let err = h
            .service
            .handle_result(&notification(path))
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Parse(_)));
    }
}
