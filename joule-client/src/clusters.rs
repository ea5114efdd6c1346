//! Cluster-related API endpoints

use serde::{Deserialize, Serialize};

use joule_core::dto::engine::ClusterInfo;

use crate::EngineClient;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct ClusterListResponse {
    #[serde(default)]
    clusters: Vec<ClusterInfo>,
}

#[derive(Debug, Serialize)]
struct ClusterIdRequest<'a> {
    cluster_id: &'a str,
}

impl EngineClient {
    /// List all clusters known to the engine
    pub async fn list_clusters_http(&self) -> Result<Vec<ClusterInfo>> {
        let response = self.get("/api/2.0/clusters/list").send().await?;
        let list: ClusterListResponse = self.handle_response(response).await?;
        Ok(list.clusters)
    }

    /// Start a terminated cluster
    ///
    /// The engine acknowledges the command immediately; callers poll
    /// [`EngineClient::get_cluster_http`] until the cluster reports running.
    pub async fn start_cluster_http(&self, cluster_id: &str) -> Result<()> {
        let response = self
            .post("/api/2.0/clusters/start")
            .json(&ClusterIdRequest { cluster_id })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Get the current state of a cluster
    pub async fn get_cluster_http(&self, cluster_id: &str) -> Result<ClusterInfo> {
        let response = self
            .get("/api/2.0/clusters/get")
            .query(&[("cluster_id", cluster_id)])
            .send()
            .await?;

        self.handle_response(response).await
    }
}
