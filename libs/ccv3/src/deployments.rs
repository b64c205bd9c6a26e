//! Deployment API client

use crate::client::HttpClient;
use crate::error::ClientError;
use crate::models::Deployment;
use crate::warnings::Warnings;

impl HttpClient {
    /// Get a deployment
    pub async fn get_deployment(&self, deployment_guid: &str) -> (Result<Deployment, ClientError>, Warnings) {
        let path = format!("/v3/deployments/{}", deployment_guid);
        self.get(&path, &[]).await
    }

    /// Cancel a deployment, rolling the application back
    pub async fn cancel_deployment(&self, deployment_guid: &str) -> (Result<(), ClientError>, Warnings) {
        let path = format!("/v3/deployments/{}/actions/cancel", deployment_guid);
        self.post_action(&path, &serde_json::json!({})).await
    }
}
