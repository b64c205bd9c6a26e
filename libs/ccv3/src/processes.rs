//! Process API client

use crate::client::HttpClient;
use crate::error::ClientError;
use crate::models::{ListResponse, ProcessInstance};
use crate::warnings::Warnings;

impl HttpClient {
    /// Get the live instances of a process
    pub async fn get_process_instances(
        &self,
        process_guid: &str,
    ) -> (Result<Vec<ProcessInstance>, ClientError>, Warnings) {
        let path = format!("/v3/processes/{}/stats", process_guid);
        let (response, warnings) = self.get::<ListResponse<ProcessInstance>>(&path, &[]).await;
        (response.map(|list| list.resources), warnings)
    }
}
