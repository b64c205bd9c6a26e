//! Application API client

use reqwest::header;

use crate::client::HttpClient;
use crate::error::ClientError;
use crate::jobs::JobUrl;
use crate::models::{Application, ListResponse, Package, Process};
use crate::warnings::Warnings;

impl HttpClient {
    /// List applications matching the given names within a space
    pub async fn get_applications(
        &self,
        names: &[String],
        space_guid: &str,
    ) -> (Result<Vec<Application>, ClientError>, Warnings) {
        let query = [
            ("names", names.join(",")),
            ("space_guids", space_guid.to_string()),
        ];
        let (response, warnings) = self.get::<ListResponse<Application>>("/v3/apps", &query).await;
        (response.map(|list| list.resources), warnings)
    }

    /// List the processes of an application
    pub async fn get_application_processes(
        &self,
        app_guid: &str,
    ) -> (Result<Vec<Process>, ClientError>, Warnings) {
        let path = format!("/v3/apps/{}/processes", app_guid);
        let (response, warnings) = self.get::<ListResponse<Process>>(&path, &[]).await;
        (response.map(|list| list.resources), warnings)
    }

    /// List the packages of an application
    pub async fn get_packages(&self, app_guid: &str) -> (Result<Vec<Package>, ClientError>, Warnings) {
        let query = [("app_guids", app_guid.to_string())];
        let (response, warnings) = self.get::<ListResponse<Package>>("/v3/packages", &query).await;
        (response.map(|list| list.resources), warnings)
    }

    /// Start an application
    pub async fn update_application_start(
        &self,
        app_guid: &str,
    ) -> (Result<Application, ClientError>, Warnings) {
        self.application_action(app_guid, "start").await
    }

    /// Stop an application
    pub async fn update_application_stop(
        &self,
        app_guid: &str,
    ) -> (Result<Application, ClientError>, Warnings) {
        self.application_action(app_guid, "stop").await
    }

    /// Restart an application
    pub async fn update_application_restart(
        &self,
        app_guid: &str,
    ) -> (Result<Application, ClientError>, Warnings) {
        self.application_action(app_guid, "restart").await
    }

    /// Delete an application, returning the job tracking the deletion
    pub async fn delete_application(&self, app_guid: &str) -> (Result<JobUrl, ClientError>, Warnings) {
        let path = format!("/v3/apps/{}", app_guid);
        let (response, warnings) = self.delete(&path).await;

        let job_url = response.map(|response| {
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(JobUrl::from)
                .unwrap_or_default()
        });
        (job_url, warnings)
    }

    async fn application_action(
        &self,
        app_guid: &str,
        action: &str,
    ) -> (Result<Application, ClientError>, Warnings) {
        let path = format!("/v3/apps/{}/actions/{}", app_guid, action);
        self.post(&path, &serde_json::json!({})).await
    }
}
