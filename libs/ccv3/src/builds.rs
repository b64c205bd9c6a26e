//! Build and droplet API client

use crate::client::HttpClient;
use crate::error::ClientError;
use crate::models::{Build, CreateBuildRequest, Droplet, Relationship};
use crate::warnings::Warnings;

impl HttpClient {
    /// Submit a build for a package
    pub async fn create_build(&self, package_guid: &str) -> (Result<Build, ClientError>, Warnings) {
        let body = CreateBuildRequest {
            package: Relationship {
                guid: package_guid.to_string(),
            },
        };
        self.post("/v3/builds", &body).await
    }

    /// Get a build
    pub async fn get_build(&self, build_guid: &str) -> (Result<Build, ClientError>, Warnings) {
        let path = format!("/v3/builds/{}", build_guid);
        self.get(&path, &[]).await
    }

    /// Get a droplet
    pub async fn get_droplet(&self, droplet_guid: &str) -> (Result<Droplet, ClientError>, Warnings) {
        let path = format!("/v3/droplets/{}", droplet_guid);
        self.get(&path, &[]).await
    }
}
