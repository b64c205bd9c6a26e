//! Collaborator interfaces consumed by the actor
//!
//! The actor never talks HTTP or websockets itself. It drives a
//! [`CloudControllerClient`] and a [`LogStreamClient`], which makes both easy
//! to replace with fakes in tests.

use async_trait::async_trait;
use ccv3::jobs::JobUrl;
use ccv3::models::{Application, Build, Deployment, Droplet, Package, Process, ProcessInstance};
use ccv3::{ClientError, HttpClient};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::warnings::Warnings;

/// Result of a Cloud Controller call: the value or error, plus the warnings
/// returned alongside it
pub type ClientResult<T> = (Result<T, ClientError>, Warnings);

/// Cloud Controller operations used by the actor
#[async_trait]
pub trait CloudControllerClient: Send + Sync {
    /// List applications with the given names in a space
    async fn get_applications(&self, names: &[String], space_guid: &str) -> ClientResult<Vec<Application>>;

    async fn get_application_processes(&self, app_guid: &str) -> ClientResult<Vec<Process>>;

    async fn get_process_instances(&self, process_guid: &str) -> ClientResult<Vec<ProcessInstance>>;

    async fn get_packages(&self, app_guid: &str) -> ClientResult<Vec<Package>>;

    async fn create_build(&self, package_guid: &str) -> ClientResult<Build>;

    async fn get_build(&self, build_guid: &str) -> ClientResult<Build>;

    async fn get_droplet(&self, droplet_guid: &str) -> ClientResult<Droplet>;

    async fn update_application_start(&self, app_guid: &str) -> ClientResult<Application>;

    async fn update_application_stop(&self, app_guid: &str) -> ClientResult<Application>;

    async fn update_application_restart(&self, app_guid: &str) -> ClientResult<Application>;

    /// Delete an application; the returned job tracks the deletion
    async fn delete_application(&self, app_guid: &str) -> ClientResult<JobUrl>;

    /// Wait for an asynchronous job to finish
    async fn poll_job(&self, job_url: &JobUrl) -> ClientResult<()>;

    async fn get_deployment(&self, deployment_guid: &str) -> ClientResult<Deployment>;

    async fn cancel_deployment(&self, deployment_guid: &str) -> ClientResult<()>;
}

fn warned<T>((result, warnings): (Result<T, ClientError>, ccv3::Warnings)) -> ClientResult<T> {
    (result, Warnings::from(warnings))
}

#[async_trait]
impl CloudControllerClient for HttpClient {
    async fn get_applications(&self, names: &[String], space_guid: &str) -> ClientResult<Vec<Application>> {
        warned(HttpClient::get_applications(self, names, space_guid).await)
    }

    async fn get_application_processes(&self, app_guid: &str) -> ClientResult<Vec<Process>> {
        warned(HttpClient::get_application_processes(self, app_guid).await)
    }

    async fn get_process_instances(&self, process_guid: &str) -> ClientResult<Vec<ProcessInstance>> {
        warned(HttpClient::get_process_instances(self, process_guid).await)
    }

    async fn get_packages(&self, app_guid: &str) -> ClientResult<Vec<Package>> {
        warned(HttpClient::get_packages(self, app_guid).await)
    }

    async fn create_build(&self, package_guid: &str) -> ClientResult<Build> {
        warned(HttpClient::create_build(self, package_guid).await)
    }

    async fn get_build(&self, build_guid: &str) -> ClientResult<Build> {
        warned(HttpClient::get_build(self, build_guid).await)
    }

    async fn get_droplet(&self, droplet_guid: &str) -> ClientResult<Droplet> {
        warned(HttpClient::get_droplet(self, droplet_guid).await)
    }

    async fn update_application_start(&self, app_guid: &str) -> ClientResult<Application> {
        warned(HttpClient::update_application_start(self, app_guid).await)
    }

    async fn update_application_stop(&self, app_guid: &str) -> ClientResult<Application> {
        warned(HttpClient::update_application_stop(self, app_guid).await)
    }

    async fn update_application_restart(&self, app_guid: &str) -> ClientResult<Application> {
        warned(HttpClient::update_application_restart(self, app_guid).await)
    }

    async fn delete_application(&self, app_guid: &str) -> ClientResult<JobUrl> {
        warned(HttpClient::delete_application(self, app_guid).await)
    }

    async fn poll_job(&self, job_url: &JobUrl) -> ClientResult<()> {
        warned(HttpClient::poll_job(self, job_url).await)
    }

    async fn get_deployment(&self, deployment_guid: &str) -> ClientResult<Deployment> {
        warned(HttpClient::get_deployment(self, deployment_guid).await)
    }

    async fn cancel_deployment(&self, deployment_guid: &str) -> ClientResult<()> {
        warned(HttpClient::cancel_deployment(self, deployment_guid).await)
    }
}

/// Log message type as sent by the log server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeMessageType {
    Out = 1,
    Err = 2,
}

/// Raw log event delivered by a [`LogStreamClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEnvelope {
    pub payload: Vec<u8>,
    pub message_type: EnvelopeMessageType,
    /// Nanoseconds since the Unix epoch
    pub timestamp: i64,
    pub app_id: String,
    pub source_type: String,
    pub source_instance: String,
}

/// Errors surfaced by a [`LogStreamClient`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The connection dropped and the client is reconnecting
    #[error("retrying connection: {0}")]
    Retry(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Other(String),
}

/// Callback invoked by a [`LogStreamClient`] on every (re)connect
pub type OnConnectCallback = Box<dyn Fn() + Send + Sync>;

/// Receivers handed out by [`LogStreamClient::tailing_logs`]. Both close when
/// the client tears the stream down; `None` error entries carry no error.
pub type TailingChannels = (
    mpsc::Receiver<LogEnvelope>,
    mpsc::Receiver<Option<StreamError>>,
);

/// Live log streaming (NOAA-style consumer)
pub trait LogStreamClient: Send + Sync {
    /// Register the callback fired on the initial connect and every reconnect
    fn set_on_connect_callback(&self, callback: OnConnectCallback);

    /// Start tailing the logs of an application
    fn tailing_logs(&self, app_guid: &str, auth_token: &str) -> TailingChannels;
}
