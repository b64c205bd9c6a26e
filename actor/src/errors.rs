//! Error types for the actor layer

use std::time::Duration;

use ccv3::ClientError;
use thiserror::Error;

use crate::client::StreamError;

/// Main error type for actor operations
#[derive(Error, Debug)]
pub enum ActorError {
    /// Transport or API error from the Cloud Controller, passed through unchanged
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The build reached the FAILED state; carries the server's detail message
    #[error("{0}")]
    StagingFailed(String),

    #[error("All instances of the app crashed")]
    AllInstancesCrashed,

    #[error("Timed out waiting for application '{app_name}' to stage after {timeout:?}")]
    StagingTimeout { app_name: String, timeout: Duration },

    /// The staging task went away before reporting an outcome
    #[error("Staging of application '{app_name}' ended without a result")]
    StagingInterrupted { app_name: String },

    #[error("Timed out waiting for application '{name}' to start")]
    StartupTimeout { name: String },

    #[error("Deployment has been canceled")]
    DeploymentCanceled,

    #[error("Deployment has been superseded")]
    DeploymentSuperseded,

    #[error("App '{name}' not found")]
    ApplicationNotFound { name: String },

    #[error("Package '{guid}' not found in app '{app_name}'")]
    PackageNotFoundInApp { guid: String, app_name: String },

    /// Error reported by the log streaming client
    #[error("Log stream error: {0}")]
    Stream(StreamError),

    #[error("Timed out waiting for connection to the log server")]
    StreamingTimeout,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<anyhow::Error> for ActorError {
    fn from(err: anyhow::Error) -> Self {
        ActorError::Config(err.to_string())
    }
}
