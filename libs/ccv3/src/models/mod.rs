//! API models

use serde::{Deserialize, Serialize};

/// Reference to another resource by GUID
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub guid: String,
}

/// Paginated list response (only the first page is read)
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub resources: Vec<T>,
}

/// Application state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationState {
    Started,
    #[default]
    Stopped,
}

/// Application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub guid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: ApplicationState,
}

/// Build state
///
/// Anything the server reports besides `STAGED` and `FAILED` is treated as
/// still staging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildState {
    #[default]
    Staging,
    Staged,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Build (a staging attempt for a package)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub state: BuildState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<Relationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub droplet: Option<Relationship>,
}

impl Build {
    /// GUID of the droplet produced by this build, empty until staged
    pub fn droplet_guid(&self) -> &str {
        self.droplet.as_ref().map(|d| d.guid.as_str()).unwrap_or_default()
    }

    /// Server supplied failure detail, empty if none
    pub fn error_detail(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }
}

/// Request body for creating a build
#[derive(Debug, Clone, Serialize)]
pub struct CreateBuildRequest {
    pub package: Relationship,
}

/// Droplet state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DropletState {
    #[default]
    AwaitingUpload,
    ProcessingUpload,
    Staged,
    Copying,
    Failed,
    Expired,
}

/// Droplet (the staged artifact)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Droplet {
    pub guid: String,
    #[serde(default)]
    pub state: DropletState,
    #[serde(default)]
    pub created_at: String,
}

/// Package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub guid: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub created_at: String,
}

/// Process type of the web process
pub const PROCESS_TYPE_WEB: &str = "web";

/// Process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub guid: String,
    #[serde(rename = "type", default)]
    pub process_type: String,
    #[serde(default)]
    pub instances: u32,
}

/// Process instance state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessInstanceState {
    Running,
    Crashed,
    Starting,
    /// Also used for states this client does not know about
    #[default]
    #[serde(other)]
    Down,
}

/// A single instance of a process, as reported by the stats endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInstance {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub state: ProcessInstanceState,
    /// Uptime in seconds
    #[serde(default)]
    pub uptime: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub details: String,
}

/// Deployment status value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatusValue {
    Finalized,
    /// `ACTIVE`, `DEPLOYING` and any other in-progress value
    #[default]
    #[serde(other)]
    Active,
}

/// Why a deployment is in its current status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatusReason {
    Deployed,
    Canceled,
    Superseded,
    #[default]
    #[serde(other)]
    Deploying,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStatus {
    #[serde(default)]
    pub value: DeploymentStatusValue,
    #[serde(default)]
    pub reason: DeploymentStatusReason,
}

/// Rolling deployment of an application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub guid: String,
    #[serde(default)]
    pub status: DeploymentStatus,
    /// Processes created by this deployment (web only)
    #[serde(default)]
    pub new_processes: Vec<Process>,
}

impl Deployment {
    /// Finalized because every new instance is up
    pub fn is_deployed(&self) -> bool {
        self.finalized_as(DeploymentStatusReason::Deployed)
    }

    pub fn finalized_as(&self, reason: DeploymentStatusReason) -> bool {
        self.status.value == DeploymentStatusValue::Finalized && self.status.reason == reason
    }
}

/// Asynchronous job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Processing,
    Polling,
    Complete,
    Failed,
}

/// Asynchronous job
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub guid: String,
    pub state: JobState,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

/// A single error entry in a Cloud Controller error response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

/// Error response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
