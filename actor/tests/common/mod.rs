//! Fake collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ccv3::jobs::JobUrl;
use ccv3::models::{Application, Build, Deployment, Droplet, Package, Process, ProcessInstance};
use ccv3::ClientError;
use cfactor::client::{
    ClientResult, CloudControllerClient, LogEnvelope, LogStreamClient, OnConnectCallback, StreamError,
    TailingChannels,
};
use cfactor::config::Config;
use cfactor::{Actor, Warnings};
use secrecy::SecretString;
use tokio::sync::mpsc;

/// Scripted responses for one client method
pub struct Script<T> {
    responses: Mutex<VecDeque<ClientResult<T>>>,
    fallback: Mutex<Option<Box<dyn Fn() -> ClientResult<T> + Send + Sync>>>,
    calls: Mutex<Vec<String>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl<T> Script<T> {
    /// Queue a successful response
    pub fn returns(&self, value: T, warnings: &[&str]) -> &Self {
        self.push((Ok(value), Warnings::from(warnings.to_vec())))
    }

    /// Queue a failed response
    pub fn fails(&self, error: ClientError, warnings: &[&str]) -> &Self {
        self.push((Err(error), Warnings::from(warnings.to_vec())))
    }

    /// Response used once the queue is empty
    pub fn always(&self, respond: impl Fn() -> ClientResult<T> + Send + Sync + 'static) {
        *self.fallback.lock().unwrap() = Some(Box::new(respond));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn push(&self, response: ClientResult<T>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    fn next(&self, name: &str, arg: &str) -> ClientResult<T> {
        self.calls.lock().unwrap().push(arg.to_string());

        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return response;
        }
        match self.fallback.lock().unwrap().as_ref() {
            Some(respond) => respond(),
            None => panic!("unexpected call to {}({})", name, arg),
        }
    }
}

/// Cloud Controller fake; every method panics unless a response was scripted
#[derive(Default)]
pub struct FakeCloudController {
    pub applications: Script<Vec<Application>>,
    pub processes: Script<Vec<Process>>,
    pub instances: Script<Vec<ProcessInstance>>,
    pub packages: Script<Vec<Package>>,
    pub create_build: Script<Build>,
    pub get_build: Script<Build>,
    pub droplet: Script<Droplet>,
    pub start: Script<Application>,
    pub stop: Script<Application>,
    pub restart: Script<Application>,
    pub delete: Script<JobUrl>,
    pub poll_job: Script<()>,
    pub deployment: Script<Deployment>,
    pub cancel_deployment: Script<()>,
}

#[async_trait]
impl CloudControllerClient for FakeCloudController {
    async fn get_applications(&self, names: &[String], space_guid: &str) -> ClientResult<Vec<Application>> {
        self.applications
            .next("get_applications", &format!("{}/{}", names.join(","), space_guid))
    }

    async fn get_application_processes(&self, app_guid: &str) -> ClientResult<Vec<Process>> {
        self.processes.next("get_application_processes", app_guid)
    }

    async fn get_process_instances(&self, process_guid: &str) -> ClientResult<Vec<ProcessInstance>> {
        self.instances.next("get_process_instances", process_guid)
    }

    async fn get_packages(&self, app_guid: &str) -> ClientResult<Vec<Package>> {
        self.packages.next("get_packages", app_guid)
    }

    async fn create_build(&self, package_guid: &str) -> ClientResult<Build> {
        self.create_build.next("create_build", package_guid)
    }

    async fn get_build(&self, build_guid: &str) -> ClientResult<Build> {
        self.get_build.next("get_build", build_guid)
    }

    async fn get_droplet(&self, droplet_guid: &str) -> ClientResult<Droplet> {
        self.droplet.next("get_droplet", droplet_guid)
    }

    async fn update_application_start(&self, app_guid: &str) -> ClientResult<Application> {
        self.start.next("update_application_start", app_guid)
    }

    async fn update_application_stop(&self, app_guid: &str) -> ClientResult<Application> {
        self.stop.next("update_application_stop", app_guid)
    }

    async fn update_application_restart(&self, app_guid: &str) -> ClientResult<Application> {
        self.restart.next("update_application_restart", app_guid)
    }

    async fn delete_application(&self, app_guid: &str) -> ClientResult<JobUrl> {
        self.delete.next("delete_application", app_guid)
    }

    async fn poll_job(&self, job_url: &JobUrl) -> ClientResult<()> {
        self.poll_job.next("poll_job", job_url.as_str())
    }

    async fn get_deployment(&self, deployment_guid: &str) -> ClientResult<Deployment> {
        self.deployment.next("get_deployment", deployment_guid)
    }

    async fn cancel_deployment(&self, deployment_guid: &str) -> ClientResult<()> {
        self.cancel_deployment.next("cancel_deployment", deployment_guid)
    }
}

/// Fixed configuration values
pub struct FakeConfig {
    pub staging_timeout: Duration,
    pub startup_timeout: Duration,
    pub polling_interval: Duration,
    pub dial_timeout: Duration,
    pub access_token: SecretString,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            staging_timeout: Duration::from_secs(60),
            startup_timeout: Duration::from_secs(60),
            polling_interval: Duration::from_millis(1),
            dial_timeout: Duration::from_secs(60),
            access_token: SecretString::from("some-access-token".to_string()),
        }
    }
}

impl Config for FakeConfig {
    fn staging_timeout(&self) -> Duration {
        self.staging_timeout
    }

    fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    fn access_token(&self) -> &SecretString {
        &self.access_token
    }
}

/// Build an actor over the given fakes
pub fn actor(client: &Arc<FakeCloudController>, config: FakeConfig) -> Actor {
    Actor::new(client.clone(), Arc::new(config))
}

/// Log stream fake driven by the test through the returned senders
pub struct FakeLogStream {
    callback: Mutex<Option<OnConnectCallback>>,
    channels: Mutex<Option<TailingChannels>>,
    tailed: Mutex<Vec<(String, String)>>,
}

impl FakeLogStream {
    pub fn new() -> (Self, mpsc::Sender<LogEnvelope>, mpsc::Sender<Option<StreamError>>) {
        let (envelopes_tx, envelopes_rx) = mpsc::channel(64);
        let (errors_tx, errors_rx) = mpsc::channel(64);

        let fake = Self {
            callback: Mutex::new(None),
            channels: Mutex::new(Some((envelopes_rx, errors_rx))),
            tailed: Mutex::new(Vec::new()),
        };
        (fake, envelopes_tx, errors_tx)
    }

    /// Fire the on-connect callback, as the client does on every (re)connect
    pub fn connect(&self) {
        let callback = self.callback.lock().unwrap();
        let callback = callback.as_ref().expect("on-connect callback not registered");
        callback();
    }

    /// `(app_guid, auth_token)` of every `tailing_logs` call
    pub fn tailed(&self) -> Vec<(String, String)> {
        self.tailed.lock().unwrap().clone()
    }
}

impl LogStreamClient for FakeLogStream {
    fn set_on_connect_callback(&self, callback: OnConnectCallback) {
        *self.callback.lock().unwrap() = Some(callback);
    }

    fn tailing_logs(&self, app_guid: &str, auth_token: &str) -> TailingChannels {
        assert!(
            self.callback.lock().unwrap().is_some(),
            "tailing_logs called before the on-connect callback was registered"
        );
        self.tailed
            .lock()
            .unwrap()
            .push((app_guid.to_string(), auth_token.to_string()));
        self.channels
            .lock()
            .unwrap()
            .take()
            .expect("tailing_logs called twice")
    }
}

pub fn envelope(timestamp: i64, payload: &str) -> LogEnvelope {
    LogEnvelope {
        payload: payload.as_bytes().to_vec(),
        message_type: cfactor::client::EnvelopeMessageType::Out,
        timestamp,
        app_id: "some-app-guid".to_string(),
        source_type: "APP/PROC/WEB".to_string(),
        source_instance: "0".to_string(),
    }
}

/// Error the fakes return for transport failures
pub fn transport_error(detail: &str) -> ClientError {
    ClientError::InvalidResponse(detail.to_string())
}
