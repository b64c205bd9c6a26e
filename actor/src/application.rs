//! Application lifecycle: lookup, start/stop/restart, deletion and waiting
//! for processes to come up

use std::ops::Deref;

use ccv3::models::{
    Application, Deployment, DeploymentStatusReason, Process, ProcessInstance, ProcessInstanceState, PROCESS_TYPE_WEB,
};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, error, info, warn};

use crate::actor::Actor;
use crate::errors::ActorError;
use crate::poll::PollTimer;
use crate::warnings::Warnings;

/// Instances of a single process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessInstances(Vec<ProcessInstance>);

impl ProcessInstances {
    pub fn empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn any_running(&self) -> bool {
        self.0.iter().any(|i| i.state == ProcessInstanceState::Running)
    }

    /// True when there is at least one instance and every instance crashed
    pub fn all_crashed(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|i| i.state == ProcessInstanceState::Crashed)
    }

    /// Progress line shown while waiting for the instances
    pub fn details(&self) -> String {
        match self.0.iter().map(|i| i.details.as_str()).find(|d| !d.is_empty()) {
            Some(details) => format!("Error starting instances: '{}'", details),
            None => "Instances starting...".to_string(),
        }
    }
}

impl From<Vec<ProcessInstance>> for ProcessInstances {
    fn from(instances: Vec<ProcessInstance>) -> Self {
        Self(instances)
    }
}

impl Deref for ProcessInstances {
    type Target = [ProcessInstance];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Start time derived from an instance's reported uptime
pub trait InstanceStartTime {
    fn start_time(&self) -> DateTime<Utc>;
}

impl InstanceStartTime for ProcessInstance {
    fn start_time(&self) -> DateTime<Utc> {
        let now = Utc::now();
        i64::try_from(self.uptime)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|uptime| now.checked_sub_signed(uptime))
            .unwrap_or(now)
    }
}

impl Actor {
    /// Look up an application by name within a space
    pub async fn get_application_by_name_and_space(
        &self,
        name: &str,
        space_guid: &str,
    ) -> (Result<Application, ActorError>, Warnings) {
        let mut warnings = Warnings::new();
        let result = self.find_application(name, space_guid, &mut warnings).await;
        (result, warnings)
    }

    async fn find_application(
        &self,
        name: &str,
        space_guid: &str,
        warnings: &mut Warnings,
    ) -> Result<Application, ActorError> {
        let names = [name.to_string()];
        let apps = warnings.absorb(self.client.get_applications(&names, space_guid).await)?;

        apps.into_iter()
            .next()
            .ok_or_else(|| ActorError::ApplicationNotFound { name: name.to_string() })
    }

    pub async fn start_application(&self, app_guid: &str) -> (Result<Application, ActorError>, Warnings) {
        let mut warnings = Warnings::new();
        let result = warnings
            .absorb(self.client.update_application_start(app_guid).await)
            .map_err(ActorError::from);
        (result, warnings)
    }

    pub async fn stop_application(&self, app_guid: &str) -> (Result<Application, ActorError>, Warnings) {
        let mut warnings = Warnings::new();
        let result = warnings
            .absorb(self.client.update_application_stop(app_guid).await)
            .map_err(ActorError::from);
        (result, warnings)
    }

    /// Restart an application and wait for its processes to come up
    pub async fn restart_application<F>(
        &self,
        app: &Application,
        no_wait: bool,
        handle_instance_details: F,
    ) -> (Result<(), ActorError>, Warnings)
    where
        F: FnMut(String) + Send,
    {
        let mut warnings = Warnings::new();

        let restarted = warnings.absorb(self.client.update_application_restart(&app.guid).await);
        if let Err(e) = restarted {
            return (Err(e.into()), warnings);
        }

        let (result, poll_warnings) = self.poll_start(app, no_wait, handle_instance_details).await;
        warnings.append(poll_warnings);
        (result, warnings)
    }

    /// Delete an application and wait for the deletion job to finish
    pub async fn delete_application_by_name_and_space(
        &self,
        name: &str,
        space_guid: &str,
    ) -> (Result<(), ActorError>, Warnings) {
        let mut warnings = Warnings::new();
        let result = self.delete_application(name, space_guid, &mut warnings).await;
        (result, warnings)
    }

    async fn delete_application(&self, name: &str, space_guid: &str, warnings: &mut Warnings) -> Result<(), ActorError> {
        let app = self.find_application(name, space_guid, warnings).await?;

        info!("Deleting app {} ({})", name, app.guid);
        let job_url = warnings.absorb(self.client.delete_application(&app.guid).await)?;
        warnings.absorb(self.client.poll_job(&job_url).await)?;
        Ok(())
    }

    /// Wait until every process of an application is up.
    ///
    /// With `no_wait` only the web process is watched. The callback receives
    /// a progress line for each process on every attempt.
    pub async fn poll_start<F>(
        &self,
        app: &Application,
        no_wait: bool,
        mut handle_instance_details: F,
    ) -> (Result<(), ActorError>, Warnings)
    where
        F: FnMut(String) + Send,
    {
        let mut warnings = Warnings::new();
        let result = self
            .poll_start_inner(app, no_wait, &mut handle_instance_details, &mut warnings)
            .await;
        (result, warnings)
    }

    async fn poll_start_inner<F>(
        &self,
        app: &Application,
        no_wait: bool,
        handle_instance_details: &mut F,
        warnings: &mut Warnings,
    ) -> Result<(), ActorError>
    where
        F: FnMut(String) + Send,
    {
        let mut processes = warnings.absorb(self.client.get_application_processes(&app.guid).await)?;
        if no_wait {
            processes.retain(|p| p.process_type == PROCESS_TYPE_WEB);
        }

        let timeout = self.config.startup_timeout();
        let mut timer = PollTimer::new(timeout, self.config.polling_interval());

        info!("Waiting for {} process(es) of app {} to start", processes.len(), app.name);

        while timer.tick().await {
            if self.poll_processes(&processes, handle_instance_details, warnings).await? {
                return Ok(());
            }
        }

        error!("App {} did not start within {:?}", app.name, timeout);
        Err(ActorError::StartupTimeout { name: app.name.clone() })
    }

    /// Cancel a deployment, rolling the application back to its previous
    /// droplet
    pub async fn cancel_deployment(&self, deployment_guid: &str) -> (Result<(), ActorError>, Warnings) {
        let mut warnings = Warnings::new();
        let result = warnings
            .absorb(self.client.cancel_deployment(deployment_guid).await)
            .map_err(ActorError::from);
        (result, warnings)
    }

    /// Wait for a rolling deployment to bring an application up.
    ///
    /// The deployment is fetched until it is deployed; a canceled or
    /// superseded deployment ends the wait. Once deployed, every process is
    /// polled as in [`Actor::poll_start`]. With `no_wait` the deployment's
    /// new processes are polled right away instead. The deployment is
    /// canceled if the startup timeout passes first.
    pub async fn poll_start_for_rolling<F>(
        &self,
        app: &Application,
        deployment_guid: &str,
        no_wait: bool,
        mut handle_instance_details: F,
    ) -> (Result<(), ActorError>, Warnings)
    where
        F: FnMut(String) + Send,
    {
        let mut warnings = Warnings::new();
        let result = self
            .poll_start_for_rolling_inner(app, deployment_guid, no_wait, &mut handle_instance_details, &mut warnings)
            .await;
        (result, warnings)
    }

    async fn poll_start_for_rolling_inner<F>(
        &self,
        app: &Application,
        deployment_guid: &str,
        no_wait: bool,
        handle_instance_details: &mut F,
        warnings: &mut Warnings,
    ) -> Result<(), ActorError>
    where
        F: FnMut(String) + Send,
    {
        let timeout = self.config.startup_timeout();
        let mut timer = PollTimer::new(timeout, self.config.polling_interval());
        let mut deployed = false;
        let mut processes = Vec::new();

        info!("Waiting for deployment {} of app {}", deployment_guid, app.name);

        while timer.tick().await {
            if !deployed {
                let deployment = self.get_deployment(deployment_guid, warnings).await?;
                deployed = deployment.is_deployed();
                processes = if no_wait {
                    deployment.new_processes
                } else if deployed {
                    // Web processes are already running, so polling all of
                    // them only waits on the rest.
                    warnings.absorb(self.client.get_application_processes(&app.guid).await)?
                } else {
                    Vec::new()
                };
            }

            if (no_wait || deployed) && self.poll_processes(&processes, handle_instance_details, warnings).await? {
                return Ok(());
            }
        }

        warn!("Deployment {} of app {} timed out, canceling", deployment_guid, app.name);
        warnings.absorb(self.client.cancel_deployment(deployment_guid).await)?;
        Err(ActorError::StartupTimeout { name: app.name.clone() })
    }

    async fn get_deployment(&self, deployment_guid: &str, warnings: &mut Warnings) -> Result<Deployment, ActorError> {
        let deployment = warnings.absorb(self.client.get_deployment(deployment_guid).await)?;
        debug!("Deployment {} is {:?}", deployment_guid, deployment.status);

        if deployment.finalized_as(DeploymentStatusReason::Canceled) {
            return Err(ActorError::DeploymentCanceled);
        }
        if deployment.finalized_as(DeploymentStatusReason::Superseded) {
            return Err(ActorError::DeploymentSuperseded);
        }
        Ok(deployment)
    }

    /// One pass over the processes. Returns `true` once every process is
    /// stable, `false` to keep polling.
    async fn poll_processes<F>(
        &self,
        processes: &[Process],
        handle_instance_details: &mut F,
        warnings: &mut Warnings,
    ) -> Result<bool, ActorError>
    where
        F: FnMut(String) + Send,
    {
        for process in processes {
            let instances: ProcessInstances = warnings
                .absorb(self.client.get_process_instances(&process.guid).await)?
                .into();

            handle_instance_details(instances.details());

            if instances.empty() || instances.any_running() {
                continue;
            }
            if instances.all_crashed() {
                return Err(ActorError::AllInstancesCrashed);
            }

            debug!("Process {} ({}) is still starting", process.guid, process.process_type);
            return Ok(false);
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(state: ProcessInstanceState, details: &str) -> ProcessInstance {
        ProcessInstance {
            state,
            details: details.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_instance_predicates() {
        let none = ProcessInstances::default();
        assert!(none.empty());
        assert!(!none.any_running());
        assert!(!none.all_crashed());

        let mixed = ProcessInstances::from(vec![
            instance(ProcessInstanceState::Crashed, ""),
            instance(ProcessInstanceState::Running, ""),
        ]);
        assert!(mixed.any_running());
        assert!(!mixed.all_crashed());

        let crashed = ProcessInstances::from(vec![
            instance(ProcessInstanceState::Crashed, ""),
            instance(ProcessInstanceState::Crashed, ""),
        ]);
        assert!(crashed.all_crashed());
    }

    #[test]
    fn test_details() {
        let starting = ProcessInstances::from(vec![instance(ProcessInstanceState::Starting, "")]);
        assert_eq!(starting.details(), "Instances starting...");

        let failing = ProcessInstances::from(vec![
            instance(ProcessInstanceState::Down, ""),
            instance(ProcessInstanceState::Down, "insufficient resources"),
        ]);
        assert_eq!(failing.details(), "Error starting instances: 'insufficient resources'");
    }

    #[test]
    fn test_start_time() {
        let mut up = instance(ProcessInstanceState::Running, "");
        up.uptime = 3600;

        let hour = TimeDelta::seconds(3600);
        let before = Utc::now();
        let start = up.start_time();
        let after = Utc::now();
        assert!(before - hour <= start, "{} is earlier than {}", start, before - hour);
        assert!(start <= after - hour, "{} is later than {}", start, after - hour);
    }

    #[test]
    fn test_start_time_without_uptime_is_now() {
        let fresh = instance(ProcessInstanceState::Starting, "");

        let before = Utc::now();
        let start = fresh.start_time();
        assert!(before <= start && start <= Utc::now());
    }
}
