//! Staging: submitting builds and waiting for them to produce a droplet

use ccv3::models::{Build, BuildState, Droplet, DropletState};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::actor::Actor;
use crate::errors::ActorError;
use crate::poll::PollTimer;
use crate::warnings::Warnings;

/// Capacity of the staging event channel
const STAGING_EVENT_BUFFER: usize = 16;

/// Progress of a [`Actor::stage_package`] run
#[derive(Debug)]
pub enum StagingEvent {
    /// Warnings returned by one step
    Warnings(Warnings),

    /// Final outcome; always the last event
    Finished(Result<Droplet, ActorError>),
}

/// Receiver side of a staging run. Yields `None` once the run has ended.
pub type StagingEvents = mpsc::Receiver<StagingEvent>;

/// Where the warnings of each staging step go
enum WarningSink<'a> {
    /// Collected and returned with the outcome
    Collect(&'a mut Warnings),

    /// Sent as a [`StagingEvent`] as soon as the step returns
    Publish(&'a mpsc::Sender<StagingEvent>),
}

impl WarningSink<'_> {
    /// Hand off a step's warnings, then return its result
    async fn record<T, E>(&mut self, (result, warnings): (Result<T, E>, Warnings)) -> Result<T, ActorError>
    where
        ActorError: From<E>,
    {
        match self {
            WarningSink::Collect(all) => all.append(warnings),
            WarningSink::Publish(tx) => {
                if !warnings.is_empty() && tx.send(StagingEvent::Warnings(warnings)).await.is_err() {
                    debug!("Staging events receiver dropped");
                }
            }
        }
        result.map_err(ActorError::from)
    }
}

impl Actor {
    /// Submit a build for a package without waiting for it
    pub async fn stage_application_package(&self, package_guid: &str) -> (Result<Build, ActorError>, Warnings) {
        let mut warnings = Warnings::new();
        let result = warnings
            .absorb(self.client.create_build(package_guid).await)
            .map_err(ActorError::from);
        (result, warnings)
    }

    /// Wait for a build to finish staging and fetch the resulting droplet
    pub async fn poll_build(&self, build_guid: &str, app_name: &str) -> (Result<Droplet, ActorError>, Warnings) {
        let mut warnings = Warnings::new();
        let mut sink = WarningSink::Collect(&mut warnings);

        let result = match self.wait_until_staged(build_guid, app_name, &mut sink).await {
            Ok(build) => sink.record(self.client.get_droplet(build.droplet_guid()).await).await,
            Err(e) => Err(e),
        };
        (result, warnings)
    }

    /// Poll a build until it leaves the staging state. Returns the staged
    /// build; a failed build or the staging deadline is an error.
    async fn wait_until_staged(
        &self,
        build_guid: &str,
        app_name: &str,
        sink: &mut WarningSink<'_>,
    ) -> Result<Build, ActorError> {
        let timeout = self.config.staging_timeout();
        let mut timer = PollTimer::new(timeout, self.config.polling_interval());

        info!("Polling build {} of app {}", build_guid, app_name);

        while timer.tick().await {
            let build = sink.record(self.client.get_build(build_guid).await).await?;
            debug!("Build {} is {:?}", build_guid, build.state);

            match build.state {
                BuildState::Failed => {
                    return Err(ActorError::StagingFailed(build.error_detail().to_string()));
                }
                BuildState::Staged => return Ok(build),
                BuildState::Staging | BuildState::Unknown => {}
            }
        }

        error!("Staging of app {} timed out after {:?}", app_name, timeout);
        Err(ActorError::StagingTimeout {
            app_name: app_name.to_string(),
            timeout,
        })
    }

    /// Stage a package of a named application in the background.
    ///
    /// Each step's warnings are sent as they arrive, followed by exactly one
    /// [`StagingEvent::Finished`]. The channel closes when the run ends,
    /// whichever way it ends. Must be called from within a tokio runtime.
    pub fn stage_package(&self, package_guid: &str, app_name: &str, space_guid: &str) -> StagingEvents {
        let (tx, rx) = mpsc::channel(STAGING_EVENT_BUFFER);

        let actor = self.clone();
        let package_guid = package_guid.to_string();
        let app_name = app_name.to_string();
        let space_guid = space_guid.to_string();

        tokio::spawn(async move {
            let outcome = actor
                .run_stage_package(&package_guid, &app_name, &space_guid, &tx)
                .await;

            if let Err(e) = &outcome {
                error!("Staging package {} failed: {}", package_guid, e);
            }
            if tx.send(StagingEvent::Finished(outcome)).await.is_err() {
                debug!("Staging events receiver dropped");
            }
        });

        rx
    }

    async fn run_stage_package(
        &self,
        package_guid: &str,
        app_name: &str,
        space_guid: &str,
        tx: &mpsc::Sender<StagingEvent>,
    ) -> Result<Droplet, ActorError> {
        info!("Staging package {} of app {}", package_guid, app_name);
        let mut sink = WarningSink::Publish(tx);

        let app = sink
            .record(self.get_application_by_name_and_space(app_name, space_guid).await)
            .await?;

        let packages = sink.record(self.client.get_packages(&app.guid).await).await?;
        if !packages.iter().any(|package| package.guid == package_guid) {
            return Err(ActorError::PackageNotFoundInApp {
                guid: package_guid.to_string(),
                app_name: app_name.to_string(),
            });
        }

        let build = sink.record(self.client.create_build(package_guid).await).await?;
        let build = self.wait_until_staged(&build.guid, app_name, &mut sink).await?;

        // The droplet is not fetched; it is assembled from the build.
        Ok(Droplet {
            guid: build.droplet_guid().to_string(),
            state: DropletState::Staged,
            created_at: build.created_at,
        })
    }
}

/// Drain a staging run, passing each batch of warnings to `on_warnings`, and
/// return its outcome. A run that closes its channel without an outcome is
/// reported as [`ActorError::StagingInterrupted`].
pub async fn await_staged<F>(mut events: StagingEvents, app_name: &str, mut on_warnings: F) -> Result<Droplet, ActorError>
where
    F: FnMut(Warnings),
{
    let mut outcome = None;
    while let Some(event) = events.recv().await {
        match event {
            StagingEvent::Warnings(warnings) => on_warnings(warnings),
            StagingEvent::Finished(result) => outcome = Some(result),
        }
    }

    outcome.unwrap_or_else(|| {
        Err(ActorError::StagingInterrupted {
            app_name: app_name.to_string(),
        })
    })
}
