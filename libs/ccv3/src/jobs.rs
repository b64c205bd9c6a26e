//! Asynchronous job polling

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::client::HttpClient;
use crate::error::ClientError;
use crate::models::{Job, JobState};
use crate::warnings::Warnings;

/// Link to an asynchronous job, as returned in a `Location` header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobUrl(String);

impl JobUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for JobUrl {
    fn from(url: &str) -> Self {
        Self(url.to_string())
    }
}

impl fmt::Display for JobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl HttpClient {
    /// Wait for a job to complete.
    ///
    /// An empty job URL means there is nothing to wait for.
    pub async fn poll_job(&self, job_url: &JobUrl) -> (Result<(), ClientError>, Warnings) {
        if job_url.is_empty() {
            return (Ok(()), Warnings::new());
        }

        let options = self.options();
        wait_for_job(job_url, options.job_timeout, options.job_polling_interval, move || {
            self.get_url::<Job>(job_url.as_str())
        })
        .await
    }
}

/// Fetch a job until it completes or fails. The wait between fetches is cut
/// short by the deadline.
async fn wait_for_job<F, Fut>(
    job_url: &JobUrl,
    timeout: Duration,
    interval: Duration,
    mut fetch: F,
) -> (Result<(), ClientError>, Warnings)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = (Result<Job, ClientError>, Warnings)>,
{
    let mut all_warnings = Warnings::new();
    let deadline = sleep(timeout);
    tokio::pin!(deadline);

    loop {
        let (job, warnings) = fetch().await;
        all_warnings.extend(warnings);

        let job = match job {
            Ok(job) => job,
            Err(e) => return (Err(e), all_warnings),
        };

        debug!("Job {} is {:?}", job_url, job.state);
        match job.state {
            JobState::Complete => return (Ok(()), all_warnings),
            JobState::Failed => {
                let detail = job
                    .errors
                    .first()
                    .map(|e| e.detail.clone())
                    .unwrap_or_default();
                return (
                    Err(ClientError::JobFailed {
                        job_url: job_url.to_string(),
                        detail,
                    }),
                    all_warnings,
                );
            }
            JobState::Processing | JobState::Polling => {}
        }

        let timed_out = tokio::select! {
            biased;
            _ = &mut deadline => true,
            _ = sleep(interval) => false,
        };
        if timed_out {
            return (
                Err(ClientError::JobTimeout {
                    job_url: job_url.to_string(),
                }),
                all_warnings,
            );
        }
    }
}
