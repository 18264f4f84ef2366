//! Handle for a background memory job.

use super::types::{Job, JobStatus};
use super::KeyokuClient;
use crate::{DemoError, Result};
use std::time::Duration;
use tracing::debug;

/// How often `wait` re-reads the job
pub const JOB_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A job returned by `remember` that has not been waited on yet.
#[derive(Debug)]
pub struct PendingJob {
    client: KeyokuClient,
    job: Job,
}

impl PendingJob {
    pub(super) fn new(client: KeyokuClient, job: Job) -> Self {
        Self { client, job }
    }

    pub fn id(&self) -> &str {
        &self.job.id
    }

    /// Poll until the job completes, fails, or `timeout` elapses.
    ///
    /// A failed job is a `Remote` error; running out of time is `Timeout`.
    pub async fn wait(self, timeout: Duration) -> Result<Job> {
        let Self { client, mut job } = self;
        let job_id = job.id.clone();
        let poll = async move {
            loop {
                match job.status {
                    JobStatus::Completed => return Ok(job),
                    JobStatus::Failed => {
                        return Err(DemoError::Remote(format!(
                            "job {} failed: {}",
                            job.id,
                            job.error.as_deref().unwrap_or("unknown error")
                        )))
                    }
                    _ => {}
                }
                tokio::time::sleep(JOB_POLL_INTERVAL).await;
                job = client.get_job(&job.id).await?;
                debug!("Job {} status {:?}", job.id, job.status);
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(DemoError::Timeout(format!(
                "job {job_id} still running after {timeout:?}"
            ))),
        }
    }
}
