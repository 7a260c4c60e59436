//! CI status of a pull request's head commit

use crate::cancel::client_for;
use anyhow::Result;
use async_trait::async_trait;
use gh_client::{ClientProvider, PullRequest, Repository};
use log::debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Reports whether a pull request has a failed CI run
#[async_trait]
pub trait BuildStatusResolver: Send + Sync {
    async fn has_failed_run_in(
        &self,
        owner: &str,
        name: &str,
        pull_request: &PullRequest,
        cancel: &CancellationToken,
    ) -> Result<bool>;

    async fn has_failed_run(
        &self,
        repository: &Repository,
        pull_request: &PullRequest,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.has_failed_run_in(&repository.owner, &repository.name, pull_request, cancel)
            .await
    }
}

/// Reads check runs on the PR head SHA
///
/// GitHub reports the latest attempt of each check, so a check that failed
/// and then passed on re-run is not counted. Only failure and timed-out
/// conclusions are failures; cancelled, skipped, neutral, and pending runs
/// are not.
#[derive(Clone)]
pub struct CheckRunBuildStatus {
    provider: Arc<dyn ClientProvider>,
}

impl CheckRunBuildStatus {
    pub fn new(provider: Arc<dyn ClientProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl BuildStatusResolver for CheckRunBuildStatus {
    async fn has_failed_run_in(
        &self,
        owner: &str,
        name: &str,
        pull_request: &PullRequest,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let client = client_for(self.provider.as_ref(), cancel).await?;

        let runs = client
            .fetch_check_runs(owner, name, &pull_request.head_sha)
            .await?;

        match runs.iter().find(|run| run.has_failed()) {
            Some(run) => {
                debug!(
                    "{}/{}#{}: check '{}' failed ({:?})",
                    owner, name, pull_request.number, run.name, run.conclusion
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
