//! Repository scans over open pull requests
//!
//! These are read-only and best-effort: a repository that cannot be
//! evaluated is logged and skipped so one broken repository does not hide
//! the rest of the scan. Cancellation is the exception and always
//! propagates.

use crate::build_status::BuildStatusResolver;
use crate::cancel::ensure_active;
use crate::error::BatchError;
use crate::fetcher::PullRequestFetcher;
use crate::query::PullRequestQuery;
use crate::repositories::RepositoryEnumerator;
use crate::window::DateWindow;
use anyhow::Result;
use gh_client::{PullRequest, Repository};
use log::{info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct RepositoryFilter {
    fetcher: PullRequestFetcher,
    build_status: Arc<dyn BuildStatusResolver>,
    enumerator: Arc<dyn RepositoryEnumerator>,
}

impl RepositoryFilter {
    pub fn new(
        fetcher: PullRequestFetcher,
        build_status: Arc<dyn BuildStatusResolver>,
        enumerator: Arc<dyn RepositoryEnumerator>,
    ) -> Self {
        Self {
            fetcher,
            build_status,
            enumerator,
        }
    }

    /// Repositories holding at least one open PR created inside `window`
    pub async fn with_open_pull_requests(
        &self,
        repositories: &[Repository],
        window: &DateWindow,
        log: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Repository>> {
        let query = scan_query(window);
        let mut matching = Vec::new();

        for repository in repositories {
            ensure_active(cancel)?;
            match self.fetcher.fetch_open_in(repository, &query, cancel).await {
                Ok(prs) if !prs.is_empty() => {
                    if log {
                        info!(
                            "{} has {} open PRs",
                            repository.full_name,
                            prs.len()
                        );
                    }
                    matching.push(repository.clone());
                }
                Ok(_) => {}
                Err(e) => skip_or_abort(repository, e, cancel)?,
            }
        }

        Ok(matching)
    }

    /// Repositories where some open PR inside `window` has a failed CI run
    ///
    /// Stops looking at a repository's PRs after the first failing one.
    pub async fn with_failed_builds(
        &self,
        repositories: &[Repository],
        window: &DateWindow,
        log: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Repository>> {
        let mut matching = Vec::new();

        for repository in repositories {
            ensure_active(cancel)?;
            match self.first_failing(repository, window, cancel).await {
                Ok(Some(pr)) => {
                    if log {
                        info!(
                            "{}#{} has a failed build: {}",
                            repository.full_name, pr.number, pr.html_url
                        );
                    }
                    matching.push(repository.clone());
                }
                Ok(None) => {}
                Err(e) => skip_or_abort(repository, e, cancel)?,
            }
        }

        Ok(matching)
    }

    /// Owner-wide variant of [`RepositoryFilter::with_open_pull_requests`]
    ///
    /// Only the window's upper bound constrains the repository listing; the
    /// full window applies to the pull requests.
    pub async fn owner_repositories_with_open_pull_requests(
        &self,
        owner: &str,
        window: &DateWindow,
        cancel: &CancellationToken,
    ) -> Result<Vec<Repository>> {
        let repositories = self
            .enumerator
            .list_for_owner(owner, &window.upper_bound_only(), cancel)
            .await?;
        self.with_open_pull_requests(&repositories, window, true, cancel)
            .await
    }

    /// Owner-wide variant of [`RepositoryFilter::with_failed_builds`]
    pub async fn owner_repositories_with_failed_builds(
        &self,
        owner: &str,
        window: &DateWindow,
        cancel: &CancellationToken,
    ) -> Result<Vec<Repository>> {
        let repositories = self
            .enumerator
            .list_for_owner(owner, &window.upper_bound_only(), cancel)
            .await?;
        self.with_failed_builds(&repositories, window, true, cancel)
            .await
    }

    /// Whether one repository has an open PR inside `window` with a failed run
    ///
    /// Unlike the list scans, errors propagate here.
    pub async fn has_failed_run_on_open_pull_requests(
        &self,
        owner: &str,
        name: &str,
        window: &DateWindow,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let repository = Repository::new(owner, name);
        Ok(self
            .first_failing(&repository, window, cancel)
            .await?
            .is_some())
    }

    async fn first_failing(
        &self,
        repository: &Repository,
        window: &DateWindow,
        cancel: &CancellationToken,
    ) -> Result<Option<PullRequest>> {
        let prs = self
            .fetcher
            .fetch_open_in(repository, &scan_query(window), cancel)
            .await?;

        for pr in prs {
            if self
                .build_status
                .has_failed_run(repository, &pr, cancel)
                .await?
            {
                return Ok(Some(pr));
            }
        }
        Ok(None)
    }
}

fn scan_query(window: &DateWindow) -> PullRequestQuery {
    PullRequestQuery::new().within(*window).quiet()
}

fn skip_or_abort(
    repository: &Repository,
    err: anyhow::Error,
    cancel: &CancellationToken,
) -> Result<()> {
    if cancel.is_cancelled() || BatchError::is_cancellation(&err) {
        return Err(BatchError::Cancelled.into());
    }
    warn!("Skipping {}: {:#}", repository.full_name, err);
    Ok(())
}
