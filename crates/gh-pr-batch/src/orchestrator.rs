//! Batch approve and merge over filtered pull request sets
//!
//! Every fan-out is walked sequentially in fetch order. Approval batches
//! and plain merges stop at the first error. The passing-checks merge
//! instead logs a failed build-status lookup or a failed merge, skips that
//! PR and moves on. Cancellation stops every batch.

use crate::approval::ApprovalResolver;
use crate::build_status::{BuildStatusResolver, CheckRunBuildStatus};
use crate::cancel::client_for;
use crate::error::BatchError;
use crate::fetcher::PullRequestFetcher;
use crate::filter::RepositoryFilter;
use crate::pacing::{FixedDelayPacer, Pacer};
use crate::query::PullRequestQuery;
use crate::repositories::{OwnerRepositoryEnumerator, RepositoryEnumerator};
use crate::shuffle::{RandomShuffler, Shuffler};
use anyhow::Result;
use gh_client::{ClientProvider, MergeMethod, MergeResult, PullRequest, ReviewEvent};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sequences approve and merge calls with a pause between successive ones
#[derive(Clone)]
pub struct BatchOrchestrator {
    provider: Arc<dyn ClientProvider>,
    fetcher: PullRequestFetcher,
    approvals: ApprovalResolver,
    build_status: Arc<dyn BuildStatusResolver>,
    enumerator: Arc<dyn RepositoryEnumerator>,
    pacer: Arc<dyn Pacer>,
    shuffler: Arc<dyn Shuffler>,
}

/// Tracks whether a pause is due before the next mutating call
struct Cadence<'a> {
    pacer: &'a dyn Pacer,
    delay: Duration,
    acted: bool,
}

impl<'a> Cadence<'a> {
    fn new(pacer: &'a dyn Pacer, delay: Duration) -> Self {
        Self {
            pacer,
            delay,
            acted: false,
        }
    }

    async fn before_action(&mut self, cancel: &CancellationToken) -> Result<()> {
        if self.acted && !self.delay.is_zero() {
            self.pacer.pause(self.delay, cancel).await?;
        }
        self.acted = true;
        Ok(())
    }
}

impl BatchOrchestrator {
    /// Orchestrator with check-run build status, owner repository listing,
    /// a fixed-delay pacer, and a random repository order
    pub fn new(provider: Arc<dyn ClientProvider>) -> Self {
        Self {
            fetcher: PullRequestFetcher::new(Arc::clone(&provider)),
            approvals: ApprovalResolver::new(Arc::clone(&provider)),
            build_status: Arc::new(CheckRunBuildStatus::new(Arc::clone(&provider))),
            enumerator: Arc::new(OwnerRepositoryEnumerator::new(Arc::clone(&provider))),
            pacer: Arc::new(FixedDelayPacer),
            shuffler: Arc::new(RandomShuffler),
            provider,
        }
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_shuffler(mut self, shuffler: Arc<dyn Shuffler>) -> Self {
        self.shuffler = shuffler;
        self
    }

    /// Replace the check-run lookup used by the passing-checks merges
    pub fn with_build_status(mut self, build_status: Arc<dyn BuildStatusResolver>) -> Self {
        self.build_status = build_status;
        self
    }

    /// Replace the source of an owner's repositories
    pub fn with_enumerator(mut self, enumerator: Arc<dyn RepositoryEnumerator>) -> Self {
        self.enumerator = enumerator;
        self
    }

    pub fn fetcher(&self) -> &PullRequestFetcher {
        &self.fetcher
    }

    /// Repository scans sharing this orchestrator's collaborators
    pub fn filter(&self) -> RepositoryFilter {
        RepositoryFilter::new(
            self.fetcher.clone(),
            Arc::clone(&self.build_status),
            Arc::clone(&self.enumerator),
        )
    }

    /// Open PRs of every repository of `owner`, repository by repository
    pub async fn all_for_owner(
        &self,
        owner: &str,
        query: &PullRequestQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<PullRequest>> {
        let repositories = self
            .enumerator
            .list_for_owner(owner, &query.window.upper_bound_only(), cancel)
            .await?;

        let mut pull_requests = Vec::new();
        for repository in &repositories {
            let prs = self
                .fetcher
                .fetch_open_in(repository, query, cancel)
                .await?;
            pull_requests.extend(prs);
        }
        Ok(pull_requests)
    }

    /// Open PRs of `owner/name` without any approving review, in fetch order
    pub async fn non_approved(
        &self,
        owner: &str,
        name: &str,
        query: &PullRequestQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<PullRequest>> {
        let prs = self.fetcher.fetch_open(owner, name, query, cancel).await?;

        let mut pending = Vec::with_capacity(prs.len());
        for pr in prs {
            if !self
                .approvals
                .is_approved(owner, name, pr.number, cancel)
                .await?
            {
                pending.push(pr);
            }
        }

        if query.log {
            info!(
                "{} of the open PRs in {}/{} are not approved",
                pending.len(),
                owner,
                name
            );
        }
        Ok(pending)
    }

    pub async fn non_approved_for_owner(
        &self,
        owner: &str,
        query: &PullRequestQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<PullRequest>> {
        let repositories = self
            .enumerator
            .list_for_owner(owner, &query.window.upper_bound_only(), cancel)
            .await?;

        let mut pending = Vec::new();
        for repository in &repositories {
            let prs = self
                .non_approved(&repository.owner, &repository.name, query, cancel)
                .await?;
            pending.extend(prs);
        }
        Ok(pending)
    }

    /// Submit one approving review
    pub async fn approve(
        &self,
        owner: &str,
        name: &str,
        pull_request: &PullRequest,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let client = client_for(self.provider.as_ref(), cancel).await?;

        info!(
            "Approving {}/{}#{} ({})",
            owner, name, pull_request.number, pull_request.title
        );
        client
            .create_review(
                owner,
                name,
                pull_request.number,
                ReviewEvent::Approve,
                Some(message),
            )
            .await?;
        info!("Approved {}/{}#{}", owner, name, pull_request.number);
        Ok(())
    }

    /// Squash-merge one PR with `message` as the commit message
    ///
    /// A response with `merged == false` is returned as
    /// [`BatchError::MergeRejected`].
    pub async fn merge(
        &self,
        owner: &str,
        name: &str,
        pull_request: &PullRequest,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<MergeResult> {
        let client = client_for(self.provider.as_ref(), cancel).await?;

        info!(
            "Merging {}/{}#{} ({})",
            owner, name, pull_request.number, pull_request.title
        );
        let result = client
            .merge_pull_request(
                owner,
                name,
                pull_request.number,
                MergeMethod::Squash,
                None,
                Some(message),
            )
            .await?;

        if !result.merged {
            return Err(BatchError::MergeRejected {
                repository: format!("{}/{}", owner, name),
                number: pull_request.number,
                message: result.message,
            }
            .into());
        }

        debug!(
            "Merged {}/{}#{} as {}",
            owner,
            name,
            pull_request.number,
            result.sha.as_deref().unwrap_or("?")
        );
        Ok(result)
    }

    /// Approve every open, not yet approved PR matching `query`
    ///
    /// Returns the number of approvals submitted. The first failure aborts
    /// the rest of the batch.
    pub async fn approve_all_non_approved(
        &self,
        owner: &str,
        name: &str,
        message: &str,
        query: &PullRequestQuery,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let pending = self.non_approved(owner, name, query, cancel).await?;
        let mut cadence = Cadence::new(self.pacer.as_ref(), delay);

        for pr in &pending {
            cadence.before_action(cancel).await?;
            self.approve(owner, name, pr, message, cancel).await?;
        }

        Ok(pending.len())
    }

    /// Squash-merge every open PR matching `query`
    pub async fn merge_all(
        &self,
        owner: &str,
        name: &str,
        message: &str,
        query: &PullRequestQuery,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let mut cadence = Cadence::new(self.pacer.as_ref(), delay);
        self.merge_repository(owner, name, message, query, false, &mut cadence, cancel)
            .await
    }

    /// Like [`BatchOrchestrator::merge_all`], skipping PRs with a failed run
    ///
    /// A PR whose build status cannot be read, or whose merge fails, is
    /// logged and skipped. The count covers successful merges only.
    pub async fn merge_all_with_passing_checks(
        &self,
        owner: &str,
        name: &str,
        message: &str,
        query: &PullRequestQuery,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let mut cadence = Cadence::new(self.pacer.as_ref(), delay);
        self.merge_repository(owner, name, message, query, true, &mut cadence, cancel)
            .await
    }

    /// Merge across all of `owner`'s repositories, one repository at a time
    ///
    /// Repositories are visited in the order the shuffler leaves them in.
    /// The pause applies between any two merges, including across a
    /// repository boundary.
    pub async fn merge_for_owner_incrementally(
        &self,
        owner: &str,
        message: &str,
        check_passing_checks: bool,
        query: &PullRequestQuery,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let mut repositories = self
            .enumerator
            .list_for_owner(owner, &query.window.upper_bound_only(), cancel)
            .await?;
        self.shuffler.shuffle(&mut repositories);

        info!(
            "Merging across {} repositories of {}: {}",
            repositories.len(),
            owner,
            repositories
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut cadence = Cadence::new(self.pacer.as_ref(), delay);
        let mut merged = 0;
        for repository in &repositories {
            merged += self
                .merge_repository(
                    &repository.owner,
                    &repository.name,
                    message,
                    query,
                    check_passing_checks,
                    &mut cadence,
                    cancel,
                )
                .await?;
        }

        info!("Merged {} PRs across {}", merged, owner);
        Ok(merged)
    }

    #[allow(clippy::too_many_arguments)]
    async fn merge_repository(
        &self,
        owner: &str,
        name: &str,
        message: &str,
        query: &PullRequestQuery,
        check_passing_checks: bool,
        cadence: &mut Cadence<'_>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let prs = self.fetcher.fetch_open(owner, name, query, cancel).await?;
        let mut merged = 0;

        for pr in &prs {
            if check_passing_checks && !self.checks_pass(owner, name, pr, cancel).await? {
                continue;
            }
            cadence.before_action(cancel).await?;
            match self.merge(owner, name, pr, message, cancel).await {
                Ok(_) => merged += 1,
                Err(e) if !check_passing_checks => return Err(e),
                Err(e) if cancel.is_cancelled() || BatchError::is_cancellation(&e) => {
                    return Err(BatchError::Cancelled.into());
                }
                Err(e) => warn!(
                    "Skipping {}/{}#{}: merge failed: {:#}",
                    owner, name, pr.number, e
                ),
            }
        }

        Ok(merged)
    }

    /// Whether `pr` may be merged under the passing-checks rule
    ///
    /// A lookup error skips the PR. Cancellation still propagates.
    async fn checks_pass(
        &self,
        owner: &str,
        name: &str,
        pr: &PullRequest,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        match self
            .build_status
            .has_failed_run_in(owner, name, pr, cancel)
            .await
        {
            Ok(false) => Ok(true),
            Ok(true) => {
                warn!(
                    "Skipping {}/{}#{}: it has a failed build",
                    owner, name, pr.number
                );
                Ok(false)
            }
            Err(e) if cancel.is_cancelled() || BatchError::is_cancellation(&e) => {
                Err(BatchError::Cancelled.into())
            }
            Err(e) => {
                warn!(
                    "Skipping {}/{}#{}: build status unavailable: {:#}",
                    owner, name, pr.number, e
                );
                Ok(false)
            }
        }
    }
}
