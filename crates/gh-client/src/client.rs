//! Client seams: the API surface and the accessor that hands it out

use crate::types::{
    CheckRun, MergeMethod, MergeResult, PullRequest, RepositorySummary, Review, ReviewEvent,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The REST calls the batch tooling relies on
///
/// One implementation talks to the API through octocrab; tests swap in
/// in-memory fakes. Every method maps to exactly one endpoint and performs
/// no retries, except [`GitHubClient::fetch_reviews`] which follows the
/// review pages to the end.
///
/// ```rust,ignore
/// use gh_client::{GitHubClient, PullRequest, MAX_PER_PAGE};
///
/// async fn first_page(client: &dyn GitHubClient) -> anyhow::Result<Vec<PullRequest>> {
///     client.fetch_open_pull_requests_page("rust-lang", "rust", 1, MAX_PER_PAGE).await
/// }
/// ```
#[async_trait]
pub trait GitHubClient: Send + Sync {
    /// Fetch one page of open pull requests for a repository
    ///
    /// # Arguments
    ///
    /// * `owner` - Repository owner (user or organization)
    /// * `repo` - Repository name
    /// * `page` - 1-based page number
    /// * `per_page` - Page size (GitHub caps this at 100)
    ///
    /// # Returns
    ///
    /// The pull requests on that page in API order. An empty or short page
    /// means there are no further pages.
    async fn fetch_open_pull_requests_page(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u8,
    ) -> anyhow::Result<Vec<PullRequest>>;

    /// One pull request in any state
    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<PullRequest>;

    /// Fetch every review submitted on a pull request
    ///
    /// Returns the complete list across all pages, oldest first.
    async fn fetch_reviews(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<Vec<Review>>;

    /// Submit a review with the given event
    ///
    /// `body` becomes the review text; `None` sends no body at all.
    async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        event: ReviewEvent,
        body: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Merge a pull request with the given strategy
    ///
    /// A successful HTTP response does not mean the PR was merged: check
    /// [`MergeResult::merged`]. `commit_title` and `commit_message` fall back
    /// to GitHub's defaults when `None`.
    async fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        merge_method: MergeMethod,
        commit_title: Option<&str>,
        commit_message: Option<&str>,
    ) -> anyhow::Result<MergeResult>;

    /// Check runs reported for a commit, latest attempt of each check
    async fn fetch_check_runs(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<Vec<CheckRun>>;

    /// Fetch one page of repositories owned by an account
    ///
    /// The list endpoint returns the minimal repository shape; callers
    /// normalize it before use.
    async fn fetch_owner_repositories_page(
        &self,
        owner: &str,
        page: u32,
        per_page: u8,
    ) -> anyhow::Result<Vec<RepositorySummary>>;
}

/// Hands out an authenticated client on demand
///
/// Implementations own token resolution and client construction. The
/// cancellation token lets callers abandon a pending authentication step.
#[async_trait]
pub trait ClientProvider: Send + Sync {
    /// Get a client ready for API calls
    async fn client(&self, cancel: &CancellationToken) -> anyhow::Result<Arc<dyn GitHubClient>>;
}

/// An already-built client is its own provider
#[async_trait]
impl<C: GitHubClient + 'static> ClientProvider for Arc<C> {
    async fn client(&self, cancel: &CancellationToken) -> anyhow::Result<Arc<dyn GitHubClient>> {
        if cancel.is_cancelled() {
            anyhow::bail!("client request cancelled");
        }
        Ok(Arc::clone(self) as Arc<dyn GitHubClient>)
    }
}
