//! Paginated listing of open pull requests
//!
//! Walks the pull list endpoint page by page at the largest page size and
//! applies the creation-date window, then the author filter, to the
//! accumulated result.

use crate::cancel::{client_for, ensure_active};
use crate::query::PullRequestQuery;
use anyhow::Result;
use gh_client::{ClientProvider, PullRequest, Repository, MAX_PER_PAGE};
use log::{debug, info};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Page size used for every listing call
pub const PAGE_SIZE: u8 = MAX_PER_PAGE;

/// Fetches open pull requests through a [`ClientProvider`]
#[derive(Clone)]
pub struct PullRequestFetcher {
    provider: Arc<dyn ClientProvider>,
}

impl PullRequestFetcher {
    pub fn new(provider: Arc<dyn ClientProvider>) -> Self {
        Self { provider }
    }

    /// All open pull requests of `owner/name` matching `query`
    ///
    /// Order is the API listing order. A PR that shows up on two pages
    /// because the listing shifted mid-walk is kept once.
    pub async fn fetch_open(
        &self,
        owner: &str,
        name: &str,
        query: &PullRequestQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<PullRequest>> {
        if query.log {
            debug!("Getting all open PRs for {}/{}", owner, name);
        }

        let client = client_for(self.provider.as_ref(), cancel).await?;

        let mut seen = HashSet::new();
        let mut pull_requests = Vec::new();
        let mut page = 1u32;

        loop {
            ensure_active(cancel)?;
            let batch = client
                .fetch_open_pull_requests_page(owner, name, page, PAGE_SIZE)
                .await?;
            let received = batch.len();

            for pr in batch {
                if !query.window.contains(pr.created_at) || !seen.insert(pr.number) {
                    continue;
                }
                if query.log && !query.window.is_unbounded() {
                    info!(
                        "{}/{}#{} created at {} is inside the window",
                        owner, name, pr.number, pr.created_at
                    );
                }
                pull_requests.push(pr);
            }

            if received < PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        pull_requests.retain(|pr| query.matches_author(pr));

        if query.log {
            info!(
                "Found {} open PRs for {}/{}",
                pull_requests.len(),
                owner,
                name
            );
        }

        Ok(pull_requests)
    }

    /// Same as [`PullRequestFetcher::fetch_open`] keyed by a repository value
    pub async fn fetch_open_in(
        &self,
        repository: &Repository,
        query: &PullRequestQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<PullRequest>> {
        self.fetch_open(&repository.owner, &repository.name, query, cancel)
            .await
    }

    /// One pull request by number, regardless of its state
    pub async fn fetch_one(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        cancel: &CancellationToken,
    ) -> Result<PullRequest> {
        let client = client_for(self.provider.as_ref(), cancel).await?;
        client.fetch_pull_request(owner, name, number).await
    }
}
