//! Enumeration of an owner's repositories

use crate::cancel::{client_for, ensure_active};
use crate::fetcher::PAGE_SIZE;
use crate::window::DateWindow;
use anyhow::Result;
use async_trait::async_trait;
use gh_client::{ClientProvider, Repository};
use log::debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Lists the repositories of a user or organization
#[async_trait]
pub trait RepositoryEnumerator: Send + Sync {
    /// Repositories of `owner` whose creation date falls inside `window`
    ///
    /// Results are canonical [`Repository`] values. Repositories without
    /// a known creation date are kept.
    async fn list_for_owner(
        &self,
        owner: &str,
        window: &DateWindow,
        cancel: &CancellationToken,
    ) -> Result<Vec<Repository>>;
}

/// Pages through the owner's repository listing
#[derive(Clone)]
pub struct OwnerRepositoryEnumerator {
    provider: Arc<dyn ClientProvider>,
}

impl OwnerRepositoryEnumerator {
    pub fn new(provider: Arc<dyn ClientProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl RepositoryEnumerator for OwnerRepositoryEnumerator {
    async fn list_for_owner(
        &self,
        owner: &str,
        window: &DateWindow,
        cancel: &CancellationToken,
    ) -> Result<Vec<Repository>> {
        let client = client_for(self.provider.as_ref(), cancel).await?;

        let mut repositories = Vec::new();
        let mut page = 1u32;

        loop {
            ensure_active(cancel)?;
            let batch = client
                .fetch_owner_repositories_page(owner, page, PAGE_SIZE)
                .await?;
            let received = batch.len();

            repositories.extend(
                batch
                    .into_iter()
                    .map(|summary| summary.normalize(owner))
                    .filter(|repo| window.contains_optional(repo.created_at)),
            );

            if received < PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        debug!("Found {} repositories for {}", repositories.len(), owner);
        Ok(repositories)
    }
}
