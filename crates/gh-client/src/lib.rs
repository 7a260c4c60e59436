//! Typed GitHub API client
//!
//! This crate provides a trait-based GitHub API client covering the
//! pull request, review, merge, check run and repository endpoints used
//! by the batch tooling.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              ClientProvider trait                │
//! │  - client(cancel) -> Arc<dyn GitHubClient>       │
//! └─────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌─────────────────────────────────────────────────┐
//! │              GitHubClient trait                  │
//! │  - fetch_open_pull_requests_page()               │
//! │  - fetch_reviews() / create_review()             │
//! │  - merge_pull_request()                          │
//! │  - fetch_check_runs()                            │
//! │  - fetch_owner_repositories_page()               │
//! └─────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!              ┌─────────────────┐
//!              │ OctocrabClient  │
//!              │ (direct API)    │
//!              └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use gh_client::{ClientManager, ClientProvider, GitHubClient};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let manager = ClientManager::new(None);
//! let client = manager.client(&CancellationToken::new()).await?;
//! let _prs = client
//!     .fetch_open_pull_requests_page("owner", "repo", 1, gh_client::MAX_PER_PAGE)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod client_manager;
pub mod octocrab_client;
pub mod types;

/// Default GitHub host (public GitHub)
pub const DEFAULT_HOST: &str = "github.com";

pub use client::{ClientProvider, GitHubClient};
pub use client_manager::{ClientManager, TokenResolver};
pub use octocrab_client::{OctocrabClient, MAX_PER_PAGE};
pub use types::{
    AccountRef, CheckConclusion, CheckRun, CheckRunStatus, MergeMethod, MergeResult, PullRequest,
    PullRequestState, Repository, RepositorySummary, Review, ReviewEvent, ReviewState,
};
