//! Bulk pull request operations over GitHub repositories
//!
//! Built on top of [`gh_client`], this crate walks open pull requests of a
//! repository or of every repository of an owner, and approves or merges
//! them in sequence with a fixed pause between mutating calls.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               BatchOrchestrator               │
//! │  approve / merge batches, owner-wide merge    │
//! ├───────────────┬───────────────┬───────────────┤
//! │ PullRequest-  │ Approval-     │ BuildStatus-  │
//! │ Fetcher       │ Resolver      │ Resolver      │
//! ├───────────────┴───────────────┴───────────────┤
//! │ RepositoryFilter       RepositoryEnumerator   │
//! ├───────────────────────────────────────────────┤
//! │        Pacer            Shuffler              │
//! ├───────────────────────────────────────────────┤
//! │      gh_client::ClientProvider (auth)         │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! All calls are sequential. A single [`CancellationToken`] is threaded
//! through every network call and every pause.
//!
//! # Example
//!
//! ```rust,no_run
//! use gh_client::ClientManager;
//! use gh_pr_batch::{BatchOrchestrator, PullRequestQuery};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let orchestrator = BatchOrchestrator::new(Arc::new(ClientManager::new(None)));
//! let query = PullRequestQuery::new().by_author("dependabot[bot]");
//!
//! let approved = orchestrator
//!     .approve_all_non_approved(
//!         "acme",
//!         "widgets",
//!         "LGTM",
//!         &query,
//!         Duration::from_secs(1),
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! println!("approved {} pull requests", approved);
//! # Ok(())
//! # }
//! ```
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod approval;
pub mod build_status;
pub mod cancel;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod orchestrator;
pub mod pacing;
pub mod query;
pub mod repositories;
pub mod shuffle;
pub mod window;

#[cfg(test)]
mod testing;

pub use approval::ApprovalResolver;
pub use build_status::{BuildStatusResolver, CheckRunBuildStatus};
pub use cancel::{client_for, ensure_active};
pub use error::BatchError;
pub use fetcher::{PullRequestFetcher, PAGE_SIZE};
pub use filter::RepositoryFilter;
pub use orchestrator::BatchOrchestrator;
pub use pacing::{FixedDelayPacer, Pacer};
pub use query::PullRequestQuery;
pub use repositories::{OwnerRepositoryEnumerator, RepositoryEnumerator};
pub use shuffle::{KeepOrder, RandomShuffler, SeededShuffler, Shuffler};
pub use window::DateWindow;
