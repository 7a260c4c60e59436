//! Values exchanged with the GitHub REST API
//!
//! Everything the batch layer reads or sends goes through these types;
//! octocrab models never leak past this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository in its canonical form
///
/// Identified by the `(owner, name)` pair. Every repository handed to the
/// orchestration layer has gone through [`RepositorySummary::normalize`] or
/// was converted from the full API representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Owner login (user or organization)
    pub owner: String,

    /// Repository name
    pub name: String,

    /// Full name (e.g., "rust-lang/rust")
    pub full_name: String,

    /// Default branch (e.g., "main")
    pub default_branch: String,

    /// When the repository was created
    pub created_at: Option<DateTime<Utc>>,
}

impl Repository {
    /// Create a repository from its identifying pair
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        Self {
            full_name: format!("{}/{}", owner, name),
            owner,
            name,
            default_branch: DEFAULT_BRANCH.to_string(),
            created_at: None,
        }
    }

    /// Whether this repository has the given `(owner, name)` identity
    pub fn is(&self, owner: &str, name: &str) -> bool {
        self.owner == owner && self.name == name
    }
}

const DEFAULT_BRANCH: &str = "main";

/// Login of an account as embedded in API payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub login: String,
}

/// The minimal repository shape returned by list endpoints
///
/// Most fields are optional here. Use [`RepositorySummary::normalize`] to
/// turn it into a canonical [`Repository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub owner: Option<AccountRef>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RepositorySummary {
    /// Collapse the minimal shape into the canonical repository value
    ///
    /// `listed_owner` is the account the listing was requested for and is
    /// used when the payload carries no owner object.
    pub fn normalize(self, listed_owner: &str) -> Repository {
        let owner = self
            .owner
            .map(|o| o.login)
            .unwrap_or_else(|| listed_owner.to_string());
        let full_name = self
            .full_name
            .unwrap_or_else(|| format!("{}/{}", owner, self.name));

        Repository {
            owner,
            name: self.name,
            full_name,
            default_branch: self
                .default_branch
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            created_at: self.created_at,
        }
    }
}

/// An open, closed, or merged pull request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number (e.g., 123)
    pub number: u64,

    /// PR title
    pub title: String,

    /// Login of the account that opened it
    pub author: String,

    /// Lifecycle state
    pub state: PullRequestState,

    /// HEAD commit SHA
    pub head_sha: String,

    /// Target branch
    pub base_branch: String,

    pub created_at: DateTime<Utc>,

    /// Web URL of the pull request
    pub html_url: String,
}

/// Lifecycle state of a pull request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    #[default]
    Open,
    Closed,
    Merged,
}

/// A submitted review on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Review ID
    pub id: u64,

    /// Review state
    pub state: ReviewState,

    /// Reviewer's GitHub username
    pub author: Option<String>,

    /// When the review was submitted (pending reviews have none)
    pub submitted_at: Option<DateTime<Utc>>,
}

/// State of a pull request review as reported by GitHub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    Commented,
    ChangesRequested,
    Dismissed,
    Pending,
    #[serde(other)]
    Unknown,
}

/// One CI check executed against a commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRun {
    pub id: u64,
    pub name: String,
    pub status: CheckRunStatus,
    /// Set once the run has completed
    pub conclusion: Option<CheckConclusion>,
    pub details_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CheckRun {
    /// Whether this run completed with a failing conclusion
    pub fn has_failed(&self) -> bool {
        self.conclusion.is_some_and(|c| c.is_failure())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunStatus {
    Queued,
    InProgress,
    Completed,
}

/// Outcome of a completed check run, as spelled by the checks API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    Skipped,
    TimedOut,
    ActionRequired,
    /// Superseded by a newer run
    Stale,
}

impl CheckConclusion {
    /// Conclusions that count as a failed run
    pub fn is_failure(&self) -> bool {
        matches!(self, CheckConclusion::Failure | CheckConclusion::TimedOut)
    }
}

/// How a pull request is merged; batches always squash
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    Merge,
    #[default]
    Squash,
    Rebase,
}

/// Response of the merge endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResult {
    /// False when GitHub accepted the call but refused to merge
    pub merged: bool,
    /// SHA of the resulting commit
    pub sha: Option<String>,
    pub message: String,
}

/// Event submitted with a new review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewEvent {
    Approve,
    RequestChanges,
    Comment,
}
