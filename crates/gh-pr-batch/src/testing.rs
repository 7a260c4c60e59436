//! In-memory GitHub double shared by the unit tests

use crate::pacing::Pacer;
use crate::shuffle::Shuffler;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use gh_client::{
    CheckConclusion, CheckRun, CheckRunStatus, ClientProvider, GitHubClient, MergeMethod,
    MergeResult, PullRequest, PullRequestState, Repository, RepositorySummary, Review,
    ReviewEvent, ReviewState,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One observed interaction, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListPulls { repo: String, page: u32 },
    GetPull { repo: String, number: u64 },
    Reviews { repo: String, number: u64 },
    Approve { repo: String, number: u64, body: Option<String> },
    Merge { repo: String, number: u64, message: Option<String> },
    CheckRuns { repo: String, sha: String },
    ListRepos { owner: String, page: u32 },
    Pause(Duration),
}

#[derive(Default)]
struct State {
    pulls: HashMap<String, Vec<PullRequest>>,
    reviews: HashMap<(String, u64), Vec<Review>>,
    check_runs: HashMap<String, Vec<CheckRun>>,
    repositories: HashMap<String, Vec<RepositorySummary>>,
    failing_listings: HashSet<String>,
    failing_check_runs: HashSet<String>,
    rejected_merges: HashSet<(String, u64)>,
    failing_reviews: HashSet<(String, u64)>,
    cancel_on_merge: Option<(u64, CancellationToken)>,
    calls: Vec<Call>,
}

/// Fake GitHub backed by plain maps
///
/// Keys are `owner/name` strings. Every trait call is recorded.
#[derive(Default)]
pub struct FakeGitHub {
    state: Mutex<State>,
}

fn key(owner: &str, repo: &str) -> String {
    format!("{}/{}", owner, repo)
}

impl FakeGitHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_pull(&self, owner: &str, repo: &str, pr: PullRequest) {
        let mut state = self.state.lock().unwrap();
        state.pulls.entry(key(owner, repo)).or_default().push(pr);
    }

    pub fn add_review(&self, owner: &str, repo: &str, number: u64, review: ReviewState) {
        let mut state = self.state.lock().unwrap();
        let reviews = state.reviews.entry((key(owner, repo), number)).or_default();
        let id = reviews.len() as u64 + 1;
        reviews.push(Review {
            id,
            state: review,
            author: Some("reviewer".to_string()),
            submitted_at: None,
        });
    }

    pub fn add_check_run(&self, sha: &str, conclusion: Option<CheckConclusion>) {
        let mut state = self.state.lock().unwrap();
        let runs = state.check_runs.entry(sha.to_string()).or_default();
        let id = runs.len() as u64 + 1;
        runs.push(CheckRun {
            id,
            name: format!("check-{}", id),
            status: if conclusion.is_some() {
                CheckRunStatus::Completed
            } else {
                CheckRunStatus::InProgress
            },
            conclusion,
            details_url: None,
            started_at: None,
            completed_at: None,
        });
    }

    pub fn add_repository(&self, owner: &str, summary: RepositorySummary) {
        let mut state = self.state.lock().unwrap();
        state
            .repositories
            .entry(owner.to_string())
            .or_default()
            .push(summary);
    }

    pub fn fail_listing(&self, owner: &str, repo: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing_listings.insert(key(owner, repo));
    }

    pub fn fail_check_runs(&self, sha: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing_check_runs.insert(sha.to_string());
    }

    pub fn reject_merge(&self, owner: &str, repo: &str, number: u64) {
        let mut state = self.state.lock().unwrap();
        state.rejected_merges.insert((key(owner, repo), number));
    }

    /// Make the approving review on this PR fail with an API error
    pub fn fail_review(&self, owner: &str, repo: &str, number: u64) {
        let mut state = self.state.lock().unwrap();
        state.failing_reviews.insert((key(owner, repo), number));
    }

    /// Fire `cancel` right after the given PR number is merged
    pub fn cancel_after_merge(&self, number: u64, cancel: CancellationToken) {
        let mut state = self.state.lock().unwrap();
        state.cancel_on_merge = Some((number, cancel));
    }

    pub fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Mutating calls and pauses only, in order
    pub fn actions(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::Approve { .. } | Call::Merge { .. } | Call::Pause(_)
                )
            })
            .collect()
    }

    pub fn merged_numbers(&self) -> Vec<(String, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Merge { repo, number, .. } => Some((repo, number)),
                _ => None,
            })
            .collect()
    }

    pub fn approved_numbers(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Approve { number, .. } => Some(number),
                _ => None,
            })
            .collect()
    }

    pub fn network_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::Pause(_)))
            .count()
    }

    pub fn provider(self: &Arc<Self>) -> Arc<dyn ClientProvider> {
        Arc::new(Arc::clone(self))
    }
}

fn page_of<T: Clone>(items: &[T], page: u32, per_page: u8) -> Vec<T> {
    let per_page = per_page as usize;
    let start = (page.saturating_sub(1) as usize) * per_page;
    items.iter().skip(start).take(per_page).cloned().collect()
}

#[async_trait]
impl GitHubClient for FakeGitHub {
    async fn fetch_open_pull_requests_page(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u8,
    ) -> anyhow::Result<Vec<PullRequest>> {
        let repo = key(owner, repo);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListPulls {
            repo: repo.clone(),
            page,
        });
        if state.failing_listings.contains(&repo) {
            anyhow::bail!("listing {} failed", repo);
        }
        let open: Vec<PullRequest> = state
            .pulls
            .get(&repo)
            .map(|prs| {
                prs.iter()
                    .filter(|pr| pr.state == PullRequestState::Open)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(page_of(&open, page, per_page))
    }

    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<PullRequest> {
        let repo = key(owner, repo);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetPull {
            repo: repo.clone(),
            number: pr_number,
        });
        state
            .pulls
            .get(&repo)
            .and_then(|prs| prs.iter().find(|pr| pr.number == pr_number))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("{}#{} not found", repo, pr_number))
    }

    async fn fetch_reviews(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<Vec<Review>> {
        let repo = key(owner, repo);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Reviews {
            repo: repo.clone(),
            number: pr_number,
        });
        Ok(state
            .reviews
            .get(&(repo, pr_number))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        event: ReviewEvent,
        body: Option<&str>,
    ) -> anyhow::Result<()> {
        assert_eq!(event, ReviewEvent::Approve);
        let repo = key(owner, repo);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Approve {
            repo: repo.clone(),
            number: pr_number,
            body: body.map(str::to_string),
        });
        if state.failing_reviews.contains(&(repo.clone(), pr_number)) {
            anyhow::bail!("review on {}#{} refused", repo, pr_number);
        }
        state
            .reviews
            .entry((repo, pr_number))
            .or_default()
            .push(Review {
                id: 1000 + pr_number,
                state: ReviewState::Approved,
                author: Some("me".to_string()),
                submitted_at: None,
            });
        Ok(())
    }

    async fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        merge_method: MergeMethod,
        _commit_title: Option<&str>,
        commit_message: Option<&str>,
    ) -> anyhow::Result<MergeResult> {
        assert_eq!(merge_method, MergeMethod::Squash);
        let repo = key(owner, repo);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Merge {
            repo: repo.clone(),
            number: pr_number,
            message: commit_message.map(str::to_string),
        });
        if let Some((number, cancel)) = &state.cancel_on_merge {
            if *number == pr_number {
                cancel.cancel();
            }
        }
        if state.rejected_merges.contains(&(repo, pr_number)) {
            return Ok(MergeResult {
                merged: false,
                sha: None,
                message: "Pull Request is not mergeable".to_string(),
            });
        }
        Ok(MergeResult {
            merged: true,
            sha: Some(format!("merged-{}", pr_number)),
            message: "Pull Request successfully merged".to_string(),
        })
    }

    async fn fetch_check_runs(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<Vec<CheckRun>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CheckRuns {
            repo: key(owner, repo),
            sha: commit_sha.to_string(),
        });
        if state.failing_check_runs.contains(commit_sha) {
            anyhow::bail!("check runs for {} unavailable", commit_sha);
        }
        Ok(state
            .check_runs
            .get(commit_sha)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_owner_repositories_page(
        &self,
        owner: &str,
        page: u32,
        per_page: u8,
    ) -> anyhow::Result<Vec<RepositorySummary>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListRepos {
            owner: owner.to_string(),
            page,
        });
        let all = state.repositories.get(owner).cloned().unwrap_or_default();
        Ok(page_of(&all, page, per_page))
    }
}

/// Pacer that records pauses into the fake's call log instead of sleeping
pub struct RecordingPacer {
    github: Arc<FakeGitHub>,
}

impl RecordingPacer {
    pub fn new(github: &Arc<FakeGitHub>) -> Arc<Self> {
        Arc::new(Self {
            github: Arc::clone(github),
        })
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> anyhow::Result<()> {
        crate::cancel::ensure_active(cancel)?;
        self.github.record(Call::Pause(delay));
        Ok(())
    }
}

/// Reverses the listing order so tests can tell shuffled from listed
pub struct ReverseShuffler;

impl Shuffler for ReverseShuffler {
    fn shuffle(&self, repositories: &mut [Repository]) {
        repositories.reverse();
    }
}

pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap()
}

pub fn pr(number: u64, author: &str, created_at: DateTime<Utc>) -> PullRequest {
    PullRequest {
        number,
        title: format!("Bump dependency #{}", number),
        author: author.to_string(),
        state: PullRequestState::Open,
        head_sha: format!("sha-{}", number),
        base_branch: "main".to_string(),
        created_at,
        html_url: format!("https://github.com/acme/widgets/pull/{}", number),
    }
}

pub fn summary(owner: &str, name: &str, created_at: Option<DateTime<Utc>>) -> RepositorySummary {
    RepositorySummary {
        name: name.to_string(),
        full_name: None,
        owner: Some(gh_client::AccountRef {
            login: owner.to_string(),
        }),
        default_branch: None,
        created_at,
    }
}
