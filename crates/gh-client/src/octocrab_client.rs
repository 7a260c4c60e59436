//! `GitHubClient` over octocrab
//!
//! Typed octocrab builders where they exist, raw routes for reviews and
//! repository listings so the payloads map straight onto our types.

use crate::client::GitHubClient;
use crate::types::{
    AccountRef, CheckConclusion, CheckRun, CheckRunStatus, MergeMethod, MergeResult, PullRequest,
    PullRequestState, RepositorySummary, Review, ReviewEvent, ReviewState,
};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Largest page size the REST API accepts
pub const MAX_PER_PAGE: u8 = 100;

/// Live client over the REST API
#[derive(Debug, Clone)]
pub struct OctocrabClient {
    octocrab: Arc<Octocrab>,
    base_url: String,
    owner_kinds: Arc<Mutex<HashMap<String, OwnerKind>>>,
}

impl OctocrabClient {
    /// Create a client for the given API base URL
    pub fn with_base_url(octocrab: Arc<Octocrab>, base_url: String) -> Self {
        Self {
            octocrab,
            base_url,
            owner_kinds: Arc::default(),
        }
    }

    /// API base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Classify `owner`, asking the API once per login
    async fn owner_kind(&self, owner: &str) -> anyhow::Result<OwnerKind> {
        let cache_key = owner.to_lowercase();
        if let Some(kind) = self.cached_owner_kind(&cache_key) {
            return Ok(kind);
        }

        let viewer = match self.octocrab.current().user().await {
            Ok(user) => Some(user.login),
            Err(e) => {
                debug!("Authenticated user unavailable: {}", e);
                None
            }
        };

        let kind = if viewer.is_some_and(|login| login.eq_ignore_ascii_case(owner)) {
            OwnerKind::AuthenticatedUser
        } else {
            let account: AccountPayload = self
                .octocrab
                .get(format!("/users/{}", owner), None::<&()>)
                .await?;
            if account.kind == "Organization" {
                OwnerKind::Organization
            } else {
                OwnerKind::User
            }
        };

        debug!("Owner {} is {:?}", owner, kind);
        if let Ok(mut kinds) = self.owner_kinds.lock() {
            kinds.insert(cache_key, kind);
        }
        Ok(kind)
    }

    fn cached_owner_kind(&self, cache_key: &str) -> Option<OwnerKind> {
        self.owner_kinds
            .lock()
            .ok()
            .and_then(|kinds| kinds.get(cache_key).copied())
    }
}

/// Which listing endpoint sees all of an owner's repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OwnerKind {
    /// The login the token belongs to; private repositories included
    AuthenticatedUser,
    /// Private repositories included as far as the token's membership allows
    Organization,
    /// Any other user; only public repositories are visible
    User,
}

#[derive(Debug, Deserialize)]
struct AccountPayload {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct RepositoryListParams {
    per_page: u8,
    page: u32,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    affiliation: Option<&'static str>,
}

/// Route and query for one page of an owner's repositories
fn repository_listing(
    owner: &str,
    kind: OwnerKind,
    page: u32,
    per_page: u8,
) -> (String, RepositoryListParams) {
    let mut params = RepositoryListParams {
        per_page,
        page,
        kind: None,
        affiliation: None,
    };
    let route = match kind {
        OwnerKind::AuthenticatedUser => {
            params.affiliation = Some("owner");
            "/user/repos".to_string()
        }
        OwnerKind::Organization => {
            params.kind = Some("all");
            format!("/orgs/{}/repos", owner)
        }
        OwnerKind::User => {
            params.kind = Some("owner");
            format!("/users/{}/repos", owner)
        }
    };
    (route, params)
}

/// Request pages until one comes back short
async fn collect_pages<T, F, Fut>(per_page: u8, mut fetch_page: F) -> anyhow::Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<T>>>,
{
    let mut items = Vec::new();
    let mut page = 1u32;

    loop {
        let batch = fetch_page(page).await?;
        let is_last = batch.len() < per_page as usize;
        items.extend(batch);

        if is_last {
            return Ok(items);
        }
        page += 1;
    }
}

#[derive(Debug, Serialize)]
struct PageParams {
    per_page: u8,
    page: u32,
}

#[derive(Debug, Serialize)]
struct ReviewBody<'a> {
    event: ReviewEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ReviewPayload {
    id: u64,
    state: ReviewState,
    user: Option<AccountRef>,
    submitted_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl GitHubClient for OctocrabClient {
    async fn fetch_open_pull_requests_page(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u8,
    ) -> anyhow::Result<Vec<PullRequest>> {
        debug!("Fetching open PRs for {}/{} (page {})", owner, repo, page);

        let page = self
            .octocrab
            .pulls(owner, repo)
            .list()
            .state(octocrab::params::State::Open)
            .per_page(per_page)
            .page(page)
            .send()
            .await?;

        page.items.iter().map(convert_pull_request).collect()
    }

    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<PullRequest> {
        debug!("Fetching PR #{} for {}/{}", pr_number, owner, repo);

        let pr = self.octocrab.pulls(owner, repo).get(pr_number).await?;
        convert_pull_request(&pr)
    }

    async fn fetch_reviews(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<Vec<Review>> {
        debug!("Fetching reviews for {}/{}#{}", owner, repo, pr_number);

        let route = format!("/repos/{}/{}/pulls/{}/reviews", owner, repo, pr_number);
        let route = route.as_str();
        let payload: Vec<ReviewPayload> = collect_pages(MAX_PER_PAGE, move |page| async move {
            let params = PageParams {
                per_page: MAX_PER_PAGE,
                page,
            };
            let batch: Vec<ReviewPayload> = self.octocrab.get(route, Some(&params)).await?;
            Ok(batch)
        })
        .await?;

        Ok(payload
            .into_iter()
            .map(|r| Review {
                id: r.id,
                state: r.state,
                author: r.user.map(|u| u.login),
                submitted_at: r.submitted_at,
            })
            .collect())
    }

    async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        event: ReviewEvent,
        body: Option<&str>,
    ) -> anyhow::Result<()> {
        debug!(
            "Creating {:?} review on {}/{}#{}",
            event, owner, repo, pr_number
        );

        let route = format!("/repos/{}/{}/pulls/{}/reviews", owner, repo, pr_number);
        let _: serde_json::Value = self
            .octocrab
            .post(route, Some(&ReviewBody { event, body }))
            .await?;

        Ok(())
    }

    async fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        merge_method: MergeMethod,
        commit_title: Option<&str>,
        commit_message: Option<&str>,
    ) -> anyhow::Result<MergeResult> {
        debug!(
            "Merging {}/{}#{} ({:?})",
            owner, repo, pr_number, merge_method
        );

        let pulls = self.octocrab.pulls(owner, repo);
        let mut request = pulls
            .merge(pr_number)
            .method(convert_merge_method(merge_method));

        if let Some(title) = commit_title {
            request = request.title(title);
        }
        if let Some(message) = commit_message {
            request = request.message(message);
        }

        let merge = request.send().await?;

        Ok(MergeResult {
            merged: merge.merged,
            sha: merge.sha,
            message: merge.message.unwrap_or_default(),
        })
    }

    async fn fetch_check_runs(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<Vec<CheckRun>> {
        debug!(
            "Fetching check runs for {}/{} @ {}",
            owner, repo, commit_sha
        );

        collect_pages(MAX_PER_PAGE, move |page| async move {
            let checks = self
                .octocrab
                .checks(owner, repo)
                .list_check_runs_for_git_ref(commit_sha.to_string().into())
                .per_page(MAX_PER_PAGE)
                .page(page)
                .send()
                .await?;

            Ok(checks
                .check_runs
                .into_iter()
                .map(|run| {
                    let status = match (run.started_at, run.completed_at) {
                        (_, Some(_)) => CheckRunStatus::Completed,
                        (Some(_), None) => CheckRunStatus::InProgress,
                        (None, None) => CheckRunStatus::Queued,
                    };

                    CheckRun {
                        id: run.id.0,
                        name: run.name,
                        status,
                        conclusion: run.conclusion.as_deref().map(convert_conclusion_string),
                        details_url: run.details_url,
                        started_at: run.started_at,
                        completed_at: run.completed_at,
                    }
                })
                .collect())
        })
        .await
    }

    async fn fetch_owner_repositories_page(
        &self,
        owner: &str,
        page: u32,
        per_page: u8,
    ) -> anyhow::Result<Vec<RepositorySummary>> {
        debug!("Fetching repositories for {} (page {})", owner, page);

        let kind = self.owner_kind(owner).await?;
        let (route, params) = repository_listing(owner, kind, page, per_page);
        let repos: Vec<RepositorySummary> = self.octocrab.get(route, Some(&params)).await?;

        Ok(repos)
    }
}

/// Convert an API pull request; one without a creation time is an error
fn convert_pull_request(pr: &octocrab::models::pulls::PullRequest) -> anyhow::Result<PullRequest> {
    let state = if pr.merged_at.is_some() {
        PullRequestState::Merged
    } else {
        match pr.state {
            Some(octocrab::models::IssueState::Closed) => PullRequestState::Closed,
            _ => PullRequestState::Open,
        }
    };

    Ok(PullRequest {
        number: pr.number,
        title: pr.title.as_deref().unwrap_or_default().to_string(),
        author: pr
            .user
            .as_ref()
            .map_or_else(String::new, |user| user.login.clone()),
        state,
        head_sha: pr.head.sha.to_owned(),
        base_branch: pr.base.ref_field.to_owned(),
        created_at: require_created_at(pr.number, pr.created_at)?,
        html_url: pr
            .html_url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_default(),
    })
}

/// Date-window filtering needs the real creation time, never a stand-in
fn require_created_at(
    number: u64,
    created_at: Option<DateTime<Utc>>,
) -> anyhow::Result<DateTime<Utc>> {
    created_at.ok_or_else(|| anyhow!("PR #{} has no creation timestamp", number))
}

fn convert_merge_method(method: MergeMethod) -> octocrab::params::pulls::MergeMethod {
    use octocrab::params::pulls::MergeMethod as OMM;
    match method {
        MergeMethod::Merge => OMM::Merge,
        MergeMethod::Squash => OMM::Squash,
        MergeMethod::Rebase => OMM::Rebase,
    }
}

/// Unrecognized conclusions are treated as neutral
fn convert_conclusion_string(conclusion: &str) -> CheckConclusion {
    serde_json::from_value(serde_json::Value::String(conclusion.to_lowercase()))
        .unwrap_or(CheckConclusion::Neutral)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serves `total` numbered items in pages, counting requests
    async fn walk(total: u32, per_page: u8) -> (Vec<u32>, u32) {
        let requests = AtomicU32::new(0);
        let items = collect_pages(per_page, |page| {
            requests.fetch_add(1, Ordering::SeqCst);
            let start = (page - 1) * per_page as u32;
            let end = (start + per_page as u32).min(total);
            async move { Ok((start..end.max(start)).collect::<Vec<_>>()) }
        })
        .await
        .unwrap();
        (items, requests.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn test_pages_past_a_full_first_page() {
        let (items, requests) = walk(7, 3).await;
        assert_eq!(items, (0..7).collect::<Vec<_>>());
        assert_eq!(requests, 3);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_one_empty_page() {
        let (items, requests) = walk(6, 3).await;
        assert_eq!(items.len(), 6);
        assert_eq!(requests, 3);
    }

    #[tokio::test]
    async fn test_short_first_page_stops() {
        let (items, requests) = walk(2, 100).await;
        assert_eq!(items, vec![0, 1]);
        assert_eq!(requests, 1);
    }

    #[tokio::test]
    async fn test_page_error_propagates() {
        let result: anyhow::Result<Vec<u32>> = collect_pages(2, |page| async move {
            if page == 2 {
                anyhow::bail!("rate limited");
            }
            Ok(vec![1, 2])
        })
        .await;
        assert_eq!(result.unwrap_err().to_string(), "rate limited");
    }

    #[test]
    fn test_repository_listing_routes() {
        let (route, params) = repository_listing("me", OwnerKind::AuthenticatedUser, 2, 100);
        assert_eq!(route, "/user/repos");
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            serde_json::json!({ "per_page": 100, "page": 2, "affiliation": "owner" })
        );

        let (route, params) = repository_listing("acme", OwnerKind::Organization, 1, 100);
        assert_eq!(route, "/orgs/acme/repos");
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            serde_json::json!({ "per_page": 100, "page": 1, "type": "all" })
        );

        let (route, params) = repository_listing("octocat", OwnerKind::User, 1, 30);
        assert_eq!(route, "/users/octocat/repos");
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            serde_json::json!({ "per_page": 30, "page": 1, "type": "owner" })
        );
    }

    #[test]
    fn test_account_type_deserialize() {
        let account: AccountPayload =
            serde_json::from_str(r#"{"login": "acme", "type": "Organization"}"#).unwrap();
        assert_eq!(account.kind, "Organization");
    }

    #[test]
    fn test_missing_creation_time_is_an_error() {
        let created = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        assert_eq!(require_created_at(7, Some(created)).unwrap(), created);

        let err = require_created_at(7, None).unwrap_err();
        assert_eq!(err.to_string(), "PR #7 has no creation timestamp");
    }

    #[test]
    fn test_conclusions_from_checks_api() {
        let cases = [
            ("failure", CheckConclusion::Failure),
            ("FAILURE", CheckConclusion::Failure),
            ("timed_out", CheckConclusion::TimedOut),
            ("cancelled", CheckConclusion::Cancelled),
            ("action_required", CheckConclusion::ActionRequired),
            ("startup_failure", CheckConclusion::Neutral),
        ];
        for (raw, expected) in cases {
            assert_eq!(convert_conclusion_string(raw), expected, "{}", raw);
        }
    }

    #[test]
    fn test_review_payload_deserialize() {
        let json = r#"[
            {"id": 1, "state": "COMMENTED", "user": {"login": "alice"}, "submitted_at": "2024-05-01T12:00:00Z"},
            {"id": 2, "state": "APPROVED", "user": null, "submitted_at": null}
        ]"#;
        let payload: Vec<ReviewPayload> = serde_json::from_str(json).unwrap();

        assert_eq!(payload.len(), 2);
        assert_eq!(payload[0].state, ReviewState::Commented);
        assert_eq!(payload[0].user.as_ref().unwrap().login, "alice");
        assert_eq!(payload[1].state, ReviewState::Approved);
        assert!(payload[1].user.is_none());
    }

    #[test]
    fn test_review_body_omits_missing_message() {
        let json = serde_json::to_value(ReviewBody {
            event: ReviewEvent::Approve,
            body: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "event": "APPROVE" }));

        let json = serde_json::to_value(ReviewBody {
            event: ReviewEvent::Approve,
            body: Some("LGTM"),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "event": "APPROVE", "body": "LGTM" }));
    }
}
