use crate::window::DateWindow;
use gh_client::PullRequest;

/// Filters applied to a pull request listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestQuery {
    /// Exact author login
    pub author: Option<String>,
    /// Creation-date window
    pub window: DateWindow,
    /// Emit per-PR and fetch-count log lines
    pub log: bool,
}

impl Default for PullRequestQuery {
    fn default() -> Self {
        Self {
            author: None,
            window: DateWindow::unbounded(),
            log: true,
        }
    }
}

impl PullRequestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn within(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    /// Suppress the informational listing logs
    pub fn quiet(mut self) -> Self {
        self.log = false;
        self
    }

    pub fn matches_author(&self, pr: &PullRequest) -> bool {
        self.author.as_deref().map_or(true, |author| pr.author == author)
    }
}
