use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use gh_pr_batch::{DateWindow, PullRequestQuery};

#[derive(Parser, Debug)]
#[command(name = "gh-pr-batch")]
#[command(about = "Approve and merge pull requests in bulk across GitHub repositories")]
pub struct Cli {
    /// GitHub Enterprise host (defaults to the config file, then github.com)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Pause between approve/merge calls in milliseconds
    #[arg(long = "delay-ms", global = true)]
    pub delay_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List open pull requests of a repository or of every repository of an owner
    List {
        /// `owner` or `owner/repo`
        target: Target,
        #[command(flatten)]
        filters: Filters,
    },

    /// List open pull requests without an approving review
    NonApproved {
        /// `owner` or `owner/repo`
        target: Target,
        #[command(flatten)]
        filters: Filters,
    },

    /// Approve open pull requests that are not approved yet
    Approve {
        /// `owner/repo`
        target: Target,
        /// Approve only this pull request
        #[arg(long)]
        pr: Option<u64>,
        /// Review body (defaults to the config file)
        #[arg(short, long)]
        message: Option<String>,
        #[command(flatten)]
        filters: Filters,
    },

    /// Squash-merge open pull requests of one repository
    Merge {
        /// `owner/repo`
        target: Target,
        /// Commit message (defaults to the config file)
        #[arg(short, long)]
        message: Option<String>,
        /// Skip pull requests with a failed CI run
        #[arg(long)]
        checks: Option<bool>,
        #[command(flatten)]
        filters: Filters,
    },

    /// Squash-merge across all repositories of an owner in random order
    MergeOwner {
        owner: String,
        #[arg(short, long)]
        message: Option<String>,
        #[arg(long)]
        checks: Option<bool>,
        /// Seed the repository order for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        #[command(flatten)]
        filters: Filters,
    },

    /// Repositories of an owner with open pull requests
    ReposOpen {
        owner: String,
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Repositories of an owner with a failed build on an open pull request
    ReposFailed {
        owner: String,
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Whether a repository has a failed build on an open pull request
    HasFailed {
        /// `owner/repo`
        target: Target,
        #[command(flatten)]
        window: WindowArgs,
    },
}

/// Creation-date bounds, inclusive
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// Only items created at or after this date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_start)]
    pub since: Option<DateTime<Utc>>,

    /// Only items created at or before this date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_end)]
    pub until: Option<DateTime<Utc>>,
}

impl WindowArgs {
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.since, self.until)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct Filters {
    /// Exact author login
    #[arg(long)]
    pub author: Option<String>,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Do not log per pull request details while listing
    #[arg(long)]
    pub quiet: bool,
}

impl Filters {
    pub fn query(&self) -> PullRequestQuery {
        let mut query = PullRequestQuery::new().within(self.window.window());
        if let Some(author) = &self.author {
            query = query.by_author(author.clone());
        }
        if self.quiet {
            query = query.quiet();
        }
        query
    }
}

/// `owner` or `owner/repo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub owner: String,
    pub name: Option<String>,
}

impl Target {
    pub fn repository(&self) -> anyhow::Result<(&str, &str)> {
        match &self.name {
            Some(name) => Ok((self.owner.as_str(), name.as_str())),
            None => anyhow::bail!("expected owner/repo, got '{}'", self.owner),
        }
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '/');
        let owner = parts.next().unwrap_or_default().trim();
        if owner.is_empty() {
            return Err(format!("invalid target '{}'", s));
        }
        let name = match parts.next().map(str::trim) {
            Some("") => return Err(format!("missing repository name in '{}'", s)),
            Some(name) if name.contains('/') => {
                return Err(format!("invalid repository name in '{}'", s))
            }
            other => other.map(str::to_string),
        };
        Ok(Target {
            owner: owner.to_string(),
            name,
        })
    }
}

fn parse_date(s: &str, time: NaiveTime) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|date| date.and_time(time).and_utc())
        .map_err(|e| format!("invalid date '{}': {}", s, e))
}

/// A bare date starts at midnight
fn parse_start(s: &str) -> Result<DateTime<Utc>, String> {
    parse_date(s, NaiveTime::MIN)
}

/// A bare date covers the whole day
fn parse_end(s: &str) -> Result<DateTime<Utc>, String> {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    parse_date(s, end_of_day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_target_parsing() {
        let target: Target = "acme/widgets".parse().unwrap();
        assert_eq!(target.owner, "acme");
        assert_eq!(target.name.as_deref(), Some("widgets"));
        assert_eq!(target.repository().unwrap(), ("acme", "widgets"));

        let target: Target = "acme".parse().unwrap();
        assert!(target.name.is_none());
        assert!(target.repository().is_err());

        assert!("".parse::<Target>().is_err());
        assert!("acme/".parse::<Target>().is_err());
        assert!("acme/a/b".parse::<Target>().is_err());
    }

    #[test]
    fn test_date_bounds() {
        assert_eq!(
            parse_start("2024-03-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_end("2024-03-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap()
        );
        assert_eq!(
            parse_start("2024-03-01T10:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()
        );
        assert!(parse_start("March 1st").is_err());
    }

    #[test]
    fn test_cli_parses_merge_owner() {
        let cli = Cli::parse_from([
            "gh-pr-batch",
            "--delay-ms",
            "250",
            "merge-owner",
            "acme",
            "--checks",
            "false",
            "--author",
            "dependabot[bot]",
            "--since",
            "2024-01-01",
        ]);

        assert_eq!(cli.delay_ms, Some(250));
        match cli.command {
            Command::MergeOwner {
                owner,
                checks,
                filters,
                ..
            } => {
                assert_eq!(owner, "acme");
                assert_eq!(checks, Some(false));
                let query = filters.query();
                assert_eq!(query.author.as_deref(), Some("dependabot[bot]"));
                assert!(query.window.start_at.is_some());
                assert!(query.log);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
