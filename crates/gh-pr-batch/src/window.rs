//! Creation-date window used to filter pull requests and repositories

use chrono::{DateTime, Utc};

/// Closed interval over creation timestamps
///
/// Each bound is optional on its own. A missing bound does not constrain
/// that side; with neither bound every timestamp matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

impl DateWindow {
    pub const fn new(start_at: Option<DateTime<Utc>>, end_at: Option<DateTime<Utc>>) -> Self {
        Self { start_at, end_at }
    }

    /// Window matching every timestamp
    pub const fn unbounded() -> Self {
        Self::new(None, None)
    }

    /// Everything created at or after `start_at`
    pub const fn since(start_at: DateTime<Utc>) -> Self {
        Self::new(Some(start_at), None)
    }

    /// Everything created at or before `end_at`
    pub const fn until(end_at: DateTime<Utc>) -> Self {
        Self::new(None, Some(end_at))
    }

    pub const fn between(start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        Self::new(Some(start_at), Some(end_at))
    }

    pub fn is_unbounded(&self) -> bool {
        self.start_at.is_none() && self.end_at.is_none()
    }

    /// Keep only the upper bound
    ///
    /// Used when enumerating repositories: a repository created before the
    /// window opened can still hold pull requests created inside it.
    pub fn upper_bound_only(&self) -> Self {
        Self::new(None, self.end_at)
    }

    /// Whether `at` falls inside the window, bounds inclusive
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        match (self.start_at, self.end_at) {
            (None, None) => true,
            (Some(start), None) => at >= start,
            (None, Some(end)) => at <= end,
            (Some(start), Some(end)) => at >= start && at <= end,
        }
    }

    /// Like [`DateWindow::contains`], treating an unknown timestamp as inside
    pub fn contains_optional(&self, at: Option<DateTime<Utc>>) -> bool {
        at.map_or(true, |at| self.contains(at))
    }
}
