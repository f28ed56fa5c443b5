use chrono::{DateTime, Utc};

use super::project::{Criticality, Tag};

/// Default staleness window in days.
pub const DEFAULT_STALE_DAYS: i64 = 90;

/// Why a repository could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InaccessibleReason {
    /// Hosting API answered 404: missing, or hidden from the token.
    Unauthorized,
    /// Hosting API answered 401.
    BadCredentials,
    /// Response lacked `pushed_at` / `archived`.
    Unknown,
    /// No owner/name could be read from the URL.
    InvalidUrl,
    /// Transport failure or retries exhausted.
    Unreachable,
}

impl std::fmt::Display for InaccessibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InaccessibleReason::Unauthorized => write!(f, "unauthorized"),
            InaccessibleReason::BadCredentials => write!(f, "bad credentials"),
            InaccessibleReason::Unknown => write!(f, "unknown"),
            InaccessibleReason::InvalidUrl => write!(f, "invalid repository url"),
            InaccessibleReason::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Activity status of one repository, derived fresh on every run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Classification {
    Active,
    Stale,
    Archived,
    Inaccessible(InaccessibleReason),
}

impl Classification {
    /// Archived repositories count as stale.
    pub fn is_stale(&self) -> bool {
        matches!(self, Classification::Stale | Classification::Archived)
    }

    pub fn is_archived(&self) -> bool {
        matches!(self, Classification::Archived)
    }

    /// Value of the status tag, `None` when nothing should be written.
    pub fn status_value(&self) -> Option<&'static str> {
        match self {
            Classification::Active => Some("true"),
            Classification::Stale | Classification::Archived => Some("false"),
            Classification::Inaccessible(_) => None,
        }
    }

    pub fn status_tag(&self, key: &str) -> Option<Tag> {
        self.status_value().map(|value| Tag::new(key, value))
    }

    pub fn criticality(&self) -> Option<Criticality> {
        match self {
            Classification::Active => Some(Criticality::High),
            Classification::Stale | Classification::Archived => Some(Criticality::Low),
            Classification::Inaccessible(_) => None,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Active => write!(f, "active"),
            Classification::Stale => write!(f, "stale"),
            Classification::Archived => write!(f, "archived"),
            Classification::Inaccessible(reason) => write!(f, "inaccessible ({reason})"),
        }
    }
}

/// Whole days between `pushed_at` and `now`, truncated.
pub fn days_since(pushed_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - pushed_at).num_days()
}

/// Classify from hosting metadata. Pure in `(pushed_at, archived, now)`.
pub fn classify(
    pushed_at: DateTime<Utc>,
    archived: bool,
    now: DateTime<Utc>,
    stale_days: i64,
) -> Classification {
    if archived {
        Classification::Archived
    } else if days_since(pushed_at, now) > stale_days {
        Classification::Stale
    } else {
        Classification::Active
    }
}
