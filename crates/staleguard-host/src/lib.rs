pub mod github;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use staleguard_core::error::StaleguardError;
use staleguard_core::models::classification::{classify, days_since, Classification, InaccessibleReason};
use staleguard_core::repo_url;
use staleguard_core::retry::RetryPolicy;

/// Activity fields of a repo as returned by a hosting API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoMetadata {
    pub pushed_at: Option<DateTime<Utc>>,
    pub archived: Option<bool>,
}

/// Outcome of a single repository lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoLookup {
    Found(RepoMetadata),
    /// 404: missing, or private and hidden from the token.
    NotFound,
    /// 403 that is not rate limiting.
    Forbidden,
    /// 401.
    BadCredentials,
}

/// Trait for interacting with a git hosting provider.
#[async_trait]
pub trait HostProvider: Send + Sync {
    /// Fetch push/archive metadata for `owner/name`. Transient failures are `Err`.
    async fn repo_metadata(&self, owner: &str, name: &str) -> Result<RepoLookup, StaleguardError>;
}

/// Classifies repositories by URL against a hosting provider.
pub struct Inspector<'a> {
    provider: &'a dyn HostProvider,
    stale_days: i64,
    retry: RetryPolicy,
}

impl<'a> Inspector<'a> {
    pub fn new(provider: &'a dyn HostProvider, stale_days: i64, retry: RetryPolicy) -> Self {
        Self {
            provider,
            stale_days,
            retry,
        }
    }

    pub fn stale_days(&self) -> i64 {
        self.stale_days
    }

    /// Classify one repository. Never fails: problems become `Inaccessible`.
    pub async fn inspect(&self, repository_url: &str, now: DateTime<Utc>) -> Classification {
        let Some((owner, name)) = repo_url::owner_and_name(repository_url) else {
            warn!(url = repository_url, "cannot read owner/name from repository url");
            return Classification::Inaccessible(InaccessibleReason::InvalidUrl);
        };

        debug!(url = repository_url, %owner, %name, "inspecting repository");
        let lookup = self
            .retry
            .run("repository lookup", || self.provider.repo_metadata(&owner, &name))
            .await;

        let classification = match lookup {
            Ok(RepoLookup::Found(RepoMetadata {
                pushed_at: Some(pushed_at),
                archived: Some(archived),
            })) => {
                let days = days_since(pushed_at, now);
                debug!(url = repository_url, days_since_push = days, archived, "repository metadata");
                classify(pushed_at, archived, now, self.stale_days)
            }
            Ok(RepoLookup::Found(_)) => Classification::Inaccessible(InaccessibleReason::Unknown),
            Ok(RepoLookup::NotFound) | Ok(RepoLookup::Forbidden) => {
                Classification::Inaccessible(InaccessibleReason::Unauthorized)
            }
            Ok(RepoLookup::BadCredentials) => {
                Classification::Inaccessible(InaccessibleReason::BadCredentials)
            }
            Err(e) => {
                warn!(url = repository_url, error = %e, "repository lookup failed");
                Classification::Inaccessible(InaccessibleReason::Unreachable)
            }
        };

        info!(url = repository_url, %classification, "classified repository");
        classification
    }
}
