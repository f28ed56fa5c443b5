use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use staleguard_core::error::StaleguardError;

use crate::{HostProvider, RepoLookup, RepoMetadata};

/// In-memory hosting provider for testing. Unknown repos answer `NotFound`.
#[derive(Default)]
pub struct MemoryProvider {
    repos: HashMap<String, RepoLookup>,
    outages: HashSet<String>,
    calls: Mutex<HashMap<String, u32>>,
}

fn key(owner: &str, name: &str) -> String {
    format!("{}/{}", owner.to_lowercase(), name.to_lowercase())
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, owner: &str, name: &str, pushed_at: DateTime<Utc>, archived: bool) -> Self {
        self.with_lookup(
            owner,
            name,
            RepoLookup::Found(RepoMetadata {
                pushed_at: Some(pushed_at),
                archived: Some(archived),
            }),
        )
    }

    pub fn with_lookup(mut self, owner: &str, name: &str, lookup: RepoLookup) -> Self {
        self.repos.insert(key(owner, name), lookup);
        self
    }

    /// Every lookup of this repo fails with a transient error.
    pub fn with_outage(mut self, owner: &str, name: &str) -> Self {
        self.outages.insert(key(owner, name));
        self
    }

    pub fn calls_for(&self, owner: &str, name: &str) -> u32 {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key(owner, name))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

#[async_trait]
impl HostProvider for MemoryProvider {
    async fn repo_metadata(&self, owner: &str, name: &str) -> Result<RepoLookup, StaleguardError> {
        let key = key(owner, name);
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_insert(0) += 1;

        if self.outages.contains(&key) {
            return Err(StaleguardError::Transient {
                service: "memory".into(),
                message: format!("{key} unavailable"),
            });
        }
        Ok(self.repos.get(&key).cloned().unwrap_or(RepoLookup::NotFound))
    }
}
