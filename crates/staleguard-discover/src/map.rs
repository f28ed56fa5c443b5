use std::collections::{BTreeSet, HashMap};

use staleguard_core::models::classification::Classification;
use staleguard_core::models::org::OrgId;
use staleguard_core::models::target::TargetId;
use staleguard_core::repo_url;

/// Immutable URL → classification map produced by the discovery pass.
/// Keys are normalized URLs, so lookups accept any spelling of the same repo.
#[derive(Debug, Clone, Default)]
pub struct ClassificationMap {
    entries: HashMap<String, Classification>,
}

impl ClassificationMap {
    pub fn get(&self, url: &str) -> Option<&Classification> {
        self.entries.get(&repo_url::normalize(url))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stale repositories, archived ones included.
    pub fn stale_urls(&self) -> BTreeSet<&str> {
        self.urls_where(Classification::is_stale)
    }

    pub fn archived_urls(&self) -> BTreeSet<&str> {
        self.urls_where(Classification::is_archived)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Classification)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn urls_where(&self, pred: impl Fn(&Classification) -> bool) -> BTreeSet<&str> {
        self.entries
            .iter()
            .filter(|&(_, c)| pred(c))
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

impl FromIterator<(String, Classification)> for ClassificationMap {
    fn from_iter<I: IntoIterator<Item = (String, Classification)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(url, c)| (repo_url::normalize(&url), c))
                .collect(),
        }
    }
}

/// Repository URL of every target seen during discovery, `None` for URL-less targets.
#[derive(Debug, Clone, Default)]
pub struct TargetIndex {
    urls: HashMap<(OrgId, TargetId), Option<String>>,
}

impl TargetIndex {
    /// `None` when the target was never listed; `Some(None)` when it has no URL.
    pub fn get(&self, org: &OrgId, target: &TargetId) -> Option<Option<&str>> {
        self.urls
            .get(&(org.clone(), target.clone()))
            .map(|url| url.as_deref())
    }

    pub fn insert(&mut self, org: &OrgId, target: &TargetId, url: Option<String>) {
        self.urls.insert((org.clone(), target.clone()), url);
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
