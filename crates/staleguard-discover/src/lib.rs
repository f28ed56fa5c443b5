pub mod map;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use staleguard_core::error::StaleguardError;
use staleguard_core::models::classification::Classification;
use staleguard_core::models::org::Organization;
use staleguard_core::repo_url;
use staleguard_host::Inspector;
use staleguard_registry::Registry;

pub use crate::map::{ClassificationMap, TargetIndex};

/// An organization whose targets could not be listed.
#[derive(Debug, Clone)]
pub struct OrgFailure {
    pub org: Organization,
    pub message: String,
}

/// Output of the discovery pass. Read-only from here on.
#[derive(Debug, Default)]
pub struct Discovery {
    pub classifications: ClassificationMap,
    pub targets: TargetIndex,
    pub failures: Vec<OrgFailure>,
}

/// Accumulates the discovery pass one organization at a time.
pub struct Discoverer<'a> {
    registry: &'a dyn Registry,
    inspector: &'a Inspector<'a>,
    now: DateTime<Utc>,
    seen: HashMap<String, Classification>,
    targets: TargetIndex,
    failures: Vec<OrgFailure>,
}

impl<'a> Discoverer<'a> {
    pub fn new(registry: &'a dyn Registry, inspector: &'a Inspector<'a>, now: DateTime<Utc>) -> Self {
        Self {
            registry,
            inspector,
            now,
            seen: HashMap::new(),
            targets: TargetIndex::default(),
            failures: Vec::new(),
        }
    }

    /// List the org's targets and inspect every URL not seen before.
    /// Only credential failures are returned; anything else is recorded.
    pub async fn discover_org(&mut self, org: &Organization) -> Result<(), StaleguardError> {
        let targets = match self.registry.list_targets(&org.id).await {
            Ok(targets) => targets,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(org = %org.name, error = %e, "could not list targets");
                self.failures.push(OrgFailure {
                    org: org.clone(),
                    message: e.to_string(),
                });
                return Ok(());
            }
        };

        let mut inspected = 0usize;
        for target in targets {
            self.targets.insert(&org.id, &target.id, target.url.clone());
            let Some(url) = target.url else {
                debug!(org = %org.name, target = %target.display_name, "target has no repository url");
                continue;
            };
            let key = repo_url::normalize(&url);
            if self.seen.contains_key(&key) {
                continue;
            }
            let classification = self.inspector.inspect(&url, self.now).await;
            self.seen.insert(key, classification);
            inspected += 1;
        }

        info!(org = %org.name, inspected, "discovered targets");
        Ok(())
    }

    /// Number of distinct repositories classified so far.
    pub fn classified(&self) -> usize {
        self.seen.len()
    }

    pub fn finish(self) -> Discovery {
        Discovery {
            classifications: self.seen.into_iter().collect(),
            targets: self.targets,
            failures: self.failures,
        }
    }
}

/// Run the discovery pass over `orgs`.
pub async fn discover(
    registry: &dyn Registry,
    inspector: &Inspector<'_>,
    orgs: &[Organization],
    now: DateTime<Utc>,
) -> Result<Discovery, StaleguardError> {
    let mut discoverer = Discoverer::new(registry, inspector, now);
    for org in orgs {
        discoverer.discover_org(org).await?;
    }
    Ok(discoverer.finish())
}
