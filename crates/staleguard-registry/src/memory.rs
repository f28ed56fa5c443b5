use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use staleguard_core::error::{StaleguardError, UpdateOutcome};
use staleguard_core::models::org::{OrgId, Organization};
use staleguard_core::models::project::{Criticality, Project, ProjectId, Tag};
use staleguard_core::models::target::{Target, TargetId};

use crate::Registry;

/// A recorded call against [`MemoryRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    ListTargets(OrgId),
    ListProjects(OrgId),
    ResolveTarget(TargetId),
    AddTag(ProjectId, Tag),
    RemoveTag(ProjectId, Tag),
    SetCriticality(ProjectId, Criticality),
    Deactivate(ProjectId),
}

#[derive(Default)]
struct State {
    orgs: Vec<Organization>,
    targets: HashMap<OrgId, Vec<Target>>,
    unlisted: HashMap<OrgId, Vec<Target>>,
    projects: HashMap<OrgId, Vec<Project>>,
    read_only: HashSet<ProjectId>,
    deactivated: HashSet<ProjectId>,
    broken_orgs: HashSet<OrgId>,
    calls: Vec<RegistryCall>,
}

/// In-memory platform for testing. Mutations update the stored projects.
///
/// Setting a criticality that is already in place answers `AlreadyApplied`,
/// the way the platform answers 422.
#[derive(Default)]
pub struct MemoryRegistry {
    state: Mutex<State>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_org(self, org: Organization) -> Self {
        self.lock().orgs.push(org);
        self
    }

    pub fn with_target(self, org: &OrgId, target: Target) -> Self {
        self.lock()
            .targets
            .entry(org.clone())
            .or_default()
            .push(target);
        self
    }

    /// A target that `resolve_target` finds but `list_targets` leaves out.
    pub fn with_unlisted_target(self, org: &OrgId, target: Target) -> Self {
        self.lock()
            .unlisted
            .entry(org.clone())
            .or_default()
            .push(target);
        self
    }

    pub fn with_project(self, project: Project) -> Self {
        self.lock()
            .projects
            .entry(project.org_id.clone())
            .or_default()
            .push(project);
        self
    }

    /// Mutations against this project answer `NotFoundOrReadOnly`.
    pub fn with_read_only(self, project: &ProjectId) -> Self {
        self.lock().read_only.insert(project.clone());
        self
    }

    /// Listings for this org fail with a transient error.
    pub fn with_broken_org(self, org: &OrgId) -> Self {
        self.lock().broken_orgs.insert(org.clone());
        self
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.lock().calls.clone()
    }

    /// Mutating calls only, in order.
    pub fn mutations(&self) -> Vec<RegistryCall> {
        self.calls()
            .into_iter()
            .filter(|c| {
                !matches!(
                    c,
                    RegistryCall::ListTargets(_)
                        | RegistryCall::ListProjects(_)
                        | RegistryCall::ResolveTarget(_)
                )
            })
            .collect()
    }

    pub fn project(&self, id: &ProjectId) -> Option<Project> {
        self.lock()
            .projects
            .values()
            .flatten()
            .find(|p| &p.id == id)
            .cloned()
    }

    pub fn is_deactivated(&self, id: &ProjectId) -> bool {
        self.lock().deactivated.contains(id)
    }

    fn listing_guard(state: &State, org: &OrgId) -> Result<(), StaleguardError> {
        if state.broken_orgs.contains(org) {
            return Err(StaleguardError::Transient {
                service: "memory".into(),
                message: format!("org {org} unavailable"),
            });
        }
        Ok(())
    }

    fn mutate_project(
        &self,
        org: &OrgId,
        id: &ProjectId,
        call: RegistryCall,
        apply: impl FnOnce(&mut Project) -> bool,
    ) -> UpdateOutcome {
        let mut state = self.lock();
        state.calls.push(call);
        if state.read_only.contains(id) {
            return UpdateOutcome::NotFoundOrReadOnly;
        }
        let project = state
            .projects
            .get_mut(org)
            .and_then(|ps| ps.iter_mut().find(|p| &p.id == id));
        match project {
            Some(project) => {
                if apply(project) {
                    UpdateOutcome::Applied
                } else {
                    UpdateOutcome::AlreadyApplied
                }
            }
            None => UpdateOutcome::NotFoundOrReadOnly,
        }
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn list_organizations(&self) -> Result<Vec<Organization>, StaleguardError> {
        Ok(self.lock().orgs.clone())
    }

    async fn list_targets(&self, org: &OrgId) -> Result<Vec<Target>, StaleguardError> {
        let mut state = self.lock();
        state.calls.push(RegistryCall::ListTargets(org.clone()));
        Self::listing_guard(&state, org)?;
        Ok(state.targets.get(org).cloned().unwrap_or_default())
    }

    async fn list_projects(&self, org: &OrgId) -> Result<Vec<Project>, StaleguardError> {
        let mut state = self.lock();
        state.calls.push(RegistryCall::ListProjects(org.clone()));
        Self::listing_guard(&state, org)?;
        Ok(state.projects.get(org).cloned().unwrap_or_default())
    }

    async fn resolve_target(&self, org: &OrgId, target: &TargetId) -> Result<Target, StaleguardError> {
        let mut state = self.lock();
        state.calls.push(RegistryCall::ResolveTarget(target.clone()));
        let resolved = [&state.targets, &state.unlisted]
            .into_iter()
            .filter_map(|by_org| by_org.get(org))
            .flatten()
            .find(|t| &t.id == target)
            .cloned()
            .ok_or_else(|| StaleguardError::NotFound {
                resource: format!("target {target}"),
            });
        resolved
    }

    async fn add_tag(
        &self,
        org: &OrgId,
        project: &ProjectId,
        tag: &Tag,
    ) -> Result<UpdateOutcome, StaleguardError> {
        let call = RegistryCall::AddTag(project.clone(), tag.clone());
        Ok(self.mutate_project(org, project, call, |p| {
            if p.has_tag(tag) {
                false
            } else {
                p.tags.push(tag.clone());
                true
            }
        }))
    }

    async fn remove_tag(
        &self,
        org: &OrgId,
        project: &ProjectId,
        tag: &Tag,
    ) -> Result<UpdateOutcome, StaleguardError> {
        let call = RegistryCall::RemoveTag(project.clone(), tag.clone());
        Ok(self.mutate_project(org, project, call, |p| {
            let before = p.tags.len();
            p.tags.retain(|t| t != tag);
            p.tags.len() != before
        }))
    }

    async fn set_criticality(
        &self,
        org: &OrgId,
        project: &ProjectId,
        criticality: Criticality,
    ) -> Result<UpdateOutcome, StaleguardError> {
        let call = RegistryCall::SetCriticality(project.clone(), criticality);
        Ok(self.mutate_project(org, project, call, |p| {
            if p.business_criticality == [criticality] {
                false
            } else {
                p.business_criticality = vec![criticality];
                true
            }
        }))
    }

    async fn deactivate(
        &self,
        org: &OrgId,
        project: &ProjectId,
    ) -> Result<UpdateOutcome, StaleguardError> {
        let outcome = self.mutate_project(org, project, RegistryCall::Deactivate(project.clone()), |_| true);
        if outcome == UpdateOutcome::Applied {
            self.lock().deactivated.insert(project.clone());
        }
        Ok(outcome)
    }
}
