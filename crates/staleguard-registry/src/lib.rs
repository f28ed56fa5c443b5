pub mod memory;
pub mod snyk;

use async_trait::async_trait;

use staleguard_core::error::{StaleguardError, UpdateOutcome};
use staleguard_core::models::org::{OrgId, Organization};
use staleguard_core::models::project::{Criticality, Project, ProjectId, Tag};
use staleguard_core::models::target::{Target, TargetId};

/// Trait for the scanning platform's organization, target and project APIs.
///
/// Listings follow the platform's next-page cursor until it runs out. Mutations
/// report non-error status codes through [`UpdateOutcome`].
#[async_trait]
pub trait Registry: Send + Sync {
    /// List every organization visible to the token.
    async fn list_organizations(&self) -> Result<Vec<Organization>, StaleguardError>;

    /// List the targets of an organization.
    async fn list_targets(&self, org: &OrgId) -> Result<Vec<Target>, StaleguardError>;

    /// List the projects of an organization. Projects reference targets by id only.
    async fn list_projects(&self, org: &OrgId) -> Result<Vec<Project>, StaleguardError>;

    /// Fetch a single target to read its repository URL.
    async fn resolve_target(&self, org: &OrgId, target: &TargetId) -> Result<Target, StaleguardError>;

    async fn add_tag(
        &self,
        org: &OrgId,
        project: &ProjectId,
        tag: &Tag,
    ) -> Result<UpdateOutcome, StaleguardError>;

    async fn remove_tag(
        &self,
        org: &OrgId,
        project: &ProjectId,
        tag: &Tag,
    ) -> Result<UpdateOutcome, StaleguardError>;

    async fn set_criticality(
        &self,
        org: &OrgId,
        project: &ProjectId,
        criticality: Criticality,
    ) -> Result<UpdateOutcome, StaleguardError>;

    async fn deactivate(
        &self,
        org: &OrgId,
        project: &ProjectId,
    ) -> Result<UpdateOutcome, StaleguardError>;
}
