use staleguard_core::error::UpdateOutcome;
use staleguard_core::models::classification::{Classification, InaccessibleReason};
use staleguard_core::models::project::{Criticality, Tag};

/// Why a project was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Its repository could not be classified; prior tags stay as they are.
    Inaccessible(InaccessibleReason),
    /// The project references no target.
    NoTarget,
    /// The target has no repository URL (CLI or image imports).
    NoRepositoryUrl,
    /// The URL was not seen during discovery.
    NotClassified,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Inaccessible(reason) => write!(f, "repository inaccessible ({reason})"),
            SkipReason::NoTarget => write!(f, "no target"),
            SkipReason::NoRepositoryUrl => write!(f, "target has no repository url"),
            SkipReason::NotClassified => write!(f, "repository not classified"),
        }
    }
}

/// What happened to one project during the update pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectOutcome {
    Updated {
        classification: Classification,
        tag: Tag,
        criticality: Criticality,
        criticality_outcome: UpdateOutcome,
        deactivation: Option<UpdateOutcome>,
    },
    /// The platform answered 404 to a mutation.
    ReadOnly,
    Skipped(SkipReason),
    Failed(String),
}

impl ProjectOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectOutcome::Updated {
                deactivation: Some(_),
                ..
            } => "deactivated",
            ProjectOutcome::Updated { classification, .. } if classification.is_stale() => {
                "tagged inactive"
            }
            ProjectOutcome::Updated { .. } => "tagged active",
            ProjectOutcome::ReadOnly => "read-only",
            ProjectOutcome::Skipped(_) => "skipped",
            ProjectOutcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectReport {
    pub org: String,
    pub project: String,
    pub url: Option<String>,
    pub outcome: ProjectOutcome,
}

#[derive(Debug, Clone)]
pub struct OrgFailureReport {
    pub org: String,
    pub message: String,
}

/// Per-classification repository counts from the discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryCounts {
    pub active: usize,
    pub stale: usize,
    pub archived: usize,
    pub inaccessible: usize,
}

impl RepositoryCounts {
    pub fn record(&mut self, classification: &Classification) {
        match classification {
            Classification::Active => self.active += 1,
            Classification::Stale => self.stale += 1,
            Classification::Archived => self.archived += 1,
            Classification::Inaccessible(_) => self.inaccessible += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.active + self.stale + self.archived + self.inaccessible
    }
}

/// Per-project counts from the update pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub tagged_active: usize,
    pub tagged_inactive: usize,
    pub deactivated: usize,
    pub read_only: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Everything a run did, for rendering and exit-code decisions.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub dry_run: bool,
    pub repositories: RepositoryCounts,
    pub projects: Vec<ProjectReport>,
    pub org_failures: Vec<OrgFailureReport>,
}

impl RunReport {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for report in &self.projects {
            match &report.outcome {
                ProjectOutcome::Updated {
                    classification,
                    deactivation,
                    ..
                } => {
                    if classification.is_stale() {
                        summary.tagged_inactive += 1;
                    } else {
                        summary.tagged_active += 1;
                    }
                    if deactivation.is_some_and(|d| d.is_success()) {
                        summary.deactivated += 1;
                    }
                }
                ProjectOutcome::ReadOnly => summary.read_only += 1,
                ProjectOutcome::Skipped(_) => summary.skipped += 1,
                ProjectOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Project or organization failures that a strict run should report.
    pub fn has_failures(&self) -> bool {
        !self.org_failures.is_empty()
            || self
                .projects
                .iter()
                .any(|p| matches!(p.outcome, ProjectOutcome::Failed(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: ProjectOutcome) -> ProjectReport {
        ProjectReport {
            org: "Alpha".into(),
            project: "widgets".into(),
            url: None,
            outcome,
        }
    }

    fn updated(classification: Classification, deactivation: Option<UpdateOutcome>) -> ProjectOutcome {
        ProjectOutcome::Updated {
            tag: classification.status_tag("active_repo").unwrap(),
            criticality: classification.criticality().unwrap(),
            classification,
            criticality_outcome: UpdateOutcome::Applied,
            deactivation,
        }
    }

    #[test]
    fn test_summary_counts() {
        let run = RunReport {
            projects: vec![
                report(updated(Classification::Active, None)),
                report(updated(Classification::Stale, None)),
                report(updated(Classification::Archived, Some(UpdateOutcome::Applied))),
                report(ProjectOutcome::ReadOnly),
                report(ProjectOutcome::Skipped(SkipReason::NoTarget)),
            ],
            ..RunReport::default()
        };
        let summary = run.summary();
        assert_eq!(summary.tagged_active, 1);
        assert_eq!(summary.tagged_inactive, 2);
        assert_eq!(summary.deactivated, 1);
        assert_eq!(summary.read_only, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!run.has_failures());
    }

    #[test]
    fn test_failures_are_detected() {
        let mut run = RunReport::default();
        run.projects.push(report(ProjectOutcome::Failed("502".into())));
        assert!(run.has_failures());

        let mut run = RunReport::default();
        run.org_failures.push(OrgFailureReport {
            org: "Beta".into(),
            message: "timeout".into(),
        });
        assert!(run.has_failures());
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            updated(Classification::Archived, Some(UpdateOutcome::Applied)).label(),
            "deactivated"
        );
        assert_eq!(updated(Classification::Stale, None).label(), "tagged inactive");
        assert_eq!(updated(Classification::Active, None).label(), "tagged active");
    }
}
