use serde::{Deserialize, Serialize};

/// Platform identifier for an organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrgId(pub String);

impl OrgId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrgId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An organization on the scanning platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    pub slug: Option<String>,
}

impl Organization {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: OrgId(id.into()),
            name: name.into(),
            slug: None,
        }
    }

    /// True when `selector` names this org by id, name or slug.
    pub fn matches(&self, selector: &str) -> bool {
        self.id.0 == selector
            || self.name.eq_ignore_ascii_case(selector)
            || self
                .slug
                .as_deref()
                .is_some_and(|slug| slug.eq_ignore_ascii_case(selector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_by_id_name_or_slug() {
        let mut org = Organization::new("0f3c", "Payments Team");
        org.slug = Some("payments-team".to_string());
        assert!(org.matches("0f3c"));
        assert!(org.matches("payments team"));
        assert!(org.matches("PAYMENTS-TEAM"));
        assert!(!org.matches("0F3C"));
        assert!(!org.matches("payments"));
    }
}
