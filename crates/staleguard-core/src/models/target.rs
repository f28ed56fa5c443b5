use serde::{Deserialize, Serialize};

/// Platform identifier for a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One source-control repository known to an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub display_name: String,
    /// Remote repository URL. CLI and container imports have none.
    pub url: Option<String>,
}

impl Target {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, url: Option<&str>) -> Self {
        Self {
            id: TargetId(id.into()),
            display_name: display_name.into(),
            url: url.map(str::to_string),
        }
    }
}
