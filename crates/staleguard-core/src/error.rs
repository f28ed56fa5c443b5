/// Central error type for staleguard.
#[derive(Debug, thiserror::Error)]
pub enum StaleguardError {
    #[error("authentication failed for {service}: {message}")]
    AuthFailed { service: String, message: String },

    #[error("missing credential: set the {var} environment variable or run `staleguard token set`")]
    MissingCredential { var: String },

    #[error("transient failure talking to {service}: {message}")]
    Transient { service: String, message: String },

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("credential error: {message}")]
    CredentialError { message: String },

    #[error("{0}")]
    Other(String),
}

impl StaleguardError {
    /// Errors that make the rest of the run meaningless.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StaleguardError::AuthFailed { .. } | StaleguardError::MissingCredential { .. }
        )
    }

    /// Errors worth another attempt under the retry policy.
    pub fn is_transient(&self) -> bool {
        matches!(self, StaleguardError::Transient { .. })
    }
}

/// Result of a mutation against the scanning platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// 2xx: the change was accepted.
    Applied,
    /// 422: the value was already in place.
    AlreadyApplied,
    /// 404: the project is gone or is a read-only import.
    NotFoundOrReadOnly,
    /// Nothing was sent.
    DryRun,
}

impl UpdateOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, UpdateOutcome::NotFoundOrReadOnly)
    }
}

impl std::fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateOutcome::Applied => write!(f, "applied"),
            UpdateOutcome::AlreadyApplied => write!(f, "already applied"),
            UpdateOutcome::NotFoundOrReadOnly => write!(f, "not found or read-only"),
            UpdateOutcome::DryRun => write!(f, "dry run"),
        }
    }
}
