use staleguard_core::config::StaleguardConfig;
use staleguard_core::error::StaleguardError;
use tracing::debug;

/// The two APIs a run needs a token for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Snyk,
    GitHub,
}

impl Service {
    /// Keychain account name for this service's token.
    pub fn credential_key(&self) -> &'static str {
        match self {
            Service::Snyk => "snyk",
            Service::GitHub => "github",
        }
    }

    /// Environment variable the token is read from first.
    pub fn env_var<'a>(&self, config: &'a StaleguardConfig) -> &'a str {
        match self {
            Service::Snyk => &config.snyk_token_env,
            Service::GitHub => &config.github_token_env,
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.credential_key())
    }
}

impl std::str::FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snyk" => Ok(Service::Snyk),
            "github" | "gh" => Ok(Service::GitHub),
            _ => Err(format!("unknown service: {s} (expected snyk or github)")),
        }
    }
}

/// Trait for credential storage backends.
pub trait CredentialStore: Send + Sync {
    /// Store a token under the given key.
    fn store(&self, key: &str, token: &str) -> Result<(), StaleguardError>;

    /// Retrieve a token by key.
    fn get(&self, key: &str) -> Result<Option<String>, StaleguardError>;

    /// Delete a stored token.
    fn delete(&self, key: &str) -> Result<(), StaleguardError>;
}

/// OS keychain-backed credential store using the `keyring` crate.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: "staleguard".to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, StaleguardError> {
        keyring::Entry::new(&self.service, key).map_err(|e| StaleguardError::CredentialError {
            message: e.to_string(),
        })
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn store(&self, key: &str, token: &str) -> Result<(), StaleguardError> {
        self.entry(key)?
            .set_password(token)
            .map_err(|e| StaleguardError::CredentialError {
                message: e.to_string(),
            })
    }

    fn get(&self, key: &str) -> Result<Option<String>, StaleguardError> {
        match self.entry(key)?.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StaleguardError::CredentialError {
                message: e.to_string(),
            }),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StaleguardError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StaleguardError::CredentialError {
                message: e.to_string(),
            }),
        }
    }
}

/// In-memory credential store for testing.
pub struct MemoryStore {
    store: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            store: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, std::collections::HashMap<String, String>> {
        self.store
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, key: &str, token: &str) -> Result<(), StaleguardError> {
        self.lock().insert(key.to_string(), token.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StaleguardError> {
        Ok(self.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), StaleguardError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Tokens for both APIs, resolved before any network call.
#[derive(Clone)]
pub struct Credentials {
    pub snyk_token: String,
    pub github_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("snyk_token", &"<redacted>")
            .field("github_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolve both tokens from the process environment, then the store.
    pub fn resolve(
        config: &StaleguardConfig,
        store: &dyn CredentialStore,
    ) -> Result<Self, StaleguardError> {
        Self::resolve_with(config, store, |var| std::env::var(var).ok())
    }

    /// Like [`Credentials::resolve`] with an explicit environment lookup.
    pub fn resolve_with(
        config: &StaleguardConfig,
        store: &dyn CredentialStore,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StaleguardError> {
        Ok(Self {
            snyk_token: resolve_token(Service::Snyk, config, store, &env)?,
            github_token: resolve_token(Service::GitHub, config, store, &env)?,
        })
    }
}

/// Resolve a single service's token, for commands that talk to one API.
pub fn token_for(
    service: Service,
    config: &StaleguardConfig,
    store: &dyn CredentialStore,
) -> Result<String, StaleguardError> {
    resolve_token(service, config, store, &|var: &str| std::env::var(var).ok())
}

fn resolve_token(
    service: Service,
    config: &StaleguardConfig,
    store: &dyn CredentialStore,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<String, StaleguardError> {
    let var = service.env_var(config);
    if let Some(token) = env(var).filter(|t| !t.trim().is_empty()) {
        debug!(%service, var, "token read from environment");
        return Ok(token.trim().to_string());
    }
    // keychain failures are reported as the missing variable
    match store.get(service.credential_key()) {
        Ok(Some(token)) if !token.trim().is_empty() => {
            debug!(%service, "token read from keychain");
            Ok(token.trim().to_string())
        }
        Ok(_) => Err(StaleguardError::MissingCredential {
            var: var.to_string(),
        }),
        Err(e) => {
            debug!(%service, error = %e, "keychain lookup failed");
            Err(StaleguardError::MissingCredential {
                var: var.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_memory_store_crud() {
        let store = MemoryStore::new();
        assert_eq!(store.get("test-key").unwrap(), None);
        store.store("test-key", "secret-token").unwrap();
        assert_eq!(store.get("test-key").unwrap(), Some("secret-token".to_string()));
        store.delete("test-key").unwrap();
        assert_eq!(store.get("test-key").unwrap(), None);
    }

    #[test]
    fn test_environment_takes_precedence() {
        let config = StaleguardConfig::default();
        let store = MemoryStore::new();
        store.store("snyk", "from-keychain").unwrap();
        let env = env_of(&[("SNYK_TOKEN", "from-env"), ("GITHUB_TOKEN", "gh-env")]);

        let creds = Credentials::resolve_with(&config, &store, env).unwrap();
        assert_eq!(creds.snyk_token, "from-env");
        assert_eq!(creds.github_token, "gh-env");
    }

    #[test]
    fn test_keychain_fallback() {
        let config = StaleguardConfig::default();
        let store = MemoryStore::new();
        store.store("github", "gh-keychain").unwrap();
        let env = env_of(&[("SNYK_TOKEN", "snyk-env"), ("GITHUB_TOKEN", "  ")]);

        let creds = Credentials::resolve_with(&config, &store, env).unwrap();
        assert_eq!(creds.github_token, "gh-keychain");
    }

    #[test]
    fn test_missing_token_fails_fast() {
        let mut config = StaleguardConfig::default();
        config.github_token_env = "GH_PAT".to_string();
        let store = MemoryStore::new();
        let env = env_of(&[("SNYK_TOKEN", "snyk-env")]);

        let err = Credentials::resolve_with(&config, &store, env).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, StaleguardError::MissingCredential { ref var } if var == "GH_PAT"));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let creds = Credentials {
            snyk_token: "s3cret".into(),
            github_token: "ghp_x".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("ghp_x"));
    }

    #[test]
    fn test_service_parse() {
        assert_eq!("GitHub".parse::<Service>().unwrap(), Service::GitHub);
        assert_eq!("snyk".parse::<Service>().unwrap(), Service::Snyk);
        assert!("gitlab".parse::<Service>().is_err());
    }
}
