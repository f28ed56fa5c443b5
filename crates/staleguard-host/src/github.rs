use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use staleguard_core::error::StaleguardError;

use crate::{HostProvider, RepoLookup, RepoMetadata};

const SERVICE: &str = "github";

pub struct GitHubProvider {
    client: reqwest::Client,
    api_url: url::Url,
}

impl GitHubProvider {
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Result<Self, StaleguardError> {
        let api_url = url::Url::parse(api_url).map_err(|e| StaleguardError::Config {
            message: format!("invalid GitHub API url {api_url}: {e}"),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            StaleguardError::CredentialError {
                message: "GitHub token contains invalid header characters".into(),
            }
        })?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(concat!("staleguard/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| StaleguardError::Other(format!("failed to build http client: {e}")))?;

        Ok(Self { client, api_url })
    }

    fn url(&self, path: &str) -> String {
        let base = self.api_url.as_str().trim_end_matches('/');
        format!("{base}{path}")
    }
}

#[derive(Deserialize)]
struct GhRepo {
    pushed_at: Option<String>,
    archived: Option<bool>,
}

/// GitHub writes `YYYY-MM-DDTHH:MM:SSZ`; accept any RFC 3339 form as well.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ")
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

impl From<GhRepo> for RepoMetadata {
    fn from(r: GhRepo) -> Self {
        RepoMetadata {
            pushed_at: r.pushed_at.as_deref().and_then(parse_timestamp),
            archived: r.archived,
        }
    }
}

fn is_rate_limited(resp: &reqwest::Response) -> bool {
    resp.status() == StatusCode::TOO_MANY_REQUESTS
        || resp
            .headers()
            .get("x-ratelimit-remaining")
            .is_some_and(|v| v.as_bytes() == b"0")
}

#[async_trait]
impl HostProvider for GitHubProvider {
    async fn repo_metadata(&self, owner: &str, name: &str) -> Result<RepoLookup, StaleguardError> {
        let url = self.url(&format!("/repos/{owner}/{name}"));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StaleguardError::Transient {
                service: SERVICE.into(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        match status {
            StatusCode::NOT_FOUND => return Ok(RepoLookup::NotFound),
            StatusCode::UNAUTHORIZED => return Ok(RepoLookup::BadCredentials),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS if is_rate_limited(&resp) => {
                return Err(StaleguardError::Transient {
                    service: SERVICE.into(),
                    message: format!("rate limited ({status})"),
                })
            }
            StatusCode::FORBIDDEN => return Ok(RepoLookup::Forbidden),
            s if s.is_server_error() => {
                return Err(StaleguardError::Transient {
                    service: SERVICE.into(),
                    message: format!("server error ({s})"),
                })
            }
            s if !s.is_success() => {
                let body = resp.text().await.unwrap_or_default();
                return Err(StaleguardError::ApiError {
                    status: s.as_u16(),
                    message: body,
                });
            }
            _ => {}
        }

        let body = resp.text().await.map_err(|e| StaleguardError::Transient {
            service: SERVICE.into(),
            message: e.to_string(),
        })?;
        match serde_json::from_str::<GhRepo>(&body) {
            Ok(repo) => Ok(RepoLookup::Found(repo.into())),
            Err(e) => {
                debug!(owner, name, error = %e, "unexpected repository payload");
                Ok(RepoLookup::Found(RepoMetadata::default()))
            }
        }
    }
}
