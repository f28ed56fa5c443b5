use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use staleguard_core::config::StaleguardConfig;
use staleguard_core::error::{StaleguardError, UpdateOutcome};
use staleguard_core::models::org::{OrgId, Organization};
use staleguard_core::models::project::{Criticality, Project, ProjectId, Tag};
use staleguard_core::models::target::{Target, TargetId};
use staleguard_core::retry::RetryPolicy;

use crate::Registry;

const SERVICE: &str = "snyk";
const JSON_API: &str = "application/vnd.api+json";
const PAGE_LIMIT: &str = "100";

/// REST + v1 client for the Snyk platform.
pub struct SnykRegistry {
    client: reqwest::Client,
    rest_url: url::Url,
    v1_url: String,
    api_version: String,
    retry: RetryPolicy,
}

impl SnykRegistry {
    pub fn from_config(config: &StaleguardConfig, token: &str) -> Result<Self, StaleguardError> {
        let rest_base = config.rest_base();
        let rest_url = url::Url::parse(&rest_base).map_err(|e| StaleguardError::Config {
            message: format!("invalid REST url {rest_base}: {e}"),
        })?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("token {token}")).map_err(|_| {
            StaleguardError::CredentialError {
                message: "Snyk token contains invalid header characters".into(),
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
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| StaleguardError::Other(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            rest_url,
            v1_url: config.v1_base().trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            retry: config.retry_policy(),
        })
    }

    fn rest(&self, path: &str) -> String {
        let base = self.rest_url.as_str().trim_end_matches('/');
        format!("{base}{path}")
    }

    fn v1(&self, path: &str) -> String {
        format!("{}{path}", self.v1_url)
    }

    /// Resolve a `links.next` value, which may be absolute, rooted at the REST path, or relative to it.
    fn next_url(&self, next: &str) -> String {
        if next.starts_with("http://") || next.starts_with("https://") {
            return next.to_string();
        }
        let base_path = self.rest_url.path().trim_end_matches('/');
        if !base_path.is_empty() && next.starts_with(&format!("{base_path}/")) {
            let origin = self.rest_url.origin().ascii_serialization();
            return format!("{origin}{next}");
        }
        if next.starts_with('/') {
            self.rest(next)
        } else {
            self.rest(&format!("/{next}"))
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StaleguardError> {
        self.retry
            .run(&format!("GET {url}"), || async {
                let resp = self
                    .client
                    .get(url)
                    .header(header::ACCEPT, JSON_API)
                    .query(query)
                    .send()
                    .await
                    .map_err(transport)?;
                let resp = check_read(resp, url).await?;
                resp.json::<T>().await.map_err(|e| {
                    StaleguardError::Serialization(format!("unexpected payload from {url}: {e}"))
                })
            })
            .await
    }

    /// Follow `links.next` until the platform stops sending one.
    async fn paginated_get<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StaleguardError> {
        let mut all = Vec::new();
        let first = [("version", self.api_version.as_str()), ("limit", PAGE_LIMIT)];
        let mut url = self.rest(path);
        let mut query: &[(&str, &str)] = &first;
        let mut pages = 0u32;

        loop {
            let page: Page<T> = self.get_json(&url, query).await?;
            pages += 1;
            all.extend(page.data);

            match page.links.and_then(|l| l.next).filter(|n| !n.is_empty()) {
                Some(next) => {
                    url = self.next_url(&next);
                    // next links carry version and cursor already
                    query = &[];
                }
                None => break,
            }
        }

        debug!(path, pages, items = all.len(), "paginated listing complete");
        Ok(all)
    }

    async fn mutate<F>(&self, what: &str, build: F) -> Result<UpdateOutcome, StaleguardError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        self.retry
            .run(what, || async {
                let resp = build().send().await.map_err(transport)?;
                mutation_outcome(resp).await
            })
            .await
    }
}

fn transport(e: reqwest::Error) -> StaleguardError {
    StaleguardError::Transient {
        service: SERVICE.into(),
        message: e.to_string(),
    }
}

async fn check_read(resp: Response, url: &str) -> Result<Response, StaleguardError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED => StaleguardError::AuthFailed {
            service: SERVICE.into(),
            message: body,
        },
        StatusCode::NOT_FOUND => StaleguardError::NotFound {
            resource: url.to_string(),
        },
        s if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error() => {
            StaleguardError::Transient {
                service: SERVICE.into(),
                message: format!("{s} from {url}"),
            }
        }
        s => StaleguardError::ApiError {
            status: s.as_u16(),
            message: body,
        },
    })
}

async fn mutation_outcome(resp: Response) -> Result<UpdateOutcome, StaleguardError> {
    let status = resp.status();
    match status {
        s if s.is_success() => Ok(UpdateOutcome::Applied),
        StatusCode::UNPROCESSABLE_ENTITY => Ok(UpdateOutcome::AlreadyApplied),
        StatusCode::NOT_FOUND => Ok(UpdateOutcome::NotFoundOrReadOnly),
        StatusCode::UNAUTHORIZED => Err(StaleguardError::AuthFailed {
            service: SERVICE.into(),
            message: resp.text().await.unwrap_or_default(),
        }),
        s if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error() => {
            Err(StaleguardError::Transient {
                service: SERVICE.into(),
                message: s.to_string(),
            })
        }
        s => Err(StaleguardError::ApiError {
            status: s.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        }),
    }
}

#[derive(Deserialize)]
struct Page<T> {
    data: Vec<T>,
    #[serde(default)]
    links: Option<Links>,
}

#[derive(Deserialize)]
struct Links {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct Single<T> {
    data: T,
}

#[derive(Deserialize)]
struct OrgResource {
    id: String,
    attributes: OrgAttributes,
}

#[derive(Deserialize)]
struct OrgAttributes {
    name: String,
    #[serde(default)]
    slug: Option<String>,
}

#[derive(Deserialize)]
struct TargetResource {
    id: String,
    #[serde(default)]
    attributes: TargetAttributes,
}

#[derive(Default, Deserialize)]
struct TargetAttributes {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct ProjectResource {
    id: String,
    attributes: ProjectAttributes,
    #[serde(default)]
    relationships: Option<ProjectRelationships>,
}

#[derive(Deserialize)]
struct ProjectAttributes {
    name: String,
    #[serde(default)]
    tags: Option<Vec<Tag>>,
    #[serde(default)]
    business_criticality: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ProjectRelationships {
    #[serde(default)]
    target: Option<Relationship>,
}

#[derive(Deserialize)]
struct Relationship {
    data: RelationshipData,
}

#[derive(Deserialize)]
struct RelationshipData {
    id: String,
}

impl From<OrgResource> for Organization {
    fn from(r: OrgResource) -> Self {
        Organization {
            id: OrgId(r.id),
            name: r.attributes.name,
            slug: r.attributes.slug,
        }
    }
}

impl From<TargetResource> for Target {
    fn from(r: TargetResource) -> Self {
        Target {
            display_name: r.attributes.display_name.unwrap_or_else(|| r.id.clone()),
            id: TargetId(r.id),
            url: r.attributes.url.filter(|u| !u.trim().is_empty()),
        }
    }
}

impl ProjectResource {
    fn into_project(self, org: &OrgId) -> Project {
        let target_id = self
            .relationships
            .and_then(|r| r.target)
            .map(|t| TargetId(t.data.id));
        let business_criticality = self
            .attributes
            .business_criticality
            .unwrap_or_default()
            .iter()
            .filter_map(|c| c.parse::<Criticality>().ok())
            .collect();
        Project {
            id: ProjectId(self.id),
            name: self.attributes.name,
            org_id: org.clone(),
            target_id,
            tags: self.attributes.tags.unwrap_or_default(),
            business_criticality,
        }
    }
}

#[async_trait]
impl Registry for SnykRegistry {
    async fn list_organizations(&self) -> Result<Vec<Organization>, StaleguardError> {
        let orgs: Vec<OrgResource> = self.paginated_get("/orgs").await?;
        Ok(orgs.into_iter().map(Organization::from).collect())
    }

    async fn list_targets(&self, org: &OrgId) -> Result<Vec<Target>, StaleguardError> {
        let targets: Vec<TargetResource> =
            self.paginated_get(&format!("/orgs/{org}/targets")).await?;
        Ok(targets.into_iter().map(Target::from).collect())
    }

    async fn list_projects(&self, org: &OrgId) -> Result<Vec<Project>, StaleguardError> {
        let projects: Vec<ProjectResource> =
            self.paginated_get(&format!("/orgs/{org}/projects")).await?;
        Ok(projects.into_iter().map(|p| p.into_project(org)).collect())
    }

    async fn resolve_target(&self, org: &OrgId, target: &TargetId) -> Result<Target, StaleguardError> {
        let url = self.rest(&format!("/orgs/{org}/targets/{target}"));
        let single: Single<TargetResource> = self
            .get_json(&url, &[("version", self.api_version.as_str())])
            .await?;
        Ok(single.data.into())
    }

    async fn add_tag(
        &self,
        org: &OrgId,
        project: &ProjectId,
        tag: &Tag,
    ) -> Result<UpdateOutcome, StaleguardError> {
        let url = self.v1(&format!("/org/{org}/project/{project}/tags"));
        self.mutate(&format!("add tag {tag} to {project}"), || {
            self.client.post(&url).json(tag)
        })
        .await
    }

    async fn remove_tag(
        &self,
        org: &OrgId,
        project: &ProjectId,
        tag: &Tag,
    ) -> Result<UpdateOutcome, StaleguardError> {
        let url = self.v1(&format!("/org/{org}/project/{project}/tags/remove"));
        self.mutate(&format!("remove tag {tag} from {project}"), || {
            self.client.post(&url).json(tag)
        })
        .await
    }

    async fn set_criticality(
        &self,
        org: &OrgId,
        project: &ProjectId,
        criticality: Criticality,
    ) -> Result<UpdateOutcome, StaleguardError> {
        let url = self.rest(&format!("/orgs/{org}/projects/{project}"));
        let body = serde_json::json!({
            "data": {
                "attributes": { "business_criticality": [criticality] },
                "id": project.as_str(),
                "type": "project",
                "relationships": {}
            }
        });
        let body = serde_json::to_vec(&body)
            .map_err(|e| StaleguardError::Serialization(e.to_string()))?;
        let outcome = self
            .mutate(&format!("set criticality of {project}"), || {
                self.client
                    .patch(&url)
                    .query(&[("version", self.api_version.as_str())])
                    .header(header::ACCEPT, JSON_API)
                    .header(header::CONTENT_TYPE, JSON_API)
                    .body(body.clone())
            })
            .await?;
        if outcome == UpdateOutcome::NotFoundOrReadOnly {
            warn!(%org, %project, "project not found, likely read-only");
        }
        Ok(outcome)
    }

    async fn deactivate(
        &self,
        org: &OrgId,
        project: &ProjectId,
    ) -> Result<UpdateOutcome, StaleguardError> {
        let url = self.v1(&format!("/org/{org}/project/{project}/deactivate"));
        self.mutate(&format!("deactivate {project}"), || self.client.post(&url))
            .await
    }
}
