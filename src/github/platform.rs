//! Github Platform
use std::{future::Future, pin::Pin};

use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use urlencoding::encode;

use super::{
    config::GithubTarget, queries, GITHUB_ACCEPT, GITHUB_API_HEADER, GITHUB_API_URL,
    GITHUB_API_VERSION, GITHUB_GRAPHQL_API_URL,
};
use crate::{
    context::Scope,
    errors::{OrgMoverError, OrgMoverErrorKind},
    http::{with_query, ApiClient, Outcome},
    pagination::{collect_pages, Connection, Cursor, Edge, Page},
    platform::{normalize_server_url, Platform, PlatformType},
};

/// Page size of REST endpoints capped at 100 items
pub(crate) const MAX_PER_PAGE: u32 = 100;

/// Github Platform
#[derive(Debug, Clone)]
pub struct GithubPlatform {
    /// HTTP client
    client: ApiClient,

    /// Cloud or Server
    target: GithubTarget,

    /// REST base url
    rest_url: String,

    /// GraphQL endpoint
    graphql_url: String,
}

/// `organization` field of a GraphQL answer
#[derive(Deserialize, Debug)]
pub(crate) struct OrganizationData<T> {
    /// Organization, null if it doesn't exist
    pub organization: Option<T>,
}

/// `team` field of an organization
#[derive(Deserialize, Debug)]
pub(crate) struct TeamData<T> {
    /// Team, null if it doesn't exist
    pub team: Option<T>,
}

/// Connection counter
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Count {
    /// Number of items
    pub total_count: u64,
}

/// Repository as listed by the REST API
#[derive(Deserialize, Debug, Clone)]
pub(crate) struct RestRepo {
    /// Name of the repository
    pub name: String,
}

/// Branch as listed by the REST API
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct RestBranch {
    /// Branch name
    pub name: String,

    /// Head commit
    pub commit: RestCommit,

    /// Whether the branch is protected
    #[serde(default)]
    pub protected: bool,
}

/// Commit reference of a branch
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct RestCommit {
    /// Commit sha
    pub sha: String,
}

/// `repositoryMigrations` node
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepositoryMigration {
    /// Name of the migrated repository
    pub repository_name: String,
    /// Creation date
    pub created_at: Option<String>,
    /// Migration state
    pub state: String,
    /// Reason of a failure
    pub failure_reason: Option<String>,
    /// Number of warnings
    #[serde(default)]
    pub warnings_count: u64,
    /// Url of the migration log
    pub migration_log_url: Option<String>,
    /// Url of the source repository
    pub source_url: Option<String>,
}

impl RepositoryMigration {
    /// Whether the migration didn't fail
    pub fn is_migrated(&self) -> bool {
        !matches!(self.state.as_str(), "FAILED" | "FAILED_VALIDATION")
    }
}

/// `repositoryMigrations` field
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct MigrationsField {
    /// Migrations page
    repository_migrations: Connection<Edge<RepositoryMigration>>,
}

impl GithubPlatform {
    /// Create a new GithubPlatform, targeting GitHub Enterprise Server when a server url is given
    /// # Errors
    /// Error if the server url is invalid or the client can't be built
    pub(crate) fn new(
        token: String,
        server_url: Option<&str>,
        allow_untrusted_ssl_certificates: bool,
    ) -> Result<Self, OrgMoverError> {
        let (target, rest_url, graphql_url) = match server_url {
            Some(server_url) => {
                let server_url = normalize_server_url(server_url)?;
                (
                    GithubTarget::Server,
                    format!("{server_url}/api/v3"),
                    format!("{server_url}/api/graphql"),
                )
            }
            None => (
                GithubTarget::Cloud,
                GITHUB_API_URL.to_string(),
                GITHUB_GRAPHQL_API_URL.to_string(),
            ),
        };
        let client = ApiClient::new(
            target.platform_type(),
            token,
            GITHUB_ACCEPT,
            allow_untrusted_ssl_certificates,
        )?
        .with_header(GITHUB_API_HEADER, GITHUB_API_VERSION);
        Ok(Self {
            client,
            target,
            rest_url,
            graphql_url,
        })
    }

    /// `ghes` or `ghec`, used in file names
    pub fn flavor(&self) -> &'static str {
        match self.target {
            GithubTarget::Cloud => "ghec",
            GithubTarget::Server => "ghes",
        }
    }

    /// HTTP client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// REST url of a path
    pub fn rest(&self, path: &str) -> String {
        format!("{}{path}", self.rest_url)
    }

    /// REST url of a repository
    pub fn repo_url(&self, org: &str, repo: &str) -> String {
        self.rest(&format!("/repos/{}/{}", encode(org), encode(repo)))
    }

    /// Run a GraphQL query or mutation
    /// # Errors
    /// Error if the request fails or the answer carries GraphQL errors
    pub(crate) async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, OrgMoverError> {
        self.client.graphql(&self.graphql_url, query, variables).await
    }

    /// Run a GraphQL query returning an organization
    /// # Errors
    /// Error if the query fails or the organization doesn't exist
    pub(crate) async fn organization<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, OrgMoverError> {
        let org = variables["org"].as_str().unwrap_or_default().to_string();
        let data: OrganizationData<T> = self
            .client
            .graphql(&self.graphql_url, query, variables)
            .await?;
        data.organization.ok_or_else(|| {
            OrgMoverError::new(OrgMoverErrorKind::GraphQl)
                .with_platform(self.target.platform_type())
                .with_text(&format!("Organization '{org}' not found"))
        })
    }

    /// Every item of a page-numbered REST endpoint
    /// # Errors
    /// Error if a page can't be fetched
    pub(crate) async fn rest_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        per_page: u32,
        scope: &Scope,
        label: &str,
    ) -> Result<Vec<T>, OrgMoverError> {
        let base = self.rest(path);
        let client = &self.client;
        collect_pages(&scope.throttle, label, |cursor| {
            let page = Cursor::page_number(cursor.as_ref());
            let mut query: Vec<(&str, String)> =
                params.iter().map(|(k, v)| (*k, v.to_string())).collect();
            query.push(("per_page", per_page.to_string()));
            query.push(("page", page.to_string()));
            let url = with_query(&base, &query);
            async move {
                let items: Vec<T> = client.get_json(&url?).await?;
                Ok(Page::numbered(items, page, per_page))
            }
        })
        .await
    }

    /// Every item of a page-numbered REST endpoint, or the outcome of the first failed page
    pub(crate) async fn rest_pages_or_status<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        per_page: u32,
        scope: &Scope,
    ) -> Result<Vec<T>, Outcome> {
        let base = self.rest(path);
        let mut items = vec![];
        let mut page: u32 = 1;
        loop {
            let mut query: Vec<(&str, String)> =
                params.iter().map(|(k, v)| (*k, v.to_string())).collect();
            query.push(("per_page", per_page.to_string()));
            query.push(("page", page.to_string()));
            let url = with_query(&base, &query).map_err(|e| Outcome {
                status: "400".into(),
                status_text: "Bad Request".into(),
                error_message: e.to_string(),
            })?;
            let response = self.client.request(Method::GET, &url, None).await;
            if response.failed() {
                return Err(response.outcome());
            }
            let page_items: Vec<T> = serde_json::from_value(response.data).map_err(|e| Outcome {
                status: "500".into(),
                status_text: "Invalid answer".into(),
                error_message: e.to_string(),
            })?;
            let next = Page::numbered(page_items, page, per_page);
            items.extend(next.items);
            match next.next {
                Some(Cursor::Page(next_page)) => {
                    scope.throttle.wait().await;
                    page = next_page;
                }
                _ => return Ok(items),
            }
        }
    }

    /// Names of the repositories of the organization
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn list_repo_names(&self, scope: &Scope) -> Result<Vec<String>, OrgMoverError> {
        let path = format!("/orgs/{}/repos", encode(&scope.organization));
        let repos: Vec<RestRepo> = self
            .rest_pages(
                &path,
                &[("type", "all")],
                scope.batch_size.min(MAX_PER_PAGE),
                scope,
                "repositories",
            )
            .await?;
        Ok(repos.into_iter().map(|repo| repo.name).collect())
    }

    /// Branches of a repository
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn list_branches(
        &self,
        org: &str,
        repo: &str,
        scope: &Scope,
    ) -> Result<Vec<RestBranch>, OrgMoverError> {
        let path = format!("/repos/{}/{}/branches", encode(org), encode(repo));
        self.rest_pages(
            &path,
            &[],
            scope.batch_size.min(MAX_PER_PAGE),
            scope,
            &format!("{repo} branches"),
        )
        .await
    }

    /// Repository migrations into the organization
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn repository_migrations(
        &self,
        scope: &Scope,
    ) -> Result<Vec<RepositoryMigration>, OrgMoverError> {
        let edges = collect_pages(&scope.throttle, "repository migrations", |cursor| {
            let variables = graphql_page_variables(scope, cursor);
            async move {
                let field: MigrationsField = self
                    .organization(queries::REPOSITORY_MIGRATIONS, variables)
                    .await?;
                Ok(field.repository_migrations.into_page())
            }
        })
        .await?;
        Ok(edges.into_iter().map(|edge| edge.node).collect())
    }
}

/// `$org`, `$first` and `$after` variables of a paginated query
pub(crate) fn graphql_page_variables(scope: &Scope, cursor: Option<Cursor>) -> Value {
    let after = match cursor {
        Some(Cursor::After(after)) => Some(after),
        _ => None,
    };
    json!({
        "org": scope.organization,
        "first": scope.batch_size.min(MAX_PER_PAGE),
        "after": after,
    })
}

impl Platform for GithubPlatform {
    fn get_type(&self) -> PlatformType {
        self.target.platform_type()
    }

    fn get_remote_url(&self) -> &str {
        &self.rest_url
    }

    fn get_all_repo_names<'a>(
        &'a self,
        scope: &'a Scope,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, OrgMoverError>> + Send + 'a>> {
        Box::pin(self.list_repo_names(scope))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cloud_and_server_urls() {
        let cloud = GithubPlatform::new("token".into(), None, false).unwrap();
        assert_eq!(cloud.flavor(), "ghec");
        assert_eq!(cloud.rest("/orgs/acme"), "https://api.github.com/orgs/acme");
        assert_eq!(cloud.get_type(), PlatformType::Github);

        let server =
            GithubPlatform::new("token".into(), Some("https://ghes.example.com/"), true).unwrap();
        assert_eq!(server.flavor(), "ghes");
        assert_eq!(server.get_remote_url(), "https://ghes.example.com/api/v3");
        assert_eq!(server.graphql_url, "https://ghes.example.com/api/graphql");
        assert_eq!(server.get_type(), PlatformType::Ghes);
    }

    #[test]
    fn repo_url_is_encoded() {
        let cloud = GithubPlatform::new("token".into(), None, false).unwrap();
        assert_eq!(
            cloud.repo_url("acme", "my repo"),
            "https://api.github.com/repos/acme/my%20repo"
        );
    }

    #[test]
    fn page_variables_carry_cursor() {
        let scope = Scope::new("acme".into(), 500, 0, None);
        let variables = graphql_page_variables(&scope, Some(Cursor::After("abc".into())));
        assert_eq!(variables["org"], "acme");
        assert_eq!(variables["first"], 100);
        assert_eq!(variables["after"], "abc");
        let variables = graphql_page_variables(&scope, None);
        assert!(variables["after"].is_null());
    }

    #[test]
    fn failed_migrations_are_not_migrated() {
        let migration = |state: &str| RepositoryMigration {
            repository_name: "repo".into(),
            created_at: None,
            state: state.into(),
            failure_reason: None,
            warnings_count: 0,
            migration_log_url: None,
            source_url: None,
        };
        assert!(migration("SUCCEEDED").is_migrated());
        assert!(migration("IN_PROGRESS").is_migrated());
        assert!(!migration("FAILED").is_migrated());
        assert!(!migration("FAILED_VALIDATION").is_migrated());
    }
}
