//! Bitbucket Platform
use std::{future::Future, pin::Pin};

use serde::de::DeserializeOwned;
use urlencoding::encode;

use super::{
    models::{BbsGroupPermission, BbsRepo, BbsUser, BbsUserPermission},
    BITBUCKET_ACCEPT,
};
use crate::{
    context::Scope,
    errors::OrgMoverError,
    http::{with_query, ApiClient},
    pagination::{collect_pages, Cursor, PagedResponse},
    platform::{normalize_server_url, Platform, PlatformType},
};

/// Bitbucket Platform
#[derive(Debug, Clone)]
pub struct BitbucketPlatform {
    /// HTTP client
    client: ApiClient,

    /// `<server>/rest/api/latest`
    api_url: String,
}

impl BitbucketPlatform {
    /// Create a new BitbucketPlatform
    /// # Errors
    /// Error if the server url is invalid or the client can't be built
    pub(crate) fn new(
        token: String,
        server_url: &str,
        allow_untrusted_ssl_certificates: bool,
    ) -> Result<Self, OrgMoverError> {
        let server_url = normalize_server_url(server_url)?;
        let client = ApiClient::new(
            PlatformType::Bitbucket,
            token,
            BITBUCKET_ACCEPT,
            allow_untrusted_ssl_certificates,
        )?;
        Ok(Self {
            client,
            api_url: format!("{server_url}/rest/api/latest"),
        })
    }

    /// API url of a path
    pub fn api(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    /// Every value of a paged endpoint, following `nextPageStart`
    /// # Errors
    /// Error if a page can't be fetched
    async fn paged<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        scope: &Scope,
        label: &str,
    ) -> Result<Vec<T>, OrgMoverError> {
        let base = self.api(path);
        collect_pages(&scope.throttle, label, |cursor| {
            let mut query: Vec<(&str, String)> =
                params.iter().map(|(k, v)| (*k, v.to_string())).collect();
            query.push(("limit", scope.batch_size.to_string()));
            if let Some(Cursor::Start(start)) = cursor {
                query.push(("start", start.to_string()));
            }
            let url = with_query(&base, &query);
            async move {
                let response: PagedResponse<T> = self.client.get_json(&url?).await?;
                Ok(response.into_page())
            }
        })
        .await
    }

    /// `/projects/{project}` path
    fn project_path(project: &str) -> String {
        format!("/projects/{}", encode(project))
    }

    /// `/projects/{project}/repos/{repo}` path
    fn repo_path(project: &str, repo: &str) -> String {
        format!("{}/repos/{}", Self::project_path(project), encode(repo))
    }

    /// Repositories of a project
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn list_repos(
        &self,
        project: &str,
        scope: &Scope,
    ) -> Result<Vec<BbsRepo>, OrgMoverError> {
        let path = format!("{}/repos", Self::project_path(project));
        self.paged(&path, &[], scope, "repositories").await
    }

    /// Users with a direct permission on a repository
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn repo_user_permissions(
        &self,
        project: &str,
        repo: &str,
        scope: &Scope,
    ) -> Result<Vec<BbsUserPermission>, OrgMoverError> {
        let path = format!("{}/permissions/users", Self::repo_path(project, repo));
        self.paged(&path, &[], scope, &format!("{repo} user permissions"))
            .await
    }

    /// Groups with a permission on a repository
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn repo_group_permissions(
        &self,
        project: &str,
        repo: &str,
        scope: &Scope,
    ) -> Result<Vec<BbsGroupPermission>, OrgMoverError> {
        let path = format!("{}/permissions/groups", Self::repo_path(project, repo));
        self.paged(&path, &[], scope, &format!("{repo} group permissions"))
            .await
    }

    /// Groups with a permission on a project
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn project_group_permissions(
        &self,
        project: &str,
        scope: &Scope,
    ) -> Result<Vec<BbsGroupPermission>, OrgMoverError> {
        let path = format!("{}/permissions/groups", Self::project_path(project));
        self.paged(&path, &[], scope, "project group permissions")
            .await
    }

    /// Users with a permission on a project
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn project_user_permissions(
        &self,
        project: &str,
        scope: &Scope,
    ) -> Result<Vec<BbsUserPermission>, OrgMoverError> {
        let path = format!("{}/permissions/users", Self::project_path(project));
        self.paged(&path, &[], scope, &format!("{project} user permissions"))
            .await
    }

    /// Members of a group, requires admin rights
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn group_members(
        &self,
        group: &str,
        scope: &Scope,
    ) -> Result<Vec<BbsUser>, OrgMoverError> {
        self.paged(
            "/admin/groups/more-members",
            &[("context", group)],
            scope,
            &format!("{group} members"),
        )
        .await
    }
}

impl Platform for BitbucketPlatform {
    fn get_type(&self) -> PlatformType {
        PlatformType::Bitbucket
    }

    fn get_remote_url(&self) -> &str {
        &self.api_url
    }

    fn get_all_repo_names<'a>(
        &'a self,
        scope: &'a Scope,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, OrgMoverError>> + Send + 'a>> {
        Box::pin(async move {
            let repos = self.list_repos(&scope.organization, scope).await?;
            Ok(repos.into_iter().map(|repo| repo.slug).collect())
        })
    }
}
