//! Gitlab Platform
use std::{future::Future, pin::Pin};

use serde::de::DeserializeOwned;
use urlencoding::encode;

use super::{
    models::{GitlabGroup, GitlabMember, GitlabProject, GitlabUser},
    GITLAB_ACCEPT,
};
use crate::{
    context::Scope,
    errors::OrgMoverError,
    http::{with_query, ApiClient},
    pagination::{collect_pages, Cursor, Page},
    platform::{normalize_server_url, Platform, PlatformType},
};

/// Page size cap of the GitLab API
const MAX_PER_PAGE: u32 = 100;

/// Gitlab Platform
#[derive(Debug, Clone)]
pub struct GitlabPlatform {
    /// HTTP client
    client: ApiClient,

    /// `<server>/api/v4`
    api_url: String,
}

impl GitlabPlatform {
    /// Create a new GitlabPlatform
    /// # Errors
    /// Error if the server url is invalid or the client can't be built
    pub(crate) fn new(
        token: String,
        server_url: &str,
        allow_untrusted_ssl_certificates: bool,
    ) -> Result<Self, OrgMoverError> {
        let server_url = normalize_server_url(server_url)?;
        let client = ApiClient::new(
            PlatformType::Gitlab,
            token,
            GITLAB_ACCEPT,
            allow_untrusted_ssl_certificates,
        )?;
        Ok(Self {
            client,
            api_url: format!("{server_url}/api/v4"),
        })
    }

    /// API url of a path
    pub fn api(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    /// Every item of a keyset-paginated endpoint, ordered by id
    /// # Errors
    /// Error if a page can't be fetched
    async fn keyset_pages<T, F>(
        &self,
        path: &str,
        scope: &Scope,
        label: &str,
        id_of: F,
    ) -> Result<Vec<T>, OrgMoverError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> u64 + Copy,
    {
        let base = self.api(path);
        let per_page = scope.batch_size.min(MAX_PER_PAGE);
        collect_pages(&scope.throttle, label, |cursor| {
            let mut query = vec![
                ("pagination", "keyset".to_string()),
                ("per_page", per_page.to_string()),
                ("order_by", "id".to_string()),
                ("sort", "asc".to_string()),
            ];
            if let Some(Cursor::IdAfter(id)) = cursor {
                query.push(("id_after", id.to_string()));
            }
            let url = with_query(&base, &query);
            async move {
                let items: Vec<T> = self.client.get_json(&url?).await?;
                Ok(Page::keyset(items, per_page, id_of))
            }
        })
        .await
    }

    /// Every item of a page-numbered endpoint
    /// # Errors
    /// Error if a page can't be fetched
    async fn numbered_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        scope: &Scope,
        label: &str,
    ) -> Result<Vec<T>, OrgMoverError> {
        let base = self.api(path);
        let per_page = scope.batch_size.min(MAX_PER_PAGE);
        collect_pages(&scope.throttle, label, |cursor| {
            let page = Cursor::page_number(cursor.as_ref());
            let mut query: Vec<(&str, String)> =
                params.iter().map(|(k, v)| (*k, v.to_string())).collect();
            query.push(("per_page", per_page.to_string()));
            query.push(("page", page.to_string()));
            let url = with_query(&base, &query);
            async move {
                let items: Vec<T> = self.client.get_json(&url?).await?;
                Ok(Page::numbered(items, page, per_page))
            }
        })
        .await
    }

    /// Every project visible to the token
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn list_projects(&self, scope: &Scope) -> Result<Vec<GitlabProject>, OrgMoverError> {
        self.keyset_pages("/projects", scope, "projects", |project: &GitlabProject| {
            project.id
        })
        .await
    }

    /// Projects of a group and its subgroups
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn list_group_projects(
        &self,
        group: &str,
        scope: &Scope,
    ) -> Result<Vec<GitlabProject>, OrgMoverError> {
        self.numbered_pages(
            &format!("/groups/{}/projects", encode(group)),
            &[("include_subgroups", "true"), ("order_by", "id"), ("sort", "asc")],
            scope,
            &format!("{group} projects"),
        )
        .await
    }

    /// Every group visible to the token
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn list_groups(&self, scope: &Scope) -> Result<Vec<GitlabGroup>, OrgMoverError> {
        self.keyset_pages("/groups", scope, "groups", |group: &GitlabGroup| group.id)
            .await
    }

    /// Every user of the instance
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn list_users(&self, scope: &Scope) -> Result<Vec<GitlabUser>, OrgMoverError> {
        self.keyset_pages("/users", scope, "users", |user: &GitlabUser| user.id)
            .await
    }

    /// Members of a project, inherited ones included
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn list_project_members(
        &self,
        project_id: u64,
        scope: &Scope,
    ) -> Result<Vec<GitlabMember>, OrgMoverError> {
        self.numbered_pages(
            &format!("/projects/{project_id}/members/all"),
            &[],
            scope,
            &format!("project {project_id} members"),
        )
        .await
    }

    /// Members of a group, inherited ones included
    /// # Errors
    /// Error if a page can't be fetched
    pub async fn list_group_members(
        &self,
        group_id: u64,
        scope: &Scope,
    ) -> Result<Vec<GitlabMember>, OrgMoverError> {
        self.numbered_pages(
            &format!("/groups/{group_id}/members/all"),
            &[],
            scope,
            &format!("group {group_id} members"),
        )
        .await
    }
}

impl Platform for GitlabPlatform {
    fn get_type(&self) -> PlatformType {
        PlatformType::Gitlab
    }

    fn get_remote_url(&self) -> &str {
        &self.api_url
    }

    fn get_all_repo_names<'a>(
        &'a self,
        scope: &'a Scope,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, OrgMoverError>> + Send + 'a>> {
        Box::pin(async move {
            let projects = self.list_group_projects(&scope.organization, scope).await?;
            Ok(projects
                .iter()
                .map(|project| project.repo().to_string())
                .collect())
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn api_url_defaults() {
        let platform = GitlabPlatform::new("token".into(), "https://gitlab.com/", false).unwrap();
        assert_eq!(platform.api("/projects"), "https://gitlab.com/api/v4/projects");
        assert_eq!(platform.get_type(), PlatformType::Gitlab);
    }

    #[test]
    fn self_managed_url_keeps_path() {
        let platform =
            GitlabPlatform::new("token".into(), "https://git.example.com/gitlab", true).unwrap();
        assert_eq!(platform.get_remote_url(), "https://git.example.com/gitlab/api/v4");
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(GitlabPlatform::new("token".into(), "gitlab.com", false).is_err());
    }
}
