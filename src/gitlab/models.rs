//! GitLab API payloads
use serde::Deserialize;

/// Project of `/projects`
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct GitlabProject {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path: String,
    pub path_with_namespace: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub visibility: String,
    pub namespace: GitlabNamespace,
    pub permissions: Option<ProjectPermissions>,
}

impl GitlabProject {
    /// Repository name, last segment of the full path
    pub fn repo(&self) -> &str {
        self.path_with_namespace
            .rsplit('/')
            .next()
            .unwrap_or(&self.path)
    }

    /// Access level of the owning group on the project
    pub fn group_access_level(&self) -> Option<u64> {
        self.permissions
            .as_ref()
            .and_then(|p| p.group_access.as_ref())
            .map(|access| access.access_level)
    }
}

/// Namespace of a project
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct GitlabNamespace {
    /// Full path of the group or user
    pub full_path: String,
}

/// `permissions` of a project
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProjectPermissions {
    pub group_access: Option<AccessLevel>,
}

/// Access level
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AccessLevel {
    pub access_level: u64,
}

/// Member of a project or a group
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct GitlabMember {
    pub username: String,
    pub access_level: Option<u64>,
}

/// Group of `/groups`
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct GitlabGroup {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub description: Option<String>,
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub web_url: String,
}

impl GitlabGroup {
    /// Path of the parent group, taken from the web url
    pub fn parent_path(&self) -> String {
        if self.parent_id.is_none() {
            return String::new();
        }
        let segments: Vec<&str> = self
            .web_url
            .trim_end_matches('/')
            .split('/')
            .collect();
        match segments.len() {
            len if len >= 2 => segments[len - 2].to_string(),
            _ => String::new(),
        }
    }
}

/// User of `/users`
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct GitlabUser {
    pub id: u64,
    pub username: String,
}

/// GitHub role of a GitLab access level, `triage` when unknown
pub(crate) fn access_role(access_level: Option<u64>) -> &'static str {
    match access_level {
        Some(50) | Some(40) => "admin",
        Some(30) => "write",
        Some(20) => "read",
        _ => "triage",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn access_levels() {
        assert_eq!(access_role(Some(50)), "admin");
        assert_eq!(access_role(Some(40)), "admin");
        assert_eq!(access_role(Some(30)), "write");
        assert_eq!(access_role(Some(20)), "read");
        assert_eq!(access_role(Some(10)), "triage");
        assert_eq!(access_role(None), "triage");
    }

    #[test]
    fn project_is_decoded() {
        let project: GitlabProject = serde_json::from_value(json!({
            "id": 12,
            "name": "My API",
            "path": "my-api",
            "path_with_namespace": "acme/backend/my-api",
            "archived": true,
            "visibility": "internal",
            "namespace": { "id": 3, "full_path": "acme/backend" },
            "permissions": { "project_access": null, "group_access": { "access_level": 30 } }
        }))
        .unwrap();
        assert_eq!(project.repo(), "my-api");
        assert_eq!(project.group_access_level(), Some(30));
    }

    #[test]
    fn parent_path_comes_from_web_url() {
        let group = GitlabGroup {
            id: 4,
            name: "Backend".into(),
            path: "backend".into(),
            description: None,
            parent_id: Some(3),
            web_url: "https://gitlab.example.com/groups/acme/backend".into(),
        };
        assert_eq!(group.parent_path(), "acme");
        let root = GitlabGroup {
            parent_id: None,
            ..group
        };
        assert_eq!(root.parent_path(), "");
    }
}
