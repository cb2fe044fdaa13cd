//! Bitbucket Server API payloads
use serde::Deserialize;

use crate::github::teams::rest_permission;

/// Repository of a project
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct BbsRepo {
    pub slug: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub public: bool,
}

/// User
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct BbsUser {
    /// Login used in urls
    pub slug: String,
}

/// Group
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct BbsGroup {
    pub name: String,
}

/// Permission of a user on a project or a repository
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct BbsUserPermission {
    pub user: BbsUser,
    pub permission: String,
}

/// Permission of a group on a project or a repository
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct BbsGroupPermission {
    pub group: BbsGroup,
    pub permission: String,
}

/// GitHub role of a Bitbucket permission
pub(crate) fn bitbucket_role(permission: &str) -> String {
    match permission {
        "USER_ADMIN" | "REPO_ADMIN" | "PROJECT_ADMIN" | "ADMIN" | "SYS_ADMIN" => "admin".into(),
        "REPO_WRITE" | "PROJECT_WRITE" => "write".into(),
        "PROJECT_VIEW" | "REPO_READ" | "PROJECT_READ" | "LICENSED_USER" => "read".into(),
        "REPO_CREATE" | "PROJECT_CREATE" => "triage".into(),
        other => other.to_lowercase(),
    }
}

/// GitHub REST team permission of a Bitbucket permission
pub(crate) fn team_permission(permission: &str) -> String {
    rest_permission(&bitbucket_role(permission))
}
