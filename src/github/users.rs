//! User exports: organization members, enterprise users and outside collaborators
use std::{collections::HashSet, path::PathBuf};

use clap::Args;
use log::info;
use serde::{Deserialize, Serialize};
use urlencoding::encode;

use super::{
    config::GithubConfig,
    platform::{graphql_page_variables, GithubPlatform, MAX_PER_PAGE},
    queries,
};
use crate::{
    config::OrgMoverConfig,
    context::{CommonArgs, Scope},
    errors::OrgMoverError,
    pagination::{collect_pages, Connection},
    records::{current_time, today, CsvSink, LoginFilter, LoginRow},
    utils::{spinner, split_list, value_or_prompt},
};

/// Columns of the organization users file
const ORG_USER_COLUMNS: [&str; 15] = [
    "login",
    "name",
    "email",
    "role",
    "hasTwoFactorEnabled",
    "avatarUrl",
    "id",
    "url",
    "websiteUrl",
    "isSiteAdmin",
    "isViewer",
    "projectsUrl",
    "projectsResourcePath",
    "createdAt",
    "updatedAt",
];

/// Export the members of an organization
#[derive(Args, Debug, Clone)]
pub struct OrgUsersArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// CSV file with a `login` column, only these users are exported
    #[arg(short, long)]
    pub users_file: Option<PathBuf>,
}

/// Export the union of the members of several organizations
#[derive(Args, Debug, Clone)]
pub struct EnterpriseUsersArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// Comma separated list of organizations
    #[arg(short, long)]
    pub enterprise_organizations: Option<String>,

    /// CSV file with a `login` column, only these users are exported
    #[arg(short, long)]
    pub users_file: Option<PathBuf>,
}

/// Export the outside collaborators of an organization
#[derive(Args, Debug, Clone)]
pub struct OutsideCollaboratorsArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// CSV file with a `login` column, only these users are exported
    #[arg(short, long)]
    pub users_file: Option<PathBuf>,
}

/// `membersWithRole` edge
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct MemberEdge {
    /// ADMIN or MEMBER
    role: String,
    /// Two factor flag, null without admin access
    has_two_factor_enabled: Option<bool>,
    /// The user
    node: UserNode,
}

/// User node
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct UserNode {
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
    database_id: Option<u64>,
    url: Option<String>,
    website_url: Option<String>,
    #[serde(default)]
    is_site_admin: bool,
    #[serde(default)]
    is_viewer: bool,
    projects_url: Option<String>,
    projects_resource_path: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

/// `membersWithRole` field
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct MembersField {
    /// Members page
    members_with_role: Connection<MemberEdge>,
}

/// One line of the organization users file
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrgUserRow {
    pub login: String,
    name: Option<String>,
    email: Option<String>,
    role: String,
    has_two_factor_enabled: Option<bool>,
    avatar_url: Option<String>,
    id: Option<u64>,
    url: Option<String>,
    website_url: Option<String>,
    is_site_admin: bool,
    is_viewer: bool,
    projects_url: Option<String>,
    projects_resource_path: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl From<MemberEdge> for OrgUserRow {
    fn from(edge: MemberEdge) -> Self {
        let node = edge.node;
        Self {
            login: node.login.to_lowercase(),
            name: node.name,
            email: node.email,
            role: edge.role,
            has_two_factor_enabled: edge.has_two_factor_enabled,
            avatar_url: node.avatar_url,
            id: node.database_id,
            url: node.url,
            website_url: node.website_url,
            is_site_admin: node.is_site_admin,
            is_viewer: node.is_viewer,
            projects_url: node.projects_url,
            projects_resource_path: node.projects_resource_path,
            created_at: node.created_at,
            updated_at: node.updated_at,
        }
    }
}

/// Members of the organization, logins lowercased
/// # Errors
/// Error if a page can't be fetched
pub(crate) async fn org_members(
    platform: &GithubPlatform,
    scope: &Scope,
) -> Result<Vec<OrgUserRow>, OrgMoverError> {
    let edges = collect_pages(&scope.throttle, "organization members", |cursor| {
        let variables = graphql_page_variables(scope, cursor);
        async move {
            let field: MembersField = platform
                .organization(queries::ORG_MEMBERS, variables)
                .await?;
            Ok(field.members_with_role.into_page())
        }
    })
    .await?;
    Ok(edges.into_iter().map(OrgUserRow::from).collect())
}

/// Lowercased logins of the outside collaborators of the organization
/// # Errors
/// Error if a page can't be fetched
pub(crate) async fn outside_collaborator_logins(
    platform: &GithubPlatform,
    scope: &Scope,
) -> Result<Vec<String>, OrgMoverError> {
    let path = format!("/orgs/{}/outside_collaborators", encode(&scope.organization));
    let users: Vec<LoginRow> = platform
        .rest_pages(&path, &[], MAX_PER_PAGE, scope, "outside collaborators")
        .await?;
    Ok(users
        .into_iter()
        .map(|user| user.login.to_lowercase())
        .collect())
}

/// Logins allowed by the filter, deduplicated in first-seen order
pub(crate) fn unique_logins<I>(logins: I, filter: &LoginFilter, seen: &mut HashSet<String>) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    logins
        .into_iter()
        .map(|login| login.to_lowercase())
        .filter(|login| filter.allows(login) && seen.insert(login.clone()))
        .collect()
}

/// Write a `login` file
/// # Errors
/// Error if the file can't be written
pub(crate) fn write_logins(path: PathBuf, logins: &[String]) -> Result<(), OrgMoverError> {
    let mut sink = CsvSink::create(path, &["login"])?;
    for login in logins {
        sink.write(&LoginRow {
            login: login.clone(),
        })?;
    }
    sink.finish()?;
    Ok(())
}

/// Run get-org-users
/// # Errors
/// Error if the members can't be fetched or the file can't be written
pub async fn get_org_users(
    config: &mut OrgMoverConfig,
    args: OrgUsersArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let filter = LoginFilter::from_file(args.users_file.as_deref())?;
    let pb = spinner("get-org-users");
    pb.set_message(format!("Fetching members of {}", scope.organization));
    let members = org_members(&platform, &scope).await?;
    pb.finish_and_clear();

    let org = scope.org_slug();
    let suffix = format!("{}-{}", today(), platform.flavor());
    let path = scope.output_csv(
        PathBuf::from(format!("./{org}-metrics")).join(format!("{org}-user-metrics-{suffix}.csv")),
    );
    let mut sink = CsvSink::create(path, &ORG_USER_COLUMNS)?;
    for member in members.iter().filter(|m| filter.allows(&m.login)) {
        sink.write(member)?;
    }
    sink.finish()?;
    Ok(())
}

/// Run get-enterprise-users
/// # Errors
/// Error if the members of an organization can't be fetched or the file can't be written
pub async fn get_enterprise_users(
    config: &mut OrgMoverConfig,
    args: EnterpriseUsersArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let organizations = split_list(&value_or_prompt(
        args.enterprise_organizations,
        "Enter the comma separated list of enterprise organizations",
    )?);
    let filter = LoginFilter::from_file(args.users_file.as_deref())?;
    let base = Scope::new(
        String::new(),
        args.common.batch_size,
        args.common.wait_time,
        args.common.output_file.clone(),
    );
    let mut seen = HashSet::new();
    let mut logins = vec![];
    for org in &organizations {
        let scope = base.for_organization(org);
        let members = org_members(&platform, &scope).await?;
        let new_logins = unique_logins(members.into_iter().map(|m| m.login), &filter, &mut seen);
        info!("{org}: {} new users", new_logins.len());
        logins.extend(new_logins);
    }
    let path = base.output_csv(format!("enterprise-users-{}.csv", current_time()));
    write_logins(path, &logins)
}

/// Run get-outside-collaborators
/// # Errors
/// Error if the collaborators can't be fetched or the file can't be written
pub async fn get_outside_collaborators(
    config: &mut OrgMoverConfig,
    args: OutsideCollaboratorsArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let filter = LoginFilter::from_file(args.users_file.as_deref())?;
    let logins: Vec<String> = outside_collaborator_logins(&platform, &scope)
        .await?
        .into_iter()
        .filter(|login| filter.allows(login))
        .collect();
    let org = scope.org_slug();
    let path = scope.output_csv(format!("{org}-outside-collaborators-{}.csv", current_time()));
    write_logins(path, &logins)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::records::{read_rows, serialized_header};
    use serde_json::json;
    use tempfile::tempdir;

    fn edge() -> MemberEdge {
        serde_json::from_value(json!({
            "role": "ADMIN",
            "hasTwoFactorEnabled": true,
            "node": {
                "login": "Octo-Cat",
                "name": "Octo Cat",
                "email": "",
                "avatarUrl": "https://avatars.example.com/u/1",
                "databaseId": 1,
                "url": "https://github.com/Octo-Cat",
                "websiteUrl": null,
                "isSiteAdmin": false,
                "isViewer": true,
                "projectsUrl": "https://github.com/users/Octo-Cat/projects",
                "projectsResourcePath": "/users/Octo-Cat/projects",
                "createdAt": "2020-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            }
        }))
        .unwrap()
    }

    #[test]
    fn member_edge_is_mapped() {
        let row = OrgUserRow::from(edge());
        assert_eq!(row.login, "octo-cat");
        assert_eq!(row.role, "ADMIN");
        assert_eq!(row.has_two_factor_enabled, Some(true));
        assert_eq!(row.id, Some(1));
        assert!(row.is_viewer);
    }

    #[test]
    fn org_user_columns_match_row() {
        assert_eq!(
            serialized_header(&OrgUserRow::from(edge())),
            ORG_USER_COLUMNS.join(",")
        );
    }

    #[test]
    fn enterprise_logins_keep_first_seen_order() {
        let mut seen = HashSet::new();
        let filter = LoginFilter::default();
        let first = unique_logins(vec!["b".into(), "A".into()], &filter, &mut seen);
        let second = unique_logins(vec!["a".into(), "c".into(), "b".into()], &filter, &mut seen);
        assert_eq!(first, vec!["b", "a"]);
        assert_eq!(second, vec!["c"]);

        let mut seen = HashSet::new();
        let filter = LoginFilter::from_logins(["c"]);
        let filtered = unique_logins(vec!["a".into(), "c".into()], &filter, &mut seen);
        assert_eq!(filtered, vec!["c"]);
    }

    #[test]
    fn login_file_is_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logins.csv");
        write_logins(path.clone(), &["alice".into(), "bob".into()]).unwrap();
        let rows: Vec<LoginRow> = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].login, "bob");
    }
}
