//! Team export with members and repository permissions
use std::path::PathBuf;

use clap::Args;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    config::GithubConfig,
    platform::{graphql_page_variables, Count, GithubPlatform, TeamData, MAX_PER_PAGE},
    queries,
};
use crate::{
    config::OrgMoverConfig,
    context::{CommonArgs, Scope},
    errors::{OrgMoverError, OrgMoverErrorKind},
    pagination::{collect_pages, complete_connection, Connection, Edge},
    records::{today, CsvSink, LoginFilter},
    utils::spinner,
};

/// Columns of the team metrics file
pub(crate) const TEAM_COLUMNS: [&str; 19] = [
    "name",
    "combinedSlug",
    "createdAt",
    "id",
    "description",
    "privacy",
    "repositoriesResourcePath",
    "slug",
    "resourcePath",
    "updatedAt",
    "url",
    "parentTeam",
    "parentTeamId",
    "repositoriesUrl",
    "childTeams",
    "repositories",
    "repositoriesCount",
    "members",
    "membersCount",
];

/// Columns of the member-team-role file
pub(crate) const MEMBER_TEAM_ROLE_COLUMNS: [&str; 3] = ["member", "team", "role"];

/// Columns of the repo-team-permission file
pub(crate) const REPO_TEAM_PERMISSION_COLUMNS: [&str; 3] = ["repo", "team", "permission"];

/// Factor applied to the delay between nested member and repository pages
pub(crate) const NESTED_PAGE_DELAY_FACTOR: u32 = 4;

/// Export the teams of an organization
#[derive(Args, Debug, Clone)]
pub struct GetTeamsArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// CSV file with a `login` column, only these members are kept in the member-team-role file
    #[arg(short, long)]
    pub users_file: Option<PathBuf>,
}

/// Repository edge of a team
#[derive(Deserialize, Debug, Clone)]
struct TeamRepoEdge {
    /// ADMIN, MAINTAIN, WRITE, TRIAGE or READ
    permission: String,
    /// The repository
    node: NameNode,
}

/// Node with a name
#[derive(Deserialize, Debug, Clone)]
struct NameNode {
    /// Name
    name: String,
}

/// Member edge of a team
#[derive(Deserialize, Debug, Clone)]
struct TeamMemberEdge {
    /// MEMBER or MAINTAINER
    role: String,
    /// The member
    node: TeamMemberNode,
}

/// Member of a team
#[derive(Deserialize, Debug, Clone)]
struct TeamMemberNode {
    /// Login
    login: String,
    /// Public email
    email: Option<String>,
}

/// Parent of a team
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct ParentTeam {
    /// Id
    database_id: Option<u64>,
    /// Slug
    slug: String,
}

/// Team node of the teams query
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct TeamNode {
    name: String,
    combined_slug: Option<String>,
    created_at: Option<String>,
    database_id: Option<u64>,
    description: Option<String>,
    #[serde(default)]
    privacy: String,
    repositories_resource_path: Option<String>,
    resource_path: Option<String>,
    slug: String,
    updated_at: Option<String>,
    url: Option<String>,
    repositories_url: Option<String>,
    #[serde(default)]
    child_teams: Count,
    parent_team: Option<ParentTeam>,
    repositories: Connection<TeamRepoEdge>,
    members: Connection<TeamMemberEdge>,
}

/// `teams` field
#[derive(Deserialize, Debug)]
struct TeamsField {
    /// Teams page
    teams: Connection<Edge<TeamNode>>,
}

/// `members` field of a team
#[derive(Deserialize, Debug)]
struct TeamMembersField {
    /// Members page
    members: Connection<TeamMemberEdge>,
}

/// `repositories` field of a team
#[derive(Deserialize, Debug)]
struct TeamRepositoriesField {
    /// Repositories page
    repositories: Connection<TeamRepoEdge>,
}

/// One line of the team metrics file
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct TeamRow {
    pub name: String,
    pub combined_slug: String,
    pub created_at: String,
    pub id: Option<u64>,
    pub description: String,
    pub privacy: String,
    pub repositories_resource_path: String,
    pub slug: String,
    pub resource_path: String,
    pub updated_at: String,
    pub url: String,
    pub parent_team: String,
    pub parent_team_id: Option<u64>,
    pub repositories_url: String,
    pub child_teams: u64,
    /// `name:PERMISSION` entries joined with `;`
    pub repositories: String,
    pub repositories_count: u64,
    /// `login:email:ROLE` entries joined with `;`
    pub members: String,
    pub members_count: u64,
}

impl TeamRow {
    /// Build the line of a team from its complete member and repository lists
    fn new(team: TeamNode, members: Vec<TeamMemberEdge>, repositories: Vec<TeamRepoEdge>) -> Self {
        let (parent_team, parent_team_id) = match team.parent_team {
            Some(parent) => (parent.slug, parent.database_id),
            None => (String::new(), None),
        };
        Self {
            name: team.name,
            combined_slug: team.combined_slug.unwrap_or_default(),
            created_at: team.created_at.unwrap_or_default(),
            id: team.database_id,
            description: team.description.unwrap_or_default(),
            privacy: team.privacy,
            repositories_resource_path: team.repositories_resource_path.unwrap_or_default(),
            slug: team.slug,
            resource_path: team.resource_path.unwrap_or_default(),
            updated_at: team.updated_at.unwrap_or_default(),
            url: team.url.unwrap_or_default(),
            parent_team,
            parent_team_id,
            repositories_url: team.repositories_url.unwrap_or_default(),
            child_teams: team.child_teams.total_count,
            repositories: repositories
                .iter()
                .map(|edge| format!("{}:{}", edge.node.name, edge.permission))
                .collect::<Vec<_>>()
                .join(";"),
            repositories_count: team.repositories.total_count,
            members: members
                .iter()
                .map(|edge| {
                    format!(
                        "{}:{}:{}",
                        edge.node.login.to_lowercase(),
                        edge.node.email.as_deref().unwrap_or_default(),
                        edge.role
                    )
                })
                .collect::<Vec<_>>()
                .join(";"),
            members_count: team.members.total_count,
        }
    }

    /// Members of the team as (login, role)
    pub fn member_roles(&self) -> Vec<(String, String)> {
        parse_members(&self.members)
    }

    /// Repositories of the team as (repo, GraphQL permission)
    pub fn repository_permissions(&self) -> Vec<(String, String)> {
        parse_repositories(&self.repositories)
    }
}

/// One line of a member-team-role file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemberTeamRole {
    /// Lowercased login
    pub member: String,
    /// Team slug
    pub team: String,
    /// MEMBER or MAINTAINER
    pub role: String,
}

/// One line of a repo-team-permission file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct RepoTeamPermission {
    /// Repository
    pub repo: String,
    /// Team slug
    pub team: String,
    /// REST permission
    pub permission: String,
}

/// Repository permission, GraphQL or role name, to the REST name
/// accepted by the collaborators and team repositories endpoints
pub(crate) fn rest_permission(permission: &str) -> String {
    match permission.to_uppercase().as_str() {
        "ADMIN" => "admin".to_string(),
        "MAINTAIN" => "maintain".to_string(),
        "WRITE" | "PUSH" => "push".to_string(),
        "TRIAGE" => "triage".to_string(),
        "READ" | "PULL" => "pull".to_string(),
        _ => permission.to_lowercase(),
    }
}

/// `login:email:ROLE;...` to (lowercased login, role)
pub(crate) fn parse_members(members: &str) -> Vec<(String, String)> {
    members
        .split(';')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let login = parts.next().unwrap_or_default().trim().to_lowercase();
            let _email = parts.next();
            let role = parts.next().unwrap_or_default().trim().to_string();
            (login, role)
        })
        .collect()
}

/// `name:PERMISSION;...` to (name, permission)
pub(crate) fn parse_repositories(repositories: &str) -> Vec<(String, String)> {
    repositories
        .split(';')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| match entry.rsplit_once(':') {
            Some((name, permission)) => (name.trim().to_string(), permission.trim().to_string()),
            None => (entry.trim().to_string(), String::new()),
        })
        .collect()
}

/// Member-team-role lines of teams, restricted to the allowed users
pub(crate) fn member_team_roles(teams: &[TeamRow], users: &LoginFilter) -> Vec<MemberTeamRole> {
    teams
        .iter()
        .flat_map(|team| {
            team.member_roles()
                .into_iter()
                .filter(|(login, _)| users.allows(login))
                .map(|(member, role)| MemberTeamRole {
                    member,
                    team: team.slug.clone(),
                    role,
                })
        })
        .collect()
}

/// Repo-team-permission lines of teams, with REST permissions
pub(crate) fn repo_team_permissions(teams: &[TeamRow]) -> Vec<RepoTeamPermission> {
    teams
        .iter()
        .flat_map(|team| {
            team.repository_permissions()
                .into_iter()
                .map(|(repo, permission)| RepoTeamPermission {
                    repo,
                    team: team.slug.clone(),
                    permission: rest_permission(&permission),
                })
        })
        .collect()
}

/// Team field of a nested query, failing if the team disappeared
fn existing_team<T>(data: TeamData<T>, slug: &str) -> Result<T, OrgMoverError> {
    data.team.ok_or_else(|| {
        OrgMoverError::new(OrgMoverErrorKind::GraphQl).with_text(&format!("Team '{slug}' not found"))
    })
}

/// Every team of the organization with its complete members and repositories
/// # Errors
/// Error if a page can't be fetched
pub(crate) async fn fetch_teams(
    platform: &GithubPlatform,
    scope: &Scope,
) -> Result<Vec<TeamRow>, OrgMoverError> {
    let edges = collect_pages(&scope.throttle, "teams", |cursor| {
        let variables = graphql_page_variables(scope, cursor);
        async move {
            let field: TeamsField = platform.organization(queries::ORG_TEAMS, variables).await?;
            Ok(field.teams.into_page())
        }
    })
    .await?;
    let nested_throttle = scope.throttle.scaled(NESTED_PAGE_DELAY_FACTOR);
    let first = scope.batch_size.min(MAX_PER_PAGE);
    let mut rows = vec![];
    for Edge { mut node } in edges {
        debug!("Completing team {}", node.slug);
        let slug = node.slug.clone();
        let members_count = node.members.total_count;
        let repositories_count = node.repositories.total_count;
        let members_page = std::mem::replace(&mut node.members, Connection::empty());
        let members = complete_connection(members_page, &nested_throttle, |after| {
            let variables = json!({
                "org": scope.organization,
                "slug": slug,
                "first": first,
                "after": after,
            });
            let slug = slug.clone();
            async move {
                let data: TeamData<TeamMembersField> =
                    platform.organization(queries::TEAM_MEMBERS, variables).await?;
                Ok(existing_team(data, &slug)?.members)
            }
        })
        .await?;
        let repositories_page = std::mem::replace(&mut node.repositories, Connection::empty());
        let repositories = complete_connection(repositories_page, &nested_throttle, |after| {
            let variables = json!({
                "org": scope.organization,
                "slug": slug,
                "first": first,
                "after": after,
            });
            let slug = slug.clone();
            async move {
                let data: TeamData<TeamRepositoriesField> = platform
                    .organization(queries::TEAM_REPOSITORIES, variables)
                    .await?;
                Ok(existing_team(data, &slug)?.repositories)
            }
        })
        .await?;
        node.members.total_count = members_count.max(members.len() as u64);
        node.repositories.total_count = repositories_count.max(repositories.len() as u64);
        rows.push(TeamRow::new(node, members, repositories));
    }
    Ok(rows)
}

/// Run get-teams
/// # Errors
/// Error if the teams can't be fetched or the files can't be written
pub async fn get_teams(
    config: &mut OrgMoverConfig,
    args: GetTeamsArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let users = LoginFilter::from_file(args.users_file.as_deref())?;
    let pb = spinner("get-teams");
    pb.set_message(format!("Fetching teams of {}", scope.organization));
    let teams = fetch_teams(&platform, &scope).await?;
    pb.finish_and_clear();
    info!("{} teams fetched", teams.len());

    let org = scope.org_slug();
    let suffix = format!("{}-{}", today(), platform.flavor());
    let dir = PathBuf::from(format!("./{org}-metrics"));
    let path = scope.output_csv(dir.join(format!("{org}-team-metrics-{suffix}.csv")));
    let members_path = scope.companion_csv(
        &format!("-member-team-role-{suffix}"),
        dir.join(format!("{org}-member-team-role-{suffix}.csv")),
    );
    let repos_path = scope.companion_csv(
        &format!("-repo-team-permission-{suffix}"),
        dir.join(format!("{org}-repo-team-permission-{suffix}.csv")),
    );

    let mut sink = CsvSink::create(path, &TEAM_COLUMNS)?;
    for team in &teams {
        sink.write(team)?;
    }
    sink.finish()?;

    let mut sink = CsvSink::create(members_path, &MEMBER_TEAM_ROLE_COLUMNS)?;
    for row in member_team_roles(&teams, &users) {
        sink.write(&row)?;
    }
    sink.finish()?;

    let mut sink = CsvSink::create(repos_path, &REPO_TEAM_PERMISSION_COLUMNS)?;
    for row in repo_team_permissions(&teams) {
        sink.write(&row)?;
    }
    sink.finish()?;
    Ok(())
}
