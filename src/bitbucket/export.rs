//! Bitbucket Server exports: project repositories, permissions, groups and users
//!
//! The `--organization` flag names the Bitbucket project key.
use std::{collections::HashSet, path::PathBuf};

use clap::Args;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{
    config::BitbucketConfig,
    models::{bitbucket_role, team_permission, BbsGroupPermission, BbsRepo, BbsUserPermission},
};
use crate::{
    config::OrgMoverConfig,
    context::{CommonArgs, Scope},
    errors::OrgMoverError,
    github::{
        repos::{DirectCollaboratorRow, DIRECT_COLLABORATORS_COLUMNS},
        teams::{
            MemberTeamRole, RepoTeamPermission, MEMBER_TEAM_ROLE_COLUMNS,
            REPO_TEAM_PERMISSION_COLUMNS,
        },
        users::{unique_logins, write_logins},
    },
    http::Outcome,
    records::{current_time, input_rows, rows_after, CsvSink, LoginFilter, RepoRow, StatusSink},
    utils::{row_progress, slugify, spinner, split_list, value_or_prompt},
};

/// Columns of the Bitbucket repositories file
const BITBUCKET_REPO_COLUMNS: [&str; 3] = ["repo", "isArchived", "visibility"];

/// Columns of the Bitbucket teams file
const BITBUCKET_TEAM_COLUMNS: [&str; 5] = ["name", "slug", "privacy", "description", "parentTeam"];

/// Export the repositories of a project
#[derive(Args, Debug, Clone)]
pub struct BitbucketReposArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,
}

/// Export per-repository permissions from a repositories file
#[derive(Args, Debug, Clone)]
pub struct BitbucketRepoInputArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// CSV file with a `repo` column
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N rows of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,
}

/// Export the groups having a permission on a project
#[derive(Args, Debug, Clone)]
pub struct BitbucketTeamsArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,
}

/// Export the members of groups
#[derive(Args, Debug, Clone)]
pub struct BitbucketTeamMembersArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// CSV file with a `team` (or `name`) column holding group names
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N rows of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,
}

/// Export the users having a permission on a project
#[derive(Args, Debug, Clone)]
pub struct BitbucketProjectUsersArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,
}

/// Export the union of the users of several projects
#[derive(Args, Debug, Clone)]
pub struct BitbucketEnterpriseUsersArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// Comma separated list of project keys
    #[arg(short, long)]
    pub projects: Option<String>,

    /// CSV file with a `login` column, only these users are exported
    #[arg(short, long)]
    pub users_file: Option<PathBuf>,
}

/// One line of the Bitbucket repositories file
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct BitbucketRepoRow {
    repo: String,
    is_archived: bool,
    visibility: &'static str,
}

impl From<BbsRepo> for BitbucketRepoRow {
    fn from(repo: BbsRepo) -> Self {
        Self {
            repo: repo.slug,
            is_archived: repo.archived,
            visibility: if repo.public { "public" } else { "private" },
        }
    }
}

/// One line of the Bitbucket teams file
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct BitbucketTeamRow {
    name: String,
    slug: String,
    privacy: &'static str,
    description: String,
    parent_team: String,
}

impl From<BbsGroupPermission> for BitbucketTeamRow {
    fn from(permission: BbsGroupPermission) -> Self {
        Self {
            slug: slugify(&permission.group.name),
            name: permission.group.name,
            privacy: "closed",
            description: String::new(),
            parent_team: String::new(),
        }
    }
}

/// Input line naming a group
#[derive(Deserialize, Debug, Clone)]
struct GroupInput {
    #[serde(alias = "name")]
    team: String,
}

/// Collaborator lines of a repository
fn repo_collaborators(repo: &str, permissions: Vec<BbsUserPermission>) -> Vec<DirectCollaboratorRow> {
    permissions
        .into_iter()
        .map(|permission| DirectCollaboratorRow {
            repo: repo.to_string(),
            login: permission.user.slug,
            role: bitbucket_role(&permission.permission),
        })
        .collect()
}

/// Team permission lines of a repository
fn repo_team_permissions(repo: &str, permissions: Vec<BbsGroupPermission>) -> Vec<RepoTeamPermission> {
    permissions
        .into_iter()
        .map(|permission| RepoTeamPermission {
            repo: repo.to_string(),
            team: slugify(&permission.group.name),
            permission: team_permission(&permission.permission),
        })
        .collect()
}

/// Run get-bitbucket-repositories
/// # Errors
/// Error if the repositories can't be fetched or the file can't be written
pub async fn get_bitbucket_repositories(
    config: &mut OrgMoverConfig,
    args: BitbucketReposArgs,
) -> Result<(), OrgMoverError> {
    let platform = BitbucketConfig::get_platform(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let pb = spinner("get-bitbucket-repositories");
    pb.set_message(format!("Fetching repositories of {}", scope.organization));
    let repos = platform.list_repos(&scope.organization, &scope).await?;
    pb.finish_and_clear();
    info!("{} repositories fetched", repos.len());

    let project = scope.org_slug();
    let path = scope.output_csv(format!("{project}-bitbucket-repo-{}.csv", current_time()));
    let mut sink = CsvSink::create(path, &BITBUCKET_REPO_COLUMNS)?;
    for repo in repos {
        sink.write(&BitbucketRepoRow::from(repo))?;
    }
    sink.finish()?;
    Ok(())
}

/// Run get-bitbucket-repo-direct-collaborators, a repository that can't be fetched gets a failed status line
/// # Errors
/// Error if the input file can't be read or the output files can't be written
pub async fn get_bitbucket_repo_direct_collaborators(
    config: &mut OrgMoverConfig,
    args: BitbucketRepoInputArgs,
) -> Result<(), OrgMoverError> {
    let platform = BitbucketConfig::get_platform(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let repos: Vec<RepoRow> = input_rows(args.input_file)?;
    let project = scope.org_slug();
    let path = scope.output_csv(format!(
        "{project}-bitbucket-repo-direct-collaborators-{}.csv",
        current_time()
    ));
    let mut sink = CsvSink::create(path, &DIRECT_COLLABORATORS_COLUMNS)?;
    let mut status_sink = StatusSink::create(
        scope.companion_csv(
            "-status",
            format!("{project}-bitbucket-repo-direct-collaborators-status.csv"),
        ),
        "repo",
    )?;
    let total = repos.len();
    let pb = spinner("");
    for (index, row) in rows_after(repos, args.skip) {
        row_progress(index, total, &pb, format!("Fetching users of {}", row.repo));
        let outcome = match platform
            .repo_user_permissions(&scope.organization, &row.repo, &scope)
            .await
        {
            Ok(permissions) => {
                for collaborator in repo_collaborators(&row.repo, permissions) {
                    sink.write(&collaborator)?;
                }
                Outcome::success()
            }
            Err(e) => {
                warn!("{}: {e}", row.repo);
                Outcome::from(&e)
            }
        };
        status_sink.write(&row.repo, &outcome)?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    status_sink.finish()?;
    Ok(())
}

/// Run get-bitbucket-teams
/// # Errors
/// Error if the groups can't be fetched or the file can't be written
pub async fn get_bitbucket_teams(
    config: &mut OrgMoverConfig,
    args: BitbucketTeamsArgs,
) -> Result<(), OrgMoverError> {
    let platform = BitbucketConfig::get_platform(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let pb = spinner("get-bitbucket-teams");
    pb.set_message(format!("Fetching groups of {}", scope.organization));
    let groups = platform
        .project_group_permissions(&scope.organization, &scope)
        .await?;
    pb.finish_and_clear();
    let project = scope.org_slug();
    let path = scope.output_csv(format!("{project}-bitbucket-teams-{}.csv", current_time()));
    let mut sink = CsvSink::create(path, &BITBUCKET_TEAM_COLUMNS)?;
    for group in groups {
        sink.write(&BitbucketTeamRow::from(group))?;
    }
    sink.finish()?;
    Ok(())
}

/// Run get-bitbucket-team-members, a group that can't be fetched gets a failed status line
/// # Errors
/// Error if the input file can't be read or the output files can't be written
pub async fn get_bitbucket_team_members(
    config: &mut OrgMoverConfig,
    args: BitbucketTeamMembersArgs,
) -> Result<(), OrgMoverError> {
    let platform = BitbucketConfig::get_platform(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let groups: Vec<GroupInput> = input_rows(args.input_file)?;
    let project = scope.org_slug();
    let path = scope.output_csv(format!(
        "{project}-bitbucket-team-members-{}.csv",
        current_time()
    ));
    let mut sink = CsvSink::create(path, &MEMBER_TEAM_ROLE_COLUMNS)?;
    let mut status_sink = StatusSink::create(
        scope.companion_csv(
            "-status",
            format!("{project}-bitbucket-team-members-status.csv"),
        ),
        "team",
    )?;
    let total = groups.len();
    let pb = spinner("");
    for (index, group) in rows_after(groups, args.skip) {
        row_progress(index, total, &pb, format!("Fetching members of {}", group.team));
        let team = slugify(&group.team);
        let outcome = match platform.group_members(&group.team, &scope).await {
            Ok(users) => {
                for user in users {
                    sink.write(&MemberTeamRole {
                        member: user.slug,
                        team: team.clone(),
                        role: "member".to_string(),
                    })?;
                }
                Outcome::success()
            }
            Err(e) => {
                warn!("{}: {e}", group.team);
                Outcome::from(&e)
            }
        };
        status_sink.write(&group.team, &outcome)?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    status_sink.finish()?;
    Ok(())
}

/// Run get-bitbucket-repo-team-permissions, a repository that can't be fetched gets a failed status line
/// # Errors
/// Error if the input file can't be read or the output files can't be written
pub async fn get_bitbucket_repo_team_permissions(
    config: &mut OrgMoverConfig,
    args: BitbucketRepoInputArgs,
) -> Result<(), OrgMoverError> {
    let platform = BitbucketConfig::get_platform(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let repos: Vec<RepoRow> = input_rows(args.input_file)?;
    let project = scope.org_slug();
    let path = scope.output_csv(format!(
        "{project}-bitbucket-repo-teams-permissions-{}.csv",
        current_time()
    ));
    let mut sink = CsvSink::create(path, &REPO_TEAM_PERMISSION_COLUMNS)?;
    let mut status_sink = StatusSink::create(
        scope.companion_csv(
            "-status",
            format!("{project}-bitbucket-repo-teams-permissions-status.csv"),
        ),
        "repo",
    )?;
    let total = repos.len();
    let pb = spinner("");
    for (index, row) in rows_after(repos, args.skip) {
        row_progress(index, total, &pb, format!("Fetching groups of {}", row.repo));
        let outcome = match platform
            .repo_group_permissions(&scope.organization, &row.repo, &scope)
            .await
        {
            Ok(permissions) => {
                for permission in repo_team_permissions(&row.repo, permissions) {
                    sink.write(&permission)?;
                }
                Outcome::success()
            }
            Err(e) => {
                warn!("{}: {e}", row.repo);
                Outcome::from(&e)
            }
        };
        status_sink.write(&row.repo, &outcome)?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    status_sink.finish()?;
    Ok(())
}

/// Run get-bitbucket-project-users
/// # Errors
/// Error if the users can't be fetched or the file can't be written
pub async fn get_bitbucket_project_users(
    config: &mut OrgMoverConfig,
    args: BitbucketProjectUsersArgs,
) -> Result<(), OrgMoverError> {
    let platform = BitbucketConfig::get_platform(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let pb = spinner("get-bitbucket-project-users");
    pb.set_message(format!("Fetching users of {}", scope.organization));
    let users = platform
        .project_user_permissions(&scope.organization, &scope)
        .await?;
    pb.finish_and_clear();
    let logins = unique_logins(
        users.into_iter().map(|permission| permission.user.slug),
        &LoginFilter::default(),
        &mut HashSet::new(),
    );
    let project = scope.org_slug();
    let path = scope.output_csv(format!("{project}-bitbucket-project-users-{}.csv", current_time()));
    write_logins(path, &logins)
}

/// Run get-bitbucket-enterprise-users
/// # Errors
/// Error if the users of a project can't be fetched or the file can't be written
pub async fn get_bitbucket_enterprise_users(
    config: &mut OrgMoverConfig,
    args: BitbucketEnterpriseUsersArgs,
) -> Result<(), OrgMoverError> {
    let platform = BitbucketConfig::get_platform(config, &args.common)?;
    let projects = split_list(&value_or_prompt(
        args.projects,
        "Enter the comma separated list of Bitbucket projects",
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
    for project in &projects {
        let users = platform.project_user_permissions(project, &base).await?;
        let new_logins = unique_logins(
            users.into_iter().map(|permission| permission.user.slug),
            &filter,
            &mut seen,
        );
        info!("{project}: {} new users", new_logins.len());
        logins.extend(new_logins);
    }
    let org = args
        .common
        .organization
        .as_deref()
        .unwrap_or("bitbucket")
        .replace(char::is_whitespace, "");
    let path = base.output_csv(format!(
        "{org}-bitbucket-enterprise-users-{}.csv",
        current_time()
    ));
    write_logins(path, &logins)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        records::{read_rows, serialized_header},
        test_server::TestServer,
    };
    use serde_json::json;
    use std::fs::{read_to_string, write};
    use tempfile::tempdir;

    #[tokio::test]
    async fn team_permissions_continue_after_a_failed_repository() {
        let server = TestServer::start(vec![
            (401, json!({ "errors": [{ "message": "Authentication failed" }] })),
            (
                200,
                json!({
                    "values": [{ "group": { "name": "Front End" }, "permission": "REPO_WRITE" }],
                    "isLastPage": true
                }),
            ),
        ])
        .await;
        let dir = tempdir().unwrap();
        let input = dir.path().join("repos.csv");
        let output = dir.path().join("permissions.csv");
        write(&input, "repo\nlocked\nweb-app\n").unwrap();
        get_bitbucket_repo_team_permissions(
            &mut OrgMoverConfig::default(),
            BitbucketRepoInputArgs {
                common: CommonArgs {
                    organization: Some("PRJ".into()),
                    token: Some("token".into()),
                    server_url: Some(server.url().to_string()),
                    wait_time: 0,
                    batch_size: 50,
                    output_file: Some(output.clone()),
                    allow_untrusted_ssl_certificates: false,
                },
                input_file: Some(input),
                skip: 0,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            server.calls(),
            vec![
                "GET /rest/api/latest/projects/PRJ/repos/locked/permissions/groups?limit=50",
                "GET /rest/api/latest/projects/PRJ/repos/web-app/permissions/groups?limit=50",
            ]
        );
        assert_eq!(
            read_to_string(&output).unwrap(),
            "repo,team,permission\nweb-app,front-end,push\n"
        );
        let status = read_to_string(dir.path().join("permissions-status.csv")).unwrap();
        let lines: Vec<&str> = status.lines().collect();
        assert!(lines[1].starts_with("locked,Error,,"));
        assert_eq!(lines[2], "web-app,Success,,");
    }

    fn group(name: &str, permission: &str) -> BbsGroupPermission {
        serde_json::from_value(json!({
            "group": { "name": name },
            "permission": permission
        }))
        .unwrap()
    }

    #[test]
    fn repo_rows() {
        let repo: BbsRepo = serde_json::from_value(json!({
            "slug": "web-app", "name": "Web App", "public": false, "archived": true
        }))
        .unwrap();
        let row = BitbucketRepoRow::from(repo);
        assert_eq!(row.visibility, "private");
        assert!(row.is_archived);
        assert_eq!(serialized_header(&row), BITBUCKET_REPO_COLUMNS.join(","));
    }

    #[test]
    fn team_rows() {
        let row = BitbucketTeamRow::from(group("Front End", "PROJECT_WRITE"));
        assert_eq!(row.name, "Front End");
        assert_eq!(row.slug, "front-end");
        assert_eq!(row.privacy, "closed");
        assert_eq!(serialized_header(&row), BITBUCKET_TEAM_COLUMNS.join(","));
    }

    #[test]
    fn permission_rows_are_mapped() {
        let permissions = repo_team_permissions(
            "web-app",
            vec![group("Front End", "REPO_WRITE"), group("ops", "REPO_ADMIN")],
        );
        assert_eq!(permissions[0].team, "front-end");
        assert_eq!(permissions[0].permission, "push");
        assert_eq!(permissions[1].permission, "admin");

        let users: Vec<BbsUserPermission> = serde_json::from_value(json!([
            { "user": { "slug": "alice" }, "permission": "REPO_READ" }
        ]))
        .unwrap();
        let rows = repo_collaborators("web-app", users);
        assert_eq!(rows[0].login, "alice");
        assert_eq!(rows[0].role, "read");
    }

    #[test]
    fn teams_file_feeds_team_members() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("teams.csv");
        write(
            &path,
            "name,slug,privacy,description,parentTeam\nFront End,front-end,closed,,\n",
        )
        .unwrap();
        let rows: Vec<GroupInput> = read_rows(&path).unwrap();
        assert_eq!(rows[0].team, "Front End");
    }
}
