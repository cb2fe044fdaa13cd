//! GitLab exports: projects, project members, groups, group members and users
use std::path::PathBuf;

use clap::Args;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{
    config::GitlabConfig,
    models::{access_role, GitlabGroup, GitlabMember, GitlabProject},
};
use crate::{
    config::OrgMoverConfig,
    context::{CommonArgs, Scope},
    errors::OrgMoverError,
    github::{
        repos::{DirectCollaboratorRow, DIRECT_COLLABORATORS_COLUMNS},
        teams::{
            rest_permission, MemberTeamRole, RepoTeamPermission, MEMBER_TEAM_ROLE_COLUMNS,
            REPO_TEAM_PERMISSION_COLUMNS,
        },
    },
    http::Outcome,
    records::{current_time, input_rows, rows_after, CsvSink, LoginRow, StatusSink},
    utils::{row_progress, spinner},
};

/// Columns of the GitLab repositories file
const GITLAB_REPO_COLUMNS: [&str; 6] = ["name", "repo", "group", "id", "isArchived", "visibility"];

/// Columns of the GitLab teams file
const GITLAB_TEAM_COLUMNS: [&str; 6] = ["id", "name", "slug", "description", "privacy", "parentTeam"];

/// Export the projects of a GitLab instance
#[derive(Args, Debug, Clone)]
pub struct GitlabReposArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,
}

/// Export the members of GitLab projects
#[derive(Args, Debug, Clone)]
pub struct GitlabRepoCollaboratorsArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// Repositories file written by get-gitlab-repositories (`id` and `repo` columns)
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N rows of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,
}

/// Export the groups of a GitLab instance
#[derive(Args, Debug, Clone)]
pub struct GitlabTeamsArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,
}

/// Export the members of GitLab groups
#[derive(Args, Debug, Clone)]
pub struct GitlabTeamMembersArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// Teams file written by get-gitlab-teams (`id` and `slug` columns)
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N rows of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,
}

/// Export the users of a GitLab instance
#[derive(Args, Debug, Clone)]
pub struct GitlabUsersArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,
}

/// One line of the GitLab repositories file
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct GitlabRepoRow {
    name: String,
    repo: String,
    group: String,
    id: u64,
    is_archived: bool,
    visibility: String,
}

impl From<&GitlabProject> for GitlabRepoRow {
    fn from(project: &GitlabProject) -> Self {
        Self {
            name: project.name.clone(),
            repo: project.repo().to_string(),
            group: project.namespace.full_path.clone(),
            id: project.id,
            is_archived: project.archived,
            visibility: project.visibility.clone(),
        }
    }
}

/// Team permission of the owning group on a project
fn repo_team_permission(project: &GitlabProject) -> RepoTeamPermission {
    RepoTeamPermission {
        repo: project.repo().to_string(),
        team: project.namespace.full_path.clone(),
        permission: rest_permission(access_role(project.group_access_level())),
    }
}

/// One line of the GitLab teams file
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct GitlabTeamRow {
    id: u64,
    name: String,
    slug: String,
    description: String,
    privacy: String,
    parent_team: String,
}

impl From<GitlabGroup> for GitlabTeamRow {
    fn from(group: GitlabGroup) -> Self {
        let parent_team = group.parent_path();
        Self {
            id: group.id,
            name: group.name,
            slug: group.path,
            description: group.description.unwrap_or_default(),
            privacy: "closed".to_string(),
            parent_team,
        }
    }
}

/// Input line naming a project
#[derive(Deserialize, Debug, Clone)]
struct ProjectInput {
    id: u64,
    repo: String,
}

/// Input line naming a group
#[derive(Deserialize, Debug, Clone)]
struct GroupInput {
    id: u64,
    slug: String,
}

/// Collaborator lines of a project
fn project_collaborators(repo: &str, members: Vec<GitlabMember>) -> Vec<DirectCollaboratorRow> {
    members
        .into_iter()
        .map(|member| DirectCollaboratorRow {
            repo: repo.to_string(),
            login: member.username,
            role: access_role(member.access_level).to_string(),
        })
        .collect()
}

/// Member lines of a group
fn group_members(team: &str, members: Vec<GitlabMember>) -> Vec<MemberTeamRole> {
    members
        .into_iter()
        .map(|member| MemberTeamRole {
            member: member.username,
            team: team.to_string(),
            role: access_role(member.access_level).to_string(),
        })
        .collect()
}

/// Run get-gitlab-repositories
/// # Errors
/// Error if the projects can't be fetched or the files can't be written
pub async fn get_gitlab_repositories(
    config: &mut OrgMoverConfig,
    args: GitlabReposArgs,
) -> Result<(), OrgMoverError> {
    let platform = GitlabConfig::get_platform(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let pb = spinner("get-gitlab-repositories");
    pb.set_message("Fetching projects");
    let projects = platform.list_projects(&scope).await?;
    pb.finish_and_clear();
    info!("{} projects fetched", projects.len());

    let org = scope.org_slug();
    let time = current_time();
    let mut sink = CsvSink::create(
        scope.output_csv(format!("{org}-gitlab-repos-{time}.csv")),
        &GITLAB_REPO_COLUMNS,
    )?;
    let mut permissions = CsvSink::create(
        scope.companion_csv(
            "-team-permissions",
            format!("{org}-gitlab-repos-team-permissions-{time}.csv"),
        ),
        &REPO_TEAM_PERMISSION_COLUMNS,
    )?;
    for project in &projects {
        sink.write(&GitlabRepoRow::from(project))?;
        permissions.write(&repo_team_permission(project))?;
    }
    sink.finish()?;
    permissions.finish()?;
    Ok(())
}

/// Run get-gitlab-repo-direct-collaborators, a project that can't be fetched gets a failed status line
/// # Errors
/// Error if the input file can't be read or the output files can't be written
pub async fn get_gitlab_repo_direct_collaborators(
    config: &mut OrgMoverConfig,
    args: GitlabRepoCollaboratorsArgs,
) -> Result<(), OrgMoverError> {
    let platform = GitlabConfig::get_platform(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let projects: Vec<ProjectInput> = input_rows(args.input_file)?;
    let org = scope.org_slug();
    let path = scope.output_csv(format!(
        "{org}-gitlab-repo-direct-collaborators-{}.csv",
        current_time()
    ));
    let mut sink = CsvSink::create(path, &DIRECT_COLLABORATORS_COLUMNS)?;
    let mut status_sink = StatusSink::create(
        scope.companion_csv(
            "-status",
            format!("{org}-gitlab-repo-direct-collaborators-status.csv"),
        ),
        "repo",
    )?;
    let total = projects.len();
    let pb = spinner("");
    for (index, project) in rows_after(projects, args.skip) {
        row_progress(index, total, &pb, format!("Fetching members of {}", project.repo));
        let outcome = match platform.list_project_members(project.id, &scope).await {
            Ok(members) => {
                for row in project_collaborators(&project.repo, members) {
                    sink.write(&row)?;
                }
                Outcome::success()
            }
            Err(e) => {
                warn!("{}: {e}", project.repo);
                Outcome::from(&e)
            }
        };
        status_sink.write(&project.repo, &outcome)?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    status_sink.finish()?;
    Ok(())
}

/// Run get-gitlab-teams
/// # Errors
/// Error if the groups can't be fetched or the file can't be written
pub async fn get_gitlab_teams(
    config: &mut OrgMoverConfig,
    args: GitlabTeamsArgs,
) -> Result<(), OrgMoverError> {
    let platform = GitlabConfig::get_platform(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let pb = spinner("get-gitlab-teams");
    pb.set_message("Fetching groups");
    let groups = platform.list_groups(&scope).await?;
    pb.finish_and_clear();
    let org = scope.org_slug();
    let path = scope.output_csv(format!("{org}-gitlab-teams-{}.csv", current_time()));
    let mut sink = CsvSink::create(path, &GITLAB_TEAM_COLUMNS)?;
    for group in groups {
        sink.write(&GitlabTeamRow::from(group))?;
    }
    sink.finish()?;
    Ok(())
}

/// Run get-gitlab-team-members, a group that can't be fetched gets a failed status line
/// # Errors
/// Error if the input file can't be read or the output files can't be written
pub async fn get_gitlab_team_members(
    config: &mut OrgMoverConfig,
    args: GitlabTeamMembersArgs,
) -> Result<(), OrgMoverError> {
    let platform = GitlabConfig::get_platform(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let groups: Vec<GroupInput> = input_rows(args.input_file)?;
    let org = scope.org_slug();
    let path = scope.output_csv(format!("{org}-gitlab-teams-members-{}.csv", current_time()));
    let mut sink = CsvSink::create(path, &MEMBER_TEAM_ROLE_COLUMNS)?;
    let mut status_sink = StatusSink::create(
        scope.companion_csv("-status", format!("{org}-gitlab-teams-members-status.csv")),
        "team",
    )?;
    let total = groups.len();
    let pb = spinner("");
    for (index, group) in rows_after(groups, args.skip) {
        row_progress(index, total, &pb, format!("Fetching members of {}", group.slug));
        let outcome = match platform.list_group_members(group.id, &scope).await {
            Ok(members) => {
                for row in group_members(&group.slug, members) {
                    sink.write(&row)?;
                }
                Outcome::success()
            }
            Err(e) => {
                warn!("{}: {e}", group.slug);
                Outcome::from(&e)
            }
        };
        status_sink.write(&group.slug, &outcome)?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    status_sink.finish()?;
    Ok(())
}

/// Run get-gitlab-users
/// # Errors
/// Error if the users can't be fetched or the file can't be written
pub async fn get_gitlab_users(
    config: &mut OrgMoverConfig,
    args: GitlabUsersArgs,
) -> Result<(), OrgMoverError> {
    let platform = GitlabConfig::get_platform(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let pb = spinner("get-gitlab-users");
    pb.set_message("Fetching users");
    let users = platform.list_users(&scope).await?;
    pb.finish_and_clear();
    let org = scope.org_slug();
    let path = scope.output_csv(format!("{org}-gitlab-users-{}.csv", current_time()));
    let mut sink = CsvSink::create(path, &["login"])?;
    for user in users {
        sink.write(&LoginRow {
            login: user.username,
        })?;
    }
    sink.finish()?;
    Ok(())
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
    async fn team_members_continue_after_a_failed_group() {
        let server = TestServer::start(vec![
            (404, json!({ "message": "404 Group Not Found" })),
            (200, json!([{ "username": "alice", "access_level": 50 }])),
        ])
        .await;
        let dir = tempdir().unwrap();
        let input = dir.path().join("teams.csv");
        let output = dir.path().join("members.csv");
        write(&input, "id,slug\n4,gone\n5,front\n").unwrap();
        get_gitlab_team_members(
            &mut OrgMoverConfig::default(),
            GitlabTeamMembersArgs {
                common: CommonArgs {
                    organization: Some("acme".into()),
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
                "GET /api/v4/groups/4/members/all?per_page=50&page=1",
                "GET /api/v4/groups/5/members/all?per_page=50&page=1",
            ]
        );
        assert_eq!(
            read_to_string(&output).unwrap(),
            "member,team,role\nalice,front,admin\n"
        );
        let status = read_to_string(dir.path().join("members-status.csv")).unwrap();
        let lines: Vec<&str> = status.lines().collect();
        assert_eq!(lines[0], "team,status,statusText,errorMessage");
        assert!(lines[1].starts_with("gone,Error,,"));
        assert_eq!(lines[2], "front,Success,,");
    }

    fn project(access: Option<u64>) -> GitlabProject {
        serde_json::from_value(json!({
            "id": 8,
            "name": "Web App",
            "path": "web-app",
            "path_with_namespace": "acme/front/web-app",
            "archived": false,
            "visibility": "private",
            "namespace": { "full_path": "acme/front" },
            "permissions": {
                "group_access": access.map(|level| json!({ "access_level": level }))
            }
        }))
        .unwrap()
    }

    #[test]
    fn project_rows() {
        let row = GitlabRepoRow::from(&project(Some(40)));
        assert_eq!(row.repo, "web-app");
        assert_eq!(row.group, "acme/front");
        assert_eq!(serialized_header(&row), GITLAB_REPO_COLUMNS.join(","));

        let permission = repo_team_permission(&project(Some(40)));
        assert_eq!(permission.team, "acme/front");
        assert_eq!(permission.permission, "admin");
        assert_eq!(repo_team_permission(&project(None)).permission, "triage");
    }

    #[test]
    fn team_permissions_use_rest_names() {
        assert_eq!(repo_team_permission(&project(Some(30))).permission, "push");
        assert_eq!(repo_team_permission(&project(Some(20))).permission, "pull");
        assert_eq!(repo_team_permission(&project(Some(10))).permission, "triage");
    }

    #[test]
    fn group_rows() {
        let group = GitlabGroup {
            id: 5,
            name: "Front".into(),
            path: "front".into(),
            description: None,
            parent_id: Some(1),
            web_url: "https://gitlab.com/groups/acme/front".into(),
        };
        let row = GitlabTeamRow::from(group);
        assert_eq!(row.privacy, "closed");
        assert_eq!(row.parent_team, "acme");
        assert_eq!(row.description, "");
        assert_eq!(serialized_header(&row), GITLAB_TEAM_COLUMNS.join(","));
    }

    #[test]
    fn member_rows_use_access_role() {
        let members = vec![
            GitlabMember {
                username: "alice".into(),
                access_level: Some(50),
            },
            GitlabMember {
                username: "bob".into(),
                access_level: Some(20),
            },
        ];
        let rows = group_members("front", members.clone());
        assert_eq!(rows[0].role, "admin");
        assert_eq!(rows[1].team, "front");
        let rows = project_collaborators("web-app", members);
        assert_eq!(rows[1].role, "read");
        assert_eq!(rows[1].login, "bob");
    }

    #[test]
    fn repository_export_feeds_collaborator_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repos.csv");
        write(
            &path,
            "name,repo,group,id,isArchived,visibility\nWeb App,web-app,acme/front,8,false,private\n",
        )
        .unwrap();
        let rows: Vec<ProjectInput> = read_rows(&path).unwrap();
        assert_eq!(rows[0].id, 8);
        assert_eq!(rows[0].repo, "web-app");
    }
}
