//! Write commands replaying exported rows on a GitHub organization
//!
//! Every command reads an input file, sends one request per row and writes a
//! status file holding the input columns followed by `status`, `statusText`
//! and `errorMessage`. A failed row never stops the command.
use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
};

use clap::Args;
use log::{info, warn};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use urlencoding::encode;

use super::{
    config::GithubConfig,
    platform::GithubPlatform,
    repos::input_repos,
    teams::{rest_permission, MemberTeamRole, RepoTeamPermission},
};
use crate::{
    config::OrgMoverConfig,
    context::{CommonArgs, Scope},
    errors::OrgMoverError,
    http::{ApiResponse, Outcome, VALIDATION_FAILED},
    records::{current_time, input_rows, rows_after, CsvSink, LoginRow, RepoFilter},
    utils::{row_progress, slugify, spinner, yes_no_input},
};

/// Status columns appended to the input columns
const STATUS_COLUMNS: [&str; 3] = ["status", "statusText", "errorMessage"];

/// Set the direct collaborators of repositories
#[derive(Args, Debug, Clone)]
pub struct SetRepoCollaboratorsArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// CSV file with `repo`, `login` and `role` columns
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N rows of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,

    /// Remove the collaborators instead of adding them
    #[arg(long)]
    pub is_delete: bool,

    /// CSV file with a `repo` column, other repositories are left untouched
    #[arg(long)]
    pub repos_file: Option<PathBuf>,
}

/// Give teams access to repositories
#[derive(Args, Debug, Clone)]
pub struct SetRepoTeamPermissionArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// CSV file with `repo`, `team` and `permission` columns
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N rows of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,

    /// CSV file with a `repo` column, other repositories are left untouched
    #[arg(long)]
    pub repos_file: Option<PathBuf>,
}

/// Archive or unarchive repositories
#[derive(Args, Debug, Clone)]
pub struct SetArchivedArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// CSV file with a `repo` column
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N rows of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,

    /// Single repository, instead of an input file
    #[arg(long)]
    pub repo: Option<String>,

    /// Unarchive instead of archiving
    #[arg(long)]
    pub unarchive: bool,
}

/// Create the teams of a get-teams export
#[derive(Args, Debug, Clone)]
pub struct CreateTeamsArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// Team metrics file written by get-teams
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N rows of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,

    /// Login owning the token, removed from every team it creates
    #[arg(long)]
    pub github_user: Option<String>,
}

/// Delete repositories
#[derive(Args, Debug, Clone)]
pub struct DeleteReposArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// CSV file with a `repo` column
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N rows of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,

    /// Single repository, instead of an input file
    #[arg(long)]
    pub repo: Option<String>,

    /// Don't ask for confirmation
    #[arg(long)]
    pub yes: bool,
}

/// Add members to teams
#[derive(Args, Debug, Clone)]
pub struct InsertTeamMembersArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// CSV file with `member`, `team` and `role` columns
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N rows of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,
}

/// Invite users to the organization or remove them
#[derive(Args, Debug, Clone)]
pub struct SetMembershipArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// CSV file with a `login` column
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N rows of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,

    /// Remove the users from the organization
    #[arg(long)]
    pub delete_members: bool,
}

/// Input line of set-repo-direct-collaborators
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
struct CollaboratorInput {
    repo: String,
    login: String,
    role: String,
}

/// Input line of create-teams, extra columns of the export are ignored
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
struct TeamInput {
    name: String,
    slug: String,
    description: String,
    privacy: String,
    parent_team: String,
}

impl TeamInput {
    /// Slug of the team, derived from its name when the column is empty
    fn slug(&self) -> String {
        if self.slug.is_empty() {
            slugify(&self.name)
        } else {
            self.slug.clone()
        }
    }
}

/// GitHub REST privacy of an exported team
fn team_privacy(privacy: &str) -> &'static str {
    if privacy.eq_ignore_ascii_case("VISIBLE") || privacy.eq_ignore_ascii_case("closed") {
        "closed"
    } else {
        "secret"
    }
}

/// Succeeded and failed rows per repository, in first-seen order
#[derive(Debug, Default)]
struct RepoSummary {
    repos: Vec<String>,
    counts: HashMap<String, (usize, usize)>,
}

impl RepoSummary {
    /// Count the outcome of one row
    fn record(&mut self, repo: &str, outcome: &Outcome) {
        if !self.counts.contains_key(repo) {
            self.repos.push(repo.to_string());
        }
        let counts = self.counts.entry(repo.to_string()).or_default();
        if outcome.is_success() {
            counts.0 += 1;
        } else {
            counts.1 += 1;
        }
    }

    /// `repo: N succeeded, M failed` for every repository
    fn lines(&self) -> Vec<String> {
        self.repos
            .iter()
            .map(|repo| {
                let (succeeded, failed) = self.counts.get(repo).copied().unwrap_or_default();
                format!("{repo}: {succeeded} succeeded, {failed} failed")
            })
            .collect()
    }

    /// Log the summary
    fn log(&self) {
        for line in self.lines() {
            info!("{line}");
        }
    }
}

/// Teams ordered so that every parent precedes its children
fn parents_first(teams: Vec<TeamInput>) -> Vec<TeamInput> {
    let slugs: HashSet<String> = teams.iter().map(TeamInput::slug).collect();
    let mut placed: HashSet<String> = HashSet::new();
    let mut ordered = Vec::with_capacity(teams.len());
    let mut pending = teams;
    while !pending.is_empty() {
        let (ready, waiting): (Vec<_>, Vec<_>) = pending.into_iter().partition(|team| {
            team.parent_team.is_empty()
                || !slugs.contains(&team.parent_team)
                || placed.contains(&team.parent_team)
        });
        if ready.is_empty() {
            // parent cycle
            ordered.extend(waiting);
            break;
        }
        placed.extend(ready.iter().map(TeamInput::slug));
        ordered.extend(ready);
        pending = waiting;
    }
    ordered
}

/// Log the outcome of one row
fn log_outcome(subject: &str, outcome: &Outcome) {
    if outcome.is_success() {
        info!("{subject}: {}", outcome.status);
    } else {
        warn!(
            "{subject}: {} {} {}",
            outcome.status, outcome.status_text, outcome.error_message
        );
    }
}

/// Column list of a status file
fn status_columns(input: &[&'static str]) -> Vec<&'static str> {
    input.iter().chain(STATUS_COLUMNS.iter()).copied().collect()
}

/// PATCH the archived flag of a repository
async fn patch_archived(platform: &GithubPlatform, org: &str, repo: &str, archived: bool) -> ApiResponse {
    platform
        .client()
        .request(
            Method::PATCH,
            &platform.repo_url(org, repo),
            Some(json!({ "archived": archived })),
        )
        .await
}

/// Send a write request, unarchiving the repository for the time of a retry if it is archived
async fn request_unarchived(
    platform: &GithubPlatform,
    org: &str,
    repo: &str,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> ApiResponse {
    let response = platform
        .client()
        .request(method.clone(), url, body.clone())
        .await;
    if !response.is_archived_error() {
        return response;
    }
    info!("{repo} is archived, unarchiving it");
    let unarchived = patch_archived(platform, org, repo, false).await;
    if unarchived.failed() {
        return unarchived;
    }
    let retried = platform.client().request(method, url, body).await;
    let archived = patch_archived(platform, org, repo, true).await;
    if archived.failed() {
        warn!("{repo} could not be archived again: {}", archived.describe());
    }
    retried
}

/// Run set-repo-direct-collaborators
/// # Errors
/// Error if the input files can't be read or the status file can't be written
pub async fn set_repo_direct_collaborators(
    config: &mut OrgMoverConfig,
    args: SetRepoCollaboratorsArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let rows: Vec<CollaboratorInput> = input_rows(args.input_file)?;
    let repos = RepoFilter::from_file(args.repos_file.as_deref())?;
    let org = scope.org_slug();
    let path = scope.output_csv(format!(
        "{org}-set-repo-collaborators-status-{}.csv",
        current_time()
    ));
    let mut sink = CsvSink::create(path, &status_columns(&["repo", "login", "role"]))?;
    let mut summary = RepoSummary::default();
    let total = rows.len();
    let pb = spinner("");
    for (index, row) in rows_after(rows, args.skip) {
        if !repos.allows(&row.repo) {
            continue;
        }
        row_progress(index, total, &pb, format!("{} on {}", row.login, row.repo));
        let url = format!(
            "{}/collaborators/{}",
            platform.repo_url(&scope.organization, &row.repo),
            encode(&row.login)
        );
        let (method, body) = if args.is_delete {
            (Method::DELETE, None)
        } else {
            (
                Method::PUT,
                Some(json!({ "permission": rest_permission(&row.role) })),
            )
        };
        let outcome =
            request_unarchived(&platform, &scope.organization, &row.repo, method, &url, body)
                .await
                .outcome();
        log_outcome(&format!("{} on {}", row.login, row.repo), &outcome);
        summary.record(&row.repo, &outcome);
        sink.write(&(
            &row.repo,
            &row.login,
            &row.role,
            &outcome.status,
            &outcome.status_text,
            &outcome.error_message,
        ))?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    summary.log();
    sink.finish()?;
    Ok(())
}

/// Run set-repo-team-permission
/// # Errors
/// Error if the input files can't be read or the status file can't be written
pub async fn set_repo_team_permission(
    config: &mut OrgMoverConfig,
    args: SetRepoTeamPermissionArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let rows: Vec<RepoTeamPermission> = input_rows(args.input_file)?;
    let repos = RepoFilter::from_file(args.repos_file.as_deref())?;
    let org = scope.org_slug();
    let path = scope.output_csv(format!(
        "{org}-set-repo-team-permission-status-{}.csv",
        current_time()
    ));
    let mut sink = CsvSink::create(path, &status_columns(&["repo", "team", "permission"]))?;
    let mut summary = RepoSummary::default();
    let total = rows.len();
    let pb = spinner("");
    for (index, row) in rows_after(rows, args.skip) {
        if !repos.allows(&row.repo) {
            continue;
        }
        row_progress(index, total, &pb, format!("{} on {}", row.team, row.repo));
        let url = platform.rest(&format!(
            "/orgs/{org}/teams/{team}/repos/{org}/{repo}",
            org = encode(&scope.organization),
            team = encode(&row.team),
            repo = encode(&row.repo)
        ));
        let body = json!({ "permission": rest_permission(&row.permission) });
        let outcome = request_unarchived(
            &platform,
            &scope.organization,
            &row.repo,
            Method::PUT,
            &url,
            Some(body),
        )
        .await
        .outcome();
        log_outcome(&format!("{} on {}", row.team, row.repo), &outcome);
        summary.record(&row.repo, &outcome);
        sink.write(&(
            &row.repo,
            &row.team,
            &row.permission,
            &outcome.status,
            &outcome.status_text,
            &outcome.error_message,
        ))?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    summary.log();
    sink.finish()?;
    Ok(())
}

/// Repositories of `--repo` or of the input file
fn target_repos(repo: Option<String>, input_file: Option<PathBuf>) -> Result<Vec<String>, OrgMoverError> {
    match repo {
        Some(repo) => Ok(vec![repo]),
        None => input_repos(input_file),
    }
}

/// Run set-archived-status
/// # Errors
/// Error if the input file can't be read or the status file can't be written
pub async fn set_archived_status(
    config: &mut OrgMoverConfig,
    args: SetArchivedArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let repos = target_repos(args.repo, args.input_file)?;
    let archived = !args.unarchive;
    let org = scope.org_slug();
    let path = scope.output_csv(format!("{org}-set-archived-status-{}.csv", current_time()));
    let mut sink = CsvSink::create(path, &status_columns(&["repo"]))?;
    let total = repos.len();
    let pb = spinner("");
    for (index, repo) in rows_after(repos, args.skip) {
        row_progress(index, total, &pb, format!("archived={archived} on {repo}"));
        let outcome = patch_archived(&platform, &scope.organization, &repo, archived)
            .await
            .outcome();
        log_outcome(&repo, &outcome);
        sink.write(&(
            &repo,
            &outcome.status,
            &outcome.status_text,
            &outcome.error_message,
        ))?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    Ok(())
}

/// Id of a team looked up by slug
async fn team_id(platform: &GithubPlatform, org: &str, slug: &str) -> Option<u64> {
    let url = platform.rest(&format!("/orgs/{}/teams/{}", encode(org), encode(slug)));
    let response = platform.client().request(Method::GET, &url, None).await;
    if response.failed() {
        warn!("Team {slug} not found: {}", response.describe());
        return None;
    }
    response.data["id"].as_u64()
}

/// Body of the team creation request
fn team_body(team: &TeamInput, parent_team_id: Option<u64>) -> Value {
    let mut body = json!({
        "name": team.name,
        "description": team.description.trim(),
        "privacy": team_privacy(&team.privacy),
    });
    if let Some(parent_team_id) = parent_team_id {
        body["parent_team_id"] = json!(parent_team_id);
    }
    body
}

/// Create one team and return the answer with the id of the team, existing or created
async fn create_team(
    platform: &GithubPlatform,
    org: &str,
    team: &TeamInput,
    parent_team_id: Option<u64>,
    github_user: Option<&str>,
) -> (ApiResponse, Option<u64>) {
    let slug = team.slug();
    let url = platform.rest(&format!("/orgs/{}/teams", encode(org)));
    let response = platform
        .client()
        .request(Method::POST, &url, Some(team_body(team, parent_team_id)))
        .await;
    if response.is_success() {
        let created_slug = response.data["slug"].as_str().unwrap_or(&slug).to_string();
        if let Some(user) = github_user {
            let url = platform.rest(&format!(
                "/orgs/{}/teams/{}/memberships/{}",
                encode(org),
                encode(&created_slug),
                encode(user)
            ));
            let removed = platform.client().request(Method::DELETE, &url, None).await;
            if removed.failed() {
                warn!("{user} not removed from {created_slug}: {}", removed.describe());
            }
        }
        let id = response.data["id"].as_u64();
        return (response, id);
    }
    if response.error_message == VALIDATION_FAILED {
        let id = team_id(platform, org, &slug).await;
        if let Some(id) = id {
            info!("{slug} already exists with id {id}");
        }
        return (response, id);
    }
    (response, None)
}

/// Run create-teams
/// # Errors
/// Error if the input file can't be read or the status file can't be written
pub async fn create_teams(
    config: &mut OrgMoverConfig,
    args: CreateTeamsArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let input: Vec<TeamInput> = input_rows(args.input_file)?;
    let teams = parents_first(rows_after(input, args.skip).map(|(_, team)| team).collect());
    let org = scope.org_slug();
    let path = scope.output_csv(format!("{org}-create-teams-status-{}.csv", current_time()));
    let mut sink = CsvSink::create(path, &status_columns(&["name", "slug", "parentTeam"]))?;
    let mut ids: HashMap<String, u64> = HashMap::new();
    let total = teams.len();
    let pb = spinner("");
    for (index, team) in teams.into_iter().enumerate() {
        let slug = team.slug();
        row_progress(index + 1, total, &pb, format!("Creating {slug}"));
        let parent_team_id = if team.parent_team.is_empty() {
            None
        } else {
            match ids.get(&team.parent_team) {
                Some(id) => Some(*id),
                None => team_id(&platform, &scope.organization, &team.parent_team).await,
            }
        };
        let (response, id) = create_team(
            &platform,
            &scope.organization,
            &team,
            parent_team_id,
            args.github_user.as_deref(),
        )
        .await;
        if let Some(id) = id {
            ids.insert(slug.clone(), id);
        }
        let outcome = response.outcome();
        log_outcome(&slug, &outcome);
        sink.write(&(
            &team.name,
            &slug,
            &team.parent_team,
            &outcome.status,
            &outcome.status_text,
            &outcome.error_message,
        ))?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    Ok(())
}

/// Run delete-repos
/// # Errors
/// Error if the input file can't be read or the status file can't be written
pub async fn delete_repos(
    config: &mut OrgMoverConfig,
    args: DeleteReposArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let repos = target_repos(args.repo, args.input_file)?;
    let count = repos.len().saturating_sub(args.skip);
    if !args.yes
        && !yes_no_input(format!(
            "Delete {count} repositories of {}? (y/n)",
            scope.organization
        ))?
    {
        println!("Nothing deleted");
        return Ok(());
    }
    let org = scope.org_slug();
    let path = scope.output_csv(format!("{org}-delete-repos-status-{}.csv", current_time()));
    let mut sink = CsvSink::create(path, &status_columns(&["repo"]))?;
    let total = repos.len();
    let pb = spinner("");
    for (index, repo) in rows_after(repos, args.skip) {
        row_progress(index, total, &pb, format!("Deleting {repo}"));
        let outcome = platform
            .client()
            .request(
                Method::DELETE,
                &platform.repo_url(&scope.organization, &repo),
                None,
            )
            .await
            .outcome();
        log_outcome(&repo, &outcome);
        sink.write(&(
            &repo,
            &outcome.status,
            &outcome.status_text,
            &outcome.error_message,
        ))?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    Ok(())
}

/// Run insert-team-members
/// # Errors
/// Error if the input file can't be read or the status file can't be written
pub async fn insert_team_members(
    config: &mut OrgMoverConfig,
    args: InsertTeamMembersArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let rows: Vec<MemberTeamRole> = input_rows(args.input_file)?;
    let org = scope.org_slug();
    let path = scope.output_csv(format!(
        "{org}-insert-team-members-status-{}.csv",
        current_time()
    ));
    let mut sink = CsvSink::create(path, &status_columns(&["member", "team", "role"]))?;
    let total = rows.len();
    let pb = spinner("");
    for (index, row) in rows_after(rows, args.skip) {
        row_progress(index, total, &pb, format!("{} in {}", row.member, row.team));
        let url = platform.rest(&format!(
            "/orgs/{}/teams/{}/memberships/{}",
            encode(&scope.organization),
            encode(&row.team),
            encode(&row.member)
        ));
        let outcome = platform
            .client()
            .request(
                Method::PUT,
                &url,
                Some(json!({ "role": row.role.to_lowercase() })),
            )
            .await
            .outcome();
        log_outcome(&format!("{} in {}", row.member, row.team), &outcome);
        sink.write(&(
            &row.member,
            &row.team,
            &row.role,
            &outcome.status,
            &outcome.status_text,
            &outcome.error_message,
        ))?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    Ok(())
}

/// Run set-membership-in-org
/// # Errors
/// Error if the input file can't be read or the status file can't be written
pub async fn set_membership_in_org(
    config: &mut OrgMoverConfig,
    args: SetMembershipArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let rows: Vec<LoginRow> = input_rows(args.input_file)?;
    let org = scope.org_slug();
    let path = scope.output_csv(format!("{org}-set-membership-status-{}.csv", current_time()));
    let mut sink = CsvSink::create(path, &status_columns(&["login"]))?;
    let total = rows.len();
    let pb = spinner("");
    for (index, row) in rows_after(rows, args.skip) {
        row_progress(index, total, &pb, row.login.clone());
        let url = platform.rest(&format!(
            "/orgs/{}/memberships/{}",
            encode(&scope.organization),
            encode(&row.login)
        ));
        let response = if args.delete_members {
            platform.client().request(Method::DELETE, &url, None).await
        } else {
            platform
                .client()
                .request(Method::PUT, &url, Some(json!({ "role": "member" })))
                .await
        };
        let outcome = response.outcome();
        log_outcome(&row.login, &outcome);
        sink.write(&(
            &row.login,
            &outcome.status,
            &outcome.status_text,
            &outcome.error_message,
        ))?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{http::ARCHIVE_ERROR_MESSAGE, records::read_rows, test_server::TestServer};
    use std::fs::{read_to_string, write};
    use tempfile::tempdir;

    fn stub_platform(server: &TestServer) -> GithubPlatform {
        GithubPlatform::new("token".into(), Some(server.url()), false).unwrap()
    }

    fn stub_args(server: &TestServer, output_file: PathBuf) -> CommonArgs {
        CommonArgs {
            organization: Some("acme".into()),
            token: Some("token".into()),
            server_url: Some(server.url().to_string()),
            wait_time: 0,
            batch_size: 50,
            output_file: Some(output_file),
            allow_untrusted_ssl_certificates: false,
        }
    }

    #[tokio::test]
    async fn archived_repository_is_unarchived_for_one_retry() {
        let server = TestServer::start(vec![
            (403, json!({ "message": ARCHIVE_ERROR_MESSAGE })),
            (200, json!({ "archived": false })),
            (204, Value::Null),
            (200, json!({ "archived": true })),
        ])
        .await;
        let platform = stub_platform(&server);
        let url = format!("{}/collaborators/alice", platform.repo_url("acme", "api"));
        let response = request_unarchived(
            &platform,
            "acme",
            "api",
            Method::PUT,
            &url,
            Some(json!({ "permission": "push" })),
        )
        .await;
        assert!(response.is_success());
        assert_eq!(
            server.calls(),
            vec![
                "PUT /api/v3/repos/acme/api/collaborators/alice",
                "PATCH /api/v3/repos/acme/api",
                "PUT /api/v3/repos/acme/api/collaborators/alice",
                "PATCH /api/v3/repos/acme/api",
            ]
        );
        let received = server.received();
        assert_eq!(received[1].body, json!({ "archived": false }));
        assert_eq!(received[2].body, json!({ "permission": "push" }));
        assert_eq!(received[3].body, json!({ "archived": true }));
    }

    #[tokio::test]
    async fn failed_unarchive_is_reported() {
        let server = TestServer::start(vec![
            (403, json!({ "message": ARCHIVE_ERROR_MESSAGE })),
            (404, json!({ "message": "Not Found" })),
        ])
        .await;
        let platform = stub_platform(&server);
        let url = format!("{}/collaborators/alice", platform.repo_url("acme", "api"));
        let response =
            request_unarchived(&platform, "acme", "api", Method::DELETE, &url, None).await;
        assert_eq!(response.status, 404);
        assert_eq!(server.received().len(), 2);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried_unarchived() {
        let server = TestServer::start(vec![(403, json!({ "message": "Must have admin rights" }))]).await;
        let platform = stub_platform(&server);
        let url = format!("{}/collaborators/alice", platform.repo_url("acme", "api"));
        let response = request_unarchived(&platform, "acme", "api", Method::PUT, &url, None).await;
        assert_eq!(response.error_message, "Must have admin rights");
        assert_eq!(server.calls(), vec!["PUT /api/v3/repos/acme/api/collaborators/alice"]);
    }

    #[tokio::test]
    async fn existing_team_id_is_looked_up() {
        let server = TestServer::start(vec![
            (422, json!({ "message": VALIDATION_FAILED })),
            (200, json!({ "id": 42, "slug": "core" })),
        ])
        .await;
        let platform = stub_platform(&server);
        let (response, id) = create_team(&platform, "acme", &team("core", ""), None, None).await;
        assert_eq!(response.status, 422);
        assert_eq!(response.outcome().error_message, VALIDATION_FAILED);
        assert_eq!(id, Some(42));
        assert_eq!(
            server.calls(),
            vec!["POST /api/v3/orgs/acme/teams", "GET /api/v3/orgs/acme/teams/core"]
        );
    }

    #[tokio::test]
    async fn creator_is_removed_from_new_team() {
        let server = TestServer::start(vec![
            (201, json!({ "id": 7, "slug": "core" })),
            (204, Value::Null),
        ])
        .await;
        let platform = stub_platform(&server);
        let (response, id) =
            create_team(&platform, "acme", &team("core", "eng"), Some(3), Some("bot")).await;
        assert!(response.is_success());
        assert_eq!(id, Some(7));
        assert_eq!(server.received()[0].body["parent_team_id"], 3);
        assert_eq!(
            server.calls()[1],
            "DELETE /api/v3/orgs/acme/teams/core/memberships/bot"
        );
    }

    #[tokio::test]
    async fn team_permissions_are_sent_with_rest_names() {
        let server = TestServer::start(vec![
            (204, Value::Null),
            (404, json!({ "message": "Not Found" })),
        ])
        .await;
        let dir = tempdir().unwrap();
        let input = dir.path().join("permissions.csv");
        let status = dir.path().join("status.csv");
        write(&input, "repo,team,permission\napi,dev,write\nweb,ops,read\n").unwrap();
        set_repo_team_permission(
            &mut OrgMoverConfig::default(),
            SetRepoTeamPermissionArgs {
                common: stub_args(&server, status.clone()),
                input_file: Some(input),
                skip: 0,
                repos_file: None,
            },
        )
        .await
        .unwrap();
        let received = server.received();
        assert_eq!(received[0].path, "/api/v3/orgs/acme/teams/dev/repos/acme/api");
        assert_eq!(received[0].body, json!({ "permission": "push" }));
        assert_eq!(received[1].body, json!({ "permission": "pull" }));
        assert_eq!(
            read_to_string(&status).unwrap(),
            "repo,team,permission,status,statusText,errorMessage\n\
             api,dev,write,Success,,\n\
             web,ops,read,404,Not Found,Not Found\n"
        );
    }

    #[test]
    fn summary_counts_rows_per_repository() {
        let mut summary = RepoSummary::default();
        let failed = Outcome {
            status: "404".into(),
            ..Default::default()
        };
        summary.record("web", &Outcome::success());
        summary.record("api", &failed);
        summary.record("web", &Outcome::success());
        summary.record("web", &failed);
        assert_eq!(
            summary.lines(),
            vec!["web: 2 succeeded, 1 failed", "api: 0 succeeded, 1 failed"]
        );
    }

    fn team(slug: &str, parent: &str) -> TeamInput {
        TeamInput {
            name: slug.to_uppercase(),
            slug: slug.into(),
            parent_team: parent.into(),
            ..Default::default()
        }
    }

    #[test]
    fn privacy_is_mapped() {
        assert_eq!(team_privacy("VISIBLE"), "closed");
        assert_eq!(team_privacy("SECRET"), "secret");
        assert_eq!(team_privacy(""), "secret");
    }

    #[test]
    fn parents_precede_children() {
        let ordered = parents_first(vec![
            team("leaf", "middle"),
            team("middle", "root"),
            team("root", ""),
            team("orphan", "elsewhere"),
        ]);
        let slugs: Vec<String> = ordered.iter().map(TeamInput::slug).collect();
        let position = |slug: &str| slugs.iter().position(|s| s == slug).unwrap();
        assert_eq!(slugs.len(), 4);
        assert!(position("root") < position("middle"));
        assert!(position("middle") < position("leaf"));
    }

    #[test]
    fn parent_cycles_keep_every_team() {
        let ordered = parents_first(vec![team("a", "b"), team("b", "a")]);
        assert_eq!(ordered.len(), 2);
    }

    #[test]
    fn team_body_carries_parent() {
        let mut input = team("core", "eng");
        input.description = "  Core team ".into();
        input.privacy = "VISIBLE".into();
        let body = team_body(&input, Some(7));
        assert_eq!(body["privacy"], "closed");
        assert_eq!(body["description"], "Core team");
        assert_eq!(body["parent_team_id"], 7);
        assert!(team_body(&input, None).get("parent_team_id").is_none());
    }

    #[test]
    fn team_input_reads_team_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("teams.csv");
        write(
            &path,
            "name,combinedSlug,slug,description,privacy,parentTeam,membersCount\n\
             Core Devs,acme/core-devs,,Core,VISIBLE,eng,3\n",
        )
        .unwrap();
        let rows: Vec<TeamInput> = read_rows(&path).unwrap();
        assert_eq!(rows[0].slug(), "core-devs");
        assert_eq!(rows[0].parent_team, "eng");
    }

    #[test]
    fn status_rows_follow_input_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.csv");
        let mut sink = CsvSink::create(&path, &status_columns(&["repo"])).unwrap();
        let outcome = Outcome {
            status: "404".into(),
            status_text: "Not Found".into(),
            error_message: "Not Found".into(),
        };
        sink.write(&(
            "api",
            &outcome.status,
            &outcome.status_text,
            &outcome.error_message,
        ))
        .unwrap();
        sink.finish().unwrap();
        assert_eq!(
            read_to_string(&path).unwrap(),
            "repo,status,statusText,errorMessage\napi,404,Not Found,Not Found\n"
        );
    }
}
