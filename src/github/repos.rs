//! Repository exports: metrics, direct collaborators, migration status and branches
use std::path::PathBuf;

use clap::Args;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use urlencoding::encode;

use super::{
    config::GithubConfig,
    platform::{graphql_page_variables, Count, GithubPlatform, RestBranch, MAX_PER_PAGE},
    queries,
    users::outside_collaborator_logins,
};
use crate::{
    config::OrgMoverConfig,
    context::{with_suffix, CommonArgs, Scope},
    errors::OrgMoverError,
    http::Outcome,
    pagination::{collect_pages, Connection, Edge},
    records::{
        current_time, input_rows, rows_after, today, CsvSink, LoginFilter, RepoRow, StatusSink,
    },
    utils::{row_progress, spinner},
};

/// Columns of the repository metrics file
pub(crate) const REPO_METRICS_COLUMNS: [&str; 13] = [
    "repo",
    "pushedAt",
    "updatedAt",
    "isArchived",
    "visibility",
    "numOfPullRequests",
    "numOfIssues",
    "numOfProjects",
    "numOfDiscussions",
    "numOfPackages",
    "numOfReleases",
    "wikiEnabled",
    "diskUsage",
];

/// Columns of the organization metrics file
const ORG_METRICS_COLUMNS: [&str; 7] = [
    "numOfMembers",
    "numOfProjects",
    "numOfRepos",
    "mostPrs",
    "averagePrs",
    "mostIssues",
    "averageIssues",
];

/// Columns of the direct collaborators file
pub(crate) const DIRECT_COLLABORATORS_COLUMNS: [&str; 3] = ["repo", "login", "role"];

/// Columns of the migration status file
const MIGRATION_STATUS_COLUMNS: [&str; 7] = [
    "repo",
    "createdAt",
    "state",
    "failureReason",
    "warningsCount",
    "migrationLogUrl",
    "sourceUrl",
];

/// Columns of the branches file
const BRANCH_COLUMNS: [&str; 4] = ["repo", "branch", "commit", "protected"];

/// Export the repositories of an organization with their metrics
#[derive(Args, Debug, Clone)]
pub struct GetReposArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,
}

/// Export the direct collaborators of repositories
#[derive(Args, Debug, Clone)]
pub struct RepoDirectCollaboratorsArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// CSV file with a `repo` column
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N rows of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,

    /// CSV file with a `login` column, only these users are exported
    #[arg(short, long)]
    pub users_file: Option<PathBuf>,

    /// CSV file with a `login` column of outside collaborators, fetched if missing
    #[arg(long)]
    pub outside_collaborators_file: Option<PathBuf>,
}

/// Export the repository migrations of an organization
#[derive(Args, Debug, Clone)]
pub struct MigrationStatusArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,
}

/// Export the branches of repositories
#[derive(Args, Debug, Clone)]
pub struct RepoBranchesArgs {
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

/// Repository node of the metrics query
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepoNode {
    /// Name
    pub name: String,
    /// Last push
    pub pushed_at: Option<String>,
    /// Last update
    pub updated_at: Option<String>,
    /// Archived flag
    #[serde(default)]
    pub is_archived: bool,
    /// PUBLIC, PRIVATE or INTERNAL
    #[serde(default)]
    pub visibility: String,
    /// Wiki flag
    #[serde(default)]
    pub has_wiki_enabled: bool,
    /// Size in kilobytes
    pub disk_usage: Option<u64>,
    /// Pull requests
    #[serde(default)]
    pub pull_requests: Count,
    /// Issues
    #[serde(default)]
    pub issues: Count,
    /// Projects
    #[serde(default)]
    pub projects_v2: Count,
    /// Discussions
    #[serde(default)]
    pub discussions: Count,
    /// Packages
    #[serde(default)]
    pub packages: Count,
    /// Releases
    #[serde(default)]
    pub releases: Count,
}

/// `repositories` field
#[derive(Deserialize, Debug)]
struct RepositoriesField {
    /// Repositories page
    repositories: Connection<Edge<RepoNode>>,
}

/// Organization counters
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct OrgInfo {
    /// Projects
    #[serde(default)]
    projects_v2: Count,
    /// Members
    #[serde(default)]
    members_with_role: Count,
}

/// One line of the repository metrics file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepoMetricsRow {
    pub repo: String,
    pub pushed_at: Option<String>,
    pub updated_at: Option<String>,
    pub is_archived: bool,
    pub visibility: String,
    pub num_of_pull_requests: u64,
    pub num_of_issues: u64,
    pub num_of_projects: u64,
    pub num_of_discussions: u64,
    pub num_of_packages: u64,
    pub num_of_releases: u64,
    pub wiki_enabled: bool,
    pub disk_usage: Option<u64>,
}

impl From<RepoNode> for RepoMetricsRow {
    fn from(node: RepoNode) -> Self {
        Self {
            repo: node.name,
            pushed_at: node.pushed_at,
            updated_at: node.updated_at,
            is_archived: node.is_archived,
            visibility: node.visibility.to_lowercase(),
            num_of_pull_requests: node.pull_requests.total_count,
            num_of_issues: node.issues.total_count,
            num_of_projects: node.projects_v2.total_count,
            num_of_discussions: node.discussions.total_count,
            num_of_packages: node.packages.total_count,
            num_of_releases: node.releases.total_count,
            wiki_enabled: node.has_wiki_enabled,
            disk_usage: node.disk_usage,
        }
    }
}

/// The organization metrics line
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct OrgMetricsRow {
    num_of_members: u64,
    num_of_projects: u64,
    num_of_repos: u64,
    most_prs: u64,
    average_prs: u64,
    most_issues: u64,
    average_issues: u64,
}

/// Aggregate repository metrics into the organization line
fn org_metrics(rows: &[RepoMetricsRow], members: u64, projects: u64) -> OrgMetricsRow {
    let count = rows.len() as u64;
    let total_prs: u64 = rows.iter().map(|r| r.num_of_pull_requests).sum();
    let total_issues: u64 = rows.iter().map(|r| r.num_of_issues).sum();
    let average = |total: u64| {
        if count == 0 {
            0
        } else {
            (total as f64 / count as f64).round() as u64
        }
    };
    OrgMetricsRow {
        num_of_members: members,
        num_of_projects: projects,
        num_of_repos: count,
        most_prs: rows.iter().map(|r| r.num_of_pull_requests).max().unwrap_or(0),
        average_prs: average(total_prs),
        most_issues: rows.iter().map(|r| r.num_of_issues).max().unwrap_or(0),
        average_issues: average(total_issues),
    }
}

/// Direct collaborator of a repository, as returned by the REST API
#[derive(Deserialize, Debug, Clone)]
struct RestCollaborator {
    /// Login
    login: String,
    /// admin, maintain, write, triage, read or a custom role
    #[serde(default)]
    role_name: String,
}

/// One line of the direct collaborators file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DirectCollaboratorRow {
    /// Repository
    pub repo: String,
    /// Lowercased login
    pub login: String,
    /// Role on the repository
    pub role: String,
}

/// One line of the migration status file
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct MigrationStatusRow {
    repo: String,
    created_at: Option<String>,
    state: String,
    failure_reason: Option<String>,
    warnings_count: u64,
    migration_log_url: Option<String>,
    source_url: Option<String>,
}

/// One line of the branches file
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
struct BranchRow {
    repo: String,
    branch: String,
    commit: String,
    protected: bool,
}

/// Every repository of the organization with its counters
/// # Errors
/// Error if a page can't be fetched
pub(crate) async fn fetch_repositories(
    platform: &GithubPlatform,
    scope: &Scope,
) -> Result<Vec<RepoNode>, OrgMoverError> {
    let edges = collect_pages(&scope.throttle, "repositories", |cursor| {
        let variables = graphql_page_variables(scope, cursor);
        async move {
            let field: RepositoriesField = platform
                .organization(queries::ORG_REPOSITORIES, variables)
                .await?;
            Ok(field.repositories.into_page())
        }
    })
    .await?;
    Ok(edges.into_iter().map(|edge| edge.node).collect())
}

/// Repositories named in an input file
/// # Errors
/// Error if the file can't be read
pub(crate) fn input_repos(input_file: Option<PathBuf>) -> Result<Vec<String>, OrgMoverError> {
    let rows: Vec<RepoRow> = input_rows(input_file)?;
    Ok(rows.into_iter().map(|row| row.repo).collect())
}

/// Run get-repos
/// # Errors
/// Error if the repositories can't be fetched or the files can't be written
pub async fn get_repos(
    config: &mut OrgMoverConfig,
    args: GetReposArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let pb = spinner("get-repos");
    pb.set_message(format!("Fetching repositories of {}", scope.organization));
    let nodes = fetch_repositories(&platform, &scope).await?;
    pb.finish_and_clear();
    let rows: Vec<RepoMetricsRow> = nodes.into_iter().map(RepoMetricsRow::from).collect();
    info!("{} repositories fetched", rows.len());

    let org = scope.org_slug();
    let suffix = format!("{}-{}", today(), platform.flavor());
    let dir = PathBuf::from(format!("./{org}-metrics"));
    let path = scope.output_csv(dir.join(format!("{org}-repo-metrics-{suffix}.csv")));
    let mut all = CsvSink::create(&path, &REPO_METRICS_COLUMNS)?;
    let mut archived = CsvSink::create(with_suffix(&path, "-archived"), &REPO_METRICS_COLUMNS)?;
    let mut active = CsvSink::create(with_suffix(&path, "-active"), &REPO_METRICS_COLUMNS)?;
    for row in &rows {
        all.write(row)?;
        if row.is_archived {
            archived.write(row)?;
        } else {
            active.write(row)?;
        }
    }
    all.finish()?;
    archived.finish()?;
    active.finish()?;

    let info: OrgInfo = platform
        .organization(queries::ORG_INFO, json!({ "org": scope.organization }))
        .await?;
    let metrics = org_metrics(
        &rows,
        info.members_with_role.total_count,
        info.projects_v2.total_count,
    );
    let org_path = scope.companion_csv(
        "-org-metrics",
        dir.join(format!("{org}-org-metrics-{suffix}.csv")),
    );
    let mut sink = CsvSink::create(org_path, &ORG_METRICS_COLUMNS)?;
    sink.write(&metrics)?;
    sink.finish()?;
    Ok(())
}

/// Keep the direct collaborators that are neither outside collaborators nor filtered out
fn direct_collaborator_rows(
    repo: &str,
    collaborators: Vec<RestCollaborator>,
    outside_collaborators: &LoginFilter,
    users: &LoginFilter,
) -> Vec<DirectCollaboratorRow> {
    collaborators
        .into_iter()
        .map(|c| (c.login.to_lowercase(), c.role_name))
        .filter(|(login, _)| !outside_collaborators.contains(login) && users.allows(login))
        .map(|(login, role)| DirectCollaboratorRow {
            repo: repo.to_string(),
            login,
            role,
        })
        .collect()
}

/// Run get-repos-direct-collaborators
/// # Errors
/// Error if the input files can't be read or the output files can't be written
pub async fn get_repos_direct_collaborators(
    config: &mut OrgMoverConfig,
    args: RepoDirectCollaboratorsArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let repos = input_repos(args.input_file)?;
    let users = LoginFilter::from_file(args.users_file.as_deref())?;
    let outside_collaborators = match args.outside_collaborators_file.as_deref() {
        Some(path) => LoginFilter::from_file(Some(path))?,
        None => LoginFilter::from_logins(outside_collaborator_logins(&platform, &scope).await?),
    };

    let org = scope.org_slug();
    let path = scope.output_csv(format!("{org}-repo-direct-collaborators-{}.csv", current_time()));
    let mut sink = CsvSink::create(path, &DIRECT_COLLABORATORS_COLUMNS)?;
    let mut status_sink = StatusSink::create(
        scope.companion_csv(
            "-status",
            format!("{org}-repo-direct-collaborators-status.csv"),
        ),
        "repo",
    )?;
    let total = repos.len();
    let pb = spinner("");
    for (index, repo) in rows_after(repos, args.skip) {
        row_progress(index, total, &pb, format!("Fetching collaborators of {repo}"));
        let path = format!(
            "/repos/{}/{}/collaborators",
            encode(&scope.organization),
            encode(&repo)
        );
        let outcome = match platform
            .rest_pages_or_status::<RestCollaborator>(
                &path,
                &[("affiliation", "direct")],
                MAX_PER_PAGE,
                &scope,
            )
            .await
        {
            Ok(collaborators) => {
                for row in
                    direct_collaborator_rows(&repo, collaborators, &outside_collaborators, &users)
                {
                    sink.write(&row)?;
                }
                Outcome::success()
            }
            Err(outcome) => {
                warn!("{repo}: {}", outcome.error_message);
                outcome
            }
        };
        status_sink.write(&repo, &outcome)?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    status_sink.finish()?;
    Ok(())
}

/// Run get-repos-migration-status
/// # Errors
/// Error if the migrations can't be fetched or the file can't be written
pub async fn get_repos_migration_status(
    config: &mut OrgMoverConfig,
    args: MigrationStatusArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let pb = spinner("get-repos-migration-status");
    pb.set_message(format!("Fetching migrations of {}", scope.organization));
    let migrations = platform.repository_migrations(&scope).await?;
    pb.finish_and_clear();
    let org = scope.org_slug();
    let path = scope.output_csv(format!(
        "{org}-migration-status-{}-{}.csv",
        platform.flavor(),
        current_time()
    ));
    let mut sink = CsvSink::create(path, &MIGRATION_STATUS_COLUMNS)?;
    for migration in migrations {
        sink.write(&MigrationStatusRow {
            repo: migration.repository_name,
            created_at: migration.created_at,
            state: migration.state,
            failure_reason: migration.failure_reason,
            warnings_count: migration.warnings_count,
            migration_log_url: migration.migration_log_url,
            source_url: migration.source_url,
        })?;
    }
    sink.finish()?;
    Ok(())
}

/// Run get-repo-branches, a repository that can't be listed gets a failed status line
/// # Errors
/// Error if the input file can't be read or the output files can't be written
pub async fn get_repo_branches(
    config: &mut OrgMoverConfig,
    args: RepoBranchesArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let repos = input_repos(args.input_file)?;
    let org = scope.org_slug();
    let path = scope.output_csv(format!("{org}-github-repo-branches-{}.csv", current_time()));
    let mut sink = CsvSink::create(path, &BRANCH_COLUMNS)?;
    let mut status_sink = StatusSink::create(
        scope.companion_csv("-status", format!("{org}-github-repo-branches-status.csv")),
        "repo",
    )?;
    let total = repos.len();
    let pb = spinner("");
    for (index, repo) in rows_after(repos, args.skip) {
        row_progress(index, total, &pb, format!("Fetching branches of {repo}"));
        let path = format!(
            "/repos/{}/{}/branches",
            encode(&scope.organization),
            encode(&repo)
        );
        let outcome = match platform
            .rest_pages_or_status::<RestBranch>(
                &path,
                &[],
                scope.batch_size.min(MAX_PER_PAGE),
                &scope,
            )
            .await
        {
            Ok(branches) => {
                for branch in branches {
                    sink.write(&BranchRow {
                        repo: repo.clone(),
                        branch: branch.name,
                        commit: branch.commit.sha,
                        protected: branch.protected,
                    })?;
                }
                Outcome::success()
            }
            Err(outcome) => {
                warn!("{repo}: {}", outcome.error_message);
                outcome
            }
        };
        status_sink.write(&repo, &outcome)?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    status_sink.finish()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{records::serialized_header, test_server::TestServer};
    use std::fs::{read_to_string, write};
    use tempfile::tempdir;

    #[tokio::test]
    async fn branches_continue_after_a_failed_repository() {
        let server = TestServer::start(vec![
            (404, json!({ "message": "Not Found" })),
            (
                200,
                json!([{ "name": "main", "commit": { "sha": "abc" }, "protected": true }]),
            ),
        ])
        .await;
        let dir = tempdir().unwrap();
        let input = dir.path().join("repos.csv");
        let output = dir.path().join("branches.csv");
        write(&input, "repo\ngone\napi\n").unwrap();
        get_repo_branches(
            &mut OrgMoverConfig::default(),
            RepoBranchesArgs {
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
                "GET /api/v3/repos/acme/gone/branches?per_page=50&page=1",
                "GET /api/v3/repos/acme/api/branches?per_page=50&page=1",
            ]
        );
        assert_eq!(
            read_to_string(&output).unwrap(),
            "repo,branch,commit,protected\napi,main,abc,true\n"
        );
        assert_eq!(
            read_to_string(dir.path().join("branches-status.csv")).unwrap(),
            "repo,status,statusText,errorMessage\ngone,404,Not Found,Not Found\napi,Success,,\n"
        );
    }

    fn metrics(repo: &str, prs: u64, issues: u64, archived: bool) -> RepoMetricsRow {
        RepoMetricsRow {
            repo: repo.into(),
            pushed_at: None,
            updated_at: None,
            is_archived: archived,
            visibility: "private".into(),
            num_of_pull_requests: prs,
            num_of_issues: issues,
            num_of_projects: 0,
            num_of_discussions: 0,
            num_of_packages: 0,
            num_of_releases: 0,
            wiki_enabled: false,
            disk_usage: None,
        }
    }

    #[test]
    fn repo_metrics_columns_match_row() {
        assert_eq!(
            serialized_header(&metrics("a", 0, 0, false)),
            REPO_METRICS_COLUMNS.join(",")
        );
    }

    #[test]
    fn org_metrics_columns_match_row() {
        assert_eq!(
            serialized_header(&org_metrics(&[], 0, 0)),
            ORG_METRICS_COLUMNS.join(",")
        );
    }

    #[test]
    fn node_is_mapped() {
        let node: RepoNode = serde_json::from_value(json!({
            "name": "api",
            "pushedAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z",
            "isArchived": true,
            "visibility": "INTERNAL",
            "hasWikiEnabled": true,
            "diskUsage": 1024,
            "pullRequests": { "totalCount": 3 },
            "issues": { "totalCount": 4 },
            "projectsV2": { "totalCount": 1 },
            "discussions": { "totalCount": 0 },
            "packages": { "totalCount": 2 },
            "releases": { "totalCount": 5 }
        }))
        .unwrap();
        let row = RepoMetricsRow::from(node);
        assert_eq!(row.visibility, "internal");
        assert_eq!(row.num_of_pull_requests, 3);
        assert_eq!(row.num_of_projects, 1);
        assert_eq!(row.num_of_releases, 5);
        assert!(row.is_archived);
        assert!(row.wiki_enabled);
    }

    #[test]
    fn org_metrics_aggregate() {
        let rows = vec![
            metrics("a", 10, 1, false),
            metrics("b", 3, 8, true),
            metrics("c", 0, 0, false),
        ];
        let org = org_metrics(&rows, 12, 2);
        assert_eq!(org.num_of_repos, 3);
        assert_eq!(org.most_prs, 10);
        assert_eq!(org.most_issues, 8);
        assert_eq!(org.average_prs, 4);
        assert_eq!(org.average_issues, 3);
        assert_eq!(org.num_of_members, 12);
        assert_eq!(org.num_of_projects, 2);
    }

    #[test]
    fn org_metrics_without_repos() {
        let org = org_metrics(&[], 1, 0);
        assert_eq!(org.average_prs, 0);
        assert_eq!(org.most_prs, 0);
    }

    #[test]
    fn collaborators_are_filtered() {
        let collaborators: Vec<RestCollaborator> = serde_json::from_value(json!([
            { "login": "Alice", "role_name": "admin" },
            { "login": "bob", "role_name": "write" },
            { "login": "carol", "role_name": "read" }
        ]))
        .unwrap();
        let outside = LoginFilter::from_logins(["BOB"]);
        let users = LoginFilter::default();
        let rows = direct_collaborator_rows("api", collaborators.clone(), &outside, &users);
        assert_eq!(
            rows,
            vec![
                DirectCollaboratorRow {
                    repo: "api".into(),
                    login: "alice".into(),
                    role: "admin".into()
                },
                DirectCollaboratorRow {
                    repo: "api".into(),
                    login: "carol".into(),
                    role: "read".into()
                },
            ]
        );
        let users = LoginFilter::from_logins(["carol"]);
        let rows = direct_collaborator_rows("api", collaborators, &outside, &users);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].login, "carol");
    }
}
