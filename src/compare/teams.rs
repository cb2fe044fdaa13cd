//! Compare the teams of a GHES organization with their GHEC copy
use std::{collections::HashMap, path::PathBuf};

use clap::Args;
use log::{info, warn};
use serde::Serialize;

use super::CompareFilesArgs;
use crate::{
    errors::OrgMoverError,
    github::teams::{
        rest_permission, MemberTeamRole, RepoTeamPermission, TeamRow, MEMBER_TEAM_ROLE_COLUMNS,
        REPO_TEAM_PERMISSION_COLUMNS,
    },
    records::{read_rows, CsvSink, LoginFilter},
};

/// Columns of the comparison file
const TEAM_ISSUE_COLUMNS: [&str; 4] = ["team", "issue", "repo", "member"];

/// Compare two get-teams exports
#[derive(Args, Debug, Clone)]
pub struct CompareTeamsArgs {
    #[command(flatten)]
    /// Export files
    pub files: CompareFilesArgs,

    /// CSV file with the `login` of every GHEC user
    #[arg(long)]
    pub ghec_users_file: Option<PathBuf>,
}

/// One difference between two teams
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct TeamIssue {
    pub team: String,
    pub issue: &'static str,
    pub repo: String,
    pub member: String,
}

impl TeamIssue {
    fn team(team: &str, issue: &'static str) -> Self {
        Self {
            team: team.to_string(),
            issue,
            repo: String::new(),
            member: String::new(),
        }
    }

    fn repo(team: &str, issue: &'static str, repo: &str) -> Self {
        Self {
            repo: repo.to_string(),
            ..Self::team(team, issue)
        }
    }

    fn member(team: &str, issue: &'static str, member: &str) -> Self {
        Self {
            member: member.to_string(),
            ..Self::team(team, issue)
        }
    }
}

/// Differences and the rows needed to fix them
#[derive(Debug, Default)]
pub(crate) struct TeamsComparison {
    pub issues: Vec<TeamIssue>,
    /// Input of set-repo-team-permission
    pub repo_permissions: Vec<RepoTeamPermission>,
    /// Input of insert-team-members
    pub member_roles: Vec<MemberTeamRole>,
}

/// Whether the settings of the team differ
fn is_misconfigured(ghes: &TeamRow, ghec: &TeamRow) -> bool {
    ghes.name != ghec.name
        || ghes.description.trim_end() != ghec.description.trim_end()
        || ghes.privacy != ghec.privacy
        || ghes.child_teams != ghec.child_teams
        || ghes.parent_team != ghec.parent_team
}

impl TeamsComparison {
    /// Compare one team present on both sides
    fn compare_team(&mut self, ghes: &TeamRow, ghec: &TeamRow, ghec_users: &LoginFilter) {
        let slug = ghes.slug.as_str();
        if is_misconfigured(ghes, ghec) {
            info!("Team configuration mismatch for {slug}");
            self.issues.push(TeamIssue::team(slug, "misconfigured"));
        }

        if ghes.repositories_count != ghec.repositories_count {
            self.issues
                .push(TeamIssue::team(slug, "repositories-count-mismatch"));
        }
        let ghec_repos: HashMap<String, String> =
            ghec.repository_permissions().into_iter().collect();
        for (repo, permission) in ghes.repository_permissions() {
            let issue = match ghec_repos.get(&repo) {
                None => "repository-missing",
                Some(found) if *found != permission => "repository-permission-mismatch",
                Some(_) => continue,
            };
            self.issues.push(TeamIssue::repo(slug, issue, &repo));
            self.repo_permissions.push(RepoTeamPermission {
                repo,
                team: slug.to_string(),
                permission: rest_permission(&permission),
            });
        }

        if ghes.members_count != ghec.members_count {
            self.issues.push(TeamIssue::team(slug, "members-count-mismatch"));
        }
        let ghec_members: HashMap<String, String> = ghec.member_roles().into_iter().collect();
        for (login, role) in ghes.member_roles() {
            let issue = match ghec_members.get(&login) {
                None if !ghec_users.allows(&login) => {
                    self.issues
                        .push(TeamIssue::member(slug, "member-not-in-ghec", &login));
                    continue;
                }
                None => "member-missing",
                Some(found) if *found != role => "member-permission-mismatch",
                Some(_) => continue,
            };
            self.issues.push(TeamIssue::member(slug, issue, &login));
            self.member_roles.push(MemberTeamRole {
                member: login,
                team: slug.to_string(),
                role,
            });
        }
    }
}

/// Compare GHES teams with GHEC teams, matched by slug
pub(crate) fn compare_teams(
    ghes: &[TeamRow],
    ghec: &[TeamRow],
    ghec_users: &LoginFilter,
) -> TeamsComparison {
    if ghes.len() != ghec.len() {
        warn!(
            "Teams number mismatch: {} on GHES, {} on GHEC",
            ghes.len(),
            ghec.len()
        );
    }
    let by_slug: HashMap<&str, &TeamRow> = ghec.iter().map(|t| (t.slug.as_str(), t)).collect();
    let mut comparison = TeamsComparison::default();
    for team in ghes {
        match by_slug.get(team.slug.as_str()) {
            Some(found) => comparison.compare_team(team, found, ghec_users),
            None => {
                info!("Team {} is missing on GHEC", team.slug);
                comparison
                    .issues
                    .push(TeamIssue::team(&team.slug, "team-missing"));
            }
        }
    }
    for team in ghec {
        if !ghes.iter().any(|t| t.slug == team.slug) {
            comparison
                .issues
                .push(TeamIssue::team(&team.slug, "extra-team"));
        }
    }
    comparison
}

/// Run compare-teams
/// # Errors
/// Error if an export can't be read or a file can't be written
pub fn run_compare_teams(args: CompareTeamsArgs) -> Result<(), OrgMoverError> {
    let org = args.files.organization()?;
    let ghes: Vec<TeamRow> = read_rows(&args.files.ghes_file)?;
    let ghec: Vec<TeamRow> = read_rows(&args.files.ghec_file)?;
    let ghec_users = LoginFilter::from_file(args.ghec_users_file.as_deref())?;
    let comparison = compare_teams(&ghes, &ghec, &ghec_users);
    info!("{} issues found", comparison.issues.len());

    let mut issues = CsvSink::create(
        args.files.output_csv(format!("{org}-teams-comparison.csv")),
        &TEAM_ISSUE_COLUMNS,
    )?;
    for issue in &comparison.issues {
        issues.write(issue)?;
    }
    issues.finish()?;

    let mut permissions = CsvSink::create(
        format!("{org}-repo-team-permission-input.csv"),
        &REPO_TEAM_PERMISSION_COLUMNS,
    )?;
    for row in &comparison.repo_permissions {
        permissions.write(row)?;
    }
    permissions.finish()?;

    let mut roles = CsvSink::create(
        format!("{org}-member-team-role-input.csv"),
        &MEMBER_TEAM_ROLE_COLUMNS,
    )?;
    for row in &comparison.member_roles {
        roles.write(row)?;
    }
    roles.finish()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::records::serialized_header;

    fn team(slug: &str, repositories: &str, members: &str) -> TeamRow {
        TeamRow {
            name: slug.to_uppercase(),
            slug: slug.to_string(),
            privacy: "VISIBLE".into(),
            repositories: repositories.into(),
            repositories_count: repositories.split(';').filter(|r| !r.is_empty()).count() as u64,
            members: members.into(),
            members_count: members.split(';').filter(|m| !m.is_empty()).count() as u64,
            ..Default::default()
        }
    }

    fn issues(comparison: &TeamsComparison) -> Vec<(&str, &str, &str)> {
        comparison
            .issues
            .iter()
            .map(|i| (i.issue, i.repo.as_str(), i.member.as_str()))
            .collect()
    }

    #[test]
    fn identical_teams_have_no_issue() {
        let ghes = vec![team("dev", "api:WRITE", "alice::MEMBER")];
        let comparison = compare_teams(&ghes, &ghes.clone(), &LoginFilter::default());
        assert!(comparison.issues.is_empty());
        assert!(comparison.repo_permissions.is_empty());
    }

    #[test]
    fn missing_and_extra_teams() {
        let ghes = vec![team("dev", "", "")];
        let ghec = vec![team("ops", "", "")];
        let comparison = compare_teams(&ghes, &ghec, &LoginFilter::default());
        assert_eq!(comparison.issues[0], TeamIssue::team("dev", "team-missing"));
        assert_eq!(comparison.issues[1], TeamIssue::team("ops", "extra-team"));
    }

    #[test]
    fn repository_differences_produce_fix_rows() {
        let ghes = vec![team("dev", "api:WRITE;web:ADMIN", "")];
        let ghec = vec![team("dev", "api:READ", "")];
        let comparison = compare_teams(&ghes, &ghec, &LoginFilter::default());
        assert_eq!(
            issues(&comparison),
            vec![
                ("repositories-count-mismatch", "", ""),
                ("repository-permission-mismatch", "api", ""),
                ("repository-missing", "web", ""),
            ]
        );
        assert_eq!(comparison.repo_permissions[0].permission, "push");
        assert_eq!(comparison.repo_permissions[1].permission, "admin");
        assert_eq!(comparison.repo_permissions[1].team, "dev");
    }

    #[test]
    fn member_differences_respect_ghec_users() {
        let ghes = vec![team(
            "dev",
            "",
            "Alice:a@x.com:MAINTAINER;bob::MEMBER;carol::MEMBER",
        )];
        let ghec = vec![team("dev", "", "alice::MEMBER")];
        let users = LoginFilter::from_logins(["alice", "bob"]);
        let comparison = compare_teams(&ghes, &ghec, &users);
        assert_eq!(
            issues(&comparison),
            vec![
                ("members-count-mismatch", "", ""),
                ("member-permission-mismatch", "", "alice"),
                ("member-missing", "", "bob"),
                ("member-not-in-ghec", "", "carol"),
            ]
        );
        assert_eq!(comparison.member_roles.len(), 2);
        assert_eq!(comparison.member_roles[0].role, "MAINTAINER");
    }

    #[test]
    fn description_is_compared_trimmed() {
        let mut ghes = team("dev", "", "");
        ghes.description = "Developers  ".into();
        let mut ghec = team("dev", "", "");
        ghec.description = "Developers".into();
        assert!(!is_misconfigured(&ghes, &ghec));
        ghec.parent_team = "eng".into();
        assert!(is_misconfigured(&ghes, &ghec));
    }

    #[test]
    fn issue_columns() {
        assert_eq!(
            serialized_header(&TeamIssue::team("dev", "team-missing")),
            TEAM_ISSUE_COLUMNS.join(",")
        );
    }
}
