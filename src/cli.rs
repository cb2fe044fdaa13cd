//! Command line options for the org-mover tool
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use log::LevelFilter;

use crate::{
    bitbucket::export::{
        get_bitbucket_enterprise_users, get_bitbucket_project_users,
        get_bitbucket_repo_direct_collaborators, get_bitbucket_repo_team_permissions,
        get_bitbucket_repositories, get_bitbucket_team_members, get_bitbucket_teams,
        BitbucketEnterpriseUsersArgs, BitbucketProjectUsersArgs, BitbucketRepoInputArgs,
        BitbucketReposArgs, BitbucketTeamMembersArgs, BitbucketTeamsArgs,
    },
    compare::{
        collaborators::{run_compare_repo_direct_collaborators, CompareCollaboratorsArgs},
        commits::{ghec_last_commit_check, LastCommitCheckArgs},
        missing_repos::{get_ghec_missing_repos, MissingReposArgs},
        teams::{run_compare_teams, CompareTeamsArgs},
    },
    config::OrgMoverConfig,
    errors::OrgMoverError,
    github::{
        import::{
            create_teams, delete_repos, insert_team_members, set_archived_status,
            set_membership_in_org, set_repo_direct_collaborators, set_repo_team_permission,
            CreateTeamsArgs, DeleteReposArgs, InsertTeamMembersArgs, SetArchivedArgs,
            SetMembershipArgs, SetRepoCollaboratorsArgs, SetRepoTeamPermissionArgs,
        },
        projects::{
            create_projects_v2, export_projects_v1, export_projects_v2, CreateProjectsArgs,
            ExportProjectsArgs,
        },
        repos::{
            get_repo_branches, get_repos, get_repos_direct_collaborators,
            get_repos_migration_status, GetReposArgs, MigrationStatusArgs, RepoBranchesArgs,
            RepoDirectCollaboratorsArgs,
        },
        script::{
            generate_bitbucket_migration_script, generate_ghes_migration_script,
            BitbucketScriptArgs, GhesScriptArgs,
        },
        teams::{get_teams, GetTeamsArgs},
        users::{
            get_enterprise_users, get_org_users, get_outside_collaborators, EnterpriseUsersArgs,
            OrgUsersArgs, OutsideCollaboratorsArgs,
        },
    },
    gitlab::export::{
        get_gitlab_repo_direct_collaborators, get_gitlab_repositories, get_gitlab_team_members,
        get_gitlab_teams, get_gitlab_users, GitlabRepoCollaboratorsArgs, GitlabReposArgs,
        GitlabTeamMembersArgs, GitlabTeamsArgs, GitlabUsersArgs,
    },
};

/// org-mover - Export, import and compare organizations between GitHub, GitLab and Bitbucket
#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct OrgMoverCli {
    /// Custom configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show the current config path
    #[arg(long)]
    pub show_config_path: bool,

    /// Verbose mode (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Command to run
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Every org-mover command
#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Export the repositories of an organization with their metrics
    #[command(visible_alias = "gr")]
    GetRepos(GetReposArgs),

    /// Export the teams of an organization with their members and repositories
    #[command(visible_alias = "gt")]
    GetTeams(GetTeamsArgs),

    /// Export the members of an organization
    #[command(visible_alias = "gou")]
    GetOrgUsers(OrgUsersArgs),

    /// Export the members of several organizations
    #[command(visible_alias = "geu")]
    GetEnterpriseUsers(EnterpriseUsersArgs),

    /// Export the outside collaborators of an organization
    #[command(visible_alias = "goc")]
    GetOutsideCollaborators(OutsideCollaboratorsArgs),

    /// Export the direct collaborators of repositories
    #[command(visible_alias = "grdc")]
    GetReposDirectCollaborators(RepoDirectCollaboratorsArgs),

    /// Export the repository migrations into an organization
    #[command(visible_alias = "gpms")]
    GetReposMigrationStatus(MigrationStatusArgs),

    /// Export the branches of repositories
    #[command(visible_alias = "grb")]
    GetRepoBranches(RepoBranchesArgs),

    /// Add or remove direct collaborators of repositories
    #[command(visible_alias = "src")]
    SetRepoDirectCollaborators(SetRepoCollaboratorsArgs),

    /// Give teams a permission on repositories
    #[command(visible_alias = "srtp")]
    SetRepoTeamPermission(SetRepoTeamPermissionArgs),

    /// Archive or unarchive repositories
    #[command(visible_alias = "ar")]
    SetArchivedStatus(SetArchivedArgs),

    /// Create teams from a get-teams export
    #[command(visible_alias = "ct")]
    CreateTeams(CreateTeamsArgs),

    /// Delete repositories
    #[command(visible_alias = "dr")]
    DeleteRepos(DeleteReposArgs),

    /// Add members to teams
    #[command(visible_alias = "itm")]
    InsertTeamMembers(InsertTeamMembersArgs),

    /// Add users to an organization or remove them
    #[command(visible_alias = "smio")]
    SetMembershipInOrg(SetMembershipArgs),

    /// Export the classic projects of an organization as v2 projects
    #[command(visible_alias = "epv1")]
    ExportProjectsV1(ExportProjectsArgs),

    /// Export the v2 projects of an organization with their items
    #[command(visible_alias = "epv2")]
    ExportProjectsV2(ExportProjectsArgs),

    /// Create v2 projects and their items from a projects export
    #[command(visible_alias = "cpv2")]
    CreateProjectsV2(CreateProjectsArgs),

    /// Write a `gh gei` migration script from GHES to GHEC
    #[command(visible_alias = "ggms")]
    GenerateGhesMigrationScript(GhesScriptArgs),

    /// Write a `gh bbs2gh` migration script from Bitbucket Server to GHEC
    #[command(visible_alias = "gbms")]
    GenerateBitbucketMigrationScript(BitbucketScriptArgs),

    /// Compare the teams of two get-teams exports
    #[command(visible_alias = "cpt")]
    CompareTeams(CompareTeamsArgs),

    /// Compare two direct collaborators exports
    #[command(visible_alias = "crdc")]
    CompareRepoDirectCollaborators(CompareCollaboratorsArgs),

    /// List the repositories whose branches differ between GHES and GHEC
    #[command(visible_alias = "glcc")]
    GhecLastCommitCheck(LastCommitCheckArgs),

    /// List the source repositories missing on GHEC
    #[command(visible_alias = "ghmr")]
    GetGhecMissingRepos(MissingReposArgs),

    /// Export the projects of a GitLab instance
    #[command(visible_alias = "ggr")]
    GetGitlabRepositories(GitlabReposArgs),

    /// Export the members of GitLab projects
    #[command(visible_alias = "ggrdc")]
    GetGitlabRepoDirectCollaborators(GitlabRepoCollaboratorsArgs),

    /// Export the groups of a GitLab instance
    #[command(visible_alias = "ggt")]
    GetGitlabTeams(GitlabTeamsArgs),

    /// Export the members of GitLab groups
    #[command(visible_alias = "ggtm")]
    GetGitlabTeamMembers(GitlabTeamMembersArgs),

    /// Export the users of a GitLab instance
    #[command(visible_alias = "ggu")]
    GetGitlabUsers(GitlabUsersArgs),

    /// Export the repositories of a Bitbucket project
    #[command(visible_alias = "gbr")]
    GetBitbucketRepositories(BitbucketReposArgs),

    /// Export the users with a permission on Bitbucket repositories
    #[command(visible_alias = "gbrdc")]
    GetBitbucketRepoDirectCollaborators(BitbucketRepoInputArgs),

    /// Export the groups with a permission on a Bitbucket project
    #[command(visible_alias = "gbt")]
    GetBitbucketTeams(BitbucketTeamsArgs),

    /// Export the members of Bitbucket groups
    #[command(visible_alias = "gbtm")]
    GetBitbucketTeamMembers(BitbucketTeamMembersArgs),

    /// Export the groups with a permission on Bitbucket repositories
    #[command(visible_alias = "gbrtp")]
    GetBitbucketRepoTeamPermissions(BitbucketRepoInputArgs),

    /// Export the users with a permission on a Bitbucket project
    #[command(visible_alias = "gbpu")]
    GetBitbucketProjectUsers(BitbucketProjectUsersArgs),

    /// Export the users of several Bitbucket projects
    #[command(visible_alias = "gbeu")]
    GetBitbucketEnterpriseUsers(BitbucketEnterpriseUsersArgs),
}

/// Log level of the `-v` count
fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Run one command
/// # Errors
/// Error of the command
async fn run_command(config: &mut OrgMoverConfig, command: Command) -> Result<(), OrgMoverError> {
    match command {
        Command::GetRepos(args) => get_repos(config, args).await,
        Command::GetTeams(args) => get_teams(config, args).await,
        Command::GetOrgUsers(args) => get_org_users(config, args).await,
        Command::GetEnterpriseUsers(args) => get_enterprise_users(config, args).await,
        Command::GetOutsideCollaborators(args) => get_outside_collaborators(config, args).await,
        Command::GetReposDirectCollaborators(args) => {
            get_repos_direct_collaborators(config, args).await
        }
        Command::GetReposMigrationStatus(args) => get_repos_migration_status(config, args).await,
        Command::GetRepoBranches(args) => get_repo_branches(config, args).await,
        Command::SetRepoDirectCollaborators(args) => {
            set_repo_direct_collaborators(config, args).await
        }
        Command::SetRepoTeamPermission(args) => set_repo_team_permission(config, args).await,
        Command::SetArchivedStatus(args) => set_archived_status(config, args).await,
        Command::CreateTeams(args) => create_teams(config, args).await,
        Command::DeleteRepos(args) => delete_repos(config, args).await,
        Command::InsertTeamMembers(args) => insert_team_members(config, args).await,
        Command::SetMembershipInOrg(args) => set_membership_in_org(config, args).await,
        Command::ExportProjectsV1(args) => export_projects_v1(config, args).await,
        Command::ExportProjectsV2(args) => export_projects_v2(config, args).await,
        Command::CreateProjectsV2(args) => create_projects_v2(config, args).await,
        Command::GenerateGhesMigrationScript(args) => generate_ghes_migration_script(args),
        Command::GenerateBitbucketMigrationScript(args) => {
            generate_bitbucket_migration_script(args)
        }
        Command::CompareTeams(args) => run_compare_teams(args),
        Command::CompareRepoDirectCollaborators(args) => {
            run_compare_repo_direct_collaborators(args)
        }
        Command::GhecLastCommitCheck(args) => ghec_last_commit_check(config, args).await,
        Command::GetGhecMissingRepos(args) => get_ghec_missing_repos(config, args).await,
        Command::GetGitlabRepositories(args) => get_gitlab_repositories(config, args).await,
        Command::GetGitlabRepoDirectCollaborators(args) => {
            get_gitlab_repo_direct_collaborators(config, args).await
        }
        Command::GetGitlabTeams(args) => get_gitlab_teams(config, args).await,
        Command::GetGitlabTeamMembers(args) => get_gitlab_team_members(config, args).await,
        Command::GetGitlabUsers(args) => get_gitlab_users(config, args).await,
        Command::GetBitbucketRepositories(args) => get_bitbucket_repositories(config, args).await,
        Command::GetBitbucketRepoDirectCollaborators(args) => {
            get_bitbucket_repo_direct_collaborators(config, args).await
        }
        Command::GetBitbucketTeams(args) => get_bitbucket_teams(config, args).await,
        Command::GetBitbucketTeamMembers(args) => get_bitbucket_team_members(config, args).await,
        Command::GetBitbucketRepoTeamPermissions(args) => {
            get_bitbucket_repo_team_permissions(config, args).await
        }
        Command::GetBitbucketProjectUsers(args) => {
            get_bitbucket_project_users(config, args).await
        }
        Command::GetBitbucketEnterpriseUsers(args) => {
            get_bitbucket_enterprise_users(config, args).await
        }
    }
}

/// Run the org-mover tool with the command line options
/// # Errors
/// Error if the config can't be loaded or the command fails
pub async fn org_mover_main() -> Result<(), OrgMoverError> {
    let args = OrgMoverCli::parse();
    env_logger::builder()
        .filter_level(log_level(args.verbose))
        .parse_default_env()
        .format_target(false)
        .format_timestamp(None)
        .init();
    let mut config = OrgMoverConfig::try_new(args.config)?;
    if args.show_config_path {
        println!("{}", config.config_path.display());
        return Ok(());
    }
    match args.command {
        Some(command) => run_command(&mut config, command).await,
        None => {
            OrgMoverCli::command().print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cli_is_valid() {
        OrgMoverCli::command().debug_assert();
    }

    #[test]
    fn aliases_are_parsed() {
        let cli = OrgMoverCli::parse_from(["org-mover", "gbr", "-o", "PRJ", "-g", "https://bbs"]);
        match cli.command {
            Some(Command::GetBitbucketRepositories(args)) => {
                assert_eq!(args.common.organization.as_deref(), Some("PRJ"));
                assert_eq!(args.common.batch_size, 50);
            }
            other => panic!("unexpected command {other:?}"),
        }
        let cli = OrgMoverCli::parse_from(["org-mover", "-vv", "src", "-f", "in.csv", "-s", "2"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Some(Command::SetRepoDirectCollaborators(_))));
        let cli = OrgMoverCli::parse_from(["org-mover", "cpv2", "-o", "acme", "-f", "p.json"]);
        match cli.command {
            Some(Command::CreateProjectsV2(args)) => {
                assert_eq!(args.input_file, Some(PathBuf::from("p.json")));
                assert_eq!(args.skip, 0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(log_level(0), LevelFilter::Info);
        assert_eq!(log_level(1), LevelFilter::Debug);
        assert_eq!(log_level(5), LevelFilter::Trace);
    }
}
