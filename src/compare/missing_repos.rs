//! Source repositories without a successful migration into GHEC
use std::{collections::HashSet, path::PathBuf};

use clap::Args;
use log::info;
use serde::Deserialize;

use crate::{
    config::OrgMoverConfig,
    context::{CommonArgs, Scope},
    errors::OrgMoverError,
    github::{
        config::{GithubConfig, GithubTarget},
        platform::RepositoryMigration,
    },
    platform::{get_platform, PlatformType},
    records::{current_time, read_rows, CsvSink, RepoRow},
    utils::{spinner, value_or_prompt},
};

/// List the source repositories missing on GHEC
#[derive(Args, Debug, Clone)]
pub struct MissingReposArgs {
    #[command(flatten)]
    /// GHEC organization and token, `--server-url` is the source server
    pub common: CommonArgs,

    /// CSV file with a `repo` (or `name`) column
    #[arg(long)]
    pub source_file: Option<PathBuf>,

    /// Platform the repositories are listed from when no source file is given
    #[arg(long, value_enum, default_value_t = PlatformType::Ghes)]
    pub git_host: PlatformType,

    /// Source organization, group or project
    #[arg(long)]
    pub source_org: Option<String>,

    /// Token of the source platform
    #[arg(long, env = "SOURCE_PAT", hide_env_values = true)]
    pub source_token: Option<String>,
}

/// Line of a source file
#[derive(Deserialize, Debug, Clone)]
struct SourceRepo {
    #[serde(alias = "name")]
    repo: String,
}

/// Repositories with no migration other than failed ones, in source order
pub(crate) fn missing_repos(repos: Vec<String>, migrations: &[RepositoryMigration]) -> Vec<String> {
    let migrated: HashSet<&str> = migrations
        .iter()
        .filter(|migration| migration.is_migrated())
        .map(|migration| migration.repository_name.as_str())
        .collect();
    repos
        .into_iter()
        .filter(|repo| !migrated.contains(repo.as_str()))
        .collect()
}

/// Run get-ghec-missing-repos
/// # Errors
/// Error if a platform can't be built, a list can't be fetched or the file can't be written
pub async fn get_ghec_missing_repos(
    config: &mut OrgMoverConfig,
    args: MissingReposArgs,
) -> Result<(), OrgMoverError> {
    let ghec = GithubConfig::get_platform(config, GithubTarget::Cloud, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let source_org = value_or_prompt(args.source_org.clone(), "Enter the source organization name")?;
    let pb = spinner("get-ghec-missing-repos");
    let repos = match args.source_file.as_deref() {
        Some(path) => read_rows::<SourceRepo>(path)?
            .into_iter()
            .map(|row| row.repo)
            .collect(),
        None => {
            let source_args = CommonArgs {
                organization: Some(source_org.clone()),
                token: args.source_token.clone(),
                ..args.common.clone()
            };
            let source = get_platform(config, args.git_host, &source_args)?;
            info!(
                "Listing repositories of {source_org} on {} ({})",
                source.get_type(),
                source.get_remote_url()
            );
            pb.set_message(format!("Listing repositories of {source_org}"));
            source
                .get_all_repo_names(&scope.for_organization(&source_org))
                .await?
        }
    };
    pb.set_message(format!("Fetching migrations of {}", scope.organization));
    let migrations = ghec.repository_migrations(&scope).await?;
    pb.finish_and_clear();

    let missing = missing_repos(repos, &migrations);
    info!("{} repositories missing on {}", missing.len(), scope.organization);
    let path = scope.output_csv(format!(
        "{}-{}-ghec-missing-repos-{}.csv",
        source_org.replace(char::is_whitespace, ""),
        scope.org_slug(),
        current_time()
    ));
    let mut sink = CsvSink::create(path, &["repo"])?;
    for repo in missing {
        sink.write(&RepoRow { repo })?;
    }
    sink.finish()?;
    Ok(())
}
