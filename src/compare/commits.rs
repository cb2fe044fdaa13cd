//! Check that the branches of migrated repositories still match their source
use std::{collections::HashMap, path::PathBuf};

use clap::Args;
use log::{info, warn};
use urlencoding::encode;

use crate::{
    config::OrgMoverConfig,
    context::{CommonArgs, Scope},
    errors::OrgMoverError,
    github::{
        config::{GithubConfig, GithubTarget},
        platform::{RestBranch, MAX_PER_PAGE},
    },
    records::{current_time, read_rows, rows_after, CsvSink, RepoRow},
    utils::{row_progress, spinner, value_or_prompt},
};

/// Compare the branch heads of GHES repositories with GHEC
#[derive(Args, Debug, Clone)]
pub struct LastCommitCheckArgs {
    #[command(flatten)]
    /// GHEC organization and token, `--server-url` is the GHES source
    pub common: CommonArgs,

    /// Source organization on GitHub Enterprise Server
    #[arg(long)]
    pub source_org: Option<String>,

    /// Token of the source GitHub Enterprise Server
    #[arg(long, env = "SOURCE_PAT", hide_env_values = true)]
    pub source_token: Option<String>,

    /// CSV file with a `repo` column, repositories are listed from the source otherwise
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N repositories
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,
}

/// Whether a source branch is missing on the target or points at another commit
pub(crate) fn branches_differ(source: &[RestBranch], target: &[RestBranch]) -> bool {
    let heads: HashMap<&str, &str> = target
        .iter()
        .map(|branch| (branch.name.as_str(), branch.commit.sha.as_str()))
        .collect();
    source
        .iter()
        .any(|branch| heads.get(branch.name.as_str()) != Some(&branch.commit.sha.as_str()))
}

/// Run ghec-last-commit-check
/// # Errors
/// Error if a platform can't be built, source branches can't be fetched or the file can't be written
pub async fn ghec_last_commit_check(
    config: &mut OrgMoverConfig,
    args: LastCommitCheckArgs,
) -> Result<(), OrgMoverError> {
    let ghec = GithubConfig::get_platform(config, GithubTarget::Cloud, &args.common)?;
    let ghec_scope = Scope::from_args(&args.common)?;
    let source_args = CommonArgs {
        organization: Some(value_or_prompt(
            args.source_org.clone(),
            "Enter the source organization name",
        )?),
        token: args.source_token.clone(),
        ..args.common.clone()
    };
    let source = GithubConfig::get_platform(config, GithubTarget::Server, &source_args)?;
    let source_scope = Scope::from_args(&source_args)?;

    let repos = match args.input_file.as_deref() {
        Some(path) => read_rows::<RepoRow>(path)?
            .into_iter()
            .map(|row| row.repo)
            .collect(),
        None => source.list_repo_names(&source_scope).await?,
    };
    let path = ghec_scope.output_csv(format!(
        "{}-{}-last-commit-check-{}.csv",
        source_scope.org_slug(),
        ghec_scope.org_slug(),
        current_time()
    ));
    let mut sink = CsvSink::create(path, &["repo"])?;
    let total = repos.len();
    let pb = spinner("");
    for (index, repo) in rows_after(repos, args.skip) {
        row_progress(index, total, &pb, format!("Comparing branches of {repo}"));
        let source_branches = source
            .list_branches(&source_scope.organization, &repo, &source_scope)
            .await?;
        let path = format!(
            "/repos/{}/{}/branches",
            encode(&ghec_scope.organization),
            encode(&repo)
        );
        let differs = match ghec
            .rest_pages_or_status::<RestBranch>(&path, &[], MAX_PER_PAGE, &ghec_scope)
            .await
        {
            Ok(target_branches) => branches_differ(&source_branches, &target_branches),
            Err(outcome) => {
                warn!("{repo}: {}", outcome.error_message);
                true
            }
        };
        if differs {
            info!("{repo} differs from its source");
            sink.write(&RepoRow { repo })?;
        }
    }
    pb.finish_and_clear();
    sink.finish()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::github::platform::RestCommit;

    fn branch(name: &str, sha: &str) -> RestBranch {
        RestBranch {
            name: name.into(),
            commit: RestCommit { sha: sha.into() },
            protected: false,
        }
    }

    #[test]
    fn same_heads_do_not_differ() {
        let source = vec![branch("main", "a1"), branch("dev", "b2")];
        let target = vec![branch("dev", "b2"), branch("main", "a1"), branch("new", "c3")];
        assert!(!branches_differ(&source, &target));
    }

    #[test]
    fn any_branch_is_checked() {
        let source = vec![branch("main", "a1"), branch("dev", "b2")];
        assert!(branches_differ(&source, &[branch("main", "a1")]));
        assert!(branches_differ(
            &source,
            &[branch("main", "a1"), branch("dev", "ff")]
        ));
    }

    #[test]
    fn empty_source_matches() {
        assert!(!branches_differ(&[], &[branch("main", "a1")]));
    }
}
