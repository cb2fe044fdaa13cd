//! Shell scripts driving the `gh gei` and `gh bbs2gh` migration extensions
use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
};

use clap::{Args, ValueEnum};
use log::info;
use serde::Deserialize;

use crate::{
    errors::OrgMoverError,
    platform::normalize_server_url,
    records::{create_parent_dir, input_rows, output_path, RepoRow},
    utils::{spinner, value_or_prompt},
};

/// Variable used when no source token is given
const SOURCE_TOKEN_VARIABLE: &str = "GH_SOURCE_PAT";

/// Variable used when no target token is given
const TARGET_TOKEN_VARIABLE: &str = "GH_PAT";

/// Visibility of a migrated repository
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoVisibility {
    /// Private
    Private,
    /// Internal
    Internal,
    /// Public
    Public,
}

impl Display for RepoVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let visibility = match self {
            RepoVisibility::Private => "private",
            RepoVisibility::Internal => "internal",
            RepoVisibility::Public => "public",
        };
        write!(f, "{visibility}")
    }
}

/// Generate a GHES to GHEC migration script
#[derive(Args, Debug, Clone)]
pub struct GhesScriptArgs {
    /// CSV file with `repo` and `visibility` columns
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Organization on GitHub Enterprise Server
    #[arg(long)]
    pub source_org: Option<String>,

    /// Organization on GitHub Enterprise Cloud
    #[arg(long)]
    pub target_org: Option<String>,

    /// GitHub Enterprise Server url
    #[arg(short = 'g', long)]
    pub server_url: Option<String>,

    /// Token of the source, `$GH_SOURCE_PAT` if missing
    #[arg(long)]
    pub source_token: Option<String>,

    /// Token of the target, `$GH_PAT` if missing
    #[arg(long)]
    pub target_token: Option<String>,

    /// Visibility forced on every repository
    #[arg(long)]
    pub visibility: Option<RepoVisibility>,

    /// Script path, used if it ends with `.sh`
    #[arg(short = 'y', long)]
    pub output_file: Option<PathBuf>,
}

/// Generate a Bitbucket Server to GHEC migration script
#[derive(Args, Debug, Clone)]
pub struct BitbucketScriptArgs {
    /// CSV file with a `repo` column
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Bitbucket Server url
    #[arg(long)]
    pub bbs_server_url: Option<String>,

    /// Bitbucket project key
    #[arg(long)]
    pub bbs_project: Option<String>,

    /// Organization on GitHub Enterprise Cloud
    #[arg(long)]
    pub github_org: Option<String>,

    /// User of the SSH connection to the Bitbucket server
    #[arg(long)]
    pub ssh_user: Option<String>,

    /// Bucket used to upload the archives
    #[arg(long)]
    pub aws_bucket_name: Option<String>,

    /// Script path, used if it ends with `.sh`
    #[arg(short = 'y', long)]
    pub output_file: Option<PathBuf>,
}

/// Input line of the GHES script
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
struct ScriptInput {
    repo: String,
    visibility: String,
}

/// Token given to a migration command
#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenArg {
    /// Environment variable read when the script runs
    Variable(&'static str),
    /// Token written in the script
    Literal(String),
}

impl TokenArg {
    /// The given token, or the variable
    fn new(token: Option<String>, variable: &'static str) -> Self {
        match token {
            Some(token) => TokenArg::Literal(token),
            None => TokenArg::Variable(variable),
        }
    }

    /// Shell word, only a variable is left to expansion
    fn shell_word(&self) -> String {
        match self {
            TokenArg::Variable(name) => format!("\"${name}\""),
            TokenArg::Literal(token) => shell_word(token),
        }
    }
}

/// Resolved values of a GHES script line
#[derive(Debug, Clone, PartialEq, Eq)]
struct GeiOptions {
    source_org: String,
    target_org: String,
    ghes_api_url: String,
    source_token: TokenArg,
    target_token: TokenArg,
    visibility: Option<RepoVisibility>,
}

/// Resolved values of a Bitbucket script line
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bbs2ghOptions {
    server_url: String,
    project: String,
    github_org: String,
    ssh_user: String,
    aws_bucket_name: String,
}

/// Shell word, single quoted unless every character is inert
fn shell_word(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@=,+%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

/// Join shell words into one command line
fn command_line(words: &[&str]) -> String {
    words
        .iter()
        .map(|word| shell_word(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `gh gei migrate-repo` line of a repository
fn gei_line(repo: &str, row_visibility: &str, options: &GeiOptions) -> String {
    let visibility = match options.visibility {
        Some(visibility) => visibility.to_string(),
        None => row_visibility.to_lowercase(),
    };
    let command = command_line(&[
        "gh",
        "gei",
        "migrate-repo",
        "--github-source-org",
        &options.source_org,
        "--source-repo",
        repo,
        "--github-target-org",
        &options.target_org,
        "--ghes-api-url",
        &options.ghes_api_url,
        "--queue-only",
        "--target-repo-visibility",
        &visibility,
    ]);
    format!(
        "{command} --github-source-pat {} --github-target-pat {}",
        options.source_token.shell_word(),
        options.target_token.shell_word()
    )
}

/// `gh bbs2gh migrate-repo` line of a repository
fn bbs2gh_line(repo: &str, options: &Bbs2ghOptions) -> String {
    command_line(&[
        "gh",
        "bbs2gh",
        "migrate-repo",
        "--bbs-server-url",
        &options.server_url,
        "--bbs-project",
        &options.project,
        "--bbs-repo",
        repo,
        "--github-org",
        &options.github_org,
        "--github-repo",
        repo,
        "--ssh-user",
        &options.ssh_user,
        "--aws-bucket-name",
        &options.aws_bucket_name,
    ])
}

/// Write the script, one line per command
/// # Errors
/// Error if the file can't be written
fn write_script(path: &Path, lines: &[String]) -> Result<(), OrgMoverError> {
    create_parent_dir(path)?;
    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(path, content).map_err(|e| {
        OrgMoverError::new_with_source(&format!("Unable to write {}", path.display()), e)
    })?;
    println!("Exporting Completed: {}", path.display());
    Ok(())
}

/// Run generate-ghes-migration-script
/// # Errors
/// Error if a value can't be read or the script can't be written
pub fn generate_ghes_migration_script(args: GhesScriptArgs) -> Result<(), OrgMoverError> {
    let source_org = value_or_prompt(args.source_org, "Enter the GHES organization")?;
    let target_org = value_or_prompt(args.target_org, "Enter the GHEC organization")?;
    let server_url = normalize_server_url(&value_or_prompt(
        args.server_url,
        "Enter the GHES url",
    )?)?;
    let rows: Vec<ScriptInput> = input_rows(args.input_file)?;
    let options = GeiOptions {
        source_org,
        target_org,
        ghes_api_url: format!("{server_url}/api/v3"),
        source_token: TokenArg::new(args.source_token, SOURCE_TOKEN_VARIABLE),
        target_token: TokenArg::new(args.target_token, TARGET_TOKEN_VARIABLE),
        visibility: args.visibility,
    };
    let pb = spinner("generate-ghes-migration-script");
    pb.set_message("Generating GHES migration script");
    let lines: Vec<String> = rows
        .iter()
        .filter(|row| !row.repo.is_empty())
        .map(|row| gei_line(&row.repo, &row.visibility, &options))
        .collect();
    pb.finish_and_clear();
    info!("{} repositories in the script", lines.len());
    let path = output_path(
        args.output_file.as_deref(),
        "sh",
        format!(
            "{}-{}-migration-script.sh",
            options.source_org, options.target_org
        ),
    );
    write_script(&path, &lines)
}

/// Run generate-bitbucket-migration-script
/// # Errors
/// Error if a value can't be read or the script can't be written
pub fn generate_bitbucket_migration_script(
    args: BitbucketScriptArgs,
) -> Result<(), OrgMoverError> {
    let options = Bbs2ghOptions {
        server_url: normalize_server_url(&value_or_prompt(
            args.bbs_server_url,
            "Enter the Bitbucket Server url",
        )?)?,
        project: value_or_prompt(args.bbs_project, "Enter the Bitbucket project key")?,
        github_org: value_or_prompt(args.github_org, "Enter the GHEC organization")?,
        ssh_user: value_or_prompt(args.ssh_user, "Enter the SSH user")?,
        aws_bucket_name: value_or_prompt(args.aws_bucket_name, "Enter the AWS bucket name")?,
    };
    let rows: Vec<RepoRow> = input_rows(args.input_file)?;
    let pb = spinner("generate-bitbucket-migration-script");
    pb.set_message("Generating Bitbucket migration script");
    let lines: Vec<String> = rows
        .iter()
        .filter(|row| !row.repo.is_empty())
        .map(|row| bbs2gh_line(&row.repo, &options))
        .collect();
    pb.finish_and_clear();
    info!("{} repositories in the script", lines.len());
    let path = output_path(
        args.output_file.as_deref(),
        "sh",
        format!("bitbucket-{}-migration-script.sh", options.github_org),
    );
    write_script(&path, &lines)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs::read_to_string;
    use tempfile::tempdir;

    fn gei_options(visibility: Option<RepoVisibility>) -> GeiOptions {
        GeiOptions {
            source_org: "ghes-org".into(),
            target_org: "ghec-org".into(),
            ghes_api_url: "https://ghes.example.com/api/v3".into(),
            source_token: TokenArg::Variable(SOURCE_TOKEN_VARIABLE),
            target_token: TokenArg::Variable(TARGET_TOKEN_VARIABLE),
            visibility,
        }
    }

    #[test]
    fn gei_line_uses_row_visibility() {
        assert_eq!(
            gei_line("api", "PRIVATE", &gei_options(None)),
            "gh gei migrate-repo --github-source-org ghes-org --source-repo api \
             --github-target-org ghec-org --ghes-api-url https://ghes.example.com/api/v3 \
             --queue-only --target-repo-visibility private \
             --github-source-pat \"$GH_SOURCE_PAT\" --github-target-pat \"$GH_PAT\""
        );
    }

    #[test]
    fn forced_visibility_wins() {
        let line = gei_line("api", "public", &gei_options(Some(RepoVisibility::Internal)));
        assert!(line.contains("--target-repo-visibility internal"));
    }

    #[test]
    fn bbs2gh_line_names_target_repo() {
        let options = Bbs2ghOptions {
            server_url: "https://bitbucket.example.com".into(),
            project: "PRJ".into(),
            github_org: "ghec-org".into(),
            ssh_user: "git".into(),
            aws_bucket_name: "migrations".into(),
        };
        assert_eq!(
            bbs2gh_line("web", &options),
            "gh bbs2gh migrate-repo --bbs-server-url https://bitbucket.example.com \
             --bbs-project PRJ --bbs-repo web --github-org ghec-org --github-repo web \
             --ssh-user git --aws-bucket-name migrations"
        );
    }

    #[test]
    fn unsafe_words_are_single_quoted() {
        assert_eq!(shell_word("my repo"), "'my repo'");
        assert_eq!(shell_word("a\"b"), "'a\"b'");
        assert_eq!(shell_word("it's"), "'it'\\''s'");
        assert_eq!(shell_word(""), "''");
        assert_eq!(shell_word("$(reboot)"), "'$(reboot)'");
        assert_eq!(shell_word("`id`"), "'`id`'");
        assert_eq!(shell_word("$HOME"), "'$HOME'");
    }

    #[test]
    fn given_tokens_are_not_expanded() {
        let mut options = gei_options(None);
        options.source_token = TokenArg::new(Some("ghp_$x`y`".into()), SOURCE_TOKEN_VARIABLE);
        options.target_token = TokenArg::new(None, TARGET_TOKEN_VARIABLE);
        let line = gei_line("api", "private", &options);
        assert!(line.ends_with(
            "--github-source-pat 'ghp_$x`y`' --github-target-pat \"$GH_PAT\""
        ));
    }

    #[test]
    fn script_overwrites_previous_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("migration.sh");
        write_script(&path, &["first".into()]).unwrap();
        write_script(&path, &["second".into(), "third".into()]).unwrap();
        assert_eq!(read_to_string(&path).unwrap(), "second\nthird\n");
    }
}
