//! Options shared by every command and the resolved scope they run in
use std::path::{Path, PathBuf};

use clap::Args;

use crate::{
    errors::OrgMoverError,
    pagination::Throttle,
    records::output_path,
    utils::value_or_prompt,
};

/// Flags shared by the commands talking to one organization
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Organization name (GitHub org, GitLab group label or Bitbucket project key)
    #[arg(short, long)]
    pub organization: Option<String>,

    /// Personal Access Token
    #[arg(short, long, env = "PAT", hide_env_values = true)]
    pub token: Option<String>,

    /// The server endpoint url, e.g. https://github.example.com
    #[arg(short = 'g', long)]
    pub server_url: Option<String>,

    /// Delay time (in seconds) to wait between requests
    #[arg(short, long, default_value_t = 1)]
    pub wait_time: u64,

    /// Number of items requested per page
    #[arg(short, long, default_value_t = 50)]
    pub batch_size: u32,

    /// Output file to save the operation results
    #[arg(short = 'y', long)]
    pub output_file: Option<PathBuf>,

    /// Allow connections to an API endpoint presenting a certificate not issued by a trusted CA
    #[arg(short, long)]
    pub allow_untrusted_ssl_certificates: bool,
}

/// Resolved organization, paging and output settings of a command
#[derive(Debug, Clone)]
pub struct Scope {
    /// Organization the command works on
    pub organization: String,

    /// Items per page
    pub batch_size: u32,

    /// Delay between requests
    pub throttle: Throttle,

    /// Output file requested on the command line
    pub output_file: Option<PathBuf>,
}

impl Scope {
    /// Build the scope from the flags, prompting for the organization if missing
    /// # Errors
    /// Error if the organization can't be read from stdin
    pub fn from_args(args: &CommonArgs) -> Result<Self, OrgMoverError> {
        let organization = value_or_prompt(args.organization.clone(), "Enter organization name")?;
        Ok(Self::new(
            organization,
            args.batch_size,
            args.wait_time,
            args.output_file.clone(),
        ))
    }

    /// Build a scope from explicit values
    pub fn new(
        organization: String,
        batch_size: u32,
        wait_time: u64,
        output_file: Option<PathBuf>,
    ) -> Self {
        Self {
            organization,
            batch_size: batch_size.max(1),
            throttle: Throttle::from_secs(wait_time),
            output_file,
        }
    }

    /// Same scope on another organization
    pub fn for_organization(&self, organization: &str) -> Self {
        Self {
            organization: organization.to_string(),
            ..self.clone()
        }
    }

    /// Organization name usable in file names
    pub fn org_slug(&self) -> String {
        self.organization
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    }

    /// Output csv path: the `--output-file` if it is a csv, else the default name
    pub fn output_csv(&self, default_name: impl Into<PathBuf>) -> PathBuf {
        output_path(self.output_file.as_deref(), "csv", default_name)
    }

    /// Output path for a companion file next to the main output
    pub fn companion_csv(&self, suffix: &str, default_name: impl Into<PathBuf>) -> PathBuf {
        match self.output_file.as_deref() {
            Some(path) if has_extension(path, "csv") => with_suffix(path, suffix),
            _ => default_name.into(),
        }
    }
}

/// Whether the path has the given extension
pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// `dir/name.csv` + `-archived` gives `dir/name-archived.csv`
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "csv".to_string());
    path.with_file_name(format!("{stem}{suffix}.{extension}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn org_slug_strips_whitespace() {
        let scope = Scope::new("My Org ".into(), 10, 0, None);
        assert_eq!(scope.org_slug(), "MyOrg");
    }

    #[test]
    fn batch_size_is_never_zero() {
        let scope = Scope::new("org".into(), 0, 0, None);
        assert_eq!(scope.batch_size, 1);
    }

    #[test]
    fn companion_files_follow_output_file() {
        let scope = Scope::new("org".into(), 10, 0, Some(PathBuf::from("out/teams.csv")));
        assert_eq!(
            scope.companion_csv("-member-team-role", "default.csv"),
            PathBuf::from("out/teams-member-team-role.csv")
        );
        let scope = Scope::new("org".into(), 10, 0, Some(PathBuf::from("teams.txt")));
        assert_eq!(
            scope.companion_csv("-member-team-role", "default.csv"),
            PathBuf::from("default.csv")
        );
    }
}
