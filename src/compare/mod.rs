//! GitHub Enterprise Server vs GitHub Enterprise Cloud comparisons
use std::path::PathBuf;

use clap::Args;

use crate::{errors::OrgMoverError, records::output_path, utils::value_or_prompt};

pub(crate) mod collaborators;
pub(crate) mod commits;
pub(crate) mod missing_repos;
pub(crate) mod teams;

/// Two exports of the same organization to compare
#[derive(Args, Debug, Clone)]
pub struct CompareFilesArgs {
    /// Organization name used in the output file names
    #[arg(short, long)]
    pub organization: Option<String>,

    /// Export taken on GitHub Enterprise Server
    #[arg(long)]
    pub ghes_file: PathBuf,

    /// Export taken on GitHub Enterprise Cloud
    #[arg(long)]
    pub ghec_file: PathBuf,

    /// Output file of the comparison
    #[arg(short = 'y', long)]
    pub output_file: Option<PathBuf>,
}

impl CompareFilesArgs {
    /// Organization name, prompted if missing
    /// # Errors
    /// Error if the name can't be read from stdin
    pub(crate) fn organization(&self) -> Result<String, OrgMoverError> {
        let org = value_or_prompt(self.organization.clone(), "Enter organization name")?;
        Ok(org.chars().filter(|c| !c.is_whitespace()).collect())
    }

    /// `--output-file` if it is a csv, else the default name
    pub(crate) fn output_csv(&self, default_name: impl Into<PathBuf>) -> PathBuf {
        output_path(self.output_file.as_deref(), "csv", default_name)
    }
}
