//! Compare the direct collaborators of GHES repositories with GHEC
use std::{collections::HashSet, path::PathBuf};

use clap::Args;
use log::info;
use serde::Serialize;

use super::CompareFilesArgs;
use crate::{
    errors::OrgMoverError,
    github::repos::{DirectCollaboratorRow, DIRECT_COLLABORATORS_COLUMNS},
    records::{read_rows, CsvSink, LoginFilter},
};

/// Compare two get-repos-direct-collaborators exports
#[derive(Args, Debug, Clone)]
pub struct CompareCollaboratorsArgs {
    #[command(flatten)]
    /// Export files
    pub files: CompareFilesArgs,

    /// CSV file with the `login` of the outside collaborators, never added
    #[arg(long)]
    pub outside_collaborators_file: Option<PathBuf>,

    /// CSV file with the `login` of every GHEC user, only these are added
    #[arg(short, long)]
    pub users_file: Option<PathBuf>,
}

/// Collaborator to remove from GHEC
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct RemovedCollaborator {
    pub repo: String,
    pub login: String,
}

/// Collaborators to add to GHEC and to remove from it
pub(crate) fn compare_direct_collaborators(
    ghes: &[DirectCollaboratorRow],
    ghec: &[DirectCollaboratorRow],
    ghec_users: &LoginFilter,
    outside_collaborators: &LoginFilter,
) -> (Vec<DirectCollaboratorRow>, Vec<RemovedCollaborator>) {
    let normalize = |row: &DirectCollaboratorRow| DirectCollaboratorRow {
        repo: row.repo.clone(),
        login: row.login.to_lowercase(),
        role: row.role.clone(),
    };
    let ghes: Vec<DirectCollaboratorRow> = ghes.iter().map(normalize).collect();
    let ghec: Vec<DirectCollaboratorRow> = ghec.iter().map(normalize).collect();

    let ghec_rows: HashSet<&DirectCollaboratorRow> = ghec.iter().collect();
    let to_add = ghes
        .iter()
        .filter(|row| ghec_users.allows(&row.login))
        .filter(|row| !outside_collaborators.contains(&row.login))
        .filter(|row| !ghec_rows.contains(row))
        .cloned()
        .collect();

    let ghes_pairs: HashSet<(&str, &str)> = ghes
        .iter()
        .map(|row| (row.repo.as_str(), row.login.as_str()))
        .collect();
    let to_remove = ghec
        .iter()
        .filter(|row| !ghes_pairs.contains(&(row.repo.as_str(), row.login.as_str())))
        .map(|row| RemovedCollaborator {
            repo: row.repo.clone(),
            login: row.login.clone(),
        })
        .collect();
    (to_add, to_remove)
}

/// Run compare-repo-direct-collaborators
/// # Errors
/// Error if an export can't be read or a file can't be written
pub fn run_compare_repo_direct_collaborators(
    args: CompareCollaboratorsArgs,
) -> Result<(), OrgMoverError> {
    let org = args.files.organization()?;
    let ghes: Vec<DirectCollaboratorRow> = read_rows(&args.files.ghes_file)?;
    let ghec: Vec<DirectCollaboratorRow> = read_rows(&args.files.ghec_file)?;
    let ghec_users = LoginFilter::from_file(args.users_file.as_deref())?;
    let outside = LoginFilter::from_file(args.outside_collaborators_file.as_deref())?;
    let (to_add, to_remove) = compare_direct_collaborators(&ghes, &ghec, &ghec_users, &outside);
    info!(
        "{} collaborators to add, {} to remove",
        to_add.len(),
        to_remove.len()
    );

    let mut input = CsvSink::create(
        args.files
            .output_csv(format!("{org}-repo-direct-collaborators-input.csv")),
        &DIRECT_COLLABORATORS_COLUMNS,
    )?;
    for row in &to_add {
        input.write(row)?;
    }
    input.finish()?;

    let mut remove = CsvSink::create(
        format!("{org}-repo-direct-collaborators-remove.csv"),
        &["repo", "login"],
    )?;
    for row in &to_remove {
        remove.write(row)?;
    }
    remove.finish()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs::write;
    use tempfile::tempdir;

    fn row(repo: &str, login: &str, role: &str) -> DirectCollaboratorRow {
        DirectCollaboratorRow {
            repo: repo.into(),
            login: login.into(),
            role: role.into(),
        }
    }

    #[test]
    fn role_changes_are_added_not_removed() {
        let ghes = vec![row("api", "Alice", "admin")];
        let ghec = vec![row("api", "alice", "write")];
        let (add, remove) = compare_direct_collaborators(
            &ghes,
            &ghec,
            &LoginFilter::default(),
            &LoginFilter::default(),
        );
        assert_eq!(add, vec![row("api", "alice", "admin")]);
        assert!(remove.is_empty());
    }

    #[test]
    fn extra_ghec_collaborators_are_removed() {
        let ghes = vec![row("api", "alice", "write")];
        let ghec = vec![row("api", "alice", "write"), row("api", "bob", "read")];
        let (add, remove) = compare_direct_collaborators(
            &ghes,
            &ghec,
            &LoginFilter::default(),
            &LoginFilter::default(),
        );
        assert!(add.is_empty());
        assert_eq!(
            remove,
            vec![RemovedCollaborator {
                repo: "api".into(),
                login: "bob".into()
            }]
        );
    }

    #[test]
    fn users_and_outside_collaborators_filter_additions() {
        let ghes = vec![
            row("api", "alice", "write"),
            row("api", "bob", "write"),
            row("api", "carol", "write"),
        ];
        let (add, _) = compare_direct_collaborators(
            &ghes,
            &[],
            &LoginFilter::from_logins(["alice", "bob"]),
            &LoginFilter::from_logins(["BOB"]),
        );
        assert_eq!(add, vec![row("api", "alice", "write")]);
    }

    #[test]
    fn compare_writes_both_files() {
        let dir = tempdir().unwrap();
        let ghes_file = dir.path().join("ghes.csv");
        let ghec_file = dir.path().join("ghec.csv");
        let output = dir.path().join("input.csv");
        write(&ghes_file, "repo,login,role\napi,alice,write\n").unwrap();
        write(&ghec_file, "repo,login,role\n").unwrap();
        run_compare_repo_direct_collaborators(CompareCollaboratorsArgs {
            files: CompareFilesArgs {
                organization: Some("acme".into()),
                ghes_file,
                ghec_file,
                output_file: Some(output.clone()),
            },
            outside_collaborators_file: None,
            users_file: None,
        })
        .unwrap();
        let rows: Vec<DirectCollaboratorRow> = read_rows(&output).unwrap();
        assert_eq!(rows, vec![row("api", "alice", "write")]);
        std::fs::remove_file("acme-repo-direct-collaborators-remove.csv").unwrap();
    }
}
