//! CSV files read and written by the commands
use std::{
    collections::HashSet,
    fs::{create_dir_all, File},
    path::{Path, PathBuf},
};

use chrono::Local;
use csv::{ReaderBuilder, Trim, Writer, WriterBuilder};
use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{context::has_extension, errors::OrgMoverError, http::Outcome, utils::value_or_prompt};

/// CSV output with a fixed header
pub struct CsvSink {
    /// Underlying writer
    writer: Writer<File>,

    /// Path of the file
    path: PathBuf,

    /// Number of rows written
    rows: usize,
}

impl CsvSink {
    /// Create the file, its parent directories and write the header
    /// # Errors
    /// Error if the file can't be created
    pub fn create(path: impl Into<PathBuf>, columns: &[&str]) -> Result<Self, OrgMoverError> {
        let path = path.into();
        create_parent_dir(&path)?;
        let file = File::create(&path).map_err(|e| {
            OrgMoverError::new_with_source(&format!("Unable to create {}", path.display()), e)
        })?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(columns)?;
        Ok(Self {
            writer,
            path,
            rows: 0,
        })
    }

    /// Write one row, fields in declaration order
    /// # Errors
    /// Error if the row can't be serialized or written
    pub fn write<T: Serialize>(&mut self, row: &T) -> Result<(), OrgMoverError> {
        self.writer.serialize(row)?;
        self.rows += 1;
        Ok(())
    }

    /// Path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the file and return its path
    /// # Errors
    /// Error if the file can't be flushed
    pub fn finish(mut self) -> Result<PathBuf, OrgMoverError> {
        self.writer.flush()?;
        debug!("{} rows written to {}", self.rows, self.path.display());
        println!("Exporting Completed: {}", self.path.display());
        Ok(self.path)
    }
}

/// Status file of a row-driven command: the row subject followed by its outcome
pub struct StatusSink {
    /// Underlying csv file
    sink: CsvSink,

    /// Rows that failed
    failed: usize,
}

impl StatusSink {
    /// Create the file with `subject_column` as first column
    /// # Errors
    /// Error if the file can't be created
    pub fn create(path: impl Into<PathBuf>, subject_column: &str) -> Result<Self, OrgMoverError> {
        let sink = CsvSink::create(
            path,
            &[subject_column, "status", "statusText", "errorMessage"],
        )?;
        Ok(Self { sink, failed: 0 })
    }

    /// Write the outcome of one row
    /// # Errors
    /// Error if the row can't be written
    pub fn write(&mut self, subject: &str, outcome: &Outcome) -> Result<(), OrgMoverError> {
        if !outcome.is_success() {
            self.failed += 1;
        }
        self.sink.write(&(
            subject,
            &outcome.status,
            &outcome.status_text,
            &outcome.error_message,
        ))
    }

    /// Flush the file and return its path
    /// # Errors
    /// Error if the file can't be flushed
    pub fn finish(self) -> Result<PathBuf, OrgMoverError> {
        if self.failed > 0 {
            warn!(
                "{} rows failed, see {}",
                self.failed,
                self.sink.path().display()
            );
        }
        self.sink.finish()
    }
}

/// Create the parent directory of a file if it has one
/// # Errors
/// Error if the directory can't be created
pub(crate) fn create_parent_dir(path: &Path) -> Result<(), OrgMoverError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir_all(parent).map_err(|e| {
            OrgMoverError::new_with_source(&format!("Unable to create {}", parent.display()), e)
        }),
        _ => Ok(()),
    }
}

/// Read every row of a CSV file with a header
/// # Errors
/// Error if the file can't be read or a row doesn't match `T`
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, OrgMoverError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| {
            OrgMoverError::new_with_source(&format!("Unable to read {}", path.display()), e)
        })?;
    let mut rows = vec![];
    for row in reader.deserialize() {
        rows.push(row?);
    }
    debug!("{} rows read from {}", rows.len(), path.display());
    Ok(rows)
}

/// Rows of an input file, prompting for its path when missing
/// # Errors
/// Error if the path can't be read from stdin or the file can't be read
pub fn input_rows<T: DeserializeOwned>(input_file: Option<PathBuf>) -> Result<Vec<T>, OrgMoverError> {
    let path = match input_file {
        Some(path) => path,
        None => PathBuf::from(value_or_prompt(None, "Enter the input file path")?),
    };
    read_rows(&path)
}

/// Rows numbered from 1, without the first `skip` ones
pub fn rows_after<T>(rows: Vec<T>, skip: usize) -> impl Iterator<Item = (usize, T)> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| (index + 1, row))
        .filter(move |(index, _)| *index > skip)
}

/// Row with a `login` column
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginRow {
    /// User login
    pub login: String,
}

/// Row with a `repo` column
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RepoRow {
    /// Repository name
    pub repo: String,
}

/// Set of allowed logins, case insensitive
#[derive(Debug, Clone, Default)]
pub struct LoginFilter {
    /// Lowercased logins
    logins: HashSet<String>,
}

impl LoginFilter {
    /// Filter from an optional file with a `login` column
    /// # Errors
    /// Error if the file can't be read
    pub fn from_file(path: Option<&Path>) -> Result<Self, OrgMoverError> {
        match path {
            Some(path) => {
                let rows: Vec<LoginRow> = read_rows(path)?;
                Ok(Self::from_logins(rows.into_iter().map(|row| row.login)))
            }
            None => Ok(Self::default()),
        }
    }

    /// Filter from a list of logins
    pub fn from_logins<I, S>(logins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            logins: logins
                .into_iter()
                .map(|login| login.as_ref().to_lowercase())
                .filter(|login| !login.is_empty())
                .collect(),
        }
    }

    /// Whether the filter holds no login
    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }

    /// An empty filter allows everyone
    pub fn allows(&self, login: &str) -> bool {
        self.is_empty() || self.contains(login)
    }

    /// Whether the login is in the filter
    pub fn contains(&self, login: &str) -> bool {
        self.logins.contains(&login.to_lowercase())
    }
}

/// Set of allowed repository names
#[derive(Debug, Clone, Default)]
pub struct RepoFilter {
    /// Repository names
    repos: HashSet<String>,
}

impl RepoFilter {
    /// Filter from an optional file with a `repo` column
    /// # Errors
    /// Error if the file can't be read
    pub fn from_file(path: Option<&Path>) -> Result<Self, OrgMoverError> {
        match path {
            Some(path) => {
                let rows: Vec<RepoRow> = read_rows(path)?;
                Ok(Self {
                    repos: rows.into_iter().map(|row| row.repo).collect(),
                })
            }
            None => Ok(Self::default()),
        }
    }

    /// An empty filter allows every repository
    pub fn allows(&self, repo: &str) -> bool {
        self.repos.is_empty() || self.repos.contains(repo)
    }
}

/// The output file if it has the right extension, else the default name
pub fn output_path(
    output_file: Option<&Path>,
    extension: &str,
    default_name: impl Into<PathBuf>,
) -> PathBuf {
    match output_file {
        Some(path) if has_extension(path, extension) => path.to_path_buf(),
        _ => default_name.into(),
    }
}

/// Timestamp used in status file names
pub fn current_time() -> String {
    Local::now().format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// Date used in export file names
pub fn today() -> String {
    Local::now().format("%d-%m-%Y").to_string()
}

/// Header serde derives for a row type, joined with commas
#[cfg(test)]
pub(crate) fn serialized_header<T: Serialize>(row: &T) -> String {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(vec![]);
    writer.serialize(row).unwrap();
    let bytes = writer.into_inner().unwrap();
    let text = String::from_utf8(bytes).unwrap();
    text.lines().next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs::{read_to_string, write};
    use tempfile::tempdir;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Row {
        repo: String,
        is_archived: bool,
        disk_usage: Option<u64>,
    }

    #[test]
    fn sink_writes_header_then_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("repos.csv");
        let mut sink = CsvSink::create(&path, &["repo", "isArchived", "diskUsage"]).unwrap();
        sink.write(&Row {
            repo: "alpha".into(),
            is_archived: true,
            disk_usage: Some(12),
        })
        .unwrap();
        sink.write(&Row {
            repo: "beta, gamma".into(),
            is_archived: false,
            disk_usage: None,
        })
        .unwrap();
        assert_eq!(sink.finish().unwrap(), path);
        assert_eq!(
            read_to_string(&path).unwrap(),
            "repo,isArchived,diskUsage\nalpha,true,12\n\"beta, gamma\",false,\n"
        );
        let rows: Vec<Row> = read_rows(&path).unwrap();
        assert_eq!(rows[1].repo, "beta, gamma");
        assert_eq!(rows[1].disk_usage, None);
    }

    #[test]
    fn status_sink_writes_outcomes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.csv");
        let mut sink = StatusSink::create(&path, "team").unwrap();
        sink.write("dev", &Outcome::success()).unwrap();
        sink.write(
            "ops",
            &Outcome {
                status: "404".into(),
                status_text: "Not Found".into(),
                error_message: "Group Not Found".into(),
            },
        )
        .unwrap();
        sink.finish().unwrap();
        assert_eq!(
            read_to_string(&path).unwrap(),
            "team,status,statusText,errorMessage\ndev,Success,,\nops,404,Not Found,Group Not Found\n"
        );
    }

    #[test]
    fn empty_sink_keeps_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        CsvSink::create(&path, &["login"]).unwrap().finish().unwrap();
        assert_eq!(read_to_string(&path).unwrap(), "login\n");
    }

    #[test]
    fn read_rows_trims_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.csv");
        write(&path, "login , name\n  Alice ,A\nbob,B\n").unwrap();
        let rows: Vec<LoginRow> = read_rows(&path).unwrap();
        assert_eq!(rows[0].login, "Alice");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn read_rows_missing_file() {
        let result: Result<Vec<LoginRow>, _> = read_rows(Path::new("/nonexistent/users.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn login_filter_is_case_insensitive() {
        let filter = LoginFilter::from_logins(["Alice", "BOB"]);
        assert!(filter.allows("alice"));
        assert!(filter.allows("Bob"));
        assert!(!filter.allows("carol"));
        assert!(LoginFilter::default().allows("anyone"));
        assert!(!LoginFilter::default().contains("anyone"));
    }

    #[test]
    fn repo_filter_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repos.csv");
        write(&path, "repo,visibility\nalpha,private\n").unwrap();
        let filter = RepoFilter::from_file(Some(&path)).unwrap();
        assert!(filter.allows("alpha"));
        assert!(!filter.allows("beta"));
        assert!(RepoFilter::from_file(None).unwrap().allows("beta"));
    }

    #[test]
    fn rows_after_skips_leading_rows() {
        let rows: Vec<(usize, &str)> = rows_after(vec!["a", "b", "c"], 2).collect();
        assert_eq!(rows, vec![(3, "c")]);
        assert_eq!(rows_after(vec!["a"], 0).count(), 1);
    }

    #[test]
    fn output_path_requires_extension() {
        assert_eq!(
            output_path(Some(Path::new("out.csv")), "csv", "default.csv"),
            PathBuf::from("out.csv")
        );
        assert_eq!(
            output_path(Some(Path::new("out.sh")), "csv", "default.csv"),
            PathBuf::from("default.csv")
        );
        assert_eq!(output_path(None, "sh", "a.sh"), PathBuf::from("a.sh"));
    }

    #[test]
    fn stamps_have_expected_shape() {
        assert_eq!(current_time().len(), "2024-01-31-12-00-00".len());
        assert_eq!(today().len(), "31-01-2024".len());
    }
}
