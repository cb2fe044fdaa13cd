//! Utility functions
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::errors::OrgMoverError;

/// Get input from the user
pub(crate) fn input() -> Result<String, OrgMoverError> {
    use std::io::{stdin, stdout, Write};
    let mut s = String::new();
    let _ = stdout().flush();
    stdin()
        .read_line(&mut s)
        .map_err(|e| OrgMoverError::new_with_source("Did not enter a correct string", e))?;
    if let Some('\n') = s.chars().next_back() {
        s.pop();
    }
    if let Some('\r') = s.chars().next_back() {
        s.pop();
    }
    Ok(s)
}

/// Get a yes/no input from the user
pub(crate) fn yes_no_input<S: AsRef<str>>(msg: S) -> Result<bool, OrgMoverError> {
    let msg = msg.as_ref();
    loop {
        println!("{msg}");
        let input = input()?;
        match input.trim().to_lowercase().as_str() {
            "yes" | "y" => return Ok(true),
            "no" | "n" => return Ok(false),
            _ => println!("Invalid input"),
        }
    }
}

/// Get password from the user
pub(crate) fn get_password() -> Result<String, OrgMoverError> {
    rpassword::read_password()
        .map_err(|e| OrgMoverError::new_with_source("Error reading password", e))
}

/// The given value, or a non-empty line read from stdin
pub(crate) fn value_or_prompt(value: Option<String>, msg: &str) -> Result<String, OrgMoverError> {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        return Ok(value);
    }
    loop {
        println!("{msg}:");
        let value = input()?;
        if !value.trim().is_empty() {
            return Ok(value.trim().to_string());
        }
        println!("A value is required");
    }
}

/// Split a comma separated list, dropping empty entries
pub(crate) fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercase name with runs of other characters replaced by a dash
pub(crate) fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c.to_ascii_lowercase());
        } else if c == '.' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// get ProgressStyle
fn get_style() -> Option<ProgressStyle> {
    match ProgressStyle::with_template("{prefix:.bold.dim} {spinner} {wide_msg}") {
        Ok(s) => Some(s.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")),
        Err(_) => None,
    }
}

/// Spinner shown while a long fetch runs
pub(crate) fn spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Some(style) = get_style() {
        pb.set_style(style);
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Progress of a row-driven command
pub(crate) fn row_progress(index: usize, total: usize, pb: &ProgressBar, msg: String) {
    pb.set_prefix(format!("[{index}/{total}]"));
    pb.set_message(msg);
    pb.inc(1);
}
