//! GitLab export (REST v4)
pub(crate) mod config;
pub(crate) mod export;
pub(crate) mod models;
pub(crate) mod platform;

/// GitLab.com url, used when no server url is configured
const GITLAB_URL: &str = "https://gitlab.com";

/// Accept header of the GitLab API
const GITLAB_ACCEPT: &str = "application/json";
