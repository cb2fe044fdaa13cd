//! Platform abstraction shared by the GitHub, GitLab and Bitbucket clients
use std::{fmt, future::Future, pin::Pin};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    bitbucket::config::BitbucketConfig,
    config::OrgMoverConfig,
    context::{CommonArgs, Scope},
    errors::{OrgMoverError, OrgMoverErrorKind},
    github::config::{GithubConfig, GithubTarget},
    gitlab::config::GitlabConfig,
};

/// A source or destination platform able to list repositories
pub trait Platform: Sync + Send {
    /// Kind of platform
    fn get_type(&self) -> PlatformType;

    /// Base URL of the API used
    fn get_remote_url(&self) -> &str;

    /// Names of every repository in the organization (or project/group) of the scope
    fn get_all_repo_names<'a>(
        &'a self,
        scope: &'a Scope,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, OrgMoverError>> + Send + 'a>>;
}

/// Supported platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    /// GitHub Enterprise Cloud
    Github,
    /// GitHub Enterprise Server
    Ghes,
    /// GitLab (cloud or self-managed)
    Gitlab,
    /// Bitbucket Server / Data Center
    Bitbucket,
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformType::Github => write!(f, "github"),
            PlatformType::Ghes => write!(f, "ghes"),
            PlatformType::Gitlab => write!(f, "gitlab"),
            PlatformType::Bitbucket => write!(f, "bitbucket"),
        }
    }
}

/// Build the platform of the given type from the config and the command line flags
/// # Errors
/// Error if a required value can't be read or the server url is invalid
pub(crate) fn get_platform(
    config: &mut OrgMoverConfig,
    platform_type: PlatformType,
    args: &CommonArgs,
) -> Result<Box<dyn Platform>, OrgMoverError> {
    let platform: Box<dyn Platform> = match platform_type {
        PlatformType::Github => Box::new(GithubConfig::get_platform(
            config,
            GithubTarget::Cloud,
            args,
        )?),
        PlatformType::Ghes => Box::new(GithubConfig::get_platform(
            config,
            GithubTarget::Server,
            args,
        )?),
        PlatformType::Gitlab => Box::new(GitlabConfig::get_platform(config, args)?),
        PlatformType::Bitbucket => Box::new(BitbucketConfig::get_platform(config, args)?),
    };
    Ok(platform)
}

/// Validate a server url and strip its trailing slash
/// # Errors
/// Error if the url can't be parsed or isn't http(s)
pub(crate) fn normalize_server_url(server_url: &str) -> Result<String, OrgMoverError> {
    let parsed = Url::parse(server_url.trim()).map_err(|e| {
        OrgMoverError::new(OrgMoverErrorKind::Input)
            .with_text(&format!("Invalid server url '{server_url}': {e}"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(OrgMoverError::new(OrgMoverErrorKind::Input)
            .with_text(&format!("Server url '{server_url}' must use http or https")));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn server_url_is_normalized() {
        assert_eq!(
            normalize_server_url("https://ghes.example.com/").unwrap(),
            "https://ghes.example.com"
        );
        assert_eq!(
            normalize_server_url(" https://git.example.com/gitlab/ ").unwrap(),
            "https://git.example.com/gitlab"
        );
    }

    #[test]
    fn server_url_requires_http() {
        assert!(normalize_server_url("ftp://example.com").is_err());
        assert!(normalize_server_url("example.com").is_err());
    }

    #[test]
    fn platform_names() {
        assert_eq!(PlatformType::Ghes.to_string(), "ghes");
        assert_eq!(
            PlatformType::from_str("bitbucket", true).unwrap(),
            PlatformType::Bitbucket
        );
    }
}
