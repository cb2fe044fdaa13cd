//! Github configuration
use super::platform::GithubPlatform;
use serde::{Deserialize, Serialize};

use crate::{
    config::OrgMoverConfig, config_password_wrap, config_value_wrap, context::CommonArgs,
    errors::OrgMoverError, platform::PlatformType,
};

/// Github configuration, used for both the `[github]` and `[ghes]` sections
#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct GithubConfig {
    /// Personal access token
    pub token: Option<String>,

    /// GitHub Enterprise Server url
    pub server_url: Option<String>,
}

/// Which GitHub a command talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GithubTarget {
    /// GitHub Enterprise Cloud
    Cloud,
    /// GitHub Enterprise Server
    Server,
}

impl GithubTarget {
    /// `--server-url` selects GitHub Enterprise Server
    pub fn from_args(args: &CommonArgs) -> Self {
        match args.server_url {
            Some(_) => GithubTarget::Server,
            None => GithubTarget::Cloud,
        }
    }

    /// Platform type of the target
    pub fn platform_type(&self) -> PlatformType {
        match self {
            GithubTarget::Cloud => PlatformType::Github,
            GithubTarget::Server => PlatformType::Ghes,
        }
    }
}

impl GithubConfig {
    /// Get the github platform
    /// # Errors
    /// Error if a missing value can't be read or the server url is invalid
    pub fn get_platform(
        config: &mut OrgMoverConfig,
        target: GithubTarget,
        args: &CommonArgs,
    ) -> Result<GithubPlatform, OrgMoverError> {
        let token = match (args.token.clone(), target) {
            (Some(token), _) => token,
            (None, GithubTarget::Cloud) => config_password_wrap!(
                config,
                github,
                GithubConfig,
                token,
                "your GitHub Enterprise Cloud token"
            ),
            (None, GithubTarget::Server) => config_password_wrap!(
                config,
                ghes,
                GithubConfig,
                token,
                "your GitHub Enterprise Server token"
            ),
        };
        let server_url = match (args.server_url.clone(), target) {
            (_, GithubTarget::Cloud) => None,
            (Some(url), GithubTarget::Server) => Some(url),
            (None, GithubTarget::Server) => Some(config_value_wrap!(
                config,
                ghes,
                GithubConfig,
                server_url,
                "your GitHub Enterprise Server url (https://github.example.com)"
            )),
        };
        GithubPlatform::new(
            token,
            server_url.as_deref(),
            args.allow_untrusted_ssl_certificates,
        )
    }

    /// Get the platform selected by `--server-url`
    /// # Errors
    /// Error if a missing value can't be read or the server url is invalid
    pub fn from_args(
        config: &mut OrgMoverConfig,
        args: &CommonArgs,
    ) -> Result<GithubPlatform, OrgMoverError> {
        Self::get_platform(config, GithubTarget::from_args(args), args)
    }
}
