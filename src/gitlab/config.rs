//! Gitlab configuration
use super::{platform::GitlabPlatform, GITLAB_URL};
use crate::{
    config::OrgMoverConfig, config_password_wrap, context::CommonArgs, errors::OrgMoverError,
};
use serde::{Deserialize, Serialize};

/// Gitlab configuration
#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct GitlabConfig {
    /// Gitlab token
    pub token: Option<String>,

    /// Self-managed instance url, gitlab.com if missing
    pub server_url: Option<String>,
}

impl GitlabConfig {
    /// Get Gitlab platform
    /// # Errors
    /// Error if the token can't be read or the server url is invalid
    pub fn get_platform(
        config: &mut OrgMoverConfig,
        args: &CommonArgs,
    ) -> Result<GitlabPlatform, OrgMoverError> {
        let token = match args.token.clone() {
            Some(token) => token,
            None => config_password_wrap!(
                config,
                gitlab,
                GitlabConfig,
                token,
                "your gitlab token (https://gitlab.com/-/user_settings/personal_access_tokens)"
            ),
        };
        let server_url = args
            .server_url
            .clone()
            .or_else(|| {
                config
                    .config_data
                    .gitlab
                    .as_ref()
                    .and_then(|c| c.server_url.clone())
            })
            .unwrap_or_else(|| GITLAB_URL.to_string());
        GitlabPlatform::new(token, &server_url, args.allow_untrusted_ssl_certificates)
    }
}
