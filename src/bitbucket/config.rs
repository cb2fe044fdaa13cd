//! Bitbucket configuration
use super::platform::BitbucketPlatform;
use crate::{
    config::OrgMoverConfig, config_password_wrap, config_value_wrap, context::CommonArgs,
    errors::OrgMoverError,
};
use serde::{Deserialize, Serialize};

/// Bitbucket configuration
#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct BitbucketConfig {
    /// HTTP access token
    pub token: Option<String>,

    /// Bitbucket Server url
    pub server_url: Option<String>,
}

impl BitbucketConfig {
    /// Get Bitbucket platform
    /// # Errors
    /// Error if a missing value can't be read or the server url is invalid
    pub fn get_platform(
        config: &mut OrgMoverConfig,
        args: &CommonArgs,
    ) -> Result<BitbucketPlatform, OrgMoverError> {
        let token = match args.token.clone() {
            Some(token) => token,
            None => config_password_wrap!(
                config,
                bitbucket,
                BitbucketConfig,
                token,
                "your Bitbucket Server HTTP access token"
            ),
        };
        let server_url = match args.server_url.clone() {
            Some(url) => url,
            None => config_value_wrap!(
                config,
                bitbucket,
                BitbucketConfig,
                server_url,
                "your Bitbucket Server url (https://bitbucket.example.com)"
            ),
        };
        BitbucketPlatform::new(token, &server_url, args.allow_untrusted_ssl_certificates)
    }
}
