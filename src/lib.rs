//! # org-mover
//!
//! Export, import and compare organization data between GitHub Enterprise
//! Server, GitHub Enterprise Cloud, GitLab and Bitbucket Server
//!
//! ## Usage
//!
//! ```txt
//! Usage: org-mover [OPTIONS] [COMMAND]
//!
//! Commands:
//!   get-repos                     Export the repositories of an organization [aliases: gr]
//!   get-teams                     Export the teams of an organization [aliases: gt]
//!   set-repo-team-permission      Give teams a permission on repositories [aliases: srtp]
//!   compare-teams                 Compare the teams of two get-teams exports [aliases: cpt]
//!   get-gitlab-repositories       Export the projects of a GitLab instance [aliases: ggr]
//!   get-bitbucket-repositories    Export the repositories of a Bitbucket project [aliases: gbr]
//!   ...
//!
//! Options:
//!   -c, --config <CONFIG>     Custom configuration file path
//!       --show-config-path    Show the current config path
//!   -v, --verbose...          Verbose mode (-v, -vv)
//!   -h, --help                Print help
//!   -V, --version             Print version
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::missing_errors_doc,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod macros;
pub(crate) use macros::{config_password_wrap, config_value_wrap};

pub(crate) mod bitbucket;
pub(crate) mod cli;
pub(crate) mod compare;
pub(crate) mod config;
pub(crate) mod context;
pub(crate) mod errors;
pub(crate) mod github;
pub(crate) mod gitlab;
pub(crate) mod http;
pub(crate) mod pagination;
pub(crate) mod platform;
pub(crate) mod records;
#[cfg(test)]
pub(crate) mod test_server;
pub(crate) mod utils;

pub use cli::{org_mover_main, Command, OrgMoverCli};
pub use config::OrgMoverConfig;
pub use errors::OrgMoverError;
pub use platform::PlatformType;
