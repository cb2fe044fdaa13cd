//! Bitbucket Server / Data Center export
pub(crate) mod config;
pub(crate) mod export;
pub(crate) mod models;
pub(crate) mod platform;

/// Accept header of the Bitbucket Server API
const BITBUCKET_ACCEPT: &str = "application/json";
