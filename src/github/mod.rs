//! GitHub Enterprise Cloud and Server: export, import and migration scripts
pub(crate) mod config;
pub(crate) mod import;
pub(crate) mod platform;
pub(crate) mod projects;
pub(crate) mod queries;
pub(crate) mod repos;
pub(crate) mod script;
pub(crate) mod teams;
pub(crate) mod users;

/// GitHub Enterprise Cloud REST API URL
const GITHUB_API_URL: &str = "https://api.github.com";

/// GitHub Enterprise Cloud GraphQL API URL
const GITHUB_GRAPHQL_API_URL: &str = "https://api.github.com/graphql";

/// GitHub API Header
const GITHUB_API_HEADER: &str = "X-GitHub-Api-Version";

/// GitHub API Version
const GITHUB_API_VERSION: &str = "2022-11-28";

/// GitHub Accept header
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
