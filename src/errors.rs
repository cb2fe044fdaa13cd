//! Error handling for the org-mover crate.
use std::{error::Error as StdError, fmt};

use crate::platform::PlatformType;

/// Error type for the org-mover crate.
#[derive(Debug)]
pub struct OrgMoverError {
    /// Inner error.
    inner: Box<Inner>,
}

impl OrgMoverError {
    /// Create a new error.
    pub(crate) fn new(kind: OrgMoverErrorKind) -> Self {
        Self {
            inner: Box::new(Inner {
                kind,
                source: None,
                platform: None,
            }),
        }
    }

    /// Create a custom error wrapping a source error.
    pub(crate) fn new_with_source<E>(text: &str, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let source = std::io::Error::other(format!("{text}: {source}"));
        Self {
            inner: Box::new(Inner {
                kind: OrgMoverErrorKind::Custom,
                source: Some(Box::new(source)),
                platform: None,
            }),
        }
    }

    /// Attach a text description as the error source.
    pub(crate) fn with_text(mut self, text: &str) -> Self {
        self.inner.source = Some(Box::new(std::io::Error::other(text)));
        self
    }

    /// Attach the platform the error comes from.
    pub(crate) fn with_platform(mut self, platform: PlatformType) -> Self {
        self.inner.platform = Some(platform);
        self
    }

    /// Kind of the error.
    #[cfg(test)]
    pub(crate) fn kind(&self) -> &OrgMoverErrorKind {
        &self.inner.kind
    }

    /// Build an error from any error with a given kind.
    fn from_source<E>(kind: OrgMoverErrorKind, e: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Box::new(Inner {
                kind,
                source: Some(Box::new(e)),
                platform: None,
            }),
        }
    }
}

/// Type alias for a boxed error.
pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// Inner error type for the org-mover crate.
#[derive(Debug)]
struct Inner {
    /// Error kind.
    kind: OrgMoverErrorKind,

    /// Platform error
    platform: Option<PlatformType>,

    /// Source error.
    source: Option<BoxError>,
}

/// Category of an [`OrgMoverError`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum OrgMoverErrorKind {
    /// Error related to the platform.
    Platform,

    /// Error related to the reqwest crate.
    Reqwest,

    /// Error related to serde.
    Serde,

    /// Error related to reading or writing CSV files.
    Csv,

    /// Error related to the configuration file format.
    Toml,

    /// Error related to the filesystem.
    Io,

    /// The GraphQL API answered with errors.
    GraphQl,

    /// The REST API answered with a non-success status.
    Api,

    /// Invalid user input.
    Input,

    /// Anything else.
    Custom,
}

impl fmt::Display for OrgMoverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.inner.kind)?;
        if let Some(platform) = &self.inner.platform {
            write!(f, " ({platform})")?;
        }
        if let Some(source) = &self.inner.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for OrgMoverError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

impl From<reqwest::Error> for OrgMoverError {
    fn from(e: reqwest::Error) -> Self {
        Self::from_source(OrgMoverErrorKind::Reqwest, e)
    }
}

impl From<serde_json::Error> for OrgMoverError {
    fn from(e: serde_json::Error) -> Self {
        Self::from_source(OrgMoverErrorKind::Serde, e)
    }
}

impl From<csv::Error> for OrgMoverError {
    fn from(e: csv::Error) -> Self {
        Self::from_source(OrgMoverErrorKind::Csv, e)
    }
}

impl From<toml::de::Error> for OrgMoverError {
    fn from(e: toml::de::Error) -> Self {
        Self::from_source(OrgMoverErrorKind::Toml, e)
    }
}

impl From<std::io::Error> for OrgMoverError {
    fn from(e: std::io::Error) -> Self {
        Self::from_source(OrgMoverErrorKind::Io, e)
    }
}

impl From<&str> for OrgMoverError {
    fn from(text: &str) -> Self {
        Self::new(OrgMoverErrorKind::Custom).with_text(text)
    }
}

impl From<String> for OrgMoverError {
    fn from(text: String) -> Self {
        Self::new(OrgMoverErrorKind::Custom).with_text(&text)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_includes_platform_and_source() {
        let error = OrgMoverError::new(OrgMoverErrorKind::Api)
            .with_platform(PlatformType::Gitlab)
            .with_text("404 Not Found");
        assert_eq!(error.to_string(), "Api (gitlab): 404 Not Found");
        assert!(error.source().is_some());
    }

    #[test]
    fn string_conversion_is_custom() {
        let error: OrgMoverError = "boom".into();
        assert_eq!(error.kind(), &OrgMoverErrorKind::Custom);
        assert_eq!(error.to_string(), "Custom: boom");
    }
}
