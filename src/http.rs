//! HTTP wrapper shared by every platform client
//!
//! [`ApiClient::request`] never fails: HTTP and transport errors are folded
//! into an [`ApiResponse`] so that row-driven commands can record them in
//! their status file and move on to the next row.
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;
use reqwest::{
    header::{ACCEPT, AUTHORIZATION},
    Method, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::sleep;
use url::Url;

use crate::{
    errors::{OrgMoverError, OrgMoverErrorKind},
    platform::PlatformType,
};

/// Status written for successful rows
pub const SUCCESS_STATUS: &str = "Success";

/// Status written for rows that failed before or after the HTTP call
pub const ERROR_STATUS: &str = "Error";

/// Status code returned when writing to an archived repository
pub const ARCHIVE_STATUS_CODE: u16 = 403;

/// Message returned when writing to an archived repository
pub const ARCHIVE_ERROR_MESSAGE: &str = "Repository was archived so is read-only.";

/// Message of a 422 answer
pub const VALIDATION_FAILED: &str = "Validation Failed";

/// Status used when no HTTP answer was received
const TRANSPORT_ERROR_STATUS: u16 = 500;

/// Number of retries after the first attempt
const MAX_RETRIES: u32 = 3;

/// Base delay of the exponential backoff
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Client bound to one API and one token
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Reqwest client
    client: reqwest::Client,

    /// Token sent as bearer
    token: String,

    /// Accept header
    accept: &'static str,

    /// Extra headers sent on every request
    headers: Vec<(&'static str, &'static str)>,

    /// Platform the client talks to
    platform: PlatformType,
}

impl ApiClient {
    /// Create a new client
    /// # Errors
    /// Error if the TLS backend can't be initialised
    pub fn new(
        platform: PlatformType,
        token: String,
        accept: &'static str,
        allow_untrusted_ssl_certificates: bool,
    ) -> Result<Self, OrgMoverError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(allow_untrusted_ssl_certificates)
            .build()?;
        Ok(Self {
            client,
            token,
            accept,
            headers: vec![],
            platform,
        })
    }

    /// Add a header sent on every request
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Send a request, retrying transport errors and idempotent 5xx answers
    async fn send(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, String), reqwest::Error> {
        let mut attempt = 0;
        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .header(AUTHORIZATION, format!("Bearer {}", self.token))
                .header(ACCEPT, self.accept);
            for (name, value) in &self.headers {
                request = request.header(*name, *value);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            debug!("{method} {url}");
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() && is_idempotent(method) && attempt < MAX_RETRIES {
                        let delay = retry_delay(attempt);
                        warn!("{method} {url} answered {status}, retrying in {delay:?}");
                        sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    let text = response.text().await?;
                    return Ok((status, text));
                }
                Err(e) if attempt < MAX_RETRIES => {
                    let delay = retry_delay(attempt);
                    warn!("{method} {url} failed ({e}), retrying in {delay:?}");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a request and fold any failure into the response
    pub async fn request(&self, method: Method, url: &str, body: Option<Value>) -> ApiResponse {
        match self.send(&method, url, body.as_ref()).await {
            Ok((status, text)) => ApiResponse::read(status, &text),
            Err(e) => {
                warn!("{method} {url}: {e}");
                ApiResponse {
                    status: TRANSPORT_ERROR_STATUS,
                    status_text: e.to_string(),
                    error_message: e.to_string(),
                    data: Value::Null,
                }
            }
        }
    }

    /// GET a url and decode its body
    /// # Errors
    /// Error if the request fails or the body doesn't match `T`
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, OrgMoverError> {
        let response = self.request(Method::GET, url, None).await;
        response.json(self.platform)
    }

    /// POST a GraphQL query and decode its `data`
    /// # Errors
    /// Error if the request fails or the answer carries GraphQL errors
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, OrgMoverError> {
        let body = json!({ "query": query, "variables": variables });
        let response = self.request(Method::POST, url, Some(body)).await;
        if response.failed() {
            return Err(OrgMoverError::new(OrgMoverErrorKind::GraphQl)
                .with_platform(self.platform)
                .with_text(&response.describe()));
        }
        let answer: GraphQlResponse<T> = serde_json::from_value(response.data)?;
        if let Some(error) = answer.errors.first() {
            return Err(OrgMoverError::new(OrgMoverErrorKind::GraphQl)
                .with_platform(self.platform)
                .with_text(&error.message));
        }
        answer.data.ok_or_else(|| {
            OrgMoverError::new(OrgMoverErrorKind::GraphQl)
                .with_platform(self.platform)
                .with_text("Empty GraphQL answer")
        })
    }
}

/// Whether a request can be replayed without side effects
pub(crate) fn is_idempotent(method: &Method) -> bool {
    [
        Method::GET,
        Method::HEAD,
        Method::OPTIONS,
        Method::PUT,
        Method::DELETE,
    ]
    .contains(method)
}

/// Exponential backoff with up to 20% jitter
pub(crate) fn retry_delay(attempt: u32) -> Duration {
    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
    let jitter = rand::thread_rng().gen_range(0.0..=0.2);
    delay + delay.mul_f64(jitter)
}

/// Url with query parameters
/// # Errors
/// Error if the base url is invalid
pub(crate) fn with_query<K, V>(base: &str, params: &[(K, V)]) -> Result<String, OrgMoverError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let url = Url::parse_with_params(
        base,
        params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())),
    )
    .map_err(|e| {
        OrgMoverError::new(OrgMoverErrorKind::Input).with_text(&format!("Invalid url '{base}': {e}"))
    })?;
    Ok(url.to_string())
}

/// Answer of an API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status, 500 if no answer was received
    pub status: u16,

    /// Reason phrase or transport error
    pub status_text: String,

    /// `message` of an error body
    pub error_message: String,

    /// Decoded body
    pub data: Value,
}

impl ApiResponse {
    /// Build the response from a status and a raw body
    pub(crate) fn read(status: StatusCode, text: &str) -> Self {
        let data: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        };
        if status.is_success() {
            return Self {
                status: status.as_u16(),
                status_text: String::new(),
                error_message: String::new(),
                data,
            };
        }
        let error_message = match data.get("message") {
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => match &data {
                Value::String(text) => text.clone(),
                _ => String::new(),
            },
        };
        Self {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            error_message,
            data,
        }
    }

    /// Whether the call succeeded
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the call failed
    pub fn failed(&self) -> bool {
        !self.is_success()
    }

    /// Whether the call was refused because the repository is archived
    pub fn is_archived_error(&self) -> bool {
        self.status == ARCHIVE_STATUS_CODE && self.error_message == ARCHIVE_ERROR_MESSAGE
    }

    /// `status statusText: errorMessage`
    pub fn describe(&self) -> String {
        format!("{} {}: {}", self.status, self.status_text, self.error_message)
    }

    /// Decode the body
    /// # Errors
    /// Error if the call failed or the body doesn't match `T`
    pub fn json<T: DeserializeOwned>(self, platform: PlatformType) -> Result<T, OrgMoverError> {
        if self.failed() {
            return Err(OrgMoverError::new(OrgMoverErrorKind::Api)
                .with_platform(platform)
                .with_text(&self.describe()));
        }
        Ok(serde_json::from_value(self.data)?)
    }

    /// Status triple written to status files
    pub fn outcome(&self) -> Outcome {
        if self.is_success() {
            Outcome::success()
        } else {
            Outcome {
                status: self.status.to_string(),
                status_text: self.status_text.clone(),
                error_message: self.error_message.clone(),
            }
        }
    }
}

/// Result of one row of a write command
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// `Success` or the HTTP status
    pub status: String,

    /// Reason phrase
    pub status_text: String,

    /// Error message of the API
    pub error_message: String,
}

impl Outcome {
    /// Successful outcome
    pub fn success() -> Self {
        Self {
            status: SUCCESS_STATUS.to_string(),
            ..Default::default()
        }
    }

    /// Whether the outcome is a success
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }
}

impl From<&OrgMoverError> for Outcome {
    fn from(error: &OrgMoverError) -> Self {
        Self {
            status: ERROR_STATUS.to_string(),
            status_text: String::new(),
            error_message: error.to_string(),
        }
    }
}

/// GraphQL answer envelope
#[derive(Deserialize, Debug)]
struct GraphQlResponse<T> {
    /// Data of the answer
    data: Option<T>,

    /// Errors of the answer
    #[serde(default = "Vec::new")]
    errors: Vec<GraphQlError>,
}

/// One GraphQL error
#[derive(Deserialize, Debug)]
struct GraphQlError {
    /// Error message
    message: String,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_server::TestServer;

    fn client() -> ApiClient {
        ApiClient::new(PlatformType::Github, "token".into(), "application/json", false).unwrap()
    }

    #[tokio::test]
    async fn post_is_not_replayed_on_server_error() {
        let server = TestServer::start(vec![
            (500, json!({ "message": "Server Error" })),
            (201, json!({ "id": 1 })),
        ])
        .await;
        let url = format!("{}/orgs/acme/teams", server.url());
        let response = client()
            .request(Method::POST, &url, Some(json!({ "name": "dev" })))
            .await;
        assert_eq!(response.status, 500);
        assert_eq!(response.error_message, "Server Error");
        assert_eq!(server.calls(), vec!["POST /orgs/acme/teams"]);
        assert_eq!(server.received()[0].body, json!({ "name": "dev" }));
    }

    #[tokio::test]
    async fn get_is_retried_on_server_error() {
        let server = TestServer::start(vec![
            (502, Value::Null),
            (503, Value::Null),
            (200, json!({ "id": 7 })),
        ])
        .await;
        let url = format!("{}/orgs/acme", server.url());
        let response = client().request(Method::GET, &url, None).await;
        assert!(response.is_success());
        assert_eq!(response.data["id"], 7);
        assert_eq!(server.calls(), vec!["GET /orgs/acme"; 3]);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let server = TestServer::start(vec![(500, Value::Null); 5]).await;
        let url = format!("{}/orgs/acme", server.url());
        let response = client().request(Method::DELETE, &url, None).await;
        assert_eq!(response.status, 500);
        assert_eq!(server.received().len(), 1 + MAX_RETRIES as usize);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = TestServer::start(vec![(404, json!({ "message": "Not Found" }))]).await;
        let url = format!("{}/repos/acme/api", server.url());
        let response = client().request(Method::GET, &url, None).await;
        assert_eq!(response.outcome().status, "404");
        assert_eq!(server.received().len(), 1);
    }

    #[test]
    fn success_keeps_data() {
        let response = ApiResponse::read(StatusCode::OK, r#"{"id": 7}"#);
        assert!(response.is_success());
        assert_eq!(response.data["id"], 7);
        assert_eq!(response.outcome(), Outcome::success());
    }

    #[test]
    fn no_content_is_success() {
        let response = ApiResponse::read(StatusCode::NO_CONTENT, "");
        assert!(response.is_success());
        assert_eq!(response.data, Value::Null);
        assert!(response.outcome().is_success());
    }

    #[test]
    fn error_keeps_message() {
        let response = ApiResponse::read(
            StatusCode::FORBIDDEN,
            r#"{"message": "Repository was archived so is read-only.", "documentation_url": "x"}"#,
        );
        assert!(response.failed());
        assert!(response.is_archived_error());
        let outcome = response.outcome();
        assert_eq!(outcome.status, "403");
        assert_eq!(outcome.status_text, "Forbidden");
        assert_eq!(outcome.error_message, ARCHIVE_ERROR_MESSAGE);
    }

    #[test]
    fn error_without_json_body() {
        let response = ApiResponse::read(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(response.error_message, "upstream down");
        assert_eq!(response.describe(), "502 Bad Gateway: upstream down");
    }

    #[test]
    fn json_fails_on_error_status() {
        let response = ApiResponse::read(StatusCode::NOT_FOUND, r#"{"message": "Not Found"}"#);
        let result: Result<Value, _> = response.json(PlatformType::Github);
        let error = result.unwrap_err();
        assert_eq!(error.kind(), &OrgMoverErrorKind::Api);
        assert_eq!(error.to_string(), "Api (github): 404 Not Found: Not Found");
    }

    #[test]
    fn errors_become_failed_outcomes() {
        let outcome = Outcome::from(&OrgMoverError::from("Team 'dev' not found"));
        assert!(!outcome.is_success());
        assert_eq!(outcome.status, ERROR_STATUS);
        assert_eq!(outcome.error_message, "Custom: Team 'dev' not found");
    }

    #[test]
    fn retry_delay_grows_with_jitter() {
        for attempt in 0..3 {
            let base = RETRY_BASE_DELAY * 2u32.pow(attempt);
            let delay = retry_delay(attempt);
            assert!(delay >= base);
            assert!(delay <= base.mul_f64(1.2) + Duration::from_millis(1));
        }
    }

    #[test]
    fn only_idempotent_methods_are_retried() {
        assert!(is_idempotent(&Method::GET));
        assert!(is_idempotent(&Method::PUT));
        assert!(is_idempotent(&Method::DELETE));
        assert!(!is_idempotent(&Method::POST));
        assert!(!is_idempotent(&Method::PATCH));
    }

    #[test]
    fn query_is_encoded() {
        let url = with_query(
            "https://gitlab.example.com/api/v4/projects",
            &[("order_by", "id"), ("search", "a b")],
        )
        .unwrap();
        assert_eq!(
            url,
            "https://gitlab.example.com/api/v4/projects?order_by=id&search=a+b"
        );
    }

    #[test]
    fn graphql_errors_are_read() {
        let answer: GraphQlResponse<Value> = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "Could not resolve to an Organization" }]
        }))
        .unwrap();
        assert_eq!(
            answer.errors[0].message,
            "Could not resolve to an Organization"
        );
        assert!(answer.data.is_none());
    }
}
