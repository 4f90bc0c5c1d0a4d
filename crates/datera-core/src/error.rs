//! Error types for Datera API operations.
//!
//! This module provides the error taxonomy shared by every Datera client crate:
//! the structured error envelope returned by the management API, the outcome
//! classes that drive retry and re-authentication decisions, and the main
//! [`Error`] enum.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// HTTP status returned for malformed requests.
pub const INVALID_REQUEST: u16 = 400;
/// HTTP status returned when the session token is missing or expired.
pub const PERMISSION_DENIED: u16 = 401;
/// HTTP status returned when the appliance asks the client to come back later.
pub const RETRY_SERVER_ERROR: u16 = 503;

/// Error envelope returned by the Datera management API.
///
/// Every field is optional on the wire. [`ApiErrorResponse::http`] is always
/// populated by the client, falling back to the transport status code when the
/// body omits it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Symbolic error name (e.g. `NotFoundError`)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Numeric application error code
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub code: i64,
    /// HTTP status code
    #[serde(default, skip_serializing_if = "is_zero_u16")]
    pub http: u16,
    /// Human readable message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Server timestamp
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ts: String,
    /// API version that served the request
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Operation that failed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub op: String,
    /// Tenant the request was made under
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenant: String,
    /// Request path echoed back by the server
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Request parameters echoed back by the server
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    /// Connection details echoed back by the server
    #[serde(
        default,
        rename = "connInfo",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub conn_info: BTreeMap<String, String>,
    /// Client identifier
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    /// Client type
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_type: String,
    /// Server-side request identifier
    #[serde(default, rename = "api_req_id", skip_serializing_if = "is_zero_i64")]
    pub api_req_id: i64,
    /// Tenancy class of the caller
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenancy_class: String,
    /// Nested error strings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero_i64(value: &i64) -> bool {
    *value == 0
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero_u16(value: &u16) -> bool {
    *value == 0
}

impl ApiErrorResponse {
    /// Create an error envelope carrying only a status code.
    #[must_use]
    pub fn from_status(http: u16) -> Self {
        Self {
            http,
            ..Self::default()
        }
    }

    /// Outcome class derived from the HTTP status.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        Outcome::from_status(self.http)
    }

    /// Returns true if the server asked the client to retry later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.http == RETRY_SERVER_ERROR
    }

    /// Render the envelope as indented JSON for log output.
    #[must_use]
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

impl fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.http, self.name)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if !self.errors.is_empty() {
            write!(f, " [{}]", self.errors.join("; "))?;
        }
        Ok(())
    }
}

/// Outcome classes that drive retry and re-authentication policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// 400: the caller sent something the server rejected
    InvalidRequest,
    /// 401: the session token is missing or has expired
    PermissionDenied,
    /// 503: the server is busy and the request may be retried
    RetryableServerError,
    /// The transport could not reach the server (connection refused)
    ConnectionError,
    /// Internal signal that the request must be replayed after a fresh login
    RetryAfterLogin,
}

impl Outcome {
    /// Map an HTTP status code onto an outcome class.
    #[must_use]
    pub const fn from_status(status: u16) -> Option<Self> {
        match status {
            INVALID_REQUEST => Some(Self::InvalidRequest),
            PERMISSION_DENIED => Some(Self::PermissionDenied),
            RETRY_SERVER_ERROR => Some(Self::RetryableServerError),
            _ => None,
        }
    }

    /// Returns true if the retry loop should try again.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RetryableServerError | Self::ConnectionError)
    }

    /// Returns the outcome name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InvalidRequest => "InvalidRequest",
            Self::PermissionDenied => "PermissionDenied",
            Self::RetryableServerError => "Retry503",
            Self::ConnectionError => "ConnectionError",
            Self::RetryAfterLogin => "RetryRequestAfterLogin",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Main error type for Datera operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The server answered with an error envelope
    #[error("API error: {0}")]
    Api(Box<ApiErrorResponse>),

    /// The server refused the connection
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    /// The retry budget ran out before the request succeeded
    #[error("timeout reached before request completed successfully during retries")]
    RetryTimeout {
        /// Last error envelope observed while retrying
        last: Option<Box<ApiErrorResponse>>,
    },

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// A single request exceeded its deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Failed to decode a response body
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Invalid list or query parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

/// Specialized result type for Datera operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an error envelope.
    #[must_use]
    pub fn api(response: ApiErrorResponse) -> Self {
        Self::Api(Box::new(response))
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Api(_) => "API_ERROR",
            Self::ConnectionRefused(_) => "CONNECTION_REFUSED",
            Self::RetryTimeout { .. } => "RETRY_TIMEOUT",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::InvalidParams(_) => "INVALID_PARAMS",
        }
    }

    /// Outcome class of this error, if it has one.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Api(response) => response.outcome(),
            Self::ConnectionRefused(_) => Some(Outcome::ConnectionError),
            _ => None,
        }
    }

    /// The structured error envelope carried by this error, if any.
    ///
    /// `None` means the failure never reached the server's error semantics.
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiErrorResponse> {
        match self {
            Self::Api(response) => Some(response.as_ref()),
            Self::RetryTimeout { last } => last.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of the carried error envelope, if any.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        self.api_error().map(|response| response.http)
    }

    /// Returns true if the retry loop should try again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.outcome().is_some_and(Outcome::is_retryable)
    }
}

impl From<ApiErrorResponse> for Error {
    fn from(response: ApiErrorResponse) -> Self {
        Self::api(response)
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if is_connection_refused(&err) {
            Self::ConnectionRefused(error_chain(&err))
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::HttpError(error_chain(&err))
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}

/// Returns true if the error (or anything it wraps) is a refused connection.
fn is_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io) = source.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        if source.to_string().contains("onnection refused") {
            return true;
        }
        current = source.source();
    }
    false
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        message.push_str(": ");
        message.push_str(&source.to_string());
        current = source.source();
    }
    message
}
