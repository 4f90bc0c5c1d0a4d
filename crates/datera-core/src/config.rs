//! Configuration structures for Datera connections.
//!
//! Discovering these values (environment, config files) is left to the caller;
//! this module only describes and validates them.

use crate::client::{
    RetryPolicy, DEFAULT_API_VERSION, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_TIMEOUT,
    DEFAULT_TENANT, INSECURE_PORT, SECURE_PORT,
};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Settings for a connection to one Datera cluster.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct ConnectionConfig {
    /// Management hostname or IP address
    #[validate(length(min = 1))]
    pub hostname: String,

    /// Account name
    #[validate(length(min = 1))]
    pub username: String,

    /// Account password
    #[serde(skip_serializing, default)]
    pub password: String,

    /// API version (e.g. `2.2`)
    #[validate(length(min = 1))]
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Tenant path requests are made under
    #[serde(default = "default_tenant")]
    pub tenant: String,

    /// LDAP server to authenticate against, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ldap_server: Option<String>,

    /// Use HTTPS (port 7718) instead of HTTP (port 7717)
    #[serde(default = "default_secure")]
    pub secure: bool,

    /// Whether to verify TLS certificates
    #[serde(default)]
    pub tls_verify: bool,

    /// Timeout for a single HTTP request in seconds
    #[validate(range(min = 1, max = 600))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Wall-clock budget for retrying one request in seconds
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_retry_timeout_secs")]
    pub retry_timeout_secs: u64,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_tenant() -> String {
    DEFAULT_TENANT.to_string()
}

const fn default_secure() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

const fn default_retry_timeout_secs() -> u64 {
    DEFAULT_RETRY_TIMEOUT
}

impl ConnectionConfig {
    /// Create a new configuration with required parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, Error> {
        let config = Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            api_version: default_api_version(),
            tenant: default_tenant(),
            ldap_server: None,
            secure: default_secure(),
            tls_verify: false,
            request_timeout_secs: default_request_timeout_secs(),
            retry_timeout_secs: default_retry_timeout_secs(),
        };

        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Set the API version.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set the tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    /// Authenticate against an LDAP server.
    #[must_use]
    pub fn with_ldap_server(mut self, server: impl Into<String>) -> Self {
        self.ldap_server = Some(server.into());
        self
    }

    /// Choose HTTPS or HTTP.
    #[must_use]
    pub const fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set the retry budget in seconds.
    #[must_use]
    pub const fn with_retry_timeout(mut self, seconds: u64) -> Self {
        self.retry_timeout_secs = seconds;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy derived from the configured budget.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new().with_timeout(Duration::from_secs(self.retry_timeout_secs))
    }

    /// Build the API base URL: `https://{host}:7718/v{version}` or
    /// `http://{host}:7717/v{version}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the hostname does not form a valid URL.
    pub fn base_url(&self) -> Result<Url, Error> {
        let host = self.hostname.trim_matches('/');
        let (scheme, port) = if self.secure {
            ("https", SECURE_PORT)
        } else {
            ("http", INSECURE_PORT)
        };
        Url::parse(&format!("{scheme}://{host}:{port}/v{}", self.api_version))
            .map_err(|e| Error::ConfigError(format!("Invalid management host `{host}`: {e}")))
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"********")
            .field("api_version", &self.api_version)
            .field("tenant", &self.tenant)
            .field("ldap_server", &self.ldap_server)
            .field("secure", &self.secure)
            .field("tls_verify", &self.tls_verify)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("retry_timeout_secs", &self.retry_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConnectionConfig {
        ConnectionConfig::new("172.16.1.10", "admin", "password").unwrap()
    }

    #[test]
    fn test_connection_config_new() {
        let config = config();
        assert_eq!(config.api_version, "2.2");
        assert_eq!(config.tenant, "/root");
        assert!(config.secure);
        assert!(!config.tls_verify);
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.retry_timeout_secs, 300);
    }

    #[test]
    fn test_connection_config_requires_host_and_user() {
        assert!(ConnectionConfig::new("", "admin", "password").is_err());
        assert!(ConnectionConfig::new("172.16.1.10", "", "password").is_err());
    }

    #[test]
    fn test_connection_config_builder() {
        let config = config()
            .with_api_version("2.3")
            .with_tenant("/root/t1")
            .with_ldap_server("corp-ldap")
            .with_secure(false)
            .with_tls_verify(true)
            .with_request_timeout(5)
            .with_retry_timeout(30);

        assert_eq!(config.api_version, "2.3");
        assert_eq!(config.tenant, "/root/t1");
        assert_eq!(config.ldap_server.as_deref(), Some("corp-ldap"));
        assert!(!config.secure);
        assert!(config.tls_verify);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.retry_policy().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_base_url_secure() {
        let url = config().base_url().unwrap();
        assert_eq!(url.as_str(), "https://172.16.1.10:7718/v2.2");
    }

    #[test]
    fn test_base_url_insecure_trims_slashes() {
        let mut config = config().with_secure(false);
        config.hostname = "/mgmt.example.com/".to_string();
        let url = config.base_url().unwrap();
        assert_eq!(url.as_str(), "http://mgmt.example.com:7717/v2.2");
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("\"password\""));
        assert!(rendered.contains("********"));
    }

    #[test]
    fn test_serialization_skips_password() {
        let json = serde_json::to_value(config()).unwrap();
        assert!(json.get("password").is_none());

        let restored: ConnectionConfig = serde_json::from_value(json).unwrap();
        assert_eq!(restored.hostname, "172.16.1.10");
        assert!(restored.password.is_empty());
        assert_eq!(restored.api_version, "2.2");
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let restored: ConnectionConfig = serde_json::from_value(serde_json::json!({
            "hostname": "10.0.0.5",
            "username": "admin",
            "password": "secret"
        }))
        .unwrap();

        assert!(restored.secure);
        assert!(!restored.tls_verify);
        assert_eq!(restored.tenant, "/root");
        assert_eq!(restored.retry_timeout_secs, 300);
    }

    #[test]
    fn test_config_validation_timeout_range() {
        let mut config = config();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.request_timeout_secs = 601;
        assert!(config.validate().is_err());

        config.request_timeout_secs = 60;
        assert!(config.validate().is_ok());

        config.retry_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
