//! Session-aware connection to a Datera cluster.
//!
//! A [`Connection`] owns the HTTP transport and the session token. Every verb
//! logs in on first use, replays once after a fresh login when the token has
//! expired, retries transient failures and (for lists) follows pagination.

use crate::classify::translate_errors;
use crate::context::{RequestContext, RequestOptions};
use crate::paginate::collect_pages;
use crate::retry::retry_transient;
use crate::route::{canonicalize_route, redact_payload, RequestDescriptor, DRIVER_HEADER};
use crate::session::Session;
use datera_core::client::{ClientConfig, RetryPolicy};
use datera_core::config::ConnectionConfig;
use datera_core::types::{ApiLogin, ApiVersions, LoginRequest};
use datera_core::{ApiListOuter, ApiOuter, Error, Outcome, Result};
use reqwest::header::ACCEPT;
use reqwest::{Client, ClientBuilder, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};
use url::Url;

const USER_AGENT: &str = concat!("datera-sdk/", env!("CARGO_PKG_VERSION"));
const DEFAULT_DRIVER: &str = concat!("Rust-SDK-", env!("CARGO_PKG_VERSION"));

/// Path of the login endpoint below the versioned base URL.
pub const LOGIN_PATH: &str = "login";
/// Path of the version listing at the host root.
pub const API_VERSIONS_PATH: &str = "/api_versions";

/// Builder for [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    config: ConnectionConfig,
    http_config: ClientConfig,
    base_url: Option<Url>,
    http: Option<Client>,
    driver: String,
}

impl ConnectionBuilder {
    /// Create a new builder from a [`ConnectionConfig`].
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        let http_config = ClientConfig::new()
            .with_timeout(config.request_timeout())
            .with_retry_policy(config.retry_policy());

        Self {
            config,
            http_config,
            base_url: None,
            http: None,
            driver: DEFAULT_DRIVER.to_string(),
        }
    }

    /// Override the HTTP client configuration used when building the client.
    #[must_use]
    pub fn with_http_config(mut self, http_config: ClientConfig) -> Self {
        self.http_config = http_config;
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.http_config.retry_policy = policy;
        self
    }

    /// Use a full base URL (e.g. behind a proxy) instead of the one derived
    /// from the hostname.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if `url` does not parse.
    pub fn with_base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Use a pre-built HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Override the `Datera-Driver` header value.
    #[must_use]
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    /// Finalise the builder and create the [`Connection`].
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn build(self) -> Result<Connection> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => self.config.base_url()?,
        };

        let http = match self.http {
            Some(http) => http,
            None => {
                let mut builder = ClientBuilder::new()
                    .user_agent(USER_AGENT)
                    .timeout(self.http_config.timeout)
                    .pool_idle_timeout(self.http_config.pool_idle_timeout)
                    .pool_max_idle_per_host(self.http_config.pool_max_idle_per_host)
                    .connect_timeout(self.http_config.connect_timeout);

                if !self.config.tls_verify {
                    warn!("TLS verification disabled for Datera connection");
                    builder = builder.danger_accept_invalid_certs(true);
                }

                builder.build().map_err(|err| {
                    Error::ConfigError(format!("Failed to build Datera HTTP client: {err}"))
                })?
            }
        };

        let ConnectionConfig {
            username,
            password,
            api_version,
            tenant,
            ldap_server,
            ..
        } = self.config;

        Ok(Connection {
            http,
            base_url,
            api_version,
            tenant,
            username,
            password: SecretString::from(password),
            ldap_server,
            driver: self.driver,
            request_timeout: self.http_config.timeout,
            retry_policy: self.http_config.retry_policy,
            session: Session::new(),
        })
    }
}

/// Connection to the management API of one Datera cluster.
///
/// Share it between tasks with `Arc<Connection>`; the session token is
/// guarded internally.
#[derive(Debug)]
pub struct Connection {
    http: Client,
    base_url: Url,
    api_version: String,
    tenant: String,
    username: String,
    password: SecretString,
    ldap_server: Option<String>,
    driver: String,
    request_timeout: Duration,
    retry_policy: RetryPolicy,
    session: Session,
}

impl Connection {
    /// Construct a connection directly from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not produce a usable client.
    pub fn from_config(config: ConnectionConfig) -> Result<Self> {
        ConnectionBuilder::new(config).build()
    }

    /// Start a builder pre-populated with the provided configuration.
    #[must_use]
    pub fn builder(config: ConnectionConfig) -> ConnectionBuilder {
        ConnectionBuilder::new(config)
    }

    /// Versioned base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Configured API version.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Tenant requests are made under.
    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Value sent in the `Datera-Driver` header.
    #[must_use]
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Upper bound for a single HTTP exchange.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Retry policy applied to every call.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns true if a session token is held.
    pub async fn has_logged_in(&self) -> bool {
        self.session.has_logged_in().await
    }

    /// Log in unless a session token is already held.
    ///
    /// # Errors
    ///
    /// Returns the API error for rejected credentials, or
    /// [`Error::RetryTimeout`] if the appliance stays unavailable.
    pub async fn login(&self, ctx: &RequestContext) -> Result<()> {
        self.login_token(ctx).await.map(drop)
    }

    /// Forget the session token. No request is sent.
    pub async fn logout(&self) {
        self.session.clear().await;
    }

    /// Fetch a single resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn get(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiOuter> {
        self.call(ctx, self.request(Method::GET, path, options))
            .await
    }

    /// Fetch a collection, following pagination unless `limit` or `offset` is
    /// set.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails after retries.
    pub async fn get_list(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiListOuter> {
        collect_pages(options, |page| async move {
            self.call(ctx, self.request(Method::GET, path, &page)).await
        })
        .await
    }

    /// Update a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn put(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiOuter> {
        self.call(ctx, self.request(Method::PUT, path, options))
            .await
    }

    /// Create a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn post(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiOuter> {
        self.call(ctx, self.request(Method::POST, path, options))
            .await
    }

    /// Delete a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiOuter> {
        self.call(ctx, self.request(Method::DELETE, path, options))
            .await
    }

    /// API versions supported by the appliance.
    ///
    /// Sent once, without a session token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    pub async fn api_versions(&self, ctx: &RequestContext) -> Result<Vec<String>> {
        let mut url = self.base_url.clone();
        url.set_path(API_VERSIONS_PATH);
        let request = RequestDescriptor::for_url(Method::GET, url, &RequestOptions::new());
        let versions: ApiVersions = self.send_once(ctx, &request).await?;
        Ok(versions.api_versions)
    }

    fn request(&self, method: Method, path: &str, options: &RequestOptions) -> RequestDescriptor {
        RequestDescriptor::new(method, &self.base_url, path, options)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        request: RequestDescriptor,
    ) -> Result<T> {
        retry_transient(&self.retry_policy, || {
            self.attempt_with_auth(ctx, &request, true)
        })
        .await
    }

    /// One authenticated attempt, replayed once after a fresh login if the
    /// token was rejected and `allow_reauth` is set.
    async fn attempt_with_auth<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        request: &RequestDescriptor,
        mut allow_reauth: bool,
    ) -> Result<T> {
        loop {
            let token = self.login_token(ctx).await?;
            let authenticated = request.authenticated(&self.tenant, &token);

            match self.send_once(ctx, &authenticated).await {
                Err(err) if allow_reauth && err.outcome() == Some(Outcome::PermissionDenied) => {
                    debug!(
                        trace_id = %ctx.trace_id(),
                        request_id = %request.request_id,
                        outcome = %Outcome::RetryAfterLogin,
                        "Session token rejected, logging in again"
                    );
                    self.session.invalidate(&token).await;
                    allow_reauth = false;
                }
                Err(err) if err.outcome() == Some(Outcome::PermissionDenied) => {
                    error!(
                        trace_id = %ctx.trace_id(),
                        request_id = %request.request_id,
                        error = %err,
                        "Failed to re-authenticate with Datera"
                    );
                    return Err(err);
                }
                result => return result,
            }
        }
    }

    /// Current token, logging in first if none is held.
    async fn login_token(&self, ctx: &RequestContext) -> Result<String> {
        if let Some(token) = self.session.token().await {
            return Ok(token);
        }

        let mut token = self.session.lock().await;
        if let Some(current) = token.as_ref() {
            return Ok(current.expose_secret().to_string());
        }

        let body = LoginRequest {
            name: self.username.clone(),
            password: self.password.expose_secret().to_string(),
            remote_server: self.ldap_server.clone(),
        };
        let options = RequestOptions::new().with_body(&body)?;
        let request = self
            .request(Method::PUT, LOGIN_PATH, &options)
            .sensitive();

        let login: ApiLogin =
            match retry_transient(&self.retry_policy, || self.send_once(ctx, &request)).await {
                Ok(login) => login,
                Err(err) => {
                    if err.outcome() == Some(Outcome::PermissionDenied) {
                        error!(
                            trace_id = %ctx.trace_id(),
                            user = %self.username,
                            error = %err,
                            "Datera login rejected"
                        );
                    }
                    return Err(err);
                }
            };
        if login.key.is_empty() {
            return Err(Error::ParseError(
                "Login response did not contain a session key".to_string(),
            ));
        }

        debug!(
            trace_id = %ctx.trace_id(),
            user = %self.username,
            tenant = %self.tenant,
            "Logged in to Datera"
        );
        *token = Some(SecretString::from(login.key.clone()));
        Ok(login.key)
    }

    /// Exactly one HTTP exchange, without retries or session handling.
    async fn send_once<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        request: &RequestDescriptor,
    ) -> Result<T> {
        let route = canonicalize_route(request.url.path(), self.base_url.path());

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .header(ACCEPT, "application/json")
            .header(DRIVER_HEADER, self.driver.as_str());
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let timeout = ctx
            .remaining()?
            .map_or(self.request_timeout, |remaining| {
                remaining.min(self.request_timeout)
            });
        builder = builder.timeout(timeout);

        debug!(
            trace_id = %ctx.trace_id(),
            request_id = %request.request_id,
            method = %request.method,
            url = %request.url,
            route = %route,
            params = ?request.params,
            headers = ?request.logged_headers(),
            payload = %request.logged_payload(ctx.is_quiet()),
            "Sending Datera request"
        );

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                let err = Error::from(err);
                error!(
                    trace_id = %ctx.trace_id(),
                    request_id = %request.request_id,
                    route = %route,
                    error = %err,
                    "Datera request failed"
                );
                return Err(err);
            }
        };
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(
            trace_id = %ctx.trace_id(),
            request_id = %request.request_id,
            route = %route,
            status,
            elapsed = ?started.elapsed(),
            payload = %redact_payload(&body, request.sensitive, ctx.is_quiet()),
            "Received Datera response"
        );

        if let Some((response, outcome)) = translate_errors(status, &body) {
            if outcome != Some(Outcome::PermissionDenied) {
                error!(
                    trace_id = %ctx.trace_id(),
                    request_id = %request.request_id,
                    route = %route,
                    "Datera API error: {}",
                    response.pretty()
                );
            }
            return Err(Error::api(response));
        }

        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body).map_err(|err| {
            Error::ParseError(format!("Failed to parse Datera response for `{route}`: {err}"))
        })
    }
}
