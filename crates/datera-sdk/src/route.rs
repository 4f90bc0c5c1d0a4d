//! Request descriptors, route handling and log redaction.

use crate::context::RequestOptions;
use datera_core::QueryMap;
use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

/// Header identifying the client library to the appliance.
pub const DRIVER_HEADER: &str = "Datera-Driver";
/// Header carrying the tenant path.
pub const TENANT_HEADER: &str = "tenant";
/// Header carrying the session token.
pub const AUTH_HEADER: &str = "Auth-Token";

/// Marker logged in place of credential-bearing payloads.
pub const REDACTED: &str = "********";
/// Marker logged in place of payloads of quiet calls.
pub const MUTED: &str = "<muted>";

/// Payloads mentioning any of these fields are never logged.
const CREDENTIAL_FIELDS: &[&str] = &["target_user_name", "secret", "password"];

/// Placeholder for variable path segments in canonical routes.
const ID_PLACEHOLDER: &str = ":id";

/// One outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// HTTP method
    pub method: Method,
    /// Full request URL (without query)
    pub url: Url,
    /// Query parameters
    pub params: QueryMap,
    /// JSON body
    pub body: Option<Value>,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Correlation id for this request
    pub request_id: Uuid,
    /// Body must never be logged
    pub sensitive: bool,
}

impl RequestDescriptor {
    /// Describe a request to `path` below `base`.
    #[must_use]
    pub fn new(method: Method, base: &Url, path: &str, options: &RequestOptions) -> Self {
        Self::for_url(method, join_route(base, path), options)
    }

    /// Describe a request to an absolute URL.
    #[must_use]
    pub fn for_url(method: Method, url: Url, options: &RequestOptions) -> Self {
        Self {
            method,
            url,
            params: options.params.clone(),
            body: options.body.clone(),
            headers: options.headers.clone(),
            request_id: Uuid::new_v4(),
            sensitive: false,
        }
    }

    /// Mark the body as sensitive.
    #[must_use]
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Set a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    /// Copy of this request carrying tenant and session token.
    #[must_use]
    pub fn authenticated(&self, tenant: &str, token: &str) -> Self {
        self.clone()
            .with_header(TENANT_HEADER, tenant)
            .with_header(AUTH_HEADER, token)
    }

    /// Body as it may appear in logs.
    #[must_use]
    pub fn logged_payload(&self, quiet: bool) -> String {
        let raw = self
            .body
            .as_ref()
            .map_or_else(String::new, Value::to_string);
        redact_payload(&raw, self.sensitive, quiet)
    }

    /// Headers as they may appear in logs.
    #[must_use]
    pub fn logged_headers(&self) -> BTreeMap<&str, &str> {
        self.headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case(AUTH_HEADER) {
                    (name.as_str(), REDACTED)
                } else {
                    (name.as_str(), value.as_str())
                }
            })
            .collect()
    }
}

/// Append `path` to the path of `base`, normalising slashes.
#[must_use]
pub fn join_route(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let tail = path.trim_matches('/');
    if !tail.is_empty() {
        let joined = format!("{}/{}", base.path().trim_end_matches('/'), tail);
        url.set_path(&joined);
    }
    url
}

/// Route relative to the base URL path with identifiers replaced, for log
/// aggregation (`/v2.2/app_instances/<uuid>` below `/v2.2` becomes
/// `/app_instances/:id`).
///
/// Paths outside `base_path` keep all of their segments.
#[must_use]
pub fn canonicalize_route(path: &str, base_path: &str) -> String {
    let prefix = base_path.trim_end_matches('/');
    let relative = match path.strip_prefix(prefix) {
        Some(rest) if !prefix.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
        _ => path,
    };
    let segments: Vec<&str> = relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if is_identifier(segment) {
                ID_PLACEHOLDER
            } else {
                segment
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}

fn is_identifier(segment: &str) -> bool {
    Uuid::parse_str(segment).is_ok() || segment.bytes().all(|b| b.is_ascii_digit())
}

/// Payload text safe to log.
///
/// Quiet calls log [`MUTED`]; sensitive payloads and payloads mentioning a
/// credential field log [`REDACTED`].
#[must_use]
pub fn redact_payload(payload: &str, sensitive: bool, quiet: bool) -> String {
    if quiet {
        MUTED.to_string()
    } else if sensitive || CREDENTIAL_FIELDS.iter().any(|field| payload.contains(field)) {
        REDACTED.to_string()
    } else {
        payload.to_string()
    }
}
