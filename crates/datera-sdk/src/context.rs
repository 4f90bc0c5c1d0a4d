//! Request-scoped settings and caller-built request options.

use datera_core::params::{ListParams, ListRangeParams};
use datera_core::{Error, QueryMap, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Settings that travel with a single logical call (including its retries).
#[derive(Debug, Clone)]
pub struct RequestContext {
    trace_id: String,
    quiet: bool,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Create a context with a fresh trace id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            quiet: false,
            deadline: None,
        }
    }

    /// Use a caller supplied trace id.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    /// Mute request and response payloads in logs.
    #[must_use]
    pub const fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Abort the call once `timeout` has elapsed from now.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Abort the call at `deadline`.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Trace id shared by every request made for this call.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Returns true if payload logging is muted.
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Time left before the deadline.
    ///
    /// `None` when no deadline is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] once the deadline has passed.
    pub fn remaining(&self) -> Result<Option<Duration>> {
        match self.deadline {
            None => Ok(None),
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    Err(Error::Timeout(format!(
                        "deadline exceeded for trace {}",
                        self.trace_id
                    )))
                } else {
                    Ok(Some(left))
                }
            }
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Query parameters, body and headers supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Query parameters
    pub params: QueryMap,
    /// JSON body
    pub body: Option<Value>,
    /// Extra headers
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Merge list parameters into the query.
    #[must_use]
    pub fn with_list_params(mut self, params: &ListParams) -> Self {
        self.params.extend(params.to_map());
        self
    }

    /// Merge range parameters into the query.
    #[must_use]
    pub fn with_range_params(mut self, params: &ListRangeParams) -> Self {
        self.params.extend(params.to_map());
        self
    }

    /// Set a raw JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] if `body` cannot be serialized.
    pub fn with_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Add an extra header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_context_has_unique_trace_id() {
        let first = RequestContext::new();
        let second = RequestContext::new();
        assert_ne!(first.trace_id(), second.trace_id());
        assert!(!first.is_quiet());
        assert_eq!(first.remaining().unwrap(), None);
    }

    #[test]
    fn context_builder() {
        let ctx = RequestContext::new()
            .with_trace_id("trace-1")
            .quiet()
            .with_timeout(Duration::from_secs(30));

        assert_eq!(ctx.trace_id(), "trace-1");
        assert!(ctx.is_quiet());
        assert!(ctx.remaining().unwrap().is_some());
    }

    #[test]
    fn expired_deadline_is_a_timeout() {
        let ctx = RequestContext::new().with_deadline(Instant::now());
        assert!(matches!(ctx.remaining(), Err(Error::Timeout(_))));
    }

    #[test]
    fn options_merge_list_params() {
        let options = RequestOptions::new()
            .with_param("tenant_filter", "t1")
            .with_list_params(&ListParams::new().with_limit(10).with_sort("name"));

        assert_eq!(options.params.len(), 3);
        assert_eq!(options.params.get("limit").map(String::as_str), Some("10"));
        assert_eq!(
            options.params.get("tenant_filter").map(String::as_str),
            Some("t1")
        );
    }

    #[test]
    fn options_with_body() {
        #[derive(Serialize)]
        struct CreatePool {
            name: String,
        }

        let options = RequestOptions::new()
            .with_body(&CreatePool {
                name: "pool-1".into(),
            })
            .unwrap()
            .with_header("X-Request-Source", "unit-test");

        assert_eq!(options.body, Some(json!({"name": "pool-1"})));
        assert_eq!(options.headers.len(), 1);
    }
}
