//! Entry point bundling a shared connection with cluster-level helpers.

use crate::api::ApiClient;
use crate::connection::Connection;
use crate::context::{RequestContext, RequestOptions};
use datera_core::config::ConnectionConfig;
use datera_core::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

const SYSTEM_PATH: &str = "system";
const STORAGE_NODES_PATH: &str = "storage_nodes";
const SW_VERSION_FIELD: &str = "sw_version";

/// Handle on one Datera cluster.
#[derive(Debug)]
pub struct Sdk<C: ApiClient = Connection> {
    client: Arc<C>,
}

impl<C: ApiClient> Clone for Sdk<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl Sdk<Connection> {
    /// Connect using the given configuration.
    ///
    /// No request is sent until the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be built.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        Ok(Self::with_client(Arc::new(Connection::from_config(config)?)))
    }
}

impl<C: ApiClient> Sdk<C> {
    /// Wrap an existing client.
    #[must_use]
    pub fn with_client(client: Arc<C>) -> Self {
        Self { client }
    }

    /// The shared client.
    #[must_use]
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// A context with a fresh trace id.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn new_context(&self) -> RequestContext {
        RequestContext::new()
    }

    /// Software version running on the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response lacks
    /// `sw_version`.
    pub async fn software_version(&self, ctx: &RequestContext) -> Result<String> {
        let ctx = ctx.clone().quiet();
        let system = self
            .client
            .get(&ctx, SYSTEM_PATH, &RequestOptions::new())
            .await?;

        system
            .field(SW_VERSION_FIELD)
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| Error::ParseError("system response has no sw_version".to_string()))
    }

    /// List storage nodes to confirm the cluster answers with a working
    /// session. Returns the number of nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the node listing fails.
    pub async fn health_check(&self, ctx: &RequestContext) -> Result<usize> {
        let ctx = ctx.clone().quiet();
        let nodes = self
            .client
            .get_list(&ctx, STORAGE_NODES_PATH, &RequestOptions::new())
            .await?;

        for node in &nodes.data {
            let uuid = node.get("uuid").and_then(Value::as_str).unwrap_or_default();
            debug!(trace_id = %ctx.trace_id(), uuid, "Found storage node");
        }
        info!(
            trace_id = %ctx.trace_id(),
            tenant = %nodes.tenant,
            nodes = nodes.data.len(),
            "Connected to Datera cluster"
        );

        Ok(nodes.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApiClient;
    use datera_core::{ApiErrorResponse, ApiListOuter, ApiOuter};
    use serde_json::json;

    fn system(data: Value) -> ApiOuter {
        ApiOuter {
            data: data.as_object().cloned().unwrap(),
            ..ApiOuter::default()
        }
    }

    #[tokio::test]
    async fn software_version_reads_system() {
        let mut mock = MockApiClient::new();
        mock.expect_get()
            .withf(|ctx, path, _| ctx.is_quiet() && path == SYSTEM_PATH)
            .times(1)
            .returning(|_, _, _| Ok(system(json!({"name": "cluster-a", "sw_version": "3.3.5"}))));

        let sdk = Sdk::with_client(Arc::new(mock));
        let version = sdk.software_version(&RequestContext::new()).await.unwrap();

        assert_eq!(version, "3.3.5");
    }

    #[tokio::test]
    async fn software_version_missing_field() {
        let mut mock = MockApiClient::new();
        mock.expect_get()
            .returning(|_, _, _| Ok(system(json!({"name": "cluster-a"}))));

        let sdk = Sdk::with_client(Arc::new(mock));
        let result = sdk.software_version(&RequestContext::new()).await;

        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[tokio::test]
    async fn software_version_keeps_trace_id() {
        let mut mock = MockApiClient::new();
        mock.expect_get()
            .withf(|ctx, _, _| ctx.trace_id() == "trace-42")
            .returning(|_, _, _| Ok(system(json!({"sw_version": "3.3.5"}))));

        let sdk = Sdk::with_client(Arc::new(mock));
        let ctx = RequestContext::new().with_trace_id("trace-42");

        assert!(sdk.software_version(&ctx).await.is_ok());
        assert!(!ctx.is_quiet());
    }

    #[tokio::test]
    async fn health_check_counts_nodes() {
        let mut mock = MockApiClient::new();
        mock.expect_get_list()
            .withf(|ctx, path, _| ctx.is_quiet() && path == STORAGE_NODES_PATH)
            .times(1)
            .returning(|_, _, _| {
                Ok(ApiListOuter {
                    data: vec![json!({"uuid": "a"}), json!({"uuid": "b"}), json!({"uuid": "c"})],
                    tenant: "/root".to_string(),
                    ..ApiListOuter::default()
                })
            });

        let sdk = Sdk::with_client(Arc::new(mock));
        assert_eq!(sdk.health_check(&RequestContext::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn health_check_propagates_errors() {
        let mut mock = MockApiClient::new();
        mock.expect_get_list()
            .returning(|_, _, _| Err(Error::api(ApiErrorResponse::from_status(401))));

        let sdk = Sdk::with_client(Arc::new(mock));
        let err = sdk.health_check(&RequestContext::new()).await.unwrap_err();

        assert_eq!(err.http_status(), Some(401));
    }

    #[test]
    fn new_context_has_fresh_trace_id() {
        let sdk = Sdk::with_client(Arc::new(MockApiClient::new()));
        let first = sdk.new_context();
        let second = sdk.new_context();

        assert!(!first.trace_id().is_empty());
        assert_ne!(first.trace_id(), second.trace_id());
        assert!(!first.is_quiet());
    }

    #[test]
    fn new_builds_connection() {
        let config = ConnectionConfig::new("172.16.1.10", "admin", "password").unwrap();
        let sdk = Sdk::new(config).unwrap();
        assert_eq!(sdk.client().tenant(), "/root");
    }
}
