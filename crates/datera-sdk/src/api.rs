//! Verb interface for code written against a Datera connection.

use crate::connection::Connection;
use crate::context::{RequestContext, RequestOptions};
use async_trait::async_trait;
use datera_core::{ApiListOuter, ApiOuter, Result};

/// HTTP verbs of the management API.
///
/// Resource wrappers take any `ApiClient`, so they can be exercised against a
/// mock in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Fetch a single resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn get(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiOuter>;

    /// Fetch every item of a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails.
    async fn get_list(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiListOuter>;

    /// Update a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn put(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiOuter>;

    /// Create a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn post(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiOuter>;

    /// Delete a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn delete(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiOuter>;
}

#[async_trait]
impl ApiClient for Connection {
    async fn get(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiOuter> {
        Connection::get(self, ctx, path, options).await
    }

    async fn get_list(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiListOuter> {
        Connection::get_list(self, ctx, path, options).await
    }

    async fn put(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiOuter> {
        Connection::put(self, ctx, path, options).await
    }

    async fn post(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiOuter> {
        Connection::post(self, ctx, path, options).await
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<ApiOuter> {
        Connection::delete(self, ctx, path, options).await
    }
}
