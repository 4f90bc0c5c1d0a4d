//! # datera-sdk
//!
//! Session-aware client for the Datera management API.
//!
//! A [`Connection`] logs in lazily, attaches tenant and token headers, logs in
//! again once when the token is rejected, retries 503 responses and refused
//! connections with quadratic backoff, and stitches paged list responses
//! together. Resource wrappers are written against the [`ApiClient`] trait.
//!
//! ## Example
//!
//! ```no_run
//! use datera_core::config::ConnectionConfig;
//! use datera_sdk::{RequestOptions, Sdk};
//!
//! # async fn example() -> datera_core::Result<()> {
//! let config = ConnectionConfig::new("172.16.1.10", "admin", "password")?;
//! let sdk = Sdk::new(config)?;
//! let ctx = sdk.new_context();
//!
//! let version = sdk.software_version(&ctx).await?;
//! let volumes = sdk
//!     .client()
//!     .get_list(&ctx, "app_instances", &RequestOptions::new())
//!     .await?;
//! println!("{version}: {} app instances", volumes.data.len());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod classify;
pub mod connection;
pub mod context;
pub mod paginate;
pub mod retry;
pub mod route;
pub mod sdk;
pub mod session;

pub use api::ApiClient;
pub use connection::{Connection, ConnectionBuilder};
pub use context::{RequestContext, RequestOptions};
pub use route::RequestDescriptor;
pub use sdk::Sdk;
