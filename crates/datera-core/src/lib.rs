//! # datera-core
//!
//! Core types and utilities for working with the Datera management API.
//!
//! This crate provides the error taxonomy, response envelopes, list parameters
//! and configuration shared by Datera client crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types, API error envelope and outcome classes
//! - [`types`] - Response envelopes for single resources and lists
//! - [`params`] - List and range parameters for collection endpoints
//! - [`query`] - Query parameter builder
//! - [`config`] - Connection configuration
//! - [`client`] - HTTP client settings and retry timing

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod params;
pub mod query;
pub mod types;

// Re-export commonly used types
pub use error::{ApiErrorResponse, Error, Outcome, Result};
pub use params::{ListParams, ListRangeParams};
pub use query::QueryMap;
pub use types::{ApiListOuter, ApiOuter};
