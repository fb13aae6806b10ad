//! Client library for the OpenStack Shared File Systems (Manila) API
//!
//! Typed managers for shares, share groups, share group replicas, share group
//! instances and share group snapshot instances. Operations whose request
//! shape changed between API microversions are resolved at call time against
//! the version negotiated by the [`Client`].
//!
//! # Module Structure
//!
//! - [`api`] - Client, HTTP transport and API versions
//! - [`resource`] - Version registry, manager primitives and per-kind managers
//! - [`utils`] - `key=value` argument parsing and access rule validation
//! - [`config`] - Persistent configuration
//! - [`error`] - Error type shared by every module

pub mod api;
pub mod config;
pub mod error;
pub mod resource;
pub mod utils;

pub use api::client::{Client, ClientBuilder};
pub use api::versions::{ApiVersion, ApiVersioned, VersionWindow, MAX_VERSION, MIN_VERSION};
pub use error::{format_error, Error, Result};
