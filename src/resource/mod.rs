//! Resource abstraction layer
//!
//! Managers translate domain operations into HTTP calls and parse responses
//! into typed resources. Operations whose request shape depends on the API
//! version are looked up in the version registry at call time.
//!
//! # Architecture
//!
//! - [`registry`] - Version registry and dispatcher for version-gated operations
//! - [`manager`] - Request primitives shared by every manager, query strings, hooks
//! - [`shares`], [`share_groups`], [`share_group_replicas`],
//!   [`share_group_instances`], [`share_group_snapshot_instances`] - one
//!   manager per resource kind
//!
//! # Example
//!
//! ```ignore
//! use manila_client::resource::manager::ListOptions;
//!
//! async fn available(client: &manila_client::Client) -> manila_client::Result<()> {
//!     let shares = client
//!         .shares()
//!         .list(ListOptions::default().search("status", "available"))
//!         .await?;
//!     for share in &shares {
//!         client.shares().extend(share, 20).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod registry;
pub mod share_group_instances;
pub mod share_group_replicas;
pub mod share_group_snapshot_instances;
pub mod share_groups;
pub mod shares;

pub use manager::{ListOptions, Resource, ResourceId, SearchOpts};
pub use registry::{registry, RegistryBuilder, Route, VersionRegistry, VersionedMethod};
