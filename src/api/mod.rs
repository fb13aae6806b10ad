//! Share API interaction module
//!
//! # Module Structure
//!
//! - [`versions`] - API microversions and version windows
//! - [`http`] - HTTP transport for REST calls
//! - [`client`] - Main client tying transport, version and managers together
//!
//! # Example
//!
//! ```ignore
//! use manila_client::api::client::Client;
//! use manila_client::api::versions::ApiVersion;
//!
//! async fn example() -> manila_client::Result<()> {
//!     let client = Client::builder("http://manila:8786/v2/my-project")
//!         .token("gAAAA...")
//!         .api_version(ApiVersion::new(2, 7))
//!         .build()?;
//!     client.shares().extend("share-id", 20).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod versions;
