//! SR-IOV FEC Kubernetes Client
//!
//! Thin, mockable access to the Kubernetes API for the resources the FEC
//! controllers read and write: cluster configs, node configs and nodes.
//!
//! # Example
//!
//! ```no_run
//! use fec_client::{FecClient, FecClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FecClient::try_default().await?;
//!
//! let nodes = client
//!     .list_nodes(&[("feature.node.kubernetes.io/pci-8086.present", "true")])
//!     .await?;
//! let node_configs = client.list_node_configs().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod fec_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::FecClient;
pub use error::FecClientError;
pub use fec_trait::{label_selector, FecClientTrait};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockCall, MockFecClient, MockOperation};
