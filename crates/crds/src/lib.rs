//! SR-IOV FEC CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the SR-IOV FEC operator.

pub mod bbdev;
pub mod cluster_config;
pub mod node_config;

pub use bbdev::*;
pub use cluster_config::*;
pub use node_config::*;
