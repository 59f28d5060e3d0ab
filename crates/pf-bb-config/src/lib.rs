//! BBDev configuration for Intel FEC accelerators
//!
//! Compiles a card's declarative queue configuration into the file format
//! read by `pf_bb_config` and drives the tool itself.
//!
//! # Example
//!
//! ```no_run
//! use pf_bb_config::{PfBbConfigController, ToolInvoker, DEFAULT_WORKDIR, PF_BB_CONFIG_PATH};
//!
//! # fn example(card: &crds::CardConfig) -> Result<(), pf_bb_config::PfBbConfigError> {
//! let controller = PfBbConfigController::new(
//!     ToolInvoker::new(PF_BB_CONFIG_PATH),
//!     DEFAULT_WORKDIR,
//!     "00112233-4455-6677-8899-aabbccddeeff",
//! );
//! controller.initialize_pf_bb_config(card)?;
//! # Ok(())
//! # }
//! ```

pub mod compiler;
pub mod controller;
pub mod devices;
pub mod error;
pub mod invoker;

pub use compiler::{BBDevIni, MAX_QUEUE_GROUPS, compile, generate_config_file};
pub use controller::{DEFAULT_WORKDIR, PfBbConfigController, TransientFile};
pub use devices::{INTEL_VENDOR_ID, device_name_for, is_supported_device_name};
pub use error::PfBbConfigError;
pub use invoker::{CommandOutput, CommandRunner, PF_BB_CONFIG_PATH, SystemCommandRunner, ToolInvoker};
