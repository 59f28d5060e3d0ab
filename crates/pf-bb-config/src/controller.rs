//! Per-card `pf_bb_config` driver.

use crate::compiler::generate_config_file;
use crate::devices::device_name_for;
use crate::error::PfBbConfigError;
use crate::invoker::{CommandRunner, SystemCommandRunner, ToolInvoker};
use crds::{CardConfig, is_valid_pci_address};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default working directory holding the tool and its transient config files.
pub const DEFAULT_WORKDIR: &str = "/sriov_workdir";

/// PF driver that requires the shared VFIO token.
const VFIO_PCI_DRIVER: &str = "vfio-pci";

/// File removed when the guard goes out of scope.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
}

impl TransientFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("failed to remove {}: {}", self.path.display(), e);
        }
    }
}

/// Compiles and applies a card's BBDev configuration.
#[derive(Debug)]
pub struct PfBbConfigController<R = SystemCommandRunner> {
    invoker: ToolInvoker<R>,
    workdir: PathBuf,
    shared_vfio_token: String,
}

impl<R: CommandRunner> PfBbConfigController<R> {
    pub fn new(invoker: ToolInvoker<R>, workdir: impl Into<PathBuf>, shared_vfio_token: impl Into<String>) -> Self {
        Self {
            invoker,
            workdir: workdir.into(),
            shared_vfio_token: shared_vfio_token.into(),
        }
    }

    pub fn invoker(&self) -> &ToolInvoker<R> {
        &self.invoker
    }

    /// Path of the config file written for `pci_address`.
    pub fn config_path(&self, pci_address: &str) -> PathBuf {
        self.workdir.join(format!("{}.ini", pci_address))
    }

    /// Compiles the card's BBDev config, writes it next to the tool and runs
    /// `pf_bb_config` on the card. The config file only exists for the
    /// duration of the call.
    ///
    /// Cards without a BBDev config are skipped.
    pub fn initialize_pf_bb_config(&self, card: &CardConfig) -> Result<(), PfBbConfigError> {
        if !card.bb_dev_config.is_configured() {
            info!("BBDevConfig is empty for {}, skipping pf_bb_config", card.pci_address);
            return Ok(());
        }
        if !is_valid_pci_address(&card.pci_address) {
            return Err(PfBbConfigError::Config(format!(
                "invalid PCI address '{}'",
                card.pci_address
            )));
        }
        let device_name = device_name_for(&card.pf_device_id).ok_or_else(|| {
            PfBbConfigError::Config(format!(
                "unsupported PF device ID '{}' for {}",
                card.pf_device_id, card.pci_address
            ))
        })?;

        let config_path = self.config_path(&card.pci_address);
        generate_config_file(&card.bb_dev_config, &config_path)?;
        let config_file = TransientFile::new(config_path);

        let token = card
            .pf_driver
            .eq_ignore_ascii_case(VFIO_PCI_DRIVER)
            .then_some(self.shared_vfio_token.as_str());

        self.invoker
            .apply(device_name, config_file.path(), &card.pci_address, token)
    }

    /// Stops any `pf_bb_config` instance serving `pci_address`.
    pub fn stop_pf_bb_config(&self, pci_address: &str) -> Result<(), PfBbConfigError> {
        if !is_valid_pci_address(pci_address) {
            return Err(PfBbConfigError::Config(format!("invalid PCI address '{}'", pci_address)));
        }
        self.invoker.teardown(pci_address)
    }
}
