//! Accelerator discovery from sysfs.

use pf_bb_config::{INTEL_VENDOR_ID, device_name_for};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// A supported accelerator PF present on this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accelerator {
    pub pci_address: String,
    /// PF device ID without the `0x` prefix, lower case
    pub device_id: String,
    /// `pf_bb_config` device family
    pub device_name: &'static str,
}

/// Lists the supported Intel accelerators under `<sysfs_root>/bus/pci/devices`,
/// sorted by PCI address.
pub fn discover_accelerators(sysfs_root: &Path) -> io::Result<Vec<Accelerator>> {
    let devices_dir = sysfs_root.join("bus/pci/devices");
    let mut accelerators = Vec::new();

    for entry in fs::read_dir(&devices_dir)? {
        let entry = entry?;
        let device_dir = entry.path();
        let pci_address = entry.file_name().to_string_lossy().into_owned();

        let Some(vendor) = read_id(&device_dir.join("vendor")) else {
            continue;
        };
        if vendor != INTEL_VENDOR_ID {
            continue;
        }
        let Some(device_id) = read_id(&device_dir.join("device")) else {
            continue;
        };
        if let Some(device_name) = device_name_for(&device_id) {
            debug!("found {} accelerator at {}", device_name, pci_address);
            accelerators.push(Accelerator {
                pci_address,
                device_id,
                device_name,
            });
        }
    }

    accelerators.sort_by(|a, b| a.pci_address.cmp(&b.pci_address));
    Ok(accelerators)
}

// sysfs IDs look like "0x8086\n"
fn read_id(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let id = raw.trim();
    Some(id.strip_prefix("0x").unwrap_or(id).to_ascii_lowercase())
}
