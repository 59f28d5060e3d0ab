//! Supported accelerators.

/// PCI vendor ID of every supported accelerator.
pub const INTEL_VENDOR_ID: &str = "8086";

/// `pf_bb_config` device family names.
pub const FPGA_LTE: &str = "FPGA_LTE";
pub const FPGA_5GNR: &str = "FPGA_5GNR";
pub const ACC100: &str = "ACC100";

/// PF device ID to `pf_bb_config` device family.
const SUPPORTED_DEVICES: [(&str, &str); 3] = [
    ("0d8f", FPGA_5GNR),
    ("5052", FPGA_LTE),
    ("0d5c", ACC100),
];

/// Looks up the device family for a PF device ID (case-insensitive, optional `0x` prefix).
pub fn device_name_for(pf_device_id: &str) -> Option<&'static str> {
    let id = pf_device_id.trim();
    let id = id.strip_prefix("0x").unwrap_or(id);
    SUPPORTED_DEVICES
        .iter()
        .find(|(device_id, _)| device_id.eq_ignore_ascii_case(id))
        .map(|(_, name)| *name)
}

/// True when `name` is one of the families `pf_bb_config` accepts.
pub fn is_supported_device_name(name: &str) -> bool {
    matches!(name, FPGA_LTE | FPGA_5GNR | ACC100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_name_lookup() {
        assert_eq!(device_name_for("0d5c"), Some(ACC100));
        assert_eq!(device_name_for("0x0D8F"), Some(FPGA_5GNR));
        assert_eq!(device_name_for("5052"), Some(FPGA_LTE));
        assert_eq!(device_name_for("1572"), None);
    }

    #[test]
    fn test_supported_device_names() {
        assert!(is_supported_device_name("ACC100"));
        assert!(!is_supported_device_name("acc100"));
        assert!(!is_supported_device_name("FPGA"));
    }
}
