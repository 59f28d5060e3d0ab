//! BBDev config compiler.
//!
//! Turns a card's declarative [`BBDevConfig`] into the INI file
//! `pf_bb_config` reads. Section order is fixed per accelerator generation,
//! with `MODE` always first.
//!
//! ```text
//! [MODE]
//! pf_mode_en=0
//!
//! [UL]
//! bandwidth=3
//! load_balance=128
//! vfqmap=16,16,0,0,0,0,0,0
//! ...
//! ```

use crate::error::PfBbConfigError;
use crds::{ACC100BBDevConfig, BBDevConfig, BBDevVariant, N3000BBDevConfig, QueueGroupConfig, UplinkDownlink};
use ini::Ini;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Hardware ceiling on the total ACC100 queue groups across 4G/5G UL/DL.
pub const MAX_QUEUE_GROUPS: u32 = 8;

// Section names
const MODE: &str = "MODE";
const UL: &str = "UL";
const DL: &str = "DL";
const FLR: &str = "FLR";
const VFBUNDLES: &str = "VFBUNDLES";
const MAXQSIZE: &str = "MAXQSIZE";
const UPLINK_4G: &str = "QUL4G";
const DOWNLINK_4G: &str = "QDL4G";
const UPLINK_5G: &str = "QUL5G";
const DOWNLINK_5G: &str = "QDL5G";

// Keys
const PF_MODE_EN: &str = "pf_mode_en";
const BANDWIDTH: &str = "bandwidth";
const LOAD_BALANCE: &str = "load_balance";
const VFQMAP: &str = "vfqmap";
const FLR_TIME_OUT: &str = "flr_time_out";
const NUM_VF_BUNDLES: &str = "num_vf_bundles";
const MAX_QUEUE_SIZE: &str = "max_queue_size";
const NUM_QGROUPS: &str = "num_qgroups";
const NUM_AQS_PER_GROUPS: &str = "num_aqs_per_groups";
const AQ_DEPTH_LOG2: &str = "aq_depth_log2";

/// A compiled, validated `pf_bb_config` configuration.
#[derive(Debug, Clone)]
pub struct BBDevIni {
    ini: Ini,
}

impl BBDevIni {
    pub fn as_ini(&self) -> &Ini {
        &self.ini
    }

    /// Section names in emission order.
    pub fn section_names(&self) -> Vec<&str> {
        self.ini.sections().flatten().collect()
    }

    /// Value of `key` in `section`, if present.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.ini.get_from(Some(section), key)
    }

    /// Writes the rendered configuration to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> Result<(), PfBbConfigError> {
        self.ini.write_to_file(path)?;
        Ok(())
    }
}

impl fmt::Display for BBDevIni {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.ini.write_to(&mut buf).map_err(|_e| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

fn mode_value(pf_mode: bool) -> &'static str {
    if pf_mode { "1" } else { "0" }
}

/// Compiles a card's queue configuration.
///
/// Exactly one of the N3000 / ACC100 payloads must be set. ACC100 queue-group
/// budgets are checked before anything is built.
pub fn compile(config: &BBDevConfig) -> Result<BBDevIni, PfBbConfigError> {
    match config.variant()? {
        BBDevVariant::N3000(n3000) => Ok(compile_n3000(n3000)),
        BBDevVariant::Acc100(acc100) => compile_acc100(acc100),
    }
}

fn set_link_section(ini: &mut Ini, name: &str, link: &UplinkDownlink) {
    let vfqmap = link
        .queues
        .as_array()
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");

    ini.with_section(Some(name))
        .set(BANDWIDTH, link.bandwidth.to_string())
        .set(LOAD_BALANCE, link.load_balance.to_string())
        .set(VFQMAP, vfqmap);
}

fn compile_n3000(config: &N3000BBDevConfig) -> BBDevIni {
    let mut ini = Ini::new();
    ini.with_section(Some(MODE)).set(PF_MODE_EN, mode_value(config.pf_mode));
    set_link_section(&mut ini, UL, &config.uplink);
    set_link_section(&mut ini, DL, &config.downlink);
    ini.with_section(Some(FLR)).set(FLR_TIME_OUT, config.flr_time_out.to_string());
    BBDevIni { ini }
}

fn set_queue_group_section(ini: &mut Ini, name: &str, group: &QueueGroupConfig) {
    ini.with_section(Some(name))
        .set(NUM_QGROUPS, group.num_queue_groups.to_string())
        .set(NUM_AQS_PER_GROUPS, group.num_aqs_per_groups.to_string())
        .set(AQ_DEPTH_LOG2, group.aq_depth_log2.to_string());
}

fn compile_acc100(config: &ACC100BBDevConfig) -> Result<BBDevIni, PfBbConfigError> {
    let total = config.total_queue_groups();
    if total > u64::from(MAX_QUEUE_GROUPS) {
        return Err(PfBbConfigError::Validation(format!(
            "total number of requested queue groups (4G/5G) is {} and exceeds the maximum ({})",
            total, MAX_QUEUE_GROUPS
        )));
    }

    let mut ini = Ini::new();
    ini.with_section(Some(MODE)).set(PF_MODE_EN, mode_value(config.pf_mode));
    ini.with_section(Some(VFBUNDLES))
        .set(NUM_VF_BUNDLES, config.num_vf_bundles.to_string());
    ini.with_section(Some(MAXQSIZE))
        .set(MAX_QUEUE_SIZE, config.max_queue_size.to_string());
    set_queue_group_section(&mut ini, UPLINK_4G, &config.uplink_4g);
    set_queue_group_section(&mut ini, DOWNLINK_4G, &config.downlink_4g);
    set_queue_group_section(&mut ini, UPLINK_5G, &config.uplink_5g);
    set_queue_group_section(&mut ini, DOWNLINK_5G, &config.downlink_5g);
    Ok(BBDevIni { ini })
}

/// Compiles `config`, logs the generated text and writes it to `path`.
///
/// Nothing is written when compilation fails.
pub fn generate_config_file(config: &BBDevConfig, path: &Path) -> Result<BBDevIni, PfBbConfigError> {
    let ini = compile(config)?;
    info!(generated_bbdev_config = %ini, path = %path.display(), "Generated BBDevConfig");
    ini.write_to(path)?;
    Ok(ini)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{BBDevConfigError, UplinkDownlinkQueues};

    fn queue_group(num_queue_groups: u32) -> QueueGroupConfig {
        QueueGroupConfig {
            num_queue_groups,
            num_aqs_per_groups: 16,
            aq_depth_log2: 4,
        }
    }

    fn acc100(groups: [u32; 4]) -> ACC100BBDevConfig {
        ACC100BBDevConfig {
            pf_mode: false,
            num_vf_bundles: 16,
            max_queue_size: 1024,
            uplink_4g: queue_group(groups[0]),
            downlink_4g: queue_group(groups[1]),
            uplink_5g: queue_group(groups[2]),
            downlink_5g: queue_group(groups[3]),
        }
    }

    fn n3000() -> N3000BBDevConfig {
        N3000BBDevConfig {
            network_type: "FPGA_5GNR".to_string(),
            pf_mode: true,
            flr_time_out: 610,
            uplink: UplinkDownlink {
                bandwidth: 3,
                load_balance: 128,
                queues: UplinkDownlinkQueues {
                    vf0: 16,
                    vf1: 16,
                    ..Default::default()
                },
            },
            downlink: UplinkDownlink {
                bandwidth: 3,
                load_balance: 128,
                queues: UplinkDownlinkQueues {
                    vf0: 16,
                    vf1: 16,
                    vf7: 2,
                    ..Default::default()
                },
            },
        }
    }

    #[test]
    fn test_compile_n3000() {
        let ini = compile(&BBDevConfig {
            n3000: Some(n3000()),
            acc100: None,
        })
        .unwrap();

        assert_eq!(ini.section_names(), vec!["MODE", "UL", "DL", "FLR"]);
        assert_eq!(ini.get("MODE", "pf_mode_en"), Some("1"));
        assert_eq!(ini.get("UL", "vfqmap"), Some("16,16,0,0,0,0,0,0"));
        assert_eq!(ini.get("DL", "vfqmap"), Some("16,16,0,0,0,0,0,2"));
        assert_eq!(ini.get("FLR", "flr_time_out"), Some("610"));
    }

    #[test]
    fn test_compile_acc100_renders_all_sections() {
        let ini = compile(&BBDevConfig {
            n3000: None,
            acc100: Some(acc100([2, 2, 2, 2])),
        })
        .unwrap();

        assert_eq!(
            ini.section_names(),
            vec!["MODE", "VFBUNDLES", "MAXQSIZE", "QUL4G", "QDL4G", "QUL5G", "QDL5G"]
        );
        assert_eq!(ini.get("MODE", "pf_mode_en"), Some("0"));
        assert_eq!(ini.get("VFBUNDLES", "num_vf_bundles"), Some("16"));
        assert_eq!(ini.get("QDL5G", "num_aqs_per_groups"), Some("16"));
    }

    #[test]
    fn test_rendered_text_layout() {
        let ini = compile(&BBDevConfig {
            n3000: None,
            acc100: Some(acc100([0, 0, 4, 4])),
        })
        .unwrap();
        let text = ini.to_string();

        assert!(text.trim_start().starts_with("[MODE]"));
        assert!(!text.contains("true") && !text.contains("false"));

        let reparsed = Ini::load_from_str(&text).unwrap();
        assert_eq!(
            reparsed.sections().flatten().collect::<Vec<_>>(),
            vec!["MODE", "VFBUNDLES", "MAXQSIZE", "QUL4G", "QDL4G", "QUL5G", "QDL5G"]
        );
        assert_eq!(reparsed.get_from(Some("QUL5G"), "num_qgroups"), Some("4"));
        assert_eq!(reparsed.get_from(Some("QUL5G"), "aq_depth_log2"), Some("4"));
        assert_eq!(reparsed.get_from(Some("MODE"), "pf_mode_en"), Some("0"));
    }

    #[test]
    fn test_acc100_queue_group_budget() {
        let at_limit = compile(&BBDevConfig {
            n3000: None,
            acc100: Some(acc100([2, 2, 2, 2])),
        });
        assert!(at_limit.is_ok());

        let over = compile(&BBDevConfig {
            n3000: None,
            acc100: Some(acc100([2, 2, 2, 3])),
        });
        assert!(matches!(over, Err(PfBbConfigError::Validation(_))));
    }

    #[test]
    fn test_queue_group_sum_does_not_wrap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0000:af:00.0.ini");

        let result = generate_config_file(
            &BBDevConfig {
                n3000: None,
                acc100: Some(acc100([u32::MAX, 2, 0, 0])),
            },
            &path,
        );

        assert!(matches!(result, Err(PfBbConfigError::Validation(ref msg)) if msg.contains("4294967297")));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_and_ambiguous_payloads() {
        let err = compile(&BBDevConfig::default()).unwrap_err();
        assert!(matches!(err, PfBbConfigError::Config(ref msg) if msg == &BBDevConfigError::Missing.to_string()));

        let both = BBDevConfig {
            n3000: Some(n3000()),
            acc100: Some(acc100([1, 1, 1, 1])),
        };
        assert!(matches!(compile(&both), Err(PfBbConfigError::Config(_))));
    }

    #[test]
    fn test_over_budget_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0000:af:00.0.ini");

        let result = generate_config_file(
            &BBDevConfig {
                n3000: None,
                acc100: Some(acc100([3, 2, 2, 2])),
            },
            &path,
        );

        assert!(matches!(result, Err(PfBbConfigError::Validation(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_generate_config_file_writes_rendered_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0000:af:00.0.ini");
        let config = BBDevConfig {
            n3000: Some(n3000()),
            acc100: None,
        };

        let ini = generate_config_file(&config, &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), ini.to_string());
    }

    #[test]
    fn test_compile_is_deterministic() {
        let config = BBDevConfig {
            n3000: None,
            acc100: Some(acc100([1, 2, 3, 1])),
        };
        assert_eq!(compile(&config).unwrap().to_string(), compile(&config).unwrap().to_string());
    }
}
