//! Structural checks on the cluster config.

use crds::SriovFecClusterConfigSpec;

/// Returns the message of the first structural violation, if any.
///
/// Uniform mode needs exactly one node entry and that entry must have
/// `oneCardConfigForAll` set. Every entry with `oneCardConfigForAll` must
/// carry exactly one card.
pub fn validate_cluster_config(spec: &SriovFecClusterConfigSpec) -> Result<(), String> {
    if spec.one_node_config_for_all {
        if spec.nodes.len() != 1 {
            return Err(format!(
                "OneNodeConfigForAll requested but amount of provided nodeConfigs is {} (should be 1)",
                spec.nodes.len()
            ));
        }
        if !spec.nodes[0].one_card_config_for_all {
            return Err("OneNodeConfigForAll requested but OneCardConfigForAll is false. It must be true".to_string());
        }
    }

    for (idx, node) in spec.nodes.iter().enumerate() {
        if node.one_card_config_for_all && node.cards.len() != 1 {
            return Err(format!(
                "OneCardConfigForAll requested but amount of provided cardConfigs is {} (should be 1) for {} node on the list",
                node.cards.len(),
                idx
            ));
        }
    }

    Ok(())
}
