//! Rendering of per-node configs from the cluster config.

use crds::{SriovFecClusterConfigSpec, SriovFecNodeConfig, SriovFecNodeConfigSpec};
use k8s_openapi::api::core::v1::Node;
use std::collections::HashSet;
use tracing::info;

/// Computes the node configs that should exist for `spec` given the nodes
/// that currently carry an accelerator.
///
/// In uniform mode the single node entry is copied to every node, in node
/// order. Otherwise entries are emitted in declaration order and entries for
/// nodes without an accelerator are dropped. `spec` must already be valid.
pub fn render_node_configs(
    spec: &SriovFecClusterConfigSpec,
    nodes: &[Node],
    namespace: &str,
) -> Vec<SriovFecNodeConfig> {
    info!("rendering new node configs");

    if spec.one_node_config_for_all {
        let Some(template) = spec.nodes.first() else {
            return Vec::new();
        };
        return nodes
            .iter()
            .filter_map(|node| node.metadata.name.as_deref())
            .map(|node_name| {
                info!("creating nodeConfig for node {}", node_name);
                node_config(node_name, namespace, SriovFecNodeConfigSpec {
                    one_card_config_for_all: true,
                    cards: template.cards.clone(),
                })
            })
            .collect();
    }

    let accelerated: HashSet<&str> = nodes
        .iter()
        .filter_map(|node| node.metadata.name.as_deref())
        .collect();

    spec.nodes
        .iter()
        .filter(|entry| {
            let present = accelerated.contains(entry.node_name.as_str());
            if !present {
                info!(
                    "received config for node {} that has no accelerator - NodeConfig spec will not be generated",
                    entry.node_name
                );
            }
            present
        })
        .map(|entry| {
            info!("creating nodeConfig for node {}", entry.node_name);
            node_config(&entry.node_name, namespace, SriovFecNodeConfigSpec {
                one_card_config_for_all: entry.one_card_config_for_all,
                cards: entry.cards.clone(),
            })
        })
        .collect()
}

fn node_config(name: &str, namespace: &str, spec: SriovFecNodeConfigSpec) -> SriovFecNodeConfig {
    let mut config = SriovFecNodeConfig::new(name, spec);
    config.metadata.namespace = Some(namespace.to_string());
    config
}
