//! Test utilities for unit testing the reconciler
//!
//! Builders for cluster configs, nodes and node configs, and a reconciler
//! wired to a `MockFecClient`.

use crate::metrics::Metrics;
use crate::reconciler::{ACCELERATOR_NODE_LABELS, Reconciler};
use crds::*;
use fec_client::MockFecClient;
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub const TEST_NAMESPACE: &str = "sriov-fec";

/// Helper to create a test card config with an ACC100 payload
pub fn create_test_card(pci_address: &str) -> CardConfig {
    CardConfig {
        pci_address: pci_address.to_string(),
        vendor_id: "8086".to_string(),
        pf_device_id: "0d5c".to_string(),
        pf_driver: "pci-pf-stub".to_string(),
        vf_device_id: "0d5d".to_string(),
        vf_driver: "vfio-pci".to_string(),
        vf_amount: 16,
        bb_dev_config: BBDevConfig {
            n3000: None,
            acc100: Some(ACC100BBDevConfig {
                pf_mode: false,
                num_vf_bundles: 16,
                max_queue_size: 1024,
                uplink_4g: QueueGroupConfig { num_queue_groups: 2, num_aqs_per_groups: 16, aq_depth_log2: 4 },
                downlink_4g: QueueGroupConfig { num_queue_groups: 2, num_aqs_per_groups: 16, aq_depth_log2: 4 },
                uplink_5g: QueueGroupConfig { num_queue_groups: 2, num_aqs_per_groups: 16, aq_depth_log2: 4 },
                downlink_5g: QueueGroupConfig { num_queue_groups: 2, num_aqs_per_groups: 16, aq_depth_log2: 4 },
            }),
        },
    }
}

pub fn create_test_node_config(node_name: &str, one_card_config_for_all: bool, cards: Vec<CardConfig>) -> NodeConfig {
    NodeConfig {
        node_name: node_name.to_string(),
        one_card_config_for_all,
        cards,
    }
}

pub fn create_test_cluster_spec(one_node_config_for_all: bool, nodes: Vec<NodeConfig>) -> SriovFecClusterConfigSpec {
    SriovFecClusterConfigSpec {
        one_node_config_for_all,
        nodes,
    }
}

/// Helper to create a cluster config CRD
pub fn create_test_cluster_config(name: &str, namespace: &str, spec: SriovFecClusterConfigSpec) -> SriovFecClusterConfig {
    SriovFecClusterConfig {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec,
        status: None,
    }
}

/// Helper to create a node carrying every accelerator label
pub fn create_test_node(name: &str) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(
                ACCELERATOR_NODE_LABELS
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Helper to create a stored node config
pub fn create_test_stored_node_config(name: &str, namespace: &str, spec: SriovFecNodeConfigSpec) -> SriovFecNodeConfig {
    let mut config = SriovFecNodeConfig::new(name, spec);
    config.metadata.namespace = Some(namespace.to_string());
    config.metadata.resource_version = Some("1".to_string());
    config
}

/// Reconciler over a shared mock, for tests that inspect the mock afterwards
pub fn create_test_reconciler(client: &MockFecClient) -> Reconciler {
    Reconciler::new(Box::new(client.clone()), TEST_NAMESPACE, Metrics::new().unwrap())
}
