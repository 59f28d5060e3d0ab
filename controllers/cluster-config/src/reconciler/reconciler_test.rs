//! Unit tests for the cluster config reconciler

#[cfg(test)]
mod tests {
    use super::super::ReconcileOutcome;
    use crate::error::ControllerError;
    use crate::metrics::NodeConfigOperation;
    use crate::test_utils::*;
    use crds::{ClusterSyncStatus, SriovFecNodeConfigSpec};
    use fec_client::{MockCall, MockFecClient, MockOperation};

    fn uniform_cluster(client: &MockFecClient) {
        let spec = create_test_cluster_spec(true, vec![create_test_node_config(
            "",
            true,
            vec![create_test_card("0000:af:00.0")],
        )]);
        client.add_cluster_config(create_test_cluster_config("config", TEST_NAMESPACE, spec));
    }

    fn sync_status(client: &MockFecClient, namespace: &str, name: &str) -> (Option<ClusterSyncStatus>, String) {
        let status = client.cluster_config_status(namespace, name).unwrap_or_default();
        (status.sync_status, status.last_sync_error)
    }

    #[tokio::test]
    async fn test_missing_cluster_config_is_noop() {
        let client = MockFecClient::new();
        let reconciler = create_test_reconciler(&client);

        let outcome = reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::NotFound);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_cluster_config_is_ignored() {
        let client = MockFecClient::new();
        client.add_node(create_test_node("worker-1"));
        let spec = create_test_cluster_spec(false, vec![]);
        client.add_cluster_config(create_test_cluster_config("config", "other", spec.clone()));
        client.add_cluster_config(create_test_cluster_config("custom", TEST_NAMESPACE, spec));
        let reconciler = create_test_reconciler(&client);

        for (namespace, name) in [("other", "config"), (TEST_NAMESPACE, "custom")] {
            let outcome = reconciler.reconcile_cluster_config(namespace, name).await.unwrap();
            assert_eq!(outcome, ReconcileOutcome::Ignored);

            let (status, message) = sync_status(&client, namespace, name);
            assert_eq!(status, Some(ClusterSyncStatus::Ignored));
            assert_eq!(
                message,
                "Only SriovFecClusterConfig with name 'config' and namespace 'sriov-fec' are handled"
            );
        }

        // nothing but the two status writes
        assert_eq!(client.calls().len(), 2);
        assert!(client.node_config_names().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_sets_status_without_error() {
        let client = MockFecClient::new();
        client.add_node(create_test_node("worker-1"));
        let spec = create_test_cluster_spec(true, vec![
            create_test_node_config("", true, vec![create_test_card("0000:af:00.0")]),
            create_test_node_config("", true, vec![create_test_card("0000:b0:00.0")]),
        ]);
        client.add_cluster_config(create_test_cluster_config("config", TEST_NAMESPACE, spec));
        let reconciler = create_test_reconciler(&client);

        let outcome = reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::InvalidConfig(_)));
        let (status, message) = sync_status(&client, TEST_NAMESPACE, "config");
        assert_eq!(status, Some(ClusterSyncStatus::InvalidConfig));
        assert!(message.contains("(should be 1)"));
        assert!(client.calls_of(MockOperation::ListNodes).is_empty());
        assert!(client.node_config_names().is_empty());
    }

    #[tokio::test]
    async fn test_inventory_failure_sets_nfd_failure_and_errors() {
        let client = MockFecClient::new();
        uniform_cluster(&client);
        client.fail_on(MockOperation::ListNodes, None);
        let reconciler = create_test_reconciler(&client);

        let result = reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await;

        assert!(matches!(result, Err(ControllerError::Inventory(_))));
        let (status, message) = sync_status(&client, TEST_NAMESPACE, "config");
        assert_eq!(status, Some(ClusterSyncStatus::NfdFailure));
        assert_eq!(message, "failed to obtain nodes with Intel accelerator - check logs");
        assert!(client.calls_of(MockOperation::ListNodeConfigs).is_empty());
    }

    #[tokio::test]
    async fn test_uniform_config_fans_out_and_reports_created() {
        let client = MockFecClient::new();
        uniform_cluster(&client);
        for name in ["n1", "n2", "n3"] {
            client.add_node(create_test_node(name));
        }
        let reconciler = create_test_reconciler(&client);

        let outcome = reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await.unwrap();

        let ReconcileOutcome::NodeConfigsCreated(summary) = outcome else {
            panic!("unexpected outcome {:?}", outcome);
        };
        assert_eq!(summary.created, vec!["n1", "n2", "n3"]);
        assert_eq!(client.node_config_names(), vec!["n1", "n2", "n3"]);
        for name in ["n1", "n2", "n3"] {
            let stored = client.node_config(TEST_NAMESPACE, name).unwrap();
            assert!(stored.spec.one_card_config_for_all);
            assert_eq!(stored.spec.cards[0].pci_address, "0000:af:00.0");
        }
        assert_eq!(sync_status(&client, TEST_NAMESPACE, "config"), (Some(ClusterSyncStatus::NodeConfigsCreated), String::new()));
        assert_eq!(reconciler.metrics.node_config_operation_count(NodeConfigOperation::Create), 3);
        assert_eq!(reconciler.metrics.reconcile_count(ClusterSyncStatus::NodeConfigsCreated), 1);
    }

    #[tokio::test]
    async fn test_dropped_node_config_is_deleted_before_writes() {
        let client = MockFecClient::new();
        uniform_cluster(&client);
        for name in ["n1", "n2"] {
            client.add_node(create_test_node(name));
        }
        client.add_node_config(create_test_stored_node_config("n3", TEST_NAMESPACE, SriovFecNodeConfigSpec::default()));
        let reconciler = create_test_reconciler(&client);

        reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await.unwrap();

        assert_eq!(client.node_config_names(), vec!["n1", "n2"]);
        let writes: Vec<MockCall> = client
            .calls()
            .into_iter()
            .filter(|c| matches!(c.operation, MockOperation::Create | MockOperation::Replace | MockOperation::Delete))
            .collect();
        assert_eq!(writes, vec![
            MockCall::new(MockOperation::Delete, "n3"),
            MockCall::new(MockOperation::Create, "n1"),
            MockCall::new(MockOperation::Create, "n2"),
        ]);
    }

    #[tokio::test]
    async fn test_second_pass_writes_nothing() {
        let client = MockFecClient::new();
        uniform_cluster(&client);
        client.add_node(create_test_node("n1"));
        client.add_node(create_test_node("n2"));
        let reconciler = create_test_reconciler(&client);

        reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await.unwrap();
        let versions = |client: &MockFecClient| {
            ["n1", "n2"].map(|name| client.node_config(TEST_NAMESPACE, name).and_then(|c| c.metadata.resource_version))
        };
        let after_first = versions(&client);
        client.clear_calls();

        let outcome = reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await.unwrap();

        let ReconcileOutcome::NodeConfigsCreated(summary) = outcome else {
            panic!("unexpected outcome {:?}", outcome);
        };
        assert_eq!(summary.unchanged, vec!["n1", "n2"]);
        assert!(client.calls_of(MockOperation::Create).is_empty());
        assert!(client.calls_of(MockOperation::Replace).is_empty());
        assert!(client.calls_of(MockOperation::Delete).is_empty());
        assert_eq!(versions(&client), after_first);
    }

    #[tokio::test]
    async fn test_per_node_config_and_node_removal() {
        let client = MockFecClient::new();
        let spec = create_test_cluster_spec(false, vec![
            create_test_node_config("worker-1", false, vec![create_test_card("0000:af:00.0")]),
            create_test_node_config("worker-2", true, vec![create_test_card("0000:b0:00.0")]),
        ]);
        client.add_cluster_config(create_test_cluster_config("config", TEST_NAMESPACE, spec));
        client.add_node(create_test_node("worker-1"));
        client.add_node(create_test_node("worker-2"));
        let reconciler = create_test_reconciler(&client);

        reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await.unwrap();
        assert_eq!(client.node_config_names(), vec!["worker-1", "worker-2"]);
        assert!(!client.node_config(TEST_NAMESPACE, "worker-1").unwrap().spec.one_card_config_for_all);
        assert!(client.node_config(TEST_NAMESPACE, "worker-2").unwrap().spec.one_card_config_for_all);

        client.remove_node("worker-2");
        reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await.unwrap();

        assert_eq!(client.node_config_names(), vec!["worker-1"]);
        assert_eq!(client.calls_of(MockOperation::Delete), vec![MockCall::new(MockOperation::Delete, "worker-2")]);
    }

    #[tokio::test]
    async fn test_changed_spec_replaces_stored_spec_only() {
        let client = MockFecClient::new();
        uniform_cluster(&client);
        client.add_node(create_test_node("n1"));
        let mut stored = create_test_stored_node_config("n1", TEST_NAMESPACE, SriovFecNodeConfigSpec::default());
        stored.status = Some(crds::SriovFecNodeConfigStatus {
            sync_status: Some(crds::NodeSyncStatus::Succeeded),
            ..Default::default()
        });
        client.add_node_config(stored);
        let reconciler = create_test_reconciler(&client);

        reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await.unwrap();

        let updated = client.node_config(TEST_NAMESPACE, "n1").unwrap();
        assert!(updated.spec.one_card_config_for_all);
        assert_eq!(updated.spec.cards.len(), 1);
        assert_eq!(updated.status.and_then(|s| s.sync_status), Some(crds::NodeSyncStatus::Succeeded));
        assert_eq!(client.calls_of(MockOperation::Replace).len(), 1);
        assert_eq!(reconciler.metrics.node_config_operation_count(NodeConfigOperation::Update), 1);
    }

    #[tokio::test]
    async fn test_create_failure_sets_creation_failed_and_errors() {
        let client = MockFecClient::new();
        uniform_cluster(&client);
        for name in ["n1", "n2", "n3"] {
            client.add_node(create_test_node(name));
        }
        client.fail_on(MockOperation::Create, Some("n2"));
        let reconciler = create_test_reconciler(&client);

        let result = reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await;

        assert!(matches!(result, Err(ControllerError::Sync(_))));
        let (status, message) = sync_status(&client, TEST_NAMESPACE, "config");
        assert_eq!(status, Some(ClusterSyncStatus::NodeConfigsCreationFailed));
        assert_eq!(message, "failed to create NodeConfigs - check logs");
        // earlier writes stay, later targets are not attempted
        assert_eq!(client.node_config_names(), vec!["n1"]);
        assert!(client.calls_of(MockOperation::Create).iter().all(|c| c.name != "n3"));

        // next pass converges
        client.clear_failures();
        reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await.unwrap();
        assert_eq!(client.node_config_names(), vec!["n1", "n2", "n3"]);
    }

    #[tokio::test]
    async fn test_delete_failure_aborts_before_writes() {
        let client = MockFecClient::new();
        uniform_cluster(&client);
        client.add_node(create_test_node("n1"));
        client.add_node_config(create_test_stored_node_config("stale", TEST_NAMESPACE, SriovFecNodeConfigSpec::default()));
        client.fail_on(MockOperation::Delete, None);
        let reconciler = create_test_reconciler(&client);

        let result = reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await;

        assert!(matches!(result, Err(ControllerError::Sync(_))));
        assert!(client.calls_of(MockOperation::Create).is_empty());
        assert_eq!(sync_status(&client, TEST_NAMESPACE, "config").0, Some(ClusterSyncStatus::NodeConfigsCreationFailed));
    }

    #[tokio::test]
    async fn test_status_write_failure_does_not_change_result() {
        let client = MockFecClient::new();
        uniform_cluster(&client);
        client.add_node(create_test_node("n1"));
        client.fail_on(MockOperation::UpdateStatus, None);
        let reconciler = create_test_reconciler(&client);

        let outcome = reconciler.reconcile_cluster_config(TEST_NAMESPACE, "config").await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::NodeConfigsCreated(_)));
        assert_eq!(client.node_config_names(), vec!["n1"]);
    }
}
