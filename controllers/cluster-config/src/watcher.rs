//! Kubernetes resource watchers.
//!
//! Drives reconciliation of SriovFecClusterConfigs with
//! `kube_runtime::Controller`. Changes to accelerator nodes requeue the
//! honored cluster config so node configs follow nodes coming and going.

use crate::error::ControllerError;
use crate::reconciler::{ACCELERATOR_NODE_LABELS, Reconciler};
use crds::{DEFAULT_CLUSTER_CONFIG_NAME, SriovFecClusterConfig};
use fec_client::label_selector;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::{Api, Client, ResourceExt};
use kube_runtime::{
    Controller,
    controller::{Action, Config as ControllerConfig},
    reflector::ObjectRef,
    watcher,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Watches cluster configs and accelerator nodes.
pub struct Watcher {
    client: Client,
    reconciler: Arc<Reconciler>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("reconciler", &self.reconciler)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    pub fn new(client: Client, reconciler: Arc<Reconciler>) -> Self {
        Self { client, reconciler }
    }

    /// Runs the SriovFecClusterConfig controller until its stream ends.
    pub async fn watch_cluster_configs(&self) -> Result<(), ControllerError> {
        info!("Starting SriovFecClusterConfig watcher");

        // Cluster configs in every namespace are watched so foreign ones get an Ignored status
        let cluster_configs: Api<SriovFecClusterConfig> = Api::all(self.client.clone());
        let nodes: Api<Node> = Api::all(self.client.clone());
        let node_watch = watcher::Config::default().labels(&label_selector(&ACCELERATOR_NODE_LABELS));

        let honored = ObjectRef::<SriovFecClusterConfig>::new(DEFAULT_CLUSTER_CONFIG_NAME)
            .within(&self.reconciler.namespace);

        let error_policy = |obj: Arc<SriovFecClusterConfig>, error: &ControllerError, _ctx: Arc<Reconciler>| {
            error!("Reconciliation error for SriovFecClusterConfig {}: {}", obj.name_any(), error);
            Action::requeue(Duration::from_secs(60))
        };

        let reconcile = |obj: Arc<SriovFecClusterConfig>, ctx: Arc<Reconciler>| async move {
            let namespace = obj.namespace().unwrap_or_default();
            let name = obj.name_any();
            debug!("Reconciling SriovFecClusterConfig {}/{}", namespace, name);

            ctx.reconcile_cluster_config(&namespace, &name).await?;
            Ok::<_, ControllerError>(Action::await_change())
        };

        // Passes over the singleton must not overlap
        let controller_config = ControllerConfig::default()
            .debounce(Duration::from_secs(5))
            .concurrency(1);

        Controller::new(cluster_configs, watcher::Config::default())
            .watches(nodes, node_watch, move |node: Node| {
                debug!("Node {} changed, requeueing {}", node.name_any(), honored);
                Some(honored.clone())
            })
            .with_config(controller_config)
            .run(reconcile, error_policy, self.reconciler.clone())
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled {}", obj),
                    Err(e) => error!("Controller error for SriovFecClusterConfig: {}", e),
                }
            })
            .await;

        Ok(())
    }
}
