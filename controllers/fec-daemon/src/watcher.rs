//! Watch of this node's SriovFecNodeConfig.

use crate::daemon::NodeDaemon;
use crate::error::DaemonError;
use crds::SriovFecNodeConfig;
use futures::{Stream, StreamExt};
use kube::Api;
use kube_runtime::{WatchStreamExt, watcher};
use std::sync::Arc;
use tracing::{info, warn};

/// Feeds node config events for one node into the daemon.
pub struct Watcher {
    daemon: Arc<NodeDaemon>,
    node_config_api: Api<SriovFecNodeConfig>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher").field("daemon", &self.daemon).finish_non_exhaustive()
    }
}

impl Watcher {
    pub fn new(daemon: Arc<NodeDaemon>, node_config_api: Api<SriovFecNodeConfig>) -> Self {
        Self { daemon, node_config_api }
    }

    /// Watches the SriovFecNodeConfig named after this node.
    ///
    /// Watch errors are retried. Returns only on a fatal daemon error or when
    /// the stream ends.
    pub async fn watch_node_config(&self) -> Result<(), DaemonError> {
        let node_name = self.daemon.node_name().to_string();
        info!(
            "Starting SriovFecNodeConfig watcher for {}/{}",
            self.daemon.namespace(),
            node_name
        );

        let config = watcher::Config::default().fields(&format!("metadata.name={}", node_name));
        drive_events(&self.daemon, watcher(self.node_config_api.clone(), config).default_backoff()).await
    }
}

/// Feeds watch items to the daemon until the stream ends or a fatal error occurs.
pub(crate) async fn drive_events<S>(daemon: &NodeDaemon, stream: S) -> Result<(), DaemonError>
where
    S: Stream<Item = Result<watcher::Event<SriovFecNodeConfig>, watcher::Error>>,
{
    let mut stream = std::pin::pin!(stream);
    while let Some(item) = stream.next().await {
        match item {
            Ok(event) => daemon.handle_event(event).await?,
            // the backoff delays the next attempt and the watcher re-lists on its own
            Err(e) => warn!("SriovFecNodeConfig watch error for {}: {}", daemon.node_name(), e),
        }
    }

    Ok(())
}
