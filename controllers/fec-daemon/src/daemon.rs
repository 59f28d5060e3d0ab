//! Node daemon: applies this node's SriovFecNodeConfig to its accelerators.
//!
//! Cards are applied one at a time on the blocking pool, each under the
//! configured deadline. The first failing card ends the pass and the node
//! config's status reports the failure. A failed pass is retried on the next
//! event for the node config; a timed-out pass is fatal.

use crate::error::DaemonError;
use crate::inventory::{Accelerator, discover_accelerators};
use crds::{CardConfig, NodeSyncStatus, SriovFecNodeConfig, SriovFecNodeConfigSpec};
use fec_client::FecClientTrait;
use kube_runtime::watcher::Event;
use pf_bb_config::{CommandRunner, PfBbConfigController, PfBbConfigError};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Pause after a failed pass before the next event is handled.
const FAILED_APPLY_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Applies and removes a card's `pf_bb_config` setup. Calls block.
pub trait CardApplier: Send + Sync + 'static {
    fn apply(&self, card: &CardConfig) -> Result<(), PfBbConfigError>;

    fn teardown(&self, pci_address: &str) -> Result<(), PfBbConfigError>;
}

impl<R: CommandRunner + 'static> CardApplier for PfBbConfigController<R> {
    fn apply(&self, card: &CardConfig) -> Result<(), PfBbConfigError> {
        self.initialize_pf_bb_config(card)
    }

    fn teardown(&self, pci_address: &str) -> Result<(), PfBbConfigError> {
        self.stop_pf_bb_config(pci_address)
    }
}

/// Result of handling one node config event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Spec already handled, nothing done
    Unchanged,
    /// Every listed card was applied
    Applied(Vec<String>),
}

/// Expands the node spec into the cards to apply.
///
/// With `oneCardConfigForAll` the single card config is copied to every
/// discovered accelerator with the same PF device ID, taking that
/// accelerator's PCI address. Otherwise the cards are used as declared.
pub fn resolve_cards(spec: &SriovFecNodeConfigSpec, accelerators: &[Accelerator]) -> Vec<CardConfig> {
    if !spec.one_card_config_for_all {
        return spec.cards.clone();
    }
    let Some(template) = spec.cards.first() else {
        return Vec::new();
    };
    let wanted = normalize_device_id(&template.pf_device_id);

    accelerators
        .iter()
        .filter(|acc| acc.device_id == wanted)
        .map(|acc| CardConfig {
            pci_address: acc.pci_address.clone(),
            ..template.clone()
        })
        .collect()
}

fn normalize_device_id(id: &str) -> String {
    let id = id.trim();
    id.strip_prefix("0x").unwrap_or(id).to_ascii_lowercase()
}

#[derive(Debug, Default)]
struct DaemonState {
    last_spec: Option<SriovFecNodeConfigSpec>,
    applied: BTreeSet<String>,
}

/// Per-node agent state and collaborators.
pub struct NodeDaemon {
    fec_client: Box<dyn FecClientTrait + Send + Sync>,
    applier: Arc<dyn CardApplier>,
    node_name: String,
    namespace: String,
    sysfs_root: PathBuf,
    apply_timeout: Duration,
    retry_delay: Duration,
    state: Mutex<DaemonState>,
}

impl std::fmt::Debug for NodeDaemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeDaemon")
            .field("node_name", &self.node_name)
            .field("namespace", &self.namespace)
            .field("sysfs_root", &self.sysfs_root)
            .field("apply_timeout", &self.apply_timeout)
            .finish_non_exhaustive()
    }
}

impl NodeDaemon {
    pub fn new(
        fec_client: Box<dyn FecClientTrait + Send + Sync>,
        applier: Arc<dyn CardApplier>,
        node_name: impl Into<String>,
        namespace: impl Into<String>,
        sysfs_root: impl Into<PathBuf>,
        apply_timeout: Duration,
    ) -> Self {
        Self {
            fec_client,
            applier,
            node_name: node_name.into(),
            namespace: namespace.into(),
            sysfs_root: sysfs_root.into(),
            apply_timeout,
            retry_delay: FAILED_APPLY_RETRY_DELAY,
            state: Mutex::new(DaemonState::default()),
        }
    }

    /// Overrides the pause taken after a failed pass.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Dispatches one watch event.
    ///
    /// Failed passes are logged and followed by the retry pause. Only fatal
    /// errors are returned.
    pub async fn handle_event(&self, event: Event<SriovFecNodeConfig>) -> Result<(), DaemonError> {
        let result = match event {
            Event::Apply(node_config) | Event::InitApply(node_config) => {
                self.handle_apply(&node_config).await.map(|_| ())
            }
            Event::Delete(node_config) => self.handle_delete(&node_config).await,
            Event::Init => {
                debug!("SriovFecNodeConfig watcher initializing");
                Ok(())
            }
            Event::InitDone => {
                info!("SriovFecNodeConfig watcher initialization complete");
                Ok(())
            }
        };

        match result {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!("Failed to handle SriovFecNodeConfig {}: {}", self.node_name, e);
                tokio::time::sleep(self.retry_delay).await;
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Applies a created or changed node config and reports the result in its status.
    ///
    /// A spec identical to the last successfully applied one is skipped, so
    /// the daemon's own status writes do not trigger another pass. After a
    /// failure the next event re-applies.
    pub async fn handle_apply(&self, config: &SriovFecNodeConfig) -> Result<ApplyOutcome, DaemonError> {
        let mut state = self.state.lock().await;
        if state.last_spec.as_ref() == Some(&config.spec) {
            return Ok(ApplyOutcome::Unchanged);
        }

        info!("Applying SriovFecNodeConfig for node {}", self.node_name);
        self.update_status(NodeSyncStatus::InProgress, "").await;

        let result = self.apply_spec(&config.spec, &mut state).await;

        match &result {
            Ok(_) => {
                state.last_spec = Some(config.spec.clone());
                self.update_status(NodeSyncStatus::Succeeded, "").await;
            }
            Err(e) => {
                state.last_spec = None;
                warn!("Failed to apply SriovFecNodeConfig for node {}: {}", self.node_name, e);
                self.update_status(NodeSyncStatus::Failed, &e.to_string()).await;
            }
        }
        result.map(ApplyOutcome::Applied)
    }

    /// Stops `pf_bb_config` for every card of a deleted node config.
    ///
    /// Every card is attempted; the first failure is returned.
    pub async fn handle_delete(&self, config: &SriovFecNodeConfig) -> Result<(), DaemonError> {
        let mut state = self.state.lock().await;
        info!("SriovFecNodeConfig for node {} deleted, tearing down", self.node_name);

        let mut targets: BTreeSet<String> = std::mem::take(&mut state.applied);
        state.last_spec = None;
        match self.cards_for(&config.spec) {
            Ok(cards) => targets.extend(cards.into_iter().map(|c| c.pci_address)),
            Err(e) => warn!("cannot resolve cards of deleted node config: {}", e),
        }

        let mut first_error = None;
        for pci_address in targets.iter().filter(|pci| !pci.is_empty()) {
            if let Err(e) = self.teardown_card(pci_address).await {
                warn!("failed to tear down {}: {}", pci_address, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn apply_spec(&self, spec: &SriovFecNodeConfigSpec, state: &mut DaemonState) -> Result<Vec<String>, DaemonError> {
        let cards = self.cards_for(spec)?;
        let wanted: BTreeSet<&str> = cards.iter().map(|c| c.pci_address.as_str()).collect();

        let stale: Vec<String> = state
            .applied
            .iter()
            .filter(|pci| !wanted.contains(pci.as_str()))
            .cloned()
            .collect();
        for pci_address in stale {
            info!("{} is no longer configured, tearing down", pci_address);
            self.teardown_card(&pci_address).await?;
            state.applied.remove(&pci_address);
        }

        let mut applied = Vec::new();
        for card in cards {
            if !card.bb_dev_config.is_configured() {
                info!("card {} has no BBDevConfig, skipping", card.pci_address);
                continue;
            }
            self.apply_card(&card).await?;
            state.applied.insert(card.pci_address.clone());
            applied.push(card.pci_address);
        }
        Ok(applied)
    }

    fn cards_for(&self, spec: &SriovFecNodeConfigSpec) -> Result<Vec<CardConfig>, DaemonError> {
        let accelerators = if spec.one_card_config_for_all {
            discover_accelerators(&self.sysfs_root).map_err(DaemonError::Inventory)?
        } else {
            Vec::new()
        };
        Ok(resolve_cards(spec, &accelerators))
    }

    async fn apply_card(&self, card: &CardConfig) -> Result<(), DaemonError> {
        let applier = Arc::clone(&self.applier);
        let owned = card.clone();
        self.run_with_deadline(&card.pci_address, move || applier.apply(&owned))
            .await
    }

    async fn teardown_card(&self, pci_address: &str) -> Result<(), DaemonError> {
        let applier = Arc::clone(&self.applier);
        let owned = pci_address.to_string();
        self.run_with_deadline(pci_address, move || applier.teardown(&owned))
            .await
    }

    async fn run_with_deadline<F>(&self, pci_address: &str, work: F) -> Result<(), DaemonError>
    where
        F: FnOnce() -> Result<(), PfBbConfigError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(work);
        match tokio::time::timeout(self.apply_timeout, task).await {
            Ok(Ok(result)) => result.map_err(DaemonError::from),
            Ok(Err(e)) => Err(DaemonError::Task(e.to_string())),
            Err(_) => Err(DaemonError::Timeout {
                pci_address: pci_address.to_string(),
                seconds: self.apply_timeout.as_secs(),
            }),
        }
    }

    async fn update_status(&self, sync_status: NodeSyncStatus, message: &str) {
        if let Err(e) = self
            .fec_client
            .update_node_config_status(&self.namespace, &self.node_name, sync_status, message)
            .await
        {
            warn!("failed to update node config status: {}", e);
        }
    }
}
