use crate::DispatchKey;
use anyhow::Result;
use ingress_controller_core::source::Publish;
use ingress_controller_index::Reconciler;
use std::{collections::BTreeSet, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The key models are published under at the end of a full sync.
pub const FULL_SYNC_KEY: &str = "fullsync";

/// Routes dispatcher keys to the reconciler.
pub struct Controller {
    reconciler: Reconciler,
    publisher: Arc<dyn Publish>,
}

// === impl Controller ===

impl Controller {
    pub fn new(reconciler: Reconciler, publisher: Arc<dyn Publish>) -> Self {
        Self {
            reconciler,
            publisher,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Reconciles the object or node a key names, returning the names of the models it changed.
    pub fn process(&self, key: &str, full_sync: bool) -> Result<Vec<String>> {
        match key.parse::<DispatchKey>()? {
            DispatchKey::Object { kind, obj } => {
                self.reconciler.reconcile_object(kind, &obj, full_sync)
            }
            DispatchKey::Node(node) => self.reconciler.reconcile_node(&node, full_sync),
        }
    }

    /// Reconciles every key without publishing, then publishes each changed model once.
    ///
    /// Keys that fail are logged and skipped so that one bad object cannot stall the sync.
    pub fn full_sync<'k>(&self, keys: impl IntoIterator<Item = &'k str>) -> Vec<String> {
        let mut changed = BTreeSet::new();
        for key in keys {
            match self.process(key, true) {
                Ok(names) => changed.extend(names),
                Err(error) => warn!(%key, %error, "Full sync failed to reconcile key"),
            }
        }
        for name in &changed {
            self.publisher.publish(name, FULL_SYNC_KEY);
        }
        info!(models = changed.len(), "Full sync complete");
        changed.into_iter().collect()
    }

    /// Processes keys until the sending side closes.
    ///
    /// Failures are logged. Retrying a key is left to whoever enqueued it.
    pub async fn run(&self, mut keys: mpsc::UnboundedReceiver<String>) {
        while let Some(key) = keys.recv().await {
            match self.process(&key, false) {
                Ok(names) => debug!(%key, models = names.len(), "Reconciled"),
                Err(error) => warn!(%key, ?error, "Failed to reconcile"),
            }
        }
        debug!("Key queue closed");
    }
}
