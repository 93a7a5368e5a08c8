use ingress_controller_core::source::Publish;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// The model names changed by one reconciliation, in the order they first changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishSet {
    names: Vec<String>,
}

/// Announces that a graph model changed while processing `key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelUpdate {
    pub model_name: String,
    pub key: String,
}

/// Forwards changed models to the downstream translation layer over a channel.
#[derive(Clone, Debug)]
pub struct ChannelPublisher {
    tx: UnboundedSender<ModelUpdate>,
}

// === impl PublishSet ===

impl PublishSet {
    pub fn insert(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Hands each name to `publisher` once.
    pub fn publish(&self, publisher: &dyn Publish, key: &str) {
        for name in &self.names {
            info!(model = %name, %key, "Publishing graph model");
            publisher.publish(name, key);
        }
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}

// === impl ChannelPublisher ===

impl ChannelPublisher {
    pub fn new(tx: UnboundedSender<ModelUpdate>) -> Self {
        Self { tx }
    }
}

impl Publish for ChannelPublisher {
    fn publish(&self, model_name: &str, key: &str) {
        let update = ModelUpdate {
            model_name: model_name.to_string(),
            key: key.to_string(),
        };
        if self.tx.send(update).is_err() {
            debug!(model = %model_name, "Publish channel closed");
        }
    }
}
