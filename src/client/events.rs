use crate::models::ResourceKind;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    Created,
    Updated,
    Deleted,
}

/// Published after every change to a cached collection. Subscribers re-read
/// the shared collection; `id` names the record that changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub kind: ResourceKind,
    pub id: String,
    pub change: ChangeType,
}

/// One broadcast channel per resource kind.
pub struct ChangeNotifier {
    channels: HashMap<ResourceKind, broadcast::Sender<ChangeEvent>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let channels = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, broadcast::channel(capacity).0))
            .collect();
        ChangeNotifier { channels }
    }

    pub fn subscribe(&self, kind: ResourceKind) -> broadcast::Receiver<ChangeEvent> {
        self.sender(kind).subscribe()
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        // Sending with no subscribers is not an error here.
        self.sender(event.kind).send(event).unwrap_or(0)
    }

    fn sender(&self, kind: ResourceKind) -> &broadcast::Sender<ChangeEvent> {
        // Every kind gets a channel in the constructor.
        &self.channels[&kind]
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
