/// Scroll-to-latest cue for the render boundary
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    Smooth,
}

/// Bring entry `index` into view. `None` means the view is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollRequest {
    pub index: Option<usize>,
    pub behavior: ScrollBehavior,
}

/// Watches the view length and asks for a smooth scroll whenever it changes.
pub struct AttentionCue {
    tx: broadcast::Sender<ScrollRequest>,
    last_len: usize,
}

impl AttentionCue {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, last_len: 0 }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScrollRequest> {
        self.tx.subscribe()
    }

    /// Returns true when a scroll request was published
    pub fn observe(&mut self, len: usize) -> bool {
        if len == self.last_len {
            return false;
        }
        self.last_len = len;
        // No renderer attached is fine
        let _ = self.tx.send(ScrollRequest {
            index: len.checked_sub(1),
            behavior: ScrollBehavior::Smooth,
        });
        true
    }
}
