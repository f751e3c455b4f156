/// Chat messages as shown in the view, and the records exchanged with collaborators
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persistence state of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Sent locally, store has not answered yet
    Pending,
    /// Known to the store (history, inbound, or acknowledged send)
    Confirmed,
    /// Store rejected or could not be reached
    Failed,
}

/// One entry of the conversation view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Local id, stable for the lifetime of the view
    pub id: Uuid,
    pub from_self: bool,
    pub text: String,
    pub status: DeliveryStatus,
    /// When the view accepted the message
    pub accepted_at: DateTime<Utc>,
}

impl Message {
    /// A message written by somebody else
    pub fn inbound(text: impl Into<String>) -> Self {
        Self::new(false, text.into(), DeliveryStatus::Confirmed)
    }

    /// A message we are about to send
    pub fn outgoing(text: impl Into<String>) -> Self {
        Self::new(true, text.into(), DeliveryStatus::Pending)
    }

    /// Classify a history record against our own id
    pub fn from_record(record: HistoryRecord, self_id: &str) -> Self {
        let from_self = record.from == self_id;
        Self::new(from_self, record.message, DeliveryStatus::Confirmed)
    }

    fn new(from_self: bool, text: String, status: DeliveryStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_self,
            text,
            status,
            accepted_at: Utc::now(),
        }
    }
}

/// One stored message as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub message: String,
}

/// Body of the persist request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub from: String,
    pub to: String,
    pub message: String,
}

/// Live event we push to the counterpart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub to: String,
    pub msg: String,
}

/// Live event pushed to us; `from` is the conversation it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub msg: String,
    pub from: String,
}

impl InboundEvent {
    pub fn new(msg: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            from: from.into(),
        }
    }
}
