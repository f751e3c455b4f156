/// Change notifications streamed from the conversation view to the renderer
use crate::message::{DeliveryStatus, Message};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    /// A new conversation was selected; the view is empty again
    Reset { generation: u64 },
    /// History arrived and replaced the whole view
    Replaced {
        generation: u64,
        messages: Vec<Message>,
    },
    /// A live or outgoing message was appended
    Appended { message: Message },
    /// Persistence outcome of an outgoing message
    StatusChanged {
        message_id: Uuid,
        status: DeliveryStatus,
    },
}
