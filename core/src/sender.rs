/// Outgoing messages: optimistic append, then persist and push
use crate::identity::{ConversationIdentity, Credential, SelfIdentity};
use crate::message::{DeliveryStatus, Message, OutboundEvent, SendRequest};
use crate::store::MessageStore;
use crate::transport::Transport;
use crate::view::SharedView;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// A validated send, ready to hand to the collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub request: SendRequest,
    pub event: OutboundEvent,
    pub credential: Credential,
}

impl Dispatch {
    /// None when the text is blank or any identity/credential is missing
    pub fn prepare(
        text: &str,
        me: Option<&SelfIdentity>,
        conversation: Option<&ConversationIdentity>,
        credential: Option<&Credential>,
    ) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        let (me, conversation, credential) = (me?, conversation?, credential?);
        Some(Self {
            request: SendRequest {
                from: me.id.clone(),
                to: conversation.id.clone(),
                message: text.to_string(),
            },
            event: OutboundEvent {
                to: conversation.id.clone(),
                msg: text.to_string(),
            },
            credential: credential.clone(),
        })
    }
}

pub struct OutgoingSender<S: MessageStore> {
    store: Arc<S>,
    view: SharedView,
}

impl<S: MessageStore> OutgoingSender<S> {
    pub fn new(store: Arc<S>, view: SharedView) -> Self {
        Self { store, view }
    }

    /// Append `dispatch` to the view as pending and deliver it in the background.
    ///
    /// The returned task resolves to the persistence outcome, which is also
    /// recorded on the message. The message stays in the view either way.
    pub async fn send(
        &self,
        dispatch: Dispatch,
        generation: u64,
        transport: Option<Arc<dyn Transport>>,
    ) -> Option<(Uuid, JoinHandle<DeliveryStatus>)> {
        let message = Message::outgoing(dispatch.request.message.clone());
        let id = message.id;
        if !self.view.write().await.append(generation, message) {
            return None;
        }

        let store = self.store.clone();
        let view = self.view.clone();
        let handle =
            tokio::spawn(async move { deliver(store, view, transport, dispatch, id).await });
        Some((id, handle))
    }
}

async fn deliver<S: MessageStore>(
    store: Arc<S>,
    view: SharedView,
    transport: Option<Arc<dyn Transport>>,
    dispatch: Dispatch,
    id: Uuid,
) -> DeliveryStatus {
    let status = match store.persist(&dispatch.request, &dispatch.credential).await {
        Ok(()) => DeliveryStatus::Confirmed,
        Err(e) => {
            error!("Failed to send message to {}: {}", dispatch.request.to, e);
            DeliveryStatus::Failed
        }
    };
    view.write().await.set_status(id, status);

    match transport {
        Some(transport) => {
            if let Err(e) = transport.emit(&dispatch.event).await {
                warn!("Failed to push message to {}: {}", dispatch.event.to, e);
            }
        }
        None => debug!("No transport attached, message {} not pushed", id),
    }
    status
}
