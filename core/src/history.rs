/// Loads the stored history of a conversation into the view
use crate::identity::{ConversationIdentity, Credential, SelfIdentity};
use crate::message::Message;
use crate::store::MessageStore;
use crate::view::SharedView;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Outcome of one history load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Some input was missing, nothing requested
    Skipped,
    /// History replaced the view
    Applied { count: usize },
    /// The selection changed, or a newer load was issued, while the request
    /// was in flight
    Stale,
    /// The store failed; view untouched
    Failed,
}

/// Identifies one issued load: the view generation it targets and its place
/// in the issue order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub seq: u64,
}

pub struct HistoryLoader<S: MessageStore> {
    store: Arc<S>,
    view: SharedView,
    issued: Arc<AtomicU64>,
}

impl<S: MessageStore> Clone for HistoryLoader<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            view: self.view.clone(),
            issued: self.issued.clone(),
        }
    }
}

impl<S: MessageStore> HistoryLoader<S> {
    pub fn new(store: Arc<S>, view: SharedView) -> Self {
        Self {
            store,
            view,
            issued: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Issue a ticket for a load against `generation`. Every earlier ticket is
    /// superseded.
    pub fn issue(&self, generation: u64) -> LoadTicket {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        LoadTicket { generation, seq }
    }

    /// Fetch the history for the pair and replace the view with it.
    ///
    /// The response is thrown away if the view has moved to another generation
    /// or a newer ticket was issued by the time it lands.
    pub async fn load(
        &self,
        ticket: LoadTicket,
        me: Option<&SelfIdentity>,
        conversation: Option<&ConversationIdentity>,
        credential: Option<&Credential>,
    ) -> LoadOutcome {
        let (Some(me), Some(conversation), Some(credential)) = (me, conversation, credential)
        else {
            debug!("History load skipped: missing identity or credential");
            return LoadOutcome::Skipped;
        };

        let records = match self
            .store
            .fetch_history(&me.id, &conversation.id, credential)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                error!("Error fetching messages with {}: {}", conversation.id, e);
                return LoadOutcome::Failed;
            }
        };

        let messages: Vec<Message> = records
            .into_iter()
            .map(|record| Message::from_record(record, &me.id))
            .collect();
        let count = messages.len();

        let mut view = self.view.write().await;
        let latest = self.issued.load(Ordering::SeqCst);
        if ticket.seq != latest {
            debug!(
                "Dropping history load {} with {} (latest {})",
                ticket.seq, conversation.id, latest
            );
            return LoadOutcome::Stale;
        }
        if view.replace(ticket.generation, messages) {
            info!("Loaded {} messages with {}", count, conversation.id);
            LoadOutcome::Applied { count }
        } else {
            LoadOutcome::Stale
        }
    }
}
