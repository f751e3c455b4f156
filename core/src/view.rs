/// The ordered message list of the active conversation
use crate::attention::{AttentionCue, ScrollRequest};
use crate::events::ViewEvent;
use crate::message::{DeliveryStatus, Message};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

pub type SharedView = Arc<RwLock<ConversationView>>;

/// Messages of exactly one selection, in acceptance order.
///
/// Every selection gets a new generation. Writers that were started for an
/// older generation (history fetches, live listeners) are rejected, so nothing
/// leaks from one conversation into the next.
pub struct ConversationView {
    generation: u64,
    messages: Vec<Message>,
    cue: AttentionCue,
    events: broadcast::Sender<ViewEvent>,
}

impl ConversationView {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            generation: 0,
            messages: Vec::new(),
            cue: AttentionCue::new(capacity),
            events,
        }
    }

    pub fn shared(capacity: usize) -> SharedView {
        Arc::new(RwLock::new(Self::new(capacity)))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_scroll(&self) -> broadcast::Receiver<ScrollRequest> {
        self.cue.subscribe()
    }

    /// Drop everything and start a new generation
    pub fn reset(&mut self) -> u64 {
        self.generation += 1;
        self.messages.clear();
        debug!("View reset to generation {}", self.generation);
        self.publish(ViewEvent::Reset {
            generation: self.generation,
        });
        self.generation
    }

    /// Replace the whole content with a loaded history.
    ///
    /// Own messages the store has not confirmed (still pending or failed) are
    /// not part of any history, so they are kept after it in their order.
    pub fn replace(&mut self, generation: u64, messages: Vec<Message>) -> bool {
        if generation != self.generation {
            debug!(
                "Dropping history for generation {} (current {})",
                generation, self.generation
            );
            return false;
        }
        let unsaved: Vec<Message> = self
            .messages
            .drain(..)
            .filter(|m| m.from_self && m.status != DeliveryStatus::Confirmed)
            .collect();
        self.messages = messages;
        self.messages.extend(unsaved);
        self.publish(ViewEvent::Replaced {
            generation,
            messages: self.messages.clone(),
        });
        true
    }

    /// Append one live or outgoing message
    pub fn append(&mut self, generation: u64, message: Message) -> bool {
        if generation != self.generation {
            debug!(
                "Dropping message for generation {} (current {})",
                generation, self.generation
            );
            return false;
        }
        self.messages.push(message.clone());
        self.publish(ViewEvent::Appended { message });
        true
    }

    /// Record the persistence outcome of a message still in the view
    pub fn set_status(&mut self, id: Uuid, status: DeliveryStatus) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        message.status = status;
        self.publish(ViewEvent::StatusChanged {
            message_id: id,
            status,
        });
        true
    }

    fn publish(&mut self, event: ViewEvent) {
        let _ = self.events.send(event);
        self.cue.observe(self.messages.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_empties_and_bumps_generation() {
        let mut view = ConversationView::new(16);
        let gen = view.reset();
        assert!(view.append(gen, Message::inbound("a")));
        assert_eq!(view.len(), 1);

        let next = view.reset();
        assert_eq!(next, gen + 1);
        assert!(view.is_empty());
    }

    #[test]
    fn test_stale_writers_are_rejected() {
        let mut view = ConversationView::new(16);
        let old = view.reset();
        let current = view.reset();

        assert!(!view.append(old, Message::inbound("late")));
        assert!(!view.replace(old, vec![Message::inbound("stale history")]));
        assert!(view.is_empty());

        assert!(view.replace(current, vec![Message::inbound("fresh")]));
        assert_eq!(view.messages()[0].text, "fresh");
    }

    #[test]
    fn test_replace_discards_previous_content() {
        let mut view = ConversationView::new(16);
        let gen = view.reset();
        view.append(gen, Message::inbound("one"));
        view.append(gen, Message::inbound("two"));

        view.replace(gen, vec![Message::inbound("three")]);
        let texts: Vec<_> = view.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["three"]);
    }

    #[test]
    fn test_replace_keeps_unsaved_own_messages() {
        let mut view = ConversationView::new(16);
        let gen = view.reset();
        let saved = Message::outgoing("saved");
        let failed = Message::outgoing("failed");
        let (saved_id, failed_id) = (saved.id, failed.id);
        view.append(gen, saved);
        view.append(gen, failed);
        view.append(gen, Message::outgoing("in flight"));
        view.append(gen, Message::inbound("live"));
        view.set_status(saved_id, DeliveryStatus::Confirmed);
        view.set_status(failed_id, DeliveryStatus::Failed);

        assert!(view.replace(gen, vec![Message::inbound("stored")]));
        let texts: Vec<_> = view.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["stored", "failed", "in flight"]);
        assert_eq!(view.messages()[1].id, failed_id);
        assert_eq!(view.messages()[1].status, DeliveryStatus::Failed);
    }

    #[test]
    fn test_status_update_and_events() {
        let mut view = ConversationView::new(16);
        let mut events = view.subscribe_events();
        let mut scroll = view.subscribe_scroll();
        let gen = view.reset();

        let msg = Message::outgoing("hello");
        let id = msg.id;
        view.append(gen, msg);
        assert!(view.set_status(id, DeliveryStatus::Failed));
        assert!(!view.set_status(Uuid::new_v4(), DeliveryStatus::Confirmed));
        assert_eq!(view.messages()[0].status, DeliveryStatus::Failed);

        assert!(matches!(events.try_recv().unwrap(), ViewEvent::Reset { .. }));
        assert!(matches!(events.try_recv().unwrap(), ViewEvent::Appended { .. }));
        assert!(matches!(
            events.try_recv().unwrap(),
            ViewEvent::StatusChanged {
                status: DeliveryStatus::Failed,
                ..
            }
        ));

        // Reset on an empty view does not move the length; the append does
        assert_eq!(scroll.try_recv().unwrap().index, Some(0));
        assert!(scroll.try_recv().is_err());
    }
}
