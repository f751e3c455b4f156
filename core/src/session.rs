/// Chat session: owns the render-boundary inputs and wires the synchronizer
use crate::attention::ScrollRequest;
use crate::binder::{LiveEventBinder, Subscription};
use crate::color::Avatar;
use crate::config::Config;
use crate::events::ViewEvent;
use crate::history::{HistoryLoader, LoadOutcome};
use crate::identity::{Binding, ConversationIdentity, Credential, SelfIdentity};
use crate::message::{DeliveryStatus, Message};
use crate::sender::{Dispatch, OutgoingSender};
use crate::store::MessageStore;
use crate::transport::Transport;
use crate::view::{ConversationView, SharedView};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Bound on how long a live event waits for the conversation id
    pub grace_period: Duration,
    /// Capacity of the view and scroll channels
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        let config = Config::default();
        Self::from(&config)
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            grace_period: config.grace_period,
            event_capacity: config.event_capacity,
        }
    }
}

/// One chat surface bound to at most one conversation at a time.
///
/// Selecting a conversation empties the view right away, then history and live
/// events fill it for that selection only.
pub struct ChatSession<S: MessageStore> {
    view: SharedView,
    history: HistoryLoader<S>,
    sender: OutgoingSender<S>,
    binder: LiveEventBinder,
    me: Option<SelfIdentity>,
    credential: Option<Credential>,
    binding: watch::Sender<Binding>,
    transport: Option<Arc<dyn Transport>>,
    subscription: Option<Subscription>,
    generation: u64,
    input: String,
}

impl<S: MessageStore> ChatSession<S> {
    pub fn new(store: Arc<S>, options: SessionOptions) -> Self {
        let view = ConversationView::shared(options.event_capacity);
        let (binding, _) = watch::channel(Binding::Unselected);
        Self {
            history: HistoryLoader::new(store.clone(), view.clone()),
            sender: OutgoingSender::new(store, view.clone()),
            binder: LiveEventBinder::new(view.clone(), options.grace_period),
            view,
            me: None,
            credential: None,
            binding,
            transport: None,
            subscription: None,
            generation: 0,
            input: String::new(),
        }
    }

    // ─── Inputs ──────────────────────────────────────────────────────────────

    pub fn set_self(&mut self, me: Option<SelfIdentity>) -> Option<JoinHandle<LoadOutcome>> {
        if self.me == me {
            return None;
        }
        self.me = me;
        self.reload()
    }

    pub fn set_credential(
        &mut self,
        credential: Option<Credential>,
    ) -> Option<JoinHandle<LoadOutcome>> {
        if self.credential == credential {
            return None;
        }
        self.credential = credential;
        self.reload()
    }

    /// Replace the push transport; the live listener is rebuilt on it
    pub fn attach_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transport = Some(transport);
        self.rebind();
    }

    pub fn detach_transport(&mut self) {
        self.transport = None;
        self.rebind();
    }

    /// Select a conversation. `id` may still be unknown; confirm it later with
    /// [`ChatSession::confirm_conversation`].
    pub async fn select_conversation(
        &mut self,
        display_name: impl Into<String>,
        id: Option<String>,
    ) -> Option<JoinHandle<LoadOutcome>> {
        let display_name = display_name.into();
        let binding = match id {
            Some(id) => Binding::Confirmed(ConversationIdentity::new(id, display_name)),
            None => Binding::Pending { display_name },
        };
        info!("Selecting conversation {:?}", binding);
        self.switch(binding).await;
        self.reload()
    }

    /// Resolve the id of a pending selection
    pub fn confirm_conversation(&mut self, id: impl Into<String>) -> Option<JoinHandle<LoadOutcome>> {
        let id = id.into();
        let confirmed = match &*self.binding.borrow() {
            Binding::Pending { display_name } => {
                Binding::Confirmed(ConversationIdentity::new(id, display_name.clone()))
            }
            other => {
                warn!("Ignoring confirmation of {} while {:?}", id, other);
                return None;
            }
        };
        debug!("Conversation confirmed: {:?}", confirmed);
        self.binding.send_replace(confirmed);
        self.reload()
    }

    pub async fn clear_selection(&mut self) {
        self.switch(Binding::Unselected).await;
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    // ─── Operations ──────────────────────────────────────────────────────────

    /// Send the pending input. A silent no-op when the input is blank or the
    /// session is missing an identity or the credential.
    pub async fn send(&mut self) -> Option<JoinHandle<DeliveryStatus>> {
        let conversation = self.binding.borrow().identity().cloned();
        let Some(dispatch) = Dispatch::prepare(
            &self.input,
            self.me.as_ref(),
            conversation.as_ref(),
            self.credential.as_ref(),
        ) else {
            debug!("Send skipped: empty input or incomplete session");
            return None;
        };

        let (id, handle) = self
            .sender
            .send(dispatch, self.generation, self.transport.clone())
            .await?;
        debug!("Outgoing message {} appended", id);
        self.input.clear();
        Some(handle)
    }

    /// Fetch the history of the current selection again
    pub fn reload(&self) -> Option<JoinHandle<LoadOutcome>> {
        let conversation = self.binding.borrow().identity().cloned();
        if self.me.is_none() || conversation.is_none() || self.credential.is_none() {
            debug!("History load skipped: missing identity or credential");
            return None;
        }

        let loader = self.history.clone();
        let me = self.me.clone();
        let credential = self.credential.clone();
        let ticket = loader.issue(self.generation);
        debug!("Issuing history load {:?}", ticket);
        Some(tokio::spawn(async move {
            loader
                .load(
                    ticket,
                    me.as_ref(),
                    conversation.as_ref(),
                    credential.as_ref(),
                )
                .await
        }))
    }

    // ─── Outputs ─────────────────────────────────────────────────────────────

    pub async fn messages(&self) -> Vec<Message> {
        self.view.read().await.messages().to_vec()
    }

    pub fn binding(&self) -> Binding {
        self.binding.borrow().clone()
    }

    pub fn avatar(&self) -> Avatar {
        Avatar::for_name(self.binding.borrow().display_name())
    }

    pub async fn scroll_requests(&self) -> broadcast::Receiver<ScrollRequest> {
        self.view.read().await.subscribe_scroll()
    }

    pub async fn view_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.view.read().await.subscribe_events()
    }

    pub fn view(&self) -> SharedView {
        self.view.clone()
    }

    /// Whether a live listener is currently registered
    pub fn is_listening(&self) -> bool {
        self.subscription
            .as_ref()
            .map(Subscription::is_active)
            .unwrap_or(false)
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    async fn switch(&mut self, binding: Binding) {
        // Old listener goes first so nothing lands in the fresh view
        self.subscription = None;
        self.generation = self.view.write().await.reset();
        self.binding.send_replace(binding);
        self.rebind();
    }

    fn rebind(&mut self) {
        self.subscription = None;
        let Some(transport) = self.transport.as_ref() else {
            return;
        };
        if *self.binding.borrow() == Binding::Unselected {
            return;
        }
        self.subscription = Some(self.binder.bind(
            transport.subscribe(),
            self.binding.subscribe(),
            self.generation,
        ));
    }
}
