/// Binds live inbound events to the selected conversation
use crate::identity::Binding;
use crate::message::{InboundEvent, Message};
use crate::view::SharedView;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Owned listener registration. Dropping it tears the listener down.
pub struct Subscription {
    generation: u64,
    task: JoinHandle<()>,
}

impl Subscription {
    /// View generation this listener appends to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct LiveEventBinder {
    view: SharedView,
    grace_period: Duration,
}

impl LiveEventBinder {
    pub fn new(view: SharedView, grace_period: Duration) -> Self {
        Self { view, grace_period }
    }

    /// Start listening on `events` for the selection behind `binding`.
    ///
    /// Events for a confirmed conversation are matched right away. Events that
    /// arrive before the conversation id is confirmed wait at most the grace
    /// period; they are re-checked as soon as the id is confirmed, or at their
    /// deadline otherwise, and dropped if they still do not match. Nothing is
    /// buffered for other conversations.
    pub fn bind(
        &self,
        events: broadcast::Receiver<InboundEvent>,
        binding: watch::Receiver<Binding>,
        generation: u64,
    ) -> Subscription {
        let task = BinderTask {
            view: self.view.clone(),
            grace_period: self.grace_period,
            generation,
            binding,
            deferred: VecDeque::new(),
        };
        Subscription {
            generation,
            task: tokio::spawn(task.run(events)),
        }
    }
}

struct Deferred {
    event: InboundEvent,
    deadline: Instant,
}

struct BinderTask {
    view: SharedView,
    grace_period: Duration,
    generation: u64,
    binding: watch::Receiver<Binding>,
    deferred: VecDeque<Deferred>,
}

impl BinderTask {
    async fn run(mut self, mut events: broadcast::Receiver<InboundEvent>) {
        debug!("Live listener bound for generation {}", self.generation);
        loop {
            let next_deadline = self.deferred.front().map(|d| d.deadline);
            let expiry = async move {
                match next_deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => self.on_event(event).await,
                    Err(RecvError::Lagged(n)) => {
                        warn!("Live listener lagged {} events", n);
                    }
                    Err(RecvError::Closed) => {
                        info!("Live event source closed");
                        break;
                    }
                },
                changed = self.binding.changed() => {
                    if changed.is_err() {
                        debug!("Selection owner gone, stopping live listener");
                        break;
                    }
                    let current = self.binding.borrow_and_update().clone();
                    self.revalidate(&current).await;
                }
                _ = expiry => self.expire().await,
            }
        }
    }

    async fn on_event(&mut self, event: InboundEvent) {
        let current = self.binding.borrow().clone();
        match current.confirmed_id() {
            Some(id) => {
                // Older deferred events go first
                self.revalidate(&current).await;
                if id == event.from {
                    self.append(event).await;
                } else {
                    debug!("Discarding live message from {} (active {})", event.from, id);
                }
            }
            None => {
                debug!(
                    "Conversation not confirmed yet, deferring message from {}",
                    event.from
                );
                self.deferred.push_back(Deferred {
                    event,
                    deadline: Instant::now() + self.grace_period,
                });
            }
        }
    }

    /// Settle deferred events once the conversation id is known
    async fn revalidate(&mut self, current: &Binding) {
        let Some(id) = current.confirmed_id() else {
            return;
        };
        while let Some(Deferred { event, .. }) = self.deferred.pop_front() {
            if event.from == id {
                self.append(event).await;
            } else {
                debug!("Deferred message from {} does not match {}", event.from, id);
            }
        }
    }

    /// Re-check every deferred event whose grace period is over
    async fn expire(&mut self) {
        let now = Instant::now();
        let current = self.binding.borrow().clone();
        while self.deferred.front().is_some_and(|d| d.deadline <= now) {
            let Some(Deferred { event, .. }) = self.deferred.pop_front() else {
                break;
            };
            if current.confirmed_id() == Some(event.from.as_str()) {
                self.append(event).await;
            } else {
                debug!(
                    "Dropping message from {} after {:?} grace period",
                    event.from, self.grace_period
                );
            }
        }
    }

    async fn append(&self, event: InboundEvent) {
        let accepted = self
            .view
            .write()
            .await
            .append(self.generation, Message::inbound(event.msg));
        if accepted {
            debug!("Live message from {} appended", event.from);
        }
    }
}
