//! Event bus
//!
//! Named events map to ordered subscription lists. Dispatch walks the list in
//! registration order on the caller's turn; debounced subscriptions are handed
//! to a local timer task instead of being invoked inline.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::BusError;
use crate::Value;

new_key_type! {
    /// Handle returned by [`EventBus::subscribe`], used to unsubscribe later
    pub struct SubscriptionId;
}

/// Subscription callback
pub type Handler = Rc<dyn Fn(&[Value]) -> anyhow::Result<()>>;

/// Per-subscription options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Remove the subscription after its first successful invocation
    pub once: bool,
    /// Debounce window; only the last call in a quiet period fires
    pub delay: Option<Duration>,
}

impl SubscribeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-shot subscription
    pub fn once() -> Self {
        Self {
            once: true,
            delay: None,
        }
    }

    /// Debounced subscription
    pub fn delay(delay: Duration) -> Self {
        Self {
            once: false,
            delay: Some(delay),
        }
    }

    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

struct Subscription {
    event: String,
    handler: Handler,
    options: SubscribeOptions,
    /// Pending debounce timer, replaced on every call
    pending: Option<JoinHandle<()>>,
    /// Set while a one-shot handler runs so re-entrant dispatch skips it
    firing: bool,
}

#[derive(Default)]
struct Registry {
    events: FxHashMap<String, SmallVec<[SubscriptionId; 4]>>,
    subscriptions: SlotMap<SubscriptionId, Subscription>,
}

/// Named-event subscription registry.
///
/// Cloning an `EventBus` yields another handle to the same registry. Handlers
/// may subscribe, unsubscribe or dispatch re-entrantly: dispatch works from a
/// snapshot of the subscription list taken when it starts and skips entries
/// removed in the meantime.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to `event`'s subscription list
    pub fn subscribe<F>(&self, event: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&[Value]) -> anyhow::Result<()> + 'static,
    {
        self.subscribe_handler(event, SubscribeOptions::default(), Rc::new(handler))
    }

    /// Append a handler with explicit options
    pub fn subscribe_with<F>(
        &self,
        event: impl Into<String>,
        options: SubscribeOptions,
        handler: F,
    ) -> SubscriptionId
    where
        F: Fn(&[Value]) -> anyhow::Result<()> + 'static,
    {
        self.subscribe_handler(event, options, Rc::new(handler))
    }

    /// Append a handler that is removed after it first succeeds
    pub fn once<F>(&self, event: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&[Value]) -> anyhow::Result<()> + 'static,
    {
        self.subscribe_handler(event, SubscribeOptions::once(), Rc::new(handler))
    }

    /// Append an already shared handler
    pub fn subscribe_handler(
        &self,
        event: impl Into<String>,
        options: SubscribeOptions,
        handler: Handler,
    ) -> SubscriptionId {
        let event = event.into();
        let mut registry = self.registry.borrow_mut();
        let id = registry.subscriptions.insert(Subscription {
            event: event.clone(),
            handler,
            options,
            pending: None,
            firing: false,
        });
        registry.events.entry(event).or_default().push(id);
        id
    }

    /// Remove a subscription, cancelling its pending debounce timer.
    ///
    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.remove(id, true)
    }

    /// Remove every subscription for `event`
    pub fn off(&self, event: &str) -> usize {
        let ids = self
            .registry
            .borrow()
            .events
            .get(event)
            .cloned()
            .unwrap_or_default();
        ids.into_iter().filter(|&id| self.remove(id, true)).count()
    }

    /// Remove every subscription on the bus
    pub fn clear(&self) {
        let mut registry = self.registry.borrow_mut();
        for (_, subscription) in registry.subscriptions.drain() {
            if let Some(pending) = subscription.pending {
                pending.abort();
            }
        }
        registry.events.clear();
    }

    /// Number of subscriptions registered for `event`
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.registry
            .borrow()
            .events
            .get(event)
            .map_or(0, |ids| ids.len())
    }

    pub fn has_subscribers(&self, event: &str) -> bool {
        self.subscriber_count(event) > 0
    }

    /// Total number of subscriptions across all events
    pub fn len(&self) -> usize {
        self.registry.borrow().subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles point at the same registry
    pub fn ptr_eq(&self, other: &EventBus) -> bool {
        Rc::ptr_eq(&self.registry, &other.registry)
    }

    /// Invoke every subscription for `event` in registration order.
    ///
    /// Debounced subscriptions are scheduled rather than invoked and require a
    /// tokio `LocalSet`; without any runtime they are invoked inline. Returns the number of subscriptions invoked or
    /// scheduled; dispatching to an event without subscribers logs a warning
    /// and returns `Ok(0)`. The first synchronous handler error stops the walk
    /// and is returned to the caller.
    pub fn dispatch(&self, event: &str, args: &[Value]) -> Result<usize, BusError> {
        let ids = self
            .registry
            .borrow()
            .events
            .get(event)
            .cloned()
            .unwrap_or_default();

        if ids.is_empty() {
            warn!(event, "no subscribers for event");
            return Ok(0);
        }

        debug!(event, subscribers = ids.len(), "dispatch");

        let mut invoked = 0;
        for id in ids {
            let Some((handler, options)) = self.claim(id) else {
                continue;
            };

            match options.delay {
                Some(delay) => self.schedule(id, event, delay, handler, args),
                None => {
                    if let Err(source) = handler(args) {
                        self.release(id);
                        return Err(BusError::Handler {
                            event: event.to_owned(),
                            source,
                        });
                    }
                }
            }
            invoked += 1;

            if options.once {
                // A debounced one-shot keeps its timer alive after removal
                self.remove(id, false);
            }
        }

        Ok(invoked)
    }

    /// Fetch a live subscription for invocation, marking one-shots as firing
    fn claim(&self, id: SubscriptionId) -> Option<(Handler, SubscribeOptions)> {
        let mut registry = self.registry.borrow_mut();
        let subscription = registry.subscriptions.get_mut(id)?;
        if subscription.firing {
            return None;
        }
        if subscription.options.once {
            subscription.firing = true;
        }
        Some((subscription.handler.clone(), subscription.options))
    }

    fn release(&self, id: SubscriptionId) {
        if let Some(subscription) = self.registry.borrow_mut().subscriptions.get_mut(id) {
            subscription.firing = false;
        }
    }

    fn schedule(
        &self,
        id: SubscriptionId,
        event: &str,
        delay: Duration,
        handler: Handler,
        args: &[Value],
    ) {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(event, "no runtime for debounced handler, invoking inline");
            if let Err(err) = handler(args) {
                error!(event, error = %format_args!("{err:#}"), "debounced handler failed");
            }
            return;
        }

        let args = args.to_vec();
        let name = event.to_owned();
        let task = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = handler(&args) {
                error!(event = %name, error = %format_args!("{err:#}"), "debounced handler failed");
            }
        });

        let mut registry = self.registry.borrow_mut();
        if let Some(subscription) = registry.subscriptions.get_mut(id) {
            if let Some(previous) = subscription.pending.replace(task) {
                previous.abort();
            }
        }
    }

    fn remove(&self, id: SubscriptionId, abort_pending: bool) -> bool {
        let mut registry = self.registry.borrow_mut();
        let Some(subscription) = registry.subscriptions.remove(id) else {
            return false;
        };

        if abort_pending {
            if let Some(pending) = subscription.pending {
                pending.abort();
            }
        }

        if let Some(ids) = registry.events.get_mut(&subscription.event) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                registry.events.remove(&subscription.event);
            }
        }
        true
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("EventBus")
            .field("events", &registry.events.len())
            .field("subscriptions", &registry.subscriptions.len())
            .finish()
    }
}
