//! Stateful components
//!
//! A [`Component`] owns a state value, a view function and a set of update
//! handlers keyed by event name. Dispatching an event runs the matching
//! handler with the current state; whatever it returns is committed, which
//! re-renders the view into the component's mount target and records the new
//! state in history.
//!
//! # Lifecycle
//!
//! ```text
//! Unbound --mount--> Bound --unmount--> Disposed
//! ```
//!
//! Mounting registers every update handler on the routing bus and performs an
//! initial commit. Unmounting unregisters them again; a disposed component
//! cannot be mounted anymore.
//!
//! # Routing
//!
//! Events whose first character is one of the context's global markers always
//! travel on the shared bus. Other events use the component's private bus,
//! unless the component was mounted with `global_event`.

use std::any::Any;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};

use pulse_core::{split_event_names, EventBus, SubscriptionId, Value};
use pulse_vdom::{Fragment, NodeId, Prop};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::{CommitOptions, HistoryOption, MountOptions};
use crate::context::{AppContext, Mounted};
use crate::directive;
use crate::error::ComponentError;
use crate::history::History;

/// Boxed future produced by an asynchronous update
pub type LocalFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// View function of a component
pub type ViewFn<S> = Rc<dyn Fn(&S) -> Fragment>;

/// Update handler: current state and event payload in, next state out
pub type UpdateFn<S> = Rc<dyn Fn(&S, &[Value]) -> anyhow::Result<Update<S>>>;

/// Result of an update handler
pub enum Update<S> {
    /// Nothing to commit
    Skip,
    Next(S),
    /// Commit once the future resolves; `Ok(None)` commits nothing
    Pending(LocalFuture<anyhow::Result<Option<S>>>),
}

impl<S: 'static> Update<S> {
    /// Asynchronous update resolving to the next state
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<S>> + 'static,
    {
        Update::Pending(Box::pin(async move { future.await.map(Some) }))
    }

    pub fn from_option(state: Option<S>) -> Self {
        state.map_or(Update::Skip, Update::Next)
    }
}

impl<S> From<S> for Update<S> {
    fn from(state: S) -> Self {
        Update::Next(state)
    }
}

impl<S> fmt::Debug for Update<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Skip => f.write_str("Skip"),
            Update::Next(_) => f.write_str("Next(..)"),
            Update::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// What a commit request did
#[derive(Debug)]
pub enum Commit {
    Applied,
    Skipped,
    /// Runs when the pending update resolves; yields the update's error if it
    /// rejected
    Deferred(JoinHandle<anyhow::Result<()>>),
}

/// Where a component renders
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MountTarget {
    Node(NodeId),
    /// Element id, looked up on every render
    Id(String),
}

impl From<NodeId> for MountTarget {
    fn from(node: NodeId) -> Self {
        MountTarget::Node(node)
    }
}

impl From<&str> for MountTarget {
    fn from(id: &str) -> Self {
        MountTarget::Id(id.to_owned())
    }
}

impl From<String> for MountTarget {
    fn from(id: String) -> Self {
        MountTarget::Id(id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Unbound,
    Bound,
    Disposed,
}

struct UpdateEntry<S> {
    events: String,
    options: CommitOptions,
    handler: UpdateFn<S>,
}

impl<S> Clone for UpdateEntry<S> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            options: self.options,
            handler: self.handler.clone(),
        }
    }
}

pub(crate) struct ComponentInner<S> {
    id: u64,
    name: String,
    context: AppContext,
    state: RefCell<S>,
    view: ViewFn<S>,
    updates: RefCell<Vec<UpdateEntry<S>>>,
    bus: EventBus,
    options: RefCell<MountOptions<S>>,
    target: RefCell<Option<MountTarget>>,
    lifecycle: Cell<Lifecycle>,
    history: RefCell<History<S>>,
    subscriptions: RefCell<Vec<(EventBus, SubscriptionId)>>,
    generation: Cell<u64>,
}

/// Handle to a stateful component; clones share the same instance
pub struct Component<S: 'static> {
    inner: Rc<ComponentInner<S>>,
}

impl<S: 'static> Clone for Component<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Collects the parts of a [`Component`] before it is built
pub struct ComponentBuilder<S: 'static> {
    context: AppContext,
    name: String,
    state: S,
    view: Option<ViewFn<S>>,
    updates: Vec<UpdateEntry<S>>,
    options: MountOptions<S>,
}

impl<S: Clone + 'static> ComponentBuilder<S> {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn view<F, V>(mut self, view: F) -> Self
    where
        F: Fn(&S) -> V + 'static,
        V: Into<Fragment>,
    {
        self.view = Some(Rc::new(move |state: &S| view(state).into()));
        self
    }

    /// Handle `events` (comma separated names) with an infallible handler
    pub fn on<F, R>(self, events: &str, handler: F) -> Self
    where
        F: Fn(&S, &[Value]) -> R + 'static,
        R: Into<Update<S>>,
    {
        self.on_with(events, CommitOptions::default(), handler)
    }

    /// Like [`on`](Self::on), with options applied to every commit it causes
    pub fn on_with<F, R>(mut self, events: &str, options: CommitOptions, handler: F) -> Self
    where
        F: Fn(&S, &[Value]) -> R + 'static,
        R: Into<Update<S>>,
    {
        self.updates.push(UpdateEntry {
            events: events.to_owned(),
            options,
            handler: Rc::new(move |state: &S, args: &[Value]| Ok(handler(state, args).into())),
        });
        self
    }

    /// Handle `events` with a handler whose error propagates to the dispatcher
    pub fn try_on<F, R>(mut self, events: &str, handler: F) -> Self
    where
        F: Fn(&S, &[Value]) -> anyhow::Result<R> + 'static,
        R: Into<Update<S>>,
    {
        self.updates.push(UpdateEntry {
            events: events.to_owned(),
            options: CommitOptions::default(),
            handler: Rc::new(move |state: &S, args: &[Value]| handler(state, args).map(Into::into)),
        });
        self
    }

    /// Options stored ahead of mounting; `mount_with` overlays its own
    pub fn options(mut self, options: MountOptions<S>) -> Self {
        self.options.merge(options);
        self
    }

    pub fn build(self) -> Component<S> {
        let view: ViewFn<S> = match self.view {
            Some(view) => view,
            None => Rc::new(|_: &S| Fragment::new()),
        };
        Component {
            inner: Rc::new(ComponentInner {
                id: self.context.allocate_id(),
                name: self.name,
                context: self.context,
                state: RefCell::new(self.state),
                view,
                updates: RefCell::new(self.updates),
                bus: EventBus::new(),
                options: RefCell::new(self.options),
                target: RefCell::new(None),
                lifecycle: Cell::new(Lifecycle::Unbound),
                history: RefCell::new(History::new()),
                subscriptions: RefCell::new(Vec::new()),
                generation: Cell::new(0),
            }),
        }
    }
}

impl<S: Clone + 'static> Component<S> {
    pub fn builder(context: &AppContext, state: S) -> ComponentBuilder<S> {
        ComponentBuilder {
            context: context.clone(),
            name: "component".to_owned(),
            state,
            view: None,
            updates: Vec::new(),
            options: MountOptions::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn context(&self) -> &AppContext {
        &self.inner.context
    }

    /// The component's private bus
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle.get()
    }

    /// Clone of the committed state
    pub fn state(&self) -> S {
        self.inner.state.borrow().clone()
    }

    pub fn history(&self) -> Ref<'_, History<S>> {
        self.inner.history.borrow()
    }

    pub fn target(&self) -> Option<MountTarget> {
        self.inner.target.borrow().clone()
    }

    pub fn mount(&self, target: impl Into<MountTarget>) -> Result<(), ComponentError> {
        self.mount_with(target, MountOptions::new())
    }

    /// Bind to `target`, register handlers and perform the initial commit
    pub fn mount_with(
        &self,
        target: impl Into<MountTarget>,
        options: MountOptions<S>,
    ) -> Result<(), ComponentError> {
        match self.lifecycle() {
            Lifecycle::Bound => {
                return Err(ComponentError::AlreadyMounted {
                    name: self.inner.name.clone(),
                })
            }
            Lifecycle::Disposed => {
                return Err(ComponentError::Disposed {
                    name: self.inner.name.clone(),
                })
            }
            Lifecycle::Unbound => {}
        }

        self.inner.options.borrow_mut().merge(options);
        *self.inner.target.borrow_mut() = Some(target.into());
        self.inner.lifecycle.set(Lifecycle::Bound);
        self.inner
            .context
            .register(self.inner.id, Rc::new(self.clone()));

        let history = self.inner.options.borrow().history.clone().unwrap_or_default();
        if history.is_enabled() {
            self.register_history(&history);
        }

        let updates = self.inner.updates.borrow().clone();
        for entry in &updates {
            self.register_update(entry);
        }

        debug!(component = %self.inner.name, "mounted");

        let render = self.inner.options.borrow().render.unwrap_or(true);
        let state = self.state();
        self.apply(state, CommitOptions::default().render(render));
        Ok(())
    }

    /// Unregister every subscription and leave the shared registries.
    ///
    /// The host content rendered so far is left in place.
    pub fn unmount(&self) {
        if self.lifecycle() == Lifecycle::Disposed {
            return;
        }

        for (bus, id) in self.inner.subscriptions.borrow_mut().drain(..) {
            bus.unsubscribe(id);
        }
        self.inner.context.unregister(self.inner.id);
        self.inner
            .context
            .forget_instance(&self.inner.name, Rc::as_ptr(&self.inner) as *const ());
        *self.inner.target.borrow_mut() = None;
        self.inner.lifecycle.set(Lifecycle::Disposed);

        debug!(component = %self.inner.name, "unmounted");
    }

    /// Add a handler; registered immediately when already mounted
    pub fn on<F, R>(&self, events: &str, handler: F)
    where
        F: Fn(&S, &[Value]) -> R + 'static,
        R: Into<Update<S>>,
    {
        let entry = UpdateEntry {
            events: events.to_owned(),
            options: CommitOptions::default(),
            handler: Rc::new(move |state: &S, args: &[Value]| Ok(handler(state, args).into())),
        };
        if self.lifecycle() == Lifecycle::Bound {
            self.register_update(&entry);
        }
        self.inner.updates.borrow_mut().push(entry);
    }

    /// Bus an event name routes to
    pub fn routing_bus(&self, event: &str) -> EventBus {
        let global = self.inner.options.borrow().global_event.unwrap_or(false);
        if global || self.inner.context.config().is_global(event) {
            self.inner.context.bus().clone()
        } else {
            self.inner.bus.clone()
        }
    }

    /// Dispatch `event` on the bus it routes to
    pub fn run(&self, event: &str, args: &[Value]) -> Result<usize, ComponentError> {
        Ok(self.routing_bus(event).dispatch(event, args)?)
    }

    /// Commit `update`.
    ///
    /// Pending updates are committed by a local task once they resolve; a
    /// rejected update is logged, broadcast on the shared bus under
    /// `events.update_error` and leaves the state untouched.
    pub fn set_state(&self, update: impl Into<Update<S>>, options: CommitOptions) -> Commit {
        if self.lifecycle() == Lifecycle::Disposed {
            debug!(component = %self.inner.name, "commit on disposed component ignored");
            return Commit::Skipped;
        }

        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);

        match update.into() {
            Update::Skip => Commit::Skipped,
            Update::Next(state) => {
                self.apply(state, options);
                Commit::Applied
            }
            Update::Pending(_) if tokio::runtime::Handle::try_current().is_err() => {
                error!(component = %self.inner.name, "async update needs a tokio LocalSet, dropped");
                Commit::Skipped
            }
            Update::Pending(future) => {
                let weak = Rc::downgrade(&self.inner);
                let name = self.inner.name.clone();
                let context = self.inner.context.clone();
                let handle = tokio::task::spawn_local(async move {
                    let resolved = future.await;
                    if let Err(err) = &resolved {
                        error!(component = %name, error = %format_args!("{err:#}"), "async update failed");
                        report_rejection(&context, &name, err);
                    }
                    let Some(component) = upgrade(&weak) else {
                        return resolved.map(|_| ());
                    };
                    match resolved {
                        Ok(Some(state)) => {
                            if component.lifecycle() == Lifecycle::Disposed {
                                debug!(component = %name, "dropping async update of a disposed component");
                            } else if component.is_stale(generation) {
                                debug!(component = %name, generation, "dropping overtaken async update");
                            } else {
                                component.apply(state, options);
                            }
                            Ok(())
                        }
                        Ok(None) => Ok(()),
                        Err(err) => Err(err),
                    }
                });
                Commit::Deferred(handle)
            }
        }
    }

    /// Step back in history and re-render; false at the oldest entry
    pub fn history_prev(&self) -> bool {
        let state = self.inner.history.borrow_mut().prev().cloned();
        self.navigate(state)
    }

    /// Step forward in history and re-render; false at the newest entry
    pub fn history_next(&self) -> bool {
        let state = self.inner.history.borrow_mut().next().cloned();
        self.navigate(state)
    }

    /// Render the committed state into the mount target.
    ///
    /// Returns false when the target cannot be resolved right now.
    pub fn render(&self) -> bool {
        let Some(target) = self.inner.target.borrow().clone() else {
            return false;
        };
        let context = &self.inner.context;
        let Some(node) = context.resolve(&target) else {
            debug!(component = %self.inner.name, ?target, "mount target not found, skipping render");
            return false;
        };

        let state = self.state();
        context.push_scope(&self.inner.name);
        let mut nodes = (self.inner.view)(&state).into_nodes();
        let nested = context.pop_scope();

        let directives = directive::extract(&mut nodes);
        context.patch(node, &nodes);

        let event = context.config().events.directive.clone();
        for directive in directives {
            if let Err(err) = context.dispatch(&event, &[directive.to_value()]) {
                warn!(component = %self.inner.name, error = %err, "directive handler failed");
            }
        }

        for component in nested {
            component.render();
        }

        let rendered = self.inner.options.borrow().rendered.clone();
        if let Some(rendered) = rendered {
            rendered(&state);
        }
        true
    }

    /// Run the event named by the `on<event>` property of a rendered node
    pub fn handle_host_event(
        &self,
        node: NodeId,
        event: &str,
        args: &[Value],
    ) -> Result<usize, ComponentError> {
        let property = format!("{}{event}", directive::EVENT_PROP_PREFIX);
        match self.inner.context.applied_prop(node, &property) {
            Some(Prop::Text(name)) => self.run(&name, args),
            _ => Ok(0),
        }
    }

    pub(crate) fn into_any(self) -> Rc<dyn Any> {
        self.inner
    }

    pub(crate) fn from_any(any: Rc<dyn Any>) -> Option<Self> {
        any.downcast::<ComponentInner<S>>()
            .ok()
            .map(|inner| Self { inner })
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.inner.options.borrow().strict_async.unwrap_or(false)
            && self.inner.generation.get() != generation
    }

    fn navigate(&self, state: Option<S>) -> bool {
        match state {
            Some(state) => {
                self.apply(state, CommitOptions::default().history(false));
                true
            }
            None => false,
        }
    }

    /// Store `state`, record it and render it.
    ///
    /// History is written before rendering so commits made from the
    /// `rendered` callback land after this one.
    fn apply(&self, state: S, options: CommitOptions) {
        let recording = self
            .inner
            .options
            .borrow()
            .history
            .as_ref()
            .is_some_and(HistoryOption::is_enabled);
        if options.history && recording {
            self.inner.history.borrow_mut().push(state.clone());
        }

        *self.inner.state.borrow_mut() = state;

        if options.render {
            self.render();
        }
    }

    fn register_history(&self, history: &HistoryOption) {
        let events = &self.inner.context.config().events;
        let (prev, next) = match history {
            HistoryOption::Named { prev, next } => (prev.clone(), next.clone()),
            _ => (events.history_prev.clone(), events.history_next.clone()),
        };

        let weak = Rc::downgrade(&self.inner);
        self.subscribe(&prev, move |_| {
            if let Some(component) = upgrade(&weak) {
                component.history_prev();
            }
            Ok(())
        });

        let weak = Rc::downgrade(&self.inner);
        self.subscribe(&next, move |_| {
            if let Some(component) = upgrade(&weak) {
                component.history_next();
            }
            Ok(())
        });
    }

    fn register_update(&self, entry: &UpdateEntry<S>) {
        for event in split_event_names(&entry.events) {
            let weak = Rc::downgrade(&self.inner);
            let handler = entry.handler.clone();
            let options = entry.options;
            self.subscribe(event, move |args| {
                let Some(component) = upgrade(&weak) else {
                    return Ok(());
                };
                let state = component.state();
                let update = handler(&state, args)?;
                component.set_state(update, options);
                Ok(())
            });
        }
    }

    fn subscribe<F>(&self, event: &str, handler: F)
    where
        F: Fn(&[Value]) -> anyhow::Result<()> + 'static,
    {
        let bus = self.routing_bus(event);
        let id = bus.subscribe(event, handler);
        self.inner.subscriptions.borrow_mut().push((bus, id));
    }
}

/// Broadcast a rejected update on the shared bus
fn report_rejection(context: &AppContext, name: &str, err: &anyhow::Error) {
    let event = &context.config().events.update_error;
    if !context.bus().has_subscribers(event) {
        return;
    }
    let payload = json!({ "component": name, "error": format!("{err:#}") });
    if let Err(failure) = context.dispatch(event, &[payload]) {
        warn!(component = %name, error = %failure, "update error handler failed");
    }
}

fn upgrade<S: 'static>(weak: &Weak<ComponentInner<S>>) -> Option<Component<S>> {
    weak.upgrade().map(|inner| Component { inner })
}

impl<S: Clone + 'static> Mounted for Component<S> {
    fn render(&self) -> bool {
        Component::render(self)
    }

    fn unmount(&self) {
        Component::unmount(self)
    }
}

impl<S: 'static> fmt::Debug for Component<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.inner.name)
            .field("lifecycle", &self.inner.lifecycle.get())
            .field("target", &self.inner.target.borrow())
            .finish()
    }
}
