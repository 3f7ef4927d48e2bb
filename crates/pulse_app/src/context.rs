//! Application context
//!
//! An [`AppContext`] owns everything components share: the shared event bus,
//! the host tree, the reconciler with its key registry, the nested-instance
//! registry and the runtime configuration. Components receive a context when
//! they are built; [`AppContext::teardown`] ends the lifetime of all of them.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use pulse_core::{BusError, EventBus, Value};
use pulse_vdom::{Document, HostTree, NodeId, Prop, Reconciler, VNode};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::component::MountTarget;
use crate::config::RuntimeConfig;

/// Scope name used for auto ids outside any render
const ROOT_SCOPE: &str = "root";

/// Type-erased view of a mounted component
pub(crate) trait Mounted {
    fn render(&self) -> bool;

    fn unmount(&self);
}

/// Bookkeeping for one in-progress view evaluation
struct RenderScope {
    name: String,
    counters: FxHashMap<String, usize>,
    deferred: Vec<Rc<dyn Mounted>>,
}

struct ContextInner {
    bus: EventBus,
    host: Rc<RefCell<dyn HostTree>>,
    reconciler: RefCell<Reconciler>,
    config: RuntimeConfig,
    components: RefCell<FxHashMap<u64, Rc<dyn Mounted>>>,
    instances: RefCell<FxHashMap<String, Rc<dyn Any>>>,
    scopes: RefCell<Vec<RenderScope>>,
    next_id: Cell<u64>,
}

/// Shared runtime resources of a component tree
#[derive(Clone)]
pub struct AppContext {
    inner: Rc<ContextInner>,
}

impl AppContext {
    pub fn new<H>(host: Rc<RefCell<H>>) -> Self
    where
        H: HostTree + 'static,
    {
        Self::with_config(host, RuntimeConfig::default())
    }

    pub fn with_config<H>(host: Rc<RefCell<H>>, config: RuntimeConfig) -> Self
    where
        H: HostTree + 'static,
    {
        let host: Rc<RefCell<dyn HostTree>> = host;
        Self {
            inner: Rc::new(ContextInner {
                bus: EventBus::new(),
                host,
                reconciler: RefCell::new(Reconciler::new()),
                config,
                components: RefCell::new(FxHashMap::default()),
                instances: RefCell::new(FxHashMap::default()),
                scopes: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Context over a fresh in-memory [`Document`]
    pub fn headless() -> (Self, Rc<RefCell<Document>>) {
        let document = Rc::new(RefCell::new(Document::new()));
        (Self::new(document.clone()), document)
    }

    /// The shared bus
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn host(&self) -> Rc<RefCell<dyn HostTree>> {
        self.inner.host.clone()
    }

    /// Dispatch on the shared bus
    pub fn dispatch(&self, event: &str, args: &[Value]) -> Result<usize, BusError> {
        self.inner.bus.dispatch(event, args)
    }

    /// Number of mounted components
    pub fn component_count(&self) -> usize {
        self.inner.components.borrow().len()
    }

    /// Number of registered keys in the reconciler
    pub fn key_count(&self) -> usize {
        self.inner.reconciler.borrow().keys().len()
    }

    /// Unmount every component and reset the shared registries
    pub fn teardown(&self) {
        let components: Vec<_> = self
            .inner
            .components
            .borrow_mut()
            .drain()
            .map(|(_, component)| component)
            .collect();
        debug!(components = components.len(), "tearing down context");

        for component in components {
            component.unmount();
        }
        self.inner.instances.borrow_mut().clear();
        self.inner.scopes.borrow_mut().clear();
        self.inner.bus.clear();
        self.inner.reconciler.borrow_mut().clear();
    }

    /// Find the host node a target currently points at
    pub fn resolve(&self, target: &MountTarget) -> Option<NodeId> {
        let host = self.inner.host.borrow();
        match target {
            MountTarget::Node(node) => host.kind(*node).map(|_| *node),
            MountTarget::Id(id) => host.element_by_id(id),
        }
    }

    /// Patch the children of `target` to match `nodes`
    pub fn patch(&self, target: NodeId, nodes: &[VNode]) {
        let mut host = self.inner.host.borrow_mut();
        self.inner
            .reconciler
            .borrow_mut()
            .render(&mut *host, target, nodes);
    }

    /// A property applied to `node` by the last patch
    pub fn applied_prop(&self, node: NodeId, name: &str) -> Option<Prop> {
        self.inner.host.borrow().applied_props(node)?.get(name).cloned()
    }

    pub(crate) fn allocate_id(&self) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        id
    }

    pub(crate) fn register(&self, id: u64, component: Rc<dyn Mounted>) {
        self.inner.components.borrow_mut().insert(id, component);
    }

    pub(crate) fn unregister(&self, id: u64) {
        self.inner.components.borrow_mut().remove(&id);
    }

    pub(crate) fn instance(&self, id: &str) -> Option<Rc<dyn Any>> {
        self.inner.instances.borrow().get(id).cloned()
    }

    pub(crate) fn register_instance(&self, id: &str, instance: Rc<dyn Any>) {
        self.inner.instances.borrow_mut().insert(id.to_owned(), instance);
    }

    /// Drop the instance entry for `id` if it still refers to `instance`
    pub(crate) fn forget_instance(&self, id: &str, instance: *const ()) {
        let mut instances = self.inner.instances.borrow_mut();
        if instances
            .get(id)
            .is_some_and(|existing| Rc::as_ptr(existing) as *const () == instance)
        {
            instances.remove(id);
        }
    }

    pub(crate) fn push_scope(&self, name: &str) {
        self.inner.scopes.borrow_mut().push(RenderScope {
            name: name.to_owned(),
            counters: FxHashMap::default(),
            deferred: Vec::new(),
        });
    }

    /// Close the innermost scope and hand back the instances it deferred
    pub(crate) fn pop_scope(&self) -> Vec<Rc<dyn Mounted>> {
        self.inner
            .scopes
            .borrow_mut()
            .pop()
            .map(|scope| scope.deferred)
            .unwrap_or_default()
    }

    /// `{scope}_{type}_{n}`, counted per type within the current scope
    pub(crate) fn next_auto_id(&self, type_name: &str) -> String {
        let mut scopes = self.inner.scopes.borrow_mut();
        match scopes.last_mut() {
            Some(scope) => {
                let counter = scope.counters.entry(type_name.to_owned()).or_default();
                let id = format!("{}_{type_name}_{counter}", scope.name);
                *counter += 1;
                id
            }
            None => {
                let id = self.inner.next_id.get();
                self.inner.next_id.set(id + 1);
                format!("{ROOT_SCOPE}_{type_name}_{id}")
            }
        }
    }

    /// Queue `component` to render after the current scope's patch
    pub(crate) fn defer_render(&self, component: Rc<dyn Mounted>) -> bool {
        match self.inner.scopes.borrow_mut().last_mut() {
            Some(scope) => {
                scope.deferred.push(component);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("bus", &self.inner.bus)
            .field("components", &self.inner.components.borrow().len())
            .field("instances", &self.inner.instances.borrow().len())
            .field("config", &self.inner.config)
            .finish()
    }
}
