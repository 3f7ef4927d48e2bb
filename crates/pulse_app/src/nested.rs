//! Nested stateful components
//!
//! A [`ComponentClass`] can be used as a tag in a parent's view. Building it
//! looks up the instance registered under the node's `id` (or an automatic
//! `{scope}_{type}_{n}` id), creating and mounting one on first use, and yields
//! a placeholder element. The instance renders into that placeholder after
//! the parent's patch and re-renders on its own commits from then on.

use std::rc::Rc;

use pulse_vdom::{ComponentType, Placeholder, Prop, Props, VNode};
use tracing::{debug, error};

use crate::component::{Component, ComponentBuilder};
use crate::config::{CommitOptions, MountOptions};
use crate::context::AppContext;

/// Tag of the element a nested instance renders into
pub const PLACEHOLDER_TAG: &str = "div";

type FactoryFn<S> = Rc<dyn Fn(&AppContext, &Props) -> ComponentBuilder<S>>;

type PropsHook<S> = Rc<dyn Fn(&S, &Props) -> Option<S>>;

/// Component type usable as a tag
pub struct ComponentClass<S: Clone + 'static> {
    name: String,
    context: AppContext,
    factory: FactoryFn<S>,
    on_props: Option<PropsHook<S>>,
}

impl<S: Clone + 'static> ComponentClass<S> {
    pub fn new<F>(context: &AppContext, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&AppContext, &Props) -> ComponentBuilder<S> + 'static,
    {
        Self {
            name: name.into(),
            context: context.clone(),
            factory: Rc::new(factory),
            on_props: None,
        }
    }

    /// Derive a new state from the props of each parent render (builder
    /// pattern); `None` keeps the current state
    pub fn on_props<F>(mut self, hook: F) -> Self
    where
        F: Fn(&S, &Props) -> Option<S> + 'static,
    {
        self.on_props = Some(Rc::new(hook));
        self
    }

    /// The instance mounted under `id`, if any
    pub fn instance(&self, id: &str) -> Option<Component<S>> {
        self.context.instance(id).and_then(Component::from_any)
    }

    fn create(&self, id: &str, props: &Props) -> Component<S> {
        let component = (self.factory)(&self.context, props).name(id).build();
        // The placeholder is not attached yet; the first render is deferred
        if let Err(err) = component.mount_with(id, MountOptions::new().render(false)) {
            error!(component = id, error = %err, "failed to mount nested component");
        }
        self.context.register_instance(id, component.clone().into_any());
        component
    }
}

impl<S: Clone + 'static> ComponentType for ComponentClass<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, props: Props, _children: Vec<VNode>) -> VNode {
        let id = props
            .get("id")
            .and_then(Prop::to_key)
            .unwrap_or_else(|| self.context.next_auto_id(&self.name));

        let component = match self.instance(&id) {
            Some(existing) => {
                if let Some(hook) = &self.on_props {
                    if let Some(next) = hook(&existing.state(), &props) {
                        existing.set_state(next, CommitOptions::default().render(false));
                    }
                }
                existing
            }
            None => self.create(&id, &props),
        };

        if !self.context.defer_render(Rc::new(component)) {
            debug!(component = %id, "nested component resolved outside a render");
        }
        VNode::Placeholder(Placeholder::new(PLACEHOLDER_TAG, id))
    }
}
