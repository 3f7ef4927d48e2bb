//! Hash router
//!
//! Turns a location into bus events on the shared bus:
//!
//! | url          | event   | args         |
//! |--------------|---------|--------------|
//! | `""`         | `#`     | `[]`         |
//! | `#home/a/b`  | `#home` | `["a", "b"]` |
//! | `/users/42`  | `/users`| `["42"]`     |
//! | anything else| url     | `[]`         |
//!
//! When nobody subscribes to the head event, the not-found event is
//! dispatched with the url. The route-changed event follows every navigation
//! with `[head, ...args]`.

use pulse_core::{BusError, Value};
use tracing::debug;

use crate::context::AppContext;

/// A parsed location
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub event: String,
    pub args: Vec<String>,
}

impl Route {
    pub fn parse(url: &str) -> Self {
        if url.is_empty() {
            return Self {
                event: "#".to_owned(),
                args: Vec::new(),
            };
        }

        if url.starts_with('#') || url.starts_with('/') {
            let marker = &url[..1];
            let mut segments = url[1..].split('/');
            let head = segments.next().unwrap_or_default();
            return Self {
                event: format!("{marker}{head}"),
                args: segments.map(str::to_owned).collect(),
            };
        }

        Self {
            event: url.to_owned(),
            args: Vec::new(),
        }
    }
}

/// Dispatches navigation events for a context
#[derive(Clone, Debug)]
pub struct HashRouter {
    context: AppContext,
}

impl HashRouter {
    pub fn new(context: &AppContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Dispatch the events for navigating to `url`
    pub fn route(&self, url: &str) -> Result<Route, BusError> {
        let route = Route::parse(url);
        let events = &self.context.config().events;
        debug!(url, event = %route.event, "route");

        let args: Vec<Value> = route.args.iter().map(|arg| Value::from(arg.as_str())).collect();
        if self.context.bus().has_subscribers(&route.event) {
            self.context.dispatch(&route.event, &args)?;
        } else {
            self.context
                .dispatch(&events.route_not_found, &[Value::from(url)])?;
        }

        let mut changed = Vec::with_capacity(args.len() + 1);
        changed.push(Value::from(route.event.as_str()));
        changed.extend(args);
        self.context.dispatch(&events.route, &changed)?;

        Ok(route)
    }
}
