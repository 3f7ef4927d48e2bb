//! Pulse Application Runtime
//!
//! Stateful components on top of the event bus and the reconciler.
//!
//! # Example
//!
//! ```rust
//! use pulse_app::prelude::*;
//!
//! let (ctx, document) = AppContext::headless();
//! let app = document.borrow_mut().mount_point("app");
//!
//! let counter = Component::builder(&ctx, 0i64)
//!     .view(|count: &i64| el("p").child(count.to_string()))
//!     .on("+1", |count, _| count + 1)
//!     .on("-1", |count, _| count - 1)
//!     .build();
//! counter.mount(app).unwrap();
//!
//! counter.run("+1", &[]).unwrap();
//! counter.run("+1", &[]).unwrap();
//! assert_eq!(counter.state(), 2);
//! assert_eq!(document.borrow().inner_html(app), "<p>2</p>");
//! ```

pub mod component;
pub mod config;
pub mod context;
pub mod directive;
pub mod error;
pub mod history;
pub mod logging;
pub mod nested;
pub mod router;


pub use component::{Commit, Component, ComponentBuilder, Lifecycle, MountTarget, Update};
pub use config::{CommitOptions, EventNames, HistoryOption, MountOptions, RuntimeConfig};
pub use context::AppContext;
pub use directive::Directive;
pub use error::{ComponentError, ConfigError};
pub use history::History;
pub use nested::ComponentClass;
pub use router::{HashRouter, Route};

/// Prelude module - import everything commonly needed
pub mod prelude {
    pub use crate::component::{Commit, Component, ComponentBuilder, Lifecycle, MountTarget, Update};
    pub use crate::config::{CommitOptions, HistoryOption, MountOptions, RuntimeConfig};
    pub use crate::context::AppContext;
    pub use crate::error::ComponentError;
    pub use crate::nested::ComponentClass;
    pub use crate::router::HashRouter;

    // Description nodes and hosts
    pub use pulse_vdom::{build, el, fragment, props, text, Child, Document, Fragment, Prop, Props, Tag, VNode};

    // Bus
    pub use pulse_core::{EventBus, SubscribeOptions, Value};
}
