//! Pulse Core Runtime
//!
//! This crate provides the event plumbing the rest of Pulse is built on:
//!
//! - **Event Bus**: named-event subscription and dispatch in registration order
//! - **One-shot handlers**: subscriptions removed after their first successful call
//! - **Debounced handlers**: subscriptions that only fire after a quiet period
//! - **Routing helpers**: the global-marker rule that decides shared vs private buses
//!
//! # Example
//!
//! ```rust
//! use pulse_core::{EventBus, Value};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let bus = EventBus::new();
//! let total = Rc::new(Cell::new(0));
//!
//! let sink = total.clone();
//! bus.subscribe("add", move |args: &[Value]| {
//!     sink.set(sink.get() + args[0].as_i64().unwrap_or(0));
//!     Ok(())
//! });
//!
//! bus.dispatch("add", &[Value::from(2)]).unwrap();
//! bus.dispatch("add", &[Value::from(3)]).unwrap();
//! assert_eq!(total.get(), 5);
//! ```

pub mod bus;
pub mod error;
pub mod routing;

pub use bus::{EventBus, Handler, SubscribeOptions, SubscriptionId};
pub use error::BusError;
pub use routing::{is_global_event, split_event_names, DEFAULT_GLOBAL_MARKERS};

/// Event payload value.
pub use serde_json::Value;
