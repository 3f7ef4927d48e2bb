//! Runtime and mount configuration
//!
//! [`RuntimeConfig`] holds the reserved event names and routing markers of an
//! [`AppContext`](crate::AppContext) and can be loaded from TOML:
//!
//! ```toml
//! global_markers = ["/", "#", "@"]
//!
//! [events]
//! history_prev = "undo"
//! history_next = "redo"
//! ```
//!
//! [`MountOptions`] and [`CommitOptions`] configure a single component.

use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use pulse_core::DEFAULT_GLOBAL_MARKERS;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Context-wide configuration
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub events: EventNames,
    /// First characters that force an event onto the shared bus
    #[serde(default = "default_global_markers")]
    pub global_markers: Vec<char>,
}

/// Reserved event names
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct EventNames {
    #[serde(default = "default_history_prev")]
    pub history_prev: String,
    #[serde(default = "default_history_next")]
    pub history_next: String,
    /// Dispatched by the router after every navigation
    #[serde(default = "default_route")]
    pub route: String,
    /// Dispatched by the router when no one handles the current path
    #[serde(default = "default_route_not_found")]
    pub route_not_found: String,
    /// Carries unrecognized `$` directives
    #[serde(default = "default_directive")]
    pub directive: String,
    /// Carries `{component, error}` when an asynchronous update rejects
    #[serde(default = "default_update_error")]
    pub update_error: String,
}

fn default_global_markers() -> Vec<char> {
    DEFAULT_GLOBAL_MARKERS.to_vec()
}

fn default_history_prev() -> String {
    "history-prev".to_string()
}

fn default_history_next() -> String {
    "history-next".to_string()
}

fn default_route() -> String {
    "//".to_string()
}

fn default_route_not_found() -> String {
    "///".to_string()
}

fn default_directive() -> String {
    "$".to_string()
}

fn default_update_error() -> String {
    "@update-error".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            events: EventNames::default(),
            global_markers: default_global_markers(),
        }
    }
}

impl Default for EventNames {
    fn default() -> Self {
        Self {
            history_prev: default_history_prev(),
            history_next: default_history_next(),
            route: default_route(),
            route_not_found: default_route_not_found(),
            directive: default_directive(),
            update_error: default_update_error(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Whether `event` must travel on the shared bus
    pub fn is_global(&self, event: &str) -> bool {
        pulse_core::is_global_event(event, &self.global_markers)
    }
}

/// History setting of a component
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HistoryOption {
    #[default]
    Disabled,
    /// Navigate with the context's default event names
    Enabled,
    /// Navigate with custom event names
    Named { prev: String, next: String },
}

impl HistoryOption {
    pub fn named(prev: impl Into<String>, next: impl Into<String>) -> Self {
        HistoryOption::Named {
            prev: prev.into(),
            next: next.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, HistoryOption::Disabled)
    }
}

impl From<bool> for HistoryOption {
    fn from(enabled: bool) -> Self {
        if enabled {
            HistoryOption::Enabled
        } else {
            HistoryOption::Disabled
        }
    }
}

/// Callback run after a successful patch
pub type RenderedFn<S> = Rc<dyn Fn(&S)>;

/// Per-component configuration.
///
/// Every field is optional; [`MountOptions::merge`] overlays the fields that
/// are set onto an existing value.
pub struct MountOptions<S> {
    pub render: Option<bool>,
    pub history: Option<HistoryOption>,
    pub global_event: Option<bool>,
    pub rendered: Option<RenderedFn<S>>,
    /// Drop asynchronous results overtaken by a newer commit request
    pub strict_async: Option<bool>,
}

impl<S> MountOptions<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render on the initial commit (builder pattern)
    pub fn render(mut self, render: bool) -> Self {
        self.render = Some(render);
        self
    }

    pub fn history(mut self, history: impl Into<HistoryOption>) -> Self {
        self.history = Some(history.into());
        self
    }

    pub fn global_event(mut self, global: bool) -> Self {
        self.global_event = Some(global);
        self
    }

    pub fn rendered<F>(mut self, callback: F) -> Self
    where
        F: Fn(&S) + 'static,
    {
        self.rendered = Some(Rc::new(callback));
        self
    }

    pub fn strict_async(mut self, strict: bool) -> Self {
        self.strict_async = Some(strict);
        self
    }

    /// Overlay the fields set in `other`
    pub fn merge(&mut self, other: MountOptions<S>) {
        if other.render.is_some() {
            self.render = other.render;
        }
        if other.history.is_some() {
            self.history = other.history;
        }
        if other.global_event.is_some() {
            self.global_event = other.global_event;
        }
        if other.rendered.is_some() {
            self.rendered = other.rendered;
        }
        if other.strict_async.is_some() {
            self.strict_async = other.strict_async;
        }
    }
}

impl<S> Default for MountOptions<S> {
    fn default() -> Self {
        Self {
            render: None,
            history: None,
            global_event: None,
            rendered: None,
            strict_async: None,
        }
    }
}

impl<S> Clone for MountOptions<S> {
    fn clone(&self) -> Self {
        Self {
            render: self.render,
            history: self.history.clone(),
            global_event: self.global_event,
            rendered: self.rendered.clone(),
            strict_async: self.strict_async,
        }
    }
}

impl<S> fmt::Debug for MountOptions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountOptions")
            .field("render", &self.render)
            .field("history", &self.history)
            .field("global_event", &self.global_event)
            .field("rendered", &self.rendered.is_some())
            .field("strict_async", &self.strict_async)
            .finish()
    }
}

/// Options of a single commit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitOptions {
    pub render: bool,
    /// Record the committed state when history is enabled
    pub history: bool,
}

impl CommitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    pub fn history(mut self, history: bool) -> Self {
        self.history = history;
        self
    }
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            render: true,
            history: true,
        }
    }
}
