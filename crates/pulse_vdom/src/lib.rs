//! Pulse Tree Reconciler
//!
//! Description nodes, the host tree abstraction and the patch algorithm:
//!
//! - **Description nodes**: [`VNode`], built with [`build`] or the [`el`] builder
//! - **Host tree**: the [`HostTree`] trait the reconciler mutates, plus the
//!   in-memory [`Document`] implementation
//! - **Reconciler**: minimal patching with keyed relocation ([`Reconciler`])
//!
//! # Example
//!
//! ```rust
//! use pulse_vdom::{el, Document, Reconciler};
//!
//! let mut doc = Document::new();
//! let app = doc.mount_point("app");
//! let mut reconciler = Reconciler::new();
//!
//! reconciler.render(&mut doc, app, &[el("p").child("hello").into()]);
//! assert_eq!(doc.inner_html(app), "<p>hello</p>");
//! ```

pub mod document;
pub mod host;
pub mod keys;
pub mod node;
pub mod reconcile;

pub use document::{Document, Mutation};
pub use host::{HostTree, NodeId, NodeKind};
pub use keys::KeyRegistry;
pub use node::{
    build, el, fragment, normalize, text, Child, ComponentType, Element, Fragment, Placeholder, Prop,
    Props, Tag, VNode, ViewFn, DATA_PREFIX, KEY_PROP, RAW_MARKUP_PREFIX, STYLE_PROP,
};
pub use reconcile::Reconciler;
