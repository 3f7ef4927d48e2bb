//! Description nodes
//!
//! A description node is the lightweight, immutable-by-convention picture of
//! a subtree the reconciler should produce. Views build them with [`build`]
//! or the [`el`] builder and return a [`Fragment`].

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Property that gives a node identity across reconciliations
pub const KEY_PROP: &str = "key";

/// Property holding a node's inline style
pub const STYLE_PROP: &str = "style";

/// Properties with this prefix land in the host dataset
pub const DATA_PREFIX: &str = "data-";

/// Text children with this prefix are injected as trusted markup
pub const RAW_MARKUP_PREFIX: &str = "_html:";

/// Ordered property map of a structured node
pub type Props = IndexMap<String, Prop>;

/// A single property value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prop {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Map(IndexMap<String, String>),
}

impl Prop {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Prop::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Identity token for `key`/`id` style properties
    pub fn to_key(&self) -> Option<String> {
        match self {
            Prop::Text(text) if !text.is_empty() => Some(text.clone()),
            Prop::Number(number) => Some(format_number(*number)),
            _ => None,
        }
    }

    /// Text form used for attributes and the dataset; `None` for null
    pub fn to_text(&self) -> Option<String> {
        match self {
            Prop::Null => None,
            Prop::Bool(value) => Some(value.to_string()),
            Prop::Number(number) => Some(format_number(*number)),
            Prop::Text(text) => Some(text.clone()),
            Prop::Map(map) => Some(
                map.iter()
                    .map(|(name, value)| format!("{name}: {value}"))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        }
    }

    /// Style declarations carried by this value.
    ///
    /// Maps are taken as-is; text is parsed as `name: value; ...`.
    pub fn style_entries(&self) -> Vec<(String, String)> {
        match self {
            Prop::Map(map) => map
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            Prop::Text(css) => css
                .split(';')
                .filter_map(|declaration| {
                    let (name, value) = declaration.split_once(':')?;
                    let (name, value) = (name.trim(), value.trim());
                    (!name.is_empty()).then(|| (name.to_owned(), value.to_owned()))
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

impl From<&str> for Prop {
    fn from(value: &str) -> Self {
        Prop::Text(value.to_owned())
    }
}

impl From<String> for Prop {
    fn from(value: String) -> Self {
        Prop::Text(value)
    }
}

impl From<&String> for Prop {
    fn from(value: &String) -> Self {
        Prop::Text(value.clone())
    }
}

impl From<bool> for Prop {
    fn from(value: bool) -> Self {
        Prop::Bool(value)
    }
}

impl From<f64> for Prop {
    fn from(value: f64) -> Self {
        Prop::Number(value)
    }
}

impl From<i32> for Prop {
    fn from(value: i32) -> Self {
        Prop::Number(value.into())
    }
}

impl From<i64> for Prop {
    fn from(value: i64) -> Self {
        Prop::Number(value as f64)
    }
}

impl From<usize> for Prop {
    fn from(value: usize) -> Self {
        Prop::Number(value as f64)
    }
}

impl From<IndexMap<String, String>> for Prop {
    fn from(value: IndexMap<String, String>) -> Self {
        Prop::Map(value)
    }
}

/// Build a [`Props`] map from `name => value` pairs.
///
/// ```rust
/// use pulse_vdom::{props, Prop};
///
/// let p = props! { "id" => "app", "tabindex" => 2 };
/// assert_eq!(p.get("tabindex"), Some(&Prop::Number(2.0)));
/// ```
#[macro_export]
macro_rules! props {
    () => { $crate::Props::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut props = $crate::Props::new();
        $(props.insert(::std::string::String::from($name), $crate::Prop::from($value));)+
        props
    }};
}

/// A description node
#[derive(Clone, Debug, PartialEq)]
pub enum VNode {
    Text(String),
    Element(Element),
    /// Slot owned by a nested stateful component; its children are rendered
    /// by that component, never by the parent's patch.
    Placeholder(Placeholder),
}

impl VNode {
    pub fn text(text: impl Into<String>) -> Self {
        VNode::Text(text.into())
    }

    /// Trusted markup injected without escaping
    pub fn markup(markup: &str) -> Self {
        VNode::Text(format!("{RAW_MARKUP_PREFIX}{markup}"))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            VNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// Structured description node
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub props: Props,
    pub children: Vec<VNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    /// Set a property (builder pattern)
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Prop>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Set the identity key (builder pattern)
    pub fn key(self, key: impl Into<Prop>) -> Self {
        self.prop(KEY_PROP, key)
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.prop("id", id.into())
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.prop("class", class.into())
    }

    /// Add one style declaration (builder pattern)
    pub fn style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let entry = self
            .props
            .entry(STYLE_PROP.to_owned())
            .or_insert_with(|| Prop::Map(IndexMap::new()));
        if !matches!(entry, Prop::Map(_)) {
            *entry = Prop::Map(IndexMap::new());
        }
        if let Prop::Map(map) = entry {
            map.insert(name.into(), value.into());
        }
        self
    }

    /// Set a `data-*` property (builder pattern)
    pub fn data(self, name: &str, value: impl Into<Prop>) -> Self {
        self.prop(format!("{DATA_PREFIX}{name}"), value)
    }

    /// Append a child (builder pattern)
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        flatten_into(child.into(), &mut self.children);
        self
    }

    /// Append several children (builder pattern)
    pub fn children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        for child in children {
            flatten_into(child.into(), &mut self.children);
        }
        self
    }

    /// The identity key, if any
    pub fn key_value(&self) -> Option<String> {
        self.props.get(KEY_PROP).and_then(Prop::to_key)
    }
}

/// Start building a structured node
pub fn el(tag: impl Into<String>) -> Element {
    Element::new(tag)
}

/// Text description node
pub fn text(text: impl Into<String>) -> VNode {
    VNode::Text(text.into())
}

impl From<Element> for VNode {
    fn from(element: Element) -> Self {
        VNode::Element(element)
    }
}

/// Placeholder for a nested component instance
#[derive(Clone, Debug, PartialEq)]
pub struct Placeholder {
    pub tag: String,
    pub id: String,
}

impl Placeholder {
    pub fn new(tag: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: id.into(),
        }
    }

    /// Properties applied to the placeholder's host element
    pub fn props(&self) -> Props {
        let mut props = Props::new();
        props.insert("id".to_owned(), Prop::Text(self.id.clone()));
        props
    }
}

/// A child argument before normalization
#[derive(Clone, Debug)]
pub enum Child {
    Node(VNode),
    Many(Vec<Child>),
    /// Loosely typed value coerced to text (objects are dumped as JSON)
    Value(serde_json::Value),
    Empty,
}

impl From<VNode> for Child {
    fn from(node: VNode) -> Self {
        Child::Node(node)
    }
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Node(VNode::Element(element))
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Node(VNode::Text(text.to_owned()))
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Node(VNode::Text(text))
    }
}

impl From<&String> for Child {
    fn from(text: &String) -> Self {
        Child::Node(VNode::Text(text.clone()))
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Child::Node(VNode::Text(value.to_string()))
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Child::Node(VNode::Text(value.to_string()))
    }
}

impl From<usize> for Child {
    fn from(value: usize) -> Self {
        Child::Node(VNode::Text(value.to_string()))
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Child::Node(VNode::Text(format_number(value)))
    }
}

impl From<bool> for Child {
    fn from(value: bool) -> Self {
        if value {
            Child::Node(VNode::Text("true".to_owned()))
        } else {
            Child::Empty
        }
    }
}

impl From<serde_json::Value> for Child {
    fn from(value: serde_json::Value) -> Self {
        Child::Value(value)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(children: Vec<T>) -> Self {
        Child::Many(children.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(child: Option<T>) -> Self {
        child.map_or(Child::Empty, Into::into)
    }
}

/// Flatten nested sequences and drop empty entries
pub fn normalize(children: Vec<Child>) -> Vec<VNode> {
    let mut nodes = Vec::with_capacity(children.len());
    for child in children {
        flatten_into(child, &mut nodes);
    }
    nodes
}

fn flatten_into(child: Child, out: &mut Vec<VNode>) {
    match child {
        Child::Node(VNode::Text(text)) if text.is_empty() => {}
        Child::Node(node) => out.push(node),
        Child::Many(children) => {
            for child in children {
                flatten_into(child, out);
            }
        }
        Child::Value(value) => flatten_value(value, out),
        Child::Empty => {}
    }
}

fn flatten_value(value: serde_json::Value, out: &mut Vec<VNode>) {
    use serde_json::Value;

    match value {
        Value::Null | Value::Bool(false) => {}
        Value::String(text) if text.is_empty() => {}
        Value::String(text) => out.push(VNode::Text(text)),
        Value::Array(items) => {
            for item in items {
                flatten_value(item, out);
            }
        }
        // Numbers, `true` and objects fall back to their JSON text
        other => out.push(VNode::Text(other.to_string())),
    }
}

/// Function sub-view: `(props, children) -> node`
pub type ViewFn = Rc<dyn Fn(&Props, Vec<VNode>) -> VNode>;

/// Capability of a stateful component type referenced as a tag.
///
/// Resolution happens while the view is built: the implementation looks up
/// (or creates and binds) an instance and returns the placeholder its output
/// will render into.
pub trait ComponentType {
    fn name(&self) -> &str;

    fn resolve(&self, props: Props, children: Vec<VNode>) -> VNode;
}

/// What a [`build`] call is asked to produce
#[derive(Clone)]
pub enum Tag {
    Name(String),
    View(ViewFn),
    Component(Rc<dyn ComponentType>),
}

impl Tag {
    pub fn view<F>(view: F) -> Self
    where
        F: Fn(&Props, Vec<VNode>) -> VNode + 'static,
    {
        Tag::View(Rc::new(view))
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::Name(name.to_owned())
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Tag::Name(name)
    }
}

impl<C: ComponentType + 'static> From<Rc<C>> for Tag {
    fn from(component: Rc<C>) -> Self {
        Tag::Component(component)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Tag::View(_) => f.write_str("View(..)"),
            Tag::Component(component) => f.debug_tuple("Component").field(&component.name()).finish(),
        }
    }
}

/// Build a description node.
///
/// Children are normalized first. A plain name yields a structured node, a
/// function view is called with `(props, children)`, and a component type is
/// resolved to its instance placeholder.
pub fn build(tag: impl Into<Tag>, props: Props, children: Vec<Child>) -> VNode {
    let children = normalize(children);
    match tag.into() {
        Tag::Name(tag) => VNode::Element(Element {
            tag,
            props,
            children,
        }),
        Tag::View(view) => view(&props, children),
        Tag::Component(component) => component.resolve(props, children),
    }
}

/// Sibling description nodes without a wrapping tag
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fragment(pub Vec<VNode>);

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[VNode] {
        &self.0
    }

    pub fn nodes_mut(&mut self) -> &mut Vec<VNode> {
        &mut self.0
    }

    pub fn into_nodes(self) -> Vec<VNode> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fragment from loosely typed children
pub fn fragment(children: Vec<Child>) -> Fragment {
    Fragment(normalize(children))
}

impl From<VNode> for Fragment {
    fn from(node: VNode) -> Self {
        Fragment(vec![node])
    }
}

impl From<Element> for Fragment {
    fn from(element: Element) -> Self {
        Fragment(vec![VNode::Element(element)])
    }
}

impl From<Vec<VNode>> for Fragment {
    fn from(nodes: Vec<VNode>) -> Self {
        Fragment(nodes)
    }
}

impl From<Vec<Child>> for Fragment {
    fn from(children: Vec<Child>) -> Self {
        fragment(children)
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        fragment(vec![text.into()])
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        fragment(vec![text.into()])
    }
}
