//! Virtual node model
//!
//! A [`VNode`] describes one version of a renderable unit: an element, a text
//! or comment node, a fragment of siblings, or a component. Nodes are built
//! once per render with the builder functions in this module and shared as
//! [`VNodeRef`]. The only state that changes after construction is the host
//! bookkeeping the reconciler records while mounting.
//!
//! # Example
//!
//! ```rust
//! use sprig_renderer::vnode::{element, text};
//!
//! let list = element("ul")
//!     .prop("class", "todo")
//!     .child(element("li").key(1).text("write"))
//!     .child(element("li").key(2).text("test"))
//!     .child(text("2 items"))
//!     .build();
//!
//! assert_eq!(list.child_nodes().nodes().len(), 3);
//! ```

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::component::{ComponentDef, ComponentInstance};
use crate::host::HostNode;

/// Shared handle to a virtual node
pub type VNodeRef = Rc<VNode>;

/// Property map. Comparison ignores insertion order.
pub type Props = IndexMap<Cow<'static, str>, PropValue, FxBuildHasher>;

/// Event callback stored as a property
pub type EventHandler = Rc<dyn Fn()>;

// =============================================================================
// Keys
// =============================================================================

/// Sibling identity used by the keyed diff
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(Rc<str>),
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value.into())
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Int(value.into())
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        match i64::try_from(value) {
            Ok(n) => Key::Int(n),
            Err(_) => Key::Str(value.to_string().into()),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value.into())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{}", n),
            Key::Str(s) => write!(f, "{:?}", s),
        }
    }
}

// =============================================================================
// Property values
// =============================================================================

/// Value of one element property
#[derive(Clone)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// Compared by identity
    Handler(EventHandler),
}

impl PropValue {
    pub fn handler(f: impl Fn() + 'static) -> Self {
        PropValue::Handler(Rc::new(f))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(h) => Some(h),
            _ => None,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a == b,
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Bool(v) => write!(f, "{}", v),
            PropValue::Int(v) => write!(f, "{}", v),
            PropValue::Float(v) => write!(f, "{}", v),
            PropValue::Str(v) => write!(f, "{:?}", v),
            PropValue::Handler(_) => f.write_str("<handler>"),
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(v) => f.write_str(v),
            other => write!(f, "{:?}", other),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value.into())
    }
}

// =============================================================================
// Node kinds and children
// =============================================================================

/// What a node renders to
#[derive(Clone)]
pub enum NodeKind {
    Element(Cow<'static, str>),
    Text,
    Comment,
    /// Siblings without a wrapping element
    Fragment,
    Component(ComponentDef),
}

impl NodeKind {
    /// Same tag, same component definition, or same built-in kind
    pub fn is_same_type(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (NodeKind::Element(a), NodeKind::Element(b)) => a == b,
            (NodeKind::Text, NodeKind::Text)
            | (NodeKind::Comment, NodeKind::Comment)
            | (NodeKind::Fragment, NodeKind::Fragment) => true,
            (NodeKind::Component(a), NodeKind::Component(b)) => {
                std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
            }
            _ => false,
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Element(tag) => write!(f, "Element({})", tag),
            NodeKind::Text => f.write_str("Text"),
            NodeKind::Comment => f.write_str("Comment"),
            NodeKind::Fragment => f.write_str("Fragment"),
            NodeKind::Component(def) => write!(f, "Component({})", def.name()),
        }
    }
}

/// Children of a node
#[derive(Clone, Debug, Default)]
pub enum Children {
    #[default]
    None,
    Text(Cow<'static, str>),
    Nodes(Vec<VNodeRef>),
}

/// Shape classifier for [`Children`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildrenShape {
    None,
    Text,
    Nodes,
}

impl Children {
    pub fn shape(&self) -> ChildrenShape {
        match self {
            Children::None => ChildrenShape::None,
            Children::Text(_) => ChildrenShape::Text,
            Children::Nodes(_) => ChildrenShape::Nodes,
        }
    }

    /// Child nodes, empty unless the shape is `Nodes`
    pub fn nodes(&self) -> &[VNodeRef] {
        match self {
            Children::Nodes(nodes) => nodes.as_slice(),
            _ => &[],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Children::Text(text) => Some(text.as_ref()),
            _ => None,
        }
    }
}

// =============================================================================
// VNode
// =============================================================================

/// One renderable unit
pub struct VNode {
    kind: NodeKind,
    key: Option<Key>,
    props: Option<Rc<Props>>,
    children: Children,
    /// First host node; the start anchor for fragments
    pub(crate) el: Cell<Option<HostNode>>,
    /// End anchor of a fragment
    pub(crate) anchor: Cell<Option<HostNode>>,
    pub(crate) component: RefCell<Option<Rc<ComponentInstance>>>,
}

impl VNode {
    fn new(kind: NodeKind, children: Children) -> Self {
        Self {
            kind,
            key: None,
            props: None,
            children,
            el: Cell::new(None),
            anchor: Cell::new(None),
            component: RefCell::new(None),
        }
    }

    // ===== Builder =====

    /// Set the sibling key (builder pattern)
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set one property (builder pattern)
    pub fn prop(mut self, key: impl Into<Cow<'static, str>>, value: impl Into<PropValue>) -> Self {
        let props = self.props.get_or_insert_with(Default::default);
        Rc::make_mut(props).insert(key.into(), value.into());
        self
    }

    /// Use a shared property map (builder pattern)
    ///
    /// Passing the same `Rc` on every render lets the diff skip the map.
    pub fn props(mut self, props: Rc<Props>) -> Self {
        self.props = Some(props);
        self
    }

    /// Set text children (builder pattern)
    ///
    /// A fragment has no host node of its own, so its text becomes a single
    /// text child.
    pub fn text(mut self, content: impl Into<Cow<'static, str>>) -> Self {
        self.children = match self.kind {
            NodeKind::Fragment => Children::Nodes(vec![text(content).build()]),
            _ => Children::Text(content.into()),
        };
        self
    }

    /// Add a child node (builder pattern)
    pub fn child(mut self, child: impl Into<VNodeRef>) -> Self {
        match &mut self.children {
            Children::Nodes(nodes) => nodes.push(child.into()),
            other => *other = Children::Nodes(vec![child.into()]),
        }
        self
    }

    /// Add child nodes (builder pattern)
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VNodeRef>,
    {
        let iter = children.into_iter().map(Into::into);
        match &mut self.children {
            Children::Nodes(nodes) => nodes.extend(iter),
            other => *other = Children::Nodes(iter.collect()),
        }
        self
    }

    /// Finish building
    pub fn build(self) -> VNodeRef {
        Rc::new(self)
    }

    // ===== Accessors =====

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn key_ref(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn props_ref(&self) -> Option<&Rc<Props>> {
        self.props.as_ref()
    }

    pub fn child_nodes(&self) -> &Children {
        &self.children
    }

    /// Element tag, if this is an element
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element(tag) => Some(tag.as_ref()),
            _ => None,
        }
    }

    /// Host node this vnode is mounted as, if any
    pub fn host_node(&self) -> Option<HostNode> {
        self.el.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.el.get().is_some()
    }

    /// Component instance backing this node, once mounted
    pub fn component_instance(&self) -> Option<Rc<ComponentInstance>> {
        self.component.borrow().clone()
    }

    /// Same type and same key
    pub fn is_same_node(&self, other: &VNode) -> bool {
        self.key == other.key && self.kind.is_same_type(&other.kind)
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("props", &self.props)
            .field("children", &self.children)
            .field("el", &self.el.get())
            .finish()
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Element node
pub fn element(tag: impl Into<Cow<'static, str>>) -> VNode {
    VNode::new(NodeKind::Element(tag.into()), Children::None)
}

/// Text node
pub fn text(content: impl Into<Cow<'static, str>>) -> VNode {
    VNode::new(NodeKind::Text, Children::Text(content.into()))
}

/// Comment node
pub fn comment(content: impl Into<Cow<'static, str>>) -> VNode {
    VNode::new(NodeKind::Comment, Children::Text(content.into()))
}

/// Fragment; add its members with `child`/`children`
pub fn fragment() -> VNode {
    VNode::new(NodeKind::Fragment, Children::Nodes(Vec::new()))
}

/// Component node; its props are passed to the component
pub fn component(def: &ComponentDef) -> VNode {
    VNode::new(NodeKind::Component(Rc::clone(def)), Children::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_node_requires_type_and_key() {
        let a = element("li").key(1).build();
        let b = element("li").key(1).text("changed").build();
        let c = element("li").key(2).build();
        let d = element("p").key(1).build();

        assert!(a.is_same_node(&b));
        assert!(!a.is_same_node(&c));
        assert!(!a.is_same_node(&d));
        assert!(text("x").build().is_same_node(&text("y").build()));
        assert!(!text("x").build().is_same_node(&comment("x").build()));
    }

    #[test]
    fn test_children_shape() {
        assert_eq!(element("div").build().child_nodes().shape(), ChildrenShape::None);
        assert_eq!(element("div").text("hi").build().child_nodes().shape(), ChildrenShape::Text);

        let parent = element("div")
            .child(element("span"))
            .children([text("a"), text("b")])
            .build();
        assert_eq!(parent.child_nodes().shape(), ChildrenShape::Nodes);
        assert_eq!(parent.child_nodes().nodes().len(), 3);
    }

    #[test]
    fn test_props_compare_order_insensitive() {
        let a = element("div").prop("a", 1).prop("b", "x").build();
        let b = element("div").prop("b", "x").prop("a", 1).build();
        assert_eq!(a.props_ref(), b.props_ref());
    }

    #[test]
    fn test_handler_compares_by_identity() {
        let handler = PropValue::handler(|| {});
        assert_eq!(handler, handler.clone());
        assert_ne!(handler, PropValue::handler(|| {}));
    }

    #[test]
    fn test_large_usize_key_does_not_wrap() {
        assert_eq!(Key::from(3usize), Key::Int(3));
        assert_ne!(Key::from(usize::MAX), Key::from(-1));
        assert_eq!(Key::from(usize::MAX), Key::from(usize::MAX.to_string()));
    }

    #[test]
    fn test_fragment_text_becomes_text_child() {
        let frag = fragment().text("x").build();
        let nodes = frag.child_nodes().nodes();
        assert_eq!(nodes.len(), 1);
        assert!(matches!(nodes[0].kind(), NodeKind::Text));
        assert_eq!(nodes[0].child_nodes().text(), Some("x"));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::from(7).to_string(), "7");
        assert_eq!(Key::from("row").to_string(), "\"row\"");
    }

    #[test]
    fn test_fresh_node_is_unmounted() {
        let node = element("div").build();
        assert!(!node.is_mounted());
        assert!(node.component_instance().is_none());
    }
}
