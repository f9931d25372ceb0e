//! In-memory host for tests and demos
//!
//! [`RecordingHost`] keeps a plain node tree and logs every operation the
//! reconciler emits, so tests can assert both the final tree and how it got
//! there (creates, inserts, moves, removals, property patches).
//!
//! ```rust
//! use sprig_renderer::testing::RecordingHost;
//! use sprig_renderer::vnode::element;
//! use sprig_renderer::{Container, Renderer};
//!
//! let mut host = RecordingHost::new();
//! let container = Container::new(host.create_root("app"));
//! let renderer = Renderer::new(host);
//!
//! renderer
//!     .render(Some(element("p").text("hello").build()), &container)
//!     .unwrap();
//! assert_eq!(renderer.host().serialize(container.node()), "<app><p>hello</p></app>");
//! ```

use std::fmt::Write as _;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::error::{HostError, HostResult};
use crate::host::{HostAdapter, HostNode};
use crate::vnode::{EventHandler, PropValue};

/// One logged host operation
#[derive(Clone, Debug, PartialEq)]
pub enum HostOp {
    CreateElement { node: HostNode, tag: String },
    CreateText { node: HostNode, text: String },
    CreateComment { node: HostNode, text: String },
    SetElementText { node: HostNode, text: String },
    SetText { node: HostNode, text: String },
    SetProp { node: HostNode, key: String, value: PropValue },
    RemoveProp { node: HostNode, key: String },
    /// First attachment of a detached node
    Insert { node: HostNode, parent: HostNode, anchor: Option<HostNode> },
    /// Re-insertion of an attached node
    Move { node: HostNode, parent: HostNode, anchor: Option<HostNode> },
    Remove { node: HostNode },
}

impl HostOp {
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            HostOp::CreateElement { .. } | HostOp::CreateText { .. } | HostOp::CreateComment { .. }
        )
    }

    pub fn is_move(&self) -> bool {
        matches!(self, HostOp::Move { .. })
    }

    pub fn is_remove(&self) -> bool {
        matches!(self, HostOp::Remove { .. })
    }

    pub fn is_prop(&self) -> bool {
        matches!(self, HostOp::SetProp { .. } | HostOp::RemoveProp { .. })
    }
}

#[derive(Debug)]
enum RecordKind {
    Element(String),
    Text,
    Comment,
}

#[derive(Debug)]
struct Record {
    kind: RecordKind,
    /// Text data, or element text content
    text: String,
    props: IndexMap<String, PropValue, FxBuildHasher>,
    parent: Option<HostNode>,
    children: Vec<HostNode>,
}

impl Record {
    fn new(kind: RecordKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_owned(),
            props: IndexMap::default(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Host adapter backed by an in-memory tree with an operation log
#[derive(Debug, Default)]
pub struct RecordingHost {
    nodes: SlotMap<HostNode, Record>,
    ops: Vec<HostOp>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element to mount into. Not logged.
    pub fn create_root(&mut self, tag: &str) -> HostNode {
        self.nodes.insert(Record::new(RecordKind::Element(tag.to_owned()), ""))
    }

    // ===== Operation log =====

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Drain the log
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn count(&self, pred: impl Fn(&HostOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    pub fn creates(&self) -> usize {
        self.count(HostOp::is_create)
    }

    pub fn moves(&self) -> usize {
        self.count(HostOp::is_move)
    }

    pub fn removes(&self) -> usize {
        self.count(HostOp::is_remove)
    }

    // ===== Tree queries =====

    pub fn contains(&self, node: HostNode) -> bool {
        self.nodes.contains_key(node)
    }

    /// Number of live nodes, roots included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, node: HostNode) -> &[HostNode] {
        self.nodes
            .get(node)
            .map(|record| record.children.as_slice())
            .unwrap_or_default()
    }

    /// Text data of a text or comment node, or the text content of an element
    pub fn text(&self, node: HostNode) -> Option<&str> {
        self.nodes.get(node).map(|record| record.text.as_str())
    }

    pub fn tag(&self, node: HostNode) -> Option<&str> {
        match &self.nodes.get(node)?.kind {
            RecordKind::Element(tag) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn prop(&self, node: HostNode, key: &str) -> Option<&PropValue> {
        self.nodes.get(node)?.props.get(key)
    }

    /// Event handler stored under `key`. Call it after releasing the host.
    pub fn handler(&self, node: HostNode, key: &str) -> Option<EventHandler> {
        self.prop(node, key)?.as_handler().cloned()
    }

    /// Markup-like rendering of the subtree at `node`. Empty text nodes
    /// (fragment anchors) print nothing.
    pub fn serialize(&self, node: HostNode) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    fn write_node(&self, node: HostNode, out: &mut String) {
        let Some(record) = self.nodes.get(node) else {
            return;
        };
        match &record.kind {
            RecordKind::Text => out.push_str(&record.text),
            RecordKind::Comment => {
                let _ = write!(out, "<!--{}-->", record.text);
            }
            RecordKind::Element(tag) => {
                let _ = write!(out, "<{}", tag);
                for (key, value) in &record.props {
                    if value.as_handler().is_none() {
                        let _ = write!(out, " {}=\"{}\"", key, value);
                    }
                }
                out.push('>');
                out.push_str(&record.text);
                for &child in &record.children {
                    self.write_node(child, out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }

    // ===== Internals =====

    fn record(&self, op: &'static str, node: HostNode) -> HostResult<&Record> {
        self.nodes
            .get(node)
            .ok_or_else(|| HostError::new(op, format!("unknown node {:?}", node)))
    }

    fn record_mut(&mut self, op: &'static str, node: HostNode) -> HostResult<&mut Record> {
        self.nodes
            .get_mut(node)
            .ok_or_else(|| HostError::new(op, format!("unknown node {:?}", node)))
    }

    fn element_mut(&mut self, op: &'static str, node: HostNode) -> HostResult<&mut Record> {
        let record = self.record_mut(op, node)?;
        match record.kind {
            RecordKind::Element(_) => Ok(record),
            _ => Err(HostError::new(op, format!("{:?} is not an element", node))),
        }
    }

    fn detach(&mut self, node: HostNode) {
        let parent = self.nodes.get_mut(node).and_then(|record| record.parent.take());
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|&child| child != node);
        }
    }

    /// Free `node` and every descendant
    fn release(&mut self, node: HostNode) {
        let mut stack: SmallVec<[HostNode; 16]> = SmallVec::new();
        stack.push(node);
        while let Some(next) = stack.pop() {
            if let Some(record) = self.nodes.remove(next) {
                stack.extend(record.children);
            }
        }
    }

    fn create(&mut self, kind: RecordKind, text: &str) -> HostNode {
        let node = self.nodes.insert(Record::new(kind, text));
        let op = match &self.nodes[node].kind {
            RecordKind::Element(tag) => HostOp::CreateElement {
                node,
                tag: tag.clone(),
            },
            RecordKind::Text => HostOp::CreateText {
                node,
                text: text.to_owned(),
            },
            RecordKind::Comment => HostOp::CreateComment {
                node,
                text: text.to_owned(),
            },
        };
        self.ops.push(op);
        node
    }
}

impl HostAdapter for RecordingHost {
    fn create_element(&mut self, tag: &str) -> HostResult<HostNode> {
        Ok(self.create(RecordKind::Element(tag.to_owned()), ""))
    }

    fn create_text(&mut self, text: &str) -> HostResult<HostNode> {
        Ok(self.create(RecordKind::Text, text))
    }

    fn create_comment(&mut self, text: &str) -> HostResult<HostNode> {
        Ok(self.create(RecordKind::Comment, text))
    }

    fn set_element_text(&mut self, element: HostNode, text: &str) -> HostResult<()> {
        let children = std::mem::take(&mut self.element_mut("set_element_text", element)?.children);
        for child in children {
            self.release(child);
        }
        self.element_mut("set_element_text", element)?.text = text.to_owned();
        self.ops.push(HostOp::SetElementText {
            node: element,
            text: text.to_owned(),
        });
        Ok(())
    }

    fn set_text(&mut self, node: HostNode, text: &str) -> HostResult<()> {
        let record = self.record_mut("set_text", node)?;
        if let RecordKind::Element(_) = record.kind {
            return Err(HostError::new("set_text", format!("{:?} is an element", node)));
        }
        record.text = text.to_owned();
        self.ops.push(HostOp::SetText {
            node,
            text: text.to_owned(),
        });
        Ok(())
    }

    fn patch_prop(
        &mut self,
        element: HostNode,
        key: &str,
        _prev: Option<&PropValue>,
        next: Option<&PropValue>,
    ) -> HostResult<()> {
        let record = self.element_mut("patch_prop", element)?;
        let op = match next {
            Some(value) => {
                record.props.insert(key.to_owned(), value.clone());
                HostOp::SetProp {
                    node: element,
                    key: key.to_owned(),
                    value: value.clone(),
                }
            }
            None => {
                record.props.shift_remove(key);
                HostOp::RemoveProp {
                    node: element,
                    key: key.to_owned(),
                }
            }
        };
        self.ops.push(op);
        Ok(())
    }

    fn insert(&mut self, node: HostNode, parent: HostNode, anchor: Option<HostNode>) -> HostResult<()> {
        if anchor == Some(node) {
            return Err(HostError::new("insert", "node used as its own anchor"));
        }
        let attached = self.record("insert", node)?.parent.is_some();
        self.element_mut("insert", parent)?;
        if let Some(anchor) = anchor {
            if self.record("insert", anchor)?.parent != Some(parent) {
                return Err(HostError::new(
                    "insert",
                    format!("anchor {:?} is not a child of {:?}", anchor, parent),
                ));
            }
        }

        self.detach(node);
        let siblings = &mut self.element_mut("insert", parent)?.children;
        let index = anchor
            .and_then(|anchor| siblings.iter().position(|&child| child == anchor))
            .unwrap_or(siblings.len());
        siblings.insert(index, node);
        self.record_mut("insert", node)?.parent = Some(parent);

        self.ops.push(if attached {
            HostOp::Move { node, parent, anchor }
        } else {
            HostOp::Insert { node, parent, anchor }
        });
        Ok(())
    }

    fn remove(&mut self, node: HostNode) -> HostResult<()> {
        self.record("remove", node)?;
        self.detach(node);
        self.release(node);
        self.ops.push(HostOp::Remove { node });
        Ok(())
    }

    fn parent_node(&self, node: HostNode) -> Option<HostNode> {
        self.nodes.get(node)?.parent
    }

    fn next_sibling(&self, node: HostNode) -> Option<HostNode> {
        let parent = self.parent_node(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&child| child == node)?;
        siblings.get(index + 1).copied()
    }
}
