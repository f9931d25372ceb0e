//! Reconciler
//!
//! `patch(old, new, parent, anchor)` brings the host tree under `parent` from
//! the state described by `old` to the one described by `new`:
//!
//! - same `Rc` → nothing to do
//! - `old` is not the same node (type or key differ) → unmount it and mount
//!   `new` where it stood
//! - otherwise dispatch on the node kind
//!
//! Children diffing lives in [`children`], component mounting and updates in
//! [`component`].

mod children;
mod component;

use std::rc::Rc;

use crate::error::{RenderError, Result};
use crate::host::{HostAdapter, HostNode};
use crate::renderer::RendererInner;
use crate::vnode::{NodeKind, Props, VNode, VNodeRef};

impl<H: HostAdapter + 'static> RendererInner<H> {
    pub(crate) fn patch(
        self: &Rc<Self>,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        parent: HostNode,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        let mut old = old;
        let mut anchor = anchor;

        if let Some(prev) = old {
            if Rc::ptr_eq(prev, new) {
                return Ok(());
            }
            if !prev.is_same_node(new) {
                tracing::trace!(
                    "Renderer::patch - replacing {:?} with {:?}",
                    prev.kind(),
                    new.kind()
                );
                anchor = self.next_host_node(prev);
                self.unmount(prev, true)?;
                old = None;
            }
        }

        match new.kind() {
            NodeKind::Text => self.process_text(old, new, parent, anchor),
            NodeKind::Comment => self.process_comment(old, new, parent, anchor),
            NodeKind::Fragment => self.process_fragment(old, new, parent, anchor),
            NodeKind::Element(tag) => match old {
                None => self.mount_element(tag, new, parent, anchor),
                Some(prev) => self.patch_element(prev, new),
            },
            NodeKind::Component(def) => self.process_component(def, old, new, parent, anchor),
        }
    }

    // =========================================================================
    // Text / comment
    // =========================================================================

    fn process_text(
        &self,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        parent: HostNode,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        let content = new.child_nodes().text().unwrap_or_default();
        match old {
            None => {
                let node = self.host.borrow_mut().create_text(content)?;
                new.el.set(Some(node));
                self.host.borrow_mut().insert(node, parent, anchor)?;
            }
            Some(prev) => {
                let node = prev.el.get().ok_or(RenderError::MissingHostNode("text"))?;
                new.el.set(Some(node));
                if prev.child_nodes().text() != Some(content) {
                    self.host.borrow_mut().set_text(node, content)?;
                }
            }
        }
        Ok(())
    }

    fn process_comment(
        &self,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        parent: HostNode,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        let content = new.child_nodes().text().unwrap_or_default();
        match old {
            None => {
                let node = self.host.borrow_mut().create_comment(content)?;
                new.el.set(Some(node));
                self.host.borrow_mut().insert(node, parent, anchor)?;
            }
            Some(prev) => {
                let node = prev.el.get().ok_or(RenderError::MissingHostNode("comment"))?;
                new.el.set(Some(node));
                if prev.child_nodes().text() != Some(content) {
                    self.host.borrow_mut().set_text(node, content)?;
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Fragment
    // =========================================================================

    /// Fragments are bracketed by two empty text nodes; members live between
    /// them and the end node is the anchor for mounting members.
    fn process_fragment(
        self: &Rc<Self>,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        parent: HostNode,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        match old {
            None => {
                let (start, end) = {
                    let mut host = self.host.borrow_mut();
                    let start = host.create_text("")?;
                    let end = host.create_text("")?;
                    host.insert(start, parent, anchor)?;
                    host.insert(end, parent, anchor)?;
                    (start, end)
                };
                new.el.set(Some(start));
                new.anchor.set(Some(end));
                self.mount_children(new.child_nodes().nodes(), parent, Some(end))
            }
            Some(prev) => {
                let start = prev.el.get().ok_or(RenderError::MissingHostNode("fragment"))?;
                let end = prev
                    .anchor
                    .get()
                    .ok_or(RenderError::MissingHostNode("fragment end"))?;
                new.el.set(Some(start));
                new.anchor.set(Some(end));
                self.patch_keyed_children(
                    prev.child_nodes().nodes(),
                    new.child_nodes().nodes(),
                    parent,
                    Some(end),
                )
            }
        }
    }

    // =========================================================================
    // Element
    // =========================================================================

    fn mount_element(
        self: &Rc<Self>,
        tag: &str,
        vnode: &VNodeRef,
        parent: HostNode,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        let el = self.host.borrow_mut().create_element(tag)?;
        vnode.el.set(Some(el));

        if let Some(text) = vnode.child_nodes().text() {
            self.host.borrow_mut().set_element_text(el, text)?;
        } else {
            self.mount_children(vnode.child_nodes().nodes(), el, None)?;
        }

        if let Some(props) = vnode.props_ref() {
            let mut host = self.host.borrow_mut();
            for (key, value) in props.iter() {
                host.patch_prop(el, key, None, Some(value))?;
            }
        }

        self.host.borrow_mut().insert(el, parent, anchor)?;
        Ok(())
    }

    fn patch_element(self: &Rc<Self>, old: &VNodeRef, new: &VNodeRef) -> Result<()> {
        let el = old.el.get().ok_or(RenderError::MissingHostNode("element"))?;
        new.el.set(Some(el));

        self.patch_children(old, new, el, None)?;
        self.patch_props(el, old.props_ref(), new.props_ref())
    }

    /// Set changed and new keys, then clear keys missing from `new`
    fn patch_props(&self, el: HostNode, old: Option<&Rc<Props>>, new: Option<&Rc<Props>>) -> Result<()> {
        if let (Some(a), Some(b)) = (old, new) {
            if Rc::ptr_eq(a, b) {
                return Ok(());
            }
        }

        let mut host = self.host.borrow_mut();
        if let Some(next_props) = new {
            for (key, next) in next_props.iter() {
                let prev = old.and_then(|p| p.get(key));
                if prev != Some(next) {
                    host.patch_prop(el, key, prev, Some(next))?;
                }
            }
        }
        if let Some(prev_props) = old {
            for (key, prev) in prev_props.iter() {
                let removed = new.map_or(true, |p| !p.contains_key(key));
                if removed {
                    host.patch_prop(el, key, Some(prev), None)?;
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Moves, removal, host lookups
    // =========================================================================

    /// Re-insert every host node of `vnode` before `anchor`
    pub(crate) fn move_node(&self, vnode: &VNode, parent: HostNode, anchor: Option<HostNode>) -> Result<()> {
        match vnode.kind() {
            NodeKind::Component(_) => {
                let subtree = vnode
                    .component_instance()
                    .and_then(|instance| instance.subtree())
                    .ok_or(RenderError::MissingHostNode("component"))?;
                self.move_node(&subtree, parent, anchor)
            }
            NodeKind::Fragment => {
                let start = vnode.el.get().ok_or(RenderError::MissingHostNode("fragment"))?;
                let end = vnode
                    .anchor
                    .get()
                    .ok_or(RenderError::MissingHostNode("fragment end"))?;
                self.host.borrow_mut().insert(start, parent, anchor)?;
                for child in vnode.child_nodes().nodes() {
                    self.move_node(child, parent, anchor)?;
                }
                self.host.borrow_mut().insert(end, parent, anchor)?;
                Ok(())
            }
            _ => {
                let el = vnode.el.get().ok_or(RenderError::MissingHostNode("node"))?;
                self.host.borrow_mut().insert(el, parent, anchor)?;
                Ok(())
            }
        }
    }

    /// Tear down `vnode`: stop component effects, clear host handles, and
    /// (when `remove` is set) detach its host nodes. Descendants of a removed
    /// element go with it, so they are unmounted without host removals.
    pub(crate) fn unmount(&self, vnode: &VNode, remove: bool) -> Result<()> {
        match vnode.kind() {
            NodeKind::Component(_) => self.unmount_component(vnode, remove)?,
            NodeKind::Fragment => {
                for child in vnode.child_nodes().nodes() {
                    self.unmount(child, remove)?;
                }
                if remove {
                    let mut host = self.host.borrow_mut();
                    for node in [vnode.el.get(), vnode.anchor.get()].into_iter().flatten() {
                        host.remove(node)?;
                    }
                }
            }
            NodeKind::Element(_) => {
                for child in vnode.child_nodes().nodes() {
                    self.unmount(child, false)?;
                }
                if remove {
                    let el = vnode.el.get().ok_or(RenderError::MissingHostNode("element"))?;
                    self.host.borrow_mut().remove(el)?;
                }
            }
            NodeKind::Text | NodeKind::Comment => {
                if remove {
                    let el = vnode.el.get().ok_or(RenderError::MissingHostNode("text"))?;
                    self.host.borrow_mut().remove(el)?;
                }
            }
        }

        vnode.el.set(None);
        vnode.anchor.set(None);
        Ok(())
    }

    /// First host node `vnode` rendered, looking through components
    pub(crate) fn first_host_node(&self, vnode: &VNode) -> Option<HostNode> {
        match vnode.kind() {
            NodeKind::Component(_) => vnode
                .component_instance()
                .and_then(|instance| instance.subtree())
                .and_then(|subtree| self.first_host_node(&subtree)),
            _ => vnode.el.get(),
        }
    }

    /// Host node that follows everything `vnode` rendered
    pub(crate) fn next_host_node(&self, vnode: &VNode) -> Option<HostNode> {
        match vnode.kind() {
            NodeKind::Component(_) => vnode
                .component_instance()
                .and_then(|instance| instance.subtree())
                .and_then(|subtree| self.next_host_node(&subtree)),
            NodeKind::Fragment => {
                let end = vnode.anchor.get()?;
                self.host.borrow().next_sibling(end)
            }
            _ => {
                let el = vnode.el.get()?;
                self.host.borrow().next_sibling(el)
            }
        }
    }
}
