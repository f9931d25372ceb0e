//! Children diffing
//!
//! | old \ new | text                 | nodes                 | none        |
//! |-----------|----------------------|-----------------------|-------------|
//! | nodes     | unmount all, set text| keyed diff            | unmount all |
//! | text      | set text if changed  | clear text, mount all | clear text  |
//! | none      | set text             | mount all             | nothing     |
//!
//! The keyed diff syncs the common prefix and suffix, then handles whatever
//! is left in the middle: pure insertions, pure removals, or a general
//! reorder resolved with a longest increasing subsequence so that the
//! fewest nodes move.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::config::DuplicateKeyPolicy;
use crate::error::{RenderError, Result};
use crate::host::{HostAdapter, HostNode};
use crate::lis::longest_increasing_subsequence;
use crate::renderer::RendererInner;
use crate::vnode::{Children, Key, VNodeRef};

impl<H: HostAdapter + 'static> RendererInner<H> {
    pub(crate) fn patch_children(
        self: &Rc<Self>,
        old: &VNodeRef,
        new: &VNodeRef,
        container: HostNode,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        match (old.child_nodes(), new.child_nodes()) {
            (Children::Nodes(prev), Children::Text(text)) => {
                self.unmount_children(prev)?;
                self.host.borrow_mut().set_element_text(container, text)?;
            }
            (Children::Nodes(prev), Children::Nodes(next)) => {
                self.patch_keyed_children(prev, next, container, anchor)?;
            }
            (Children::Nodes(prev), Children::None) => {
                self.unmount_children(prev)?;
            }
            (Children::Text(prev), Children::Text(text)) => {
                if prev != text {
                    self.host.borrow_mut().set_element_text(container, text)?;
                }
            }
            (Children::Text(_), Children::Nodes(next)) => {
                self.host.borrow_mut().set_element_text(container, "")?;
                self.mount_children(next, container, anchor)?;
            }
            (Children::Text(_), Children::None) => {
                self.host.borrow_mut().set_element_text(container, "")?;
            }
            (Children::None, Children::Text(text)) => {
                self.host.borrow_mut().set_element_text(container, text)?;
            }
            (Children::None, Children::Nodes(next)) => {
                self.mount_children(next, container, anchor)?;
            }
            (Children::None, Children::None) => {}
        }
        Ok(())
    }

    pub(crate) fn mount_children(
        self: &Rc<Self>,
        children: &[VNodeRef],
        container: HostNode,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        for child in children {
            self.patch(None, child, container, anchor)?;
        }
        Ok(())
    }

    pub(crate) fn unmount_children(&self, children: &[VNodeRef]) -> Result<()> {
        for child in children {
            self.unmount(child, true)?;
        }
        Ok(())
    }

    /// Diff two sibling lists under `container`. `parent_anchor` is the host
    /// node that follows the whole list, if any.
    pub(crate) fn patch_keyed_children(
        self: &Rc<Self>,
        old: &[VNodeRef],
        new: &[VNodeRef],
        container: HostNode,
        parent_anchor: Option<HostNode>,
    ) -> Result<()> {
        let mut i = 0;
        // Exclusive ends of the unsynced ranges
        let mut old_end = old.len();
        let mut new_end = new.len();

        // 1. common prefix
        while i < old_end && i < new_end && old[i].is_same_node(&new[i]) {
            self.patch(Some(&old[i]), &new[i], container, None)?;
            i += 1;
        }

        // 2. common suffix
        while i < old_end && i < new_end && old[old_end - 1].is_same_node(&new[new_end - 1]) {
            self.patch(Some(&old[old_end - 1]), &new[new_end - 1], container, None)?;
            old_end -= 1;
            new_end -= 1;
        }

        // 3. only insertions left
        if i == old_end {
            if i < new_end {
                let anchor = self.anchor_after(new, new_end, parent_anchor);
                tracing::trace!(
                    "Renderer::patch_keyed_children - mounting {} nodes",
                    new_end - i
                );
                for node in &new[i..new_end] {
                    self.patch(None, node, container, anchor)?;
                }
            }
            return Ok(());
        }

        // 4. only removals left
        if i == new_end {
            tracing::trace!(
                "Renderer::patch_keyed_children - unmounting {} nodes",
                old_end - i
            );
            return self.unmount_children(&old[i..old_end]);
        }

        // 5. unknown middle
        self.patch_middle(old, new, i, old_end, new_end, container, parent_anchor)
    }

    #[allow(clippy::too_many_arguments)]
    fn patch_middle(
        self: &Rc<Self>,
        old: &[VNodeRef],
        new: &[VNodeRef],
        start: usize,
        old_end: usize,
        new_end: usize,
        container: HostNode,
        parent_anchor: Option<HostNode>,
    ) -> Result<()> {
        // 5.1 key → absolute index in `new`
        let key_to_new = self.index_keys(&new[start..new_end], start)?;

        // 5.2 match old nodes; new_to_old[k] is old index + 1, 0 if unmatched
        let to_patch = new_end - start;
        let mut new_to_old = vec![0usize; to_patch];
        let mut patched = 0;
        let mut moved = false;
        let mut max_new_index = 0;

        for (old_index, prev) in old.iter().enumerate().take(old_end).skip(start) {
            if patched >= to_patch {
                // Every new slot is spoken for
                self.unmount(prev, true)?;
                continue;
            }

            let new_index = match prev.key_ref() {
                Some(key) => key_to_new.get(key).copied(),
                None => (start..new_end).find(|&j| {
                    new_to_old[j - start] == 0
                        && new[j].key_ref().is_none()
                        && prev.is_same_node(&new[j])
                }),
            };

            match new_index {
                Some(j) if new_to_old[j - start] == 0 => {
                    new_to_old[j - start] = old_index + 1;
                    if j >= max_new_index {
                        max_new_index = j;
                    } else {
                        moved = true;
                    }
                    self.patch(Some(prev), &new[j], container, None)?;
                    patched += 1;
                }
                _ => self.unmount(prev, true)?,
            }
        }

        // 5.3 move and mount, back to front so each anchor is already placed
        let stable = if moved {
            longest_increasing_subsequence(&new_to_old)
        } else {
            Vec::new()
        };
        let mut next_stable = stable.len();
        let mut moves = 0;
        let mut mounts = 0;

        for k in (0..to_patch).rev() {
            let index = start + k;
            let node = &new[index];
            let anchor = self.anchor_after(new, index + 1, parent_anchor);

            if new_to_old[k] == 0 {
                self.patch(None, node, container, anchor)?;
                mounts += 1;
            } else if moved {
                if next_stable > 0 && stable[next_stable - 1] == k {
                    next_stable -= 1;
                } else {
                    self.move_node(node, container, anchor)?;
                    moves += 1;
                }
            }
        }

        tracing::trace!(
            "Renderer::patch_keyed_children - middle of {}: {} patched, {} moved, {} mounted",
            to_patch,
            patched,
            moves,
            mounts
        );
        Ok(())
    }

    /// Map the keys of `nodes` to absolute indices, applying the duplicate
    /// key policy
    fn index_keys<'a>(&self, nodes: &'a [VNodeRef], offset: usize) -> Result<FxHashMap<&'a Key, usize>> {
        let mut map = FxHashMap::default();
        for (j, node) in nodes.iter().enumerate() {
            let Some(key) = node.key_ref() else {
                continue;
            };
            if map.insert(key, offset + j).is_some() {
                match self.config.duplicate_keys {
                    DuplicateKeyPolicy::Warn => {
                        tracing::warn!(
                            "Renderer::patch_keyed_children - duplicate key {}; last one wins",
                            key
                        );
                    }
                    DuplicateKeyPolicy::Reject => {
                        return Err(RenderError::DuplicateKey(key.clone()));
                    }
                    DuplicateKeyPolicy::Ignore => {}
                }
            }
        }
        Ok(map)
    }

    /// First host node of `nodes[index]`, or `fallback` past the end
    fn anchor_after(&self, nodes: &[VNodeRef], index: usize, fallback: Option<HostNode>) -> Option<HostNode> {
        match nodes.get(index) {
            Some(node) => self.first_host_node(node),
            None => fallback,
        }
    }
}
