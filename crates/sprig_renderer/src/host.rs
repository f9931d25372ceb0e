//! Host adapter interface
//!
//! The reconciler never touches a platform tree directly. It emits
//! operations through a [`HostAdapter`], addressing host nodes by
//! [`HostNode`] handles the adapter hands out.

use slotmap::new_key_type;

use crate::error::HostResult;
use crate::vnode::PropValue;

new_key_type! {
    /// Handle to a node owned by the host
    pub struct HostNode;
}

/// Platform operations the reconciler needs.
///
/// Implementations allocate [`HostNode`] handles, typically from a
/// `SlotMap<HostNode, _>`, and own the nodes they refer to.
pub trait HostAdapter {
    /// Create an element with the given tag
    fn create_element(&mut self, tag: &str) -> HostResult<HostNode>;

    /// Create a text node
    fn create_text(&mut self, text: &str) -> HostResult<HostNode>;

    /// Create a comment node
    fn create_comment(&mut self, text: &str) -> HostResult<HostNode>;

    /// Replace all content of an element with a text string
    fn set_element_text(&mut self, element: HostNode, text: &str) -> HostResult<()>;

    /// Set the data of a text or comment node
    fn set_text(&mut self, node: HostNode, text: &str) -> HostResult<()>;

    /// Apply one property change. `next == None` removes the property.
    fn patch_prop(
        &mut self,
        element: HostNode,
        key: &str,
        prev: Option<&PropValue>,
        next: Option<&PropValue>,
    ) -> HostResult<()>;

    /// Insert `node` into `parent` before `anchor`, or at the end.
    ///
    /// A node that is already attached somewhere is moved.
    fn insert(&mut self, node: HostNode, parent: HostNode, anchor: Option<HostNode>) -> HostResult<()>;

    /// Detach `node` and release it together with its descendants
    fn remove(&mut self, node: HostNode) -> HostResult<()>;

    /// Parent of an attached node
    fn parent_node(&self, node: HostNode) -> Option<HostNode>;

    /// Following sibling of an attached node
    fn next_sibling(&self, node: HostNode) -> Option<HostNode>;
}
