//! Sprig Renderer
//!
//! Keyed virtual-node reconciler on top of `sprig_core`:
//!
//! - **Virtual nodes**: elements, text, comments, fragments, and components
//! - **Reconciler**: emits the host operations needed to move from one tree
//!   to the next, moving the fewest keyed children on reorder
//! - **Components**: render functions wrapped in reactive effects whose
//!   re-renders are batched through an update queue
//! - **Host adapter**: the platform seam; [`testing::RecordingHost`] is an
//!   in-memory implementation
//!
//! # Example
//!
//! ```rust
//! use sprig_renderer::testing::RecordingHost;
//! use sprig_renderer::vnode::element;
//! use sprig_renderer::{Container, Renderer};
//!
//! let mut host = RecordingHost::new();
//! let container = Container::new(host.create_root("ul"));
//! let renderer = Renderer::new(host);
//!
//! let list = |keys: &[i32]| {
//!     element("div")
//!         .children(keys.iter().map(|&k| element("li").key(k).text(k.to_string())))
//!         .build()
//! };
//!
//! renderer.render(Some(list(&[1, 2, 3, 4])), &container).unwrap();
//! renderer.host_mut().clear_ops();
//!
//! renderer.render(Some(list(&[4, 3, 2, 1])), &container).unwrap();
//! assert_eq!(renderer.host().moves(), 3);
//! assert_eq!(renderer.host().creates(), 0);
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod host;
pub mod lis;
mod reconciler;
pub mod renderer;
pub mod testing;
pub mod vnode;

pub use component::{component_fn, Component, ComponentDef, ComponentInstance, RenderFn};
pub use config::{DuplicateKeyPolicy, RendererConfig};
pub use error::{HostError, HostResult, RenderError, Result};
pub use host::{HostAdapter, HostNode};
pub use renderer::{Container, Renderer};
pub use vnode::{Children, ChildrenShape, Key, NodeKind, PropValue, Props, VNode, VNodeRef};
