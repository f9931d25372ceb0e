//! Renderer entry point
//!
//! [`Renderer`] ties a host adapter to a reactive runtime and an update
//! queue. [`Renderer::render`] mounts, patches, or clears the tree held by a
//! [`Container`]; component re-renders triggered by state writes wait in the
//! queue until [`Renderer::flush`].
//!
//! The host is borrowed per operation, never across a nested render, so
//! components may mount further components while their own render runs.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use sprig_core::{context, Runtime, UpdateQueue};

use crate::config::RendererConfig;
use crate::error::{RenderError, Result};
use crate::host::{HostAdapter, HostNode};
use crate::vnode::VNodeRef;

/// Mount target: a host node plus the tree last rendered into it
pub struct Container {
    node: HostNode,
    vnode: RefCell<Option<VNodeRef>>,
}

impl Container {
    pub fn new(node: HostNode) -> Self {
        Self {
            node,
            vnode: RefCell::new(None),
        }
    }

    /// Host node the tree is mounted into
    pub fn node(&self) -> HostNode {
        self.node
    }

    /// Tree from the last render, if any
    pub fn vnode(&self) -> Option<VNodeRef> {
        self.vnode.borrow().clone()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("node", &self.node)
            .field("mounted", &self.vnode.borrow().is_some())
            .finish()
    }
}

pub(crate) struct RendererInner<H> {
    pub(crate) host: RefCell<H>,
    pub(crate) runtime: Runtime,
    pub(crate) queue: UpdateQueue,
    pub(crate) config: RendererConfig,
    /// Failures from component renders, which run inside effects and cannot
    /// return them directly
    pub(crate) errors: RefCell<Vec<RenderError>>,
}

impl<H> RendererInner<H> {
    pub(crate) fn report(&self, err: RenderError) {
        self.errors.borrow_mut().push(err);
    }

    fn take_errors(&self) -> Result<()> {
        let mut errors = std::mem::take(&mut *self.errors.borrow_mut()).into_iter();
        match errors.next() {
            None => Ok(()),
            Some(first) => {
                let dropped = errors.count();
                if dropped > 0 {
                    tracing::warn!("Renderer - {} further render errors dropped", dropped);
                }
                Err(first)
            }
        }
    }
}

/// Renders virtual node trees into a host
pub struct Renderer<H> {
    inner: Rc<RendererInner<H>>,
}

impl<H: HostAdapter + 'static> Renderer<H> {
    /// Renderer on the current thread's runtime with default settings
    pub fn new(host: H) -> Self {
        Self::with_runtime(host, context::current(), RendererConfig::default())
    }

    /// Renderer on a fresh runtime built from `config.reactive`
    pub fn with_config(host: H, config: RendererConfig) -> Self {
        let runtime = Runtime::with_config(config.reactive.clone());
        Self::with_runtime(host, runtime, config)
    }

    pub fn with_runtime(host: H, runtime: Runtime, config: RendererConfig) -> Self {
        let queue = UpdateQueue::with_config(&config.reactive);
        tracing::debug!(
            "Renderer::new - duplicate keys: {:?}, max recursive updates: {}",
            config.duplicate_keys,
            config.reactive.max_recursive_updates
        );
        Self {
            inner: Rc::new(RendererInner {
                host: RefCell::new(host),
                runtime,
                queue,
                config,
                errors: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Mount, update, or (with `None`) clear the container's tree
    pub fn render(&self, vnode: Option<VNodeRef>, container: &Container) -> Result<()> {
        let prev = container.vnode();

        let outcome = match (&prev, &vnode) {
            (Some(prev), None) => self.inner.unmount(prev, true),
            (prev, Some(next)) => self.inner.patch(prev.as_ref(), next, container.node(), None),
            (None, None) => Ok(()),
        };
        *container.vnode.borrow_mut() = vnode;

        outcome?;
        self.inner.take_errors()
    }

    /// Run every queued component update. Returns how many ran.
    pub fn flush(&self) -> Result<usize> {
        let ran = self.inner.queue.flush(&self.inner.runtime)?;
        self.inner.take_errors()?;
        Ok(ran)
    }

    /// Run `f`, then flush the updates it queued
    pub fn batch<R>(&self, f: impl FnOnce(&Runtime) -> R) -> Result<R> {
        let out = f(&self.inner.runtime);
        self.flush()?;
        Ok(out)
    }

    /// Whether component updates are waiting for a flush
    pub fn needs_flush(&self) -> bool {
        self.inner.queue.needs_flush()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    pub fn queue(&self) -> &UpdateQueue {
        &self.inner.queue
    }

    pub fn config(&self) -> &RendererConfig {
        &self.inner.config
    }

    /// Borrow the host. Must not be held across `render` or `flush`.
    pub fn host(&self) -> Ref<'_, H> {
        self.inner.host.borrow()
    }

    /// Mutably borrow the host. Must not be held across `render` or `flush`.
    pub fn host_mut(&self) -> RefMut<'_, H> {
        self.inner.host.borrow_mut()
    }
}
