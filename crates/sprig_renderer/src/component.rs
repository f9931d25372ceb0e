//! Components
//!
//! A component is a definition ([`Component`]) shared by every vnode that
//! renders it, plus one [`ComponentInstance`] per mounted occurrence. On
//! mount the renderer calls [`Component::setup`] once and wraps the returned
//! render function in a reactive effect: whatever the render function reads
//! through the runtime re-renders the instance when it changes.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use sprig_core::{EffectId, Runtime};

use crate::error::{RenderError, Result};
use crate::vnode::{Props, VNode, VNodeRef};

/// Produces the instance's subtree from its current props
pub type RenderFn = Box<dyn FnMut(&Runtime, &Props) -> VNodeRef>;

/// Shared component definition. Two component vnodes are the same type
/// when they point at the same definition.
pub type ComponentDef = Rc<dyn Component>;

/// A component definition
pub trait Component: 'static {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Called once per mounted instance with its initial props
    fn setup(&self, props: &Props) -> RenderFn;

    /// After the first render has been inserted into the host
    fn mounted(&self, _instance: &ComponentInstance) {}

    /// After a re-render has been patched into the host
    fn updated(&self, _instance: &ComponentInstance) {}

    /// Before the instance's subtree is removed
    fn unmounted(&self, _instance: &ComponentInstance) {}
}

/// Component backed by a setup closure
pub struct FnComponent<S> {
    name: Cow<'static, str>,
    setup: S,
}

impl<S> Component for FnComponent<S>
where
    S: Fn(&Props) -> RenderFn + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&self, props: &Props) -> RenderFn {
        (self.setup)(props)
    }
}

/// Define a component from a setup closure.
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use sprig_core::Runtime;
/// use sprig_renderer::component::component_fn;
/// use sprig_renderer::vnode::{element, Props};
///
/// let counter = component_fn("Counter", |_props: &Props| {
///     let count = Rc::new(Cell::new(0));
///     Box::new(move |rt: &Runtime, _props: &Props| {
///         rt.track(&count, "value");
///         element("span").text(count.get().to_string()).build()
///     })
/// });
/// assert_eq!(counter.name(), "Counter");
/// ```
pub fn component_fn<S>(name: impl Into<Cow<'static, str>>, setup: S) -> ComponentDef
where
    S: Fn(&Props) -> RenderFn + 'static,
{
    Rc::new(FnComponent {
        name: name.into(),
        setup,
    })
}

/// State of one mounted component
pub struct ComponentInstance {
    def: ComponentDef,
    props: RefCell<Rc<Props>>,
    render: RefCell<Option<RenderFn>>,
    subtree: RefCell<Option<VNodeRef>>,
    /// The vnode currently representing this instance
    vnode: RefCell<Weak<VNode>>,
    effect: Cell<Option<EffectId>>,
    mounted: Cell<bool>,
    renders: Cell<u64>,
}

impl ComponentInstance {
    pub(crate) fn new(def: ComponentDef, props: Rc<Props>, vnode: &VNodeRef) -> Self {
        let render = def.setup(&props);
        Self {
            def,
            props: RefCell::new(props),
            render: RefCell::new(Some(render)),
            subtree: RefCell::new(None),
            vnode: RefCell::new(Rc::downgrade(vnode)),
            effect: Cell::new(None),
            mounted: Cell::new(false),
            renders: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn props(&self) -> Rc<Props> {
        Rc::clone(&self.props.borrow())
    }

    /// Root of the last rendered subtree
    pub fn subtree(&self) -> Option<VNodeRef> {
        self.subtree.borrow().clone()
    }

    /// The render effect
    pub fn effect(&self) -> Option<EffectId> {
        self.effect.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    /// How many times the render function has run
    pub fn render_count(&self) -> u64 {
        self.renders.get()
    }

    // ===== Renderer bookkeeping =====

    pub(crate) fn def(&self) -> &ComponentDef {
        &self.def
    }

    pub(crate) fn set_props(&self, props: Rc<Props>) {
        *self.props.borrow_mut() = props;
    }

    pub(crate) fn set_effect(&self, effect: Option<EffectId>) {
        self.effect.set(effect);
    }

    pub(crate) fn set_mounted(&self, mounted: bool) {
        self.mounted.set(mounted);
    }

    pub(crate) fn vnode(&self) -> Option<VNodeRef> {
        self.vnode.borrow().upgrade()
    }

    pub(crate) fn set_vnode(&self, vnode: &VNodeRef) {
        *self.vnode.borrow_mut() = Rc::downgrade(vnode);
    }

    /// Store a new subtree, returning the previous one
    pub(crate) fn replace_subtree(&self, subtree: Option<VNodeRef>) -> Option<VNodeRef> {
        self.subtree.replace(subtree)
    }

    /// Run the render function against the current props
    pub(crate) fn render(&self, runtime: &Runtime) -> Result<VNodeRef> {
        let render = self
            .render
            .borrow_mut()
            .take()
            .ok_or_else(|| RenderError::ComponentNotMounted(self.name().to_owned()))?;
        let mut slot = RenderSlot {
            slot: &self.render,
            render: Some(render),
        };

        let props = self.props();
        let subtree = match slot.render.as_mut() {
            Some(render) => render(runtime, &props),
            None => return Err(RenderError::ComponentNotMounted(self.name().to_owned())),
        };
        drop(slot);

        self.renders.set(self.renders.get() + 1);
        Ok(subtree)
    }

    /// Drop the render function and subtree once unmounted
    pub(crate) fn release(&self) -> Option<VNodeRef> {
        self.render.borrow_mut().take();
        self.mounted.set(false);
        self.effect.set(None);
        self.subtree.borrow_mut().take()
    }
}

/// Holds a render function taken out of its instance and puts it back on
/// drop, including when the render unwinds.
struct RenderSlot<'a> {
    slot: &'a RefCell<Option<RenderFn>>,
    render: Option<RenderFn>,
}

impl Drop for RenderSlot<'_> {
    fn drop(&mut self) {
        if let Some(render) = self.render.take() {
            *self.slot.borrow_mut() = Some(render);
        }
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("name", &self.name())
            .field("props", &self.props.borrow())
            .field("effect", &self.effect.get())
            .field("mounted", &self.mounted.get())
            .field("renders", &self.renders.get())
            .finish()
    }
}
