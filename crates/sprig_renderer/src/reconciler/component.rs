//! Component mounting and updates
//!
//! Each mounted component owns one render effect. The effect's scheduler is
//! the renderer's update queue, so state writes only queue a re-render; a
//! parent passing new props re-renders the child synchronously instead and
//! drops any update already queued for it.

use std::rc::Rc;

use sprig_core::{EffectOptions, Runtime};

use crate::component::{ComponentDef, ComponentInstance};
use crate::error::{RenderError, Result};
use crate::host::{HostAdapter, HostNode};
use crate::renderer::RendererInner;
use crate::vnode::{Props, VNode, VNodeRef};

impl<H: HostAdapter + 'static> RendererInner<H> {
    pub(crate) fn process_component(
        self: &Rc<Self>,
        def: &ComponentDef,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        parent: HostNode,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        match old {
            None => self.mount_component(def, new, parent, anchor),
            Some(prev) => self.update_component(def, prev, new),
        }
    }

    fn mount_component(
        self: &Rc<Self>,
        def: &ComponentDef,
        vnode: &VNodeRef,
        parent: HostNode,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        let props = vnode.props_ref().cloned().unwrap_or_default();
        let instance = Rc::new(ComponentInstance::new(Rc::clone(def), props, vnode));
        *vnode.component.borrow_mut() = Some(Rc::clone(&instance));
        tracing::debug!("Renderer::mount_component - {}", def.name());

        let body = {
            let renderer = Rc::downgrade(self);
            let instance = Rc::downgrade(&instance);
            // Only the first run inserts; later runs find their place from
            // the previous subtree
            let mut target = Some((parent, anchor));
            move |rt: &Runtime| {
                let (Some(renderer), Some(instance)) = (renderer.upgrade(), instance.upgrade()) else {
                    return;
                };
                if let Err(err) = renderer.render_component(rt, &instance, target.take()) {
                    tracing::error!(
                        "Renderer::render_component - {} failed: {}",
                        instance.name(),
                        err
                    );
                    renderer.report(err);
                }
            }
        };

        let options = EffectOptions::new()
            .with_shared_scheduler(self.queue.scheduler())
            .with_label(def.name().to_owned());
        let effect = self.runtime.effect(body, options);
        instance.set_effect(Some(effect));
        Ok(())
    }

    /// Same component re-rendered by its parent: keep the instance, and
    /// re-render now if the props changed
    fn update_component(self: &Rc<Self>, def: &ComponentDef, old: &VNodeRef, new: &VNodeRef) -> Result<()> {
        let instance = old
            .component
            .borrow_mut()
            .take()
            .ok_or_else(|| RenderError::ComponentNotMounted(def.name().to_owned()))?;

        *new.component.borrow_mut() = Some(Rc::clone(&instance));
        instance.set_vnode(new);
        new.el.set(old.el.get());

        if !props_changed(old.props_ref(), new.props_ref()) {
            return Ok(());
        }

        tracing::trace!("Renderer::update_component - {} props changed", def.name());
        instance.set_props(new.props_ref().cloned().unwrap_or_default());
        if let Some(effect) = instance.effect() {
            self.queue.invalidate(effect);
            self.runtime.run(effect)?;
        }
        Ok(())
    }

    /// Body of a component's render effect
    pub(crate) fn render_component(
        self: &Rc<Self>,
        rt: &Runtime,
        instance: &Rc<ComponentInstance>,
        target: Option<(HostNode, Option<HostNode>)>,
    ) -> Result<()> {
        match instance.subtree() {
            None => {
                let (parent, anchor) = target
                    .ok_or_else(|| RenderError::ComponentNotMounted(instance.name().to_owned()))?;
                let next = instance.render(rt)?;
                instance.replace_subtree(Some(Rc::clone(&next)));

                self.patch(None, &next, parent, anchor)?;
                instance.set_mounted(true);
                self.sync_component_el(instance, &next);
                rt.untracked(|| instance.def().mounted(instance));
            }
            Some(prev) => {
                let first = self
                    .first_host_node(&prev)
                    .ok_or(RenderError::MissingHostNode("component"))?;
                let parent = self
                    .host
                    .borrow()
                    .parent_node(first)
                    .ok_or(RenderError::MissingHostNode("component parent"))?;
                let anchor = self.next_host_node(&prev);

                let next = instance.render(rt)?;
                instance.replace_subtree(Some(Rc::clone(&next)));

                self.patch(Some(&prev), &next, parent, anchor)?;
                self.sync_component_el(instance, &next);
                rt.untracked(|| instance.def().updated(instance));
            }
        }
        Ok(())
    }

    pub(crate) fn unmount_component(&self, vnode: &VNode, remove: bool) -> Result<()> {
        let Some(instance) = vnode.component.borrow_mut().take() else {
            return Ok(());
        };

        self.runtime.untracked(|| instance.def().unmounted(&instance));
        if let Some(effect) = instance.effect() {
            self.queue.invalidate(effect);
            self.runtime.stop(effect);
        }
        tracing::debug!("Renderer::unmount_component - {}", instance.name());

        match instance.release() {
            Some(subtree) => self.unmount(&subtree, remove),
            None => Ok(()),
        }
    }

    fn sync_component_el(&self, instance: &ComponentInstance, subtree: &VNode) {
        if let Some(vnode) = instance.vnode() {
            vnode.el.set(self.first_host_node(subtree));
        }
    }
}

fn props_changed(old: Option<&Rc<Props>>, new: Option<&Rc<Props>>) -> bool {
    match (old, new) {
        (None, None) => false,
        (Some(a), Some(b)) => !Rc::ptr_eq(a, b) && a != b,
        (Some(props), None) | (None, Some(props)) => !props.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::element;

    fn props_of(node: VNodeRef) -> Option<Rc<Props>> {
        node.props_ref().cloned()
    }

    #[test]
    fn test_props_changed() {
        let a = props_of(element("x").prop("n", 1).build());
        let same = props_of(element("x").prop("n", 1).build());
        let other = props_of(element("x").prop("n", 2).build());
        let empty = Some(Rc::new(Props::default()));

        assert!(!props_changed(None, None));
        assert!(!props_changed(a.as_ref(), a.as_ref()));
        assert!(!props_changed(a.as_ref(), same.as_ref()));
        assert!(props_changed(a.as_ref(), other.as_ref()));
        assert!(props_changed(a.as_ref(), None));
        assert!(!props_changed(None, empty.as_ref()));
    }
}
