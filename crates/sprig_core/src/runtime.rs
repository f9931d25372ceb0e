//! Reactive runtime
//!
//! [`Runtime`] owns the dependency registry, every effect, and the stack of
//! currently running effects. It is a cheap handle (`Rc`) that effect bodies
//! receive by reference, so nothing here lives in a module-level global.
//!
//! # Tracking
//!
//! [`Runtime::track`] credits a read of `(target, key)` to the effect on top
//! of the active stack. [`Runtime::trigger`] snapshots the matching dependency
//! set and runs or schedules each member: derived effects first, then plain
//! effects, each group in subscription order.
//!
//! # Runs
//!
//! Before an effect body runs, the effect leaves every dependency set it
//! joined last time; the reads of this run re-subscribe it. The active stack
//! and the body are restored by a scope guard, so a panicking body leaves the
//! runtime consistent.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::config::ReactiveConfig;
use crate::effect::{EffectFn, EffectId, EffectOptions, EffectSlot};
use crate::error::{ReactiveError, Result};
use crate::registry::{DependencyRegistry, PropKey, Subscribers, TargetId};

pub(crate) struct RuntimeInner {
    registry: RefCell<DependencyRegistry>,
    effects: RefCell<SlotMap<EffectId, EffectSlot>>,
    active: RefCell<SmallVec<[EffectId; 4]>>,
    /// Depth of nested `untracked` scopes
    paused: Cell<u32>,
    config: ReactiveConfig,
}

/// Shared handle to a reactive runtime
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

/// Weak handle, used by values that must not keep the runtime alive
#[derive(Clone)]
pub struct WeakRuntime {
    inner: Weak<RuntimeInner>,
}

impl WeakRuntime {
    pub fn upgrade(&self) -> Option<Runtime> {
        self.inner.upgrade().map(|inner| Runtime { inner })
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("effects", &self.effect_count())
            .field("active", &self.inner.active.borrow().len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(ReactiveConfig::default())
    }

    pub fn with_config(config: ReactiveConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                registry: RefCell::new(DependencyRegistry::new()),
                effects: RefCell::new(SlotMap::with_key()),
                active: RefCell::new(SmallVec::new()),
                paused: Cell::new(0),
                config,
            }),
        }
    }

    pub fn config(&self) -> &ReactiveConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakRuntime {
        WeakRuntime {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same runtime
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Effects
    // =========================================================================

    /// Register `body` as an effect. Runs it immediately unless `options.lazy`.
    pub fn effect<F>(&self, body: F, options: EffectOptions) -> EffectId
    where
        F: FnMut(&Runtime) + 'static,
    {
        let lazy = options.lazy;
        let id = self
            .inner
            .effects
            .borrow_mut()
            .insert(EffectSlot::new(Box::new(body), options));

        tracing::trace!("Runtime::effect - created {:?} (lazy: {})", id, lazy);

        if !lazy {
            if let Err(err) = self.execute(id) {
                tracing::warn!("Runtime::effect - initial run of {:?} failed: {}", id, err);
            }
        }
        id
    }

    /// Run an effect now, regardless of its scheduler
    pub fn run(&self, id: EffectId) -> Result<()> {
        self.execute(id)
    }

    /// Run the effect through its scheduler if it has one, otherwise now
    pub fn run_or_schedule(&self, id: EffectId) {
        let scheduler = match self.inner.effects.borrow().get(id) {
            Some(slot) => slot.scheduler.clone(),
            None => {
                tracing::trace!("Runtime::run_or_schedule - {:?} was stopped", id);
                return;
            }
        };

        match scheduler {
            Some(scheduler) => scheduler(self, id),
            None => {
                if let Err(err) = self.execute(id) {
                    tracing::trace!("Runtime::run_or_schedule - skipped {:?}: {}", id, err);
                }
            }
        }
    }

    /// Stop an effect: it leaves every dependency set and is never run again.
    ///
    /// Returns false if the effect was already stopped.
    pub fn stop(&self, id: EffectId) -> bool {
        let removed = self.inner.effects.borrow_mut().remove(id);
        let Some(slot) = removed else {
            return false;
        };

        {
            let mut registry = self.inner.registry.borrow_mut();
            for &dep in &slot.deps {
                registry.unsubscribe(dep, id);
            }
        }

        tracing::trace!("Runtime::stop - stopped {:?} ({})", id, slot.label());
        // The body may own values whose drop re-enters the runtime.
        drop(slot);
        true
    }

    pub fn contains(&self, id: EffectId) -> bool {
        self.inner.effects.borrow().contains_key(id)
    }

    /// Number of live effects
    pub fn effect_count(&self) -> usize {
        self.inner.effects.borrow().len()
    }

    /// How many times the effect body has been entered
    pub fn run_count(&self, id: EffectId) -> Option<u64> {
        self.inner.effects.borrow().get(id).map(|slot| slot.runs)
    }

    /// Number of dependency sets the effect currently belongs to
    pub fn dependency_count(&self, id: EffectId) -> Option<usize> {
        self.inner.effects.borrow().get(id).map(|slot| slot.deps.len())
    }

    /// The effect that reads are currently credited to
    pub fn active_effect(&self) -> Option<EffectId> {
        self.inner.active.borrow().last().copied()
    }

    /// Whether `id` is executing anywhere on the active stack
    pub fn is_running(&self, id: EffectId) -> bool {
        self.inner.active.borrow().contains(&id)
    }

    /// Whether a read right now would be tracked
    pub fn is_tracking(&self) -> bool {
        self.inner.paused.get() == 0 && self.active_effect().is_some()
    }

    /// Run `f` without crediting its reads to the active effect
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _pause = TrackingPause::enter(self);
        f()
    }

    // =========================================================================
    // Tracking / triggering
    // =========================================================================

    /// Record that the active effect read `key` on `target`
    pub fn track<T: Any>(&self, target: &Rc<T>, key: impl Into<PropKey>) {
        if self.inner.paused.get() > 0 {
            return;
        }
        let Some(active) = self.active_effect() else {
            return;
        };
        if !self.contains(active) {
            // Stopped during its own run.
            return;
        }

        let key = key.into();
        let (dep, joined, sweep_due) = {
            let mut registry = self.inner.registry.borrow_mut();
            let dep = registry.dep_for(target, &key);
            let joined = registry.subscribe(dep, active);
            let interval = self.inner.config.sweep_interval;
            let sweep_due = interval > 0 && registry.registrations() >= interval;
            (dep, joined, sweep_due)
        };

        if joined {
            if let Some(slot) = self.inner.effects.borrow_mut().get_mut(active) {
                slot.deps.push(dep);
            }
            tracing::trace!("Runtime::track - {:?} now reads {:?}.{}", active, TargetId::of(target), key);
        }

        if sweep_due {
            self.sweep();
        }
    }

    /// Re-run or schedule every effect that read `key` on `target`
    pub fn trigger<T: Any, V: fmt::Debug + ?Sized>(
        &self,
        target: &Rc<T>,
        key: impl Into<PropKey>,
        new_value: &V,
    ) {
        let key = key.into();
        let wave = self.wave(TargetId::of(target), &key);
        if wave.is_empty() {
            return;
        }

        tracing::trace!(
            "Runtime::trigger - {:?}.{} = {:?} -> {} effects",
            TargetId::of(target),
            key,
            new_value,
            wave.len()
        );

        for id in wave {
            self.run_or_schedule(id);
        }
    }

    /// Subscribers of `(target, key)`, in subscription order
    pub fn subscribers<T: Any>(&self, target: &Rc<T>, key: impl Into<PropKey>) -> Subscribers {
        self.inner
            .registry
            .borrow()
            .subscribers(TargetId::of(target), &key.into())
    }

    /// Prune registry entries of dropped targets. Returns the number pruned.
    pub fn sweep(&self) -> usize {
        self.inner.registry.borrow_mut().sweep()
    }

    /// Number of targets currently tracked
    pub fn tracked_target_count(&self) -> usize {
        self.inner.registry.borrow().target_count()
    }

    /// The ordered set of effects one trigger of `(target, key)` reaches
    fn wave(&self, target: TargetId, key: &PropKey) -> Subscribers {
        let subscribers = self.inner.registry.borrow().subscribers(target, key);
        if subscribers.is_empty() {
            return subscribers;
        }

        let effects = self.inner.effects.borrow();
        let active = self.inner.active.borrow();
        let current = active.last().copied();

        let mut derived = Subscribers::new();
        let mut plain = Subscribers::new();
        for id in subscribers {
            // The writer never re-triggers itself. Outer effects still on the
            // stack can only be scheduled; running them now would re-enter.
            if Some(id) == current {
                continue;
            }
            match effects.get(id) {
                Some(slot) if active.contains(&id) && slot.scheduler.is_none() => {}
                Some(slot) if slot.derived => derived.push(id),
                Some(_) => plain.push(id),
                None => {}
            }
        }
        derived.extend(plain);
        derived
    }

    // =========================================================================
    // Execution
    // =========================================================================

    fn execute(&self, id: EffectId) -> Result<()> {
        let body = {
            let mut effects = self.inner.effects.borrow_mut();
            let slot = effects.get_mut(id).ok_or(ReactiveError::UnknownEffect(id))?;
            let body = slot.body.take().ok_or(ReactiveError::Reentrant(id))?;
            slot.runs += 1;
            body
        };

        self.cleanup(id);

        let mut scope = ActiveScope::enter(self, id, body);
        scope.call();
        Ok(())
    }

    /// Leave every dependency set joined during the previous run
    fn cleanup(&self, id: EffectId) {
        let deps = match self.inner.effects.borrow_mut().get_mut(id) {
            Some(slot) => std::mem::take(&mut slot.deps),
            None => return,
        };
        let mut registry = self.inner.registry.borrow_mut();
        for dep in deps {
            registry.unsubscribe(dep, id);
        }
    }
}

/// Marks an effect active for the duration of one run.
///
/// Dropping the scope pops the active stack and hands the body back to its
/// slot, including when the body unwinds.
struct ActiveScope<'rt> {
    runtime: &'rt Runtime,
    id: EffectId,
    body: Option<EffectFn>,
}

impl<'rt> ActiveScope<'rt> {
    fn enter(runtime: &'rt Runtime, id: EffectId, body: EffectFn) -> Self {
        runtime.inner.active.borrow_mut().push(id);
        Self {
            runtime,
            id,
            body: Some(body),
        }
    }

    fn call(&mut self) {
        if let Some(body) = self.body.as_mut() {
            body(self.runtime);
        }
    }
}

impl Drop for ActiveScope<'_> {
    fn drop(&mut self) {
        let popped = self.runtime.inner.active.borrow_mut().pop();
        debug_assert_eq!(popped, Some(self.id), "active effect stack out of order");

        let orphan = {
            let mut effects = self.runtime.inner.effects.borrow_mut();
            match effects.get_mut(self.id) {
                Some(slot) => {
                    slot.body = self.body.take();
                    None
                }
                // Stopped while running.
                None => self.body.take(),
            }
        };
        drop(orphan);
    }
}

struct TrackingPause<'rt> {
    runtime: &'rt Runtime,
}

impl<'rt> TrackingPause<'rt> {
    fn enter(runtime: &'rt Runtime) -> Self {
        let paused = &runtime.inner.paused;
        paused.set(paused.get() + 1);
        Self { runtime }
    }
}

impl Drop for TrackingPause<'_> {
    fn drop(&mut self) {
        let paused = &self.runtime.inner.paused;
        paused.set(paused.get().saturating_sub(1));
    }
}
