//! Dependency registry
//!
//! Maps `(observed target, property key)` pairs to the ordered set of effects
//! that read them during their most recent run.
//!
//! Targets are identified by the address of the `Rc` that owns them and are
//! held through a `Weak`, so the registry never keeps a target alive. A dead
//! entry still pins the target's allocation (and therefore its address) until
//! [`DependencyRegistry::sweep`] drops it, so identities are never confused.
//! The dependency sets themselves live in a generation-counted [`SlotMap`]: an
//! effect may hold a [`DepId`] whose set has since been swept, and every
//! lookup through such a stale id simply misses.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashMap};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::effect::EffectId;

new_key_type! {
    /// Identifier of one dependency set
    pub struct DepId;
}

/// Snapshot of a dependency set, taken before a trigger wave runs
pub type Subscribers = SmallVec<[EffectId; 8]>;

/// A property key observed on a target
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropKey {
    /// Named property
    Name(Cow<'static, str>),
    /// Positional property (array slot)
    Index(usize),
}

impl PropKey {
    /// Key used by single-value cells such as [`Computed`](crate::Computed)
    pub const VALUE: PropKey = PropKey::Name(Cow::Borrowed("value"));
}

impl From<&'static str> for PropKey {
    fn from(name: &'static str) -> Self {
        PropKey::Name(Cow::Borrowed(name))
    }
}

impl From<String> for PropKey {
    fn from(name: String) -> Self {
        PropKey::Name(Cow::Owned(name))
    }
}

impl From<usize> for PropKey {
    fn from(index: usize) -> Self {
        PropKey::Index(index)
    }
}

impl fmt::Display for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropKey::Name(name) => f.write_str(name),
            PropKey::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// Identity of an observed target (the address of its `Rc` allocation)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetId(usize);

impl TargetId {
    /// Identity of the value owned by `target`
    pub fn of<T: ?Sized>(target: &Rc<T>) -> Self {
        Self(Rc::as_ptr(target) as *const () as usize)
    }
}

struct TargetEntry {
    target: Weak<dyn Any>,
    keys: FxHashMap<PropKey, DepId>,
}

impl TargetEntry {
    fn is_dead(&self) -> bool {
        self.target.strong_count() == 0
    }
}

struct Dep {
    target: TargetId,
    key: PropKey,
    subscribers: IndexSet<EffectId, FxBuildHasher>,
}

/// Target → key → dependency set
pub struct DependencyRegistry {
    targets: FxHashMap<TargetId, TargetEntry>,
    deps: SlotMap<DepId, Dep>,
    /// Targets registered since the last sweep
    registrations: usize,
}

impl Default for DependencyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self {
            targets: FxHashMap::default(),
            deps: SlotMap::with_key(),
            registrations: 0,
        }
    }

    /// Get or create the dependency set for `(target, key)`
    pub(crate) fn dep_for<T: Any>(&mut self, target: &Rc<T>, key: &PropKey) -> DepId {
        let id = TargetId::of(target);

        let registrations = &mut self.registrations;
        let entry = self.targets.entry(id).or_insert_with(|| {
            *registrations += 1;
            TargetEntry {
                target: Rc::downgrade(target) as Weak<dyn Any>,
                keys: FxHashMap::default(),
            }
        });

        if let Some(&dep) = entry.keys.get(key) {
            return dep;
        }

        let dep = self.deps.insert(Dep {
            target: id,
            key: key.clone(),
            subscribers: IndexSet::default(),
        });
        entry.keys.insert(key.clone(), dep);
        dep
    }

    /// Find the live dependency set for `(target, key)`
    pub fn lookup(&self, target: TargetId, key: &PropKey) -> Option<DepId> {
        let entry = self.targets.get(&target)?;
        if entry.is_dead() {
            return None;
        }
        entry.keys.get(key).copied()
    }

    /// Add `effect` to a set. Returns false if it was already a member.
    pub(crate) fn subscribe(&mut self, dep: DepId, effect: EffectId) -> bool {
        match self.deps.get_mut(dep) {
            Some(dep) => dep.subscribers.insert(effect),
            None => false,
        }
    }

    /// Remove `effect` from a set, dropping the set once nobody reads it
    pub(crate) fn unsubscribe(&mut self, dep_id: DepId, effect: EffectId) {
        let Some(dep) = self.deps.get_mut(dep_id) else {
            return;
        };
        dep.subscribers.shift_remove(&effect);
        if !dep.subscribers.is_empty() {
            return;
        }

        if let Some(dep) = self.deps.remove(dep_id) {
            let now_empty = match self.targets.get_mut(&dep.target) {
                Some(entry) => {
                    entry.keys.remove(&dep.key);
                    entry.keys.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.targets.remove(&dep.target);
            }
        }
    }

    /// Snapshot of the subscribers of `(target, key)`, in insertion order
    pub fn subscribers(&self, target: TargetId, key: &PropKey) -> Subscribers {
        self.lookup(target, key)
            .and_then(|dep| self.deps.get(dep))
            .map(|dep| dep.subscribers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop every entry whose target has been deallocated.
    ///
    /// Returns the number of targets removed.
    pub fn sweep(&mut self) -> usize {
        let dead: SmallVec<[TargetId; 8]> = self
            .targets
            .iter()
            .filter(|(_, entry)| entry.is_dead())
            .map(|(&id, _)| id)
            .collect();

        for &id in &dead {
            self.remove_target(id);
        }
        self.registrations = 0;

        if !dead.is_empty() {
            tracing::trace!("DependencyRegistry::sweep - pruned {} targets", dead.len());
        }
        dead.len()
    }

    /// Number of targets registered since the last sweep
    pub(crate) fn registrations(&self) -> usize {
        self.registrations
    }

    /// Number of targets with at least one dependency set
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Number of live dependency sets
    pub fn dep_count(&self) -> usize {
        self.deps.len()
    }

    fn remove_target(&mut self, id: TargetId) {
        if let Some(entry) = self.targets.remove(&id) {
            for dep in entry.keys.into_values() {
                self.deps.remove(dep);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect_ids(n: usize) -> Vec<EffectId> {
        let mut effects: SlotMap<EffectId, ()> = SlotMap::with_key();
        (0..n).map(|_| effects.insert(())).collect()
    }

    #[test]
    fn test_dep_for_is_stable() {
        let mut registry = DependencyRegistry::new();
        let target = Rc::new(5u32);

        let a = registry.dep_for(&target, &PropKey::from("count"));
        let b = registry.dep_for(&target, &PropKey::from("count"));
        let c = registry.dep_for(&target, &PropKey::from(0usize));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(registry.target_count(), 1);
        assert_eq!(registry.dep_count(), 2);
    }

    #[test]
    fn test_subscribe_is_idempotent_and_ordered() {
        let mut registry = DependencyRegistry::new();
        let target = Rc::new(());
        let key = PropKey::from("x");
        let dep = registry.dep_for(&target, &key);
        let ids = effect_ids(2);

        assert!(registry.subscribe(dep, ids[1]));
        assert!(registry.subscribe(dep, ids[0]));
        assert!(!registry.subscribe(dep, ids[1]));

        let subs = registry.subscribers(TargetId::of(&target), &key);
        assert_eq!(subs.as_slice(), &[ids[1], ids[0]]);
    }

    #[test]
    fn test_unsubscribe_last_removes_entries() {
        let mut registry = DependencyRegistry::new();
        let target = Rc::new(());
        let key = PropKey::from("x");
        let dep = registry.dep_for(&target, &key);
        let ids = effect_ids(1);
        registry.subscribe(dep, ids[0]);

        registry.unsubscribe(dep, ids[0]);

        assert_eq!(registry.dep_count(), 0);
        assert_eq!(registry.target_count(), 0);
        assert!(registry.lookup(TargetId::of(&target), &key).is_none());
    }

    #[test]
    fn test_sweep_prunes_dropped_targets() {
        let mut registry = DependencyRegistry::new();
        let kept = Rc::new(1u8);
        let dropped = Rc::new(2u8);

        registry.dep_for(&kept, &PropKey::from("a"));
        registry.dep_for(&dropped, &PropKey::from("a"));
        registry.dep_for(&dropped, &PropKey::from("b"));
        assert_eq!(registry.registrations(), 2);

        drop(dropped);
        assert_eq!(registry.sweep(), 1);
        assert_eq!(registry.target_count(), 1);
        assert_eq!(registry.dep_count(), 1);
        assert_eq!(registry.registrations(), 0);
    }

    #[test]
    fn test_registry_does_not_keep_target_alive() {
        let mut registry = DependencyRegistry::new();
        let target = Rc::new(String::from("observed"));
        let weak = Rc::downgrade(&target);

        registry.dep_for(&target, &PropKey::from("len"));
        drop(target);

        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_prop_key_display() {
        assert_eq!(PropKey::from("name").to_string(), "name");
        assert_eq!(PropKey::from(3usize).to_string(), "[3]");
        assert_eq!(PropKey::VALUE, PropKey::from("value"));
    }
}
