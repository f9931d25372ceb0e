//! Reactive effects
//!
//! An effect is a re-runnable body plus the bookkeeping the runtime needs to
//! re-run it: an optional scheduler, a derived-value marker that moves it to
//! the front of every trigger wave, and the dependency sets it joined during
//! its last run.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::registry::DepId;
use crate::runtime::Runtime;

new_key_type! {
    /// Unique identifier for an effect
    pub struct EffectId;
}

/// Effect body. Receives the runtime it runs in.
pub type EffectFn = Box<dyn FnMut(&Runtime)>;

/// Custom scheduler invoked instead of running the effect when it is triggered
pub type Scheduler = Rc<dyn Fn(&Runtime, EffectId)>;

/// Options for [`Runtime::effect`]
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Skip the initial run
    pub lazy: bool,
    /// Decides when a triggered effect re-runs
    pub scheduler: Option<Scheduler>,
    /// Derived-value effects run before plain effects in a trigger wave
    pub derived: bool,
    /// Name used in log output
    pub label: Option<Cow<'static, str>>,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not run the effect on creation
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Route triggers through `scheduler`
    pub fn with_scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn(&Runtime, EffectId) + 'static,
    {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    /// Route triggers through an existing shared scheduler
    pub fn with_shared_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Mark the effect as computing a derived value
    pub fn derived(mut self) -> Self {
        self.derived = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("scheduler", &self.scheduler.is_some())
            .field("derived", &self.derived)
            .field("label", &self.label)
            .finish()
    }
}

/// Runtime-owned state of one effect
pub(crate) struct EffectSlot {
    /// `None` while the body is executing
    pub(crate) body: Option<EffectFn>,
    pub(crate) scheduler: Option<Scheduler>,
    pub(crate) derived: bool,
    pub(crate) label: Option<Cow<'static, str>>,
    /// Dependency sets joined during the current/last run
    pub(crate) deps: SmallVec<[DepId; 4]>,
    /// Completed or in-progress runs
    pub(crate) runs: u64,
}

impl EffectSlot {
    pub(crate) fn new(body: EffectFn, options: EffectOptions) -> Self {
        Self {
            body: Some(body),
            scheduler: options.scheduler,
            derived: options.derived,
            label: options.label,
            deps: SmallVec::new(),
            runs: 0,
        }
    }

    pub(crate) fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("anonymous")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = EffectOptions::new()
            .lazy()
            .derived()
            .with_label("doubled")
            .with_scheduler(|_, _| {});

        assert!(options.lazy);
        assert!(options.derived);
        assert!(options.scheduler.is_some());
        assert_eq!(options.label.as_deref(), Some("doubled"));
    }

    #[test]
    fn test_options_debug_hides_scheduler() {
        let dbg = format!("{:?}", EffectOptions::new().with_scheduler(|_, _| {}));
        assert!(dbg.contains("scheduler: true"));
    }

    #[test]
    fn test_slot_label_default() {
        let slot = EffectSlot::new(Box::new(|_| {}), EffectOptions::new());
        assert_eq!(slot.label(), "anonymous");
        assert!(slot.body.is_some());
        assert_eq!(slot.runs, 0);
    }
}
