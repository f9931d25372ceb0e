//! Update batching
//!
//! [`UpdateQueue`] coalesces the re-runs of scheduled effects (typically
//! component re-renders) so that a burst of writes produces one update per
//! effect. Effects opt in by using [`UpdateQueue::scheduler`] as their
//! scheduler; the embedding event loop calls [`UpdateQueue::flush`] once per
//! burst, for example when [`UpdateQueue::needs_flush`] reports pending work.
//!
//! # Invariants
//!
//! 1. An update is pending at most once (identity deduplication).
//! 2. A flush runs updates in FIFO enqueue order.
//! 3. Updates enqueued while a flush is draining run in the same flush.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::ReactiveConfig;
use crate::effect::{EffectId, Scheduler};
use crate::error::{ReactiveError, Result};
use crate::runtime::Runtime;

struct QueueInner {
    pending: RefCell<VecDeque<EffectId>>,
    queued: RefCell<FxHashSet<EffectId>>,
    flushing: Cell<bool>,
    max_recursive_updates: u32,
}

/// FIFO queue of pending effect re-runs
#[derive(Clone)]
pub struct UpdateQueue {
    inner: Rc<QueueInner>,
}

impl Default for UpdateQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateQueue {
    pub fn new() -> Self {
        Self::with_config(&ReactiveConfig::default())
    }

    pub fn with_config(config: &ReactiveConfig) -> Self {
        Self {
            inner: Rc::new(QueueInner {
                pending: RefCell::new(VecDeque::new()),
                queued: RefCell::new(FxHashSet::default()),
                flushing: Cell::new(false),
                max_recursive_updates: config.max_recursive_updates,
            }),
        }
    }

    /// Queue an update. Returns false if it was already pending.
    pub fn enqueue(&self, id: EffectId) -> bool {
        if !self.inner.queued.borrow_mut().insert(id) {
            tracing::trace!("UpdateQueue::enqueue - {:?} already pending", id);
            return false;
        }
        self.inner.pending.borrow_mut().push_back(id);
        true
    }

    /// Drop a pending update. Returns true if it was pending.
    pub fn invalidate(&self, id: EffectId) -> bool {
        if !self.inner.queued.borrow_mut().remove(&id) {
            return false;
        }
        self.inner.pending.borrow_mut().retain(|pending| *pending != id);
        true
    }

    pub fn contains(&self, id: EffectId) -> bool {
        self.inner.queued.borrow().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.pending.borrow().is_empty()
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.get()
    }

    /// Whether updates are waiting for a flush that has not started yet
    pub fn needs_flush(&self) -> bool {
        !self.is_flushing() && !self.is_empty()
    }

    /// A scheduler that enqueues the triggered effect on this queue
    pub fn scheduler(&self) -> Scheduler {
        let queue = Rc::downgrade(&self.inner);
        Rc::new(move |_: &Runtime, id: EffectId| {
            if let Some(inner) = queue.upgrade() {
                UpdateQueue { inner }.enqueue(id);
            }
        })
    }

    /// Run every pending update, including ones queued while draining.
    ///
    /// Returns the number of updates run. A nested call made from inside an
    /// update returns `Ok(0)`; the outer flush picks up the work.
    pub fn flush(&self, runtime: &Runtime) -> Result<usize> {
        if self.inner.flushing.get() {
            return Ok(0);
        }
        let _flushing = FlushScope::enter(&self.inner);

        let limit = self.inner.max_recursive_updates;
        let mut counts: FxHashMap<EffectId, u32> = FxHashMap::default();
        let mut ran = 0;

        while let Some(id) = self.pop() {
            let count = counts.entry(id).or_insert(0);
            *count += 1;
            if *count > limit {
                tracing::warn!(
                    "UpdateQueue::flush - {:?} queued {} times in one flush, aborting",
                    id,
                    count
                );
                self.clear();
                return Err(ReactiveError::RecursiveUpdateLimit { effect: id, limit });
            }

            match runtime.run(id) {
                Ok(()) => ran += 1,
                Err(err @ (ReactiveError::UnknownEffect(_) | ReactiveError::Reentrant(_))) => {
                    tracing::trace!("UpdateQueue::flush - skipped: {}", err);
                }
                Err(err) => {
                    self.clear();
                    return Err(err);
                }
            }
        }

        if ran > 0 {
            tracing::debug!("UpdateQueue::flush - ran {} updates", ran);
        }
        Ok(ran)
    }

    /// Drop every pending update
    pub fn clear(&self) {
        self.inner.pending.borrow_mut().clear();
        self.inner.queued.borrow_mut().clear();
    }

    fn pop(&self) -> Option<EffectId> {
        let id = self.inner.pending.borrow_mut().pop_front()?;
        self.inner.queued.borrow_mut().remove(&id);
        Some(id)
    }
}

struct FlushScope<'q> {
    inner: &'q QueueInner,
}

impl<'q> FlushScope<'q> {
    fn enter(inner: &'q QueueInner) -> Self {
        inner.flushing.set(true);
        Self { inner }
    }
}

impl Drop for FlushScope<'_> {
    fn drop(&mut self) {
        self.inner.flushing.set(false);
    }
}
