//! Ambient runtime
//!
//! Most code passes a [`Runtime`] around explicitly. For call sites that
//! cannot (reactive containers, host callbacks), each thread has a current
//! runtime, created on first use or installed with [`set_current`].
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use sprig_core::{context, EffectOptions};
//!
//! let count = Rc::new(Cell::new(0));
//! let seen = Rc::new(Cell::new(-1));
//!
//! {
//!     let count = count.clone();
//!     let seen = seen.clone();
//!     context::effect(
//!         move |rt| {
//!             rt.track(&count, "value");
//!             seen.set(count.get());
//!         },
//!         EffectOptions::new(),
//!     );
//! }
//!
//! count.set(7);
//! context::trigger(&count, "value", &7);
//! assert_eq!(seen.get(), 7);
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::effect::{EffectId, EffectOptions};
use crate::registry::PropKey;
use crate::runtime::Runtime;

thread_local! {
    static CURRENT: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

/// The current thread's runtime, creating a default one if none is set
pub fn current() -> Runtime {
    CURRENT.with(|current| {
        current
            .borrow_mut()
            .get_or_insert_with(|| {
                tracing::debug!("context::current - creating thread runtime");
                Runtime::new()
            })
            .clone()
    })
}

/// Install `runtime` as the current thread's runtime, returning the previous one
pub fn set_current(runtime: Runtime) -> Option<Runtime> {
    CURRENT.with(|current| current.borrow_mut().replace(runtime))
}

/// Remove the current thread's runtime
pub fn take_current() -> Option<Runtime> {
    CURRENT.with(|current| current.borrow_mut().take())
}

/// [`Runtime::effect`] on the current runtime
pub fn effect<F>(body: F, options: EffectOptions) -> EffectId
where
    F: FnMut(&Runtime) + 'static,
{
    current().effect(body, options)
}

/// [`Runtime::track`] on the current runtime
pub fn track<T: Any>(target: &Rc<T>, key: impl Into<PropKey>) {
    current().track(target, key);
}

/// [`Runtime::trigger`] on the current runtime
pub fn trigger<T: Any, V: fmt::Debug + ?Sized>(target: &Rc<T>, key: impl Into<PropKey>, new_value: &V) {
    current().trigger(target, key, new_value);
}

/// [`Runtime::stop`] on the current runtime
pub fn stop(id: EffectId) -> bool {
    current().stop(id)
}

/// [`Runtime::untracked`] on the current runtime
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    current().untracked(f)
}
