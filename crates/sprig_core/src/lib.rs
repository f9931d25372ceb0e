//! Sprig Reactive Core
//!
//! Dependency tracking and effect scheduling for the Sprig UI runtime:
//!
//! - **Tracking**: effects record which `(target, key)` pairs they read
//! - **Triggering**: writes re-run or schedule exactly the effects that read them
//! - **Derived values**: lazily recomputed [`Computed`] caches
//! - **Batching**: [`UpdateQueue`] coalesces scheduled re-runs into one flush
//!
//! Targets are any `Rc<T: Any>`; the runtime never owns them and forgets them
//! once they are dropped.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use sprig_core::{EffectOptions, Runtime, UpdateQueue};
//!
//! let rt = Runtime::new();
//! let queue = UpdateQueue::new();
//! let count = Rc::new(Cell::new(0));
//! let renders = Rc::new(Cell::new(0));
//!
//! {
//!     let count = count.clone();
//!     let renders = renders.clone();
//!     rt.effect(
//!         move |rt| {
//!             rt.track(&count, "value");
//!             renders.set(renders.get() + 1);
//!         },
//!         EffectOptions::new().with_shared_scheduler(queue.scheduler()),
//!     );
//! }
//!
//! for n in 1..=3 {
//!     count.set(n);
//!     rt.trigger(&count, "value", &n);
//! }
//!
//! // Three writes, one queued update
//! queue.flush(&rt).unwrap();
//! assert_eq!(renders.get(), 2);
//! ```

pub mod computed;
pub mod config;
pub mod context;
pub mod effect;
pub mod error;
pub mod queue;
pub mod registry;
pub mod runtime;

pub use computed::Computed;
pub use config::ReactiveConfig;
pub use effect::{EffectId, EffectOptions, Scheduler};
pub use error::{ReactiveError, Result};
pub use queue::UpdateQueue;
pub use registry::{DepId, DependencyRegistry, PropKey, Subscribers, TargetId};
pub use runtime::{Runtime, WeakRuntime};
