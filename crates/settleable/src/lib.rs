//! # Settleable - synchronous, eagerly-settling futures for deterministic tests
//!
//! A drop-in substitute for promise-style asynchronous values that settles
//! immediately and invokes its observers within the same execution turn.
//! Code written against a promise-shaped API can be tested without timers,
//! task queues, or an async runtime: every settlement, and every observer it
//! triggers, happens on the call stack of the `resolve`/`reject` call that
//! wins.
//!
//! ## Core Types
//!
//! - [`Settleable<T, E>`]: the value container; settles at most once to
//!   fulfilled or rejected, then stays frozen.
//! - [`Settler<T, E>`]: the resolve/reject capability, handed to the
//!   initializer or returned by [`Settleable::pending`].
//! - [`Thenable<T, E>`]: the capability trait behind `resolve`'s
//!   thenable-flattening.
//! - [`SettleState`]: discriminant-only lifecycle view for assertions.
//!
//! ## Design Principles
//!
//! 1. **Nothing is deferred**: there is no scheduler, no microtask queue,
//!    and no ordering distinct from ordinary call-stack ordering. Observers
//!    fire in registration order, synchronously.
//!
//! 2. **Settlement is once-only**: for any sequence of `resolve`/`reject`
//!    calls, only the first has an observable effect.
//!
//! 3. **Pending chaining mutates in place**: `then`/`catch` on a pending
//!    instance register against its own observer lists and return the same
//!    instance, deliberately deviating from standard promise chaining for
//!    behavioral compatibility with the system this replaces.
//!
//! ## Usage
//!
//! ```rust
//! use settleable::Settleable;
//!
//! let (request, settle) = Settleable::<u32, String>::pending();
//! let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
//!
//! let sink = seen.clone();
//! request.then(move |status| {
//!     sink.lock().push(status);
//!     status
//! });
//!
//! settle.resolve(200);
//! assert_eq!(*seen.lock(), vec![200]);
//! ```

#![forbid(unsafe_code)]

mod combinator;
mod settleable;
mod state;
mod thenable;

pub use settleable::{Settleable, Settler};
pub use state::SettleState;
pub use thenable::Thenable;
