//! Settleable<T, E> - the eagerly-settling futures value
//!
//! `Settleable<T, E>` is a promise-shaped container that settles at most once
//! and runs its observers synchronously, on the call stack of whichever
//! `resolve`/`reject` call wins. "Pending" is a logical state only: it means
//! an initializer chose not to settle before returning, and some later
//! synchronous call will. Nothing is ever deferred to a scheduler.
//!
//! # Runtime Agnostic Design
//!
//! The shared state sits behind `Arc<parking_lot::Mutex<_>>` so handles can
//! be cloned across call sites (and threads, though the intended model is
//! single-threaded test code). The mutex is never held across an observer
//! invocation, so observers may freely re-enter the same instance.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::state::SettleState;
use crate::thenable::Thenable;

/// A queued settlement callback. Invoked at most once, with a clone of the
/// settlement payload.
pub(crate) type Observer<V> = Box<dyn FnOnce(V) + Send>;

/// Tagged settlement state. The payload lives directly in the tag.
enum State<T, E> {
    Unsettled,
    Fulfilled(T),
    Rejected(E),
}

struct Inner<T, E> {
    state: State<T, E>,
    /// Whether a fulfillment value has ever been stored. Tracked separately
    /// from `state` because the initializer error rule depends on it: an
    /// error after a recorded fulfillment is swallowed, not turned into a
    /// rejection.
    fulfillment_recorded: bool,
    /// Callbacks awaiting fulfillment, in registration order.
    fulfill_observers: Vec<Observer<T>>,
    /// Callbacks awaiting rejection, in registration order.
    reject_observers: Vec<Observer<E>>,
}

/// A promise-shaped value that settles at most once, synchronously.
///
/// `Settleable<T, E>` provides:
/// - `new()`: construct with an initializer that receives a [`Settler`]
/// - `pending()`: construct unsettled, with the [`Settler`] handed back
/// - `then()` / `catch()` / `then_catch()`: observer registration and
///   post-settlement chaining
/// - `resolve()` / `reject()`: immediately-settled factories
/// - `all()`: the index-aligned combinator (see the combinator module)
///
/// # Chaining semantics
///
/// Chaining off a *pending* instance registers against that instance's own
/// observer lists and returns the same instance (handle identity holds under
/// [`Settleable::ptr_eq`]). This deviates from standard promise chaining,
/// which would return a new derived node, and is part of the observable
/// contract of this primitive.
///
/// # Example
///
/// ```rust
/// use settleable::Settleable;
///
/// let seen = std::sync::Arc::new(parking_lot::Mutex::new(None));
/// let sink = seen.clone();
///
/// Settleable::<i32, i32>::resolve(123).then(move |v| {
///     *sink.lock() = Some(v);
///     v
/// });
///
/// // Settlement already happened; the observer ran on this stack.
/// assert_eq!(*seen.lock(), Some(123));
/// ```
pub struct Settleable<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
}

impl<T, E> Clone for Settleable<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// The resolve/reject capability for one [`Settleable`] instance.
///
/// Handed to the initializer by [`Settleable::new`], and returned alongside
/// the instance by [`Settleable::pending`]. Cloneable; every clone settles
/// the same instance, and only the first `resolve`/`reject` call across all
/// clones has any effect.
pub struct Settler<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
}

impl<T, E> Clone for Settler<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> Settleable<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Construct a settleable, running `initializer` synchronously before
    /// returning.
    ///
    /// The initializer may settle the instance zero or more times (only the
    /// first call counts) and may fail by returning `Err`. A failure after a
    /// recorded fulfillment is swallowed: initializers that resolve and then
    /// fail must not flip a successful settlement into a rejection. A
    /// failure with no fulfillment recorded is recorded as the rejection
    /// error; if the initializer already rejected, the failure replaces the
    /// stored error without re-running observers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use settleable::Settleable;
    ///
    /// let s = Settleable::<i32, i32>::new(|settler| {
    ///     settler.resolve(1);
    ///     settler.resolve(2); // no-op, first resolve wins
    ///     Ok(())
    /// });
    /// assert_eq!(s.value(), Some(1));
    /// ```
    pub fn new<F>(initializer: F) -> Self
    where
        F: FnOnce(&Settler<T, E>) -> Result<(), E>,
    {
        let (settleable, settler) = Self::pending();
        if let Err(error) = initializer(&settler) {
            settler.record_failure(error);
        }
        settleable
    }

    /// Construct an unsettled instance together with its [`Settler`], for
    /// call sites that settle from outside the initializer (typically tests
    /// driving settlement order by hand).
    pub fn pending() -> (Self, Settler<T, E>) {
        let inner = Arc::new(Mutex::new(Inner {
            state: State::Unsettled,
            fulfillment_recorded: false,
            fulfill_observers: Vec::new(),
            reject_observers: Vec::new(),
        }));
        let settler = Settler {
            inner: Arc::clone(&inner),
        };
        (Self { inner }, settler)
    }

    /// Resolve a value or thenable into a settleable.
    ///
    /// Plain values produce an immediately-fulfilled instance. A settleable
    /// is routed through its own `then` with the identity callback, so
    /// nested instances flatten one layer per recursive call. See
    /// [`Thenable`].
    pub fn resolve<V>(value: V) -> Self
    where
        V: Thenable<T, E>,
    {
        value.into_settleable()
    }

    /// Construct an immediately-rejected instance.
    pub fn reject(error: E) -> Self {
        Self::new(|settler| {
            settler.reject(error);
            Ok(())
        })
    }

    /// Immediately-fulfilled constructor, used by the plain-value
    /// [`Thenable`] impl.
    pub(crate) fn from_value(value: T) -> Self {
        Self::new(|settler| {
            settler.resolve(value);
            Ok(())
        })
    }

    /// Register a fulfillment observer, or chain off a settled instance.
    ///
    /// - Unsettled: queues `on_fulfilled` (its return value is discarded
    ///   when it eventually fires) and returns the same instance.
    /// - Fulfilled: invokes `on_fulfilled` with a clone of the value, on
    ///   this call stack, and returns [`Settleable::resolve`] of the result.
    /// - Rejected: returns the instance unchanged.
    pub fn then<F, R>(&self, on_fulfilled: F) -> Self
    where
        F: FnOnce(T) -> R + Send + 'static,
        R: Thenable<T, E>,
    {
        let mut inner = self.inner.lock();
        if let State::Fulfilled(value) = &inner.state {
            let value = value.clone();
            drop(inner);
            return Self::resolve(on_fulfilled(value));
        }
        if matches!(inner.state, State::Unsettled) {
            inner.fulfill_observers.push(Box::new(move |value| {
                let _ = on_fulfilled(value);
            }));
        }
        drop(inner);
        self.clone()
    }

    /// Register a rejection observer, or recover from a settled rejection.
    ///
    /// - Unsettled: queues `on_rejected` and returns the same instance.
    /// - Rejected: invokes `on_rejected` with a clone of the error, on this
    ///   call stack, and returns [`Settleable::resolve`] of the result.
    /// - Fulfilled: returns the instance unchanged.
    pub fn catch<G, S>(&self, on_rejected: G) -> Self
    where
        G: FnOnce(E) -> S + Send + 'static,
        S: Thenable<T, E>,
    {
        let mut inner = self.inner.lock();
        if let State::Rejected(error) = &inner.state {
            let error = error.clone();
            drop(inner);
            return Self::resolve(on_rejected(error));
        }
        if matches!(inner.state, State::Unsettled) {
            inner.reject_observers.push(Box::new(move |error| {
                let _ = on_rejected(error);
            }));
        }
        drop(inner);
        self.clone()
    }

    /// The two-callback form of [`then`](Self::then).
    ///
    /// While unsettled, registers both callbacks against this instance's
    /// observer lists and returns the same instance. Once settled, behaves
    /// as `then(on_fulfilled)` when fulfilled and `catch(on_rejected)` when
    /// rejected.
    pub fn then_catch<F, G, R, S>(&self, on_fulfilled: F, on_rejected: G) -> Self
    where
        F: FnOnce(T) -> R + Send + 'static,
        R: Thenable<T, E>,
        G: FnOnce(E) -> S + Send + 'static,
        S: Thenable<T, E>,
    {
        let mut inner = self.inner.lock();
        if let State::Fulfilled(value) = &inner.state {
            let value = value.clone();
            drop(inner);
            return Self::resolve(on_fulfilled(value));
        }
        if let State::Rejected(error) = &inner.state {
            let error = error.clone();
            drop(inner);
            return Self::resolve(on_rejected(error));
        }
        inner.fulfill_observers.push(Box::new(move |value| {
            let _ = on_fulfilled(value);
        }));
        inner.reject_observers.push(Box::new(move |error| {
            let _ = on_rejected(error);
        }));
        drop(inner);
        self.clone()
    }

    /// Register a bare fulfillment observer: queued while unsettled, run
    /// inline if already fulfilled, dropped if rejected. `then`, `all`, and
    /// `flatten` are built on this.
    pub(crate) fn subscribe_fulfill(&self, observer: Observer<T>) {
        let mut inner = self.inner.lock();
        if let State::Fulfilled(value) = &inner.state {
            let value = value.clone();
            drop(inner);
            observer(value);
            return;
        }
        if matches!(inner.state, State::Unsettled) {
            inner.fulfill_observers.push(observer);
        }
    }

    /// Rejection counterpart of [`subscribe_fulfill`](Self::subscribe_fulfill).
    pub(crate) fn subscribe_reject(&self, observer: Observer<E>) {
        let mut inner = self.inner.lock();
        if let State::Rejected(error) = &inner.state {
            let error = error.clone();
            drop(inner);
            observer(error);
            return;
        }
        if matches!(inner.state, State::Unsettled) {
            inner.reject_observers.push(observer);
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SettleState {
        match self.inner.lock().state {
            State::Unsettled => SettleState::Unsettled,
            State::Fulfilled(_) => SettleState::Fulfilled,
            State::Rejected(_) => SettleState::Rejected,
        }
    }

    /// Whether settlement has occurred, in either direction.
    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }

    /// The fulfillment value, if fulfilled.
    pub fn value(&self) -> Option<T> {
        match &self.inner.lock().state {
            State::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// The rejection error, if rejected.
    pub fn error(&self) -> Option<E> {
        match &self.inner.lock().state {
            State::Rejected(error) => Some(error.clone()),
            _ => None,
        }
    }

    /// The settlement as a `Result`, or `None` while unsettled.
    pub fn to_result(&self) -> Option<Result<T, E>> {
        match &self.inner.lock().state {
            State::Unsettled => None,
            State::Fulfilled(value) => Some(Ok(value.clone())),
            State::Rejected(error) => Some(Err(error.clone())),
        }
    }

    /// Whether two handles refer to the same underlying instance.
    ///
    /// Chaining off a pending instance returns the same instance; this is
    /// how that identity is observed.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl<T, E> From<Result<T, E>> for Settleable<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::from_value(value),
            Err(error) => Self::reject(error),
        }
    }
}

impl<T, E> std::fmt::Debug for Settleable<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settleable")
            .field("state", &self.state())
            .finish()
    }
}

impl<T, E> Settler<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Fulfill the instance. No-op if settlement already occurred.
    ///
    /// Every queued fulfillment observer is invoked synchronously, in
    /// registration order, with a clone of `value`, after the state lock is
    /// released. Observers registered during this pass (e.g. by a `then`
    /// call inside an observer) are not part of it; they register against
    /// the now-settled instance and fire immediately.
    pub fn resolve(&self, value: T) {
        // Drain both lists while locked; the losers are dropped, and every
        // observer runs, after the lock is released.
        let (observers, losers) = {
            let mut inner = self.inner.lock();
            if !matches!(inner.state, State::Unsettled) {
                return;
            }
            inner.state = State::Fulfilled(value.clone());
            inner.fulfillment_recorded = true;
            (
                std::mem::take(&mut inner.fulfill_observers),
                std::mem::take(&mut inner.reject_observers),
            )
        };
        drop(losers);
        trace!(observers = observers.len(), "settleable fulfilled");
        for observer in observers {
            observer(value.clone());
        }
    }

    /// Reject the instance. No-op if settlement already occurred.
    ///
    /// Symmetric to [`resolve`](Self::resolve), draining the rejection
    /// observers instead.
    pub fn reject(&self, error: E) {
        let (observers, losers) = {
            let mut inner = self.inner.lock();
            if !matches!(inner.state, State::Unsettled) {
                return;
            }
            inner.state = State::Rejected(error.clone());
            (
                std::mem::take(&mut inner.reject_observers),
                std::mem::take(&mut inner.fulfill_observers),
            )
        };
        drop(losers);
        trace!(observers = observers.len(), "settleable rejected");
        for observer in observers {
            observer(error.clone());
        }
    }

    /// Record an initializer failure.
    ///
    /// Swallowed entirely once a fulfillment has been recorded. Over an
    /// existing rejection the failure replaces the stored error; observers
    /// already fired at the original rejection and do not run again. While
    /// unsettled this is an ordinary rejection.
    fn record_failure(&self, error: E) {
        {
            let mut inner = self.inner.lock();
            if inner.fulfillment_recorded {
                return;
            }
            if let State::Rejected(stored) = &mut inner.state {
                *stored = error;
                return;
            }
        }
        self.reject(error);
    }
}
