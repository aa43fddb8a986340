//! Thenable - the capability behind `resolve`'s flattening
//!
//! The original duck-typed check ("does this value expose a callable `then`")
//! becomes a capability trait here: anything implementing [`Thenable<T, E>`]
//! can be handed to [`Settleable::resolve`], including instances of other
//! future-like types that opt in.

use crate::settleable::Settleable;

/// A value that `resolve` knows how to turn into a [`Settleable`].
///
/// Two implementations ship with the crate:
/// - every plain value wraps into an immediately-fulfilled instance;
/// - a `Settleable` is routed through its own `then` with the identity
///   callback, which re-enters `resolve` on the result — one nesting layer
///   flattened per recursive call.
pub trait Thenable<T, E> {
    /// Resolve `self` into a settleable.
    fn into_settleable(self) -> Settleable<T, E>;
}

impl<T, E> Thenable<T, E> for T
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn into_settleable(self) -> Settleable<T, E> {
        Settleable::from_value(self)
    }
}

impl<T, E> Thenable<T, E> for Settleable<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn into_settleable(self) -> Settleable<T, E> {
        self.then(|value| value)
    }
}

impl<T, E> Settleable<Settleable<T, E>, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Resolve one level of nesting.
    ///
    /// In the untyped original this case falls out of calling `then` on a
    /// thenable that is still pending; with the nesting encoded in the type,
    /// it is an explicit operation. The returned instance fulfills with the
    /// inner value once the outer and then the inner instance fulfill, and
    /// rejects as soon as either layer rejects.
    pub fn flatten(&self) -> Settleable<T, E> {
        let (flat, settler) = Settleable::pending();
        let on_outer_reject = settler.clone();
        self.subscribe_fulfill(Box::new(move |inner: Settleable<T, E>| {
            let on_inner_fulfill = settler.clone();
            inner.subscribe_fulfill(Box::new(move |value| on_inner_fulfill.resolve(value)));
            inner.subscribe_reject(Box::new(move |error| settler.reject(error)));
        }));
        self.subscribe_reject(Box::new(move |error| on_outer_reject.reject(error)));
        flat
    }
}
