//! The `all` combinator.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::settleable::Settleable;

/// Shared bookkeeping for one `all` invocation.
struct AllState<T> {
    /// Per-input result slots, index-aligned to the input order.
    results: Vec<Option<T>>,
    /// Inputs still awaiting fulfillment.
    remaining: usize,
    /// Whether the combinator itself already settled. Guards against
    /// overlapping settlements from multiple inputs, on top of the
    /// instance's own once-only rule.
    settled: bool,
}

impl<T, E> Settleable<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Compose an ordered collection of settleables into one.
    ///
    /// The result fulfills with a `Vec` index-aligned to `inputs` once every
    /// input has fulfilled, regardless of the order in which they settle. It
    /// rejects with the error of whichever input rejects first in settlement
    /// order; later settlements of the other inputs are observed but change
    /// nothing. An empty input fulfills immediately with an empty `Vec`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use settleable::Settleable;
    ///
    /// let (a, settle_a) = Settleable::<i32, i32>::pending();
    /// let (b, settle_b) = Settleable::<i32, i32>::pending();
    /// let combined = Settleable::all(vec![a, b]);
    ///
    /// settle_b.resolve(456);
    /// settle_a.resolve(123);
    ///
    /// // Index-aligned, not settlement-ordered.
    /// assert_eq!(combined.value(), Some(vec![123, 456]));
    /// ```
    pub fn all(inputs: Vec<Settleable<T, E>>) -> Settleable<Vec<T>, E> {
        Settleable::new(move |combined| {
            let n = inputs.len();
            if n == 0 {
                combined.resolve(Vec::new());
                return Ok(());
            }

            let state = Arc::new(Mutex::new(AllState {
                results: vec![None; n],
                remaining: n,
                settled: false,
            }));

            for (index, input) in inputs.iter().enumerate() {
                let fulfill_state = Arc::clone(&state);
                let fulfill_settler = combined.clone();
                input.subscribe_fulfill(Box::new(move |value| {
                    let ready = {
                        let mut state = fulfill_state.lock();
                        state.results[index] = Some(value);
                        state.remaining -= 1;
                        if state.remaining == 0 && !state.settled {
                            state.settled = true;
                            state
                                .results
                                .iter_mut()
                                .map(Option::take)
                                .collect::<Option<Vec<_>>>()
                        } else {
                            None
                        }
                    };
                    if let Some(values) = ready {
                        trace!(inputs = values.len(), "all combinator fulfilled");
                        fulfill_settler.resolve(values);
                    }
                }));

                let reject_state = Arc::clone(&state);
                let reject_settler = combined.clone();
                input.subscribe_reject(Box::new(move |error| {
                    let first = {
                        let mut state = reject_state.lock();
                        if state.settled {
                            false
                        } else {
                            state.settled = true;
                            true
                        }
                    };
                    if first {
                        trace!("all combinator rejected");
                        reject_settler.reject(error);
                    }
                }));
            }
            Ok(())
        })
    }
}
