//! End-to-end settlement semantics.
//!
//! These tests drive the public surface the way calling code does: attach
//! observers through `then`/`catch`, settle, and assert on what the
//! observers recorded. Everything here completes synchronously; no test
//! waits for anything.

#![allow(missing_docs)]

use std::sync::Arc;

use parking_lot::Mutex;
use settleable::{SettleState, Settleable};

type P = Settleable<i32, i32>;

/// Records every fulfillment and rejection delivered to one instance.
#[derive(Default)]
struct Outcome {
    resolves: Mutex<Vec<i32>>,
    rejections: Mutex<Vec<i32>>,
}

impl Outcome {
    fn snapshot(&self) -> (Vec<i32>, Vec<i32>) {
        (self.resolves.lock().clone(), self.rejections.lock().clone())
    }
}

/// Attach recording observers through the chaining surface, mirroring how a
/// caller would tap both settlement directions.
fn observe(settleable: &P) -> Arc<Outcome> {
    let outcome = Arc::new(Outcome::default());
    let on_fulfill = Arc::clone(&outcome);
    let on_reject = Arc::clone(&outcome);
    settleable
        .then(move |value| {
            on_fulfill.resolves.lock().push(value);
            value
        })
        .catch(move |error| {
            on_reject.rejections.lock().push(error);
            error
        });
    outcome
}

fn observe_all(combined: &Settleable<Vec<i32>, i32>) -> Arc<Mutex<Vec<Result<Vec<i32>, i32>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let on_fulfill = Arc::clone(&seen);
    let on_reject = Arc::clone(&seen);
    combined
        .then(move |values| {
            on_fulfill.lock().push(Ok(values.clone()));
            values
        })
        .catch(move |error| {
            on_reject.lock().push(Err(error));
            // Recovery value required by the chaining surface; discarded.
            Vec::new()
        });
    seen
}

#[test]
fn settles_synchronously_so_callers_observe_results_inline() {
    // The reason this crate exists: no "eventually", no awaiting. The
    // observer has already run by the next statement.
    let result = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&result);
    P::resolve(123).then(move |resolved| {
        *sink.lock() = Some(resolved);
        resolved
    });
    assert_eq!(*result.lock(), Some(123));
}

#[test]
fn resolve_invokes_then_observer() {
    let outcome = observe(&P::resolve(42));
    assert_eq!(outcome.snapshot(), (vec![42], vec![]));
}

#[test]
fn reject_invokes_catch_observer() {
    let outcome = observe(&P::reject(42));
    assert_eq!(outcome.snapshot(), (vec![], vec![42]));
}

#[test]
fn initializer_resolving_immediately_reaches_observers() {
    let outcome = observe(&P::new(|settler| {
        settler.resolve(123);
        Ok(())
    }));
    assert_eq!(outcome.snapshot(), (vec![123], vec![]));
}

#[test]
fn initializer_resolving_repeatedly_delivers_only_the_first() {
    let outcome = observe(&P::new(|settler| {
        settler.resolve(1);
        settler.resolve(2);
        settler.resolve(3);
        Ok(())
    }));
    assert_eq!(outcome.snapshot(), (vec![1], vec![]));
}

#[test]
fn initializer_rejecting_reaches_catch_observers() {
    let outcome = observe(&P::new(|settler| {
        settler.reject(666);
        Ok(())
    }));
    assert_eq!(outcome.snapshot(), (vec![], vec![666]));
}

#[test]
fn initializer_rejecting_repeatedly_delivers_only_the_first() {
    let outcome = observe(&P::new(|settler| {
        settler.reject(1);
        settler.reject(2);
        settler.reject(3);
        Ok(())
    }));
    assert_eq!(outcome.snapshot(), (vec![], vec![1]));
}

#[test]
fn initializer_failure_becomes_the_rejection() {
    let outcome = observe(&P::new(|_| Err(666)));
    assert_eq!(outcome.snapshot(), (vec![], vec![666]));
}

#[test]
fn initializer_resolve_then_reject_keeps_the_fulfillment() {
    let outcome = observe(&P::new(|settler| {
        settler.resolve(123);
        settler.reject(666);
        Ok(())
    }));
    assert_eq!(outcome.snapshot(), (vec![123], vec![]));
}

#[test]
fn initializer_resolve_then_failure_keeps_the_fulfillment() {
    let outcome = observe(&P::new(|settler| {
        settler.resolve(123);
        Err(666)
    }));
    assert_eq!(outcome.snapshot(), (vec![123], vec![]));
}

#[test]
fn initializer_failure_after_reject_records_the_failure() {
    let s = P::new(|settler| {
        settler.reject(1);
        Err(2)
    });
    // The settlement direction is unchanged; only the stored error moved.
    assert_eq!(s.state(), SettleState::Rejected);
    assert_eq!(s.error(), Some(2));

    // Observers attached afterwards see the recorded failure.
    let outcome = observe(&s);
    assert_eq!(outcome.snapshot(), (vec![], vec![2]));
}

#[test]
fn then_on_fulfilled_chains_the_mapped_value() {
    let chained = P::new(|settler| {
        settler.resolve(1);
        Ok(())
    })
    .then(|_| 123);
    let outcome = observe(&chained);
    assert_eq!(outcome.snapshot(), (vec![123], vec![]));
}

#[test]
fn then_on_rejected_skips_the_mapping() {
    let chained = P::new(|settler| {
        settler.reject(666);
        Ok(())
    })
    .then(|_| 123);
    let outcome = observe(&chained);
    assert_eq!(outcome.snapshot(), (vec![], vec![666]));
}

#[test]
fn observers_attached_before_settlement_fire_at_settlement() {
    let (s, settler) = P::pending();
    let outcome = observe(&s);
    assert_eq!(outcome.snapshot(), (vec![], vec![]));

    settler.resolve(5);
    assert_eq!(outcome.snapshot(), (vec![5], vec![]));

    // Settlement is frozen; a late reject changes nothing.
    settler.reject(9);
    assert_eq!(outcome.snapshot(), (vec![5], vec![]));
}

#[test]
fn every_pre_settlement_observer_fires_in_registration_order() {
    let (s, settler) = P::pending();
    let first = observe(&s);
    let second = observe(&s);

    settler.reject(666);
    assert_eq!(first.snapshot(), (vec![], vec![666]));
    assert_eq!(second.snapshot(), (vec![], vec![666]));
}

#[test]
fn all_resolves_with_one_result_after_a_single_input_resolves() {
    let (input, settler) = P::pending();
    let seen = observe_all(&P::all(vec![input]));

    settler.resolve(42);
    assert_eq!(*seen.lock(), vec![Ok(vec![42])]);
}

#[test]
fn all_resolves_after_every_input_resolves() {
    let (a, settle_a) = P::pending();
    let (b, settle_b) = P::pending();
    let seen = observe_all(&P::all(vec![a, b]));

    assert!(seen.lock().is_empty());
    settle_a.resolve(123);
    assert!(seen.lock().is_empty());
    settle_b.resolve(456);
    assert_eq!(*seen.lock(), vec![Ok(vec![123, 456])]);
}

#[test]
fn all_results_follow_input_order_not_settlement_order() {
    let (a, settle_a) = P::pending();
    let (b, settle_b) = P::pending();
    let seen = observe_all(&P::all(vec![a, b]));

    settle_b.resolve(456);
    settle_a.resolve(123);
    assert_eq!(*seen.lock(), vec![Ok(vec![123, 456])]);
}

#[test]
fn all_rejects_after_a_single_input_rejects() {
    let (input, settler) = P::pending();
    let seen = observe_all(&P::all(vec![input]));

    settler.reject(42);
    assert_eq!(*seen.lock(), vec![Err(42)]);
}

#[test]
fn all_rejects_once_even_when_another_input_later_resolves() {
    let (a, settle_a) = P::pending();
    let (b, settle_b) = P::pending();
    let seen = observe_all(&P::all(vec![a, b]));

    settle_b.reject(456);
    settle_a.resolve(123);
    assert_eq!(*seen.lock(), vec![Err(456)]);
}

#[test]
fn all_rejects_once_even_when_every_input_rejects() {
    let (a, settle_a) = P::pending();
    let (b, settle_b) = P::pending();
    let seen = observe_all(&P::all(vec![a, b]));

    settle_a.reject(111);
    settle_b.reject(222);
    assert_eq!(*seen.lock(), vec![Err(111)]);
}

#[test]
fn all_of_nothing_is_an_empty_fulfillment() {
    let combined = P::all(Vec::new());
    assert_eq!(combined.value(), Some(Vec::new()));
}

#[test]
fn resolve_flattens_nested_settleables_to_the_innermost_value() {
    let flattened = P::resolve(P::resolve(5));
    assert_eq!(flattened.value(), Some(5));

    let nested: Settleable<P, i32> = Settleable::resolve(P::resolve(5));
    assert_eq!(nested.flatten().value(), Some(5));
}

mod typed_rejections {
    //! The rejection payload is opaque to the crate; exercise it with the
    //! kind of derived error enum real call sites use.

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    enum FetchError {
        #[error("request timed out after {0}ms")]
        Timeout(u64),
        #[error("upstream returned status {0}")]
        Upstream(u16),
    }

    #[test]
    fn first_rejection_error_is_frozen() {
        let s = Settleable::<u32, FetchError>::new(|settler| {
            settler.reject(FetchError::Timeout(30));
            settler.reject(FetchError::Upstream(502));
            Ok(())
        });
        assert_eq!(s.error(), Some(FetchError::Timeout(30)));
    }

    #[test]
    fn catch_recovers_with_a_fallback_value() {
        let recovered = Settleable::<u32, FetchError>::reject(FetchError::Upstream(502))
            .catch(|_| 0u32);
        assert_eq!(recovered.value(), Some(0));
        assert_eq!(recovered.state(), SettleState::Fulfilled);
    }

    #[test]
    fn all_propagates_the_typed_error() {
        let (a, settle_a) = Settleable::<u32, FetchError>::pending();
        let (b, _settle_b) = Settleable::<u32, FetchError>::pending();
        let combined = Settleable::all(vec![a, b]);

        settle_a.reject(FetchError::Timeout(30));
        assert_eq!(combined.error(), Some(FetchError::Timeout(30)));
        assert_eq!(combined.error().map(|e| e.to_string()).as_deref(),
            Some("request timed out after 30ms"));
    }
}
