// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Race a cancellation signal against the resolution of a completion cell.
//!
//! The signal callback holds only a weak reference to the cell, and the
//! cell's continuation owns the [`BridgeRegistration`]. Whichever side
//! resolves the cell first wins; the continuation then removes the
//! subscription so the signal never keeps a callback for a terminal cell.

use tracing::trace;

use crate::outcome::Outcome;
use crate::signal::{CancellationSignal, SubscriptionKey};
use crate::source::{CompletionSource, HandleId};

/// Correlates one completion cell with one signal subscription.
///
/// Owned by the cell's resolution continuation and consumed by
/// [`dispose`](Self::dispose), so it is disposed at most once and never
/// outlives the resolution of its cell.
#[derive(Debug)]
pub struct BridgeRegistration {
    handle: HandleId,
    subscription: SubscriptionKey,
    signal: CancellationSignal,
}

impl BridgeRegistration {
    /// The id of the bridged completion cell.
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// The key of the signal subscription.
    pub fn subscription(&self) -> SubscriptionKey {
        self.subscription
    }

    /// Remove the signal subscription.
    ///
    /// Returns `false` when the subscription was already gone, e.g. because
    /// the signal fired and drained it first.
    pub fn dispose(self) -> bool {
        let removed = self.signal.unsubscribe(self.subscription);
        trace!(
            handle = %self.handle,
            subscription = %self.subscription,
            removed,
            "cancellation bridge disposed"
        );
        removed
    }
}

/// Race `signal` against the resolution of `source`.
///
/// - If the signal cannot fire or the cell is already terminal, nothing
///   happens and no subscription is taken.
/// - If the signal has already fired, the cell is canceled immediately
///   (silently losing to a concurrent resolution).
/// - Otherwise the cell is canceled when the signal fires, and the
///   subscription is removed as soon as the cell resolves by any path.
pub fn attach_cancellation<T>(source: &CompletionSource<T>, signal: &CancellationSignal)
where
    T: Send + Sync + 'static,
{
    if !signal.can_fire() || source.is_terminal() {
        return;
    }

    if signal.is_fired() {
        source.try_cancel(signal);
        return;
    }

    let cell = source.downgrade();
    let subscription = signal.subscribe(move |fired| {
        if let Some(cell) = cell.upgrade() {
            cell.try_resolve(Outcome::Canceled(fired.clone()));
        }
    });

    // `None` means the signal fired after the check above and the callback
    // already ran inline.
    let Some(subscription) = subscription else {
        return;
    };

    let registration = BridgeRegistration {
        handle: source.id(),
        subscription,
        signal: signal.clone(),
    };
    trace!(
        handle = %registration.handle,
        subscription = %registration.subscription,
        "cancellation bridge attached"
    );

    source.on_resolved(move |_| {
        registration.dispose();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::CompletionStatus;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn signal_that_cannot_fire_is_ignored() {
        let source = CompletionSource::<u32>::new();
        let signal = CancellationSignal::none();
        attach_cancellation(&source, &signal);
        assert_eq!(source.status(), CompletionStatus::Pending);
        assert!(source.try_complete(1));
    }

    #[test]
    fn terminal_cell_never_subscribes() {
        let source = CompletionSource::<u32>::new();
        source.try_complete(1);

        let signal = CancellationSignal::new();
        attach_cancellation(&source, &signal);
        assert_eq!(signal.subscriber_count(), 0);

        signal.fire();
        assert_eq!(source.handle().outcome().unwrap().value(), Some(&1));
    }

    #[test]
    fn fired_signal_cancels_synchronously() {
        let source = CompletionSource::<u32>::new();
        let signal = CancellationSignal::new();
        signal.fire();

        attach_cancellation(&source, &signal);
        let outcome = source.handle().outcome().unwrap();
        assert!(outcome.signal().unwrap().same_as(&signal));
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn firing_cancels_pending_cell() {
        let source = CompletionSource::<u32>::new();
        let signal = CancellationSignal::new();
        source.attach_cancellation(&signal);
        assert_eq!(signal.subscriber_count(), 1);

        assert!(signal.fire());
        assert_eq!(source.status(), CompletionStatus::Canceled);
        assert!(!source.try_complete(3));
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn resolution_disposes_subscription() {
        let source = CompletionSource::<u32>::new();
        let signal = CancellationSignal::new();
        source.attach_cancellation(&signal);
        assert_eq!(signal.subscriber_count(), 1);

        assert!(source.try_complete(7));
        assert_eq!(signal.subscriber_count(), 0);

        signal.fire();
        assert_eq!(source.handle().outcome().unwrap().value(), Some(&7));
    }

    #[test]
    fn one_signal_many_cells() {
        let signal = CancellationSignal::new();
        let sources: Vec<_> = (0..8).map(|_| CompletionSource::<u32>::new()).collect();
        for source in &sources {
            source.attach_cancellation(&signal);
        }
        assert_eq!(signal.subscriber_count(), 8);

        for source in sources.iter().step_by(2) {
            source.try_complete(0);
        }
        assert_eq!(signal.subscriber_count(), 4);

        signal.fire();
        for (index, source) in sources.iter().enumerate() {
            let expected = if index % 2 == 0 {
                CompletionStatus::Completed
            } else {
                CompletionStatus::Canceled
            };
            assert_eq!(source.status(), expected);
        }
    }

    #[test]
    fn dropped_cell_is_not_kept_alive_by_signal() {
        let signal = CancellationSignal::new();
        let source = CompletionSource::<u32>::new();
        let weak = source.downgrade();
        source.attach_cancellation(&signal);
        drop(source);

        assert!(weak.upgrade().is_none());
        assert!(signal.fire());
    }

    #[test]
    fn panicking_subscriber_still_cancels_bridged_cell() {
        let signal = CancellationSignal::new();
        signal.subscribe(|_| panic!("shutdown hook failed"));
        let source = CompletionSource::<u32>::new();
        source.attach_cancellation(&signal);

        let result = catch_unwind(AssertUnwindSafe(|| signal.fire()));
        assert!(result.is_err());
        assert!(signal.is_fired());
        assert_eq!(source.status(), CompletionStatus::Canceled);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn panicking_continuation_still_disposes_subscription() {
        let signal = CancellationSignal::new();
        let source = CompletionSource::<u32>::new();
        source.on_resolved(|_| panic!("listener failed"));
        source.attach_cancellation(&signal);
        assert_eq!(signal.subscriber_count(), 1);

        let result = catch_unwind(AssertUnwindSafe(|| source.try_complete(1)));
        assert!(result.is_err());
        assert_eq!(source.status(), CompletionStatus::Completed);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn registration_dispose_is_idempotent_at_signal() {
        let signal = CancellationSignal::new();
        let key = signal.subscribe(|_| {}).unwrap();
        let first = BridgeRegistration {
            handle: CompletionSource::<()>::new().id(),
            subscription: key,
            signal: signal.clone(),
        };
        let second = BridgeRegistration {
            handle: first.handle(),
            subscription: first.subscription(),
            signal: signal.clone(),
        };
        assert!(first.dispose());
        assert!(!second.dispose());
        assert_eq!(signal.subscriber_count(), 0);
    }
}
