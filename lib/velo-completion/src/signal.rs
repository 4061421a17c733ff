// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Fire-once cancellation signal with a generational subscriber arena.
//!
//! All subscriber state lives under a single `parking_lot::Mutex`. Callbacks
//! are drained under the lock and invoked after it is released, so a
//! callback may freely subscribe, unsubscribe, or resolve completions.

use parking_lot::Mutex as ParkingMutex;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

use crate::adapter::ProducerError;
use crate::notify::Notifier;

type SubscriberCallback = Box<dyn FnOnce(&CancellationSignal) + Send>;

/// Identifies one subscription in a signal's arena.
///
/// Keys are generational: once a subscription is removed its slot may be
/// reused, but the old key no longer matches and disposing it is a no-op.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    index: u32,
    generation: u32,
}

impl SubscriptionKey {
    /// Slot index inside the arena.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when the subscription was taken.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl Display for SubscriptionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SubscriptionKey(index={}, generation={})",
            self.index, self.generation
        )
    }
}

struct SubscriberSlot {
    generation: u32,
    callback: Option<SubscriberCallback>,
}

#[derive(Default)]
struct SubscriberArena {
    slots: Vec<SubscriberSlot>,
    free: Vec<u32>,
    live: usize,
    fired: bool,
}

impl SubscriberArena {
    fn insert(&mut self, callback: SubscriberCallback) -> SubscriptionKey {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.callback = Some(callback);
            return SubscriptionKey {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(SubscriberSlot {
            generation: 0,
            callback: Some(callback),
        });
        SubscriptionKey {
            index,
            generation: 0,
        }
    }

    fn remove(&mut self, key: SubscriptionKey) -> Option<SubscriberCallback> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let callback = slot.callback.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.live -= 1;
        Some(callback)
    }

    fn drain(&mut self) -> Vec<SubscriberCallback> {
        let callbacks = self
            .slots
            .drain(..)
            .filter_map(|slot| slot.callback)
            .collect();
        self.free.clear();
        self.live = 0;
        callbacks
    }
}

struct SignalState {
    fired: AtomicBool,
    arena: ParkingMutex<SubscriberArena>,
}

/// An externally triggered, fire-once cancellation event.
///
/// Cloning a signal produces a second reference to the *same* event; firing
/// through any clone notifies every current subscriber exactly once. A
/// signal created with [`none`](Self::none) can never fire; that is also
/// the `Default` value.
#[derive(Clone, Default)]
pub struct CancellationSignal {
    state: Option<Arc<SignalState>>,
}

impl CancellationSignal {
    /// Create a new armed signal.
    pub fn new() -> Self {
        Self {
            state: Some(Arc::new(SignalState {
                fired: AtomicBool::new(false),
                arena: ParkingMutex::new(SubscriberArena::default()),
            })),
        }
    }

    /// A signal that is incapable of firing.
    pub fn none() -> Self {
        Self { state: None }
    }

    /// Returns `false` for signals created with [`none`](Self::none).
    pub fn can_fire(&self) -> bool {
        self.state.is_some()
    }

    /// Returns `true` once the signal has fired.
    pub fn is_fired(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| state.fired.load(Ordering::Acquire))
    }

    /// Fire the signal, notifying every current subscriber.
    ///
    /// Returns `true` if this call fired the signal; later calls (and calls
    /// on a signal that cannot fire) return `false` and do nothing.
    pub fn fire(&self) -> bool {
        let Some(state) = &self.state else {
            return false;
        };

        let callbacks = {
            let mut arena = state.arena.lock();
            if arena.fired {
                return false;
            }
            arena.fired = true;
            state.fired.store(true, Ordering::Release);
            arena.drain()
        };

        trace!(subscribers = callbacks.len(), "cancellation signal fired");
        let mut notifier = Notifier::default();
        for callback in callbacks {
            notifier.run(|| callback(self));
        }
        notifier.finish();
        true
    }

    /// Register `callback` to run when the signal fires.
    ///
    /// If the signal has already fired the callback runs immediately on the
    /// calling thread and no subscription is kept. A signal that cannot fire
    /// drops the callback. In both cases `None` is returned.
    pub fn subscribe<F>(&self, callback: F) -> Option<SubscriptionKey>
    where
        F: FnOnce(&CancellationSignal) + Send + 'static,
    {
        let state = self.state.as_ref()?;

        {
            let mut arena = state.arena.lock();
            if !arena.fired {
                return Some(arena.insert(Box::new(callback)));
            }
        }

        callback(self);
        None
    }

    /// Remove a subscription without invoking it.
    ///
    /// Idempotent: removing a key that was already removed, drained by
    /// [`fire`](Self::fire), or belongs to an older generation returns
    /// `false` and does nothing.
    pub fn unsubscribe(&self, key: SubscriptionKey) -> bool {
        let Some(state) = &self.state else {
            return false;
        };
        let removed = state.arena.lock().remove(key);
        // Drop outside the lock; the callback may own arbitrary state.
        removed.is_some()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state
            .as_ref()
            .map_or(0, |state| state.arena.lock().live)
    }

    /// Cooperative cancellation check for producers.
    ///
    /// Returns [`ProducerError::Canceled`] carrying this signal once it has
    /// fired, so producers can bail out with `signal.check()?`.
    pub fn check(&self) -> Result<(), ProducerError> {
        if self.is_fired() {
            return Err(ProducerError::Canceled(self.clone()));
        }
        Ok(())
    }

    /// Returns `true` when both values refer to the same underlying event.
    ///
    /// All signals created with [`none`](Self::none) are considered the same.
    pub fn same_as(&self, other: &CancellationSignal) -> bool {
        match (&self.state, &other.state) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl PartialEq for CancellationSignal {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for CancellationSignal {}

impl Debug for CancellationSignal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("can_fire", &self.can_fire())
            .field("fired", &self.is_fired())
            .finish()
    }
}
