// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Single-assignment completion cell and its producer/observer views.
//!
//! The cell state, its continuations, and its wakers sit under one
//! `parking_lot::Mutex`. The first transition out of `Pending` wins; every
//! later attempt returns `false`. Wakers and continuations are drained under
//! the lock and run after it is released, on the resolving thread.

use parking_lot::Mutex as ParkingMutex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll, Waker};
use tracing::trace;

use crate::awaiter::CompletionAwaiter;
use crate::bridge;
use crate::guard::CompletionGuard;
use crate::notify::Notifier;
use crate::outcome::{CompletionStatus, Fault, Outcome};
use crate::signal::CancellationSignal;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a completion cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(u64);

impl HandleId {
    fn next() -> Self {
        Self(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Return the raw id.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Display for HandleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "HandleId({})", self.0)
    }
}

type Continuation<T> = Box<dyn FnOnce(&Outcome<T>) + Send>;

enum CellState<T> {
    Pending {
        continuations: Vec<Continuation<T>>,
        wakers: Vec<Waker>,
    },
    Terminal(Arc<Outcome<T>>),
}

pub(crate) struct CompletionCell<T> {
    id: HandleId,
    state: ParkingMutex<CellState<T>>,
}

impl<T> CompletionCell<T> {
    fn pending() -> Self {
        Self {
            id: HandleId::next(),
            state: ParkingMutex::new(CellState::Pending {
                continuations: Vec::new(),
                wakers: Vec::new(),
            }),
        }
    }

    fn resolved(outcome: Outcome<T>) -> Self {
        Self {
            id: HandleId::next(),
            state: ParkingMutex::new(CellState::Terminal(Arc::new(outcome))),
        }
    }

    pub(crate) fn id(&self) -> HandleId {
        self.id
    }

    /// Attempt the single transition out of `Pending`.
    ///
    /// Losing the race is not an error: the attempt is dropped and `false`
    /// is returned.
    pub(crate) fn try_resolve(&self, outcome: Outcome<T>) -> bool {
        let mut state = self.state.lock();
        if matches!(*state, CellState::Terminal(_)) {
            return false;
        }

        let outcome = Arc::new(outcome);
        let previous = std::mem::replace(&mut *state, CellState::Terminal(Arc::clone(&outcome)));
        drop(state);

        let CellState::Pending {
            continuations,
            wakers,
        } = previous
        else {
            return false;
        };

        trace!(handle = %self.id, status = ?outcome.status(), "completion resolved");

        let mut notifier = Notifier::default();
        for waker in wakers {
            notifier.run(|| waker.wake());
        }
        for continuation in continuations {
            notifier.run(|| continuation(&outcome));
        }
        notifier.finish();
        true
    }

    /// Run `continuation` once the cell is terminal.
    ///
    /// If the cell is already terminal the continuation runs immediately on
    /// the calling thread.
    pub(crate) fn on_resolved(&self, continuation: Continuation<T>) {
        let outcome = {
            let mut state = self.state.lock();
            match &mut *state {
                CellState::Pending { continuations, .. } => {
                    continuations.push(continuation);
                    return;
                }
                CellState::Terminal(outcome) => Arc::clone(outcome),
            }
        };
        continuation(&outcome);
    }

    pub(crate) fn outcome(&self) -> Option<Arc<Outcome<T>>> {
        match &*self.state.lock() {
            CellState::Pending { .. } => None,
            CellState::Terminal(outcome) => Some(Arc::clone(outcome)),
        }
    }

    pub(crate) fn status(&self) -> CompletionStatus {
        match &*self.state.lock() {
            CellState::Pending { .. } => CompletionStatus::Pending,
            CellState::Terminal(outcome) => outcome.status(),
        }
    }

    pub(crate) fn poll_outcome(&self, cx: &mut Context<'_>) -> Poll<Arc<Outcome<T>>> {
        let mut state = self.state.lock();
        match &mut *state {
            CellState::Terminal(outcome) => Poll::Ready(Arc::clone(outcome)),
            CellState::Pending { wakers, .. } => {
                // Repeated polls from the same task must not grow the list.
                if !wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

/// Producer view of a completion cell.
///
/// Only a source can attempt transitions. Cloning a source produces a
/// second producer for the *same* cell; whichever clone resolves first wins.
pub struct CompletionSource<T> {
    cell: Arc<CompletionCell<T>>,
}

impl<T> CompletionSource<T> {
    /// Create a source for a new pending cell.
    pub fn new() -> Self {
        Self {
            cell: Arc::new(CompletionCell::pending()),
        }
    }

    /// The id of the underlying cell.
    pub fn id(&self) -> HandleId {
        self.cell.id()
    }

    /// Return a read-only observer for the cell.
    pub fn handle(&self) -> CompletionHandle<T> {
        CompletionHandle {
            cell: Arc::clone(&self.cell),
        }
    }

    /// Attempt to resolve the cell with an arbitrary outcome.
    pub fn try_resolve(&self, outcome: Outcome<T>) -> bool {
        self.cell.try_resolve(outcome)
    }

    /// Attempt to complete the cell with `value`.
    pub fn try_complete(&self, value: T) -> bool {
        self.cell.try_resolve(Outcome::Completed(value))
    }

    /// Attempt to fault the cell with `error`.
    pub fn try_fault(&self, error: impl Into<anyhow::Error>) -> bool {
        self.cell.try_resolve(Outcome::Faulted(Fault::new(error)))
    }

    /// Attempt to cancel the cell on behalf of `signal`.
    pub fn try_cancel(&self, signal: &CancellationSignal) -> bool {
        self.cell.try_resolve(Outcome::Canceled(signal.clone()))
    }

    /// Non-blocking status check.
    pub fn status(&self) -> CompletionStatus {
        self.cell.status()
    }

    /// Returns `true` once the cell has left `Pending`.
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Run `continuation` once the cell is terminal, whichever path resolved it.
    ///
    /// Continuations run exactly once, on the thread that performed the
    /// winning transition, or immediately if the cell is already terminal.
    pub fn on_resolved<F>(&self, continuation: F)
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        self.cell.on_resolved(Box::new(continuation));
    }

    /// Wrap this source in a [`CompletionGuard`] that faults the cell on
    /// drop with a default reason.
    pub fn into_guard(self) -> CompletionGuard<T> {
        CompletionGuard::new(self, "completion source dropped without being resolved")
    }

    /// Wrap this source in a [`CompletionGuard`] that faults the cell on
    /// drop with a custom reason.
    pub fn into_guard_with_reason(self, reason: impl Into<Arc<str>>) -> CompletionGuard<T> {
        CompletionGuard::new(self, reason)
    }

    pub(crate) fn downgrade(&self) -> Weak<CompletionCell<T>> {
        Arc::downgrade(&self.cell)
    }
}

impl<T> CompletionSource<T>
where
    T: Send + Sync + 'static,
{
    /// Race `signal` against the resolution of this cell.
    ///
    /// See [`attach_cancellation`](crate::attach_cancellation).
    pub fn attach_cancellation(&self, signal: &CancellationSignal) {
        bridge::attach_cancellation(self, signal);
    }
}

impl<T> Default for CompletionSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CompletionSource<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Debug for CompletionSource<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSource")
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}

/// Observer view of a completion cell.
///
/// A handle can read and await the outcome but never change it.
pub struct CompletionHandle<T> {
    cell: Arc<CompletionCell<T>>,
}

impl<T> CompletionHandle<T> {
    /// A handle that is already resolved with `outcome`.
    pub fn from_outcome(outcome: Outcome<T>) -> Self {
        Self {
            cell: Arc::new(CompletionCell::resolved(outcome)),
        }
    }

    /// A handle that is already completed with `value`.
    pub fn completed(value: T) -> Self {
        Self::from_outcome(Outcome::Completed(value))
    }

    /// A handle that is already canceled by `signal`.
    pub fn canceled(signal: &CancellationSignal) -> Self {
        Self::from_outcome(Outcome::Canceled(signal.clone()))
    }

    /// A handle that is already faulted with `error`.
    pub fn faulted(error: impl Into<anyhow::Error>) -> Self {
        Self::from_outcome(Outcome::Faulted(Fault::new(error)))
    }

    /// The id of the underlying cell.
    pub fn id(&self) -> HandleId {
        self.cell.id()
    }

    /// Non-blocking status check.
    pub fn status(&self) -> CompletionStatus {
        self.cell.status()
    }

    /// Returns `true` once the cell has left `Pending`.
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// The terminal outcome, or `None` while pending.
    pub fn outcome(&self) -> Option<Arc<Outcome<T>>> {
        self.cell.outcome()
    }

    /// Create a future that resolves with the terminal outcome.
    pub fn wait(&self) -> CompletionAwaiter<T> {
        CompletionAwaiter::new(Arc::clone(&self.cell))
    }
}

impl<T> Clone for CompletionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Debug for CompletionHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}
