// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! RAII guard that faults a completion on drop unless explicitly resolved.

use std::sync::Arc;

use crate::outcome::{Fault, Outcome};
use crate::signal::CancellationSignal;
use crate::source::{CompletionHandle, CompletionSource};

/// RAII wrapper around a [`CompletionSource`] that faults the cell if
/// dropped before one of the resolving methods is called.
pub struct CompletionGuard<T> {
    source: Option<CompletionSource<T>>,
    handle: CompletionHandle<T>,
    fault_reason: Arc<str>,
}

impl<T> CompletionGuard<T> {
    /// Create a new guard that will fault the cell with `fault_reason`
    /// if dropped without an explicit resolution.
    pub fn new(source: CompletionSource<T>, fault_reason: impl Into<Arc<str>>) -> Self {
        Self {
            handle: source.handle(),
            source: Some(source),
            fault_reason: fault_reason.into(),
        }
    }

    /// Return an observer for the guarded cell.
    pub fn handle(&self) -> CompletionHandle<T> {
        self.handle.clone()
    }

    /// Complete the guarded cell, consuming the guard.
    pub fn complete(mut self, value: T) -> bool {
        self.source
            .take()
            .is_some_and(|source| source.try_complete(value))
    }

    /// Fault the guarded cell, consuming the guard.
    pub fn fault(mut self, error: impl Into<anyhow::Error>) -> bool {
        self.source
            .take()
            .is_some_and(|source| source.try_fault(error))
    }

    /// Cancel the guarded cell on behalf of `signal`, consuming the guard.
    pub fn cancel(mut self, signal: &CancellationSignal) -> bool {
        self.source
            .take()
            .is_some_and(|source| source.try_cancel(signal))
    }

    /// Return the source without resolving it.
    pub fn disarm(mut self) -> Option<CompletionSource<T>> {
        self.source.take()
    }
}

impl<T> Drop for CompletionGuard<T> {
    fn drop(&mut self) {
        if let Some(source) = self.source.take() {
            let fault = Fault::msg(Arc::clone(&self.fault_reason));
            source.try_resolve(Outcome::Faulted(fault));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::CompletionStatus;

    #[test]
    fn drop_faults_with_default_reason() {
        let source = CompletionSource::<u32>::new();
        let handle = source.handle();
        drop(source.into_guard());

        let outcome = handle.outcome().unwrap();
        let fault = outcome.fault().unwrap();
        assert!(fault.to_string().contains("dropped without being resolved"));
    }

    #[test]
    fn drop_faults_with_custom_reason() {
        let guard = CompletionSource::<u32>::new().into_guard_with_reason("request abandoned");
        let handle = guard.handle();
        drop(guard);
        assert_eq!(
            handle.outcome().unwrap().fault().unwrap().to_string(),
            "request abandoned"
        );
    }

    #[test]
    fn explicit_resolution_disarms_drop() {
        let guard = CompletionSource::new().into_guard();
        let handle = guard.handle();
        assert!(guard.complete(8_u32));
        assert_eq!(handle.outcome().unwrap().value(), Some(&8));

        let signal = CancellationSignal::new();
        let guard = CompletionSource::<u32>::new().into_guard();
        let handle = guard.handle();
        assert!(guard.cancel(&signal));
        assert_eq!(handle.status(), CompletionStatus::Canceled);

        let guard = CompletionSource::<u32>::new().into_guard();
        let handle = guard.handle();
        assert!(guard.fault(anyhow::anyhow!("explicit")));
        assert_eq!(handle.outcome().unwrap().fault().unwrap().to_string(), "explicit");
    }

    #[test]
    fn disarm_returns_pending_source() {
        let guard = CompletionSource::<u32>::new().into_guard();
        let handle = guard.handle();
        let source = guard.disarm().unwrap();
        assert_eq!(handle.status(), CompletionStatus::Pending);
        source.try_complete(1);
        assert_eq!(handle.status(), CompletionStatus::Completed);
    }

    #[test]
    fn drop_after_external_resolution_is_noop() {
        let source = CompletionSource::<u32>::new();
        let guard = source.clone().into_guard();
        source.try_complete(2);
        drop(guard);
        assert_eq!(source.handle().outcome().unwrap().value(), Some(&2));
    }
}
