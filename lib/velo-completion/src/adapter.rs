// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Adapters that turn synchronous producers into already-resolved handles.
//!
//! A producer reports its result as `Result<T, ProducerError>`. The adapted
//! callable never fails and never panics: values, cancellation, errors, and
//! panics all come back as the outcome of the returned [`CompletionHandle`].

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::outcome::{Fault, Outcome};
use crate::signal::CancellationSignal;
use crate::source::CompletionHandle;

/// Failure reported by a producer wrapped with one of the `wrap_*` adapters.
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    /// The producer observed cancellation of the carried signal.
    #[error("producer observed cancellation")]
    Canceled(CancellationSignal),

    /// Any other failure.
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

fn adapt<T>(produce: impl FnOnce() -> Result<T, ProducerError>) -> CompletionHandle<T> {
    let outcome = match catch_unwind(AssertUnwindSafe(produce)) {
        Ok(Ok(value)) => Outcome::Completed(value),
        Ok(Err(ProducerError::Canceled(signal))) => Outcome::Canceled(signal),
        Ok(Err(ProducerError::Fault(error))) => Outcome::Faulted(Fault::new(error)),
        Err(payload) => Outcome::Faulted(Fault::from_panic(payload)),
    };
    CompletionHandle::from_outcome(outcome)
}

/// Adapt a producer with no inputs.
pub fn wrap_function0<T, F>(f: F) -> impl Fn(&CancellationSignal) -> CompletionHandle<T>
where
    F: Fn(&CancellationSignal) -> Result<T, ProducerError>,
{
    move |signal: &CancellationSignal| adapt(|| f(signal))
}

/// Adapt a producer with one input.
pub fn wrap_function1<A, T, F>(f: F) -> impl Fn(A, &CancellationSignal) -> CompletionHandle<T>
where
    F: Fn(A, &CancellationSignal) -> Result<T, ProducerError>,
{
    move |a: A, signal: &CancellationSignal| adapt(|| f(a, signal))
}

/// Adapt a producer with two inputs.
pub fn wrap_function2<A, B, T, F>(
    f: F,
) -> impl Fn(A, B, &CancellationSignal) -> CompletionHandle<T>
where
    F: Fn(A, B, &CancellationSignal) -> Result<T, ProducerError>,
{
    move |a: A, b: B, signal: &CancellationSignal| adapt(|| f(a, b, signal))
}

/// Adapt a producer with three inputs.
pub fn wrap_function3<A, B, C, T, F>(
    f: F,
) -> impl Fn(A, B, C, &CancellationSignal) -> CompletionHandle<T>
where
    F: Fn(A, B, C, &CancellationSignal) -> Result<T, ProducerError>,
{
    move |a: A, b: B, c: C, signal: &CancellationSignal| adapt(|| f(a, b, c, signal))
}

/// Adapt an action with one input.
pub fn wrap_action1<A, F>(f: F) -> impl Fn(A, &CancellationSignal) -> CompletionHandle<()>
where
    F: Fn(A, &CancellationSignal) -> Result<(), ProducerError>,
{
    wrap_function1(f)
}

/// Adapt an action with two inputs.
pub fn wrap_action2<A, B, F>(f: F) -> impl Fn(A, B, &CancellationSignal) -> CompletionHandle<()>
where
    F: Fn(A, B, &CancellationSignal) -> Result<(), ProducerError>,
{
    wrap_function2(f)
}

/// Adapt an action with three inputs.
pub fn wrap_action3<A, B, C, F>(
    f: F,
) -> impl Fn(A, B, C, &CancellationSignal) -> CompletionHandle<()>
where
    F: Fn(A, B, C, &CancellationSignal) -> Result<(), ProducerError>,
{
    wrap_function3(f)
}
