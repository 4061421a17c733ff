// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Terminal outcome types shared by sources, handles, and the result adapter.

use std::any::Any;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

use crate::signal::CancellationSignal;

/// Status returned from non-blocking completion queries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CompletionStatus {
    Pending,
    Completed,
    Canceled,
    Faulted,
}

impl CompletionStatus {
    /// Returns `true` for every state other than [`Pending`](Self::Pending).
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A producer failure, shared by reference with every observer of a handle.
///
/// Cloning a `Fault` never copies the underlying error; use
/// [`ptr_eq`](Self::ptr_eq) to check that two faults carry the same error.
#[derive(Clone)]
pub struct Fault(Arc<anyhow::Error>);

impl Fault {
    /// Wrap an error as a fault.
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self(Arc::new(error.into()))
    }

    /// Build a fault from a plain message.
    pub fn msg(message: impl Display + Debug + Send + Sync + 'static) -> Self {
        Self(Arc::new(anyhow::Error::msg(message)))
    }

    /// Build a fault from a panic payload captured with `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::msg(format!("producer panicked: {message}"))
    }

    /// Borrow the underlying error.
    pub fn error(&self) -> &anyhow::Error {
        &self.0
    }

    /// Returns `true` when both faults share the same error allocation.
    pub fn ptr_eq(&self, other: &Fault) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fault").field(&format_args!("{:#}", self.0)).finish()
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let inner: &(dyn std::error::Error + Send + Sync + 'static) = (*self.0).as_ref();
        Some(inner)
    }
}

/// The single terminal outcome of a completion cell.
#[derive(Clone, Debug)]
pub enum Outcome<T> {
    /// The producer returned a value.
    Completed(T),
    /// Cancellation won; carries the signal that caused it.
    Canceled(CancellationSignal),
    /// The producer failed.
    Faulted(Fault),
}

impl<T> Outcome<T> {
    /// Map the outcome to its [`CompletionStatus`].
    pub fn status(&self) -> CompletionStatus {
        match self {
            Self::Completed(_) => CompletionStatus::Completed,
            Self::Canceled(_) => CompletionStatus::Canceled,
            Self::Faulted(_) => CompletionStatus::Faulted,
        }
    }

    /// The produced value, if the outcome is [`Completed`](Self::Completed).
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// The originating signal, if the outcome is [`Canceled`](Self::Canceled).
    pub fn signal(&self) -> Option<&CancellationSignal> {
        match self {
            Self::Canceled(signal) => Some(signal),
            _ => None,
        }
    }

    /// The fault, if the outcome is [`Faulted`](Self::Faulted).
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Faulted(fault) => Some(fault),
            _ => None,
        }
    }

    /// Borrowing `Result` view of the outcome.
    pub fn as_result(&self) -> Result<&T, CompletionError> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Canceled(signal) => Err(CompletionError::Canceled(signal.clone())),
            Self::Faulted(fault) => Err(CompletionError::Faulted(fault.clone())),
        }
    }

    /// Consuming `Result` view of the outcome.
    pub fn into_result(self) -> Result<T, CompletionError> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Canceled(signal) => Err(CompletionError::Canceled(signal)),
            Self::Faulted(fault) => Err(CompletionError::Faulted(fault)),
        }
    }
}

/// Error side of [`Outcome::as_result`] and [`Outcome::into_result`].
#[derive(Clone, Debug, thiserror::Error)]
pub enum CompletionError {
    /// The completion was canceled by the carried signal.
    #[error("completion canceled")]
    Canceled(CancellationSignal),

    /// The producer failed.
    #[error("completion faulted: {0}")]
    Faulted(#[source] Fault),
}
