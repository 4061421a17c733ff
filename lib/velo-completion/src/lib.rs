// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

// Completion cell and outcome types
mod awaiter;
mod guard;
mod notify;
mod outcome;
mod source;

// Cancellation
mod bridge;
mod signal;

// Synchronous producer adapters
mod adapter;

// Ambient configuration
pub mod config;
pub mod logging;

// ── Re-exports ───────────────────────────────────────────────────────

pub use adapter::{
    ProducerError, wrap_action1, wrap_action2, wrap_action3, wrap_function0, wrap_function1,
    wrap_function2, wrap_function3,
};
pub use awaiter::CompletionAwaiter;
pub use bridge::{BridgeRegistration, attach_cancellation};
pub use guard::CompletionGuard;
pub use outcome::{CompletionError, CompletionStatus, Fault, Outcome};
pub use signal::{CancellationSignal, SubscriptionKey};
pub use source::{CompletionHandle, CompletionSource, HandleId};
