// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Run a drained batch of user callbacks to completion.
//!
//! A panic in one callback must not drop the callbacks after it: every
//! callback runs, then the first panic resumes on the notifying thread.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use tracing::warn;

#[derive(Default)]
pub(crate) struct Notifier {
    first_panic: Option<Box<dyn Any + Send>>,
    panics: usize,
}

impl Notifier {
    pub(crate) fn run(&mut self, callback: impl FnOnce()) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
            self.panics += 1;
            self.first_panic.get_or_insert(payload);
        }
    }

    /// Resume the first captured panic, if any.
    pub(crate) fn finish(self) {
        if let Some(payload) = self.first_panic {
            warn!(panics = self.panics, "callback panicked during notification");
            resume_unwind(payload);
        }
    }
}
