// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::outcome::Outcome;
use crate::source::CompletionCell;

/// Future that waits for a completion cell to become terminal.
///
/// This can be used in `tokio::select!` and polled multiple times efficiently.
/// Waker deduplication inside the cell lock prevents unbounded growth.
pub struct CompletionAwaiter<T> {
    cell: Arc<CompletionCell<T>>,
}

impl<T> CompletionAwaiter<T> {
    pub(crate) fn new(cell: Arc<CompletionCell<T>>) -> Self {
        Self { cell }
    }
}

impl<T> Future for CompletionAwaiter<T> {
    type Output = Arc<Outcome<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.cell.poll_outcome(cx)
    }
}
