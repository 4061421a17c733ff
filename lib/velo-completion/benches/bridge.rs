// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Cost of bridging a completion to a cancellation signal.
//!
//! Run with: cargo bench -p velo-completion --bench bridge

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use velo_completion::{CancellationSignal, CompletionSource, ProducerError, wrap_function1};

/// Number of bridges already parked on the shared signal.
const BACKLOG_SIZES: [usize; 3] = [0, 64, 4_096];

fn bench_attach_then_complete(c: &mut Criterion) {
    let mut group = c.benchmark_group("attach_then_complete");

    for backlog in BACKLOG_SIZES {
        let signal = CancellationSignal::new();
        let parked: Vec<_> = (0..backlog)
            .map(|_| {
                let source = CompletionSource::<u64>::new();
                source.attach_cancellation(&signal);
                source
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(backlog), &backlog, |b, _| {
            b.iter(|| {
                let source = CompletionSource::<u64>::new();
                source.attach_cancellation(&signal);
                black_box(source.try_complete(42))
            });
        });

        drop(parked);
    }

    group.finish();
}

fn bench_attach_then_fire(c: &mut Criterion) {
    c.bench_function("attach_then_fire", |b| {
        b.iter(|| {
            let signal = CancellationSignal::new();
            let source = CompletionSource::<u64>::new();
            source.attach_cancellation(&signal);
            black_box(signal.fire())
        });
    });
}

fn bench_adapter(c: &mut Criterion) {
    let adapted = wrap_function1(|n: u64, signal: &CancellationSignal| -> Result<u64, ProducerError> {
        signal.check()?;
        Ok(n.wrapping_mul(31))
    });
    let signal = CancellationSignal::new();

    c.bench_function("wrap_function1", |b| {
        b.iter(|| black_box(adapted(black_box(7), &signal)))
    });
}

criterion_group!(
    benches,
    bench_attach_then_complete,
    bench_attach_then_fire,
    bench_adapter
);
criterion_main!(benches);
