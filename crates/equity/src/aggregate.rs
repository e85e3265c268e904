// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Shared results aggregate.
use parking_lot::Mutex;

use crate::tally::Tally;

/// The minimum number of batches before the standard error is meaningful.
pub(crate) const MIN_BATCHES: u64 = 30;

/// Merged results of all workers.
#[derive(Debug, Clone)]
pub(crate) struct Totals {
    pub tally: Tally,
    pub batches: u64,
    /// Batches that completed no trial.
    pub empty_batches: u64,
    batch_sum: f64,
    batch_sum_sq: f64,
}

impl Totals {
    fn new(players: usize) -> Self {
        Self {
            tally: Tally::new(players),
            batches: 0,
            empty_batches: 0,
            batch_sum: 0.0,
            batch_sum_sq: 0.0,
        }
    }

    /// Standard error of the first seat equity estimated from the sample
    /// variance of the batches equities, infinite until there are enough
    /// batches.
    pub fn stdev(&self) -> f64 {
        if self.batches < MIN_BATCHES {
            return f64::INFINITY;
        }

        let n = self.batches as f64;
        let var = (self.batch_sum_sq - self.batch_sum * self.batch_sum / n).max(0.0) / (n - 1.0);
        (var / n).sqrt()
    }
}

/// Tally shared by the workers, each worker merges its local tally once per
/// batch so the lock is taken rarely.
#[derive(Debug)]
pub(crate) struct Aggregate {
    totals: Mutex<Totals>,
}

impl Aggregate {
    pub fn new(players: usize) -> Self {
        Self {
            totals: Mutex::new(Totals::new(players)),
        }
    }

    /// Merges a batch, empty batches are only counted.
    pub fn merge(&self, batch: &Tally) {
        if batch.hands() == 0 {
            self.totals.lock().empty_batches += 1;
            return;
        }

        let equity = batch.equity(0);

        let mut totals = self.totals.lock();
        totals.tally.merge(batch);
        totals.batches += 1;
        totals.batch_sum += equity;
        totals.batch_sum_sq += equity * equity;
    }

    /// A copy of the current totals.
    pub fn totals(&self) -> Totals {
        self.totals.lock().clone()
    }
}
