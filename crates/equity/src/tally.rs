// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Trials counters.
use serde::{Deserialize, Serialize};

/// Counts of completed trials by the set of seats that won them.
///
/// Each trial increments the counter for the mask of the seats that share the
/// best hand, bit `i` of the mask is set if seat `i` won or tied. Wins, ties
/// and equities are all derived from these counters so merging two tallies
/// is an element wise sum that does not depend on the merge order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    players: usize,
    winners: Vec<u64>,
    hands: u64,
    evaluations: u64,
}

impl Tally {
    /// Creates an empty tally.
    pub fn new(players: usize) -> Self {
        Self {
            players,
            winners: vec![0; 1 << players],
            hands: 0,
            evaluations: 0,
        }
    }

    /// Records a trial won by the seats in `winners`.
    #[inline]
    pub fn record(&mut self, winners: usize) {
        self.winners[winners] += 1;
        self.hands += 1;
        self.evaluations += self.players as u64;
    }

    /// Adds another tally counters to this tally.
    pub fn merge(&mut self, other: &Tally) {
        debug_assert_eq!(self.players, other.players);

        for (w, o) in self.winners.iter_mut().zip(&other.winners) {
            *w += o;
        }

        self.hands += other.hands;
        self.evaluations += other.evaluations;
    }

    /// Resets all counters.
    pub fn clear(&mut self) {
        self.winners.fill(0);
        self.hands = 0;
        self.evaluations = 0;
    }

    /// The number of players.
    pub fn players(&self) -> usize {
        self.players
    }

    /// The number of completed trials.
    pub fn hands(&self) -> u64 {
        self.hands
    }

    /// The number of hand evaluations.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Trials counts indexed by the mask of the seats that won them.
    pub fn wins_by_mask(&self) -> &[u64] {
        &self.winners
    }

    /// Trials won by this seat alone.
    pub fn wins(&self, seat: usize) -> u64 {
        self.winners[1 << seat]
    }

    /// Trials where this seat split the pot with other seats.
    pub fn ties(&self, seat: usize) -> u64 {
        self.masks_with(seat)
            .filter(|(mask, _)| mask.count_ones() > 1)
            .map(|(_, n)| n)
            .sum()
    }

    /// The seat equity, ties are split evenly between the winners.
    pub fn equity(&self, seat: usize) -> f64 {
        if self.hands == 0 {
            return 0.0;
        }

        let shares = self
            .masks_with(seat)
            .map(|(mask, n)| n as f64 / mask.count_ones() as f64)
            .sum::<f64>();

        shares / self.hands as f64
    }

    /// All seats equities.
    pub fn equities(&self) -> Vec<f64> {
        let mut shares = vec![0.0; self.players];
        if self.hands == 0 {
            return shares;
        }

        for (mask, &n) in self.winners.iter().enumerate().filter(|(_, n)| **n > 0) {
            let share = n as f64 / mask.count_ones() as f64;
            for (seat, s) in shares.iter_mut().enumerate() {
                if mask & (1 << seat) != 0 {
                    *s += share;
                }
            }
        }

        let hands = self.hands as f64;
        shares.iter_mut().for_each(|s| *s /= hands);
        shares
    }

    fn masks_with(&self, seat: usize) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.winners
            .iter()
            .enumerate()
            .filter(move |(mask, _)| mask & (1 << seat) != 0)
            .map(|(mask, &n)| (mask, n))
    }
}
