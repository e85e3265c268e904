// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Simulation results.
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

use crate::aggregate::{MIN_BATCHES, Totals};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopReason {
    /// The standard error dropped below the target.
    Converged,
    /// The time limit elapsed.
    TimedOut,
    /// The run was stopped with a stop call.
    UserStopped,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Converged => f.write_str("converged"),
            StopReason::TimedOut => f.write_str("timed out"),
            StopReason::UserStopped => f.write_str("stopped"),
        }
    }
}

/// A point in time view of a run results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSnapshot {
    /// The number of players.
    pub players: usize,
    /// Equity for each seat, ties are split evenly between the winners.
    pub equity: Vec<f64>,
    /// Trials won by each seat alone.
    pub wins: Vec<u64>,
    /// Trials where each seat split the pot.
    pub ties: Vec<u64>,
    /// Trials counts indexed by the mask of the seats that won them.
    pub wins_by_mask: Vec<u64>,
    /// Completed trials.
    pub hands: u64,
    /// Hand evaluations.
    pub evaluations: u64,
    /// Trials completed since the previous snapshot.
    pub interval_hands: u64,
    /// Seconds since the run started.
    pub time: f64,
    /// Seconds since the previous snapshot.
    pub interval_time: f64,
    /// Evaluations per second since the run started.
    pub speed: f64,
    /// Evaluations per second since the previous snapshot.
    pub interval_speed: f64,
    /// Standard error of the first seat equity.
    pub stdev: f64,
    /// Standard error scaled to a single trial.
    pub stdev_per_hand: f64,
    /// Merged workers batches.
    pub batches: u64,
    /// Run progress in `[0, 1]` if it can be estimated.
    pub progress: Option<f64>,
    /// Set on the last snapshot of a run, after all workers have exited.
    pub finished: bool,
    /// Why the run stopped, set on the last snapshot.
    pub stop_reason: Option<StopReason>,
}

impl ResultsSnapshot {
    /// Builds a snapshot from the merged totals.
    pub(crate) fn new(
        totals: &Totals,
        elapsed: Duration,
        previous: Option<&ResultsSnapshot>,
        stdev_target: f64,
        time_limit: Option<Duration>,
    ) -> Self {
        let tally = &totals.tally;
        let players = tally.players();
        let hands = tally.hands();
        let evaluations = tally.evaluations();
        let time = elapsed.as_secs_f64();

        let (prev_hands, prev_evaluations, prev_time) = previous
            .map(|p| (p.hands, p.evaluations, p.time))
            .unwrap_or_default();

        let interval_time = time - prev_time;
        let interval_evaluations = evaluations.saturating_sub(prev_evaluations);

        let stdev = totals.stdev();

        let stdev_progress = (totals.batches >= MIN_BATCHES).then(|| {
            if stdev > 0.0 {
                (stdev_target / stdev).powi(2)
            } else {
                1.0
            }
        });

        let time_progress = time_limit
            .filter(|t| !t.is_zero())
            .map(|t| time / t.as_secs_f64());

        let progress = match (stdev_progress, time_progress) {
            (Some(s), Some(t)) => Some(s.max(t)),
            (s, t) => s.or(t),
        }
        .map(|p| p.clamp(0.0, 1.0));

        Self {
            players,
            equity: tally.equities(),
            wins: (0..players).map(|s| tally.wins(s)).collect(),
            ties: (0..players).map(|s| tally.ties(s)).collect(),
            wins_by_mask: tally.wins_by_mask().to_vec(),
            hands,
            evaluations,
            interval_hands: hands.saturating_sub(prev_hands),
            time,
            interval_time,
            speed: rate(evaluations, time),
            interval_speed: rate(interval_evaluations, interval_time),
            stdev,
            stdev_per_hand: stdev * (hands as f64).sqrt(),
            batches: totals.batches,
            progress,
            finished: false,
            stop_reason: None,
        }
    }

    /// Marks this as the last snapshot of a run.
    pub(crate) fn finish(mut self, reason: StopReason) -> Self {
        self.finished = true;
        self.stop_reason = Some(reason);
        if reason != StopReason::UserStopped {
            self.progress = Some(1.0);
        }

        self
    }

    /// The seat win and tie rates as fractions of the completed trials.
    pub fn equity_split(&self, seat: usize) -> Equity {
        if self.hands == 0 || seat >= self.players {
            return Equity::default();
        }

        let hands = self.hands as f64;
        Equity {
            win: self.wins[seat] as f64 / hands,
            tie: self.ties[seat] as f64 / hands,
        }
    }
}

fn rate(count: u64, secs: f64) -> f64 {
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}

/// Win and tie probabilities, the lose probability is what is left.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equity {
    /// The probability of winning alone.
    pub win: f64,
    /// The probability of splitting the pot.
    pub tie: f64,
}

impl Equity {
    /// Creates a new equity.
    pub fn new(win: f64, tie: f64) -> Self {
        Self { win, tie }
    }

    /// The probability of losing.
    pub fn lose(&self) -> f64 {
        (1.0 - self.win - self.tie).max(0.0)
    }

    /// Win probability plus half the tie probability.
    pub fn win_half_tie(&self) -> f64 {
        self.win + self.tie / 2.0
    }

    /// The expected amount won from a pot.
    pub fn won(&self, pot: f64) -> f64 {
        self.win * pot + self.tie * pot / 2.0
    }

    /// Euclidean distance between the win, lose and tie probabilities.
    pub fn distance(&self, other: &Equity) -> f64 {
        let dw = self.win - other.win;
        let dl = self.lose() - other.lose();
        let dt = self.tie - other.tie;
        (dw * dw + dl * dl + dt * dt).sqrt()
    }
}

impl fmt::Display for Equity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "w:{:.4}/l:{:.4}/t:{:.4}",
            self.win,
            self.lose(),
            self.tie
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregate::Aggregate, tally::Tally};

    fn totals(batches: &[&[usize]]) -> Totals {
        let agg = Aggregate::new(2);
        for masks in batches {
            let mut t = Tally::new(2);
            masks.iter().for_each(|&m| t.record(m));
            agg.merge(&t);
        }
        agg.totals()
    }

    #[test]
    fn snapshot_counters() {
        let totals = totals(&[&[1, 1, 2, 3], &[1, 2, 2, 3]]);
        let s = ResultsSnapshot::new(&totals, Duration::from_secs(2), None, 1e-3, None);

        assert_eq!(s.players, 2);
        assert_eq!(s.hands, 8);
        assert_eq!(s.evaluations, 16);
        assert_eq!(s.wins, [3, 3]);
        assert_eq!(s.ties, [2, 2]);
        assert_eq!(s.wins_by_mask, [0, 3, 3, 2]);
        assert_eq!(s.interval_hands, 8);
        assert_eq!(s.speed, 8.0);
        assert_eq!(s.batches, 2);
        assert!((s.equity.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(!s.finished);

        let split = s.equity_split(0);
        assert_eq!(split, Equity::new(3.0 / 8.0, 2.0 / 8.0));
        assert!((split.win_half_tie() - s.equity[0]).abs() < 1e-12);
        assert_eq!(s.equity_split(5), Equity::default());
    }

    #[test]
    fn snapshot_intervals() {
        let first = ResultsSnapshot::new(&totals(&[&[1]]), Duration::from_secs(1), None, 1e-3, None);
        let totals = totals(&[&[1], &[2, 2, 2]]);
        let s = ResultsSnapshot::new(&totals, Duration::from_secs(3), Some(&first), 1e-3, None);

        assert_eq!(s.interval_hands, 3);
        assert_eq!(s.interval_time, 2.0);
        assert_eq!(s.interval_speed, 3.0);
    }

    #[test]
    fn snapshot_progress() {
        let one = totals(&[&[1]]);
        let s = ResultsSnapshot::new(&one, Duration::from_secs(1), None, 1e-3, None);
        assert_eq!(s.progress, None);
        assert!(s.stdev.is_infinite());

        let s = ResultsSnapshot::new(
            &one,
            Duration::from_secs(1),
            None,
            1e-3,
            Some(Duration::from_secs(4)),
        );
        assert_eq!(s.progress, Some(0.25));

        // Not enough batches for a standard error.
        let few = vec![&[1][..]; MIN_BATCHES as usize - 1];
        let s = ResultsSnapshot::new(&totals(&few), Duration::ZERO, None, 1e-3, None);
        assert!(s.stdev.is_infinite());
        assert_eq!(s.progress, None);

        // Converged batches.
        let all = vec![&[1][..]; MIN_BATCHES as usize];
        let s = ResultsSnapshot::new(&totals(&all), Duration::ZERO, None, 1e-3, None);
        assert_eq!(s.stdev, 0.0);
        assert_eq!(s.progress, Some(1.0));

        let s = s.finish(StopReason::Converged);
        assert!(s.finished);
        assert_eq!(s.stop_reason, Some(StopReason::Converged));
    }

    #[test]
    fn equity_display() {
        let e = Equity::new(0.55247, 0.0028184);
        assert_eq!(e.to_string(), "w:0.5525/l:0.4447/t:0.0028");
        assert!((e.won(100.0) - 55.38792).abs() < 1e-9);
        assert_eq!(e.distance(&e), 0.0);

        let lose = Equity::new(0.0, 0.0);
        assert_eq!(lose.lose(), 1.0);
        assert!((lose.distance(&Equity::new(1.0, 0.0)) - 2f64.sqrt()).abs() < 1e-12);
    }
}
