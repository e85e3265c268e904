// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Simulation configuration and validation.
use log::{debug, warn};
use std::{num::NonZeroUsize, thread, time::Duration};

use riverline_cards::{CardMask, Deck};

use crate::{
    error::EquityError,
    range::{CardRange, HoleCards},
};

/// The maximum number of players.
pub const MAX_PLAYERS: usize = 10;

/// The maximum number of board cards.
pub const MAX_BOARD_CARDS: usize = 5;

/// Search steps used to check that the constrained ranges can be dealt.
const FEASIBILITY_BUDGET: usize = 200_000;

/// The simulation configuration.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// The players ranges, the range index is the player seat.
    pub ranges: Vec<CardRange>,
    /// The board cards already dealt.
    pub board: CardMask,
    /// Cards removed from the deck.
    pub dead: CardMask,
    /// The number of board cards to simulate to.
    pub board_cards: usize,
    /// Stop when the standard error of the first seat equity drops below this.
    pub stdev_target: f64,
    /// Worker threads, 0 to use the available parallelism.
    pub threads: usize,
    /// Time between progress callbacks.
    pub update_interval: Duration,
    /// Stop after this time if the simulation has not converged.
    pub time_limit: Option<Duration>,
    /// Trials each worker runs between checks of the stop flag.
    pub batch_size: usize,
    /// Seed for the workers generators, `None` to seed from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ranges: Vec::new(),
            board: CardMask::EMPTY,
            dead: CardMask::EMPTY,
            board_cards: MAX_BOARD_CARDS,
            stdev_target: 5e-5,
            threads: 0,
            update_interval: Duration::from_millis(200),
            time_limit: None,
            batch_size: 4096,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Creates a configuration for the given ranges with default parameters.
    pub fn new(ranges: impl IntoIterator<Item = CardRange>) -> Self {
        Self {
            ranges: ranges.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Checks the configuration and returns the plan used by a run.
    pub(crate) fn validate(&self) -> Result<RunPlan, EquityError> {
        self.check().inspect_err(|e| debug!("Invalid configuration: {e}"))
    }

    fn check(&self) -> Result<RunPlan, EquityError> {
        let players = self.ranges.len();
        if !(1..=MAX_PLAYERS).contains(&players) {
            return Err(EquityError::config(format!(
                "players must be between 1 and {MAX_PLAYERS}, got {players}"
            )));
        }

        if self.board.overlaps(self.dead) {
            return Err(EquityError::config(format!(
                "board and dead cards overlap: {}",
                self.board & self.dead
            )));
        }

        let dealt = self.board.count();
        if dealt > MAX_BOARD_CARDS {
            return Err(EquityError::config(format!(
                "too many board cards: {}",
                self.board
            )));
        }

        if !(dealt..=MAX_BOARD_CARDS).contains(&self.board_cards) {
            return Err(EquityError::config(format!(
                "board cards target must be between {dealt} and {MAX_BOARD_CARDS}, got {}",
                self.board_cards
            )));
        }

        if !self.stdev_target.is_finite() || self.stdev_target <= 0.0 {
            return Err(EquityError::config(format!(
                "standard error target must be positive, got {}",
                self.stdev_target
            )));
        }

        if self.batch_size == 0 {
            return Err(EquityError::config("batch size must be positive"));
        }

        if self.update_interval.is_zero() {
            return Err(EquityError::config("update interval must be positive"));
        }

        let needed = 2 * players + self.board_cards + self.dead.count();
        if needed > Deck::SIZE {
            return Err(EquityError::config(format!(
                "not enough cards: {needed} cards needed"
            )));
        }

        let excluded = self.board | self.dead;

        // Fixed hole cards must not collide with the board, dead cards or
        // another player fixed cards.
        let mut fixed = CardMask::EMPTY;
        for (seat, range) in self.ranges.iter().enumerate() {
            if let CardRange::Fixed(hole) = range {
                if hole.mask().overlaps(excluded | fixed) {
                    return Err(EquityError::config(format!(
                        "seat {seat} cards {hole} are already used"
                    )));
                }

                fixed |= hole.mask();
            }
        }

        let ranges = self
            .ranges
            .iter()
            .map(|r| r.restrict(excluded))
            .collect::<Vec<_>>();

        for (seat, range) in ranges.iter().enumerate() {
            if range.candidate_count(excluded) == 0 {
                return Err(EquityError::config(format!(
                    "seat {seat} range has no valid hole cards"
                )));
            }
        }

        // Constrained seats are sampled first so that random seats always
        // draw from the cards left over.
        let mut order = (0..players).collect::<Vec<_>>();
        order.sort_by_key(|&seat| ranges[seat].is_random());

        check_feasible(&ranges, excluded)?;

        Ok(RunPlan {
            ranges,
            order,
            board: self.board,
            dead: self.dead,
            board_cards: self.board_cards,
            stdev_target: self.stdev_target,
            threads: resolve_threads(self.threads),
            update_interval: self.update_interval,
            time_limit: self.time_limit,
            batch_size: self.batch_size,
            seed: self.seed,
        })
    }
}

/// The validated and immutable parameters of a run.
#[derive(Debug)]
pub(crate) struct RunPlan {
    /// The ranges restricted to the live cards, indexed by seat.
    pub ranges: Vec<CardRange>,
    /// The order seats are dealt, constrained ranges first.
    pub order: Vec<usize>,
    pub board: CardMask,
    pub dead: CardMask,
    pub board_cards: usize,
    pub stdev_target: f64,
    pub threads: usize,
    pub update_interval: Duration,
    pub time_limit: Option<Duration>,
    pub batch_size: usize,
    pub seed: Option<u64>,
}

impl RunPlan {
    /// The number of players.
    pub fn players(&self) -> usize {
        self.ranges.len()
    }
}

/// Returns the number of workers for a requested count, 0 means all the
/// available parallelism.
pub(crate) fn resolve_threads(requested: usize) -> usize {
    let available = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or_else(|e| {
            warn!("Cannot detect available parallelism, using 1 thread: {e}");
            1
        });

    match requested {
        0 => available,
        n => n.min(available),
    }
}

/// Checks that constrained ranges have at least one disjoint assignment.
fn check_feasible(ranges: &[CardRange], excluded: CardMask) -> Result<(), EquityError> {
    let mut seats = ranges
        .iter()
        .filter(|r| !r.is_random())
        .map(|r| r.candidates(excluded).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    if seats.len() < 2 {
        return Ok(());
    }

    // Fewer candidates first prunes the search early.
    seats.sort_by_key(Vec::len);

    let mut budget = FEASIBILITY_BUDGET;
    match search(&seats, excluded, &mut budget) {
        Some(true) => Ok(()),
        Some(false) => Err(EquityError::config(
            "ranges cannot be dealt without sharing cards",
        )),
        None => {
            warn!("Ranges feasibility search stopped after {FEASIBILITY_BUDGET} steps");
            Ok(())
        }
    }
}

/// Depth first search for a disjoint assignment, `None` if the budget ran out.
fn search(seats: &[Vec<HoleCards>], used: CardMask, budget: &mut usize) -> Option<bool> {
    let Some((candidates, rest)) = seats.split_first() else {
        return Some(true);
    };

    for hole in candidates.iter().filter(|h| !h.mask().overlaps(used)) {
        *budget = budget.checked_sub(1)?;
        if search(rest, used | hole.mask(), budget)? {
            return Some(true);
        }
    }

    Some(false)
}
