// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Hero against random opponents entry points.
//!
//! These functions run a blocking simulation for a hero hand against players
//! that hold any two cards and stop when the standard error drops below the
//! tolerance or when the time limit elapses, whichever comes first.
use std::time::Duration;

use riverline_cards::{CardMask, parse_card_mask};

use crate::{
    EquityCalculator, EquityError, ResultsSnapshot, SimulationConfig,
    range::{CardRange, HoleCards},
    results::Equity,
};

/// The default number of board cards.
pub const DEFAULT_BOARD_CARDS: usize = 5;

/// The default standard error tolerance.
pub const DEFAULT_STDEV_TARGET: f64 = 1e-5;

/// The standard error tolerance of [hand_equity].
pub const HAND_EQUITY_STDEV_TARGET: f64 = 1e-4;

/// The default time limit.
pub const BINDING_TIME_LIMIT: Duration = Duration::from_secs(1);

/// The default time between convergence checks.
pub const BINDING_UPDATE_INTERVAL: Duration = Duration::from_micros(100);

/// Options for the hero equity functions.
#[derive(Debug, Clone)]
pub struct BindingOptions {
    /// The number of board cards to simulate to.
    pub board_cards: usize,
    /// Stop when the standard error drops below this.
    pub stdev_target: f64,
    /// Stop after this time, `None` runs until convergence.
    pub time_limit: Option<Duration>,
    /// Time between convergence checks.
    pub update_interval: Duration,
    /// Worker threads, 0 to use the available parallelism.
    pub threads: usize,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            board_cards: DEFAULT_BOARD_CARDS,
            stdev_target: DEFAULT_STDEV_TARGET,
            time_limit: Some(BINDING_TIME_LIMIT),
            update_interval: BINDING_UPDATE_INTERVAL,
            threads: 0,
        }
    }
}

/// Returns the equity of the hole cards against `players - 1` random hands.
pub fn compute_equity(
    hole: &str,
    board: &str,
    dead: &str,
    players: usize,
    board_cards: usize,
    stdev_target: f64,
) -> Result<f64, EquityError> {
    let options = BindingOptions {
        board_cards,
        stdev_target,
        ..Default::default()
    };

    compute_equity_with_options(hole, board, dead, players, &options)
}

/// Returns the win and tie rates of the hole cards against `players - 1`
/// random hands.
pub fn compute_equity_with_draw_split(
    hole: &str,
    board: &str,
    dead: &str,
    players: usize,
    board_cards: usize,
    stdev_target: f64,
) -> Result<Equity, EquityError> {
    let options = BindingOptions {
        board_cards,
        stdev_target,
        ..Default::default()
    };

    compute_equity_split_with_options(hole, board, dead, players, &options)
}

/// Same as [compute_equity] with explicit options.
pub fn compute_equity_with_options(
    hole: &str,
    board: &str,
    dead: &str,
    players: usize,
    options: &BindingOptions,
) -> Result<f64, EquityError> {
    let results = simulate(&parse_config(hole, board, dead, players)?, options)?;
    Ok(results.equity[0])
}

/// Same as [compute_equity_with_draw_split] with explicit options.
pub fn compute_equity_split_with_options(
    hole: &str,
    board: &str,
    dead: &str,
    players: usize,
    options: &BindingOptions,
) -> Result<Equity, EquityError> {
    let results = simulate(&parse_config(hole, board, dead, players)?, options)?;
    Ok(results.equity_split(0))
}

/// Returns the hole cards win and tie rates against `players - 1` random
/// hands, the run stops at [HAND_EQUITY_STDEV_TARGET] or at the default time
/// limit.
pub fn hand_equity(hole: HoleCards, board: CardMask, players: usize) -> Result<Equity, EquityError> {
    let config = hero_config(hole, board, CardMask::EMPTY, players);
    let results = simulate(&config, &hand_equity_options())?;
    Ok(results.equity_split(0))
}

fn hand_equity_options() -> BindingOptions {
    BindingOptions {
        stdev_target: HAND_EQUITY_STDEV_TARGET,
        ..Default::default()
    }
}

fn parse_config(
    hole: &str,
    board: &str,
    dead: &str,
    players: usize,
) -> Result<SimulationConfig, EquityError> {
    let hole = hole.parse::<HoleCards>()?;
    let board = parse_card_mask(board)?;
    let dead = parse_card_mask(dead)?;
    Ok(hero_config(hole, board, dead, players))
}

fn hero_config(hole: HoleCards, board: CardMask, dead: CardMask, players: usize) -> SimulationConfig {
    let ranges = (0..players).map(|seat| match seat {
        0 => CardRange::Fixed(hole),
        _ => CardRange::RANDOM,
    });

    SimulationConfig {
        board,
        dead,
        ..SimulationConfig::new(ranges)
    }
}

fn simulate(
    config: &SimulationConfig,
    options: &BindingOptions,
) -> Result<ResultsSnapshot, EquityError> {
    let config = SimulationConfig {
        board_cards: options.board_cards,
        stdev_target: options.stdev_target,
        time_limit: options.time_limit,
        update_interval: options.update_interval,
        threads: options.threads,
        ..config.clone()
    };

    let calc = EquityCalculator::new();
    calc.start(&config, |_| {})?;
    calc.wait()?;
    calc.results()
}
