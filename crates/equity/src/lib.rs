// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Riverline Poker Monte Carlo equity calculator.
//!
//! The calculator estimates the equity of a set of players ranges given the
//! board and dead cards. Each worker thread deals random hole cards consistent
//! with the players ranges and completes the board, evaluates all hands and
//! counts the trial winners in a local [Tally] that is merged into a shared
//! aggregate once per batch. A monitor thread calls a progress callback every
//! update interval and stops the run when the standard error of the first seat
//! equity drops below a target or a time limit elapses.
//!
//! For the common case of a hero hand against random opponents use the
//! blocking functions:
//!
//! ```no_run
//! # use riverline_equity::*;
//! let equity = compute_equity("7c7d", "", "", 2, 5, 1e-4).unwrap();
//! assert!(equity > 0.5);
//!
//! let split = compute_equity_with_draw_split("7c7d", "2h8d9c", "", 3, 5, 1e-4).unwrap();
//! println!("{split}");
//! ```
//!
//! Ranges are `random`, a pair of hole cards or a list of weighted pairs:
//!
//! ```
//! # use riverline_equity::*;
//! let range = parse_range("AhKh@2,QsQd,JcJd@0.5", CardMask::EMPTY).unwrap();
//! assert_eq!(range.candidate_count(CardMask::EMPTY), 3);
//!
//! let range = parse_range("random", "AhKd".parse().unwrap()).unwrap();
//! assert_eq!(range.candidate_count(CardMask::EMPTY), 1_225);
//! ```
#![warn(clippy::all, rust_2018_idioms, missing_docs)]

mod aggregate;
mod worker;

pub mod binding;
pub use binding::{
    BindingOptions, compute_equity, compute_equity_split_with_options,
    compute_equity_with_draw_split, compute_equity_with_options, hand_equity,
};

mod calculator;
pub use calculator::{EquityCalculator, RunState, StopHandle};

mod config;
pub use config::{MAX_BOARD_CARDS, MAX_PLAYERS, SimulationConfig};

mod error;
pub use error::{EquityError, ParseError};

mod range;
pub use range::{CardRange, Candidates, HoleCards, WeightedCombos, parse_range};

mod results;
pub use results::{Equity, ResultsSnapshot, StopReason};

mod tally;
pub use tally::Tally;

// Reexport cards types.
pub use riverline_cards::{Card, CardMask, parse_card_mask};
