// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Riverline Poker hand evaluator.
//!
//! Poker hand evaluator for hands of up to 7 cards stored in a [CardMask]. The
//! evaluator works directly on the mask bits, it builds the set of ranks for
//! each suit and the sets of paired, tripped and quad ranks and derives the hand
//! category and kickers from them with a few bit operations, there are no lookup
//! tables to initialize.
//!
//! To use the evaluator create a mask and use [HandValue] to evaluate the hand
//! and get its rank:
//!
//! ```
//! # use riverline_eval::*;
//! let v1 = HandValue::eval("AhAd7c5s2d".parse().unwrap());
//! let v2 = HandValue::eval("3h4h5h6h7h".parse().unwrap());
//! assert!(v2 > v1);
//! assert_eq!(v1.rank(), HandRank::OnePair);
//! assert_eq!(v2.rank(), HandRank::StraightFlush);
//! ```
#![warn(clippy::all, rust_2018_idioms, missing_docs)]
mod eval;
pub use eval::{HandRank, HandValue};

// Reexport cards types.
pub use riverline_cards::{Card, CardMask, Deck, Rank, Suit};
