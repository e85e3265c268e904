// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Riverline cards types.
//!
//! This crate defines the card types used by the equity calculator:
//!
//! ```
//! # use riverline_cards::{Card, Rank, Suit};
//! let ah = Card::new(Rank::Ace, Suit::Hearts);
//! assert_eq!(ah.to_string(), "Ah");
//! ```
//!
//! a [CardMask] type that stores a set of cards in a 64 bits integer, one bit
//! per card, and the parser for card strings made of concatenated rank and suit
//! tokens:
//!
//! ```
//! # use riverline_cards::{parse_card_mask, Card, Rank, Suit};
//! let board = parse_card_mask("AhKd2c").unwrap();
//! assert_eq!(board.count(), 3);
//! assert!(board.contains(Card::new(Rank::King, Suit::Diamonds)));
//! ```
//!
//! and a [Deck] type for iterating and sampling the cards left once some cards
//! have been removed, for example to iterate through all 2 cards hands that do
//! not use the board cards:
//!
//! ```
//! # use riverline_cards::{parse_card_mask, Deck};
//! let board = parse_card_mask("AhKd2c").unwrap();
//! let mut counter = 0;
//! Deck::without(board).for_each(2, |hand| {
//!     assert_eq!(hand.len(), 2);
//!     counter += 1;
//! });
//! assert_eq!(counter, 1_176);
//! ```
#![warn(clippy::all, rust_2018_idioms, missing_docs)]
mod deck;
pub use deck::{Card, Deck, Rank, Suit};

mod mask;
pub use mask::{CardMask, ParseError, parse_card_mask};
