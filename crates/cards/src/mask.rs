// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Card sets stored as 64 bits masks and card strings parsing.
use serde::{Deserialize, Serialize};
use std::{fmt, ops, str::FromStr};
use thiserror::Error;

use crate::{Card, Deck};

/// Errors returned when parsing cards and ranges.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Unknown rank character.
    #[error("unknown rank '{0}'")]
    Rank(char),
    /// Unknown suit character.
    #[error("unknown suit '{0}'")]
    Suit(char),
    /// A card token or card string has the wrong length.
    #[error("malformed card string '{0}'")]
    Length(String),
    /// A card appears more than once in the same string.
    #[error("duplicate card {0}")]
    Duplicate(Card),
    /// A raw mask has bits outside the 52 cards range.
    #[error("invalid card mask 0x{0:016x}")]
    Mask(u64),
    /// Malformed range text.
    #[error("malformed range '{0}'")]
    Range(String),
    /// A range weight is not a finite positive number.
    #[error("invalid range weight '{0}'")]
    Weight(String),
}

/// A set of cards, bit `i` is set if the card with index `i` is in the set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct CardMask(u64);

impl CardMask {
    /// The empty set.
    pub const EMPTY: CardMask = CardMask(0);

    /// All 52 cards.
    pub const FULL: CardMask = CardMask((1 << Deck::SIZE) - 1);

    /// Creates a mask from raw bits, fails if any bit is outside the deck.
    pub fn from_bits(bits: u64) -> Result<CardMask, ParseError> {
        if bits & !Self::FULL.0 != 0 {
            Err(ParseError::Mask(bits))
        } else {
            Ok(Self(bits))
        }
    }

    /// Creates a mask with a single card.
    #[inline]
    pub const fn from_card(card: Card) -> CardMask {
        Self(card.bit())
    }

    /// The raw mask bits.
    #[inline]
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Checks if the mask contains the given card.
    #[inline]
    pub const fn contains(&self, card: Card) -> bool {
        self.0 & card.bit() != 0
    }

    /// Checks if this mask shares any card with another mask.
    #[inline]
    pub const fn overlaps(&self, other: CardMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Adds a card to the mask.
    #[inline]
    pub fn insert(&mut self, card: Card) {
        self.0 |= card.bit();
    }

    /// The number of cards in the mask.
    #[inline]
    pub const fn count(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Checks if the mask is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates the cards in the mask in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = Card> + use<> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                None
            } else {
                let idx = bits.trailing_zeros() as u8;
                bits &= bits - 1;
                Card::from_index(idx)
            }
        })
    }
}

impl ops::BitOr for CardMask {
    type Output = CardMask;

    fn bitor(self, rhs: CardMask) -> CardMask {
        CardMask(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for CardMask {
    fn bitor_assign(&mut self, rhs: CardMask) {
        self.0 |= rhs.0;
    }
}

impl ops::BitAnd for CardMask {
    type Output = CardMask;

    fn bitand(self, rhs: CardMask) -> CardMask {
        CardMask(self.0 & rhs.0)
    }
}

impl ops::Not for CardMask {
    type Output = CardMask;

    fn not(self) -> CardMask {
        CardMask(!self.0 & Self::FULL.0)
    }
}

impl FromIterator<Card> for CardMask {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |m, c| m | Self::from_card(c))
    }
}

impl fmt::Display for CardMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iter().try_for_each(|c| write!(f, "{c}"))
    }
}

impl FromStr for CardMask {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_card_mask(s)
    }
}

impl TryFrom<u64> for CardMask {
    type Error = ParseError;

    fn try_from(bits: u64) -> Result<Self, Self::Error> {
        Self::from_bits(bits)
    }
}

impl From<CardMask> for u64 {
    fn from(mask: CardMask) -> Self {
        mask.0
    }
}

/// Parses a string of concatenated two characters card tokens into a mask.
///
/// Tokens are a rank (`23456789TJQKA`) followed by a suit (`cdhs`), both case
/// insensitive, whitespace between tokens is ignored and an empty string is
/// the empty mask:
///
/// ```
/// # use riverline_cards::parse_card_mask;
/// let mask = parse_card_mask("Ah Kd 2c").unwrap();
/// assert_eq!(mask.to_string(), "2cKdAh");
/// assert!(parse_card_mask("AhAh").is_err());
/// ```
pub fn parse_card_mask(s: &str) -> Result<CardMask, ParseError> {
    let mut mask = CardMask::EMPTY;
    let mut chars = s.chars().filter(|c| !c.is_ascii_whitespace());

    while let Some(r) = chars.next() {
        let Some(suit) = chars.next() else {
            return Err(ParseError::Length(s.to_string()));
        };

        let card = Card::new(crate::Rank::parse(r)?, crate::Suit::parse(suit)?);
        if mask.contains(card) {
            return Err(ParseError::Duplicate(card));
        }

        mask.insert(card);
    }

    Ok(mask)
}
