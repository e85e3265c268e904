// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Bit mask hand evaluator.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CardMask;

/// Bits available for kickers, each kicker takes 4 bits.
const KICKERS_BITS: u32 = 20;

/// A hand category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HandRank {
    /// High card.
    HighCard = 0,
    /// One pair.
    OnePair,
    /// Two pairs.
    TwoPair,
    /// Three of a kind.
    ThreeOfAKind,
    /// Straight.
    Straight,
    /// Flush.
    Flush,
    /// Full house.
    FullHouse,
    /// Four of a kind.
    FourOfAKind,
    /// Straight flush.
    StraightFlush,
}

impl HandRank {
    /// Returns all categories from the weakest to the strongest.
    pub fn ranks() -> impl DoubleEndedIterator<Item = HandRank> {
        use HandRank::*;
        [
            HighCard,
            OnePair,
            TwoPair,
            ThreeOfAKind,
            Straight,
            Flush,
            FullHouse,
            FourOfAKind,
            StraightFlush,
        ]
        .into_iter()
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandRank::HighCard => "High Card",
            HandRank::OnePair => "One Pair",
            HandRank::TwoPair => "Two Pairs",
            HandRank::ThreeOfAKind => "Three of a Kind",
            HandRank::Straight => "Straight",
            HandRank::Flush => "Flush",
            HandRank::FullHouse => "Full House",
            HandRank::FourOfAKind => "Four of a Kind",
            HandRank::StraightFlush => "Straight Flush",
        };

        f.write_str(name)
    }
}

/// The strength of a hand, a higher value is a better hand and equal values
/// split the pot.
///
/// The value stores the category in the high bits followed by up to five
/// 4-bits kickers, a kicker is the rank index plus one so that a missing
/// kicker sorts lower than a deuce:
///
/// ```text
///   +--------+--------+--------+--------+
///   |xxxxxxxx|xxxxcccc|11112222|33334444|...5555
///   +--------+--------+--------+--------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandValue(u32);

impl HandValue {
    /// Evaluates a hand of up to 7 cards.
    pub fn eval(hand: CardMask) -> HandValue {
        let bits = hand.bits();

        let mut ranks = 0u16;
        let mut suits = [0u16; 4];
        let mut pairs = 0u16;
        let mut trips = 0u16;
        let mut quads = 0u16;

        for r in 0..13 {
            let nibble = ((bits >> (r * 4)) & 0xf) as u16;
            if nibble == 0 {
                continue;
            }

            let bit = 1 << r;
            ranks |= bit;
            for (s, suit) in suits.iter_mut().enumerate() {
                *suit |= ((nibble >> s) & 1) << r;
            }

            match nibble.count_ones() {
                2 => pairs |= bit,
                3 => trips |= bit,
                4 => quads |= bit,
                _ => {}
            }
        }

        let flush = suits.into_iter().find(|s| s.count_ones() >= 5);

        if let Some(high) = flush.and_then(straight_high) {
            return Kickers::new(HandRank::StraightFlush).push(high).value();
        }

        if quads != 0 {
            let quad = highest(quads);
            return Kickers::new(HandRank::FourOfAKind)
                .push(quad)
                .push_top(ranks & !(1 << quad), 1)
                .value();
        }

        if trips != 0 {
            let trip = highest(trips);
            let rest = (trips & !(1 << trip)) | pairs;
            if rest != 0 {
                return Kickers::new(HandRank::FullHouse)
                    .push(trip)
                    .push(highest(rest))
                    .value();
            }
        }

        if let Some(flush) = flush {
            return Kickers::new(HandRank::Flush).push_top(flush, 5).value();
        }

        if let Some(high) = straight_high(ranks) {
            return Kickers::new(HandRank::Straight).push(high).value();
        }

        if trips != 0 {
            let trip = highest(trips);
            return Kickers::new(HandRank::ThreeOfAKind)
                .push(trip)
                .push_top(ranks & !(1 << trip), 2)
                .value();
        }

        if pairs.count_ones() >= 2 {
            let high = highest(pairs);
            let low = highest(pairs & !(1 << high));
            return Kickers::new(HandRank::TwoPair)
                .push(high)
                .push(low)
                .push_top(ranks & !((1 << high) | (1 << low)), 1)
                .value();
        }

        if pairs != 0 {
            let pair = highest(pairs);
            return Kickers::new(HandRank::OnePair)
                .push(pair)
                .push_top(ranks & !(1 << pair), 3)
                .value();
        }

        Kickers::new(HandRank::HighCard).push_top(ranks, 5).value()
    }

    /// Returns the hand category.
    pub fn rank(&self) -> HandRank {
        HandRank::ranks()
            .nth((self.0 >> KICKERS_BITS) as usize)
            .unwrap_or(HandRank::HighCard)
    }

    /// The raw value, greater is better.
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Packs a category and its kickers into a [HandValue].
struct Kickers {
    value: u32,
    shift: u32,
}

impl Kickers {
    #[inline]
    fn new(rank: HandRank) -> Self {
        Self {
            value: (rank as u32) << KICKERS_BITS,
            shift: KICKERS_BITS,
        }
    }

    #[inline]
    fn push(mut self, rank: u8) -> Self {
        self.shift -= 4;
        self.value |= (rank as u32 + 1) << self.shift;
        self
    }

    /// Pushes up to n highest ranks of a rank set in descending order.
    #[inline]
    fn push_top(mut self, mut ranks: u16, n: usize) -> Self {
        for _ in 0..n {
            if ranks == 0 {
                break;
            }

            let high = highest(ranks);
            ranks &= !(1 << high);
            self = self.push(high);
        }

        self
    }

    #[inline]
    fn value(self) -> HandValue {
        HandValue(self.value)
    }
}

/// Returns the index of the highest rank in a non empty rank set.
#[inline]
fn highest(ranks: u16) -> u8 {
    (15 - ranks.leading_zeros()) as u8
}

/// Returns the highest rank of a straight in a rank set.
fn straight_high(ranks: u16) -> Option<u8> {
    // Shift ranks up by one and put the ace in the low position too.
    let s = (ranks << 1) | ((ranks >> 12) & 1);
    let runs = s & (s >> 1) & (s >> 2) & (s >> 3) & (s >> 4);
    if runs == 0 {
        None
    } else {
        // The run starts at bit b so its high card is rank index b + 3.
        Some(highest(runs) + 3)
    }
}
