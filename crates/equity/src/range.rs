// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Players hole cards ranges.
//!
//! A range is either a fixed pair of hole cards, a list of weighted pairs or
//! the `random` range that holds any two cards not used by the board, the dead
//! cards or the other players.
use ahash::HashSet;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use riverline_cards::{Card, CardMask, Deck, ParseError, parse_card_mask};

/// Two distinct hole cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HoleCards {
    high: Card,
    low: Card,
}

impl HoleCards {
    /// Creates hole cards from two cards, returns `None` if the cards are equal.
    pub fn new(c1: Card, c2: Card) -> Option<Self> {
        match c1.cmp(&c2) {
            std::cmp::Ordering::Greater => Some(Self { high: c1, low: c2 }),
            std::cmp::Ordering::Less => Some(Self { high: c2, low: c1 }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The two cards, highest index first.
    pub fn cards(&self) -> [Card; 2] {
        [self.high, self.low]
    }

    /// The cards mask.
    #[inline]
    pub fn mask(&self) -> CardMask {
        CardMask::from_card(self.high) | CardMask::from_card(self.low)
    }
}

impl fmt::Display for HoleCards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.high, self.low)
    }
}

impl FromStr for HoleCards {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mask = parse_card_mask(s)?;
        let mut cards = mask.iter();
        match (cards.next(), cards.next(), cards.next()) {
            (Some(c1), Some(c2), None) => {
                Self::new(c1, c2).ok_or_else(|| ParseError::Range(s.to_string()))
            }
            _ => Err(ParseError::Range(s.to_string())),
        }
    }
}

/// A list of hole cards with relative weights.
///
/// The weights are stored as a normalized cumulative distribution that is used
/// to sample a pair with probability proportional to its weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedCombos {
    combos: Vec<HoleCards>,
    weights: Vec<f64>,
    cumulative: Vec<f64>,
}

impl WeightedCombos {
    /// Creates a weighted list, weights must be finite and positive.
    pub fn new(items: impl IntoIterator<Item = (HoleCards, f64)>) -> Self {
        let (combos, weights): (Vec<_>, Vec<_>) = items.into_iter().unzip();
        let total = weights.iter().sum::<f64>();

        let mut acc = 0.0;
        let mut cumulative = weights
            .iter()
            .map(|w| {
                acc += w;
                acc / total
            })
            .collect::<Vec<_>>();

        // Avoid rounding leaving a gap at the top of the distribution.
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }

        Self {
            combos,
            weights,
            cumulative,
        }
    }

    /// Returns a list without the pairs that use any of the excluded cards.
    pub fn restrict(&self, excluded: CardMask) -> Self {
        Self::new(
            self.iter_weights()
                .filter(|(h, _)| !h.mask().overlaps(excluded)),
        )
    }

    /// The number of pairs in the list.
    pub fn len(&self) -> usize {
        self.combos.len()
    }

    /// Checks if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.combos.is_empty()
    }

    /// The pairs in the list.
    pub fn combos(&self) -> &[HoleCards] {
        &self.combos
    }

    /// Iterates the pairs with their relative weights.
    pub fn iter_weights(&self) -> impl Iterator<Item = (HoleCards, f64)> + '_ {
        self.combos.iter().copied().zip(self.weights.iter().copied())
    }

    /// Returns the pair for a uniform sample `u` in `[0, 1)`.
    #[inline]
    fn pick(&self, u: f64) -> Option<HoleCards> {
        let idx = self.cumulative.partition_point(|&c| c <= u);
        self.combos
            .get(idx.min(self.combos.len().saturating_sub(1)))
            .copied()
    }
}

/// A player hole cards range.
#[derive(Debug, Clone, PartialEq)]
pub enum CardRange {
    /// A single pair of hole cards.
    Fixed(HoleCards),
    /// A list of weighted pairs.
    Weighted(WeightedCombos),
    /// Any two cards that are not in the given mask or used by someone else.
    Random(CardMask),
}

impl CardRange {
    /// The `random` range with no excluded cards.
    pub const RANDOM: CardRange = CardRange::Random(CardMask::EMPTY);

    /// Returns a lazy iterator through the pairs that do not use the excluded
    /// cards, the iterator can be cloned to restart the sequence.
    pub fn candidates(&self, excluded: CardMask) -> Candidates<'_> {
        let (source, excluded) = match self {
            CardRange::Fixed(hole) => (Source::Fixed(Some(*hole)), excluded),
            CardRange::Weighted(list) => (Source::Weighted(list.combos().iter()), excluded),
            CardRange::Random(own) => (Source::Random(PairCursor::default()), excluded | *own),
        };

        Candidates { source, excluded }
    }

    /// Counts the pairs that do not use the excluded cards.
    pub fn candidate_count(&self, excluded: CardMask) -> usize {
        match self {
            CardRange::Random(own) => {
                let n = (!(excluded | *own)).count();
                n * n.saturating_sub(1) / 2
            }
            _ => self.candidates(excluded).count(),
        }
    }

    /// Returns this range without the pairs that use the excluded cards.
    pub fn restrict(&self, excluded: CardMask) -> CardRange {
        match self {
            CardRange::Fixed(hole) => CardRange::Fixed(*hole),
            CardRange::Weighted(list) => CardRange::Weighted(list.restrict(excluded)),
            CardRange::Random(own) => CardRange::Random(*own | excluded),
        }
    }

    /// Checks if this is the `random` range.
    pub fn is_random(&self) -> bool {
        matches!(self, CardRange::Random(_))
    }

    /// Samples a pair that does not use any of the `used` cards.
    ///
    /// Fixed and weighted ranges return `None` if the sampled pair collides with
    /// the used cards so that the caller can reject the whole deal, a random
    /// range always returns a pair if at least two cards are free.
    #[inline]
    pub(crate) fn sample<R: Rng>(&self, rng: &mut R, used: CardMask) -> Option<HoleCards> {
        let hole = match self {
            CardRange::Fixed(hole) => *hole,
            CardRange::Weighted(list) => list.pick(rng.random::<f64>())?,
            CardRange::Random(own) => {
                let used = used | *own;
                if (!used).count() < 2 {
                    return None;
                }

                let c1 = draw_card(rng, used);
                let c2 = draw_card(rng, used | CardMask::from_card(c1));
                return HoleCards::new(c1, c2);
            }
        };

        (!hole.mask().overlaps(used)).then_some(hole)
    }
}

impl fmt::Display for CardRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardRange::Fixed(hole) => write!(f, "{hole}"),
            CardRange::Weighted(list) => {
                for (idx, (hole, weight)) in list.iter_weights().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{hole}@{weight}")?;
                }
                Ok(())
            }
            CardRange::Random(_) => f.write_str("random"),
        }
    }
}

impl FromStr for CardRange {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_range(s, CardMask::EMPTY)
    }
}

/// Draws a card uniformly from the cards not in `used`, there must be at least
/// one free card.
#[inline]
pub(crate) fn draw_card<R: Rng>(rng: &mut R, used: CardMask) -> Card {
    loop {
        let idx = rng.random_range(0..Deck::SIZE as u8);
        if let Some(card) = Card::from_index(idx) {
            if !used.contains(card) {
                return card;
            }
        }
    }
}

/// Parses a range string.
///
/// The string is either `random` (any case) for any two cards, a literal pair
/// like `AhKh`, or a comma separated list of pairs each with an optional
/// relative weight `AhKh@2,QsQd,JcJd@0.5` (the default weight is 1).
///
/// Pairs that use any of the excluded cards are removed from weighted lists, a
/// fixed pair is kept as it is so that a collision can be reported when the
/// simulation starts.
pub fn parse_range(text: &str, excluded: CardMask) -> Result<CardRange, ParseError> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("random") {
        return Ok(CardRange::Random(excluded));
    }

    if text.is_empty() {
        return Err(ParseError::Range(text.to_string()));
    }

    let mut seen = HashSet::default();
    let mut items = Vec::new();
    let mut weighted = false;

    for token in text.split(',') {
        let (cards, weight) = match token.split_once('@') {
            Some((cards, weight)) => {
                weighted = true;
                (cards, parse_weight(weight)?)
            }
            None => (token, 1.0),
        };

        let hole = cards.trim().parse::<HoleCards>()?;
        if !seen.insert(hole) {
            return Err(ParseError::Range(text.to_string()));
        }

        items.push((hole, weight));
    }

    match items.as_slice() {
        [(hole, _)] if !weighted => Ok(CardRange::Fixed(*hole)),
        _ => Ok(CardRange::Weighted(
            WeightedCombos::new(items).restrict(excluded),
        )),
    }
}

fn parse_weight(text: &str) -> Result<f64, ParseError> {
    match text.trim().parse::<f64>() {
        Ok(w) if w.is_finite() && w > 0.0 => Ok(w),
        _ => Err(ParseError::Weight(text.to_string())),
    }
}

/// Lazy iterator through the pairs of a range, see [CardRange::candidates].
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    source: Source<'a>,
    excluded: CardMask,
}

#[derive(Debug, Clone)]
enum Source<'a> {
    Fixed(Option<HoleCards>),
    Weighted(std::slice::Iter<'a, HoleCards>),
    Random(PairCursor),
}

impl Iterator for Candidates<'_> {
    type Item = HoleCards;

    fn next(&mut self) -> Option<HoleCards> {
        let excluded = self.excluded;
        match &mut self.source {
            Source::Fixed(hole) => hole.take().filter(|h| !h.mask().overlaps(excluded)),
            Source::Weighted(iter) => iter.find(|h| !h.mask().overlaps(excluded)).copied(),
            Source::Random(cursor) => cursor.next_free(excluded),
        }
    }
}

/// Position of the next `(first, second)` pair of card indices with
/// `first < second` in the enumeration of all two cards hands.
#[derive(Debug, Clone)]
struct PairCursor {
    first: u8,
    second: u8,
}

impl Default for PairCursor {
    fn default() -> Self {
        Self {
            first: 0,
            second: 1,
        }
    }
}

impl PairCursor {
    fn next_free(&mut self, excluded: CardMask) -> Option<HoleCards> {
        let last = Deck::SIZE as u8;

        while self.first + 1 < last {
            if self.second >= last {
                self.first += 1;
                self.second = self.first + 1;
                continue;
            }

            let c1 = Card::from_index(self.first)?;
            if excluded.contains(c1) {
                self.second = last;
                continue;
            }

            let c2 = Card::from_index(self.second)?;
            self.second += 1;

            if !excluded.contains(c2) {
                return HoleCards::new(c1, c2);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(s: &str) -> CardMask {
        parse_card_mask(s).unwrap()
    }

    #[test]
    fn hole_cards() {
        let h: HoleCards = "KhAh".parse().unwrap();
        assert_eq!(h, "AhKh".parse().unwrap());
        assert_eq!(h.to_string(), "AhKh");
        assert_eq!(h.mask(), mask("AhKh"));

        assert!("Ah".parse::<HoleCards>().is_err());
        assert!("AhKhQh".parse::<HoleCards>().is_err());
        assert!(matches!("AhAh".parse::<HoleCards>(), Err(ParseError::Duplicate(_))));
    }

    #[test]
    fn parse_fixed_and_random() {
        let r = parse_range("AhKh", CardMask::EMPTY).unwrap();
        assert_eq!(r, CardRange::Fixed("AhKh".parse().unwrap()));

        let r = parse_range("  Random ", mask("2c")).unwrap();
        assert_eq!(r, CardRange::Random(mask("2c")));
        assert!(r.is_random());

        // Fixed pairs are kept even if they collide with the excluded cards.
        let r = parse_range("AhKh", mask("Ah")).unwrap();
        assert_eq!(r.candidate_count(mask("Ah")), 0);
    }

    #[test]
    fn parse_weighted() {
        let r = parse_range("AhKh@3, QsQd ,JcJd@0.5", CardMask::EMPTY).unwrap();
        let CardRange::Weighted(list) = &r else {
            panic!("expected weighted range");
        };

        assert_eq!(list.len(), 3);
        assert_eq!(
            list.iter_weights().map(|(_, w)| w).collect::<Vec<_>>(),
            [3.0, 1.0, 0.5]
        );
        assert_eq!(list.cumulative.last(), Some(&1.0));
        assert!((list.cumulative[0] - 3.0 / 4.5).abs() < 1e-12);

        // Excluded cards drop combos.
        let r = parse_range("AhKh@3,QsQd,JcJd@0.5", mask("Qd")).unwrap();
        assert_eq!(r.candidate_count(CardMask::EMPTY), 2);

        // A single weighted pair is still a list.
        let r = parse_range("AhKh@2", CardMask::EMPTY).unwrap();
        assert!(matches!(r, CardRange::Weighted(_)));
    }

    #[test]
    fn parse_range_errors() {
        assert!(matches!(parse_range("", CardMask::EMPTY), Err(ParseError::Range(_))));
        assert!(matches!(parse_range("AhKh,", CardMask::EMPTY), Err(ParseError::Range(_))));
        assert!(matches!(parse_range("AhKx", CardMask::EMPTY), Err(ParseError::Suit('x'))));
        assert!(matches!(parse_range("AhKh@0", CardMask::EMPTY), Err(ParseError::Weight(_))));
        assert!(matches!(parse_range("AhKh@-1", CardMask::EMPTY), Err(ParseError::Weight(_))));
        assert!(matches!(parse_range("AhKh@x", CardMask::EMPTY), Err(ParseError::Weight(_))));
        assert!(matches!(parse_range("AhKh,KhAh", CardMask::EMPTY), Err(ParseError::Range(_))));
        assert!(matches!(parse_range("AK", CardMask::EMPTY), Err(ParseError::Suit('K'))));
    }

    #[test]
    fn random_candidates() {
        let r = CardRange::RANDOM;
        assert_eq!(r.candidates(CardMask::EMPTY).count(), 1_326);
        assert_eq!(r.candidate_count(CardMask::EMPTY), 1_326);

        let excluded = mask("AhKd2c");
        let mut seen = HashSet::default();
        for hole in r.candidates(excluded) {
            assert!(!hole.mask().overlaps(excluded));
            assert!(seen.insert(hole));
        }
        assert_eq!(seen.len(), 1_176);
        assert_eq!(r.candidate_count(excluded), 1_176);

        // Restartable.
        let iter = r.candidates(excluded);
        assert_eq!(iter.clone().count(), iter.count());

        // The range own exclusions are applied too.
        let r = CardRange::Random(mask("As"));
        assert_eq!(r.candidate_count(CardMask::EMPTY), 1_275);
        assert_eq!(r.candidates(CardMask::EMPTY).count(), 1_275);
        assert_eq!(r.candidate_count(!mask("AsKsQs")), 1);
        assert_eq!(r.candidates(!mask("AsKsQs")).count(), 1);
    }

    #[test]
    fn sample_respects_used_cards() {
        let mut rng = SmallRng::seed_from_u64(7);
        let used = mask("AhKhQhJhTh9h");

        let r = CardRange::RANDOM;
        for _ in 0..1_000 {
            let hole = r.sample(&mut rng, used).unwrap();
            assert!(!hole.mask().overlaps(used));
        }

        let fixed = CardRange::Fixed("AhAd".parse().unwrap());
        assert!(fixed.sample(&mut rng, used).is_none());
        assert!(fixed.sample(&mut rng, CardMask::EMPTY).is_some());
    }

    #[test]
    fn weighted_sampling_follows_weights() {
        let mut rng = SmallRng::seed_from_u64(11);
        let r = parse_range("AhKh@3,QsQd@1", CardMask::EMPTY).unwrap();
        let ak = "AhKh".parse::<HoleCards>().unwrap();

        let n = 40_000;
        let hits = (0..n)
            .filter(|_| r.sample(&mut rng, CardMask::EMPTY) == Some(ak))
            .count();

        let freq = hits as f64 / n as f64;
        assert!((freq - 0.75).abs() < 0.015, "freq={freq}");
    }

    #[test]
    fn range_display() {
        assert_eq!(CardRange::RANDOM.to_string(), "random");
        assert_eq!(parse_range("KhAh", CardMask::EMPTY).unwrap().to_string(), "AhKh");
        assert_eq!(
            parse_range("AhKh@2,QsQd", CardMask::EMPTY).unwrap().to_string(),
            "AhKh@2,QsQd@1"
        );
    }
}
