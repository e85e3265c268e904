// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Simulation worker.
use log::debug;
use rand::prelude::*;
use std::{cmp::Ordering, sync::Arc};

use riverline_cards::CardMask;
use riverline_eval::HandValue;

use crate::{
    aggregate::Aggregate,
    calculator::Signal,
    config::{MAX_PLAYERS, RunPlan},
    range::draw_card,
    tally::Tally,
};

/// Attempts to deal the players hole cards before giving up on a trial.
const MAX_ATTEMPTS: usize = 64;

/// A worker that runs trials on its own thread until the run is stopped.
pub(crate) struct Worker {
    id: usize,
    plan: Arc<RunPlan>,
    aggregate: Arc<Aggregate>,
    signal: Arc<Signal>,
    rng: SmallRng,
}

impl Worker {
    pub fn new(
        id: usize,
        plan: Arc<RunPlan>,
        aggregate: Arc<Aggregate>,
        signal: Arc<Signal>,
    ) -> Self {
        let rng = match plan.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(id as u64)),
            None => SmallRng::from_os_rng(),
        };

        Self {
            id,
            plan,
            aggregate,
            signal,
            rng,
        }
    }

    /// Runs batches of trials and merges them until the stop signal is raised.
    pub fn run(mut self) {
        debug!("Worker {} started", self.id);

        let mut tally = Tally::new(self.plan.players());
        let mut holes = [CardMask::EMPTY; MAX_PLAYERS];
        let mut batches = 0u64;

        while !self.signal.is_raised() {
            for _ in 0..self.plan.batch_size {
                self.trial(&mut tally, &mut holes);
            }

            self.aggregate.merge(&tally);
            tally.clear();
            batches += 1;
        }

        debug!("Worker {} exited after {batches} batches", self.id);
    }

    /// Deals and evaluates one trial, a trial whose hole cards cannot be dealt
    /// is not recorded.
    fn trial(&mut self, tally: &mut Tally, holes: &mut [CardMask]) {
        let Some(mut used) = self.deal_holes(holes) else {
            return;
        };

        let plan = &*self.plan;

        let mut board = plan.board;
        for _ in plan.board.count()..plan.board_cards {
            let card = draw_card(&mut self.rng, used);
            board.insert(card);
            used.insert(card);
        }

        let mut best = None;
        let mut winners = 0usize;

        for (seat, hole) in holes[..plan.players()].iter().enumerate() {
            let value = HandValue::eval(board | *hole);
            match best.map(|b: HandValue| value.cmp(&b)) {
                None | Some(Ordering::Greater) => {
                    best = Some(value);
                    winners = 1 << seat;
                }
                Some(Ordering::Equal) => winners |= 1 << seat,
                Some(Ordering::Less) => {}
            }
        }

        tally.record(winners);
    }

    /// Deals hole cards to all seats, returns the used cards mask.
    ///
    /// A collision between constrained seats rejects the whole deal so that
    /// every valid assignment keeps its relative weight.
    fn deal_holes(&mut self, holes: &mut [CardMask]) -> Option<CardMask> {
        let plan = &*self.plan;
        let fixed = plan.board | plan.dead;

        'attempts: for _ in 0..MAX_ATTEMPTS {
            let mut used = fixed;

            for &seat in &plan.order {
                match plan.ranges[seat].sample(&mut self.rng, used) {
                    Some(hole) => {
                        holes[seat] = hole.mask();
                        used |= hole.mask();
                    }
                    None => continue 'attempts,
                }
            }

            return Some(used);
        }

        None
    }
}
