// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0
//
// Preflop equity chart against random hands.
//
// ```bash
// $ cargo r --release --example chart -- --num-players 2
// ```
use anyhow::Result;
use clap::{Parser, value_parser};
use std::time::{Duration, Instant};

use riverline_cards::{Rank, Suit};
use riverline_equity::*;

fn separator() {
    print!("|");
    for _ in 0..13 {
        print!("-----|");
    }
    println!();
}

#[derive(Debug, Parser)]
struct Cli {
    /// The number of opposing players.
    #[clap(long, short, default_value_t = 1, value_parser = value_parser!(u8).range(1..=9))]
    num_players: u8,
    /// Standard error target for each hand.
    #[clap(long, short, default_value_t = 2e-3)]
    stdev: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let options = BindingOptions {
        stdev_target: cli.stdev,
        time_limit: Some(Duration::from_secs(5)),
        update_interval: Duration::from_millis(5),
        ..Default::default()
    };

    separator();

    let now = Instant::now();

    for r1 in Rank::ranks().rev() {
        let mut labels = Vec::with_capacity(13);
        let mut equities = Vec::with_capacity(13);

        for r2 in Rank::ranks().rev() {
            let (c1, c2, label) = if r1 < r2 {
                (Card::new(r2, Suit::Hearts), Card::new(r1, Suit::Spades), format!("{r2}{r1}o"))
            } else if r1 == r2 {
                (Card::new(r1, Suit::Hearts), Card::new(r1, Suit::Spades), format!("{r1}{r1} "))
            } else {
                (Card::new(r1, Suit::Hearts), Card::new(r2, Suit::Hearts), format!("{r1}{r2}s"))
            };

            let hole = format!("{c1}{c2}");
            let players = cli.num_players as usize + 1;
            let equity = compute_equity_with_options(&hole, "", "", players, &options)?;

            labels.push(label);
            equities.push(equity * 100.0);
        }

        print!("|");
        for label in labels {
            print!(" {label} |");
        }
        println!();

        print!("|");
        for equity in &equities {
            print!(" {:2.0}% |", equity.round());
        }
        println!();

        separator();
    }

    println!("Elapsed: {:.3}s", now.elapsed().as_secs_f64());
    Ok(())
}
