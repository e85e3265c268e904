// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0
//
// ```bash
// $ cargo r --release --example equity -- -r AhKh -r "QsQd@2,JcJd" -r random -b 2c7h9s
// ```
use anyhow::{Result, bail};
use clap::{Parser, value_parser};
use log::info;
use std::time::Duration;

use riverline_equity::*;

#[derive(Debug, Parser)]
struct Cli {
    /// A player range, `random`, hole cards or weighted hole cards list.
    #[clap(long = "range", short, required = true)]
    ranges: Vec<String>,
    /// The board cards.
    #[clap(long, short, default_value = "")]
    board: String,
    /// The dead cards.
    #[clap(long, short, default_value = "")]
    dead: String,
    /// The number of board cards to simulate to.
    #[clap(long, default_value_t = 5, value_parser = value_parser!(u8).range(0..=5))]
    board_cards: u8,
    /// Stop when the standard error drops below this.
    #[clap(long, short, default_value_t = 5e-5)]
    stdev: f64,
    /// Stop after this many seconds.
    #[clap(long, short)]
    time_limit: Option<f64>,
    /// Worker threads, 0 to use all cores.
    #[clap(long, default_value_t = 0)]
    threads: usize,
    /// Milliseconds between progress reports.
    #[clap(long, default_value_t = 200)]
    interval: u64,
    /// Seed the workers generators.
    #[clap(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let board = parse_card_mask(&cli.board)?;
    let dead = parse_card_mask(&cli.dead)?;

    let ranges = cli
        .ranges
        .iter()
        .map(|r| parse_range(r, board | dead))
        .collect::<Result<Vec<_>, _>>()?;

    let time_limit = match cli.time_limit {
        Some(secs) if !secs.is_finite() || secs < 0.0 => bail!("invalid time limit {secs}"),
        Some(secs) => Some(Duration::from_secs_f64(secs)),
        None => None,
    };

    let config = SimulationConfig {
        board,
        dead,
        board_cards: cli.board_cards as usize,
        stdev_target: cli.stdev,
        threads: cli.threads,
        update_interval: Duration::from_millis(cli.interval.max(1)),
        time_limit,
        seed: cli.seed,
        ..SimulationConfig::new(ranges)
    };

    let calc = EquityCalculator::new();
    calc.start(&config, |r| {
        if !r.finished {
            let progress = r.progress.map(|p| p * 100.0).unwrap_or_default();
            info!(
                "{:>5.1}% hands {:>12} stdev {:.2e} {:>7.2} Meval/s",
                progress,
                r.hands,
                r.stdev,
                r.interval_speed * 1e-6
            );
        }
    })?;

    calc.wait()?;
    let results = calc.results()?;

    println!(
        "{} hands in {:.3}s ({})",
        results.hands,
        results.time,
        results
            .stop_reason
            .map(|r| r.to_string())
            .unwrap_or_default()
    );

    for (seat, range) in config.ranges.iter().enumerate() {
        println!(
            "seat {seat}: {:.4} {} {range}",
            results.equity[seat],
            results.equity_split(seat),
        );
    }

    Ok(())
}
