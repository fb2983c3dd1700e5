#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub struct Timer {
    file: &'static str,
    line: u32,
    label: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(file: &'static str, line: u32, label: &'static str) -> Self {
        Self {
            file,
            line,
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!(
            "[{}:{}] {}: time elapsed {:?}",
            self.file,
            self.line,
            self.label,
            self.start.elapsed(),
        );
    }
}

macro_rules! time {
    ($label:expr, $b:block) => {{
        let _timer = $crate::Timer::new(::std::file!(), ::std::line!(), $label);
        $b
    }};
    ($label:expr, $e:expr) => {{
        time!($label, { $e })
    }};
    ($b:block) => {{
        time!("block", $b)
    }};
    ($e:expr) => {{
        time!(::std::stringify!($e), { $e })
    }};
}

mod day7;
mod day9;
mod util;

/// Advent of Code 2020 solvers.
///
/// Each puzzle is its own subcommand taking the input file as its positional
/// argument, e.g. `aoc20 day7 input.txt` or
/// `aoc20 day9 --preamble-length 5 input.txt`.
#[derive(Debug, Parser)]
#[command(name = "aoc20")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log debug events, including timings
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Handy Haversacks: bag containment rules
    Day7 {
        /// File with one bag rule per line
        input_file: PathBuf,
    },

    /// Encoding Error: XMAS number sequence
    Day9 {
        /// File with one number per line
        input_file: PathBuf,

        /// Count of trailing numbers each number is checked against
        #[arg(long, default_value_t = day9::DEFAULT_PREAMBLE_LEN)]
        preamble_length: usize,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run_day7(input_file: &Path) -> Result<()> {
    let input = util::read_input(input_file)?;
    let answer = day7::solve(&input).context("Failed to solve bag rules")?;

    println!("TOP LEVEL COLORS: {}", answer.top_level_colors);
    println!("BAG COUNT: {}", answer.bag_count);

    Ok(())
}

fn run_day9(input_file: &Path, preamble_length: usize) -> Result<()> {
    let input = util::read_input(input_file)?;
    let answer = day9::solve(&input, preamble_length).context("Failed to solve XMAS sequence")?;

    println!("MISMATCH: {}", answer.mismatch);
    println!("WEAKNESS: {}", answer.weakness);

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);
    debug!(?cli, "parsed arguments");

    time!("command", {
        match &cli.command {
            Command::Day7 { input_file } => run_day7(input_file),
            Command::Day9 {
                input_file,
                preamble_length,
            } => run_day9(input_file, *preamble_length),
        }
    })
}
