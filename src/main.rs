use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

use connect4_solver::{
    bitboard::BitBoard,
    solver::{analyze_parallel, Solver},
    transposition_table::{TranspositionTable, DEFAULT_LOG_SIZE},
};

#[derive(Parser)]
#[command(name = "connect4-solver")]
#[command(about = "Solves Connect 4 positions given as strings of 1-based column digits, one per line")]
struct Args {
    /// File of positions to solve (default: stdin)
    input: Option<PathBuf>,

    /// Only compute whether the position is a win, draw or loss
    #[arg(short, long)]
    weak: bool,

    /// Print the score of every column instead of the position score
    #[arg(short, long)]
    analyze: bool,

    /// Solve the columns on separate threads with --analyze
    #[arg(short, long, requires = "analyze")]
    parallel: bool,

    /// Transposition table size, as a power of two
    #[arg(long, default_value_t = DEFAULT_LOG_SIZE)]
    log_size: u32,

    /// Show a progress bar on stderr
    #[arg(long)]
    progress: bool,

    /// Increase logging verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let lines = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("could not open {}", path.display()))?;
            BufReader::new(file)
                .lines()
                .collect::<std::io::Result<Vec<_>>>()?
        }
        None => stdin().lock().lines().collect::<std::io::Result<Vec<_>>>()?,
    };

    let progress = if args.progress {
        let progress = ProgressBar::new(lines.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("Solving positions: {bar:40.cyan/blue} {pos}/{len} ~{eta} remaining")
                .progress_chars("█▓▒░  "),
        );
        progress
    } else {
        ProgressBar::hidden()
    };

    let mut solver =
        Solver::with_transposition_table(TranspositionTable::with_log_size(args.log_size)?);
    let stdout = stdout();
    let mut out = stdout.lock();
    let mut solved = 0;

    for line in lines.iter().map(|line| line.trim()) {
        progress.inc(1);
        if line.is_empty() {
            continue;
        }

        let mut board = BitBoard::new();
        let consumed = board.play_sequence(line);
        if consumed != line.chars().count() {
            warn!("Invalid move in line '{}' at move {}", line, consumed + 1);
            continue;
        }

        if args.analyze {
            let scores = if args.parallel {
                analyze_parallel(&board, args.weak, args.log_size)?
            } else {
                solver.reset();
                solver.analyze(&board, args.weak)
            };
            let columns: Vec<String> = scores
                .iter()
                .map(|score| score.map_or_else(|| String::from("-"), |score| score.to_string()))
                .collect();
            writeln!(out, "{} {}", line, columns.join(" "))?;
        } else {
            solver.reset();
            let start_time = Instant::now();
            let score = solver.solve(&board, args.weak);
            let elapsed = start_time.elapsed();
            writeln!(
                out,
                "{} {} {} {}",
                line,
                score,
                solver.node_count(),
                elapsed.as_micros()
            )?;
        }
        solved += 1;
    }

    progress.finish();
    info!("Solved {} of {} positions", solved, lines.len());
    Ok(())
}
