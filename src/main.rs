//! Headless duoblock runner (default binary).
//!
//! Plays one seeded game without a renderer: the configuration comes from
//! `DUOBLOCK_*` environment variables, every piece is hard-dropped as soon as
//! it falls, and a summary is printed when the game is lost or the cycle
//! limit is reached.
//!
//! Usage: `duoblock [max-cycles]` (default 500). Set `DUOBLOCK_LOG` to
//! `error`, `warn`, `info`, `debug` or `trace` for engine logs on stderr.

use anyhow::{anyhow, Context, Result};
use log::{info, LevelFilter, Log, Metadata, Record};

use duoblock::engine::{GameBuilder, GameConfig};
use duoblock::types::{GameAction, State};

const FRAME_SECONDS: f64 = 1.0 / 60.0;
const DEFAULT_MAX_CYCLES: u64 = 500;
/// Frames without a new cycle before the runner gives up
const STALL_FRAMES: u32 = 60 * 60;

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging() {
    let level = std::env::var("DUOBLOCK_LOG")
        .ok()
        .and_then(|s| s.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn parse_max_cycles() -> Result<u64> {
    match std::env::args().nth(1) {
        None => Ok(DEFAULT_MAX_CYCLES),
        Some(arg) => arg
            .parse::<u64>()
            .map_err(|_| anyhow!("invalid max-cycles value: {}", arg)),
    }
}

fn main() -> Result<()> {
    init_logging();
    let max_cycles = parse_max_cycles()?;

    let config = GameConfig::from_env();
    let mut game = GameBuilder::new(config)
        .build()
        .context("building game")?;
    game.start();
    info!("running up to {} cycles", max_cycles);

    let mut dropped_in_cycle = None;
    let mut last_cycle = 0;
    let mut stalled = 0u32;
    while !game.is_lost() && game.cycle() < max_cycles {
        if game.current_state() == State::Falling && dropped_in_cycle != Some(game.cycle()) {
            game.queue_action(GameAction::Drop);
            dropped_in_cycle = Some(game.cycle());
        }
        game.advance(FRAME_SECONDS).context("advancing game")?;
        game.acknowledge_events();

        if game.cycle() == last_cycle {
            stalled += 1;
            if stalled >= STALL_FRAMES {
                return Err(anyhow!("no progress past cycle {}", last_cycle));
            }
        } else {
            last_cycle = game.cycle();
            stalled = 0;
        }
    }

    let outcome = if game.is_lost() { "lost" } else { "cycle limit" };
    println!(
        "{} after {} cycles: score {}, rows {}, level {}",
        outcome,
        game.cycle(),
        game.score(),
        game.rows_cleared(),
        game.level()
    );
    for line in game.grid().to_ascii() {
        println!("{}", line);
    }
    Ok(())
}
