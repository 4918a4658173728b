mod logger;
mod script;
mod summary;

use std::{io, time::Duration};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tetris2048_engine::{
    Difficulty, GameConfig, GameMode, Session, SessionError, TetrominoGenerator,
};

use script::Step;

/// Replays a scripted command stream against a headless game and prints
/// the final state as JSON.
///
/// Every token on stdin is one tick: L left, R right, D soft drop,
/// H hard drop, U rotate, `.` idle, P toggle pause.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, override_usage = "tetris2048_replay [OPTIONS] < script.txt")]
struct Args {
    /// Game variant.
    #[arg(short, long, value_enum, default_value_t = Mode::Classic)]
    mode: Mode,
    /// Difficulty from 0 (easy) to 3 (extreme).
    #[arg(short, long, default_value_t = 1)]
    difficulty: u8,
    /// How upcoming shapes are dealt.
    #[arg(short, long, value_enum, default_value_t = Generator::Uniform)]
    generator: Generator,
    /// Seed for piece generation; random when omitted.
    #[arg(short, long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 20)]
    height: usize,
    #[arg(long, default_value_t = 12)]
    width: usize,
    /// Game time that passes per token, in milliseconds.
    #[arg(short, long, default_value_t = 40)]
    tick_ms: u64,
    /// Log engine events to stderr (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum Mode {
    Classic,
    #[value(name = "2048")]
    Merge2048,
}

impl From<Mode> for GameMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Classic => GameMode::Classic,
            Mode::Merge2048 => GameMode::Merge2048,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum Generator {
    Uniform,
    Bag,
    Recency,
}

impl From<Generator> for TetrominoGenerator {
    fn from(generator: Generator) -> Self {
        match generator {
            Generator::Uniform => TetrominoGenerator::uniform(),
            Generator::Bag => TetrominoGenerator::bag(),
            Generator::Recency => TetrominoGenerator::recency(),
        }
    }
}

fn replay(session: &mut Session, steps: &[Step], tick: Duration) -> anyhow::Result<()> {
    let mut now = Duration::ZERO;
    for step in steps {
        match *step {
            Step::TogglePause if session.is_paused() => session.resume(now)?,
            Step::TogglePause => session.pause(now)?,
            Step::Input(command) => match session.update(command, now) {
                Ok(events) => {
                    for (time, event) in events {
                        log::debug!("{time:?}: {event:?}");
                    }
                }
                Err(SessionError::Paused) => log::debug!("{command:?} ignored while paused"),
                Err(e) => return Err(e).context("couldn't advance the game"),
            },
        }
        if session.ended() {
            break;
        }
        now += tick;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init(args.verbose).context("couldn't install the logger")?;
    let config = GameConfig {
        mode: args.mode.into(),
        difficulty: Difficulty::try_from(args.difficulty)?,
        grid_height: args.height,
        grid_width: args.width,
        tetromino_generator: args.generator.into(),
        ..Default::default()
    };
    let mut session = match args.seed {
        Some(seed) => Session::with_seed(config, seed),
        None => Session::new(config),
    }
    .context("invalid game configuration")?;
    let input = io::read_to_string(io::stdin()).context("couldn't read the script from stdin")?;
    let steps = script::parse(&input).context("couldn't parse the script")?;
    replay(&mut session, &steps, Duration::from_millis(args.tick_ms))?;
    let summary = summary::Summary::of(&session);
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("couldn't serialize the summary")?
    );
    Ok(())
}
