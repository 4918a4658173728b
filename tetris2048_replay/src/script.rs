use std::str::FromStr;

use anyhow::bail;
use tetris2048_engine::Command;

/// One tick of a replay script.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    Input(Command),
    TogglePause,
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "L" | "l" => Step::Input(Command::MoveLeft),
            "R" | "r" => Step::Input(Command::MoveRight),
            "D" | "d" => Step::Input(Command::SoftDrop),
            "H" | "h" => Step::Input(Command::HardDrop),
            "U" | "u" => Step::Input(Command::Rotate),
            "." => Step::Input(Command::Idle),
            "P" | "p" => Step::TogglePause,
            _ => bail!("unknown token {s:?}"),
        })
    }
}

/// Splits on whitespace and commas.
pub fn parse(input: &str) -> anyhow::Result<Vec<Step>> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(str::parse)
        .collect()
}
