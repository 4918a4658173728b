mod grid;
pub mod labeling;
mod point;
mod session;
mod shapes;
mod tetromino;
mod tetromino_generators;
mod tile;

use std::{fmt, time::Duration};

pub use grid::{Grid, Resolution, Row};
pub use point::Point;
pub use session::{Session, SessionView};
pub use shapes::{Shape, ShapeInfo};
pub use tetromino::{Channel, MoveThrottle, Pace, Tetromino, TileMatrix};
pub use tetromino_generators::TetrominoGenerator;
pub use tile::{Color, Tile, TileKind};

pub type GameTime = Duration;
pub type FeedbackEvents = Vec<(GameTime, Feedback)>;

#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GameMode {
    Classic,
    Merge2048,
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Extreme,
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Left,
    Right,
    Down,
    /// Only used internally to push a rotated piece back above the floor.
    Up,
}

/// Decoded player input for a single tick.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    MoveLeft,
    MoveRight,
    SoftDrop,
    HardDrop,
    Rotate,
    Idle,
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SoundEffect {
    Move,
    Rotate,
    Lock,
    Clear,
    Merge,
}

/// Events for the audio and render collaborators, in the order they happened.
#[derive(Eq, PartialEq, Clone, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Feedback {
    Sound(SoundEffect),
    PieceLocked {
        shape: Shape,
        cells: Vec<Point>,
    },
    /// Rows are the indices before removal, lowest first.
    LinesCleared {
        rows: Vec<usize>,
        points: u32,
    },
    TilesMerged {
        at: Point,
        number: u32,
        points: u32,
    },
    TileDropped {
        from: Point,
        to: Point,
    },
    Reached2048,
    GameOver {
        score: u32,
    },
}

#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameConfig {
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub grid_height: usize,
    pub grid_width: usize,
    pub preview_count: usize,
    pub horizontal_delay: Duration,
    pub soft_drop_delay: Duration,
    pub tetromino_generator: TetrominoGenerator,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum ConfigError {
    #[error("a {height}x{width} grid is smaller than the 4x4 minimum")]
    GridTooSmall { height: usize, width: usize },
    #[error("difficulty {0} is outside 0..=3")]
    InvalidDifficulty(u8),
    #[error("at least one upcoming tetromino must be previewed")]
    NoPreview,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum SessionError {
    #[error("the game has already ended")]
    GameEnded,
    #[error("the game is paused")]
    Paused,
    #[error("update at {now:?} lies before the current game time {game_time:?}")]
    TimeReversed { now: GameTime, game_time: GameTime },
}

impl Difficulty {
    pub const fn level(&self) -> u8 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Normal => 1,
            Difficulty::Hard => 2,
            Difficulty::Extreme => 3,
        }
    }

    /// Factor applied to every score award.
    pub const fn multiplier(&self) -> u32 {
        self.level() as u32 + 1
    }

    /// Interval between two unassisted gravity steps.
    #[rustfmt::skip]
    pub const fn gravity_delay(&self) -> Duration {
        Duration::from_millis(match self {
            Difficulty::Easy    => 350,
            Difficulty::Normal  => 250,
            Difficulty::Hard    => 125,
            Difficulty::Extreme =>  75,
        })
    }

    pub const fn shows_ghost(&self) -> bool {
        !matches!(self, Difficulty::Extreme)
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Difficulty::Easy,
            1 => Difficulty::Normal,
            2 => Difficulty::Hard,
            3 => Difficulty::Extreme,
            _ => Err(ConfigError::InvalidDifficulty(value))?,
        })
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
            Difficulty::Extreme => "Extreme",
        };
        write!(f, "{name}")
    }
}

impl Direction {
    pub const fn offset(&self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Down => (0, -1),
            Direction::Up => (0, 1),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::Classic,
            difficulty: Difficulty::Normal,
            grid_height: 20,
            grid_width: 12,
            preview_count: 3,
            horizontal_delay: Duration::from_millis(150),
            soft_drop_delay: Duration::from_millis(50),
            tetromino_generator: TetrominoGenerator::uniform(),
        }
    }
}

impl GameConfig {
    pub const MIN_GRID_SIDE: usize = 4;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_height < Self::MIN_GRID_SIDE || self.grid_width < Self::MIN_GRID_SIDE {
            return Err(ConfigError::GridTooSmall {
                height: self.grid_height,
                width: self.grid_width,
            });
        }
        if self.preview_count == 0 {
            return Err(ConfigError::NoPreview);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_levels() {
        for level in 0..=3u8 {
            let difficulty = Difficulty::try_from(level).unwrap();
            assert_eq!(difficulty.level(), level);
            assert_eq!(difficulty.multiplier(), u32::from(level) + 1);
        }
        assert_eq!(
            Difficulty::try_from(4),
            Err(ConfigError::InvalidDifficulty(4))
        );
    }

    #[test]
    fn gravity_speeds_up_with_difficulty() {
        assert_eq!(Difficulty::Easy.gravity_delay(), Duration::from_millis(350));
        assert_eq!(Difficulty::Extreme.gravity_delay(), Duration::from_millis(75));
        assert!(Difficulty::Hard.shows_ghost());
        assert!(!Difficulty::Extreme.shows_ghost());
    }

    #[test]
    fn config_validation() {
        assert_eq!(GameConfig::default().validate(), Ok(()));
        let narrow = GameConfig {
            grid_width: 3,
            ..Default::default()
        };
        assert_eq!(
            narrow.validate(),
            Err(ConfigError::GridTooSmall {
                height: 20,
                width: 3
            })
        );
        let blind = GameConfig {
            preview_count: 0,
            ..Default::default()
        };
        assert_eq!(blind.validate(), Err(ConfigError::NoPreview));
    }
}
