use std::collections::VecDeque;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    Channel, Command, ConfigError, Direction, Feedback, FeedbackEvents, GameConfig, GameTime,
    Grid, MoveThrottle, Pace, SessionError, SoundEffect, Tetromino, TetrominoGenerator,
};

/// One game from the first spawn to game over, driven by [`Session::update`].
#[derive(Debug)]
pub struct Session {
    config: GameConfig,
    grid: Grid,
    active: Option<Tetromino>,
    ghost: Option<Tetromino>,
    preview: VecDeque<Tetromino>,
    generator: TetrominoGenerator,
    rng: StdRng,
    throttle: MoveThrottle,
    paused: bool,
    game_time: GameTime,
    pieces_locked: u32,
    lines_cleared: u32,
    merges: u32,
}

/// Read-only snapshot for a renderer.
#[derive(Clone, Debug)]
pub struct SessionView<'a> {
    pub grid: &'a Grid,
    pub active: Option<&'a Tetromino>,
    pub ghost: Option<&'a Tetromino>,
    /// Upcoming pieces, trimmed and anchored at the origin.
    pub preview: Vec<Tetromino>,
    pub score: u32,
    pub game_over: bool,
    pub reached_2048: bool,
    pub paused: bool,
}

impl Session {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic session: the same seed and commands replay the same game.
    pub fn with_seed(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = Grid::new(
            config.grid_height,
            config.grid_width,
            config.mode,
            config.difficulty,
        );
        let mut session = Session {
            generator: config.tetromino_generator.clone(),
            config,
            grid,
            active: None,
            ghost: None,
            preview: VecDeque::new(),
            rng,
            throttle: MoveThrottle::default(),
            paused: false,
            game_time: GameTime::ZERO,
            pieces_locked: 0,
            lines_cleared: 0,
            merges: 0,
        };
        for _ in 0..session.config.preview_count {
            let tetromino = session.generate();
            session.preview.push_back(tetromino);
        }
        session.spawn();
        log::info!(
            "new {:?} session on {} with a {}x{} grid",
            session.config.mode,
            session.config.difficulty,
            session.config.grid_height,
            session.config.grid_width
        );
        Ok(session)
    }

    fn generate(&mut self) -> Tetromino {
        // SAFETY: Shape generators never run dry.
        let shape = self.generator.with_rng(&mut self.rng).next().unwrap();
        let max_x = self.grid.width() - shape.size();
        let bottom_x = self.rng.gen_range(0..=max_x) as i32;
        Tetromino::new(
            shape,
            self.grid.height(),
            bottom_x,
            self.config.mode,
            &mut self.rng,
        )
    }

    fn spawn(&mut self) {
        let next = self.generate();
        self.preview.push_back(next);
        self.active = self.preview.pop_front();
        self.ghost = None;
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn game_time(&self) -> GameTime {
        self.game_time
    }

    pub fn ended(&self) -> bool {
        self.grid.game_over()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pieces_locked(&self) -> u32 {
        self.pieces_locked
    }

    pub fn lines_cleared(&self) -> u32 {
        self.lines_cleared
    }

    pub fn merges(&self) -> u32 {
        self.merges
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            grid: &self.grid,
            active: self.active.as_ref(),
            ghost: self.ghost.as_ref(),
            preview: self
                .preview
                .iter()
                .map(|tetromino| tetromino.copy(false, Some(0), Some(0), true))
                .collect(),
            score: self.grid.score(),
            game_over: self.grid.game_over(),
            reached_2048: self.grid.reached_2048(),
            paused: self.paused,
        }
    }

    fn advance_to(&mut self, now: GameTime) -> Result<(), SessionError> {
        if self.ended() {
            return Err(SessionError::GameEnded);
        }
        if now < self.game_time {
            return Err(SessionError::TimeReversed {
                now,
                game_time: self.game_time,
            });
        }
        self.game_time = now;
        Ok(())
    }

    pub fn pause(&mut self, now: GameTime) -> Result<(), SessionError> {
        self.advance_to(now)?;
        if !self.paused {
            log::info!("paused at {now:?}");
            self.paused = true;
        }
        Ok(())
    }

    /// Continues the game; the next gravity step is a full interval away.
    pub fn resume(&mut self, now: GameTime) -> Result<(), SessionError> {
        self.advance_to(now)?;
        if self.paused {
            log::info!("resumed at {now:?}");
            self.paused = false;
            self.throttle
                .arm(Channel::Gravity, now, self.config.difficulty.gravity_delay());
        }
        Ok(())
    }

    /// Runs one tick: applies `command`, refreshes the ghost, applies
    /// gravity, then locks, resolves and spawns if the piece has landed.
    pub fn update(&mut self, command: Command, now: GameTime) -> Result<FeedbackEvents, SessionError> {
        if self.paused && !self.ended() {
            return Err(SessionError::Paused);
        }
        self.advance_to(now)?;
        let Some(mut piece) = self.active.take() else {
            return Err(SessionError::GameEnded);
        };
        let mut feedback = Vec::new();
        let mut dropped = false;
        // Input.
        match command {
            Command::MoveLeft | Command::MoveRight => {
                let direction = if command == Command::MoveLeft {
                    Direction::Left
                } else {
                    Direction::Right
                };
                let pace = Pace {
                    now,
                    delay: self.config.horizontal_delay,
                    gravity: false,
                };
                let moved = piece.move_throttled(direction, &self.grid, 1, pace, &mut self.throttle);
                if moved == Some(true) {
                    feedback.push(Feedback::Sound(SoundEffect::Move));
                }
            }
            Command::SoftDrop => {
                let pace = Pace {
                    now,
                    delay: self.config.soft_drop_delay,
                    gravity: false,
                };
                let moved =
                    piece.move_throttled(Direction::Down, &self.grid, 1, pace, &mut self.throttle);
                if moved == Some(true) {
                    self.grid.add_score(1);
                }
            }
            Command::HardDrop => {
                let rows = piece.drop_to_floor(&self.grid);
                self.grid.add_score(2 * rows);
                dropped = true;
            }
            Command::Rotate => {
                if piece.rotate(&self.grid) {
                    feedback.push(Feedback::Sound(SoundEffect::Rotate));
                }
            }
            Command::Idle => {}
        }
        // Ghost.
        self.ghost = self
            .config
            .difficulty
            .shows_ghost()
            .then(|| piece.ghost(&self.grid));
        // Gravity.
        let landed = dropped || {
            let pace = Pace {
                now,
                delay: self.config.difficulty.gravity_delay(),
                gravity: true,
            };
            piece.move_throttled(Direction::Down, &self.grid, 1, pace, &mut self.throttle)
                == Some(false)
        };
        if !landed {
            self.active = Some(piece);
            return Ok(stamp(now, feedback));
        }
        // Lock.
        let shape = piece.shape();
        let cells = piece.positions();
        log::debug!("{shape} locked at {cells:?}");
        feedback.push(Feedback::Sound(SoundEffect::Lock));
        feedback.push(Feedback::PieceLocked { shape, cells });
        self.ghost = None;
        self.pieces_locked += 1;
        if self.grid.update_grid(piece.into_tiles()) {
            let score = self.grid.score();
            log::info!("game over after {} pieces with {score} points", self.pieces_locked);
            feedback.push(Feedback::GameOver { score });
            return Ok(stamp(now, feedback));
        }
        // Resolution.
        let resolution = self.grid.resolve_lock(&mut feedback);
        self.lines_cleared += resolution.lines_cleared as u32;
        self.merges += resolution.merges as u32;
        // Spawn.
        self.spawn();
        Ok(stamp(now, feedback))
    }
}

fn stamp(now: GameTime, feedback: Vec<Feedback>) -> FeedbackEvents {
    feedback.into_iter().map(|event| (now, event)).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{Difficulty, GameMode, Shape};

    fn ms(millis: u64) -> GameTime {
        Duration::from_millis(millis)
    }

    fn session(config: GameConfig) -> Session {
        Session::with_seed(config, 2048).unwrap()
    }

    fn lowest_local_row(shape: Shape) -> u32 {
        shape.cells().iter().map(|cell| cell.y as u32).min().unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = GameConfig {
            grid_height: 2,
            ..Default::default()
        };
        assert!(matches!(
            Session::new(config),
            Err(ConfigError::GridTooSmall { .. })
        ));
    }

    #[test]
    fn starts_with_a_piece_above_the_grid() {
        let session = session(GameConfig::default());
        let view = session.view();
        let active = view.active.unwrap();
        assert_eq!(active.bottom_left_corner().y, 20);
        let n = active.shape().size() as i32;
        assert!((0..=12 - n).contains(&active.bottom_left_corner().x));
        assert_eq!(view.preview.len(), 3);
        for preview in &view.preview {
            assert_eq!(preview.leftmost(), 0);
            assert_eq!(preview.positions().iter().map(|p| p.y).min(), Some(0));
        }
        assert_eq!(view.score, 0);
        assert!(!view.game_over);
    }

    #[test]
    fn gravity_follows_the_difficulty_delay() {
        let mut session = session(GameConfig {
            difficulty: Difficulty::Easy,
            ..Default::default()
        });
        let start = session.view().active.unwrap().bottom_left_corner();
        session.update(Command::Idle, ms(0)).unwrap();
        let y = |session: &Session| session.view().active.unwrap().bottom_left_corner().y;
        assert_eq!(y(&session), start.y - 1);
        session.update(Command::Idle, ms(350)).unwrap();
        assert_eq!(y(&session), start.y - 1);
        session.update(Command::Idle, ms(351)).unwrap();
        assert_eq!(y(&session), start.y - 2);
    }

    #[test]
    fn hard_drop_locks_and_spawns_from_the_preview() {
        let mut session = session(GameConfig::default());
        let shape = session.view().active.unwrap().shape();
        let next = session.preview[0].shape();
        let events = session.update(Command::HardDrop, ms(5)).unwrap();
        assert!(events.iter().all(|(time, _)| *time == ms(5)));
        assert!(events
            .iter()
            .any(|(_, event)| *event == Feedback::Sound(SoundEffect::Lock)));
        assert!(events
            .iter()
            .any(|(_, event)| matches!(event, Feedback::PieceLocked { shape: s, .. } if *s == shape)));
        assert_eq!(session.pieces_locked(), 1);
        assert_eq!(session.view().active.unwrap().shape(), next);
        assert_eq!(session.preview.len(), 3);
        assert_eq!(session.view().score, 2 * (20 + lowest_local_row(shape)));
        assert_eq!(session.grid().occupancy().iter().flatten().filter(|&&o| o).count(), 4);
    }

    #[test]
    fn soft_drop_scores_each_step() {
        let mut session = session(GameConfig::default());
        session.update(Command::SoftDrop, ms(0)).unwrap();
        assert_eq!(session.view().score, 1);
        // Throttled by the soft-drop delay.
        session.update(Command::SoftDrop, ms(30)).unwrap();
        assert_eq!(session.view().score, 1);
        session.update(Command::SoftDrop, ms(51)).unwrap();
        assert_eq!(session.view().score, 2);
    }

    #[test]
    fn horizontal_moves_make_sound() {
        let config = GameConfig {
            grid_width: 20,
            ..Default::default()
        };
        let mut session = session(config);
        let x = session.view().active.unwrap().bottom_left_corner().x;
        let (command, dx) = if x > 0 {
            (Command::MoveLeft, -1)
        } else {
            (Command::MoveRight, 1)
        };
        let events = session.update(command, ms(0)).unwrap();
        assert_eq!(events[0], (ms(0), Feedback::Sound(SoundEffect::Move)));
        assert_eq!(session.view().active.unwrap().bottom_left_corner().x, x + dx);
    }

    #[test]
    fn ghost_depends_on_difficulty() {
        let mut normal = session(GameConfig::default());
        normal.update(Command::Idle, ms(0)).unwrap();
        let ghost = normal.view().ghost.unwrap();
        assert!(ghost.is_ghost());
        assert_eq!(
            ghost.positions().iter().map(|p| p.y).min(),
            Some(0)
        );

        let mut extreme = session(GameConfig {
            difficulty: Difficulty::Extreme,
            ..Default::default()
        });
        extreme.update(Command::Idle, ms(0)).unwrap();
        assert!(extreme.view().ghost.is_none());
    }

    #[test]
    fn paused_sessions_reject_updates() {
        let mut session = session(GameConfig::default());
        session.update(Command::Idle, ms(0)).unwrap();
        session.pause(ms(100)).unwrap();
        assert!(session.is_paused());
        assert_eq!(
            session.update(Command::HardDrop, ms(200)),
            Err(SessionError::Paused)
        );
        assert_eq!(session.pieces_locked(), 0);
        session.resume(ms(1000)).unwrap();
        let y = session.view().active.unwrap().bottom_left_corner().y;
        // Gravity waits a full interval after resuming.
        session.update(Command::Idle, ms(1000)).unwrap();
        assert_eq!(session.view().active.unwrap().bottom_left_corner().y, y);
        session.update(Command::Idle, ms(1251)).unwrap();
        assert_eq!(session.view().active.unwrap().bottom_left_corner().y, y - 1);
    }

    #[test]
    fn time_cannot_go_backwards() {
        let mut session = session(GameConfig::default());
        session.update(Command::Idle, ms(500)).unwrap();
        assert_eq!(
            session.update(Command::Idle, ms(499)),
            Err(SessionError::TimeReversed {
                now: ms(499),
                game_time: ms(500)
            })
        );
    }

    #[test]
    fn stacking_to_the_top_ends_the_game() {
        let mut session = session(GameConfig {
            grid_height: 4,
            grid_width: 4,
            ..Default::default()
        });
        let mut last_events = vec![];
        for tick in 0..1000 {
            match session.update(Command::HardDrop, ms(tick)) {
                Ok(events) => last_events = events,
                Err(error) => {
                    assert_eq!(error, SessionError::GameEnded);
                    break;
                }
            }
        }
        assert!(session.ended());
        assert!(session.view().active.is_none());
        let score = session.view().score;
        assert_eq!(last_events.last(), Some(&(last_events[0].0, Feedback::GameOver { score })));
        assert_eq!(session.update(Command::Idle, ms(5000)), Err(SessionError::GameEnded));
        assert_eq!(session.pause(ms(5000)), Err(SessionError::GameEnded));
    }

    #[test]
    fn numbered_pieces_in_2048_mode() {
        let mut session = session(GameConfig {
            mode: GameMode::Merge2048,
            ..Default::default()
        });
        let active = session.view().active.unwrap().clone();
        assert!(active
            .tiles()
            .all(|tile| matches!(tile.number(), Some(2) | Some(4))));
        session.update(Command::HardDrop, ms(0)).unwrap();
        let settled = session
            .grid()
            .rows()
            .iter()
            .flatten()
            .flatten()
            .count();
        // Merges may have combined tiles, never added any.
        assert!((1..=4).contains(&settled));
        assert!(session
            .grid()
            .rows()
            .iter()
            .flatten()
            .flatten()
            .all(|tile| tile.position.y >= 0 && tile.number().is_some()));
    }
}
