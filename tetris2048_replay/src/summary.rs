use serde::Serialize;
use tetris2048_engine::{Difficulty, GameMode, Grid, Session, TileKind};

#[derive(Serialize, Debug)]
pub struct Summary {
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub score: u32,
    pub game_over: bool,
    pub reached_2048: bool,
    pub pieces_locked: u32,
    pub lines_cleared: u32,
    pub merges: u32,
    /// Top row first, one space-separated token per cell.
    pub board: Vec<String>,
}

impl Summary {
    pub fn of(session: &Session) -> Self {
        let view = session.view();
        Self {
            mode: session.config().mode,
            difficulty: session.config().difficulty,
            score: view.score,
            game_over: view.game_over,
            reached_2048: view.reached_2048,
            pieces_locked: session.pieces_locked(),
            lines_cleared: session.lines_cleared(),
            merges: session.merges(),
            board: board(view.grid),
        }
    }
}

fn board(grid: &Grid) -> Vec<String> {
    grid.rows()
        .iter()
        .rev()
        .map(|row| {
            row.iter()
                .map(|cell| match cell.map(|tile| tile.kind()) {
                    None => ".".to_owned(),
                    Some(TileKind::Shape(shape)) => shape.to_string(),
                    Some(TileKind::Number(number)) => number.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}
