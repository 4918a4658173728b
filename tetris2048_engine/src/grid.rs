use crate::{
    labeling::{Labeling, FLOOR_LABEL},
    Difficulty, Feedback, GameMode, SoundEffect, Tile,
};

/// One grid row, indexed by column.
pub type Row = Vec<Option<Tile>>;

/// What resolving a locked piece did to the grid.
#[derive(Eq, PartialEq, Clone, Copy, Hash, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    pub lines_cleared: usize,
    pub merges: usize,
    pub points: u32,
}

/// The playfield of settled tiles. Row 0 is the bottom row.
#[derive(Eq, PartialEq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid {
    height: usize,
    width: usize,
    cells: Vec<Row>,
    mode: GameMode,
    difficulty: Difficulty,
    score: u32,
    game_over: bool,
    reached_2048: bool,
}

impl Grid {
    pub fn new(height: usize, width: usize, mode: GameMode, difficulty: Difficulty) -> Self {
        Self {
            height,
            width,
            cells: vec![vec![None; width]; height],
            mode,
            difficulty,
            score: 0,
            game_over: false,
            reached_2048: false,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    pub fn reached_2048(&self) -> bool {
        self.reached_2048
    }

    pub fn rows(&self) -> &[Row] {
        &self.cells
    }

    pub fn tile(&self, row: usize, col: usize) -> Option<&Tile> {
        self.cells.get(row)?.get(col)?.as_ref()
    }

    /// Adds already multiplied points.
    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// Stores a tile at its own position, replacing whatever was there.
    pub fn place_tile(&mut self, tile: Tile) {
        let (row, col) = (tile.position.y, tile.position.x);
        assert!(
            self.is_inside(row, col),
            "tile at {} is outside the grid",
            tile.position
        );
        self.cells[row as usize][col as usize] = Some(tile);
    }

    pub fn is_inside(&self, row: i32, col: i32) -> bool {
        (0..self.height as i32).contains(&row) && (0..self.width as i32).contains(&col)
    }

    /// Cells outside the grid are never occupied.
    pub fn is_occupied(&self, row: i32, col: i32) -> bool {
        self.is_inside(row, col) && self.cells[row as usize][col as usize].is_some()
    }

    /// Places a locked piece's tiles. Any tile left above the grid ends the
    /// game; it is dropped rather than stored. Returns the game-over flag.
    pub fn update_grid(&mut self, tiles: impl IntoIterator<Item = Tile>) -> bool {
        for tile in tiles {
            if self.is_inside(tile.position.y, tile.position.x) {
                self.place_tile(tile);
            } else {
                log::debug!("tile locked outside the grid at {}", tile.position);
                self.game_over = true;
            }
        }
        self.game_over
    }

    pub fn has_line_empty_cell(&self, row: usize) -> bool {
        self.cells[row].iter().any(Option::is_none)
    }

    /// Indices of completely filled rows, lowest first.
    pub fn full_lines(&self) -> Vec<usize> {
        (0..self.height)
            .filter(|&row| !self.has_line_empty_cell(row))
            .collect()
    }

    /// Removes every full row, shifting the rows above down and scoring the
    /// clear. Returns the number of rows removed.
    pub fn delete_full_lines(&mut self, feedback: &mut Vec<Feedback>) -> usize {
        let full = self.full_lines();
        if full.is_empty() {
            return 0;
        }
        let multiplier = self.difficulty.multiplier();
        let points = match self.mode {
            GameMode::Classic => classic_line_points(full.len()) * multiplier,
            GameMode::Merge2048 => {
                let sum: u32 = full
                    .iter()
                    .flat_map(|&row| self.cells[row].iter().flatten())
                    .filter_map(Tile::number)
                    .sum();
                sum * multiplier
            }
        };
        for (removed, &row) in full.iter().enumerate() {
            let index = row - removed;
            self.cells.remove(index);
            self.cells.push(vec![None; self.width]);
            for tile in self.cells[index..].iter_mut().flatten().flatten() {
                tile.move_by(0, -1);
            }
        }
        self.add_score(points);
        log::debug!("cleared rows {full:?} for {points} points");
        let lines = full.len();
        feedback.push(Feedback::Sound(SoundEffect::Clear));
        feedback.push(Feedback::LinesCleared { rows: full, points });
        lines
    }

    /// Merges vertically adjacent equal numbers and lets floating tiles fall,
    /// repeating until nothing is left floating. Returns the number of merges.
    /// Classic grids are left untouched.
    pub fn check_line_chain_merge(&mut self, feedback: &mut Vec<Feedback>) -> usize {
        if self.mode != GameMode::Merge2048 {
            return 0;
        }
        let mut merges = 0;
        loop {
            for col in (0..self.width).rev() {
                while let Some(row) = self.mergeable_pair(col) {
                    self.merge(row, col, feedback);
                    merges += 1;
                }
            }
            if !self.move_floating_tiles(feedback) {
                break;
            }
        }
        merges
    }

    fn mergeable_pair(&self, col: usize) -> Option<usize> {
        let number = |row: usize| self.cells[row][col].and_then(|tile| tile.number());
        (0..self.height.saturating_sub(1)).find(|&row| match (number(row), number(row + 1)) {
            (Some(lower), Some(upper)) => lower == upper,
            _ => false,
        })
    }

    /// Doubles the tile at `row` and erases the one above it.
    fn merge(&mut self, row: usize, col: usize, feedback: &mut Vec<Feedback>) {
        self.cells[row + 1][col] = None;
        let Some(lower) = self.cells[row][col].as_mut() else {
            return;
        };
        let number = lower.number().unwrap_or(0) * 2;
        lower.change_number(number);
        let at = lower.position;
        let points = number * self.difficulty.multiplier();
        self.add_score(points);
        log::debug!("merged into {number} at {at} for {points} points");
        feedback.push(Feedback::Sound(SoundEffect::Merge));
        feedback.push(Feedback::TilesMerged { at, number, points });
        if number == 2048 && !self.reached_2048 {
            self.reached_2048 = true;
            log::debug!("reached 2048");
            feedback.push(Feedback::Reached2048);
        }
    }

    /// Drops every tile that has no 4-connected path to the floor as far down
    /// its column as it goes, lowest tiles first. Returns whether any tile
    /// was floating before the drop.
    pub fn move_floating_tiles(&mut self, feedback: &mut Vec<Feedback>) -> bool {
        let labeling = Labeling::of(&self.occupancy());
        if log::log_enabled!(log::Level::Debug) {
            for (label, cells) in labeling.components() {
                if label != FLOOR_LABEL {
                    log::debug!("group {label} floats at {cells:?}");
                }
            }
        }
        for row in 0..self.height {
            for col in 0..self.width {
                if labeling.is_floating(row, col) {
                    self.move_tile_down(row, col, feedback);
                }
            }
        }
        labeling.has_floating()
    }

    /// Moves a single tile down until it rests on the floor or another tile.
    /// Returns the row it ends up in.
    pub fn move_tile_down(&mut self, row: usize, col: usize, feedback: &mut Vec<Feedback>) -> usize {
        if self.cells[row][col].is_none() {
            return row;
        }
        let mut target = row;
        while target > 0 && self.cells[target - 1][col].is_none() {
            target -= 1;
        }
        if target == row {
            return row;
        }
        if let Some(mut tile) = self.cells[row][col].take() {
            let from = tile.position;
            tile.move_by(0, target as i32 - row as i32);
            let to = tile.position;
            self.cells[target][col] = Some(tile);
            log::debug!("floating tile dropped from {from} to {to}");
            feedback.push(Feedback::TileDropped { from, to });
        }
        target
    }

    /// Occupancy map, `[row][col]`.
    pub fn occupancy(&self) -> Vec<Vec<bool>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(Option::is_some).collect())
            .collect()
    }

    /// Number of connected groups of settled tiles plus the floor.
    pub fn component_count(&self) -> usize {
        Labeling::of(&self.occupancy()).component_count()
    }

    /// Clears lines, and in 2048 mode alternates merge chains with line
    /// clears until a clear awards nothing.
    pub fn resolve_lock(&mut self, feedback: &mut Vec<Feedback>) -> Resolution {
        let score_before = self.score;
        let mut resolution = Resolution::default();
        match self.mode {
            GameMode::Classic => resolution.lines_cleared = self.delete_full_lines(feedback),
            GameMode::Merge2048 => loop {
                resolution.merges += self.check_line_chain_merge(feedback);
                let before_clear = self.score;
                resolution.lines_cleared += self.delete_full_lines(feedback);
                if self.score == before_clear {
                    break;
                }
            },
        }
        resolution.points = self.score - score_before;
        resolution
    }
}

#[rustfmt::skip]
const fn classic_line_points(lines: usize) -> u32 {
    match lines {
        0 =>    0,
        1 =>   40,
        2 =>  100,
        3 =>  300,
        _ => 1200,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point, Shape};

    /// Builds a grid from rows drawn top first. Tokens are `.` for empty,
    /// a number for a 2048 tile or a shape letter for a classic tile.
    fn grid(mode: GameMode, difficulty: Difficulty, rows: &[&str]) -> Grid {
        let height = rows.len();
        let width = rows[0].split_whitespace().count();
        let mut grid = Grid::new(height, width, mode, difficulty);
        for (i, line) in rows.iter().enumerate() {
            let row = (height - 1 - i) as i32;
            for (col, token) in line.split_whitespace().enumerate() {
                let position = Point::new(col as i32, row);
                if token == "." {
                    continue;
                }
                let tile = match token.parse::<u32>() {
                    Ok(number) => Tile::numbered(position, number),
                    Err(_) => Tile::classic(position, token.parse::<Shape>().unwrap()),
                };
                grid.place_tile(tile);
            }
        }
        grid
    }

    /// Renders the grid back in the format `grid` reads.
    fn draw(grid: &Grid) -> Vec<String> {
        grid.rows()
            .iter()
            .rev()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell.map(|tile| tile.kind()) {
                        None => ".".to_owned(),
                        Some(crate::TileKind::Number(n)) => n.to_string(),
                        Some(crate::TileKind::Shape(shape)) => shape.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    fn positions_in_sync(grid: &Grid) -> bool {
        grid.rows().iter().enumerate().all(|(row, cells)| {
            cells.iter().enumerate().all(|(col, cell)| {
                cell.map_or(true, |tile| tile.position == Point::new(col as i32, row as i32))
            })
        })
    }

    #[test]
    fn bounds_and_occupancy() {
        let grid = grid(GameMode::Classic, Difficulty::Easy, &[". . . .", ". T . .", ". . . ."]);
        assert!(grid.is_inside(0, 0));
        assert!(grid.is_inside(2, 3));
        assert!(!grid.is_inside(3, 0));
        assert!(!grid.is_inside(0, 4));
        assert!(!grid.is_inside(-1, 0));
        assert!(grid.is_occupied(1, 1));
        assert!(!grid.is_occupied(1, 2));
        assert!(!grid.is_occupied(7, 1));
        assert!(!grid.is_occupied(-1, 1));
    }

    #[test]
    fn update_grid_places_tiles_and_detects_overflow() {
        let mut grid = Grid::new(4, 4, GameMode::Classic, Difficulty::Easy);
        let tiles = [(0, 0), (1, 0)].map(|(x, y)| Tile::classic(Point::new(x, y), Shape::O));
        assert!(!grid.update_grid(tiles));
        assert!(grid.is_occupied(0, 1));

        let overflowing = [(2, 3), (2, 4)].map(|(x, y)| Tile::classic(Point::new(x, y), Shape::I));
        assert!(grid.update_grid(overflowing));
        assert!(grid.game_over());
        assert!(grid.is_occupied(3, 2));
        assert_eq!(grid.rows().len(), 4);
    }

    #[test]
    fn classic_clear_compensates_indices() {
        let mut grid = grid(
            GameMode::Classic,
            Difficulty::Easy,
            &[
                ". . . .",
                ". . L .",
                "I I I I",
                "Z . . Z",
                "T T T T",
            ],
        );
        let mut feedback = vec![];
        assert_eq!(grid.delete_full_lines(&mut feedback), 2);
        assert_eq!(
            draw(&grid),
            vec![". . . .", ". . . .", ". . . .", ". . L .", "Z . . Z"]
        );
        assert!(positions_in_sync(&grid));
        assert_eq!(grid.score(), 100);
        assert_eq!(
            feedback,
            vec![
                Feedback::Sound(SoundEffect::Clear),
                Feedback::LinesCleared {
                    rows: vec![0, 2],
                    points: 100
                },
            ]
        );
    }

    #[test]
    fn classic_points_per_line_count() {
        for (lines, points) in [(1, 40), (2, 100), (3, 300), (4, 1200), (5, 1200)] {
            let mut grid = Grid::new(6, 4, GameMode::Classic, Difficulty::Hard);
            for row in 0..lines {
                for col in 0..4 {
                    grid.place_tile(Tile::classic(Point::new(col, row), Shape::J));
                }
            }
            assert_eq!(grid.delete_full_lines(&mut vec![]), lines as usize);
            assert_eq!(grid.score(), points * 3, "{lines} lines");
            assert!(grid.rows().iter().flatten().all(Option::is_none));
        }
    }

    #[test]
    fn no_full_lines_changes_nothing() {
        let mut grid = grid(GameMode::Classic, Difficulty::Easy, &["S . S S"]);
        let before = grid.clone();
        let mut feedback = vec![];
        assert_eq!(grid.delete_full_lines(&mut feedback), 0);
        assert_eq!(grid, before);
        assert!(feedback.is_empty());
    }

    #[test]
    fn numbered_clear_scores_the_row_sum() {
        let mut grid = grid(
            GameMode::Merge2048,
            Difficulty::Normal,
            &[". 8 . .", "2 4 8 16"],
        );
        assert_eq!(grid.delete_full_lines(&mut vec![]), 1);
        assert_eq!(grid.score(), 30 * 2);
        assert_eq!(draw(&grid), vec![". . . .", ". 8 . ."]);
        assert!(positions_in_sync(&grid));
    }

    #[test]
    fn merge_doubles_the_lower_tile() {
        let mut grid = grid(
            GameMode::Merge2048,
            Difficulty::Easy,
            &[". . . .", ". 2 . .", ". 2 . ."],
        );
        let mut feedback = vec![];
        assert_eq!(grid.check_line_chain_merge(&mut feedback), 1);
        assert_eq!(draw(&grid), vec![". . . .", ". . . .", ". 4 . ."]);
        assert_eq!(grid.score(), 4);
        assert_eq!(
            feedback,
            vec![
                Feedback::Sound(SoundEffect::Merge),
                Feedback::TilesMerged {
                    at: Point::new(1, 0),
                    number: 4,
                    points: 4
                },
            ]
        );
    }

    #[test]
    fn merges_chain_down_a_column() {
        let mut grid = grid(
            GameMode::Merge2048,
            Difficulty::Normal,
            &[". 2 .", ". 2 .", ". 4 ."],
        );
        assert_eq!(grid.check_line_chain_merge(&mut vec![]), 2);
        assert_eq!(draw(&grid), vec![". . .", ". . .", ". 8 ."]);
        assert_eq!(grid.score(), (4 + 8) * 2);
    }

    #[test]
    fn floating_tiles_fall_after_merge() {
        let mut grid = grid(
            GameMode::Merge2048,
            Difficulty::Easy,
            &["8 . .", "2 . .", "2 . 4"],
        );
        let mut feedback = vec![];
        assert_eq!(grid.check_line_chain_merge(&mut feedback), 1);
        assert_eq!(draw(&grid), vec![". . .", "8 . .", "4 . 4"]);
        assert!(positions_in_sync(&grid));
        assert!(feedback.contains(&Feedback::TileDropped {
            from: Point::new(0, 2),
            to: Point::new(0, 1),
        }));
        assert_eq!(grid.component_count(), 1);
    }

    #[test]
    fn dropped_tiles_can_merge_again() {
        let mut grid = grid(
            GameMode::Merge2048,
            Difficulty::Easy,
            &["4 .", "2 .", "2 8"],
        );
        assert_eq!(grid.check_line_chain_merge(&mut vec![]), 2);
        assert_eq!(draw(&grid), vec![". .", ". .", "8 8"]);
        assert_eq!(grid.score(), 4 + 8);
    }

    #[test]
    fn side_supported_tiles_stay_put() {
        let mut grid = grid(
            GameMode::Merge2048,
            Difficulty::Easy,
            &["8 16 .", "4 . .", "2 . ."],
        );
        let before = grid.clone();
        assert!(!grid.move_floating_tiles(&mut vec![]));
        assert_eq!(grid, before);
    }

    #[test]
    fn floating_group_lands_tile_by_tile() {
        let mut grid = grid(
            GameMode::Merge2048,
            Difficulty::Easy,
            &["2 4 .", ". 8 .", ". . .", "16 . 32"],
        );
        assert_eq!(grid.component_count(), 2);
        assert!(grid.move_floating_tiles(&mut vec![]));
        assert_eq!(draw(&grid), vec![". . .", ". . .", "2 4 .", "16 8 32"]);
        assert!(positions_in_sync(&grid));
    }

    #[test]
    fn reaching_2048_is_reported_once() {
        let mut grid = grid(
            GameMode::Merge2048,
            Difficulty::Easy,
            &["1024 1024", "1024 1024"],
        );
        let mut feedback = vec![];
        assert_eq!(grid.check_line_chain_merge(&mut feedback), 2);
        assert!(grid.reached_2048());
        let reached = feedback
            .iter()
            .filter(|event| **event == Feedback::Reached2048)
            .count();
        assert_eq!(reached, 1);
        assert_eq!(grid.score(), 4096);
    }

    #[test]
    fn classic_tiles_never_merge() {
        let mut grid = grid(
            GameMode::Classic,
            Difficulty::Easy,
            &[". T . .", ". . . .", "O . . .", "O . . ."],
        );
        let before = grid.clone();
        let mut feedback = vec![];
        assert_eq!(grid.check_line_chain_merge(&mut feedback), 0);
        assert_eq!(grid, before);
        assert!(feedback.is_empty());
    }

    #[test]
    fn move_tile_down_stops_on_support() {
        let mut grid = grid(
            GameMode::Merge2048,
            Difficulty::Easy,
            &["2 .", ". .", ". .", "8 ."],
        );
        let mut feedback = vec![];
        assert_eq!(grid.move_tile_down(3, 0, &mut feedback), 1);
        assert_eq!(grid.move_tile_down(1, 0, &mut feedback), 1);
        assert_eq!(grid.move_tile_down(2, 1, &mut feedback), 2);
        assert_eq!(feedback.len(), 1);
        assert!(positions_in_sync(&grid));
    }

    #[test]
    fn merge_completing_a_line_is_cleared() {
        let mut grid = grid(
            GameMode::Merge2048,
            Difficulty::Easy,
            &[". 2 . .", "4 2 8 16", "2 4 4 4"],
        );
        let mut feedback = vec![];
        let resolution = grid.resolve_lock(&mut feedback);
        // Column 1 merges twice: 2+2 then the new 4 with the 4 below it.
        assert_eq!(resolution.merges, 2);
        assert_eq!(resolution.lines_cleared, 1);
        assert_eq!(draw(&grid), vec![". . . .", ". . . .", "4 . 8 16"]);
        let merge_points = 4 + 8;
        let clear_points = 2 + 8 + 4 + 4;
        assert_eq!(resolution.points, merge_points + clear_points);
        assert_eq!(grid.score(), resolution.points);
    }

    #[test]
    fn classic_resolution_only_clears() {
        let mut grid = grid(GameMode::Classic, Difficulty::Easy, &["I .", "S S"]);
        let resolution = grid.resolve_lock(&mut vec![]);
        assert_eq!(
            resolution,
            Resolution {
                lines_cleared: 1,
                merges: 0,
                points: 40
            }
        );
        assert_eq!(draw(&grid), vec![". .", "I ."]);
    }
}
