use std::time::Duration;

use rand::Rng;

use crate::{Direction, GameMode, GameTime, Grid, Point, Shape, Tile};

/// Local tile layout of a tetromino, indexed `[y][x]` with `y = 0` the bottom row
/// of the bounding box.
pub type TileMatrix = Vec<Vec<Option<Tile>>>;

/// Rate-limited movement kinds. Player soft drops and unassisted gravity
/// are limited independently.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    Left,
    Right,
    SoftDrop,
    Gravity,
}

/// Per-channel "available again at" instants.
#[derive(Eq, PartialEq, Clone, Copy, Hash, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MoveThrottle {
    available_at: [Option<GameTime>; 4],
}

/// Timing of a throttled move request.
#[derive(Eq, PartialEq, Clone, Copy, Hash, Debug)]
pub struct Pace {
    pub now: GameTime,
    pub delay: Duration,
    /// Whether a downward move is unassisted gravity rather than a soft drop.
    pub gravity: bool,
}

#[derive(Eq, PartialEq, Clone, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tetromino {
    shape: Shape,
    bottom_left_corner: Point,
    tiles: TileMatrix,
    column_count: usize,
    row_count: usize,
    leftmost: i32,
    ghost: bool,
}

impl Channel {
    pub fn of(direction: Direction, gravity: bool) -> Option<Channel> {
        match direction {
            Direction::Left => Some(Channel::Left),
            Direction::Right => Some(Channel::Right),
            Direction::Down if gravity => Some(Channel::Gravity),
            Direction::Down => Some(Channel::SoftDrop),
            Direction::Up => None,
        }
    }

    const fn index(&self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 1,
            Channel::SoftDrop => 2,
            Channel::Gravity => 3,
        }
    }
}

impl MoveThrottle {
    pub fn is_ready(&self, channel: Channel, now: GameTime) -> bool {
        self.available_at[channel.index()].map_or(true, |available_at| now > available_at)
    }

    pub fn arm(&mut self, channel: Channel, now: GameTime, delay: Duration) {
        self.available_at[channel.index()] = Some(now + delay);
    }

    pub fn available_at(&self, channel: Channel) -> Option<GameTime> {
        self.available_at[channel.index()]
    }
}

impl Tetromino {
    /// A freshly generated piece whose bounding box sits on top of the grid.
    pub fn new(
        shape: Shape,
        grid_height: usize,
        bottom_x: i32,
        mode: GameMode,
        rng: &mut impl Rng,
    ) -> Self {
        // Grid heights are validated to be tiny compared to `i32::MAX`.
        Self::at(shape, Point::new(bottom_x, grid_height as i32), mode, rng)
    }

    pub fn at(shape: Shape, bottom_left_corner: Point, mode: GameMode, rng: &mut impl Rng) -> Self {
        Self::from_cells(shape, bottom_left_corner, |position| {
            Tile::spawn(position, mode, shape, rng)
        })
    }

    /// A 2048-mode piece with fixed numbers, assigned in shape-table order.
    pub fn numbered(shape: Shape, bottom_left_corner: Point, numbers: [u32; 4]) -> Self {
        let mut numbers = numbers.into_iter();
        Self::from_cells(shape, bottom_left_corner, |position| {
            Tile::numbered(position, numbers.next().unwrap_or(2))
        })
    }

    fn from_cells(
        shape: Shape,
        bottom_left_corner: Point,
        mut make_tile: impl FnMut(Point) -> Tile,
    ) -> Self {
        let n = shape.size();
        let mut tiles = vec![vec![None; n]; n];
        for cell in shape.cells() {
            tiles[cell.y as usize][cell.x as usize] = Some(make_tile(bottom_left_corner + cell));
        }
        let mut tetromino = Self {
            shape,
            bottom_left_corner,
            tiles,
            column_count: 0,
            row_count: 0,
            leftmost: 0,
            ghost: false,
        };
        tetromino.update_extent();
        tetromino
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn bottom_left_corner(&self) -> Point {
        self.bottom_left_corner
    }

    pub fn matrix(&self) -> &TileMatrix {
        &self.tiles
    }

    /// Number of distinct columns the tiles occupy.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Number of distinct rows the tiles occupy.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Absolute column of the leftmost tile.
    pub fn leftmost(&self) -> i32 {
        self.leftmost
    }

    pub fn is_ghost(&self) -> bool {
        self.ghost
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().flatten().flatten()
    }

    fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut().flatten().flatten()
    }

    /// Absolute tile positions, bottom row first.
    pub fn positions(&self) -> Vec<Point> {
        self.tiles().map(|tile| tile.position).collect()
    }

    /// Occupied local cells relative to the bottom-left corner.
    pub fn local_cells(&self) -> Vec<Point> {
        self.tiles
            .iter()
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, tile)| tile.is_some())
                    .map(move |(x, _)| Point::new(x as i32, y as i32))
            })
            .collect()
    }

    /// Gives up the tiles, e.g. to hand them to the grid when locking.
    pub fn into_tiles(self) -> impl Iterator<Item = Tile> {
        self.tiles.into_iter().flatten().flatten()
    }

    fn update_extent(&mut self) {
        let positions = self.positions();
        assert_eq!(
            positions.len(),
            4,
            "{} tetromino does not hold exactly four tiles",
            self.shape
        );
        let mut columns: Vec<i32> = positions.iter().map(|p| p.x).collect();
        let mut rows: Vec<i32> = positions.iter().map(|p| p.y).collect();
        columns.sort_unstable();
        columns.dedup();
        rows.sort_unstable();
        rows.dedup();
        self.column_count = columns.len();
        self.row_count = rows.len();
        self.leftmost = columns[0];
    }

    /// Rotates the piece a quarter turn counter-clockwise inside its bounding box,
    /// then pushes it back inside the walls and above the floor if needed.
    /// Leaves the piece untouched and returns `false` if that is impossible.
    pub fn rotate(&mut self, grid: &Grid) -> bool {
        let n = self.tiles.len();
        assert!(
            self.tiles.iter().all(|row| row.len() == n),
            "rotating a trimmed tile matrix"
        );
        let last_column = grid.width() as i32 - 1;
        let before = self.clone();
        let mut rotated: TileMatrix = vec![vec![None; n]; n];
        let mut bottommost = 0;
        let mut right_overflow = 0;
        let mut left_overflow = 0;
        for (y, row) in self.tiles.iter().enumerate() {
            for (x, tile) in row.iter().enumerate() {
                let Some(tile) = tile else { continue };
                let (rx, ry) = (n - 1 - y, x);
                let position = self.bottom_left_corner.translated(rx as i32, ry as i32);
                if grid.is_occupied(position.y, position.x) {
                    log::trace!("{} rotation blocked at {position}", self.shape);
                    return false;
                }
                if position.x > last_column {
                    right_overflow = right_overflow.max(position.x - last_column);
                } else if position.x < 0 {
                    left_overflow = left_overflow.max(-position.x);
                }
                bottommost = bottommost.min(position.y);
                rotated[ry][rx] = Some(tile.copy_at(position, tile.is_ghost()));
            }
        }
        self.tiles = rotated;
        let kicks = [
            (Direction::Up, -bottommost),
            (Direction::Left, right_overflow),
            (Direction::Right, left_overflow),
        ];
        for (direction, amount) in kicks {
            if amount > 0 && !self.move_by(direction, grid, amount as u32) {
                log::trace!("{} rotation kick {direction:?} by {amount} failed", self.shape);
                *self = before;
                return false;
            }
        }
        self.update_extent();
        true
    }

    /// Moves the piece `amount` cells if nothing is in the way.
    pub fn move_by(&mut self, direction: Direction, grid: &Grid, amount: u32) -> bool {
        if !self.can_be_moved(direction, grid, amount) {
            return false;
        }
        let (dx, dy) = direction.offset();
        let (dx, dy) = (dx * amount as i32, dy * amount as i32);
        self.bottom_left_corner.translate(dx, dy);
        self.leftmost += dx;
        for tile in self.tiles_mut() {
            tile.move_by(dx, dy);
        }
        true
    }

    /// Rate-limited [`Tetromino::move_by`]. `None` means the channel is still
    /// cooling down and nothing was attempted; `Some(false)` means the move
    /// was illegal.
    pub fn move_throttled(
        &mut self,
        direction: Direction,
        grid: &Grid,
        amount: u32,
        pace: Pace,
        throttle: &mut MoveThrottle,
    ) -> Option<bool> {
        let Some(channel) = Channel::of(direction, pace.gravity) else {
            return Some(self.move_by(direction, grid, amount));
        };
        if !throttle.is_ready(channel, pace.now) {
            return None;
        }
        if !self.move_by(direction, grid, amount) {
            log::trace!("{} cannot move {direction:?}", self.shape);
            return Some(false);
        }
        throttle.arm(channel, pace.now, pace.delay);
        Some(true)
    }

    /// Checks only the tile furthest along `direction` in each row (horizontal
    /// moves) or column (vertical moves); the others trail behind it.
    pub fn can_be_moved(&self, direction: Direction, grid: &Grid, amount: u32) -> bool {
        let (dx, dy) = direction.offset();
        let width = grid.width() as i32;
        self.extreme_tiles(direction).into_iter().all(|position| {
            (1..=amount as i32).all(|step| {
                let target = position.translated(dx * step, dy * step);
                (0..width).contains(&target.x)
                    && target.y >= 0
                    && !grid.is_occupied(target.y, target.x)
            })
        })
    }

    fn extreme_tiles(&self, direction: Direction) -> Vec<Point> {
        let rows = self.tiles.len();
        let columns = self.tiles.iter().map(Vec::len).max().unwrap_or(0);
        let cell = |x: usize, y: usize| self.tiles[y].get(x).copied().flatten();
        match direction {
            Direction::Left => (0..rows)
                .filter_map(|y| (0..columns).find_map(|x| cell(x, y)))
                .map(|tile| tile.position)
                .collect(),
            Direction::Right => (0..rows)
                .filter_map(|y| (0..columns).rev().find_map(|x| cell(x, y)))
                .map(|tile| tile.position)
                .collect(),
            Direction::Down => (0..columns)
                .filter_map(|x| (0..rows).find_map(|y| cell(x, y)))
                .map(|tile| tile.position)
                .collect(),
            Direction::Up => (0..columns)
                .filter_map(|x| (0..rows).rev().find_map(|y| cell(x, y)))
                .map(|tile| tile.position)
                .collect(),
        }
    }

    /// Moves the piece down until it rests on something, returning the rows descended.
    pub fn drop_to_floor(&mut self, grid: &Grid) -> u32 {
        let mut rows = 0;
        while self.move_by(Direction::Down, grid, 1) {
            rows += 1;
        }
        rows
    }

    /// Independent copy with fresh tiles, optionally re-anchored and with
    /// empty border rows and columns trimmed away.
    pub fn copy(
        &self,
        ghost: bool,
        bottom_left_x: Option<i32>,
        bottom_left_y: Option<i32>,
        trim: bool,
    ) -> Tetromino {
        let matrix = if trim {
            self.trimmed_matrix()
        } else {
            self.tiles.clone()
        };
        let bottom_left_corner = Point::new(
            bottom_left_x.unwrap_or(self.bottom_left_corner.x),
            bottom_left_y.unwrap_or(self.bottom_left_corner.y),
        );
        let tiles = matrix
            .into_iter()
            .enumerate()
            .map(|(y, row)| {
                row.into_iter()
                    .enumerate()
                    .map(|(x, tile)| {
                        tile.map(|tile| {
                            let position = bottom_left_corner.translated(x as i32, y as i32);
                            tile.copy_at(position, ghost)
                        })
                    })
                    .collect()
            })
            .collect();
        let mut copy = Tetromino {
            shape: self.shape,
            bottom_left_corner,
            tiles,
            column_count: 0,
            row_count: 0,
            leftmost: 0,
            ghost,
        };
        copy.update_extent();
        copy
    }

    /// Landing preview: a ghost copy dropped as far as it goes.
    pub fn ghost(&self, grid: &Grid) -> Tetromino {
        let mut ghost = self.copy(true, None, None, false);
        ghost.drop_to_floor(grid);
        ghost
    }

    fn trimmed_matrix(&self) -> TileMatrix {
        let columns = self.tiles.iter().map(Vec::len).max().unwrap_or(0);
        let occupied_columns: Vec<usize> = (0..columns)
            .filter(|&x| {
                self.tiles
                    .iter()
                    .any(|row| row.get(x).is_some_and(Option::is_some))
            })
            .collect();
        self.tiles
            .iter()
            .filter(|row| row.iter().any(Option::is_some))
            .map(|row| {
                occupied_columns
                    .iter()
                    .map(|&x| row.get(x).copied().flatten())
                    .collect()
            })
            .collect()
    }
}
