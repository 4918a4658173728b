use rand::Rng;

use crate::{GameMode, Point, Shape};

#[derive(Eq, PartialEq, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// What a tile shows: the piece it came from (classic) or its number (2048).
#[derive(Eq, PartialEq, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TileKind {
    Shape(Shape),
    Number(u32),
}

/// One occupied cell. Tiles carry their own absolute position, which the
/// owning tetromino or grid keeps in sync with where the tile is stored.
#[derive(Eq, PartialEq, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pub position: Point,
    kind: TileKind,
    ghost: bool,
}

const NUMBER_BOUNDARY: Color = Color::rgb(188, 174, 161);
const NUMBER_GHOST_BACKGROUND: Color = Color::rgb(198, 184, 171);
const NUMBER_GHOST_BOUNDARY: Color = Color::rgb(158, 138, 120);
const DARK_DIGITS: Color = Color::rgb(121, 114, 104);

impl Tile {
    /// A fresh tile for a newly generated tetromino. In 2048 mode it is
    /// numbered 2 or 4 with equal odds.
    pub fn spawn(position: Point, mode: GameMode, shape: Shape, rng: &mut impl Rng) -> Self {
        match mode {
            GameMode::Classic => Self::classic(position, shape),
            GameMode::Merge2048 => Self::numbered(position, rng.gen_range(1..=2) * 2),
        }
    }

    pub fn classic(position: Point, shape: Shape) -> Self {
        Self {
            position,
            kind: TileKind::Shape(shape),
            ghost: false,
        }
    }

    pub fn numbered(position: Point, number: u32) -> Self {
        debug_assert!(number.is_power_of_two(), "tile number {number} is not a power of two");
        Self {
            position,
            kind: TileKind::Number(number),
            ghost: false,
        }
    }

    pub fn kind(&self) -> TileKind {
        self.kind
    }

    pub fn is_ghost(&self) -> bool {
        self.ghost
    }

    /// The tile's number; ghosts and classic tiles have none.
    pub fn number(&self) -> Option<u32> {
        match self.kind {
            TileKind::Number(n) if !self.ghost => Some(n),
            _ => None,
        }
    }

    pub fn change_number(&mut self, number: u32) {
        debug_assert!(number.is_power_of_two(), "tile number {number} is not a power of two");
        self.kind = TileKind::Number(number);
    }

    pub fn move_by(&mut self, dx: i32, dy: i32) {
        self.position.translate(dx, dy);
    }

    /// Copy of this tile at `position`, optionally turned into a ghost.
    pub fn copy_at(&self, position: Point, ghost: bool) -> Self {
        Self {
            position,
            ghost,
            ..*self
        }
    }

    /// Fill color. `None` means the cell is drawn hollow.
    pub fn background_color(&self) -> Option<Color> {
        match (self.kind, self.ghost) {
            (TileKind::Shape(_), true) => None,
            (TileKind::Shape(shape), false) => Some(shape.info().background),
            (TileKind::Number(_), true) => Some(NUMBER_GHOST_BACKGROUND),
            (TileKind::Number(n), false) => Some(number_background(n)),
        }
    }

    pub fn boundary_color(&self) -> Color {
        match (self.kind, self.ghost) {
            (TileKind::Shape(shape), true) => shape.info().background,
            (TileKind::Shape(shape), false) => shape.info().boundary,
            (TileKind::Number(_), true) => NUMBER_GHOST_BOUNDARY,
            (TileKind::Number(_), false) => NUMBER_BOUNDARY,
        }
    }

    /// Color of the printed number, if any.
    pub fn foreground_color(&self) -> Option<Color> {
        self.number()
            .map(|n| if n < 8 { DARK_DIGITS } else { Color::WHITE })
    }
}

#[rustfmt::skip]
fn number_background(number: u32) -> Color {
    match number {
           2 => Color::rgb(239, 230, 221),
           4 => Color::rgb(239, 227, 205),
           8 => Color::rgb(245, 179, 127),
          16 => Color::rgb(247, 152, 107),
          32 => Color::rgb(247, 124, 90),
          64 => Color::rgb(247, 93, 59),
         128 => Color::rgb(239, 205, 115),
         256 => Color::rgb(239, 206, 99),
         512 => Color::rgb(239, 198, 82),
        1024 => Color::rgb(238, 198, 66),
        2048 => Color::rgb(239, 194, 49),
           _ => Color::rgb(61, 58, 51),
    }
}
