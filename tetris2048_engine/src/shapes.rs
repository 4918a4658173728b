use std::{fmt, ops, str::FromStr};

use crate::{tile::Color, Point};

/// The seven tetromino kinds.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    I,
    O,
    Z,
    S,
    L,
    J,
    T,
}

/// Static per-shape data shared by tiles and tetrominoes.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub struct ShapeInfo {
    /// Side length of the square bounding box.
    pub size: usize,
    /// Occupied cells in spawn orientation, origin at the box's bottom-left, `y` up.
    pub cells: [(i32, i32); 4],
    pub background: Color,
    pub boundary: Color,
}

#[rustfmt::skip]
static SHAPE_TABLE: [ShapeInfo; 7] = [
    // I ⡇
    ShapeInfo { size: 4, cells: [(1, 0), (1, 1), (1, 2), (1, 3)], background: Color::rgb(43, 172, 226), boundary: Color::rgb(0, 122, 206) },
    // O ⠶
    ShapeInfo { size: 2, cells: [(0, 0), (1, 0), (0, 1), (1, 1)], background: Color::rgb(253, 225, 0), boundary: Color::rgb(239, 170, 0) },
    // Z ⠲⠄
    ShapeInfo { size: 3, cells: [(0, 2), (1, 2), (1, 1), (2, 1)], background: Color::rgb(238, 39, 51), boundary: Color::rgb(153, 0, 0) },
    // S ⠴⠂
    ShapeInfo { size: 3, cells: [(1, 1), (2, 2), (0, 1), (1, 2)], background: Color::rgb(78, 183, 72), boundary: Color::rgb(0, 153, 0) },
    // L ⠧⠄
    ShapeInfo { size: 3, cells: [(0, 2), (0, 1), (1, 2), (2, 2)], background: Color::rgb(248, 150, 34), boundary: Color::rgb(180, 87, 0) },
    // J ⠤⠇
    ShapeInfo { size: 3, cells: [(0, 2), (1, 2), (2, 2), (2, 1)], background: Color::rgb(0, 90, 157), boundary: Color::rgb(0, 0, 115) },
    // T ⠲⠂
    ShapeInfo { size: 3, cells: [(0, 2), (1, 2), (2, 2), (1, 1)], background: Color::rgb(146, 43, 140), boundary: Color::rgb(102, 0, 102) },
];

impl Shape {
    pub const ALL: [Shape; 7] = [
        Shape::I,
        Shape::O,
        Shape::Z,
        Shape::S,
        Shape::L,
        Shape::J,
        Shape::T,
    ];

    pub fn info(&self) -> &'static ShapeInfo {
        &SHAPE_TABLE[*self]
    }

    pub fn size(&self) -> usize {
        self.info().size
    }

    pub fn cells(&self) -> [Point; 4] {
        self.info().cells.map(Point::from)
    }

    pub fn letter(&self) -> char {
        match self {
            Shape::I => 'I',
            Shape::O => 'O',
            Shape::Z => 'Z',
            Shape::S => 'S',
            Shape::L => 'L',
            Shape::J => 'J',
            Shape::T => 'T',
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Shape {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Shape::ALL
            .into_iter()
            .find(|shape| s.eq_ignore_ascii_case(&shape.letter().to_string()))
            .ok_or(())
    }
}

impl<T> ops::Index<Shape> for [T; 7] {
    type Output = T;

    fn index(&self, idx: Shape) -> &Self::Output {
        match idx {
            Shape::I => &self[0],
            Shape::O => &self[1],
            Shape::Z => &self[2],
            Shape::S => &self[3],
            Shape::L => &self[4],
            Shape::J => &self[5],
            Shape::T => &self[6],
        }
    }
}
