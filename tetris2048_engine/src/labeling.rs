//! Connected-component labeling of the settled tiles.
//!
//! The board is padded with a solid floor row beneath row 0 before
//! labeling, so every tile touching the floor (directly or through other
//! tiles) shares [`FLOOR_LABEL`]. Any other label marks a floating group.

use std::collections::{BTreeMap, BTreeSet};

/// Label of empty cells.
pub const BACKGROUND: u32 = 0;
/// Label of the floor and everything resting on it.
pub const FLOOR_LABEL: u32 = 1;

/// Union-find over labels where the smaller label always becomes the root.
#[derive(Default, Debug)]
struct Equivalences {
    parent: Vec<u32>,
}

impl Equivalences {
    fn fresh(&mut self) -> u32 {
        if self.parent.is_empty() {
            // Slot for `BACKGROUND`, never used as a root.
            self.parent.push(BACKGROUND);
        }
        let label = self.parent.len() as u32;
        self.parent.push(label);
        label
    }

    fn find(&mut self, label: u32) -> u32 {
        let mut root = label;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut current = label;
        while self.parent[current as usize] != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }
        root
    }

    fn union(&mut self, a: u32, b: u32) -> u32 {
        let (a, b) = (self.find(a), self.find(b));
        let (min, max) = (a.min(b), a.max(b));
        self.parent[max as usize] = min;
        min
    }
}

/// Occupancy (`[row][col]`, row 0 at the bottom) padded to `(h + 3) x (w + 2)`:
/// an empty guard row, the solid floor, the board, and an empty guard row on
/// top. Columns 0 and `w + 1` are empty guards.
pub fn binarize(occupancy: &[Vec<bool>]) -> Vec<Vec<u8>> {
    let height = occupancy.len();
    let width = occupancy.first().map_or(0, Vec::len);
    let mut padded = vec![vec![0u8; width + 2]; height + 3];
    for cell in &mut padded[1][1..=width] {
        *cell = 1;
    }
    for (row, cells) in occupancy.iter().enumerate() {
        for (col, &occupied) in cells.iter().enumerate() {
            padded[row + 2][col + 1] = u8::from(occupied);
        }
    }
    padded
}

/// Two-pass 4-connected labeling of a padded binary image, scanning from the
/// floor upwards. Returns the resolved labels and the number of components.
pub fn label(binary: &[Vec<u8>]) -> (Vec<Vec<u32>>, usize) {
    let mut equivalences = Equivalences::default();
    let mut labels: Vec<Vec<u32>> = binary.iter().map(|row| vec![BACKGROUND; row.len()]).collect();
    for row in 1..binary.len() {
        for col in 1..binary[row].len() {
            if binary[row][col] == 0 {
                continue;
            }
            let below = labels[row - 1][col];
            let left = labels[row][col - 1];
            labels[row][col] = match (below, left) {
                (BACKGROUND, BACKGROUND) => equivalences.fresh(),
                (label, BACKGROUND) | (BACKGROUND, label) => label,
                (below, left) => equivalences.union(below, left),
            };
        }
    }
    let mut roots = BTreeSet::new();
    for label in labels.iter_mut().flatten() {
        if *label != BACKGROUND {
            *label = equivalences.find(*label);
            roots.insert(*label);
        }
    }
    (labels, roots.len())
}

/// Component labels for every board cell.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Labeling {
    labels: Vec<Vec<u32>>,
    component_count: usize,
}

impl Labeling {
    pub fn of(occupancy: &[Vec<bool>]) -> Self {
        let height = occupancy.len();
        let width = occupancy.first().map_or(0, Vec::len);
        let (padded, component_count) = label(&binarize(occupancy));
        let labels = padded[2..height + 2]
            .iter()
            .map(|row| row[1..=width].to_vec())
            .collect();
        Self {
            labels,
            component_count,
        }
    }

    pub fn label_at(&self, row: usize, col: usize) -> u32 {
        self.labels[row][col]
    }

    /// Whether the cell holds a tile with no path down to the floor.
    pub fn is_floating(&self, row: usize, col: usize) -> bool {
        !matches!(self.label_at(row, col), BACKGROUND | FLOOR_LABEL)
    }

    /// Number of components, the floor's included.
    pub fn component_count(&self) -> usize {
        self.component_count
    }

    pub fn has_floating(&self) -> bool {
        self.component_count > 1
    }

    /// Cells of every component keyed by label.
    pub fn components(&self) -> BTreeMap<u32, Vec<(usize, usize)>> {
        let mut components: BTreeMap<u32, Vec<(usize, usize)>> = BTreeMap::new();
        for (row, labels) in self.labels.iter().enumerate() {
            for (col, &label) in labels.iter().enumerate() {
                if label != BACKGROUND {
                    components.entry(label).or_default().push((row, col));
                }
            }
        }
        components
    }
}
