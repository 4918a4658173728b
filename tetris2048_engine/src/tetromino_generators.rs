use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    seq::SliceRandom,
    Rng,
};

use crate::Shape;

/// Source of upcoming shapes.
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TetrominoGenerator {
    /// Every shape equally likely on every draw.
    Uniform,
    /// Deals all seven shapes in shuffled order, then reshuffles.
    Bag { remaining: Vec<Shape> },
    /// Weights each shape by the square of the draws since it was last dealt.
    Recency { draws_since: [u32; 7] },
}

impl TetrominoGenerator {
    pub fn uniform() -> Self {
        Self::Uniform
    }

    pub fn bag() -> Self {
        Self::Bag {
            remaining: Vec::new(),
        }
    }

    pub fn recency() -> Self {
        Self::Recency {
            draws_since: [1; 7],
        }
    }

    pub(crate) fn with_rng<'a, 'b>(
        &'a mut self,
        rng: &'b mut StdRng,
    ) -> ShapeIterator<'a, 'b> {
        ShapeIterator {
            tetromino_generator: self,
            rng,
        }
    }

    fn deal(&mut self, rng: &mut StdRng) -> Shape {
        match self {
            Self::Uniform => Shape::ALL[rng.gen_range(0..Shape::ALL.len())],
            Self::Bag { remaining } => {
                if remaining.is_empty() {
                    remaining.extend(Shape::ALL);
                    remaining.shuffle(rng);
                }
                // SAFETY: Refilled above.
                remaining.pop().unwrap()
            }
            Self::Recency { draws_since } => {
                let weights = draws_since.iter().map(|&draws| draws * draws);
                // SAFETY: Only the last dealt shape has weight zero.
                let dealt = WeightedIndex::new(weights).unwrap().sample(rng);
                for (idx, draws) in draws_since.iter_mut().enumerate() {
                    *draws = if idx == dealt { 0 } else { *draws + 1 };
                }
                Shape::ALL[dealt]
            }
        }
    }
}

impl Default for TetrominoGenerator {
    fn default() -> Self {
        Self::uniform()
    }
}

pub(crate) struct ShapeIterator<'a, 'b> {
    tetromino_generator: &'a mut TetrominoGenerator,
    rng: &'b mut StdRng,
}

impl<'a, 'b> Iterator for ShapeIterator<'a, 'b> {
    type Item = Shape;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.tetromino_generator.deal(self.rng))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn deal(mut generator: TetrominoGenerator, seed: u64, count: usize) -> Vec<Shape> {
        let mut rng = StdRng::seed_from_u64(seed);
        generator.with_rng(&mut rng).take(count).collect()
    }

    #[test]
    fn bag_deals_every_shape_before_refilling() {
        let dealt = deal(TetrominoGenerator::bag(), 7, 21);
        for bag in dealt.chunks(7) {
            let mut bag = bag.to_vec();
            bag.sort();
            assert_eq!(bag, Shape::ALL);
        }
    }

    #[test]
    fn recency_never_repeats_immediately() {
        let dealt = deal(TetrominoGenerator::recency(), 1, 200);
        assert!(dealt.windows(2).all(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn uniform_eventually_deals_every_shape() {
        let mut seen = deal(TetrominoGenerator::uniform(), 42, 500);
        seen.sort();
        seen.dedup();
        assert_eq!(seen, Shape::ALL);
    }

    #[test]
    fn same_seed_same_sequence() {
        for generator in [
            TetrominoGenerator::uniform(),
            TetrominoGenerator::bag(),
            TetrominoGenerator::recency(),
        ] {
            assert_eq!(deal(generator.clone(), 9, 20), deal(generator, 9, 20));
        }
    }
}
