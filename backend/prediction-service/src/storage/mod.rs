// ============================================
// Flat-file storage
// ============================================
//
// Load/write collaborators around the engine. The engine only sees a
// `RatingMatrix` going in and a slice of `Prediction`s coming out; the text
// formats live here.
//
// - Training corpus: whitespace-delimited integers, user-major, 0 = unrated
// - Held-out corpus: repeating (user_id, item_id, rating_or_0) triples
// - Results: "<user_id> <item_id> <rating>" per line

mod flat_file;
mod holdout_file;

use crate::error::Result;
use crate::models::{HeldOutCell, Orientation, Prediction};
use crate::services::matrix::RatingMatrix;
use async_trait::async_trait;

pub use flat_file::{FlatFileSink, FlatFileSource};
pub use holdout_file::HoldoutFileSource;

#[async_trait]
pub trait RatingSource: Send + Sync {
    async fn load(&self) -> Result<RatingMatrix>;
}

#[async_trait]
pub trait PredictionSink: Send + Sync {
    async fn write(&self, predictions: &[Prediction]) -> Result<()>;
}

/// A matrix annotated with the cells to predict
#[derive(Debug, Clone)]
pub struct HoldoutSet {
    pub matrix: RatingMatrix,
    pub targets: Vec<HeldOutCell>,
}

impl HoldoutSet {
    /// Re-orient a user-major set; item-based runs swap entities and items
    pub fn oriented(self, orientation: Orientation) -> Self {
        match orientation {
            Orientation::UserBased => self,
            Orientation::ItemBased => Self {
                matrix: self.matrix.transpose(),
                targets: self
                    .targets
                    .into_iter()
                    .map(|target| HeldOutCell {
                        cell: target.cell.transposed(),
                        ..target
                    })
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, Rating};

    #[test]
    fn test_item_based_orientation_swaps_cells() {
        let matrix = RatingMatrix::from_raw_rows(&[vec![5, 0, 2], vec![1, 4, 0]])
            .unwrap()
            .with_pending(&[Cell::new(1, 2)])
            .unwrap();
        let set = HoldoutSet {
            matrix,
            targets: vec![HeldOutCell {
                cell: Cell::new(1, 2),
                user_id: 2,
                item_id: 3,
                actual: None,
            }],
        };

        let oriented = set.oriented(Orientation::ItemBased);
        let target = &oriented.targets[0];

        assert_eq!(target.cell, Cell::new(2, 1));
        assert_eq!((target.user_id, target.item_id), (2, 3));
        assert_eq!(oriented.matrix.rating(2, 1), Rating::Pending);
        assert_eq!(oriented.matrix.entity_count(), 3);
    }
}
