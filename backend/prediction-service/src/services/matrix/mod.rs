//! Dense entity-major rating store.
//!
//! Rows are entities (users for user-based runs, items for item-based runs),
//! columns are the dimension the similarity is computed over. The matrix is
//! read-only once prediction starts; annotating cells as pending produces a
//! new copy.

use crate::error::{AppError, Result};
use crate::models::{Cell, Rating};
use crate::utils::mean;

#[derive(Debug, Clone, PartialEq)]
pub struct RatingMatrix {
    entities: usize,
    items: usize,
    cells: Vec<Rating>,
}

impl RatingMatrix {
    /// Matrix with every cell unrated
    pub fn new(entities: usize, items: usize) -> Self {
        Self {
            entities,
            items,
            cells: vec![Rating::Unrated; entities * items],
        }
    }

    /// Positional fill from row-major cells
    pub fn from_dense(entities: usize, items: usize, cells: Vec<Rating>) -> Result<Self> {
        if cells.len() != entities * items {
            return Err(AppError::Internal(format!(
                "{}x{} matrix needs {} cells, got {}",
                entities,
                items,
                entities * items,
                cells.len()
            )));
        }

        Ok(Self {
            entities,
            items,
            cells,
        })
    }

    /// Build from raw corpus values where 0 means unrated
    pub fn from_raw_rows(rows: &[Vec<i64>]) -> Result<Self> {
        let entities = rows.len();
        let items = rows.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(entities * items);

        for (entity, row) in rows.iter().enumerate() {
            if row.len() != items {
                return Err(AppError::Internal(format!(
                    "row {} has {} values, expected {}",
                    entity,
                    row.len(),
                    items
                )));
            }
            for (item, raw) in row.iter().enumerate() {
                let rating = Rating::from_raw(*raw).ok_or_else(|| {
                    AppError::Internal(format!(
                        "value {} at ({}, {}) is not a rating",
                        raw, entity, item
                    ))
                })?;
                cells.push(rating);
            }
        }

        Self::from_dense(entities, items, cells)
    }

    pub fn entity_count(&self) -> usize {
        self.entities
    }

    pub fn item_count(&self) -> usize {
        self.items
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.entity < self.entities && cell.item < self.items
    }

    /// Rating at an in-range cell.
    ///
    /// Panics when the cell is outside the matrix; use [`Self::try_rating`]
    /// for untrusted indices.
    pub fn rating(&self, entity: usize, item: usize) -> Rating {
        assert!(item < self.items, "item {item} out of range");
        self.cells[entity * self.items + item]
    }

    pub fn try_rating(&self, entity: usize, item: usize) -> Result<Rating> {
        if !self.contains(Cell::new(entity, item)) {
            return Err(AppError::IndexOutOfRange { entity, item });
        }
        Ok(self.rating(entity, item))
    }

    pub fn is_concrete(&self, entity: usize, item: usize) -> bool {
        self.rating(entity, item).is_concrete()
    }

    pub fn row(&self, entity: usize) -> &[Rating] {
        let start = entity * self.items;
        &self.cells[start..start + self.items]
    }

    /// `(item, value)` for every concrete rating of an entity
    pub fn concrete_ratings(&self, entity: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.row(entity)
            .iter()
            .enumerate()
            .filter_map(|(item, rating)| rating.value().map(|v| (item, v)))
    }

    /// Mean over the entity's concrete ratings, recomputed on every call
    pub fn entity_mean(&self, entity: usize) -> Option<f64> {
        mean(self.concrete_ratings(entity).map(|(_, v)| v))
    }

    pub fn concrete_count(&self) -> usize {
        self.cells.iter().filter(|r| r.is_concrete()).count()
    }

    /// Cells currently marked pending, in row-major order
    pub fn pending_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, r)| **r == Rating::Pending)
            .map(|(idx, _)| Cell::new(idx / self.items, idx % self.items))
            .collect()
    }

    pub fn set(&mut self, cell: Cell, rating: Rating) -> Result<()> {
        if !self.contains(cell) {
            return Err(AppError::IndexOutOfRange {
                entity: cell.entity,
                item: cell.item,
            });
        }
        self.cells[cell.entity * self.items + cell.item] = rating;
        Ok(())
    }

    /// Copy of the matrix with the given cells withheld
    pub fn with_pending(&self, cells: &[Cell]) -> Result<Self> {
        let mut annotated = self.clone();
        for cell in cells {
            annotated.set(*cell, Rating::Pending)?;
        }
        Ok(annotated)
    }

    /// Copy of the matrix grown by `extra` unrated entities
    pub fn with_extra_entities(&self, extra: usize) -> Self {
        let mut cells = self.cells.clone();
        cells.resize((self.entities + extra) * self.items, Rating::Unrated);

        Self {
            entities: self.entities + extra,
            items: self.items,
            cells,
        }
    }

    /// Swap the roles of entities and items
    pub fn transpose(&self) -> Self {
        let mut cells = Vec::with_capacity(self.cells.len());
        for item in 0..self.items {
            for entity in 0..self.entities {
                cells.push(self.rating(entity, item));
            }
        }

        Self {
            entities: self.items,
            items: self.entities,
            cells,
        }
    }
}
