/*
 * Spatial Grid Module
 *
 * This module defines the SpatialGrid struct for efficient neighbor lookups.
 * It divides 2D space into square cells keyed by integer coordinates, so a
 * neighborhood query only scans the 3x3 block of cells around a position
 * instead of the whole flock.
 *
 * The grid is transient: the flock rebuilds it from scratch every tick
 * (insert-all, query-all, clear). It stores indices into the live boid
 * array, never copies. Bucket allocations are kept across clears to avoid
 * churning the allocator once the flock has settled into its cells.
 */

use std::collections::HashMap;

use glam::Vec2;

use crate::params::ConfigError;

pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Result<Self, ConfigError> {
        // Also rejects NaN, which would put every boid in cell (0, 0)
        if !(cell_size > 0.0) {
            return Err(ConfigError::InvalidCellSize(cell_size));
        }

        Ok(Self {
            cell_size,
            cells: HashMap::new(),
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    // Convert a world position to the coordinate of the cell containing it
    #[inline]
    fn cell_of(&self, position: Vec2) -> (i32, i32) {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }

    // Insert a boid index into the bucket for its position. No
    // deduplication; inserting the same index twice is a caller error.
    #[inline]
    pub fn insert(&mut self, position: Vec2, index: usize) {
        let cell = self.cell_of(position);
        self.cells.entry(cell).or_default().push(index);
    }

    // Union of the 3x3 block of cells centered on the query position's cell.
    // Order is unspecified and the result may contain the querying boid's
    // own index; callers filter self-matches. Absent cells contribute
    // nothing, so a query over empty space returns an empty list.
    pub fn nearby(&self, position: Vec2) -> Vec<usize> {
        let (cell_x, cell_y) = self.cell_of(position);
        let mut result = Vec::new();

        for x_offset in -1..=1 {
            for y_offset in -1..=1 {
                if let Some(bucket) = self.cells.get(&(cell_x + x_offset, cell_y + y_offset)) {
                    result.extend_from_slice(bucket);
                }
            }
        }

        result
    }

    // Drop all bucket contents, keeping the allocations for the next tick
    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec2;

    #[test]
    fn rejects_non_positive_cell_size() {
        assert!(SpatialGrid::new(0.0).is_err());
        assert!(SpatialGrid::new(-0.5).is_err());
        assert!(SpatialGrid::new(f32::NAN).is_err());
        assert!(SpatialGrid::new(0.3).is_ok());
    }

    #[test]
    fn buckets_by_floored_cell_coordinate() {
        let mut grid = SpatialGrid::new(0.1).unwrap();
        // Negative coordinates must floor, not truncate toward zero:
        // x = -0.05 belongs to cell -1, which is adjacent to cell 0.
        grid.insert(vec2(-0.05, 0.05), 7);

        let nearby = grid.nearby(vec2(0.02, 0.02));
        assert_eq!(nearby, vec![7]);
    }

    #[test]
    fn nearby_unions_the_3x3_block_only() {
        let mut grid = SpatialGrid::new(1.0).unwrap();
        grid.insert(vec2(0.5, 0.5), 0); // same cell as the query
        grid.insert(vec2(1.5, 0.5), 1); // adjacent cell
        grid.insert(vec2(-0.5, -0.5), 2); // diagonal cell
        grid.insert(vec2(3.5, 0.5), 3); // two cells away, out of the block

        let mut nearby = grid.nearby(vec2(0.5, 0.5));
        nearby.sort_unstable();
        assert_eq!(nearby, vec![0, 1, 2]);
    }

    #[test]
    fn query_may_return_the_inserted_index_itself() {
        let mut grid = SpatialGrid::new(0.3).unwrap();
        grid.insert(vec2(0.1, 0.1), 4);
        assert!(grid.nearby(vec2(0.1, 0.1)).contains(&4));
    }

    #[test]
    fn clear_empties_every_bucket() {
        let mut grid = SpatialGrid::new(0.3).unwrap();
        for i in 0..10 {
            grid.insert(vec2(i as f32 * 0.05, 0.0), i);
        }
        grid.clear();
        assert!(grid.nearby(vec2(0.0, 0.0)).is_empty());
    }
}
