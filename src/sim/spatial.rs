//! Uniform grid spatial index
//!
//! Enemies are bucketed by position into square cells. A radius query visits
//! only the cells overlapping the query's bounding square and filters by exact
//! squared distance, so there are no false negatives and no square roots.
//! The grid is rebuilt from scratch every tick, never patched in place.

use std::collections::HashMap;

use glam::Vec2;

use crate::consts::GRID_CELL_SIZE;

/// An indexed entry: entity id and the position it was inserted at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEntry {
    pub id: u32,
    pub pos: Vec2,
}

/// Uniform grid keyed by integer cell coordinates (unbounded)
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<IndexEntry>>,
    len: usize,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(GRID_CELL_SIZE)
    }
}

impl SpatialIndex {
    /// Create an empty index. Non-positive cell sizes fall back to the default.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            GRID_CELL_SIZE
        };
        Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Drop all entries but keep cell allocations for the next rebuild
    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.len = 0;
    }

    pub fn insert(&mut self, id: u32, pos: Vec2) {
        if !pos.is_finite() {
            return;
        }
        let key = self.cell_of(pos);
        self.cells.entry(key).or_default().push(IndexEntry { id, pos });
        self.len += 1;
    }

    /// Replace the contents with a fresh set of entries
    pub fn rebuild<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (u32, Vec2)>,
    {
        self.clear();
        for (id, pos) in entries {
            self.insert(id, pos);
        }
    }

    /// Visit every entry within `radius` of `center` (inclusive)
    pub fn for_each_in_radius(&self, center: Vec2, radius: f32, mut visit: impl FnMut(&IndexEntry, f32)) {
        if self.len == 0 || radius < 0.0 || !radius.is_finite() {
            return;
        }
        let radius_sq = radius * radius;
        let (min_x, min_y) = self.cell_of(center - Vec2::splat(radius));
        let (max_x, max_y) = self.cell_of(center + Vec2::splat(radius));

        for cy in min_y..=max_y {
            for cx in min_x..=max_x {
                let Some(bucket) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                for entry in bucket {
                    let dist_sq = entry.pos.distance_squared(center);
                    if dist_sq <= radius_sq {
                        visit(entry, dist_sq);
                    }
                }
            }
        }
    }

    /// Ids of all entries within `radius` of `center`
    pub fn query_radius(&self, center: Vec2, radius: f32) -> Vec<u32> {
        let mut out = Vec::new();
        self.query_radius_into(center, radius, &mut out);
        out
    }

    /// Populates `out` instead of allocating. Clears `out` first.
    pub fn query_radius_into(&self, center: Vec2, radius: f32, out: &mut Vec<u32>) {
        out.clear();
        self.for_each_in_radius(center, radius, |entry, _| out.push(entry.id));
    }

    /// Nearest entry within `radius` accepted by `filter`
    pub fn nearest(&self, center: Vec2, radius: f32, mut filter: impl FnMut(u32) -> bool) -> Option<IndexEntry> {
        let mut best: Option<(IndexEntry, f32)> = None;
        self.for_each_in_radius(center, radius, |entry, dist_sq| {
            let closer = best.as_ref().is_none_or(|(_, d)| dist_sq < *d);
            if closer && filter(entry.id) {
                best = Some((*entry, dist_sq));
            }
        });
        best.map(|(entry, _)| entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_query_spans_cell_borders() {
        let mut index = SpatialIndex::new(100.0);
        index.insert(1, Vec2::new(99.0, 0.0));
        index.insert(2, Vec2::new(101.0, 0.0));
        index.insert(3, Vec2::new(-101.0, -1.0));
        index.insert(4, Vec2::new(400.0, 400.0));

        let mut found = index.query_radius(Vec2::ZERO, 102.0);
        found.sort_unstable();
        assert_eq!(found, vec![1, 2, 3]);
    }

    #[test]
    fn test_boundary_distance_is_inclusive() {
        let mut index = SpatialIndex::new(500.0);
        index.insert(7, Vec2::new(30.0, 40.0));
        assert_eq!(index.query_radius(Vec2::ZERO, 50.0), vec![7]);
        assert!(index.query_radius(Vec2::ZERO, 49.9).is_empty());
    }

    #[test]
    fn test_clear_and_rebuild() {
        let mut index = SpatialIndex::default();
        index.rebuild([(1, Vec2::ZERO), (2, Vec2::ONE)]);
        assert_eq!(index.len(), 2);

        index.rebuild([(3, Vec2::new(10.0, 10.0))]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.query_radius(Vec2::ZERO, 1000.0), vec![3]);

        index.clear();
        assert!(index.is_empty());
        assert!(index.query_radius(Vec2::ZERO, 1000.0).is_empty());
    }

    #[test]
    fn test_nearest_respects_filter() {
        let mut index = SpatialIndex::default();
        index.insert(1, Vec2::new(10.0, 0.0));
        index.insert(2, Vec2::new(20.0, 0.0));
        index.insert(3, Vec2::new(300.0, 0.0));

        assert_eq!(index.nearest(Vec2::ZERO, 100.0, |_| true).map(|e| e.id), Some(1));
        assert_eq!(index.nearest(Vec2::ZERO, 100.0, |id| id != 1).map(|e| e.id), Some(2));
        assert_eq!(index.nearest(Vec2::ZERO, 100.0, |id| id == 3), None);
    }

    #[test]
    fn test_invalid_cell_size_falls_back() {
        assert_eq!(SpatialIndex::new(0.0).cell_size(), GRID_CELL_SIZE);
        assert_eq!(SpatialIndex::new(-3.0).cell_size(), GRID_CELL_SIZE);
    }

    proptest! {
        #[test]
        fn prop_query_matches_brute_force(
            points in prop::collection::vec((-3000.0f32..3000.0, -3000.0f32..3000.0), 0..200),
            cx in -3000.0f32..3000.0,
            cy in -3000.0f32..3000.0,
            radius in 0.0f32..1500.0,
            cell in 50.0f32..800.0,
        ) {
            let mut index = SpatialIndex::new(cell);
            for (i, &(x, y)) in points.iter().enumerate() {
                index.insert(i as u32, Vec2::new(x, y));
            }
            let center = Vec2::new(cx, cy);

            let mut found = index.query_radius(center, radius);
            found.sort_unstable();

            let expected: Vec<u32> = points
                .iter()
                .enumerate()
                .filter(|(_, (x, y))| Vec2::new(*x, *y).distance_squared(center) <= radius * radius)
                .map(|(i, _)| i as u32)
                .collect();

            prop_assert_eq!(found, expected);
        }
    }
}
