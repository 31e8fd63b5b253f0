// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-size proximity grid over a keyboard's bounding rectangle.
//!
//! The grid always has [`GRID_WIDTH`] × [`GRID_HEIGHT`] cells. Cell extents are
//! rounded up so that every pixel of `[0, width) × [0, height)` belongs to a cell.
//! A key is listed in a cell when its centre is strictly closer than the
//! threshold to at least one of the cell's four corners.

use alloc::vec::Vec;
use core::fmt::Debug;

use smallvec::SmallVec;

use crate::types::KeyBounds;
use crate::util::div_ceil;

/// Number of grid columns.
pub const GRID_WIDTH: usize = 10;
/// Number of grid rows.
pub const GRID_HEIGHT: usize = 5;
/// Total number of grid cells.
pub const GRID_SIZE: usize = GRID_WIDTH * GRID_HEIGHT;

/// Index of a key in the sequence the grid was built from.
pub type KeyIndex = usize;

#[derive(Clone, Default)]
struct Cell {
    keys: SmallVec<[KeyIndex; 8]>,
}

/// Precomputed nearest-key candidates for every cell of a `10 × 5` grid.
#[derive(Clone)]
pub struct ProximityGrid {
    width: i32,
    height: i32,
    cell_width: i32,
    cell_height: i32,
    // Row-major, `GRID_SIZE` long; empty when the bounds have no area.
    cells: Vec<Cell>,
}

impl Debug for ProximityGrid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let candidates: usize = self.cells.iter().map(|c| c.keys.len()).sum();
        f.debug_struct("ProximityGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("cell_width", &self.cell_width)
            .field("cell_height", &self.cell_height)
            .field("candidates", &candidates)
            .finish_non_exhaustive()
    }
}

impl ProximityGrid {
    /// A grid with no area. Every query returns an empty slice.
    pub const fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            cell_width: 0,
            cell_height: 0,
            cells: Vec::new(),
        }
    }

    /// Build the grid for a `width × height` keyboard.
    ///
    /// `threshold` is a *squared* distance. `keys` are indexed in iteration order;
    /// those indices are what [`nearest_keys`](Self::nearest_keys) returns.
    pub fn build<I>(width: i32, height: i32, threshold: i64, keys: I) -> Self
    where
        I: IntoIterator<Item = KeyBounds>,
    {
        if width <= 0 || height <= 0 {
            return Self::empty();
        }
        let keys: Vec<KeyBounds> = keys.into_iter().collect();

        #[allow(
            clippy::cast_possible_truncation,
            reason = "Grid dimensions are small compile-time constants."
        )]
        let (cols, rows) = (GRID_WIDTH as i32, GRID_HEIGHT as i32);
        let cell_width = div_ceil(width, cols);
        let cell_height = div_ceil(height, rows);

        let mut cells = Vec::with_capacity(GRID_SIZE);
        cells.resize_with(GRID_SIZE, Cell::default);

        for gy in 0..GRID_HEIGHT {
            for gx in 0..GRID_WIDTH {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "Grid coordinates are below GRID_WIDTH/GRID_HEIGHT."
                )]
                let (x, y) = (gx as i32 * cell_width, gy as i32 * cell_height);
                let corners = [
                    (x, y),
                    (x + cell_width - 1, y),
                    (x + cell_width - 1, y + cell_height - 1),
                    (x, y + cell_height - 1),
                ];
                let cell = &mut cells[gy * GRID_WIDTH + gx];
                for (i, key) in keys.iter().enumerate() {
                    if corners
                        .iter()
                        .any(|&(cx, cy)| key.squared_distance_from(cx, cy) < threshold)
                    {
                        cell.keys.push(i);
                    }
                }
            }
        }

        Self {
            width,
            height,
            cell_width,
            cell_height,
            cells,
        }
    }

    /// Width of the indexed area.
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Height of the indexed area.
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Extent of one cell, `(width, height)`.
    pub const fn cell_size(&self) -> (i32, i32) {
        (self.cell_width, self.cell_height)
    }

    /// Row-major cell index owning the point, if the point is indexed.
    pub fn cell_index(&self, x: i32, y: i32) -> Option<usize> {
        if self.cells.is_empty() || x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        let index = (y / self.cell_height) as usize * GRID_WIDTH + (x / self.cell_width) as usize;
        // Guards against rounding at the extreme right/bottom edge.
        (index < GRID_SIZE).then_some(index)
    }

    /// Keys near the point, in build order.
    ///
    /// Points outside `[0, width) × [0, height)` yield an empty slice.
    pub fn nearest_keys(&self, x: i32, y: i32) -> &[KeyIndex] {
        match self.cell_index(x, y) {
            Some(index) => &self.cells[index].keys,
            None => &[],
        }
    }

    /// Candidates of a single cell, by row-major index.
    pub fn cell(&self, index: usize) -> &[KeyIndex] {
        self.cells.get(index).map_or(&[], |c| &c.keys)
    }
}

impl Default for ProximityGrid {
    fn default() -> Self {
        Self::empty()
    }
}
