// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Key bounds in integer keyboard space.

/// Axis-aligned bounds of a key, in device pixels.
///
/// The rectangle is half-open: it covers `[x, x + width) × [y, y + height)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyBounds {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width, not including any gap.
    pub width: i32,
    /// Height, not including any gap.
    pub height: i32,
}

impl KeyBounds {
    /// Create bounds from origin and size.
    #[inline(always)]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Centre of the key, rounded toward the origin.
    #[inline]
    pub const fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Whether the half-open rectangle contains the point.
    #[inline]
    pub const fn contains_point(&self, x: i32, y: i32) -> bool {
        self.x <= x && x < self.right() && self.y <= y && y < self.bottom()
    }

    /// Squared Euclidean distance from the key's centre to the point.
    ///
    /// Widened to `i64` so that far-away points cannot overflow.
    #[inline]
    pub const fn squared_distance_from(&self, x: i32, y: i32) -> i64 {
        let (cx, cy) = self.center();
        let dx = cx as i64 - x as i64;
        let dy = cy as i64 - y as i64;
        dx * dx + dy * dy
    }

    /// Return true if the bounds have no area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}
