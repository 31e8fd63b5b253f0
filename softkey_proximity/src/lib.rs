// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Softkey Proximity: a fixed-grid nearest-key index for on-screen keyboards.
//!
//! A touch on a soft keyboard rarely lands dead centre on the key the user meant.
//! Instead of scanning every key per touch event, this crate partitions the
//! keyboard's bounding rectangle into a fixed `10 × 5` grid and precomputes, for
//! every cell, the keys whose centres are within a squared-distance threshold of
//! any of the cell's corners. A query is then a single division and a slice lookup.
//!
//! - [`KeyBounds`]: integer pixel bounds of one key, with centre distance helpers.
//! - [`ProximityGrid`]: the precomputed grid; answers [`ProximityGrid::nearest_keys`].
//!
//! Candidates are reported as indices into the key sequence the grid was built
//! from, in that sequence's order. They are not sorted by distance; callers that
//! want closest-first ordering sort the (short) candidate slice themselves.
//!
//! # Example
//!
//! ```rust
//! use softkey_proximity::{KeyBounds, ProximityGrid};
//!
//! // Three 100px keys on one 50px row.
//! let keys = [
//!     KeyBounds::new(0, 0, 100, 50),
//!     KeyBounds::new(110, 0, 100, 50),
//!     KeyBounds::new(220, 0, 100, 50),
//! ];
//! // Threshold is a squared distance: 60px here.
//! let grid = ProximityGrid::build(320, 50, 60 * 60, keys);
//!
//! // A touch near the left edge only sees the first key.
//! assert_eq!(grid.nearest_keys(5, 25), &[0]);
//!
//! // Out of bounds is never an error, just empty.
//! assert!(grid.nearest_keys(320, 25).is_empty());
//! assert!(grid.nearest_keys(-1, 25).is_empty());
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod grid;
mod types;
pub(crate) mod util;

pub use grid::{GRID_HEIGHT, GRID_SIZE, GRID_WIDTH, KeyIndex, ProximityGrid};
pub use types::KeyBounds;
