// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The built keyboard: geometry, shift state, resizing and nearest-key queries.

use softkey_proximity::ProximityGrid;

use crate::dimension::DisplayMetrics;
use crate::key::{Key, Row};
use crate::types::KeyIndex;

/// Multiple of the default key width within which a key counts as "near" a touch.
pub(crate) const SEARCH_DISTANCE: f32 = 1.8;

/// Proximity grid together with the geometry version it was built for.
#[derive(Clone, Debug, Default)]
struct ProximityCache {
    version: u64,
    grid: Option<ProximityGrid>,
}

/// A fully laid-out keyboard.
///
/// Built once per layout description, display size and mode by
/// [`KeyboardBuilder`](crate::KeyboardBuilder), and replaced rather than patched
/// when any of those change. Rows and keys are stored in flat vectors and refer
/// to each other by index.
#[derive(Clone, Debug)]
pub struct Keyboard {
    pub(crate) metrics: DisplayMetrics,
    pub(crate) default_width: i32,
    pub(crate) default_height: i32,
    pub(crate) default_horizontal_gap: i32,
    pub(crate) default_vertical_gap: i32,
    pub(crate) total_width: i32,
    pub(crate) total_height: i32,
    pub(crate) rows: Vec<Row>,
    pub(crate) keys: Vec<Key>,
    pub(crate) modifier_keys: Vec<KeyIndex>,
    pub(crate) shift_keys: [Option<KeyIndex>; 2],
    pub(crate) enter_key: Option<KeyIndex>,
    pub(crate) mode: i32,
    pub(crate) shifted: bool,
    pub(crate) proximity_threshold: i64,
    geometry_version: u64,
    proximity: ProximityCache,
}

impl Keyboard {
    /// An empty keyboard with the hard-coded defaults for `metrics`.
    pub(crate) fn new(metrics: DisplayMetrics, mode: i32) -> Self {
        let default_width = metrics.width / 10;
        let mut keyboard = Self {
            metrics,
            default_width,
            default_height: 50,
            default_horizontal_gap: 0,
            default_vertical_gap: 0,
            total_width: 0,
            total_height: 0,
            rows: Vec::new(),
            keys: Vec::new(),
            modifier_keys: Vec::new(),
            shift_keys: [None; 2],
            enter_key: None,
            mode,
            shifted: false,
            proximity_threshold: 0,
            geometry_version: 1,
            proximity: ProximityCache::default(),
        };
        keyboard.update_proximity_threshold();
        keyboard
    }

    /// Recompute the squared proximity threshold from the default key width.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "The search radius is truncated to whole pixels before squaring."
    )]
    pub(crate) fn update_proximity_threshold(&mut self) {
        let radius = (self.default_width as f32 * SEARCH_DISTANCE) as i64;
        self.proximity_threshold = radius.saturating_mul(radius);
    }

    /// Display metrics the keyboard was built for.
    pub fn metrics(&self) -> &DisplayMetrics {
        &self.metrics
    }

    /// Display width the keyboard was built for.
    pub fn display_width(&self) -> i32 {
        self.metrics.width
    }

    /// Display height the keyboard was built for.
    pub fn display_height(&self) -> i32 {
        self.metrics.height
    }

    /// Keyboard-wide default key width.
    pub fn default_width(&self) -> i32 {
        self.default_width
    }

    /// Keyboard-wide default key height.
    pub fn default_height(&self) -> i32 {
        self.default_height
    }

    /// Keyboard-wide default gap before each key.
    pub fn default_horizontal_gap(&self) -> i32 {
        self.default_horizontal_gap
    }

    /// Keyboard-wide default gap after each row.
    pub fn default_vertical_gap(&self) -> i32 {
        self.default_vertical_gap
    }

    /// Width of the laid-out keys, including left-side gaps.
    pub fn total_width(&self) -> i32 {
        self.total_width
    }

    /// Height of the laid-out rows, without the trailing gap under the last row.
    pub fn total_height(&self) -> i32 {
        self.total_height
    }

    /// Active mode; rows of other non-zero modes were skipped.
    pub fn mode(&self) -> i32 {
        self.mode
    }

    /// Squared distance within which a key is a nearest-key candidate.
    pub fn proximity_threshold(&self) -> i64 {
        self.proximity_threshold
    }

    /// Counter bumped by every geometry change.
    pub fn geometry_version(&self) -> u64 {
        self.geometry_version
    }

    /// All rows in document order, including skipped ones.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// All keys in layout order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// The key at `index`.
    pub fn key(&self, index: KeyIndex) -> Option<&Key> {
        self.keys.get(index)
    }

    /// The key at `index`, for press/release bookkeeping.
    pub fn key_mut(&mut self, index: KeyIndex) -> Option<&mut Key> {
        self.keys.get_mut(index)
    }

    /// Indices of the shift and alt keys, in layout order.
    pub fn modifier_keys(&self) -> &[KeyIndex] {
        &self.modifier_keys
    }

    /// Indices of the (at most two) designated shift keys.
    pub fn shift_key_indices(&self) -> [Option<KeyIndex>; 2] {
        self.shift_keys
    }

    /// The designated shift keys.
    pub fn shift_keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.shift_keys
            .iter()
            .flatten()
            .filter_map(|&index| self.keys.get(index))
    }

    /// Index of the key producing a line feed, if any.
    pub fn enter_key(&self) -> Option<KeyIndex> {
        self.enter_key
    }

    /// Whether the keyboard is shifted.
    pub fn is_shifted(&self) -> bool {
        self.shifted
    }

    /// Switch the designated shift keys on or off.
    ///
    /// Returns `true` if the keyboard's shifted flag changed, so callers can skip
    /// redundant redraws.
    pub fn set_shift(&mut self, on: bool) -> bool {
        for index in self.shift_keys.into_iter().flatten() {
            if let Some(key) = self.keys.get_mut(index) {
                key.on = on;
            }
        }
        if self.shifted == on {
            return false;
        }
        self.shifted = on;
        true
    }

    /// Squeeze rows that are wider than `new_width`.
    ///
    /// In each row whose key widths plus inner gaps (every gap but the first key's)
    /// exceed `new_width`, every key is scaled by
    /// `(new_width - gaps) / key_widths`, rounded down, and keys are re-packed from
    /// `x = 0`. Rows that fit are untouched. Gaps never change.
    ///
    /// The total width becomes `new_width` whether or not anything was scaled.
    /// `_new_height` is accepted for symmetry; heights are never rescaled.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Scaled widths are floored to whole pixels."
    )]
    pub fn resize(&mut self, new_width: i32, _new_height: i32) {
        let Self { rows, keys, .. } = self;
        for (row_index, row) in rows.iter().enumerate() {
            let mut total_gap: i32 = 0;
            let mut total_key_width: i32 = 0;
            for (i, &key) in row.keys.iter().enumerate() {
                if i > 0 {
                    total_gap = total_gap.saturating_add(keys[key].gap);
                }
                total_key_width = total_key_width.saturating_add(keys[key].width);
            }
            if total_gap.saturating_add(total_key_width) <= new_width || total_key_width <= 0 {
                continue;
            }
            let scale =
                f64::from(new_width.saturating_sub(total_gap)) / f64::from(total_key_width);
            tracing::debug!(row = row_index, scale, "rescaling row to fit");
            let mut x = 0;
            for &key in &row.keys {
                let key = &mut keys[key];
                key.width = ((f64::from(key.width) * scale).floor() as i32).max(0);
                key.x = x;
                x = x.saturating_add(key.width).saturating_add(key.gap);
            }
        }
        self.total_width = new_width;
        self.geometry_version += 1;
    }

    /// Drop the proximity grid; the next query rebuilds it.
    pub fn invalidate_proximity(&mut self) {
        self.proximity.grid = None;
    }

    fn ensure_proximity(&mut self) {
        if self.proximity.version == self.geometry_version && self.proximity.grid.is_some() {
            return;
        }
        tracing::trace!(version = self.geometry_version, "building proximity grid");
        let grid = ProximityGrid::build(
            self.total_width,
            self.total_height,
            self.proximity_threshold,
            self.keys.iter().map(Key::bounds),
        );
        self.proximity = ProximityCache {
            version: self.geometry_version,
            grid: Some(grid),
        };
    }

    /// Indices of the keys near the point, in layout order.
    ///
    /// Points outside `[0, total_width) × [0, total_height)` yield an empty slice.
    /// The grid behind this is built on first use and rebuilt after any geometry
    /// change.
    pub fn nearest_keys(&mut self, x: i32, y: i32) -> &[KeyIndex] {
        self.ensure_proximity();
        match &self.proximity.grid {
            Some(grid) => grid.nearest_keys(x, y),
            None => &[],
        }
    }

    /// The key containing the point, per [`Key::is_inside`].
    ///
    /// Nearest-key candidates are tried first. A key much wider than the default
    /// can be missing from the candidates at its ends, so when none of them
    /// contains the point every key is checked in layout order.
    pub fn key_at(&mut self, x: i32, y: i32) -> Option<KeyIndex> {
        self.ensure_proximity();
        let inside = |key: &Key| key.is_inside(x, y);
        let candidate = self.proximity.grid.as_ref().and_then(|grid| {
            grid.nearest_keys(x, y)
                .iter()
                .copied()
                .find(|&index| self.keys.get(index).is_some_and(inside))
        });
        candidate.or_else(|| self.keys.iter().position(inside))
    }
}

#[cfg(test)]
mod tests {
    use crate::{KeyAttrs, KeyboardAttrs, KeyboardBuilder, LayoutToken, RowAttrs, keycode};
    use crate::{Dimension, DisplayMetrics};

    fn row_of(widths: &[f32], gap: f32) -> Vec<LayoutToken> {
        let mut tokens = vec![LayoutToken::RowStart(RowAttrs {
            horizontal_gap: Some(Dimension::px(gap)),
            ..RowAttrs::default()
        })];
        for (i, &w) in widths.iter().enumerate() {
            tokens.push(LayoutToken::KeyStart(Box::new(KeyAttrs {
                key_width: Some(Dimension::px(w)),
                ..KeyAttrs::with_code(97 + i32::try_from(i).unwrap())
            })));
            tokens.push(LayoutToken::KeyEnd);
        }
        tokens.push(LayoutToken::RowEnd);
        tokens
    }

    fn build(rows: &[Vec<LayoutToken>]) -> crate::Keyboard {
        let mut tokens = vec![LayoutToken::KeyboardStart(KeyboardAttrs {
            key_height: Some(Dimension::px(40.0)),
            ..KeyboardAttrs::default()
        })];
        for row in rows {
            tokens.extend(row.iter().cloned());
        }
        KeyboardBuilder::new(DisplayMetrics::new(320, 480))
            .build_from_tokens(tokens)
            .unwrap()
    }

    #[test]
    fn shift_reports_changes_only() {
        let mut kb = build(&[row_of(&[100.0], 0.0)]);
        assert!(kb.set_shift(true));
        assert!(!kb.set_shift(true));
        assert!(kb.is_shifted());
        assert!(kb.set_shift(false));
        assert!(!kb.set_shift(false));
    }

    #[test]
    fn shift_toggles_both_shift_keys() {
        let shift = || {
            [
                LayoutToken::KeyStart(Box::new(KeyAttrs::with_code(keycode::SHIFT))),
                LayoutToken::KeyEnd,
            ]
        };
        let mut row = vec![LayoutToken::RowStart(RowAttrs::default())];
        row.extend(shift());
        row.extend(shift());
        row.extend(shift());
        row.push(LayoutToken::RowEnd);
        let mut kb = build(&[row]);

        assert_eq!(kb.shift_key_indices(), [Some(0), Some(1)]);
        assert_eq!(kb.modifier_keys(), &[0, 1, 2]);
        kb.set_shift(true);
        assert!(kb.shift_keys().all(|k| k.is_on()));
        assert!(!kb.keys()[2].is_on(), "third shift key is not designated");
    }

    #[test]
    fn resize_leaves_fitting_rows_alone() {
        let mut kb = build(&[row_of(&[100.0, 100.0], 10.0)]);
        let before: Vec<_> = kb.keys().iter().map(|k| (k.x(), k.width())).collect();
        kb.resize(600, 480);
        let after: Vec<_> = kb.keys().iter().map(|k| (k.x(), k.width())).collect();
        assert_eq!(before, after);
        assert_eq!(kb.total_width(), 600);
    }

    #[test]
    fn resize_scales_wide_rows_uniformly() {
        // 3 × 100 keys + 2 inner gaps of 10 = 320; squeeze into 220.
        let mut kb = build(&[row_of(&[100.0, 100.0, 100.0], 10.0), row_of(&[50.0], 0.0)]);
        kb.resize(220, 480);
        let keys = kb.keys();
        // scale = (220 - 20) / 300
        assert_eq!(
            keys[..3].iter().map(|k| k.width()).collect::<Vec<_>>(),
            [66, 66, 66]
        );
        assert_eq!(
            keys[..3].iter().map(|k| k.x()).collect::<Vec<_>>(),
            [0, 76, 152]
        );
        assert_eq!(keys[3].width(), 50);
        assert_eq!(kb.total_width(), 220);
    }

    #[test]
    fn resize_invalidates_the_grid() {
        let mut kb = build(&[row_of(&[100.0, 100.0, 100.0], 10.0)]);
        assert!(!kb.nearest_keys(300, 10).is_empty());
        let version = kb.geometry_version();
        kb.resize(160, 480);
        assert_eq!(kb.geometry_version(), version + 1);
        assert!(kb.nearest_keys(300, 10).is_empty());
        assert!(!kb.nearest_keys(150, 10).is_empty());
    }

    #[test]
    fn key_at_finds_the_tapped_key() {
        let mut kb = build(&[row_of(&[100.0, 100.0, 100.0], 10.0)]);
        // Keys sit at x = 10, 120, 230.
        assert_eq!(kb.key_at(15, 5), Some(0));
        assert_eq!(kb.key_at(125, 5), Some(1));
        assert_eq!(kb.key_at(329, 39), Some(2));
        // Gaps belong to nobody.
        assert_eq!(kb.key_at(5, 5), None);
        assert_eq!(kb.key_at(115, 5), None);
        assert_eq!(kb.key_at(-5, 5), None);
    }

    #[test]
    fn key_at_finds_wide_keys_the_grid_misses() {
        let tokens = [
            LayoutToken::KeyboardStart(KeyboardAttrs::default()),
            LayoutToken::RowStart(RowAttrs::default()),
            LayoutToken::KeyStart(Box::new(KeyAttrs {
                key_width: Some(Dimension::percent(10.0)),
                ..KeyAttrs::with_code(keycode::SHIFT)
            })),
            LayoutToken::KeyEnd,
            LayoutToken::KeyStart(Box::new(KeyAttrs {
                key_width: Some(Dimension::percent(80.0)),
                ..KeyAttrs::with_code(32)
            })),
            LayoutToken::KeyEnd,
            LayoutToken::KeyStart(Box::new(KeyAttrs {
                key_width: Some(Dimension::percent(10.0)),
                ..KeyAttrs::with_code(keycode::NEWLINE)
            })),
            LayoutToken::KeyEnd,
            LayoutToken::RowEnd,
        ];
        let mut kb = KeyboardBuilder::new(DisplayMetrics::new(1000, 2000))
            .build_from_tokens(tokens)
            .unwrap();
        // The space bar's centre is 400 px from the corners of the cell at x = 150,
        // well past the 180 px search radius.
        assert!(!kb.nearest_keys(150, 10).contains(&1));
        for x in (100..900).step_by(10) {
            assert_eq!(kb.key_at(x, 10), Some(1), "tap at x = {x}");
        }
        assert_eq!(kb.key_at(50, 10), Some(0));
        assert_eq!(kb.key_at(950, 10), Some(2));
        assert_eq!(kb.key_at(500, 60), None);
    }

    #[test]
    fn resize_saturates_instead_of_overflowing() {
        let mut kb = build(&[row_of(&[100.0, 100.0], 10.0)]);
        kb.resize(i32::MIN, 480);
        assert!(kb.keys().iter().all(|k| k.width() == 0));
        assert_eq!(kb.keys()[1].x(), 10);
    }

    #[test]
    fn keyboard_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<crate::Keyboard>();
    }

    #[test]
    fn invalidate_forces_rebuild() {
        let mut kb = build(&[row_of(&[100.0], 0.0)]);
        let first = kb.nearest_keys(10, 10).to_vec();
        kb.invalidate_proximity();
        assert_eq!(kb.nearest_keys(10, 10), first.as_slice());
    }
}
