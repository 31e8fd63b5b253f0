// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rows and keys of a built keyboard.

use kurbo::{Point, Rect};
use smallvec::SmallVec;
use softkey_proximity::KeyBounds;

use crate::types::{EdgeFlags, IconRef, KeyFace, KeyIndex, KeyVisualState, LayoutRef};

/// Codes a key produces, primary first. Usually one or two.
pub type KeyCodes = SmallVec<[i32; 4]>;

/// A row of keys.
///
/// Rows keep a by-value copy of the defaults they resolved while the keyboard was
/// built; their keys are referenced by index into [`Keyboard::keys`](crate::Keyboard::keys).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub(crate) default_width: i32,
    pub(crate) default_height: i32,
    pub(crate) default_horizontal_gap: i32,
    pub(crate) vertical_gap: i32,
    pub(crate) edge_flags: EdgeFlags,
    pub(crate) mode: i32,
    pub(crate) skipped: bool,
    pub(crate) keys: Vec<KeyIndex>,
}

impl Row {
    /// Default width of keys in this row.
    pub fn default_width(&self) -> i32 {
        self.default_width
    }

    /// Height of this row's keys.
    pub fn height(&self) -> i32 {
        self.default_height
    }

    /// Default gap before each key.
    pub fn default_horizontal_gap(&self) -> i32 {
        self.default_horizontal_gap
    }

    /// Gap after this row.
    pub fn vertical_gap(&self) -> i32 {
        self.vertical_gap
    }

    /// Boundaries this row touches.
    pub fn edge_flags(&self) -> EdgeFlags {
        self.edge_flags
    }

    /// Mode this row belongs to; `0` is every mode.
    pub fn mode(&self) -> i32 {
        self.mode
    }

    /// Whether the row was left out because its mode did not match.
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Indices of this row's keys, left to right.
    pub fn keys(&self) -> &[KeyIndex] {
        &self.keys
    }
}

/// A key with its geometry, behaviour and transient state.
#[derive(Clone, Debug, PartialEq)]
pub struct Key {
    pub(crate) codes: KeyCodes,
    pub(crate) label: Option<String>,
    pub(crate) icon: Option<IconRef>,
    pub(crate) icon_preview: Option<IconRef>,
    pub(crate) text: Option<String>,
    pub(crate) popup_characters: Option<String>,
    pub(crate) popup_layout: Option<LayoutRef>,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) gap: i32,
    pub(crate) edge_flags: EdgeFlags,
    pub(crate) sticky: bool,
    pub(crate) modifier: bool,
    pub(crate) repeatable: bool,
    pub(crate) pressed: bool,
    pub(crate) on: bool,
    pub(crate) row: usize,
}

impl Key {
    /// A key in `row` with that row's default geometry and no codes.
    pub(crate) fn in_row(row_index: usize, row: &Row) -> Self {
        Self {
            codes: KeyCodes::new(),
            label: None,
            icon: None,
            icon_preview: None,
            text: None,
            popup_characters: None,
            popup_layout: None,
            x: 0,
            y: 0,
            width: row.default_width,
            height: row.default_height,
            gap: row.default_horizontal_gap,
            edge_flags: row.edge_flags,
            sticky: false,
            modifier: false,
            repeatable: false,
            pressed: false,
            on: false,
            row: row_index,
        }
    }

    /// All codes, primary first. May be empty: such a key has no primary action.
    pub fn codes(&self) -> &[i32] {
        &self.codes
    }

    /// The primary code, if any.
    pub fn primary_code(&self) -> Option<i32> {
        self.codes.first().copied()
    }

    /// Label text.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Icon reference.
    pub fn icon(&self) -> Option<&IconRef> {
        self.icon.as_ref()
    }

    /// Icon for the press preview.
    pub fn icon_preview(&self) -> Option<&IconRef> {
        self.icon_preview.as_ref()
    }

    /// What to draw: the icon when present, otherwise the label.
    pub fn face(&self) -> KeyFace<'_> {
        match (&self.icon, &self.label) {
            (Some(icon), _) => KeyFace::Icon(icon),
            (None, Some(label)) => KeyFace::Label(label),
            (None, None) => KeyFace::Blank,
        }
    }

    /// Literal text to commit instead of the primary code (for example `.com`).
    pub fn output_text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Quick alternates for long press.
    pub fn popup_characters(&self) -> Option<&str> {
        self.popup_characters.as_deref()
    }

    /// Nested layout for long press.
    pub fn popup_layout(&self) -> Option<&LayoutRef> {
        self.popup_layout.as_ref()
    }

    /// Left edge in keyboard space.
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Top edge in keyboard space.
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Width, not including the gap.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Gap before this key.
    pub fn gap(&self) -> i32 {
        self.gap
    }

    /// Integer bounds, as indexed by the proximity grid.
    pub fn bounds(&self) -> KeyBounds {
        KeyBounds::new(self.x, self.y, self.width, self.height)
    }

    /// Bounds as a [`kurbo::Rect`] for drawing.
    pub fn rect(&self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x + self.width),
            f64::from(self.y + self.height),
        )
    }

    /// Centre as a [`kurbo::Point`], using the same integer halves as the index.
    pub fn center(&self) -> Point {
        let (cx, cy) = self.bounds().center();
        Point::new(f64::from(cx), f64::from(cy))
    }

    /// Boundaries this key touches (its own flags together with its row's).
    pub fn edge_flags(&self) -> EdgeFlags {
        self.edge_flags
    }

    /// Toggles on release.
    pub fn is_sticky(&self) -> bool {
        self.sticky
    }

    /// Participates in modifier bookkeeping.
    pub fn is_modifier(&self) -> bool {
        self.modifier
    }

    /// Auto-repeats while held. Enforced by the touch dispatcher, not here.
    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    /// Currently held down.
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Toggle state.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Index of the owning row in [`Keyboard::rows`](crate::Keyboard::rows).
    pub fn row(&self) -> usize {
        self.row
    }

    /// Flip the pressed state.
    pub fn on_pressed(&mut self) {
        self.pressed = !self.pressed;
    }

    /// Flip the pressed state; a sticky key released inside itself also flips its toggle.
    pub fn on_released(&mut self, inside: bool) {
        self.pressed = !self.pressed;
        if self.sticky && inside {
            self.on = !self.on;
        }
    }

    /// Set the toggle state directly.
    pub fn set_on(&mut self, on: bool) {
        self.on = on;
    }

    /// Drawable state class for the presentation layer.
    pub fn visual_state(&self) -> KeyVisualState {
        KeyVisualState::derive(self.sticky, self.on, self.pressed)
    }

    /// Whether the point falls on this key.
    ///
    /// The key covers `[x, x + width) × [y, y + height)`. A side flagged in
    /// [`edge_flags`](Self::edge_flags) is open toward the outside of the keyboard:
    /// a left-edge key also takes every point left of it, a bottom-edge key every
    /// point below it, and so on.
    pub fn is_inside(&self, x: i32, y: i32) -> bool {
        let flags = self.edge_flags;
        let right = self.x + self.width;
        let bottom = self.y + self.height;
        (x >= self.x || (flags.contains(EdgeFlags::LEFT) && x <= right))
            && (x < right || (flags.contains(EdgeFlags::RIGHT) && x >= self.x))
            && (y >= self.y || (flags.contains(EdgeFlags::TOP) && y <= bottom))
            && (y < bottom || (flags.contains(EdgeFlags::BOTTOM) && y >= self.y))
    }

    /// Squared distance from the key's centre to the point.
    pub fn squared_distance_from(&self, x: i32, y: i32) -> i64 {
        self.bounds().squared_distance_from(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(x: i32, y: i32, width: i32, height: i32, edge_flags: EdgeFlags) -> Key {
        let row = Row {
            default_width: width,
            default_height: height,
            default_horizontal_gap: 0,
            vertical_gap: 0,
            edge_flags,
            mode: 0,
            skipped: false,
            keys: Vec::new(),
        };
        let mut key = Key::in_row(0, &row);
        key.x = x;
        key.y = y;
        key
    }

    #[test]
    fn inside_is_half_open_without_edges() {
        let k = key(10, 10, 20, 20, EdgeFlags::empty());
        assert!(k.is_inside(10, 10));
        assert!(k.is_inside(29, 29));
        assert!(!k.is_inside(30, 15));
        assert!(!k.is_inside(15, 30));
        assert!(!k.is_inside(9, 15));
        assert!(!k.is_inside(15, 9));
    }

    #[test]
    fn edges_extend_outward_only() {
        let left = key(10, 10, 20, 20, EdgeFlags::LEFT);
        assert!(left.is_inside(-500, 15));
        assert!(left.is_inside(29, 15));
        assert!(!left.is_inside(30, 15));

        let right = key(10, 10, 20, 20, EdgeFlags::RIGHT);
        assert!(right.is_inside(10_000, 15));
        assert!(!right.is_inside(9, 15));

        let top = key(10, 10, 20, 20, EdgeFlags::TOP);
        assert!(top.is_inside(15, -3));
        assert!(!top.is_inside(15, 31));

        let bottom = key(10, 10, 20, 20, EdgeFlags::BOTTOM);
        assert!(bottom.is_inside(15, 900));
        assert!(!bottom.is_inside(15, 9));

        // A corner key still needs the other axis to match.
        let corner = key(0, 0, 20, 20, EdgeFlags::RIGHT | EdgeFlags::BOTTOM);
        assert!(corner.is_inside(50, 50));
        assert!(!corner.is_inside(-1, 50));
    }

    #[test]
    fn sticky_release_inside_toggles() {
        let mut k = key(0, 0, 10, 10, EdgeFlags::empty());
        k.sticky = true;
        k.on_pressed();
        assert_eq!(k.visual_state(), KeyVisualState::ToggleOffPressed);
        k.on_released(true);
        assert!(k.is_on());
        assert_eq!(k.visual_state(), KeyVisualState::ToggleOn);

        k.on_pressed();
        k.on_released(false);
        assert!(k.is_on(), "release outside keeps the toggle");
    }

    #[test]
    fn icon_wins_over_label() {
        let mut k = key(0, 0, 10, 10, EdgeFlags::empty());
        assert_eq!(k.face(), KeyFace::Blank);
        k.label = Some("a".into());
        assert_eq!(k.face(), KeyFace::Label("a"));
        k.icon = Some(IconRef::new("ic_key_shift"));
        assert!(matches!(k.face(), KeyFace::Icon(i) if i.name() == "ic_key_shift"));
    }

    #[test]
    fn rect_and_center() {
        let k = key(10, 20, 31, 40, EdgeFlags::empty());
        assert_eq!(k.rect(), Rect::new(10.0, 20.0, 41.0, 60.0));
        assert_eq!(k.center(), Point::new(25.0, 40.0));
        assert_eq!(k.squared_distance_from(25, 43), 9);
    }
}
