// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Turning a token stream into a laid-out [`Keyboard`].

use core::convert::Infallible;

use smallvec::smallvec;
use thiserror::Error;

use crate::dimension::{Dimension, DisplayMetrics, resolve_layered};
use crate::key::{Key, KeyCodes, Row};
use crate::keyboard::Keyboard;
use crate::token::{CodesAttr, KeyAttrs, KeyboardAttrs, LayoutToken, RowAttrs};
use crate::types::{EdgeFlags, KeyIndex, keycode};

/// Hard-coded default key height, in pixels.
const DEFAULT_KEY_HEIGHT: i32 = 50;

/// Why a layout description could not be built.
///
/// `E` is the error type of the token source.
#[derive(Debug, Error)]
pub enum BuildError<E> {
    /// The token source itself failed.
    #[error("failed to read layout: {0}")]
    Source(#[source] E),
    /// A row or key appeared before the keyboard element.
    #[error("{0} appears before the Keyboard element")]
    MissingKeyboard(&'static str),
    /// A second keyboard element.
    #[error("layout has more than one Keyboard element")]
    DuplicateKeyboard,
    /// A key outside any row.
    #[error("Key appears outside a Row")]
    KeyOutsideRow,
    /// An element opened inside one that cannot contain it.
    #[error("{element} opened inside an open {parent}")]
    Nested {
        /// The element that was opened.
        element: &'static str,
        /// The element that was still open.
        parent: &'static str,
    },
    /// A close token with no matching open token.
    #[error("{0} closed but was never opened")]
    UnmatchedClose(&'static str),
    /// The stream ended inside an open element.
    #[error("layout ended inside an open {0}")]
    UnexpectedEnd(&'static str),
    /// A length resolved to fewer than zero pixels.
    #[error("{attribute} resolves to a negative length ({value} px)")]
    NegativeLength {
        /// The attribute that carried the length.
        attribute: &'static str,
        /// The resolved value.
        value: i32,
    },
    /// Placing a key or row moved a cursor past `i32::MAX` pixels.
    #[error("layout extends past the {0} pixel range")]
    GeometryOverflow(&'static str),
}

/// Resolve one step of the default chain, rejecting negative results.
fn length<E>(
    attribute: &'static str,
    local: Option<Dimension>,
    inherited: i32,
    base: i32,
    metrics: &DisplayMetrics,
) -> Result<i32, BuildError<E>> {
    let value = resolve_layered(local, inherited, base, metrics);
    if value < 0 {
        return Err(BuildError::NegativeLength { attribute, value });
    }
    Ok(value)
}

fn advance<E>(cursor: i32, by: i32, axis: &'static str) -> Result<i32, BuildError<E>> {
    cursor
        .checked_add(by)
        .ok_or(BuildError::GeometryOverflow(axis))
}

/// Builds keyboards for one display and mode.
///
/// ```
/// use softkey_layout::{
///     Dimension, DisplayMetrics, KeyAttrs, KeyboardAttrs, KeyboardBuilder, LayoutToken,
///     RowAttrs,
/// };
///
/// let keyboard = KeyboardBuilder::new(DisplayMetrics::new(300, 400))
///     .build_from_tokens([
///         LayoutToken::KeyboardStart(KeyboardAttrs {
///             key_width: Some(Dimension::percent(50.0)),
///             ..KeyboardAttrs::default()
///         }),
///         LayoutToken::RowStart(RowAttrs::default()),
///         LayoutToken::KeyStart(Box::new(KeyAttrs::with_label("q"))),
///         LayoutToken::KeyEnd,
///         LayoutToken::KeyStart(Box::new(KeyAttrs::with_label("w"))),
///         LayoutToken::KeyEnd,
///         LayoutToken::RowEnd,
///     ])
///     .unwrap();
///
/// assert_eq!(keyboard.total_width(), 300);
/// assert_eq!(keyboard.keys()[1].x(), 150);
/// assert_eq!(keyboard.keys()[1].primary_code(), Some('w' as i32));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyboardBuilder {
    metrics: DisplayMetrics,
    mode: i32,
}

impl KeyboardBuilder {
    /// A builder for `metrics`, in mode `0`.
    pub const fn new(metrics: DisplayMetrics) -> Self {
        Self { metrics, mode: 0 }
    }

    /// Select the active mode. Rows of other non-zero modes are skipped.
    #[must_use]
    pub const fn with_mode(mut self, mode: i32) -> Self {
        self.mode = mode;
        self
    }

    /// Display metrics keyboards are built for.
    pub const fn metrics(&self) -> &DisplayMetrics {
        &self.metrics
    }

    /// Active mode.
    pub const fn mode(&self) -> i32 {
        self.mode
    }

    /// Build a keyboard from a fallible token source.
    ///
    /// The first error, from the source or from the token structure, aborts the
    /// build. A stream with no keyboard element at all yields an empty keyboard
    /// carrying the hard-coded defaults.
    pub fn build<I, E>(&self, tokens: I) -> Result<Keyboard, BuildError<E>>
    where
        I: IntoIterator<Item = Result<LayoutToken, E>>,
    {
        let mut state = LayoutState::new(&self.metrics, self.mode);
        for token in tokens {
            state.apply(token.map_err(BuildError::Source)?)?;
        }
        state.finish()
    }

    /// Build a keyboard from tokens already in memory.
    pub fn build_from_tokens(
        &self,
        tokens: impl IntoIterator<Item = LayoutToken>,
    ) -> Result<Keyboard, BuildError<Infallible>> {
        self.build(tokens.into_iter().map(Ok))
    }

    /// Build a popup keyboard with one key per character.
    ///
    /// `template` supplies the defaults (usually a lone keyboard element). The
    /// characters are appended as one extra row flagged top and bottom, flowing left
    /// to right and wrapping when `columns` keys are on a line or when the next key
    /// plus `horizontal_padding` would pass the display width.
    pub fn build_popup(
        &self,
        template: impl IntoIterator<Item = LayoutToken>,
        characters: &str,
        columns: Option<usize>,
        horizontal_padding: i32,
    ) -> Result<Keyboard, BuildError<Infallible>> {
        let mut keyboard = self.build_from_tokens(template)?;
        let row_index = keyboard.rows.len();
        let mut row = Row {
            default_width: keyboard.default_width,
            default_height: keyboard.default_height,
            default_horizontal_gap: keyboard.default_horizontal_gap,
            vertical_gap: keyboard.default_vertical_gap,
            edge_flags: EdgeFlags::TOP | EdgeFlags::BOTTOM,
            mode: 0,
            skipped: false,
            keys: Vec::new(),
        };
        let max_columns = columns.unwrap_or(usize::MAX);
        let (mut x, mut y, mut column): (i32, i32, usize) = (0, 0, 0);
        let line_height = advance(
            keyboard.default_vertical_gap,
            keyboard.default_height,
            "vertical",
        )?;
        for ch in characters.chars() {
            let right = x
                .saturating_add(keyboard.default_width)
                .saturating_add(horizontal_padding);
            if column >= max_columns || right > keyboard.display_width() {
                x = 0;
                y = advance(y, line_height, "vertical")?;
                column = 0;
            }
            let mut key = Key::in_row(row_index, &row);
            key.x = x;
            key.y = y;
            key.label = Some(ch.to_string());
            key.codes = char_code(ch).into_iter().collect();
            column += 1;
            x = advance(x, key.width, "horizontal")?;
            x = advance(x, key.gap, "horizontal")?;
            row.keys.push(keyboard.keys.len());
            keyboard.keys.push(key);
            keyboard.total_width = keyboard.total_width.max(x);
        }
        keyboard.total_height = advance(y, keyboard.default_height, "vertical")?;
        tracing::debug!(
            keys = row.keys.len(),
            total_width = keyboard.total_width,
            total_height = keyboard.total_height,
            "built popup keyboard"
        );
        keyboard.rows.push(row);
        Ok(keyboard)
    }
}

/// What is currently open in the token stream.
#[derive(Clone, Copy, Debug)]
enum Open {
    Nothing,
    Row(usize),
    SkippedRow,
    Key(KeyIndex),
}

struct LayoutState<'m> {
    metrics: &'m DisplayMetrics,
    mode: i32,
    keyboard: Option<Keyboard>,
    open: Open,
    x: i32,
    y: i32,
}

impl<'m> LayoutState<'m> {
    fn new(metrics: &'m DisplayMetrics, mode: i32) -> Self {
        Self {
            metrics,
            mode,
            keyboard: None,
            open: Open::Nothing,
            x: 0,
            y: 0,
        }
    }

    fn apply<E>(&mut self, token: LayoutToken) -> Result<(), BuildError<E>> {
        if let Open::SkippedRow = self.open {
            return self.skip(token);
        }
        match token {
            LayoutToken::KeyboardStart(attrs) => {
                if self.keyboard.is_some() {
                    return Err(BuildError::DuplicateKeyboard);
                }
                self.keyboard = Some(self.start_keyboard(&attrs)?);
            }
            LayoutToken::RowStart(attrs) => self.start_row(&attrs)?,
            LayoutToken::RowEnd => self.end_row()?,
            LayoutToken::KeyStart(attrs) => self.start_key(&attrs)?,
            LayoutToken::KeyEnd => self.end_key()?,
        }
        Ok(())
    }

    /// Inside a mode-mismatched row everything up to its close is ignored.
    fn skip<E>(&mut self, token: LayoutToken) -> Result<(), BuildError<E>> {
        match token {
            LayoutToken::KeyboardStart(_) => Err(BuildError::DuplicateKeyboard),
            LayoutToken::RowStart(_) => Err(BuildError::Nested {
                element: "Row",
                parent: "Row",
            }),
            LayoutToken::RowEnd => {
                self.open = Open::Nothing;
                Ok(())
            }
            LayoutToken::KeyStart(_) | LayoutToken::KeyEnd => Ok(()),
        }
    }

    fn start_keyboard<E>(&self, attrs: &KeyboardAttrs) -> Result<Keyboard, BuildError<E>> {
        let metrics = self.metrics;
        let (width, height) = (metrics.width, metrics.height);
        let mut keyboard = Keyboard::new(*metrics, self.mode);
        keyboard.default_width = length("keyWidth", attrs.key_width, width / 10, width, metrics)?;
        keyboard.default_height = length(
            "keyHeight",
            attrs.key_height,
            DEFAULT_KEY_HEIGHT,
            height,
            metrics,
        )?;
        keyboard.default_horizontal_gap =
            length("horizontalGap", attrs.horizontal_gap, 0, width, metrics)?;
        keyboard.default_vertical_gap =
            length("verticalGap", attrs.vertical_gap, 0, height, metrics)?;
        keyboard.update_proximity_threshold();
        Ok(keyboard)
    }

    fn start_row<E>(&mut self, attrs: &RowAttrs) -> Result<(), BuildError<E>> {
        let metrics = self.metrics;
        let keyboard = self
            .keyboard
            .as_mut()
            .ok_or(BuildError::MissingKeyboard("Row"))?;
        match self.open {
            Open::Nothing => {}
            Open::Row(_) | Open::SkippedRow => {
                return Err(BuildError::Nested {
                    element: "Row",
                    parent: "Row",
                });
            }
            Open::Key(_) => {
                return Err(BuildError::Nested {
                    element: "Row",
                    parent: "Key",
                });
            }
        }
        let mode = attrs.mode.unwrap_or(0);
        let skipped = mode != 0 && mode != self.mode;
        let row = Row {
            default_width: length(
                "keyWidth",
                attrs.key_width,
                keyboard.default_width,
                metrics.width,
                metrics,
            )?,
            default_height: length(
                "keyHeight",
                attrs.key_height,
                keyboard.default_height,
                metrics.height,
                metrics,
            )?,
            default_horizontal_gap: length(
                "horizontalGap",
                attrs.horizontal_gap,
                keyboard.default_horizontal_gap,
                metrics.width,
                metrics,
            )?,
            vertical_gap: length(
                "verticalGap",
                attrs.vertical_gap,
                keyboard.default_vertical_gap,
                metrics.height,
                metrics,
            )?,
            edge_flags: attrs.edge_flags.unwrap_or_default(),
            mode,
            skipped,
            keys: Vec::new(),
        };
        let index = keyboard.rows.len();
        keyboard.rows.push(row);
        self.x = 0;
        if skipped {
            tracing::debug!(row = index, mode, active = self.mode, "skipping row");
            self.open = Open::SkippedRow;
        } else {
            self.open = Open::Row(index);
        }
        Ok(())
    }

    fn end_row<E>(&mut self) -> Result<(), BuildError<E>> {
        match self.open {
            Open::Row(index) => {
                if let Some(row) = self.keyboard.as_ref().and_then(|kb| kb.rows.get(index)) {
                    let y = advance(self.y, row.vertical_gap, "vertical")?;
                    self.y = advance(y, row.default_height, "vertical")?;
                }
                self.open = Open::Nothing;
                Ok(())
            }
            Open::Key(_) => Err(BuildError::UnexpectedEnd("Key")),
            Open::Nothing | Open::SkippedRow => Err(BuildError::UnmatchedClose("Row")),
        }
    }

    fn start_key<E>(&mut self, attrs: &KeyAttrs) -> Result<(), BuildError<E>> {
        let metrics = self.metrics;
        let keyboard = self
            .keyboard
            .as_mut()
            .ok_or(BuildError::MissingKeyboard("Key"))?;
        let row_index = match self.open {
            Open::Row(index) => index,
            Open::Key(_) => {
                return Err(BuildError::Nested {
                    element: "Key",
                    parent: "Key",
                });
            }
            Open::Nothing | Open::SkippedRow => return Err(BuildError::KeyOutsideRow),
        };
        let Some(row) = keyboard.rows.get(row_index) else {
            return Err(BuildError::KeyOutsideRow);
        };

        let mut key = Key::in_row(row_index, row);
        key.width = length(
            "keyWidth",
            attrs.key_width,
            row.default_width,
            metrics.width,
            metrics,
        )?;
        key.height = length(
            "keyHeight",
            attrs.key_height,
            row.default_height,
            metrics.height,
            metrics,
        )?;
        key.gap = length(
            "horizontalGap",
            attrs.horizontal_gap,
            row.default_horizontal_gap,
            metrics.width,
            metrics,
        )?;
        key.x = advance(self.x, key.gap, "horizontal")?;
        key.y = self.y;
        // The right edge is checked when the key closes.
        advance::<E>(key.y, key.height, "vertical")?;
        key.codes = parse_codes(attrs.codes.as_ref(), attrs.label.as_deref());
        key.label.clone_from(&attrs.label);
        key.text.clone_from(&attrs.output_text);
        key.icon.clone_from(&attrs.icon);
        key.icon_preview.clone_from(&attrs.icon_preview);
        key.popup_characters.clone_from(&attrs.popup_characters);
        key.popup_layout.clone_from(&attrs.popup_keyboard);
        key.repeatable = attrs.repeatable.unwrap_or(false);
        key.modifier = attrs.modifier.unwrap_or(false);
        key.sticky = attrs.sticky.unwrap_or(false);
        key.edge_flags = row.edge_flags | attrs.edge_flags.unwrap_or_default();

        let index = keyboard.keys.len();
        match key.primary_code() {
            Some(keycode::SHIFT) => {
                if let Some(slot) = keyboard.shift_keys.iter_mut().find(|slot| slot.is_none()) {
                    *slot = Some(index);
                }
                keyboard.modifier_keys.push(index);
            }
            Some(keycode::ALT) => keyboard.modifier_keys.push(index),
            Some(keycode::NEWLINE) => keyboard.enter_key = Some(index),
            _ => {}
        }
        keyboard.keys.push(key);
        if let Some(row) = keyboard.rows.get_mut(row_index) {
            row.keys.push(index);
        }
        self.open = Open::Key(index);
        Ok(())
    }

    fn end_key<E>(&mut self) -> Result<(), BuildError<E>> {
        let Open::Key(index) = self.open else {
            return Err(BuildError::UnmatchedClose("Key"));
        };
        if let Some(keyboard) = self.keyboard.as_mut()
            && let Some(key) = keyboard.keys.get(index)
        {
            let x = advance(self.x, key.width, "horizontal")?;
            self.x = advance(x, key.gap, "horizontal")?;
            keyboard.total_width = keyboard.total_width.max(self.x);
            self.open = Open::Row(key.row);
        }
        Ok(())
    }

    fn finish<E>(self) -> Result<Keyboard, BuildError<E>> {
        match self.open {
            Open::Nothing => {}
            Open::Row(_) | Open::SkippedRow => return Err(BuildError::UnexpectedEnd("Row")),
            Open::Key(_) => return Err(BuildError::UnexpectedEnd("Key")),
        }
        let Some(mut keyboard) = self.keyboard else {
            return Ok(Keyboard::new(*self.metrics, self.mode));
        };
        keyboard.total_height = (self.y - keyboard.default_vertical_gap).max(0);
        tracing::debug!(
            rows = keyboard.rows.len(),
            keys = keyboard.keys.len(),
            total_width = keyboard.total_width,
            total_height = keyboard.total_height,
            "built keyboard"
        );
        Ok(keyboard)
    }
}

fn char_code(ch: char) -> Option<i32> {
    i32::try_from(u32::from(ch)).ok()
}

/// Resolve a key's codes.
///
/// A list is split on commas; tokens that are not integers are logged and
/// dropped. When no codes remain, a non-empty label supplies its first character.
pub(crate) fn parse_codes(codes: Option<&CodesAttr>, label: Option<&str>) -> KeyCodes {
    let mut parsed: KeyCodes = match codes {
        Some(CodesAttr::Single(code)) => smallvec![*code],
        Some(CodesAttr::List(list)) => list
            .split(',')
            .filter_map(|token| match token.trim().parse::<i32>() {
                Ok(code) => Some(code),
                Err(err) => {
                    tracing::warn!(token, list = list.as_str(), %err, "skipping malformed key code");
                    None
                }
            })
            .collect(),
        None => KeyCodes::new(),
    };
    if parsed.is_empty()
        && let Some(code) = label.and_then(|label| label.chars().next()).and_then(char_code)
    {
        parsed.push(code);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyboard_start() -> LayoutToken {
        LayoutToken::KeyboardStart(KeyboardAttrs::default())
    }

    fn row(mode: i32) -> LayoutToken {
        LayoutToken::RowStart(RowAttrs {
            mode: Some(mode),
            ..RowAttrs::default()
        })
    }

    fn key(attrs: KeyAttrs) -> [LayoutToken; 2] {
        [LayoutToken::KeyStart(Box::new(attrs)), LayoutToken::KeyEnd]
    }

    fn sized(width: f32, gap: f32, code: i32) -> KeyAttrs {
        KeyAttrs {
            key_width: Some(Dimension::px(width)),
            horizontal_gap: Some(Dimension::px(gap)),
            ..KeyAttrs::with_code(code)
        }
    }

    fn builder() -> KeyboardBuilder {
        KeyboardBuilder::new(DisplayMetrics::new(320, 480))
    }

    #[test]
    fn three_keys_fill_the_display() {
        let mut tokens = vec![keyboard_start(), row(0)];
        // The first key carries no gap.
        tokens.extend(key(sized(100.0, 0.0, 97)));
        tokens.extend(key(sized(100.0, 10.0, 98)));
        tokens.extend(key(sized(100.0, 10.0, 99)));
        tokens.push(LayoutToken::RowEnd);
        let kb = builder().build_from_tokens(tokens).unwrap();

        let xs: Vec<_> = kb.keys().iter().map(Key::x).collect();
        assert_eq!(xs, [0, 110, 220]);
        assert_eq!(kb.total_width(), 320);
        assert_eq!(kb.total_height(), 50);
    }

    #[test]
    fn empty_stream_yields_defaults() {
        let kb = builder().build_from_tokens([]).unwrap();
        assert!(kb.keys().is_empty());
        assert_eq!(kb.default_width(), 32);
        assert_eq!(kb.default_height(), 50);
        assert_eq!((kb.total_width(), kb.total_height()), (0, 0));
        // (32 * 1.8) truncates to 57 before squaring.
        assert_eq!(kb.proximity_threshold(), 57 * 57);
    }

    #[test]
    fn keyboard_defaults_flow_to_keys() {
        let tokens = [
            LayoutToken::KeyboardStart(KeyboardAttrs {
                key_width: Some(Dimension::percent(25.0)),
                key_height: Some(Dimension::percent(10.0)),
                horizontal_gap: Some(Dimension::px(4.0)),
                vertical_gap: Some(Dimension::px(6.0)),
            }),
            LayoutToken::RowStart(RowAttrs {
                key_height: Some(Dimension::px(30.0)),
                ..RowAttrs::default()
            }),
            LayoutToken::KeyStart(Box::new(KeyAttrs::with_code(1))),
            LayoutToken::KeyEnd,
            LayoutToken::KeyStart(Box::new(KeyAttrs {
                key_width: Some(Dimension::px(20.0)),
                ..KeyAttrs::with_code(2)
            })),
            LayoutToken::KeyEnd,
            LayoutToken::RowEnd,
            row(0),
            LayoutToken::KeyStart(Box::new(KeyAttrs::with_code(3))),
            LayoutToken::KeyEnd,
            LayoutToken::RowEnd,
        ];
        let kb = builder().build_from_tokens(tokens).unwrap();
        let geometry: Vec<_> = kb
            .keys()
            .iter()
            .map(|k| (k.x(), k.y(), k.width(), k.height()))
            .collect();
        assert_eq!(geometry, [(4, 0, 80, 30), (88, 0, 20, 30), (4, 36, 80, 48)]);
        assert_eq!(kb.total_width(), 108);
        // 30 + 6 + 48 + 6 - 6
        assert_eq!(kb.total_height(), 84);
    }

    #[test]
    fn mode_filters_rows() {
        let layout = |active: i32| {
            let mut tokens = vec![keyboard_start()];
            for (mode, code) in [(0, 1), (1, 2), (2, 3)] {
                tokens.push(row(mode));
                tokens.extend(key(KeyAttrs::with_code(code)));
                tokens.push(LayoutToken::RowEnd);
            }
            builder().with_mode(active).build_from_tokens(tokens).unwrap()
        };

        let kb = layout(1);
        let codes: Vec<_> = kb.keys().iter().filter_map(Key::primary_code).collect();
        assert_eq!(codes, [1, 2]);
        assert_eq!(kb.rows().len(), 3);
        assert!(kb.rows()[2].is_skipped());
        assert!(kb.rows()[2].keys().is_empty());
        assert_eq!(kb.total_height(), 100);

        let kb = layout(2);
        let codes: Vec<_> = kb.keys().iter().filter_map(Key::primary_code).collect();
        assert_eq!(codes, [1, 3]);
        // The skipped row does not push later rows down.
        assert_eq!(kb.keys()[1].y(), 50);

        let kb = layout(0);
        assert_eq!(kb.keys().len(), 1);
    }

    #[test]
    fn building_twice_is_identical() {
        let tokens = || {
            let mut t = vec![keyboard_start(), row(0)];
            t.extend(key(sized(40.0, 3.0, 97)));
            t.extend(key(KeyAttrs::with_label("b")));
            t.push(LayoutToken::RowEnd);
            t
        };
        let a = builder().build_from_tokens(tokens()).unwrap();
        let b = builder().build_from_tokens(tokens()).unwrap();
        assert_eq!(a.keys(), b.keys());
        assert_eq!(a.rows(), b.rows());
        assert_eq!(
            (a.total_width(), a.total_height()),
            (b.total_width(), b.total_height())
        );
    }

    #[test]
    fn totals_bound_every_key() {
        let mut tokens = vec![keyboard_start()];
        for widths in [[50.0, 70.0, 20.0], [90.0, 90.0, 90.0]] {
            tokens.push(row(0));
            for w in widths {
                tokens.extend(key(sized(w, 5.0, 97)));
            }
            tokens.push(LayoutToken::RowEnd);
        }
        let kb = builder().build_from_tokens(tokens).unwrap();
        for k in kb.keys() {
            assert!(k.x() >= 0 && k.y() >= 0);
            assert!(k.width() > 0 && k.height() > 0);
        }
        let right = kb.keys().iter().map(|k| k.x() + k.width()).max();
        assert_eq!(right, Some(kb.total_width()));
        let bottom = kb.keys().iter().map(|k| k.y() + k.height()).max();
        assert_eq!(bottom, Some(kb.total_height()));
    }

    #[test]
    fn registers_shift_alt_and_enter() {
        let mut tokens = vec![keyboard_start(), row(0)];
        for code in [
            keycode::SHIFT,
            keycode::ALT,
            keycode::NEWLINE,
            keycode::SHIFT,
            keycode::SHIFT,
            keycode::NEWLINE,
        ] {
            tokens.extend(key(KeyAttrs::with_code(code)));
        }
        tokens.push(LayoutToken::RowEnd);
        let kb = builder().build_from_tokens(tokens).unwrap();
        assert_eq!(kb.shift_key_indices(), [Some(0), Some(3)]);
        assert_eq!(kb.modifier_keys(), &[0, 1, 3, 4]);
        assert_eq!(kb.enter_key(), Some(5));
    }

    #[test]
    fn edge_flags_combine_row_and_key() {
        let tokens = [
            keyboard_start(),
            LayoutToken::RowStart(RowAttrs {
                edge_flags: Some(EdgeFlags::BOTTOM),
                ..RowAttrs::default()
            }),
            LayoutToken::KeyStart(Box::new(KeyAttrs {
                edge_flags: Some(EdgeFlags::RIGHT),
                ..KeyAttrs::with_code(97)
            })),
            LayoutToken::KeyEnd,
            LayoutToken::RowEnd,
        ];
        let kb = builder().build_from_tokens(tokens).unwrap();
        let k = &kb.keys()[0];
        assert_eq!(k.edge_flags(), EdgeFlags::RIGHT | EdgeFlags::BOTTOM);
        // A right-edge key reaches the display's edge.
        assert!(k.is_inside(kb.display_width(), 10));
    }

    #[test]
    fn code_lists_skip_bad_tokens() {
        let list = |s: &str| CodesAttr::List(s.into());
        assert_eq!(
            parse_codes(Some(&list("97, 98,x,99")), None).as_slice(),
            [97, 98, 99]
        );
        assert_eq!(parse_codes(Some(&CodesAttr::Single(-5)), Some("del")).as_slice(), [-5]);
        assert_eq!(parse_codes(None, Some("Ab")).as_slice(), [65]);
        assert_eq!(parse_codes(Some(&list("nope")), Some("é")).as_slice(), [0xe9]);
        assert!(parse_codes(Some(&list("nope")), None).is_empty());
        assert!(parse_codes(None, Some("")).is_empty());
    }

    #[test]
    fn structural_errors() {
        type R = Result<Keyboard, BuildError<Infallible>>;
        let build = |tokens: Vec<LayoutToken>| -> R { builder().build_from_tokens(tokens) };
        let key_start = || LayoutToken::KeyStart(Box::new(KeyAttrs::with_code(1)));

        assert!(matches!(
            build(vec![row(0)]),
            Err(BuildError::MissingKeyboard("Row"))
        ));
        assert!(matches!(
            build(vec![keyboard_start(), keyboard_start()]),
            Err(BuildError::DuplicateKeyboard)
        ));
        assert!(matches!(
            build(vec![keyboard_start(), key_start()]),
            Err(BuildError::KeyOutsideRow)
        ));
        assert!(matches!(
            build(vec![keyboard_start(), row(0), row(0)]),
            Err(BuildError::Nested {
                element: "Row",
                parent: "Row"
            })
        ));
        assert!(matches!(
            build(vec![keyboard_start(), row(0), key_start(), key_start()]),
            Err(BuildError::Nested {
                element: "Key",
                parent: "Key"
            })
        ));
        assert!(matches!(
            build(vec![keyboard_start(), LayoutToken::RowEnd]),
            Err(BuildError::UnmatchedClose("Row"))
        ));
        assert!(matches!(
            build(vec![keyboard_start(), row(0), LayoutToken::KeyEnd]),
            Err(BuildError::UnmatchedClose("Key"))
        ));
        assert!(matches!(
            build(vec![keyboard_start(), row(0)]),
            Err(BuildError::UnexpectedEnd("Row"))
        ));
        assert!(matches!(
            build(vec![keyboard_start(), row(7)]),
            Err(BuildError::UnexpectedEnd("Row"))
        ));
        assert!(matches!(
            build(vec![keyboard_start(), row(0), key_start()]),
            Err(BuildError::UnexpectedEnd("Key"))
        ));
    }

    #[test]
    fn negative_lengths_are_rejected() {
        let mut tokens = vec![keyboard_start(), row(0)];
        tokens.extend(key(sized(-40.0, 0.0, 97)));
        tokens.push(LayoutToken::RowEnd);
        assert!(matches!(
            builder().build_from_tokens(tokens),
            Err(BuildError::NegativeLength {
                attribute: "keyWidth",
                value: -40
            })
        ));

        let tokens = [LayoutToken::KeyboardStart(KeyboardAttrs {
            vertical_gap: Some(Dimension::px(-1.0)),
            ..KeyboardAttrs::default()
        })];
        assert!(matches!(
            builder().build_from_tokens(tokens),
            Err(BuildError::NegativeLength {
                attribute: "verticalGap",
                value: -1
            })
        ));

        // Zero is still a valid gap.
        let mut tokens = vec![keyboard_start(), row(0)];
        tokens.extend(key(sized(40.0, 0.0, 97)));
        tokens.push(LayoutToken::RowEnd);
        assert!(builder().build_from_tokens(tokens).is_ok());
    }

    #[test]
    fn huge_lengths_fail_instead_of_wrapping() {
        // Each width saturates to `i32::MAX`; the second one cannot be placed.
        let mut tokens = vec![keyboard_start(), row(0)];
        tokens.extend(key(sized(3.0e9, 0.0, 97)));
        tokens.extend(key(sized(3.0e9, 0.0, 98)));
        tokens.push(LayoutToken::RowEnd);
        assert!(matches!(
            builder().build_from_tokens(tokens),
            Err(BuildError::GeometryOverflow("horizontal"))
        ));

        let tall = || {
            LayoutToken::RowStart(RowAttrs {
                key_height: Some(Dimension::px(3.0e9)),
                ..RowAttrs::default()
            })
        };
        let mut tokens = vec![keyboard_start()];
        for _ in 0..2 {
            tokens.push(tall());
            tokens.extend(key(KeyAttrs::with_code(97)));
            tokens.push(LayoutToken::RowEnd);
        }
        assert!(matches!(
            builder().build_from_tokens(tokens),
            Err(BuildError::GeometryOverflow("vertical"))
        ));
    }

    #[test]
    fn huge_popup_keys_fail_instead_of_wrapping() {
        let template = [LayoutToken::KeyboardStart(KeyboardAttrs {
            key_width: Some(Dimension::px(3.0e9)),
            ..KeyboardAttrs::default()
        })];
        let result = KeyboardBuilder::new(DisplayMetrics::new(i32::MAX, 400))
            .build_popup(template, "ab", None, 0);
        assert!(matches!(
            result,
            Err(BuildError::GeometryOverflow("horizontal"))
        ));
    }

    #[test]
    fn source_errors_abort() {
        #[derive(Debug, PartialEq)]
        struct Broken;
        impl core::fmt::Display for Broken {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str("broken")
            }
        }
        impl std::error::Error for Broken {}

        let result = builder().build([Ok(keyboard_start()), Err(Broken)]);
        let err = result.unwrap_err();
        assert!(matches!(err, BuildError::Source(Broken)));
        assert_eq!(err.to_string(), "failed to read layout: broken");
    }

    #[test]
    fn popup_wraps_at_display_edge() {
        let template = [LayoutToken::KeyboardStart(KeyboardAttrs {
            key_width: Some(Dimension::px(30.0)),
            key_height: Some(Dimension::px(20.0)),
            ..KeyboardAttrs::default()
        })];
        let kb = KeyboardBuilder::new(DisplayMetrics::new(100, 400))
            .build_popup(template.clone(), "abcde", None, 0)
            .unwrap();
        let positions: Vec<_> = kb.keys().iter().map(|k| (k.x(), k.y())).collect();
        assert_eq!(positions, [(0, 0), (30, 0), (60, 0), (0, 20), (30, 20)]);
        assert_eq!((kb.total_width(), kb.total_height()), (90, 40));
        assert_eq!(kb.rows().len(), 1);
        assert_eq!(kb.rows()[0].edge_flags(), EdgeFlags::TOP | EdgeFlags::BOTTOM);
        assert_eq!(kb.keys()[3].label(), Some("d"));
        assert_eq!(kb.keys()[3].codes(), &['d' as i32]);

        let kb = KeyboardBuilder::new(DisplayMetrics::new(100, 400))
            .build_popup(template, "abcde", Some(2), 0)
            .unwrap();
        let positions: Vec<_> = kb.keys().iter().map(|k| (k.x(), k.y())).collect();
        assert_eq!(positions, [(0, 0), (30, 0), (0, 20), (30, 20), (0, 40)]);
        assert_eq!((kb.total_width(), kb.total_height()), (60, 60));
    }

    #[test]
    fn popup_padding_wraps_earlier() {
        let template = [LayoutToken::KeyboardStart(KeyboardAttrs {
            key_width: Some(Dimension::px(30.0)),
            ..KeyboardAttrs::default()
        })];
        let mut kb = KeyboardBuilder::new(DisplayMetrics::new(100, 400))
            .build_popup(template, "abc", None, 20)
            .unwrap();
        let ys: Vec<_> = kb.keys().iter().map(Key::y).collect();
        assert_eq!(ys, [0, 0, 50]);
        assert_eq!(kb.key_at(35, 10), Some(1));
    }
}
