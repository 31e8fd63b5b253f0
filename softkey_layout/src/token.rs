// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The token stream a layout description is read as.
//!
//! Any tokenizer can feed the builder as long as it produces these tokens in
//! document order. Attribute bags hold only what the document spelled out;
//! everything absent is defaulted by the builder.

use crate::dimension::Dimension;
use crate::types::{EdgeFlags, IconRef, LayoutRef};

/// One structural event of a layout description.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutToken {
    /// The root element opened.
    KeyboardStart(KeyboardAttrs),
    /// A row opened.
    RowStart(RowAttrs),
    /// The current row closed.
    RowEnd,
    /// A key opened.
    KeyStart(Box<KeyAttrs>),
    /// The current key closed.
    KeyEnd,
}

/// Attributes of the root element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyboardAttrs {
    /// Default key width.
    pub key_width: Option<Dimension>,
    /// Default key height.
    pub key_height: Option<Dimension>,
    /// Default gap before each key.
    pub horizontal_gap: Option<Dimension>,
    /// Default gap after each row.
    pub vertical_gap: Option<Dimension>,
}

/// Attributes of a row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowAttrs {
    /// Default key width for this row.
    pub key_width: Option<Dimension>,
    /// Height of this row's keys.
    pub key_height: Option<Dimension>,
    /// Default gap before each key of this row.
    pub horizontal_gap: Option<Dimension>,
    /// Gap after this row.
    pub vertical_gap: Option<Dimension>,
    /// Boundaries this row touches.
    pub edge_flags: Option<EdgeFlags>,
    /// Keyboard mode this row belongs to; `0` or absent means every mode.
    pub mode: Option<i32>,
}

/// The `codes` attribute as written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodesAttr {
    /// A single integer.
    Single(i32),
    /// Comma-separated integers, parsed leniently by the builder.
    List(String),
}

/// Attributes of a key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyAttrs {
    /// Key width override.
    pub key_width: Option<Dimension>,
    /// Key height override.
    pub key_height: Option<Dimension>,
    /// Gap before this key.
    pub horizontal_gap: Option<Dimension>,
    /// Codes this key produces, primary first.
    pub codes: Option<CodesAttr>,
    /// Text shown on the key.
    pub label: Option<String>,
    /// Text committed instead of the primary code.
    pub output_text: Option<String>,
    /// Icon shown instead of the label.
    pub icon: Option<IconRef>,
    /// Icon for the press preview.
    pub icon_preview: Option<IconRef>,
    /// Quick alternates shown on long press.
    pub popup_characters: Option<String>,
    /// Nested layout shown on long press.
    pub popup_keyboard: Option<LayoutRef>,
    /// Auto-repeat while held.
    pub repeatable: Option<bool>,
    /// Participates in modifier bookkeeping.
    pub modifier: Option<bool>,
    /// Toggles on release.
    pub sticky: Option<bool>,
    /// Boundaries this key touches, in addition to its row's.
    pub edge_flags: Option<EdgeFlags>,
}

impl KeyAttrs {
    /// Attributes of a key producing one code.
    pub fn with_code(code: i32) -> Self {
        Self {
            codes: Some(CodesAttr::Single(code)),
            ..Self::default()
        }
    }

    /// Attributes of a key labelled `label`, whose code is derived from the label.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }
}
