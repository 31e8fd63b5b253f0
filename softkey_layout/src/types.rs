// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types shared by the layout model: key codes, edge flags, resource references.

pub use softkey_proximity::KeyIndex;

/// Reserved key codes. Non-negative codes are opaque character codes.
pub mod keycode {
    /// Shift modifier.
    pub const SHIFT: i32 = -1;
    /// Switch between letter and symbol layouts.
    pub const MODE_CHANGE: i32 = -2;
    /// Dismiss the keyboard.
    pub const CANCEL: i32 = -3;
    /// Done.
    pub const DONE: i32 = -4;
    /// Backspace.
    pub const DELETE: i32 = -5;
    /// Alt modifier.
    pub const ALT: i32 = -6;
    /// Options menu.
    pub const OPTIONS: i32 = -100;
    /// Switch input method.
    pub const LANGUAGE_SWITCH: i32 = -101;
    /// Line feed; the key carrying it is the keyboard's enter key.
    pub const NEWLINE: i32 = 10;
}

bitflags::bitflags! {
    /// Keyboard boundaries a row or key touches.
    ///
    /// A flagged side of a key accepts touches beyond it, so that presses landing in the
    /// margin outside the keyboard still reach the outermost keys.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EdgeFlags: u32 {
        /// Left edge.
        const LEFT   = 0x01;
        /// Right edge.
        const RIGHT  = 0x02;
        /// Top edge.
        const TOP    = 0x04;
        /// Bottom edge.
        const BOTTOM = 0x08;
    }
}

/// Opaque reference to an icon resource, resolved by the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IconRef(pub String);

impl IconRef {
    /// Build a reference from any string-like name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The resource name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Opaque reference to another layout description (for example a long-press popup).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LayoutRef(pub String);

impl LayoutRef {
    /// Build a reference from any string-like name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The resource name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// What a key shows. An icon wins over a label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyFace<'a> {
    /// Draw this icon.
    Icon(&'a IconRef),
    /// Draw this text.
    Label(&'a str),
    /// Nothing to draw.
    Blank,
}

/// Drawable state class of a key, derived from its sticky, on and pressed flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyVisualState {
    /// Ordinary key at rest.
    Plain,
    /// Ordinary key held down.
    PlainPressed,
    /// Toggle key, currently off.
    ToggleOff,
    /// Toggle key, currently off, held down.
    ToggleOffPressed,
    /// Toggle key, currently on.
    ToggleOn,
    /// Toggle key, currently on, held down.
    ToggleOnPressed,
}

impl KeyVisualState {
    /// Derive the state class. `on` is consulted first, so a key switched on
    /// programmatically reports a toggle-on class even when it is not sticky.
    pub const fn derive(sticky: bool, on: bool, pressed: bool) -> Self {
        match (on, sticky, pressed) {
            (true, _, false) => Self::ToggleOn,
            (true, _, true) => Self::ToggleOnPressed,
            (false, true, false) => Self::ToggleOff,
            (false, true, true) => Self::ToggleOffPressed,
            (false, false, false) => Self::Plain,
            (false, false, true) => Self::PlainPressed,
        }
    }

    /// Whether this class shows a pressed key.
    pub const fn is_pressed(self) -> bool {
        matches!(
            self,
            Self::PlainPressed | Self::ToggleOffPressed | Self::ToggleOnPressed
        )
    }
}
