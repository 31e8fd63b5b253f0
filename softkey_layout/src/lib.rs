// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Softkey Layout: declarative soft keyboard layouts turned into pixel geometry.
//!
//! A layout description is a `Keyboard` of `Row`s of `Key`s whose sizes are given
//! as absolute lengths or as fractions of the display. [`KeyboardBuilder`] reads
//! such a description as a stream of [`LayoutToken`]s and produces a [`Keyboard`]
//! with every key placed in pixels. The keyboard then answers the questions a touch
//! dispatcher asks:
//!
//! - which keys are near a touch ([`Keyboard::nearest_keys`], backed by a 10×5
//!   proximity grid built on demand);
//! - whether a touch falls on a key ([`Key::is_inside`], with edge keys accepting
//!   touches past the keyboard's border);
//! - shift state ([`Keyboard::set_shift`]), horizontal squeezing
//!   ([`Keyboard::resize`]) and enter-key relabelling ([`Keyboard::set_ime_options`]).
//!
//! With the `xml` feature (on by default) [`XmlLayoutReader`] provides the token
//! stream from an XML document.
//!
//! # Example
//!
//! ```
//! use softkey_layout::{
//!     Dimension, DisplayMetrics, EdgeFlags, KeyAttrs, KeyboardAttrs, KeyboardBuilder,
//!     LayoutToken, RowAttrs, keycode,
//! };
//!
//! let key = |attrs: KeyAttrs| [LayoutToken::KeyStart(Box::new(attrs)), LayoutToken::KeyEnd];
//! let mut tokens = vec![
//!     LayoutToken::KeyboardStart(KeyboardAttrs {
//!         key_width: Some(Dimension::percent(25.0)),
//!         key_height: Some(Dimension::px(60.0)),
//!         ..KeyboardAttrs::default()
//!     }),
//!     LayoutToken::RowStart(RowAttrs {
//!         edge_flags: Some(EdgeFlags::TOP | EdgeFlags::BOTTOM),
//!         ..RowAttrs::default()
//!     }),
//! ];
//! tokens.extend(key(KeyAttrs::with_code(keycode::SHIFT)));
//! for label in ["a", "b", "c"] {
//!     tokens.extend(key(KeyAttrs::with_label(label)));
//! }
//! tokens.push(LayoutToken::RowEnd);
//!
//! let mut keyboard = KeyboardBuilder::new(DisplayMetrics::new(400, 800))
//!     .build_from_tokens(tokens)
//!     .unwrap();
//! assert_eq!((keyboard.total_width(), keyboard.total_height()), (400, 60));
//!
//! // A touch on "b" finds it among its neighbours.
//! let hit = keyboard.key_at(250, 30).unwrap();
//! assert_eq!(keyboard.keys()[hit].label(), Some("b"));
//! assert!(keyboard.nearest_keys(250, 30).contains(&hit));
//!
//! // Shift reports whether anything changed.
//! assert!(keyboard.set_shift(true));
//! assert!(!keyboard.set_shift(true));
//! ```

mod builder;
mod dimension;
mod ime;
mod key;
mod keyboard;
mod token;
mod types;
#[cfg(feature = "xml")]
mod xml;

pub use builder::{BuildError, KeyboardBuilder};
pub use dimension::{
    Dimension, DimensionParseError, DisplayMetrics, Unit, resolve_dimension, resolve_layered,
};
pub use ime::{EnterAction, EnterKeyLabels, ImeOptions};
pub use key::{Key, KeyCodes, Row};
pub use keyboard::Keyboard;
pub use softkey_proximity::{GRID_HEIGHT, GRID_WIDTH, KeyBounds, ProximityGrid};
pub use token::{CodesAttr, KeyAttrs, KeyboardAttrs, LayoutToken, RowAttrs};
pub use types::{EdgeFlags, IconRef, KeyFace, KeyIndex, KeyVisualState, LayoutRef, keycode};
#[cfg(feature = "xml")]
pub use xml::{XmlLayoutError, XmlLayoutReader};
