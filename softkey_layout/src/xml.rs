// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reading layout descriptions from XML.
//!
//! The reader understands the usual soft-keyboard layout vocabulary:
//!
//! ```xml
//! <Keyboard android:keyWidth="10%p" android:keyHeight="48dp">
//!     <Row android:rowEdgeFlags="top">
//!         <Key android:codes="113" android:keyLabel="q" android:keyEdgeFlags="left"/>
//!         <Key android:keyLabel="w"/>
//!     </Row>
//! </Keyboard>
//! ```
//!
//! Namespace prefixes are ignored, as are unknown elements and attributes.

use std::borrow::Cow;

use hashbrown::HashMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

use crate::dimension::Dimension;
use crate::token::{CodesAttr, KeyAttrs, KeyboardAttrs, LayoutToken, RowAttrs};
use crate::types::{EdgeFlags, IconRef, LayoutRef};

/// Failure while reading a layout description.
#[derive(Debug, Error)]
pub enum XmlLayoutError {
    /// The document is not well-formed XML.
    #[error("malformed layout XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// An attribute value could not be interpreted.
    #[error("invalid value {value:?} for attribute `{name}`: {reason}")]
    Attribute {
        /// Local name of the attribute.
        name: String,
        /// The value as written.
        value: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl XmlLayoutError {
    fn attribute(name: &[u8], value: &str, reason: impl ToString) -> Self {
        Self::Attribute {
            name: String::from_utf8_lossy(name).into_owned(),
            value: value.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// Streams [`LayoutToken`]s out of an XML layout description.
///
/// Feed it straight into [`KeyboardBuilder::build`](crate::KeyboardBuilder::build):
///
/// ```
/// use softkey_layout::{DisplayMetrics, KeyboardBuilder, XmlLayoutReader};
///
/// let xml = r#"
///     <Keyboard keyWidth="50%p" keyHeight="40px">
///         <Row keyboardMode="@integer/mode_url">
///             <Key keyLabel=".com" keyOutputText=".com"/>
///         </Row>
///         <Row>
///             <Key codes="-5" keyIcon="@drawable/sym_keyboard_delete" isRepeatable="true"/>
///         </Row>
///     </Keyboard>
/// "#;
/// let reader = XmlLayoutReader::new(xml).with_mode_alias("mode_url", 2);
/// let keyboard = KeyboardBuilder::new(DisplayMetrics::new(200, 400))
///     .with_mode(2)
///     .build(reader)
///     .unwrap();
///
/// assert_eq!(keyboard.keys().len(), 2);
/// assert_eq!(keyboard.keys()[0].output_text(), Some(".com"));
/// assert!(keyboard.keys()[1].is_repeatable());
/// ```
pub struct XmlLayoutReader<'a> {
    reader: Reader<&'a [u8]>,
    mode_aliases: HashMap<String, i32>,
    pending: Option<LayoutToken>,
    done: bool,
}

impl core::fmt::Debug for XmlLayoutReader<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("XmlLayoutReader")
            .field("position", &self.reader.buffer_position())
            .field("mode_aliases", &self.mode_aliases)
            .field("pending", &self.pending)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<'a> XmlLayoutReader<'a> {
    /// A reader over `source`.
    pub fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.trim_text(true);
        Self {
            reader,
            mode_aliases: HashMap::new(),
            pending: None,
            done: false,
        }
    }

    /// Let `keyboardMode` refer to `mode` by `name`.
    ///
    /// A reference such as `@integer/mode_url` is looked up as written first, then
    /// by the part after the last `/`.
    #[must_use]
    pub fn with_mode_alias(mut self, name: impl Into<String>, mode: i32) -> Self {
        self.mode_aliases.insert(name.into(), mode);
        self
    }

    fn next_token(&mut self) -> Result<Option<LayoutToken>, XmlLayoutError> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => {
                    if let Some(token) = self.open(&e)? {
                        return Ok(Some(token));
                    }
                }
                Event::Empty(e) => {
                    if let Some(token) = self.open(&e)? {
                        self.pending = match token {
                            LayoutToken::RowStart(_) => Some(LayoutToken::RowEnd),
                            LayoutToken::KeyStart(_) => Some(LayoutToken::KeyEnd),
                            _ => None,
                        };
                        return Ok(Some(token));
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"Row" => return Ok(Some(LayoutToken::RowEnd)),
                    b"Key" => return Ok(Some(LayoutToken::KeyEnd)),
                    _ => {}
                },
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    fn open(&self, e: &BytesStart<'_>) -> Result<Option<LayoutToken>, XmlLayoutError> {
        Ok(match e.local_name().as_ref() {
            b"Keyboard" => Some(LayoutToken::KeyboardStart(keyboard_attrs(e)?)),
            b"Row" => Some(LayoutToken::RowStart(self.row_attrs(e)?)),
            b"Key" => Some(LayoutToken::KeyStart(Box::new(key_attrs(e)?))),
            other => {
                tracing::trace!(
                    element = %String::from_utf8_lossy(other),
                    "ignoring unknown layout element"
                );
                None
            }
        })
    }

    fn row_attrs(&self, e: &BytesStart<'_>) -> Result<RowAttrs, XmlLayoutError> {
        let mut attrs = RowAttrs::default();
        for_each_attribute(e, |name, value| {
            match name {
                b"keyWidth" => attrs.key_width = Some(dimension(name, &value)?),
                b"keyHeight" => attrs.key_height = Some(dimension(name, &value)?),
                b"horizontalGap" => attrs.horizontal_gap = Some(dimension(name, &value)?),
                b"verticalGap" => attrs.vertical_gap = Some(dimension(name, &value)?),
                b"rowEdgeFlags" => attrs.edge_flags = Some(edge_flags(name, &value)?),
                b"keyboardMode" => attrs.mode = Some(self.mode(name, &value)?),
                _ => {}
            }
            Ok(())
        })?;
        Ok(attrs)
    }

    fn mode(&self, name: &[u8], value: &str) -> Result<i32, XmlLayoutError> {
        if let Some(mode) = parse_int(value) {
            return Ok(mode);
        }
        let short = value.rsplit('/').next().unwrap_or(value);
        self.mode_aliases
            .get(value)
            .or_else(|| self.mode_aliases.get(short))
            .copied()
            .ok_or_else(|| XmlLayoutError::attribute(name, value, "unknown keyboard mode"))
    }
}

impl Iterator for XmlLayoutReader<'_> {
    type Item = Result<LayoutToken, XmlLayoutError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(token) = self.pending.take() {
            return Some(Ok(token));
        }
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn for_each_attribute(
    e: &BytesStart<'_>,
    mut f: impl FnMut(&[u8], Cow<'_, str>) -> Result<(), XmlLayoutError>,
) -> Result<(), XmlLayoutError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = attr.unescape_value()?;
        f(attr.key.local_name().as_ref(), value)?;
    }
    Ok(())
}

fn keyboard_attrs(e: &BytesStart<'_>) -> Result<KeyboardAttrs, XmlLayoutError> {
    let mut attrs = KeyboardAttrs::default();
    for_each_attribute(e, |name, value| {
        match name {
            b"keyWidth" => attrs.key_width = Some(dimension(name, &value)?),
            b"keyHeight" => attrs.key_height = Some(dimension(name, &value)?),
            b"horizontalGap" => attrs.horizontal_gap = Some(dimension(name, &value)?),
            b"verticalGap" => attrs.vertical_gap = Some(dimension(name, &value)?),
            _ => {}
        }
        Ok(())
    })?;
    Ok(attrs)
}

fn key_attrs(e: &BytesStart<'_>) -> Result<KeyAttrs, XmlLayoutError> {
    let mut attrs = KeyAttrs::default();
    for_each_attribute(e, |name, value| {
        match name {
            b"keyWidth" => attrs.key_width = Some(dimension(name, &value)?),
            b"keyHeight" => attrs.key_height = Some(dimension(name, &value)?),
            b"horizontalGap" => attrs.horizontal_gap = Some(dimension(name, &value)?),
            b"codes" => {
                attrs.codes = Some(match parse_int(&value) {
                    Some(code) => CodesAttr::Single(code),
                    None => CodesAttr::List(value.into_owned()),
                });
            }
            b"keyLabel" => attrs.label = Some(value.into_owned()),
            b"keyOutputText" => attrs.output_text = Some(value.into_owned()),
            b"keyIcon" => attrs.icon = Some(IconRef::new(value)),
            b"iconPreview" => attrs.icon_preview = Some(IconRef::new(value)),
            b"popupCharacters" => attrs.popup_characters = Some(value.into_owned()),
            b"popupKeyboard" => attrs.popup_keyboard = Some(LayoutRef::new(value)),
            b"isRepeatable" => attrs.repeatable = Some(boolean(name, &value)?),
            b"isModifier" => attrs.modifier = Some(boolean(name, &value)?),
            b"isSticky" => attrs.sticky = Some(boolean(name, &value)?),
            b"keyEdgeFlags" => attrs.edge_flags = Some(edge_flags(name, &value)?),
            _ => {}
        }
        Ok(())
    })?;
    Ok(attrs)
}

fn dimension(name: &[u8], value: &str) -> Result<Dimension, XmlLayoutError> {
    value
        .parse()
        .map_err(|err| XmlLayoutError::attribute(name, value, err))
}

fn boolean(name: &[u8], value: &str) -> Result<bool, XmlLayoutError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(XmlLayoutError::attribute(name, value, "expected true or false")),
    }
}

fn edge_flags(name: &[u8], value: &str) -> Result<EdgeFlags, XmlLayoutError> {
    if let Some(bits) = parse_int(value) {
        return u32::try_from(bits)
            .map(EdgeFlags::from_bits_truncate)
            .map_err(|err| XmlLayoutError::attribute(name, value, err));
    }
    value.split('|').try_fold(EdgeFlags::empty(), |flags, part| {
        let flag = match part.trim() {
            "left" => EdgeFlags::LEFT,
            "right" => EdgeFlags::RIGHT,
            "top" => EdgeFlags::TOP,
            "bottom" => EdgeFlags::BOTTOM,
            _ => return Err(XmlLayoutError::attribute(name, value, "unknown edge flag")),
        };
        Ok(flags | flag)
    })
}

/// A decimal or `0x`-prefixed hexadecimal integer.
fn parse_int(value: &str) -> Option<i32> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => i32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
