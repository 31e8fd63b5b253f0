// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Length attributes and their resolution to device pixels.
//!
//! A layout attribute is either an absolute length (`48dp`, `12px`, `0.25in`) or a
//! fraction of a base extent (`10%p`). Horizontal attributes resolve against the
//! display width, vertical ones against the display height.

use core::str::FromStr;

use thiserror::Error;

/// Unit of an absolute length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Device pixels.
    Px,
    /// Density-independent pixels.
    Dp,
    /// Scale-independent pixels (density times the user's font scale).
    Sp,
    /// Points, 1/72 inch.
    Pt,
    /// Inches.
    In,
    /// Millimetres.
    Mm,
}

/// A length attribute as written in a layout description.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Dimension {
    /// An absolute length.
    Absolute {
        /// Magnitude in `unit`.
        value: f32,
        /// Unit of `value`.
        unit: Unit,
    },
    /// A fraction of the base extent; `0.1` is ten percent.
    Fraction(f32),
}

impl Dimension {
    /// Absolute length in device pixels.
    pub const fn px(value: f32) -> Self {
        Self::Absolute {
            value,
            unit: Unit::Px,
        }
    }

    /// Absolute length in density-independent pixels.
    pub const fn dp(value: f32) -> Self {
        Self::Absolute {
            value,
            unit: Unit::Dp,
        }
    }

    /// Percentage of the base extent.
    pub const fn percent(value: f32) -> Self {
        Self::Fraction(value / 100.0)
    }
}

/// Failure to read a [`Dimension`] from text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DimensionParseError {
    /// The text was empty.
    #[error("empty dimension")]
    Empty,
    /// The numeric part did not parse.
    #[error("invalid number {0:?} in dimension")]
    InvalidNumber(String),
}

// Longest suffixes first so `dip` is not read as `p` and `%p` not as `p`.
const SUFFIXES: &[(&str, Option<Unit>)] = &[
    ("%p", None),
    ("%", None),
    ("dip", Some(Unit::Dp)),
    ("dp", Some(Unit::Dp)),
    ("px", Some(Unit::Px)),
    ("sp", Some(Unit::Sp)),
    ("pt", Some(Unit::Pt)),
    ("in", Some(Unit::In)),
    ("mm", Some(Unit::Mm)),
];

impl FromStr for Dimension {
    type Err = DimensionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DimensionParseError::Empty);
        }
        let (number, unit) = SUFFIXES
            .iter()
            .find_map(|&(suffix, unit)| s.strip_suffix(suffix).map(|n| (n, Some(unit))))
            .unwrap_or((s, None));
        let value: f32 = number
            .trim()
            .parse()
            .map_err(|_| DimensionParseError::InvalidNumber(number.to_owned()))?;
        if !value.is_finite() {
            return Err(DimensionParseError::InvalidNumber(number.to_owned()));
        }
        Ok(match unit {
            Some(None) => Self::percent(value),
            Some(Some(unit)) => Self::Absolute { value, unit },
            None => Self::px(value),
        })
    }
}

/// Screen facts the resolver needs: extents and densities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayMetrics {
    /// Width available to the keyboard, in device pixels.
    pub width: i32,
    /// Screen height, in device pixels.
    pub height: i32,
    /// Pixels per density-independent pixel.
    pub density: f32,
    /// Pixels per scale-independent pixel.
    pub scaled_density: f32,
    /// Physical pixels per inch along x.
    pub xdpi: f32,
}

impl DisplayMetrics {
    /// Metrics for a `width × height` screen at baseline density (160 dpi).
    pub const fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            density: 1.0,
            scaled_density: 1.0,
            xdpi: 160.0,
        }
    }

    /// Override the densities.
    #[must_use]
    pub const fn with_density(mut self, density: f32, scaled_density: f32, xdpi: f32) -> Self {
        self.density = density;
        self.scaled_density = scaled_density;
        self.xdpi = xdpi;
        self
    }

    /// Convert an absolute length to (fractional) device pixels.
    pub fn to_pixels(&self, value: f32, unit: Unit) -> f32 {
        match unit {
            Unit::Px => value,
            Unit::Dp => value * self.density,
            Unit::Sp => value * self.scaled_density,
            Unit::Pt => value * self.xdpi / 72.0,
            Unit::In => value * self.xdpi,
            Unit::Mm => value * self.xdpi / 25.4,
        }
    }
}

/// Resolve a length attribute to whole device pixels.
///
/// - absent: `fallback`;
/// - absolute: converted with `metrics` and truncated toward zero;
/// - fraction: `round(fraction * base)`.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Pixel offsets are intentionally truncated or rounded to whole pixels."
)]
pub fn resolve_dimension(
    raw: Option<Dimension>,
    base: i32,
    fallback: i32,
    metrics: &DisplayMetrics,
) -> i32 {
    match raw {
        None => fallback,
        Some(Dimension::Absolute { value, unit }) => metrics.to_pixels(value, unit) as i32,
        Some(Dimension::Fraction(fraction)) => (fraction * base as f32).round() as i32,
    }
}

/// One step of the Key → Row → Keyboard default chain.
///
/// `inherited` is the value the enclosing level already resolved (which itself
/// ended in a hard-coded constant at the keyboard level).
pub fn resolve_layered(
    local: Option<Dimension>,
    inherited: i32,
    base: i32,
    metrics: &DisplayMetrics,
) -> i32 {
    resolve_dimension(local, base, inherited, metrics)
}
