//! Observer root margin in CSS shorthand form.
//!
//! A positive top margin grows the root's box upward so the sentinel counts
//! as intersecting before it is actually on screen.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One side of a root margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarginLength {
    /// Absolute length in CSS pixels.
    Px(i32),
    /// Percentage of the root's size along that axis.
    Percent(i32),
}

impl fmt::Display for MarginLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginLength::Px(v) => write!(f, "{v}px"),
            MarginLength::Percent(v) => write!(f, "{v}%"),
        }
    }
}

impl FromStr for MarginLength {
    type Err = MarginParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || MarginParseError::InvalidLength(token.to_string());
        if token == "0" {
            return Ok(MarginLength::Px(0));
        }
        if let Some(value) = token.strip_suffix("px") {
            return value.parse().map(MarginLength::Px).map_err(|_| invalid());
        }
        if let Some(value) = token.strip_suffix('%') {
            return value.parse().map(MarginLength::Percent).map_err(|_| invalid());
        }
        Err(invalid())
    }
}

/// Margin box around the observer root (top, right, bottom, left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootMargin {
    /// Top edge.
    pub top: MarginLength,
    /// Right edge.
    pub right: MarginLength,
    /// Bottom edge.
    pub bottom: MarginLength,
    /// Left edge.
    pub left: MarginLength,
}

impl RootMargin {
    /// Margin that only extends the top edge, in pixels.
    pub const fn top_px(px: i32) -> Self {
        Self {
            top: MarginLength::Px(px),
            right: MarginLength::Px(0),
            bottom: MarginLength::Px(0),
            left: MarginLength::Px(0),
        }
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::top_px(0)
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

impl FromStr for RootMargin {
    type Err = MarginParseError;

    /// Parse 1 to 4 lengths with the usual CSS shorthand expansion.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lengths = raw
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<MarginLength>, _>>()?;

        let (top, right, bottom, left) = match lengths.as_slice() {
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            _ => return Err(MarginParseError::WrongArity(lengths.len())),
        };

        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}

/// Reasons a root margin string fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarginParseError {
    /// A token is not `<int>px`, `<int>%` or `0`.
    #[error("Invalid margin length {0:?}: expected <int>px, <int>% or 0")]
    InvalidLength(String),
    /// Fewer than one or more than four tokens.
    #[error("Root margin takes 1 to 4 lengths, got {0}")]
    WrongArity(usize),
}
