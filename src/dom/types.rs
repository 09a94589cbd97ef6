use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to an element owned by a [`Document`](super::traits::Document).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub(crate) usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Width/height pair in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self {
            width: width as f64,
            height: height as f64,
        }
    }
}

/// Value of an inline style property. Numbers are written without a unit,
/// exactly as a script assigning `el.style[prop] = 0` would.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Text(Cow<'static, str>),
    Number(f64),
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Text(s) => f.write_str(s),
            StyleValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&'static str> for StyleValue {
    fn from(s: &'static str) -> Self {
        StyleValue::Text(Cow::Borrowed(s))
    }
}

impl From<String> for StyleValue {
    fn from(s: String) -> Self {
        StyleValue::Text(Cow::Owned(s))
    }
}

impl From<f64> for StyleValue {
    fn from(n: f64) -> Self {
        StyleValue::Number(n)
    }
}
