//! Dynamically-typed scalar values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single stored scalar.
///
/// Values are immutable; updating a key replaces the whole cell, so a key
/// may change variant between writes.
///
/// Equality is variant-aware: two cells are equal only when they hold the
/// same variant and the same payload. `Integer(1)` and `Float(1.0)` are
/// different values, as are `Integer(1)` and `Text("1")`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueCell {
    /// Signed integer.
    Integer(i64),
    /// Boolean.
    Boolean(bool),
    /// Double-precision float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
}

/// The variant of a [`ValueCell`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`ValueCell::Integer`].
    Integer,
    /// [`ValueCell::Boolean`].
    Boolean,
    /// [`ValueCell::Float`].
    Float,
    /// [`ValueCell::Text`].
    Text,
}

impl ValueKind {
    /// Lower-case name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::Boolean => "boolean",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ValueCell {
    /// Returns the variant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            ValueCell::Integer(_) => ValueKind::Integer,
            ValueCell::Boolean(_) => ValueKind::Boolean,
            ValueCell::Float(_) => ValueKind::Float,
            ValueCell::Text(_) => ValueKind::Text,
        }
    }

    /// Returns true for the numeric variants.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueCell::Integer(_) | ValueCell::Float(_))
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ValueCell::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ValueCell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an `i64`, coercing from `Float`.
    ///
    /// Floats round half-to-even. NaN, infinities and values outside the
    /// `i64` range do not coerce.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ValueCell::Integer(n) => Some(*n),
            ValueCell::Float(f) => float_to_i64(*f),
            _ => None,
        }
    }

    /// Get this value as an `f64`, coercing from `Integer`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ValueCell::Float(f) => Some(*f),
            ValueCell::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }
}

fn float_to_i64(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    let rounded = f.round_ties_even();
    // 2^63 is exactly representable; i64::MAX is not.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if rounded < -LIMIT || rounded >= LIMIT {
        return None;
    }
    Some(rounded as i64)
}

impl PartialEq for ValueCell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueCell::Integer(a), ValueCell::Integer(b)) => a == b,
            (ValueCell::Boolean(a), ValueCell::Boolean(b)) => a == b,
            // NaN compares equal to NaN so an unchanged NaN is never re-sent.
            (ValueCell::Float(a), ValueCell::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (ValueCell::Text(a), ValueCell::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ValueCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueCell::Integer(n) => write!(f, "{n}"),
            ValueCell::Boolean(b) => write!(f, "{b}"),
            ValueCell::Float(x) => write!(f, "{x}"),
            ValueCell::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ValueCell {
    fn from(n: i64) -> Self {
        ValueCell::Integer(n)
    }
}

impl From<i32> for ValueCell {
    fn from(n: i32) -> Self {
        ValueCell::Integer(i64::from(n))
    }
}

impl From<u32> for ValueCell {
    fn from(n: u32) -> Self {
        ValueCell::Integer(i64::from(n))
    }
}

impl From<bool> for ValueCell {
    fn from(b: bool) -> Self {
        ValueCell::Boolean(b)
    }
}

impl From<f64> for ValueCell {
    fn from(f: f64) -> Self {
        ValueCell::Float(f)
    }
}

impl From<f32> for ValueCell {
    fn from(f: f32) -> Self {
        ValueCell::Float(f64::from(f))
    }
}

impl From<String> for ValueCell {
    fn from(s: String) -> Self {
        ValueCell::Text(s)
    }
}

impl From<&str> for ValueCell {
    fn from(s: &str) -> Self {
        ValueCell::Text(s.to_string())
    }
}

/// Conversion out of a [`ValueCell`] under the store's coercion rules.
///
/// Integer and Float interconvert. Boolean and Text only convert to
/// themselves.
pub trait FromValue: Sized {
    /// Name of the target type, used in diagnostics.
    const TYPE_NAME: &'static str;

    /// Converts the value, or returns `None` if it does not coerce.
    fn from_value(value: &ValueCell) -> Option<Self>;
}

impl FromValue for ValueCell {
    const TYPE_NAME: &'static str = "value";

    fn from_value(value: &ValueCell) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn from_value(value: &ValueCell) -> Option<Self> {
        value.as_i64()
    }
}

impl FromValue for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn from_value(value: &ValueCell) -> Option<Self> {
        value.as_i64().and_then(|n| i32::try_from(n).ok())
    }
}

impl FromValue for u32 {
    const TYPE_NAME: &'static str = "u32";

    fn from_value(value: &ValueCell) -> Option<Self> {
        value.as_i64().and_then(|n| u32::try_from(n).ok())
    }
}

impl FromValue for u64 {
    const TYPE_NAME: &'static str = "u64";

    fn from_value(value: &ValueCell) -> Option<Self> {
        value.as_i64().and_then(|n| u64::try_from(n).ok())
    }
}

impl FromValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_value(value: &ValueCell) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn from_value(value: &ValueCell) -> Option<Self> {
        value.as_f64().map(|f| f as f32)
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: &ValueCell) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_value(value: &ValueCell) -> Option<Self> {
        value.as_text().map(str::to_string)
    }
}
