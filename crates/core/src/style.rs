//! Style descriptions.
//!
//! A [`Style`] is an ordered map of attribute name to value. Composition is a
//! right-biased union: `a.compose(&b)` keeps every key of both and takes `b`'s
//! value on collision. Because the map is ordered, two styles built in any
//! order from the same attributes compare and hash equal, which is what lets
//! the registration cache collapse them to one surface handle.
//!
//! Attribute names follow the xlsx format vocabulary (`bold`, `font_name`,
//! `align`, `left`, `num_format`, ...). The core never interprets them; the
//! output surface does.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A single style attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Bool(bool),
    Int(i64),
    Number(OrderedFloat<f64>),
    Text(String),
}

impl StyleValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StyleValue::Bool(b) => Some(*b),
            StyleValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StyleValue::Int(i) => Some(*i),
            StyleValue::Number(n) if n.fract() == 0.0 => Some(n.0 as i64),
            StyleValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StyleValue::Int(i) => Some(*i as f64),
            StyleValue::Number(n) => Some(n.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StyleValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Bool(b) => write!(f, "{b}"),
            StyleValue::Int(i) => write!(f, "{i}"),
            StyleValue::Number(n) => write!(f, "{}", n.0),
            StyleValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for StyleValue {
    fn from(v: bool) -> Self {
        StyleValue::Bool(v)
    }
}

impl From<i64> for StyleValue {
    fn from(v: i64) -> Self {
        StyleValue::Int(v)
    }
}

impl From<i32> for StyleValue {
    fn from(v: i32) -> Self {
        StyleValue::Int(i64::from(v))
    }
}

impl From<f64> for StyleValue {
    fn from(v: f64) -> Self {
        StyleValue::Number(OrderedFloat(v))
    }
}

impl From<&str> for StyleValue {
    fn from(v: &str) -> Self {
        StyleValue::Text(v.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(v: String) -> Self {
        StyleValue::Text(v)
    }
}

/// An associative, order-independent style description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Style(BTreeMap<String, StyleValue>);

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with one attribute set.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<StyleValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Right-biased union: keys of both, `other` wins on collision.
    #[must_use]
    pub fn compose(&self, other: &Style) -> Style {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Style(merged)
    }

    /// In-place form of [`Style::compose`].
    pub fn merge(&mut self, other: &Style) {
        self.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "}}")
    }
}

impl BitOr for Style {
    type Output = Style;

    fn bitor(mut self, rhs: Style) -> Style {
        self.merge(&rhs);
        self
    }
}

impl BitOr<&Style> for &Style {
    type Output = Style;

    fn bitor(self, rhs: &Style) -> Style {
        self.compose(rhs)
    }
}

impl BitOrAssign<&Style> for Style {
    fn bitor_assign(&mut self, rhs: &Style) {
        self.merge(rhs);
    }
}

impl<K: Into<String>, V: Into<StyleValue>> FromIterator<(K, V)> for Style {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Style(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Commonly used style fragments.
///
/// Compose them with `|`: `presets::default_font() | presets::bold()`.
pub mod presets {
    use super::Style;

    fn one(key: &str, value: impl Into<super::StyleValue>) -> Style {
        Style::new().with(key, value)
    }

    pub fn default_font_name() -> Style {
        one("font_name", "Liberation Sans")
    }
    pub fn default_font_size() -> Style {
        one("font_size", 10)
    }
    pub fn default_header_size() -> Style {
        one("font_size", 18)
    }

    pub fn percent() -> Style {
        one("num_format", "0.0%")
    }
    pub fn regular_float() -> Style {
        one("num_format", "0.00")
    }
    pub fn float_with_red() -> Style {
        one("num_format", "0.00;[RED]-0.00")
    }
    pub fn percent_with_red() -> Style {
        one("num_format", "0.0%;[RED]-0.0%")
    }

    pub fn left() -> Style {
        one("align", "left")
    }
    pub fn center() -> Style {
        one("align", "center").with("valign", "vcenter")
    }
    pub fn right() -> Style {
        one("align", "right")
    }
    pub fn fill() -> Style {
        one("align", "fill")
    }
    pub fn justify() -> Style {
        one("align", "justify")
    }
    pub fn center_across() -> Style {
        one("align", "center_across")
    }
    pub fn distributed() -> Style {
        one("align", "distributed")
    }

    pub fn vbottom() -> Style {
        one("valign", "bottom")
    }
    pub fn vtop() -> Style {
        one("valign", "top")
    }
    pub fn vcenter() -> Style {
        one("valign", "vcenter")
    }
    pub fn vjustify() -> Style {
        one("valign", "vjustify")
    }
    pub fn vdistributed() -> Style {
        one("valign", "vdistributed")
    }

    pub fn rotated_90() -> Style {
        one("rotation", 90)
    }
    pub fn rotated_270() -> Style {
        one("rotation", -90)
    }

    pub fn wrapped() -> Style {
        one("text_wrap", true)
    }

    pub fn bold() -> Style {
        one("bold", true)
    }
    pub fn italic() -> Style {
        one("italic", true)
    }
    pub fn underline() -> Style {
        one("underline", true)
    }
    pub fn strikeout() -> Style {
        one("font_strikeout", true)
    }
    pub fn superscript() -> Style {
        one("font_script", 1)
    }
    pub fn subscript() -> Style {
        one("font_script", 2)
    }

    /// The process-wide fallback used when content carries no style.
    pub fn default_font() -> Style {
        default_font_name() | default_font_size() | left()
    }
    pub fn default_font_bold() -> Style {
        default_font() | bold()
    }
    pub fn default_header() -> Style {
        default_font_bold() | default_header_size()
    }
    pub fn default_percent() -> Style {
        default_font() | percent() | center()
    }
    pub fn default_font_centered() -> Style {
        default_font() | center()
    }
    pub fn default_font_bold_centered() -> Style {
        default_font_bold() | center()
    }
    pub fn default_table_row_font() -> Style {
        default_font_bold_centered() | wrapped()
    }
    pub fn default_table_column_font() -> Style {
        default_font_bold_centered() | rotated_90() | vbottom()
    }

    pub fn left_border() -> Style {
        one("left", 1)
    }
    pub fn top_border() -> Style {
        one("top", 1)
    }
    pub fn right_border() -> Style {
        one("right", 1)
    }
    pub fn bottom_border() -> Style {
        one("bottom", 1)
    }
    pub fn highlight_border() -> Style {
        left_border() | top_border() | right_border() | bottom_border()
    }
}
