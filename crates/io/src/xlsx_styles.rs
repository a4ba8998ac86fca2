//! Style maps to `rust_xlsxwriter::Format`.
//!
//! Keys follow the xlsx writer vocabulary (`bold`, `font_size`, `align`,
//! `left`, `num_format`, ...). Unknown keys are logged and skipped; known
//! keys with values of the wrong shape are rejected.

use celldsl_core::{Style, StyleValue};
use celldsl_engine::SurfaceError;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern, FormatScript, FormatUnderline};

fn invalid(key: &str, value: &StyleValue, expected: &str) -> SurfaceError {
    SurfaceError::InvalidParameter(format!("style key {key}: expected {expected}, got {value}"))
}

fn flag(key: &str, value: &StyleValue) -> Result<bool, SurfaceError> {
    value.as_bool().ok_or_else(|| invalid(key, value, "a boolean"))
}

fn text<'a>(key: &str, value: &'a StyleValue) -> Result<&'a str, SurfaceError> {
    value.as_str().ok_or_else(|| invalid(key, value, "text"))
}

fn number(key: &str, value: &StyleValue) -> Result<f64, SurfaceError> {
    value.as_f64().ok_or_else(|| invalid(key, value, "a number"))
}

fn integer(key: &str, value: &StyleValue) -> Result<i64, SurfaceError> {
    value.as_i64().ok_or_else(|| invalid(key, value, "an integer"))
}

/// Border line style by its xlsx index.
fn border(key: &str, value: &StyleValue) -> Result<FormatBorder, SurfaceError> {
    let border = match integer(key, value)? {
        0 => FormatBorder::None,
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        8 => FormatBorder::MediumDashed,
        9 => FormatBorder::DashDot,
        10 => FormatBorder::MediumDashDot,
        11 => FormatBorder::DashDotDot,
        12 => FormatBorder::MediumDashDotDot,
        13 => FormatBorder::SlantDashDot,
        _ => return Err(invalid(key, value, "a border index 0-13")),
    };
    Ok(border)
}

/// `#RRGGBB` or one of the named palette colours.
pub fn parse_color(key: &str, value: &StyleValue) -> Result<Color, SurfaceError> {
    let raw = text(key, value)?;
    if let Some(hex) = raw.strip_prefix('#') {
        return u32::from_str_radix(hex, 16)
            .ok()
            .filter(|_| hex.len() == 6)
            .map(Color::RGB)
            .ok_or_else(|| invalid(key, value, "a #RRGGBB colour"));
    }
    let color = match raw.to_ascii_lowercase().as_str() {
        "black" => Color::Black,
        "blue" => Color::Blue,
        "brown" => Color::Brown,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "green" => Color::Green,
        "lime" => Color::Lime,
        "magenta" => Color::Magenta,
        "navy" => Color::Navy,
        "orange" => Color::Orange,
        "pink" => Color::Pink,
        "purple" => Color::Purple,
        "red" => Color::Red,
        "silver" => Color::Silver,
        "white" => Color::White,
        "yellow" => Color::Yellow,
        _ => return Err(invalid(key, value, "a colour name or #RRGGBB")),
    };
    Ok(color)
}

fn horizontal(key: &str, value: &StyleValue) -> Result<FormatAlign, SurfaceError> {
    let align = match text(key, value)? {
        "left" => FormatAlign::Left,
        "center" | "centre" => FormatAlign::Center,
        "right" => FormatAlign::Right,
        "fill" => FormatAlign::Fill,
        "justify" => FormatAlign::Justify,
        "center_across" | "centre_across" => FormatAlign::CenterAcross,
        "distributed" => FormatAlign::Distributed,
        _ => return Err(invalid(key, value, "a horizontal alignment")),
    };
    Ok(align)
}

fn vertical(key: &str, value: &StyleValue) -> Result<FormatAlign, SurfaceError> {
    let align = match text(key, value)? {
        "top" => FormatAlign::Top,
        "vcenter" | "vcentre" => FormatAlign::VerticalCenter,
        "bottom" => FormatAlign::Bottom,
        "vjustify" => FormatAlign::VerticalJustify,
        "vdistributed" => FormatAlign::VerticalDistributed,
        _ => return Err(invalid(key, value, "a vertical alignment")),
    };
    Ok(align)
}

fn underline(key: &str, value: &StyleValue) -> Result<FormatUnderline, SurfaceError> {
    if let StyleValue::Bool(b) = value {
        return Ok(if *b { FormatUnderline::Single } else { FormatUnderline::None });
    }
    let style = match integer(key, value)? {
        0 => FormatUnderline::None,
        1 => FormatUnderline::Single,
        2 => FormatUnderline::Double,
        33 => FormatUnderline::SingleAccounting,
        34 => FormatUnderline::DoubleAccounting,
        _ => return Err(invalid(key, value, "an underline style")),
    };
    Ok(style)
}

/// Build the writer format for a composed style.
pub fn build_format(style: &Style) -> Result<Format, SurfaceError> {
    let mut format = Format::new();
    for (key, value) in style.iter() {
        format = match key {
            // Font
            "font_name" => format.set_font_name(text(key, value)?),
            "font_size" => format.set_font_size(number(key, value)?),
            "font_color" | "color" => format.set_font_color(parse_color(key, value)?),
            "bold" => toggle(format, flag(key, value)?, Format::set_bold),
            "italic" => toggle(format, flag(key, value)?, Format::set_italic),
            "underline" => format.set_underline(underline(key, value)?),
            "font_strikeout" => toggle(format, flag(key, value)?, Format::set_font_strikethrough),
            "font_script" => match integer(key, value)? {
                1 => format.set_font_script(FormatScript::Superscript),
                2 => format.set_font_script(FormatScript::Subscript),
                0 => format,
                _ => return Err(invalid(key, value, "1 (superscript) or 2 (subscript)")),
            },

            // Number
            "num_format" => match value {
                StyleValue::Int(index) => format.set_num_format_index(
                    u8::try_from(*index).map_err(|_| invalid(key, value, "a built-in format index"))?,
                ),
                _ => format.set_num_format(text(key, value)?),
            },

            // Alignment
            "align" => format.set_align(horizontal(key, value)?),
            "valign" => format.set_align(vertical(key, value)?),
            "rotation" => format.set_rotation(
                i16::try_from(integer(key, value)?).map_err(|_| invalid(key, value, "an angle"))?,
            ),
            "text_wrap" => toggle(format, flag(key, value)?, Format::set_text_wrap),
            "shrink" => toggle(format, flag(key, value)?, Format::set_shrink),
            "indent" => format.set_indent(
                u8::try_from(integer(key, value)?).map_err(|_| invalid(key, value, "an indent level"))?,
            ),

            // Fill
            "bg_color" => format.set_background_color(parse_color(key, value)?),
            "fg_color" => format.set_foreground_color(parse_color(key, value)?),
            "pattern" => match integer(key, value)? {
                0 => format.set_pattern(FormatPattern::None),
                1 => format.set_pattern(FormatPattern::Solid),
                _ => return Err(invalid(key, value, "0 or 1")),
            },

            // Borders
            "border" => format.set_border(border(key, value)?),
            "left" => format.set_border_left(border(key, value)?),
            "right" => format.set_border_right(border(key, value)?),
            "top" => format.set_border_top(border(key, value)?),
            "bottom" => format.set_border_bottom(border(key, value)?),
            "border_color" => format.set_border_color(parse_color(key, value)?),
            "left_color" => format.set_border_left_color(parse_color(key, value)?),
            "right_color" => format.set_border_right_color(parse_color(key, value)?),
            "top_color" => format.set_border_top_color(parse_color(key, value)?),
            "bottom_color" => format.set_border_bottom_color(parse_color(key, value)?),

            // Protection
            "locked" => {
                if flag(key, value)? {
                    format
                } else {
                    format.set_unlocked()
                }
            }
            "hidden" => toggle(format, flag(key, value)?, Format::set_hidden),

            _ => {
                tracing::warn!(target: "celldsl.xlsx", key, "unknown style key ignored");
                format
            }
        };
    }
    Ok(format)
}

fn toggle(format: Format, on: bool, set: fn(Format) -> Format) -> Format {
    if on {
        set(format)
    } else {
        format
    }
}
