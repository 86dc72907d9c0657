//! Turning raw bytes into keys
//!
//! [`parse_key`] guesses a type from the text. The guess is a convenience:
//! callers that need a particular kind use the `parse_as_*` functions.

use crate::error::{Error, Result};
use crate::key::Key;
use crate::rect::Rect;

/// Parse raw bytes, auto-detecting integers and floats
///
/// Text that starts with `-`, `+`, a digit or `.`, and continues with only
/// digits and at most one `.`, becomes `Float` when a `.` is present and
/// `Int` otherwise. Anything else, including numerals that overflow or fail
/// to parse, becomes `String`.
pub fn parse_key(raw: &[u8]) -> Key {
    let text = String::from_utf8_lossy(raw);
    match numeric_shape(text.as_bytes()) {
        Some(NumericShape::Int) => match text.parse::<i64>() {
            Ok(v) => Key::Int(v),
            Err(_) => Key::String(text.into_owned()),
        },
        Some(NumericShape::Float) => match text.parse::<f64>() {
            Ok(v) => Key::Float(v),
            Err(_) => Key::String(text.into_owned()),
        },
        None => Key::String(text.into_owned()),
    }
}

enum NumericShape {
    Int,
    Float,
}

fn numeric_shape(bytes: &[u8]) -> Option<NumericShape> {
    let body = match bytes.first()? {
        b'-' | b'+' => &bytes[1..],
        _ => bytes,
    };
    let mut digits = 0usize;
    let mut dots = 0usize;
    for b in body {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return None,
        }
    }
    match (digits, dots) {
        (0, _) => None,
        (_, 0) => Some(NumericShape::Int),
        (_, 1) => Some(NumericShape::Float),
        _ => None,
    }
}

/// Always a `String` key
pub fn parse_as_string(raw: &[u8]) -> Key {
    Key::String(String::from_utf8_lossy(raw).into_owned())
}

/// Base-10 signed integer
pub fn parse_as_int(raw: &[u8]) -> Result<Key> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map(Key::Int)
        .ok_or_else(|| invalid("int", raw))
}

/// Decimal or scientific float
pub fn parse_as_float(raw: &[u8]) -> Result<Key> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .map(Key::Float)
        .ok_or_else(|| invalid("float", raw))
}

/// Boolean with the usual spellings
///
/// Recognizes `0x00`/`0x01` bytes, `1 T Y` / `0 F N`, and the words
/// `TRUE FALSE YES NO`, all case-insensitively. Empty input is `Nil`.
pub fn parse_as_bool(raw: &[u8]) -> Result<Key> {
    if raw.is_empty() {
        return Ok(Key::Nil);
    }
    parse_bool(raw)
        .map(Key::Bool)
        .ok_or_else(|| invalid("bool", raw))
}

/// The boolean recognized by [`parse_as_bool`], if any
pub fn parse_bool(raw: &[u8]) -> Option<bool> {
    match raw {
        [0x01] => return Some(true),
        [0x00] => return Some(false),
        _ => {}
    }
    let upper = raw.to_ascii_uppercase();
    match upper.as_slice() {
        b"1" | b"T" | b"Y" | b"TRUE" | b"YES" => Some(true),
        b"0" | b"F" | b"N" | b"FALSE" | b"NO" => Some(false),
        _ => None,
    }
}

fn invalid(kind: &str, raw: &[u8]) -> Error {
    Error::InvalidArgument(format!(
        "cannot parse {:?} as {kind}",
        String::from_utf8_lossy(raw)
    ))
}

/// Parse a rectangle from text
///
/// Accepts one bracketed coordinate group (a point) or two (min and max):
/// `[x y]`, `[x1 y1],[x2 y2]`, or the JSON form `[[x1, y1], [x2, y2]]`.
/// Coordinates are separated by whitespace or commas. A single flat JSON
/// array `[x, y]` is a point.
pub fn parse_rect(text: &str) -> Result<Rect> {
    let groups = bracket_groups(text)?;
    match groups.len() {
        1 => Rect::point(parse_coords(groups[0])?),
        2 => Rect::new(parse_coords(groups[0])?, parse_coords(groups[1])?),
        0 => Err(Error::InvalidArgument(format!("no coordinates in rect {text:?}"))),
        n => Err(Error::InvalidArgument(format!(
            "rect {text:?} has {n} coordinate groups, expected 1 or 2"
        ))),
    }
}

/// Innermost `[...]` groups, in order of appearance
fn bracket_groups(text: &str) -> Result<Vec<&str>> {
    let mut groups = Vec::new();
    let mut open: Option<usize> = None;
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '[' => {
                depth += 1;
                open = Some(i + 1);
            }
            ']' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    Error::InvalidArgument(format!("unbalanced brackets in rect {text:?}"))
                })?;
                if let Some(start) = open.take() {
                    groups.push(&text[start..i]);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Error::InvalidArgument(format!(
            "unbalanced brackets in rect {text:?}"
        )));
    }
    Ok(groups)
}

fn parse_coords(group: &str) -> Result<Vec<f64>> {
    group
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>().map_err(|_| {
                Error::InvalidArgument(format!("bad rect coordinate {s:?}"))
            })
        })
        .collect()
}
