//! Named and hex colors, rewritten into `rgb()` before evaluation.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::value::Rgb;

/// The sixteen basic CSS color keywords.
pub const NAMED_COLORS: [(&str, Rgb); 16] = [
    ("aqua", Rgb { r: 0, g: 255, b: 255 }),
    ("black", Rgb { r: 0, g: 0, b: 0 }),
    ("blue", Rgb { r: 0, g: 0, b: 255 }),
    ("fuchsia", Rgb { r: 255, g: 0, b: 255 }),
    ("gray", Rgb { r: 128, g: 128, b: 128 }),
    ("green", Rgb { r: 0, g: 128, b: 0 }),
    ("lime", Rgb { r: 0, g: 255, b: 0 }),
    ("maroon", Rgb { r: 128, g: 0, b: 0 }),
    ("navy", Rgb { r: 0, g: 0, b: 128 }),
    ("olive", Rgb { r: 128, g: 128, b: 0 }),
    ("purple", Rgb { r: 128, g: 0, b: 128 }),
    ("red", Rgb { r: 255, g: 0, b: 0 }),
    ("silver", Rgb { r: 192, g: 192, b: 192 }),
    ("teal", Rgb { r: 0, g: 128, b: 128 }),
    ("white", Rgb { r: 255, g: 255, b: 255 }),
    ("yellow", Rgb { r: 255, g: 255, b: 0 }),
];

static NAMED: Lazy<Regex> = Lazy::new(|| {
    let names: Vec<&str> = NAMED_COLORS.iter().map(|(name, _)| *name).collect();
    Regex::new(&format!(r"(?i)\b({})\b", names.join("|"))).expect("valid color names regex")
});

static HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#([0-9a-fA-F]{6}|[0-9a-fA-F]{3})").expect("valid hex regex"));

pub fn lookup(name: &str) -> Option<Rgb> {
    NAMED_COLORS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, rgb)| *rgb)
}

/// Parse `RRGGBB` or `RGB` (without the `#`).
pub fn parse_hex(hex: &str) -> Option<Rgb> {
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

/// Replace color keywords and hex literals with their `rgb(r, g, b)` form.
pub fn expand_colors(expression: &str) -> String {
    let named = NAMED.replace_all(expression, |caps: &Captures| {
        lookup(&caps[1])
            .map(|rgb| rgb.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });
    HEX.replace_all(&named, |caps: &Captures| {
        parse_hex(&caps[1])
            .map(|rgb| rgb.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
