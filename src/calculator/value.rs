//! Typed operands
//!
//!     Every operand string is classified into exactly one [TypedValue] before an
//!     operation runs. Classification is anchored: `12px` is a length, `12px solid` is a
//!     string. Results are turned back into strings with [std::fmt::Display], which is the
//!     form the evaluator keeps working on.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^rgb\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*\)$")
        .expect("valid color regex")
});

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)$").expect("valid number regex"));

static LENGTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(-?(?:\d+\.?\d*|\.\d+))(px|em|ex|pt|in|mm|cm|%)$")
        .expect("valid length regex")
});

/// CSS length units understood by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Px,
    Em,
    Ex,
    Pt,
    In,
    Mm,
    Cm,
    Percent,
}

impl Unit {
    pub fn parse(text: &str) -> Option<Unit> {
        match text.to_ascii_lowercase().as_str() {
            "px" => Some(Unit::Px),
            "em" => Some(Unit::Em),
            "ex" => Some(Unit::Ex),
            "pt" => Some(Unit::Pt),
            "in" => Some(Unit::In),
            "mm" => Some(Unit::Mm),
            "cm" => Some(Unit::Cm),
            "%" => Some(Unit::Percent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Px => "px",
            Unit::Em => "em",
            Unit::Ex => "ex",
            Unit::Pt => "pt",
            Unit::In => "in",
            Unit::Mm => "mm",
            Unit::Cm => "cm",
            Unit::Percent => "%",
        }
    }
}

/// An RGB triple, each channel within 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Bring an arbitrary channel result back into range: absolute value, rounded,
    /// reduced modulo 255 when it overflows.
    pub fn normalize_channel(value: f64) -> u8 {
        let mut channel = value.abs().round();
        if channel > 255.0 {
            channel %= 255.0;
        }
        channel as u8
    }

    pub fn channels(&self) -> [f64; 3] {
        [self.r as f64, self.g as f64, self.b as f64]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// A classified operand.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Number(f64),
    Length(f64, Unit),
    Color(Rgb),
    /// Free text, kept with its quotes if it was written quoted
    String(String),
}

impl TypedValue {
    /// Classify an operand string.
    pub fn classify(text: &str) -> TypedValue {
        let text = text.trim();
        if let Some(caps) = COLOR.captures(text) {
            let channel = |i: usize| {
                caps[i]
                    .parse::<f64>()
                    .map(Rgb::normalize_channel)
                    .unwrap_or_default()
            };
            return TypedValue::Color(Rgb::new(channel(1), channel(2), channel(3)));
        }
        if NUMBER.is_match(text) {
            if let Ok(n) = text.parse::<f64>() {
                return TypedValue::Number(n);
            }
        }
        if let Some(caps) = LENGTH.captures(text) {
            if let (Ok(n), Some(unit)) = (caps[1].parse::<f64>(), Unit::parse(&caps[2])) {
                return TypedValue::Length(n, unit);
            }
        }
        TypedValue::String(text.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TypedValue::Number(_) => "number",
            TypedValue::Length(..) => "length",
            TypedValue::Color(_) => "color",
            TypedValue::String(_) => "string",
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Number(n) => write!(f, "{}", format_decimal(*n)),
            TypedValue::Length(n, unit) => write!(f, "{}{}", format_decimal(*n), unit.as_str()),
            TypedValue::Color(rgb) => write!(f, "{rgb}"),
            TypedValue::String(s) => write!(f, "{s}"),
        }
    }
}

/// Print a decimal without a trailing `.0`, dropping float noise past ten places.
pub fn format_decimal(value: f64) -> String {
    let rounded = (value * 1e10).round() / 1e10;
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{rounded}")
}

/// Split `"text"` into its contents, reporting whether it was quoted.
pub fn unquote(text: &str) -> (&str, bool) {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        (&text[1..text.len() - 1], true)
    } else {
        (text, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("12", TypedValue::Number(12.0))]
    #[case("-1.5", TypedValue::Number(-1.5))]
    #[case("10px", TypedValue::Length(10.0, Unit::Px))]
    #[case("50%", TypedValue::Length(50.0, Unit::Percent))]
    #[case("1.5EM", TypedValue::Length(1.5, Unit::Em))]
    #[case("rgb(1, 2, 3)", TypedValue::Color(Rgb::new(1, 2, 3)))]
    #[case("12px solid", TypedValue::String("12px solid".into()))]
    #[case("\"hi\"", TypedValue::String("\"hi\"".into()))]
    fn test_classify(#[case] text: &str, #[case] expected: TypedValue) {
        assert_eq!(TypedValue::classify(text), expected);
    }

    #[rstest]
    #[case(3.0, "3")]
    #[case(2.5, "2.5")]
    #[case(0.1 + 0.2, "0.3")]
    #[case(-0.0, "0")]
    fn test_format_decimal(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_decimal(value), expected);
    }

    #[test]
    fn test_channel_normalization() {
        assert_eq!(Rgb::normalize_channel(-10.0), 10);
        assert_eq!(Rgb::normalize_channel(255.0), 255);
        assert_eq!(Rgb::normalize_channel(300.0), 45);
        assert_eq!(Rgb::normalize_channel(12.6), 13);
    }
}
