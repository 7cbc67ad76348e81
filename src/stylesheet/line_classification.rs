//! Stylesheet line classification
//!
//!     Every stylesheet line is exactly one of the kinds below. Checks run in a fixed order
//!     and the first match wins, so `:margin = 1px` is a computed attribute and never a
//!     literal one:
//!
//!         !name = value     Constant definition (surrounding quotes on the value dropped)
//!         :name = expr      Computed attribute, value evaluated by the calculator
//!         :name value       Literal attribute, value copied verbatim
//!         :name             Namespace opener for the attributes nested under it
//!         // text           Comment
//!         anything else     Rule (a selector, possibly comma separated)

use once_cell::sync::Lazy;
use regex::Regex;

static CONSTANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!([^\s=]+)\s*=\s*(.+)$").expect("valid constant regex"));

static COMPUTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:([^\s=]+)\s*=\s*(.+)$").expect("valid computed regex"));

static LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:(\S+)\s+(.+)$").expect("valid attribute regex"));

static NAMESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:(\S+)$").expect("valid namespace regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleLine {
    Constant { name: String, value: String },
    ComputedAttribute { name: String, expression: String },
    Attribute { name: String, value: String },
    Namespace(String),
    Comment,
    Blank,
    Rule(String),
}

/// Classify a line with its indentation already removed.
pub fn classify_line(content: &str) -> StyleLine {
    let content = content.trim();
    if content.is_empty() {
        return StyleLine::Blank;
    }
    if let Some(caps) = CONSTANT.captures(content) {
        let value = caps[2].trim();
        let value = value.strip_prefix('"').unwrap_or(value);
        let value = value.strip_suffix('"').unwrap_or(value);
        return StyleLine::Constant {
            name: caps[1].to_string(),
            value: value.to_string(),
        };
    }
    if let Some(caps) = COMPUTED.captures(content) {
        return StyleLine::ComputedAttribute {
            name: caps[1].to_string(),
            expression: caps[2].trim().to_string(),
        };
    }
    if let Some(caps) = LITERAL.captures(content) {
        return StyleLine::Attribute {
            name: caps[1].to_string(),
            value: caps[2].trim().to_string(),
        };
    }
    if let Some(caps) = NAMESPACE.captures(content) {
        return StyleLine::Namespace(caps[1].to_string());
    }
    if content.starts_with("//") {
        return StyleLine::Comment;
    }
    StyleLine::Rule(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("!main = \"#ff0000\"", StyleLine::Constant { name: "main".into(), value: "#ff0000".into() })]
    #[case("!w=10px", StyleLine::Constant { name: "w".into(), value: "10px".into() })]
    #[case(":width = !w * 2", StyleLine::ComputedAttribute { name: "width".into(), expression: "!w * 2".into() })]
    #[case(":color red", StyleLine::Attribute { name: "color".into(), value: "red".into() })]
    #[case(":font-family Arial, sans-serif", StyleLine::Attribute { name: "font-family".into(), value: "Arial, sans-serif".into() })]
    #[case(":font", StyleLine::Namespace("font".into()))]
    #[case("// a comment", StyleLine::Comment)]
    #[case("   ", StyleLine::Blank)]
    #[case("ul li, ol li", StyleLine::Rule("ul li, ol li".into()))]
    #[case("a:hover", StyleLine::Rule("a:hover".into()))]
    fn test_classify_line(#[case] line: &str, #[case] expected: StyleLine) {
        assert_eq!(classify_line(line), expected);
    }
}
