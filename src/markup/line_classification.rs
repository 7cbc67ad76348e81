//! Markup line classification
//!
//!     Each normalized line (indentation removed) falls into exactly one category. The
//!     checks run in this order and the first match wins:
//!
//!         !!= expr        Dynamic include, resolved by the host at render time
//!         !!! [kind]      Doctype declaration
//!         // text         Internal comment, dropped together with its children
//!         - code          Host instruction; block keywords wrap their children
//!         :name           Text block; children are raw source for a registered transform
//!         = expr          Host expression output
//!         / text          HTML comment, `/[condition] text` for conditional comments
//!         %tag #id .cls   Element (any line starting with `%`, `#`, `.` or `=`)
//!         anything else   Plain text

/// Control keywords that open a block and wrap the instruction's children.
pub const BLOCK_KEYWORDS: [&str; 12] = [
    "if", "elif", "elseif", "else", "for", "while", "switch", "do", "filter", "macro", "block",
    "raw",
];

/// Block keywords that are recognized but have no Tera tag to compile to.
pub const UNSUPPORTED_BLOCK_KEYWORDS: [&str; 3] = ["while", "switch", "do"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupLine<'a> {
    DynamicInclude(&'a str),
    Doctype(&'a str),
    InternalComment,
    Instruction(&'a str),
    TextBlock(&'a str),
    Expression(&'a str),
    Comment {
        condition: Option<&'a str>,
        text: &'a str,
    },
    Element(&'a str),
    Text(&'a str),
}

pub fn classify_line(content: &str) -> MarkupLine<'_> {
    if let Some(expr) = content.strip_prefix("!!= ") {
        return MarkupLine::DynamicInclude(expr.trim());
    }
    if let Some(kind) = content.strip_prefix("!!!") {
        return MarkupLine::Doctype(kind.trim());
    }
    if content.starts_with("//") {
        return MarkupLine::InternalComment;
    }
    if let Some(code) = content.strip_prefix("- ") {
        return MarkupLine::Instruction(code.trim());
    }
    if let Some(name) = content.strip_prefix(':') {
        if !name.trim().is_empty() {
            return MarkupLine::TextBlock(name.trim());
        }
    }
    if let Some(expr) = content.strip_prefix("= ") {
        return MarkupLine::Expression(expr);
    }
    if let Some(rest) = content.strip_prefix('/') {
        return classify_comment(rest);
    }
    if content.starts_with(['%', '#', '.', '=']) {
        return MarkupLine::Element(content);
    }
    MarkupLine::Text(content)
}

fn classify_comment(rest: &str) -> MarkupLine<'_> {
    let rest = rest.trim_start();
    if let Some(inner) = rest.strip_prefix('[') {
        if let Some(close) = inner.find(']') {
            return MarkupLine::Comment {
                condition: Some(inner[..close].trim()),
                text: inner[close + 1..].trim(),
            };
        }
    }
    MarkupLine::Comment {
        condition: None,
        text: rest.trim(),
    }
}

/// The block keyword an instruction starts with, matched as a whole word.
pub fn block_keyword(code: &str) -> Option<&'static str> {
    let word: &str = code
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .next()
        .unwrap_or_default();
    BLOCK_KEYWORDS.iter().copied().find(|keyword| *keyword == word)
}
