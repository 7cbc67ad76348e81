//! Element lines
//!
//!     An element line has a head (everything up to the first space, plus any attached
//!     `{...}` option groups) followed by inline content:
//!
//!         %a.nav#home{:title => 'Home', :rel => nofollow}@/index Home
//!         └─ head ──────────────────────────────────────────────┘ └content
//!
//!     The head is tokenized with logos:
//!
//!         %name       tag name, last one wins (default `div`)
//!         #name       id, last one wins
//!         .name       class, all of them joined with spaces
//!         [expr]      host expression producing extra attributes at render time
//!         @target     link/source target, runs to the end of the head
//!         =           content is a host expression
//!         $           content is translated (only as the last token)
//!         /           self-closing (only as the last token)
//!
//!     Option groups map names to values with `=>`. A value starting with `$` is a host
//!     expression and is emitted as `{{ expr }}`; any other value is literal text with its
//!     quotes removed.

use logos::Logos;
use std::collections::BTreeMap;
use tracing::trace;

use super::MarkupError;
use crate::config::MarkupConfig;

/// Tags that never have content and are written as `<tag />`.
pub const SELF_CLOSING_TAGS: [&str; 6] = ["br", "hr", "link", "meta", "img", "input"];

/// Tags whose content must not be re-indented.
pub const PREFORMATTED_TAGS: [&str; 2] = ["pre", "textarea"];

#[derive(Logos, Debug, PartialEq, Clone)]
enum HeadToken {
    #[regex(r"%[A-Za-z0-9_:\-]+", |lex| lex.slice()[1..].to_string())]
    Tag(String),

    #[regex(r"#[A-Za-z0-9_\-]+", |lex| lex.slice()[1..].to_string())]
    Id(String),

    #[regex(r"\.[A-Za-z0-9_\-]+", |lex| lex.slice()[1..].to_string())]
    Class(String),

    #[regex(r"\[[^\]]*\]", |lex| {
        let slice = lex.slice();
        slice[1..slice.len() - 1].trim().to_string()
    })]
    AutoAttributes(String),

    #[regex(r"@[^\n]*", |lex| lex.slice()[1..].to_string())]
    Target(String),

    #[token("=")]
    Expression,

    #[token("$")]
    Translate,

    #[token("/")]
    SelfClose,
}

/// A parsed element line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    /// Rendered attribute values, sorted by name
    pub attributes: BTreeMap<String, String>,
    /// Host expression whose result is spliced into the opening tag
    pub auto_attributes: Option<String>,
    pub content: String,
    pub self_closing: bool,
}

impl Element {
    pub fn is_preformatted(&self) -> bool {
        PREFORMATTED_TAGS.contains(&self.tag.as_str())
    }

    /// `<tag name="value" ...` without the closing bracket.
    pub fn open_tag(&self) -> String {
        let mut out = format!("<{}", self.tag);
        for (name, value) in &self.attributes {
            out.push_str(&format!(" {name}=\"{value}\""));
        }
        if let Some(expr) = &self.auto_attributes {
            out.push_str(&format!("{{{{ object_attributes(value={expr}) }}}}"));
        }
        out
    }
}

/// Parse an element line (indentation already removed).
pub fn parse_element(
    line: &str,
    number: usize,
    config: &MarkupConfig,
) -> Result<Element, MarkupError> {
    let (head, groups, content) = split_head(line, number)?;

    let mut attributes = BTreeMap::new();
    for group in groups {
        for (name, value) in parse_options(group) {
            attributes.insert(name, render_value(&value));
        }
    }

    let mut tag = None;
    let mut id = None;
    let mut classes = Vec::new();
    let mut auto_attributes = None;
    let mut target = None;
    let mut expression = false;
    let mut last = None;
    let mut lexer = HeadToken::lexer(&head);
    while let Some(result) = lexer.next() {
        let token = match result {
            Ok(token) => token,
            Err(()) => {
                trace!(line = number, text = lexer.slice(), "ignored in element head");
                continue;
            }
        };
        match &token {
            HeadToken::Tag(name) => tag = Some(name.clone()),
            HeadToken::Id(name) => id = Some(name.clone()),
            HeadToken::Class(name) => classes.push(name.clone()),
            HeadToken::AutoAttributes(expr) => auto_attributes = Some(expr.clone()),
            HeadToken::Target(value) => target = Some(value.clone()),
            HeadToken::Expression => expression = true,
            HeadToken::Translate | HeadToken::SelfClose => {}
        }
        last = Some(token);
    }

    let tag = tag.unwrap_or_else(|| "div".to_string());
    if let Some(id) = id {
        attributes.insert("id".to_string(), id);
    }
    if !classes.is_empty() {
        attributes.insert("class".to_string(), classes.join(" "));
    }
    if let Some(target) = target {
        apply_target(&tag, &target, &mut attributes, config);
    }

    let translate = last == Some(HeadToken::Translate);
    let content = if !config.embed_code {
        if expression {
            String::new()
        } else {
            content.to_string()
        }
    } else if translate {
        let text = if expression {
            content.to_string()
        } else {
            quote_literal(content)
        };
        format!("{{{{ {}(text={text}) }}}}", config.translate_function)
    } else if expression && !content.is_empty() {
        format!("{{{{ {content} }}}}")
    } else {
        content.to_string()
    };

    Ok(Element {
        self_closing: last == Some(HeadToken::SelfClose)
            || SELF_CLOSING_TAGS.contains(&tag.as_str()),
        tag,
        attributes,
        auto_attributes: auto_attributes.filter(|_| config.embed_code),
        content,
    })
}

/// Split a line into its head, the option groups attached to it, and the content.
fn split_head(line: &str, number: usize) -> Result<(String, Vec<&str>, &str), MarkupError> {
    let malformed = || MarkupError::MalformedOptions {
        line: number,
        text: line.to_string(),
    };
    let mut head = String::new();
    let mut groups = Vec::new();
    let mut idx = 0;
    let mut in_target = false;
    while let Some(c) = line[idx..].chars().next() {
        match c {
            ' ' => break,
            '@' => {
                in_target = true;
                head.push(c);
                idx += 1;
            }
            // `%p=expr`: the expression may follow the marker without a space
            '=' if !in_target => {
                let marker = if line[idx..].starts_with("=$") { "=$" } else { "=" };
                head.push_str(marker);
                idx += marker.len();
                break;
            }
            '{' => {
                let close = line[idx..].find('}').ok_or_else(malformed)?;
                groups.push(&line[idx + 1..idx + close]);
                idx += close + 1;
            }
            '[' if line[idx..].contains(']') => {
                let close = line[idx..].find(']').unwrap_or_default();
                head.push_str(&line[idx..=idx + close]);
                idx += close + 1;
            }
            _ => {
                head.push(c);
                idx += c.len_utf8();
            }
        }
    }

    let mut content = line[idx..].trim_start();
    while content.starts_with('{') && !content.starts_with("{{") && !content.starts_with("{%") {
        let close = content.find('}').ok_or_else(malformed)?;
        groups.push(&content[1..close]);
        content = content[close + 1..].trim_start();
    }
    Ok((head, groups, content))
}

/// Split an option group into name/value pairs.
fn parse_options(group: &str) -> Vec<(String, String)> {
    split_outside_quotes(group, ',')
        .into_iter()
        .filter(|option| !option.trim().is_empty())
        .map(|option| {
            let (name, value) = option.split_once("=>").unwrap_or((option, ""));
            (
                name.trim().trim_matches(':').to_string(),
                value.trim().trim_matches(':').to_string(),
            )
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

fn split_outside_quotes(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, c) if c == separator => {
                parts.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// `$expr` becomes a host expression; anything else loses its surrounding quotes.
fn render_value(value: &str) -> String {
    let value = value.trim();
    if let Some(expr) = value.strip_prefix('$') {
        return format!("{{{{ {} }}}}", expr.trim());
    }
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

fn apply_target(
    tag: &str,
    target: &str,
    attributes: &mut BTreeMap<String, String>,
    config: &MarkupConfig,
) {
    let named = target.split_once('=').map(|(_, name)| name.trim());
    match tag {
        "a" | "link" => {
            let href = named.map(render_value).unwrap_or_else(|| target.to_string());
            attributes.insert("href".to_string(), href);
        }
        "script" | "img" => {
            let src = match named {
                Some(name) => {
                    let prefix = if tag == "script" {
                        &config.script_prefix
                    } else {
                        &config.image_prefix
                    };
                    format!("{prefix}{}", render_value(name))
                }
                None => target.to_string(),
            };
            attributes.insert("src".to_string(), src);
            if tag == "script" {
                attributes.insert("type".to_string(), "text/javascript".to_string());
            } else {
                attributes.entry("alt".to_string()).or_default();
            }
        }
        _ => trace!(tag, target, "target ignored for tag"),
    }
}

const QUOTES: [char; 3] = ['"', '\'', '`'];

/// Quote literal text as a host string. Host strings have no escapes, so each piece is
/// delimited by a quote it does not contain, and pieces are joined with `~`.
fn quote_literal(text: &str) -> String {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    for c in text.chars() {
        let exhausts_quotes = QUOTES.contains(&c)
            && QUOTES.iter().all(|q| *q == c || piece.contains(*q));
        if exhausts_quotes {
            pieces.push(quote_piece(&piece));
            piece.clear();
        }
        piece.push(c);
    }
    pieces.push(quote_piece(&piece));
    pieces.join(" ~ ")
}

fn quote_piece(piece: &str) -> String {
    let delimiter = QUOTES
        .into_iter()
        .find(|q| !piece.contains(*q))
        .unwrap_or('"');
    format!("{delimiter}{piece}{delimiter}")
}
