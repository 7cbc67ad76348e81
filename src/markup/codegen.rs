//! Code generation
//!
//!     Walks the markup tree and writes HTML interleaved with host code. Layout rules:
//!
//!     - Each level of tree depth is two spaces of output indentation.
//!     - An element with children opens and closes on lines of their own; one without
//!       children is written inline, `<p>content</p>`.
//!     - Children of a block instruction (`- if`, `- for`, ...) are written one level
//!       shallower, so the output lines up as if the instruction was not there. The same
//!       goes for elements nested under such children.
//!     - Inside `pre` and `textarea` nothing is re-indented.
//!     - With `collapse_whitespace`, runs of inline siblings share one output line.
//!
//!     Block instructions are closed with `{% end<keyword> %}`. An `else`/`elif` sibling
//!     continues the block it follows: the closing tag of the previous block is dropped in
//!     a final pass so the continuation lands inside it.

use once_cell::sync::Lazy;
use regex::Regex;

use super::line_classification::{block_keyword, MarkupLine, UNSUPPORTED_BLOCK_KEYWORDS};
use super::node::{MarkupNode, MarkupTree};
use super::normalization::NormalizedLine;
use super::registry::TextBlockRegistry;
use super::tag::parse_element;
use super::MarkupError;
use crate::config::MarkupConfig;
use crate::lexing::wrap_words;
use crate::tree::NodeId;

static CONTINUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{% end\w+ %\}\s*\{% (else|elif)\b").expect("valid continuation regex")
});

const XHTML_11: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#;
const XHTML_STRICT: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#;
const XHTML_TRANSITIONAL: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">"#;
const XHTML_FRAMESET: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Frameset//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd">"#;

/// The declaration written for `!!! <kind>`.
pub fn doctype(kind: &str) -> String {
    match kind {
        "" | "1.1" => XHTML_11.to_string(),
        "Strict" => XHTML_STRICT.to_string(),
        "Transitional" => XHTML_TRANSITIONAL.to_string(),
        "Frameset" => XHTML_FRAMESET.to_string(),
        "XML" => r#"<?xml version="1.0" encoding="utf-8" ?>"#.to_string(),
        "5" | "html" => "<!DOCTYPE html>".to_string(),
        other => format!("<!DOCTYPE {other}>"),
    }
}

/// Layout state inherited from the parent.
#[derive(Debug, Clone, Copy)]
struct Scope {
    /// False inside preformatted elements
    can_indent: bool,
    /// The parent is a block instruction, or an element inside one
    in_block: bool,
}

/// Output of one node, before its children are spliced in.
#[derive(Debug, Default)]
struct Parts {
    begin: String,
    body: String,
    end: String,
}

pub struct CodeGenerator<'a> {
    tree: &'a MarkupTree,
    lines: &'a [NormalizedLine],
    config: &'a MarkupConfig,
    blocks: &'a TextBlockRegistry,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(
        tree: &'a MarkupTree,
        lines: &'a [NormalizedLine],
        config: &'a MarkupConfig,
        blocks: &'a TextBlockRegistry,
    ) -> Self {
        CodeGenerator {
            tree,
            lines,
            config,
            blocks,
        }
    }

    pub fn generate(&self) -> Result<String, MarkupError> {
        let scope = Scope {
            can_indent: true,
            in_block: false,
        };
        let mut out = String::new();
        for &root in self.tree.roots() {
            out.push_str(&self.emit(root, scope)?);
        }
        Ok(CONTINUATION.replace_all(&out, "{% $1").into_owned())
    }

    fn emit(&self, id: NodeId, scope: Scope) -> Result<String, MarkupError> {
        let node = self.tree.get(id);
        let depth = self.tree.depth(id);
        let mut child_scope = Scope {
            can_indent: scope.can_indent,
            in_block: false,
        };
        let mut prefix = self.debug_prefix(node);

        let parts = match node.kind() {
            MarkupLine::DynamicInclude(expr) => Parts {
                body: if self.config.embed_code {
                    format!("{{{{ include(name={expr}, indent={depth}) }}}}")
                } else {
                    String::new()
                },
                ..Parts::default()
            },
            MarkupLine::Doctype(kind) => Parts {
                body: format!("{}\n", doctype(kind)),
                ..Parts::default()
            },
            MarkupLine::InternalComment => return Ok(String::new()),
            MarkupLine::Instruction(code) => {
                if !self.config.embed_code {
                    return Ok(String::new());
                }
                let keyword = block_keyword(code);
                let unsupported = keyword.filter(|k| UNSUPPORTED_BLOCK_KEYWORDS.contains(k));
                if let Some(keyword) = unsupported {
                    return Err(MarkupError::UnsupportedInstruction {
                        keyword: keyword.to_string(),
                        line: node.line,
                    });
                }
                let code = match keyword {
                    Some("elseif") => format!("elif{}", &code["elseif".len()..]),
                    _ => code.to_string(),
                };
                if matches!(keyword, Some("else" | "elif" | "elseif")) {
                    prefix.clear();
                }
                let mut parts = Parts {
                    begin: format!("{{% {code} %}}"),
                    ..Parts::default()
                };
                if keyword.is_some() {
                    parts.end = format!("{{% end{} %}}", self.opener(id));
                    child_scope.in_block = true;
                }
                parts
            }
            MarkupLine::TextBlock(name) => Parts {
                body: self.text_block(node, name, scope, depth)?,
                ..Parts::default()
            },
            MarkupLine::Expression(expr) => Parts {
                body: if self.config.embed_code {
                    self.text(id, scope, depth, &format!("{{{{ {expr} }}}}"))
                } else {
                    "\n".to_string()
                },
                ..Parts::default()
            },
            MarkupLine::Comment { condition, text } => {
                self.comment(id, scope, depth, condition, text)
            }
            MarkupLine::Element(line) => {
                child_scope.in_block = scope.in_block;
                self.element(id, line, scope, &mut child_scope, depth)?
            }
            MarkupLine::Text(text) => Parts {
                body: self.text(id, scope, depth, text),
                ..Parts::default()
            },
        };

        let mut children = String::new();
        for &child in self.tree.children(id) {
            children.push_str(&self.emit(child, child_scope)?);
        }

        let mut out = format!("{prefix}{}{}{children}", parts.begin, parts.body);
        if !parts.end.is_empty() && self.tree.has_children(id) {
            out.push_str(&prefix);
        }
        out.push_str(&parts.end);
        Ok(out)
    }

    fn element(
        &self,
        id: NodeId,
        line: &str,
        scope: Scope,
        child_scope: &mut Scope,
        depth: usize,
    ) -> Result<Parts, MarkupError> {
        let node = self.tree.get(id);
        let element = parse_element(line, node.line, self.config)?;
        let open = element.open_tag();
        let close = format!("</{}>", element.tag);
        let shift = if scope.in_block { -1 } else { 0 };

        if element.self_closing {
            return Ok(Parts {
                begin: indent(scope.can_indent, depth, &format!("{open} />"), shift, true),
                ..Parts::default()
            });
        }

        if element.is_preformatted() {
            child_scope.can_indent = false;
            let mut parts = Parts {
                begin: indent(false, depth, &format!("{open}>"), shift, false),
                end: format!("{close}\n"),
                ..Parts::default()
            };
            if !element.content.is_empty() {
                parts.body = indent(false, depth, &element.content, 0, true);
            }
            return Ok(parts);
        }

        if !self.tree.has_children(id) {
            let open = format!("{open}>");
            let parts = if !scope.can_indent {
                Parts {
                    begin: format!("\n{open}"),
                    body: element.content,
                    end: format!("{close}\n"),
                }
            } else if self.config.collapse_whitespace {
                Parts {
                    begin: if self.tree.is_first_child(id) {
                        indent(true, depth, &open, 0, false)
                    } else {
                        open
                    },
                    body: element.content,
                    end: if self.tree.is_last_child(id) {
                        format!("{close}\n")
                    } else {
                        format!("{close} ")
                    },
                }
            } else {
                Parts {
                    begin: indent(true, depth, &open, shift, false),
                    body: element.content,
                    end: format!("{close}\n"),
                }
            };
            return Ok(parts);
        }

        let mut parts = Parts {
            begin: indent(scope.can_indent, depth, &format!("{open}>"), shift, true),
            end: indent(scope.can_indent, depth, &close, shift, true),
            ..Parts::default()
        };
        if !element.content.is_empty() {
            let content = wrap_words(&element.content, self.config.wrap_width);
            parts.body = indent(scope.can_indent, depth, &content, shift + 1, true);
        }
        Ok(parts)
    }

    fn comment(
        &self,
        id: NodeId,
        scope: Scope,
        depth: usize,
        condition: Option<&str>,
        text: &str,
    ) -> Parts {
        let (open, close) = match condition {
            Some(condition) => (format!("<!--[{condition}]>"), "<![endif]-->"),
            None => ("<!--".to_string(), "-->"),
        };
        if self.tree.has_children(id) {
            let body = if text.is_empty() {
                String::new()
            } else {
                indent(scope.can_indent, depth, text, 1, true)
            };
            Parts {
                begin: indent(scope.can_indent, depth, &open, 0, true),
                body,
                end: indent(scope.can_indent, depth, close, 0, true),
            }
        } else {
            Parts {
                begin: indent(scope.can_indent, depth, &format!("{open} "), 0, false),
                body: text.to_string(),
                end: format!(" {close}\n"),
            }
        }
    }

    /// Plain text and expression output.
    fn text(&self, id: NodeId, scope: Scope, depth: usize, text: &str) -> String {
        if !(scope.can_indent && self.config.collapse_whitespace) {
            return indent(scope.can_indent, depth, text, 0, true);
        }
        match (self.tree.is_first_child(id), self.tree.is_last_child(id)) {
            (true, true) => indent(true, depth, text, 0, true),
            (true, false) => format!("{} ", indent(true, depth, text, 0, false)),
            (false, true) => format!("{text}\n"),
            (false, false) => format!("{text} "),
        }
    }

    fn text_block(
        &self,
        node: &MarkupNode,
        name: &str,
        scope: Scope,
        depth: usize,
    ) -> Result<String, MarkupError> {
        let transform = self
            .blocks
            .get(name)
            .ok_or_else(|| MarkupError::UnknownTextBlock {
                name: name.to_string(),
                line: node.line,
            })?;
        let output = transform(&self.block_source(node)).map_err(|message| {
            MarkupError::TextBlock {
                name: name.to_string(),
                line: node.line,
                message,
            }
        })?;
        let output = output.trim_end_matches('\n');
        if output.is_empty() {
            return Ok(String::new());
        }
        Ok(indent(scope.can_indent, depth, output, 0, true))
    }

    /// Raw lines nested under a text block, with the block's own indentation removed.
    fn block_source(&self, node: &MarkupNode) -> String {
        let unit = self.config.indent;
        let Some(own) = self.lines.get(node.line - 1) else {
            return String::new();
        };
        let base = unit.depth_of(&own.text);
        let mut body: Vec<&str> = self.lines[node.line..]
            .iter()
            .take_while(|line| line.text.trim().is_empty() || unit.depth_of(&line.text) > base)
            .map(|line| unit.strip(&line.text, base + 1))
            .collect();
        while body.last().is_some_and(|line| line.trim().is_empty()) {
            body.pop();
        }
        body.join("\n")
    }

    /// Keyword of the block an instruction closes. `else` and `elif` continue the
    /// block of the nearest preceding sibling that opened one.
    fn opener(&self, id: NodeId) -> &'static str {
        let mut current = Some(id);
        while let Some(node) = current {
            if let MarkupLine::Instruction(code) = self.tree.get(node).kind() {
                match block_keyword(code) {
                    Some("else" | "elif" | "elseif") => {}
                    Some(keyword) => return keyword,
                    None => break,
                }
            }
            current = self.tree.previous_sibling(node);
        }
        "if"
    }

    fn debug_prefix(&self, node: &MarkupNode) -> String {
        if !self.config.debug {
            return String::new();
        }
        match &node.origin {
            Some(path) => format!("{} ({}):\t", node.line, path.display()),
            None => format!("{}:\t", node.line),
        }
    }
}

/// Indent every line of `text` by `depth + shift` levels of two spaces.
///
/// Outside indentable scopes markup is written as is and text only gets its newline.
fn indent(can_indent: bool, depth: usize, text: &str, shift: isize, newline: bool) -> String {
    if !can_indent {
        return if text.starts_with('<') {
            text.to_string()
        } else {
            format!("{text}\n")
        };
    }
    let level = (depth as isize + shift).max(0) as usize;
    let pad = "  ".repeat(level);
    let ending = if newline { "\n" } else { "" };
    text.split('\n')
        .map(|line| format!("{pad}{line}{ending}"))
        .collect()
}
