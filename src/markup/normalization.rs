//! Source normalization
//!
//!     Before any tree is built, markup source goes through a textual rewrite that resolves
//!     three directives:
//!
//!         text |          Line continuation: the next line is appended to this one,
//!         more text       its indentation dropped.
//!
//!         %div ?2         Depth override: this line and the lines nested under it are
//!                         pushed two levels deeper.
//!
//!         !! header       Static include: the line is replaced by `<root>/header.<ext>`,
//!                         re-indented to the depth of the directive.
//!
//!     Includes can contain further directives, so rewriting runs pass after pass until no
//!     directive is left. The number of passes is bounded by `max_passes`; a source that
//!     still has directives after that (typically a file including itself) fails with
//!     [MarkupError::CyclicInclude].
//!
//!     Lines remember which include file they came from so that debug output can point at
//!     the right file.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::trace;

use super::MarkupError;
use crate::lexing::IndentUnit;

static DEPTH_OVERRIDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\?(\d+)\s*$").expect("valid depth override regex"));

static STATIC_INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*!! (.+)$").expect("valid static include regex"));

/// A line of normalized source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    pub text: String,
    /// The include file this line came from, `None` for the main source
    pub origin: Option<PathBuf>,
}

impl NormalizedLine {
    fn own(text: impl Into<String>) -> Self {
        NormalizedLine {
            text: text.into(),
            origin: None,
        }
    }
}

/// Rewrites markup source until no directive is left.
#[derive(Debug, Clone)]
pub struct Normalizer<'a> {
    pub root: &'a Path,
    pub unit: IndentUnit,
    pub extension: &'a str,
    pub debug: bool,
    pub max_passes: usize,
}

impl Normalizer<'_> {
    pub fn normalize(&self, source: &str) -> Result<Vec<NormalizedLine>, MarkupError> {
        let lines = source
            .split('\n')
            .map(|line| NormalizedLine::own(line.trim_end_matches('\r')))
            .collect();
        let mut lines = join_continuations(lines);
        let mut passes = 0;
        while lines.iter().any(|line| has_directive(&line.text)) {
            if passes >= self.max_passes {
                return Err(MarkupError::CyclicInclude { passes });
            }
            lines = join_continuations(self.rewrite(lines)?);
            passes += 1;
        }
        trace!(passes, lines = lines.len(), "markup normalized");
        Ok(lines)
    }

    /// Path of the include file for `name`.
    pub fn include_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name.trim(), self.extension))
    }

    fn rewrite(&self, lines: Vec<NormalizedLine>) -> Result<Vec<NormalizedLine>, MarkupError> {
        let mut out = Vec::with_capacity(lines.len());
        let mut extra = 0;
        let mut override_depth = 0;
        for line in lines {
            if line.text.trim().is_empty() {
                out.push(line);
                continue;
            }
            let depth = self.unit.depth_of(&line.text);
            if depth <= override_depth {
                extra = 0;
                override_depth = 0;
            }
            let mut text = line.text;
            if let Some(found) = DEPTH_OVERRIDE.captures(&text) {
                extra = found[1].parse().unwrap_or(0);
                override_depth = depth;
                let start = found.get(0).map(|m| m.start()).unwrap_or(text.len());
                text.truncate(start);
            }
            if let Some(found) = STATIC_INCLUDE.captures(&text) {
                out.extend(self.include(&found[1], depth + extra)?);
                continue;
            }
            out.push(NormalizedLine {
                text: format!("{}{}", self.unit.repeat(extra), text),
                origin: line.origin,
            });
        }
        Ok(out)
    }

    fn include(&self, name: &str, depth: usize) -> Result<Vec<NormalizedLine>, MarkupError> {
        let path = self.include_path(name);
        if !path.is_file() {
            return Err(MarkupError::SourceNotFound { path });
        }
        let content = std::fs::read_to_string(&path).map_err(|source| MarkupError::Io {
            path: path.clone(),
            source,
        })?;
        trace!(path = %path.display(), depth, "static include");

        let begin = format!("// Begin file {}", path.display());
        let end = format!("// End file {}", path.display());
        let mut body: Vec<&str> = content.trim_end_matches(['\n', '\r']).split('\n').collect();
        if self.debug {
            body.insert(0, &begin);
            body.push(&end);
        }
        let pad = self.unit.repeat(depth);
        Ok(body
            .into_iter()
            .map(|line| {
                let line = line.trim_end_matches('\r');
                NormalizedLine {
                    text: if line.trim().is_empty() {
                        String::new()
                    } else {
                        format!("{pad}{line}")
                    },
                    origin: Some(path.clone()),
                }
            })
            .collect())
    }
}

fn has_directive(text: &str) -> bool {
    DEPTH_OVERRIDE.is_match(text) || STATIC_INCLUDE.is_match(text)
}

/// Text of a line ending in the continuation marker, without the marker.
fn continued(text: &str) -> Option<&str> {
    text.trim_end().strip_suffix('|')
}

/// Join every line ending in `|` with the line after it.
pub fn join_continuations(lines: Vec<NormalizedLine>) -> Vec<NormalizedLine> {
    let mut out = Vec::with_capacity(lines.len());
    let mut pending: Option<NormalizedLine> = None;
    for line in lines {
        let line = match pending.take() {
            Some(mut head) => {
                head.text.push_str(line.text.trim_start());
                head
            }
            None => line,
        };
        match continued(&line.text) {
            Some(stripped) => {
                pending = Some(NormalizedLine {
                    text: stripped.to_string(),
                    origin: line.origin.clone(),
                })
            }
            None => out.push(line),
        }
    }
    out.extend(pending);
    out
}
