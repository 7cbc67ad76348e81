//! Source lines
//!
//!     Both languages are line based: every non-blank line becomes exactly one tree node,
//!     and the only structural information a line carries is how deep it is indented.
//!     This module cuts source text into [SourceLine]s and measures that depth.
//!
//! Indentation Handling
//!
//!     Indentation is measured in units. A unit is either one tab or a fixed run of
//!     spaces, configured per language ([IndentUnit]). A tab always counts as one full
//!     level, spaces count as a fraction of a level, and fractional depths are rounded up,
//!     so a line indented by three spaces with a two-space unit sits at depth 2.
//!
//!     Tab units still accept spaces: four spaces make one level, the same substitution
//!     the lex lexer used for its indentation tokens.

use serde::Deserialize;
use std::fmt;

/// Number of spaces standing in for one level when the unit is a tab.
const SPACES_PER_TAB_LEVEL: usize = 4;

/// One level of indentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum IndentUnit {
    Tab,
    Spaces(usize),
}

impl IndentUnit {
    /// Width of one level, measured in spaces.
    fn columns(&self) -> usize {
        match self {
            IndentUnit::Tab => SPACES_PER_TAB_LEVEL,
            IndentUnit::Spaces(n) => (*n).max(1),
        }
    }

    /// Literal text of `levels` units.
    pub fn repeat(&self, levels: usize) -> String {
        match self {
            IndentUnit::Tab => "\t".repeat(levels),
            IndentUnit::Spaces(n) => " ".repeat(n * levels),
        }
    }

    /// Count the depth of a line from its leading whitespace.
    pub fn depth_of(&self, line: &str) -> usize {
        let columns = self.leading_columns(line);
        columns.div_ceil(self.columns())
    }

    fn leading_columns(&self, line: &str) -> usize {
        line.chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .map(|c| if c == '\t' { self.columns() } else { 1 })
            .sum()
    }

    /// Remove up to `levels` units of leading indentation, keeping anything deeper.
    pub fn strip<'a>(&self, line: &'a str, levels: usize) -> &'a str {
        let budget = levels * self.columns();
        let mut used = 0;
        for (idx, c) in line.char_indices() {
            let width = match c {
                '\t' => self.columns(),
                ' ' => 1,
                _ => return &line[idx..],
            };
            if used + width > budget {
                return &line[idx..];
            }
            used += width;
        }
        ""
    }
}

impl Default for IndentUnit {
    fn default() -> Self {
        IndentUnit::Spaces(2)
    }
}

impl TryFrom<String> for IndentUnit {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if !value.is_empty() && value.chars().all(|c| c == '\t') {
            Ok(IndentUnit::Tab)
        } else if !value.is_empty() && value.chars().all(|c| c == ' ') {
            Ok(IndentUnit::Spaces(value.len()))
        } else {
            Err(format!(
                "indent must be made of only tabs or only spaces, got {value:?}"
            ))
        }
    }
}

impl fmt::Display for IndentUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndentUnit::Tab => write!(f, "tab"),
            IndentUnit::Spaces(n) => write!(f, "{n} spaces"),
        }
    }
}

/// A single line of source with its measured depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number
    pub number: usize,
    /// The line as written, without the line terminator
    pub raw: String,
    /// Indentation depth in units
    pub depth: usize,
}

impl SourceLine {
    /// The line with its leading indentation removed.
    pub fn content(&self) -> &str {
        self.raw.trim_start_matches([' ', '\t'])
    }

    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

/// Split source text into lines, measuring each line's depth.
///
/// Carriage returns are dropped, so CRLF sources behave like LF ones.
pub fn split_lines(source: &str, unit: IndentUnit) -> Vec<SourceLine> {
    source
        .split('\n')
        .enumerate()
        .map(|(idx, line)| {
            let raw = line.trim_end_matches('\r').to_string();
            let depth = unit.depth_of(&raw);
            SourceLine {
                number: idx + 1,
                raw,
                depth,
            }
        })
        .collect()
}

/// Greedy word wrap at spaces; words longer than `width` stay on their own line.
pub fn wrap_words(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        } else if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    lines.push(current);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(IndentUnit::Spaces(2), "a", 0)]
    #[case(IndentUnit::Spaces(2), "  a", 1)]
    #[case(IndentUnit::Spaces(2), "   a", 2)]
    #[case(IndentUnit::Spaces(2), "\ta", 1)]
    #[case(IndentUnit::Tab, "\t\ta", 2)]
    #[case(IndentUnit::Tab, "    a", 1)]
    #[case(IndentUnit::Tab, "\t  a", 2)]
    fn test_depth_rounds_up(#[case] unit: IndentUnit, #[case] line: &str, #[case] depth: usize) {
        assert_eq!(unit.depth_of(line), depth);
    }

    #[test]
    fn test_strip_keeps_deeper_indentation() {
        let unit = IndentUnit::Spaces(2);
        assert_eq!(unit.strip("      deep", 2), "  deep");
        assert_eq!(unit.strip("  shallow", 2), "shallow");
        assert_eq!(IndentUnit::Tab.strip("\t\t\tx", 1), "\t\tx");
    }

    #[test]
    fn test_split_lines_numbers_and_crlf() {
        let lines = split_lines("a\r\n  b\n", IndentUnit::Spaces(2));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].raw, "a");
        assert_eq!(lines[1].number, 2);
        assert_eq!(lines[1].depth, 1);
        assert_eq!(lines[1].content(), "b");
        assert!(lines[2].is_blank());
    }

    #[test]
    fn test_indent_unit_from_config_string() {
        assert_eq!(IndentUnit::try_from("\t".to_string()), Ok(IndentUnit::Tab));
        assert_eq!(
            IndentUnit::try_from("    ".to_string()),
            Ok(IndentUnit::Spaces(4))
        );
        assert!(IndentUnit::try_from(" \t".to_string()).is_err());
    }

    #[test]
    fn test_wrap_words() {
        assert_eq!(wrap_words("aaa bbb ccc", 7), "aaa bbb\nccc");
        assert_eq!(wrap_words("short", 60), "short");
        assert_eq!(wrap_words("toolongword x", 4), "toolongword\nx");
    }
}
