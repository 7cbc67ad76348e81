//! Typed calculator
//!
//!     Computed stylesheet attributes (`:width = !base * 2`) are evaluated here. The
//!     calculator works on strings end to end: every intermediate result is printed back
//!     into the expression and re-classified when it is used again, which keeps units and
//!     colors attached to their numbers without a separate AST.
//!
//! Evaluation
//!
//!     1. Constants (`!name`) are substituted, longest name first and case-insensitively.
//!     2. Color keywords and hex literals become `rgb(r, g, b)`.
//!     3. Parenthesized groups are evaluated innermost first and spliced back in. The
//!        parentheses of `rgb(...)` and anything inside double quotes are left alone.
//!     4. The remaining flat expression is reduced by splitting it at the first binary
//!        `+`, then `-`, then `*`, then `/`, evaluating both halves recursively.
//!
//!     Step 4 gives `*` and `/` the usual precedence over `+` and `-` (`1 + 2 * 3` is 7),
//!     but splitting at the first operator groups to the right: `5 - 2 - 1` is 4 and
//!     `8 / 2 / 2` is 8. Use parentheses for chains of `-` or `/`.
//!
//!     Operand typing and the per-kind arithmetic live in [value] and [arithmetic].

pub mod arithmetic;
pub mod colors;
pub mod value;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub use value::{Rgb, TypedValue, Unit};

static OPERATOR_SPACING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*([+\-*/])\s*").expect("valid operator spacing regex"));

/// Binary operators, in the order the evaluator tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub const ALL: [Operator; 4] = [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div];

    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Add => "addition",
            Operator::Sub => "subtraction",
            Operator::Mul => "multiplication",
            Operator::Div => "division",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculatorError {
    #[error("{operation} is not supported for {kind} operands")]
    UnsupportedOperation {
        operation: &'static str,
        kind: String,
    },
    #[error("division by zero in `{expression}`")]
    DivisionByZero { expression: String },
    #[error("unbalanced parenthesis in `{expression}`")]
    UnbalancedParenthesis { expression: String },
}

/// Evaluates expressions against a set of named constants.
#[derive(Debug, Clone, Default)]
pub struct Calculator {
    constants: Vec<(String, String)>,
}

impl Calculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constants<I, K, V>(constants: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut calculator = Self::new();
        for (name, value) in constants {
            calculator.define(name, value);
        }
        calculator
    }

    /// Define or redefine a constant. Names are case-insensitive.
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .constants
            .iter_mut()
            .find(|(known, _)| known.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.constants.push((name, value)),
        }
    }

    pub fn constant(&self, name: &str) -> Option<&str> {
        self.constants
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Evaluate an expression to its printed result.
    pub fn calculate(&self, expression: &str) -> Result<String, CalculatorError> {
        let substituted = self.substitute_constants(expression);
        let expanded = colors::expand_colors(&substituted);
        let flat = resolve_groups(&expanded)?;
        let result = reduce(&flat)?;
        tracing::trace!(expression, result = %result, "calculated");
        Ok(result)
    }

    fn substitute_constants(&self, expression: &str) -> String {
        let mut ordered: Vec<&(String, String)> = self.constants.iter().collect();
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        ordered
            .into_iter()
            .fold(expression.to_string(), |acc, (name, value)| {
                match Regex::new(&format!("(?i)!{}", regex::escape(name))) {
                    Ok(pattern) => pattern.replace_all(&acc, regex::NoExpand(value)).into_owned(),
                    Err(_) => acc,
                }
            })
    }
}

/// Evaluate parenthesized groups innermost first until none are left.
fn resolve_groups(expression: &str) -> Result<String, CalculatorError> {
    let mut current = expression.to_string();
    loop {
        match innermost_group(&current)? {
            None => return Ok(current),
            Some((open, close)) => {
                let value = reduce(&current[open + 1..close])?;
                current = normalize_signs(&format!(
                    "{}{}{}",
                    &current[..open],
                    value,
                    &current[close + 1..]
                ));
            }
        }
    }
}

/// Byte range of the first closed group that is not an `rgb(...)` call.
fn innermost_group(expression: &str) -> Result<Option<(usize, usize)>, CalculatorError> {
    let unbalanced = || CalculatorError::UnbalancedParenthesis {
        expression: expression.to_string(),
    };
    let mut stack: Vec<(usize, bool)> = Vec::new();
    let mut quoted = false;
    for (idx, c) in expression.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '(' if !quoted => {
                let is_rgb = expression[..idx].to_ascii_lowercase().ends_with("rgb");
                stack.push((idx, is_rgb));
            }
            ')' if !quoted => {
                let (open, is_rgb) = stack.pop().ok_or_else(unbalanced)?;
                if !is_rgb {
                    return Ok(Some((open, idx)));
                }
            }
            _ => {}
        }
    }
    if stack.is_empty() {
        Ok(None)
    } else {
        Err(unbalanced())
    }
}

/// Collapse `--` into `+` and `+-` into `-`.
fn normalize_signs(expression: &str) -> String {
    expression.replace("--", "+").replace("+-", "-")
}

/// Remove whitespace around operators outside of quoted strings.
fn tighten(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len());
    for (i, part) in expression.split('"').enumerate() {
        if i > 0 {
            out.push('"');
        }
        if i % 2 == 0 {
            out.push_str(&OPERATOR_SPACING.replace_all(part, "$1"));
        } else {
            out.push_str(part);
        }
    }
    out
}

/// Position of the first binary occurrence of `op` outside quotes.
fn find_binary(expression: &str, op: Operator) -> Option<usize> {
    let mut quoted = false;
    let mut previous: Option<char> = None;
    for (idx, c) in expression.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if !quoted && c == op.symbol() && idx > 0 && idx + 1 < expression.len() {
            let binary = match op {
                Operator::Sub => previous.is_some_and(|p| !matches!(p, '+' | '-' | '*' | '/')),
                _ => true,
            };
            if binary {
                return Some(idx);
            }
        }
        previous = Some(c);
    }
    None
}

/// Reduce a parenthesis-free expression.
fn reduce(expression: &str) -> Result<String, CalculatorError> {
    let mut current = normalize_signs(&tighten(expression.trim()));
    for op in Operator::ALL {
        if let Some(idx) = find_binary(&current, op) {
            let left = reduce(&current[..idx])?;
            let right = reduce(&current[idx + 1..])?;
            let result = arithmetic::apply(
                TypedValue::classify(&left),
                op,
                TypedValue::classify(&right),
            )?;
            current = normalize_signs(&result.to_string());
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1 + 2", "3")]
    #[case("10px + 5px", "15px")]
    #[case("(10px + 5px) * 2", "30px")]
    #[case("2 * (3 + 4)", "14")]
    #[case("((1 + 1) * (2 + 2))", "8")]
    #[case("20px + 50%", "30px")]
    #[case("10 - -2", "12")]
    #[case("-4px * 2", "-8px")]
    #[case("2 + 3 * 4", "14")]
    #[case("10 - 2 - 1", "9")]
    #[case("2 * 3 - 1", "5")]
    #[case("red", "rgb(255, 0, 0)")]
    #[case("#333 + #111", "rgb(68, 68, 68)")]
    #[case("white - 5", "rgb(250, 250, 250)")]
    #[case("1px solid", "1px solid")]
    #[case("\"a - b\" + \"c\"", "\"a - bc\"")]
    fn test_calculate(#[case] expression: &str, #[case] expected: &str) {
        let calculator = Calculator::new();
        assert_eq!(calculator.calculate(expression).unwrap(), expected);
    }

    #[test]
    fn test_constants_longest_name_first() {
        let calculator = Calculator::with_constants([("base", "10px"), ("baseline", "3px")]);
        assert_eq!(calculator.calculate("!baseline + !base").unwrap(), "13px");
        assert_eq!(calculator.calculate("!BASE * 2").unwrap(), "20px");
    }

    #[test]
    fn test_redefining_a_constant_replaces_it() {
        let mut calculator = Calculator::new();
        calculator.define("w", "1px");
        calculator.define("W", "2px");
        assert_eq!(calculator.constant("w"), Some("2px"));
    }

    #[rstest]
    #[case("(1 + 2")]
    #[case("1 + 2)")]
    fn test_unbalanced(#[case] expression: &str) {
        let err = Calculator::new().calculate(expression).unwrap_err();
        assert!(matches!(err, CalculatorError::UnbalancedParenthesis { .. }));
    }

    #[test]
    fn test_division_by_zero_is_reported() {
        let err = Calculator::new().calculate("10px / (2 - 2)").unwrap_err();
        assert!(matches!(err, CalculatorError::DivisionByZero { .. }));
    }

    #[test]
    fn test_rgb_parentheses_are_not_groups() {
        assert_eq!(
            Calculator::new().calculate("rgb(1, 2, 3) * 2").unwrap(),
            "rgb(2, 4, 6)"
        );
    }
}
