//! Per-kind arithmetic
//!
//!     The left operand decides the semantics of an operation:
//!
//!     - Numbers round to two decimals. A number meeting a length or a color is promoted
//!       to that kind first; a number meeting a string is treated as text.
//!     - Lengths compute when the units agree or the right side is unitless. When exactly
//!       one side is a percentage, `+` and `-` scale the left value by that percentage.
//!       Any other unit mix is left unresolved and printed back as `a op b`.
//!     - Colors work per channel; a scalar right side applies to all three channels.
//!     - Strings concatenate on `+`, drop the first occurrence of the right side on `-`
//!       and refuse `*` and `/`.

use super::value::{format_decimal, unquote, Rgb, TypedValue, Unit};
use super::{CalculatorError, Operator};

/// Apply `op` to two classified operands.
pub fn apply(
    left: TypedValue,
    op: Operator,
    right: TypedValue,
) -> Result<TypedValue, CalculatorError> {
    match (left, right) {
        (TypedValue::Number(a), TypedValue::Number(b)) => {
            Ok(TypedValue::Number(round2(compute(a, op, b)?)))
        }
        (TypedValue::Number(a), right @ TypedValue::Length(_, unit)) => {
            length(a, unit, op, right)
        }
        (TypedValue::Number(a), right @ TypedValue::Color(_)) => {
            let n = Rgb::normalize_channel(a);
            color(Rgb::new(n, n, n), op, right)
        }
        (TypedValue::Number(a), right @ TypedValue::String(_)) => {
            string(format_decimal(a), op, right)
        }
        (TypedValue::Length(a, unit), right) => length(a, unit, op, right),
        (TypedValue::Color(rgb), right) => color(rgb, op, right),
        (TypedValue::String(text), right) => string(text, op, right),
    }
}

fn compute(a: f64, op: Operator, b: f64) -> Result<f64, CalculatorError> {
    Ok(match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mul => a * b,
        Operator::Div => {
            if b == 0.0 {
                return Err(CalculatorError::DivisionByZero {
                    expression: format!("{} / {}", format_decimal(a), format_decimal(b)),
                });
            }
            a / b
        }
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn length(a: f64, unit: Unit, op: Operator, right: TypedValue) -> Result<TypedValue, CalculatorError> {
    let unresolved = |right: &TypedValue| {
        TypedValue::String(format!(
            "{}{} {} {}",
            format_decimal(a),
            unit.as_str(),
            op.symbol(),
            right
        ))
    };
    let (b, other) = match right {
        TypedValue::Number(b) => (b, unit),
        TypedValue::Length(b, other) => (b, other),
        other => return Ok(unresolved(&other)),
    };

    if other == unit {
        return Ok(TypedValue::Length(compute(a, op, b)?, unit));
    }

    let one_percentage = (unit == Unit::Percent) != (other == Unit::Percent);
    match op {
        Operator::Add if one_percentage => Ok(TypedValue::Length(a + a * b / 100.0, unit)),
        Operator::Sub if one_percentage => Ok(TypedValue::Length(a - a * b / 100.0, unit)),
        _ => Ok(unresolved(&TypedValue::Length(b, other))),
    }
}

fn color(rgb: Rgb, op: Operator, right: TypedValue) -> Result<TypedValue, CalculatorError> {
    let others = match right {
        TypedValue::Number(n) | TypedValue::Length(n, _) => [n, n, n],
        TypedValue::Color(other) => other.channels(),
        TypedValue::String(text) => {
            return Err(CalculatorError::UnsupportedOperation {
                operation: op.name(),
                kind: format!("color and string {text:?}"),
            })
        }
    };
    let [r, g, b] = rgb.channels();
    let channel = |a: f64, b: f64| compute(a, op, b).map(Rgb::normalize_channel);
    Ok(TypedValue::Color(Rgb::new(
        channel(r, others[0])?,
        channel(g, others[1])?,
        channel(b, others[2])?,
    )))
}

fn string(text: String, op: Operator, right: TypedValue) -> Result<TypedValue, CalculatorError> {
    let right = right.to_string();
    let (left_inner, quoted) = unquote(&text);
    let (right_inner, _) = unquote(&right);
    let combined = match op {
        Operator::Add => format!("{left_inner}{right_inner}"),
        Operator::Sub => left_inner.replacen(right_inner, "", 1),
        Operator::Mul | Operator::Div => {
            return Err(CalculatorError::UnsupportedOperation {
                operation: op.name(),
                kind: "string".to_string(),
            })
        }
    };
    Ok(TypedValue::String(if quoted {
        format!("\"{combined}\"")
    } else {
        combined
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn run(left: &str, op: Operator, right: &str) -> Result<String, CalculatorError> {
        apply(TypedValue::classify(left), op, TypedValue::classify(right)).map(|v| v.to_string())
    }

    #[rstest]
    #[case("10px", Operator::Add, "5px", "15px")]
    #[case("10px", Operator::Mul, "2", "20px")]
    #[case("20px", Operator::Add, "50%", "30px")]
    #[case("20px", Operator::Sub, "50%", "10px")]
    #[case("3", Operator::Mul, "2em", "6em")]
    #[case("1", Operator::Div, "3", "0.33")]
    #[case("10px", Operator::Add, "2em", "10px + 2em")]
    #[case("rgb(100, 0, 0)", Operator::Mul, "2", "rgb(200, 0, 0)")]
    #[case("rgb(200, 0, 0)", Operator::Add, "100", "rgb(45, 100, 100)")]
    #[case("rgb(10, 20, 30)", Operator::Add, "rgb(1, 2, 3)", "rgb(11, 22, 33)")]
    #[case("rgb(10, 20, 30)", Operator::Sub, "20", "rgb(10, 0, 10)")]
    #[case("\"foo\"", Operator::Add, "\"bar\"", "\"foobar\"")]
    #[case("foobarfoo", Operator::Sub, "foo", "barfoo")]
    fn test_operations(
        #[case] left: &str,
        #[case] op: Operator,
        #[case] right: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(run(left, op, right).unwrap(), expected);
    }

    #[test]
    fn test_string_multiplication_is_unsupported() {
        let err = run("foo", Operator::Mul, "2").unwrap_err();
        assert!(matches!(err, CalculatorError::UnsupportedOperation { .. }));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            run("4px", Operator::Div, "0"),
            Err(CalculatorError::DivisionByZero { .. })
        ));
        assert!(matches!(
            run("4", Operator::Div, "0"),
            Err(CalculatorError::DivisionByZero { .. })
        ));
    }
}
