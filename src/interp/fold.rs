//! Constant folding over literal values, following JavaScript coercion.
//!
//! Folding is best-effort: anything outside the modeled coercion table
//! produces `Unknown` rather than a guessed result. In particular a string
//! that is not fully numeric poisons numeric contexts instead of becoming
//! `NaN`, because a wrong guess here would feed wrong literals to the
//! dangerous-API checks.

use crate::ast::LiteralValue;
use crate::interp::value::{JsValue, ValueKind};

/// JS ToString for the literal kinds we model.
pub fn to_js_string(lit: &LiteralValue) -> String {
    match lit {
        LiteralValue::Str(s) => s.clone(),
        LiteralValue::Num(n) => num_to_string(*n),
        LiteralValue::Bool(b) => b.to_string(),
        LiteralValue::Null => "null".to_string(),
    }
}

/// JS Number::toString for the cases constant folding produces.
pub fn num_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    // -0 prints as "0"
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{}", n as i64);
    }
    format!("{n}")
}

/// JS ToNumber. Returns `None` where the coercion is outside the modeled
/// table (non-numeric strings, `NaN` spellings) so callers poison instead of
/// guessing.
pub fn to_number(lit: &LiteralValue) -> Option<f64> {
    match lit {
        LiteralValue::Num(n) => Some(*n),
        LiteralValue::Bool(true) => Some(1.0),
        LiteralValue::Bool(false) => Some(0.0),
        LiteralValue::Null => Some(0.0),
        LiteralValue::Str(s) => str_to_number(s),
    }
}

fn str_to_number(s: &str) -> Option<f64> {
    let trimmed = s.trim_matches(|c: char| c.is_whitespace());
    if trimmed.is_empty() {
        // Empty and whitespace-only strings are 0.
        return Some(0.0);
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    match trimmed {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    // Decimal forms, including exponents and leading signs. Rust's f64
    // parser accepts "inf"/"nan" spellings JS does not, so any letter other
    // than an exponent marker disqualifies the string first.
    if trimmed
        .chars()
        .any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// JS ToBoolean for a value, where determinable.
pub fn truthiness(value: &JsValue) -> Option<bool> {
    match &value.kind {
        ValueKind::Literal(lit) => Some(match lit {
            LiteralValue::Str(s) => !s.is_empty(),
            LiteralValue::Num(n) => *n != 0.0 && !n.is_nan(),
            LiteralValue::Bool(b) => *b,
            LiteralValue::Null => false,
        }),
        ValueKind::Object { .. } | ValueKind::Function { .. } | ValueKind::GlobalRef(_) => {
            Some(true)
        }
        ValueKind::Unknown => None,
    }
}

/// Fold a binary operator over two abstract values.
pub fn fold_binary(operator: &str, left: &JsValue, right: &JsValue) -> JsValue {
    let (Some(l), Some(r)) = (left.as_literal(), right.as_literal()) else {
        return JsValue::dirty_unknown();
    };

    let result = match operator {
        "+" => fold_add(l, r),
        "-" => numeric(l, r, |a, b| a - b),
        "*" => numeric(l, r, |a, b| a * b),
        "/" => numeric(l, r, |a, b| a / b),
        "%" => numeric(l, r, |a, b| a % b),
        "<" => fold_relational(l, r, |o| o == std::cmp::Ordering::Less),
        ">" => fold_relational(l, r, |o| o == std::cmp::Ordering::Greater),
        "<=" => fold_relational(l, r, |o| o != std::cmp::Ordering::Greater),
        ">=" => fold_relational(l, r, |o| o != std::cmp::Ordering::Less),
        "==" => fold_loose_eq(l, r).map(JsValue::boolean),
        "!=" => fold_loose_eq(l, r).map(|eq| JsValue::boolean(!eq)),
        "===" => Some(JsValue::boolean(strict_eq(l, r))),
        "!==" => Some(JsValue::boolean(!strict_eq(l, r))),
        "&" => int32(l, r, |a, b| a & b),
        "|" => int32(l, r, |a, b| a | b),
        "^" => int32(l, r, |a, b| a ^ b),
        "<<" => int32(l, r, |a, b| a.wrapping_shl(b as u32 & 31)),
        ">>" => int32(l, r, |a, b| a.wrapping_shr(b as u32 & 31)),
        _ => None,
    };

    result.unwrap_or_else(JsValue::dirty_unknown)
}

/// Fold a unary operator.
pub fn fold_unary(operator: &str, operand: &JsValue) -> JsValue {
    match operator {
        "!" => match truthiness(operand) {
            Some(b) => JsValue::boolean(!b),
            None => JsValue::dirty_unknown(),
        },
        "-" => match operand.as_literal().and_then(to_number) {
            Some(n) => JsValue::number(-n),
            None => JsValue::dirty_unknown(),
        },
        "+" => match operand.as_literal().and_then(to_number) {
            Some(n) => JsValue::number(n),
            None => JsValue::dirty_unknown(),
        },
        "typeof" => match &operand.kind {
            ValueKind::Literal(LiteralValue::Str(_)) => JsValue::string("string"),
            ValueKind::Literal(LiteralValue::Num(_)) => JsValue::string("number"),
            ValueKind::Literal(LiteralValue::Bool(_)) => JsValue::string("boolean"),
            ValueKind::Literal(LiteralValue::Null) | ValueKind::Object { .. } => {
                JsValue::string("object")
            }
            ValueKind::Function { .. } => JsValue::string("function"),
            _ => JsValue::dirty_unknown(),
        },
        _ => JsValue::dirty_unknown(),
    }
}

fn fold_add(l: &LiteralValue, r: &LiteralValue) -> Option<JsValue> {
    if matches!(l, LiteralValue::Str(_)) || matches!(r, LiteralValue::Str(_)) {
        return Some(JsValue::string(format!(
            "{}{}",
            to_js_string(l),
            to_js_string(r)
        )));
    }
    numeric(l, r, |a, b| a + b)
}

fn numeric(l: &LiteralValue, r: &LiteralValue, op: fn(f64, f64) -> f64) -> Option<JsValue> {
    Some(JsValue::number(op(to_number(l)?, to_number(r)?)))
}

fn int32(l: &LiteralValue, r: &LiteralValue, op: fn(i32, i32) -> i32) -> Option<JsValue> {
    let a = to_number(l)? as i64 as i32;
    let b = to_number(r)? as i64 as i32;
    Some(JsValue::number(op(a, b) as f64))
}

fn fold_relational(
    l: &LiteralValue,
    r: &LiteralValue,
    pick: fn(std::cmp::Ordering) -> bool,
) -> Option<JsValue> {
    // String-to-string compares lexicographically; anything else compares
    // numerically after coercion.
    if let (LiteralValue::Str(a), LiteralValue::Str(b)) = (l, r) {
        return Some(JsValue::boolean(pick(a.as_str().cmp(b.as_str()))));
    }
    let a = to_number(l)?;
    let b = to_number(r)?;
    // NaN comparisons are always false.
    let ordering = a.partial_cmp(&b)?;
    Some(JsValue::boolean(pick(ordering)))
}

fn fold_loose_eq(l: &LiteralValue, r: &LiteralValue) -> Option<bool> {
    match (l, r) {
        (LiteralValue::Str(a), LiteralValue::Str(b)) => Some(a == b),
        (LiteralValue::Null, LiteralValue::Null) => Some(true),
        // null is loosely equal only to undefined (unmodeled) and itself.
        (LiteralValue::Null, _) | (_, LiteralValue::Null) => Some(false),
        // Everything else goes through numeric coercion; 0 == -0 holds via
        // IEEE equality.
        _ => {
            let a = to_number(l)?;
            let b = to_number(r)?;
            Some(a == b)
        }
    }
}

fn strict_eq(l: &LiteralValue, r: &LiteralValue) -> bool {
    match (l, r) {
        (LiteralValue::Str(a), LiteralValue::Str(b)) => a == b,
        (LiteralValue::Num(a), LiteralValue::Num(b)) => a == b,
        (LiteralValue::Bool(a), LiteralValue::Bool(b)) => a == b,
        (LiteralValue::Null, LiteralValue::Null) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn num(n: f64) -> JsValue {
        JsValue::number(n)
    }

    fn s(v: &str) -> JsValue {
        JsValue::string(v)
    }

    #[test]
    fn bool_plus_string_concatenates() {
        let folded = fold_binary("+", &JsValue::boolean(true), &s("foo"));
        assert_eq!(folded.as_str(), Some("truefoo"));
        let folded = fold_binary("+", &s("foo"), &JsValue::boolean(true));
        assert_eq!(folded.as_str(), Some("footrue"));
    }

    #[test]
    fn zero_equals_negative_zero() {
        let folded = fold_binary("==", &num(0.0), &num(-0.0));
        assert_eq!(folded.as_literal(), Some(&LiteralValue::Bool(true)));
    }

    #[test]
    fn string_comparison_is_lexicographic() {
        let folded = fold_binary("<", &s("astring"), &s("string"));
        assert_eq!(folded.as_literal(), Some(&LiteralValue::Bool(true)));
    }

    #[test]
    fn mixed_string_number_compare_coerces() {
        let folded = fold_binary("<", &s("2"), &num(10.0));
        assert_eq!(folded.as_literal(), Some(&LiteralValue::Bool(true)));
    }

    #[test]
    fn non_numeric_string_poisons_numeric_ops() {
        let folded = fold_binary("-", &s("pelican"), &num(1.0));
        assert!(folded.is_unknown());
        assert!(folded.dirty);
    }

    #[test]
    fn unknown_operand_poisons_everything() {
        let folded = fold_binary("+", &JsValue::unknown(), &num(1.0));
        assert!(folded.is_unknown());
    }

    #[test]
    fn hex_strings_are_numeric() {
        assert_eq!(str_to_number("0x10"), Some(16.0));
        assert_eq!(str_to_number("  0X1f "), Some(31.0));
    }

    #[test]
    fn whitespace_only_string_is_zero() {
        assert_eq!(str_to_number("   "), Some(0.0));
        assert_eq!(str_to_number(""), Some(0.0));
    }

    #[test]
    fn infinity_spellings() {
        assert_eq!(str_to_number("Infinity"), Some(f64::INFINITY));
        assert_eq!(str_to_number("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(str_to_number("NaN"), None);
        // Only the exact JS spellings; Rust's own parser is more lenient.
        assert_eq!(str_to_number("infinity"), None);
        assert_eq!(str_to_number("inf"), None);
    }

    #[test]
    fn null_is_not_loosely_equal_to_zero() {
        let folded = fold_binary("==", &JsValue::null(), &num(0.0));
        assert_eq!(folded.as_literal(), Some(&LiteralValue::Bool(false)));
    }

    #[test]
    fn number_to_string_drops_integer_fraction() {
        assert_eq!(num_to_string(4.0), "4");
        assert_eq!(num_to_string(-0.0), "0");
        assert_eq!(num_to_string(1.5), "1.5");
    }

    proptest! {
        #[test]
        fn integer_addition_folds_exactly(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            let folded = fold_binary("+", &num(a as f64), &num(b as f64));
            prop_assert_eq!(folded.as_literal(), Some(&LiteralValue::Num((a + b) as f64)));
        }

        #[test]
        fn integer_string_round_trips_through_to_number(a in -1_000_000i64..1_000_000) {
            let rendered = num_to_string(a as f64);
            prop_assert_eq!(str_to_number(&rendered), Some(a as f64));
        }

        #[test]
        fn string_relational_matches_rust_ordering(a in "[a-z]{0,8}", b in "[a-z]{0,8}") {
            let folded = fold_binary("<", &s(&a), &s(&b));
            prop_assert_eq!(
                folded.as_literal(),
                Some(&LiteralValue::Bool(a < b))
            );
        }

        #[test]
        fn concat_length_is_sum_of_parts(a in "[ -~]{0,16}", b in "[ -~]{0,16}") {
            let folded = fold_binary("+", &s(&a), &s(&b));
            prop_assert_eq!(folded.as_str().map(str::len), Some(a.len() + b.len()));
        }
    }
}
