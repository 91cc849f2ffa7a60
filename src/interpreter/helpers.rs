use super::*;

pub(crate) fn to_integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 {
        0.0
    } else if n.is_infinite() {
        n
    } else {
        n.trunc()
    }
}

/// Clamps a relative index argument (negative counts from the end).
pub(crate) fn relative_index(arg: Option<&JsValue>, len: usize, default: usize) -> usize {
    let Some(arg) = arg.filter(|a| !a.is_undefined()) else {
        return default;
    };
    let n = to_integer_or_infinity(to_number(arg));
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

// ToBoolean
pub(crate) fn to_boolean(val: &JsValue) -> bool {
    match val {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
        JsValue::String(s) => !s.is_empty(),
        JsValue::BigInt(b) => b.value.sign() != num_bigint::Sign::NoSign,
        JsValue::Object(_) => true,
    }
}

// ToNumber on primitives; objects go through Interpreter::to_number
pub(crate) fn to_number(val: &JsValue) -> f64 {
    match val {
        JsValue::Undefined => f64::NAN,
        JsValue::Null => 0.0,
        JsValue::Boolean(b) => *b as u8 as f64,
        JsValue::Number(n) => *n,
        JsValue::String(s) => string_to_number(&s.to_rust_string()),
        JsValue::BigInt(b) => bigint_ops::to_f64(&b.value),
        JsValue::Object(_) => f64::NAN,
    }
}

pub(crate) fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let radix = match trimmed.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ => 10,
    };
    if radix != 10 {
        return parse_digits(&trimmed[2..], radix).unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust accepts "inf", "nan" and "1e" style spellings JavaScript rejects
    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Digits in `radix` without sign or prefix; `None` on any invalid digit.
pub(crate) fn parse_digits(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0.0, |acc, c| {
        c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
    })
}

pub(crate) fn same_value_zero(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value_zero(*a, *b),
        _ => strict_equality(left, right),
    }
}

pub(crate) fn same_value(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Number(a), JsValue::Number(b)) => {
            if a.is_nan() && b.is_nan() {
                return true;
            }
            if *a == 0.0 && *b == 0.0 {
                return a.is_sign_positive() == b.is_sign_positive();
            }
            a == b
        }
        _ => strict_equality(left, right),
    }
}

pub(crate) fn strict_equality(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Undefined, JsValue::Undefined) => true,
        (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::equal(*a, *b),
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::BigInt(a), JsValue::BigInt(b)) => a.value == b.value,
        (JsValue::Object(a), JsValue::Object(b)) => a.ptr_eq(b),
        _ => false,
    }
}

/// Loose equality once both sides are primitives (or both objects).
pub(crate) fn primitive_loose_equality(left: &JsValue, right: &JsValue) -> bool {
    if std::mem::discriminant(left) == std::mem::discriminant(right) {
        return strict_equality(left, right);
    }
    match (left, right) {
        (JsValue::Null, JsValue::Undefined) | (JsValue::Undefined, JsValue::Null) => true,
        (JsValue::Number(_), JsValue::String(_)) => {
            primitive_loose_equality(left, &JsValue::Number(to_number(right)))
        }
        (JsValue::String(_), JsValue::Number(_)) => {
            primitive_loose_equality(&JsValue::Number(to_number(left)), right)
        }
        (JsValue::BigInt(b), JsValue::String(s)) | (JsValue::String(s), JsValue::BigInt(b)) => {
            bigint_ops::parse(&s.to_rust_string()).is_some_and(|n| n == b.value)
        }
        (JsValue::Boolean(_), _) => primitive_loose_equality(&JsValue::Number(to_number(left)), right),
        (_, JsValue::Boolean(_)) => primitive_loose_equality(left, &JsValue::Number(to_number(right))),
        (JsValue::BigInt(b), JsValue::Number(n)) | (JsValue::Number(n), JsValue::BigInt(b)) => {
            n.is_finite() && n.fract() == 0.0 && bigint_ops::from_f64(*n).is_some_and(|m| m == b.value)
        }
        _ => false,
    }
}

/// `left < right` on primitives; `None` when either side is NaN.
pub(crate) fn primitive_less_than(left: &JsValue, right: &JsValue) -> Option<bool> {
    match (left, right) {
        (JsValue::String(a), JsValue::String(b)) => Some(a.code_units < b.code_units),
        (JsValue::BigInt(a), JsValue::BigInt(b)) => Some(a.value < b.value),
        (JsValue::BigInt(a), other) => compare_bigint_number(&a.value, to_number(other)),
        (other, JsValue::BigInt(b)) => {
            let n = to_number(other);
            if n.is_nan() {
                return None;
            }
            let b = bigint_ops::to_f64(&b.value);
            Some(n < b)
        }
        _ => number_ops::less_than(to_number(left), to_number(right)),
    }
}

fn compare_bigint_number(a: &num_bigint::BigInt, n: f64) -> Option<bool> {
    if n.is_nan() {
        return None;
    }
    Some(bigint_ops::to_f64(a) < n)
}

pub(crate) fn typeof_val(val: &JsValue) -> &'static str {
    match val {
        JsValue::Undefined => "undefined",
        JsValue::Null => "object",
        JsValue::Boolean(_) => "boolean",
        JsValue::Number(_) => "number",
        JsValue::String(_) => "string",
        JsValue::BigInt(_) => "bigint",
        JsValue::Object(o) if o.is_callable() => "function",
        JsValue::Object(_) => "object",
    }
}

pub(crate) fn is_callable(val: &JsValue) -> bool {
    val.as_object().is_some_and(JsObject::is_callable)
}

pub(crate) fn property_key_of_number(n: f64) -> String {
    number_ops::to_string(n)
}

pub(crate) fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or(JsValue::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn s(text: &str) -> JsValue {
        JsValue::from(text)
    }

    #[test]
    fn string_to_number_accepts_javascript_forms() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1f"), 31.0);
        assert_eq!(string_to_number("0b101"), 5.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("0x").is_nan());
    }

    #[test]
    fn loose_equality_coerces_primitives() {
        assert!(primitive_loose_equality(&JsValue::Number(1.0), &s("1")));
        assert!(primitive_loose_equality(&JsValue::Boolean(true), &JsValue::Number(1.0)));
        assert!(primitive_loose_equality(&JsValue::Null, &JsValue::Undefined));
        assert!(!primitive_loose_equality(&JsValue::Null, &JsValue::Number(0.0)));
        assert!(primitive_loose_equality(
            &JsValue::bigint(num_bigint::BigInt::from(2)),
            &JsValue::Number(2.0)
        ));
        assert!(!primitive_loose_equality(&JsValue::Number(f64::NAN), &JsValue::Number(f64::NAN)));
    }

    #[test]
    fn strict_equality_distinguishes_types() {
        assert!(!strict_equality(&JsValue::Number(1.0), &s("1")));
        assert!(strict_equality(&JsValue::Number(0.0), &JsValue::Number(-0.0)));
        assert!(!same_value(&JsValue::Number(0.0), &JsValue::Number(-0.0)));
        assert!(same_value_zero(&JsValue::Number(f64::NAN), &JsValue::Number(f64::NAN)));
    }

    #[test]
    fn relational_comparison() {
        assert_eq!(primitive_less_than(&s("a"), &s("b")), Some(true));
        assert_eq!(primitive_less_than(&s("10"), &s("9")), Some(true));
        assert_eq!(primitive_less_than(&JsValue::Number(10.0), &s("9")), Some(false));
        assert_eq!(primitive_less_than(&JsValue::Undefined, &JsValue::Number(1.0)), None);
    }

    #[test]
    fn relative_index_clamps() {
        assert_eq!(relative_index(Some(&JsValue::Number(-2.0)), 5, 0), 3);
        assert_eq!(relative_index(Some(&JsValue::Number(-9.0)), 5, 0), 0);
        assert_eq!(relative_index(Some(&JsValue::Number(9.0)), 5, 0), 5);
        assert_eq!(relative_index(None, 5, 5), 5);
    }

    #[test]
    fn typeof_primitives() {
        assert_eq!(typeof_val(&JsValue::Null), "object");
        assert_eq!(typeof_val(&s("x")), "string");
        assert_eq!(typeof_val(&JsValue::Undefined), "undefined");
    }
}
