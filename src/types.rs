use crate::interpreter::JsObject;
use std::fmt;

#[derive(Clone, Debug)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    BigInt(JsBigInt),
    Object(JsObject),
}

// strings are sequences of UTF-16 code units, so lengths and indices match JavaScript
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString {
    pub code_units: Vec<u16>,
}

impl JsString {
    pub fn from_str(s: &str) -> Self {
        Self {
            code_units: s.encode_utf16().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code_units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.code_units.len()
    }

    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(&self.code_units)
    }

    pub fn concat(&self, other: &JsString) -> JsString {
        let mut code_units = Vec::with_capacity(self.len() + other.len());
        code_units.extend_from_slice(&self.code_units);
        code_units.extend_from_slice(&other.code_units);
        JsString { code_units }
    }

    pub fn index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let s_len = self.code_units.len();
        let search_len = search.code_units.len();
        if search_len == 0 {
            return if from <= s_len { Some(from) } else { None };
        }
        if from + search_len > s_len {
            return None;
        }
        (from..=(s_len - search_len))
            .find(|&i| self.code_units[i..i + search_len] == search.code_units[..])
    }

    pub fn slice_utf16(&self, start: usize, end: usize) -> JsString {
        let s = start.min(self.code_units.len());
        let e = end.min(self.code_units.len());
        if s >= e {
            return JsString::default();
        }
        JsString {
            code_units: self.code_units[s..e].to_vec(),
        }
    }

    pub fn starts_with(&self, prefix: &JsString) -> bool {
        self.code_units.starts_with(&prefix.code_units)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct JsBigInt {
    pub value: num_bigint::BigInt,
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JsValue::String(_))
    }

    pub fn is_bigint(&self) -> bool {
        matches!(self, JsValue::BigInt(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            JsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn bigint(value: num_bigint::BigInt) -> Self {
        JsValue::BigInt(JsBigInt { value })
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from_str(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from_str(&s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<JsObject> for JsValue {
    fn from(o: JsObject) -> Self {
        JsValue::Object(o)
    }
}

pub mod number_ops {
    pub fn unary_minus(x: f64) -> f64 {
        if x.is_nan() { f64::NAN } else { -x }
    }

    pub fn bitwise_not(x: f64) -> f64 {
        f64::from(!to_int32(x))
    }

    pub fn exponentiate(base: f64, exp: f64) -> f64 {
        // powf says 1 ** NaN and 1 ** Infinity are 1; JavaScript says NaN
        if exp.is_nan() || (base.abs() == 1.0 && exp.is_infinite()) {
            return f64::NAN;
        }
        base.powf(exp)
    }

    pub fn remainder(x: f64, y: f64) -> f64 {
        // IEEE 754 truncating remainder; the sign follows the dividend
        x % y
    }

    pub fn left_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_int32(x).wrapping_shl(shift))
    }

    pub fn signed_right_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_int32(x).wrapping_shr(shift))
    }

    pub fn unsigned_right_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_uint32(x).wrapping_shr(shift))
    }

    pub fn less_than(x: f64, y: f64) -> Option<bool> {
        if x.is_nan() || y.is_nan() {
            None
        } else {
            Some(x < y)
        }
    }

    pub fn equal(x: f64, y: f64) -> bool {
        x == y
    }

    pub fn same_value_zero(x: f64, y: f64) -> bool {
        (x.is_nan() && y.is_nan()) || x == y
    }

    pub fn bitwise_and(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) & to_int32(y))
    }

    pub fn bitwise_xor(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) ^ to_int32(y))
    }

    pub fn bitwise_or(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) | to_int32(y))
    }

    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let mut buf = ryu_js::Buffer::new();
        buf.format(x).to_string()
    }

    /// `Number.prototype.toString(radix)`.
    pub fn to_string_radix(x: f64, radix: u32) -> String {
        if radix == 10 || !x.is_finite() {
            return to_string(x);
        }
        let negative = x < 0.0;
        let x = x.abs();
        let mut int_part = x.trunc();
        let mut frac = x - int_part;

        let mut digits = Vec::new();
        if int_part == 0.0 {
            digits.push('0');
        }
        while int_part >= 1.0 {
            let d = (int_part % radix as f64) as u32;
            digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
            int_part = (int_part / radix as f64).trunc();
        }
        if negative {
            digits.push('-');
        }
        let mut out: String = digits.into_iter().rev().collect();

        if frac > 0.0 {
            out.push('.');
            // 52 bits of mantissa never need more digits than this in base 2
            for _ in 0..52 {
                frac *= radix as f64;
                let d = frac.trunc() as u32;
                out.push(std::char::from_digit(d, radix).unwrap_or('0'));
                frac -= d as f64;
                if frac <= 0.0 {
                    break;
                }
            }
        }
        out
    }

    pub fn to_int32(x: f64) -> i32 {
        to_uint32(x) as i32
    }

    pub fn to_uint32(x: f64) -> u32 {
        if !x.is_finite() {
            return 0;
        }
        x.trunc().rem_euclid(4294967296.0) as u32
    }
}

pub mod bigint_ops {
    use num_bigint::{BigInt, Sign};

    pub fn bitwise_not(x: &BigInt) -> BigInt {
        // ~x = -(x + 1) at arbitrary precision
        -(x + BigInt::from(1))
    }

    pub fn exponentiate(base: &BigInt, exp: &BigInt) -> Result<BigInt, &'static str> {
        if exp.sign() == Sign::Minus {
            return Err("Exponent must be non-negative");
        }
        let exp: u32 = exp.try_into().map_err(|_| "Maximum BigInt size exceeded")?;
        Ok(base.pow(exp))
    }

    pub fn divide(x: &BigInt, y: &BigInt) -> Result<BigInt, &'static str> {
        if y.sign() == Sign::NoSign {
            return Err("Division by zero");
        }
        Ok(x / y)
    }

    pub fn remainder(x: &BigInt, y: &BigInt) -> Result<BigInt, &'static str> {
        if y.sign() == Sign::NoSign {
            return Err("Division by zero");
        }
        Ok(x % y)
    }

    pub fn left_shift(x: &BigInt, y: &BigInt) -> BigInt {
        let shift: i64 = y.try_into().unwrap_or(0);
        if shift >= 0 {
            x << (shift as u64)
        } else {
            x >> (shift.unsigned_abs())
        }
    }

    pub fn signed_right_shift(x: &BigInt, y: &BigInt) -> BigInt {
        let shift: i64 = y.try_into().unwrap_or(0);
        if shift >= 0 {
            x >> (shift as u64)
        } else {
            x << (shift.unsigned_abs())
        }
    }

    pub fn to_f64(x: &BigInt) -> f64 {
        x.to_string().parse::<f64>().unwrap_or(f64::NAN)
    }

    /// Integral finite numbers only.
    pub fn from_f64(n: f64) -> Option<BigInt> {
        if !n.is_finite() || n.fract() != 0.0 {
            return None;
        }
        format!("{n:.0}").parse().ok()
    }

    /// Literal text or `BigInt("...")` argument: decimal, or `0x`/`0o`/`0b`
    /// prefixed. Surrounding whitespace is ignored; empty text is zero.
    pub fn parse(text: &str) -> Option<BigInt> {
        let text = text.trim();
        if text.is_empty() {
            return Some(BigInt::from(0));
        }
        let (digits, radix) = match text.get(..2) {
            Some("0x" | "0X") => (&text[2..], 16),
            Some("0o" | "0O") => (&text[2..], 8),
            Some("0b" | "0B") => (&text[2..], 2),
            _ => (text, 10),
        };
        if digits.is_empty() || (radix != 10 && digits.starts_with(['+', '-'])) {
            return None;
        }
        BigInt::parse_bytes(digits.as_bytes(), radix)
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_ops::to_string(*n)),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::BigInt(b) => write!(f, "{}", b.value),
            JsValue::Object(o) => write!(f, "{o:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use pretty_assertions::assert_eq;

    #[test]
    fn js_string_index_of() {
        let s = JsString::from_str("hello world");
        let search = JsString::from_str("world");
        assert_eq!(s.index_of(&search, 0), Some(6));
        assert_eq!(s.index_of(&search, 7), None);
        assert_eq!(s.index_of(&JsString::default(), 5), Some(5));
    }

    #[test]
    fn js_string_counts_utf16_units() {
        let s = JsString::from_str("a😀");
        assert_eq!(s.len(), 3);
        assert_eq!(s.slice_utf16(1, 3).to_rust_string(), "😀");
    }

    #[test]
    fn number_special_values() {
        assert_eq!(number_ops::to_string(f64::NAN), "NaN");
        assert_eq!(number_ops::to_string(-0.0), "0");
        assert_eq!(number_ops::to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_ops::to_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_ops::to_string(1e21), "1e+21");
        assert_eq!(number_ops::to_string(123.0), "123");
    }

    #[test]
    fn exponentiate_follows_javascript() {
        assert!(number_ops::exponentiate(1.0, f64::NAN).is_nan());
        assert!(number_ops::exponentiate(-1.0, f64::INFINITY).is_nan());
        assert_eq!(number_ops::exponentiate(f64::NAN, 0.0), 1.0);
        assert_eq!(number_ops::exponentiate(2.0, 10.0), 1024.0);
    }

    #[test]
    fn int32_conversions_wrap() {
        assert_eq!(number_ops::to_int32(f64::NAN), 0);
        assert_eq!(number_ops::to_int32(-42.9), -42);
        assert_eq!(number_ops::to_int32(4294967296.0 + 5.0), 5);
        assert_eq!(number_ops::to_int32(2147483648.0), -2147483648);
        assert_eq!(number_ops::to_uint32(-1.0), 4294967295);
        assert_eq!(number_ops::to_int32(1e20), 1661992960);
    }

    #[test]
    fn shift_ops() {
        assert_eq!(number_ops::left_shift(1.0, 4.0), 16.0);
        assert_eq!(number_ops::left_shift(1.0, 33.0), 2.0);
        assert_eq!(number_ops::signed_right_shift(-16.0, 2.0), -4.0);
        assert_eq!(number_ops::unsigned_right_shift(-1.0, 0.0), 4294967295.0);
    }

    #[test]
    fn radix_strings() {
        assert_eq!(number_ops::to_string_radix(255.0, 16), "ff");
        assert_eq!(number_ops::to_string_radix(-5.0, 2), "-101");
        assert_eq!(number_ops::to_string_radix(0.5, 2), "0.1");
        assert_eq!(number_ops::to_string_radix(0.0, 36), "0");
    }

    #[test]
    fn bigint_ops_report_errors() {
        assert!(bigint_ops::divide(&BigInt::from(1), &BigInt::from(0)).is_err());
        assert!(bigint_ops::exponentiate(&BigInt::from(2), &BigInt::from(-1)).is_err());
        assert_eq!(bigint_ops::bitwise_not(&BigInt::from(0)), BigInt::from(-1));
        assert_eq!(bigint_ops::bitwise_not(&BigInt::from(-8)), BigInt::from(7));
        assert_eq!(
            bigint_ops::signed_right_shift(&BigInt::from(1), &BigInt::from(-4)),
            BigInt::from(16)
        );
    }

    #[test]
    fn bigint_parsing_and_conversion() {
        assert_eq!(bigint_ops::parse("0xff"), Some(BigInt::from(255)));
        assert_eq!(bigint_ops::parse("  -12 "), Some(BigInt::from(-12)));
        assert_eq!(bigint_ops::parse(""), Some(BigInt::from(0)));
        assert_eq!(bigint_ops::parse("1.5"), None);
        assert_eq!(bigint_ops::from_f64(1e21), bigint_ops::parse("1000000000000000000000"));
        assert_eq!(bigint_ops::from_f64(0.5), None);
        assert_eq!(bigint_ops::to_f64(&BigInt::from(42)), 42.0);
    }

    #[test]
    fn display_primitives() {
        assert_eq!(JsValue::Undefined.to_string(), "undefined");
        assert_eq!(JsValue::from(42.0).to_string(), "42");
        assert_eq!(JsValue::from("hi").to_string(), "hi");
        assert_eq!(JsValue::bigint(BigInt::from(7)).to_string(), "7");
    }
}
