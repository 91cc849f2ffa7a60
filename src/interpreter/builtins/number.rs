use super::super::*;
use num_bigint::BigInt;

fn this_number_value(interp: &mut Interpreter, this: &JsValue, method: &str) -> EvalResult<f64> {
    match this {
        JsValue::Number(n) => Ok(*n),
        _ => Err(interp.type_error(format!("Number.prototype.{method} requires that 'this' be a Number"))),
    }
}

fn radix_arg(interp: &mut Interpreter, args: &[JsValue]) -> EvalResult<u32> {
    let radix = match arg(args, 0) {
        JsValue::Undefined => return Ok(10),
        v => to_integer_or_infinity(interp.to_number(&v)?),
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(interp.range_error("toString() radix must be between 2 and 36"));
    }
    Ok(radix as u32)
}

/// `Number.prototype.toFixed`; exact ties round away from zero.
fn format_fixed(n: f64, digits: usize) -> String {
    if n.abs() >= 1e21 {
        return number_ops::to_string(n);
    }
    let sign = if n < 0.0 { "-" } else { "" };
    let magnitude = n.abs();
    let scaled = magnitude * 10f64.powi(digits as i32);
    if scaled.fract() != 0.5 || scaled >= 9007199254740992.0 {
        return format!("{sign}{magnitude:.digits$}");
    }
    let rounded = format!("{:.0}", scaled.trunc() + 1.0);
    if digits == 0 {
        return format!("{sign}{rounded}");
    }
    let padded = format!("{rounded:0>width$}", width = digits + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - digits);
    format!("{sign}{int_part}.{frac_part}")
}

/// Half-way cases round towards +Infinity.
fn js_round(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    if (-0.5..0.0).contains(&x) {
        return -0.0;
    }
    let floor = x.floor();
    if x - floor >= 0.5 { floor + 1.0 } else { floor }
}

fn parse_int(input: &str, radix: i32) -> f64 {
    let s = input.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}');
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let has_hex_prefix = s.starts_with("0x") || s.starts_with("0X");
    let (radix, s) = match radix {
        0 if has_hex_prefix => (16, &s[2..]),
        0 => (10, s),
        16 if has_hex_prefix => (16, &s[2..]),
        r if (2..=36).contains(&r) => (r as u32, s),
        _ => return f64::NAN,
    };
    let end = s.find(|c: char| !c.is_digit(radix)).unwrap_or(s.len());
    match parse_digits(&s[..end], radix) {
        Some(n) if negative => -n,
        Some(n) => n,
        None => f64::NAN,
    }
}

/// Longest prefix of `input` that reads as a decimal literal.
fn parse_float(input: &str) -> f64 {
    let s = input.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}');
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    if s[i..].starts_with("Infinity") {
        return if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i == digits_start || &s[digits_start..i] == "." {
        return f64::NAN;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_digits = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_digits {
            i = j;
        }
    }
    s[..i].parse::<f64>().unwrap_or(f64::NAN)
}

impl Interpreter {
    pub(crate) fn setup_number(&mut self) {
        let proto = self.number_prototype.clone();
        let ctor = self.install_constructor(
            JsFunction::native("Number", 1, |interp, _this, args| {
                let Some(value) = args.first() else {
                    return Ok(JsValue::Number(0.0));
                };
                Ok(JsValue::Number(match interp.to_numeric(value)? {
                    JsValue::BigInt(b) => bigint_ops::to_f64(&b.value),
                    n => to_number(&n),
                }))
            }),
            "Number",
            1,
            &proto,
        );
        let constants = [
            ("MAX_SAFE_INTEGER", 9007199254740991.0),
            ("MIN_SAFE_INTEGER", -9007199254740991.0),
            ("EPSILON", f64::EPSILON),
            ("MAX_VALUE", f64::MAX),
            ("MIN_VALUE", 5e-324),
            ("POSITIVE_INFINITY", f64::INFINITY),
            ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
            ("NaN", f64::NAN),
        ];
        for (name, value) in constants {
            ctor.borrow_mut().insert_property(
                name.to_string(),
                PropertyDescriptor::data(JsValue::Number(value), false, false),
            );
        }
        self.add_method(&ctor, "isInteger", 1, |_interp, _this, args| {
            Ok(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_finite() && n.trunc() == n)))
        });
        self.add_method(&ctor, "isNaN", 1, |_interp, _this, args| {
            Ok(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_nan())))
        });
        self.add_method(&ctor, "isFinite", 1, |_interp, _this, args| {
            Ok(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_finite())))
        });

        self.add_method(&proto, "toString", 1, |interp, this, args| {
            let n = this_number_value(interp, this, "toString")?;
            let radix = radix_arg(interp, args)?;
            Ok(JsValue::from(number_ops::to_string_radix(n, radix)))
        });
        self.add_method(&proto, "toFixed", 1, |interp, this, args| {
            let n = this_number_value(interp, this, "toFixed")?;
            let digits = to_integer_or_infinity(interp.to_number(&arg(args, 0))?);
            if !(0.0..=100.0).contains(&digits) {
                return Err(interp.range_error("toFixed() digits argument must be between 0 and 100"));
            }
            if !n.is_finite() {
                return Ok(JsValue::from(number_ops::to_string(n)));
            }
            Ok(JsValue::from(format_fixed(n, digits as usize)))
        });
        self.add_method(&proto, "valueOf", 0, |interp, this, _args| {
            Ok(JsValue::Number(this_number_value(interp, this, "valueOf")?))
        });
    }

    pub(crate) fn setup_boolean(&mut self) {
        let proto = self.boolean_prototype.clone();
        self.install_constructor(
            JsFunction::native("Boolean", 1, |_interp, _this, args| {
                Ok(JsValue::Boolean(to_boolean(&arg(args, 0))))
            }),
            "Boolean",
            1,
            &proto,
        );
        for name in ["toString", "valueOf"] {
            self.add_method(&proto, name, 0, move |interp, this, _args| match this {
                JsValue::Boolean(b) if name == "toString" => Ok(JsValue::from(b.to_string())),
                JsValue::Boolean(_) => Ok(this.clone()),
                _ => Err(interp.type_error(format!("Boolean.prototype.{name} requires that 'this' be a Boolean"))),
            });
        }
    }

    pub(crate) fn setup_bigint(&mut self) {
        let proto = self.bigint_prototype.clone();
        self.install_constructor(
            JsFunction::native("BigInt", 1, |interp, _this, args| {
                let value = interp.to_primitive(&arg(args, 0), PreferredType::Number)?;
                interp.to_bigint(&value)
            }),
            "BigInt",
            1,
            &proto,
        );
        self.add_method(&proto, "toString", 0, |interp, this, args| {
            let JsValue::BigInt(b) = this else {
                return Err(interp.type_error("BigInt.prototype.toString requires that 'this' be a BigInt"));
            };
            let radix = radix_arg(interp, args)?;
            Ok(JsValue::from(b.value.to_str_radix(radix)))
        });
        self.add_method(&proto, "valueOf", 0, |interp, this, _args| match this {
            JsValue::BigInt(_) => Ok(this.clone()),
            _ => Err(interp.type_error("BigInt.prototype.valueOf requires that 'this' be a BigInt")),
        });
    }

    /// `BigInt(value)` on a primitive.
    fn to_bigint(&mut self, value: &JsValue) -> EvalResult {
        match value {
            JsValue::BigInt(_) => Ok(value.clone()),
            JsValue::Boolean(b) => Ok(JsValue::bigint(BigInt::from(*b as u8))),
            JsValue::Number(n) => match bigint_ops::from_f64(*n) {
                Some(b) => Ok(JsValue::bigint(b)),
                None => Err(self.range_error(format!(
                    "The number {} cannot be converted to a BigInt because it is not an integer",
                    number_ops::to_string(*n)
                ))),
            },
            JsValue::String(s) => {
                let text = s.to_rust_string();
                match bigint_ops::parse(text.trim()) {
                    Some(b) => Ok(JsValue::bigint(b)),
                    None => Err(self.syntax_error(format!("Cannot convert {text} to a BigInt"))),
                }
            }
            other => Err(self.type_error(format!("Cannot convert {other} to a BigInt"))),
        }
    }

    pub(crate) fn setup_math(&mut self) {
        let math = self.create_object();
        let constants = [
            ("PI", std::f64::consts::PI),
            ("E", std::f64::consts::E),
            ("LN2", std::f64::consts::LN_2),
            ("LN10", std::f64::consts::LN_10),
            ("LOG2E", std::f64::consts::LOG2_E),
            ("LOG10E", std::f64::consts::LOG10_E),
            ("SQRT2", std::f64::consts::SQRT_2),
            ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
        ];
        for (name, value) in constants {
            math.borrow_mut().insert_property(
                name.to_string(),
                PropertyDescriptor::data(JsValue::Number(value), false, false),
            );
        }

        let unary: [(&str, fn(f64) -> f64); 8] = [
            ("abs", f64::abs),
            ("floor", f64::floor),
            ("ceil", f64::ceil),
            ("round", js_round),
            ("trunc", f64::trunc),
            ("sign", |x| if x.is_nan() || x == 0.0 { x } else { x.signum() }),
            ("sqrt", f64::sqrt),
            ("cbrt", f64::cbrt),
        ];
        for (name, op) in unary {
            self.add_method(&math, name, 1, move |interp, _this, args| {
                Ok(JsValue::Number(op(interp.to_number(&arg(args, 0))?)))
            });
        }
        self.add_method(&math, "pow", 2, |interp, _this, args| {
            let base = interp.to_number(&arg(args, 0))?;
            let exponent = interp.to_number(&arg(args, 1))?;
            Ok(JsValue::Number(number_ops::exponentiate(base, exponent)))
        });
        self.add_method(&math, "max", 2, |interp, _this, args| {
            let mut result = f64::NEG_INFINITY;
            for value in args {
                let n = interp.to_number(value)?;
                if n.is_nan() || result.is_nan() {
                    result = f64::NAN;
                } else if n > result || (n == 0.0 && result == 0.0 && result.is_sign_negative()) {
                    result = n;
                }
            }
            Ok(JsValue::Number(result))
        });
        self.add_method(&math, "min", 2, |interp, _this, args| {
            let mut result = f64::INFINITY;
            for value in args {
                let n = interp.to_number(value)?;
                if n.is_nan() || result.is_nan() {
                    result = f64::NAN;
                } else if n < result || (n == 0.0 && result == 0.0 && n.is_sign_negative()) {
                    result = n;
                }
            }
            Ok(JsValue::Number(result))
        });
        self.add_global("Math", JsValue::Object(math));
    }

    pub(crate) fn setup_global_functions(&mut self) {
        let parse_int = self.native_function("parseInt", 2, |interp, _this, args| {
            let input = interp.to_rust_string(&arg(args, 0))?;
            let radix = number_ops::to_int32(interp.to_number(&arg(args, 1))?);
            Ok(JsValue::Number(parse_int(&input, radix)))
        });
        self.add_global("parseInt", parse_int);
        let parse_float = self.native_function("parseFloat", 1, |interp, _this, args| {
            let input = interp.to_rust_string(&arg(args, 0))?;
            Ok(JsValue::Number(parse_float(&input)))
        });
        self.add_global("parseFloat", parse_float);
        let is_nan = self.native_function("isNaN", 1, |interp, _this, args| {
            Ok(JsValue::Boolean(interp.to_number(&arg(args, 0))?.is_nan()))
        });
        self.add_global("isNaN", is_nan);
        let is_finite = self.native_function("isFinite", 1, |interp, _this, args| {
            Ok(JsValue::Boolean(interp.to_number(&arg(args, 0))?.is_finite()))
        });
        self.add_global("isFinite", is_finite);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eval(source: &str) -> String {
        let mut interp = Interpreter::new();
        match interp.eval_source(source) {
            Ok(v) => inspect(&v),
            Err(e) => format!("error: {e}"),
        }
    }

    #[test]
    fn fixed_formatting() {
        assert_eq!(format_fixed(1.005, 2), "1.00");
        assert_eq!(format_fixed(2.5, 0), "3");
        assert_eq!(format_fixed(0.125, 2), "0.13");
        assert_eq!(format_fixed(-1.5, 1), "-1.5");
        assert_eq!(format_fixed(1e21, 2), "1e+21");
        assert_eq!(eval("(3.14159).toFixed(2)"), "\"3.14\"");
        assert_eq!(eval("try { (1).toFixed(101) } catch (e) { e instanceof RangeError }"), "true");
    }

    #[test]
    fn rounding_matches_javascript() {
        assert_eq!(js_round(2.5), 3.0);
        assert_eq!(js_round(-2.5), -2.0);
        assert_eq!(js_round(0.49999999999999994), 0.0);
        assert!(js_round(-0.2).is_sign_negative());
        assert_eq!(eval("[Math.round(1.4), Math.round(-1.6), Math.trunc(-4.7), Math.sign(-3)]"), "[ 1, -2, -4, -1 ]");
    }

    #[test]
    fn parsing() {
        assert_eq!(parse_int("  42px", 0), 42.0);
        assert_eq!(parse_int("-0x1f", 0), -31.0);
        assert_eq!(parse_int("ff", 16), 255.0);
        assert!(parse_int("12", 1).is_nan());
        assert!(parse_int("z", 10).is_nan());
        assert_eq!(parse_float("3.5e2abc"), 350.0);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("-Infinityx"), f64::NEG_INFINITY);
        assert!(parse_float("e5").is_nan());
        assert_eq!(parse_float("1e"), 1.0);
    }

    #[test]
    fn number_statics_and_conversion() {
        assert_eq!(eval("[Number('12'), Number(''), Number('1x'), Number(5n), Number()]"), "[ 12, 0, NaN, 5, 0 ]");
        assert_eq!(eval("[Number.isInteger(5), Number.isInteger('5'), Number.isNaN('x'), isNaN('x')]"), "[ true, false, false, true ]");
        assert_eq!(eval("(255).toString(16)"), "\"ff\"");
        assert_eq!(eval("try { (1).toString(1) } catch (e) { e instanceof RangeError }"), "true");
        assert_eq!(eval("Number.MAX_SAFE_INTEGER"), "9007199254740991");
    }

    #[test]
    fn bigint_conversion() {
        assert_eq!(eval("[BigInt(10), BigInt('0x10'), BigInt(true)]"), "[ 10n, 16n, 1n ]");
        assert_eq!(eval("try { BigInt(1.5) } catch (e) { e instanceof RangeError }"), "true");
        assert_eq!(eval("try { BigInt('x') } catch (e) { e instanceof SyntaxError }"), "true");
        assert_eq!(eval("try { new BigInt(1) } catch (e) { e.message }"), "\"BigInt is not a constructor\"");
        assert_eq!(eval("(255n).toString(16)"), "\"ff\"");
        assert_eq!(eval("typeof BigInt(1)"), "\"bigint\"");
    }

    #[test]
    fn math_functions() {
        assert_eq!(eval("[Math.max(), Math.min(), Math.max(1, NaN), Math.pow(2, 10)]"), "[ -Infinity, Infinity, NaN, 1024 ]");
        assert_eq!(eval("[Math.abs(-2), Math.floor(1.7), Math.ceil(1.2), Math.sqrt(9)]"), "[ 2, 1, 2, 3 ]");
        assert_eq!(eval("Math.PI > 3.14"), "true");
    }

    #[test]
    fn booleans() {
        assert_eq!(eval("[Boolean(''), Boolean('x'), true.toString(), (false).valueOf()]"), "[ false, true, \"true\", false ]");
    }
}
