use super::super::*;

fn is_ecma_whitespace(unit: u16) -> bool {
    matches!(
        unit,
        0x0009..=0x000D
            | 0x0020
            | 0x00A0
            | 0x1680
            | 0x2000..=0x200A
            | 0x2028
            | 0x2029
            | 0x202F
            | 0x205F
            | 0x3000
            | 0xFEFF
    )
}

type StringMethod = fn(&mut Interpreter, &JsString, &[JsValue]) -> EvalResult;

/// Longest string, in UTF-16 code units, that `repeat` and padding may build.
const MAX_STRING_LENGTH: f64 = ((1 << 29) - 24) as f64;

/// The string a `String.prototype` method operates on.
fn this_string(interp: &mut Interpreter, this: &JsValue, method: &str) -> EvalResult<JsString> {
    match this {
        JsValue::String(s) => Ok(s.clone()),
        JsValue::Undefined | JsValue::Null => Err(interp.type_error(format!(
            "String.prototype.{method} called on null or undefined"
        ))),
        other => interp.to_string(other),
    }
}

fn string_arg(interp: &mut Interpreter, args: &[JsValue], index: usize) -> EvalResult<JsString> {
    interp.to_string(&arg(args, index))
}

/// Integer argument, `default` when absent or undefined.
fn integer_arg(interp: &mut Interpreter, args: &[JsValue], index: usize, default: f64) -> EvalResult<f64> {
    match args.get(index) {
        None | Some(JsValue::Undefined) => Ok(default),
        Some(v) => Ok(to_integer_or_infinity(interp.to_number(v)?)),
    }
}

fn trim_units(s: &JsString, start: bool, end: bool) -> JsString {
    let units = &s.code_units;
    let mut from = 0;
    let mut to = units.len();
    if start {
        while from < to && is_ecma_whitespace(units[from]) {
            from += 1;
        }
    }
    if end {
        while to > from && is_ecma_whitespace(units[to - 1]) {
            to -= 1;
        }
    }
    s.slice_utf16(from, to)
}

fn pad(interp: &mut Interpreter, s: &JsString, args: &[JsValue], at_start: bool) -> EvalResult {
    let target = integer_arg(interp, args, 0, 0.0)?;
    let filler = match arg(args, 1) {
        JsValue::Undefined => JsString::from_str(" "),
        v => interp.to_string(&v)?,
    };
    if target <= s.len() as f64 || filler.is_empty() {
        return Ok(JsValue::String(s.clone()));
    }
    if target > MAX_STRING_LENGTH {
        return Err(interp.range_error("Invalid string length"));
    }
    let fill_len = target as usize - s.len();
    let fill: Vec<u16> = filler.code_units.iter().copied().cycle().take(fill_len).collect();
    let fill = JsString { code_units: fill };
    Ok(JsValue::String(if at_start { fill.concat(s) } else { s.concat(&fill) }))
}

fn split(interp: &mut Interpreter, s: &JsString, args: &[JsValue]) -> EvalResult {
    let limit = match arg(args, 1) {
        JsValue::Undefined => u32::MAX as usize,
        v => number_ops::to_uint32(interp.to_number(&v)?) as usize,
    };
    let separator = arg(args, 0);
    let mut parts: Vec<JsValue> = Vec::new();
    if separator.is_undefined() {
        parts.push(JsValue::String(s.clone()));
    } else {
        let sep = interp.to_string(&separator)?;
        if sep.is_empty() {
            parts.extend((0..s.len()).map(|i| JsValue::String(s.slice_utf16(i, i + 1))));
        } else {
            let mut start = 0;
            while let Some(found) = s.index_of(&sep, start) {
                parts.push(JsValue::String(s.slice_utf16(start, found)));
                start = found + sep.len();
            }
            parts.push(JsValue::String(s.slice_utf16(start, s.len())));
        }
    }
    parts.truncate(limit);
    Ok(interp.create_array(parts))
}

const METHODS: &[(&str, usize, StringMethod)] = &[
    ("charAt", 1, |interp, s, args| {
        let index = integer_arg(interp, args, 0, 0.0)?;
        if index < 0.0 || index >= s.len() as f64 {
            return Ok(JsValue::from(""));
        }
        let i = index as usize;
        Ok(JsValue::String(s.slice_utf16(i, i + 1)))
    }),
    ("charCodeAt", 1, |interp, s, args| {
        let index = integer_arg(interp, args, 0, 0.0)?;
        if index < 0.0 {
            return Ok(JsValue::Number(f64::NAN));
        }
        let unit = s.code_units.get(index as usize);
        Ok(JsValue::Number(unit.map_or(f64::NAN, |u| *u as f64)))
    }),
    ("indexOf", 1, |interp, s, args| {
        let search = string_arg(interp, args, 0)?;
        let from = integer_arg(interp, args, 1, 0.0)?.clamp(0.0, s.len() as f64) as usize;
        Ok(JsValue::Number(s.index_of(&search, from).map_or(-1.0, |i| i as f64)))
    }),
    ("lastIndexOf", 1, |interp, s, args| {
        let search = string_arg(interp, args, 0)?;
        let max_start = s.len().saturating_sub(search.len());
        let from = match arg(args, 1) {
            JsValue::Undefined => max_start,
            v => {
                let n = interp.to_number(&v)?;
                if n.is_nan() { max_start } else { to_integer_or_infinity(n).clamp(0.0, max_start as f64) as usize }
            }
        };
        if search.len() > s.len() {
            return Ok(JsValue::Number(-1.0));
        }
        let found = (0..=from).rev().find(|&i| s.code_units[i..i + search.len()] == search.code_units[..]);
        Ok(JsValue::Number(found.map_or(-1.0, |i| i as f64)))
    }),
    ("includes", 1, |interp, s, args| {
        let search = string_arg(interp, args, 0)?;
        let from = integer_arg(interp, args, 1, 0.0)?.clamp(0.0, s.len() as f64) as usize;
        Ok(JsValue::Boolean(s.index_of(&search, from).is_some()))
    }),
    ("startsWith", 1, |interp, s, args| {
        let search = string_arg(interp, args, 0)?;
        let from = integer_arg(interp, args, 1, 0.0)?.clamp(0.0, s.len() as f64) as usize;
        Ok(JsValue::Boolean(s.slice_utf16(from, s.len()).starts_with(&search)))
    }),
    ("endsWith", 1, |interp, s, args| {
        let search = string_arg(interp, args, 0)?;
        let end = integer_arg(interp, args, 1, s.len() as f64)?.clamp(0.0, s.len() as f64) as usize;
        Ok(JsValue::Boolean(s.code_units[..end].ends_with(&search.code_units)))
    }),
    ("slice", 2, |_interp, s, args| {
        let start = relative_index(args.first(), s.len(), 0);
        let end = relative_index(args.get(1), s.len(), s.len());
        Ok(JsValue::String(s.slice_utf16(start, end)))
    }),
    ("substring", 2, |interp, s, args| {
        let len = s.len() as f64;
        let start = integer_arg(interp, args, 0, 0.0)?.clamp(0.0, len) as usize;
        let end = integer_arg(interp, args, 1, len)?.clamp(0.0, len) as usize;
        Ok(JsValue::String(s.slice_utf16(start.min(end), start.max(end))))
    }),
    ("toUpperCase", 0, |_interp, s, _args| Ok(JsValue::from(s.to_rust_string().to_uppercase()))),
    ("toLowerCase", 0, |_interp, s, _args| Ok(JsValue::from(s.to_rust_string().to_lowercase()))),
    ("trim", 0, |_interp, s, _args| Ok(JsValue::String(trim_units(s, true, true)))),
    ("trimStart", 0, |_interp, s, _args| Ok(JsValue::String(trim_units(s, true, false)))),
    ("trimEnd", 0, |_interp, s, _args| Ok(JsValue::String(trim_units(s, false, true)))),
    ("split", 2, split),
    ("repeat", 1, |interp, s, args| {
        let count = integer_arg(interp, args, 0, 0.0)?;
        if count < 0.0 || count.is_infinite() {
            return Err(interp.range_error(format!("Invalid count value: {}", number_ops::to_string(count))));
        }
        if s.is_empty() || count == 0.0 {
            return Ok(JsValue::from(""));
        }
        if s.len() as f64 * count > MAX_STRING_LENGTH {
            return Err(interp.range_error("Invalid string length"));
        }
        let code_units = s.code_units.repeat(count as usize);
        Ok(JsValue::String(JsString { code_units }))
    }),
    ("padStart", 2, |interp, s, args| pad(interp, s, args, true)),
    ("padEnd", 2, |interp, s, args| pad(interp, s, args, false)),
    ("concat", 1, |interp, s, args| {
        let mut result = s.clone();
        for value in args {
            let next = interp.to_string(value)?;
            result = result.concat(&next);
        }
        Ok(JsValue::String(result))
    }),
];

impl Interpreter {
    pub(crate) fn setup_string(&mut self) {
        let proto = self.string_prototype.clone();
        // no wrapper objects, so `String` only converts
        let ctor = self.install_constructor(
            JsFunction::native("String", 1, |interp, _this, args| match args.first() {
                None => Ok(JsValue::from("")),
                Some(value) => Ok(JsValue::String(interp.to_string(value)?)),
            }),
            "String",
            1,
            &proto,
        );
        self.add_method(&ctor, "fromCharCode", 1, |interp, _this, args| {
            let mut code_units = Vec::with_capacity(args.len());
            for value in args {
                code_units.push(number_ops::to_uint32(interp.to_number(value)?) as u16);
            }
            Ok(JsValue::String(JsString { code_units }))
        });

        for &(name, arity, method) in METHODS {
            self.add_method(&proto, name, arity, move |interp, this, args| {
                let s = this_string(interp, this, name)?;
                method(interp, &s, args)
            });
        }
        for name in ["toString", "valueOf"] {
            self.add_method(&proto, name, 0, move |interp, this, _args| match this {
                JsValue::String(_) => Ok(this.clone()),
                _ => Err(interp.type_error(format!("String.prototype.{name} requires that 'this' be a String"))),
            });
        }
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
    fn conversion() {
        assert_eq!(eval("[String(1.5), String(null), String(10n), String()]"), "[ \"1.5\", \"null\", \"10\", \"\" ]");
        assert_eq!(eval("String.fromCharCode(104, 105)"), "\"hi\"");
        assert_eq!(eval("try { new String('x') } catch (e) { e.message }"), "\"String is not a constructor\"");
    }

    #[test]
    fn character_access() {
        assert_eq!(eval("['abc'.charAt(1), 'abc'.charAt(5), 'abc'.charCodeAt(0)]"), "[ \"b\", \"\", 97 ]");
        assert_eq!(eval("'😀'.length"), "2");
        assert_eq!(eval("'abc'[1]"), "\"b\"");
    }

    #[test]
    fn searching() {
        assert_eq!(eval("['hello'.indexOf('l'), 'hello'.lastIndexOf('l'), 'hello'.indexOf('z')]"), "[ 2, 3, -1 ]");
        assert_eq!(eval("['abc'.includes('bc'), 'abc'.startsWith('b', 1), 'abc'.endsWith('b', 2)]"), "[ true, true, true ]");
    }

    #[test]
    fn slicing() {
        assert_eq!(eval("['hello'.slice(1, -1), 'hello'.slice(-3), 'hello'.substring(4, 1)]"), "[ \"ell\", \"llo\", \"ell\" ]");
        assert_eq!(eval("'a,b,,c'.split(',')"), "[ \"a\", \"b\", \"\", \"c\" ]");
        assert_eq!(eval("'abc'.split('')"), "[ \"a\", \"b\", \"c\" ]");
        assert_eq!(eval("'a b c'.split(' ', 2)"), "[ \"a\", \"b\" ]");
        assert_eq!(eval("'abc'.split()"), "[ \"abc\" ]");
    }

    #[test]
    fn transforming() {
        assert_eq!(eval("['Ab'.toUpperCase(), 'Ab'.toLowerCase(), '  x \\n'.trim()]"), "[ \"AB\", \"ab\", \"x\" ]");
        assert_eq!(eval("['ab'.repeat(3), '5'.padStart(3, '0'), 'x'.padEnd(4, 'ab')]"), "[ \"ababab\", \"005\", \"xaba\" ]");
        assert_eq!(eval("try { 'x'.repeat(-1) } catch (e) { e instanceof RangeError }"), "true");
    }

    #[test]
    fn oversized_results_throw_range_errors() {
        let message = |body: &str| eval(&format!("try {{ {body} }} catch (e) {{ [e.name, e.message] }}"));
        let invalid = "[ \"RangeError\", \"Invalid string length\" ]";
        assert_eq!(message("'ab'.repeat(1e300)"), invalid);
        assert_eq!(message("'x'.padStart(2 ** 30)"), invalid);
        assert_eq!(message("'x'.padEnd(1e300, 'ab')"), invalid);
        assert_eq!(message("'x'.padStart(Infinity)"), invalid);
        assert_eq!(message("'x'.repeat(Infinity)"), "[ \"RangeError\", \"Invalid count value: Infinity\" ]");
        assert_eq!(eval("[''.repeat(1e300), 'abc'.padStart(1e300, '')]"), "[ \"\", \"abc\" ]");
        assert_eq!(eval("'a'.concat(1, null)"), "\"a1null\"");
    }

    #[test]
    fn methods_reject_nullish_receivers() {
        assert_eq!(
            eval("try { String.prototype.trim.call(null) } catch (e) { e.message }"),
            "\"String.prototype.trim called on null or undefined\""
        );
        assert_eq!(eval("String.prototype.slice.call(12345, 1, 3)"), "\"23\"");
    }
}
