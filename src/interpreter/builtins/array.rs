use super::super::*;
use std::cmp::Ordering;

/// `this` as an array object.
fn this_array(interp: &mut Interpreter, this: &JsValue, method: &str) -> EvalResult<JsObject> {
    match this {
        JsValue::Object(obj) if obj.is_array() => Ok(obj.clone()),
        _ => Err(interp.type_error(format!("Array.prototype.{method} called on non-array"))),
    }
}

fn elements_of(obj: &JsObject) -> Vec<JsValue> {
    obj.borrow().array_elements().cloned().unwrap_or_default()
}

fn element_at(obj: &JsObject, index: usize) -> Option<JsValue> {
    obj.borrow().array_elements().and_then(|e| e.get(index).cloned())
}

fn len_of(obj: &JsObject) -> usize {
    obj.borrow().array_elements().map_or(0, Vec::len)
}

fn with_elements<R>(obj: &JsObject, f: impl FnOnce(&mut Vec<JsValue>) -> R) -> Option<R> {
    obj.borrow_mut().array_elements_mut().map(f)
}

fn require_callable(interp: &mut Interpreter, callback: &JsValue) -> EvalResult<()> {
    if is_callable(callback) {
        return Ok(());
    }
    let shown = inspect::inspect_value(callback, true);
    Err(interp.type_error(format!("{shown} is not a function")))
}

/// Calls `callback(element, index, array)` for each index present when the
/// iteration reaches it; stops when `visit` returns `Some`.
fn for_each_element<R>(
    interp: &mut Interpreter,
    array: &JsObject,
    args: &[JsValue],
    mut visit: impl FnMut(&mut Interpreter, usize, JsValue, JsValue) -> EvalResult<Option<R>>,
) -> EvalResult<Option<R>> {
    let callback = arg(args, 0);
    require_callable(interp, &callback)?;
    let this_arg = arg(args, 1);
    let len = len_of(array);
    for i in 0..len {
        let Some(element) = element_at(array, i) else {
            break;
        };
        let result = interp.call(
            &callback,
            &this_arg,
            &[element.clone(), JsValue::Number(i as f64), JsValue::Object(array.clone())],
        )?;
        if let Some(done) = visit(interp, i, element, result)? {
            return Ok(Some(done));
        }
    }
    Ok(None)
}

fn sort_compare(interp: &mut Interpreter, a: &JsValue, b: &JsValue, comparator: &JsValue) -> EvalResult<Ordering> {
    if comparator.is_undefined() {
        let a = interp.to_string(a)?;
        let b = interp.to_string(b)?;
        return Ok(a.code_units.cmp(&b.code_units));
    }
    let result = interp.call(comparator, &JsValue::Undefined, &[a.clone(), b.clone()])?;
    let n = interp.to_number(&result)?;
    Ok(if n < 0.0 {
        Ordering::Less
    } else if n > 0.0 {
        Ordering::Greater
    } else {
        Ordering::Equal
    })
}

/// Stable merge sort whose comparator may throw.
fn merge_sort(interp: &mut Interpreter, mut values: Vec<JsValue>, comparator: &JsValue) -> EvalResult<Vec<JsValue>> {
    if values.len() <= 1 {
        return Ok(values);
    }
    let right = values.split_off(values.len() / 2);
    let left = merge_sort(interp, values, comparator)?;
    let right = merge_sort(interp, right, comparator)?;
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        if sort_compare(interp, r, l, comparator)? == Ordering::Less {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

impl Interpreter {
    pub(crate) fn setup_array(&mut self) {
        let proto = self.array_prototype.clone();
        let ctor = self.install_constructor(
            JsFunction::native_constructor("Array", 1, |interp, _this, args| {
                if let [JsValue::Number(n)] = args {
                    let len = *n;
                    if !(0.0..=MAX_ARRAY_LENGTH as f64).contains(&len) || len.fract() != 0.0 {
                        return Err(interp.range_error("Invalid array length"));
                    }
                    return Ok(interp.create_array(vec![JsValue::Undefined; len as usize]));
                }
                Ok(interp.create_array(args.to_vec()))
            }),
            "Array",
            1,
            &proto,
        );

        self.add_method(&ctor, "isArray", 1, |_interp, _this, args| {
            Ok(JsValue::Boolean(arg(args, 0).as_object().is_some_and(JsObject::is_array)))
        });
        self.add_method(&ctor, "of", 0, |interp, _this, args| Ok(interp.create_array(args.to_vec())));
        self.add_method(&ctor, "from", 1, |interp, _this, args| {
            let source = arg(args, 0);
            let items = match &source {
                JsValue::Object(obj) if !obj.is_array() => interp.array_like_to_vec(obj)?,
                JsValue::Undefined | JsValue::Null => {
                    return Err(interp.type_error(format!("{source} is not iterable")));
                }
                JsValue::Object(_) | JsValue::String(_) => interp.iterate_to_vec(&source)?,
                _ => Vec::new(),
            };
            let map_fn = arg(args, 1);
            if map_fn.is_undefined() {
                return Ok(interp.create_array(items));
            }
            require_callable(interp, &map_fn)?;
            let this_arg = arg(args, 2);
            let mut mapped = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                mapped.push(interp.call(&map_fn, &this_arg, &[item, JsValue::Number(i as f64)])?);
            }
            Ok(interp.create_array(mapped))
        });

        self.add_method(&proto, "push", 1, |interp, this, args| {
            let array = this_array(interp, this, "push")?;
            let len = with_elements(&array, |e| {
                e.extend_from_slice(args);
                e.len()
            });
            Ok(JsValue::Number(len.unwrap_or(0) as f64))
        });
        self.add_method(&proto, "pop", 0, |interp, this, _args| {
            let array = this_array(interp, this, "pop")?;
            Ok(with_elements(&array, Vec::pop).flatten().unwrap_or(JsValue::Undefined))
        });
        self.add_method(&proto, "shift", 0, |interp, this, _args| {
            let array = this_array(interp, this, "shift")?;
            let first = with_elements(&array, |e| (!e.is_empty()).then(|| e.remove(0)));
            Ok(first.flatten().unwrap_or(JsValue::Undefined))
        });
        self.add_method(&proto, "unshift", 1, |interp, this, args| {
            let array = this_array(interp, this, "unshift")?;
            let len = with_elements(&array, |e| {
                let mut items = args.to_vec();
                items.append(e);
                *e = items;
                e.len()
            });
            Ok(JsValue::Number(len.unwrap_or(0) as f64))
        });
        self.add_method(&proto, "slice", 2, |interp, this, args| {
            let array = this_array(interp, this, "slice")?;
            let elements = elements_of(&array);
            let start = relative_index(args.first(), elements.len(), 0);
            let end = relative_index(args.get(1), elements.len(), elements.len());
            let slice = elements.get(start..end.max(start)).unwrap_or_default().to_vec();
            Ok(interp.create_array(slice))
        });
        self.add_method(&proto, "splice", 2, |interp, this, args| {
            let array = this_array(interp, this, "splice")?;
            let len = len_of(&array);
            let start = relative_index(args.first(), len, 0);
            let delete_count = match args.len() {
                0 => 0,
                1 => len - start,
                _ => {
                    let n = to_integer_or_infinity(interp.to_number(&args[1])?);
                    n.clamp(0.0, (len - start) as f64) as usize
                }
            };
            let inserted = args.get(2..).unwrap_or_default().iter().cloned();
            let removed: Vec<JsValue> =
                with_elements(&array, |e| e.splice(start..start + delete_count, inserted).collect()).unwrap_or_default();
            Ok(interp.create_array(removed))
        });
        self.add_method(&proto, "concat", 1, |interp, this, args| {
            let array = this_array(interp, this, "concat")?;
            let mut result = elements_of(&array);
            for value in args {
                match value.as_object().filter(|o| o.is_array()) {
                    Some(other) => result.extend(elements_of(other)),
                    None => result.push(value.clone()),
                }
            }
            Ok(interp.create_array(result))
        });
        self.add_method(&proto, "join", 1, |interp, this, args| {
            let array = this_array(interp, this, "join")?;
            let separator = match arg(args, 0) {
                JsValue::Undefined => ",".to_string(),
                sep => interp.to_rust_string(&sep)?,
            };
            Ok(JsValue::from(interp.join_array(&array, &separator)?))
        });
        self.add_method(&proto, "toString", 0, |interp, this, _args| {
            let array = this_array(interp, this, "toString")?;
            Ok(JsValue::from(interp.join_array(&array, ",")?))
        });
        self.add_method(&proto, "indexOf", 1, |interp, this, args| {
            let array = this_array(interp, this, "indexOf")?;
            let elements = elements_of(&array);
            let search = arg(args, 0);
            let from = relative_index(args.get(1), elements.len(), 0);
            let found = elements.iter().skip(from).position(|e| strict_equality(e, &search));
            Ok(JsValue::Number(found.map_or(-1.0, |i| (i + from) as f64)))
        });
        self.add_method(&proto, "includes", 1, |interp, this, args| {
            let array = this_array(interp, this, "includes")?;
            let elements = elements_of(&array);
            let search = arg(args, 0);
            let from = relative_index(args.get(1), elements.len(), 0);
            Ok(JsValue::Boolean(elements.iter().skip(from).any(|e| same_value_zero(e, &search))))
        });
        self.add_method(&proto, "reverse", 0, |interp, this, _args| {
            let array = this_array(interp, this, "reverse")?;
            with_elements(&array, |e| e.reverse());
            Ok(this.clone())
        });
        self.add_method(&proto, "sort", 1, |interp, this, args| {
            let array = this_array(interp, this, "sort")?;
            let comparator = arg(args, 0);
            if !comparator.is_undefined() && !is_callable(&comparator) {
                return Err(interp.type_error("The comparison function must be either a function or undefined"));
            }
            let (defined, undefined): (Vec<JsValue>, Vec<JsValue>) =
                elements_of(&array).into_iter().partition(|e| !e.is_undefined());
            let mut sorted = merge_sort(interp, defined, &comparator)?;
            sorted.extend(undefined);
            with_elements(&array, |e| *e = sorted);
            Ok(this.clone())
        });

        self.add_method(&proto, "forEach", 1, |interp, this, args| {
            let array = this_array(interp, this, "forEach")?;
            for_each_element(interp, &array, args, |_, _, _, _| Ok(None::<()>))?;
            Ok(JsValue::Undefined)
        });
        self.add_method(&proto, "map", 1, |interp, this, args| {
            let array = this_array(interp, this, "map")?;
            let mut mapped = Vec::with_capacity(len_of(&array));
            for_each_element(interp, &array, args, |_, _, _, result| {
                mapped.push(result);
                Ok(None::<()>)
            })?;
            Ok(interp.create_array(mapped))
        });
        self.add_method(&proto, "filter", 1, |interp, this, args| {
            let array = this_array(interp, this, "filter")?;
            let mut kept = Vec::new();
            for_each_element(interp, &array, args, |_, _, element, result| {
                if to_boolean(&result) {
                    kept.push(element);
                }
                Ok(None::<()>)
            })?;
            Ok(interp.create_array(kept))
        });
        self.add_method(&proto, "find", 1, |interp, this, args| {
            let array = this_array(interp, this, "find")?;
            let found = for_each_element(interp, &array, args, |_, _, element, result| {
                Ok(to_boolean(&result).then_some(element))
            })?;
            Ok(found.unwrap_or(JsValue::Undefined))
        });
        self.add_method(&proto, "findIndex", 1, |interp, this, args| {
            let array = this_array(interp, this, "findIndex")?;
            let found = for_each_element(interp, &array, args, |_, i, _, result| Ok(to_boolean(&result).then_some(i)))?;
            Ok(JsValue::Number(found.map_or(-1.0, |i| i as f64)))
        });
        self.add_method(&proto, "some", 1, |interp, this, args| {
            let array = this_array(interp, this, "some")?;
            let found = for_each_element(interp, &array, args, |_, _, _, result| Ok(to_boolean(&result).then_some(())))?;
            Ok(JsValue::Boolean(found.is_some()))
        });
        self.add_method(&proto, "every", 1, |interp, this, args| {
            let array = this_array(interp, this, "every")?;
            let failed = for_each_element(interp, &array, args, |_, _, _, result| Ok((!to_boolean(&result)).then_some(())))?;
            Ok(JsValue::Boolean(failed.is_none()))
        });
        self.add_method(&proto, "reduce", 1, |interp, this, args| {
            let array = this_array(interp, this, "reduce")?;
            let callback = arg(args, 0);
            require_callable(interp, &callback)?;
            let len = len_of(&array);
            let mut index = 0;
            let mut accumulator = match args.get(1) {
                Some(initial) => initial.clone(),
                None => match element_at(&array, 0) {
                    Some(first) => {
                        index = 1;
                        first
                    }
                    None => return Err(interp.type_error("Reduce of empty array with no initial value")),
                },
            };
            while index < len {
                let Some(element) = element_at(&array, index) else {
                    break;
                };
                accumulator = interp.call(
                    &callback,
                    &JsValue::Undefined,
                    &[accumulator, element, JsValue::Number(index as f64), this.clone()],
                )?;
                index += 1;
            }
            Ok(accumulator)
        });
    }

    /// `array.join(separator)`; an array already being joined contributes "".
    fn join_array(&mut self, array: &JsObject, separator: &str) -> EvalResult<String> {
        if self.join_stack.iter().any(|a| a.ptr_eq(array)) {
            return Ok(String::new());
        }
        self.join_stack.push(array.clone());
        let result = self.join_elements(&elements_of(array), separator);
        self.join_stack.pop();
        result
    }

    fn join_elements(&mut self, elements: &[JsValue], separator: &str) -> EvalResult<String> {
        let mut parts = Vec::with_capacity(elements.len());
        for element in elements {
            if element.is_nullish() {
                parts.push(String::new());
            } else {
                parts.push(self.to_rust_string(element)?);
            }
        }
        Ok(parts.join(separator))
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
    fn constructor_and_statics() {
        assert_eq!(eval("Array(3).length"), "3");
        assert_eq!(eval("new Array(1, 2)"), "[ 1, 2 ]");
        assert_eq!(eval("try { new Array(-1) } catch (e) { e instanceof RangeError }"), "true");
        assert_eq!(eval("[Array.isArray([]), Array.isArray({})]"), "[ true, false ]");
        assert_eq!(eval("Array.of(7)"), "[ 7 ]");
        assert_eq!(eval("Array.from('ab')"), "[ \"a\", \"b\" ]");
        assert_eq!(eval("Array.from({ length: 2, 0: 'x' })"), "[ \"x\", undefined ]");
        assert_eq!(eval("Array.from([1, 2], (v, i) => v * 10 + i)"), "[ 10, 21 ]");
    }

    #[test]
    fn length_writes_are_range_checked() {
        let catch = |body: &str| eval(&format!("try {{ {body} }} catch (e) {{ [e.name, e.message] }}"));
        let invalid = "[ \"RangeError\", \"Invalid array length\" ]";
        assert_eq!(catch("const a = []; a.length = 1e300"), invalid);
        assert_eq!(catch("const a = []; a.length = -1"), invalid);
        assert_eq!(catch("const a = []; a.length = 1.5"), invalid);
        assert_eq!(catch("const a = []; a[4294967294] = 1"), invalid);
        assert_eq!(catch("new Array(4294967295)"), invalid);
        assert_eq!(catch("Array.from({ length: Infinity })"), invalid);
        assert_eq!(eval("const a = [1, 2, 3]; a.length = '1'; a"), "[ 1 ]");
        assert_eq!(eval("const a = []; a[4] = 'x'; a.length"), "5");
        assert_eq!(eval("const a = [1]; try { a.length = NaN } catch {} a"), "[ 1 ]");
    }

    #[test]
    fn mutators() {
        assert_eq!(eval("const a = [1]; [a.push(2, 3), a]"), "[ 3, [ 1, 2, 3 ] ]");
        assert_eq!(eval("const a = [1, 2]; [a.pop(), a.shift(), a.pop(), a]"), "[ 2, 1, undefined, [] ]");
        assert_eq!(eval("const a = [3]; [a.unshift(1, 2), a]"), "[ 3, [ 1, 2, 3 ] ]");
        assert_eq!(eval("const a = [1, 2, 3, 4]; [a.splice(1, 2, 'x'), a]"), "[ [ 2, 3 ], [ 1, \"x\", 4 ] ]");
        assert_eq!(eval("const a = [1, 2, 3]; [a.splice(-1), a]"), "[ [ 3 ], [ 1, 2 ] ]");
        assert_eq!(eval("[1, 2, 3].reverse()"), "[ 3, 2, 1 ]");
    }

    #[test]
    fn accessors() {
        assert_eq!(eval("[1, 2, 3, 4].slice(1, -1)"), "[ 2, 3 ]");
        assert_eq!(eval("[1].concat([2, [3]], 4)"), "[ 1, 2, [ 3 ], 4 ]");
        assert_eq!(eval("[1, null, undefined, 'a'].join('-')"), "\"1---a\"");
        assert_eq!(eval("String([1, [2, 3]])"), "\"1,2,3\"");
        assert_eq!(eval("[NaN].indexOf(NaN)"), "-1");
        assert_eq!(eval("[NaN].includes(NaN)"), "true");
        assert_eq!(eval("[1, 2, 1].indexOf(1, 1)"), "2");
    }

    #[test]
    fn cyclic_join_is_empty() {
        assert_eq!(eval("const a = [1]; a.push(a); a.join()"), "\"1,\"");
    }

    #[test]
    fn callbacks() {
        assert_eq!(eval("[1, 2, 3].map((x, i) => x * i)"), "[ 0, 2, 6 ]");
        assert_eq!(eval("[1, 2, 3, 4].filter(x => x % 2)"), "[ 1, 3 ]");
        assert_eq!(eval("let s = 0; [1, 2].forEach(x => { s += x }); s"), "3");
        assert_eq!(eval("[5, 6].find(x => x > 5)"), "6");
        assert_eq!(eval("[5, 6].findIndex(x => x > 9)"), "-1");
        assert_eq!(eval("[[1].some(x => x), [1, 0].every(x => x)]"), "[ true, false ]");
        assert_eq!(eval("[1, 2, 3].reduce((a, b) => a + b)"), "6");
        assert_eq!(eval("[].reduce((a, b) => a + b, 'init')"), "\"init\"");
        assert_eq!(eval("try { [].reduce((a, b) => a) } catch (e) { e.message }"), "\"Reduce of empty array with no initial value\"");
        assert_eq!(eval("try { [1].map(3) } catch (e) { e.message }"), "\"3 is not a function\"");
    }

    #[test]
    fn sorting() {
        assert_eq!(eval("[10, 9, 1, undefined, 2].sort()"), "[ 1, 10, 2, 9, undefined ]");
        assert_eq!(eval("[3, 1, 2].sort((a, b) => b - a)"), "[ 3, 2, 1 ]");
        let stable = "[{ k: 1, v: 'a' }, { k: 0, v: 'b' }, { k: 1, v: 'c' }].sort((x, y) => x.k - y.k).map(o => o.v)";
        assert_eq!(eval(stable), "[ \"b\", \"a\", \"c\" ]");
        assert_eq!(eval("try { [2, 1].sort(() => { throw 'cmp' }) } catch (e) { e }"), "\"cmp\"");
    }
}
