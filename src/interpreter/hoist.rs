use super::*;
use log::trace;

impl Interpreter {
    /// Declares every `var` reachable from `stmts` in the var-scope frame
    /// and binds the function declarations of `stmts` in `frame`.
    pub(crate) fn hoist(&mut self, stmts: &[Statement], frame: &EnvRef) -> EvalResult<()> {
        let mut names = Vec::new();
        for stmt in stmts {
            collect_var_names(stmt, &mut names);
        }
        if !names.is_empty() {
            let var_scope = Environment::var_scope(frame);
            let mut scope = var_scope.borrow_mut();
            for name in &names {
                if !scope.has_own(name) {
                    scope.declare_variable(name, JsValue::Undefined);
                }
            }
            trace!("hoisted vars {names:?}");
        }

        for stmt in stmts {
            if let Statement::FunctionDeclaration(node) = stmt {
                let name = node.name.as_deref().unwrap_or_default();
                let func = self.make_function(node, frame, name, None)?;
                trace!("hoisted function {name}");
                frame.borrow_mut().declare_constant(name, JsValue::Object(func));
            }
        }
        Ok(())
    }
}

/// Stops at function boundaries: nested functions hoist their own.
fn collect_var_names(stmt: &Statement, names: &mut Vec<String>) {
    match stmt {
        Statement::Variable(decl) if decl.kind == VarKind::Var => {
            for d in &decl.declarations {
                pattern_names(&d.pattern, names);
            }
        }
        Statement::If(s) => {
            collect_var_names(&s.consequent, names);
            if let Some(alt) = &s.alternate {
                collect_var_names(alt, names);
            }
        }
        Statement::While(s) => collect_var_names(&s.body, names),
        Statement::DoWhile(s) => collect_var_names(&s.body, names),
        Statement::For(s) => {
            if let Some(ForInit::Variable(decl)) = &s.init
                && decl.kind == VarKind::Var
            {
                for d in &decl.declarations {
                    pattern_names(&d.pattern, names);
                }
            }
            collect_var_names(&s.body, names);
        }
        Statement::ForIn(ForInStatement { left, body, .. }) | Statement::ForOf(ForOfStatement { left, body, .. }) => {
            if let ForHead::Declaration(VarKind::Var, pattern) = left {
                pattern_names(pattern, names);
            }
            collect_var_names(body, names);
        }
        Statement::Block(body) => body.iter().for_each(|s| collect_var_names(s, names)),
        Statement::Try(t) => {
            t.block.iter().for_each(|s| collect_var_names(s, names));
            if let Some(handler) = &t.handler {
                handler.body.iter().for_each(|s| collect_var_names(s, names));
            }
            if let Some(finalizer) = &t.finalizer {
                finalizer.iter().for_each(|s| collect_var_names(s, names));
            }
        }
        Statement::Switch(s) => {
            for case in &s.cases {
                case.consequent.iter().for_each(|s| collect_var_names(s, names));
            }
        }
        Statement::Labeled(_, body) | Statement::With(_, body) => collect_var_names(body, names),
        _ => {}
    }
}

fn pattern_names(pattern: &Pattern, names: &mut Vec<String>) {
    match pattern {
        Pattern::Identifier(name) => {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        Pattern::Assign(target, _) | Pattern::Rest(target) => pattern_names(target, names),
        Pattern::Array(elements) => elements.iter().flatten().for_each(|p| pattern_names(p, names)),
        Pattern::Object(props) => props.iter().for_each(|(_, p)| pattern_names(p, names)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};
    use pretty_assertions::assert_eq;

    fn var_names(source: &str) -> Vec<String> {
        let program = match parse(source, &ParseOptions::default()) {
            Ok(p) => p,
            Err(e) => panic!("{e}"),
        };
        let mut names = Vec::new();
        for stmt in &program.body {
            collect_var_names(stmt, &mut names);
        }
        names
    }

    #[test]
    fn collects_vars_through_nested_statements() {
        let names = var_names(
            "var a; if (x) { var b } else var c;
             for (var d = 0;;) { break }
             for (var e in o) {}
             try { var f } catch { var g } finally { var h }
             switch (1) { case 1: var i }
             label: while (0) var j;",
        );
        assert_eq!(names, vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
    }

    #[test]
    fn skips_lexical_and_nested_function_declarations() {
        let names = var_names("let a; const b = 1; function f() { var inner } var c, c;");
        assert_eq!(names, vec!["c"]);
    }

    #[test]
    fn hoisted_functions_are_callable_before_their_declaration() {
        let mut interp = Interpreter::new();
        let value = interp.eval_source("var before = typeof later; function later() {} before").ok();
        assert!(matches!(value, Some(JsValue::String(s)) if s.to_rust_string() == "function"));
    }
}
