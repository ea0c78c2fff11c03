//! Script engine construction and evaluation
//!
//! A script's top-level variables become named exports and its trailing
//! expression becomes the `default` export.

use crate::config::SandboxConfig;
use crate::module::{implicit_module, IMPLICIT_MODULE};
use crate::protocol::{Exports, Fault, Outcome, DEFAULT_EXPORT};
use implicit_diagnostics::LineIndex;
use rhai::module_resolvers::StaticModuleResolver;
use rhai::{Dynamic, Engine, EvalAltResult, Position, Scope};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Source name given to evaluated code in traces
pub const SOURCE_NAME: &str = "eval";

/// Build an engine whose only importable module is `implicit`
///
/// `cancel` aborts a running evaluation at its next operation.
#[must_use]
pub fn build_engine(config: &SandboxConfig, cancel: Arc<AtomicBool>) -> Engine {
    let mut engine = Engine::new();

    engine.set_max_operations(config.max_operations);
    engine.set_max_call_levels(config.max_call_levels);
    engine.set_max_expr_depths(config.max_expr_depth, config.max_function_expr_depth);
    engine.set_max_string_size(config.max_string_size);
    engine.set_max_array_size(config.max_array_size);
    engine.set_max_map_size(config.max_map_size);

    let mut resolver = StaticModuleResolver::new();
    resolver.insert(IMPLICIT_MODULE, implicit_module());
    engine.set_module_resolver(resolver);

    engine.disable_symbol("eval");

    engine.on_print(|text| tracing::info!(target: "implicit_sandbox::script", "{text}"));
    engine.on_debug(|text, _source, pos| {
        tracing::debug!(target: "implicit_sandbox::script", line = pos.line(), "{text}");
    });
    engine.on_progress(move |_| {
        if cancel.load(Ordering::Relaxed) {
            Some(Dynamic::from("execution cancelled".to_string()))
        } else {
            None
        }
    });

    engine
}

/// Evaluate emitted code, collecting exports or a fault
#[must_use]
pub fn evaluate(engine: &Engine, code: &str) -> Outcome {
    let index = LineIndex::new(code);
    let mut ast = match engine.compile(code) {
        Ok(ast) => ast,
        Err(err) => {
            let message = err.err_type().to_string();
            return Outcome::Faulted(fault_at(&index, message, Vec::new(), err.position()));
        }
    };
    ast.set_source(SOURCE_NAME);

    let mut scope = Scope::new();
    match engine.eval_ast_with_scope::<Dynamic>(&mut scope, &ast) {
        Ok(value) => Outcome::Completed(collect_exports(&scope, value)),
        Err(err) => Outcome::Faulted(fault_from(&index, &err)),
    }
}

fn collect_exports(scope: &Scope<'_>, value: Dynamic) -> Exports {
    let mut exports = Exports::new();

    for (name, _constant, binding) in scope.iter() {
        match rhai::serde::from_dynamic::<serde_json::Value>(&binding) {
            Ok(json) => exports.insert(name, json),
            Err(err) => tracing::debug!(export = name, error = %err, "skipping export without a JSON form"),
        }
    }

    if !value.is_unit() {
        match rhai::serde::from_dynamic::<serde_json::Value>(&value) {
            Ok(json) => exports.insert(DEFAULT_EXPORT, json),
            Err(err) => tracing::debug!(error = %err, "default export has no JSON form"),
        }
    }

    exports
}

/// Unwind nested call errors into a fault
///
/// Frames are listed outermost first, so the innermost position is both the
/// structured position and the last frame of the trace.
fn fault_from(index: &LineIndex<'_>, err: &EvalAltResult) -> Fault {
    let mut frames = Vec::new();
    let mut current = err;

    loop {
        match current {
            EvalAltResult::ErrorInFunctionCall(name, _source, inner, pos) => {
                frames.push((Some(name.as_str()), *pos));
                current = inner;
            }
            EvalAltResult::ErrorInModule(_, inner, pos) => {
                frames.push((None, *pos));
                current = inner;
            }
            _ => break,
        }
    }

    fault_at(index, message_of(current), frames, current.position())
}

fn fault_at(
    index: &LineIndex<'_>,
    message: String,
    mut frames: Vec<(Option<&str>, Position)>,
    innermost: Position,
) -> Fault {
    frames.push((None, innermost));

    let located: Vec<_> = frames
        .iter()
        .filter_map(|(name, pos)| {
            let line = pos.line()?;
            Some((*name, line, byte_column(index, line, pos.position().unwrap_or(1))))
        })
        .collect();

    let mut trace = message.clone();
    for (name, line, col) in &located {
        match name {
            Some(name) => {
                let _ = write!(trace, "\n    at {name} ({SOURCE_NAME}:{line}:{col})");
            }
            None => {
                let _ = write!(trace, "\n    at {SOURCE_NAME}:{line}:{col}");
            }
        }
    }

    Fault {
        message,
        position: located.last().map(|(_, line, col)| (*line, *col)),
        trace,
    }
}

/// Rhai counts columns in characters, error records count bytes
fn byte_column(index: &LineIndex<'_>, line: usize, col: usize) -> usize {
    index.position(index.offset_of(line, col)).1
}

/// The error's text without the trailing ` (line l, position c)`
fn message_of(err: &EvalAltResult) -> String {
    if let EvalAltResult::ErrorRuntime(value, _) = err {
        return value.to_string();
    }

    let text = err.to_string();
    match text.rfind(" (line ") {
        Some(idx) => text[..idx].to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::MAX_VARIADIC_ARGS;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn engine() -> Engine {
        build_engine(&SandboxConfig::default(), Arc::new(AtomicBool::new(false)))
    }

    fn completed(code: &str) -> Exports {
        match evaluate(&engine(), code) {
            Outcome::Completed(exports) => exports,
            Outcome::Faulted(fault) => panic!("unexpected fault: {}", fault.trace),
        }
    }

    fn faulted(code: &str) -> Fault {
        match evaluate(&engine(), code) {
            Outcome::Faulted(fault) => fault,
            Outcome::Completed(exports) => panic!("unexpected success: {exports:?}"),
        }
    }

    #[test]
    fn trailing_value_is_default_export() {
        let exports = completed("import \"implicit\" as i;\ni::circle(0, 0, 100)");
        assert_eq!(
            exports.default_export(),
            Some(&json!({"kind": "circle", "x": 0.0, "y": 0.0, "r": 100.0}))
        );
    }

    #[test]
    fn top_level_variables_are_named_exports() {
        let exports = completed("let radius = 5;\nlet label = \"disc\";");
        assert_eq!(exports.get("radius"), Some(&json!(5)));
        assert_eq!(exports.get("label"), Some(&json!("disc")));
        assert!(exports.default_export().is_none());
    }

    #[test]
    fn every_exported_function_is_callable() {
        let code = r#"
import "implicit" as i;
let c = i::circle(0, 0, 10);
let r = i::rect(0, 0, 5, 5);
let n = i::and(i::or(c, r), i::not(c), i::subtract(r, c));
let n = i::modulate(2, i::translate(1, 1, n));
let n = i::smooth_outer(1, i::smooth_inner(1.5, i::freeze(i::break_here(n))));
let s = i::shape(n, #{ color: [255, 0, 0], draw_mode: "filled" });
let f = i::figure([s, i::shape(c)]);
let one = i::singleton_scene(c);
i::scene([f], #{ unit: "mm" })
"#;
        let exports = completed(code);
        let scene = exports.default_export().expect("default");
        assert_eq!(scene["unit"], json!("mm"));
        assert_eq!(scene["simplify"], json!(true));
        assert_eq!(scene["figures"][0]["shapes"][0]["color"], json!([255, 0, 0]));
        assert_eq!(exports.get("one").unwrap()["figures"][0]["shapes"][0]["draw_mode"], json!("filled"));
    }

    #[test]
    fn variadic_combinators_flatten_arrays() {
        let exports = completed(
            "import \"implicit\" as i;\nlet c = i::circle(0, 0, 1);\ni::and([c, c], c)",
        );
        let node = exports.default_export().unwrap();
        assert_eq!(node["kind"], json!("and"));
        assert_eq!(node["children"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn other_modules_cannot_be_imported() {
        let fault = faulted("import \"fs\" as fs;\n1");
        assert!(fault.message.contains("fs"), "{}", fault.message);
        assert_eq!(fault.position.map(|(line, _)| line), Some(1));
    }

    #[test]
    fn thrown_errors_carry_their_position() {
        let fault = faulted("let x = 1;\nlet y = 2;\n         throw \"radius must be positive\";");
        assert_eq!(fault.message, "radius must be positive");
        assert_eq!(fault.position, Some((3, 10)));
        assert!(fault.trace.ends_with("at eval:3:10"), "{}", fault.trace);
    }

    #[test]
    fn columns_count_bytes_after_multibyte_text() {
        let fault = faulted("let s = \"éé\"; throw \"x\";");
        assert_eq!(fault.position, Some((1, 17)));
        assert!(fault.trace.ends_with("at eval:1:17"), "{}", fault.trace);
    }

    #[test]
    fn variadic_combinators_take_more_than_four_nodes() {
        let exports = completed(
            "import \"implicit\" as i;\nlet c = i::circle(0, 0, 1);\ni::and(c, c, c, c, c, c, c)",
        );
        let node = exports.default_export().unwrap();
        assert_eq!(node["children"].as_array().unwrap().len(), 7);
    }

    #[test]
    fn variadic_limit_is_reachable() {
        let args = vec!["c"; MAX_VARIADIC_ARGS].join(", ");
        let code = format!("import \"implicit\" as i;\nlet c = i::circle(0, 0, 1);\ni::or({args})");
        let exports = completed(&code);
        let node = exports.default_export().unwrap();
        assert_eq!(node["children"].as_array().unwrap().len(), MAX_VARIADIC_ARGS);
    }

    #[test]
    fn errors_inside_functions_report_the_innermost_frame() {
        let fault = faulted("fn check(r) {\n  throw \"bad radius\";\n}\ncheck(1);");
        assert_eq!(fault.message, "bad radius");
        assert_eq!(fault.position, Some((2, 3)));
        assert!(fault.trace.contains("at check (eval:4:1)"), "{}", fault.trace);
    }

    #[test]
    fn parse_errors_are_faults() {
        let fault = faulted("let = ;");
        assert!(fault.position.is_some());
    }

    #[test]
    fn cancelled_engine_stops_running() {
        let cancel = Arc::new(AtomicBool::new(true));
        let engine = build_engine(&SandboxConfig::default(), cancel);
        assert!(matches!(evaluate(&engine, "loop {}"), Outcome::Faulted(_)));
    }

    #[test]
    fn eval_is_disabled() {
        assert!(matches!(
            evaluate(&engine(), "eval(\"1 + 1\")"),
            Outcome::Faulted(_)
        ));
    }
}
