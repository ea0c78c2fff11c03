//! The `implicit` module: the only thing a script can import
//!
//! Nodes, shapes, figures and scenes travel through scripts as object maps
//! with the same layout as their JSON wire form, so a script can inspect or
//! build them by hand. Numeric arguments accept integers or floats.
//!
//! Combinators taking a list (`and`, `or`, `figure`) accept up to
//! [`MAX_VARIADIC_ARGS`] positional arguments, and any argument may itself be
//! an array, so longer lists go through arrays.

use implicit_scene::{self as scene, Figure, ImplicitNode, SceneOptions, Shape, ShapeOptions};
use rhai::serde::{from_dynamic, to_dynamic};
use rhai::{Dynamic, EvalAltResult, Module, Position};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Name of the importable module
pub const IMPLICIT_MODULE: &str = "implicit";

/// Functions the module exports
pub const EXPORTED_FUNCTIONS: &[&str] = &[
    "circle",
    "rect",
    "and",
    "or",
    "not",
    "subtract",
    "modulate",
    "translate",
    "break_here",
    "freeze",
    "smooth_outer",
    "smooth_inner",
    "shape",
    "figure",
    "scene",
    "singleton_scene",
];

/// Functions taking any number of positional arguments
pub const VARIADIC_FUNCTIONS: &[&str] = &["and", "or", "figure"];

/// Positional arguments a variadic function is registered for
pub const MAX_VARIADIC_ARGS: usize = 16;

/// What the compiler may assume exists without seeing a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbientDeclarations {
    pub module: &'static str,
    pub functions: &'static [&'static str],
    pub variadic: &'static [&'static str],
}

impl AmbientDeclarations {
    /// Declarations of the `implicit` module
    #[inline]
    #[must_use]
    pub fn implicit() -> Self {
        Self {
            module: IMPLICIT_MODULE,
            functions: EXPORTED_FUNCTIONS,
            variadic: VARIADIC_FUNCTIONS,
        }
    }

    #[inline]
    #[must_use]
    pub fn declares(&self, function: &str) -> bool {
        self.functions.contains(&function)
    }

    /// Positional argument limit of a variadic function, `None` for the rest
    #[must_use]
    pub fn max_arguments(&self, function: &str) -> Option<usize> {
        self.variadic
            .contains(&function)
            .then_some(MAX_VARIADIC_ARGS)
    }
}

impl Default for AmbientDeclarations {
    fn default() -> Self {
        Self::implicit()
    }
}

type FnResult = Result<Dynamic, Box<EvalAltResult>>;

fn runtime_error(message: impl Into<String>) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(Dynamic::from(message.into()), Position::NONE).into()
}

#[allow(clippy::cast_precision_loss)]
fn number(function: &str, value: &Dynamic) -> Result<f64, Box<EvalAltResult>> {
    if let Ok(float) = value.as_float() {
        return Ok(float);
    }
    if let Ok(int) = value.as_int() {
        return Ok(int as f64);
    }
    Err(runtime_error(format!(
        "{function}: expected a number, got {}",
        value.type_name()
    )))
}

fn decode<T: DeserializeOwned>(function: &str, what: &str, value: &Dynamic) -> Result<T, Box<EvalAltResult>> {
    from_dynamic(value).map_err(|_| {
        runtime_error(format!(
            "{function}: expected {what}, got {}",
            value.type_name()
        ))
    })
}

fn node(function: &str, value: &Dynamic) -> Result<ImplicitNode, Box<EvalAltResult>> {
    decode(function, "an implicit node", value)
}

fn output<T: Serialize>(value: &T) -> FnResult {
    to_dynamic(value)
}

/// Flatten positional arguments, expanding arrays in place
fn flatten(args: Vec<Dynamic>) -> Vec<Dynamic> {
    let mut items = Vec::with_capacity(args.len());
    for arg in args {
        if arg.is_array() {
            if let Ok(inner) = arg.into_array() {
                items.extend(flatten(inner));
            }
        } else {
            items.push(arg);
        }
    }
    items
}

fn nodes(function: &str, args: Vec<Dynamic>) -> Result<Vec<ImplicitNode>, Box<EvalAltResult>> {
    flatten(args).iter().map(|arg| node(function, arg)).collect()
}

fn combine_and(args: Vec<Dynamic>) -> FnResult {
    output(&scene::and(nodes("and", args)?))
}

fn combine_or(args: Vec<Dynamic>) -> FnResult {
    output(&scene::or(nodes("or", args)?))
}

fn build_figure(args: Vec<Dynamic>) -> FnResult {
    let shapes = flatten(args)
        .iter()
        .map(|arg| decode::<Shape>("figure", "a shape", arg))
        .collect::<Result<Vec<_>, _>>()?;
    output(&scene::figure(shapes))
}

fn build_shape(implicit: &Dynamic, opts: Option<&Dynamic>) -> FnResult {
    let implicit = node("shape", implicit)?;
    let opts = opts
        .map(|opts| decode::<ShapeOptions>("shape", "a shape options map", opts))
        .transpose()?;
    output(&scene::shape(implicit, opts))
}

fn build_scene(figures: Dynamic, opts: Option<&Dynamic>) -> FnResult {
    let figures = flatten(vec![figures])
        .iter()
        .map(|arg| decode::<Figure>("scene", "a figure", arg))
        .collect::<Result<Vec<_>, _>>()?;
    let opts = opts
        .map(|opts| decode::<SceneOptions>("scene", "a scene options map", opts))
        .transpose()?;
    output(&scene::scene(figures, opts))
}

/// Registers a list-taking function at arities 1 through `MAX_VARIADIC_ARGS`
macro_rules! variadic {
    ($module:ident, $name:literal, $f:expr) => {
        variadic!(@arity $module, $name, $f; a);
        variadic!(@arity $module, $name, $f; a, b);
        variadic!(@arity $module, $name, $f; a, b, c);
        variadic!(@arity $module, $name, $f; a, b, c, d);
        variadic!(@arity $module, $name, $f; a, b, c, d, e);
        variadic!(@arity $module, $name, $f; a, b, c, d, e, f);
        variadic!(@arity $module, $name, $f; a, b, c, d, e, f, g);
        variadic!(@arity $module, $name, $f; a, b, c, d, e, f, g, h);
        variadic!(@arity $module, $name, $f; a, b, c, d, e, f, g, h, j);
        variadic!(@arity $module, $name, $f; a, b, c, d, e, f, g, h, j, k);
        variadic!(@arity $module, $name, $f; a, b, c, d, e, f, g, h, j, k, l);
        variadic!(@arity $module, $name, $f; a, b, c, d, e, f, g, h, j, k, l, m);
        variadic!(@arity $module, $name, $f; a, b, c, d, e, f, g, h, j, k, l, m, n);
        variadic!(@arity $module, $name, $f; a, b, c, d, e, f, g, h, j, k, l, m, n, p);
        variadic!(@arity $module, $name, $f; a, b, c, d, e, f, g, h, j, k, l, m, n, p, q);
        variadic!(@arity $module, $name, $f; a, b, c, d, e, f, g, h, j, k, l, m, n, p, q, r);
    };
    (@arity $module:ident, $name:literal, $f:expr; $($arg:ident),+) => {
        $module.set_native_fn($name, |$($arg: Dynamic),+| $f(vec![$($arg),+]));
    };
}

/// Build the `implicit` module
#[must_use]
pub fn implicit_module() -> Module {
    let mut module = Module::new();

    module.set_native_fn("circle", |x: Dynamic, y: Dynamic, r: Dynamic| {
        output(&scene::circle(
            number("circle", &x)?,
            number("circle", &y)?,
            number("circle", &r)?,
        ))
    });
    module.set_native_fn("rect", |x: Dynamic, y: Dynamic, w: Dynamic, h: Dynamic| {
        output(&scene::rect(
            number("rect", &x)?,
            number("rect", &y)?,
            number("rect", &w)?,
            number("rect", &h)?,
        ))
    });

    variadic!(module, "and", combine_and);
    variadic!(module, "or", combine_or);

    module.set_native_fn("not", |target: Dynamic| {
        output(&scene::not(node("not", &target)?))
    });
    module.set_native_fn("subtract", |a: Dynamic, b: Dynamic| {
        output(&scene::subtract(node("subtract", &a)?, node("subtract", &b)?))
    });
    module.set_native_fn("modulate", |how_much: Dynamic, target: Dynamic| {
        output(&scene::modulate(
            number("modulate", &how_much)?,
            node("modulate", &target)?,
        ))
    });
    module.set_native_fn("translate", |dx: Dynamic, dy: Dynamic, target: Dynamic| {
        output(&scene::translate(
            number("translate", &dx)?,
            number("translate", &dy)?,
            node("translate", &target)?,
        ))
    });
    module.set_native_fn("break_here", |target: Dynamic| {
        output(&scene::break_here(node("break_here", &target)?))
    });
    module.set_native_fn("freeze", |target: Dynamic| {
        output(&scene::freeze(node("freeze", &target)?))
    });
    module.set_native_fn("smooth_outer", |how_much: Dynamic, target: Dynamic| {
        output(&scene::smooth_outer(
            number("smooth_outer", &how_much)?,
            node("smooth_outer", &target)?,
        ))
    });
    module.set_native_fn("smooth_inner", |how_much: Dynamic, target: Dynamic| {
        output(&scene::smooth_inner(
            number("smooth_inner", &how_much)?,
            node("smooth_inner", &target)?,
        ))
    });

    module.set_native_fn("shape", |implicit: Dynamic| build_shape(&implicit, None));
    module.set_native_fn("shape", |implicit: Dynamic, opts: Dynamic| {
        build_shape(&implicit, Some(&opts))
    });

    module.set_native_fn("figure", || build_figure(Vec::new()));
    variadic!(module, "figure", build_figure);

    module.set_native_fn("scene", |figures: Dynamic| build_scene(figures, None));
    module.set_native_fn("scene", |figures: Dynamic, opts: Dynamic| {
        build_scene(figures, Some(&opts))
    });
    module.set_native_fn("singleton_scene", |implicit: Dynamic| {
        output(&scene::singleton_scene(node("singleton_scene", &implicit)?))
    });

    module.build_index();
    module
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambient_declarations() {
        let ambient = AmbientDeclarations::implicit();
        assert_eq!(ambient.module, "implicit");
        assert!(ambient.declares("circle"));
        assert!(ambient.declares("singleton_scene"));
        assert!(!ambient.declares("eval"));
    }

    #[test]
    fn only_list_combinators_are_variadic() {
        let ambient = AmbientDeclarations::implicit();
        assert_eq!(ambient.max_arguments("and"), Some(MAX_VARIADIC_ARGS));
        assert_eq!(ambient.max_arguments("figure"), Some(MAX_VARIADIC_ARGS));
        assert_eq!(ambient.max_arguments("circle"), None);
    }

    #[test]
    fn numbers_accept_ints_and_floats() {
        assert_eq!(number("circle", &Dynamic::from(3_i64)).unwrap(), 3.0);
        assert_eq!(number("circle", &Dynamic::from(2.5_f64)).unwrap(), 2.5);
        assert!(number("circle", &Dynamic::from("x".to_string())).is_err());
    }

    #[test]
    fn flatten_expands_nested_arrays() {
        let inner: rhai::Array = vec![Dynamic::from(1_i64), Dynamic::from(2_i64)];
        let args = vec![Dynamic::from(inner), Dynamic::from(3_i64)];
        assert_eq!(flatten(args).len(), 3);
    }
}
