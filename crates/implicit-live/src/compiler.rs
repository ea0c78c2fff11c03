//! Compilation service
//!
//! Turns edited source into code the sandbox can run, plus the diagnostics
//! that decide whether it should run at all.

use crate::config::{CompilerOptions, RHAI_TARGET};
use crate::error::CompileError;
use async_trait::async_trait;
use implicit_diagnostics::{Diagnostic, LineIndex};
use implicit_sandbox::AmbientDeclarations;
use once_cell::sync::Lazy;
use regex::Regex;
use rhai::{Engine, ParseError};
use std::ops::Range;
use std::sync::Arc;

static IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s+"([^"]*)"(?:\s+as\s+([A-Za-z_][A-Za-z0-9_]*))?"#)
        .expect("import pattern")
});

static MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)::([A-Za-z_][A-Za-z0-9_]*)").expect("member pattern")
});

/// Compiler output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compilation {
    /// Code to hand to the sandbox
    pub emitted: String,
    pub syntax: Vec<Diagnostic>,
    pub semantic: Vec<Diagnostic>,
}

impl Compilation {
    /// Clean compilation of `emitted`
    #[must_use]
    pub fn clean(emitted: impl Into<String>) -> Self {
        Self {
            emitted: emitted.into(),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn has_diagnostics(&self) -> bool {
        !self.syntax.is_empty() || !self.semantic.is_empty()
    }
}

/// Source in, emitted code and diagnostics out
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompilationService: Send + Sync {
    /// Compile one source text
    ///
    /// # Errors
    /// Only when the service itself fails; problems in `source` are diagnostics.
    async fn compile(&self, source: &str) -> Result<Compilation, CompileError>;
}

/// Rhai front end checked against the sandbox's ambient declarations
#[derive(Debug, Clone)]
pub struct ScriptCompiler {
    options: CompilerOptions,
    ambient: AmbientDeclarations,
    parser: Arc<Engine>,
    strict: Arc<Engine>,
}

impl ScriptCompiler {
    /// Create a compiler
    ///
    /// # Errors
    /// `CompileError::UnsupportedTarget` for any target other than `"rhai"`.
    pub fn new(options: CompilerOptions, ambient: AmbientDeclarations) -> Result<Self, CompileError> {
        if options.target != RHAI_TARGET {
            return Err(CompileError::UnsupportedTarget(options.target));
        }

        let parser = Engine::new_raw();
        let mut strict = Engine::new_raw();
        strict.set_strict_variables(true);

        Ok(Self {
            options,
            ambient,
            parser: Arc::new(parser),
            strict: Arc::new(strict),
        })
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile without leaving the current thread
    #[must_use]
    pub fn compile_blocking(&self, source: &str) -> Compilation {
        let index = LineIndex::new(source);

        if let Err(err) = self.parser.compile(source) {
            return Compilation {
                emitted: source.to_string(),
                syntax: vec![parse_diagnostic(&index, source, &err)],
                semantic: Vec::new(),
            };
        }

        let mut semantic = Vec::new();
        if self.options.strict_null_checks {
            if let Err(err) = self.strict.compile(source) {
                semantic.push(parse_diagnostic(&index, source, &err));
            }
        }
        semantic.extend(self.module_diagnostics(source));
        semantic.sort_by_key(|d| d.offset);

        Compilation {
            emitted: source.to_string(),
            syntax: Vec::new(),
            semantic,
        }
    }

    /// Imports of unknown modules and calls to undeclared members
    ///
    /// Only runs on source that parsed, so every comment and string literal
    /// is terminated. Matches starting inside one of them are skipped.
    fn module_diagnostics(&self, source: &str) -> Vec<Diagnostic> {
        let inert = inert_ranges(source);
        let is_code = |at: usize| !inert.iter().any(|range| range.contains(&at));

        let mut diagnostics = Vec::new();
        let mut aliases = Vec::new();

        for import in IMPORT.captures_iter(source) {
            if import.get(0).is_some_and(|m| !is_code(m.start())) {
                continue;
            }
            let name = &import[1];
            if name == self.ambient.module {
                if let Some(alias) = import.get(2) {
                    aliases.push(alias.as_str().to_string());
                }
                continue;
            }

            // Point at the quoted module name
            let literal = import.get(1).map_or(0..0, |m| m.start() - 1..m.end() + 1);
            let inner = Diagnostic::new(
                literal.start,
                literal.len(),
                format!(
                    "Cannot find module '{name}'. Only the '{}' module can be imported.",
                    self.ambient.module
                ),
            );
            diagnostics.push(Diagnostic::nested(literal.start, literal.len(), inner));
        }

        for member in MEMBER.captures_iter(source) {
            let Some(whole) = member.get(0) else { continue };
            if !is_code(whole.start()) || !aliases.iter().any(|alias| alias == &member[1]) {
                continue;
            }
            let name = &member[2];
            let at = member.get(2).map_or(0..0, |m| m.range());

            if !self.ambient.declares(name) {
                diagnostics.push(Diagnostic::new(
                    at.start,
                    at.len(),
                    format!(
                        "Module '{}' has no exported member '{name}'.",
                        self.ambient.module
                    ),
                ));
                continue;
            }

            let Some(limit) = self.ambient.max_arguments(name) else { continue };
            let count = call_arguments(source, whole.end(), &inert);
            if count.is_some_and(|count| count > limit) {
                diagnostics.push(Diagnostic::new(
                    at.start,
                    at.len(),
                    format!(
                        "'{name}' takes at most {limit} arguments; pass an array for more."
                    ),
                ));
            }
        }

        diagnostics
    }
}

/// Byte ranges of comments and string literals
fn inert_ranges(source: &str) -> Vec<Range<usize>> {
    let bytes = source.as_bytes();
    let mut ranges = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                // Block comments nest
                let mut depth = 0usize;
                while i < bytes.len() {
                    if bytes[i..].starts_with(b"/*") {
                        depth += 1;
                        i += 2;
                    } else if bytes[i..].starts_with(b"*/") {
                        depth -= 1;
                        i += 2;
                        if depth == 0 {
                            break;
                        }
                    } else {
                        i += 1;
                    }
                }
            }
            quote @ (b'"' | b'`' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            _ => {
                i += 1;
                continue;
            }
        }
        ranges.push(start..i.min(bytes.len()));
    }

    ranges
}

/// Top-level argument count of the call whose callee ends at `after`
///
/// `None` when no argument list follows.
fn call_arguments(source: &str, after: usize, inert: &[Range<usize>]) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = after;
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    if bytes.get(i) != Some(&b'(') {
        return None;
    }
    i += 1;

    let mut depth = 0usize;
    let mut count = 0;
    let mut pending = false;
    while i < bytes.len() {
        if let Ok(found) = inert.binary_search_by_key(&i, |range| range.start) {
            pending = true;
            i = inert[found].end;
            continue;
        }
        match bytes[i] {
            b')' if depth == 0 => return Some(count + usize::from(pending)),
            b',' if depth == 0 => {
                count += usize::from(pending);
                pending = false;
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                pending = true;
            }
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            byte if !byte.is_ascii_whitespace() => pending = true,
            _ => {}
        }
        i += 1;
    }
    None
}

#[async_trait]
impl CompilationService for ScriptCompiler {
    async fn compile(&self, source: &str) -> Result<Compilation, CompileError> {
        let compiler = self.clone();
        let source = source.to_owned();
        tokio::task::spawn_blocking(move || compiler.compile_blocking(&source))
            .await
            .map_err(|e| CompileError::Worker(e.to_string()))
    }
}

fn parse_diagnostic(index: &LineIndex<'_>, source: &str, err: &ParseError) -> Diagnostic {
    let position = err.position();
    let offset = match position.line() {
        Some(line) => index.offset_of(line, position.position().unwrap_or(1)),
        None => source.len(),
    };
    let length = usize::from(offset < source.len());
    Diagnostic::new(offset, length, err.err_type().to_string())
}
