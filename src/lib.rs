//! joosc — a whole-program Joos 1W compiler targeting x86-32.
//!
//! ## Architecture
//!
//! - **parser**: logos lexer + recursive-descent parser producing the AST
//! - **review**: the weeder, per-unit syntactic restrictions
//! - **wash**: the semantic pipeline (enter, hierarchy, resolve, attr,
//!   const_fold, flow)
//! - **codegen**: IR lowering, layout, tiling, register allocation,
//!   NASM emission
//! - **bin**: the `joosc` command-line driver
//!
//! ## Compilation flow
//!
//! ```text
//! Joos source -> Parser -> AST -> Review -> Wash -> Codegen -> .s files
//!                                            |
//!              enter -> hierarchy -> resolve -> attr -> const_fold -> flow
//! ```
//!
//! Each pass accumulates diagnostics; the pipeline stops at the end of the
//! first pass that reported an error, so later passes always run on
//! well-formed input.

pub mod ast;
pub mod codegen;
pub mod common;
pub mod parser;
pub mod review;
pub mod stdlib;
pub mod wash;

use parser::AstIds;
pub use codegen::Assembly;
pub use common::{Config, Diagnostic, Diagnostics, Error, ErrorKind, OptLevel, Result};

use common::error::Severity;
use parser::span::Span;

/// Result of a full compilation attempt.
pub struct CompileOutcome {
    pub diagnostics: Vec<Diagnostic>,
    /// Present only when every pass succeeded.
    pub assembly: Option<Assembly>,
    /// Driver exit code under the a6 policy (0 / 42 / 43 / 13).
    pub exit_code: i32,
}

/// Compile a set of `(file name, source)` units into assembly.
///
/// The embedded stdlib is prepended; the first user unit is the start
/// class whose `public static int test()` becomes the program entry.
pub fn compile_program(sources: &[(String, String)], config: &Config) -> CompileOutcome {
    let mut diags = Diagnostics::new();
    let mut ids = AstIds::new();
    let mut units = Vec::new();

    let phase = |config: &Config, name: &str| {
        if config.verbose {
            eprintln!("joosc: {name}");
        }
    };

    // Phase 1: parse the embedded stdlib, then the user's units.
    phase(config, "parsing");
    for (name, source) in stdlib::SOURCES {
        match parser::parse_unit(source, name, &mut ids) {
            Ok(unit) => units.push(unit),
            Err(e) => {
                diags.error(
                    ErrorKind::Internal,
                    format!("embedded stdlib failed to parse: {e}"),
                    None,
                );
                return finish(diags, None);
            }
        }
    }
    let user_start = units.len();

    for (file_name, source) in sources {
        let base = basename(file_name);
        diags.set_file(file_name);
        match parser::parse_unit(source, &base, &mut ids) {
            Ok(unit) => units.push(unit),
            Err(e) => {
                let span = Some(Span::single(e.location()));
                diags.error(e.kind(), e.to_string(), span);
            }
        }
        diags.clear_file();
    }
    if diags.has_errors() {
        return finish(diags, None);
    }

    // Phase 2: weeding.
    phase(config, "weeding");
    for unit in &units[user_start..] {
        diags.set_file(&unit.file_name);
        review::review_unit(unit, &mut diags);
        diags.clear_file();
    }
    if diags.has_errors() {
        return finish(diags, None);
    }

    // Phase 3: the wash pipeline.
    phase(config, "type linking");
    let program = match wash::enter::build_program(units, user_start, &mut diags) {
        Some(program) if !diags.has_errors() => program,
        _ => return finish(diags, None),
    };

    phase(config, "hierarchy checking");
    let hierarchy = wash::hierarchy::check(&program, &mut diags);
    if diags.has_errors() {
        return finish(diags, None);
    }

    phase(config, "name resolution");
    let mut attrs = wash::Attributes::default();
    wash::resolve::run(&program, &hierarchy, &mut attrs, &mut diags);
    if diags.has_errors() {
        return finish(diags, None);
    }

    phase(config, "type checking");
    wash::attr::run(&program, &hierarchy, &mut attrs, &mut diags);
    if diags.has_errors() {
        return finish(diags, None);
    }

    phase(config, "constant folding");
    wash::const_fold::run(&program, &mut attrs);

    phase(config, "flow analysis");
    wash::flow::run(&program, &mut attrs, &mut diags);
    if diags.has_errors() {
        return finish(diags, None);
    }

    // Phase 4: code generation.
    phase(config, "code generation");
    match codegen::generate_assembly(&program, &hierarchy, &attrs, config) {
        Ok(assembly) => finish(diags, Some(assembly)),
        Err(message) => {
            diags.error(ErrorKind::Codegen, message, None);
            finish(diags, None)
        }
    }
}

fn finish(diags: Diagnostics, assembly: Option<Assembly>) -> CompileOutcome {
    let exit_code = diags.exit_code();
    CompileOutcome {
        diagnostics: diags.into_vec(),
        assembly,
        exit_code,
    }
}

fn basename(path: &str) -> String {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    file.strip_suffix(".java").unwrap_or(file).to_string()
}

/// Strict API: compile and fail on the first diagnostic error, for tests
/// and embedding. Warnings are not failures.
pub fn compile_sources(sources: &[(&str, &str)], config: &Config) -> Result<Assembly> {
    let owned: Vec<(String, String)> = sources
        .iter()
        .map(|(name, source)| (name.to_string(), source.to_string()))
        .collect();
    let outcome = compile_program(&owned, config);
    match outcome.assembly {
        Some(assembly) => Ok(assembly),
        None => Err(Error::Failed(
            outcome
                .diagnostics
                .into_iter()
                .filter(|d| d.severity == Severity::Error)
                .collect(),
        )),
    }
}

/// Compile a single source file; the file name is derived from the
/// declared type so the weeder's filename check holds.
pub fn compile_source(source: &str, config: &Config) -> Result<Assembly> {
    let name = guess_type_name(source).unwrap_or_else(|| "Main".to_string());
    compile_sources(&[(&format!("{name}.java"), source)], config)
}

/// Find the first declared type name, for deriving a file name in the
/// single-source API.
fn guess_type_name(source: &str) -> Option<String> {
    let mut tokens = source.split_whitespace().peekable();
    while let Some(token) = tokens.next() {
        if token == "class" || token == "interface" {
            let name = tokens.next()?;
            let name: String = name
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
                .collect();
            if !name.is_empty() {
                return Some(name);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_program_compiles() {
        let source = "public class A { public A() {} public static int test() { return 123; } }";
        let assembly = compile_source(source, &Config::default()).expect("compilation failed");
        assert!(assembly.iter().any(|(name, _)| name == "A.s"));
        assert!(assembly.iter().any(|(name, _)| name == "start.s"));
        let (_, start) = assembly.iter().find(|(name, _)| name == "start.s").unwrap();
        assert!(start.contains("_start:"));
        assert!(start.contains("call __debexit"));
    }

    #[test]
    fn guess_type_name_finds_class() {
        assert_eq!(
            guess_type_name("package p; public class Foo { }"),
            Some("Foo".to_string())
        );
        assert_eq!(
            guess_type_name("public interface Bar { }"),
            Some("Bar".to_string())
        );
    }

    #[test]
    fn diagnostics_carry_exit_codes() {
        let source = "public class A { public A() {} public static int test() { return x; } }";
        let outcome =
            compile_program(&[("A.java".to_string(), source.to_string())], &Config::default());
        assert_eq!(outcome.exit_code, crate::common::consts::EXIT_ERROR);
        assert!(outcome.assembly.is_none());
    }
}
