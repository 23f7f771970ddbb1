//! # opfmt_core
//! An offline compiler for declarative *assembly formats*: given one
//! operation's schema and a format string written against it, produce a
//! parse program and a print program that reconstruct and serialize the same
//! textual surface.
//!
//! Pipeline: [`schema`] (consumed, read-only) → format frontend (lexing,
//! parsing, verification) → [`plan::FormatPlan`] → the two generators in
//! [`backend`]. Each operation compiles independently; a verification failure
//! aborts only that operation.

mod frontend;

pub mod backend;
pub mod diag;
pub mod plan;
pub mod schema;

pub use backend::CompiledFormat;
pub use diag::{CompileError, Diagnostic, Severity, Span};

use schema::Operation;
use tracing::debug;

/// Compile one operation's assembly format into its two programs.
pub fn compile(op: &Operation, format: &str) -> Result<CompiledFormat, CompileError> {
    let plan = build_plan(op, format)?;
    let parse = backend::parsegen::generate(op, &plan);
    let print = backend::printgen::generate(op, &plan);
    debug!(
        op = %op.name,
        parse_steps = parse.steps.len(),
        print_steps = print.steps.len(),
        "assembly format compiled"
    );
    Ok(CompiledFormat { parse, print })
}

/// Run only the frontend, for callers that inspect resolver state or drive
/// the generators separately.
pub fn build_plan(op: &Operation, format: &str) -> Result<plan::FormatPlan, CompileError> {
    frontend::format::build_plan(op, format).map_err(CompileError::single)
}

/// What one failing operation means for the rest of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop compiling at the first failing operation.
    Fatal,
    /// Record the failure and keep compiling the remaining operations.
    Skip,
}

pub struct BatchOptions {
    pub error_policy: ErrorPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            error_policy: ErrorPolicy::Fatal,
        }
    }
}

/// Per-operation results of a batch compile. No state crosses operations:
/// one failure never corrupts another operation's output.
pub struct BatchOutcome {
    pub compiled: Vec<(String, CompiledFormat)>,
    pub failures: Vec<(String, CompileError)>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Compile a batch of (schema, format) pairs under the given error policy.
pub fn compile_batch<'a, I>(ops: I, options: &BatchOptions) -> BatchOutcome
where
    I: IntoIterator<Item = (&'a Operation, &'a str)>,
{
    let mut outcome = BatchOutcome {
        compiled: Vec::new(),
        failures: Vec::new(),
    };
    for (op, format) in ops {
        match compile(op, format) {
            Ok(compiled) => outcome.compiled.push((op.name.clone(), compiled)),
            Err(err) => {
                debug!(op = %op.name, "assembly format failed to compile");
                outcome.failures.push((op.name.clone(), err));
                if options.error_policy == ErrorPolicy::Fatal {
                    break;
                }
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValueDecl;

    fn good() -> Operation {
        Operation::new("test.good").operand(ValueDecl::single("x").with_buildable_type("int32"))
    }

    fn bad() -> Operation {
        // No attr-dict can save this: the operand is never bound.
        Operation::new("test.bad").operand(ValueDecl::single("x"))
    }

    #[test]
    fn fatal_policy_stops_at_the_first_failure() {
        let (good, bad) = (good(), bad());
        let batch = [(&bad, "attr-dict"), (&good, "$x attr-dict")];
        let outcome = compile_batch(batch, &BatchOptions::default());
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.compiled.is_empty());
    }

    #[test]
    fn skip_policy_compiles_the_rest() {
        let (good, bad) = (good(), bad());
        let batch = [(&bad, "attr-dict"), (&good, "$x attr-dict")];
        let outcome = compile_batch(
            batch,
            &BatchOptions {
                error_policy: ErrorPolicy::Skip,
            },
        );
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.compiled.len(), 1);
        assert_eq!(outcome.compiled[0].0, "test.good");
        assert!(!outcome.is_success());
    }
}
