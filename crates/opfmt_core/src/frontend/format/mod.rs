//! # The assembly-format DSL
//!
//! A format string describes the textual syntax of one operation as a
//! sequence of elements:
//!
//! - **variables** — `$name`, referencing one schema field. Names resolve by
//!   probing operands, results, regions, successors, attributes, then
//!   properties; the first match wins. Result variables are only legal inside
//!   `type(...)`.
//! - **literals** — `` `keyword` `` or punctuation such as `` `,` ``; the
//!   whitespace literals `` ` ` ``, ```` `` ```` and `` `\n` `` force a
//!   space, suppress one, or break the line.
//! - **directives** — `attr-dict`/`attr-dict-with-keyword` (required exactly
//!   once), `prop-dict`, `operands`/`regions`/`successors` (all-of-a-kind,
//!   mutually exclusive with individual bindings), `type(..)`,
//!   `functional-type(ins, outs)`, `qualified(..)`, `custom<Name>(args..)`
//!   with `ref(..)` arguments, and `oilist(...)`.
//! - **optional groups** — `(` elements `)?` with one `^` anchor, an
//!   optional `: (else)` branch, and inversion when the anchor sits in the
//!   else branch.
//!
//! [`build_plan`] runs the full frontend: lex, parse (binding checks), then
//! verify (coverage, ambiguity, group legality, type resolution).

pub mod ast;
mod errors;
mod lexer;
mod parse;
mod resolve;
mod sem;

use crate::diag::Diagnostic;
use crate::plan::FormatPlan;
use crate::schema::Operation;

/// Parse and verify `format` against `op`'s schema.
pub fn build_plan(op: &Operation, format: &str) -> Result<FormatPlan, Diagnostic> {
    let (ast, bind) = parse::parse_format(op, format)?;
    sem::verify(op, format, ast, bind)
}
