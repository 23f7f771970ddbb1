//! # opfmt
//! Compile declarative *assembly formats* — strings like
//! ``$lhs `,` $rhs attr-dict `:` type($lhs)`` describing one operation's
//! textual syntax — into a pair of mutually-consistent programs: one that
//! parses the syntax back into the operation's fields, one that prints the
//! fields to the same surface.
//!
//! The compiler verifies the format against the operation's schema first:
//! every operand, region and successor must be covered, ambiguous surfaces
//! (a bare `:` after an untyped attribute, a region right after `attr-dict`)
//! are rejected, and every operand/result type must be recoverable — from an
//! explicit `type(..)` binding, a trait-derived resolver, a buildable
//! default, or whole-operation inference.
//!
//! ```
//! use opfmt::schema::{Operation, ValueDecl};
//!
//! let op = Operation::new("demo.add")
//!     .operand(ValueDecl::single("lhs"))
//!     .operand(ValueDecl::single("rhs").with_buildable_type("i32"))
//!     .result(ValueDecl::single("out").with_buildable_type("i32"));
//!
//! let compiled = opfmt::compile(&op, "$lhs `,` $rhs attr-dict `:` type($lhs)").unwrap();
//! assert!(!compiled.parse.steps.is_empty());
//! assert!(!compiled.print.steps.is_empty());
//! ```
//!
//! The programs are instruction sequences over abstract parse/print
//! primitives; [`backend::source`] renders them into Rust source for a
//! dialect runtime. See [`opfmt_core`] for the full pipeline.

pub use opfmt_core::{
    backend, build_plan, compile, compile_batch, diag, plan, schema, BatchOptions, BatchOutcome,
    CompileError, CompiledFormat, Diagnostic, ErrorPolicy, Severity, Span,
};
