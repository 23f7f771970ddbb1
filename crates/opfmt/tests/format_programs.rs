//! End-to-end checks over the public API: compile formats against small
//! schemas and inspect the produced programs. The generated parser/printer
//! are never executed; the properties here are structural, asserting the two
//! programs stay mutually consistent.

use opfmt::backend::parsegen::ParseStep;
use opfmt::backend::printgen::PrintStep;
use opfmt::schema::{AttrDecl, OpTrait, Operation, RegionDecl, ValueDecl};
use pretty_assertions::assert_eq;

/// Field-reference order as seen by each program, for agreement checks.
fn parse_field_order(steps: &[ParseStep]) -> Vec<String> {
    let mut out = Vec::new();
    for step in steps {
        match step {
            ParseStep::Operand(f) | ParseStep::OptionalOperand(f) | ParseStep::OperandList(f) => {
                out.push(f.name.clone())
            }
            ParseStep::Attribute(a) => out.push(a.name.clone()),
            ParseStep::Region(r) | ParseStep::RegionList(r) => out.push(r.name.clone()),
            ParseStep::Successor(s) | ParseStep::SuccessorList(s) => out.push(s.name.clone()),
            _ => {}
        }
    }
    out
}

fn print_field_order(steps: &[PrintStep]) -> Vec<String> {
    let mut out = Vec::new();
    for step in steps {
        match step {
            PrintStep::Operand(f) | PrintStep::OperandList(f) => out.push(f.name.clone()),
            PrintStep::Attribute(a) => out.push(a.name.clone()),
            PrintStep::Region(r) | PrintStep::RegionList(r) => out.push(r.name.clone()),
            PrintStep::Successor(s) | PrintStep::SuccessorList(s) => out.push(s.name.clone()),
            _ => {}
        }
    }
    out
}

#[test]
fn parser_and_printer_agree_on_field_order() {
    let op = Operation::new("demo.store")
        .operand(ValueDecl::single("value"))
        .operand(ValueDecl::single("address").with_buildable_type("ptr"))
        .attribute(AttrDecl::new("volatile").with_type_builder("i1"))
        .region(RegionDecl::new("init"))
        .with_trait(OpTrait::SameTypeOperands);

    let compiled = opfmt::compile(
        &op,
        "$value `,` $address $volatile attr-dict-with-keyword $init `:` type($value)",
    )
    .unwrap();

    assert_eq!(
        parse_field_order(&compiled.parse.steps),
        print_field_order(&compiled.print.steps),
    );
    assert_eq!(
        parse_field_order(&compiled.parse.steps),
        vec!["value", "address", "volatile", "init"],
    );
}

#[test]
fn all_types_match_lets_covered_types_be_omitted() {
    let op = || {
        Operation::new("demo.select")
            .operand(ValueDecl::single("lhs"))
            .operand(ValueDecl::single("rhs"))
            .result(ValueDecl::single("out"))
            .with_trait(OpTrait::AllTypesMatch {
                values: vec!["lhs".into(), "rhs".into(), "out".into()],
            })
    };

    // One explicit binding carries the other two.
    assert!(opfmt::compile(&op(), "$lhs `,` $rhs attr-dict `:` type($lhs)").is_ok());

    // No binding anywhere: the types are unrecoverable.
    let err = opfmt::compile(&op(), "$lhs `,` $rhs attr-dict").unwrap_err();
    assert_eq!(err.diagnostics[0].code, 47);
}

#[test]
fn colon_ambiguity_is_fixed_by_qualification() {
    let op = || Operation::new("demo.cast").attribute(AttrDecl::new("kind"));

    let err = opfmt::compile(&op(), "$kind `:` attr-dict").unwrap_err();
    assert_eq!(err.diagnostics[0].code, 50);

    assert!(opfmt::compile(&op(), "qualified($kind) `:` attr-dict").is_ok());
}

#[test]
fn attr_dict_region_ambiguity_is_fixed_by_the_keyword_form() {
    let op = || Operation::new("demo.loop").region(RegionDecl::new("body"));

    let err = opfmt::compile(&op(), "attr-dict $body").unwrap_err();
    assert_eq!(err.diagnostics[0].code, 51);

    assert!(opfmt::compile(&op(), "attr-dict-with-keyword $body").is_ok());
}

#[test]
fn oilist_clauses_are_keyed_by_distinct_literals() {
    let op = || {
        Operation::new("demo.launch")
            .operand(ValueDecl::variadic("ins").with_buildable_type("index"))
            .operand(ValueDecl::variadic("outs").with_buildable_type("index"))
    };

    let err = opfmt::compile(&op(), "oilist(`foo` $ins | `foo` $outs) attr-dict").unwrap_err();
    assert_eq!(err.diagnostics[0].code, 52);

    let compiled = opfmt::compile(&op(), "oilist(`foo` $ins | `bar` $outs) attr-dict").unwrap();

    // The parse loop holds both clauses; runtime firing order does not
    // change which fields each clause fills.
    let clauses = compiled
        .parse
        .steps
        .iter()
        .find_map(|s| match s {
            ParseStep::OrderIndependent { clauses } => Some(clauses.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(clauses.len(), 2);
    assert!(matches!(&clauses[0].steps[0], ParseStep::OperandList(f) if f.name == "ins"));
    assert!(matches!(&clauses[1].steps[0], ParseStep::OperandList(f) if f.name == "outs"));

    // Printed clause order is declaration order, independent of parse order.
    let printed: Vec<String> = compiled
        .print
        .steps
        .iter()
        .filter_map(|s| match s {
            PrintStep::Conditional { then, .. } => then.iter().find_map(|t| match t {
                PrintStep::Literal { spelling } => Some(spelling.clone()),
                _ => None,
            }),
            _ => None,
        })
        .collect();
    assert_eq!(printed, vec!["foo", "bar"]);
}

#[test]
fn variadic_of_variadic_sizes_parse_but_never_print() {
    let op = Operation::new("demo.groups")
        .operand(ValueDecl::variadic_of_variadic("args", "args_sizes").with_buildable_type("i64"));
    let compiled = opfmt::compile(&op, "$args attr-dict").unwrap();

    // Parsing collects groups and records their sizes.
    assert!(matches!(&compiled.parse.steps[0], ParseStep::OperandGroups(_)));
    assert!(compiled.parse.steps.iter().any(|s| matches!(
        s,
        ParseStep::VariadicGroupSizes { attr, .. } if attr == "args_sizes"
    )));

    // Printing emits the groups; the sizes are reconstructed, not printed,
    // and the size attribute stays out of the dictionary.
    assert!(compiled
        .print
        .steps
        .iter()
        .any(|s| matches!(s, PrintStep::OperandGroups(_))));
    let elided = compiled
        .print
        .steps
        .iter()
        .find_map(|s| match s {
            PrintStep::AttrDict { elided, .. } => Some(elided.clone()),
            _ => None,
        })
        .unwrap();
    assert!(elided.contains(&"args_sizes".to_string()));
}

#[test]
fn rebinding_an_operand_errors_at_the_second_use() {
    let op = Operation::new("demo.dup").operand(ValueDecl::single("x").with_buildable_type("i32"));
    let err = opfmt::compile(&op, "$x `,` $x attr-dict").unwrap_err();
    let diag = &err.diagnostics[0];
    assert_eq!(diag.code, 20);
    assert_eq!(diag.span.start, 7);
    assert!(diag.message.contains("already bound"));
}

#[test]
fn batch_compilation_isolates_failures() {
    let good = Operation::new("demo.ok").operand(ValueDecl::single("x").with_buildable_type("i8"));
    let bad = Operation::new("demo.broken");

    let outcome = opfmt::compile_batch(
        [(&bad, "this is not a format"), (&good, "$x attr-dict")],
        &opfmt::BatchOptions {
            error_policy: opfmt::ErrorPolicy::Skip,
        },
    );
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.compiled.len(), 1);
    assert_eq!(outcome.compiled[0].0, "demo.ok");
}
