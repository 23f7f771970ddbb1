//! # Parse-Program Generation
//! Walks the verified plan and emits the ordered instruction sequence a
//! backend renders into a parser. Instructions nest for optional groups and
//! order-independent clauses; the epilogue resolves types, attaches regions
//! and successors, and reconstructs segment-size bookkeeping.
//!
//! Anything reachable here that verification should have rejected is a
//! programming error in the generator, not a user diagnostic.

use crate::plan::{ElemKey, Element, FormatPlan, ResolvedSource, TypeResolution};
use crate::schema::{LengthKind, Operation};

use super::{
    attr_ref, custom_arg, operand_ref, prop_ref, region_ref, result_ref, successor_ref,
    type_target, AttrRef, CustomArg, FieldRef, PropRef, RegionRef, SuccessorRef, TypeTarget,
};

/// The parse program: instructions in surface order, then the epilogue.
#[derive(Debug, PartialEq, Eq)]
pub struct ParseProgram {
    pub steps: Vec<ParseStep>,
    /// Index-addressed pool of default-type expressions referenced by
    /// [`ResolutionSource::Buildable`].
    pub buildable_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStep {
    /// Require an identifier-like literal.
    Keyword { spelling: String },
    /// Require a punctuation literal.
    Token { spelling: String },

    Operand(FieldRef),
    OptionalOperand(FieldRef),
    OperandList(FieldRef),
    /// Variadic-of-variadic: repeated parenthesized groups.
    OperandGroups(FieldRef),
    AllOperands,

    /// Parse one type into the target's type storage.
    Type(TypeTarget),
    TypeList(TypeTarget),
    FunctionalType {
        inputs: TypeTarget,
        results: TypeTarget,
    },

    Attribute(AttrRef),
    Property(PropRef),
    AttrDict {
        with_keyword: bool,
    },
    PropDict,

    Region(RegionRef),
    RegionList(RegionRef),
    AllRegions {
        implicit_terminator: bool,
    },
    Successor(SuccessorRef),
    SuccessorList(SuccessorRef),
    AllSuccessors,

    Custom {
        name: String,
        args: Vec<CustomArg>,
    },

    Optional(OptionalParse),
    OrderIndependent {
        clauses: Vec<ParseClause>,
    },

    // --- epilogue ---
    /// Build every result type per its resolution record.
    ResolveResultTypes {
        resolutions: Vec<ValueResolution>,
    },
    /// Invoke the schema's whole-operation inference entry point instead.
    InferResultTypes,
    /// Resolve the collected operands against their reconstructed types.
    ResolveOperandTypes {
        resolutions: Vec<ValueResolution>,
    },
    AddRegions,
    AddSuccessors,
    /// Store one length per operand/result as the segment-size attribute or
    /// property, in declaration order.
    OperandSegmentSizes {
        fields: Vec<FieldRef>,
        as_property: bool,
    },
    ResultSegmentSizes {
        fields: Vec<FieldRef>,
        as_property: bool,
    },
    /// Store a variadic-of-variadic operand's per-group sizes.
    VariadicGroupSizes {
        value: FieldRef,
        attr: String,
    },
}

/// An optional group: try the probe; on success parse the remaining "then"
/// steps as required, otherwise take the else branch. `inverted` negates
/// which branch the anchor's presence selects when printing; the parse-side
/// probe is unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalParse {
    pub probe: Box<ParseStep>,
    pub then: Vec<ParseStep>,
    pub otherwise: Vec<ParseStep>,
    pub inverted: bool,
    /// A unit attribute/property anchor elided from the text: synthesize its
    /// value when the group is taken.
    pub synthesize: Option<UnitAnchor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitAnchor {
    Attribute(AttrRef),
    Property(PropRef),
}

/// One oilist clause: fires at most once when its keyword is seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseClause {
    pub keyword: String,
    pub steps: Vec<ParseStep>,
}

/// How one operand/result recovers its type in the epilogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueResolution {
    pub field: FieldRef,
    pub source: ResolutionSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Taken from this value's own parsed type storage.
    Parsed,
    /// Copied from another variable, optionally transformed (`$_self` is the
    /// source type).
    Variable {
        kind: SourceKind,
        index: usize,
        name: String,
        transformer: Option<String>,
    },
    /// Built from the buildable pool.
    Buildable(usize),
    /// Recovered by the whole-operation inference entry point.
    Inferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Operand,
    Result,
    Attribute,
}

/// Generate the parse program for a verified plan.
pub fn generate(op: &Operation, plan: &FormatPlan) -> ParseProgram {
    let mut steps = Vec::new();
    for &root in &plan.roots {
        gen_element(op, plan, root, &mut steps);
    }
    gen_epilogue(op, plan, &mut steps);
    ParseProgram {
        steps,
        buildable_types: plan.buildable_types.clone(),
    }
}

fn gen_element(op: &Operation, plan: &FormatPlan, key: ElemKey, steps: &mut Vec<ParseStep>) {
    match &plan.node(key).elem {
        // The parser has nothing to do for whitespace.
        Element::Space { .. } | Element::Newline => {}

        Element::Literal { spelling } => steps.push(literal_step(spelling)),

        Element::Operand { index } => {
            let field = operand_ref(op, *index);
            steps.push(match field.length {
                LengthKind::Single => ParseStep::Operand(field),
                LengthKind::Optional => ParseStep::OptionalOperand(field),
                LengthKind::Variadic => ParseStep::OperandList(field),
                LengthKind::VariadicOfVariadic => ParseStep::OperandGroups(field),
            });
        }
        Element::Operands => steps.push(ParseStep::AllOperands),

        Element::Attribute { index } => {
            steps.push(ParseStep::Attribute(attr_ref(op, plan, key, *index)));
        }
        Element::Property { index } => steps.push(ParseStep::Property(prop_ref(op, *index))),
        Element::AttrDict { with_keyword } => steps.push(ParseStep::AttrDict {
            with_keyword: *with_keyword,
        }),
        Element::PropDict => steps.push(ParseStep::PropDict),

        Element::Region { index } => {
            let region = region_ref(op, *index);
            steps.push(if region.variadic {
                ParseStep::RegionList(region)
            } else {
                ParseStep::Region(region)
            });
        }
        Element::Regions => steps.push(ParseStep::AllRegions {
            implicit_terminator: op.has_implicit_terminator(),
        }),
        Element::Successor { index } => {
            let succ = successor_ref(op, *index);
            steps.push(if succ.variadic {
                ParseStep::SuccessorList(succ)
            } else {
                ParseStep::Successor(succ)
            });
        }
        Element::Successors => steps.push(ParseStep::AllSuccessors),

        Element::Type { arg } => {
            let target = type_target(op, plan, *arg);
            steps.push(type_step(target));
        }
        Element::FunctionalType { inputs, results } => steps.push(ParseStep::FunctionalType {
            inputs: type_target(op, plan, *inputs),
            results: type_target(op, plan, *results),
        }),

        Element::Custom { name, args } => steps.push(ParseStep::Custom {
            name: name.clone(),
            args: args.iter().map(|&a| custom_arg(op, plan, a)).collect(),
        }),

        Element::Optional {
            then,
            otherwise,
            anchor,
            inverted,
        } => {
            steps.push(gen_optional(op, plan, then, otherwise, *anchor, *inverted));
        }

        Element::OIList { clauses } => {
            let clauses = clauses
                .iter()
                .map(|clause| {
                    let spelling = plan
                        .node(clause.literal)
                        .elem
                        .literal_spelling()
                        .expect("oilist clause keys are keyword literals")
                        .to_string();
                    let mut clause_steps = Vec::new();
                    for &el in &clause.elements {
                        gen_element(op, plan, el, &mut clause_steps);
                    }
                    ParseClause {
                        keyword: spelling,
                        steps: clause_steps,
                    }
                })
                .collect();
            steps.push(ParseStep::OrderIndependent { clauses });
        }

        other => unreachable!("element {other:?} cannot appear here after verification"),
    }
}

fn literal_step(spelling: &str) -> ParseStep {
    let keyword = spelling
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if keyword {
        ParseStep::Keyword {
            spelling: spelling.to_string(),
        }
    } else {
        ParseStep::Token {
            spelling: spelling.to_string(),
        }
    }
}

fn type_step(target: TypeTarget) -> ParseStep {
    match &target {
        TypeTarget::Operand(f) | TypeTarget::Result(f)
            if matches!(f.length, LengthKind::Single | LengthKind::Optional) =>
        {
            ParseStep::Type(target)
        }
        _ => ParseStep::TypeList(target),
    }
}

fn gen_optional(
    op: &Operation,
    plan: &FormatPlan,
    then: &[ElemKey],
    otherwise: &[ElemKey],
    anchor: ElemKey,
    inverted: bool,
) -> ParseStep {
    // The probe is the first parsable then-element.
    let probe_key = then
        .iter()
        .copied()
        .find(|&k| !plan.node(k).elem.is_whitespace())
        .expect("verified optional groups have a parsable element");

    // A unit-valued anchor that is not the probe never appears in the text:
    // it is synthesized when the group is taken.
    let synthesize = if anchor != probe_key {
        match &plan.node(anchor).elem {
            Element::Attribute { index } if op.attributes[*index].unit => Some(
                UnitAnchor::Attribute(attr_ref(op, plan, anchor, *index)),
            ),
            Element::Property { index } if op.properties[*index].unit => {
                Some(UnitAnchor::Property(prop_ref(op, *index)))
            }
            _ => None,
        }
    } else {
        None
    };

    let mut probe_steps = Vec::new();
    gen_element(op, plan, probe_key, &mut probe_steps);
    debug_assert_eq!(probe_steps.len(), 1);
    let probe = Box::new(probe_steps.remove(0));

    let mut then_steps = Vec::new();
    for &el in then {
        if el == probe_key || (synthesize.is_some() && el == anchor) {
            continue;
        }
        gen_element(op, plan, el, &mut then_steps);
    }

    let mut else_steps = Vec::new();
    for &el in otherwise {
        gen_element(op, plan, el, &mut else_steps);
    }

    ParseStep::Optional(OptionalParse {
        probe,
        then: then_steps,
        otherwise: else_steps,
        inverted,
        synthesize,
    })
}

fn gen_epilogue(op: &Operation, plan: &FormatPlan, steps: &mut Vec<ParseStep>) {
    // Result types first, then operand resolution, as the downstream builder
    // needs result types before the operands are resolved against theirs.
    if !op.results.is_empty() {
        if plan.infers_result_types {
            steps.push(ParseStep::InferResultTypes);
        } else {
            steps.push(ParseStep::ResolveResultTypes {
                resolutions: resolutions(op, &plan.result_types, |i| result_ref(op, i)),
            });
        }
    }
    if !op.operands.is_empty() {
        steps.push(ParseStep::ResolveOperandTypes {
            resolutions: resolutions(op, &plan.operand_types, |i| operand_ref(op, i)),
        });
    }
    if !op.regions.is_empty() {
        steps.push(ParseStep::AddRegions);
    }
    if !op.successors.is_empty() {
        steps.push(ParseStep::AddSuccessors);
    }

    if op.has_attr_sized_operand_segments() {
        steps.push(ParseStep::OperandSegmentSizes {
            fields: (0..op.operands.len()).map(|i| operand_ref(op, i)).collect(),
            as_property: op.uses_properties,
        });
    }
    if op.has_attr_sized_result_segments() {
        steps.push(ParseStep::ResultSegmentSizes {
            fields: (0..op.results.len()).map(|i| result_ref(op, i)).collect(),
            as_property: op.uses_properties,
        });
    }
    for (i, operand) in op.operands.iter().enumerate() {
        if let Some(attr) = &operand.segment_attr {
            if plan.inferred_attributes.iter().any(|a| a == attr) {
                steps.push(ParseStep::VariadicGroupSizes {
                    value: operand_ref(op, i),
                    attr: attr.clone(),
                });
            }
        }
    }
}

fn resolutions(
    op: &Operation,
    types: &[TypeResolution],
    field: impl Fn(usize) -> FieldRef,
) -> Vec<ValueResolution> {
    types
        .iter()
        .enumerate()
        .map(|(i, res)| ValueResolution {
            field: field(i),
            source: match res {
                TypeResolution::Parsed => ResolutionSource::Parsed,
                TypeResolution::Variable {
                    source,
                    transformer,
                } => {
                    let (kind, index, name) = match source {
                        ResolvedSource::Operand(j) => {
                            (SourceKind::Operand, *j, op.operands[*j].name.clone())
                        }
                        ResolvedSource::Result(j) => {
                            (SourceKind::Result, *j, op.results[*j].name.clone())
                        }
                        ResolvedSource::Attribute(j) => {
                            (SourceKind::Attribute, *j, op.attributes[*j].name.clone())
                        }
                    };
                    ResolutionSource::Variable {
                        kind,
                        index,
                        name,
                        transformer: transformer.clone(),
                    }
                }
                TypeResolution::Builder(idx) => ResolutionSource::Buildable(*idx),
                TypeResolution::Inferred => ResolutionSource::Inferred,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::format::build_plan;
    use crate::schema::{AttrDecl, OpTrait, ValueDecl};

    fn program(op: &Operation, format: &str) -> ParseProgram {
        let plan = build_plan(op, format).unwrap();
        generate(op, &plan)
    }

    #[test]
    fn binary_format_in_surface_order() {
        let op = Operation::new("test.add")
            .operand(ValueDecl::single("lhs"))
            .operand(ValueDecl::single("rhs"))
            .result(ValueDecl::single("out"))
            .with_trait(OpTrait::SameOperandsAndResultType);
        let prog = program(&op, "$lhs `,` $rhs attr-dict `:` type($lhs)");

        assert!(matches!(&prog.steps[0], ParseStep::Operand(f) if f.name == "lhs"));
        assert_eq!(
            prog.steps[1],
            ParseStep::Token {
                spelling: ",".into()
            }
        );
        assert!(matches!(&prog.steps[2], ParseStep::Operand(f) if f.name == "rhs"));
        assert!(matches!(
            prog.steps[3],
            ParseStep::AttrDict {
                with_keyword: false
            }
        ));
        assert!(matches!(
            &prog.steps[5],
            ParseStep::Type(TypeTarget::Operand(f)) if f.name == "lhs"
        ));

        // Epilogue: result types resolve from lhs via the trait, then the
        // operands resolve.
        match &prog.steps[6] {
            ParseStep::ResolveResultTypes { resolutions } => match &resolutions[0].source {
                ResolutionSource::Variable { kind, name, .. } => {
                    assert_eq!(*kind, SourceKind::Operand);
                    assert_eq!(name, "lhs");
                }
                other => panic!("unexpected resolution {other:?}"),
            },
            other => panic!("expected result resolution, got {other:?}"),
        }
        assert!(matches!(
            &prog.steps[7],
            ParseStep::ResolveOperandTypes { .. }
        ));
        assert_eq!(prog.steps.len(), 8);
    }

    #[test]
    fn variadic_lengths_pick_list_steps() {
        let op = Operation::new("test.call")
            .operand(ValueDecl::variadic("args"))
            .result(ValueDecl::variadic("outs"));
        let prog = program(
            &op,
            "`(` $args `)` attr-dict `:` functional-type($args, $outs)",
        );
        assert!(matches!(&prog.steps[1], ParseStep::OperandList(_)));
        assert!(matches!(&prog.steps[5], ParseStep::FunctionalType { .. }));
    }

    #[test]
    fn optional_group_probe_and_unit_anchor() {
        let op = Operation::new("test.flag")
            .attribute(AttrDecl::new("fast").unit())
            .operand(ValueDecl::variadic("args").with_buildable_type("int32"));
        let prog = program(&op, "(`fast` $fast^)? $args attr-dict");

        match &prog.steps[0] {
            ParseStep::Optional(opt) => {
                assert_eq!(
                    *opt.probe,
                    ParseStep::Keyword {
                        spelling: "fast".into()
                    }
                );
                // The unit anchor is elided from the parsed text.
                assert!(opt.then.is_empty());
                assert!(matches!(
                    &opt.synthesize,
                    Some(UnitAnchor::Attribute(a)) if a.name == "fast"
                ));
                assert!(!opt.inverted);
            }
            other => panic!("expected optional, got {other:?}"),
        }
    }

    #[test]
    fn oilist_clauses_keep_declaration_order() {
        let op = Operation::new("test.oi")
            .operand(ValueDecl::variadic("a").with_buildable_type("int32"))
            .operand(ValueDecl::variadic("b").with_buildable_type("int32"));
        let prog = program(&op, "oilist(`fst` $a | `snd` $b) attr-dict");
        match &prog.steps[0] {
            ParseStep::OrderIndependent { clauses } => {
                assert_eq!(clauses[0].keyword, "fst");
                assert_eq!(clauses[1].keyword, "snd");
                assert!(matches!(&clauses[0].steps[0], ParseStep::OperandList(f) if f.name == "a"));
            }
            other => panic!("expected oilist, got {other:?}"),
        }
    }

    #[test]
    fn variadic_of_variadic_reconstructs_group_sizes() {
        let op = Operation::new("test.vov").operand(
            ValueDecl::variadic_of_variadic("args", "args_sizes").with_buildable_type("int32"),
        );
        let prog = program(&op, "$args attr-dict");
        assert!(matches!(&prog.steps[0], ParseStep::OperandGroups(_)));
        assert!(prog.steps.iter().any(|s| matches!(
            s,
            ParseStep::VariadicGroupSizes { attr, .. } if attr == "args_sizes"
        )));
    }

    #[test]
    fn attr_sized_segments_follow_declaration_order() {
        let op = Operation::new("test.seg")
            .operand(ValueDecl::variadic("xs").with_buildable_type("int32"))
            .operand(ValueDecl::variadic("ys").with_buildable_type("int32"))
            .with_trait(OpTrait::AttrSizedOperandSegments);
        let prog = program(&op, "$xs `,` $ys attr-dict");
        match prog.steps.last().unwrap() {
            ParseStep::OperandSegmentSizes { fields, as_property } => {
                assert_eq!(fields[0].name, "xs");
                assert_eq!(fields[1].name, "ys");
                assert!(!as_property);
            }
            other => panic!("expected segment sizes, got {other:?}"),
        }
    }

    #[test]
    fn inference_mode_replaces_result_resolution() {
        let op = Operation::new("test.infer")
            .operand(ValueDecl::single("x"))
            .result(ValueDecl::single("r"))
            .with_trait(OpTrait::InferReturnTypes);
        let prog = program(&op, "$x attr-dict");
        assert!(prog
            .steps
            .iter()
            .any(|s| matches!(s, ParseStep::InferResultTypes)));
        assert!(!prog
            .steps
            .iter()
            .any(|s| matches!(s, ParseStep::ResolveResultTypes { .. })));
    }

    #[test]
    fn buildable_pool_rides_on_the_program() {
        let op = Operation::new("test.pool")
            .operand(ValueDecl::single("a").with_buildable_type("int32"))
            .operand(ValueDecl::single("b").with_buildable_type("int32"));
        let prog = program(&op, "$a $b attr-dict");
        assert_eq!(prog.buildable_types, vec!["int32"]);
        match &prog.steps[2] {
            ParseStep::ResolveOperandTypes { resolutions } => {
                assert_eq!(resolutions[0].source, ResolutionSource::Buildable(0));
                assert_eq!(resolutions[1].source, ResolutionSource::Buildable(0));
            }
            other => panic!("expected operand resolution, got {other:?}"),
        }
    }
}
