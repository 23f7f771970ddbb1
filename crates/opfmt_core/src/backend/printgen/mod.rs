//! # Print-Program Generation
//! Walks the same verified plan as [`super::parsegen`] and emits the printing
//! instruction sequence. Spacing is decided here: the generator tracks a
//! "should emit space" / "last was punctuation" pair per element and inserts
//! explicit [`PrintStep::Space`] instructions, so the rendered output matches
//! conventional surface spacing without the format author writing spaces.
//!
//! Optional groups and oilist clauses become [`PrintStep::Conditional`]
//! blocks whose presence predicates are the inverse-consistent counterparts
//! of the parser's probes. Oilist clauses always print in declaration order.

use crate::plan::{ElemKey, Element, FormatPlan};
use crate::schema::{LengthKind, Operation};

use super::{
    attr_ref, collect_variables, custom_arg, operand_ref, prop_ref, region_ref, result_ref,
    successor_ref, type_target, AttrRef, CustomArg, FieldRef, PropRef, RegionRef, SuccessorRef,
    TypeTarget,
};

#[derive(Debug, PartialEq, Eq)]
pub struct PrintProgram {
    pub steps: Vec<PrintStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintStep {
    Literal { spelling: String },
    Space,
    Newline,

    Operand(FieldRef),
    OperandList(FieldRef),
    /// Variadic-of-variadic: parenthesized groups, sizes from the segment
    /// attribute.
    OperandGroups(FieldRef),
    AllOperands,

    Type { target: TypeTarget, qualified: bool },
    TypeList { target: TypeTarget },
    FunctionalType { inputs: TypeTarget, results: TypeTarget },

    Attribute(AttrRef),
    Property(PropRef),
    /// Print the attribute dictionary, eliding `elided` outright and the
    /// `elide_if_default` entries whose current value equals their declared
    /// default.
    AttrDict {
        with_keyword: bool,
        elided: Vec<String>,
        elide_if_default: Vec<String>,
    },
    PropDict {
        elided: Vec<String>,
        elide_if_default: Vec<String>,
    },

    Region(RegionRef),
    RegionList(RegionRef),
    AllRegions { implicit_terminator: bool },
    Successor(SuccessorRef),
    SuccessorList(SuccessorRef),
    AllSuccessors,

    Custom { name: String, args: Vec<CustomArg> },

    /// Emit `then` when `predicate` holds, `otherwise` when it does not.
    Conditional {
        predicate: Predicate,
        then: Vec<PrintStep>,
        otherwise: Vec<PrintStep>,
    },
}

/// Runtime presence test over one or more fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Attribute present (and, for defaulted attributes, not equal to its
    /// default).
    AttrPresent(AttrRef),
    PropNonDefault(PropRef),
    OperandNonEmpty(FieldRef),
    ResultNonEmpty(FieldRef),
    RegionNonEmpty(RegionRef),
    SuccessorNonEmpty(SuccessorRef),
    AnyOf(Vec<Predicate>),
    Not(Box<Predicate>),
}

/// Generate the print program for a verified plan.
pub fn generate(op: &Operation, plan: &FormatPlan) -> PrintProgram {
    let mut gen = PrinterGen {
        op,
        plan,
        should_emit_space: true,
        last_was_punctuation: false,
    };
    let mut steps = Vec::new();
    for &root in &plan.roots {
        gen.gen_element(root, &mut steps);
    }
    PrintProgram { steps }
}

struct PrinterGen<'a> {
    op: &'a Operation,
    plan: &'a FormatPlan,
    should_emit_space: bool,
    last_was_punctuation: bool,
}

/// Whether a space belongs before this literal given what was just printed.
fn should_emit_space_before(value: &str, last_was_punctuation: bool) -> bool {
    if value.len() != 1 && value != "->" {
        return true;
    }
    let front = value.chars().next().unwrap();
    if last_was_punctuation {
        !">)}],".contains(front)
    } else {
        !"<>(){}[],".contains(front) && value != "->"
    }
}

impl<'a> PrinterGen<'a> {
    // Tied to the plan's lifetime so element refs stay live across the
    // generator's own state updates.
    fn elem(&self, key: ElemKey) -> &'a Element {
        &self.plan.node(key).elem
    }

    /// Space bookkeeping shared by every non-literal, non-whitespace element.
    fn spaced(&mut self, steps: &mut Vec<PrintStep>, step: PrintStep) {
        if self.should_emit_space {
            steps.push(PrintStep::Space);
        }
        steps.push(step);
        self.should_emit_space = true;
        self.last_was_punctuation = false;
    }

    fn gen_element(&mut self, key: ElemKey, steps: &mut Vec<PrintStep>) {
        match self.elem(key) {
            Element::Literal { spelling } => {
                if self.should_emit_space
                    && should_emit_space_before(spelling, self.last_was_punctuation)
                {
                    steps.push(PrintStep::Space);
                }
                steps.push(PrintStep::Literal {
                    spelling: spelling.clone(),
                });
                let front = spelling.chars().next().unwrap();
                self.should_emit_space = !(spelling.len() == 1 && "<({[".contains(front));
                self.last_was_punctuation = front != '_' && !front.is_ascii_alphabetic();
            }
            Element::Space { value } => {
                if *value {
                    steps.push(PrintStep::Space);
                    self.last_was_punctuation = false;
                } else {
                    self.last_was_punctuation = true;
                }
                self.should_emit_space = false;
            }
            Element::Newline => {
                steps.push(PrintStep::Newline);
                self.should_emit_space = false;
                self.last_was_punctuation = false;
            }

            Element::Operand { index } => {
                let field = operand_ref(self.op, *index);
                let step = match field.length {
                    LengthKind::VariadicOfVariadic => PrintStep::OperandGroups(field),
                    LengthKind::Single => PrintStep::Operand(field),
                    _ => PrintStep::OperandList(field),
                };
                self.spaced(steps, step);
            }
            Element::Operands => self.spaced(steps, PrintStep::AllOperands),

            Element::Attribute { index } => {
                let attr = attr_ref(self.op, self.plan, key, *index);
                self.spaced(steps, PrintStep::Attribute(attr));
            }
            Element::Property { index } => {
                let prop = prop_ref(self.op, *index);
                self.spaced(steps, PrintStep::Property(prop));
            }

            // The dictionary printers lead with their own separator; no
            // space step, and the flags carry across unchanged.
            Element::AttrDict { with_keyword } => {
                steps.push(PrintStep::AttrDict {
                    with_keyword: *with_keyword,
                    elided: self.elided_attributes(),
                    elide_if_default: self.default_valued_attributes(),
                });
            }
            Element::PropDict => {
                steps.push(PrintStep::PropDict {
                    elided: self.elided_properties(),
                    elide_if_default: self.default_valued_properties(),
                });
            }

            Element::Region { index } => {
                let region = region_ref(self.op, *index);
                let step = if region.variadic {
                    PrintStep::RegionList(region)
                } else {
                    PrintStep::Region(region)
                };
                self.spaced(steps, step);
            }
            Element::Regions => self.spaced(
                steps,
                PrintStep::AllRegions {
                    implicit_terminator: self.op.has_implicit_terminator(),
                },
            ),
            Element::Successor { index } => {
                let succ = successor_ref(self.op, *index);
                let step = if succ.variadic {
                    PrintStep::SuccessorList(succ)
                } else {
                    PrintStep::Successor(succ)
                };
                self.spaced(steps, step);
            }
            Element::Successors => self.spaced(steps, PrintStep::AllSuccessors),

            Element::Type { arg } => {
                let target = type_target(self.op, self.plan, *arg);
                let qualified = self.plan.is_qualified(key);
                let step = match &target {
                    TypeTarget::Operand(f) | TypeTarget::Result(f)
                        if matches!(f.length, LengthKind::Single | LengthKind::Optional) =>
                    {
                        PrintStep::Type { target, qualified }
                    }
                    _ => PrintStep::TypeList { target },
                };
                self.spaced(steps, step);
            }
            Element::FunctionalType { inputs, results } => {
                let step = PrintStep::FunctionalType {
                    inputs: type_target(self.op, self.plan, *inputs),
                    results: type_target(self.op, self.plan, *results),
                };
                self.spaced(steps, step);
            }

            Element::Custom { name, args } => {
                let step = PrintStep::Custom {
                    name: name.clone(),
                    args: args
                        .iter()
                        .map(|&a| custom_arg(self.op, self.plan, a))
                        .collect(),
                };
                self.spaced(steps, step);
            }

            Element::Optional {
                then,
                otherwise,
                anchor,
                inverted,
            } => {
                let mut predicate = self.presence_predicate(*anchor);
                if *inverted {
                    predicate = Predicate::Not(Box::new(predicate));
                }

                // A unit-valued anchor that does not gate the probe never
                // appears in the printed text either.
                let probe_key = then
                    .iter()
                    .copied()
                    .find(|&k| !self.elem(k).is_whitespace());
                let elide_anchor = probe_key != Some(*anchor) && self.is_unit_anchor(*anchor);

                let mut then_steps = Vec::new();
                for &el in then {
                    if elide_anchor && el == *anchor {
                        continue;
                    }
                    self.gen_element(el, &mut then_steps);
                }
                let mut else_steps = Vec::new();
                for &el in otherwise {
                    if el == *anchor && self.is_unit_anchor(*anchor) {
                        continue;
                    }
                    self.gen_element(el, &mut else_steps);
                }

                steps.push(PrintStep::Conditional {
                    predicate,
                    then: then_steps,
                    otherwise: else_steps,
                });
            }

            Element::OIList { clauses } => {
                // Emission always follows declaration order, regardless of
                // the order clauses fired at parse time.
                for clause in clauses {
                    let mut vars = Vec::new();
                    for &el in &clause.elements {
                        collect_variables(self.plan, el, &mut vars);
                    }
                    let predicate = Predicate::AnyOf(
                        vars.iter().map(|&v| self.presence_predicate(v)).collect(),
                    );

                    let mut clause_steps = Vec::new();
                    self.gen_element(clause.literal, &mut clause_steps);
                    for &el in &clause.elements {
                        self.gen_element(el, &mut clause_steps);
                    }
                    steps.push(PrintStep::Conditional {
                        predicate,
                        then: clause_steps,
                        otherwise: Vec::new(),
                    });
                }
            }

            other => unreachable!("element {other:?} cannot appear here after verification"),
        }
    }

    fn is_unit_anchor(&self, anchor: ElemKey) -> bool {
        match self.elem(anchor) {
            Element::Attribute { index } => self.op.attributes[*index].unit,
            Element::Property { index } => self.op.properties[*index].unit,
            _ => false,
        }
    }

    /// The printer-side counterpart of the parser's optional probe.
    fn presence_predicate(&self, key: ElemKey) -> Predicate {
        match self.elem(key) {
            Element::Attribute { index } => {
                Predicate::AttrPresent(attr_ref(self.op, self.plan, key, *index))
            }
            Element::Property { index } => {
                Predicate::PropNonDefault(prop_ref(self.op, *index))
            }
            Element::Operand { index } => {
                Predicate::OperandNonEmpty(operand_ref(self.op, *index))
            }
            Element::Result { index } => Predicate::ResultNonEmpty(result_ref(self.op, *index)),
            Element::Region { index } => Predicate::RegionNonEmpty(region_ref(self.op, *index)),
            Element::Successor { index } => {
                Predicate::SuccessorNonEmpty(successor_ref(self.op, *index))
            }
            Element::Type { arg } => self.presence_predicate(*arg),
            Element::FunctionalType { inputs, .. } => self.presence_predicate(*inputs),
            Element::Custom { args, .. } => Predicate::AnyOf(
                args.iter()
                    .filter(|&&a| !matches!(self.elem(a), Element::Ref { .. }))
                    .map(|&a| self.presence_predicate(a))
                    .collect(),
            ),
            other => unreachable!("element {other:?} cannot anchor an optional group"),
        }
    }

    /// Attributes never printed by the dictionary: those the format prints
    /// elsewhere, and the inferred segment-size attributes.
    fn elided_attributes(&self) -> Vec<String> {
        let mut elided: Vec<String> = self
            .op
            .attributes
            .iter()
            .enumerate()
            .filter(|(i, _)| self.plan.used_attributes.contains(i))
            .map(|(_, a)| a.name.clone())
            .collect();
        elided.extend(self.plan.inferred_attributes.iter().cloned());
        if !self.op.uses_properties {
            if self.op.has_attr_sized_operand_segments() {
                elided.push("operand_segment_sizes".to_string());
            }
            if self.op.has_attr_sized_result_segments() {
                elided.push("result_segment_sizes".to_string());
            }
        }
        elided
    }

    fn default_valued_attributes(&self) -> Vec<String> {
        self.op
            .attributes
            .iter()
            .enumerate()
            .filter(|(i, a)| {
                a.default_value.is_some() && !self.plan.used_attributes.contains(i)
            })
            .map(|(_, a)| a.name.clone())
            .collect()
    }

    fn elided_properties(&self) -> Vec<String> {
        let mut elided: Vec<String> = self
            .op
            .properties
            .iter()
            .enumerate()
            .filter(|(i, _)| self.plan.used_properties.contains(i))
            .map(|(_, p)| p.name.clone())
            .collect();
        if self.op.uses_properties {
            if self.op.has_attr_sized_operand_segments() {
                elided.push("operand_segment_sizes".to_string());
            }
            if self.op.has_attr_sized_result_segments() {
                elided.push("result_segment_sizes".to_string());
            }
        }
        elided
    }

    fn default_valued_properties(&self) -> Vec<String> {
        self.op
            .properties
            .iter()
            .enumerate()
            .filter(|(i, p)| {
                p.default_value.is_some() && !self.plan.used_properties.contains(i)
            })
            .map(|(_, p)| p.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::format::build_plan;
    use crate::schema::{AttrDecl, OpTrait, ValueDecl};

    fn program(op: &Operation, format: &str) -> PrintProgram {
        let plan = build_plan(op, format).unwrap();
        generate(op, &plan)
    }

    #[test]
    fn literal_spacing_follows_surface_conventions() {
        let op = Operation::new("test.call")
            .operand(ValueDecl::variadic("args"))
            .result(ValueDecl::variadic("outs"));
        let prog = program(
            &op,
            "`(` $args `)` attr-dict `:` functional-type($args, $outs)",
        );

        // No space around `(`; none before `)` either.
        assert_eq!(
            prog.steps[0],
            PrintStep::Literal {
                spelling: "(".into()
            }
        );
        assert!(matches!(&prog.steps[1], PrintStep::OperandList(_)));
        assert_eq!(
            prog.steps[2],
            PrintStep::Literal {
                spelling: ")".into()
            }
        );
        // `:` after the dictionary gets its space back.
        assert!(matches!(&prog.steps[3], PrintStep::AttrDict { .. }));
        assert_eq!(prog.steps[4], PrintStep::Space);
        assert_eq!(
            prog.steps[5],
            PrintStep::Literal {
                spelling: ":".into()
            }
        );
        assert_eq!(prog.steps[6], PrintStep::Space);
        assert!(matches!(&prog.steps[7], PrintStep::FunctionalType { .. }));
    }

    #[test]
    fn keyword_literals_force_spaces() {
        let op = Operation::new("test.kw").operand(ValueDecl::single("x").with_buildable_type("int32"));
        let prog = program(&op, "`from` $x attr-dict");
        assert_eq!(prog.steps[0], PrintStep::Space);
        assert_eq!(
            prog.steps[1],
            PrintStep::Literal {
                spelling: "from".into()
            }
        );
        // A space separates the keyword from the operand too.
        assert_eq!(prog.steps[2], PrintStep::Space);
        assert!(matches!(&prog.steps[3], PrintStep::Operand(_)));
    }

    #[test]
    fn optional_group_prints_on_the_anchor_predicate() {
        let op = Operation::new("test.opt")
            .attribute(AttrDecl::new("pred").optional())
            .operand(ValueDecl::variadic("args").with_buildable_type("int32"));
        let prog = program(&op, "(`pred` $pred^)? $args attr-dict");

        match &prog.steps[0] {
            PrintStep::Conditional {
                predicate,
                then,
                otherwise,
            } => {
                assert!(matches!(
                    predicate,
                    Predicate::AttrPresent(a) if a.name == "pred"
                ));
                assert!(otherwise.is_empty());
                assert!(then
                    .iter()
                    .any(|s| matches!(s, PrintStep::Literal { spelling } if spelling == "pred")));
                assert!(then.iter().any(|s| matches!(
                    s,
                    PrintStep::Attribute(a) if a.name == "pred"
                )));
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn inverted_anchor_negates_the_predicate() {
        let op = Operation::new("test.inv")
            .operand(ValueDecl::variadic("args").with_buildable_type("int32"));
        let prog = program(&op, "(`none`) : ($args^)? attr-dict");
        match &prog.steps[0] {
            PrintStep::Conditional { predicate, .. } => {
                assert!(matches!(predicate, Predicate::Not(_)));
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn unit_anchor_never_prints() {
        let op = Operation::new("test.flag")
            .attribute(AttrDecl::new("fast").unit())
            .operand(ValueDecl::variadic("args").with_buildable_type("int32"));
        let prog = program(&op, "(`fast` $fast^)? $args attr-dict");
        match &prog.steps[0] {
            PrintStep::Conditional { then, .. } => {
                assert!(!then
                    .iter()
                    .any(|s| matches!(s, PrintStep::Attribute(_))));
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn oilist_clauses_emit_in_declaration_order() {
        let op = Operation::new("test.oi")
            .operand(ValueDecl::variadic("a").with_buildable_type("int32"))
            .operand(ValueDecl::variadic("b").with_buildable_type("int32"));
        let prog = program(&op, "oilist(`fst` $a | `snd` $b) attr-dict");

        let keywords: Vec<_> = prog
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
        assert_eq!(keywords, vec!["fst", "snd"]);

        // Each clause is gated on its own fields.
        match &prog.steps[0] {
            PrintStep::Conditional { predicate, .. } => match predicate {
                Predicate::AnyOf(ps) => {
                    assert!(matches!(&ps[0], Predicate::OperandNonEmpty(f) if f.name == "a"));
                }
                other => panic!("expected any-of, got {other:?}"),
            },
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn attr_dict_elides_bound_and_segment_attributes() {
        let op = Operation::new("test.elide")
            .attribute(AttrDecl::new("kept").with_type_builder("int1"))
            .attribute(AttrDecl::new("defaulted").with_default("0"))
            .operand(
                ValueDecl::variadic_of_variadic("args", "args_sizes").with_buildable_type("int32"),
            )
            .with_trait(OpTrait::AttrSizedOperandSegments);
        let prog = program(&op, "$kept $args attr-dict");

        let dict = prog
            .steps
            .iter()
            .find_map(|s| match s {
                PrintStep::AttrDict {
                    elided,
                    elide_if_default,
                    ..
                } => Some((elided.clone(), elide_if_default.clone())),
                _ => None,
            })
            .unwrap();
        assert!(dict.0.contains(&"kept".to_string()));
        assert!(dict.0.contains(&"args_sizes".to_string()));
        assert!(dict.0.contains(&"operand_segment_sizes".to_string()));
        assert_eq!(dict.1, vec!["defaulted"]);
    }

    #[test]
    fn inference_mode_prints_no_result_types() {
        let op = Operation::new("test.infer")
            .operand(ValueDecl::single("x"))
            .result(ValueDecl::single("r"))
            .with_trait(OpTrait::InferReturnTypes);
        let prog = program(&op, "$x attr-dict");
        assert!(!prog.steps.iter().any(|s| matches!(
            s,
            PrintStep::Type { .. } | PrintStep::TypeList { .. } | PrintStep::FunctionalType { .. }
        )));
    }
}
