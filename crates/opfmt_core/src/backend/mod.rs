//! # opfmt backends
//! The two generators walk the same [`FormatPlan`] and emit the parse and
//! print programs; they must agree on element order and on each field's
//! length-kind representation so that what the printer emits the parser can
//! consume.
//!
//! Program instructions are self-contained: they carry field names, accessor
//! names, length kinds and resolver records, never target-language text. The
//! [`source`] backend is one possible renderer over them.

pub mod parsegen;
pub mod printgen;
pub mod source;

use crate::plan::{ElemKey, Element, FormatPlan};
use crate::schema::{LengthKind, Operation};

/// The compiled format: both programs, produced from one verified plan.
#[derive(Debug)]
pub struct CompiledFormat {
    pub parse: parsegen::ParseProgram,
    pub print: printgen::PrintProgram,
}

/// An operand or result reference carried by program instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub index: usize,
    pub name: String,
    pub getter: String,
    pub length: LengthKind,
}

/// How an attribute is parsed and printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrStyle {
    /// The generic attribute grammar (value, optionally `: type`).
    Generic,
    /// Keyword-or-string drawn from a closed set of values.
    Enum { values: Vec<String> },
    /// The symbol-name grammar.
    SymbolName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrRef {
    pub index: usize,
    pub name: String,
    pub getter: String,
    pub style: AttrStyle,
    /// Print/parse the fully-qualified form.
    pub qualified: bool,
    pub optional: bool,
    pub has_default: bool,
    /// The attribute's type can be rebuilt statically, so its trailing type
    /// is elided in text.
    pub buildable_type: bool,
    pub unit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropRef {
    pub index: usize,
    pub name: String,
    pub getter: String,
    pub has_default: bool,
    pub optional_parser: bool,
    pub unit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRef {
    pub index: usize,
    pub name: String,
    pub getter: String,
    pub variadic: bool,
    /// The region holds exactly one block.
    pub single_block: bool,
    /// The block's terminator may be elided in text and must be rebuilt.
    pub implicit_terminator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessorRef {
    pub index: usize,
    pub name: String,
    pub getter: String,
    pub variadic: bool,
}

/// The storage a `type`/`functional-type` directive reads or fills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTarget {
    Operand(FieldRef),
    Result(FieldRef),
    AllOperands,
    AllResults,
}

/// One argument of a `custom<..>(..)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomArg {
    Attribute(AttrRef),
    Property(PropRef),
    Operand(FieldRef),
    Region(RegionRef),
    Successor(SuccessorRef),
    AttrDict,
    PropDict,
    /// The all-of-a-kind directives, reachable through `ref(..)`.
    AllOperands,
    AllRegions,
    AllSuccessors,
    Str(String),
    TypeOf(TypeTarget),
    Ref(Box<CustomArg>),
}

pub(crate) fn operand_ref(op: &Operation, index: usize) -> FieldRef {
    let decl = &op.operands[index];
    FieldRef {
        index,
        name: decl.name.clone(),
        getter: op.getter_name(&decl.name),
        length: decl.length,
    }
}

pub(crate) fn result_ref(op: &Operation, index: usize) -> FieldRef {
    let decl = &op.results[index];
    FieldRef {
        index,
        name: decl.name.clone(),
        getter: op.getter_name(&decl.name),
        length: decl.length,
    }
}

pub(crate) fn attr_ref(op: &Operation, plan: &FormatPlan, key: ElemKey, index: usize) -> AttrRef {
    let decl = &op.attributes[index];
    let style = if let Some(values) = &decl.enum_values {
        AttrStyle::Enum {
            values: values.clone(),
        }
    } else if decl.symbol_name {
        AttrStyle::SymbolName
    } else {
        AttrStyle::Generic
    };
    AttrRef {
        index,
        name: decl.name.clone(),
        getter: op.getter_name(&decl.name),
        style,
        qualified: plan.is_qualified(key),
        optional: decl.optional,
        has_default: decl.default_value.is_some(),
        buildable_type: decl.type_builder.is_some(),
        unit: decl.unit,
    }
}

pub(crate) fn prop_ref(op: &Operation, index: usize) -> PropRef {
    let decl = &op.properties[index];
    PropRef {
        index,
        name: decl.name.clone(),
        getter: op.getter_name(&decl.name),
        has_default: decl.default_value.is_some(),
        optional_parser: decl.optional_parser,
        unit: decl.unit,
    }
}

pub(crate) fn region_ref(op: &Operation, index: usize) -> RegionRef {
    let decl = &op.regions[index];
    let implicit_terminator = op.has_implicit_terminator();
    RegionRef {
        index,
        name: decl.name.clone(),
        getter: op.getter_name(&decl.name),
        variadic: decl.variadic,
        single_block: implicit_terminator
            || op.has_trait(|t| matches!(t, crate::schema::OpTrait::SingleBlock)),
        implicit_terminator,
    }
}

pub(crate) fn successor_ref(op: &Operation, index: usize) -> SuccessorRef {
    let decl = &op.successors[index];
    SuccessorRef {
        index,
        name: decl.name.clone(),
        getter: op.getter_name(&decl.name),
        variadic: decl.variadic,
    }
}

/// Resolve a `type`/`functional-type` argument element to its target.
pub(crate) fn type_target(op: &Operation, plan: &FormatPlan, arg: ElemKey) -> TypeTarget {
    match &plan.node(arg).elem {
        Element::Operand { index } => TypeTarget::Operand(operand_ref(op, *index)),
        Element::Result { index } => TypeTarget::Result(result_ref(op, *index)),
        Element::Operands => TypeTarget::AllOperands,
        Element::Results => TypeTarget::AllResults,
        other => unreachable!("verified `type` argument, got {other:?}"),
    }
}

/// Convert a verified custom-directive argument element.
pub(crate) fn custom_arg(op: &Operation, plan: &FormatPlan, key: ElemKey) -> CustomArg {
    match &plan.node(key).elem {
        Element::Attribute { index } => CustomArg::Attribute(attr_ref(op, plan, key, *index)),
        Element::Property { index } => CustomArg::Property(prop_ref(op, *index)),
        Element::Operand { index } => CustomArg::Operand(operand_ref(op, *index)),
        Element::Region { index } => CustomArg::Region(region_ref(op, *index)),
        Element::Successor { index } => CustomArg::Successor(successor_ref(op, *index)),
        Element::AttrDict { .. } => CustomArg::AttrDict,
        Element::PropDict => CustomArg::PropDict,
        Element::Operands => CustomArg::AllOperands,
        Element::Regions => CustomArg::AllRegions,
        Element::Successors => CustomArg::AllSuccessors,
        Element::Str { value } => CustomArg::Str(value.clone()),
        Element::Type { arg } => CustomArg::TypeOf(type_target(op, plan, *arg)),
        Element::Ref { arg } => CustomArg::Ref(Box::new(custom_arg(op, plan, *arg))),
        other => unreachable!("verified custom argument, got {other:?}"),
    }
}

/// Gather the variable elements reachable from `key`. Used to decide which
/// fields witness an oilist clause's presence when printing.
pub(crate) fn collect_variables(plan: &FormatPlan, key: ElemKey, out: &mut Vec<ElemKey>) {
    match &plan.node(key).elem {
        Element::Attribute { .. }
        | Element::Property { .. }
        | Element::Operand { .. }
        | Element::Result { .. }
        | Element::Region { .. }
        | Element::Successor { .. } => out.push(key),
        Element::Custom { args, .. } => {
            for &arg in args {
                collect_variables(plan, arg, out);
            }
        }
        Element::Optional {
            then, otherwise, ..
        } => {
            for &el in then.iter().chain(otherwise) {
                collect_variables(plan, el, out);
            }
        }
        Element::Type { arg } | Element::Ref { arg } => collect_variables(plan, *arg, out),
        Element::FunctionalType { inputs, results } => {
            collect_variables(plan, *inputs, out);
            collect_variables(plan, *results, out);
        }
        Element::OIList { clauses } => {
            for clause in clauses {
                for &el in &clause.elements {
                    collect_variables(plan, el, out);
                }
            }
        }
        _ => {}
    }
}
