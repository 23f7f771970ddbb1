//! # Format Plan
//! The output of verification: the (immutable) element arena plus annotation
//! side tables. Both generators read the same plan; nothing mutates it after
//! the verifier hands it over, so it is safe to share between them.
//!
//! Annotations are keyed by arena index rather than stored on the nodes, so
//! the AST built by the parser is never written to after construction.

use std::collections::HashSet;

use typed_generational_arena::StandardArena as GenArena;

pub use crate::frontend::format::ast::{ElemKey, Element, Node, OIListClause};

/// How one operand's or result's type is reconstructed when parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeResolution {
    /// Parsed directly: an explicit `type`/`functional-type` binding covers
    /// this value.
    Parsed,
    /// Copied from another variable's resolved type, optionally put through a
    /// transform expression (`$_self` is the source type).
    Variable {
        source: ResolvedSource,
        transformer: Option<String>,
    },
    /// Built from the buildable-type pool at the given index.
    Builder(usize),
    /// Covered by whole-operation return-type inference.
    Inferred,
}

/// The argument a trait-derived resolver copies its type from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedSource {
    Operand(usize),
    Result(usize),
    Attribute(usize),
}

/// The annotated format handed to the parser and printer generators.
#[derive(Debug)]
pub struct FormatPlan {
    pub elements: GenArena<Node>,
    pub roots: Vec<ElemKey>,
    /// Arena indices of attribute variables and `type` directives marked
    /// `qualified`.
    qualified: HashSet<usize>,

    /// One resolution per operand / per result, in declaration order.
    pub operand_types: Vec<TypeResolution>,
    pub result_types: Vec<TypeResolution>,
    /// Deduplicated, index-addressed pool of default-type expressions.
    pub buildable_types: Vec<String>,

    /// Attributes/properties explicitly referenced by the format. Anything
    /// not in here must come from the attribute/property dictionaries.
    pub used_attributes: HashSet<usize>,
    pub used_properties: HashSet<usize>,
    /// Auxiliary segment-size attributes whose values are reconstructed
    /// rather than parsed (variadic-of-variadic group sizes). Elided from
    /// dictionary printing.
    pub inferred_attributes: Vec<String>,

    pub all_operands: bool,
    pub all_operand_types: bool,
    pub all_result_types: bool,
    pub all_regions: bool,
    pub all_successors: bool,
    pub has_prop_dict: bool,
    /// Result types are recovered through the schema's inference entry point;
    /// they are never printed.
    pub infers_result_types: bool,
}

impl FormatPlan {
    pub fn node(&self, key: ElemKey) -> &Node {
        &self.elements[key]
    }

    pub fn is_qualified(&self, key: ElemKey) -> bool {
        self.qualified.contains(&key.arr_idx())
    }

    pub(crate) fn mark_qualified(&mut self, key: ElemKey) {
        self.qualified.insert(key.arr_idx());
    }

    pub(crate) fn empty() -> Self {
        FormatPlan {
            elements: GenArena::new(),
            roots: Vec::new(),
            qualified: HashSet::new(),
            operand_types: Vec::new(),
            result_types: Vec::new(),
            buildable_types: Vec::new(),
            used_attributes: HashSet::new(),
            used_properties: HashSet::new(),
            inferred_attributes: Vec::new(),
            all_operands: false,
            all_operand_types: false,
            all_result_types: false,
            all_regions: false,
            all_successors: false,
            has_prop_dict: false,
            infers_result_types: false,
        }
    }
}
