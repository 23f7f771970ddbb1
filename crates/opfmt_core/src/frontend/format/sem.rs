//! # Format Verification
//! Validates a parsed format against the schema and assembles the
//! [`FormatPlan`]. Checks run in a fixed order and the first failure aborts
//! this operation's compilation:
//!
//! 1. coverage (attr-dict present, every operand/region/successor bound),
//! 2. `:`-after-untyped-attribute ambiguity,
//! 3. attr-dict-then-region ambiguity,
//! 4. oilist literal collisions,
//! 5. optional-group legality,
//! 6. oilist parsing-group legality,
//! 7. type resolvability (via [`super::resolve`]).
//!
//! The two ambiguity checks are instantiations of one generic adjacency scan
//! over the element tree.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::diag::{Diagnostic, Span};
use crate::plan::{ElemKey, Element, FormatPlan, TypeResolution};
use crate::schema::{LengthKind, Operation};

use super::ast::Ast;
use super::errors;
use super::parse::Bindings;
use super::resolve;

/// Verify the parsed format and build the plan both generators consume.
pub fn verify(
    op: &Operation,
    format: &str,
    ast: Ast,
    bind: Bindings,
) -> Result<FormatPlan, Diagnostic> {
    let whole = Span::whole(format);

    if !bind.has_attr_dict {
        return Err(errors::attr_dict_missing(whole));
    }

    let qualified: HashSet<usize> = ast.qualified.iter().map(|k| k.arr_idx()).collect();
    let v = Verifier {
        op,
        ast: &ast,
        bind: &bind,
        qualified: &qualified,
    };

    v.verify_coverage(whole)?;
    v.verify_attribute_colon()?;
    v.verify_attr_dict_region()?;
    v.verify_oilist_literals()?;
    for &root in &ast.roots {
        v.verify_group_legality(root)?;
    }
    v.verify_oilist_groups()?;
    let types = v.verify_types(whole)?;

    trace!(
        op = %op.name,
        buildable = types.buildable.len(),
        infers = types.infers_result_types,
        "format verified"
    );

    let mut plan = FormatPlan::empty();
    plan.elements = ast.elements;
    plan.roots = ast.roots;
    for key in ast.qualified {
        plan.mark_qualified(key);
    }
    plan.operand_types = types.operands;
    plan.result_types = types.results;
    plan.buildable_types = types.buildable;
    plan.infers_result_types = types.infers_result_types;
    plan.used_attributes = bind.seen_attrs.clone();
    plan.used_properties = bind.seen_props.clone();
    plan.inferred_attributes = op
        .operands
        .iter()
        .enumerate()
        .filter(|(i, decl)| {
            bind.seen_operands.contains(i) && decl.length == LengthKind::VariadicOfVariadic
        })
        .filter_map(|(_, decl)| decl.segment_attr.clone())
        .collect();
    plan.all_operands = bind.all_operands;
    plan.all_operand_types = bind.all_operand_types;
    plan.all_result_types = bind.all_result_types;
    plan.all_regions = bind.all_regions;
    plan.all_successors = bind.all_successors;
    plan.has_prop_dict = bind.has_prop_dict;
    Ok(plan)
}

struct ResolvedTypes {
    operands: Vec<TypeResolution>,
    results: Vec<TypeResolution>,
    buildable: Vec<String>,
    infers_result_types: bool,
}

struct Verifier<'a> {
    op: &'a Operation,
    ast: &'a Ast,
    bind: &'a Bindings,
    qualified: &'a HashSet<usize>,
}

impl<'a> Verifier<'a> {
    fn elem(&self, key: ElemKey) -> &Element {
        &self.ast.node(key).elem
    }

    fn span(&self, key: ElemKey) -> Span {
        self.ast.node(key).span
    }

    // --- 1. coverage ---

    fn verify_coverage(&self, whole: Span) -> Result<(), Diagnostic> {
        for (i, operand) in self.op.operands.iter().enumerate() {
            if !self.bind.all_operands && !self.bind.seen_operands.contains(&i) {
                return Err(errors::unbound_argument("operand", i, &operand.name, whole));
            }
        }
        if !self.bind.all_regions {
            for (i, region) in self.op.regions.iter().enumerate() {
                if !self.bind.seen_regions.contains(&i) {
                    return Err(errors::unbound_argument("region", i, &region.name, whole));
                }
            }
        }
        if !self.bind.all_successors {
            for (i, successor) in self.op.successors.iter().enumerate() {
                if !self.bind.seen_successors.contains(&i) {
                    return Err(errors::unbound_argument(
                        "successor",
                        i,
                        &successor.name,
                        whole,
                    ));
                }
            }
        }
        Ok(())
    }

    // --- the generic adjacency scan (checks 2 and 3) ---

    /// Whether the absence of this element at parse time is syntactically
    /// legal, i.e. the scan may skip over it.
    fn is_optionally_parsed(&self, key: ElemKey) -> bool {
        match self.elem(key) {
            Element::Attribute { index } => self.op.attributes[*index].is_optionally_parsed(),
            Element::Property { index } => self.op.properties[*index].is_optionally_parsed(),
            Element::Operand { index } => self.op.operands[*index].length.is_variable(),
            Element::Region { index } => self.op.regions[*index].variadic,
            Element::Successor { index } => self.op.successors[*index].variadic,
            Element::Space { .. } | Element::Newline | Element::AttrDict { .. } => true,
            _ => false,
        }
    }

    /// Scan `range` for an element that `is_invalid` pairs with `base`,
    /// skipping optionally-parsed elements and recursing into optional
    /// groups. `Ok(true)` means a required element closed the range;
    /// `Ok(false)` means scanning reached the end.
    ///
    /// The guard element of an optional group is required even when its kind
    /// would otherwise be skippable.
    fn check_range(
        &self,
        base: ElemKey,
        is_invalid: &dyn Fn(&Self, ElemKey, ElemKey) -> Option<Diagnostic>,
        range: &[ElemKey],
        guard: Option<ElemKey>,
    ) -> Result<bool, Diagnostic> {
        for &el in range {
            if let Some(err) = is_invalid(self, base, el) {
                return Err(err);
            }

            if let Element::Optional {
                then, otherwise, ..
            } = self.elem(el)
            {
                self.check_range(base, is_invalid, then, then.first().copied())?;
                self.check_range(base, is_invalid, otherwise, None)?;
                continue;
            }

            if Some(el) != guard && self.is_optionally_parsed(el) {
                continue;
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Run the scan from every base element in `elements`, recursing into
    /// optional groups. Returns an unverified base whose scan reached the end
    /// of `elements`, so callers can continue it in the enclosing range.
    fn verify_adjacent(
        &self,
        is_base: &dyn Fn(&Self, ElemKey) -> bool,
        is_invalid: &dyn Fn(&Self, ElemKey, ElemKey) -> Option<Diagnostic>,
        elements: &[ElemKey],
    ) -> Result<Option<ElemKey>, Diagnostic> {
        for (i, &el) in elements.iter().enumerate() {
            let base = if is_base(self, el) {
                el
            } else if let Element::Optional {
                then, otherwise, ..
            } = self.elem(el)
            {
                let from_then = self.verify_adjacent(is_base, is_invalid, then)?;
                let from_else = self.verify_adjacent(is_base, is_invalid, otherwise)?;
                match from_then.or(from_else) {
                    Some(unverified) => unverified,
                    None => continue,
                }
            } else {
                continue;
            };

            if !self.check_range(base, is_invalid, &elements[i + 1..], None)? {
                return Ok(Some(base));
            }
        }
        Ok(None)
    }

    // --- 2. `:` after an attribute without a buildable type ---

    fn verify_attribute_colon(&self) -> Result<(), Diagnostic> {
        // Only attributes parsed through the generic attribute grammar can
        // swallow a trailing `: type`. Unit, enum-like and symbol-name
        // attributes never reach that grammar, and a qualified attribute
        // prints its full form.
        let is_base = |v: &Self, key: ElemKey| match v.elem(key) {
            Element::Attribute { index } => {
                let attr = &v.op.attributes[*index];
                attr.type_builder.is_none()
                    && !attr.unit
                    && attr.enum_values.is_none()
                    && !attr.symbol_name
                    && !v.qualified.contains(&key.arr_idx())
            }
            _ => false,
        };
        let is_invalid = |v: &Self, base: ElemKey, el: ElemKey| match v.elem(el) {
            Element::Literal { spelling } if spelling == ":" => {
                let Element::Attribute { index } = v.elem(base) else {
                    return None;
                };
                Some(errors::colon_after_untyped_attribute(
                    &v.op.attributes[*index].name,
                    v.span(el),
                ))
            }
            _ => None,
        };
        self.verify_adjacent(&is_base, &is_invalid, &self.ast.roots)
            .map(|_| ())
    }

    // --- 3. attr-dict followed by a region ---

    fn verify_attr_dict_region(&self) -> Result<(), Diagnostic> {
        let is_base = |v: &Self, key: ElemKey| {
            matches!(v.elem(key), Element::AttrDict { with_keyword: false })
        };
        let is_invalid = |v: &Self, _base: ElemKey, el: ElemKey| match v.elem(el) {
            Element::Region { index } => Some(errors::attr_dict_before_region(
                &v.op.regions[*index].name,
                v.span(el),
            )),
            _ => None,
        };
        self.verify_adjacent(&is_base, &is_invalid, &self.ast.roots)
            .map(|_| ())
    }

    // --- 4. oilist literal collisions ---

    fn verify_oilist_literals(&self) -> Result<(), Diagnostic> {
        let mut prohibited: Vec<String> = Vec::new();
        for &root in &self.ast.roots {
            match self.elem(root) {
                Element::OIList { clauses } => {
                    // Incremental, so two clauses of one oilist collide too.
                    for clause in clauses {
                        if let Some(spelling) = self.elem(clause.literal).literal_spelling() {
                            if prohibited.iter().any(|p| p == spelling) {
                                return Err(errors::oilist_literal_collision(
                                    spelling,
                                    self.span(clause.literal),
                                ));
                            }
                            prohibited.push(spelling.to_string());
                        }
                    }
                }
                Element::Literal { spelling } => {
                    if prohibited.iter().any(|p| p == spelling) {
                        return Err(errors::oilist_literal_shadows_literal(
                            spelling,
                            self.span(root),
                        ));
                    }
                    prohibited.clear();
                }
                _ => prohibited.clear(),
            }
        }
        Ok(())
    }

    // --- 5. optional-group legality ---

    /// Walk the tree; every optional group's elements (and anchor) must be
    /// legal for a group.
    fn verify_group_legality(&self, key: ElemKey) -> Result<(), Diagnostic> {
        match self.elem(key) {
            Element::Optional {
                then,
                otherwise,
                anchor,
                ..
            } => {
                for &el in then.iter().chain(otherwise) {
                    self.verify_optional_element(el, el == *anchor)?;
                    self.verify_group_legality(el)?;
                }
                Ok(())
            }
            Element::OIList { clauses } => {
                for clause in clauses {
                    for &el in &clause.elements {
                        self.verify_group_legality(el)?;
                    }
                }
                Ok(())
            }
            Element::Type { arg } | Element::Ref { arg } => self.verify_group_legality(*arg),
            Element::FunctionalType { inputs, results } => {
                self.verify_group_legality(*inputs)?;
                self.verify_group_legality(*results)
            }
            Element::Custom { args, .. } => {
                for &arg in args {
                    self.verify_group_legality(arg)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn verify_optional_element(&self, key: ElemKey, is_anchor: bool) -> Result<(), Diagnostic> {
        let span = self.span(key);
        match self.elem(key) {
            Element::Attribute { index } => {
                if is_anchor && !self.op.attributes[*index].is_optionally_parsed() {
                    return Err(errors::optional_anchor_attr_not_optional(span));
                }
                Ok(())
            }
            Element::Property { index } => {
                if is_anchor && !self.op.properties[*index].is_optionally_parsed() {
                    return Err(errors::optional_anchor_prop_not_optional(span));
                }
                Ok(())
            }
            Element::Operand { index } => {
                if !self.op.operands[*index].length.is_variable() {
                    return Err(errors::optional_value_not_variable_length("operand", span));
                }
                Ok(())
            }
            Element::Result { index } => {
                if !self.op.results[*index].length.is_variable() {
                    return Err(errors::optional_value_not_variable_length("result", span));
                }
                Ok(())
            }
            Element::Region { .. } => Ok(()),
            Element::Type { arg } => self.verify_optional_element(*arg, false),
            Element::FunctionalType { inputs, results } => {
                self.verify_optional_element(*inputs, false)?;
                self.verify_optional_element(*results, false)
            }
            Element::Custom { args, .. } => {
                if !is_anchor {
                    return Ok(());
                }
                // Every non-ref child is a potential anchor of the group.
                for &arg in args {
                    if matches!(self.elem(arg), Element::Ref { .. }) {
                        continue;
                    }
                    self.verify_optional_element(arg, true)?;
                }
                Ok(())
            }
            Element::Literal { .. }
            | Element::Space { .. }
            | Element::Newline
            | Element::Optional { .. } => {
                if is_anchor {
                    return Err(errors::optional_anchor_illegal(span));
                }
                Ok(())
            }
            _ => Err(errors::optional_element_illegal(span)),
        }
    }

    // --- 6. oilist parsing-group legality ---

    fn verify_oilist_groups(&self) -> Result<(), Diagnostic> {
        for &root in &self.ast.roots {
            if let Element::OIList { clauses } = self.elem(root) {
                for clause in clauses {
                    let mut vars = Vec::new();
                    for &el in &clause.elements {
                        self.collect_variables(el, &mut vars);
                    }
                    for var in vars {
                        self.verify_oilist_variable(var)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Gather the variable elements reachable from `key` (through custom,
    /// optional, functional-type and oilist elements).
    fn collect_variables(&self, key: ElemKey, out: &mut Vec<ElemKey>) {
        match self.elem(key) {
            Element::Attribute { .. }
            | Element::Property { .. }
            | Element::Operand { .. }
            | Element::Result { .. }
            | Element::Region { .. }
            | Element::Successor { .. } => out.push(key),
            Element::Custom { args, .. } => {
                for &arg in args {
                    self.collect_variables(arg, out);
                }
            }
            Element::Optional {
                then, otherwise, ..
            } => {
                for &el in then.iter().chain(otherwise) {
                    self.collect_variables(el, out);
                }
            }
            Element::FunctionalType { inputs, results } => {
                self.collect_variables(*inputs, out);
                self.collect_variables(*results, out);
            }
            Element::OIList { clauses } => {
                for clause in clauses {
                    for &el in &clause.elements {
                        self.collect_variables(el, out);
                    }
                }
            }
            _ => {}
        }
    }

    fn verify_oilist_variable(&self, key: ElemKey) -> Result<(), Diagnostic> {
        let span = self.span(key);
        match self.elem(key) {
            Element::Attribute { index } => {
                if !self.op.attributes[*index].is_optionally_parsed() {
                    return Err(errors::oilist_attr_not_optional(span));
                }
                Ok(())
            }
            Element::Property { index } => {
                if self.op.properties[*index].default_value.is_none() {
                    return Err(errors::oilist_prop_not_optional(span));
                }
                Ok(())
            }
            Element::Operand { index } => {
                if !self.op.operands[*index].length.is_variable() {
                    return Err(errors::oilist_value_not_variable_length("operand", span));
                }
                Ok(())
            }
            Element::Result { index } => {
                if !self.op.results[*index].length.is_variable() {
                    return Err(errors::oilist_value_not_variable_length("result", span));
                }
                Ok(())
            }
            Element::Region { .. } => Ok(()),
            _ => Err(errors::oilist_element_illegal(span)),
        }
    }

    // --- 7. type resolvability ---

    fn verify_types(&self, whole: Span) -> Result<ResolvedTypes, Diagnostic> {
        let resolver_map = resolve::variable_type_resolvers(self.op, self.bind);

        let mut pool: Vec<String> = Vec::new();
        let mut pool_index: HashMap<String, usize> = HashMap::new();
        let mut intern = |expr: &str, pool: &mut Vec<String>| -> usize {
            *pool_index.entry(expr.to_string()).or_insert_with(|| {
                pool.push(expr.to_string());
                pool.len() - 1
            })
        };

        let mut failure = None;
        let mut operands = Vec::with_capacity(self.op.operands.len());
        let mut results = Vec::with_capacity(self.op.results.len());

        for (i, operand) in self.op.operands.iter().enumerate() {
            if self.bind.all_operand_types || self.bind.seen_operand_types[i] {
                operands.push(TypeResolution::Parsed);
                continue;
            }
            if let Some(r) = resolver_map.get(&operand.name) {
                operands.push(TypeResolution::Variable {
                    source: r.source,
                    transformer: r.transformer.clone(),
                });
                continue;
            }
            match &operand.buildable_type {
                Some(expr) if !(self.bind.all_operands && operand.length.is_variable()) => {
                    operands.push(TypeResolution::Builder(intern(expr, &mut pool)));
                }
                _ => {
                    failure = Some(errors::unresolvable_type(
                        "operand",
                        i,
                        &operand.name,
                        whole,
                    ));
                    break;
                }
            }
        }

        if failure.is_none() {
            for (i, result) in self.op.results.iter().enumerate() {
                if self.bind.all_result_types || self.bind.seen_result_types[i] {
                    results.push(TypeResolution::Parsed);
                    continue;
                }
                if let Some(r) = resolver_map.get(&result.name) {
                    results.push(TypeResolution::Variable {
                        source: r.source,
                        transformer: r.transformer.clone(),
                    });
                    continue;
                }
                match &result.buildable_type {
                    Some(expr) if !result.length.is_variable() => {
                        results.push(TypeResolution::Builder(intern(expr, &mut pool)));
                    }
                    _ => {
                        failure = Some(errors::unresolvable_type(
                            "result",
                            i,
                            &result.name,
                            whole,
                        ));
                        break;
                    }
                }
            }
        }

        if let Some(err) = failure {
            // Fall back to whole-operation inference: legal only when no
            // operand/result type was specified anywhere in the format.
            let no_types_specified = !self.bind.all_operand_types
                && !self.bind.all_result_types
                && !self.bind.seen_operand_types.iter().any(|b| *b)
                && !self.bind.seen_result_types.iter().any(|b| *b);
            if no_types_specified && self.op.can_infer_return_types() {
                return Ok(ResolvedTypes {
                    operands: vec![TypeResolution::Inferred; self.op.operands.len()],
                    results: vec![TypeResolution::Inferred; self.op.results.len()],
                    buildable: Vec::new(),
                    infers_result_types: true,
                });
            }
            return Err(err);
        }

        Ok(ResolvedTypes {
            operands,
            results,
            buildable: pool,
            infers_result_types: false,
        })
    }
}
