//! # Operation Schema Model
//! Read-only descriptors for the operation whose assembly format is being
//! compiled: its operands, results, attributes, properties, regions,
//! successors and structural traits.
//!
//! The schema is loaded once per operation and never mutated by the compiler.
//! Name lookup is a linear probe across the five namespaces; operations have
//! tens of fields at most, so no index is built.

/// How many values a field may hold at parse time.
///
/// A pure function of the descriptor; it never changes during compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthKind {
    /// Always exactly one element.
    Single,
    /// Zero or one element.
    Optional,
    /// Zero or more elements.
    Variadic,
    /// Zero or more groups of zero or more elements.
    VariadicOfVariadic,
}

impl LengthKind {
    /// Whether the field may legally hold something other than one value.
    pub fn is_variable(self) -> bool {
        !matches!(self, LengthKind::Single)
    }
}

/// An operand or result descriptor.
#[derive(Debug, Clone)]
pub struct ValueDecl {
    pub name: String,
    pub length: LengthKind,
    /// A default-type expression with no free variables, usable when no
    /// explicit binding determines this field's type.
    pub buildable_type: Option<String>,
    /// For [`LengthKind::VariadicOfVariadic`]: the auxiliary attribute that
    /// stores the per-group sizes.
    pub segment_attr: Option<String>,
}

impl ValueDecl {
    pub fn new(name: impl Into<String>, length: LengthKind) -> Self {
        ValueDecl {
            name: name.into(),
            length,
            buildable_type: None,
            segment_attr: None,
        }
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self::new(name, LengthKind::Single)
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self::new(name, LengthKind::Optional)
    }

    pub fn variadic(name: impl Into<String>) -> Self {
        Self::new(name, LengthKind::Variadic)
    }

    /// A variadic-of-variadic value storing its group sizes in `segment_attr`.
    pub fn variadic_of_variadic(name: impl Into<String>, segment_attr: impl Into<String>) -> Self {
        let mut v = Self::new(name, LengthKind::VariadicOfVariadic);
        v.segment_attr = Some(segment_attr.into());
        v
    }

    pub fn with_buildable_type(mut self, expr: impl Into<String>) -> Self {
        self.buildable_type = Some(expr.into());
        self
    }
}

/// A named attribute descriptor.
#[derive(Debug, Clone)]
pub struct AttrDecl {
    pub name: String,
    pub optional: bool,
    pub default_value: Option<String>,
    /// Expression building this attribute's type statically, when it has one.
    pub type_builder: Option<String>,
    /// `Some` for enum-like attributes: the closed set of allowed keywords.
    pub enum_values: Option<Vec<String>>,
    /// Parsed/printed through the symbol-name grammar rather than the generic
    /// attribute grammar.
    pub symbol_name: bool,
    /// A unit attribute: presence is the value. Valid optional-group anchor,
    /// elided from parsing and synthesized on success.
    pub unit: bool,
}

impl AttrDecl {
    pub fn new(name: impl Into<String>) -> Self {
        AttrDecl {
            name: name.into(),
            optional: false,
            default_value: None,
            type_builder: None,
            enum_values: None,
            symbol_name: false,
            unit: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_type_builder(mut self, expr: impl Into<String>) -> Self {
        self.type_builder = Some(expr.into());
        self
    }

    pub fn enumerated(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn symbol_name(mut self) -> Self {
        self.symbol_name = true;
        self
    }

    pub fn unit(mut self) -> Self {
        self.unit = true;
        self.optional = true;
        self
    }

    /// Whether the absence of this attribute at parse time is legal.
    pub fn is_optionally_parsed(&self) -> bool {
        self.optional || self.default_value.is_some()
    }
}

/// A named property descriptor.
#[derive(Debug, Clone)]
pub struct PropDecl {
    pub name: String,
    pub default_value: Option<String>,
    /// Whether the property supports a best-effort optional parse.
    pub optional_parser: bool,
    pub unit: bool,
}

impl PropDecl {
    pub fn new(name: impl Into<String>) -> Self {
        PropDecl {
            name: name.into(),
            default_value: None,
            optional_parser: false,
            unit: false,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn optionally_parsed(mut self) -> Self {
        self.optional_parser = true;
        self
    }

    pub fn unit(mut self) -> Self {
        self.unit = true;
        self.optional_parser = true;
        self
    }

    pub fn is_optionally_parsed(&self) -> bool {
        self.default_value.is_some() && self.optional_parser
    }
}

#[derive(Debug, Clone)]
pub struct RegionDecl {
    pub name: String,
    pub variadic: bool,
}

impl RegionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        RegionDecl {
            name: name.into(),
            variadic: false,
        }
    }

    pub fn variadic(name: impl Into<String>) -> Self {
        RegionDecl {
            name: name.into(),
            variadic: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuccessorDecl {
    pub name: String,
    pub variadic: bool,
}

impl SuccessorDecl {
    pub fn new(name: impl Into<String>) -> Self {
        SuccessorDecl {
            name: name.into(),
            variadic: false,
        }
    }

    pub fn variadic(name: impl Into<String>) -> Self {
        SuccessorDecl {
            name: name.into(),
            variadic: true,
        }
    }
}

/// Structural traits declared by the operation. A closed set: the compiler
/// matches on tags, trait-specific parameters ride along.
#[derive(Debug, Clone)]
pub enum OpTrait {
    /// All listed operands/results share one type.
    AllTypesMatch { values: Vec<String> },
    /// All operands share one type.
    SameTypeOperands,
    /// All operands and all results share one type.
    SameOperandsAndResultType,
    /// The type of `rhs` is derived from the type of `lhs` via `transformer`.
    TypesMatchWith {
        lhs: String,
        rhs: String,
        transformer: String,
    },
    /// A container-typed argument determines a sibling list's element types
    /// and count. One-directional: the container type cannot be recovered
    /// from the elements.
    ElementCountDeterminesTypes { container: String, elements: String },
    /// Every region holds a single block.
    SingleBlock,
    /// Single-block regions whose terminator may be elided in text.
    SingleBlockImplicitTerminator,
    /// Operand segment sizes are stored in an auxiliary attribute/property.
    AttrSizedOperandSegments,
    /// Result segment sizes are stored in an auxiliary attribute/property.
    AttrSizedResultSegments,
    /// The operation can infer all result types from its parsed state.
    InferReturnTypes,
}

/// The schema of one operation, consumed read-only by the compiler.
#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    pub operands: Vec<ValueDecl>,
    pub results: Vec<ValueDecl>,
    pub attributes: Vec<AttrDecl>,
    pub properties: Vec<PropDecl>,
    pub regions: Vec<RegionDecl>,
    pub successors: Vec<SuccessorDecl>,
    pub traits: Vec<OpTrait>,
    /// Whether auxiliary segment sizes are stored as a property rather than
    /// an attribute.
    pub uses_properties: bool,
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Operation {
            name: name.into(),
            operands: Vec::new(),
            results: Vec::new(),
            attributes: Vec::new(),
            properties: Vec::new(),
            regions: Vec::new(),
            successors: Vec::new(),
            traits: Vec::new(),
            uses_properties: false,
        }
    }

    pub fn operand(mut self, decl: ValueDecl) -> Self {
        self.operands.push(decl);
        self
    }

    pub fn result(mut self, decl: ValueDecl) -> Self {
        self.results.push(decl);
        self
    }

    pub fn attribute(mut self, decl: AttrDecl) -> Self {
        self.attributes.push(decl);
        self
    }

    pub fn property(mut self, decl: PropDecl) -> Self {
        self.properties.push(decl);
        self
    }

    pub fn region(mut self, decl: RegionDecl) -> Self {
        self.regions.push(decl);
        self
    }

    pub fn successor(mut self, decl: SuccessorDecl) -> Self {
        self.successors.push(decl);
        self
    }

    pub fn with_trait(mut self, t: OpTrait) -> Self {
        self.traits.push(t);
        self
    }

    pub fn find_operand(&self, name: &str) -> Option<(usize, &ValueDecl)> {
        find_arg(&self.operands, name, |v| &v.name)
    }

    pub fn find_result(&self, name: &str) -> Option<(usize, &ValueDecl)> {
        find_arg(&self.results, name, |v| &v.name)
    }

    pub fn find_attribute(&self, name: &str) -> Option<(usize, &AttrDecl)> {
        find_arg(&self.attributes, name, |a| &a.name)
    }

    pub fn find_property(&self, name: &str) -> Option<(usize, &PropDecl)> {
        find_arg(&self.properties, name, |p| &p.name)
    }

    pub fn find_region(&self, name: &str) -> Option<(usize, &RegionDecl)> {
        find_arg(&self.regions, name, |r| &r.name)
    }

    pub fn find_successor(&self, name: &str) -> Option<(usize, &SuccessorDecl)> {
        find_arg(&self.successors, name, |s| &s.name)
    }

    pub fn has_trait(&self, matches: impl Fn(&OpTrait) -> bool) -> bool {
        self.traits.iter().any(matches)
    }

    /// Whether the operation declares the return-type-inference capability.
    pub fn can_infer_return_types(&self) -> bool {
        self.has_trait(|t| matches!(t, OpTrait::InferReturnTypes))
    }

    pub fn has_attr_sized_operand_segments(&self) -> bool {
        self.has_trait(|t| matches!(t, OpTrait::AttrSizedOperandSegments))
    }

    pub fn has_attr_sized_result_segments(&self) -> bool {
        self.has_trait(|t| matches!(t, OpTrait::AttrSizedResultSegments))
    }

    pub fn has_implicit_terminator(&self) -> bool {
        self.has_trait(|t| matches!(t, OpTrait::SingleBlockImplicitTerminator))
    }

    /// The generated accessor name for a schema field. Opaque to the
    /// compiler: generators splice it verbatim into emitted programs.
    pub fn getter_name(&self, field: &str) -> String {
        format!("get_{field}")
    }
}

fn find_arg<'a, T>(
    args: &'a [T],
    name: &str,
    get_name: impl Fn(&T) -> &String,
) -> Option<(usize, &'a T)> {
    args.iter()
        .enumerate()
        .find(|(_, arg)| get_name(arg) == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_probes() {
        let op = Operation::new("test.probe")
            .operand(ValueDecl::single("value"))
            .result(ValueDecl::single("out"))
            .attribute(AttrDecl::new("pred"))
            .region(RegionDecl::new("body"));

        assert_eq!(op.find_operand("value").unwrap().0, 0);
        assert_eq!(op.find_result("out").unwrap().0, 0);
        assert_eq!(op.find_attribute("pred").unwrap().0, 0);
        assert!(op.find_successor("value").is_none());
        assert!(op.find_operand("missing").is_none());
    }

    #[test]
    fn length_kinds_are_fixed_by_the_descriptor() {
        assert!(!LengthKind::Single.is_variable());
        assert!(LengthKind::Optional.is_variable());
        assert!(LengthKind::Variadic.is_variable());
        assert!(LengthKind::VariadicOfVariadic.is_variable());

        let v = ValueDecl::variadic_of_variadic("args", "args_sizes");
        assert_eq!(v.length, LengthKind::VariadicOfVariadic);
        assert_eq!(v.segment_attr.as_deref(), Some("args_sizes"));
    }

    #[test]
    fn optionally_parsed_attributes() {
        assert!(AttrDecl::new("a").optional().is_optionally_parsed());
        assert!(AttrDecl::new("a").with_default("0").is_optionally_parsed());
        assert!(!AttrDecl::new("a").is_optionally_parsed());
        // Properties need both a default and an optional parser.
        assert!(!PropDecl::new("p").with_default("0").is_optionally_parsed());
        assert!(PropDecl::new("p")
            .with_default("0")
            .optionally_parsed()
            .is_optionally_parsed());
    }
}
