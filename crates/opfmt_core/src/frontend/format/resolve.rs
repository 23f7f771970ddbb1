//! # Type Resolution Engine
//! Propagates type information across variables using the operation's
//! equality/derivation traits: a pure function from (trait list, bound-type
//! state) to a name → resolver map.
//!
//! Traits apply in declaration order, and each only fills entries no earlier
//! trait filled. An explicit `type(...)` binding is never overridden: callers
//! only consult the map for variables whose types are unbound.

use std::collections::HashMap;

use crate::plan::ResolvedSource;
use crate::schema::{OpTrait, Operation};

use super::parse::Bindings;

/// A derived resolver: copy the source argument's type, optionally through a
/// transform expression.
pub(super) struct TypeResolver {
    pub source: ResolvedSource,
    pub transformer: Option<String>,
}

/// Transform synthesized for the container→elements trait: N copies of the
/// container's element type, N = its element count.
pub const REPLICATE_ELEMENT_TYPES: &str =
    "replicate(element_type($_self), element_count($_self))";

pub(super) fn variable_type_resolvers(
    op: &Operation,
    bind: &Bindings,
) -> HashMap<String, TypeResolver> {
    let mut map: HashMap<String, TypeResolver> = HashMap::new();

    for op_trait in &op.traits {
        match op_trait {
            OpTrait::AllTypesMatch { values } => {
                let resolved = values
                    .iter()
                    .find_map(|v| find_seen_arg(op, bind, v).map(|s| (v.as_str(), s)));
                if let Some((resolved_name, source)) = resolved {
                    for value in values {
                        if value != resolved_name {
                            map.entry(value.clone()).or_insert(TypeResolver {
                                source,
                                transformer: None,
                            });
                        }
                    }
                }
            }
            OpTrait::SameTypeOperands => {
                same_types(op, bind, &mut map, false);
            }
            OpTrait::SameOperandsAndResultType => {
                same_types(op, bind, &mut map, true);
            }
            OpTrait::TypesMatchWith {
                lhs,
                rhs,
                transformer,
            } => {
                if let Some(source) = find_seen_arg(op, bind, lhs) {
                    map.entry(rhs.clone()).or_insert(TypeResolver {
                        source,
                        transformer: Some(transformer.clone()),
                    });
                }
            }
            OpTrait::ElementCountDeterminesTypes {
                container,
                elements,
            } => {
                // One-directional: the container type can't be recovered from
                // the variadic elements.
                if let Some(source) = find_seen_arg(op, bind, container) {
                    map.entry(elements.clone()).or_insert(TypeResolver {
                        source,
                        transformer: Some(REPLICATE_ELEMENT_TYPES.to_string()),
                    });
                }
            }
            _ => {}
        }
    }

    map
}

fn same_types(
    op: &Operation,
    bind: &Bindings,
    map: &mut HashMap<String, TypeResolver>,
    include_results: bool,
) {
    let source = if let Some(i) = bind.seen_operand_types.iter().position(|b| *b) {
        ResolvedSource::Operand(i)
    } else if include_results {
        match bind.seen_result_types.iter().position(|b| *b) {
            Some(i) => ResolvedSource::Result(i),
            None => return,
        }
    } else {
        return;
    };

    for (i, operand) in op.operands.iter().enumerate() {
        if !bind.seen_operand_types[i] {
            map.entry(operand.name.clone()).or_insert(TypeResolver {
                source,
                transformer: None,
            });
        }
    }
    if include_results {
        for (i, result) in op.results.iter().enumerate() {
            if !bind.seen_result_types[i] {
                map.entry(result.name.clone()).or_insert(TypeResolver {
                    source,
                    transformer: None,
                });
            }
        }
    }
}

/// An argument usable as a resolution source: an operand or result whose type
/// is bound, or an attribute bound in the format.
fn find_seen_arg(op: &Operation, bind: &Bindings, name: &str) -> Option<ResolvedSource> {
    if let Some((i, _)) = op.find_operand(name) {
        return bind.seen_operand_types[i].then_some(ResolvedSource::Operand(i));
    }
    if let Some((i, _)) = op.find_result(name) {
        return bind.seen_result_types[i].then_some(ResolvedSource::Result(i));
    }
    if let Some((i, _)) = op.find_attribute(name) {
        return bind
            .seen_attrs
            .contains(&i)
            .then_some(ResolvedSource::Attribute(i));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::format::parse::parse_format;
    use crate::schema::ValueDecl;

    fn resolvers(op: &Operation, format: &str) -> HashMap<String, TypeResolver> {
        let (_, bind) = parse_format(op, format).unwrap();
        variable_type_resolvers(op, &bind)
    }

    #[test]
    fn all_types_match_resolves_from_the_bound_entry() {
        let op = Operation::new("test.same")
            .operand(ValueDecl::single("a"))
            .operand(ValueDecl::single("b"))
            .result(ValueDecl::single("r"))
            .with_trait(OpTrait::AllTypesMatch {
                values: vec!["a".into(), "b".into(), "r".into()],
            });

        let map = resolvers(&op, "$a $b attr-dict `:` type($a)");
        assert!(map.contains_key("b"));
        assert!(map.contains_key("r"));
        assert!(!map.contains_key("a"));
        match &map["r"] {
            TypeResolver {
                source: ResolvedSource::Operand(0),
                transformer: None,
            } => {}
            other => panic!("unexpected resolver {:?}", (other.source, &other.transformer)),
        }
    }

    #[test]
    fn no_bound_entry_means_no_resolvers() {
        let op = Operation::new("test.same")
            .operand(ValueDecl::single("a"))
            .operand(ValueDecl::single("b"))
            .with_trait(OpTrait::SameTypeOperands);
        assert!(resolvers(&op, "$a $b attr-dict").is_empty());
    }

    #[test]
    fn earlier_traits_win() {
        let op = Operation::new("test.first")
            .operand(ValueDecl::single("a"))
            .operand(ValueDecl::single("b"))
            .with_trait(OpTrait::TypesMatchWith {
                lhs: "a".into(),
                rhs: "b".into(),
                transformer: "widen($_self)".into(),
            })
            .with_trait(OpTrait::SameTypeOperands);

        let map = resolvers(&op, "$a $b attr-dict `:` type($a)");
        assert_eq!(map["b"].transformer.as_deref(), Some("widen($_self)"));
    }

    #[test]
    fn container_trait_is_one_directional() {
        let op = Operation::new("test.shaped")
            .operand(ValueDecl::single("container"))
            .operand(ValueDecl::variadic("elems"))
            .with_trait(OpTrait::ElementCountDeterminesTypes {
                container: "container".into(),
                elements: "elems".into(),
            });

        // Binding the container resolves the elements.
        let map = resolvers(&op, "$container $elems attr-dict `:` type($container)");
        assert_eq!(
            map["elems"].transformer.as_deref(),
            Some(REPLICATE_ELEMENT_TYPES)
        );

        // The reverse is never inferable.
        let map = resolvers(&op, "$container $elems attr-dict `:` type($elems)");
        assert!(!map.contains_key("container"));
    }
}
