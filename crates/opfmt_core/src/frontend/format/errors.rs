//! # Format Error Messages
//! Every diagnostic the format frontend can produce, one constructor each.
//! - Codes are grouped by kind: lexical/grammar (1..), binding (20..),
//!   coverage (45..), ambiguity (50..), group legality (55..).

use crate::diag::{Diagnostic, Span};

type ErrCode = usize;

fn format_error(code: ErrCode, span: Span, message: String) -> Diagnostic {
    Diagnostic::error(code, span, message)
}

// --- lexical / grammar ---

pub fn unterminated_literal(span: Span) -> Diagnostic {
    format_error(1, span, "unterminated backtick literal".to_string())
}

pub fn unterminated_string(span: Span) -> Diagnostic {
    format_error(2, span, "unterminated string".to_string())
}

pub fn empty_variable_name(span: Span) -> Diagnostic {
    format_error(3, span, "expected variable name after `$`".to_string())
}

pub fn unexpected_character(c: char, span: Span) -> Diagnostic {
    format_error(4, span, format!("unexpected character `{c}` in format"))
}

pub fn expected_token(expected: &str, found: &str, span: Span) -> Diagnostic {
    let found = if found.is_empty() {
        "end of format".to_string()
    } else {
        format!("`{found}`")
    };
    format_error(5, span, format!("expected {expected} but found {found}"))
}

pub fn invalid_literal(spelling: &str, span: Span) -> Diagnostic {
    format_error(
        6,
        span,
        format!("`{spelling}` is not a valid literal keyword or punctuation"),
    )
}

pub fn unknown_variable(name: &str, span: Span) -> Diagnostic {
    format_error(
        7,
        span,
        format!(
            "expected variable `{name}` to refer to an operand, result, region, successor, \
             attribute, or property"
        ),
    )
}

pub fn anchor_outside_optional_group(span: Span) -> Diagnostic {
    format_error(
        8,
        span,
        "`^` anchors are only valid inside an optional group".to_string(),
    )
}

pub fn optional_only_top_level(span: Span) -> Diagnostic {
    format_error(
        9,
        span,
        "optional groups can only be used as top-level elements".to_string(),
    )
}

pub fn optional_missing_anchor(span: Span) -> Diagnostic {
    format_error(
        10,
        span,
        "optional group specifies no anchor element".to_string(),
    )
}

pub fn optional_multiple_anchors(span: Span) -> Diagnostic {
    format_error(
        11,
        span,
        "optional group can only have one anchor element".to_string(),
    )
}

pub fn oilist_expected_keyword(span: Span) -> Diagnostic {
    format_error(
        12,
        span,
        "expected a keyword literal to start an oilist clause".to_string(),
    )
}

pub fn custom_invalid_argument(span: Span) -> Diagnostic {
    format_error(
        13,
        span,
        "only variables and types may be used as parameters to a custom directive".to_string(),
    )
}

pub fn custom_type_arg_not_variable(span: Span) -> Diagnostic {
    format_error(
        14,
        span,
        "type directives within a custom directive may only refer to variables".to_string(),
    )
}

pub fn ref_only_in_custom(span: Span) -> Diagnostic {
    format_error(
        15,
        span,
        "`ref` is only valid within a custom directive".to_string(),
    )
}

pub fn qualified_invalid_argument(span: Span) -> Diagnostic {
    format_error(
        16,
        span,
        "`qualified` directive expects an attribute or a `type` directive".to_string(),
    )
}

pub fn directive_top_level_only(directive: &str, span: Span) -> Diagnostic {
    format_error(
        17,
        span,
        format!("`{directive}` is only valid as a top-level directive"),
    )
}

pub fn ref_invalid_argument(span: Span) -> Diagnostic {
    format_error(
        18,
        span,
        "`ref` expects a bound variable or directive as its argument".to_string(),
    )
}

pub fn optional_group_empty(span: Span) -> Diagnostic {
    format_error(
        19,
        span,
        "optional group must have at least one parsable element".to_string(),
    )
}

// --- binding ---

pub fn already_bound(kind: &str, name: &str, span: Span) -> Diagnostic {
    format_error(20, span, format!("{kind} `{name}` is already bound"))
}

pub fn must_be_bound_before_ref(kind: &str, name: &str, span: Span) -> Diagnostic {
    format_error(
        21,
        span,
        format!("{kind} `{name}` must be bound before it is referenced"),
    )
}

pub fn result_outside_type(name: &str, span: Span) -> Diagnostic {
    format_error(
        22,
        span,
        format!("result variable `{name}` can only be used as a child of a `type` directive"),
    )
}

pub fn attr_in_type_context(span: Span) -> Diagnostic {
    format_error(
        23,
        span,
        "attributes cannot be used as children of a `type` directive".to_string(),
    )
}

pub fn prop_in_type_context(span: Span) -> Diagnostic {
    format_error(
        24,
        span,
        "properties cannot be used as children of a `type` directive".to_string(),
    )
}

pub fn region_bad_context(name: &str, span: Span) -> Diagnostic {
    format_error(
        25,
        span,
        format!("region `{name}` can only be used at the top level or in a `ref` directive"),
    )
}

pub fn successor_bad_context(name: &str, span: Span) -> Diagnostic {
    format_error(
        26,
        span,
        format!("successor `{name}` can only be used at the top level or in a `ref` directive"),
    )
}

pub fn attr_dict_top_level_only(span: Span) -> Diagnostic {
    format_error(
        27,
        span,
        "`attr-dict` directive can only be used as a top-level directive".to_string(),
    )
}

pub fn attr_dict_already_seen(span: Span) -> Diagnostic {
    format_error(
        28,
        span,
        "`attr-dict` directive has already been seen".to_string(),
    )
}

pub fn ref_attr_dict_unbound(span: Span) -> Diagnostic {
    format_error(
        29,
        span,
        "`ref` of `attr-dict` is not bound by a prior `attr-dict` directive".to_string(),
    )
}

pub fn prop_dict_already_seen(span: Span) -> Diagnostic {
    format_error(
        30,
        span,
        "`prop-dict` directive has already been seen".to_string(),
    )
}

pub fn ref_of_prop_dict(span: Span) -> Diagnostic {
    format_error(31, span, "`ref` of `prop-dict` is not supported".to_string())
}

pub fn all_directive_overlap(directive: &str, span: Span) -> Diagnostic {
    format_error(
        32,
        span,
        format!("`{directive}` directive creates overlap in format"),
    )
}

pub fn ref_all_directive_unbound(directive: &str, span: Span) -> Diagnostic {
    format_error(
        33,
        span,
        format!("`ref` of `{directive}` is not bound by a prior `{directive}` directive"),
    )
}

pub fn results_only_in_type(span: Span) -> Diagnostic {
    format_error(
        34,
        span,
        "`results` directive can only be used as a child of a `type` directive".to_string(),
    )
}

pub fn functional_type_top_level_only(span: Span) -> Diagnostic {
    format_error(
        35,
        span,
        "`functional-type` is only valid as a top-level directive".to_string(),
    )
}

pub fn type_already_bound(name: &str, span: Span) -> Diagnostic {
    format_error(36, span, format!("`type` of `{name}` is already bound"))
}

pub fn ref_type_unbound(name: &str, span: Span) -> Diagnostic {
    format_error(
        37,
        span,
        format!("`ref` of `type(${name})` is not bound by a prior `type` directive"),
    )
}

pub fn type_all_already_bound(directive: &str, span: Span) -> Diagnostic {
    format_error(
        38,
        span,
        format!("`{directive}` `type` is already bound"),
    )
}

pub fn ref_type_all_unbound(directive: &str, span: Span) -> Diagnostic {
    format_error(
        39,
        span,
        format!("`ref` of `type({directive})` is not bound by a prior `type` directive"),
    )
}

pub fn type_invalid_argument(span: Span) -> Diagnostic {
    format_error(
        40,
        span,
        "`type` directive operand expects a variable or directive operand".to_string(),
    )
}

pub fn type_in_type_context(span: Span) -> Diagnostic {
    format_error(
        41,
        span,
        "`type` cannot be used as a child of another `type`".to_string(),
    )
}

// --- coverage ---

pub fn attr_dict_missing(span: Span) -> Diagnostic {
    format_error(
        45,
        span,
        "`attr-dict` directive not found in custom assembly format".to_string(),
    )
}

pub fn unbound_argument(kind: &str, index: usize, name: &str, span: Span) -> Diagnostic {
    format_error(
        46,
        span,
        format!("{kind} #{index}, named `{name}`, not found"),
    )
    .with_note(format!(
        "suggest adding a `${name}` directive to the custom assembly format"
    ))
}

pub fn unresolvable_type(kind: &str, index: usize, name: &str, span: Span) -> Diagnostic {
    format_error(
        47,
        span,
        format!(
            "type of {kind} #{index}, named `{name}`, is not buildable and a buildable type \
             cannot be inferred"
        ),
    )
    .with_note(format!(
        "suggest adding a type constraint to the operation or adding a `type(${name})` directive \
         to the custom assembly format"
    ))
}

// --- ambiguity ---

pub fn colon_after_untyped_attribute(name: &str, span: Span) -> Diagnostic {
    format_error(
        50,
        span,
        format!(
            "format ambiguity caused by `:` literal found after attribute `{name}` which does \
             not have a buildable type"
        ),
    )
}

pub fn attr_dict_before_region(name: &str, span: Span) -> Diagnostic {
    format_error(
        51,
        span,
        format!("format ambiguity caused by `attr-dict` directive followed by region `{name}`"),
    )
    .with_note("try using `attr-dict-with-keyword` instead")
}

pub fn oilist_literal_collision(spelling: &str, span: Span) -> Diagnostic {
    format_error(
        52,
        span,
        format!("format ambiguity because `{spelling}` is used in two adjacent oilist elements"),
    )
}

pub fn oilist_literal_shadows_literal(spelling: &str, span: Span) -> Diagnostic {
    format_error(
        53,
        span,
        format!(
            "format ambiguity because `{spelling}` is used both in an oilist element and the \
             adjacent literal"
        ),
    )
}

// --- optional group / oilist legality ---

pub fn optional_element_illegal(span: Span) -> Diagnostic {
    format_error(
        55,
        span,
        "only literals, types, and variables can be used within an optional group".to_string(),
    )
}

pub fn optional_anchor_attr_not_optional(span: Span) -> Diagnostic {
    format_error(
        56,
        span,
        "only optional or default-valued attributes can be used to anchor an optional group"
            .to_string(),
    )
}

pub fn optional_anchor_prop_not_optional(span: Span) -> Diagnostic {
    format_error(
        57,
        span,
        "only default-valued properties that can be optionally parsed can be used to anchor an \
         optional group"
            .to_string(),
    )
}

pub fn optional_value_not_variable_length(kind: &str, span: Span) -> Diagnostic {
    format_error(
        58,
        span,
        format!("only variable length {kind}s can be used within an optional group"),
    )
}

pub fn optional_anchor_illegal(span: Span) -> Diagnostic {
    format_error(
        59,
        span,
        "only variables and types can be used to anchor an optional group".to_string(),
    )
}

pub fn oilist_attr_not_optional(span: Span) -> Diagnostic {
    format_error(
        60,
        span,
        "only optional attributes can be used in an oilist parsing group".to_string(),
    )
}

pub fn oilist_prop_not_optional(span: Span) -> Diagnostic {
    format_error(
        61,
        span,
        "only default-valued or optional properties can be used in an oilist parsing group"
            .to_string(),
    )
}

pub fn oilist_value_not_variable_length(kind: &str, span: Span) -> Diagnostic {
    format_error(
        62,
        span,
        format!("only variable length {kind}s can be used within an oilist parsing group"),
    )
}

pub fn oilist_element_illegal(span: Span) -> Diagnostic {
    format_error(
        63,
        span,
        "only literals, types, and variables can be used within an oilist group".to_string(),
    )
}
