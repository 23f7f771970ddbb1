//! # Format Parsing
//! Recursive descent over the format token stream.
//!
//! Four contexts change what is legal at any point: top level, the argument
//! list of a `custom` directive, the argument of a `ref`, and the argument of
//! a `type`/`functional-type` directive. Variable names resolve by probing
//! the schema namespaces in a fixed priority order (operand, result, region,
//! successor, attribute, property); the first match wins.
//!
//! Parsing stops at the first violation. The binding state accumulated here
//! ([`Bindings`]) feeds the verifier in [`super::sem`].

use std::collections::HashSet;

use crate::diag::{Diagnostic, Span};
use crate::schema::Operation;

use super::ast::{Ast, ElemKey, Element, OIListClause};
use super::errors;
use super::lexer::{self, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    TopLevel,
    CustomDirectiveArg,
    RefDirectiveArg,
    TypeDirectiveArg,
}

/// Which schema fields the format has bound, and through what.
#[derive(Debug)]
pub struct Bindings {
    pub seen_operands: HashSet<usize>,
    pub seen_attrs: HashSet<usize>,
    pub seen_props: HashSet<usize>,
    pub seen_regions: HashSet<usize>,
    pub seen_successors: HashSet<usize>,
    pub seen_operand_types: Vec<bool>,
    pub seen_result_types: Vec<bool>,
    pub all_operands: bool,
    pub all_operand_types: bool,
    pub all_result_types: bool,
    pub all_regions: bool,
    pub all_successors: bool,
    pub has_attr_dict: bool,
    pub has_prop_dict: bool,
}

impl Bindings {
    fn new(op: &Operation) -> Self {
        Bindings {
            seen_operands: HashSet::new(),
            seen_attrs: HashSet::new(),
            seen_props: HashSet::new(),
            seen_regions: HashSet::new(),
            seen_successors: HashSet::new(),
            seen_operand_types: vec![false; op.operands.len()],
            seen_result_types: vec![false; op.results.len()],
            all_operands: false,
            all_operand_types: false,
            all_result_types: false,
            all_regions: false,
            all_successors: false,
            has_attr_dict: false,
            has_prop_dict: false,
        }
    }
}

/// Parse a format string against `op`'s schema.
pub fn parse_format(op: &Operation, format: &str) -> Result<(Ast, Bindings), Diagnostic> {
    let tokens = lexer::lex(format)?;
    let mut parser = FormatParser {
        op,
        tokens,
        pos: 0,
        ast: Ast::new(),
        bind: Bindings::new(op),
    };

    let mut roots = Vec::new();
    while !parser.at(TokenKind::Eof) {
        roots.push(parser.parse_element(Context::TopLevel)?);
    }
    parser.ast.roots = roots;
    Ok((parser.ast, parser.bind))
}

struct FormatParser<'a> {
    op: &'a Operation,
    tokens: Vec<Token>,
    pos: usize,
    ast: Ast,
    bind: Bindings,
}

impl<'a> FormatParser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Diagnostic> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            let tok = self.peek();
            Err(errors::expected_token(what, &tok.text, tok.span))
        }
    }

    fn parse_element(&mut self, ctx: Context) -> Result<ElemKey, Diagnostic> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Literal => self.parse_literal(),
            TokenKind::Variable => self.parse_variable(ctx),
            TokenKind::Str if ctx == Context::CustomDirectiveArg => {
                let tok = self.bump();
                Ok(self.ast.alloc(tok.span, Element::Str { value: tok.text }))
            }
            TokenKind::LParen if ctx == Context::TopLevel => self.parse_optional_group(),
            TokenKind::LParen => Err(errors::optional_only_top_level(tok.span)),
            TokenKind::Caret => Err(errors::anchor_outside_optional_group(tok.span)),
            kind if kind.is_directive_keyword() => self.parse_directive(ctx),
            _ => Err(errors::expected_token("a format element", &tok.text, tok.span)),
        }
    }

    /// Parse a backtick literal: a whitespace element, or a keyword or
    /// punctuation literal.
    fn parse_literal(&mut self) -> Result<ElemKey, Diagnostic> {
        let tok = self.bump();
        let elem = match tok.text.as_str() {
            "\\n" => Element::Newline,
            "" => Element::Space { value: false },
            " " => Element::Space { value: true },
            spelling => {
                if !is_valid_literal(spelling) {
                    return Err(errors::invalid_literal(spelling, tok.span));
                }
                Element::Literal {
                    spelling: spelling.to_string(),
                }
            }
        };
        Ok(self.ast.alloc(tok.span, elem))
    }

    /// Resolve a `$name` against the schema and apply the per-kind binding
    /// rules for the current context.
    fn parse_variable(&mut self, ctx: Context) -> Result<ElemKey, Diagnostic> {
        let tok = self.bump();
        let (name, span) = (tok.text.as_str(), tok.span);

        if let Some((index, _)) = self.op.find_operand(name) {
            match ctx {
                Context::TopLevel | Context::CustomDirectiveArg => {
                    if self.bind.all_operands || !self.bind.seen_operands.insert(index) {
                        return Err(errors::already_bound("operand", name, span));
                    }
                }
                Context::RefDirectiveArg => {
                    if !self.bind.seen_operands.contains(&index) {
                        return Err(errors::must_be_bound_before_ref("operand", name, span));
                    }
                }
                // Registration happens through the enclosing `type` directive.
                Context::TypeDirectiveArg => {}
            }
            return Ok(self.ast.alloc(span, Element::Operand { index }));
        }

        if let Some((index, _)) = self.op.find_result(name) {
            if ctx != Context::TypeDirectiveArg {
                return Err(errors::result_outside_type(name, span));
            }
            return Ok(self.ast.alloc(span, Element::Result { index }));
        }

        if let Some((index, _)) = self.op.find_region(name) {
            match ctx {
                Context::TopLevel | Context::CustomDirectiveArg => {
                    if self.bind.all_regions || !self.bind.seen_regions.insert(index) {
                        return Err(errors::already_bound("region", name, span));
                    }
                }
                Context::RefDirectiveArg => {
                    if !self.bind.seen_regions.contains(&index) {
                        return Err(errors::must_be_bound_before_ref("region", name, span));
                    }
                }
                Context::TypeDirectiveArg => {
                    return Err(errors::region_bad_context(name, span));
                }
            }
            return Ok(self.ast.alloc(span, Element::Region { index }));
        }

        if let Some((index, _)) = self.op.find_successor(name) {
            match ctx {
                Context::TopLevel | Context::CustomDirectiveArg => {
                    if self.bind.all_successors || !self.bind.seen_successors.insert(index) {
                        return Err(errors::already_bound("successor", name, span));
                    }
                }
                Context::RefDirectiveArg => {
                    if !self.bind.seen_successors.contains(&index) {
                        return Err(errors::must_be_bound_before_ref("successor", name, span));
                    }
                }
                Context::TypeDirectiveArg => {
                    return Err(errors::successor_bad_context(name, span));
                }
            }
            return Ok(self.ast.alloc(span, Element::Successor { index }));
        }

        if let Some((index, _)) = self.op.find_attribute(name) {
            match ctx {
                Context::TypeDirectiveArg => return Err(errors::attr_in_type_context(span)),
                Context::RefDirectiveArg => {
                    if !self.bind.seen_attrs.contains(&index) {
                        return Err(errors::must_be_bound_before_ref("attribute", name, span));
                    }
                }
                _ => {
                    if !self.bind.seen_attrs.insert(index) {
                        return Err(errors::already_bound("attribute", name, span));
                    }
                }
            }
            return Ok(self.ast.alloc(span, Element::Attribute { index }));
        }

        if let Some((index, _)) = self.op.find_property(name) {
            match ctx {
                Context::TypeDirectiveArg => return Err(errors::prop_in_type_context(span)),
                Context::RefDirectiveArg => {
                    if !self.bind.seen_props.contains(&index) {
                        return Err(errors::must_be_bound_before_ref("property", name, span));
                    }
                }
                _ => {
                    if !self.bind.seen_props.insert(index) {
                        return Err(errors::already_bound("property", name, span));
                    }
                }
            }
            return Ok(self.ast.alloc(span, Element::Property { index }));
        }

        Err(errors::unknown_variable(name, span))
    }

    fn parse_directive(&mut self, ctx: Context) -> Result<ElemKey, Diagnostic> {
        let tok = self.bump();
        let span = tok.span;
        match tok.kind {
            TokenKind::KwAttrDict => self.parse_attr_dict(ctx, span, false),
            TokenKind::KwAttrDictWithKeyword => self.parse_attr_dict(ctx, span, true),
            TokenKind::KwPropDict => {
                if ctx == Context::TypeDirectiveArg {
                    return Err(errors::directive_top_level_only("prop-dict", span));
                }
                if ctx == Context::RefDirectiveArg {
                    return Err(errors::ref_of_prop_dict(span));
                }
                if self.bind.has_prop_dict {
                    return Err(errors::prop_dict_already_seen(span));
                }
                self.bind.has_prop_dict = true;
                Ok(self.ast.alloc(span, Element::PropDict))
            }
            TokenKind::KwOperands => {
                if ctx == Context::RefDirectiveArg {
                    if !self.bind.all_operands {
                        return Err(errors::ref_all_directive_unbound("operands", span));
                    }
                } else if ctx == Context::TopLevel || ctx == Context::CustomDirectiveArg {
                    if self.bind.all_operands || !self.bind.seen_operands.is_empty() {
                        return Err(errors::all_directive_overlap("operands", span));
                    }
                    self.bind.all_operands = true;
                }
                Ok(self.ast.alloc(span, Element::Operands))
            }
            TokenKind::KwResults => {
                if ctx != Context::TypeDirectiveArg {
                    return Err(errors::results_only_in_type(span));
                }
                Ok(self.ast.alloc(span, Element::Results))
            }
            TokenKind::KwRegions => {
                if ctx == Context::TypeDirectiveArg {
                    return Err(errors::directive_top_level_only("regions", span));
                }
                if ctx == Context::RefDirectiveArg {
                    if !self.bind.all_regions {
                        return Err(errors::ref_all_directive_unbound("regions", span));
                    }
                } else {
                    if self.bind.all_regions || !self.bind.seen_regions.is_empty() {
                        return Err(errors::all_directive_overlap("regions", span));
                    }
                    self.bind.all_regions = true;
                }
                Ok(self.ast.alloc(span, Element::Regions))
            }
            TokenKind::KwSuccessors => {
                if ctx == Context::TypeDirectiveArg {
                    return Err(errors::directive_top_level_only("successors", span));
                }
                if ctx == Context::RefDirectiveArg {
                    if !self.bind.all_successors {
                        return Err(errors::ref_all_directive_unbound("successors", span));
                    }
                } else {
                    if self.bind.all_successors || !self.bind.seen_successors.is_empty() {
                        return Err(errors::all_directive_overlap("successors", span));
                    }
                    self.bind.all_successors = true;
                }
                Ok(self.ast.alloc(span, Element::Successors))
            }
            TokenKind::KwType => {
                if ctx == Context::TypeDirectiveArg {
                    return Err(errors::type_in_type_context(span));
                }
                let is_ref = ctx == Context::RefDirectiveArg;
                self.expect(TokenKind::LParen, "`(` before argument list")?;
                let arg = self.parse_type_directive_operand(is_ref)?;
                self.expect(TokenKind::RParen, "`)` after argument list")?;
                Ok(self.ast.alloc(span, Element::Type { arg }))
            }
            TokenKind::KwFunctionalType => {
                if ctx != Context::TopLevel {
                    return Err(errors::functional_type_top_level_only(span));
                }
                self.expect(TokenKind::LParen, "`(` before argument list")?;
                let inputs = self.parse_type_directive_operand(false)?;
                self.expect(TokenKind::Comma, "`,` after inputs argument")?;
                let results = self.parse_type_directive_operand(false)?;
                self.expect(TokenKind::RParen, "`)` after argument list")?;
                Ok(self.ast.alloc(span, Element::FunctionalType { inputs, results }))
            }
            TokenKind::KwOilist => self.parse_oilist(ctx, span),
            TokenKind::KwCustom => {
                if ctx != Context::TopLevel {
                    return Err(errors::custom_invalid_argument(span));
                }
                self.parse_custom(span)
            }
            TokenKind::KwRef => {
                if ctx != Context::CustomDirectiveArg {
                    return Err(errors::ref_only_in_custom(span));
                }
                self.expect(TokenKind::LParen, "`(` before argument list")?;
                let arg = self.parse_element(Context::RefDirectiveArg)?;
                self.expect(TokenKind::RParen, "`)` after argument list")?;
                let arg_span = self.ast.node(arg).span;
                if !is_ref_arg(&self.ast.node(arg).elem) {
                    return Err(errors::ref_invalid_argument(arg_span));
                }
                Ok(self.ast.alloc(span, Element::Ref { arg }))
            }
            TokenKind::KwQualified => {
                self.expect(TokenKind::LParen, "`(` before argument list")?;
                let inner = self.parse_element(ctx)?;
                self.expect(TokenKind::RParen, "`)` after argument list")?;
                match self.ast.node(inner).elem {
                    Element::Attribute { .. } | Element::Type { .. } => {
                        self.ast.qualified.push(inner);
                        Ok(inner)
                    }
                    _ => Err(errors::qualified_invalid_argument(span)),
                }
            }
            _ => unreachable!("token {:?} is not a directive keyword", tok.kind),
        }
    }

    fn parse_attr_dict(
        &mut self,
        ctx: Context,
        span: Span,
        with_keyword: bool,
    ) -> Result<ElemKey, Diagnostic> {
        if ctx == Context::TypeDirectiveArg {
            return Err(errors::attr_dict_top_level_only(span));
        }
        if ctx == Context::RefDirectiveArg {
            if !self.bind.has_attr_dict {
                return Err(errors::ref_attr_dict_unbound(span));
            }
        } else {
            if self.bind.has_attr_dict {
                return Err(errors::attr_dict_already_seen(span));
            }
            self.bind.has_attr_dict = true;
        }
        Ok(self.ast.alloc(span, Element::AttrDict { with_keyword }))
    }

    /// `type(..)`/`functional-type(..)` argument: an operand/result variable
    /// or the corresponding all-directive. Registers the type binding.
    fn parse_type_directive_operand(&mut self, is_ref: bool) -> Result<ElemKey, Diagnostic> {
        let key = self.parse_element(Context::TypeDirectiveArg)?;
        let span = self.ast.node(key).span;
        match self.ast.node(key).elem {
            Element::Operand { index } => {
                let name = self.op.operands[index].name.clone();
                let bound = self.bind.all_operand_types || self.bind.seen_operand_types[index];
                if !is_ref && bound {
                    return Err(errors::type_already_bound(&name, span));
                }
                if is_ref && !bound {
                    return Err(errors::ref_type_unbound(&name, span));
                }
                self.bind.seen_operand_types[index] = true;
            }
            Element::Result { index } => {
                let name = self.op.results[index].name.clone();
                let bound = self.bind.all_result_types || self.bind.seen_result_types[index];
                if !is_ref && bound {
                    return Err(errors::type_already_bound(&name, span));
                }
                if is_ref && !bound {
                    return Err(errors::ref_type_unbound(&name, span));
                }
                self.bind.seen_result_types[index] = true;
            }
            Element::Operands => {
                let any = self.bind.seen_operand_types.iter().any(|b| *b);
                if !is_ref && (self.bind.all_operand_types || any) {
                    return Err(errors::type_all_already_bound("operands", span));
                }
                if is_ref && !self.bind.all_operand_types {
                    return Err(errors::ref_type_all_unbound("operands", span));
                }
                self.bind.all_operand_types = true;
            }
            Element::Results => {
                let any = self.bind.seen_result_types.iter().any(|b| *b);
                if !is_ref && (self.bind.all_result_types || any) {
                    return Err(errors::type_all_already_bound("results", span));
                }
                if is_ref && !self.bind.all_result_types {
                    return Err(errors::ref_type_all_unbound("results", span));
                }
                self.bind.all_result_types = true;
            }
            _ => return Err(errors::type_invalid_argument(span)),
        }
        Ok(key)
    }

    fn parse_custom(&mut self, span: Span) -> Result<ElemKey, Diagnostic> {
        self.expect(TokenKind::Less, "`<` before custom directive name")?;
        let name = self.expect(TokenKind::Ident, "custom directive name")?;
        self.expect(TokenKind::Greater, "`>` after custom directive name")?;
        self.expect(TokenKind::LParen, "`(` before argument list")?;

        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let arg = self.parse_element(Context::CustomDirectiveArg)?;
                self.verify_custom_argument(arg)?;
                args.push(arg);
                if self.at(TokenKind::Comma) {
                    self.bump();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)` after argument list")?;
        Ok(self.ast.alloc(
            span,
            Element::Custom {
                name: name.text,
                args,
            },
        ))
    }

    fn verify_custom_argument(&self, arg: ElemKey) -> Result<(), Diagnostic> {
        let node = self.ast.node(arg);
        match &node.elem {
            Element::Attribute { .. }
            | Element::Property { .. }
            | Element::Operand { .. }
            | Element::Region { .. }
            | Element::Successor { .. }
            | Element::AttrDict { .. }
            | Element::PropDict
            | Element::Ref { .. }
            | Element::Str { .. } => Ok(()),
            Element::Type { arg } => match self.ast.node(*arg).elem {
                Element::Operand { .. } | Element::Result { .. } => Ok(()),
                _ => Err(errors::custom_type_arg_not_variable(node.span)),
            },
            _ => Err(errors::custom_invalid_argument(node.span)),
        }
    }

    fn parse_oilist(&mut self, ctx: Context, span: Span) -> Result<ElemKey, Diagnostic> {
        self.expect(TokenKind::LParen, "`(` before oilist argument list")?;
        let mut clauses = Vec::new();
        loop {
            let key_tok = self.peek().clone();
            if key_tok.kind != TokenKind::Literal || !is_keyword_literal(&key_tok.text) {
                return Err(errors::oilist_expected_keyword(key_tok.span));
            }
            let literal = self.parse_literal()?;

            let mut elements = Vec::new();
            while !self.at(TokenKind::Pipe) && !self.at(TokenKind::RParen) {
                if self.at(TokenKind::Eof) {
                    let tok = self.peek();
                    return Err(errors::expected_token(
                        "`|` or `)` in oilist",
                        &tok.text,
                        tok.span,
                    ));
                }
                elements.push(self.parse_element(ctx)?);
            }
            clauses.push(OIListClause { literal, elements });

            if self.at(TokenKind::Pipe) {
                self.bump();
                continue;
            }
            self.bump();
            break;
        }
        Ok(self.ast.alloc(span, Element::OIList { clauses }))
    }

    /// `(` then-elements `)` (`:` `(` else-elements `)`)? `?`, with one `^`
    /// anchor. An anchor in the else group marks the group inverted.
    fn parse_optional_group(&mut self) -> Result<ElemKey, Diagnostic> {
        let open = self.bump();
        let span = open.span;
        let (then, mut then_anchors) = self.parse_group_elements()?;
        self.expect(TokenKind::RParen, "`)` after optional group")?;

        let mut otherwise = Vec::new();
        let mut else_anchors = Vec::new();
        if self.at(TokenKind::Colon) {
            self.bump();
            self.expect(TokenKind::LParen, "`(` before else group")?;
            (otherwise, else_anchors) = self.parse_group_elements()?;
            self.expect(TokenKind::RParen, "`)` after else group")?;
        }
        self.expect(TokenKind::Question, "`?` after optional group")?;

        let inverted = !else_anchors.is_empty();
        then_anchors.append(&mut else_anchors);
        let anchor = match then_anchors.as_slice() {
            [] => return Err(errors::optional_missing_anchor(span)),
            [one] => *one,
            _ => return Err(errors::optional_multiple_anchors(span)),
        };

        let has_parsable = then
            .iter()
            .any(|k| !self.ast.node(*k).elem.is_whitespace());
        if !has_parsable {
            return Err(errors::optional_group_empty(span));
        }

        Ok(self.ast.alloc(
            span,
            Element::Optional {
                then,
                otherwise,
                anchor,
                inverted,
            },
        ))
    }

    fn parse_group_elements(&mut self) -> Result<(Vec<ElemKey>, Vec<ElemKey>), Diagnostic> {
        let mut elements = Vec::new();
        let mut anchors = Vec::new();
        while !self.at(TokenKind::RParen) {
            if self.at(TokenKind::Eof) {
                let tok = self.peek();
                return Err(errors::expected_token(
                    "`)` after optional group",
                    &tok.text,
                    tok.span,
                ));
            }
            let key = self.parse_element(Context::TopLevel)?;
            if self.at(TokenKind::Caret) {
                self.bump();
                anchors.push(key);
            }
            elements.push(key);
        }
        Ok((elements, anchors))
    }
}

fn is_ref_arg(elem: &Element) -> bool {
    matches!(
        elem,
        Element::Attribute { .. }
            | Element::Property { .. }
            | Element::Operand { .. }
            | Element::Region { .. }
            | Element::Successor { .. }
            | Element::AttrDict { .. }
            | Element::Operands
            | Element::Regions
            | Element::Successors
            | Element::Type { .. }
    )
}

fn is_keyword_literal(spelling: &str) -> bool {
    spelling
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

/// A literal is an identifier-like keyword or one of the fixed punctuation
/// spellings.
fn is_valid_literal(spelling: &str) -> bool {
    if is_keyword_literal(spelling) {
        return spelling
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'));
    }
    matches!(
        spelling,
        "->" | ":" | "," | "=" | "<" | ">" | "(" | ")" | "{" | "}" | "[" | "]" | "?" | "+" | "*"
            | "..." | "|"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttrDecl, RegionDecl, SuccessorDecl, ValueDecl};

    fn binop() -> Operation {
        Operation::new("test.binop")
            .operand(ValueDecl::single("lhs"))
            .operand(ValueDecl::single("rhs"))
            .result(ValueDecl::single("out"))
            .attribute(AttrDecl::new("pred"))
    }

    #[test]
    fn parses_a_plain_binary_format() {
        let op = binop();
        let (ast, bind) =
            parse_format(&op, "$lhs `,` $rhs attr-dict `:` type($lhs) `,` type($rhs)").unwrap();
        assert_eq!(ast.roots.len(), 7);
        assert!(bind.has_attr_dict);
        assert_eq!(bind.seen_operands.len(), 2);
        assert!(bind.seen_operand_types.iter().all(|b| *b));
    }

    #[test]
    fn double_binding_is_rejected_at_the_second_use() {
        let op = binop();
        let err = parse_format(&op, "$lhs attr-dict $lhs").unwrap_err();
        assert_eq!(err.code, 20);
        // The location is the second `$lhs`.
        assert_eq!(err.span.start, 15);
    }

    #[test]
    fn result_variables_only_in_type_directives() {
        let op = binop();
        let err = parse_format(&op, "$out attr-dict").unwrap_err();
        assert_eq!(err.code, 22);
        assert!(parse_format(&op, "$lhs $rhs attr-dict `:` type($out)").is_ok());
    }

    #[test]
    fn operands_directive_is_exclusive_with_individual_bindings() {
        let op = binop();
        let err = parse_format(&op, "$lhs operands attr-dict").unwrap_err();
        assert_eq!(err.code, 32);
        let err = parse_format(&op, "operands $lhs attr-dict").unwrap_err();
        assert_eq!(err.code, 20);
    }

    #[test]
    fn type_rebinding_is_rejected() {
        let op = binop();
        let err = parse_format(&op, "$lhs $rhs attr-dict type($lhs) type($lhs)").unwrap_err();
        assert_eq!(err.code, 36);
        let err = parse_format(&op, "$lhs $rhs attr-dict type($lhs) type(operands)").unwrap_err();
        assert_eq!(err.code, 38);
    }

    #[test]
    fn attr_dict_is_single_use() {
        let op = binop();
        let err = parse_format(&op, "attr-dict attr-dict").unwrap_err();
        assert_eq!(err.code, 28);
    }

    #[test]
    fn ref_requires_a_custom_directive_and_prior_binding() {
        let op = binop();
        let err = parse_format(&op, "ref($lhs) attr-dict").unwrap_err();
        assert_eq!(err.code, 15);
        let err = parse_format(&op, "custom<Foo>(ref($lhs)) attr-dict").unwrap_err();
        assert_eq!(err.code, 21);
        assert!(parse_format(&op, "$lhs $rhs custom<Foo>(ref($lhs)) attr-dict").is_ok());
    }

    #[test]
    fn optional_group_anchors() {
        let op = Operation::new("test.opt")
            .operand(ValueDecl::variadic("args"))
            .attribute(AttrDecl::new("pred"));
        let (ast, _) = parse_format(&op, "(`args` $args^)? attr-dict").unwrap();
        let root = ast.node(ast.roots[0]);
        match &root.elem {
            Element::Optional {
                then,
                otherwise,
                inverted,
                ..
            } => {
                assert_eq!(then.len(), 2);
                assert!(otherwise.is_empty());
                assert!(!inverted);
            }
            other => panic!("expected optional group, got {other:?}"),
        }

        let err = parse_format(&op, "(`args` $args)? attr-dict").unwrap_err();
        assert_eq!(err.code, 10);
    }

    #[test]
    fn inverted_optional_group_from_else_anchor() {
        let op = Operation::new("test.opt").operand(ValueDecl::variadic("args"));
        let (ast, _) = parse_format(&op, "(`none`) : ($args^)? attr-dict").unwrap();
        match &ast.node(ast.roots[0]).elem {
            Element::Optional { inverted, .. } => assert!(inverted),
            other => panic!("expected optional group, got {other:?}"),
        }
    }

    #[test]
    fn oilist_clauses_parse_in_declaration_order() {
        let op = Operation::new("test.oi")
            .operand(ValueDecl::variadic("a"))
            .operand(ValueDecl::variadic("b"));
        let (ast, _) =
            parse_format(&op, "oilist(`fst` $a | `snd` $b) attr-dict").unwrap();
        match &ast.node(ast.roots[0]).elem {
            Element::OIList { clauses } => {
                assert_eq!(clauses.len(), 2);
                let first = ast.node(clauses[0].literal).elem.literal_spelling();
                assert_eq!(first, Some("fst"));
            }
            other => panic!("expected oilist, got {other:?}"),
        }
    }

    #[test]
    fn regions_and_successors_bind_like_operands() {
        let op = Operation::new("test.flow")
            .region(RegionDecl::new("body"))
            .successor(SuccessorDecl::new("dest"));
        let (_, bind) = parse_format(&op, "$dest $body attr-dict").unwrap();
        assert_eq!(bind.seen_regions.len(), 1);
        assert_eq!(bind.seen_successors.len(), 1);

        let err = parse_format(&op, "regions $body attr-dict").unwrap_err();
        assert_eq!(err.code, 20);
    }

    #[test]
    fn qualified_marks_attributes_and_types() {
        let op = binop();
        let (ast, _) =
            parse_format(&op, "qualified($pred) $lhs $rhs attr-dict qualified(type($lhs))")
                .unwrap();
        assert_eq!(ast.qualified.len(), 2);

        let err = parse_format(&op, "qualified($lhs) attr-dict").unwrap_err();
        assert_eq!(err.code, 16);
    }

    #[test]
    fn unknown_names_are_located() {
        let op = binop();
        let err = parse_format(&op, "$missing attr-dict").unwrap_err();
        assert_eq!(err.code, 7);
        assert_eq!((err.span.start, err.span.end), (0, 8));
    }
}
