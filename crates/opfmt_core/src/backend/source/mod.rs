//! # Rust Source Rendering
//! Renders the parse and print programs into Rust functions over abstract
//! `AsmParser`/`AsmPrinter` handles and an `OperationState`/`OperationView`
//! pair supplied by the hosting runtime. The programs stay the product
//! boundary; this backend exists so a dialect runtime can splice the output
//! straight into its build.
//!
//! Mirrors the storage-then-fill shape of the original generators: every
//! operand/type/region/successor list is declared up front, elements fill
//! them in surface order, and the epilogue resolves the collected state.

use std::collections::HashSet;

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use crate::schema::Operation;

use super::parsegen::{
    OptionalParse, ParseProgram, ParseStep, ResolutionSource, SourceKind, UnitAnchor,
    ValueResolution,
};
use super::printgen::{Predicate, PrintProgram, PrintStep};
use super::{AttrRef, AttrStyle, CompiledFormat, CustomArg, FieldRef, TypeTarget};

/// Render both functions for one compiled operation.
pub fn render(op: &Operation, compiled: &CompiledFormat) -> TokenStream {
    let parse = render_parse_fn(op, &compiled.parse);
    let print = render_print_fn(op, &compiled.print);
    quote! {
        #parse
        #print
    }
}

/// Render and pretty-print. Fails only if the emitted tokens are not a valid
/// Rust file, which is a bug in this renderer.
pub fn render_pretty(op: &Operation, compiled: &CompiledFormat) -> Result<String, syn::Error> {
    let file: syn::File = syn::parse2(render(op, compiled))?;
    Ok(prettyplease::unparse(&file))
}

fn ident(name: &str) -> Ident {
    format_ident!("{}", name)
}

fn fn_stem(op: &Operation) -> String {
    op.name.replace(['.', '-'], "_")
}

// --- parser rendering ---

struct ParseRender {
    decls: Vec<TokenStream>,
    declared: HashSet<String>,
    regions: Vec<Ident>,
    successors: Vec<Ident>,
}

impl ParseRender {
    fn declare(&mut self, name: String, decl: impl FnOnce(&Ident) -> TokenStream) -> Ident {
        let id = ident(&name);
        if self.declared.insert(name) {
            self.decls.push(decl(&id));
        }
        id
    }

    fn operand_storage(&mut self, field: &FieldRef) -> Ident {
        self.declare(format!("{}_operands", field.name), |id| {
            quote! { let mut #id: Vec<OperandRef> = Vec::new(); }
        })
    }

    fn group_storage(&mut self, field: &FieldRef) -> Ident {
        self.declare(format!("{}_operands", field.name), |id| {
            quote! { let mut #id: Vec<Vec<OperandRef>> = Vec::new(); }
        })
    }

    fn type_storage(&mut self, name: &str) -> Ident {
        self.declare(format!("{name}_types"), |id| {
            quote! { let mut #id: Vec<Type> = Vec::new(); }
        })
    }

    fn all_storage(&mut self, name: &str, elem: TokenStream) -> Ident {
        self.declare(name.to_string(), |id| {
            quote! { let mut #id: Vec<#elem> = Vec::new(); }
        })
    }

    fn target_types(&mut self, target: &TypeTarget) -> Ident {
        match target {
            TypeTarget::Operand(f) | TypeTarget::Result(f) => self.type_storage(&f.name),
            TypeTarget::AllOperands => self.all_storage("all_operand_types", quote!(Type)),
            TypeTarget::AllResults => self.all_storage("all_result_types", quote!(Type)),
        }
    }

    /// Storage for an already-parsed type list, falling back to the
    /// all-directive storage when the field had no individual binding.
    fn parsed_types(&self, name: &str, all: &str) -> Ident {
        let individual = format!("{name}_types");
        if self.declared.contains(&individual) {
            ident(&individual)
        } else {
            ident(all)
        }
    }

    fn parsed_operands(&self, name: &str) -> Ident {
        let individual = format!("{name}_operands");
        if self.declared.contains(&individual) {
            ident(&individual)
        } else {
            ident("all_operands")
        }
    }
}

fn render_parse_fn(op: &Operation, prog: &ParseProgram) -> TokenStream {
    let name = format_ident!("parse_{}", fn_stem(op));
    let mut render = ParseRender {
        decls: Vec::new(),
        declared: HashSet::new(),
        regions: Vec::new(),
        successors: Vec::new(),
    };

    let body: Vec<TokenStream> = prog
        .steps
        .iter()
        .map(|step| render_parse_step(step, prog, &mut render))
        .collect();
    let decls = &render.decls;

    quote! {
        pub fn #name(
            p: &mut dyn AsmParser,
            state: &mut OperationState,
        ) -> ParseResult<()> {
            #(#decls)*
            #(#body)*
            Ok(())
        }
    }
}

fn render_parse_step(
    step: &ParseStep,
    prog: &ParseProgram,
    r: &mut ParseRender,
) -> TokenStream {
    match step {
        ParseStep::Keyword { spelling } => quote! { p.parse_keyword(#spelling)?; },
        ParseStep::Token { spelling } => quote! { p.parse_token(#spelling)?; },

        ParseStep::Operand(f) => {
            let id = r.operand_storage(f);
            quote! { #id.push(p.parse_operand()?); }
        }
        ParseStep::OptionalOperand(f) => {
            let id = r.operand_storage(f);
            quote! {
                if let Some(operand) = p.parse_optional_operand()? {
                    #id.push(operand);
                }
            }
        }
        ParseStep::OperandList(f) => {
            let id = r.operand_storage(f);
            quote! { #id = p.parse_operand_list()?; }
        }
        ParseStep::OperandGroups(f) => {
            let id = r.group_storage(f);
            quote! { #id = p.parse_operand_groups()?; }
        }
        ParseStep::AllOperands => {
            let id = r.all_storage("all_operands", quote!(OperandRef));
            quote! { #id = p.parse_operand_list()?; }
        }

        ParseStep::Type(target) => {
            let id = r.target_types(target);
            quote! { #id.push(p.parse_type()?); }
        }
        ParseStep::TypeList(target) => {
            let id = r.target_types(target);
            quote! { #id = p.parse_type_list()?; }
        }
        ParseStep::FunctionalType { inputs, results } => {
            let ins = r.target_types(inputs);
            let outs = r.target_types(results);
            quote! {
                let (fn_inputs, fn_results) = p.parse_functional_type()?;
                #ins = fn_inputs;
                #outs = fn_results;
            }
        }

        ParseStep::Attribute(attr) => render_attr_parse(attr),
        ParseStep::Property(prop) => {
            let name = &prop.name;
            if prop.has_default && prop.optional_parser {
                quote! {
                    if let Some(value) = p.parse_optional_property()? {
                        state.set_property(#name, value);
                    }
                }
            } else {
                quote! { state.set_property(#name, p.parse_property()?); }
            }
        }
        ParseStep::AttrDict { with_keyword: true } => {
            quote! { p.parse_optional_attr_dict_with_keyword(&mut state.attributes)?; }
        }
        ParseStep::AttrDict {
            with_keyword: false,
        } => {
            quote! { p.parse_optional_attr_dict(&mut state.attributes)?; }
        }
        ParseStep::PropDict => quote! { p.parse_prop_dict(&mut state.properties)?; },

        ParseStep::Region(region) => {
            let id = r.declare(format!("{}_regions", region.name), |id| {
                quote! { let mut #id: Vec<Region> = Vec::new(); }
            });
            r.regions.push(id.clone());
            if region.implicit_terminator {
                quote! { #id.push(p.parse_region_ensuring_terminator()?); }
            } else {
                quote! { #id.push(p.parse_region()?); }
            }
        }
        ParseStep::RegionList(region) => {
            let id = r.declare(format!("{}_regions", region.name), |id| {
                quote! { let mut #id: Vec<Region> = Vec::new(); }
            });
            r.regions.push(id.clone());
            quote! { #id = p.parse_region_list()?; }
        }
        ParseStep::AllRegions {
            implicit_terminator,
        } => {
            let id = r.all_storage("all_regions", quote!(Region));
            r.regions.push(id.clone());
            if *implicit_terminator {
                quote! {
                    #id = p.parse_region_list()?;
                    state.ensure_block_terminators(&mut #id);
                }
            } else {
                quote! { #id = p.parse_region_list()?; }
            }
        }
        ParseStep::Successor(succ) => {
            let id = r.declare(format!("{}_successors", succ.name), |id| {
                quote! { let mut #id: Vec<Successor> = Vec::new(); }
            });
            r.successors.push(id.clone());
            quote! { #id.push(p.parse_successor()?); }
        }
        ParseStep::SuccessorList(succ) => {
            let id = r.declare(format!("{}_successors", succ.name), |id| {
                quote! { let mut #id: Vec<Successor> = Vec::new(); }
            });
            r.successors.push(id.clone());
            quote! { #id = p.parse_successor_list()?; }
        }
        ParseStep::AllSuccessors => {
            let id = r.all_storage("all_successors", quote!(Successor));
            r.successors.push(id.clone());
            quote! { #id = p.parse_successor_list()?; }
        }

        ParseStep::Custom { name, args } => {
            let call = format_ident!("parse_{}", camel_to_snake(name));
            let args: Vec<TokenStream> =
                args.iter().map(|a| render_custom_parse_arg(a, r)).collect();
            quote! { #call(p, state #(, #args)*)?; }
        }

        ParseStep::Optional(optional) => render_optional_parse(optional, prog, r),

        ParseStep::OrderIndependent { clauses } => {
            let seen: Vec<Ident> = (0..clauses.len())
                .map(|i| format_ident!("seen_clause_{}", i))
                .collect();
            let decls = seen.iter().map(|id| quote! { let mut #id = false; });
            let arms = clauses.iter().zip(&seen).map(|(clause, seen_id)| {
                let keyword = &clause.keyword;
                let steps: Vec<TokenStream> = clause
                    .steps
                    .iter()
                    .map(|s| render_parse_step(s, prog, r))
                    .collect();
                quote! {
                    if p.parse_optional_keyword(#keyword)? {
                        if #seen_id {
                            return p.emit_error(concat!("`", #keyword, "` may only appear once"));
                        }
                        #seen_id = true;
                        #(#steps)*
                        continue;
                    }
                }
            });
            quote! {
                #(#decls)*
                loop {
                    #(#arms)*
                    break;
                }
            }
        }

        ParseStep::ResolveResultTypes { resolutions } => {
            let adds = resolutions
                .iter()
                .map(|res| render_result_resolution(res, prog, r));
            quote! { #(#adds)* }
        }
        ParseStep::InferResultTypes => quote! { state.infer_result_types(p)?; },
        ParseStep::ResolveOperandTypes { resolutions } => {
            let resolves = resolutions
                .iter()
                .map(|res| render_operand_resolution(res, prog, r));
            quote! { #(#resolves)* }
        }
        ParseStep::AddRegions => {
            let regions = &r.regions;
            quote! { #(state.add_regions(#regions);)* }
        }
        ParseStep::AddSuccessors => {
            let successors = &r.successors;
            quote! { #(state.add_successors(#successors);)* }
        }
        ParseStep::OperandSegmentSizes {
            fields,
            as_property,
        } => {
            let lens = fields.iter().map(|f| {
                let storage = format!("{}_operands", f.name);
                if r.declared.contains(&storage) {
                    let id = ident(&storage);
                    quote! { #id.len() as i32 }
                } else {
                    // Covered by an all-directive; the flat list has no
                    // per-field boundaries, so ask the builder state.
                    let name = &f.name;
                    quote! { state.operand_count(#name) as i32 }
                }
            });
            render_segment_sizes("operand_segment_sizes", *as_property, lens)
        }
        ParseStep::ResultSegmentSizes {
            fields,
            as_property,
        } => {
            // Result lengths come from the resolved result types.
            let lens = fields.iter().map(|f| {
                let storage = format!("{}_types", f.name);
                if r.declared.contains(&storage) {
                    let id = ident(&storage);
                    quote! { #id.len() as i32 }
                } else {
                    let name = &f.name;
                    quote! { state.result_type_count(#name) as i32 }
                }
            });
            render_segment_sizes("result_segment_sizes", *as_property, lens)
        }
        ParseStep::VariadicGroupSizes { value, attr } => {
            let id = r.parsed_operands(&value.name);
            quote! {
                state.set_size_attribute(
                    #attr,
                    &#id.iter().map(|group| group.len() as i32).collect::<Vec<_>>(),
                );
            }
        }
    }
}

fn render_segment_sizes(
    key: &str,
    as_property: bool,
    lens: impl Iterator<Item = TokenStream>,
) -> TokenStream {
    let lens = lens.collect::<Vec<_>>();
    if as_property {
        quote! { state.set_size_property(#key, &[#(#lens),*]); }
    } else {
        quote! { state.set_size_attribute(#key, &[#(#lens),*]); }
    }
}

fn render_attr_parse(attr: &AttrRef) -> TokenStream {
    let name = &attr.name;
    match &attr.style {
        AttrStyle::Enum { values } => quote! {
            state.add_attribute(#name, p.parse_enum_keyword(&[#(#values),*])?);
        },
        AttrStyle::SymbolName => quote! {
            state.add_attribute(#name, p.parse_symbol_name()?);
        },
        AttrStyle::Generic => {
            let call = if attr.qualified {
                quote! { p.parse_qualified_attribute() }
            } else {
                quote! { p.parse_attribute() }
            };
            if attr.optional || attr.has_default {
                let optional_call = if attr.qualified {
                    quote! { p.parse_optional_qualified_attribute() }
                } else {
                    quote! { p.parse_optional_attribute() }
                };
                quote! {
                    if let Some(value) = #optional_call? {
                        state.add_attribute(#name, value);
                    }
                }
            } else {
                quote! { state.add_attribute(#name, #call?); }
            }
        }
    }
}

fn render_optional_parse(
    optional: &OptionalParse,
    prog: &ParseProgram,
    r: &mut ParseRender,
) -> TokenStream {
    let condition = match optional.probe.as_ref() {
        ParseStep::Keyword { spelling } => quote! { p.parse_optional_keyword(#spelling)? },
        ParseStep::Token { spelling } => quote! { p.parse_optional_token(#spelling)? },
        probe => {
            let step = render_parse_step(probe, prog, r);
            quote! { p.try_parse(|p| { #step Ok(()) })? }
        }
    };

    let synth = optional.synthesize.as_ref().map(|anchor| match anchor {
        UnitAnchor::Attribute(attr) => {
            let name = &attr.name;
            quote! { state.add_attribute(#name, p.unit_attribute()); }
        }
        UnitAnchor::Property(prop) => {
            let name = &prop.name;
            quote! { state.set_property(#name, p.unit_value()); }
        }
    });
    let (then_synth, else_synth) = if optional.inverted {
        (None, synth)
    } else {
        (synth, None)
    };

    let then: Vec<TokenStream> = optional
        .then
        .iter()
        .map(|s| render_parse_step(s, prog, r))
        .collect();
    let otherwise: Vec<TokenStream> = optional
        .otherwise
        .iter()
        .map(|s| render_parse_step(s, prog, r))
        .collect();

    if otherwise.is_empty() && else_synth.is_none() {
        quote! {
            if #condition {
                #(#then)*
                #then_synth
            }
        }
    } else {
        quote! {
            if #condition {
                #(#then)*
                #then_synth
            } else {
                #(#otherwise)*
                #else_synth
            }
        }
    }
}

fn render_result_resolution(
    res: &ValueResolution,
    prog: &ParseProgram,
    r: &ParseRender,
) -> TokenStream {
    match &res.source {
        ResolutionSource::Parsed => {
            let tys = r.parsed_types(&res.field.name, "all_result_types");
            quote! { state.add_result_types(&#tys); }
        }
        ResolutionSource::Variable {
            kind,
            name,
            transformer,
            ..
        } => {
            let source = render_source_types(*kind, name, r);
            match transformer {
                Some(expr) => quote! {
                    state.add_result_types(&p.transform_types(#expr, &#source)?);
                },
                None => quote! { state.add_result_types(&#source); },
            }
        }
        ResolutionSource::Buildable(index) => {
            let expr = &prog.buildable_types[*index];
            quote! { state.add_result_types(&[p.build_type(#expr)?]); }
        }
        ResolutionSource::Inferred => TokenStream::new(),
    }
}

fn render_operand_resolution(
    res: &ValueResolution,
    prog: &ParseProgram,
    r: &ParseRender,
) -> TokenStream {
    let ops = r.parsed_operands(&res.field.name);
    match &res.source {
        ResolutionSource::Parsed => {
            let tys = r.parsed_types(&res.field.name, "all_operand_types");
            quote! { p.resolve_operands(&#ops, &#tys, state)?; }
        }
        ResolutionSource::Variable {
            kind,
            name,
            transformer,
            ..
        } => {
            let source = render_source_types(*kind, name, r);
            match transformer {
                Some(expr) => quote! {
                    p.resolve_operands(&#ops, &p.transform_types(#expr, &#source)?, state)?;
                },
                None => quote! { p.resolve_operands(&#ops, &#source, state)?; },
            }
        }
        ResolutionSource::Buildable(index) => {
            let expr = &prog.buildable_types[*index];
            quote! { p.resolve_operands(&#ops, &[p.build_type(#expr)?], state)?; }
        }
        ResolutionSource::Inferred => {
            quote! { p.resolve_operands_with_inferred_types(&#ops, state)?; }
        }
    }
}

fn render_source_types(kind: SourceKind, name: &str, r: &ParseRender) -> TokenStream {
    match kind {
        SourceKind::Operand => {
            let tys = r.parsed_types(name, "all_operand_types");
            quote! { #tys }
        }
        SourceKind::Result => {
            let tys = r.parsed_types(name, "all_result_types");
            quote! { #tys }
        }
        SourceKind::Attribute => {
            quote! { [state.attribute_type(#name)] }
        }
    }
}

fn render_custom_parse_arg(arg: &CustomArg, r: &mut ParseRender) -> TokenStream {
    match arg {
        CustomArg::Attribute(attr) => {
            let name = &attr.name;
            quote! { state.attribute_slot(#name) }
        }
        CustomArg::Property(prop) => {
            let name = &prop.name;
            quote! { state.property_slot(#name) }
        }
        CustomArg::Operand(f) => {
            let id = r.operand_storage(f);
            quote! { &mut #id }
        }
        CustomArg::Region(region) => {
            let id = r.declare(format!("{}_regions", region.name), |id| {
                quote! { let mut #id: Vec<Region> = Vec::new(); }
            });
            quote! { &mut #id }
        }
        CustomArg::Successor(succ) => {
            let id = r.declare(format!("{}_successors", succ.name), |id| {
                quote! { let mut #id: Vec<Successor> = Vec::new(); }
            });
            quote! { &mut #id }
        }
        CustomArg::AttrDict => quote! { &mut state.attributes },
        CustomArg::PropDict => quote! { &mut state.properties },
        CustomArg::AllOperands => {
            let id = r.all_storage("all_operands", quote!(OperandRef));
            quote! { &mut #id }
        }
        CustomArg::AllRegions => {
            let id = r.all_storage("all_regions", quote!(Region));
            quote! { &mut #id }
        }
        CustomArg::AllSuccessors => {
            let id = r.all_storage("all_successors", quote!(Successor));
            quote! { &mut #id }
        }
        CustomArg::Str(value) => quote! { #value },
        CustomArg::TypeOf(target) => {
            let id = r.target_types(target);
            quote! { &mut #id }
        }
        CustomArg::Ref(inner) => render_custom_parse_arg(inner, r),
    }
}

// --- printer rendering ---

fn render_print_fn(op: &Operation, prog: &PrintProgram) -> TokenStream {
    let name = format_ident!("print_{}", fn_stem(op));
    let body: Vec<TokenStream> = prog.steps.iter().map(render_print_step).collect();
    quote! {
        pub fn #name(p: &mut dyn AsmPrinter, op: &OperationView) {
            #(#body)*
        }
    }
}

fn render_print_step(step: &PrintStep) -> TokenStream {
    match step {
        PrintStep::Literal { spelling } => quote! { p.print_literal(#spelling); },
        PrintStep::Space => quote! { p.print_space(); },
        PrintStep::Newline => quote! { p.print_newline(); },

        PrintStep::Operand(f) => {
            let getter = ident(&f.getter);
            quote! { p.print_operand(op.#getter()); }
        }
        PrintStep::OperandList(f) => {
            let getter = ident(&f.getter);
            quote! { p.print_operand_list(op.#getter()); }
        }
        PrintStep::OperandGroups(f) => {
            let getter = ident(&f.getter);
            quote! { p.print_operand_groups(op.#getter()); }
        }
        PrintStep::AllOperands => quote! { p.print_operand_list(op.operands()); },

        PrintStep::Type { target, qualified } => {
            let expr = render_type_expr(target);
            if *qualified {
                quote! { p.print_qualified_type(#expr); }
            } else {
                quote! { p.print_type(#expr); }
            }
        }
        PrintStep::TypeList { target } => {
            let expr = render_type_expr(target);
            quote! { p.print_type_list(#expr); }
        }
        PrintStep::FunctionalType { inputs, results } => {
            let ins = render_type_expr(inputs);
            let outs = render_type_expr(results);
            quote! { p.print_functional_type(#ins, #outs); }
        }

        PrintStep::Attribute(attr) => render_attr_print(attr),
        PrintStep::Property(prop) => {
            let getter = ident(&prop.getter);
            quote! { p.print_property(op.#getter()); }
        }
        PrintStep::AttrDict {
            with_keyword,
            elided,
            elide_if_default,
        } => {
            let call = if *with_keyword {
                format_ident!("print_attr_dict_with_keyword")
            } else {
                format_ident!("print_attr_dict")
            };
            quote! {
                p.#call(op.attributes(), &[#(#elided),*], &[#(#elide_if_default),*]);
            }
        }
        PrintStep::PropDict {
            elided,
            elide_if_default,
        } => quote! {
            p.print_prop_dict(op.properties(), &[#(#elided),*], &[#(#elide_if_default),*]);
        },

        PrintStep::Region(region) => {
            let getter = ident(&region.getter);
            if region.implicit_terminator {
                quote! { p.print_region_eliding_terminator(op.#getter()); }
            } else {
                quote! { p.print_region(op.#getter()); }
            }
        }
        PrintStep::RegionList(region) => {
            let getter = ident(&region.getter);
            quote! { p.print_region_list(op.#getter()); }
        }
        PrintStep::AllRegions { .. } => quote! { p.print_region_list(op.regions()); },
        PrintStep::Successor(succ) => {
            let getter = ident(&succ.getter);
            quote! { p.print_successor(op.#getter()); }
        }
        PrintStep::SuccessorList(succ) => {
            let getter = ident(&succ.getter);
            quote! { p.print_successor_list(op.#getter()); }
        }
        PrintStep::AllSuccessors => quote! { p.print_successor_list(op.successors()); },

        PrintStep::Custom { name, args } => {
            let call = format_ident!("print_{}", camel_to_snake(name));
            let args: Vec<TokenStream> = args.iter().map(render_custom_print_arg).collect();
            quote! { #call(p, op #(, #args)*); }
        }

        PrintStep::Conditional {
            predicate,
            then,
            otherwise,
        } => {
            let condition = render_predicate(predicate);
            let then: Vec<TokenStream> = then.iter().map(render_print_step).collect();
            if otherwise.is_empty() {
                quote! {
                    if #condition {
                        #(#then)*
                    }
                }
            } else {
                let otherwise: Vec<TokenStream> =
                    otherwise.iter().map(render_print_step).collect();
                quote! {
                    if #condition {
                        #(#then)*
                    } else {
                        #(#otherwise)*
                    }
                }
            }
        }
    }
}

fn render_attr_print(attr: &AttrRef) -> TokenStream {
    let getter = ident(&attr.getter);
    match &attr.style {
        AttrStyle::Enum { .. } => quote! { p.print_keyword_or_string(op.#getter()); },
        AttrStyle::SymbolName => quote! { p.print_symbol_name(op.#getter()); },
        AttrStyle::Generic => {
            if attr.qualified {
                quote! { p.print_qualified_attribute(op.#getter()); }
            } else if attr.buildable_type {
                // The type is rebuilt when parsing, so it is not printed.
                quote! { p.print_attribute_without_type(op.#getter()); }
            } else {
                quote! { p.print_attribute(op.#getter()); }
            }
        }
    }
}

fn render_type_expr(target: &TypeTarget) -> TokenStream {
    match target {
        TypeTarget::Operand(f) | TypeTarget::Result(f) => {
            let getter = ident(&f.getter);
            if f.length.is_variable() {
                quote! { op.#getter().types() }
            } else {
                quote! { op.#getter().ty() }
            }
        }
        TypeTarget::AllOperands => quote! { op.operand_types() },
        TypeTarget::AllResults => quote! { op.result_types() },
    }
}

fn render_custom_print_arg(arg: &CustomArg) -> TokenStream {
    match arg {
        CustomArg::Attribute(attr) => {
            let getter = ident(&attr.getter);
            quote! { op.#getter() }
        }
        CustomArg::Property(prop) => {
            let getter = ident(&prop.getter);
            quote! { op.#getter() }
        }
        CustomArg::Operand(f) => {
            let getter = ident(&f.getter);
            quote! { op.#getter() }
        }
        CustomArg::Region(region) => {
            let getter = ident(&region.getter);
            quote! { op.#getter() }
        }
        CustomArg::Successor(succ) => {
            let getter = ident(&succ.getter);
            quote! { op.#getter() }
        }
        CustomArg::AttrDict => quote! { op.attributes() },
        CustomArg::PropDict => quote! { op.properties() },
        CustomArg::AllOperands => quote! { op.operands() },
        CustomArg::AllRegions => quote! { op.regions() },
        CustomArg::AllSuccessors => quote! { op.successors() },
        CustomArg::Str(value) => quote! { #value },
        CustomArg::TypeOf(target) => render_type_expr(target),
        CustomArg::Ref(inner) => render_custom_print_arg(inner),
    }
}

fn render_predicate(predicate: &Predicate) -> TokenStream {
    match predicate {
        Predicate::AttrPresent(attr) => {
            let name = &attr.name;
            if attr.has_default {
                quote! { op.attribute_differs_from_default(#name) }
            } else {
                quote! { op.has_attribute(#name) }
            }
        }
        Predicate::PropNonDefault(prop) => {
            let name = &prop.name;
            quote! { op.property_differs_from_default(#name) }
        }
        Predicate::OperandNonEmpty(f) | Predicate::ResultNonEmpty(f) => {
            let getter = ident(&f.getter);
            quote! { !op.#getter().is_empty() }
        }
        Predicate::RegionNonEmpty(region) => {
            let getter = ident(&region.getter);
            quote! { !op.#getter().is_empty() }
        }
        Predicate::SuccessorNonEmpty(succ) => {
            let getter = ident(&succ.getter);
            quote! { !op.#getter().is_empty() }
        }
        Predicate::AnyOf(preds) => {
            if preds.is_empty() {
                return quote! { false };
            }
            let parts: Vec<TokenStream> = preds.iter().map(render_predicate).collect();
            quote! { (#(#parts)||*) }
        }
        Predicate::Not(inner) => {
            let inner = render_predicate(inner);
            quote! { !(#inner) }
        }
    }
}

fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{parsegen, printgen};
    use crate::frontend::format::build_plan;
    use crate::schema::{AttrDecl, OpTrait, ValueDecl};

    fn compiled(op: &Operation, format: &str) -> CompiledFormat {
        let plan = build_plan(op, format).unwrap();
        CompiledFormat {
            parse: parsegen::generate(op, &plan),
            print: printgen::generate(op, &plan),
        }
    }

    /// Token streams stringify with incidental spacing; compare dense.
    fn dense(ts: &TokenStream) -> String {
        ts.to_string().split_whitespace().collect()
    }

    #[test]
    fn renders_both_functions() {
        let op = Operation::new("test.add")
            .operand(ValueDecl::single("lhs"))
            .operand(ValueDecl::single("rhs"))
            .result(ValueDecl::single("out"))
            .with_trait(OpTrait::SameOperandsAndResultType);
        let c = compiled(&op, "$lhs `,` $rhs attr-dict `:` type($lhs)");
        let rendered = render(&op, &c);
        let text = dense(&rendered);

        assert!(text.contains("pubfnparse_test_add"));
        assert!(text.contains("pubfnprint_test_add"));
        assert!(text.contains("p.parse_token(\",\")?"));
        assert!(text.contains("lhs_operands.push(p.parse_operand()?)"));
        assert!(text.contains("lhs_types.push(p.parse_type()?)"));
        // Result types are copied from lhs before operands resolve.
        assert!(text.contains("state.add_result_types(&lhs_types)"));
        assert!(text.contains("p.resolve_operands(&lhs_operands,&lhs_types,state)?"));
        // Printing uses the accessor names verbatim.
        assert!(text.contains("p.print_operand(op.get_lhs())"));
    }

    #[test]
    fn optional_group_renders_probe_and_synthesis() {
        let op = Operation::new("test.flag")
            .attribute(AttrDecl::new("fast").unit())
            .operand(ValueDecl::variadic("args").with_buildable_type("int32"));
        let c = compiled(&op, "(`fast` $fast^)? $args attr-dict");
        let text = dense(&render(&op, &c));

        assert!(text.contains("if p.parse_optional_keyword(\"fast\")?"));
        assert!(text.contains("state.add_attribute(\"fast\",p.unit_attribute())"));
        assert!(text.contains("op.has_attribute(\"fast\")"));
    }

    #[test]
    fn buildable_types_render_inline() {
        let op = Operation::new("test.pool")
            .operand(ValueDecl::single("a").with_buildable_type("int32"));
        let c = compiled(&op, "$a attr-dict");
        let text = dense(&render(&op, &c));
        assert!(text.contains("p.build_type(\"int32\")?"));
    }

    #[test]
    fn rendered_source_is_valid_rust() {
        let op = Operation::new("test.call")
            .operand(ValueDecl::variadic("args"))
            .result(ValueDecl::variadic("outs"));
        let c = compiled(
            &op,
            "`(` $args `)` attr-dict `:` functional-type($args, $outs)",
        );
        let pretty = render_pretty(&op, &c).unwrap();
        assert!(pretty.contains("pub fn parse_test_call"));
        assert!(pretty.contains("pub fn print_test_call"));
    }

    #[test]
    fn custom_directive_names_are_snaked() {
        assert_eq!(camel_to_snake("MyThing"), "my_thing");
        assert_eq!(camel_to_snake("Operand"), "operand");
    }
}
