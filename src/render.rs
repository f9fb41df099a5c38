//! HTML fragments for references, types and documentation text.
//!
//! Every writer takes an [`OutputContext`] saying what markup is allowed and
//! where the text lands, and narrows it for whatever it nests inside. Doc
//! text is interpreted under a [`SourceContext`] so that relative references
//! and `{@inheritDoc}` find the right element.

use url::Url;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, DiscardingSink};
use crate::doctext::{BlockTag, DocComment, DocNode, first_sentence};
use crate::error::Error;
use crate::link_detail::LinkDetail;
use crate::locate::Locator;
use crate::output_context::OutputContext;
use crate::resolver::{self, ResolveOptions, Resolver};
use crate::signature::SignatureParser;
use crate::source_context::{SourceContext, TagScope};
use crate::symbols::{ROOT_CLASS, SymbolTable, TypeIdentity};
use crate::types::{ErasedType, ResolvedReference, Symbol, SymbolId, SymbolKind, TypeRef, TypeVarId, is_primitive};

/// Word-break opportunity between name segments.
const WORD_BREAK: &str = "<wbr>";

/// Writes references and documentation for one symbol universe.
///
/// Holds only shared references, so one renderer serves every page of a
/// slice from any number of threads.
pub struct Renderer<'a> {
    /// Type comparison for the recursion guard.
    identity: &'a dyn TypeIdentity,
    /// Destination lookup.
    locator: &'a dyn Locator,
    /// Grammar for `{@link}` references.
    parser: &'a SignatureParser,
    /// Signature lookup.
    resolver: Resolver<'a>,
    /// Where reference failures go.
    sink: &'a dyn DiagnosticSink,
    /// Symbol universe.
    table: &'a dyn SymbolTable,
}

impl std::fmt::Debug for Renderer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.debug_struct("Renderer").field("resolver", &self.resolver).finish_non_exhaustive();
    }
}

impl<'a> Renderer<'a> {
    /// Renderer over `table`, reporting reference failures to `sink`.
    pub fn new(
        table: &'a dyn SymbolTable,
        identity: &'a dyn TypeIdentity,
        locator: &'a dyn Locator,
        parser: &'a SignatureParser,
        options: ResolveOptions,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        return Self {
            identity,
            locator,
            parser,
            resolver: Resolver::new(table, locator, options),
            sink,
            table,
        };
    }

    /// The same renderer with reporting switched off, for summaries whose
    /// text is reported in full elsewhere.
    fn quiet(&self) -> Self {
        return Self { resolver: self.resolver.clone(), sink: &DiscardingSink, ..*self };
    }

    /// The resolver used for `{@link}` references.
    pub const fn resolver(&self) -> &Resolver<'a> {
        return &self.resolver;
    }

    // ── References ──────────────────────────────────────────────────

    /// Write a reference to a resolved element.
    ///
    /// `written` is shown for targets outside the documented universe,
    /// which carry no symbol to name.
    pub fn write_element_reference(
        &self,
        out: &mut String,
        ctx: &OutputContext,
        resolved: &ResolvedReference,
        detail: &LinkDetail,
        written: &str,
    ) {
        let (enclosed, code) = open_code(out, ctx);
        let detail = if resolved.location.is_none() {
            detail.clone().with_package_if_no_label()
        } else {
            detail.clone()
        };
        let class = resolved
            .target()
            .and_then(|t| return self.table.symbol(t))
            .map_or("external", |s| return s.kind.as_str());
        let (inner, close) = open_wrapper(out, &enclosed, resolved.location.as_ref(), class);
        self.write_reference_name(out, &inner, resolved, &detail, written);
        out.push_str(close);
        close_code(out, code);
    }

    /// The display text of a reference, per `detail`.
    fn write_reference_name(
        &self,
        out: &mut String,
        ctx: &OutputContext,
        resolved: &ResolvedReference,
        detail: &LinkDetail,
        written: &str,
    ) {
        if let Some(label) = detail.label() {
            self.write_nodes(out, ctx, &label.source, &label.content);
            return;
        }
        let Some(symbol) = resolved.target().and_then(|t| return self.table.symbol(t)) else {
            write_camel_text(out, ctx, written);
            return;
        };
        match symbol.kind {
            SymbolKind::Module | SymbolKind::Package => write_camel_text(out, ctx, &symbol.qualified_name),
            kind if kind.is_type() => self.write_class_name(out, ctx, symbol, detail),
            _ => self.write_member_name(out, ctx, symbol, detail),
        }
        return;
    }

    /// Optional package or containers, the simple name, then short type
    /// parameters unless the class is named as a static member's container.
    fn write_class_name(&self, out: &mut String, ctx: &OutputContext, class: &Symbol, detail: &LinkDetail) {
        let container_ctx = if class.is_static { ctx.for_static() } else { ctx.clone() };
        if let Some(outer) = class.enclosing.and_then(|e| return self.table.symbol(e)) {
            let shown = if outer.kind == SymbolKind::Package {
                detail.is_showing_package() && !outer.name.is_empty()
            } else {
                self.shows_container(ctx, detail, outer.id)
            };
            if shown {
                self.write_container(out, &container_ctx, outer, detail);
                write_separator(out, ctx);
            }
        }

        write_camel_text(out, ctx, &class.name);
        if ctx.is_static_reference() || class.type_parameters.is_empty() {
            return;
        }
        if ctx.can_mark_up_inline() {
            out.push_str(WORD_BREAK);
        }
        let names: Vec<&str> = class
            .type_parameters
            .iter()
            .filter_map(|&tv| return self.table.type_variable(tv))
            .map(|tv| return tv.name.as_str())
            .collect();
        out.push_str(&ctx.escape(&format!("<{}>", names.join(", "))));
        return;
    }

    /// Containers, the member name, then erased parameters if shown.
    fn write_member_name(&self, out: &mut String, ctx: &OutputContext, member: &Symbol, detail: &LinkDetail) {
        if let Some(class) = member.enclosing.and_then(|e| return self.table.symbol(e)) {
            if self.shows_container(ctx, detail, class.id) {
                let container_ctx = if member.is_static { ctx.for_static() } else { ctx.clone() };
                self.write_container(out, &container_ctx, class, detail);
                write_separator(out, ctx);
            }
        }
        write_camel_text(out, ctx, &member.name);

        if !member.kind.is_executable() || !detail.is_showing_parameters() {
            return;
        }
        out.push_str(&ctx.escape("("));
        let erased = self.table.erased_parameters(member.id);
        let last = erased.len().saturating_sub(1);
        for (index, param) in erased.iter().enumerate() {
            if index > 0 {
                out.push_str(&ctx.escape(", "));
            }
            self.write_erased_type(out, ctx, param, member.varargs && index == last);
        }
        out.push_str(&ctx.escape(")"));
        return;
    }

    /// A nested reference to an enclosing package or class. Package display
    /// carries through; container trimming stays relative to the page.
    fn write_container(&self, out: &mut String, ctx: &OutputContext, container: &Symbol, detail: &LinkDetail) {
        let container_detail = if detail.is_showing_package() {
            LinkDetail::NORMAL.with_package()
        } else if detail.is_showing_containers() {
            LinkDetail::NORMAL
        } else {
            LinkDetail::NORMAL.without_nonessential_containers()
        };
        let reference = self.resolver.reference_to(container.id);
        self.write_element_reference(out, ctx, &reference, &container_detail, &container.qualified_name);
        return;
    }

    /// Whether `container` is shown before a name: always when all
    /// containers are requested, otherwise only when it does not enclose the
    /// element whose page this is.
    fn shows_container(&self, ctx: &OutputContext, detail: &LinkDetail, container: SymbolId) -> bool {
        if detail.is_showing_containers() {
            return true;
        }
        return detail.is_showing_necessary_containers()
            && !ctx.subject().is_some_and(|s| return self.table.encloses_or_same(container, s));
    }

    /// An erased parameter type; the last varargs parameter drops one
    /// dimension for `...`.
    fn write_erased_type(&self, out: &mut String, ctx: &OutputContext, erased: &ErasedType, varargs: bool) {
        let ty = if is_primitive(&erased.name) {
            TypeRef::Primitive(erased.name.clone())
        } else {
            match self.table.class_named(&erased.name) {
                Some(symbol) => TypeRef::Declared { args: Vec::new(), symbol },
                None => TypeRef::Unresolved(erased.name.clone()),
            }
        };
        self.write_type(out, ctx, &ty);
        let dimensions = if varargs { erased.dimensions.saturating_sub(1) } else { erased.dimensions };
        for _ in 0..dimensions {
            out.push_str(&ctx.escape("[]"));
        }
        if varargs {
            out.push_str(&ctx.escape("..."));
        }
        return;
    }

    // ── Types ───────────────────────────────────────────────────────

    /// Write a type as a reference: the label if `detail` has one,
    /// otherwise the type's own text with links where possible.
    pub fn write_type_reference(&self, out: &mut String, ctx: &OutputContext, ty: &TypeRef, detail: &LinkDetail) {
        let (enclosed, code) = open_code(out, ctx);
        match detail.label() {
            Some(label) => self.write_nodes(out, &enclosed, &label.source, &label.content),
            None => self.write_type(out, &enclosed, ty),
        }
        close_code(out, code);
    }

    /// The text of a type. Type variables expand their bounds the first
    /// time they are met on the context chain and are bare afterwards.
    fn write_type(&self, out: &mut String, ctx: &OutputContext, ty: &TypeRef) {
        match ty {
            TypeRef::Primitive(name) => out.push_str(&ctx.escape(name)),
            TypeRef::Unresolved(name) => write_camel_text(out, ctx, name),
            TypeRef::Array(component) => {
                self.write_type(out, ctx, component);
                out.push_str(&ctx.escape("[]"));
            },
            TypeRef::Wildcard { lower, upper } => {
                out.push_str(&ctx.escape("?"));
                if let Some(lower) = lower {
                    out.push_str(&ctx.escape(" super "));
                    self.write_type(out, ctx, lower);
                }
                if let Some(upper) = upper {
                    out.push_str(&ctx.escape(" extends "));
                    self.write_type(out, ctx, upper);
                }
            },
            TypeRef::Declared { args, symbol } => self.write_declared(out, ctx, *symbol, args),
            TypeRef::Variable(var) => self.write_type_variable(out, ctx, *var),
        }
    }

    /// A class type with its package when it cannot be linked, its
    /// enclosing class, and its type arguments outside the link.
    fn write_declared(&self, out: &mut String, ctx: &OutputContext, id: SymbolId, args: &[TypeRef]) {
        let Some(class) = self.table.symbol(id) else {
            return;
        };
        let location = self.locator.locate(id);
        if location.is_none() {
            tracing::debug!(class = %class.qualified_name, "type reference has no location");
        }
        let (inner, close) = open_wrapper(out, ctx, location.as_ref(), class.kind.as_str());

        match class.enclosing.and_then(|e| return self.table.symbol(e)) {
            Some(outer) if outer.kind.is_type() => {
                self.write_declared(out, &inner, outer.id, &[]);
                write_separator(out, &inner);
            },
            Some(package) if location.is_none() && !package.name.is_empty() => {
                let reference = self.resolver.reference_to(package.id);
                self.write_element_reference(out, &inner, &reference, &LinkDetail::NORMAL, &package.name);
                write_separator(out, &inner);
            },
            _ => {},
        }
        write_camel_text(out, &inner, &class.name);
        out.push_str(close);

        if args.is_empty() {
            return;
        }
        if ctx.can_mark_up_inline() {
            out.push_str(WORD_BREAK);
        }
        out.push_str(&ctx.escape("<"));
        for (index, arg) in args.iter().enumerate() {
            if index > 0 {
                out.push_str(&ctx.escape(", "));
            }
            self.write_type(out, ctx, arg);
        }
        out.push_str(&ctx.escape(">"));
        return;
    }

    /// A type variable's name, linked to its owner, then `extends` bounds
    /// unless it is already being expressed further out.
    fn write_type_variable(&self, out: &mut String, ctx: &OutputContext, var: TypeVarId) {
        let Some(variable) = self.table.type_variable(var) else {
            return;
        };
        let location = self.locator.locate(variable.owner);
        let (inner, close) = open_wrapper(out, ctx, location.as_ref(), "type-variable");
        write_camel_text(out, &inner, &variable.name);
        out.push_str(close);

        if ctx.is_accounted_for(var, self.identity) {
            return;
        }
        let expressing = ctx.account_for(var, self.identity);
        let bounds = variable.bounds.iter().filter(|b| return !self.is_root_class(b));
        for (index, bound) in bounds.enumerate() {
            let joiner = if index == 0 { " extends " } else { " & " };
            out.push_str(&expressing.escape(joiner));
            self.write_type(out, &expressing, bound);
        }
        return;
    }

    /// Whether `ty` is the implicit bound of every variable.
    fn is_root_class(&self, ty: &TypeRef) -> bool {
        return match ty {
            TypeRef::Declared { symbol, .. } => {
                self.table.symbol(*symbol).is_some_and(|s| return s.qualified_name == ROOT_CLASS)
            },
            _ => false,
        };
    }

    /// `<A extends ..., B>` for a declaration, returning a context in which
    /// the declared variables are bare.
    fn write_type_parameters(&self, out: &mut String, ctx: &OutputContext, params: &[TypeVarId]) -> OutputContext {
        if params.is_empty() {
            return ctx.clone();
        }
        out.push_str(&ctx.escape("<"));
        for (index, &var) in params.iter().enumerate() {
            if index > 0 {
                out.push_str(&ctx.escape(", "));
            }
            self.write_type_variable(out, ctx, var);
        }
        out.push_str(&ctx.escape(">"));
        return params.iter().fold(ctx.clone(), |acc, &var| return acc.account_for(var, self.identity));
    }

    // ── Documentation text ──────────────────────────────────────────

    /// Walk doc nodes in order.
    pub fn write_nodes(&self, out: &mut String, ctx: &OutputContext, source: &SourceContext, nodes: &[DocNode]) {
        for node in nodes {
            match node {
                DocNode::Text(text) => out.push_str(&ctx.escape(text)),
                DocNode::Code(text) => {
                    let (enclosed, code) = open_code(out, ctx);
                    out.push_str(&enclosed.escape(text));
                    close_code(out, code);
                },
                DocNode::Summary(content) => {
                    let inner = if source.subject().is_some() { source.in_summary_tag() } else { source.clone() };
                    self.write_nodes(out, ctx, &inner, content);
                },
                DocNode::Link { label, plain, reference } => self.write_link(out, ctx, source, reference, label, *plain),
                DocNode::InheritDoc => self.write_inherited(out, ctx, source),
            }
        }
    }

    /// `{@link}` or `{@linkplain}`. Failures are reported and shown unlinked:
    /// the label if there is one, else the signature's components, else the
    /// text as written.
    fn write_link(
        &self,
        out: &mut String,
        ctx: &OutputContext,
        source: &SourceContext,
        reference: &str,
        label: &[DocNode],
        plain: bool,
    ) {
        let ctx = if plain { ctx.in_code() } else { ctx.clone() };
        let detail = LinkDetail::for_label(source.clone(), label);
        let (failure, literal) = match self.parser.parse(reference) {
            Ok(signature) => match self.resolver.resolve(&signature, source) {
                Ok(resolved) => {
                    self.write_element_reference(out, &ctx, &resolved, &detail, &signature.display_text());
                    return;
                },
                Err(e) => (DiagnosticKind::Resolution(e), signature.display_text()),
            },
            Err(e) => (DiagnosticKind::Parse(e), reference.to_string()),
        };
        self.report(source, failure);

        if label.is_empty() {
            let (enclosed, code) = open_code(out, &ctx);
            out.push_str(&enclosed.escape(&literal));
            close_code(out, code);
        } else {
            self.write_nodes(out, &ctx, source, label);
        }
        return;
    }

    /// `{@inheritDoc}`: the matching text of the overridden method,
    /// interpreted as if written there.
    fn write_inherited(&self, out: &mut String, ctx: &OutputContext, source: &SourceContext) {
        let misplaced = match source.scope() {
            TagScope::Block => Some("a block tag"),
            TagScope::Summary => Some("{@summary}"),
            TagScope::None | TagScope::Param(_) | TagScope::Return | TagScope::Throws(_) => None,
        };
        if let Some(scope) = misplaced {
            self.report(source, DiagnosticKind::MisplacedInheritDoc { scope: scope.to_string() });
            return;
        }

        let overridden = source.subject().and_then(|s| return self.table.overridden(s));
        let inherited = overridden.and_then(|o| return Some((o, self.table.symbol(o)?.doc.as_ref()?)));
        let Some((overridden, doc)) = inherited else {
            self.report(source, DiagnosticKind::NothingToInherit);
            return;
        };

        let Some(nodes) = self.inherited_text(overridden, doc, source.scope()) else {
            self.report(source, DiagnosticKind::NothingToInherit);
            return;
        };
        let nodes = if source.is_first_sentence() { first_sentence(nodes) } else { nodes.to_vec() };
        self.write_nodes(out, ctx, &source.rehomed(overridden), &nodes);
        return;
    }

    /// The part of `doc` matching the tag being interpreted.
    fn inherited_text<'d>(&self, overridden: SymbolId, doc: &'d DocComment, scope: &TagScope) -> Option<&'d [DocNode]> {
        return match scope {
            TagScope::None => Some(&doc.body),
            TagScope::Return => doc.returns(),
            TagScope::Param(position) => {
                let name = &self.table.symbol(overridden)?.parameters.get(*position)?.name;
                doc.param(name)
            },
            TagScope::Throws(wanted) => doc.throws().find_map(|(exception, body)| {
                let placed = self.place_exception(overridden, exception);
                return self.identity.same_type(&placed, wanted).then_some(body);
            }),
            TagScope::Block | TagScope::Summary => None,
        };
    }

    /// The type an `@throws` tag names, looked up from `scope`.
    fn place_exception(&self, scope: SymbolId, written: &str) -> TypeRef {
        return match resolver::find_class(self.table, Some(scope), written) {
            Some(symbol) => TypeRef::Declared { args: Vec::new(), symbol },
            None => TypeRef::Unresolved(written.to_string()),
        };
    }

    /// Send a diagnostic naming the element whose text is being read.
    fn report(&self, source: &SourceContext, kind: DiagnosticKind) {
        let context = source
            .subject()
            .and_then(|s| return self.table.symbol(s))
            .map_or_else(|| return "<no element>".to_string(), |s| return s.qualified_name.clone());
        self.sink.report(Diagnostic { context, kind });
    }

    // ── Pages ───────────────────────────────────────────────────────

    /// The fragment documenting `subject`: title, summary, description and
    /// tags, then its members.
    ///
    /// # Errors
    ///
    /// Returns `Error::SymbolNotFound` if `subject` is not in the table.
    pub fn render_page(&self, ctx: &OutputContext, subject: SymbolId) -> Result<String, Error> {
        let symbol = self
            .table
            .symbol(subject)
            .ok_or_else(|| return Error::SymbolNotFound { name: format!("#{}", subject.0) })?;
        let ctx = ctx.in_element(Some(subject));
        let mut out = String::new();

        out.push_str(&format!("<section class=\"{}\">\n<h1>", symbol.kind.as_str()));
        let ctx = self.write_title(&mut out, &ctx, symbol);
        out.push_str("</h1>\n");
        self.write_description(&mut out, &ctx, symbol);

        let (listed, detailed): (Vec<&Symbol>, Vec<&Symbol>) = symbol
            .members
            .iter()
            .filter_map(|&m| return self.table.symbol(m))
            .partition(|m| return m.kind.is_type() || matches!(m.kind, SymbolKind::Package));
        if !listed.is_empty() {
            out.push_str("<ul class=\"members\">\n");
            for member in listed {
                self.write_member_summary(&mut out, &ctx, member);
            }
            out.push_str("</ul>\n");
        }
        for member in detailed {
            let fragment = self.locator.locate(member.id).and_then(|u| return u.fragment().map(str::to_string));
            let id = fragment.unwrap_or_else(|| return member.name.clone());
            let member_ctx = ctx.in_element(Some(member.id));
            out.push_str(&format!(
                "<section class=\"{}\" id=\"{}\">\n<h2>",
                member.kind.as_str(),
                ctx.escape_attribute(&id)
            ));
            let member_ctx = self.write_title(&mut out, &member_ctx, member);
            out.push_str("</h2>\n");
            self.write_description(&mut out, &member_ctx, member);
            out.push_str("</section>\n");
        }
        out.push_str("</section>\n");
        return Ok(out);
    }

    /// A page or member heading. Returns the context with the symbol's own
    /// type parameters accounted for.
    fn write_title(&self, out: &mut String, ctx: &OutputContext, symbol: &Symbol) -> OutputContext {
        let ctx = ctx.inline();
        let (open, close) = if ctx.can_mark_as_code() { ("<code>", "</code>") } else { ("", "") };
        let code = ctx.in_code();
        match symbol.kind {
            SymbolKind::Module | SymbolKind::Package => {
                out.push_str(&format!("{} {open}", symbol.kind.as_str()));
                write_camel_text(out, &code, &symbol.qualified_name);
                out.push_str(close);
                return ctx;
            },
            kind if kind.is_type() => {
                out.push_str(&format!("{} {open}", kind.as_str()));
                write_camel_text(out, &code, &symbol.name);
                let accounted = self.write_type_parameters(out, &code, &symbol.type_parameters);
                out.push_str(close);
                return rebuild(&ctx, &accounted, &symbol.type_parameters, self.identity);
            },
            _ => {},
        }

        out.push_str(open);
        if symbol.is_static {
            out.push_str(&code.escape("static "));
        }
        let accounted = self.write_type_parameters(out, &code, &symbol.type_parameters);
        if !symbol.type_parameters.is_empty() {
            out.push_str(&code.escape(" "));
        }
        if let Some(ty) = symbol.returns.as_ref().or(symbol.value_type.as_ref()).filter(|_| {
            return symbol.kind != SymbolKind::EnumConstant;
        }) {
            self.write_type(out, &accounted, ty);
            out.push_str(&code.escape(" "));
        }
        write_camel_text(out, &accounted, &symbol.name);
        if symbol.kind.is_executable() {
            out.push_str(&code.escape("("));
            let last = symbol.parameters.len().saturating_sub(1);
            for (index, param) in symbol.parameters.iter().enumerate() {
                if index > 0 {
                    out.push_str(&code.escape(", "));
                }
                match (&param.ty, symbol.varargs && index == last) {
                    (TypeRef::Array(component), true) => {
                        self.write_type(out, &accounted, component);
                        out.push_str(&code.escape("..."));
                    },
                    (ty, _) => self.write_type(out, &accounted, ty),
                }
                out.push_str(&code.escape(&format!(" {}", param.name)));
            }
            out.push_str(&code.escape(")"));
        }
        out.push_str(close);
        return rebuild(&ctx, &accounted, &symbol.type_parameters, self.identity);
    }

    /// First-sentence summary, full description, then block tags.
    fn write_description(&self, out: &mut String, ctx: &OutputContext, symbol: &Symbol) {
        let Some(doc) = &symbol.doc else {
            return;
        };
        let source = SourceContext::for_element(symbol.id);

        let summary = first_sentence(&doc.body);
        if !summary.is_empty() {
            out.push_str("<p class=\"summary\">");
            self.quiet().write_nodes(out, &ctx.inline(), &source.in_first_sentence(), &summary);
            out.push_str("</p>\n");
        }
        if !doc.body.is_empty() {
            out.push_str("<div class=\"description\">");
            self.write_nodes(out, ctx, &source, &doc.body);
            out.push_str("</div>\n");
        }
        if doc.tags.is_empty() {
            return;
        }

        out.push_str("<dl class=\"tags\">\n");
        let params: Vec<(usize, &str, &[DocNode])> = symbol
            .parameters
            .iter()
            .enumerate()
            .filter_map(|(position, p)| return Some((position, p.name.as_str(), doc.param(&p.name)?)))
            .collect();
        if !params.is_empty() {
            out.push_str("<dt>Parameters</dt>\n");
            for (position, name, body) in params {
                out.push_str(&format!("<dd><code>{}</code> - ", ctx.escape(name)));
                self.write_nodes(out, &ctx.inline(), &source.in_param_tag(position), body);
                out.push_str("</dd>\n");
            }
        }
        if let Some(body) = doc.returns() {
            out.push_str("<dt>Returns</dt>\n<dd>");
            self.write_nodes(out, &ctx.inline(), &source.in_return_tag(), body);
            out.push_str("</dd>\n");
        }
        let throws: Vec<(&str, &[DocNode])> = doc.throws().collect();
        if !throws.is_empty() {
            out.push_str("<dt>Throws</dt>\n");
            for (exception, body) in throws {
                let ty = self.place_exception(symbol.id, exception);
                out.push_str("<dd>");
                self.write_type_reference(out, &ctx.inline(), &ty, &LinkDetail::NORMAL);
                out.push_str(" - ");
                self.write_nodes(out, &ctx.inline(), &source.in_throws_tag(ty), body);
                out.push_str("</dd>\n");
            }
        }
        for tag in &doc.tags {
            let (title, body) = match tag {
                BlockTag::Other { body, name } => (name.clone(), body),
                BlockTag::Param { body, name } if name.starts_with('<') => (format!("Type parameter {name}"), body),
                BlockTag::Param { .. } | BlockTag::Return(_) | BlockTag::Throws { .. } => continue,
            };
            out.push_str(&format!("<dt>{}</dt>\n<dd>", ctx.escape(&title)));
            self.write_nodes(out, &ctx.inline(), &source.in_block_tag(), body);
            out.push_str("</dd>\n");
        }
        out.push_str("</dl>\n");
        return;
    }

    /// One list entry: a reference to a nested class or package and its
    /// first sentence.
    fn write_member_summary(&self, out: &mut String, ctx: &OutputContext, member: &Symbol) {
        out.push_str("<li>");
        let reference = self.resolver.reference_to(member.id);
        self.write_element_reference(out, &ctx.inline(), &reference, &LinkDetail::NORMAL, &member.qualified_name);
        if let Some(doc) = &member.doc {
            let summary = first_sentence(&doc.body);
            if !summary.is_empty() {
                out.push_str(" - ");
                let source = SourceContext::for_element(member.id).in_first_sentence();
                self.quiet().write_nodes(out, &ctx.inline(), &source, &summary);
            }
        }
        out.push_str("</li>\n");
        return;
    }
}

/// Carry the variables accounted for in a code-narrowed title context back
/// onto the wider context.
fn rebuild(ctx: &OutputContext, accounted: &OutputContext, params: &[TypeVarId], identity: &dyn TypeIdentity) -> OutputContext {
    return params.iter().fold(ctx.clone(), |acc, &var| {
        if accounted.is_accounted_for(var, identity) {
            return acc.account_for(var, identity);
        }
        return acc;
    });
}

/// Open `<code class="ref">` when code and inline markup are both allowed.
/// Returns the context for the content and whether a close is owed.
fn open_code(out: &mut String, ctx: &OutputContext) -> (OutputContext, bool) {
    if ctx.can_mark_as_code() && ctx.can_mark_up_inline() {
        out.push_str("<code class=\"ref\">");
        return (ctx.in_code(), true);
    }
    return (ctx.clone(), false);
}

/// Close what [`open_code`] opened.
fn close_code(out: &mut String, opened: bool) {
    if opened {
        out.push_str("</code>");
    }
}

/// Open `<a href>` when a link can be made to a location other than this
/// page, else `<span>` when inline markup is allowed. A reference to the
/// page itself is marked `redundant-link`. Returns the content context and
/// the closing tag (empty when nothing was opened).
fn open_wrapper(out: &mut String, ctx: &OutputContext, location: Option<&Url>, class: &str) -> (OutputContext, &'static str) {
    if !ctx.can_mark_up_inline() {
        return (ctx.clone(), "");
    }
    let redundant = location.is_some_and(|l| return l == ctx.location());
    let link = location.filter(|_| return !redundant && ctx.can_link());
    out.push_str(if link.is_some() { "<a class=\"" } else { "<span class=\"" });
    if redundant {
        out.push_str("redundant-link ");
    }
    out.push_str(&ctx.escape_attribute(class));
    out.push('"');
    return match link {
        Some(target) => {
            out.push_str(&format!(" href=\"{}\">", ctx.href(target)));
            (ctx.in_link(), "</a>")
        },
        None => {
            out.push('>');
            (ctx.clone(), "</span>")
        },
    };
}

/// A `.` between name segments, with a break opportunity when markup allows.
fn write_separator(out: &mut String, ctx: &OutputContext) {
    if ctx.can_mark_up_inline() {
        out.push_str(WORD_BREAK);
    }
    out.push_str(&ctx.escape("."));
}

/// Escaped text with break opportunities at lower-to-upper case changes and
/// after dots, when markup allows.
fn write_camel_text(out: &mut String, ctx: &OutputContext, text: &str) {
    if !ctx.can_mark_up_inline() {
        out.push_str(&ctx.escape(text));
        return;
    }
    let mut previous: Option<char> = None;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        let breaks = previous.is_some_and(|p| return (p.is_lowercase() && c.is_uppercase()) || p == '.');
        if breaks {
            out.push_str(&ctx.escape(text.get(start..index).unwrap_or_default()));
            out.push_str(WORD_BREAK);
            start = index;
        }
        previous = Some(c);
    }
    out.push_str(&ctx.escape(text.get(start..).unwrap_or_default()));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::escape::{Charset, HypertextEscaper};
    use crate::locate::PageLayout;
    use crate::signature::IdentifierPolicy;
    use crate::symbols::Graph;
    use crate::symbols::tests::sample;

    struct Fixture {
        graph: Graph,
        parser: SignatureParser,
        sink: CollectingSink,
    }

    impl Fixture {
        fn new(graph: Graph) -> Self {
            Self { graph, parser: SignatureParser::new(IdentifierPolicy::Unicode), sink: CollectingSink::new() }
        }

        fn id(&self, name: &str) -> SymbolId {
            self.graph.find_by_qualified_name(name).unwrap()
        }

        fn with<R>(&self, f: impl FnOnce(&Renderer<'_>, &PageLayout<'_>) -> R) -> R {
            let layout = PageLayout::new(&self.graph, Url::parse("file:///out/").unwrap(), &[], "");
            let renderer =
                Renderer::new(&self.graph, &self.graph, &layout, &self.parser, ResolveOptions::default(), &self.sink);
            f(&renderer, &layout)
        }
    }

    fn plain_on(layout: &PageLayout<'_>, page: SymbolId) -> OutputContext {
        OutputContext::plain(layout.locate(page).unwrap()).in_element(Some(page))
    }

    fn html_on(layout: &PageLayout<'_>, page: SymbolId) -> OutputContext {
        OutputContext::for_block(
            layout.locate(page).unwrap(),
            Arc::new(HypertextEscaper::for_cdata(Charset::Utf8)),
            Arc::new(HypertextEscaper::for_attributes(Charset::Utf8)),
        )
        .in_element(Some(page))
    }

    fn text_of(nodes: &str) -> Vec<DocNode> {
        crate::doctext::parse_inline(nodes)
    }

    #[test]
    fn class_reference_links_from_another_page() {
        let fx = Fixture::new(sample());
        let html = fx.with(|r, layout| {
            let ctx = html_on(layout, fx.id("demo.util.Item"));
            let mut out = String::new();
            let reference = r.resolver().reference_to(fx.id("demo.util.Box"));
            r.write_element_reference(&mut out, &ctx, &reference, &LinkDetail::NORMAL, "Box");
            out
        });
        assert_eq!(html, "<code class=\"ref\"><a class=\"class\" href=\"Box.html\">Box<wbr>&lt;T&gt;</a></code>");
    }

    #[test]
    fn same_page_reference_is_not_linked() {
        let fx = Fixture::new(sample());
        let html = fx.with(|r, layout| {
            let boxed = fx.id("demo.util.Box");
            let mut out = String::new();
            let reference = r.resolver().reference_to(boxed);
            r.write_element_reference(&mut out, &html_on(layout, boxed), &reference, &LinkDetail::NORMAL, "Box");
            out
        });
        assert!(html.contains("<span class=\"redundant-link class\">"), "{html}");
        assert!(!html.contains("href"));
    }

    #[test]
    fn member_text_follows_link_detail() {
        let fx = Fixture::new(sample());
        let texts = fx.with(|r, layout| {
            let from_item = plain_on(layout, fx.id("demo.util.Item"));
            let from_box = plain_on(layout, fx.id("demo.util.Box"));
            let write = |ctx: &OutputContext, name: &str, detail: LinkDetail| {
                let mut out = String::new();
                let reference = r.resolver().reference_to(fx.id(name));
                r.write_element_reference(&mut out, ctx, &reference, &detail, name);
                out
            };
            vec![
                write(&from_item, "demo.util.Box#get()", LinkDetail::NORMAL),
                write(&from_item, "demo.util.Box#put(int[][])", LinkDetail::NORMAL.with_package()),
                write(&from_item, "demo.util.Box#all(java.lang.String[])", LinkDetail::NORMAL.without_parameters()),
                write(&from_box, "demo.util.Box#size", LinkDetail::NORMAL.without_nonessential_containers()),
                write(&from_item, "demo.util.Box#size", LinkDetail::NORMAL.without_nonessential_containers()),
                write(&from_item, "demo.util.Box.Entry", LinkDetail::NORMAL),
            ]
        });
        assert_eq!(texts, vec![
            "Box<T>.get()",
            "demo.util.Box<T>.put(int[][])",
            "Box<T>.all",
            "size",
            "Box<T>.size",
            "Box.Entry",
        ]);
    }

    #[test]
    fn varargs_and_unlocated_types_in_parameters() {
        let fx = Fixture::new(sample());
        let text = fx.with(|r, layout| {
            let ctx = plain_on(layout, fx.id("demo.util.Item"));
            let mut out = String::new();
            let reference = r.resolver().reference_to(fx.id("demo.util.Box#all(java.lang.String[])"));
            r.write_element_reference(&mut out, &ctx, &reference, &LinkDetail::NORMAL.without_containers(), "all");
            out
        });
        assert_eq!(text, "all(java.lang.String...)");
    }

    #[test]
    fn label_replaces_generated_text() {
        let fx = Fixture::new(sample());
        let text = fx.with(|r, layout| {
            let item = fx.id("demo.util.Item");
            let mut out = String::new();
            r.write_nodes(&mut out, &plain_on(layout, item), &SourceContext::for_element(item), &text_of("see {@link Box#get() the getter}"));
            out
        });
        assert_eq!(text, "see the getter");
        assert!(fx.sink.take().is_empty());
    }

    #[test]
    fn recursive_bounds_stop_at_reentry() {
        let fx = Fixture::new(sample());
        let text = fx.with(|r, layout| {
            let boxed = fx.id("demo.util.Box");
            let var = *r.table.symbol(boxed).unwrap().type_parameters.first().unwrap();
            let mut out = String::new();
            r.write_type_reference(&mut out, &plain_on(layout, boxed), &TypeRef::Variable(var), &LinkDetail::NORMAL);
            out
        });
        assert_eq!(text, "T extends java.lang.Comparable<T>");
    }

    #[test]
    fn three_cycle_of_bounds_terminates() {
        let fx = Fixture::new(
            Graph::from_json(
                r#"{"classes": [{"name": "C", "package": "p", "type_parameters": [
                  {"name": "A", "bounds": ["B"]}, {"name": "B", "bounds": ["D"]}, {"name": "D", "bounds": ["A"]}]}]}"#,
            )
            .unwrap(),
        );
        let text = fx.with(|r, layout| {
            let class = fx.id("p.C");
            let var = *r.table.symbol(class).unwrap().type_parameters.first().unwrap();
            let mut out = String::new();
            r.write_type_reference(&mut out, &plain_on(layout, class), &TypeRef::Variable(var), &LinkDetail::NORMAL);
            out
        });
        assert_eq!(text, "A extends B extends D extends A");
    }

    #[test]
    fn failed_references_render_literally_and_report() {
        let fx = Fixture::new(sample());
        let text = fx.with(|r, layout| {
            let item = fx.id("demo.util.Item");
            let mut out = String::new();
            let nodes = text_of("{@link Nope} and {@link Box#put} and {@link a..b}");
            r.write_nodes(&mut out, &plain_on(layout, item), &SourceContext::for_element(item), &nodes);
            out
        });
        assert_eq!(text, "Nope and Box.put and a..b");
        let reported = fx.sink.take();
        assert_eq!(reported.len(), 3);
        assert!(reported.iter().all(|d| d.context == "demo.util.Item"));
        assert!(matches!(reported.last().unwrap().kind, DiagnosticKind::Parse(_)));
    }

    #[test]
    fn inherited_text_follows_the_tag() {
        let fx = Fixture::new(sample());
        let page = fx.with(|r, layout| {
            let boxed = fx.id("demo.util.Box");
            r.render_page(&plain_on(layout, boxed), boxed).unwrap()
        });
        assert!(page.contains("Describes this thing. Boxes say more."), "{page}");
        assert!(page.contains("Describes this thing. In detail. Boxes say more."), "{page}");
        assert!(page.contains("how deep to go"));
        assert!(page.contains("the description"));
        assert!(page.contains("if closed"));
        assert!(fx.sink.take().is_empty());
    }

    #[test]
    fn inherit_doc_in_block_tag_is_reported() {
        let fx = Fixture::new(sample());
        let text = fx.with(|r, layout| {
            let describe = fx.id("demo.util.Box#describe(int)");
            let mut out = String::new();
            let source = SourceContext::for_element(describe).in_block_tag();
            r.write_nodes(&mut out, &plain_on(layout, describe), &source, &[DocNode::InheritDoc]);
            out
        });
        assert_eq!(text, "");
        let reported = fx.sink.take();
        assert!(matches!(reported.first().unwrap().kind, DiagnosticKind::MisplacedInheritDoc { .. }));
    }

    #[test]
    fn nothing_to_inherit_is_reported() {
        let fx = Fixture::new(sample());
        fx.with(|r, layout| {
            let get = fx.id("demo.util.Box#get()");
            let mut out = String::new();
            r.write_nodes(&mut out, &plain_on(layout, get), &SourceContext::for_element(get), &[DocNode::InheritDoc]);
        });
        assert_eq!(fx.sink.take().first().unwrap().kind, DiagnosticKind::NothingToInherit);
    }

    #[test]
    fn first_sentence_failures_are_reported_once() {
        let fx = Fixture::new(
            Graph::from_json(r#"{"classes": [{"name": "A", "package": "p", "doc": "See {@link Missing}. Then {@link #gone()}."}]}"#)
                .unwrap(),
        );
        let page = fx.with(|r, layout| {
            let a = fx.id("p.A");
            r.render_page(&plain_on(layout, a), a).unwrap()
        });
        assert!(page.contains("See Missing."), "{page}");
        let reported = fx.sink.take();
        assert_eq!(reported.len(), 2, "{reported:?}");
    }

    #[test]
    fn inherit_doc_inside_summary_is_misplaced_everywhere() {
        let fx = Fixture::new(
            Graph::from_json(
                r#"{"classes": [
                  {"name": "Base", "package": "p", "methods": [{"name": "m", "doc": "Base text."}]},
                  {"name": "Leaf", "package": "p", "superclass": "Base", "methods": [
                    {"name": "m", "doc": "{@summary Short {@inheritDoc}} Long."}]}]}"#,
            )
            .unwrap(),
        );
        let page = fx.with(|r, layout| {
            let leaf = fx.id("p.Leaf");
            r.render_page(&plain_on(layout, leaf), leaf).unwrap()
        });
        assert!(page.contains("Short"), "{page}");
        assert!(!page.contains("Base text"), "{page}");
        let reported = fx.sink.take();
        assert_eq!(reported.len(), 1, "{reported:?}");
        assert!(matches!(reported.first().unwrap().kind, DiagnosticKind::MisplacedInheritDoc { .. }));
    }

    #[test]
    fn page_lists_members_with_summaries() {
        let fx = Fixture::new(sample());
        let page = fx.with(|r, layout| {
            let util = fx.id("demo.util");
            r.render_page(&html_on(layout, util), util).unwrap()
        });
        assert!(page.starts_with("<section class=\"package\">"));
        assert!(page.contains("href=\"Box.html\""), "{page}");
        assert!(page.contains(" - A box of "), "{page}");
        assert!(page.contains("Utilities."));
    }

    #[test]
    fn member_sections_carry_fragment_ids() {
        let fx = Fixture::new(sample());
        let page = fx.with(|r, layout| {
            let boxed = fx.id("demo.util.Box");
            r.render_page(&html_on(layout, boxed), boxed).unwrap()
        });
        assert!(page.contains("id=\"put(int[][])\""), "{page}");
        assert!(page.contains("id=\"size\""));
        // Nested classes are listed, not expanded.
        assert!(page.contains("<ul class=\"members\">"));
        assert!(page.contains("href=\"Box.Entry.html\""), "{page}");
    }

    #[test]
    fn linkplain_is_not_code() {
        let fx = Fixture::new(sample());
        let html = fx.with(|r, layout| {
            let item = fx.id("demo.util.Item");
            let mut out = String::new();
            r.write_nodes(&mut out, &html_on(layout, item), &SourceContext::for_element(item), &text_of("{@linkplain Box}"));
            out
        });
        assert!(!html.contains("<code"), "{html}");
        assert!(html.contains("<a class=\"class\" href=\"Box.html\">"));
    }

    #[test]
    fn camel_text_breaks_only_with_markup() {
        let fx = Fixture::new(sample());
        fx.with(|_, layout| {
            let item = fx.id("demo.util.Item");
            let mut plain = String::new();
            write_camel_text(&mut plain, &plain_on(layout, item), "IllegalState");
            assert_eq!(plain, "IllegalState");
            let mut html = String::new();
            write_camel_text(&mut html, &html_on(layout, item), "IllegalState");
            assert_eq!(html, "Illegal<wbr>State");
        });
    }
}
