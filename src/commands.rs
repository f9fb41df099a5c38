//! Core CLI commands for refweave: parse, resolve, check, render.

use std::path::Path;
use std::process::ExitCode;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::Config;
use crate::diagnostics::{self, CollectingSink, TracingSink};
use crate::error::Error;
use crate::link_detail::LinkDetail;
use crate::locate::{Locator, PageLayout};
use crate::output_context::OutputContext;
use crate::render::Renderer;
use crate::resolver::Resolver;
use crate::signature::SignatureParser;
use crate::slice::{SliceSpecification, locale_compatible};
use crate::source_context::SourceContext;
use crate::symbols::{Graph, SymbolTable};
use crate::types::{ResolvedReference, SymbolId, SymbolKind};
use crate::uri;

// ── parse ───────────────────────────────────────────────────────────

/// Parse a signature and print its components.
///
/// # Errors
///
/// Returns `Error::Parse` if the text is not a signature, or `Error::Json`
/// if JSON output fails to serialize.
pub fn parse(config: &Config, text: &str, json: bool) -> Result<(), Error> {
    let signature = SignatureParser::new(config.identifiers).parse(text)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&signature)?);
        return Ok(());
    }
    let show = |part: Option<&String>| return part.map_or("-", String::as_str).to_string();
    println!("module      {}", show(signature.module.as_ref()));
    println!("path        {}", show(signature.package_or_class.as_ref()));
    println!("member      {}", show(signature.member.as_ref()));
    let parameters = signature.parameters.as_ref().map_or_else(
        || return "-".to_string(),
        |params| {
            let list: Vec<String> = params.iter().map(ToString::to_string).collect();
            return format!("({})", list.join(", "));
        },
    );
    println!("parameters  {parameters}");
    println!("canonical   {signature}");
    return Ok(());
}

// ── resolve ─────────────────────────────────────────────────────────

/// Machine-readable result of `resolve --json`.
#[derive(Debug, Serialize)]
struct ResolveReport {
    /// Symbol kind, or `external` for targets outside the graph.
    kind: &'static str,
    /// Location relative to the page of `--from`, if located.
    location: Option<String>,
    /// Qualified name of the target; absent for external targets.
    qualified_name: Option<String>,
}

/// Resolve a signature and print what it names. Exits 2 when the
/// signature is malformed or names nothing.
///
/// # Errors
///
/// Returns `Error::SymbolNotFound` if `--from` names no symbol, or errors
/// from building the output location.
pub fn resolve(config: &Config, graph: &Graph, text: &str, from: Option<&str>, json: bool) -> Result<ExitCode, Error> {
    let subject = match from {
        Some(name) => {
            Some(graph.find_by_qualified_name(name).ok_or_else(|| return Error::SymbolNotFound { name: name.to_string() })?)
        },
        None => None,
    };
    let context = subject.map_or_else(SourceContext::empty, SourceContext::for_element);

    let layout = PageLayout::new(graph, config.base_url()?, &config.imports, "");
    let resolver = Resolver::new(graph, &layout, config.resolve_options());
    let parsed = SignatureParser::new(config.identifiers).parse(text).map_err(Error::from);
    let resolved = parsed.and_then(|signature| return resolver.resolve(&signature, &context).map_err(Error::from));
    let resolved = match resolved {
        Ok(resolved) => resolved,
        Err(e) => {
            diagnostics::print_error(&e);
            return Ok(ExitCode::from(2));
        },
    };

    let page = subject.and_then(|s| return page_of(graph, &layout, s));
    let from_page = page.unwrap_or_else(|| return layout.base().clone());
    let report = report_for(graph, &resolved, &from_page);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}  {}  {}",
            report.kind,
            report.qualified_name.as_deref().unwrap_or(text),
            report.location.as_deref().unwrap_or("-")
        );
    }
    return Ok(ExitCode::SUCCESS);
}

/// The page (without fragment) documenting `id` or its enclosing class.
fn page_of(graph: &Graph, layout: &PageLayout<'_>, id: SymbolId) -> Option<url::Url> {
    let owner = graph.symbol(id)?;
    let page = if owner.kind.is_type() || matches!(owner.kind, SymbolKind::Module | SymbolKind::Package) {
        id
    } else {
        owner.enclosing?
    };
    return layout.locate(page);
}

/// Summarize a resolved reference.
fn report_for(graph: &Graph, resolved: &ResolvedReference, from_page: &url::Url) -> ResolveReport {
    let target = resolved.target().and_then(|t| return graph.symbol(t));
    return ResolveReport {
        kind: target.map_or("external", |s| return s.kind.as_str()),
        location: resolved.location.as_ref().map(|l| return uri::relativize(from_page, l)),
        qualified_name: target.map(|s| return s.qualified_name.clone()),
    };
}

// ── check ───────────────────────────────────────────────────────────

/// Interpret every documentation comment and report references that fail.
/// Exit priority: broken (2) > all resolved (0).
///
/// # Errors
///
/// Returns errors from building the output location.
pub fn check(config: &Config, graph: &Graph) -> Result<ExitCode, Error> {
    let layout = PageLayout::new(graph, config.base_url()?, &config.imports, "");
    let parser = SignatureParser::new(config.identifiers);
    let sink = CollectingSink::new();
    let renderer = Renderer::new(graph, graph, &layout, &parser, config.resolve_options(), &sink);

    let pages = documented_pages(graph);
    pages.par_iter().for_each(|&id| {
        let Some(location) = layout.locate(id) else {
            return;
        };
        if let Err(e) = renderer.render_page(&OutputContext::plain(location), id) {
            tracing::warn!(error = %e, "page skipped during check");
        }
    });

    let mut broken: Vec<String> = sink.take().iter().map(ToString::to_string).collect();
    broken.sort();
    broken.dedup();
    for line in &broken {
        println!("BROKEN  {line}");
    }

    if broken.is_empty() {
        println!("All references in {} pages resolve", pages.len());
        return Ok(ExitCode::SUCCESS);
    }
    println!();
    println!("{} broken", broken.len());
    return Ok(ExitCode::from(2));
}

// ── render ──────────────────────────────────────────────────────────

/// Symbols with pages of their own: documented modules, packages and classes.
fn documented_pages(graph: &Graph) -> Vec<SymbolId> {
    return graph
        .symbols()
        .iter()
        .filter(|s| return !s.external && (s.kind.is_type() || matches!(s.kind, SymbolKind::Module | SymbolKind::Package)))
        .map(|s| return s.id)
        .collect();
}

/// Render one page per documented symbol per slice into `config.output`,
/// in parallel. A failing page is reported and skipped; the run exits 1 if
/// any page failed.
///
/// # Errors
///
/// Returns `Error::NoMatchingSlice` if `locale` matches no slice, or errors
/// from building the output location or writing an index.
pub fn render(config: &Config, graph: &Graph, locale: Option<&str>) -> Result<ExitCode, Error> {
    let slices: Vec<&SliceSpecification> = config
        .slices
        .iter()
        .filter(|slice| return locale.is_none_or(|wanted| return locale_compatible(wanted, &slice.locale)))
        .collect();
    if let (true, Some(wanted)) = (slices.is_empty(), locale) {
        return Err(Error::NoMatchingSlice { locale: wanted.to_string() });
    }

    let base = config.base_url()?;
    let parser = SignatureParser::new(config.identifiers);
    let sink = TracingSink;
    let pages = documented_pages(graph);
    let mut written = 0_usize;
    let mut failed = 0_usize;

    for slice in slices {
        let layout = PageLayout::new(graph, base.clone(), &config.imports, &slice.suffix);
        let renderer = Renderer::new(graph, graph, &layout, &parser, config.resolve_options(), &sink);
        let results: Vec<Result<(), Error>> = pages
            .par_iter()
            .map(|&id| return write_page(&renderer, &layout, slice, graph, &config.output, id))
            .collect();
        for result in results {
            match result {
                Ok(()) => written = written.saturating_add(1),
                Err(e) => {
                    diagnostics::print_error(&e);
                    failed = failed.saturating_add(1);
                },
            }
        }
        write_index(&renderer, &layout, slice, graph, &config.output)?;
        tracing::info!(locale = %slice.locale, charset = slice.charset.name(), "slice rendered");
    }

    eprintln!("Rendered {written} pages into {}", config.output.display());
    if failed > 0 {
        eprintln!("{failed} pages failed");
        return Ok(ExitCode::FAILURE);
    }
    return Ok(ExitCode::SUCCESS);
}

/// Render and write the page of `id`.
///
/// # Errors
///
/// Returns `Error::PageFailed` naming the symbol for any failure.
fn write_page(
    renderer: &Renderer<'_>,
    layout: &PageLayout<'_>,
    slice: &SliceSpecification,
    graph: &Graph,
    out: &Path,
    id: SymbolId,
) -> Result<(), Error> {
    let page = graph.symbol(id).map_or_else(|| return format!("#{}", id.0), |s| return s.qualified_name.clone());
    let failed = |reason: String| return Error::PageFailed { page: page.clone(), reason };

    let path = layout.page_path(id).ok_or_else(|| return failed("no page path".to_string()))?;
    let location = layout.locate(id).ok_or_else(|| return failed("no location".to_string()))?;
    let fragment = renderer.render_page(&slice.output_context(location), id).map_err(|e| return failed(e.to_string()))?;
    let document = format!("<meta charset=\"{}\">\n{fragment}", slice.charset.name());

    let target = out.join(&path);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| return failed(e.to_string()))?;
    }
    std::fs::write(&target, slice.encode(&document)).map_err(|e| return failed(e.to_string()))?;
    tracing::debug!(page = %page, path = %target.display(), "page written");
    return Ok(());
}

/// A list of every documented module and package, at the output root.
///
/// # Errors
///
/// Returns `Error::Url` if the index location cannot be built, or
/// `Error::Io` if it cannot be written.
fn write_index(
    renderer: &Renderer<'_>,
    layout: &PageLayout<'_>,
    slice: &SliceSpecification,
    graph: &Graph,
    out: &Path,
) -> Result<(), Error> {
    let name = slice.file_name("index.html");
    let ctx = slice.output_context(layout.base().join(&name)?).inline();
    let mut html = format!("<meta charset=\"{}\">\n<ul class=\"index\">\n", slice.charset.name());
    let listed = graph
        .symbols()
        .iter()
        .filter(|s| return !s.external && matches!(s.kind, SymbolKind::Module | SymbolKind::Package));
    for symbol in listed {
        html.push_str("<li>");
        let reference = renderer.resolver().reference_to(symbol.id);
        renderer.write_element_reference(&mut html, &ctx, &reference, &LinkDetail::NORMAL, &symbol.qualified_name);
        html.push_str("</li>\n");
    }
    html.push_str("</ul>\n");
    std::fs::create_dir_all(out)?;
    std::fs::write(out.join(&name), slice.encode(&html))?;
    return Ok(());
}
