//! Reference diagnostics raised while rendering, and markdown rendering of
//! run-level errors for the terminal.

use std::fmt::{self, Write as _};
use std::sync::Mutex;

use crate::error::{Error, ParseError, ResolutionError, UnresolvedReason};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

// ── Reference diagnostics ───────────────────────────────────────────

/// What went wrong with one reference or tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// `{@inheritDoc}` where nothing can be inherited, e.g. in `@since`.
    MisplacedInheritDoc {
        /// Description of the enclosing tag.
        scope: String,
    },
    /// `{@inheritDoc}` in a method that overrides nothing documented.
    NothingToInherit,
    /// The reference text is not a signature.
    Parse(ParseError),
    /// The signature matched nothing, or several things.
    Resolution(ResolutionError),
}

/// A non-fatal problem found in documentation text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Qualified name of the element whose documentation holds the problem.
    pub context: String,
    /// The problem.
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match &self.kind {
            DiagnosticKind::MisplacedInheritDoc { scope } => {
                write!(f, "{}: {{@inheritDoc}} cannot be used in {scope}", self.context)
            },
            DiagnosticKind::NothingToInherit => {
                write!(f, "{}: {{@inheritDoc}} found nothing to inherit", self.context)
            },
            DiagnosticKind::Parse(e) => write!(f, "{}: {e}", self.context),
            DiagnosticKind::Resolution(e) => write!(f, "{e}"),
        };
    }
}

/// Receives reference diagnostics. Shared across page-rendering threads.
pub trait DiagnosticSink: Send + Sync {
    /// Record one diagnostic. Order across pages carries no meaning.
    fn report(&self, diagnostic: Diagnostic);
}

/// Keeps every diagnostic for later inspection.
#[derive(Debug, Default)]
pub struct CollectingSink {
    /// Diagnostics in arrival order.
    collected: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// An empty sink.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Take everything reported so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        let mut guard = match self.collected.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        return std::mem::take(&mut *guard);
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        let mut guard = match self.collected.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(diagnostic);
    }
}

/// Drops every diagnostic. Used for passes that repeat text already
/// reported elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardingSink;

impl DiagnosticSink for DiscardingSink {
    fn report(&self, _diagnostic: Diagnostic) {}
}

/// Forwards diagnostics to `tracing` as warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!(context = %diagnostic.context, "{diagnostic}");
    }
}

// ── Run-level errors ────────────────────────────────────────────────

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic: what happened, and
/// how to fix it where there is something to say.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::FileNotFound { path } => render_file_not_found(&path.display().to_string()),
        Error::GraphInvalid { reason } => render_graph_invalid(reason),
        Error::InvalidBase { text } => render_invalid_base(text),
        Error::Io(e) => format!("# Error: I/O\n\n{e}\n"),
        Error::Json(e) => format!("# Error: Invalid JSON\n\n{e}\n"),
        Error::NoMatchingSlice { locale } => render_no_matching_slice(locale),
        Error::PageFailed { page, reason } => format!("# Error: Page Failed\n\n`{page}`: {reason}\n"),
        Error::Parse(parse) => render_parse_error(parse),
        Error::Resolution(resolution) => render_resolution_error(resolution),
        Error::SymbolNotFound { name } => render_symbol_not_found(name),
        Error::TomlDe(e) => format!("# Error: Invalid TOML\n\n{e}\n"),
        Error::UnsupportedCharset { name } => render_unsupported_charset(name),
        Error::Url(e) => format!("# Error: Invalid URI\n\n{e}\n"),
    };
}

/// Markdown for a symbol graph that is not on disk.
fn render_file_not_found(path: &str) -> String {
    return format!(
        "\
# Error: File Not Found

`{path}` does not exist.

## Fix

Point `graph` in `.refweave.toml` at the symbol graph, or pass `--graph`.
"
    );
}

/// Markdown for a symbol graph that loaded but does not hold together.
fn render_graph_invalid(reason: &str) -> String {
    return format!(
        "\
# Error: Invalid Symbol Graph

{reason}

## Fix

Regenerate the symbol graph, or correct the entry named above.
"
    );
}

/// Markdown for an unusable `base`.
fn render_invalid_base(text: &str) -> String {
    return format!(
        "\
# Error: Invalid Base Location

`{text}` cannot serve as the base of generated links.

## Fix

Set `base` in `.refweave.toml` to an absolute URI ending in `/`, e.g.

    base = \"https://docs.example.org/api/\"
"
    );
}

/// Markdown for a `--locale` no slice can serve.
fn render_no_matching_slice(locale: &str) -> String {
    return format!(
        "\
# Error: No Matching Slice

No configured slice can serve locale `{locale}`.

## Fix

Add a `[[slices]]` entry whose `locale` is `{locale}` or a prefix of it,
or drop `--locale` to render every slice.
"
    );
}

/// Markdown for a `--from` or page name missing from the graph.
fn render_symbol_not_found(name: &str) -> String {
    return format!(
        "\
# Error: Symbol Not Found

`{name}` is not in the symbol graph.

## Fix

Give a fully qualified name: a module, a package, a class such as
`pkg.Outer.Inner`, or a member such as `pkg.Class#method(int)`.
"
    );
}

/// Markdown for a slice charset outside the supported set.
fn render_unsupported_charset(name: &str) -> String {
    return format!(
        "\
# Error: Unsupported Charset

`{name}` is not a charset slices can be written in.

## Supported charsets

- `utf-8`
- `us-ascii`
- `iso-8859-1`
"
    );
}

/// Markdown for a malformed signature.
fn render_parse_error(e: &ParseError) -> String {
    return format!(
        "\
# Error: Malformed Signature

`{}` is not a reference.

## Accepted forms

    module/
    pkg.Class
    module/pkg.Class#member
    pkg.Class#method(int, java.lang.String[])
    #member
",
        e.text
    );
}

/// Markdown for a failed resolution, with candidates when ambiguous.
fn render_resolution_error(e: &ResolutionError) -> String {
    return match e {
        ResolutionError::Ambiguous { candidates, context, signature } => {
            let mut out = format!(
                "\
# Error: Ambiguous Reference

`{signature}` (from `{context}`) matches several members.

## Candidates

"
            );
            for c in candidates {
                let _ = writeln!(out, "- `{c}`");
            }
            out.push_str(
                "\
\n## Fix

Give a parameter list with fully qualified types.
",
            );
            out
        },
        ResolutionError::Unresolved { context, reason, signature } => {
            let mut out = format!(
                "\
# Error: Unresolved Reference

`{signature}` (from `{context}`): {reason}.
"
            );
            let hint = match reason {
                UnresolvedReason::ParametersRequired { .. } => Some("Add a parameter list to pick one overload."),
                UnresolvedReason::NoEnclosingClass => Some("Name the class before `#`, or use `--from`."),
                UnresolvedReason::NoSuchModule | UnresolvedReason::NoSuchPackageOrClass => {
                    Some("Check the spelling, or qualify the name fully.")
                },
                UnresolvedReason::MemberOfNonClass { .. } | UnresolvedReason::NoSuchMember => None,
            };
            if let Some(hint) = hint {
                let _ = write!(out, "\n## Fix\n\n{hint}\n");
            }
            out
        },
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn unresolved(signature: &str) -> Diagnostic {
        Diagnostic {
            context: "p.C".to_string(),
            kind: DiagnosticKind::Resolution(ResolutionError::Unresolved {
                context: "p.C".to_string(),
                reason: UnresolvedReason::NoSuchMember,
                signature: signature.to_string(),
            }),
        }
    }

    #[test]
    fn collecting_sink_is_shared_across_threads() {
        let sink = Arc::new(CollectingSink::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || sink.report(unresolved(&format!("#m{i}"))))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let mut seen: Vec<String> = sink.take().iter().map(|d| d.to_string()).collect();
        seen.sort();
        assert_eq!(seen.len(), 4);
        assert!(seen.first().unwrap().contains("`#m0`"));
        assert!(sink.take().is_empty());
    }

    #[test]
    fn diagnostic_display_names_the_context() {
        let d = Diagnostic { context: "p.C#m()".to_string(), kind: DiagnosticKind::NothingToInherit };
        assert_eq!(d.to_string(), "p.C#m(): {@inheritDoc} found nothing to inherit");
        let parse = Diagnostic {
            context: "p.C".to_string(),
            kind: DiagnosticKind::Parse(ParseError { text: "a b".to_string() }),
        };
        assert_eq!(parse.to_string(), "p.C: malformed signature: `a b`");
    }

    #[test]
    fn ambiguous_lists_candidates() {
        let md = render_error(&Error::Resolution(ResolutionError::Ambiguous {
            candidates: vec!["p.C#m(x.T)".to_string(), "p.C#m(y.T)".to_string()],
            context: "p.C".to_string(),
            signature: "#m(T)".to_string(),
        }));
        assert!(md.starts_with("# Error: Ambiguous Reference"));
        assert!(md.contains("- `p.C#m(x.T)`"));
        assert!(md.contains("## Fix"));
    }

    #[test]
    fn parameters_required_suggests_a_list() {
        let md = render_error(&Error::Resolution(ResolutionError::Unresolved {
            context: "p.C".to_string(),
            reason: UnresolvedReason::ParametersRequired { overloads: 2 },
            signature: "#put".to_string(),
        }));
        assert!(md.contains("2 overloads"));
        assert!(md.contains("parameter list"));
    }

    #[test]
    fn every_heading_is_markdown() {
        let errors = [
            Error::GraphInvalid { reason: "duplicate class `p.A`".to_string() },
            Error::SymbolNotFound { name: "p.Nope".to_string() },
            Error::UnsupportedCharset { name: "ebcdic".to_string() },
        ];
        for e in &errors {
            assert!(render_error(e).starts_with("# Error: "), "{e}");
        }
    }
}
