/// Crate-level error types for refweave diagnostics.
use std::fmt;
use std::path::PathBuf;

/// Signature text matched none of the accepted reference forms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed signature: `{text}`")]
pub struct ParseError {
    /// The offending reference text, verbatim.
    pub text: String,
}

/// Why a well-formed signature failed to name anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The signature names a member, but the path resolved to a package or module.
    MemberOfNonClass {
        /// Qualified name of the non-class the member was sought in.
        container: String,
    },
    /// No subject element to default the containing class from.
    NoEnclosingClass,
    /// The containing type has no member of that name and shape.
    NoSuchMember,
    /// The module named before `/` is not in the symbol table.
    NoSuchModule,
    /// The dotted path is neither a package nor a class visible from the context.
    NoSuchPackageOrClass,
    /// Several executables share the name and no parameter list was given.
    ParametersRequired {
        /// Number of same-named executables found.
        overloads: usize,
    },
}

impl fmt::Display for UnresolvedReason {
    /// Short human-readable reason, used inside diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Self::MemberOfNonClass { container } => {
                write!(f, "`{container}` is not a class and has no members")
            },
            Self::NoEnclosingClass => write!(f, "no enclosing class to search"),
            Self::NoSuchMember => write!(f, "no matching member"),
            Self::NoSuchModule => write!(f, "no such module"),
            Self::NoSuchPackageOrClass => write!(f, "no such package or class"),
            Self::ParametersRequired { overloads } => {
                write!(f, "{overloads} overloads share this name; give a parameter list")
            },
        };
    }
}

/// A parsed signature could not be matched against the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// More than one candidate survived parameter filtering. Never guessed.
    #[error("ambiguous reference `{signature}` in {context}: {} candidates", candidates.len())]
    Ambiguous {
        /// Qualified names of the surviving candidates.
        candidates: Vec<String>,
        /// Element whose documentation holds the reference.
        context: String,
        /// The signature text as written.
        signature: String,
    },

    /// Nothing matched.
    #[error("unresolved reference `{signature}` in {context}: {reason}")]
    Unresolved {
        /// Element whose documentation holds the reference.
        context: String,
        /// Which lookup step gave up.
        reason: UnresolvedReason,
        /// The signature text as written.
        signature: String,
    },
}

impl ResolutionError {
    /// The signature text the failure concerns.
    pub fn signature(&self) -> &str {
        return match self {
            Self::Ambiguous { signature, .. } | Self::Unresolved { signature, .. } => signature,
        };
    }
}

/// All errors in refweave carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, symbol, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-level error type")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced input file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The symbol graph parsed as JSON but is not internally consistent.
    #[error("symbol graph invalid: {reason}")]
    GraphInvalid {
        /// Description of the inconsistency.
        reason: String,
    },

    /// The configured base location cannot serve as a base URI.
    #[error("invalid base location: `{text}`")]
    InvalidBase {
        /// The text that failed to become a base URI.
        text: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON deserialization of the symbol graph failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// `--locale` matched none of the configured slices.
    #[error("no slice offers locale `{locale}`")]
    NoMatchingSlice {
        /// The requested locale.
        locale: String,
    },

    /// A page could not be produced; siblings are unaffected.
    #[error("page `{page}` failed: {reason}")]
    PageFailed {
        /// Qualified name of the symbol the page documents.
        page: String,
        /// Description of the failure.
        reason: String,
    },

    /// Signature text was malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Signature could not be resolved.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A symbol named on the command line does not exist in the graph.
    #[error("symbol not found: `{name}`")]
    SymbolNotFound {
        /// The qualified name that was looked up.
        name: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A slice names a character encoding we cannot escape for.
    #[error("unsupported charset: `{name}`")]
    UnsupportedCharset {
        /// The charset name as configured.
        name: String,
    },

    /// URI text failed to parse.
    #[error("url: {0}")]
    Url(
        /// The wrapped URL parse error.
        #[from]
        url::ParseError,
    ),
}
