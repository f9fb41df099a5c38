//! Textual reference signatures: `[[module/]path][#member[(params)]]`.
//!
//! Parsing is purely syntactic. Nothing here decides whether a dotted path
//! names a package or a class, and no component is checked for existence.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;

/// Which characters may start and continue an identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentifierPolicy {
    /// ASCII letters, digits, `_` and `$`; no leading digit.
    Ascii,
    /// Unicode identifier start/continue classes plus `_` and `$`.
    #[default]
    Unicode,
}

impl IdentifierPolicy {
    /// Regex fragment matching exactly one identifier.
    const fn identifier_pattern(self) -> &'static str {
        return match self {
            Self::Ascii => r"[A-Za-z_$][A-Za-z0-9_$]*",
            Self::Unicode => r"[\p{XID_Start}_$][\p{XID_Continue}$]*",
        };
    }
}

/// One entry of a signature's parameter list.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Parameter {
    /// Count of `[]` pairs. A varargs marker is not included.
    pub array_dimensions: u32,
    /// Erased type name as written, e.g. `int` or `java.lang.String`.
    pub erased_type: String,
    /// Whether the parameter ends in `...`.
    pub is_varargs: bool,
}

impl Parameter {
    /// Dimensions once a varargs marker is counted as an array.
    pub fn total_dimensions(&self) -> u32 {
        return self.array_dimensions.saturating_add(u32::from(self.is_varargs));
    }
}

impl fmt::Display for Parameter {
    /// The parameter exactly as the grammar spells it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.erased_type)?;
        for _ in 0..self.array_dimensions {
            f.write_str("[]")?;
        }
        if self.is_varargs {
            f.write_str("...")?;
        }
        return Ok(());
    }
}

/// A parsed, unresolved reference. At least one of `module`,
/// `package_or_class` and `member` is present.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Signature {
    /// Simple member name after `#`.
    pub member: Option<String>,
    /// Qualified module name before `/`.
    pub module: Option<String>,
    /// Dotted path; package or class is undetermined.
    pub package_or_class: Option<String>,
    /// `None` when no parentheses were written; `Some(vec![])` for `()`.
    pub parameters: Option<Vec<Parameter>>,
}

impl Signature {
    /// Parse with the default (Unicode) identifier policy.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if `text` matches none of the accepted forms.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        return DEFAULT_PARSER.parse(text);
    }

    /// Text for an unlinked rendering: path, then `.member`, then parameters.
    pub fn display_text(&self) -> String {
        let mut out = String::new();
        if let Some(path) = &self.package_or_class {
            out.push_str(path);
        } else if let Some(module) = &self.module {
            out.push_str(module);
        }
        if let Some(member) = &self.member {
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(member);
        }
        if let Some(params) = &self.parameters {
            out.push('(');
            out.push_str(&join_parameters(params, ", "));
            out.push(')');
        }
        return out;
    }
}

/// Render parameters with a separator.
fn join_parameters(params: &[Parameter], sep: &str) -> String {
    return params
        .iter()
        .map(|p| return p.to_string())
        .collect::<Vec<_>>()
        .join(sep);
}

impl fmt::Display for Signature {
    /// Canonical text that parses back to an equal signature.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(module) = &self.module {
            write!(f, "{module}/")?;
        }
        if let Some(path) = &self.package_or_class {
            f.write_str(path)?;
        }
        if let Some(member) = &self.member {
            write!(f, "#{member}")?;
        }
        if let Some(params) = &self.parameters {
            write!(f, "({})", join_parameters(params, ","))?;
        }
        return Ok(());
    }
}

/// Default parser shared by [`Signature::parse`].
static DEFAULT_PARSER: LazyLock<SignatureParser> =
    LazyLock::new(|| return SignatureParser::new(IdentifierPolicy::default()));

/// Compiled grammar for one identifier policy. Cheap to share across threads.
#[derive(Debug, Clone)]
pub struct SignatureParser {
    /// Matches a single parameter.
    parameter: Regex,
    /// Matches a whole reference.
    reference: Regex,
}

impl SignatureParser {
    /// Compile the grammar for the given identifier policy.
    ///
    /// # Panics
    ///
    /// Panics if the built-in patterns fail to compile (compile-time invariant).
    #[allow(clippy::expect_used, reason = "patterns are fixed at compile time")]
    pub fn new(policy: IdentifierPolicy) -> Self {
        let ident = policy.identifier_pattern();
        let path = format!(r"{ident}(?:\.{ident})*");
        let param = format!(r"{path}(?:\[\])*(?:\.\.\.)?");

        let reference = format!(
            r"^(?:(?P<module>{path})/)?(?P<path>{path})?(?:#(?P<member>{ident})(?:\((?P<args>\s*(?:{param}(?:\s*,\s*{param})*)?\s*)\))?)?$"
        );
        let parameter =
            format!(r"^(?P<type>{path})(?P<dims>(?:\[\])*)(?P<ellipsis>\.\.\.)?$");

        return Self {
            parameter: Regex::new(&parameter).expect("valid parameter regex"),
            reference: Regex::new(&reference).expect("valid reference regex"),
        };
    }

    /// Parse reference text into its components.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` when the text is not a full reference, a module-only,
    /// path-only or member-only reference, or when it names nothing at all.
    pub fn parse(&self, text: &str) -> Result<Signature, ParseError> {
        let malformed = || return ParseError { text: text.to_string() };
        let caps = self.reference.captures(text).ok_or_else(malformed)?;

        let module = caps.name("module").map(|m| return m.as_str().to_string());
        let package_or_class = caps.name("path").map(|m| return m.as_str().to_string());
        let member = caps.name("member").map(|m| return m.as_str().to_string());
        if module.is_none() && package_or_class.is_none() && member.is_none() {
            return Err(malformed());
        }

        let parameters = match caps.name("args") {
            None => None,
            Some(args) => Some(self.parse_parameter_list(args.as_str()).ok_or_else(malformed)?),
        };

        return Ok(Signature {
            member,
            module,
            package_or_class,
            parameters,
        });
    }

    /// Split a comma-separated list. Blank text is the empty list.
    fn parse_parameter_list(&self, text: &str) -> Option<Vec<Parameter>> {
        if text.trim().is_empty() {
            return Some(Vec::new());
        }
        return text
            .split(',')
            .map(|part| return self.parse_parameter(part.trim()))
            .collect();
    }

    /// Parse one `type([])*(...)?` parameter.
    fn parse_parameter(&self, text: &str) -> Option<Parameter> {
        let caps = self.parameter.captures(text)?;
        let dims = caps.name("dims").map_or(0, |m| return m.as_str().len() / 2);
        return Some(Parameter {
            array_dimensions: u32::try_from(dims).ok()?,
            erased_type: caps.name("type")?.as_str().to_string(),
            is_varargs: caps.name("ellipsis").is_some(),
        });
    }
}

impl Default for SignatureParser {
    fn default() -> Self {
        return Self::new(IdentifierPolicy::default());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "test assertions")]
mod tests {
    use super::*;

    fn param(ty: &str, dims: u32, varargs: bool) -> Parameter {
        Parameter { array_dimensions: dims, erased_type: ty.to_string(), is_varargs: varargs }
    }

    #[test]
    fn class_only() {
        let sig = Signature::parse("pkg.Class").unwrap();
        assert_eq!(sig.package_or_class.as_deref(), Some("pkg.Class"));
        assert_eq!(sig.module, None);
        assert_eq!(sig.member, None);
        assert_eq!(sig.parameters, None);
    }

    #[test]
    fn field_has_no_parameter_list() {
        let sig = Signature::parse("pkg.Class#field").unwrap();
        assert_eq!(sig.member.as_deref(), Some("field"));
        assert_eq!(sig.parameters, None);
    }

    #[test]
    fn empty_parens_differ_from_absent_parens() {
        let sig = Signature::parse("pkg.Class#method()").unwrap();
        assert_eq!(sig.parameters, Some(Vec::new()));
    }

    #[test]
    fn parameters_keep_dims_and_varargs_apart() {
        let sig = Signature::parse("pkg.Class#method(int,java.lang.String[])").unwrap();
        assert_eq!(
            sig.parameters.unwrap(),
            vec![param("int", 0, false), param("java.lang.String", 1, false)]
        );

        let sig = Signature::parse("mod.name/pkg.Class#ctor(int...)").unwrap();
        assert_eq!(sig.module.as_deref(), Some("mod.name"));
        assert_eq!(sig.package_or_class.as_deref(), Some("pkg.Class"));
        assert_eq!(sig.member.as_deref(), Some("ctor"));
        let params = sig.parameters.unwrap();
        assert_eq!(params, vec![param("int", 0, true)]);
        assert_eq!(params[0].total_dimensions(), 1);
    }

    #[test]
    fn display_round_trips() {
        for text in [
            "pkg.Class",
            "pkg.Class#field",
            "pkg.Class#method()",
            "pkg.Class#method(int,java.lang.String[])",
            "mod.name/pkg.Class#ctor(int...)",
            "#local(byte[][]...)",
            "single.module/",
        ] {
            let sig = Signature::parse(text).unwrap();
            assert_eq!(sig.to_string(), text);
            assert_eq!(Signature::parse(&sig.to_string()).unwrap(), sig);
        }
    }

    #[test]
    fn whitespace_around_commas() {
        let sig = Signature::parse("C#m( int , long[] )").unwrap();
        assert_eq!(sig.parameters.unwrap(), vec![param("int", 0, false), param("long", 1, false)]);
    }

    #[test]
    fn partial_forms() {
        assert_eq!(Signature::parse("#member").unwrap().member.as_deref(), Some("member"));
        let module_only = Signature::parse("java.base/").unwrap();
        assert_eq!(module_only.module.as_deref(), Some("java.base"));
        assert_eq!(module_only.package_or_class, None);
    }

    #[test]
    fn rejects_malformed() {
        for text in ["", "#", "pkg..Class", "pkg.Class#", "C#m(int", "C#m(,)", "C#m(int)x", "1abc", "a/b/c"] {
            assert!(Signature::parse(text).is_err(), "accepted `{text}`");
        }
    }

    #[test]
    fn ascii_policy_rejects_non_ascii() {
        let ascii = SignatureParser::new(IdentifierPolicy::Ascii);
        assert!(ascii.parse("pkg.Ünïcode").is_err());
        assert!(ascii.parse("pkg.Plain_1").is_ok());
        assert!(Signature::parse("pkg.Ünïcode").is_ok());
    }

    #[test]
    fn display_text_for_unlinked_rendering() {
        let sig = Signature::parse("pkg.Class#method(int,String...)").unwrap();
        assert_eq!(sig.display_text(), "pkg.Class.method(int, String...)");
        assert_eq!(Signature::parse("#f").unwrap().display_text(), "f");
    }
}
