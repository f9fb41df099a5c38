//! Type expressions as written in the symbol graph file.
//!
//! `java.util.Map<K, List<? extends V>>[]`, `int...`, `? super T`. Parsing is
//! syntactic; names are placed later, against the loaded graph.

use crate::error::Error;

/// A parsed, unplaced type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// Component type plus one dimension.
    Array(Box<TypeExpr>),
    /// A dotted name with optional type arguments.
    Named {
        /// Type arguments, possibly empty.
        args: Vec<TypeExpr>,
        /// Dotted name as written.
        name: String,
    },
    /// `?` with at most one bound.
    Wildcard {
        /// `super` bound.
        lower: Option<Box<TypeExpr>>,
        /// `extends` bound.
        upper: Option<Box<TypeExpr>>,
    },
}

/// A top-level type expression and whether it carried a `...` suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedType {
    /// The type. A varargs suffix is folded in as one extra array dimension.
    pub expr: TypeExpr,
    /// Whether `...` was written.
    pub varargs: bool,
}

/// Parse a complete type expression.
///
/// # Errors
///
/// Returns `Error::GraphInvalid` naming the text when it is not a type.
pub fn parse_type(text: &str) -> Result<ParsedType, Error> {
    let mut cursor = Cursor { rest: text.trim() };
    let parsed = cursor
        .parse_type()
        .and_then(|expr| {
            let varargs = cursor.eat("...");
            let expr = if varargs { TypeExpr::Array(Box::new(expr)) } else { expr };
            return cursor.rest.trim().is_empty().then_some(ParsedType { expr, varargs });
        });
    return parsed.ok_or_else(|| return Error::GraphInvalid {
        reason: format!("malformed type expression `{text}`"),
    });
}

/// Recursive-descent state over the remaining input.
struct Cursor<'t> {
    /// Unconsumed input.
    rest: &'t str,
}

impl Cursor<'_> {
    /// Skip whitespace and consume `token` if it comes next.
    fn eat(&mut self, token: &str) -> bool {
        let trimmed = self.rest.trim_start();
        if let Some(after) = trimmed.strip_prefix(token) {
            self.rest = after;
            return true;
        }
        return false;
    }

    /// Consume a keyword only when followed by whitespace.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let trimmed = self.rest.trim_start();
        let follows = trimmed
            .strip_prefix(keyword)
            .is_some_and(|after| return after.starts_with(char::is_whitespace));
        if follows {
            return self.eat(keyword);
        }
        return false;
    }

    /// `name args? ([])*` or a wildcard.
    fn parse_type(&mut self) -> Option<TypeExpr> {
        if self.eat("?") {
            let (lower, upper) = if self.eat_keyword("extends") {
                (None, Some(Box::new(self.parse_type()?)))
            } else if self.eat_keyword("super") {
                (Some(Box::new(self.parse_type()?)), None)
            } else {
                (None, None)
            };
            return Some(TypeExpr::Wildcard { lower, upper });
        }

        let name = self.parse_name()?;
        let mut args = Vec::new();
        if self.eat("<") {
            loop {
                args.push(self.parse_type()?);
                if self.eat(">") {
                    break;
                }
                if !self.eat(",") {
                    return None;
                }
            }
        }
        let mut expr = TypeExpr::Named { args, name };
        while self.eat("[]") {
            expr = TypeExpr::Array(Box::new(expr));
        }
        return Some(expr);
    }

    /// A dotted identifier path. Stops before a `...` suffix.
    fn parse_name(&mut self) -> Option<String> {
        let trimmed = self.rest.trim_start();
        let mut end = 0;
        let mut chars = trimmed.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            let is_part = c.is_alphanumeric() || c == '_' || c == '$';
            let is_separator = c == '.'
                && end > 0
                && chars
                    .peek()
                    .is_some_and(|(_, next)| return next.is_alphabetic() || *next == '_' || *next == '$');
            if !is_part && !is_separator {
                break;
            }
            end = i.saturating_add(c.len_utf8());
        }
        if end == 0 || trimmed.starts_with(|c: char| return c.is_ascii_digit()) {
            return None;
        }
        let (name, rest) = trimmed.split_at(end);
        self.rest = rest;
        return Some(name.to_string());
    }
}

impl TypeExpr {
    /// Whether this names a bare identifier with no arguments.
    pub fn as_simple_name(&self) -> Option<&str> {
        return match self {
            Self::Named { args, name } if args.is_empty() => Some(name),
            _ => None,
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    fn named(name: &str, args: Vec<TypeExpr>) -> TypeExpr {
        TypeExpr::Named { args, name: name.to_string() }
    }

    #[test]
    fn primitives_and_arrays() {
        assert_eq!(parse_type("int").unwrap().expr, named("int", vec![]));
        let arr = parse_type("byte[][]").unwrap();
        assert_eq!(
            arr.expr,
            TypeExpr::Array(Box::new(TypeExpr::Array(Box::new(named("byte", vec![])))))
        );
        assert!(!arr.varargs);
    }

    #[test]
    fn varargs_fold_into_array() {
        let parsed = parse_type("java.lang.String...").unwrap();
        assert!(parsed.varargs);
        assert_eq!(parsed.expr, TypeExpr::Array(Box::new(named("java.lang.String", vec![]))));
    }

    #[test]
    fn generics_and_wildcards() {
        let parsed = parse_type("Map<K, List<? extends V>>").unwrap();
        let wildcard = TypeExpr::Wildcard { lower: None, upper: Some(Box::new(named("V", vec![]))) };
        assert_eq!(
            parsed.expr,
            named("Map", vec![named("K", vec![]), named("List", vec![wildcard])])
        );
        let sup = parse_type("Comparable<? super T>").unwrap();
        assert!(matches!(sup.expr, TypeExpr::Named { ref args, .. }
            if matches!(args.first(), Some(TypeExpr::Wildcard { lower: Some(_), upper: None }))));
    }

    #[test]
    fn rejects_garbage() {
        for text in ["", "List<", "Map<K,>", "1int", "int[", "a b"] {
            assert!(parse_type(text).is_err(), "accepted `{text}`");
        }
    }
}
