//! Text escaping for generated markup.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::str::FromStr;

use crate::error::Error;

/// Escapes text for one output regime (character data or attribute values).
pub trait Escaper: Send + Sync + std::fmt::Debug {
    /// Escape `text`, borrowing when nothing needs to change.
    fn escape<'t>(&self, text: &'t str) -> Cow<'t, str>;
}

/// Leaves text untouched. Used by plain contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityEscaper;

impl Escaper for IdentityEscaper {
    fn escape<'t>(&self, text: &'t str) -> Cow<'t, str> {
        return Cow::Borrowed(text);
    }
}

/// Character encodings a slice may be written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum Charset {
    /// ISO-8859-1: code points up to U+00FF.
    Latin1,
    /// US-ASCII: code points up to U+007F.
    UsAscii,
    /// UTF-8: everything.
    #[default]
    Utf8,
}

impl Charset {
    /// Whether `c` can be written directly in this encoding.
    pub fn can_encode(self, c: char) -> bool {
        return match self {
            Self::Latin1 => u32::from(c) <= 0xFF,
            Self::UsAscii => c.is_ascii(),
            Self::Utf8 => true,
        };
    }

    /// IANA name, as written into `meta` elements.
    pub const fn name(self) -> &'static str {
        return match self {
            Self::Latin1 => "ISO-8859-1",
            Self::UsAscii => "US-ASCII",
            Self::Utf8 => "UTF-8",
        };
    }
}

impl FromStr for Charset {
    type Err = Error;

    /// Accept common IANA names and aliases, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "us-ascii" | "ascii" => Ok(Self::UsAscii),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Self::Latin1),
            _ => Err(Error::UnsupportedCharset { name: s.to_string() }),
        };
    }
}

impl TryFrom<String> for Charset {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        return value.parse();
    }
}

/// Escapes `&`, `<`, `>` (and `"` for attributes). Characters the charset
/// cannot encode become numeric character references.
#[derive(Debug, Clone, Copy)]
pub struct HypertextEscaper {
    /// Target encoding.
    charset: Charset,
    /// Whether `"` is escaped too.
    double_quotes: bool,
}

impl HypertextEscaper {
    /// Escaper for character data in the given encoding.
    pub const fn for_cdata(charset: Charset) -> Self {
        return Self { charset, double_quotes: false };
    }

    /// Escaper for double-quoted attribute values in the given encoding.
    pub const fn for_attributes(charset: Charset) -> Self {
        return Self { charset, double_quotes: true };
    }

    /// Whether `c` must be replaced.
    fn needs_escape(&self, c: char) -> bool {
        return match c {
            '&' | '<' | '>' => true,
            '"' => self.double_quotes,
            _ => !self.charset.can_encode(c),
        };
    }
}

impl Escaper for HypertextEscaper {
    fn escape<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if !text.chars().any(|c| return self.needs_escape(c)) {
            return Cow::Borrowed(text);
        }
        let mut out = String::with_capacity(text.len().saturating_add(16));
        for c in text.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' if self.double_quotes => out.push_str("&quot;"),
                _ if self.charset.can_encode(c) => out.push(c),
                _ => {
                    let _ = write!(out, "&#{};", u32::from(c));
                },
            }
        }
        return Cow::Owned(out);
    }
}

/// Named references we decode. Enough for hand-written doc comments.
const NAMED_ENTITIES: [(&str, u32); 6] =
    [("amp", 38), ("apos", 39), ("gt", 62), ("lt", 60), ("nbsp", 160), ("quot", 34)];

/// Decode the text between `&` and `;` of an entity or character reference.
pub fn code_point_for_entity(text: &str) -> Option<char> {
    if let Some(hex) = text.strip_prefix("#x").or_else(|| return text.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = text.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32);
    }
    return NAMED_ENTITIES
        .iter()
        .find(|(name, _)| return *name == text)
        .and_then(|(_, cp)| return char::from_u32(*cp));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn cdata_leaves_quotes() {
        let esc = HypertextEscaper::for_cdata(Charset::Utf8);
        assert_eq!(esc.escape(r#"a < "b" & c"#), r#"a &lt; "b" &amp; c"#);
    }

    #[test]
    fn attributes_escape_quotes() {
        let esc = HypertextEscaper::for_attributes(Charset::Utf8);
        assert_eq!(esc.escape(r#"say "hi""#), "say &quot;hi&quot;");
    }

    #[test]
    fn unencodable_become_numeric() {
        let esc = HypertextEscaper::for_cdata(Charset::UsAscii);
        assert_eq!(esc.escape("café"), "caf&#233;");
        let latin = HypertextEscaper::for_cdata(Charset::Latin1);
        assert_eq!(latin.escape("café €"), "café &#8364;");
    }

    #[test]
    fn clean_text_is_borrowed() {
        let esc = HypertextEscaper::for_cdata(Charset::Utf8);
        assert!(matches!(esc.escape("plain"), Cow::Borrowed(_)));
        assert!(matches!(IdentityEscaper.escape("<b>"), Cow::Borrowed("<b>")));
    }

    #[test]
    fn charset_names() {
        assert_eq!("UTF-8".parse::<Charset>().unwrap(), Charset::Utf8);
        assert_eq!("iso-8859-1".parse::<Charset>().unwrap(), Charset::Latin1);
        assert!("ebcdic".parse::<Charset>().is_err());
    }

    #[test]
    fn entities() {
        assert_eq!(code_point_for_entity("#x41"), Some('A'));
        assert_eq!(code_point_for_entity("#66"), Some('B'));
        assert_eq!(code_point_for_entity("nbsp"), Some('\u{a0}'));
        assert_eq!(code_point_for_entity("bogus"), None);
    }
}
