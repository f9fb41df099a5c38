//! Content-negotiated variants of the generated output.

use std::sync::Arc;

use url::Url;

use crate::escape::{Charset, Escaper, HypertextEscaper};
use crate::output_context::OutputContext;

/// One variant of the output: a locale, an encoding, and the suffix its
/// file names carry so a server can negotiate between variants.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct SliceSpecification {
    /// Encoding of the slice's pages.
    pub charset: Charset,
    /// Locale tag such as `en` or `en-US`.
    pub locale: String,
    /// Appended to every file name, e.g. `.en`.
    pub suffix: String,
}

impl Default for SliceSpecification {
    fn default() -> Self {
        return Self { charset: Charset::Utf8, locale: "en".to_string(), suffix: String::new() };
    }
}

impl SliceSpecification {
    /// Escaper for character data in this slice's encoding.
    pub fn escaper(&self) -> Arc<dyn Escaper> {
        return Arc::new(HypertextEscaper::for_cdata(self.charset));
    }

    /// Escaper for attribute values in this slice's encoding.
    pub fn attribute_escaper(&self) -> Arc<dyn Escaper> {
        return Arc::new(HypertextEscaper::for_attributes(self.charset));
    }

    /// File name of `name` within this slice.
    pub fn file_name(&self, name: &str) -> String {
        return format!("{name}{}", self.suffix);
    }

    /// Bytes of `text` in this slice's encoding. Escaping has already
    /// replaced what the encoding cannot hold; anything left becomes `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        return match self.charset {
            Charset::Utf8 => text.as_bytes().to_vec(),
            Charset::Latin1 | Charset::UsAscii => text
                .chars()
                .map(|c| {
                    return u8::try_from(u32::from(c))
                        .ok()
                        .filter(|_| return self.charset.can_encode(c))
                        .unwrap_or(b'?');
                })
                .collect(),
        };
    }

    /// Root output context for a page of this slice at `location`.
    pub fn output_context(&self, location: Url) -> OutputContext {
        return OutputContext::for_block(location, self.escaper(), self.attribute_escaper());
    }
}

/// Whether content in the `offered` locale satisfies a request for
/// `required`. Languages must match; a country or variant the offer names
/// must match too, while one the offer leaves out matches anything.
pub fn locale_compatible(required: &str, offered: &str) -> bool {
    let split = |tag: &str| -> Vec<String> {
        return tag.split(['-', '_']).map(str::to_ascii_lowercase).collect();
    };
    let required = split(required);
    let offered = split(offered);
    if required.first() != offered.first() {
        return false;
    }
    return offered
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, part)| return !part.is_empty())
        .all(|(index, part)| return required.get(index) == Some(part));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let slice = SliceSpecification::default();
        assert_eq!(slice.locale, "en");
        assert_eq!(slice.charset, Charset::Utf8);
        assert_eq!(slice.file_name("index.html"), "index.html");
    }

    #[test]
    fn suffix_and_charset_from_toml() {
        let slice: SliceSpecification = toml::from_str("charset = \"us-ascii\"\nsuffix = \".en\"").unwrap();
        assert_eq!(slice.charset, Charset::UsAscii);
        assert_eq!(slice.locale, "en");
        assert_eq!(slice.file_name("index.html"), "index.html.en");
        assert!(toml::from_str::<SliceSpecification>("charset = \"ebcdic\"").is_err());
    }

    #[test]
    fn escapers_follow_the_charset() {
        let slice = SliceSpecification { charset: Charset::Latin1, ..SliceSpecification::default() };
        assert_eq!(slice.escaper().escape("é → \"x\""), "é &#8594; \"x\"");
        assert_eq!(slice.attribute_escaper().escape("\"x\""), "&quot;x&quot;");
    }

    #[test]
    fn encoding_is_single_byte_outside_utf8() {
        let latin = SliceSpecification { charset: Charset::Latin1, ..SliceSpecification::default() };
        assert_eq!(latin.encode("caf\u{e9}"), vec![b'c', b'a', b'f', 0xE9]);
        let ascii = SliceSpecification { charset: Charset::UsAscii, ..SliceSpecification::default() };
        assert_eq!(ascii.encode("caf\u{e9}"), b"caf?".to_vec());
        assert_eq!(SliceSpecification::default().encode("\u{e9}"), "\u{e9}".as_bytes().to_vec());
    }

    #[test]
    fn output_context_is_block_level() {
        let slice = SliceSpecification::default();
        let ctx = slice.output_context(Url::parse("file:///out/p/C.html").unwrap());
        assert!(ctx.can_link() && ctx.can_mark_up_block());
        assert_eq!(ctx.escape("<"), "&lt;");
    }

    #[test]
    fn locale_matching() {
        assert!(locale_compatible("en-US", "en"));
        assert!(locale_compatible("en_US", "en-us"));
        assert!(locale_compatible("EN", "en"));
        assert!(!locale_compatible("en", "en-US"));
        assert!(!locale_compatible("fr-FR", "en"));
        assert!(!locale_compatible("en-GB", "en-US"));
        assert!(locale_compatible("de-DE-1996", "de-DE-1996"));
        assert!(!locale_compatible("de-DE", "de-DE-1996"));
    }
}
