//! Tokenized documentation text.
//!
//! Raw comment text is split into inline nodes and block tags once, when the
//! graph loads. Renderers walk the nodes; they never re-parse the text.

use crate::escape::code_point_for_entity;

/// One inline piece of documentation text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocNode {
    /// `{@code ...}`: literal text shown as code.
    Code(String),
    /// `{@inheritDoc}`: the matching text of the overridden method.
    InheritDoc,
    /// `{@link ref label}` or `{@linkplain ref label}`.
    Link {
        /// Optional label content; empty when absent.
        label: Vec<DocNode>,
        /// `true` for `{@linkplain}`, which does not mark the link as code.
        plain: bool,
        /// Reference text, not yet parsed.
        reference: String,
    },
    /// `{@summary ...}`: explicit first-sentence content.
    Summary(Vec<DocNode>),
    /// Plain text with entities already decoded.
    Text(String),
}

/// A block tag following the comment body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockTag {
    /// Any tag without dedicated handling, e.g. `@since`.
    Other {
        /// Tag content.
        body: Vec<DocNode>,
        /// Tag name without `@`.
        name: String,
    },
    /// `@param name text`.
    Param {
        /// Description.
        body: Vec<DocNode>,
        /// Parameter name, or `<T>` for a type parameter.
        name: String,
    },
    /// `@return text`.
    Return(Vec<DocNode>),
    /// `@throws Type text` or `@exception Type text`.
    Throws {
        /// Description.
        body: Vec<DocNode>,
        /// Exception type as written.
        exception: String,
    },
}

/// A parsed documentation comment: body nodes and trailing block tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    /// Main description.
    pub body: Vec<DocNode>,
    /// Block tags in source order.
    pub tags: Vec<BlockTag>,
}

impl DocComment {
    /// Split comment text into body and block tags and tokenize each part.
    pub fn parse(text: &str) -> Self {
        let mut sections: Vec<String> = vec![String::new()];
        let mut depth = 0_usize;
        for line in text.lines() {
            let trimmed = line.trim_start();
            let starts_tag = depth == 0
                && trimmed
                    .strip_prefix('@')
                    .is_some_and(|rest| return rest.starts_with(|c: char| return c.is_ascii_alphabetic()));
            if starts_tag {
                sections.push(trimmed.to_string());
            } else if let Some(current) = sections.last_mut() {
                if !current.is_empty() {
                    current.push('\n');
                }
                current.push_str(line);
            }
            for c in line.chars() {
                match c {
                    '{' => depth = depth.saturating_add(1),
                    '}' => depth = depth.saturating_sub(1),
                    _ => {},
                }
            }
        }

        let mut sections = sections.into_iter();
        let body = parse_inline(sections.next().unwrap_or_default().trim());
        let tags = sections.map(|section| return parse_block_tag(&section)).collect();
        return Self { body, tags };
    }

    /// Description of the named parameter.
    pub fn param(&self, name: &str) -> Option<&[DocNode]> {
        return self.tags.iter().find_map(|tag| {
            return match tag {
                BlockTag::Param { body, name: n } if n == name => Some(body.as_slice()),
                _ => None,
            };
        });
    }

    /// Description of the return value.
    pub fn returns(&self) -> Option<&[DocNode]> {
        return self.tags.iter().find_map(|tag| {
            return match tag {
                BlockTag::Return(body) => Some(body.as_slice()),
                _ => None,
            };
        });
    }

    /// Descriptions of thrown exceptions, with the type text as written.
    pub fn throws(&self) -> impl Iterator<Item = (&str, &[DocNode])> {
        return self.tags.iter().filter_map(|tag| {
            return match tag {
                BlockTag::Throws { body, exception } => Some((exception.as_str(), body.as_slice())),
                _ => None,
            };
        });
    }
}

/// Split `@name rest` into a block tag.
fn parse_block_tag(section: &str) -> BlockTag {
    let section = section.strip_prefix('@').unwrap_or(section);
    let (name, rest) = split_word(section);
    return match name {
        "param" => {
            let (param, body) = split_word(rest);
            BlockTag::Param { body: parse_inline(body), name: param.to_string() }
        },
        "return" => BlockTag::Return(parse_inline(rest)),
        "throws" | "exception" => {
            let (exception, body) = split_word(rest);
            BlockTag::Throws { body: parse_inline(body), exception: exception.to_string() }
        },
        _ => BlockTag::Other { body: parse_inline(rest), name: name.to_string() },
    };
}

/// First whitespace-delimited word and the trimmed remainder.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    return match text.find(char::is_whitespace) {
        Some(at) => (text.get(..at).unwrap_or(text), text.get(at..).unwrap_or("").trim()),
        None => (text, ""),
    };
}

/// Tokenize inline content: text runs and `{@tag ...}` forms.
pub fn parse_inline(text: &str) -> Vec<DocNode> {
    let mut nodes = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(open) = rest.find("{@") {
        let (before, tail) = rest.split_at(open);
        plain.push_str(before);
        let Some(close) = matching_brace(tail) else {
            // Unterminated: keep the remainder as text.
            plain.push_str(tail);
            rest = "";
            break;
        };
        let inner = tail.get(2..close).unwrap_or("");
        rest = tail.get(close.saturating_add(1)..).unwrap_or("");

        let (name, content) = split_tag_name(inner);
        let node = match name {
            "code" | "literal" => Some(DocNode::Code(content.to_string())),
            "inheritDoc" => Some(DocNode::InheritDoc),
            "link" | "linkplain" => Some(parse_link(content, name == "linkplain")),
            "summary" => Some(DocNode::Summary(parse_inline(content.trim()))),
            _ => None,
        };
        match node {
            Some(node) => {
                flush_text(&mut plain, &mut nodes);
                nodes.push(node);
            },
            None => plain.push_str(tail.get(..=close).unwrap_or("")),
        }
    }
    plain.push_str(rest);
    flush_text(&mut plain, &mut nodes);
    return nodes;
}

/// Tag name and its content. One separating space is consumed.
fn split_tag_name(inner: &str) -> (&str, &str) {
    let end = inner.find(char::is_whitespace).unwrap_or(inner.len());
    let name = inner.get(..end).unwrap_or(inner);
    let content = inner.get(end..).unwrap_or("");
    let content = content
        .strip_prefix(|c: char| return c.is_whitespace())
        .unwrap_or(content);
    return (name, content);
}

/// Byte index of the `}` closing the `{` at index 0.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0_usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth = depth.saturating_add(1),
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            },
            _ => {},
        }
    }
    return None;
}

/// Split link content into the reference and label. Whitespace inside a
/// parameter list belongs to the reference.
fn parse_link(content: &str, plain: bool) -> DocNode {
    let content = content.trim();
    let mut parens = 0_usize;
    let mut split = content.len();
    for (i, c) in content.char_indices() {
        match c {
            '(' => parens = parens.saturating_add(1),
            ')' => parens = parens.saturating_sub(1),
            c if c.is_whitespace() && parens == 0 => {
                split = i;
                break;
            },
            _ => {},
        }
    }
    let reference = content.get(..split).unwrap_or(content).to_string();
    let label = parse_inline(content.get(split..).unwrap_or("").trim());
    return DocNode::Link { label, plain, reference };
}

/// Move accumulated text into a decoded `Text` node.
fn flush_text(plain: &mut String, nodes: &mut Vec<DocNode>) {
    if plain.is_empty() {
        return;
    }
    nodes.push(DocNode::Text(decode_entities(plain)));
    plain.clear();
    return;
}

/// Replace entity and character references with the characters they name.
/// Unknown references stay as written.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        let (before, tail) = rest.split_at(amp);
        out.push_str(before);
        let decoded = tail
            .find(';')
            .filter(|&semi| return semi <= 10)
            .and_then(|semi| {
                let c = code_point_for_entity(tail.get(1..semi)?)?;
                return Some((c, semi));
            });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = tail.get(semi.saturating_add(1)..).unwrap_or("");
            },
            None => {
                out.push('&');
                rest = tail.get(1..).unwrap_or("");
            },
        }
    }
    out.push_str(rest);
    return out;
}

/// The first sentence of some content: the `{@summary}` node if present,
/// otherwise everything up to and including the first `.` that ends the text
/// or precedes whitespace.
pub fn first_sentence(nodes: &[DocNode]) -> Vec<DocNode> {
    for node in nodes {
        if matches!(node, DocNode::Summary(_)) {
            return vec![node.clone()];
        }
    }

    let mut out = Vec::new();
    let last = nodes.len().saturating_sub(1);
    for (index, node) in nodes.iter().enumerate() {
        let DocNode::Text(text) = node else {
            out.push(node.clone());
            continue;
        };
        if let Some(end) = sentence_end(text, index == last) {
            out.push(DocNode::Text(text.get(..end).unwrap_or(text).to_string()));
            return out;
        }
        out.push(node.clone());
    }
    return out;
}

/// Byte offset just past the sentence-ending period in `text`, if any.
fn sentence_end(text: &str, is_last: bool) -> Option<usize> {
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '.' {
            continue;
        }
        match chars.peek() {
            Some((_, next)) if next.is_whitespace() => return Some(i.saturating_add(1)),
            None if is_last => return Some(i.saturating_add(1)),
            _ => {},
        }
    }
    return None;
}
