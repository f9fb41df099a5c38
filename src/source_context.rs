//! Which symbol's documentation is being interpreted, and under which tag.

use std::sync::{Arc, LazyLock};

use crate::types::{SymbolId, TypeRef};

/// The tag currently scoping interpretation. At most one is active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TagScope {
    /// A block tag without dedicated handling.
    Block,
    /// Main description; no tag.
    #[default]
    None,
    /// `@param` at this position.
    Param(usize),
    /// `@return`.
    Return,
    /// `{@summary}`.
    Summary,
    /// `@throws` for this exception type.
    Throws(TypeRef),
}

/// The fields of one context node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Frame {
    /// Whether the text is part of a first sentence.
    in_first_sentence: bool,
    /// Active tag.
    scope: TagScope,
    /// Symbol whose documentation this is.
    subject: Option<SymbolId>,
}

/// Shared root for contexts with nothing specified.
static EMPTY: LazyLock<SourceContext> = LazyLock::new(|| return SourceContext(Arc::new(Frame::default())));

/// Immutable documentation-source context. Cloning shares the node.
#[derive(Debug, Clone)]
pub struct SourceContext(Arc<Frame>);

impl SourceContext {
    /// Context where everything must be specified in full.
    pub fn empty() -> Self {
        return EMPTY.clone();
    }

    /// Context for the main description of `subject`.
    pub fn for_element(subject: SymbolId) -> Self {
        return Self(Arc::new(Frame { subject: Some(subject), ..Frame::default() }));
    }

    /// Replace the tag scope, returning `self` when it is already active.
    fn scoped(&self, scope: TagScope) -> Self {
        if self.0.scope == scope {
            return self.clone();
        }
        let mut frame = (*self.0).clone();
        frame.scope = scope;
        return Self(Arc::new(frame));
    }

    /// Panic unless a subject is set: tag-scoped contexts need an owner.
    fn require_subject(&self, tag: &str) {
        assert!(self.0.subject.is_some(), "cannot enter {tag} without a subject element");
        return;
    }

    // ── Derivations ─────────────────────────────────────────────────

    /// Inside a generic block tag.
    pub fn in_block_tag(&self) -> Self {
        return self.scoped(TagScope::Block);
    }

    /// Back to the main description of the same subject.
    pub fn in_element(&self) -> Self {
        return self.scoped(TagScope::None);
    }

    /// Inside a first sentence. Persists across tag changes.
    pub fn in_first_sentence(&self) -> Self {
        if self.0.in_first_sentence {
            return self.clone();
        }
        let mut frame = (*self.0).clone();
        frame.in_first_sentence = true;
        return Self(Arc::new(frame));
    }

    /// Inside `@return`.
    ///
    /// # Panics
    ///
    /// Panics if no subject element is set.
    pub fn in_return_tag(&self) -> Self {
        self.require_subject("@return");
        return self.scoped(TagScope::Return);
    }

    /// Inside `{@summary}`.
    ///
    /// # Panics
    ///
    /// Panics if no subject element is set.
    pub fn in_summary_tag(&self) -> Self {
        self.require_subject("{@summary}");
        return self.scoped(TagScope::Summary);
    }

    /// Inside `@throws` for `exception`.
    ///
    /// # Panics
    ///
    /// Panics if no subject element is set.
    pub fn in_throws_tag(&self, exception: TypeRef) -> Self {
        self.require_subject("@throws");
        return self.scoped(TagScope::Throws(exception));
    }

    /// Inside `@param` for the parameter at `position`.
    ///
    /// # Panics
    ///
    /// Panics if no subject element is set.
    pub fn in_param_tag(&self, position: usize) -> Self {
        self.require_subject("@param");
        return self.scoped(TagScope::Param(position));
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Symbol whose documentation this is.
    pub fn subject(&self) -> Option<SymbolId> {
        return self.0.subject;
    }

    /// Active tag.
    pub fn scope(&self) -> &TagScope {
        return &self.0.scope;
    }

    /// Whether inside a generic block tag.
    pub fn is_block_tag(&self) -> bool {
        return self.0.scope == TagScope::Block;
    }

    /// Whether inside `@return`.
    pub fn is_return_tag(&self) -> bool {
        return self.0.scope == TagScope::Return;
    }

    /// Whether inside `{@summary}`.
    pub fn is_summary_tag(&self) -> bool {
        return self.0.scope == TagScope::Summary;
    }

    /// Position of the `@param` being interpreted, if any.
    pub fn param_position(&self) -> Option<usize> {
        return match self.0.scope {
            TagScope::Param(position) => Some(position),
            _ => None,
        };
    }

    /// Exception type of the `@throws` being interpreted, if any.
    pub fn throws_type(&self) -> Option<&TypeRef> {
        return match &self.0.scope {
            TagScope::Throws(ty) => Some(ty),
            _ => None,
        };
    }

    /// Whether the text is part of a first sentence.
    pub fn is_first_sentence(&self) -> bool {
        return self.0.in_first_sentence;
    }

    /// The same tag state re-homed onto `subject`: used when inherited text
    /// is interpreted in the context of the method it came from.
    pub fn rehomed(&self, subject: SymbolId) -> Self {
        if self.0.subject == Some(subject) {
            return self.clone();
        }
        let mut frame = (*self.0).clone();
        frame.subject = Some(subject);
        return Self(Arc::new(frame));
    }

    /// Whether `self` and `other` are the same node.
    pub fn same_node(&self, other: &Self) -> bool {
        return Arc::ptr_eq(&self.0, &other.0);
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        return Self::empty();
    }
}

impl PartialEq for SourceContext {
    /// Equal when every field is equal, regardless of node identity.
    fn eq(&self, other: &Self) -> bool {
        return self.same_node(other) || self.0 == other.0;
    }
}

impl Eq for SourceContext {}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SourceContext {
        SourceContext::for_element(SymbolId(7))
    }

    #[test]
    fn empty_is_shared() {
        assert!(SourceContext::empty().same_node(&SourceContext::empty()));
        assert_eq!(SourceContext::empty().subject(), None);
        assert_eq!(SourceContext::empty().param_position(), None);
    }

    #[test]
    fn entering_a_tag_clears_the_others() {
        let param = ctx().in_param_tag(1);
        assert_eq!(param.param_position(), Some(1));
        let ret = param.in_return_tag();
        assert!(ret.is_return_tag());
        assert_eq!(ret.param_position(), None);
        let throws = ret.in_throws_tag(TypeRef::Unresolved("IOException".to_string()));
        assert!(!throws.is_return_tag());
        assert!(throws.throws_type().is_some());
        let block = throws.in_block_tag();
        assert!(block.is_block_tag());
        assert_eq!(block.throws_type(), None);
        let summary = block.in_summary_tag();
        assert!(summary.is_summary_tag() && !summary.is_block_tag());
        let element = summary.in_element();
        assert_eq!(element.scope(), &TagScope::None);
        assert_eq!(element.subject(), Some(SymbolId(7)));
    }

    #[test]
    fn first_sentence_is_orthogonal() {
        let first = ctx().in_first_sentence();
        assert!(first.in_return_tag().is_first_sentence());
        assert!(first.in_param_tag(0).in_element().is_first_sentence());
        assert!(!ctx().in_return_tag().is_first_sentence());
    }

    #[test]
    fn satisfied_derivations_return_the_receiver() {
        let ret = ctx().in_return_tag();
        assert!(ret.in_return_tag().same_node(&ret));
        let p = ctx().in_param_tag(2);
        assert!(p.in_param_tag(2).same_node(&p));
        assert!(!p.in_param_tag(3).same_node(&p));
        let el = ctx();
        assert!(el.in_element().same_node(&el));
        let fs = el.in_first_sentence();
        assert!(fs.in_first_sentence().same_node(&fs));
    }

    #[test]
    fn block_tag_needs_no_subject() {
        assert!(SourceContext::empty().in_block_tag().is_block_tag());
    }

    #[test]
    #[should_panic(expected = "without a subject element")]
    fn return_tag_without_subject_panics() {
        let _ = SourceContext::empty().in_return_tag();
    }

    #[test]
    #[should_panic(expected = "without a subject element")]
    fn param_tag_without_subject_panics() {
        let _ = SourceContext::empty().in_param_tag(0);
    }

    #[test]
    fn rehoming_keeps_tag_state() {
        let moved = ctx().in_param_tag(1).in_first_sentence().rehomed(SymbolId(9));
        assert_eq!(moved.subject(), Some(SymbolId(9)));
        assert_eq!(moved.param_position(), Some(1));
        assert!(moved.is_first_sentence());
    }
}
