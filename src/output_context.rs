//! Render-time context: where text is written and what markup it may use.
//!
//! An `OutputContext` is an immutable node. Every derivation returns either
//! the receiver itself (same allocation) when nothing would change, or a new
//! node with exactly the changed fields overridden. Ancestors are never
//! touched, so contexts may be shared freely across rendering threads.

use std::borrow::Cow;
use std::sync::Arc;

use bitflags::bitflags;
use url::Url;

use crate::escape::{Escaper, IdentityEscaper};
use crate::symbols::TypeIdentity;
use crate::types::{SymbolId, TypeRef, TypeVarId};

bitflags! {
    /// Markup that may be emitted at a point in the output.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Hyperlinks.
        const LINK = 1;
        /// Code markup.
        const CODE = 1 << 1;
        /// Inline elements (`span`, `code`, `a`).
        const INLINE = 1 << 2;
        /// Block elements (`p`, `ul`, `div`).
        const BLOCK = 1 << 3;
    }
}

/// Type variables already being expressed, innermost first.
#[derive(Debug)]
struct Accounted {
    /// Next-outer entry.
    next: Option<Arc<Accounted>>,
    /// The variable.
    var: TypeVarId,
}

/// The fields of one context node.
#[derive(Debug, Clone)]
struct Frame {
    /// Recursion guard for generic type variables.
    accounted: Option<Arc<Accounted>>,
    /// Escaper for attribute values.
    attribute_escaper: Arc<dyn Escaper>,
    /// Markup allowed here.
    capabilities: Capabilities,
    /// Escaper for character data.
    escaper: Arc<dyn Escaper>,
    /// Whether the reference being written is to a static member's container.
    is_static_reference: bool,
    /// Absolute location of the page being written.
    location: Url,
    /// Symbol whose page this is, if any.
    subject: Option<SymbolId>,
}

/// Immutable render context. Cloning shares the node.
#[derive(Debug, Clone)]
pub struct OutputContext(Arc<Frame>);

impl OutputContext {
    /// Top-level context for a page body: every capability enabled.
    pub fn for_block(location: Url, escaper: Arc<dyn Escaper>, attribute_escaper: Arc<dyn Escaper>) -> Self {
        return Self(Arc::new(Frame {
            accounted: None,
            attribute_escaper,
            capabilities: Capabilities::all(),
            escaper,
            is_static_reference: false,
            location,
            subject: None,
        }));
    }

    /// Context for plain text output: no markup, no escaping.
    pub fn plain(location: Url) -> Self {
        let identity: Arc<dyn Escaper> = Arc::new(IdentityEscaper);
        return Self(Arc::new(Frame {
            accounted: None,
            attribute_escaper: Arc::clone(&identity),
            capabilities: Capabilities::empty(),
            escaper: identity,
            is_static_reference: false,
            location,
            subject: None,
        }));
    }

    /// Copy this node, let `edit` override fields, and wrap the result.
    fn derive(&self, edit: impl FnOnce(&mut Frame)) -> Self {
        let mut frame = (*self.0).clone();
        edit(&mut frame);
        return Self(Arc::new(frame));
    }

    /// Remove `dropped` capabilities, returning `self` if none are present.
    fn without(&self, dropped: Capabilities) -> Self {
        if !self.0.capabilities.intersects(dropped) {
            return self.clone();
        }
        return self.derive(|f| f.capabilities.remove(dropped));
    }

    // ── Derivations ─────────────────────────────────────────────────

    /// Character data only: no links, no inline or block markup, and the
    /// attribute escaper unified with the main escaper.
    pub fn for_pure_character_data(&self) -> Self {
        let dropped = Capabilities::LINK | Capabilities::INLINE | Capabilities::BLOCK;
        let unified = Arc::ptr_eq(&self.0.escaper, &self.0.attribute_escaper);
        if !self.0.capabilities.intersects(dropped) && unified {
            return self.clone();
        }
        return self.derive(|f| {
            f.capabilities.remove(dropped);
            f.attribute_escaper = Arc::clone(&f.escaper);
        });
    }

    /// Mark the reference being written as one to a static member's container.
    pub fn for_static(&self) -> Self {
        if self.0.is_static_reference {
            return self.clone();
        }
        return self.derive(|f| f.is_static_reference = true);
    }

    /// Context for documenting `subject`.
    pub fn in_element(&self, subject: Option<SymbolId>) -> Self {
        if self.0.subject == subject {
            return self.clone();
        }
        return self.derive(|f| f.subject = subject);
    }

    /// Inside an attribute value: no links and no inline or block markup,
    /// and the attribute escaper becomes the main escaper. Code marking is
    /// left as it was.
    pub fn in_attribute(&self) -> Self {
        let dropped = Capabilities::LINK | Capabilities::INLINE | Capabilities::BLOCK;
        let swapped = Arc::ptr_eq(&self.0.escaper, &self.0.attribute_escaper);
        if !self.0.capabilities.intersects(dropped) && swapped {
            return self.clone();
        }
        return self.derive(|f| {
            f.capabilities.remove(dropped);
            f.escaper = Arc::clone(&f.attribute_escaper);
        });
    }

    /// Inside a hyperlink: no nested links, no blocks; inline markup stays.
    pub fn in_link(&self) -> Self {
        return self.without(Capabilities::LINK | Capabilities::BLOCK);
    }

    /// Inside code markup: code cannot be marked again.
    pub fn in_code(&self) -> Self {
        return self.without(Capabilities::CODE);
    }

    /// Inside an inline element: no blocks.
    pub fn inline(&self) -> Self {
        return self.without(Capabilities::BLOCK);
    }

    /// Record that `var` is being expressed. Returns `self` when an
    /// identical variable is already recorded.
    pub fn account_for(&self, var: TypeVarId, identity: &dyn TypeIdentity) -> Self {
        if self.is_accounted_for(var, identity) {
            return self.clone();
        }
        let next = self.0.accounted.clone();
        return self.derive(|f| f.accounted = Some(Arc::new(Accounted { next, var })));
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Whether a variable of the same type as `var` is already being expressed.
    pub fn is_accounted_for(&self, var: TypeVarId, identity: &dyn TypeIdentity) -> bool {
        let probe = TypeRef::Variable(var);
        let mut current = self.0.accounted.as_deref();
        while let Some(entry) = current {
            if identity.same_type(&TypeRef::Variable(entry.var), &probe) {
                return true;
            }
            current = entry.next.as_deref();
        }
        return false;
    }

    /// Capabilities in effect.
    pub fn capabilities(&self) -> Capabilities {
        return self.0.capabilities;
    }

    /// Whether a hyperlink may be opened here.
    pub fn can_link(&self) -> bool {
        return self.0.capabilities.contains(Capabilities::LINK);
    }

    /// Whether code markup may be opened here.
    pub fn can_mark_as_code(&self) -> bool {
        return self.0.capabilities.contains(Capabilities::CODE);
    }

    /// Whether inline elements may be opened here.
    pub fn can_mark_up_inline(&self) -> bool {
        return self.0.capabilities.contains(Capabilities::INLINE);
    }

    /// Whether block elements may be opened here.
    pub fn can_mark_up_block(&self) -> bool {
        return self.0.capabilities.contains(Capabilities::BLOCK);
    }

    /// Whether the current reference is to a static member's container.
    pub fn is_static_reference(&self) -> bool {
        return self.0.is_static_reference;
    }

    /// Absolute location of the page being written.
    pub fn location(&self) -> &Url {
        return &self.0.location;
    }

    /// Symbol being documented.
    pub fn subject(&self) -> Option<SymbolId> {
        return self.0.subject;
    }

    /// Escape character data.
    pub fn escape<'t>(&self, text: &'t str) -> Cow<'t, str> {
        return self.0.escaper.escape(text);
    }

    /// Escape an attribute value.
    pub fn escape_attribute<'t>(&self, text: &'t str) -> Cow<'t, str> {
        return self.0.attribute_escaper.escape(text);
    }

    /// `target` relative to this page, escaped for an attribute value.
    pub fn href(&self, target: &Url) -> String {
        let relative = crate::uri::relativize(&self.0.location, target);
        return self.escape_attribute(&relative).into_owned();
    }

    /// Whether `self` and `other` are the same node.
    pub fn same_node(&self, other: &Self) -> bool {
        return Arc::ptr_eq(&self.0, &other.0);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::escape::{Charset, HypertextEscaper};

    /// Identity by variable id, standing in for a real symbol table.
    struct ById;

    impl TypeIdentity for ById {
        fn same_type(&self, a: &TypeRef, b: &TypeRef) -> bool {
            a == b
        }
    }

    /// Every variable is the same type, as with aliased declaration sites.
    struct AllSame;

    impl TypeIdentity for AllSame {
        fn same_type(&self, _: &TypeRef, _: &TypeRef) -> bool {
            true
        }
    }

    fn block() -> OutputContext {
        OutputContext::for_block(
            Url::parse("file:///out/p/A.html").unwrap(),
            Arc::new(HypertextEscaper::for_cdata(Charset::Utf8)),
            Arc::new(HypertextEscaper::for_attributes(Charset::Utf8)),
        )
    }

    type Derivation = fn(&OutputContext) -> OutputContext;

    const NARROWINGS: [(&str, Derivation); 5] = [
        ("for_pure_character_data", OutputContext::for_pure_character_data),
        ("in_attribute", OutputContext::in_attribute),
        ("in_link", OutputContext::in_link),
        ("in_code", OutputContext::in_code),
        ("inline", OutputContext::inline),
    ];

    #[test]
    fn narrowing_is_idempotent_and_reference_stable() {
        for (name, f) in NARROWINGS {
            let once = f(&block());
            let twice = f(&once);
            assert!(twice.same_node(&once), "{name} allocated on a satisfied receiver");
            assert_eq!(twice.capabilities(), once.capabilities(), "{name}");
        }
    }

    #[test]
    fn derivations_never_touch_the_base() {
        let base = block();
        let link = base.in_link();
        assert!(base.can_link() && base.can_mark_up_block());
        assert!(!link.can_link() && !link.can_mark_up_block() && link.can_mark_up_inline());
        assert!(!link.same_node(&base));
    }

    #[test]
    fn attribute_context_swaps_escaper() {
        let ctx = block();
        assert_eq!(ctx.escape("\"q\""), "\"q\"");
        let attr = ctx.in_attribute();
        assert_eq!(attr.escape("\"q\""), "&quot;q&quot;");
        assert!(!attr.can_link() && !attr.can_mark_up_inline() && !attr.can_mark_up_block());
        assert!(attr.can_mark_as_code());
        assert!(!attr.in_code().in_attribute().can_mark_as_code());
    }

    #[test]
    fn pure_character_data_unifies_escapers() {
        let pure = block().for_pure_character_data();
        assert_eq!(pure.escape_attribute("\"q\""), "\"q\"");
        assert!(pure.can_mark_as_code());
        assert!(!pure.can_mark_up_inline());
    }

    #[test]
    fn plain_context_is_already_narrow() {
        let plain = OutputContext::plain(Url::parse("file:///out/").unwrap());
        for (name, f) in NARROWINGS {
            if name == "in_code" {
                continue;
            }
            assert!(f(&plain).same_node(&plain), "{name}");
        }
        assert_eq!(plain.escape("<b>"), "<b>");
    }

    #[test]
    fn element_and_static_short_circuit() {
        let ctx = block().in_element(Some(SymbolId(3)));
        assert!(ctx.in_element(Some(SymbolId(3))).same_node(&ctx));
        assert_eq!(ctx.subject(), Some(SymbolId(3)));
        let st = ctx.for_static();
        assert!(st.is_static_reference());
        assert!(st.for_static().same_node(&st));
    }

    #[test]
    fn accounting_uses_type_identity() {
        let ctx = block().account_for(TypeVarId(1), &ById);
        assert!(ctx.is_accounted_for(TypeVarId(1), &ById));
        assert!(!ctx.is_accounted_for(TypeVarId(2), &ById));
        assert!(ctx.account_for(TypeVarId(1), &ById).same_node(&ctx));
        assert!(ctx.is_accounted_for(TypeVarId(2), &AllSame));
        assert!(!block().is_accounted_for(TypeVarId(1), &AllSame));
    }

    #[test]
    fn href_is_relative_and_escaped() {
        let ctx = block();
        let target = Url::parse("file:///out/q/B.html#m(int)").unwrap();
        assert_eq!(ctx.href(&target), "../q/B.html#m(int)");
    }
}
