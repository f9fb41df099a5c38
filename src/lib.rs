//! Context-propagating cross-reference rendering for symbol-graph
//! documentation.
//!
//! A reference such as `java.util.List#add(int, Object)` is parsed by
//! [`signature`], resolved against a [`symbols::SymbolTable`] by
//! [`resolver`], and written by [`render`] under an
//! [`output_context::OutputContext`] (what markup is allowed, where the
//! text lands) and a [`link_detail::LinkDetail`] (how much generated
//! context to show). Documentation text is interpreted under a
//! [`source_context::SourceContext`], which tracks the element and tag
//! being read so that relative references and `{@inheritDoc}` work.

pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod doctext;
pub mod error;
pub mod escape;
pub mod link_detail;
pub mod locate;
pub mod output_context;
pub mod render;
pub mod resolver;
pub mod signature;
pub mod slice;
pub mod source_context;
pub mod symbols;
pub mod typeexpr;
pub mod types;
pub mod uri;
