//! Weft IR node model.
//!
//! This crate defines the abstract syntax the Weft front-end passes
//! operate on, plus the two facilities every pass leans on:
//!
//! - [`span`]: byte-offset source positions and line/column lookup
//! - [`ast`]: the node kinds, with per-node identity ([`ast::NodeId`])
//!   distinct from structural equality
//! - [`walk`]: read-only traversal (id enumeration, name-use enumeration)
//! - [`refmap`]: the resolved-name map produced by name resolution and
//!   consumed by the type checker

pub mod ast;
pub mod refmap;
pub mod span;
pub mod walk;

pub use ast::NodeId;
pub use span::Span;
