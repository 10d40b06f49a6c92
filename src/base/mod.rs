//! Foundation types for the semantic model.
//!
//! This module provides the primitives used by every other layer:
//! - [`NodeId`], [`NodeIdAllocator`] - Stable identities for AST nodes
//! - [`Position`], [`Span`] - Line/column ranges
//! - [`Location`] - A span within a named source document
//!
//! This module has NO dependencies on other crate modules.

mod id;
mod position;

pub use id::{NodeId, NodeIdAllocator};
pub use position::{Location, Position, Span};
