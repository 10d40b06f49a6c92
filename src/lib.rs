//! # csdl-semantics
//!
//! Semantic resolution for CSDL entity data models: name binding across
//! schemas, inheritance and cycle detection, association and entity-set
//! linking, vocabulary annotation targets, and error collection.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! hir       → Lazily-resolved semantic model and diagnostics
//!   ↓
//! ast       → Schema AST produced by an external CSDL parser
//!   ↓
//! base      → Primitives (NodeId, Location, Span)
//! ```

// ============================================================================
// MODULES (dependency order: base → ast → hir)
// ============================================================================

/// Foundation types: NodeId, Location, Span
pub mod base;

/// Schema AST: the parser contract
pub mod ast;

/// High-level IR: the semantic model
pub mod hir;

// Re-export foundation types
pub use base::{Location, NodeId, NodeIdAllocator, Position, Span};

// Re-export the model entry points
pub use hir::{Binding, EdmError, Element, ErrorCode, ModelBuilder, SemanticModel};
