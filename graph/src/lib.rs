//! Computation-graph data model for the okto backend.
//!
//! This crate defines the mutable graph the rewrite passes operate on and the
//! read-only views the classifier and resolver consume.
//!
//! # Module Organization
//!
//! - [`tensor`] - Tensor handles and constant payloads
//! - [`node`] - Operator nodes and the closed convolution attribute record
//! - [`graph`] - The graph container and its mutation API
//! - [`matcher`] - Op-kind patterns and the non-branching neighborhood check
//! - [`memory`] - Memory hierarchy and per-tensor level assignments
//! - [`error`] - Error types and result handling

pub mod error;
pub mod graph;
pub mod matcher;
pub mod memory;
pub mod node;
pub mod tensor;

#[cfg(test)]
pub mod test;

pub use error::{Error, Result};
pub use graph::Graph;
pub use matcher::{OpPattern, is_non_branching};
pub use memory::{MemoryHierarchy, MemoryLevel};
pub use node::{ConvAttrs, Node, OpKind};
pub use tensor::{ConstData, Shape, TensorHandle};

// Re-export the dtype crate for convenience.
pub use okto_dtype::{ScalarDType, TypeSet};
