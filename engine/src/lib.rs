//! Accelerator engine core for the okto backend.
//!
//! Given a quantized convolution graph, this crate decides which nodes the
//! hardware convolution accelerator can execute, picks the low-level kernel
//! implementation for each, and packs constant weight tensors into the
//! accelerator's native bit-plane layout.
//!
//! # Module Organization
//!
//! - [`classify`] - Shape-class predicates and engine eligibility
//! - [`weight`] - Bit-exact weight layout transform
//! - [`bindings`] - Static binding registry and the binding resolver
//! - [`platform`] - Engine/platform wrappers and memory-level targeting
//! - [`error`] - Error types and result handling

pub mod bindings;
pub mod classify;
pub mod error;
pub mod platform;
pub mod weight;


pub use bindings::{
    Binding, BindingKey, KernelTemplate, MemoryConstraint, OperandDTypes, OperandLevels,
    OperandTransformer, OperandTypeConstraint, TileConstraint, binding_list, resolve, resolve_node,
};
pub use classify::{
    EngineConfig, ShapeClass, classify, is_dense, is_depthwise, is_eligible, is_pointwise,
    try_classify,
};
pub use error::{Error, Result};
pub use platform::{Engine, MemoryPlatform, MemoryPlatformWrapper, NpuPlatform, PlatformLike};
pub use weight::{EncodedWeights, encode};

/// Bits of weight data the accelerator fetches per bit-plane row (3x3 path).
pub const WEIGHT_BANDWIDTH_BITS: usize = 288;

/// Input-channel subtile width for this hardware generation.
pub const CIN_SUBTILE: usize = 32;

/// Weight bit-width; the only one this hardware generation supports.
pub const WEIGHT_BITS: usize = 8;

/// Scratch region weight-memory-specialized bindings pin the weight
/// operand to.
pub const WEIGHT_MEMORY_LEVEL: &str = "WeightMemory_SRAM";

/// Engine name the upstream assignment stage writes into claimed nodes.
pub const DEFAULT_ENGINE_NAME: &str = "npu";
