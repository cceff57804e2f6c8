//! Graph rewrite passes and the fixed optimization pipeline.
//!
//! Each pass consumes and returns the whole graph; passes run strictly
//! sequentially with exclusive mutable access, and a pass either completes
//! or fails fatally. The pipeline order is load-bearing: later passes
//! assume weights are already packed and may fold away shape nodes that
//! only existed to prepare for packing.
//!
//! # Module Organization
//!
//! - [`pipeline`] - The `Pass` trait, sequential composition, and the
//!   engine's fixed pipeline
//! - [`weight_layout`] - Weight packing into the accelerator format
//! - [`reshape`] - Reshape normalization, merging, folding, and output
//!   cleanup
//! - [`error`] - Error types and result handling

pub mod error;
pub mod pipeline;
pub mod reshape;
pub mod weight_layout;


pub use error::{Error, Result};
pub use pipeline::{Pass, SequentialPass, engine_optimization_pass};
pub use reshape::{
    RemoveGlobalOutputReshapePass, ReshapeConstOptPass, ReshapeMergePass,
    ReshapePointwiseConvolutionPass,
};
pub use weight_layout::AdjustWeightLayoutPass;
