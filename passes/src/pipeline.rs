//! The `Pass` trait, sequential composition, and the engine's fixed
//! optimization pipeline.

use okto_graph::Graph;

use crate::error::Result;
use crate::reshape::{
    RemoveGlobalOutputReshapePass, ReshapeConstOptPass, ReshapeMergePass,
    ReshapePointwiseConvolutionPass,
};
use crate::weight_layout::AdjustWeightLayoutPass;

/// One whole-graph transformation. Exclusive access for the duration of
/// `apply`; either completes with a valid graph or fails fatally.
pub trait Pass {
    fn name(&self) -> &str;
    fn apply(&self, graph: Graph) -> Result<Graph>;
}

/// Runs an ordered list of passes, each consuming the previous result.
pub struct SequentialPass {
    name: String,
    passes: Vec<Box<dyn Pass>>,
}

impl SequentialPass {
    pub fn new(name: impl Into<String>, passes: Vec<Box<dyn Pass>>) -> Self {
        Self { name: name.into(), passes }
    }
}

impl Pass for SequentialPass {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip_all, fields(pipeline = %self.name))]
    fn apply(&self, graph: Graph) -> Result<Graph> {
        let mut graph = graph;
        for pass in &self.passes {
            tracing::debug!(pass = pass.name(), "running pass");
            graph = pass.apply(graph)?;
        }
        Ok(graph)
    }
}

/// The engine's fixed pipeline. Order matters: weights are packed first,
/// then the pointwise reshape normalization runs, then the generic reshape
/// cleanups fold what the first two passes left behind.
pub fn engine_optimization_pass(default_channels_first: bool, engine_name: &str) -> SequentialPass {
    SequentialPass::new(
        "engine_optimization",
        vec![
            Box::new(AdjustWeightLayoutPass::new(default_channels_first, engine_name)),
            Box::new(ReshapePointwiseConvolutionPass::new(default_channels_first, engine_name)),
            Box::new(ReshapeMergePass),
            Box::new(ReshapeConstOptPass),
            Box::new(RemoveGlobalOutputReshapePass),
        ],
    )
}
