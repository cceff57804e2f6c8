//! Shape-class predicates and engine eligibility.
//!
//! All predicates are pure functions over the graph snapshot: no side
//! effects, no mutation. The kernel-shape/group split makes the three
//! classes pairwise exclusive by construction.

use snafu::ensure;

use okto_graph::{ConvAttrs, Graph, Node};

use crate::error::{ClassificationMismatchSnafu, NonConstantWeightSnafu, Result};

/// Construction-time feature flags of the engine.
///
/// Both default to off: the 3x3 data paths have hardware caveats, so the
/// conservative default accepts pointwise convolutions only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    pub enable_3x3: bool,
    pub enable_strides: bool,
}

/// The accelerator's closed set of supported convolution shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::Display)]
pub enum ShapeClass {
    Pointwise,
    Depthwise,
    Dense,
}

/// Common gate for every class: a convolution op kind whose weight operand
/// (input position 1) is a compile-time constant. Accelerators require
/// static weights; a runtime weight disqualifies the node from every class
/// regardless of shape.
fn conv_attrs<'a>(graph: &Graph, node: &'a Node) -> Option<&'a ConvAttrs> {
    if !node.op.is_conv() {
        return None;
    }
    let weight = node.inputs.get(Node::WEIGHT_INPUT)?;
    let constant = graph.tensor(weight).map(|t| t.is_constant()).unwrap_or(false);
    if !constant {
        return None;
    }
    node.attrs.as_ref()
}

fn strides_ok(attrs: &ConvAttrs, config: &EngineConfig) -> bool {
    attrs.strides == [1, 1] || config.enable_strides
}

pub fn is_pointwise(graph: &Graph, node: &Node, config: &EngineConfig) -> bool {
    conv_attrs(graph, node).is_some_and(|attrs| {
        attrs.kernel_shape == [1, 1] && attrs.dilations == [1, 1] && strides_ok(attrs, config)
    })
}

pub fn is_dense(graph: &Graph, node: &Node, config: &EngineConfig) -> bool {
    conv_attrs(graph, node).is_some_and(|attrs| {
        attrs.kernel_shape == [3, 3]
            && attrs.dilations == [1, 1]
            && attrs.group == 1
            && strides_ok(attrs, config)
    })
}

pub fn is_depthwise(graph: &Graph, node: &Node, config: &EngineConfig) -> bool {
    conv_attrs(graph, node).is_some_and(|attrs| {
        attrs.kernel_shape == [3, 3]
            && attrs.dilations == [1, 1]
            && attrs.group != 1
            && strides_ok(attrs, config)
    })
}

/// Partition a node into its shape class, if any. At most one class can
/// match: pointwise is separated by kernel shape, depthwise and dense by
/// the group count.
pub fn classify(graph: &Graph, node: &Node, config: &EngineConfig) -> Option<ShapeClass> {
    if is_pointwise(graph, node, config) {
        Some(ShapeClass::Pointwise)
    } else if is_depthwise(graph, node, config) {
        Some(ShapeClass::Depthwise)
    } else if is_dense(graph, node, config) {
        Some(ShapeClass::Dense)
    } else {
        None
    }
}

/// Classify a node the engine was offered, or say why this engine refuses
/// it. Both refusals are recoverable: the caller offers the node to the
/// next candidate engine.
pub fn try_classify(graph: &Graph, node: &Node, config: &EngineConfig) -> Result<ShapeClass> {
    if node.op.is_conv() {
        let constant = node
            .inputs
            .get(Node::WEIGHT_INPUT)
            .and_then(|w| graph.tensor(w).ok())
            .is_some_and(|t| t.is_constant());
        ensure!(constant, NonConstantWeightSnafu { node: node.name.clone() });
    }
    classify(graph, node, config)
        .ok_or_else(|| ClassificationMismatchSnafu { node: node.name.clone() }.build())
}

/// Whether this engine can execute `node` at all under `config`.
pub fn is_eligible(graph: &Graph, node: &Node, config: &EngineConfig) -> bool {
    if config.enable_3x3 {
        is_pointwise(graph, node, config)
            || is_depthwise(graph, node, config)
            || is_dense(graph, node, config)
    } else {
        is_pointwise(graph, node, config)
    }
}
