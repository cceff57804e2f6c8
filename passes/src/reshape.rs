//! Reshape normalization, merging, folding, and output cleanup.
//!
//! These passes run after weight packing and assume packed weights; they
//! fold the shape nodes earlier stages introduced.

use okto_graph::{Graph, Node, OpKind};
use smallvec::smallvec;
use snafu::ensure;

use crate::error::{ReshapeElementMismatchSnafu, Result};
use crate::pipeline::Pass;

/// Collapse the spatial dims of engine-claimed unit-stride pointwise
/// convolutions so the accelerator sees one contiguous H*W line, by
/// bracketing the node with a reshape pair. Skips strided convolutions and
/// activations that are already collapsed.
pub struct ReshapePointwiseConvolutionPass {
    default_channels_first: bool,
    engine_name: String,
}

impl ReshapePointwiseConvolutionPass {
    pub fn new(default_channels_first: bool, engine_name: impl Into<String>) -> Self {
        Self { default_channels_first, engine_name: engine_name.into() }
    }

    /// Collapsed form of a rank-4 activation shape, or `None` when the
    /// shape is already collapsed.
    fn collapse(&self, shape: &[usize], channels_first: bool) -> Option<[usize; 4]> {
        match (channels_first, shape) {
            (true, &[n, c, h, w]) if w != 1 => Some([n, c, h * w, 1]),
            (false, &[n, h, w, c]) if h != 1 => Some([n, 1, h * w, c]),
            _ => None,
        }
    }
}

impl Pass for ReshapePointwiseConvolutionPass {
    fn name(&self) -> &str {
        "reshape_pointwise_convolution"
    }

    #[tracing::instrument(skip_all)]
    fn apply(&self, mut graph: Graph) -> Result<Graph> {
        let mut index = 0;
        while index < graph.nodes().len() {
            let node = &graph.nodes()[index];
            let Some(attrs) = node.attrs.as_ref().filter(|_| node.op.is_conv()) else {
                index += 1;
                continue;
            };
            let claimed = attrs.engine.as_deref() == Some(self.engine_name.as_str());
            // Strided sampling over a flattened H*W row selects different
            // activations than strided 2D sampling, so strided convs keep
            // their spatial dims.
            if !claimed || attrs.kernel_shape != [1, 1] || attrs.strides != [1, 1] {
                index += 1;
                continue;
            }
            let channels_first = attrs.channels_first.unwrap_or(self.default_channels_first);

            let node_name = node.name.clone();
            let act_name = node.input(0)?.to_owned();
            let out_name = node.outputs[0].clone();
            let act = graph.tensor(&act_name)?;
            let out = graph.tensor(&out_name)?;
            let (Some(act_flat_shape), Some(out_flat_shape)) = (
                self.collapse(&act.shape, channels_first),
                self.collapse(&out.shape, channels_first),
            ) else {
                index += 1;
                continue;
            };

            let act_flat = format!("{node_name}_{act_name}_flat");
            let out_flat = format!("{node_name}_{out_name}_flat");
            let (act_dtype, out_dtype) = (act.dtype, out.dtype);
            graph.add_tensor(okto_graph::TensorHandle::variable(
                act_flat.clone(),
                act_dtype,
                smallvec![act_flat_shape[0], act_flat_shape[1], act_flat_shape[2], act_flat_shape[3]],
            ))?;
            graph.add_tensor(okto_graph::TensorHandle::variable(
                out_flat.clone(),
                out_dtype,
                smallvec![out_flat_shape[0], out_flat_shape[1], out_flat_shape[2], out_flat_shape[3]],
            ))?;

            let conv = &mut graph.nodes_mut()[index];
            conv.inputs[0] = act_flat.clone();
            conv.outputs[0] = out_flat.clone();

            graph.insert_node(
                index,
                Node::new(
                    format!("{node_name}_reshape_in"),
                    OpKind::Reshape,
                    [act_name],
                    [act_flat],
                ),
            );
            graph.insert_node(
                index + 2,
                Node::new(
                    format!("{node_name}_reshape_out"),
                    OpKind::Reshape,
                    [out_flat],
                    [out_name],
                ),
            );
            tracing::debug!(node = node_name.as_str(), "pointwise spatial dims collapsed");
            index += 3;
        }
        Ok(graph)
    }
}

/// Fuse `Reshape -> Reshape` chains whose intermediate tensor is
/// unbranched into a single reshape to the final shape.
pub struct ReshapeMergePass;

impl ReshapeMergePass {
    /// Find a fusable pair: producer reshape index and consumer reshape
    /// index connected by an intermediate no one else observes.
    fn find_pair(graph: &Graph) -> Option<(usize, usize)> {
        for (i, first) in graph.nodes().iter().enumerate() {
            if first.op != OpKind::Reshape {
                continue;
            }
            let mid = &first.outputs[0];
            if graph.is_output(mid) || graph.consumer_count(mid) != 1 {
                continue;
            }
            let Some((j, second)) = graph
                .nodes()
                .iter()
                .enumerate()
                .find(|(_, n)| n.inputs.iter().any(|input| input == mid))
            else {
                continue;
            };
            if second.op == OpKind::Reshape && second.inputs.first() == Some(mid) {
                return Some((i, j));
            }
        }
        None
    }
}

impl Pass for ReshapeMergePass {
    fn name(&self) -> &str {
        "reshape_merge"
    }

    #[tracing::instrument(skip_all)]
    fn apply(&self, mut graph: Graph) -> Result<Graph> {
        while let Some((first, second)) = Self::find_pair(&graph) {
            let source = graph.nodes()[first].inputs[0].clone();
            let removed = graph.nodes()[first].name.clone();
            graph.nodes_mut()[second].inputs[0] = source;
            graph.remove_node(&removed);
            graph.prune_dead_tensors();
            tracing::debug!(node = removed.as_str(), "reshape merged away");
        }
        Ok(graph)
    }
}

/// Fold a reshape of a constant into the constant itself: the payload is
/// dense and row-major, so only the recorded shape changes.
pub struct ReshapeConstOptPass;

impl Pass for ReshapeConstOptPass {
    fn name(&self) -> &str {
        "reshape_const_opt"
    }

    #[tracing::instrument(skip_all)]
    fn apply(&self, mut graph: Graph) -> Result<Graph> {
        let foldable: Vec<(String, String, String)> = graph
            .nodes()
            .iter()
            .filter(|n| n.op == OpKind::Reshape)
            .filter(|n| {
                n.inputs
                    .first()
                    .and_then(|i| graph.tensor(i).ok())
                    .is_some_and(|t| t.is_constant())
            })
            .map(|n| (n.name.clone(), n.inputs[0].clone(), n.outputs[0].clone()))
            .collect();

        for (node_name, input, output) in foldable {
            let source = graph.tensor(&input)?.clone();
            let target = graph.tensor_mut(&output)?;
            let payload = source.data.as_ref().map_or(0, |d| d.len());
            ensure!(
                payload == target.element_count(),
                ReshapeElementMismatchSnafu {
                    node: node_name.clone(),
                    payload,
                    expected: target.element_count(),
                }
            );
            target.data = source.data;
            target.dtype = source.dtype;
            target.layout_applied = source.layout_applied;
            graph.remove_node(&node_name);
            tracing::debug!(node = node_name.as_str(), "constant reshape folded");
        }
        graph.prune_dead_tensors();
        Ok(graph)
    }
}

/// Drop a redundant reshape feeding a graph output: the producer's tensor
/// becomes the output directly. Only applies when nothing else observes
/// the reshaped tensor and the element count is preserved.
pub struct RemoveGlobalOutputReshapePass;

impl Pass for RemoveGlobalOutputReshapePass {
    fn name(&self) -> &str {
        "remove_global_output_reshape"
    }

    #[tracing::instrument(skip_all)]
    fn apply(&self, mut graph: Graph) -> Result<Graph> {
        let removable: Vec<(String, String, String)> = graph
            .nodes()
            .iter()
            .filter(|n| n.op == OpKind::Reshape)
            .filter(|n| {
                let out = &n.outputs[0];
                graph.is_output(out) && graph.consumer_count(out) == 0
            })
            .filter(|n| {
                let counts = n
                    .inputs
                    .first()
                    .zip(n.outputs.first())
                    .and_then(|(i, o)| graph.tensor(i).ok().zip(graph.tensor(o).ok()));
                counts.is_some_and(|(i, o)| {
                    i.element_count() == o.element_count() && !graph.is_output(&i.name)
                })
            })
            .map(|n| (n.name.clone(), n.inputs[0].clone(), n.outputs[0].clone()))
            .collect();

        for (node_name, input, output) in removable {
            for slot in graph.outputs.iter_mut().filter(|o| **o == output) {
                *slot = input.clone();
            }
            graph.remove_node(&node_name);
            tracing::debug!(node = node_name.as_str(), "output reshape removed");
        }
        graph.prune_dead_tensors();
        Ok(graph)
    }
}
