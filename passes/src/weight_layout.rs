//! Weight packing into the accelerator's native layout.
//!
//! Single-node pattern over `Conv|RequantizedConv` with a non-branching
//! neighborhood. Nodes another engine claimed, nodes with runtime weights,
//! and already-packed tensors pass through byte-for-byte unchanged.

use okto_dtype::ScalarDType;
use okto_engine::{WEIGHT_BITS, weight::encode};
use okto_graph::{ConstData, Graph, Node, OpKind, OpPattern, is_non_branching};

use crate::error::{MissingConvAttrsSnafu, Result, UnexpectedWeightRankSnafu};
use crate::pipeline::Pass;

pub struct AdjustWeightLayoutPass {
    default_channels_first: bool,
    engine_name: String,
    pattern: OpPattern,
}

impl AdjustWeightLayoutPass {
    pub fn new(default_channels_first: bool, engine_name: impl Into<String>) -> Self {
        Self {
            default_channels_first,
            engine_name: engine_name.into(),
            pattern: OpPattern::new([OpKind::Conv, OpKind::RequantizedConv]),
        }
    }
}

/// Transpose rank-4 values from channels-last (cout, kh, kw, cin) to the
/// channels-first orientation the packing transform expects.
fn to_channels_first(values: &[i32], dims: [usize; 4]) -> (Vec<i32>, [usize; 4]) {
    let [cout, kh, kw, cin] = dims;
    let mut out = vec![0i32; values.len()];
    for o in 0..cout {
        for y in 0..kh {
            for x in 0..kw {
                for c in 0..cin {
                    let src = ((o * kh + y) * kw + x) * cin + c;
                    let dst = ((o * cin + c) * kh + y) * kw + x;
                    out[dst] = values[src];
                }
            }
        }
    }
    (out, [cout, cin, kh, kw])
}

impl Pass for AdjustWeightLayoutPass {
    fn name(&self) -> &str {
        "adjust_weight_layout"
    }

    #[tracing::instrument(skip_all)]
    fn apply(&self, mut graph: Graph) -> Result<Graph> {
        for index in 0..graph.nodes().len() {
            let node = &graph.nodes()[index];
            if !self.pattern.matches(node.op) || !is_non_branching(&graph, node) {
                continue;
            }
            let claimed = node
                .attrs
                .as_ref()
                .is_some_and(|a| a.engine.as_deref() == Some(self.engine_name.as_str()));
            if !claimed {
                continue;
            }

            let node_name = node.name.clone();
            let weight_name = node.input(Node::WEIGHT_INPUT)?.to_owned();
            let weight = graph.tensor(&weight_name)?;
            if weight.layout_applied {
                continue;
            }
            let Some(data) = &weight.data else {
                // Runtime weight: leave the node for another engine.
                continue;
            };
            if weight.shape.len() != 4 {
                return UnexpectedWeightRankSnafu { tensor: weight_name, rank: weight.shape.len() }
                    .fail();
            }

            let attrs = graph.nodes()[index]
                .attrs
                .as_ref()
                .ok_or_else(|| MissingConvAttrsSnafu { node: node_name.clone() }.build())?;
            let channels_first = attrs.channels_first.unwrap_or(self.default_channels_first);
            // NOTE: the depthwise data path is selected on group == 1 here,
            // matching the shipped hardware stack even though the classifier
            // calls group != 1 depthwise. Changing this flag changes packed
            // bytes for every dense convolution.
            let depthwise = attrs.group == 1;

            let mut values = data.to_i32();
            let mut dims: [usize; 4] = {
                let s = &weight.shape;
                [s[0], s[1], s[2], s[3]]
            };
            if !channels_first {
                (values, dims) = to_channels_first(&values, dims);
            }

            let encoded = encode(&values, dims, WEIGHT_BITS, depthwise);
            tracing::debug!(
                node = node_name.as_str(),
                tensor = weight_name.as_str(),
                offset = encoded.offset,
                "weight packed"
            );

            let tensor = graph.tensor_mut(&weight_name)?;
            tensor.data = Some(ConstData::U8(encoded.data));
            tensor.dtype = ScalarDType::UInt8;
            tensor.shape = encoded.shape;
            tensor.layout_applied = true;

            let attrs = graph.nodes_mut()[index]
                .attrs
                .as_mut()
                .ok_or_else(|| MissingConvAttrsSnafu { node: node_name }.build())?;
            attrs.weight_offset = Some(encoded.offset);
        }
        Ok(graph)
    }
}
