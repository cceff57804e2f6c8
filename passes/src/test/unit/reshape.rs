use smallvec::smallvec;

use okto_dtype::ScalarDType;
use okto_graph::{ConstData, Graph, Node, OpKind, TensorHandle};

use crate::error::Error;
use crate::pipeline::Pass;
use crate::reshape::{
    RemoveGlobalOutputReshapePass, ReshapeConstOptPass, ReshapeMergePass,
    ReshapePointwiseConvolutionPass,
};
use crate::test::helpers::{ENGINE, claimed_conv_graph};

#[test]
fn test_pointwise_spatial_collapse() {
    let g = ReshapePointwiseConvolutionPass::new(true, ENGINE)
        .apply(claimed_conv_graph())
        .unwrap();

    // Bracketing reshapes inserted around the conv, in order.
    let ops: Vec<OpKind> = g.nodes().iter().map(|n| n.op).collect();
    assert_eq!(ops, vec![OpKind::Reshape, OpKind::RequantizedConv, OpKind::Reshape]);

    // (1, 8, 10, 10) -> (1, 8, 100, 1) on the conv's new activation.
    let conv = &g.nodes()[1];
    let act_flat = g.tensor(&conv.inputs[0]).unwrap();
    assert_eq!(act_flat.shape[..], [1, 8, 100, 1]);
    let out_flat = g.tensor(&conv.outputs[0]).unwrap();
    assert_eq!(out_flat.shape[..], [1, 16, 100, 1]);

    // The original boundary tensors still frame the bracket.
    assert_eq!(g.nodes()[0].inputs[0], "act");
    assert_eq!(g.nodes()[2].outputs[0], "out");
}

#[test]
fn test_pointwise_collapse_is_idempotent() {
    let pass = ReshapePointwiseConvolutionPass::new(true, ENGINE);
    let once = pass.apply(claimed_conv_graph()).unwrap();
    let node_count = once.nodes().len();
    let twice = pass.apply(once).unwrap();
    // The collapsed activation (width 1) does not match again.
    assert_eq!(twice.nodes().len(), node_count);
}

#[test]
fn test_pointwise_pass_keeps_strided_conv_spatial() {
    // A stride-2 pointwise conv samples every other row and column;
    // collapsing H*W to one line would change which activations the
    // stride selects. The node must pass through untouched.
    let mut g = claimed_conv_graph();
    g.nodes_mut()[0].attrs.as_mut().unwrap().strides = [2, 2];
    g.tensor_mut("out").unwrap().shape = smallvec![1, 16, 5, 5];

    let g = ReshapePointwiseConvolutionPass::new(true, ENGINE).apply(g).unwrap();
    assert_eq!(g.nodes().len(), 1);
    assert_eq!(g.tensor("act").unwrap().shape[..], [1, 8, 10, 10]);
}

#[test]
fn test_pointwise_pass_ignores_unclaimed_and_3x3() {
    let mut g = claimed_conv_graph();
    g.nodes_mut()[0].attrs.as_mut().unwrap().kernel_shape = [3, 3];
    let g = ReshapePointwiseConvolutionPass::new(true, ENGINE).apply(g).unwrap();
    assert_eq!(g.nodes().len(), 1);

    let mut g = claimed_conv_graph();
    g.nodes_mut()[0].attrs.as_mut().unwrap().engine = Some("other_engine".into());
    let g = ReshapePointwiseConvolutionPass::new(true, ENGINE).apply(g).unwrap();
    assert_eq!(g.nodes().len(), 1);
}

fn reshape_chain_graph() -> Graph {
    let mut g = Graph::new();
    g.add_tensor(TensorHandle::variable("a", ScalarDType::Int8, smallvec![2, 6])).unwrap();
    g.add_tensor(TensorHandle::variable("b", ScalarDType::Int8, smallvec![3, 4])).unwrap();
    g.add_tensor(TensorHandle::variable("c", ScalarDType::Int8, smallvec![12])).unwrap();
    g.add_node(Node::new("r0", OpKind::Reshape, ["a".into()], ["b".into()]));
    g.add_node(Node::new("r1", OpKind::Reshape, ["b".into()], ["c".into()]));
    g.inputs = vec!["a".into()];
    g.outputs = vec!["c".into()];
    g
}

#[test]
fn test_reshape_merge_fuses_chain() {
    let g = ReshapeMergePass.apply(reshape_chain_graph()).unwrap();
    assert_eq!(g.nodes().len(), 1);
    let merged = &g.nodes()[0];
    assert_eq!(merged.inputs[0], "a");
    assert_eq!(merged.outputs[0], "c");
    // The intermediate tensor died with the first reshape.
    assert!(g.tensor("b").is_err());
}

#[test]
fn test_reshape_merge_keeps_branched_intermediate() {
    let mut g = reshape_chain_graph();
    g.add_tensor(TensorHandle::variable("d", ScalarDType::Int8, smallvec![12])).unwrap();
    g.add_node(Node::new("side", OpKind::Reshape, ["b".into()], ["d".into()]));
    let g = ReshapeMergePass.apply(g).unwrap();
    // "b" has two consumers now; nothing may fuse.
    assert_eq!(g.nodes().len(), 3);
    assert!(g.tensor("b").is_ok());
}

#[test]
fn test_reshape_const_folding() {
    let mut g = Graph::new();
    g.add_tensor(TensorHandle::constant("w", smallvec![4, 2], ConstData::I32(vec![7; 8]))).unwrap();
    g.add_tensor(TensorHandle::variable("w_flat", ScalarDType::Int32, smallvec![8])).unwrap();
    g.add_node(Node::new("r0", OpKind::Reshape, ["w".into()], ["w_flat".into()]));
    g.outputs = vec!["w_flat".into()];

    let g = ReshapeConstOptPass.apply(g).unwrap();
    assert!(g.nodes().is_empty());
    let folded = g.tensor("w_flat").unwrap();
    assert!(folded.is_constant());
    assert_eq!(folded.shape[..], [8]);
    assert_eq!(folded.data, Some(ConstData::I32(vec![7; 8])));
}

#[test]
fn test_reshape_const_folding_rejects_element_mismatch() {
    // 8-element constant reshaped into a 7-element shape: the fold would
    // fabricate a constant whose data contradicts its shape.
    let mut g = Graph::new();
    g.add_tensor(TensorHandle::constant("w", smallvec![4, 2], ConstData::I32(vec![7; 8]))).unwrap();
    g.add_tensor(TensorHandle::variable("w_flat", ScalarDType::Int32, smallvec![7])).unwrap();
    g.add_node(Node::new("r0", OpKind::Reshape, ["w".into()], ["w_flat".into()]));
    g.outputs = vec!["w_flat".into()];

    let err = ReshapeConstOptPass.apply(g).unwrap_err();
    assert!(matches!(err, Error::ReshapeElementMismatch { payload: 8, expected: 7, .. }));
}

#[test]
fn test_remove_global_output_reshape() {
    let mut g = Graph::new();
    g.add_tensor(TensorHandle::variable("x", ScalarDType::Int8, smallvec![2, 6])).unwrap();
    g.add_tensor(TensorHandle::variable("y", ScalarDType::Int8, smallvec![12])).unwrap();
    g.add_node(Node::new("r0", OpKind::Reshape, ["x".into()], ["y".into()]));
    g.inputs = vec!["x".into()];
    g.outputs = vec!["y".into()];

    let g = RemoveGlobalOutputReshapePass.apply(g).unwrap();
    assert!(g.nodes().is_empty());
    assert_eq!(g.outputs, vec!["x".to_string()]);
    assert!(g.tensor("y").is_err());
}

#[test]
fn test_output_reshape_with_other_consumer_stays() {
    let mut g = Graph::new();
    g.add_tensor(TensorHandle::variable("x", ScalarDType::Int8, smallvec![2, 6])).unwrap();
    g.add_tensor(TensorHandle::variable("y", ScalarDType::Int8, smallvec![12])).unwrap();
    g.add_tensor(TensorHandle::variable("z", ScalarDType::Int8, smallvec![12])).unwrap();
    g.add_node(Node::new("r0", OpKind::Reshape, ["x".into()], ["y".into()]));
    g.add_node(Node::new("keep", OpKind::Reshape, ["y".into()], ["z".into()]));
    g.outputs = vec!["y".into()];

    let g = RemoveGlobalOutputReshapePass.apply(g).unwrap();
    assert_eq!(g.nodes().len(), 2);
    assert_eq!(g.outputs, vec!["y".to_string()]);
}
