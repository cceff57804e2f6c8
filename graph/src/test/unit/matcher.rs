use smallvec::smallvec;

use okto_dtype::ScalarDType;

use crate::{Error, Graph, Node, OpKind, OpPattern, TensorHandle, is_non_branching};

#[test]
fn test_pattern_parse_alternation() {
    let p = OpPattern::parse("Conv|RequantizedConv").unwrap();
    assert!(p.matches(OpKind::Conv));
    assert!(p.matches(OpKind::RequantizedConv));
    assert!(!p.matches(OpKind::Reshape));
}

#[test]
fn test_pattern_parse_unknown_op() {
    let result = OpPattern::parse("Conv|Gemm");
    assert_eq!(result, Err(Error::UnknownOpKind { name: "Gemm".into() }));
}

#[test]
fn test_non_branching_detects_side_branch() {
    let mut g = Graph::new();
    for name in ["a", "b", "c"] {
        g.add_tensor(TensorHandle::variable(name, ScalarDType::Int8, smallvec![1])).unwrap();
    }
    g.add_node(Node::new("n0", OpKind::Reshape, ["a".into()], ["b".into()]));
    g.add_node(Node::new("n1", OpKind::Reshape, ["b".into()], ["c".into()]));

    let n0 = g.nodes()[0].clone();
    assert!(is_non_branching(&g, &n0));

    // A second consumer of "a" makes n0's neighborhood branch.
    g.add_node(Node::new("side", OpKind::Reshape, ["a".into()], ["c".into()]));
    assert!(!is_non_branching(&g, &n0));
}
