use smallvec::smallvec;

use okto_dtype::ScalarDType;
use okto_graph::{ConvAttrs, MemoryHierarchy, MemoryLevel, OpKind};
use strum::IntoEnumIterator;

use crate::bindings::{BindingKey, OperandDTypes, OperandLevels, binding_list, resolve, resolve_node};
use crate::classify::ShapeClass;
use crate::error::Error;
use crate::test::helpers::conv_graph;
use crate::WEIGHT_MEMORY_LEVEL;

fn rqnt_dtypes() -> OperandDTypes {
    OperandDTypes {
        inputs: smallvec![
            ScalarDType::Int8,
            ScalarDType::Int8,
            ScalarDType::Int32,
            ScalarDType::Int32,
        ],
        outputs: smallvec![ScalarDType::Int8],
    }
}

#[test]
fn test_registry_covers_all_conv_keys() {
    for op in [OpKind::Conv, OpKind::RequantizedConv] {
        for class in ShapeClass::iter() {
            let list = binding_list(BindingKey { op, class }).unwrap();
            // 4 generic + 4 specialized for Conv, 8 + 8 for RequantizedConv.
            let group = if op.is_requantized() { 8 } else { 4 };
            assert_eq!(list.len(), 2 * group, "{op} {class}");
        }
    }
}

#[test]
fn test_specialized_bindings_ordered_first() {
    for op in [OpKind::Conv, OpKind::RequantizedConv] {
        for class in ShapeClass::iter() {
            let list = binding_list(BindingKey { op, class }).unwrap();
            let half = list.len() / 2;
            for binding in &list[..half] {
                assert_eq!(binding.memory.inputs[1], Some(WEIGHT_MEMORY_LEVEL));
            }
            for binding in &list[half..] {
                assert!(binding.memory.inputs.iter().all(Option::is_none));
            }
        }
    }
}

#[test]
fn test_resolver_prefers_weight_memory_binding() {
    // Weight resident in the scratch region: both the specialized and the
    // generic binding type-match, the specialized one must win by order.
    let mut levels = OperandLevels::default();
    levels.inputs = smallvec![None, Some(WEIGHT_MEMORY_LEVEL.to_owned()), None, None];
    levels.outputs = smallvec![None];

    let binding = resolve(
        "conv0",
        OpKind::RequantizedConv,
        ShapeClass::Pointwise,
        &rqnt_dtypes(),
        &levels,
    )
    .unwrap();
    assert_eq!(binding.memory.inputs[1], Some(WEIGHT_MEMORY_LEVEL));
    assert_eq!(binding.tile_constraint.0, "wmem_pw_conv2d_tiles");
}

#[test]
fn test_resolver_falls_back_to_generic() {
    // No placement information at all: only the unconstrained bindings
    // match.
    let binding = resolve(
        "conv0",
        OpKind::RequantizedConv,
        ShapeClass::Pointwise,
        &rqnt_dtypes(),
        &OperandLevels::default(),
    )
    .unwrap();
    assert!(binding.memory.inputs.iter().all(Option::is_none));
    assert_eq!(binding.template.0, "npu_rqnt_pw_conv2d");
}

#[test]
fn test_resolver_exhaustion_is_fatal_and_named() {
    let mut dtypes = rqnt_dtypes();
    dtypes.inputs[0] = ScalarDType::Int16; // outside every binding's set

    let err = resolve(
        "conv0",
        OpKind::RequantizedConv,
        ShapeClass::Pointwise,
        &dtypes,
        &OperandLevels::default(),
    )
    .unwrap_err();
    match err {
        Error::NoViableBinding { node, dtypes, candidates, .. } => {
            assert_eq!(node, "conv0");
            assert_eq!(dtypes[0], ScalarDType::Int16);
            assert_eq!(candidates, 16);
        }
        other => panic!("expected NoViableBinding, got {other:?}"),
    }
}

#[test]
fn test_resolver_rejects_arity_mismatch() {
    // Plain-conv operand list against the requantized key never matches.
    let dtypes = OperandDTypes {
        inputs: smallvec![ScalarDType::Int8, ScalarDType::Int8, ScalarDType::Int32],
        outputs: smallvec![ScalarDType::Int32],
    };
    let err = resolve(
        "conv0",
        OpKind::RequantizedConv,
        ShapeClass::Pointwise,
        &dtypes,
        &OperandLevels::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::NoViableBinding { .. }));
}

#[test]
fn test_resolve_node_reads_graph_and_hierarchy() {
    let g = conv_graph(ConvAttrs::new([1, 1], 1), [16, 8, 1, 1]);
    let mut hierarchy = MemoryHierarchy::new(
        vec![MemoryLevel::new("L3", None), MemoryLevel::new(WEIGHT_MEMORY_LEVEL, Some(4 << 20))],
        "L3",
    )
    .unwrap();
    let node = &g.nodes()[0];

    // Unplaced weight: generic binding.
    let binding = resolve_node(&g, node, ShapeClass::Pointwise, &hierarchy).unwrap();
    assert!(binding.memory.inputs.iter().all(Option::is_none));

    // Weight placed in the scratch region: specialized binding.
    hierarchy.assign("w", WEIGHT_MEMORY_LEVEL).unwrap();
    let binding = resolve_node(&g, node, ShapeClass::Pointwise, &hierarchy).unwrap();
    assert_eq!(binding.memory.inputs[1], Some(WEIGHT_MEMORY_LEVEL));
}
