//! Static binding registry and the binding resolver.
//!
//! A binding is one candidate low-level kernel implementation of an
//! operator for concrete operand types and memory placement. Per
//! (op-kind, shape-class) pair the registry holds a priority-ordered list:
//! weight-memory-specialized bindings first, then the generic ones, each
//! group the cross product of the allowed 8-bit types. Tables are built
//! once at process start and are immutable afterwards.
//!
//! Resolution is a pure scan: the first binding whose type and memory
//! constraints all hold wins, so a weight already resident in the scratch
//! region always picks the specialized kernel.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use smallvec::{SmallVec, smallvec};

use okto_dtype::{ScalarDType, TypeSet};
use okto_graph::{Graph, MemoryHierarchy, Node, OpKind};
use strum::IntoEnumIterator;

use crate::WEIGHT_MEMORY_LEVEL;
use crate::classify::ShapeClass;
use crate::error::{NoViableBindingSnafu, Result};

/// C template the emission stage renders for a binding. Opaque here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelTemplate(pub &'static str);

/// Operand-ordering transformer applied before template rendering. Opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandTransformer(pub &'static str);

/// Loop-nest/tile-size constraint solver input attached to a binding.
/// Opaque: the tiling stage consumes it, this core never invokes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileConstraint(pub &'static str);

/// Acceptable primitive types per operand position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandTypeConstraint {
    pub inputs: SmallVec<[TypeSet; 4]>,
    pub outputs: SmallVec<[TypeSet; 1]>,
}

/// Required memory level per operand position; `None` means unconstrained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConstraint {
    pub inputs: SmallVec<[Option<&'static str>; 4]>,
    pub outputs: SmallVec<[Option<&'static str>; 1]>,
}

impl MemoryConstraint {
    /// No constraint at any position.
    fn unconstrained(num_inputs: usize, num_outputs: usize) -> Self {
        Self { inputs: smallvec![None; num_inputs], outputs: smallvec![None; num_outputs] }
    }

    /// Weight operand pinned to the scratch weight memory region.
    fn weight_memory(num_inputs: usize, num_outputs: usize) -> Self {
        let mut constraint = Self::unconstrained(num_inputs, num_outputs);
        constraint.inputs[Node::WEIGHT_INPUT] = Some(WEIGHT_MEMORY_LEVEL);
        constraint
    }
}

/// One candidate kernel implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub types: OperandTypeConstraint,
    pub memory: MemoryConstraint,
    pub template: KernelTemplate,
    pub transformer: OperandTransformer,
    pub tile_constraint: TileConstraint,
}

/// Registry key: one priority-ordered binding list exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingKey {
    pub op: OpKind,
    pub class: ShapeClass,
}

/// Concrete dtypes of a node's operands, in position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandDTypes {
    pub inputs: SmallVec<[ScalarDType; 4]>,
    pub outputs: SmallVec<[ScalarDType; 1]>,
}

/// Assigned memory levels of a node's operands; `None` when the placement
/// stage has not run for a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperandLevels {
    pub inputs: SmallVec<[Option<String>; 4]>,
    pub outputs: SmallVec<[Option<String>; 1]>,
}

fn template_name(op: OpKind, class: ShapeClass) -> &'static str {
    match (op, class) {
        (OpKind::Conv, ShapeClass::Pointwise) => "npu_pw_conv2d",
        (OpKind::Conv, ShapeClass::Depthwise) => "npu_dw_conv2d",
        (OpKind::Conv, ShapeClass::Dense) => "npu_dense_conv2d",
        (OpKind::RequantizedConv, ShapeClass::Pointwise) => "npu_rqnt_pw_conv2d",
        (OpKind::RequantizedConv, ShapeClass::Depthwise) => "npu_rqnt_dw_conv2d",
        (OpKind::RequantizedConv, ShapeClass::Dense) => "npu_rqnt_dense_conv2d",
        _ => unreachable!("binding tables only exist for convolution kinds"),
    }
}

fn tile_constraint_name(class: ShapeClass, weight_memory: bool) -> &'static str {
    match (class, weight_memory) {
        (ShapeClass::Pointwise, false) => "pw_conv2d_tiles",
        (ShapeClass::Pointwise, true) => "wmem_pw_conv2d_tiles",
        (ShapeClass::Depthwise, false) => "dw_conv2d_tiles",
        (ShapeClass::Depthwise, true) => "wmem_dw_conv2d_tiles",
        (ShapeClass::Dense, false) => "dense_conv2d_tiles",
        (ShapeClass::Dense, true) => "wmem_dense_conv2d_tiles",
    }
}

/// Cross product of the allowed 8-bit types for one (op, class, wmem)
/// variant, in fixed enumeration order.
fn build_group(op: OpKind, class: ShapeClass, weight_memory: bool) -> Vec<Binding> {
    const QUANT: [ScalarDType; 2] = [ScalarDType::UInt8, ScalarDType::Int8];
    let int32: TypeSet = TypeSet::only(ScalarDType::Int32);

    let template = KernelTemplate(template_name(op, class));
    let transformer = OperandTransformer("cluster");
    let tile_constraint = TileConstraint(tile_constraint_name(class, weight_memory));

    let mut bindings = Vec::new();
    match op {
        // Requantized form: [act, weight, mul, add] -> [out], out is 8-bit.
        OpKind::RequantizedConv => {
            for data_in in QUANT {
                for data_out in QUANT {
                    for weight in QUANT {
                        let types = OperandTypeConstraint {
                            inputs: smallvec![
                                TypeSet::only(data_in),
                                TypeSet::only(weight),
                                int32,
                                int32,
                            ],
                            outputs: smallvec![TypeSet::only(data_out)],
                        };
                        let memory = if weight_memory {
                            MemoryConstraint::weight_memory(4, 1)
                        } else {
                            MemoryConstraint::unconstrained(4, 1)
                        };
                        bindings.push(Binding { types, memory, template, transformer, tile_constraint });
                    }
                }
            }
        }
        // Plain form: [act, weight, bias] -> [out], out accumulates in int32.
        OpKind::Conv => {
            for data_in in QUANT {
                for weight in QUANT {
                    let types = OperandTypeConstraint {
                        inputs: smallvec![TypeSet::only(data_in), TypeSet::only(weight), int32],
                        outputs: smallvec![int32],
                    };
                    let memory = if weight_memory {
                        MemoryConstraint::weight_memory(3, 1)
                    } else {
                        MemoryConstraint::unconstrained(3, 1)
                    };
                    bindings.push(Binding { types, memory, template, transformer, tile_constraint });
                }
            }
        }
        OpKind::Reshape => unreachable!("binding tables only exist for convolution kinds"),
    }
    bindings
}

/// All binding lists, built once. Weight-memory-specialized groups are
/// concatenated in front of the generic ones; list order is the resolver's
/// sole tie-break.
static REGISTRY: Lazy<HashMap<BindingKey, Vec<Binding>>> = Lazy::new(|| {
    let mut registry = HashMap::new();
    for op in [OpKind::Conv, OpKind::RequantizedConv] {
        for class in ShapeClass::iter() {
            let mut list = build_group(op, class, true);
            list.extend(build_group(op, class, false));
            registry.insert(BindingKey { op, class }, list);
        }
    }
    registry
});

/// The priority-ordered binding list for a key, if the op kind has one.
pub fn binding_list(key: BindingKey) -> Option<&'static [Binding]> {
    REGISTRY.get(&key).map(Vec::as_slice)
}

fn position_matches(
    allowed: &TypeSet,
    required_level: Option<&'static str>,
    dtype: ScalarDType,
    level: Option<&str>,
) -> bool {
    allowed.contains(dtype) && required_level.is_none_or(|required| level == Some(required))
}

fn binding_matches(binding: &Binding, dtypes: &OperandDTypes, levels: &OperandLevels) -> bool {
    if binding.types.inputs.len() != dtypes.inputs.len()
        || binding.types.outputs.len() != dtypes.outputs.len()
    {
        return false;
    }
    let inputs_ok = binding.types.inputs.iter().zip(&binding.memory.inputs).zip(&dtypes.inputs).enumerate().all(
        |(i, ((allowed, required), &dtype))| {
            let level = levels.inputs.get(i).and_then(|l| l.as_deref());
            position_matches(allowed, *required, dtype, level)
        },
    );
    let outputs_ok = binding.types.outputs.iter().zip(&binding.memory.outputs).zip(&dtypes.outputs).enumerate().all(
        |(i, ((allowed, required), &dtype))| {
            let level = levels.outputs.get(i).and_then(|l| l.as_deref());
            position_matches(allowed, *required, dtype, level)
        },
    );
    inputs_ok && outputs_ok
}

/// Pick the kernel implementation for a classified node.
///
/// Scans the binding list for `(op, class)` in priority order and returns
/// the first binding whose every operand position type-matches and whose
/// memory requirement is unset or equal to the assigned level. Pure: the
/// caller persists the selection for the emission stage.
pub fn resolve(
    node: &str,
    op: OpKind,
    class: ShapeClass,
    dtypes: &OperandDTypes,
    levels: &OperandLevels,
) -> Result<&'static Binding> {
    let candidates = binding_list(BindingKey { op, class }).unwrap_or(&[]);
    for binding in candidates {
        if binding_matches(binding, dtypes, levels) {
            tracing::trace!(node, template = binding.template.0, "binding resolved");
            return Ok(binding);
        }
    }
    NoViableBindingSnafu {
        node,
        dtypes: dtypes.inputs.iter().chain(&dtypes.outputs).copied().collect::<Vec<_>>(),
        memory_levels: levels
            .inputs
            .iter()
            .chain(&levels.outputs)
            .cloned()
            .collect::<Vec<_>>(),
        candidates: candidates.len(),
    }
    .fail()
}

/// Resolve a node in place: operand dtypes come from the graph's tensors,
/// memory levels from the hierarchy's assignment map.
pub fn resolve_node(
    graph: &Graph,
    node: &Node,
    class: ShapeClass,
    hierarchy: &MemoryHierarchy,
) -> Result<&'static Binding> {
    let mut dtypes = OperandDTypes { inputs: SmallVec::new(), outputs: SmallVec::new() };
    let mut levels = OperandLevels::default();
    for name in &node.inputs {
        dtypes.inputs.push(graph.tensor(name)?.dtype);
        levels.inputs.push(hierarchy.level_of(name).map(str::to_owned));
    }
    for name in &node.outputs {
        dtypes.outputs.push(graph.tensor(name)?.dtype);
        levels.outputs.push(hierarchy.level_of(name).map(str::to_owned));
    }
    resolve(&node.name, node.op, class, &dtypes, &levels)
}
