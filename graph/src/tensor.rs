use okto_dtype::ScalarDType;
use smallvec::SmallVec;

/// Tensor shapes are short in this domain (rank 4 at most).
pub type Shape = SmallVec<[usize; 4]>;

/// Dense payload of a compile-time constant tensor.
///
/// Only the three payload types the accelerator path touches exist: 8-bit
/// weights/activations and 32-bit scale/bias operands. The packed weight
/// format produced by the layout transform is `U8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstData {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I32(Vec<i32>),
}

impl ConstData {
    pub fn dtype(&self) -> ScalarDType {
        match self {
            Self::I8(_) => ScalarDType::Int8,
            Self::U8(_) => ScalarDType::UInt8,
            Self::I32(_) => ScalarDType::Int32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::I8(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::I32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen every element to `i32`, the common value domain of the
    /// weight layout transform.
    pub fn to_i32(&self) -> Vec<i32> {
        match self {
            Self::I8(v) => v.iter().map(|&x| x as i32).collect(),
            Self::U8(v) => v.iter().map(|&x| x as i32).collect(),
            Self::I32(v) => v.clone(),
        }
    }
}

/// A named tensor owned by the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorHandle {
    pub name: String,
    pub dtype: ScalarDType,
    pub shape: Shape,
    /// Dense payload; `None` for variable (runtime) tensors.
    pub data: Option<ConstData>,
    /// Set once the weight layout transform has packed this tensor.
    /// An explicit marker instead of the rename-pattern trick, so repeated
    /// pipeline runs cannot re-pack.
    pub layout_applied: bool,
}

impl TensorHandle {
    /// A runtime tensor with no payload.
    pub fn variable(name: impl Into<String>, dtype: ScalarDType, shape: Shape) -> Self {
        Self { name: name.into(), dtype, shape, data: None, layout_applied: false }
    }

    /// A compile-time constant. The dtype is taken from the payload.
    pub fn constant(name: impl Into<String>, shape: Shape, data: ConstData) -> Self {
        Self { name: name.into(), dtype: data.dtype(), shape, data: Some(data), layout_applied: false }
    }

    pub fn is_constant(&self) -> bool {
        self.data.is_some()
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}
