use smallvec::SmallVec;

/// Operator kinds the backend understands.
///
/// `Reshape` exists because the pipeline's normalization passes create and
/// fold reshape nodes; its output shape lives on the output tensor, not in
/// an attribute record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::EnumString, strum::Display, strum::EnumIter)]
pub enum OpKind {
    Conv,
    RequantizedConv,
    Reshape,
}

impl OpKind {
    pub const fn is_conv(&self) -> bool {
        matches!(self, Self::Conv | Self::RequantizedConv)
    }

    pub const fn is_requantized(&self) -> bool {
        matches!(self, Self::RequantizedConv)
    }
}

/// Closed attribute record for convolution nodes.
///
/// The original graph format keeps these in a loosely typed string-keyed
/// map; a closed record gives compile-time coverage of the required fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvAttrs {
    pub kernel_shape: [usize; 2],
    pub dilations: [usize; 2],
    pub strides: [usize; 2],
    pub group: usize,
    /// Name of the accelerator engine that claimed this node, written by the
    /// upstream engine-assignment stage.
    pub engine: Option<String>,
    pub channels_first: Option<bool>,
    /// Zero-point subtracted from the weights before packing, written by the
    /// weight layout pass and compensated during requantization.
    pub weight_offset: Option<i32>,
}

impl ConvAttrs {
    pub fn new(kernel_shape: [usize; 2], group: usize) -> Self {
        Self {
            kernel_shape,
            dilations: [1, 1],
            strides: [1, 1],
            group,
            engine: None,
            channels_first: None,
            weight_offset: None,
        }
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn with_strides(mut self, strides: [usize; 2]) -> Self {
        self.strides = strides;
        self
    }

    pub fn with_dilations(mut self, dilations: [usize; 2]) -> Self {
        self.dilations = dilations;
        self
    }
}

/// An operator node. Inputs and outputs reference tensors by name; the
/// graph owns the tensors themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub op: OpKind,
    /// Present exactly on convolution kinds.
    pub attrs: Option<ConvAttrs>,
    pub inputs: SmallVec<[String; 4]>,
    pub outputs: SmallVec<[String; 1]>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        op: OpKind,
        inputs: impl IntoIterator<Item = String>,
        outputs: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            op,
            attrs: None,
            inputs: inputs.into_iter().collect(),
            outputs: outputs.into_iter().collect(),
        }
    }

    pub fn with_attrs(mut self, attrs: ConvAttrs) -> Self {
        self.attrs = Some(attrs);
        self
    }

    /// Weight operand position for convolution nodes.
    pub const WEIGHT_INPUT: usize = 1;

    pub fn input(&self, position: usize) -> crate::Result<&str> {
        self.inputs.get(position).map(String::as_str).ok_or_else(|| crate::Error::MissingOperand {
            node: self.name.clone(),
            position,
        })
    }
}
