//! Scalar type system for the okto quantized convolution backend.
//!
//! The accelerator consumes 8-bit activations and weights and 32-bit
//! scale/bias operands; everything else in the set exists so that the
//! binding resolver can *reject* it with a useful error instead of
//! failing to express the dtype at all.

/// Scalar data types understood by the backend.
///
/// Kept deliberately small: this is the closed set of types quantized
/// convolution graphs carry, not a general numeric tower.
#[derive(Debug, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::FromRepr)]
#[derive(enumset::EnumSetType)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[enumset(repr = "u8")]
pub enum ScalarDType {
    Int8 = 0,
    UInt8 = 1,
    Int16 = 2,
    UInt16 = 3,
    Int32 = 4,
    Float32 = 5,
}

/// A set of acceptable scalar types for one operand position.
pub type TypeSet = enumset::EnumSet<ScalarDType>;

impl ScalarDType {
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::Float32 => 4,
        }
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16)
    }

    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float32)
    }

    /// C rendering used by the downstream emission stage.
    pub const fn c_style(&self) -> &'static str {
        match self {
            Self::Int8 => "int8_t",
            Self::UInt8 => "uint8_t",
            Self::Int16 => "int16_t",
            Self::UInt16 => "uint16_t",
            Self::Int32 => "int32_t",
            Self::Float32 => "float",
        }
    }
}
