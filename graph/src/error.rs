use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Tensor name not present in the graph.
    #[snafu(display("unknown tensor: {name}"))]
    UnknownTensor { name: String },

    /// Tensor name registered twice.
    #[snafu(display("duplicate tensor: {name}"))]
    DuplicateTensor { name: String },

    /// Node name not present in the graph.
    #[snafu(display("unknown node: {name}"))]
    UnknownNode { name: String },

    /// Node is missing an operand at the given input position.
    #[snafu(display("node {node} has no operand at input position {position}"))]
    MissingOperand { node: String, position: usize },

    /// Op pattern contains a name that is not a known op kind.
    #[snafu(display("unknown op kind in pattern: {name}"))]
    UnknownOpKind { name: String },

    /// Memory level name not present in the hierarchy.
    #[snafu(display("unknown memory level: {name}"))]
    UnknownMemoryLevel { name: String },
}
