use okto_dtype::ScalarDType;
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Node does not qualify for this accelerator. Recoverable: the caller
    /// offers the node to the next candidate engine.
    #[snafu(display("node {node} does not match any shape class of this engine"))]
    ClassificationMismatch { node: String },

    /// Weight operand is not a compile-time constant. Recoverable, same
    /// fallback as a classification mismatch.
    #[snafu(display("node {node} has a non-constant weight operand"))]
    NonConstantWeight { node: String },

    /// Node qualifies but no binding's type/memory constraints match.
    /// Fatal: aborts compilation.
    #[snafu(display(
        "no viable binding for node {node}: dtypes {dtypes:?}, memory levels {memory_levels:?}, \
         {candidates} candidates exhausted"
    ))]
    NoViableBinding {
        node: String,
        dtypes: Vec<ScalarDType>,
        memory_levels: Vec<Option<String>>,
        candidates: usize,
    },

    /// A platform wrapper was constructed around an incompatible platform
    /// instance. Fatal at construction time.
    #[snafu(display("platform is not an instance of {expected}; got {actual}"))]
    InvalidPlatform { expected: &'static str, actual: &'static str },

    /// Error from the graph layer.
    #[snafu(display("graph error: {source}"))]
    GraphError {
        #[snafu(source)]
        source: okto_graph::Error,
    },
}

impl From<okto_graph::Error> for Error {
    fn from(source: okto_graph::Error) -> Self {
        Self::GraphError { source }
    }
}
