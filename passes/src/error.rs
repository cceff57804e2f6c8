use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Error from the graph layer.
    #[snafu(display("graph error: {source}"))]
    GraphError {
        #[snafu(source)]
        source: okto_graph::Error,
    },

    /// A conv node matched the weight layout pattern but carries no
    /// attribute record; the graph is malformed.
    #[snafu(display("conv node {node} has no attribute record"))]
    MissingConvAttrs { node: String },

    /// Weight tensor is not the rank-4 (cout, cin, kh, kw) layout the
    /// packing transform expects.
    #[snafu(display("weight tensor {tensor} has rank {rank}, expected 4"))]
    UnexpectedWeightRank { tensor: String, rank: usize },

    /// A reshape's constant payload does not fill its output shape; the
    /// graph is malformed.
    #[snafu(display(
        "reshape {node} folds a constant of {payload} elements into a shape holding {expected}"
    ))]
    ReshapeElementMismatch { node: String, payload: usize, expected: usize },
}

impl From<okto_graph::Error> for Error {
    fn from(source: okto_graph::Error) -> Self {
        Self::GraphError { source }
    }
}
