//! Op-kind patterns and the non-branching neighborhood check.
//!
//! Rewrite passes match single nodes by op kind. A match is only safe to
//! rewrite locally when the node's neighborhood has no side branch that
//! would make the rewrite observable elsewhere in the graph.

use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::{Result, UnknownOpKindSnafu};
use crate::graph::Graph;
use crate::node::{Node, OpKind};

/// Alternation over op kinds, parsed from `"Conv|RequantizedConv"` style
/// strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpPattern {
    alternatives: SmallVec<[OpKind; 2]>,
}

impl OpPattern {
    pub fn new(alternatives: impl IntoIterator<Item = OpKind>) -> Self {
        Self { alternatives: alternatives.into_iter().collect() }
    }

    pub fn parse(pattern: &str) -> Result<Self> {
        let alternatives = pattern
            .split('|')
            .map(str::trim)
            .map(|name| OpKind::from_str(name).map_err(|_| UnknownOpKindSnafu { name }.build()))
            .collect::<Result<_>>()?;
        Ok(Self { alternatives })
    }

    pub fn matches(&self, op: OpKind) -> bool {
        self.alternatives.contains(&op)
    }
}

/// True when every input and output tensor of `node` is consumed by at most
/// one node. A single-node rewrite under this guard cannot be observed from
/// a side branch, so it needs no global re-analysis.
pub fn is_non_branching(graph: &Graph, node: &Node) -> bool {
    node.inputs.iter().chain(node.outputs.iter()).all(|t| graph.consumer_count(t) <= 1)
}
