use std::collections::HashMap;

use snafu::ensure;

use crate::error::{DuplicateTensorSnafu, Result, UnknownTensorSnafu};
use crate::node::Node;
use crate::tensor::TensorHandle;

/// The mutable computation graph the rewrite passes operate on.
///
/// Nodes are kept in topological insertion order; tensors are owned by the
/// graph and referenced from nodes by name.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    tensors: HashMap<String, TensorHandle>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tensor(&mut self, tensor: TensorHandle) -> Result<()> {
        ensure!(!self.tensors.contains_key(&tensor.name), DuplicateTensorSnafu { name: tensor.name });
        self.tensors.insert(tensor.name.clone(), tensor);
        Ok(())
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn tensor(&self, name: &str) -> Result<&TensorHandle> {
        self.tensors.get(name).ok_or_else(|| UnknownTensorSnafu { name }.build())
    }

    pub fn tensor_mut(&mut self, name: &str) -> Result<&mut TensorHandle> {
        self.tensors.get_mut(name).ok_or_else(|| UnknownTensorSnafu { name }.build())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// Remove a node by name. Tensors are left in place; callers decide
    /// whether a tensor became dead.
    pub fn remove_node(&mut self, name: &str) {
        self.nodes.retain(|n| n.name != name);
    }

    /// Insert a node before the node at `index`, preserving topological order.
    pub fn insert_node(&mut self, index: usize, node: Node) {
        self.nodes.insert(index, node);
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// The node producing `tensor`, if any (graph inputs and constants have
    /// no producer).
    pub fn producer(&self, tensor: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.outputs.iter().any(|o| o == tensor))
    }

    /// All nodes consuming `tensor`.
    pub fn consumers(&self, tensor: &str) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.inputs.iter().any(|i| i == tensor)).collect()
    }

    pub fn consumer_count(&self, tensor: &str) -> usize {
        self.nodes.iter().filter(|n| n.inputs.iter().any(|i| i == tensor)).count()
    }

    pub fn is_output(&self, tensor: &str) -> bool {
        self.outputs.iter().any(|o| o == tensor)
    }

    /// Drop tensors no node references and that are neither graph inputs
    /// nor outputs. Called by passes after node removal.
    pub fn prune_dead_tensors(&mut self) {
        let mut live: std::collections::HashSet<&str> =
            self.inputs.iter().chain(self.outputs.iter()).map(String::as_str).collect();
        for node in &self.nodes {
            live.extend(node.inputs.iter().map(String::as_str));
            live.extend(node.outputs.iter().map(String::as_str));
        }
        let live: std::collections::HashSet<String> = live.into_iter().map(str::to_owned).collect();
        self.tensors.retain(|name, _| live.contains(name));
    }
}
