//! Memory hierarchy levels and per-tensor assignments.
//!
//! Capacity planning and buffer placement happen elsewhere in the compiler;
//! this core only *looks up* the level a tensor was already assigned to.

use std::collections::HashMap;

use snafu::ensure;

use crate::error::{Result, UnknownMemoryLevelSnafu};

/// One level of the target's memory hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLevel {
    pub name: String,
    /// Byte capacity; `None` for the unbounded external level.
    pub size: Option<usize>,
}

impl MemoryLevel {
    pub fn new(name: impl Into<String>, size: Option<usize>) -> Self {
        Self { name: name.into(), size }
    }
}

/// The memory hierarchy plus the tensor-to-level assignment map written by
/// the (external) placement stage.
#[derive(Debug, Clone)]
pub struct MemoryHierarchy {
    levels: Vec<MemoryLevel>,
    default_level: String,
    assignments: HashMap<String, String>,
}

impl MemoryHierarchy {
    pub fn new(levels: Vec<MemoryLevel>, default_level: impl Into<String>) -> Result<Self> {
        let default_level = default_level.into();
        ensure!(
            levels.iter().any(|l| l.name == default_level),
            UnknownMemoryLevelSnafu { name: default_level }
        );
        Ok(Self { levels, default_level, assignments: HashMap::new() })
    }

    pub fn level(&self, name: &str) -> Option<&MemoryLevel> {
        self.levels.iter().find(|l| l.name == name)
    }

    pub fn default_level(&self) -> &str {
        &self.default_level
    }

    /// Record the placement of a tensor. The level must exist.
    pub fn assign(&mut self, tensor: impl Into<String>, level: &str) -> Result<()> {
        ensure!(self.level(level).is_some(), UnknownMemoryLevelSnafu { name: level });
        self.assignments.insert(tensor.into(), level.to_owned());
        Ok(())
    }

    /// The level `tensor` is currently assigned to, if the placement stage
    /// has run for it.
    pub fn level_of(&self, tensor: &str) -> Option<&str> {
        self.assignments.get(tensor).map(String::as_str)
    }
}
