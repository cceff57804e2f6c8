//! Engine and platform wrappers.
//!
//! The platform owns the engines offered nodes during the (external)
//! multi-engine selection stage; the memory-aware wrappers add the
//! hierarchy lookup kernels use to decide where operands live. The wrapper
//! construction asserts the concrete platform type, mirroring the fatal
//! `InvalidPlatform` taxonomy entry.

use std::any::Any;

use okto_graph::{Graph, MemoryHierarchy, MemoryLevel, Node};

use crate::classify::{self, EngineConfig};
use crate::error::{InvalidPlatformSnafu, Result};

/// One accelerator engine the platform can offer nodes to.
#[derive(Debug, Clone)]
pub struct Engine {
    pub name: String,
    pub config: EngineConfig,
}

impl Engine {
    pub fn new(name: impl Into<String>, config: EngineConfig) -> Self {
        Self { name: name.into(), config }
    }

    pub fn is_eligible(&self, graph: &Graph, node: &Node) -> bool {
        classify::is_eligible(graph, node, &self.config)
    }

    pub fn classify(&self, graph: &Graph, node: &Node) -> Option<classify::ShapeClass> {
        classify::classify(graph, node, &self.config)
    }
}

/// Object-safe platform abstraction so wrappers can hold any platform and
/// still assert the concrete type they require.
pub trait PlatformLike: Any {
    fn engines(&self) -> &[Engine];
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

/// The NPU platform: the accelerator engine plus whatever fallback engines
/// the surrounding compiler registers.
#[derive(Debug, Clone)]
pub struct NpuPlatform {
    engines: Vec<Engine>,
}

impl NpuPlatform {
    pub fn new(engines: Vec<Engine>) -> Self {
        Self { engines }
    }
}

impl Default for NpuPlatform {
    fn default() -> Self {
        Self::new(vec![Engine::new(crate::DEFAULT_ENGINE_NAME, EngineConfig::default())])
    }
}

impl PlatformLike for NpuPlatform {
    fn engines(&self) -> &[Engine] {
        &self.engines
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A platform with a memory hierarchy attached.
#[derive(Debug, Clone)]
pub struct MemoryPlatform {
    pub platform: NpuPlatform,
    pub hierarchy: MemoryHierarchy,
    /// Weight scratch region, when the target has one.
    pub weight_memory_level: Option<MemoryLevel>,
}

impl MemoryPlatform {
    pub fn new(
        platform: NpuPlatform,
        hierarchy: MemoryHierarchy,
        weight_memory_level: Option<MemoryLevel>,
    ) -> Self {
        Self { platform, hierarchy, weight_memory_level }
    }

    /// Memory level a kernel should address `tensor` at. A tensor already
    /// placed in the weight scratch region stays there; everything else
    /// uses its assignment or the hierarchy default.
    pub fn target_memory_level(&self, tensor: &str) -> &str {
        if let Some(weight_level) = &self.weight_memory_level {
            if self.hierarchy.level_of(tensor) == Some(weight_level.name.as_str()) {
                return &weight_level.name;
            }
        }
        self.hierarchy.level_of(tensor).unwrap_or_else(|| self.hierarchy.default_level())
    }
}

/// Memory-aware wrapper over an already constructed platform.
///
/// Construction is the type-assertion point: wrapping anything but an
/// [`NpuPlatform`] is a fatal configuration error.
#[derive(Debug)]
pub struct MemoryPlatformWrapper {
    pub inner: MemoryPlatform,
}

impl MemoryPlatformWrapper {
    pub fn wrap(
        platform: &dyn PlatformLike,
        hierarchy: MemoryHierarchy,
        weight_memory_level: Option<MemoryLevel>,
    ) -> Result<Self> {
        let Some(platform) = platform.as_any().downcast_ref::<NpuPlatform>() else {
            return InvalidPlatformSnafu {
                expected: std::any::type_name::<NpuPlatform>(),
                actual: platform.type_name(),
            }
            .fail();
        };
        Ok(Self { inner: MemoryPlatform::new(platform.clone(), hierarchy, weight_memory_level) })
    }

    pub fn target_memory_level(&self, tensor: &str) -> &str {
        self.inner.target_memory_level(tensor)
    }
}
