//! Rendering engine boundary.
//!
//! The engine itself (camera, scene graph, picking, tiling) lives outside
//! this crate. Sessions only talk to it through these traits.

use foundation::MountId;
use layers::{LayerKind, LayerName};
use serde_json::Value;
use streaming::Packet;

use crate::options::ViewerOptions;

/// Engine-side data source, in the order it was added.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataSourceHandle(pub u64);

#[derive(Debug)]
pub struct EngineError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// One live engine instance bound to a mount point.
pub trait Engine: Send {
    /// Attaches a named interaction extension.
    fn extend(&mut self, capability: &str, params: &Value) -> Result<(), EngineError>;

    /// Adds a data source on top of those already added.
    fn add_data_source(
        &mut self,
        layer: LayerName,
        kind: LayerKind,
    ) -> Result<DataSourceHandle, EngineError>;

    /// Feeds packets, in order, to a streaming data source.
    fn process(&mut self, source: DataSourceHandle, packets: &[Packet]) -> Result<(), EngineError>;

    /// Loads a fetched document into a static data source, replacing it.
    fn load(
        &mut self,
        source: DataSourceHandle,
        location: &str,
        document: &Value,
    ) -> Result<(), EngineError>;

    fn clear(&mut self, source: DataSourceHandle) -> Result<(), EngineError>;

    fn set_show(&mut self, source: DataSourceHandle, show: bool);

    /// Releases the instance. No other call is valid afterwards.
    fn destroy(&mut self);
}

pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        mount: &MountId,
        options: &ViewerOptions,
    ) -> Result<Box<dyn Engine>, EngineError>;
}
