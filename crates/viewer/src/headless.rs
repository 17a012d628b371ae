//! In-memory engine for hosts without a renderer.
//!
//! Keeps every data source's content and records each call so the host (or
//! a test) can inspect what a session did. Streaming sources enforce the
//! header-first rule the way real engines do.

use std::collections::HashSet;
use std::sync::Arc;

use foundation::MountId;
use layers::{LayerKind, LayerName};
use parking_lot::Mutex;
use serde_json::Value;
use streaming::Packet;

use crate::engine::{DataSourceHandle, Engine, EngineError, EngineFactory};
use crate::options::ViewerOptions;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Extend(String),
    AddDataSource(LayerName),
    Process { layer: LayerName, ids: Vec<String> },
    Load { layer: LayerName, location: String },
    Clear(LayerName),
    SetShow(LayerName, bool),
    Destroy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessDataSource {
    pub layer: LayerName,
    pub kind: LayerKind,
    pub show: bool,
    /// Every packet processed since the last clear, in arrival order.
    pub packets: Vec<Packet>,
    pub document: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessState {
    pub mount: MountId,
    pub options: ViewerOptions,
    /// Constructor options as the engine receives them.
    pub engine_options: Value,
    pub calls: Vec<EngineCall>,
    pub extensions: Vec<(String, Value)>,
    pub sources: Vec<HeadlessDataSource>,
    pub destroyed: bool,
}

impl HeadlessState {
    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Data source layers in the order they were added.
    pub fn source_order(&self) -> Vec<LayerName> {
        self.sources.iter().map(|s| s.layer).collect()
    }

    pub fn source(&self, layer: LayerName) -> Option<&HeadlessDataSource> {
        self.sources.iter().find(|s| s.layer == layer)
    }
}

/// What engines from one factory refuse.
#[derive(Debug, Default, Clone)]
struct Refusals {
    capabilities: HashSet<String>,
    packet_ids: HashSet<String>,
    locations: HashSet<String>,
}

pub struct HeadlessEngine {
    state: Arc<Mutex<HeadlessState>>,
    refusals: Arc<Refusals>,
}

impl HeadlessEngine {
    fn source_mut<'a>(
        state: &'a mut HeadlessState,
        handle: DataSourceHandle,
    ) -> Result<&'a mut HeadlessDataSource, EngineError> {
        if state.destroyed {
            return Err(EngineError::new("engine destroyed"));
        }
        state
            .sources
            .get_mut(handle.0 as usize)
            .ok_or_else(|| EngineError::new(format!("unknown data source {}", handle.0)))
    }
}

impl Engine for HeadlessEngine {
    fn extend(&mut self, capability: &str, params: &Value) -> Result<(), EngineError> {
        if self.refusals.capabilities.contains(capability) {
            return Err(EngineError::new(format!(
                "capability {capability} is not supported"
            )));
        }
        let mut state = self.state.lock();
        state.calls.push(EngineCall::Extend(capability.to_string()));
        state
            .extensions
            .push((capability.to_string(), params.clone()));
        Ok(())
    }

    fn add_data_source(
        &mut self,
        layer: LayerName,
        kind: LayerKind,
    ) -> Result<DataSourceHandle, EngineError> {
        let mut state = self.state.lock();
        let handle = DataSourceHandle(state.sources.len() as u64);
        state.calls.push(EngineCall::AddDataSource(layer));
        state.sources.push(HeadlessDataSource {
            layer,
            kind,
            show: true,
            packets: Vec::new(),
            document: None,
        });
        Ok(handle)
    }

    fn process(&mut self, source: DataSourceHandle, packets: &[Packet]) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let ds = Self::source_mut(&mut state, source)?;
        if let Some(p) = packets
            .iter()
            .find(|p| self.refusals.packet_ids.contains(&p.id))
        {
            return Err(EngineError::new(format!("packet {:?} refused", p.id)));
        }
        if ds.kind.requires_header()
            && ds.packets.is_empty()
            && packets.first().is_some_and(|p| !p.is_document())
        {
            return Err(EngineError::new(format!(
                "{} received content before its document header",
                ds.layer
            )));
        }
        ds.packets.extend_from_slice(packets);
        let layer = ds.layer;
        state.calls.push(EngineCall::Process {
            layer,
            ids: packets.iter().map(|p| p.id.clone()).collect(),
        });
        Ok(())
    }

    fn load(
        &mut self,
        source: DataSourceHandle,
        location: &str,
        document: &Value,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let ds = Self::source_mut(&mut state, source)?;
        if self.refusals.locations.contains(location) {
            return Err(EngineError::new(format!("document {location} refused")));
        }
        ds.document = Some(document.clone());
        let layer = ds.layer;
        state.calls.push(EngineCall::Load {
            layer,
            location: location.to_string(),
        });
        Ok(())
    }

    fn clear(&mut self, source: DataSourceHandle) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let ds = Self::source_mut(&mut state, source)?;
        ds.packets.clear();
        ds.document = None;
        let layer = ds.layer;
        state.calls.push(EngineCall::Clear(layer));
        Ok(())
    }

    fn set_show(&mut self, source: DataSourceHandle, show: bool) {
        let mut state = self.state.lock();
        let Ok(ds) = Self::source_mut(&mut state, source) else {
            return;
        };
        ds.show = show;
        let layer = ds.layer;
        state.calls.push(EngineCall::SetShow(layer, show));
    }

    fn destroy(&mut self) {
        let mut state = self.state.lock();
        if !state.destroyed {
            state.destroyed = true;
            state.calls.push(EngineCall::Destroy);
        }
    }
}

/// Builds [`HeadlessEngine`]s and keeps a handle on each for inspection.
#[derive(Default)]
pub struct HeadlessEngineFactory {
    refusals: Arc<Refusals>,
    created: Mutex<Vec<Arc<Mutex<HeadlessState>>>>,
}

impl HeadlessEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engines from this factory reject the named capability.
    pub fn without_capability(mut self, name: &str) -> Self {
        Arc::make_mut(&mut self.refusals)
            .capabilities
            .insert(name.to_string());
        self
    }

    /// Engines from this factory fail any `process` batch containing `id`.
    pub fn refusing_packet(mut self, id: &str) -> Self {
        Arc::make_mut(&mut self.refusals)
            .packet_ids
            .insert(id.to_string());
        self
    }

    /// Engines from this factory fail to `load` the document at `location`.
    pub fn refusing_location(mut self, location: &str) -> Self {
        Arc::make_mut(&mut self.refusals)
            .locations
            .insert(location.to_string());
        self
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Copy of the most recent engine state built for `mount`.
    pub fn snapshot(&self, mount: &MountId) -> Option<HeadlessState> {
        self.created
            .lock()
            .iter()
            .rev()
            .map(|state| state.lock().clone())
            .find(|state| &state.mount == mount)
    }
}

impl EngineFactory for HeadlessEngineFactory {
    fn create(
        &self,
        mount: &MountId,
        options: &ViewerOptions,
    ) -> Result<Box<dyn Engine>, EngineError> {
        let state = Arc::new(Mutex::new(HeadlessState {
            mount: mount.clone(),
            options: *options,
            engine_options: options.engine_options(),
            calls: Vec::new(),
            extensions: Vec::new(),
            sources: Vec::new(),
            destroyed: false,
        }));
        self.created.lock().push(state.clone());
        Ok(Box::new(HeadlessEngine {
            state,
            refusals: self.refusals.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streaming::DocumentHeader;

    fn engine() -> (HeadlessEngineFactory, Box<dyn Engine>) {
        let factory = HeadlessEngineFactory::new();
        let engine = factory
            .create(&MountId::from("map"), &ViewerOptions::default())
            .unwrap();
        (factory, engine)
    }

    #[test]
    fn streaming_source_requires_header_first() {
        let (factory, mut engine) = engine();
        let h = engine
            .add_data_source(LayerName::Streaming, LayerKind::StreamingDocument)
            .unwrap();

        assert!(engine.process(h, &[Packet::new("a")]).is_err());
        engine
            .process(h, &[DocumentHeader::new("s").to_packet(), Packet::new("a")])
            .unwrap();

        let state = factory.snapshot(&MountId::from("map")).unwrap();
        assert_eq!(state.source(LayerName::Streaming).unwrap().packets.len(), 2);
    }

    #[test]
    fn receives_constructor_options() {
        let (factory, _engine) = engine();
        let state = factory.snapshot(&MountId::from("map")).unwrap();
        assert_eq!(
            state.engine_options,
            serde_json::json!({"navigationHelpButton": false, "geocoder": false, "infoBox": true})
        );
    }

    #[test]
    fn refused_batch_leaves_source_untouched() {
        let factory = HeadlessEngineFactory::new().refusing_packet("bad");
        let mut engine = factory
            .create(&MountId::from("map"), &ViewerOptions::default())
            .unwrap();
        let h = engine
            .add_data_source(LayerName::Labels, LayerKind::StreamingDocument)
            .unwrap();

        let header = DocumentHeader::new("labels").to_packet();
        assert!(engine.process(h, &[header, Packet::new("bad")]).is_err());
        let state = factory.snapshot(&MountId::from("map")).unwrap();
        assert!(state.source(LayerName::Labels).unwrap().packets.is_empty());
    }

    #[test]
    fn destroyed_engine_rejects_calls() {
        let (factory, mut engine) = engine();
        let h = engine
            .add_data_source(LayerName::Boundaries, LayerKind::StaticDocument)
            .unwrap();
        engine.destroy();
        engine.destroy();

        assert!(engine.clear(h).is_err());
        let state = factory.snapshot(&MountId::from("map")).unwrap();
        assert!(state.destroyed);
        assert_eq!(
            state.calls,
            vec![EngineCall::AddDataSource(LayerName::Boundaries), EngineCall::Destroy]
        );
    }
}
