use std::sync::Arc;

use foundation::MountId;
use layers::labels::{LabelGenerator, LabelRecord};
use layers::{LayerName, LayerSet};
use parking_lot::Mutex;
use runtime::{Event, EventBus, MountLifecycle};
use serde_json::Value;
use streaming::{DEFAULT_MAX_PENDING, Packet, PendingPackets, parse_packets};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::capabilities::{AttachReport, CapabilitySet};
use crate::engine::{DataSourceHandle, Engine, EngineError, EngineFactory};
use crate::error::SessionError;
use crate::fetch::Fetcher;
use crate::options::ViewerOptions;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Created; activation not started.
    Uninitialized,
    /// Waiting for the mount point.
    Pending,
    Ready,
    /// Engine construction or layer attachment failed. Terminal.
    Failed,
    Disposed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Merged into the streaming layer and forwarded to the engine.
    Applied(usize),
    /// Held until the session is ready.
    Buffered(usize),
}

/// Collaborators shared by every session of a registry.
#[derive(Clone)]
pub struct SessionDeps {
    pub engines: Arc<dyn EngineFactory>,
    pub fetcher: Arc<dyn Fetcher>,
    pub capabilities: Arc<CapabilitySet>,
    pub labels: LabelGenerator,
    pub max_pending: usize,
}

impl SessionDeps {
    pub fn new(engines: Arc<dyn EngineFactory>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            engines,
            fetcher,
            capabilities: Arc::new(CapabilitySet::standard()),
            labels: LabelGenerator::default(),
            max_pending: DEFAULT_MAX_PENDING,
        }
    }

    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = Arc::new(capabilities);
        self
    }

    pub fn with_label_generator(mut self, labels: LabelGenerator) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }
}

/// Engine data-source handles, indexed by stacking position.
#[derive(Debug, Copy, Clone)]
struct LayerHandles([DataSourceHandle; 3]);

impl LayerHandles {
    fn get(&self, name: LayerName) -> DataSourceHandle {
        self.0[name.stacking_index()]
    }
}

struct Attached {
    engine: Box<dyn Engine>,
    handles: LayerHandles,
}

struct SessionInner {
    state: SessionState,
    // Set once on activation, never replaced.
    attached: Option<Attached>,
    layers: LayerSet,
    pending: PendingPackets,
    attach_report: Option<AttachReport>,
    events: EventBus,
}

/// One engine instance with its capabilities and data-source layers.
///
/// Two-phase: [`ViewerSession::create`] returns an inert handle,
/// [`ViewerSession::activate`] waits for the mount point and builds
/// everything. State is behind a mutex that is never held across an await.
pub struct ViewerSession {
    id: MountId,
    options: ViewerOptions,
    deps: SessionDeps,
    inner: Mutex<SessionInner>,
    disposed: watch::Sender<bool>,
}

impl ViewerSession {
    pub fn create(id: MountId, options: ViewerOptions, deps: SessionDeps) -> Self {
        let (disposed, _rx) = watch::channel(false);
        let inner = SessionInner {
            state: SessionState::Uninitialized,
            attached: None,
            layers: LayerSet::new(),
            pending: PendingPackets::new(deps.max_pending),
            attach_report: None,
            events: EventBus::new(),
        };
        Self {
            id,
            options,
            deps,
            inner: Mutex::new(inner),
            disposed,
        }
    }

    pub fn id(&self) -> &MountId {
        &self.id
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Waits for `mount`, then constructs the engine, applies capabilities
    /// and attaches layers.
    ///
    /// Runs at most once per session.
    pub async fn activate(&self, mount: &dyn MountLifecycle) -> Result<(), SessionError> {
        {
            let mut inner = self.inner.lock();
            match inner.state {
                SessionState::Uninitialized => {}
                SessionState::Disposed => return Err(SessionError::Disposed),
                state => return Err(SessionError::AlreadyActivated { state }),
            }
            inner.state = SessionState::Pending;
            inner
                .events
                .emit("pending", format!("waiting for mount {}", self.id));
        }

        let mut disposed = self.disposed.subscribe();
        tokio::select! {
            biased;
            _ = wait_disposed(&mut disposed) => return Err(SessionError::Disposed),
            _ = wait_for_mount(mount) => {}
        }

        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.state != SessionState::Pending {
            return Err(SessionError::Disposed);
        }
        if let Err(err) = self.build(inner) {
            inner.state = SessionState::Failed;
            inner.events.emit("init_failed", err.to_string());
            error!("viewer {} failed to initialize: {err}", self.id);
            return Err(err);
        }
        Ok(())
    }

    /// Spawnable form of [`ViewerSession::activate`]; failures are logged.
    pub async fn run_activation(self: Arc<Self>, mount: Arc<dyn MountLifecycle>) {
        if let Err(err) = self.activate(mount.as_ref()).await {
            warn!("viewer {} did not activate: {err}", self.id);
        }
    }

    fn build(&self, inner: &mut SessionInner) -> Result<(), SessionError> {
        let mut engine = self.deps.engines.create(&self.id, &self.options)?;

        let report = self.deps.capabilities.apply(engine.as_mut());
        for failure in &report.failed {
            inner.events.emit(
                "capability_failed",
                format!("{}: {}", failure.name, failure.error),
            );
        }
        let (attached_count, failed_count) = (report.attached.len(), report.failed.len());
        inner.attach_report = Some(report);

        let handles = match attach_layers(engine.as_mut(), &mut inner.layers) {
            Ok(handles) => handles,
            Err(err) => {
                engine.destroy();
                return Err(err.into());
            }
        };
        for name in LayerName::STACKING_ORDER {
            inner.events.emit("layer_attached", name.as_str());
        }

        let mut attached = Attached { engine, handles };
        let replay = inner.pending.drain();
        if !replay.is_empty() {
            let n = replay.len();
            if let Err(err) = forward_streaming(&mut attached, &mut inner.layers, replay) {
                attached.engine.destroy();
                return Err(err);
            }
            inner
                .events
                .emit("replayed", format!("{n} buffered packets"));
            debug!("viewer {} replayed {n} buffered packets", self.id);
        }

        inner.attached = Some(attached);
        inner.state = SessionState::Ready;
        inner.events.emit("ready", self.id.as_str());
        info!(
            "viewer {} ready: {attached_count} capabilities attached, {failed_count} failed",
            self.id
        );
        Ok(())
    }

    /// Feeds packets to the streaming layer.
    ///
    /// Before the session is ready packets are buffered and replayed, in
    /// submission order, right after activation.
    pub fn ingest(&self, packets: Vec<Packet>) -> Result<IngestOutcome, SessionError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        match inner.state {
            SessionState::Uninitialized | SessionState::Pending => {
                let n = inner.pending.try_extend(packets)?;
                debug!("viewer {} buffered {n} packets", self.id);
                Ok(IngestOutcome::Buffered(n))
            }
            SessionState::Ready => {
                let attached = ready_attached(inner.state, &mut inner.attached)?;
                let n = forward_streaming(attached, &mut inner.layers, packets)?;
                Ok(IngestOutcome::Applied(n))
            }
            SessionState::Failed => Err(SessionError::NotReady {
                state: SessionState::Failed,
            }),
            SessionState::Disposed => Err(SessionError::Disposed),
        }
    }

    /// Parses a packet document (array or single packet) and ingests it.
    pub fn ingest_json(&self, text: &str) -> Result<IngestOutcome, SessionError> {
        self.ingest(parse_packets(text)?)
    }

    /// Fetches a vector boundary document and replaces the boundary layer
    /// with it. Prior content stays if the fetch or parse fails.
    pub async fn load_boundaries(&self, location: &str) -> Result<(), SessionError> {
        self.ensure_ready()?;
        let text = self.fetch(location).await?;
        let document: Value =
            serde_json::from_str(&text).map_err(|source| SessionError::InvalidDocument {
                location: location.to_string(),
                source,
            })?;

        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let attached = ready_attached(inner.state, &mut inner.attached)?;
        let handle = attached.handles.get(LayerName::Boundaries);
        attached.engine.clear(handle)?;
        if let Err(err) = attached.engine.load(handle, location, &document) {
            let previous = inner.layers.boundaries();
            if let (Some(source), Some(doc)) = (previous.source(), previous.document()) {
                let restored = attached.engine.load(handle, source, doc);
                self.note_restore(LayerName::Boundaries, restored);
            }
            return Err(err.into());
        }
        inner.layers.boundaries_mut().replace(location, document);
        inner.events.emit("boundaries_loaded", location);
        info!("viewer {} loaded boundaries from {location}", self.id);
        Ok(())
    }

    /// Fetches a label table, generates label records and replaces the label
    /// layer: header first, then one packet per record.
    ///
    /// Returns the number of labels the layer holds afterwards; records
    /// sharing a code merge into one.
    pub async fn load_labels(&self, location: &str) -> Result<usize, SessionError> {
        self.ensure_ready()?;
        let text = self.fetch(location).await?;
        let packets: Vec<Packet> = self
            .deps
            .labels
            .generate(&text)
            .iter()
            .map(LabelRecord::to_packet)
            .collect();

        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let attached = ready_attached(inner.state, &mut inner.attached)?;
        let handle = attached.handles.get(LayerName::Labels);
        let labels = inner.layers.labels_mut();

        let mut staged = labels.clone();
        let sequence = staged.replace(packets)?;
        attached.engine.clear(handle)?;
        if let Err(err) = attached.engine.process(handle, &sequence) {
            let restored = attached.engine.process(handle, &labels.snapshot());
            self.note_restore(LayerName::Labels, restored);
            return Err(err.into());
        }
        let count = staged.entities().len();
        *labels = staged;

        inner
            .events
            .emit("labels_loaded", format!("{count} labels from {location}"));
        info!("viewer {} loaded {count} labels from {location}", self.id);
        Ok(count)
    }

    /// Sets a layer's visibility. Before activation the flag is recorded and
    /// applied when the layer is attached.
    pub fn set_layer_visible(&self, name: LayerName, visible: bool) -> Result<(), SessionError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.state == SessionState::Disposed {
            return Err(SessionError::Disposed);
        }
        inner.layers.set_visible(name, visible);
        if let Some(attached) = inner.attached.as_mut() {
            attached.engine.set_show(attached.handles.get(name), visible);
        }
        Ok(())
    }

    /// Flips a layer's visibility and returns the new value.
    pub fn toggle_layer_visible(&self, name: LayerName) -> Result<bool, SessionError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.state == SessionState::Disposed {
            return Err(SessionError::Disposed);
        }
        let visible = inner.layers.toggle_visible(name);
        if let Some(attached) = inner.attached.as_mut() {
            attached.engine.set_show(attached.handles.get(name), visible);
        }
        Ok(visible)
    }

    pub fn layer_visible(&self, name: LayerName) -> bool {
        self.inner.lock().layers.visible(name)
    }

    pub fn streaming_entities(&self) -> Vec<Packet> {
        self.inner.lock().layers.streaming().entities().to_vec()
    }

    pub fn label_entities(&self) -> Vec<Packet> {
        self.inner.lock().layers.labels().entities().to_vec()
    }

    pub fn boundary_source(&self) -> Option<String> {
        self.inner
            .lock()
            .layers
            .boundaries()
            .source()
            .map(str::to_string)
    }

    pub fn boundary_document(&self) -> Option<Value> {
        self.inner.lock().layers.boundaries().document().cloned()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn attach_report(&self) -> Option<AttachReport> {
        self.inner.lock().attach_report.clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().events.events().to_vec()
    }

    /// Tears the session down: cancels in-flight loads, drops buffered
    /// packets and destroys the engine instance.
    ///
    /// Returns `false` if the session was already disposed.
    pub fn dispose(&self) -> bool {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.state == SessionState::Disposed {
            return false;
        }
        inner.state = SessionState::Disposed;
        self.disposed.send_replace(true);

        let dropped = inner.pending.drain().len();
        if let Some(attached) = inner.attached.as_mut() {
            attached.engine.destroy();
        }
        inner
            .events
            .emit("disposed", format!("{dropped} buffered packets dropped"));
        info!("viewer {} disposed", self.id);
        true
    }

    fn note_restore(&self, layer: LayerName, restored: Result<(), EngineError>) {
        match restored {
            Ok(()) => debug!("viewer {} restored {layer} after a failed load", self.id),
            Err(err) => warn!("viewer {} could not restore {layer}: {err}", self.id),
        }
    }

    fn ensure_ready(&self) -> Result<(), SessionError> {
        match self.inner.lock().state {
            SessionState::Ready => Ok(()),
            SessionState::Disposed => Err(SessionError::Disposed),
            state => Err(SessionError::NotReady { state }),
        }
    }

    async fn fetch(&self, location: &str) -> Result<String, SessionError> {
        let mut disposed = self.disposed.subscribe();
        let result = tokio::select! {
            biased;
            _ = wait_disposed(&mut disposed) => Err(SessionError::Cancelled),
            fetched = self.deps.fetcher.fetch_text(location) => fetched.map_err(SessionError::from),
        };
        if let Err(err) = &result {
            warn!("viewer {} could not fetch {location}: {err}", self.id);
        }
        result
    }
}

impl std::fmt::Debug for ViewerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerSession")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("state", &self.state())
            .finish()
    }
}

async fn wait_for_mount(mount: &dyn MountLifecycle) {
    mount.mounted().await;
    mount.flushed().await;
}

async fn wait_disposed(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|disposed| *disposed).await;
}

fn ready_attached(
    state: SessionState,
    attached: &mut Option<Attached>,
) -> Result<&mut Attached, SessionError> {
    match (state, attached.as_mut()) {
        (SessionState::Ready, Some(attached)) => Ok(attached),
        (SessionState::Disposed, _) => Err(SessionError::Disposed),
        (state, _) => Err(SessionError::NotReady { state }),
    }
}

/// Adds every layer to the engine in stacking order, then opens each
/// streaming layer with its header and applies visibility flags.
fn attach_layers(
    engine: &mut dyn Engine,
    layers: &mut LayerSet,
) -> Result<LayerHandles, EngineError> {
    let mut handles = [DataSourceHandle(0); 3];
    for name in LayerName::STACKING_ORDER {
        handles[name.stacking_index()] = engine.add_data_source(name, name.kind())?;
    }
    let handles = LayerHandles(handles);

    for name in LayerName::STACKING_ORDER {
        let handle = handles.get(name);
        if let Some(layer) = layers.stream_mut(name) {
            let header = layer.open();
            engine.process(handle, &[header])?;
        }
        engine.set_show(handle, layers.visible(name));
    }
    Ok(handles)
}

fn forward_streaming(
    attached: &mut Attached,
    layers: &mut LayerSet,
    packets: Vec<Packet>,
) -> Result<usize, SessionError> {
    let handle = attached.handles.get(LayerName::Streaming);
    attached.engine.process(handle, &packets)?;
    Ok(layers.streaming_mut().process(packets)?)
}
