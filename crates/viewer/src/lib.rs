//! Viewer session management.
//!
//! One [`ViewerSession`] per mount id, kept in a [`SessionRegistry`]. A
//! session waits for its mount point, builds the engine instance, attaches
//! the capability set in order, then attaches the data-source layers in
//! stacking order.

pub mod capabilities;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod headless;
pub mod options;
pub mod registry;
pub mod session;

pub use capabilities::{AttachReport, Capability, CapabilityFailure, CapabilitySet};
pub use engine::{DataSourceHandle, Engine, EngineError, EngineFactory};
pub use error::SessionError;
pub use fetch::{FetchError, Fetcher, HttpFetcher, MemoryFetcher};
pub use headless::{HeadlessEngine, HeadlessEngineFactory};
pub use options::ViewerOptions;
pub use registry::SessionRegistry;
pub use session::{IngestOutcome, SessionDeps, SessionState, ViewerSession};
