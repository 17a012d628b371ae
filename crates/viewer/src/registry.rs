use std::collections::HashMap;
use std::sync::Arc;

use foundation::MountId;
use parking_lot::RwLock;
use runtime::MountLifecycle;
use tracing::{debug, info};

use crate::engine::EngineFactory;
use crate::fetch::Fetcher;
use crate::options::ViewerOptions;
use crate::session::{SessionDeps, ViewerSession};

/// Live viewer sessions, at most one per mount id.
pub struct SessionRegistry {
    deps: SessionDeps,
    sessions: RwLock<HashMap<MountId, Arc<ViewerSession>>>,
}

impl SessionRegistry {
    pub fn new(engines: Arc<dyn EngineFactory>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_deps(SessionDeps::new(engines, fetcher))
    }

    pub fn with_deps(deps: SessionDeps) -> Self {
        Self {
            deps,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the session for `id`, creating an inert one if needed.
    ///
    /// `options` only apply to a newly created session.
    pub fn get_or_create(&self, id: impl Into<MountId>, options: ViewerOptions) -> Arc<ViewerSession> {
        self.entry(id.into(), options).0
    }

    /// Like [`SessionRegistry::get_or_create`], and spawns activation against
    /// `mount` when the session was just created.
    ///
    /// Must be called from within a tokio runtime.
    pub fn get_or_activate(
        &self,
        id: impl Into<MountId>,
        options: ViewerOptions,
        mount: Arc<dyn MountLifecycle>,
    ) -> Arc<ViewerSession> {
        let (session, created) = self.entry(id.into(), options);
        if created {
            tokio::spawn(session.clone().run_activation(mount));
        }
        session
    }

    fn entry(&self, id: MountId, options: ViewerOptions) -> (Arc<ViewerSession>, bool) {
        if let Some(existing) = self.sessions.read().get(&id) {
            Self::note_ignored(existing, &options);
            return (existing.clone(), false);
        }

        let mut sessions = self.sessions.write();
        // Another caller may have inserted between the two locks.
        if let Some(existing) = sessions.get(&id) {
            Self::note_ignored(existing, &options);
            return (existing.clone(), false);
        }
        let session = Arc::new(ViewerSession::create(
            id.clone(),
            options,
            self.deps.clone(),
        ));
        sessions.insert(id.clone(), session.clone());
        info!("viewer {id} created");
        (session, true)
    }

    fn note_ignored(existing: &ViewerSession, options: &ViewerOptions) {
        if existing.options() != options {
            debug!(
                "viewer {} already exists; ignoring options {options:?}",
                existing.id()
            );
        }
    }

    pub fn get(&self, id: &MountId) -> Option<Arc<ViewerSession>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Mount ids with a live session, sorted.
    pub fn ids(&self) -> Vec<MountId> {
        let mut ids: Vec<MountId> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Disposes the session for `id` and removes it.
    ///
    /// Returns `false` if there was no such session.
    pub fn dispose(&self, id: &MountId) -> bool {
        let Some(session) = self.sessions.write().remove(id) else {
            return false;
        };
        session.dispose();
        true
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.ids())
            .finish()
    }
}
