//! Host UI readiness signals.
//!
//! A viewer can only be constructed once its target element is attached to
//! the page and the host has flushed its pending update cycle. The host
//! framework owns both signals; the viewer only waits on them.

use tokio::sync::watch;

use crate::future::BoxFuture;

/// The two synchronization points a viewer session waits on before it builds
/// its engine instance.
pub trait MountLifecycle: Send + Sync {
    /// Resolves once the target element is attached. One-time: stays
    /// resolved afterwards.
    fn mounted(&self) -> BoxFuture<'_, ()>;

    /// Resolves once an update cycle has flushed after mounting.
    fn flushed(&self) -> BoxFuture<'_, ()>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct GateState {
    mounted: bool,
    flushes_since_mount: u64,
}

/// Latching [`MountLifecycle`] driven by explicit host calls.
///
/// Flushes reported before `mount()` do not count: `flushed()` only resolves
/// after a flush that happened while mounted.
#[derive(Debug)]
pub struct MountGate {
    state: watch::Sender<GateState>,
}

impl MountGate {
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(GateState::default());
        Self { state }
    }

    /// Gate whose element is already attached and flushed, for hosts with no
    /// mount phase (headless use, tests).
    pub fn ready() -> Self {
        let gate = Self::new();
        gate.mount();
        gate.flush();
        gate
    }

    pub fn mount(&self) {
        self.state.send_if_modified(|s| {
            if s.mounted {
                return false;
            }
            s.mounted = true;
            true
        });
    }

    pub fn flush(&self) {
        self.state.send_if_modified(|s| {
            if !s.mounted {
                return false;
            }
            s.flushes_since_mount += 1;
            true
        });
    }

    pub fn is_mounted(&self) -> bool {
        self.state.borrow().mounted
    }

    pub fn is_flushed(&self) -> bool {
        self.state.borrow().flushes_since_mount > 0
    }
}

impl Default for MountGate {
    fn default() -> Self {
        Self::new()
    }
}

impl MountLifecycle for MountGate {
    fn mounted(&self) -> BoxFuture<'_, ()> {
        let mut rx = self.state.subscribe();
        Box::pin(async move {
            // The sender lives as long as `self`, so this only returns once
            // the predicate holds.
            let _ = rx.wait_for(|s| s.mounted).await;
        })
    }

    fn flushed(&self) -> BoxFuture<'_, ()> {
        let mut rx = self.state.subscribe();
        Box::pin(async move {
            let _ = rx.wait_for(|s| s.flushes_since_mount > 0).await;
        })
    }
}
