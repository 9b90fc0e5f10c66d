//! Dirty tracking for the open diagram
//!
//! Compares the live element list against the baseline taken at load/save
//! time. The editor emits a change on every micro-edit, so comparisons are
//! debounced over a short idle window instead of run per keystroke. The set
//! is keyed by path only: saving always targets the latest revision, whatever
//! version is on screen.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::events::WorkspaceEvent;
use crate::models::Scene;

/// Idle window before a change event is compared against the baseline
pub const DEBOUNCE: Duration = Duration::from_millis(500);

struct TrackerInner {
    /// Comparison point for the currently open path
    baseline: Option<(String, String)>,
    dirty: HashSet<String>,
    /// Invalidates in-flight comparisons when the baseline moves under them
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

/// Tracks which paths differ from their last-loaded baseline
#[derive(Clone)]
pub struct ModificationTracker {
    inner: Arc<Mutex<TrackerInner>>,
    events: UnboundedSender<WorkspaceEvent>,
}

impl ModificationTracker {
    pub fn new(events: UnboundedSender<WorkspaceEvent>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackerInner {
                baseline: None,
                dirty: HashSet::new(),
                generation: 0,
                pending: None,
            })),
            events,
        }
    }

    /// Establish the comparison point after a load or save
    ///
    /// The baseline is the fingerprint of the scene the editor actually
    /// absorbed, so load-time normalization can never read as an edit.
    pub fn set_baseline(&self, path: &str, scene: &Scene) {
        let mut guard = self.inner.lock().unwrap();
        guard.generation += 1;
        if let Some(pending) = guard.pending.take() {
            pending.abort();
        }
        guard.baseline = Some((path.to_string(), scene.fingerprint()));
        tracing::debug!(path, "baseline set");
    }

    /// Record an editor change; the comparison runs after the idle window
    ///
    /// Tolerates being called before any baseline exists (no-op: dirtiness
    /// cannot be classified yet).
    pub fn record_change(&self, path: &str, elements: Vec<Value>) {
        let mut guard = self.inner.lock().unwrap();
        guard.generation += 1;
        let my_generation = guard.generation;
        if let Some(pending) = guard.pending.take() {
            pending.abort();
        }

        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        let path = path.to_string();
        guard.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE).await;

            let mut guard = inner.lock().unwrap();
            if guard.generation != my_generation {
                return;
            }
            let baseline = match &guard.baseline {
                Some((p, fingerprint)) if *p == path => fingerprint,
                _ => {
                    tracing::debug!(path = %path, "change before baseline; skipping comparison");
                    return;
                }
            };

            let differs = Value::Array(elements).to_string() != *baseline;
            let membership_changed = if differs {
                guard.dirty.insert(path.clone())
            } else {
                guard.dirty.remove(&path)
            };
            drop(guard);

            if membership_changed {
                tracing::debug!(path = %path, dirty = differs, "dirty state changed");
                let _ = events.send(WorkspaceEvent::DirtyChanged {
                    path,
                    dirty: differs,
                });
            }
        }));
    }

    pub fn is_dirty(&self, path: &str) -> bool {
        self.inner.lock().unwrap().dirty.contains(path)
    }

    pub fn dirty_paths(&self) -> Vec<String> {
        self.inner.lock().unwrap().dirty.iter().cloned().collect()
    }

    /// Drop the dirty flag without comparing (discard)
    pub fn clear(&self, path: &str) {
        let mut guard = self.inner.lock().unwrap();
        guard.generation += 1;
        if let Some(pending) = guard.pending.take() {
            pending.abort();
        }
        let removed = guard.dirty.remove(path);
        drop(guard);

        if removed {
            let _ = self.events.send(WorkspaceEvent::DirtyChanged {
                path: path.to_string(),
                dirty: false,
            });
        }
    }

    /// Rekey tracking state after the open file was renamed on the remote
    pub fn rekey(&self, old_path: &str, new_path: &str) {
        let mut guard = self.inner.lock().unwrap();
        if let Some((p, _)) = &mut guard.baseline {
            if p == old_path {
                *p = new_path.to_string();
            }
        }
        if guard.dirty.remove(old_path) {
            guard.dirty.insert(new_path.to_string());
        }
    }
}
