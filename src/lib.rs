//! Inkline - GitHub-backed diagram editor engine
//!
//! The core of a cross-platform Excalidraw client for GitHub repositories:
//! file-tree browsing, dirty tracking for the open diagram, and SHA-guarded
//! saves through the Contents and Git Data APIs. The drawing canvas and all
//! dialogs live in the embedding shell; this crate owns the state and the
//! protocol.

pub mod error;
pub mod events;
pub mod models;
pub mod services;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for the embedding shell
///
/// Call once at startup. Honors `RUST_LOG`, defaulting to `inkline=debug`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
