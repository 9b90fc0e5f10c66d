//! The save procedure
//!
//! One invocation is: validate, fetch the current remote SHA, serialize the
//! live scene, write with the SHA as the optimistic-concurrency guard. The
//! guard SHA is always the one fetched inside the same invocation; a cached
//! SHA from an earlier save would reintroduce the lost-update window this
//! exists to close.

use crate::error::{InklineError, Result};
use crate::models::{RepoRef, Scene};
use crate::services::github_store::FileStore;

#[derive(Debug)]
pub(crate) struct SaveOutcome {
    pub new_sha: String,
}

pub(crate) async fn commit_scene(
    store: &dyn FileStore,
    repo: &RepoRef,
    path: &str,
    scene: &Scene,
    message: &str,
) -> Result<SaveOutcome> {
    let message = message.trim();
    if message.is_empty() {
        return Err(InklineError::Validation(
            "commit message must not be empty".to_string(),
        ));
    }

    let expected_sha = store.current_sha(repo, path).await?;
    let serialized = scene.to_document_json()?;

    tracing::info!(path, update = expected_sha.is_some(), "committing scene");
    let new_sha = store
        .write_file(repo, path, &serialized, message, expected_sha.as_deref())
        .await?;

    Ok(SaveOutcome { new_sha })
}
