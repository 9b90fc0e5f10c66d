//! Diagram document models
//!
//! The on-disk representation is the Excalidraw document JSON. Its internal
//! schema belongs to the drawing library; the engine only guarantees that a
//! scene round-trips through the remote store unchanged.

use serde_json::{json, Value};

use crate::error::{InklineError, Result};

pub const DIAGRAM_EXTENSION: &str = ".excalidraw";

/// The live editor content: drawable elements plus auxiliary app state
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub elements: Vec<Value>,
    pub app_state: Value,
}

impl Scene {
    /// The scene a freshly created file starts with
    pub fn empty() -> Self {
        Self {
            elements: Vec::new(),
            app_state: json!({ "gridSize": null, "viewBackgroundColor": "#ffffff" }),
        }
    }

    /// Serialize into the durable document form
    pub fn to_document_json(&self) -> Result<String> {
        let document = json!({
            "type": "excalidraw",
            "version": 2,
            "source": "inkline",
            "elements": self.elements,
            "appState": self.app_state,
            "files": {},
        });
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Canonical serialization of the element list
    ///
    /// This is the comparison key for dirty tracking: it is derived from the
    /// parsed elements, so formatting differences in the raw file never read
    /// as user edits.
    pub fn fingerprint(&self) -> String {
        Value::Array(self.elements.clone()).to_string()
    }
}

/// Parse raw file content into a scene
///
/// Accepts a document whose `elements` is an array, or one with no `elements`
/// but an `appState` (a freshly created, still-empty file). Anything else is
/// malformed.
pub fn parse_scene(raw: &str) -> Result<Scene> {
    let parsed: Value = serde_json::from_str(raw)
        .map_err(|e| InklineError::InvalidDocument(format!("not valid JSON: {}", e)))?;

    let app_state = parsed.get("appState").cloned();
    match parsed.get("elements") {
        Some(Value::Array(elements)) => Ok(Scene {
            elements: elements.clone(),
            app_state: app_state.unwrap_or_else(|| json!({})),
        }),
        None if app_state.is_some() => Ok(Scene {
            elements: Vec::new(),
            app_state: app_state.unwrap_or_else(|| json!({})),
        }),
        _ => Err(InklineError::InvalidDocument(
            "missing or non-array elements".to_string(),
        )),
    }
}

/// The document currently loaded into the editor
///
/// Replaced, never mutated, whenever a different path or commit is opened.
/// At most one is live at a time.
#[derive(Debug, Clone)]
pub struct OpenDocument {
    pub path: String,
    /// `None` means the branch tip; `Some` pins a historical revision
    pub commit: Option<String>,
    pub scene: Scene,
}

/// Imperative accessor onto the drawing canvas
///
/// The widget owns the live scene; saves pull it at call time instead of
/// trusting any cached copy.
pub trait SceneSource: Send + Sync {
    fn current_scene(&self) -> Option<Scene>;
}

/// Whether a path is an editable diagram file
pub fn is_diagram_path(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(DIAGRAM_EXTENSION)
}

/// Append the diagram extension when missing
pub fn ensure_diagram_extension(path: &str) -> String {
    if is_diagram_path(path) {
        path.to_string()
    } else {
        format!("{}{}", path, DIAGRAM_EXTENSION)
    }
}
