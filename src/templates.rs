//! Role/beat template loading
//!
//! Templates are plain markdown documents supplied by a template-
//! authoring collaborator; their content is opaque to the engine.
//! Loading happens once at startup: a missing or unreadable individual
//! document degrades (the Actor falls back per turn), but failing to
//! load *any* templates is fatal to engine construction.

use crate::error::{EngineError, EngineResult};
use std::collections::HashMap;
use std::path::Path;

/// In-memory library of role and beat documents, keyed by name
#[derive(Debug)]
pub struct TemplateLibrary {
    roles: HashMap<String, String>,
    beats: HashMap<String, String>,
}

impl TemplateLibrary {
    /// Load from a directory containing `roles/*.md` and `beats/*.md`;
    /// the file stem is the template name.
    pub fn load_dir(dir: &Path) -> EngineResult<Self> {
        let roles = load_markdown_files(&dir.join("roles"));
        let beats = load_markdown_files(&dir.join("beats"));
        if roles.is_empty() && beats.is_empty() {
            return Err(EngineError::Internal(format!(
                "no templates found under {}",
                dir.display()
            )));
        }
        tracing::info!(
            roles = roles.len(),
            beats = beats.len(),
            dir = %dir.display(),
            "Template library loaded"
        );
        Ok(Self { roles, beats })
    }

    /// Build directly from maps (tests, embedded defaults)
    pub fn from_maps(
        roles: HashMap<String, String>,
        beats: HashMap<String, String>,
    ) -> EngineResult<Self> {
        if roles.is_empty() && beats.is_empty() {
            return Err(EngineError::Internal(
                "template library would be empty".to_string(),
            ));
        }
        Ok(Self { roles, beats })
    }

    pub fn role(&self, name: &str) -> Option<&str> {
        self.roles.get(name).map(String::as_str)
    }

    pub fn beat(&self, name: &str) -> Option<&str> {
        self.beats.get(name).map(String::as_str)
    }
}

fn load_markdown_files(dir: &Path) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                out.insert(stem.to_string(), content);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable template");
            }
        }
    }
    out
}
