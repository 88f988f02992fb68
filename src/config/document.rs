//! Shared override document
//!
//! One JSON object on disk, with one top-level key per store. A store only
//! ever rewrites its own key; keys written by other stores or other
//! plugins are carried through untouched.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct OverrideDocument {
    path: PathBuf,
    root: Value,
}

impl OverrideDocument {
    /// Load from disk. A missing file is an empty document.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let root = read_root(&path)?.unwrap_or_else(|| Value::Object(Map::new()));
        Ok(Self { path, root })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole document, as passed to `AssetStore::load_json`
    pub fn value(&self) -> &Value {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        if let Value::Object(map) = &mut self.root {
            map.insert(key.to_string(), value);
        }
    }

    /// Replace only the given keys and write.
    ///
    /// The file is re-read first so keys another writer added since this
    /// document was loaded survive.
    pub fn save_sections(&mut self, sections: Vec<(&str, Value)>) -> Result<()> {
        if let Some(on_disk) = read_root(&self.path)? {
            self.root = on_disk;
        }
        for (key, value) in sections {
            self.set(key, value);
        }
        write_root(&self.path, &self.root)
    }
}

fn read_root(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        debug!("No override document at {:?}", path);
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read override document {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    let root: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse override document {}", path.display()))?;
    if !root.is_object() {
        bail!(
            "Override document {} must be a JSON object",
            path.display()
        );
    }
    Ok(Some(root))
}

fn write_root(path: &Path, root: &Value) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(root)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write override document {}", path.display()))?;
    info!("Saved asset overrides to {:?}", path);
    Ok(())
}
