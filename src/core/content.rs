//! JSON-backed content tables.
//!
//! The built-in document ships with the crate; hosts can layer an override
//! file on top. Lookups use dotted paths (`boss_hunt.bosses`).

use crate::core::error::Result;
use crate::core::ports::ContentLookup;
use serde_json::Value;
use std::fs;
use std::path::Path;

const DEFAULT_CONTENT: &str = include_str!("../../content/default.json");

/// Content document addressed by dotted path.
#[derive(Debug, Clone)]
pub struct ContentTable {
    root: Value,
}

impl ContentTable {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// The content bundled with the crate.
    pub fn builtin() -> Self {
        match serde_json::from_str(DEFAULT_CONTENT) {
            Ok(root) => Self { root },
            Err(err) => {
                tracing::warn!(%err, "built-in content failed to parse, starting empty");
                Self {
                    root: Value::Object(Default::default()),
                }
            }
        }
    }

    /// Built-in content with `path` merged over it, key by key.
    pub fn builtin_with_overrides(path: &Path) -> Result<Self> {
        let mut table = Self::builtin();
        let json = fs::read_to_string(path)?;
        let overrides: Value = serde_json::from_str(&json)?;
        merge(&mut table.root, overrides);
        tracing::info!(path = %path.display(), "content overrides loaded");
        Ok(table)
    }

    /// Replaces (or inserts) the value at a dotted path.
    pub fn set(&mut self, path: &str, value: Value) {
        let mut node = &mut self.root;
        let mut parts = path.split('.').peekable();
        while let Some(part) = parts.next() {
            if !node.is_object() {
                *node = Value::Object(Default::default());
            }
            let Some(map) = node.as_object_mut() else {
                return;
            };
            if parts.peek().is_none() {
                map.insert(part.to_string(), value);
                return;
            }
            node = map
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Default::default()));
        }
    }
}

impl Default for ContentTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

impl ContentLookup for ContentTable {
    fn lookup(&self, path: &str) -> Option<Value> {
        let mut node = &self.root;
        for part in path.split('.') {
            node = node.get(part)?;
        }
        Some(node.clone())
    }
}
