//! Project manifests
//!
//! A manifest is a serialized [`Project`]. Besides the typed collections
//! (`dirs`, `actions`, `reg_values`, ...) it may carry an `items` list of
//! tagged entities, classified by their `kind` field:
//!
//! ```yaml
//! name: MyApp
//! version: 1.2.0.0
//! guid: 6fe30b47-2577-43ad-9095-1861ba25889b
//! items:
//!   - kind: dir
//!     name: '%ProgramFiles%\My Company\My App'
//!     files:
//!       - name: MyApp.exe
//!   - kind: registry
//!     root: HKLM
//!     key: Software\My Company\My App
//!     name: Installed
//!     value: '1'
//! ```

use crate::error::{CompileError, Result};
use crate::model::{Entity, Project};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(flatten)]
    project: Project,

    #[serde(default)]
    items: Vec<serde_json::Value>,
}

impl Manifest {
    fn into_project(self) -> Result<Project> {
        let mut project = self.project;
        for item in self.items {
            project.add(classify(item)?);
        }
        Ok(project)
    }
}

fn classify(mut item: serde_json::Value) -> Result<Entity> {
    let kind = match item.as_object_mut().and_then(|map| map.remove("kind")) {
        Some(serde_json::Value::String(kind)) => kind,
        Some(other) => return Err(CompileError::UnrecognizedEntity(other.to_string())),
        None => return Err(CompileError::UnrecognizedEntity("<missing kind>".to_string())),
    };
    Entity::from_tagged(&kind, item)
}

/// Parse a YAML manifest
pub fn from_yaml(yaml: &str) -> Result<Project> {
    let manifest: Manifest = serde_yaml::from_str(yaml)?;
    manifest.into_project()
}

/// Parse a JSON manifest
pub fn from_json(json: &str) -> Result<Project> {
    let manifest: Manifest = serde_json::from_str(json)?;
    manifest.into_project()
}

/// Load a manifest, picking the format from the file extension (YAML unless
/// the file ends in `.json`)
pub fn load(path: impl AsRef<Path>) -> Result<Project> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        from_json(&content)
    } else {
        from_yaml(&content)
    }
}
