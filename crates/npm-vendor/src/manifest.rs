use crate::error::ManifestError;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE_NAME: &str = "package.json";

// The vendored CLI only needs the Python builder and its own runtime surface.
pub const DEFAULT_ALLOWED_DEPENDENCIES: &[&str] = &[
    "@vercel/build-utils",
    "@vercel/detect-agent",
    "@vercel/python",
];

const STRIPPED_KEYS: &[&str] = &["devDependencies", "packageManager", "pnpm", "workspaces"];

pub type Manifest = Map<String, Value>;

/// Drop dev/monorepo metadata and keep only allow-listed `dependencies`, sorted by name.
///
/// Missing or non-object `dependencies` become an empty object. Other keys pass through.
pub fn sanitize_manifest(manifest: &Manifest, allowed: &BTreeSet<String>) -> Manifest {
    let mut out = manifest.clone();
    for key in STRIPPED_KEYS {
        out.remove(*key);
    }

    let kept: BTreeMap<String, Value> = manifest
        .get("dependencies")
        .and_then(Value::as_object)
        .map(|deps| {
            deps.iter()
                .filter(|(name, _)| allowed.contains(name.as_str()))
                .map(|(name, range)| (name.clone(), range.clone()))
                .collect()
        })
        .unwrap_or_default();
    out.insert(
        "dependencies".to_string(),
        Value::Object(kept.into_iter().collect()),
    );
    out
}

pub fn dependency_names(manifest: &Manifest) -> Vec<String> {
    let mut names: Vec<String> = manifest
        .get("dependencies")
        .and_then(Value::as_object)
        .map(|deps| deps.keys().cloned().collect())
        .unwrap_or_default();
    names.sort();
    names
}

pub fn read_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|e| ManifestError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ManifestError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

/// Write `manifest` with recursively sorted keys, two-space indent and a trailing newline.
///
/// The bytes go to a sibling `.tmp` file first and are renamed over `path`.
pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<(), ManifestError> {
    let write_err = |source: std::io::Error| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    };
    let sorted = sort_keys(&Value::Object(manifest.clone()));
    let mut out = serde_json::to_string_pretty(&sorted).map_err(|e| write_err(e.into()))?;
    out.push('\n');

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, out).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}
