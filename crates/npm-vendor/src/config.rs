use crate::error::ConfigError;
use crate::manifest::DEFAULT_ALLOWED_DEPENDENCIES;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "npm-vendor.toml";

pub const DEFAULT_PACKAGE: &str = "vercel";
pub const DEFAULT_VENDOR_DIR: &str = "vercel_cli/vendor";
pub const DEFAULT_KEEP_FILE: &str = ".gitkeep";
pub const DEFAULT_NPM: &str = "npm";

pub const ENV_REPO_ROOT: &str = "NPM_VENDOR_REPO_ROOT";
pub const ENV_VENDOR_DIR: &str = "NPM_VENDOR_DIR";
pub const ENV_PACKAGE: &str = "NPM_VENDOR_PACKAGE";
pub const ENV_NPM: &str = "NPM";

/// Settings for one vendored package.
///
/// Every field has a default, so an absent or partial `npm-vendor.toml` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VendorConfig {
    /// npm package name, e.g. `vercel` or `@scope/tool`.
    pub package: String,
    /// Destination directory; relative values are resolved against the repo root.
    pub vendor_dir: PathBuf,
    /// File name preserved in `vendor_dir` across updates.
    pub keep_file: String,
    /// npm executable used for view/pack/install.
    pub npm: String,
    /// Runtime dependencies retained in the vendored `package.json`.
    pub allowed_dependencies: BTreeSet<String>,
    /// Accept tarballs when the registry publishes neither `integrity` nor `shasum`.
    pub allow_missing_digest: bool,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            package: DEFAULT_PACKAGE.to_string(),
            vendor_dir: PathBuf::from(DEFAULT_VENDOR_DIR),
            keep_file: DEFAULT_KEEP_FILE.to_string(),
            npm: DEFAULT_NPM.to_string(),
            allowed_dependencies: DEFAULT_ALLOWED_DEPENDENCIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allow_missing_digest: false,
        }
    }
}

impl VendorConfig {
    /// Defaults with the destination pointed at `vendor_dir`.
    pub fn with_vendor_dir(vendor_dir: impl Into<PathBuf>) -> Self {
        Self {
            vendor_dir: vendor_dir.into(),
            ..Self::default()
        }
    }

    /// Read the TOML config.
    ///
    /// An explicit path must exist; otherwise `<repo_root>/npm-vendor.toml` is read when present
    /// and defaults are used when it is not.
    pub fn load(repo_root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => {
                if !p.is_file() {
                    return Err(ConfigError::Missing(p.to_path_buf()));
                }
                p.to_path_buf()
            }
            None => {
                let p = repo_root.join(CONFIG_FILE_NAME);
                if !p.is_file() {
                    return Ok(Self::default());
                }
                p
            }
        };
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path,
            message: e.to_string(),
        })
    }

    /// Apply `NPM_VENDOR_DIR`, `NPM_VENDOR_PACKAGE` and `NPM` overrides; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(dir) = get(ENV_VENDOR_DIR) {
            self.vendor_dir = PathBuf::from(dir);
        }
        if let Some(package) = get(ENV_PACKAGE) {
            self.package = package;
        }
        if let Some(npm) = get(ENV_NPM) {
            self.npm = npm;
        }
    }

    /// Make `vendor_dir` absolute relative to `repo_root`.
    pub fn resolved_against(mut self, repo_root: &Path) -> Self {
        if self.vendor_dir.is_relative() {
            self.vendor_dir = repo_root.join(&self.vendor_dir);
        }
        self
    }
}

/// Repo root from the CLI flag, then `NPM_VENDOR_REPO_ROOT`, then `.`.
pub fn default_repo_root(flag: Option<String>) -> PathBuf {
    flag.or_else(|| std::env::var(ENV_REPO_ROOT).ok())
        .filter(|s| !s.trim().is_empty())
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
}
