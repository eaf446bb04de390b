use crate::LATEST;
use crate::archive::extract_archive;
use crate::config::VendorConfig;
use crate::error::{IntegrityError, ManifestError, VendorError};
use crate::integrity::{Verification, verify_archive};
use crate::manifest::{
    MANIFEST_FILE_NAME, dependency_names, read_manifest, sanitize_manifest, write_manifest,
};
use crate::registry::{Installer, NpmCli, Registry};
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};
use walkdir::WalkDir;

const TEMP_PREFIX: &str = "npm-vendor-";
const WORK_DIR_NAME: &str = "work";

// Concrete versions and dist-tags; never option-like (`--x`) or path-like text.
fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9A-Za-z][0-9A-Za-z.+_-]*$").expect("static regex is valid"))
}

pub fn validate_version(version: &str) -> Result<(), VendorError> {
    if version_regex().is_match(version) {
        Ok(())
    } else {
        Err(VendorError::InvalidVersion(version.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Version reported by the registry, or the requested one when it reported none.
    pub version: String,
    pub verification: Verification,
    /// Dependencies kept in the vendored manifest; `None` when sanitization was skipped.
    pub kept_dependencies: Option<Vec<String>>,
}

pub struct VendorUpdater<R, I> {
    config: VendorConfig,
    registry: R,
    installer: I,
}

impl VendorUpdater<NpmCli, NpmCli> {
    pub fn with_npm(config: VendorConfig) -> Self {
        let npm = NpmCli::from_config(&config);
        Self::new(config, npm.clone(), npm)
    }
}

impl<R: Registry, I: Installer> VendorUpdater<R, I> {
    pub fn new(config: VendorConfig, registry: R, installer: I) -> Self {
        Self {
            config,
            registry,
            installer,
        }
    }

    pub fn config(&self) -> &VendorConfig {
        &self.config
    }

    pub fn vendor_dir(&self) -> &Path {
        &self.config.vendor_dir
    }

    /// Latest published version, or an empty string when the registry reported none.
    pub fn resolve_latest_version(&self) -> Result<String, VendorError> {
        let meta = self.registry.view(LATEST)?;
        Ok(meta.version.unwrap_or_default())
    }

    pub fn read_vendored_version(&self) -> Result<String, VendorError> {
        read_vendored_version(&self.config.vendor_dir)
    }

    pub fn verify_vendored_version(&self, expected: &str) -> Result<(), VendorError> {
        let found = self.read_vendored_version()?;
        if found != expected {
            return Err(VendorError::VersionMismatch {
                expected: expected.to_string(),
                found,
            });
        }
        Ok(())
    }

    /// Fetch, verify, extract, sanitize and install `version`, then replace the vendor dir.
    ///
    /// Nothing under the vendor dir changes unless every earlier step succeeded. Scratch files
    /// live in a temporary directory that is removed on return.
    pub fn update_to(&self, version: &str) -> Result<UpdateReport, VendorError> {
        validate_version(version)?;
        let spec = format!("{}@{version}", self.config.package);

        let tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(VendorError::TempDir)?;

        let metadata = self.registry.view(version)?;
        let tarball = self.registry.pack(version, tmp.path())?;

        let verification = verify_archive(
            &tarball,
            metadata.dist.integrity.as_deref(),
            metadata.dist.shasum.as_deref(),
        )?;
        match verification {
            Verification::Unverified if !self.config.allow_missing_digest => {
                return Err(IntegrityError::MissingDigest { spec }.into());
            }
            Verification::Unverified => {
                warn!(%spec, "registry published no digest; vendoring unverified tarball");
            }
            _ => info!(%spec, method = %verification, "verified npm tarball"),
        }

        let work_dir = tmp.path().join(WORK_DIR_NAME);
        let summary = extract_archive(&tarball, &work_dir)?;
        info!(
            files = summary.files,
            dirs = summary.dirs,
            skipped = summary.skipped,
            "extracted npm tarball"
        );

        let kept_dependencies = match self.sanitize_work_manifest(&work_dir) {
            Ok(names) => {
                info!("restricted dependencies to: {}", names.join(", "));
                Some(names)
            }
            Err(err) => {
                warn!(error = %err, "failed to sanitize package.json; continuing without dependency minimization");
                None
            }
        };

        self.installer.install_production(&work_dir)?;
        info!("installed production dependencies");

        replace_vendor_dir(&work_dir, &self.config.vendor_dir, &self.config.keep_file)?;
        info!(dest = %self.config.vendor_dir.display(), "replaced vendor dir");

        Ok(UpdateReport {
            version: metadata.version.unwrap_or_else(|| version.to_string()),
            verification,
            kept_dependencies,
        })
    }

    fn sanitize_work_manifest(&self, work_dir: &Path) -> Result<Vec<String>, ManifestError> {
        let path = work_dir.join(MANIFEST_FILE_NAME);
        let manifest = read_manifest(&path)?;
        let sanitized = sanitize_manifest(&manifest, &self.config.allowed_dependencies);
        write_manifest(&path, &sanitized)?;
        Ok(dependency_names(&sanitized))
    }
}

/// `version` from `<vendor_dir>/package.json`.
pub fn read_vendored_version(vendor_dir: &Path) -> Result<String, VendorError> {
    let path = vendor_dir.join(MANIFEST_FILE_NAME);
    let manifest = read_manifest(&path)?;
    match manifest.get("version") {
        Some(Value::String(v)) => Ok(v.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(VendorError::MissingVersion { path }),
    }
}

/// Empty `vendor_dir` except `keep_file`, then copy `work_dir` into it.
pub fn replace_vendor_dir(
    work_dir: &Path,
    vendor_dir: &Path,
    keep_file: &str,
) -> Result<(), VendorError> {
    clear_vendor_dir(vendor_dir, keep_file).map_err(|source| VendorError::Replace {
        path: vendor_dir.to_path_buf(),
        source,
    })?;
    copy_tree(work_dir, vendor_dir).map_err(|source| VendorError::Replace {
        path: vendor_dir.to_path_buf(),
        source,
    })
}

fn clear_vendor_dir(vendor_dir: &Path, keep_file: &str) -> io::Result<()> {
    if vendor_dir.exists() {
        for entry in fs::read_dir(vendor_dir)? {
            let entry = entry?;
            if entry.file_name() == keep_file {
                continue;
            }
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
    }
    fs::create_dir_all(vendor_dir)
}

// `npm install` links `node_modules/.bin/*` to scripts in the tree. Those links are copied as
// regular files; links resolving elsewhere are dropped.
fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    let root = fs::canonicalize(src)?;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry?;
        let path = entry.path();
        let rel = path.strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        let source: PathBuf = if file_type.is_symlink() {
            match fs::canonicalize(path) {
                Ok(resolved) if resolved.starts_with(&root) && resolved.is_file() => resolved,
                _ => {
                    warn!(path = %path.display(), "skipping symlink that does not resolve to a file inside the package");
                    continue;
                }
            }
        } else if file_type.is_file() {
            path.to_path_buf()
        } else {
            continue;
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &target)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
