use crate::config::VendorConfig;
use crate::error::RegistryError;
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Output};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistryMetadata {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub dist: DistInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DistInfo {
    #[serde(default)]
    pub integrity: Option<String>,
    #[serde(default)]
    pub shasum: Option<String>,
    #[serde(default)]
    pub tarball: Option<String>,
}

impl RegistryMetadata {
    /// Parse `npm view --json` output. A range matching several releases prints an array; the
    /// last (newest) element wins.
    pub fn from_view_output(spec: &str, stdout: &[u8]) -> Result<Self, RegistryError> {
        let invalid = |message: String| RegistryError::InvalidMetadata {
            spec: spec.to_string(),
            message,
        };
        let value: serde_json::Value =
            serde_json::from_slice(stdout).map_err(|e| invalid(e.to_string()))?;
        let value = match value {
            serde_json::Value::Array(mut items) => items
                .pop()
                .ok_or_else(|| invalid("no versions matched".to_string()))?,
            other => other,
        };
        serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
    }
}

/// Version resolution and tarball fetch.
pub trait Registry {
    fn view(&self, version: &str) -> Result<RegistryMetadata, RegistryError>;

    /// Write the packed tarball for `version` into `out_dir` and return its path.
    fn pack(&self, version: &str, out_dir: &Path) -> Result<PathBuf, RegistryError>;
}

/// Production dependency install inside an extracted package.
pub trait Installer {
    fn install_production(&self, work_dir: &Path) -> Result<(), RegistryError>;
}

impl<T: Registry + ?Sized> Registry for &T {
    fn view(&self, version: &str) -> Result<RegistryMetadata, RegistryError> {
        (**self).view(version)
    }

    fn pack(&self, version: &str, out_dir: &Path) -> Result<PathBuf, RegistryError> {
        (**self).pack(version, out_dir)
    }
}

impl<T: Installer + ?Sized> Installer for &T {
    fn install_production(&self, work_dir: &Path) -> Result<(), RegistryError> {
        (**self).install_production(work_dir)
    }
}

/// `npm pack` file name prefix: `@scope/name` packs as `scope-name-<version>.tgz`.
pub fn tarball_prefix(package: &str) -> String {
    package.trim_start_matches('@').replace('/', "-")
}

/// Find the tarball `npm pack` wrote: the name it reported on stdout if that file exists,
/// else the first `<prefix>-*.tgz` in `out_dir`.
pub fn locate_packed_tarball(stdout: &str, out_dir: &Path, package: &str) -> Option<PathBuf> {
    let reported = stdout.lines().map(str::trim).filter(|l| !l.is_empty()).last();
    if let Some(name) = reported {
        let mut components = Path::new(name).components();
        if let (Some(Component::Normal(_)), None) = (components.next(), components.next()) {
            let candidate = out_dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    let pattern = format!(
        "{}/{}-*.tgz",
        glob::Pattern::escape(&out_dir.to_string_lossy()),
        glob::Pattern::escape(&tarball_prefix(package))
    );
    let mut matches: Vec<PathBuf> = glob::glob(&pattern)
        .ok()?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// [`Registry`] and [`Installer`] backed by the `npm` executable.
#[derive(Debug, Clone)]
pub struct NpmCli {
    program: OsString,
    package: String,
}

impl NpmCli {
    pub fn new(program: impl Into<OsString>, package: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            package: package.into(),
        }
    }

    pub fn from_config(config: &VendorConfig) -> Self {
        Self::new(&config.npm, &config.package)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    fn spec(&self, version: &str) -> String {
        format!("{}@{version}", self.package)
    }

    fn run(
        &self,
        args: &[&str],
        cwd: Option<&Path>,
        env: &[(&str, &str)],
    ) -> Result<Output, RegistryError> {
        let mut command = Command::new(&self.program);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        for (key, value) in env {
            command.env(key, value);
        }
        command.output().map_err(|source| RegistryError::Spawn {
            program: self.program.to_string_lossy().to_string(),
            source,
        })
    }
}

fn stderr_text(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).trim().to_string()
}

impl Registry for NpmCli {
    fn view(&self, version: &str) -> Result<RegistryMetadata, RegistryError> {
        let spec = self.spec(version);
        let out = self.run(&["view", &spec, "--json"], None, &[])?;
        if !out.status.success() {
            return Err(RegistryError::ViewFailed {
                spec,
                stderr: stderr_text(&out),
            });
        }
        RegistryMetadata::from_view_output(&spec, &out.stdout)
    }

    fn pack(&self, version: &str, out_dir: &Path) -> Result<PathBuf, RegistryError> {
        fs::create_dir_all(out_dir).map_err(|source| RegistryError::CreateDir {
            path: out_dir.to_path_buf(),
            source,
        })?;
        let spec = self.spec(version);
        let out = self.run(&["pack", &spec], Some(out_dir), &[])?;
        if !out.status.success() {
            return Err(RegistryError::PackFailed {
                spec,
                stderr: stderr_text(&out),
            });
        }
        let stdout = String::from_utf8_lossy(&out.stdout);
        locate_packed_tarball(&stdout, out_dir, &self.package).ok_or_else(|| {
            RegistryError::NoTarball {
                spec,
                dir: out_dir.to_path_buf(),
            }
        })
    }
}

impl Installer for NpmCli {
    fn install_production(&self, work_dir: &Path) -> Result<(), RegistryError> {
        let out = self.run(
            &[
                "install",
                "--omit=dev",
                "--no-package-lock",
                "--ignore-scripts",
            ],
            Some(work_dir),
            &[("NODE_ENV", "production")],
        )?;
        if !out.status.success() {
            return Err(RegistryError::InstallFailed {
                dir: work_dir.to_path_buf(),
                code: out.status.code(),
                stderr: stderr_text(&out),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
