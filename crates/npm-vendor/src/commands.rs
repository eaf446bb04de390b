//! `update` and `check` as library calls; the binary only parses flags and prints.

use crate::LATEST;
use crate::error::VendorError;
use crate::github_outputs;
use crate::registry::{Installer, Registry};
use crate::vendor::VendorUpdater;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub exit_code: i32,
    /// Version to print on stdout.
    pub version: Option<String>,
    pub updated: bool,
}

impl CommandOutcome {
    fn updated(version: String) -> Self {
        Self {
            exit_code: 0,
            version: Some(version),
            updated: true,
        }
    }

    fn not_updated(exit_code: i32, version: Option<String>) -> Self {
        Self {
            exit_code,
            version,
            updated: false,
        }
    }

    /// `updated=true|false`, plus `new_version=<v>` when updated.
    pub fn output_pairs(&self) -> Vec<(&'static str, String)> {
        match (&self.version, self.updated) {
            (Some(v), true) => vec![("updated", "true".to_string()), ("new_version", v.clone())],
            _ => vec![("updated", "false".to_string())],
        }
    }

    pub fn write_github_outputs(&self) -> Result<(), VendorError> {
        let pairs = self.output_pairs();
        let borrowed: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
        github_outputs::write_github_outputs(&borrowed).map_err(VendorError::GithubOutputs)
    }
}

/// Vendor `requested` (default `latest`) and confirm the vendored manifest reports it.
pub fn update_command<R: Registry, I: Installer>(
    updater: &VendorUpdater<R, I>,
    requested: Option<&str>,
) -> Result<CommandOutcome, VendorError> {
    let requested = requested.filter(|v| !v.trim().is_empty()).unwrap_or(LATEST);
    let version = if requested == LATEST {
        let latest = updater.resolve_latest_version()?;
        if latest.is_empty() {
            return Err(VendorError::LatestUnknown {
                package: updater.config().package.clone(),
            });
        }
        latest
    } else {
        requested.to_string()
    };

    let report = updater.update_to(&version)?;
    updater.verify_vendored_version(&report.version)?;
    info!("vendored {}@{}", updater.config().package, report.version);
    Ok(CommandOutcome::updated(report.version))
}

/// Compare the vendored version with `latest`; vendor it when `vendor` is set.
///
/// Without `vendor`, an `updated` outcome only means a newer release exists.
pub fn check_command<R: Registry, I: Installer>(
    updater: &VendorUpdater<R, I>,
    vendor: bool,
) -> Result<CommandOutcome, VendorError> {
    let package = &updater.config().package;
    let current = updater.read_vendored_version()?;
    let latest = updater.resolve_latest_version()?;
    if latest.is_empty() {
        error!("could not determine latest {package} version from npm");
        return Ok(CommandOutcome::not_updated(1, None));
    }
    if latest == current {
        info!("already up-to-date: {package}@{current}");
        return Ok(CommandOutcome::not_updated(0, Some(current)));
    }

    if vendor {
        info!("updating vendored {package} from {current} to {latest}");
        let report = updater.update_to(&latest)?;
        if let Err(err) = updater.verify_vendored_version(&latest) {
            error!("{err}");
            return Ok(CommandOutcome::not_updated(1, None));
        }
        info!("vendored {package}@{}", report.version);
    } else {
        info!("newer {package} available: {current} -> {latest}");
    }
    Ok(CommandOutcome::updated(latest))
}
