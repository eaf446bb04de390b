//! Vendor a pinned npm release into a repository directory.
//!
//! The pipeline is: resolve metadata (`npm view`), fetch the packed tarball (`npm pack`),
//! verify it against the registry digest, extract it without trusting member paths, reduce
//! `package.json` to an allow-listed runtime dependency set, install production dependencies,
//! and replace the vendored directory.

pub mod archive;
pub mod commands;
pub mod config;
pub mod error;
pub mod github_outputs;
pub mod integrity;
pub mod manifest;
pub mod registry;
pub mod vendor;

pub use config::VendorConfig;
pub use error::{
    ArchiveError, ConfigError, IntegrityError, ManifestError, RegistryError, VendorError,
};
pub use registry::{Installer, NpmCli, Registry, RegistryMetadata};
pub use vendor::{UpdateReport, VendorUpdater, read_vendored_version};

/// Dist-tag that resolves to the newest published release.
pub const LATEST: &str = "latest";
