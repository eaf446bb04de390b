use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read archive {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write extracted file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub fn code(&self) -> &'static str {
        match self {
            ArchiveError::Open { .. } => "archive.open_failed",
            ArchiveError::Read { .. } => "archive.read_failed",
            ArchiveError::CreateDir { .. } => "archive.create_dir_failed",
            ArchiveError::Write { .. } => "archive.write_failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("invalid integrity descriptor: {descriptor:?}")]
    InvalidDescriptor { descriptor: String },
    #[error("unsupported integrity algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },
    #[error("integrity verification failed for npm tarball {path}: expected {descriptor}")]
    IntegrityMismatch { path: PathBuf, descriptor: String },
    #[error(
        "checksum verification failed for npm tarball {path}: expected sha1 {expected}, actual {actual}"
    )]
    ShasumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error(
        "registry supplied neither integrity nor shasum for {spec} (fix: set allow_missing_digest = true to accept unverified tarballs)"
    )]
    MissingDigest { spec: String },
    #[error("failed to read {path} for verification: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl IntegrityError {
    pub fn code(&self) -> &'static str {
        match self {
            IntegrityError::InvalidDescriptor { .. } => "integrity.invalid_descriptor",
            IntegrityError::UnsupportedAlgorithm { .. } => "integrity.unsupported_algorithm",
            IntegrityError::IntegrityMismatch { .. } => "integrity.mismatch",
            IntegrityError::ShasumMismatch { .. } => "integrity.shasum_mismatch",
            IntegrityError::MissingDigest { .. } => "integrity.missing_digest",
            IntegrityError::Read { .. } => "integrity.read_failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("npm view failed for {spec}: {stderr}")]
    ViewFailed { spec: String, stderr: String },
    #[error("failed to parse npm view output for {spec}: {message}")]
    InvalidMetadata { spec: String, message: String },
    #[error("npm pack failed for {spec}: {stderr}")]
    PackFailed { spec: String, stderr: String },
    #[error("npm pack did not produce a tarball for {spec} in {dir}")]
    NoTarball { spec: String, dir: PathBuf },
    #[error("npm install failed in {dir} (exit={code:?}): {stderr}")]
    InstallFailed {
        dir: PathBuf,
        code: Option<i32>,
        stderr: String,
    },
    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl RegistryError {
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::Spawn { .. } => "registry.spawn_failed",
            RegistryError::ViewFailed { .. } => "registry.view_failed",
            RegistryError::InvalidMetadata { .. } => "registry.invalid_metadata",
            RegistryError::PackFailed { .. } => "registry.pack_failed",
            RegistryError::NoTarball { .. } => "registry.no_tarball",
            RegistryError::InstallFailed { .. } => "registry.install_failed",
            RegistryError::CreateDir { .. } => "registry.create_dir_failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse manifest JSON {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("manifest {path} is not a JSON object")]
    NotAnObject { path: PathBuf },
    #[error("failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ManifestError {
    pub fn code(&self) -> &'static str {
        match self {
            ManifestError::Read { .. } => "manifest.read_failed",
            ManifestError::Parse { .. } => "manifest.parse_failed",
            ManifestError::NotAnObject { .. } => "manifest.not_an_object",
            ManifestError::Write { .. } => "manifest.write_failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    Missing(PathBuf),
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config TOML {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Missing(_) => "config.missing",
            ConfigError::Read { .. } => "config.read_failed",
            ConfigError::Parse { .. } => "config.parse_failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VendorError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid version identifier: {0:?}")]
    InvalidVersion(String),
    #[error("could not determine latest {package} version from the registry")]
    LatestUnknown { package: String },
    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] std::io::Error),
    #[error("failed to replace vendor dir at {path}: {source}")]
    Replace {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("vendored manifest {path} has no version field")]
    MissingVersion { path: PathBuf },
    #[error("update failed: expected {expected}, found {found}")]
    VersionMismatch { expected: String, found: String },
    #[error("failed to write GitHub outputs: {0}")]
    GithubOutputs(#[source] std::io::Error),
}

impl VendorError {
    pub fn code(&self) -> &'static str {
        match self {
            VendorError::Registry(e) => e.code(),
            VendorError::Integrity(e) => e.code(),
            VendorError::Archive(e) => e.code(),
            VendorError::Manifest(e) => e.code(),
            VendorError::Config(e) => e.code(),
            VendorError::InvalidVersion(_) => "vendor.invalid_version",
            VendorError::LatestUnknown { .. } => "vendor.latest_unknown",
            VendorError::TempDir(_) => "vendor.temp_dir_failed",
            VendorError::Replace { .. } => "vendor.replace_failed",
            VendorError::MissingVersion { .. } => "vendor.missing_version",
            VendorError::VersionMismatch { .. } => "vendor.version_mismatch",
            VendorError::GithubOutputs(_) => "vendor.github_outputs_failed",
        }
    }
}
