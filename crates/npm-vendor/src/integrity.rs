use crate::error::IntegrityError;
use base64::{Engine as _, engine::general_purpose};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

const CHUNK_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    /// Case-insensitive lookup of an SRI algorithm name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha1" => Some(Self::Sha1),
            "sha224" => Some(Self::Sha224),
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed `<algorithm>-<base64 digest>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityDescriptor {
    pub algorithm: Algorithm,
    pub digest: Vec<u8>,
}

impl IntegrityDescriptor {
    pub fn parse(raw: &str) -> Result<Self, IntegrityError> {
        let invalid = || IntegrityError::InvalidDescriptor {
            descriptor: raw.to_string(),
        };
        let (algorithm, b64) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let digest = general_purpose::STANDARD
            .decode(b64)
            .map_err(|_| invalid())?;
        let algorithm =
            Algorithm::from_name(algorithm).ok_or_else(|| IntegrityError::UnsupportedAlgorithm {
                algorithm: algorithm.to_ascii_lowercase(),
            })?;
        Ok(Self { algorithm, digest })
    }
}

impl fmt::Display for IntegrityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.algorithm,
            general_purpose::STANDARD.encode(&self.digest)
        )
    }
}

/// How a tarball was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Integrity(Algorithm),
    Shasum,
    /// The registry offered no digest; nothing was checked.
    Unverified,
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verification::Integrity(alg) => write!(f, "integrity ({alg})"),
            Verification::Shasum => f.write_str("shasum (sha1)"),
            Verification::Unverified => f.write_str("unverified"),
        }
    }
}

/// Check `archive_path` against the registry's `integrity`, falling back to `shasum`.
///
/// Blank values count as absent. With neither present the result is
/// [`Verification::Unverified`]; deciding whether that is acceptable is the caller's job.
pub fn verify_archive(
    archive_path: &Path,
    integrity: Option<&str>,
    shasum: Option<&str>,
) -> Result<Verification, IntegrityError> {
    if let Some(raw) = integrity.map(str::trim).filter(|s| !s.is_empty()) {
        let descriptor = IntegrityDescriptor::parse(raw)?;
        let actual = digest_file(archive_path, descriptor.algorithm)?;
        if actual != descriptor.digest {
            return Err(IntegrityError::IntegrityMismatch {
                path: archive_path.to_path_buf(),
                descriptor: raw.to_string(),
            });
        }
        return Ok(Verification::Integrity(descriptor.algorithm));
    }

    if let Some(expected) = shasum.map(str::trim).filter(|s| !s.is_empty()) {
        let actual = hex(&digest_file(archive_path, Algorithm::Sha1)?);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(IntegrityError::ShasumMismatch {
                path: archive_path.to_path_buf(),
                expected: expected.to_string(),
                actual,
            });
        }
        return Ok(Verification::Shasum);
    }

    Ok(Verification::Unverified)
}

/// Integrity descriptor for the file at `path`, in the registry's format.
pub fn compute_integrity(path: &Path, algorithm: Algorithm) -> Result<String, IntegrityError> {
    let digest = digest_file(path, algorithm)?;
    Ok(IntegrityDescriptor { algorithm, digest }.to_string())
}

/// Lowercase hex SHA-1 of the file at `path`, the registry's `shasum` format.
pub fn compute_shasum(path: &Path) -> Result<String, IntegrityError> {
    Ok(hex(&digest_file(path, Algorithm::Sha1)?))
}

pub fn digest_file(path: &Path, algorithm: Algorithm) -> Result<Vec<u8>, IntegrityError> {
    match algorithm {
        Algorithm::Sha1 => stream_digest::<Sha1>(path),
        Algorithm::Sha224 => stream_digest::<Sha224>(path),
        Algorithm::Sha256 => stream_digest::<Sha256>(path),
        Algorithm::Sha384 => stream_digest::<Sha384>(path),
        Algorithm::Sha512 => stream_digest::<Sha512>(path),
    }
}

fn stream_digest<D: Digest>(path: &Path) -> Result<Vec<u8>, IntegrityError> {
    let read_err = |source: std::io::Error| IntegrityError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::open(path).map_err(read_err)?;
    let mut hasher = D::new();
    let mut buf = vec![0u8; CHUNK_BYTES];
    loop {
        let n = file.read(&mut buf).map_err(read_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_vec())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
