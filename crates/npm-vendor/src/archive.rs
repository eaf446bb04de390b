use crate::error::ArchiveError;
use flate2::read::GzDecoder;
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::debug;

/// npm tarballs nest every file under this directory.
pub const ROOT_PREFIX: &str = "package/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberTarget {
    Accepted(PathBuf),
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    OutsideRoot,
    EmptyPath,
    Absolute,
    UnsafeSegment,
}

impl MemberTarget {
    pub fn accepted(self) -> Option<PathBuf> {
        match self {
            MemberTarget::Accepted(path) => Some(path),
            MemberTarget::Rejected(_) => None,
        }
    }
}

/// Map an untrusted member name to a path inside `dest`, stripping [`ROOT_PREFIX`].
///
/// Rejects names outside the prefix, empty or `.` remainders, absolute remainders and any
/// segment that is `.`, `..`, padded with whitespace (`".. "`), or carries a `\` or NUL.
/// Empty segments from `//` or a trailing `/` are ignored.
pub fn resolve_member_target(member_name: &str, dest: &Path) -> MemberTarget {
    let Some(rel) = member_name.strip_prefix(ROOT_PREFIX) else {
        return MemberTarget::Rejected(RejectReason::OutsideRoot);
    };
    if rel.is_empty() || rel == "." {
        return MemberTarget::Rejected(RejectReason::EmptyPath);
    }
    if rel.starts_with('/') || Path::new(rel).is_absolute() {
        return MemberTarget::Rejected(RejectReason::Absolute);
    }

    let mut target = dest.to_path_buf();
    for segment in rel.split('/').filter(|s| !s.is_empty()) {
        if segment.trim() != segment || segment.contains(['\\', '\0']) {
            return MemberTarget::Rejected(RejectReason::UnsafeSegment);
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => target.push(segment),
            _ => return MemberTarget::Rejected(RejectReason::UnsafeSegment),
        }
    }
    MemberTarget::Accepted(target)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub dirs: usize,
    pub skipped: usize,
}

fn is_gzip_archive(path: &Path) -> Result<bool, ArchiveError> {
    let mut file = fs::File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut magic = [0u8; 2];
    let read_n = file.read(&mut magic).map_err(|source| ArchiveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(read_n == 2 && magic == [0x1f, 0x8b])
}

/// Extract `archive_path` (tar or tar.gz) into `dest`, dropping the `package/` prefix.
///
/// Link entries, special files and members rejected by [`resolve_member_target`] are skipped.
/// A failure while reading the archive or writing a file aborts the extraction.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<ExtractSummary, ArchiveError> {
    fs::create_dir_all(dest).map_err(|source| ArchiveError::CreateDir {
        path: dest.to_path_buf(),
        source,
    })?;

    let read_err = |source: io::Error| ArchiveError::Read {
        path: archive_path.to_path_buf(),
        source,
    };
    let gzip = is_gzip_archive(archive_path)?;
    let file = fs::File::open(archive_path).map_err(|source| ArchiveError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let reader: Box<dyn Read> = if gzip {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut archive = Archive::new(reader);
    let mut summary = ExtractSummary::default();
    for entry in archive.entries().map_err(read_err)? {
        let mut entry = entry.map_err(read_err)?;
        let entry_type = entry.header().entry_type();
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            debug!(member = %name, "skipping link entry");
            summary.skipped += 1;
            continue;
        }
        if !entry_type.is_dir() && !entry_type.is_file() {
            debug!(member = %name, entry_type = ?entry_type, "skipping unsupported entry type");
            summary.skipped += 1;
            continue;
        }
        let target = match resolve_member_target(&name, dest) {
            MemberTarget::Accepted(target) => target,
            MemberTarget::Rejected(reason) => {
                debug!(member = %name, ?reason, "skipping unsafe archive member");
                summary.skipped += 1;
                continue;
            }
        };

        if entry_type.is_dir() {
            fs::create_dir_all(&target).map_err(|source| ArchiveError::CreateDir {
                path: target.clone(),
                source,
            })?;
            summary.dirs += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ArchiveError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mode = entry.header().mode().ok();
        let write_err = |source: io::Error| ArchiveError::Write {
            path: target.clone(),
            source,
        };
        let mut out = fs::File::create(&target).map_err(write_err)?;
        io::copy(&mut entry, &mut out).map_err(write_err)?;
        drop(out);
        if let Some(mode) = mode {
            apply_mode(&target, mode);
        }
        summary.files += 1;
    }
    Ok(summary)
}

// Best-effort: hosts that cannot set modes keep the default ones.
#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777));
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) {}
