#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use npm_vendor::error::RegistryError;
use npm_vendor::registry::DistInfo;
use npm_vendor::{Installer, Registry, RegistryMetadata};
use sha1::Sha1;
use sha2::{Digest, Sha512};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir parent");
    }
    fs::write(path, content).expect("write file");
}

pub fn manifest_json(version: &str) -> String {
    format!(
        r#"{{
  "name": "vercel",
  "version": "{version}",
  "bin": {{ "vercel": "dist/index.js" }},
  "dependencies": {{
    "@vercel/build-utils": "1.0.0",
    "@vercel/python": "2.0.0",
    "@vercel/next": "3.0.0",
    "chalk": "5.0.0"
  }},
  "devDependencies": {{ "jest": "29.0.0" }}
}}
"#
    )
}

/// gzip'd npm-style tarball: everything under `package/`.
pub fn package_tgz(manifest: &str) -> Vec<u8> {
    let mut tar = tar::Builder::new(Vec::new());
    for (path, body) in [
        ("package/package.json", manifest),
        ("package/dist/index.js", "console.log('vercel');\n"),
        ("package/README.md", "# vercel\n"),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_mode(0o644);
        header.set_size(body.len() as u64);
        tar.append_data(&mut header, path, body.as_bytes())
            .expect("append entry");
    }
    let raw = tar.into_inner().expect("tar bytes");
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    std::io::Write::write_all(&mut enc, &raw).expect("gzip");
    enc.finish().expect("gzip finish")
}

pub fn sri_sha512(bytes: &[u8]) -> String {
    format!("sha512-{}", STANDARD.encode(Sha512::digest(bytes)))
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    Sha1::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Digests {
    Integrity,
    ShasumOnly,
    /// Digest of different bytes than the ones packed.
    Tampered,
    None,
}

/// Serves one package from memory. `latest` of `None` models a registry that reports no version.
pub struct StubRegistry {
    pub latest: Option<String>,
    pub digests: Digests,
    /// Replaces the generated `package.json` when set.
    pub manifest_override: Option<String>,
    pub views: RefCell<Vec<String>>,
    pub packs: Cell<usize>,
}

impl StubRegistry {
    pub fn new(latest: &str) -> Self {
        Self {
            latest: Some(latest.to_string()),
            digests: Digests::Integrity,
            manifest_override: None,
            views: RefCell::new(Vec::new()),
            packs: Cell::new(0),
        }
    }

    pub fn without_latest() -> Self {
        Self {
            latest: None,
            ..Self::new("0.0.0")
        }
    }

    fn resolve(&self, version: &str) -> Option<String> {
        if version == npm_vendor::LATEST {
            self.latest.clone()
        } else {
            Some(version.to_string())
        }
    }

    fn tarball_for(&self, version: &str) -> Vec<u8> {
        let manifest = self
            .manifest_override
            .clone()
            .unwrap_or_else(|| manifest_json(version));
        package_tgz(&manifest)
    }
}

impl Registry for StubRegistry {
    fn view(&self, version: &str) -> Result<RegistryMetadata, RegistryError> {
        self.views.borrow_mut().push(version.to_string());
        let Some(resolved) = self.resolve(version) else {
            return Ok(RegistryMetadata::default());
        };
        let bytes = self.tarball_for(&resolved);
        let dist = match self.digests {
            Digests::Integrity => DistInfo {
                integrity: Some(sri_sha512(&bytes)),
                shasum: Some(sha1_hex(&bytes)),
                tarball: None,
            },
            Digests::ShasumOnly => DistInfo {
                shasum: Some(sha1_hex(&bytes)),
                ..DistInfo::default()
            },
            Digests::Tampered => DistInfo {
                integrity: Some(sri_sha512(b"something else")),
                ..DistInfo::default()
            },
            Digests::None => DistInfo::default(),
        };
        Ok(RegistryMetadata {
            version: Some(resolved),
            dist,
        })
    }

    fn pack(&self, version: &str, out_dir: &Path) -> Result<PathBuf, RegistryError> {
        self.packs.set(self.packs.get() + 1);
        let resolved = self.resolve(version).unwrap_or_else(|| version.to_string());
        fs::create_dir_all(out_dir).expect("mkdir pack dir");
        let path = out_dir.join(format!("vercel-{resolved}.tgz"));
        fs::write(&path, self.tarball_for(&resolved)).expect("write tarball");
        Ok(path)
    }
}

/// Records each install and drops a marker dependency into `node_modules`.
#[derive(Default)]
pub struct StubInstaller {
    pub fail: bool,
    pub calls: Cell<usize>,
    /// `package.json` contents seen at install time.
    pub seen_manifest: RefCell<Option<String>>,
}

impl StubInstaller {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl Installer for StubInstaller {
    fn install_production(&self, work_dir: &Path) -> Result<(), RegistryError> {
        self.calls.set(self.calls.get() + 1);
        *self.seen_manifest.borrow_mut() = fs::read_to_string(work_dir.join("package.json")).ok();
        if self.fail {
            return Err(RegistryError::InstallFailed {
                dir: work_dir.to_path_buf(),
                code: Some(1),
                stderr: "ERESOLVE".to_string(),
            });
        }
        write_file(
            &work_dir.join("node_modules/@vercel/python/package.json"),
            r#"{"name":"@vercel/python"}"#,
        );
        Ok(())
    }
}
