use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Append `key=value` lines to the file named by `$GITHUB_OUTPUT`; no-op when it is unset.
pub fn write_github_outputs(pairs: &[(&str, &str)]) -> io::Result<()> {
    match std::env::var_os(GITHUB_OUTPUT_ENV).filter(|v| !v.is_empty()) {
        Some(path) => append_outputs(Path::new(&path), pairs),
        None => Ok(()),
    }
}

pub fn append_outputs(path: &Path, pairs: &[(&str, &str)]) -> io::Result<()> {
    if pairs.is_empty() {
        return Ok(());
    }
    let mut out = String::new();
    for (key, value) in pairs {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(out.as_bytes())
}
