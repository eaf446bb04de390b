use super::*;
use tempfile::tempdir;

#[test]
fn metadata_parses_object_output() {
    let meta = RegistryMetadata::from_view_output(
        "vercel@latest",
        br#"{"name":"vercel","version":"9.9.9","dist":{"integrity":"sha512-AAAA","shasum":"abc","fileCount":3}}"#,
    )
    .expect("parse");
    assert_eq!(meta.version.as_deref(), Some("9.9.9"));
    assert_eq!(meta.dist.integrity.as_deref(), Some("sha512-AAAA"));
    assert_eq!(meta.dist.shasum.as_deref(), Some("abc"));
}

#[test]
fn metadata_takes_last_element_of_array_output() {
    let meta = RegistryMetadata::from_view_output(
        "vercel@^1",
        br#"[{"version":"1.0.0"},{"version":"1.1.0","dist":{"shasum":"ff"}}]"#,
    )
    .expect("parse");
    assert_eq!(meta.version.as_deref(), Some("1.1.0"));
    assert_eq!(meta.dist.shasum.as_deref(), Some("ff"));
}

#[test]
fn metadata_without_dist_defaults_to_no_digests() {
    let meta = RegistryMetadata::from_view_output("vercel@1", br#"{"version":"1"}"#)
        .expect("parse");
    assert_eq!(meta.dist, DistInfo::default());
}

#[test]
fn metadata_rejects_garbage_and_empty_arrays() {
    for stdout in [
        &b"not json"[..],
        &b""[..],
        &b"[]"[..],
        &b"\"just a string\""[..],
    ] {
        let err = RegistryMetadata::from_view_output("vercel@1", stdout).unwrap_err();
        assert_eq!(err.code(), "registry.invalid_metadata", "{err}");
    }
}

#[test]
fn tarball_prefix_follows_npm_naming() {
    assert_eq!(tarball_prefix("vercel"), "vercel");
    assert_eq!(tarball_prefix("@vercel/python"), "vercel-python");
}

#[test]
fn locate_prefers_reported_filename() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("vercel-2.2.2.tgz"), b"x").expect("write");
    fs::write(dir.path().join("vercel-1.0.0.tgz"), b"x").expect("write");
    let got = locate_packed_tarball("vercel-2.2.2.tgz\n", dir.path(), "vercel");
    assert_eq!(got, Some(dir.path().join("vercel-2.2.2.tgz")));
}

#[test]
fn locate_falls_back_to_glob() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("vercel-1.2.3.tgz"), b"tgz").expect("write");
    fs::write(dir.path().join("other-1.2.3.tgz"), b"tgz").expect("write");

    assert_eq!(
        locate_packed_tarball("", dir.path(), "vercel"),
        Some(dir.path().join("vercel-1.2.3.tgz"))
    );
    assert_eq!(
        locate_packed_tarball("missing.tgz\n", dir.path(), "vercel"),
        Some(dir.path().join("vercel-1.2.3.tgz"))
    );
}

#[test]
fn locate_ignores_reported_paths_outside_out_dir() {
    let root = tempdir().expect("temp dir");
    let out_dir = root.path().join("out");
    fs::create_dir_all(&out_dir).expect("mkdir");
    fs::write(root.path().join("evil.tgz"), b"x").expect("write");

    assert_eq!(locate_packed_tarball("../evil.tgz", &out_dir, "vercel"), None);
}

#[test]
fn locate_returns_none_without_any_tarball() {
    let dir = tempdir().expect("temp dir");
    assert_eq!(locate_packed_tarball("", dir.path(), "vercel"), None);
}

#[test]
fn missing_program_is_a_spawn_error() {
    let npm = NpmCli::new("npm-vendor-definitely-not-installed", "vercel");
    let err = npm.view("latest").unwrap_err();
    assert_eq!(err.code(), "registry.spawn_failed");
}

#[cfg(unix)]
mod with_fake_npm {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn fake_npm(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("npm");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake npm");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    #[test]
    fn view_parses_stdout_and_reports_failures() {
        let dir = tempdir().expect("temp dir");
        let ok = fake_npm(
            dir.path(),
            r#"[ "$1 $2 $3" = "view vercel@latest --json" ] || exit 9
printf '%s' '{"version":"4.5.6","dist":{"shasum":"abc"}}'"#,
        );
        let meta = NpmCli::new(&ok, "vercel").view("latest").expect("view");
        assert_eq!(meta.version.as_deref(), Some("4.5.6"));

        let failing = tempdir().expect("temp dir");
        let bad = fake_npm(failing.path(), "echo 'E404 not found' >&2\nexit 1");
        let err = NpmCli::new(&bad, "vercel").view("0.0.0").unwrap_err();
        assert_eq!(err.code(), "registry.view_failed");
        assert!(err.to_string().contains("E404"), "{err}");
    }

    #[test]
    fn pack_uses_reported_filename() {
        let dir = tempdir().expect("temp dir");
        let npm = fake_npm(
            dir.path(),
            "printf x > vercel-2.2.2.tgz\necho 'npm notice' >&2\necho vercel-2.2.2.tgz",
        );
        let out_dir = dir.path().join("out");
        let got = NpmCli::new(&npm, "vercel")
            .pack("2.2.2", &out_dir)
            .expect("pack");
        assert_eq!(got, out_dir.join("vercel-2.2.2.tgz"));
    }

    #[test]
    fn pack_failure_carries_stderr() {
        let dir = tempdir().expect("temp dir");
        let npm = fake_npm(dir.path(), "echo boom >&2\nexit 1");
        let err = NpmCli::new(&npm, "vercel")
            .pack("1.2.3", &dir.path().join("out"))
            .unwrap_err();
        assert_eq!(err.code(), "registry.pack_failed");
        assert!(err.to_string().contains("npm pack failed"), "{err}");
        assert!(err.to_string().contains("boom"), "{err}");
    }

    #[test]
    fn pack_without_tarball_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let npm = fake_npm(dir.path(), "exit 0");
        let err = NpmCli::new(&npm, "vercel")
            .pack("1.2.3", &dir.path().join("out"))
            .unwrap_err();
        assert_eq!(err.code(), "registry.no_tarball");
    }

    #[test]
    fn install_runs_production_only_in_work_dir() {
        let dir = tempdir().expect("temp dir");
        let npm = fake_npm(dir.path(), r#"echo "$NODE_ENV $*" > install.log"#);
        let work = dir.path().join("work");
        fs::create_dir_all(&work).expect("mkdir");

        NpmCli::new(&npm, "vercel")
            .install_production(&work)
            .expect("install");
        let log = fs::read_to_string(work.join("install.log")).expect("read log");
        assert_eq!(
            log.trim(),
            "production install --omit=dev --no-package-lock --ignore-scripts"
        );
    }

    #[test]
    fn install_failure_is_reported() {
        let dir = tempdir().expect("temp dir");
        let npm = fake_npm(dir.path(), "echo 'ERESOLVE' >&2\nexit 3");
        let err = NpmCli::new(&npm, "vercel")
            .install_production(dir.path())
            .unwrap_err();
        assert_eq!(err.code(), "registry.install_failed");
        assert!(matches!(
            err,
            RegistryError::InstallFailed { code: Some(3), .. }
        ));
    }
}
