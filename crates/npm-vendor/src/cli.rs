use npm_vendor::VendorConfig;
use npm_vendor::commands::{CommandOutcome, check_command, update_command};
use npm_vendor::config::default_repo_root;
use npm_vendor::error::VendorError;
use npm_vendor::vendor::VendorUpdater;
use std::path::PathBuf;

pub(crate) fn print_help() {
    println!(
        "Usage:\n  npm-vendor help\n  npm-vendor version\n  npm-vendor [global flags] update [<version>|latest] [--github-outputs]\n  npm-vendor [global flags] check [--vendor] [--github-outputs]\n\nGlobal flags:\n  --repo-root <path>   repository root (default: $NPM_VENDOR_REPO_ROOT or .)\n  --config <path>      config file (default: <repo-root>/npm-vendor.toml when present)\n  --vendor-dir <path>  destination directory (overrides config and $NPM_VENDOR_DIR)\n  -q, --quiet          only log warnings and errors\n\nNotes:\n  - Env overrides: NPM_VENDOR_DIR, NPM_VENDOR_PACKAGE, NPM (npm executable).\n  - Log filter: RUST_LOG (default info).\n  - --github-outputs appends updated/new_version to $GITHUB_OUTPUT when it is set.\n\nExamples:\n  npm-vendor update\n  npm-vendor update 50.1.0 --github-outputs\n  npm-vendor check --vendor --github-outputs\n"
    );
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct GlobalOptions {
    pub(crate) repo_root: Option<String>,
    pub(crate) config: Option<String>,
    pub(crate) vendor_dir: Option<String>,
    pub(crate) quiet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Update {
        version: Option<String>,
        github_outputs: bool,
    },
    Check {
        vendor: bool,
        github_outputs: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cli {
    pub(crate) global: GlobalOptions,
    pub(crate) command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Parsed {
    Help,
    Version,
    Run(Cli),
}

fn take_value(args: &[String], i: usize, flag: &str) -> Result<String, String> {
    let v = args
        .get(i + 1)
        .ok_or_else(|| format!("{flag} requires a value"))?;
    if v.starts_with("--") {
        return Err(format!("{flag} requires a value"));
    }
    Ok(v.clone())
}

/// Parse arguments after the program name. Global flags may appear before or after the command.
pub(crate) fn parse_cli(args: &[String]) -> Result<Parsed, String> {
    let mut global = GlobalOptions::default();
    let mut command_name: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut vendor = false;
    let mut github_outputs = false;

    let mut i = 0usize;
    while i < args.len() {
        let a = args[i].as_str();
        match a {
            "--repo-root" => {
                global.repo_root = Some(take_value(args, i, a)?);
                i += 2;
            }
            "--config" => {
                global.config = Some(take_value(args, i, a)?);
                i += 2;
            }
            "--vendor-dir" => {
                global.vendor_dir = Some(take_value(args, i, a)?);
                i += 2;
            }
            "-q" | "--quiet" => {
                global.quiet = true;
                i += 1;
            }
            "--vendor" => {
                vendor = true;
                i += 1;
            }
            "--github-outputs" => {
                github_outputs = true;
                i += 1;
            }
            "help" | "--help" | "-h" if command_name.is_none() => return Ok(Parsed::Help),
            "version" | "--version" | "-V" if command_name.is_none() => {
                return Ok(Parsed::Version);
            }
            _ if a.starts_with('-') => return Err(format!("unknown flag: {a}")),
            _ if command_name.is_none() => {
                command_name = Some(a.to_string());
                i += 1;
            }
            _ => {
                positional.push(a.to_string());
                i += 1;
            }
        }
    }

    let command = match command_name.as_deref() {
        Some("update") => {
            if vendor {
                return Err("--vendor is only valid for check".to_string());
            }
            if positional.len() > 1 {
                return Err(format!("unexpected argument: {}", positional[1]));
            }
            Command::Update {
                version: positional.into_iter().next(),
                github_outputs,
            }
        }
        Some("check") => {
            if let Some(extra) = positional.first() {
                return Err(format!("unexpected argument: {extra}"));
            }
            Command::Check {
                vendor,
                github_outputs,
            }
        }
        Some(other) => return Err(format!("unknown command `{other}`; use update|check")),
        None => return Err("missing command; use update|check".to_string()),
    };

    Ok(Parsed::Run(Cli { global, command }))
}

fn load_config(global: &GlobalOptions) -> Result<VendorConfig, VendorError> {
    let repo_root = default_repo_root(global.repo_root.clone());
    let explicit = global.config.as_ref().map(PathBuf::from);
    let mut config = VendorConfig::load(&repo_root, explicit.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(dir) = &global.vendor_dir {
        config.vendor_dir = PathBuf::from(dir);
    }
    Ok(config.resolved_against(&repo_root))
}

/// Run a parsed command and return the process exit code.
pub(crate) fn run_cli(cli: Cli) -> Result<i32, VendorError> {
    let updater = VendorUpdater::with_npm(load_config(&cli.global)?);
    let (outcome, github_outputs): (CommandOutcome, bool) = match cli.command {
        Command::Update {
            version,
            github_outputs,
        } => (update_command(&updater, version.as_deref())?, github_outputs),
        Command::Check {
            vendor,
            github_outputs,
        } => (check_command(&updater, vendor)?, github_outputs),
    };

    if github_outputs {
        outcome.write_github_outputs()?;
    }
    if let Some(version) = &outcome.version {
        println!("{version}");
    }
    Ok(outcome.exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn run_of(parsed: Parsed) -> Cli {
        match parsed {
            Parsed::Run(cli) => cli,
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn update_defaults_to_no_explicit_version() {
        let cli = run_of(parse_cli(&args(&["update"])).expect("parse"));
        assert_eq!(
            cli.command,
            Command::Update {
                version: None,
                github_outputs: false
            }
        );
        assert_eq!(cli.global, GlobalOptions::default());
    }

    #[test]
    fn update_with_version_and_global_flags_in_any_position() {
        let cli = run_of(
            parse_cli(&args(&[
                "--repo-root",
                "/repo",
                "update",
                "50.1.0",
                "--github-outputs",
                "--vendor-dir",
                "out/vendor",
                "-q",
            ]))
            .expect("parse"),
        );
        assert_eq!(
            cli.command,
            Command::Update {
                version: Some("50.1.0".to_string()),
                github_outputs: true
            }
        );
        assert_eq!(cli.global.repo_root.as_deref(), Some("/repo"));
        assert_eq!(cli.global.vendor_dir.as_deref(), Some("out/vendor"));
        assert!(cli.global.quiet);
    }

    #[test]
    fn check_accepts_vendor_flag() {
        let cli = run_of(parse_cli(&args(&["check", "--vendor", "--github-outputs"])).expect("parse"));
        assert_eq!(
            cli.command,
            Command::Check {
                vendor: true,
                github_outputs: true
            }
        );
    }

    #[test]
    fn help_and_version_short_circuit() {
        assert_eq!(parse_cli(&args(&["help"])).expect("parse"), Parsed::Help);
        assert_eq!(parse_cli(&args(&["-h"])).expect("parse"), Parsed::Help);
        assert_eq!(parse_cli(&args(&["--version"])).expect("parse"), Parsed::Version);
    }

    #[test]
    fn usage_errors_are_reported() {
        for raw in [
            &[][..],
            &["deploy"][..],
            &["update", "1.0.0", "2.0.0"][..],
            &["update", "--vendor"][..],
            &["check", "extra"][..],
            &["check", "--bogus"][..],
            &["--config"][..],
            &["--repo-root", "--quiet", "update"][..],
        ] {
            assert!(parse_cli(&args(raw)).is_err(), "{raw:?}");
        }
    }
}
