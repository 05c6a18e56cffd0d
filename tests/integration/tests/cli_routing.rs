//! CLI routing integration tests.
//!
//! These drive the library entry point the `credvault` binary uses, with the
//! in-memory store forced through the environment so no platform store is
//! touched.

use clap::error::ErrorKind;
use clap::Parser;
use credvault_cli::{run, Cli, Context};
use credvault_core::config::Config;
use tempfile::TempDir;

fn context(dir: &TempDir) -> Context {
    std::env::set_var("CREDVAULT_MEMORY_STORE", "1");
    Context::load(Some(&dir.path().join("credvault.json5"))).unwrap()
}

fn run_args(ctx: &Context, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["credvault"];
    argv.extend_from_slice(args);
    run(Cli::try_parse_from(argv)?, ctx)
}

#[test]
fn test_cli_help() {
    let err = Cli::try_parse_from(["credvault", "--help"])
        .err()
        .expect("--help should short-circuit parsing");
    assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    let help = err.to_string();
    for command in ["set", "get", "list", "delete", "parse-user", "config"] {
        assert!(help.contains(command), "help should mention '{command}': {help}");
    }
}

#[test]
fn test_cli_unknown_command() {
    assert!(Cli::try_parse_from(["credvault", "nonexistent-command"]).is_err());
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    run_args(&context(&dir), &["version"]).unwrap();
}

#[test]
fn test_cli_set_with_secret_flag() {
    let dir = TempDir::new().unwrap();
    run_args(
        &context(&dir),
        &[
            "set", "svc:api", "--user", "alice", "--secret", "p@ss", "--attr", "n=1",
        ],
    )
    .unwrap();
}

#[test]
fn test_cli_set_rejects_malformed_attribute() {
    let dir = TempDir::new().unwrap();
    let err = run_args(
        &context(&dir),
        &["set", "svc:api", "--secret", "p@ss", "--attr", "oops"],
    )
    .unwrap_err();
    assert!(err.to_string().contains("key=value"), "{err}");
}

#[test]
fn test_cli_set_validation_error_surfaces() {
    let dir = TempDir::new().unwrap();
    let err = run_args(
        &context(&dir),
        &["set", "host", "--type", "windows", "--secret", "pw"],
    )
    .unwrap_err();
    assert!(err.to_string().contains("user_name"), "{err}");
}

#[test]
fn test_cli_get_missing_fails() {
    let dir = TempDir::new().unwrap();
    assert!(run_args(&context(&dir), &["get", "absent"]).is_err());
}

#[test]
fn test_cli_list_empty() {
    let dir = TempDir::new().unwrap();
    run_args(&context(&dir), &["list"]).unwrap();
}

#[test]
fn test_cli_delete_semantics() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    run_args(&ctx, &["delete", "absent", "--if-exists"]).unwrap();
    assert!(run_args(&ctx, &["delete", "absent"]).is_err());
}

#[test]
fn test_cli_parse_user() {
    let dir = TempDir::new().unwrap();
    run_args(&context(&dir), &["parse-user", r"domain.com\mike"]).unwrap();
}

#[test]
fn test_cli_config_init_and_set() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);

    run_args(&ctx, &["config", "init"]).unwrap();
    assert!(ctx.config_path.exists());
    assert!(run_args(&ctx, &["config", "init"]).is_err());
    run_args(&ctx, &["config", "init", "--force"]).unwrap();

    run_args(&ctx, &["config", "set", "store.require_secret", "true"]).unwrap();
    let saved = Config::load(&ctx.config_path).unwrap();
    assert!(saved.store.require_secret);

    run_args(&ctx, &["config", "validate"]).unwrap();
    run_args(&ctx, &["config", "get", "store.max_blob_bytes"]).unwrap();
    assert!(run_args(&ctx, &["config", "get", "store.nope"]).is_err());
}

#[test]
fn test_cli_doctor() {
    let dir = TempDir::new().unwrap();
    run_args(&context(&dir), &["doctor", "--full"]).unwrap();
}
