//! Diagnostic commands.

use crate::commands::credentials::open_store;
use crate::Context;
use clap::Args;
use console::{style, Emoji};
use credvault_core::config::Config;
use credvault_core::error::ConfigError;
use credvault_core::{Credential, CredentialType, Persistence};
use credvault_store::{CredentialError, CredentialStore, MemoryApi};
use std::sync::Arc;

static CHECK: Emoji = Emoji("✓", "+");
static CROSS: Emoji = Emoji("✗", "x");
static WARN: Emoji = Emoji("⚠", "!");

/// Doctor command arguments.
#[derive(Args)]
pub struct DoctorArgs {
    /// Also write, read back and delete a probe credential
    #[arg(long)]
    pub full: bool,
}

/// Write, read back and delete a session-scoped probe credential.
///
/// The credential is removed whether or not the read succeeds.
pub fn probe(store: &CredentialStore) -> anyhow::Result<()> {
    let target = format!("credvault:doctor:{}", std::process::id());
    let credential = Credential::new(&target, CredentialType::Generic)
        .with_secret("probe")
        .with_persistence(Persistence::Session)
        .with_attribute("probe", serde_json::json!(true));

    store.write(&credential)?;
    let read = store.read(&target, CredentialType::Generic);
    let removed = store.delete_if_exists(&target, CredentialType::Generic);

    match read? {
        Some(c) if c.secret_str() == Some("probe") => {}
        Some(_) => anyhow::bail!("probe credential read back with a different secret"),
        None => anyhow::bail!("probe credential vanished after write"),
    }
    if !removed? {
        anyhow::bail!("probe credential vanished before delete");
    }
    Ok(())
}

/// Run the probe against an in-memory store and confirm every buffer was
/// wiped and freed.
pub fn check_handle_discipline() -> anyhow::Result<()> {
    let api = Arc::new(MemoryApi::new());
    let store = CredentialStore::new(api.clone(), Default::default());
    probe(&store)?;

    let stats = api.stats();
    if stats.outstanding() != 0 || stats.unwiped_blobs != 0 || stats.invalid_frees != 0 {
        anyhow::bail!("native buffer discipline violated: {:?}", stats);
    }
    Ok(())
}

/// Run the doctor command.
pub fn run(args: DoctorArgs, ctx: &Context) -> anyhow::Result<()> {
    println!("CredVault Doctor\n");

    let mut errors = 0;
    let mut warnings = 0;

    // Check config
    println!("Checking configuration...");

    match Config::load(&ctx.config_path) {
        Ok(config) => {
            println!("  {} Configuration loaded", style(CHECK).green());

            match config.validate() {
                Ok(_) => {
                    println!("  {} Configuration valid", style(CHECK).green());
                }
                Err(e) => {
                    println!("  {} Configuration invalid: {}", style(CROSS).red(), e);
                    errors += 1;
                }
            }
        }
        Err(ConfigError::NotFound(_)) => {
            println!("  {} Configuration file not found, using defaults", style(WARN).yellow());
            println!("    Run 'credvault config init' to create one");
            warnings += 1;
        }
        Err(e) => {
            println!("  {} Configuration error: {}", style(CROSS).red(), e);
            errors += 1;
        }
    }

    // Check store
    println!("\nChecking credential store...");

    match CredentialStore::native(ctx.config.store.clone()) {
        Ok(_) => {
            println!("  {} Platform credential manager available", style(CHECK).green());
        }
        Err(CredentialError::Unsupported(reason)) => {
            println!("  {} {}; commands use the in-memory store", style(WARN).yellow(), reason);
            warnings += 1;
        }
        Err(e) => {
            println!("  {} Credential store error: {}", style(CROSS).red(), e);
            errors += 1;
        }
    }

    match check_handle_discipline() {
        Ok(()) => println!("  {} Native buffers wiped and freed", style(CHECK).green()),
        Err(e) => {
            println!("  {} {}", style(CROSS).red(), e);
            errors += 1;
        }
    }

    if args.full {
        println!("\nProbing credential store...");
        match open_store(ctx).and_then(|store| probe(&store)) {
            Ok(()) => {
                println!("  {} Write, read and delete succeeded", style(CHECK).green());
            }
            Err(e) => {
                println!("  {} Probe failed: {}", style(CROSS).red(), e);
                errors += 1;
            }
        }
    }

    // Summary
    println!("\n{}", style("Summary").bold());
    println!("  Errors: {}", if errors > 0 { style(errors).red() } else { style(errors).green() });
    println!("  Warnings: {}", if warnings > 0 { style(warnings).yellow() } else { style(warnings).green() });

    if errors > 0 {
        anyhow::bail!("{} error(s) found", errors);
    }

    Ok(())
}
