//! Credential commands.
//!
//! Provides `credvault set|get|list|delete|parse-user` on top of
//! [`CredentialStore`].

use crate::Context;
use clap::Args;
use credvault_core::{env, Credential, CredentialType, Persistence, SecretString};
use credvault_store::{CredentialError, CredentialStore};
use serde_json::Value;
use tracing::warn;

/// Arguments for `credvault set`.
#[derive(Args)]
pub struct SetArgs {
    /// Target name the credential is stored under
    pub target: String,

    /// Account name (`DOMAIN\user`, `user@domain` or a plain name)
    #[arg(long)]
    pub user: Option<String>,

    /// Secret value (if omitted, prompts for hidden input)
    #[arg(long)]
    pub secret: Option<String>,

    /// Free-form comment
    #[arg(long)]
    pub comment: Option<String>,

    /// Credential type: generic, windows or certificate
    #[arg(long = "type")]
    pub credential_type: Option<CredentialType>,

    /// Persistence: session, local_machine or enterprise
    #[arg(long)]
    pub persist: Option<Persistence>,

    /// Attribute as `key=value`; the value is parsed as JSON, else kept as text
    #[arg(long = "attr", value_name = "KEY=VALUE")]
    pub attrs: Vec<String>,
}

/// Arguments for `credvault get`.
#[derive(Args)]
pub struct GetArgs {
    /// Target name
    pub target: String,

    /// Credential type
    #[arg(long = "type")]
    pub credential_type: Option<CredentialType>,

    /// Print the secret instead of a mask
    #[arg(long)]
    pub show_secret: bool,
}

/// Arguments for `credvault list`.
#[derive(Args)]
pub struct ListArgs {
    /// Target filter; a trailing `*` matches any suffix
    pub filter: Option<String>,
}

/// Arguments for `credvault delete`.
#[derive(Args)]
pub struct DeleteArgs {
    /// Target name
    pub target: String,

    /// Credential type
    #[arg(long = "type")]
    pub credential_type: Option<CredentialType>,

    /// Succeed quietly when the target does not exist
    #[arg(long)]
    pub if_exists: bool,
}

/// Open the platform store, or the in-memory store where there is none.
pub fn open_store(ctx: &Context) -> anyhow::Result<CredentialStore> {
    let config = ctx.config.store.clone();

    if env::get_bool(env::vars::MEMORY_STORE) {
        warn!("using the in-memory store; credentials will not outlive this process");
        return Ok(CredentialStore::in_memory(config));
    }

    match CredentialStore::native(config.clone()) {
        Ok(store) => Ok(store),
        Err(CredentialError::Unsupported(reason)) => {
            warn!(%reason, "falling back to the in-memory store; credentials will not outlive this process");
            Ok(CredentialStore::in_memory(config))
        }
        Err(e) => Err(e.into()),
    }
}

/// Split `key=value` and parse the value as JSON, keeping it as a string
/// when it is not valid JSON.
pub fn parse_attribute(raw: &str) -> anyhow::Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Attribute '{}' is not in key=value form", raw))?;
    if key.is_empty() {
        anyhow::bail!("Attribute '{}' has an empty key", raw);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Build the credential `set` will write.
pub fn build_credential(args: &SetArgs, ctx: &Context, secret: Option<SecretString>) -> anyhow::Result<Credential> {
    let store_config = &ctx.config.store;
    let mut credential = Credential::new(
        &args.target,
        args.credential_type.unwrap_or(store_config.default_type),
    )
    .with_persistence(args.persist.unwrap_or(store_config.default_persistence));

    credential.user_name = args.user.clone();
    credential.comment = args.comment.clone();
    credential.secret = secret;
    for raw in &args.attrs {
        let (key, value) = parse_attribute(raw)?;
        credential.attributes.insert(key, value);
    }
    Ok(credential)
}

/// Run `credvault set`.
pub fn set(args: SetArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = open_store(ctx)?;

    let secret = match &args.secret {
        Some(v) => SecretString::new(v.as_str()),
        None => {
            let prompt = format!("Enter secret for '{}': ", args.target);
            let value = rpassword::prompt_password(prompt)
                .map_err(|e| anyhow::anyhow!("Failed to read secret: {}", e))?;
            SecretString::new(value)
        }
    };
    let secret = (!secret.is_empty()).then_some(secret);

    let credential = build_credential(&args, ctx, secret)?;
    let written = store.write(&credential)?;

    println!(
        "Credential '{}' ({}) stored.",
        written.target_name, written.credential_type
    );
    Ok(())
}

/// Render one credential as `key: value` lines.
pub fn describe(credential: &Credential, show_secret: bool) -> Vec<String> {
    let mut lines = vec![
        format!("target:       {}", credential.target_name),
        format!("type:         {}", credential.credential_type),
        format!("persistence:  {}", credential.persistence),
    ];
    if let Some(user) = &credential.user_name {
        lines.push(format!("user:         {user}"));
    }
    if let Some(comment) = &credential.comment {
        lines.push(format!("comment:      {comment}"));
    }
    if let Some(alias) = &credential.target_alias {
        lines.push(format!("alias:        {alias}"));
    }
    if let Some(written) = credential.last_written {
        lines.push(format!(
            "last written: {}",
            written.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    let secret = match (&credential.secret, show_secret) {
        (None, _) => "(none)".to_string(),
        (Some(secret), true) => secret.expose_secret().to_string(),
        (Some(_), false) => "********".to_string(),
    };
    lines.push(format!("secret:       {secret}"));
    for (key, value) in &credential.attributes {
        lines.push(format!("attr {key} = {value}"));
    }
    lines
}

/// Run `credvault get`.
pub fn get(args: GetArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let credential_type = args
        .credential_type
        .unwrap_or(ctx.config.store.default_type);

    match store.read(&args.target, credential_type)? {
        Some(credential) => {
            for line in describe(&credential, args.show_secret) {
                println!("{line}");
            }
            Ok(())
        }
        None => anyhow::bail!("No {} credential stored for '{}'", credential_type, args.target),
    }
}

/// Run `credvault list`.
pub fn list(args: ListArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = open_store(ctx)?;

    match store.enumerate(args.filter.as_deref())? {
        None => println!("No credentials stored."),
        Some(credentials) => {
            println!("{:<40} {:<12} {:<14} {}", "TARGET", "TYPE", "PERSIST", "USER");
            println!("{}", "-".repeat(80));
            for c in &credentials {
                println!(
                    "{:<40} {:<12} {:<14} {}",
                    c.target_name,
                    c.credential_type.to_string(),
                    c.persistence.to_string(),
                    c.user_name.as_deref().unwrap_or("-")
                );
            }
            println!("\n{} credential(s) total.", credentials.len());
        }
    }
    Ok(())
}

/// Run `credvault delete`.
pub fn delete(args: DeleteArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let credential_type = args
        .credential_type
        .unwrap_or(ctx.config.store.default_type);

    if args.if_exists {
        if store.delete_if_exists(&args.target, credential_type)? {
            println!("Credential '{}' deleted.", args.target);
        } else {
            println!("No credential stored for '{}'.", args.target);
        }
        return Ok(());
    }

    store.delete(&args.target, credential_type)?;
    println!("Credential '{}' deleted.", args.target);
    Ok(())
}

/// Run `credvault parse-user`.
pub fn parse_user(account: &str, ctx: &Context) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let name = store.parse_account_name(account)?;
    println!("user:   {}", name.user);
    println!("domain: {}", name.domain);
    Ok(())
}
