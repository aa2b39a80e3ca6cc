//! async-select - command line front end
//!
//! Normalizes option lists, runs remote searches through the same component
//! state machine an embedded select uses, and signs or verifies internal
//! request tokens.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{debug, info};

use async_select::auth::{self, InternalAuthenticator, InternalRequest, InternalSigner};
use async_select::{
    logging, normalize, AppError, FieldConfig, HttpRemoteSource, RawOptions, Result,
    SelectConfig, SelectRuntime, Settings,
};

#[derive(Debug, Parser)]
#[command(name = "async-select", version, about = "Select option loading and search tools")]
struct Cli {
    /// Log filter directives, e.g. `async_select=debug`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Normalize a JSON option list into canonical records.
    Normalize(NormalizeArgs),
    /// Search a remote endpoint and print the loaded options.
    Search(SearchArgs),
    /// Issue an internal auth token.
    Sign(SignArgs),
    /// Check an internal auth token against a request.
    Verify(VerifyArgs),
}

#[derive(Debug, clap::Args)]
struct NormalizeArgs {
    /// JSON file to read; stdin when omitted.
    file: Option<PathBuf>,
    /// Field holding the option value.
    #[arg(long)]
    value_field: Option<String>,
    /// Field holding the option label.
    #[arg(long)]
    label_field: Option<String>,
    /// Field holding the option image.
    #[arg(long)]
    image_field: Option<String>,
}

#[derive(Debug, clap::Args)]
struct SearchArgs {
    /// Endpoint URL, absolute or root-relative with --base-url.
    endpoint: String,
    /// Search string; the default set is loaded when omitted.
    #[arg(default_value = "")]
    query: String,
    /// Load pages up to this one.
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Page size.
    #[arg(long)]
    per_page: Option<u32>,
    /// Extra query parameter, repeatable.
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    params: Vec<(String, String)>,
    /// Base URL for root-relative endpoints.
    #[arg(long)]
    base_url: Option<String>,
    /// Sign requests as this user id.
    #[arg(long)]
    uid: Option<String>,
    /// Permission claim for signed requests, repeatable.
    #[arg(long = "perm")]
    perms: Vec<String>,
}

#[derive(Debug, clap::Args)]
struct SignArgs {
    /// User id to embed.
    #[arg(long)]
    uid: String,
    #[arg(long, default_value = "GET")]
    method: String,
    /// Request path to bind, e.g. `/api/users`.
    #[arg(long)]
    path: Option<String>,
    /// Scheme and host to bind, e.g. `https://app.example.com`.
    #[arg(long)]
    host: Option<String>,
    /// Request body to bind.
    #[arg(long)]
    body: Option<String>,
    /// Permission claim, repeatable.
    #[arg(long = "perm")]
    perms: Vec<String>,
    /// Shared secret; falls back to the configured one.
    #[arg(long)]
    secret: Option<String>,
}

#[derive(Debug, clap::Args)]
struct VerifyArgs {
    /// Token as sent in the X-Internal-User header.
    token: String,
    #[arg(long, default_value = "GET")]
    method: String,
    #[arg(long, default_value = "/")]
    path: String,
    #[arg(long, default_value = "")]
    host: String,
    #[arg(long)]
    body: Option<String>,
    /// Shared secret; falls back to the configured one.
    #[arg(long)]
    secret: Option<String>,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", s))?;
    if key.is_empty() {
        return Err(format!("empty key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_level.as_deref()) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli.command).await {
        tracing::error!(error = %e, critical = e.is_critical(), "Command failed");
        eprintln!("Error: {}", failure_message(&e));
        std::process::exit(1);
    }
}

/// Message printed for a failed command.
fn failure_message(error: &AppError) -> String {
    let message = error.user_message();
    if error.is_recoverable() {
        format!("{} The request can be retried.", message)
    } else {
        message
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Normalize(args) => run_normalize(args),
        Command::Search(args) => run_search(args).await,
        Command::Sign(args) => run_sign(args),
        Command::Verify(args) => run_verify(args),
    }
}

fn run_normalize(args: NormalizeArgs) -> Result<()> {
    let input = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let value: Value = serde_json::from_str(&input)?;

    let mut fields = FieldConfig::auto();
    if let Some(field) = args.value_field {
        fields = fields.with_value_field(field);
    }
    if let Some(field) = args.label_field {
        fields = fields.with_label_field(field);
    }
    if let Some(field) = args.image_field {
        fields = fields.with_image_field(field);
    }

    let table = normalize(&RawOptions::from_json(value), &fields);
    debug!(count = table.len(), "Normalized options");
    let records: Vec<_> = table.values().collect();
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn run_search(args: SearchArgs) -> Result<()> {
    let settings = Settings::load()?;

    let mut config = SelectConfig::from_settings(&settings)
        .with_endpoint(args.endpoint.clone())
        .with_min_search_length(0)
        .with_debounce(Duration::ZERO)
        .with_autoload(args.query.is_empty());
    if let Some(per_page) = args.per_page {
        config = config.with_per_page(per_page);
    }
    for (key, value) in args.params {
        config = config.with_extra_param(key, value);
    }

    let mut source = HttpRemoteSource::with_timeout(Duration::from_secs(settings.timeout_secs))?;
    if let Some(base_url) = args.base_url.as_deref().or(settings.base_url.as_deref()) {
        source = source.with_base_url(base_url);
    }
    if let Some(uid) = args.uid {
        let Some(secret) = settings.internal.secret.clone() else {
            return Err(AppError::other(
                "--uid requires internal.secret in the configuration",
            ));
        };
        source = source.with_signer(InternalSigner::new(secret, uid).with_permissions(args.perms));
    }

    let mut runtime = SelectRuntime::start(config, source)?;
    if !args.query.is_empty() {
        let query = args.query.clone();
        runtime.apply(|select| select.set_search(&query));
    }
    runtime.settle().await;

    loop {
        let before = runtime.select().search_state();
        if before.page >= args.page || !before.has_more {
            break;
        }
        runtime.apply(|select| select.load_more());
        runtime.settle().await;
        if runtime.select().search_state().page <= before.page {
            break;
        }
    }

    let select = runtime.into_select();
    let state = select.search_state();
    if let Some(error) = state.error {
        return Err(AppError::Other(error));
    }

    info!(
        endpoint = %args.endpoint,
        page = state.page,
        count = select.display_options().len(),
        "Search finished"
    );
    let output = json!({
        "records": select.display_options(),
        "page": state.page,
        "has_more": state.has_more,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn configured_secret(secret: Option<String>) -> Result<String> {
    if let Some(secret) = secret {
        return Ok(secret);
    }
    Settings::load()?
        .internal
        .secret
        .ok_or_else(|| AppError::other("No secret given and internal.secret is not configured"))
}

fn run_sign(args: SignArgs) -> Result<()> {
    let secret = configured_secret(args.secret)?;
    let signer = InternalSigner::new(secret, args.uid).with_permissions(args.perms);
    let body = args.body.unwrap_or_default();
    let request = InternalRequest {
        method: &args.method,
        path: args.path.as_deref().unwrap_or("/"),
        host: args.host.as_deref().unwrap_or(""),
        body: body.as_bytes(),
    };
    println!("{}", signer.sign(&request, auth::unix_now())?);
    Ok(())
}

fn run_verify(args: VerifyArgs) -> Result<()> {
    let skew_secs = Settings::load()?.internal.skew_secs;
    let secret = configured_secret(args.secret)?;
    let authenticator = InternalAuthenticator::new(secret).with_skew(skew_secs);
    let body = args.body.unwrap_or_default();
    let request = InternalRequest {
        method: &args.method,
        path: &args.path,
        host: &args.host,
        body: body.as_bytes(),
    };

    match authenticator.authenticate(Some(args.token.as_str()), &request, auth::unix_now())? {
        Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
        None => return Err(AppError::other("Token was empty")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("status=active").unwrap(),
            ("status".to_string(), "active".to_string())
        );
        assert_eq!(
            parse_key_val("filter=a=b").unwrap(),
            ("filter".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "async-select",
            "search",
            "https://example.com/api/users",
            "ali",
            "--page",
            "2",
            "--param",
            "team=7",
        ])
        .unwrap();
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "ali");
                assert_eq!(args.page, 2);
                assert_eq!(args.params, vec![("team".to_string(), "7".to_string())]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_failure_message_uses_user_message() {
        use async_select::config::ConfigError;
        use async_select::RemoteError;

        let err = AppError::from(RemoteError::RateLimited);
        let message = failure_message(&err);
        assert!(message.starts_with(&err.user_message()));
        assert!(message.ends_with("The request can be retried."));

        let err = AppError::from(ConfigError::ValidationError("per_page must be greater than zero".to_string()));
        assert_eq!(
            failure_message(&err),
            "Configuration error: per_page must be greater than zero"
        );
    }

    #[test]
    fn test_failure_message_for_missing_file() {
        let err = run_normalize(NormalizeArgs {
            file: Some(PathBuf::from("/nonexistent/options.json")),
            value_field: None,
            label_field: None,
            image_field: None,
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(
            failure_message(&err),
            "A file operation failed. Please check file permissions."
        );
    }

    #[test]
    fn test_configured_secret_prefers_argument() {
        assert_eq!(configured_secret(Some("s".to_string())).unwrap(), "s");
    }
}
