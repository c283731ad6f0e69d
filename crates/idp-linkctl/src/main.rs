// # idp-linkctl - Identity Provider Link Host
//
// A thin integration layer over idp-link-core:
// 1. Parsing arguments and reading the configuration document
// 2. Initializing logging and the runtime
// 3. Registering directory clients and state stores
// 4. Running one reconciler command
//
// All lifecycle and planning logic lives in idp-link-core.
//
// ## Configuration
//
// - `IDP_LINK_CONFIG`: Path to the JSON configuration (or `--config`)
// - `IDP_LINK_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - AWS credentials and region: the standard AWS default chain (environment,
//   `AWS_PROFILE` and the shared config files, SSO, web identity, ECS, IMDS);
//   `directory.region` and `directory.profile` override it
//
// ## Example
//
// ```bash
// export AWS_REGION=eu-west-1
// export IDP_LINK_CONFIG=/etc/idp-link/links.json
//
// idp-linkctl plan
// idp-linkctl apply
// idp-linkctl import alice_google eu-west-1_AbCdEf:alice:1234567890
// ```

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use idp_link_core::plan::PlannedAction;
use idp_link_core::schema::{ProviderMetadata, link_resource_schema};
use idp_link_core::{
    ApplySummary, ClientRegistry, LinkConfig, LinkController, ReconcileEvent, Reconciler,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Command};

/// Environment variable holding the log level
const LOG_LEVEL_VAR: &str = "IDP_LINK_LOG_LEVEL";

/// Exit codes for different termination scenarios
///
/// - 0: Every resource converged
/// - 1: Configuration or startup error
/// - 2: Runtime error, including any resource that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkExitCode {
    Clean = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<LinkExitCode> for ExitCode {
    fn from(code: LinkExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Resolve the log level; `--debug` wins over the environment
fn log_level(debug: bool, configured: Option<&str>) -> Result<Level> {
    if debug {
        return Ok(Level::DEBUG);
    }

    match configured.map(str::to_lowercase).as_deref() {
        None | Some("info") => Ok(Level::INFO),
        Some("trace") => Ok(Level::TRACE),
        Some("debug") => Ok(Level::DEBUG),
        Some("warn") => Ok(Level::WARN),
        Some("error") => Ok(Level::ERROR),
        Some(other) => anyhow::bail!(
            "{} '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            LOG_LEVEL_VAR,
            other
        ),
    }
}

/// Map a command failure to an exit code
fn exit_code_for(err: &anyhow::Error) -> LinkExitCode {
    match err.downcast_ref::<idp_link_core::Error>() {
        Some(e) if e.is_config() => LinkExitCode::ConfigError,
        _ => LinkExitCode::RuntimeError,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match log_level(cli.debug, std::env::var(LOG_LEVEL_VAR).ok().as_deref()) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return LinkExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return LinkExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return LinkExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(run(cli));

    match result {
        Ok(code) => code.into(),
        Err(e) => {
            error!("{:#}", e);
            exit_code_for(&e).into()
        }
    }
}

/// Run one command
async fn run(cli: Cli) -> Result<LinkExitCode> {
    let metadata = ProviderMetadata::new(env!("CARGO_PKG_VERSION"));

    if !cli.command.needs_config() {
        let document = serde_json::json!({
            "provider": metadata,
            "resources": [link_resource_schema(&metadata)],
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(LinkExitCode::Clean);
    }

    let path = cli.config.clone().ok_or_else(|| {
        idp_link_core::Error::config("no configuration given; use --config or IDP_LINK_CONFIG")
    })?;
    let config = LinkConfig::load(&path).await?;
    config.validate()?;

    info!(
        "Serving {} as {} ({} declared link(s))",
        metadata.link_resource_type(),
        metadata.address,
        config.links.len()
    );

    let registry = ClientRegistry::with_builtin_state_stores();
    #[cfg(feature = "cognito")]
    idp_link_cognito::register(&registry);

    let client = registry.create_directory(&config.directory).await?;
    let state_store = registry.create_state_store(&config.state_store).await?;
    let controller = LinkController::from_config(client, &config.controller);

    let (reconciler, events) =
        Reconciler::new(Arc::new(controller), state_store, &config.controller);
    let event_log = tokio::spawn(log_events(events));

    let outcome = execute(&cli.command, &reconciler, &config).await;

    // Closing the channel ends the event log task.
    drop(reconciler);
    if let Err(e) = event_log.await {
        warn!("Event log task failed: {}", e);
    }

    outcome
}

async fn execute(
    command: &Command,
    reconciler: &Reconciler,
    config: &LinkConfig,
) -> Result<LinkExitCode> {
    match command {
        Command::Schema => Ok(LinkExitCode::Clean),
        Command::Plan => {
            let changes = reconciler.plan(&config.links).await?;
            if changes.is_empty() {
                println!("No links declared or managed.");
            }
            for change in &changes {
                println!("{}", describe(&change.name, &change.action));
            }
            Ok(LinkExitCode::Clean)
        }
        Command::Apply => {
            let summary = reconciler.apply(&config.links).await?;
            Ok(report(&summary))
        }
        Command::Refresh => {
            let dropped = reconciler.refresh().await?;
            for name in &dropped {
                println!("- {} dropped from state (not found)", name);
            }
            println!("Refresh complete: {} dropped.", dropped.len());
            Ok(LinkExitCode::Clean)
        }
        Command::Destroy => {
            let summary = reconciler.destroy().await?;
            Ok(report(&summary))
        }
        Command::Import { name, id } => {
            reconciler
                .import(name, id)
                .await
                .with_context(|| format!("Unable to import {}", name))?;
            println!("Imported {} as {}.", id, name);
            Ok(LinkExitCode::Clean)
        }
    }
}

fn describe(name: &str, action: &PlannedAction) -> String {
    match action {
        PlannedAction::Create => format!("+ {} (create)", name),
        PlannedAction::NoOp => format!("  {} (no changes)", name),
        PlannedAction::Adopt => format!("  {} (adopt imported link)", name),
        PlannedAction::Replace { changed } => {
            format!("-/+ {} (replace: {})", name, changed.join(", "))
        }
        PlannedAction::Delete => format!("- {} (delete)", name),
    }
}

fn report(summary: &ApplySummary) -> LinkExitCode {
    println!(
        "{} created, {} replaced, {} deleted, {} adopted, {} unchanged, {} dropped, {} failed.",
        summary.created.len(),
        summary.replaced.len(),
        summary.deleted.len(),
        summary.adopted.len(),
        summary.unchanged.len(),
        summary.dropped.len(),
        summary.failed.len()
    );

    for failure in &summary.failed {
        eprintln!("{}: {}", failure.name, failure.error);
    }

    if summary.is_success() {
        LinkExitCode::Clean
    } else {
        LinkExitCode::RuntimeError
    }
}

async fn log_events(mut events: mpsc::Receiver<ReconcileEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ReconcileEvent::Failed {
                name,
                operation,
                error,
            } => warn!("{} {} failed: {}", name, operation, error),
            other => info!("{:?}", other),
        }
    }
}
