//! CLI command implementations.

pub mod feed;
pub mod login;
pub mod messages;
pub mod social;
pub mod status;

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use sync_client::{EngineConfig, EngineError, MutationCoordinator, Outcome, RestGateway};
use sync_types::MemberId;

use crate::config::{load_engine_config, SessionFile};

/// Everything a command needs to talk to the backend.
pub struct Context {
    /// Engine configuration.
    pub config: EngineConfig,
    /// Authenticated gateway.
    pub gateway: Arc<RestGateway>,
    /// Shared pending-operation guard.
    pub coordinator: MutationCoordinator,
    /// The logged-in member.
    pub viewer: MemberId,
    /// Print JSON instead of text.
    pub json: bool,
}

impl Context {
    /// Load configuration and session from `data_dir`.
    pub async fn open(
        data_dir: &Path,
        config_path: Option<&Path>,
        base_url: Option<&str>,
        json: bool,
    ) -> Result<Self> {
        let mut config = load_engine_config(data_dir, config_path)?;
        if let Some(url) = base_url {
            config = config.with_base_url(url);
        }
        config.validate().context("Invalid configuration")?;

        let session = SessionFile::load(data_dir).await?;
        let gateway = RestGateway::new(&config, session.session())
            .context("Failed to build HTTP client")?;
        tracing::debug!(base_url = %config.base_url, viewer = %session.viewer, "context ready");

        Ok(Self {
            config,
            gateway: Arc::new(gateway),
            coordinator: MutationCoordinator::new(),
            viewer: session.viewer,
            json,
        })
    }
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Convert an engine failure into a CLI error with a hint.
pub fn engine_error(err: EngineError) -> anyhow::Error {
    if err.is_session_expired() {
        anyhow::anyhow!("{}. Run 'social-sync login' again.", err)
    } else {
        anyhow::Error::new(err)
    }
}

/// Report a guarded action's outcome.
pub fn report<T>(outcome: &Outcome<T>, done: &str) {
    match outcome {
        Outcome::Applied(_) => println!("{}", done),
        Outcome::Ignored => println!("Already in progress, nothing sent."),
    }
}
