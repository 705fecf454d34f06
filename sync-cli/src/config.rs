//! Local state for the social-sync CLI.
//!
//! The data directory holds the saved session (`session.json`, 0600) and,
//! optionally, the engine configuration (`social-sync.toml`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sync_client::{EngineConfig, Session, DEFAULT_CONFIG_FILE};
use sync_types::MemberId;

const SESSION_FILE: &str = "session.json";

/// Environment variable that overrides the saved token.
pub const TOKEN_ENV: &str = "SOCIAL_SYNC_TOKEN";

/// Saved login.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionFile {
    /// Bearer token for the backend.
    pub token: String,
    /// The logged-in member.
    pub viewer: MemberId,
    /// When the session was saved (Unix seconds).
    pub saved_at: u64,
}

impl std::fmt::Debug for SessionFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFile")
            .field("token", &"[REDACTED]")
            .field("viewer", &self.viewer)
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

impl SessionFile {
    /// Create a session record stamped with the current time.
    pub fn new(token: &str, viewer: MemberId) -> Self {
        Self {
            token: token.to_string(),
            viewer,
            saved_at: now_secs(),
        }
    }

    /// Load the saved session from a directory.
    ///
    /// A token in the environment replaces the saved one.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(SESSION_FILE);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .context("Not logged in. Run 'social-sync login' first.")?;
        let mut session: Self =
            serde_json::from_str(&contents).context("Invalid session file")?;
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                session.token = token;
            }
        }
        Ok(session)
    }

    /// Save the session to a directory.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(SESSION_FILE);
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save session")?;
        set_file_permissions_0600(&path).await?;
        Ok(())
    }

    /// Delete the saved session. Returns false if there was none.
    pub async fn remove(data_dir: &Path) -> Result<bool> {
        let path = data_dir.join(SESSION_FILE);
        if !path.exists() {
            return Ok(false);
        }
        tokio::fs::remove_file(&path)
            .await
            .context("Failed to remove session")?;
        Ok(true)
    }

    /// Check if a session is saved.
    pub async fn exists(data_dir: &Path) -> bool {
        data_dir.join(SESSION_FILE).exists()
    }

    /// The gateway credential.
    pub fn session(&self) -> Session {
        Session::new(&self.token)
    }
}

/// Resolve the engine configuration.
///
/// An explicit path must exist. Otherwise `social-sync.toml` in the data
/// directory is used when present, and the defaults when not.
pub fn load_engine_config(data_dir: &Path, explicit: Option<&Path>) -> Result<EngineConfig> {
    let path: PathBuf = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = data_dir.join(DEFAULT_CONFIG_FILE);
            if !path.exists() {
                tracing::debug!("no config file, using defaults");
                return Ok(EngineConfig::default());
            }
            path
        }
    };
    EngineConfig::load(&path).with_context(|| format!("Failed to load {}", path.display()))
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .context("Failed to set file permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
