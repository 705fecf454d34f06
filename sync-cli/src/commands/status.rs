//! Show local configuration and session.

use anyhow::Result;
use std::path::Path;

use crate::config::{load_engine_config, SessionFile};

/// Run the status command.
pub async fn run(data_dir: &Path, config_path: Option<&Path>) -> Result<()> {
    println!("=== social-sync status ===");
    println!();

    let config = load_engine_config(data_dir, config_path)?;
    println!("Backend:");
    println!("  URL:      {}", config.base_url);
    println!("  Timeout:  {}s", config.request_timeout_secs);
    println!(
        "  Pages:    feed {}, comments {}, dialogs {}, messages {}",
        config.feed_page_size,
        config.comment_page_size,
        config.dialog_page_size,
        config.message_page_size
    );
    println!();

    if SessionFile::exists(data_dir).await {
        let session = SessionFile::load(data_dir).await?;
        println!("Session:");
        println!("  Member: {}", session.viewer);
        println!("  Saved:  {}", format_timestamp(session.saved_at));
    } else {
        println!("Session: NOT LOGGED IN");
        println!();
        println!("Run 'social-sync login --token <token> --member <id>'.");
    }

    Ok(())
}

/// Format a Unix timestamp relative to now.
fn format_timestamp(ts: u64) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(ts);

    let diff = now.saturating_sub(ts);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn status_without_session_succeeds() {
        let dir = tempdir().unwrap();
        run(dir.path(), None).await.unwrap();
    }

    #[test]
    fn timestamps_are_relative() {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert_eq!(format_timestamp(now), "just now");
        assert_eq!(format_timestamp(now - 120), "2 minutes ago");
        assert_eq!(format_timestamp(now - 7200), "2 hours ago");
        assert_eq!(format_timestamp(now - 3 * 86400), "3 days ago");
    }
}
