//! Save or forget the session.

use anyhow::Result;
use std::path::Path;
use sync_types::MemberId;

use crate::config::SessionFile;

/// Run the login command.
pub async fn run(data_dir: &Path, token: &str, viewer: u64) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("Token must not be empty");
    }

    let session = SessionFile::new(token, MemberId::new(viewer));
    session.save(data_dir).await?;

    println!("Session saved.");
    println!();
    println!("  Member:   {}", session.viewer);
    println!("  Data dir: {}", data_dir.display());
    println!();
    println!("Try: social-sync feed");

    Ok(())
}

/// Run the logout command.
pub async fn logout(data_dir: &Path) -> Result<()> {
    if SessionFile::remove(data_dir).await? {
        println!("Session removed.");
    } else {
        println!("No saved session.");
    }
    Ok(())
}
