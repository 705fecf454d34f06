//! # social-sync
//!
//! Command-line front end for the social-sync engine.
//!
//! ## Commands
//!
//! - `login` / `logout`: Save or forget the session token
//! - `status`: Show configuration and session
//! - `feed`, `like`, `repost`, `post`, `delete-post`: Feed and posts
//! - `comments`, `comment`, `delete-comment`: Comment threads
//! - `requests`, `accept`, `decline`: Friend request inbox
//! - `relationship`, `befriend`, `unfriend`, `follow`, `unfollow`: One member
//! - `friends`, `following`, `followers`: Social lists
//! - `dialogs`, `thread`, `send`, `read`: Conversations
//!
//! ## Example
//!
//! ```bash
//! # Save a session
//! social-sync login --token "$TOKEN" --member 42
//!
//! # Read the feed and like a post
//! social-sync feed --pages 2
//! social-sync like 17
//!
//! # Talk to someone
//! social-sync send 7 "see you at 10"
//! social-sync thread 7 --older 1
//! ```

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::social::{Action, List};
use commands::{feed, login, messages, social, status, Context};

/// Command-line front end for the social-sync engine.
#[derive(Parser, Debug)]
#[command(name = "social-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the saved session and config
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Engine config file (default: social-sync.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save a session token
    Login {
        /// Bearer token issued by the backend
        #[arg(long)]
        token: String,

        /// Your member id
        #[arg(long)]
        member: u64,
    },

    /// Forget the saved session
    Logout,

    /// Show configuration and session
    Status,

    /// Show the feed
    Feed {
        /// Only posts by this member
        #[arg(long)]
        author: Option<u64>,

        /// Number of pages to load
        #[arg(long, default_value = "1")]
        pages: u32,
    },

    /// Like a post, or unlike it if already liked
    Like {
        /// Post id
        post: u64,
    },

    /// Repost a post
    Repost {
        /// Post id
        post: u64,
    },

    /// Publish a post
    Post {
        /// Text of the post
        #[arg(default_value = "")]
        content: String,

        /// Image URL to attach (repeatable)
        #[arg(long = "image")]
        images: Vec<String>,
    },

    /// Delete one of your posts
    DeletePost {
        /// Post id
        post: u64,
    },

    /// Show the comments under a post
    Comments {
        /// Post id
        post: u64,
    },

    /// Comment on a post
    Comment {
        /// Post id
        post: u64,

        /// Comment text
        content: String,
    },

    /// Delete a comment
    DeleteComment {
        /// Post id
        post: u64,

        /// Comment id
        comment: u64,
    },

    /// Show incoming friend requests
    Requests,

    /// Accept a friend request (by request id, or --from a member)
    Accept {
        /// Request id
        #[arg(required_unless_present = "from", conflicts_with = "from")]
        request: Option<u64>,

        /// Accept the pending request from this member
        #[arg(long)]
        from: Option<u64>,
    },

    /// Decline a friend request (by request id, or --from a member)
    Decline {
        /// Request id
        #[arg(required_unless_present = "from", conflicts_with = "from")]
        request: Option<u64>,

        /// Decline the pending request from this member
        #[arg(long)]
        from: Option<u64>,
    },

    /// Show your relationship to a member
    Relationship {
        /// Member id
        member: u64,
    },

    /// Send a friend request
    Befriend {
        /// Member id
        member: u64,
    },

    /// Remove a friend
    Unfriend {
        /// Member id
        member: u64,
    },

    /// Follow a member
    Follow {
        /// Member id
        member: u64,
    },

    /// Stop following a member
    Unfollow {
        /// Member id
        member: u64,
    },

    /// List your friends
    Friends,

    /// List members you follow
    Following,

    /// List members following you
    Followers,

    /// Show your conversations
    Dialogs {
        /// Maximum number of dialogs
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Show the conversation with a member
    Thread {
        /// Member id
        peer: u64,

        /// Extra pages of older messages to load
        #[arg(long, default_value = "0")]
        older: u32,
    },

    /// Send a message
    Send {
        /// Member id
        peer: u64,

        /// Message text
        content: String,
    },

    /// Mark a conversation read
    Read {
        /// Member id
        peer: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("social_sync=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;
    config::set_dir_permissions_0700(&data_dir).await?;

    match cli.command {
        Commands::Login { token, member } => login::run(&data_dir, &token, member).await,
        Commands::Logout => login::logout(&data_dir).await,
        Commands::Status => status::run(&data_dir, cli.config.as_deref()).await,
        command => {
            let ctx = Context::open(
                &data_dir,
                cli.config.as_deref(),
                cli.base_url.as_deref(),
                cli.json,
            )
            .await?;
            dispatch(&ctx, command).await
        }
    }
}

async fn dispatch(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Feed { author, pages } => feed::list(ctx, author, pages).await,
        Commands::Like { post } => feed::like(ctx, post).await,
        Commands::Repost { post } => feed::repost(ctx, post).await,
        Commands::Post { content, images } => feed::create(ctx, &content, images).await,
        Commands::DeletePost { post } => feed::delete(ctx, post).await,
        Commands::Comments { post } => feed::comments(ctx, post).await,
        Commands::Comment { post, content } => feed::comment(ctx, post, &content).await,
        Commands::DeleteComment { post, comment } => feed::uncomment(ctx, post, comment).await,
        Commands::Requests => social::requests(ctx).await,
        Commands::Accept { request, from } => match (request, from) {
            (_, Some(member)) => social::act(ctx, member, Action::Accept).await,
            (Some(request), None) => social::decide(ctx, request, true).await,
            (None, None) => anyhow::bail!("Must specify a request id or --from"),
        },
        Commands::Decline { request, from } => match (request, from) {
            (_, Some(member)) => social::act(ctx, member, Action::Decline).await,
            (Some(request), None) => social::decide(ctx, request, false).await,
            (None, None) => anyhow::bail!("Must specify a request id or --from"),
        },
        Commands::Relationship { member } => social::show(ctx, member).await,
        Commands::Befriend { member } => social::act(ctx, member, Action::Befriend).await,
        Commands::Unfriend { member } => social::act(ctx, member, Action::Unfriend).await,
        Commands::Follow { member } => social::act(ctx, member, Action::Follow).await,
        Commands::Unfollow { member } => social::act(ctx, member, Action::Unfollow).await,
        Commands::Friends => social::list(ctx, List::Friends).await,
        Commands::Following => social::list(ctx, List::Following).await,
        Commands::Followers => social::list(ctx, List::Followers).await,
        Commands::Dialogs { limit } => messages::dialogs(ctx, limit).await,
        Commands::Thread { peer, older } => messages::thread(ctx, peer, older).await,
        Commands::Send { peer, content } => messages::send(ctx, peer, &content).await,
        Commands::Read { peer } => messages::read(ctx, peer).await,
        Commands::Login { .. } | Commands::Logout | Commands::Status => Ok(()),
    }
}

/// Get the default data directory for social-sync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "social-sync", "social-sync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn accept_takes_request_or_member() {
        let cli = Cli::try_parse_from(["social-sync", "accept", "9"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Accept {
                request: Some(9),
                from: None
            }
        ));

        let cli = Cli::try_parse_from(["social-sync", "accept", "--from", "42"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Accept {
                request: None,
                from: Some(42)
            }
        ));

        assert!(Cli::try_parse_from(["social-sync", "accept"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["social-sync", "feed", "--json", "--pages", "3"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Feed {
                author: None,
                pages: 3
            }
        ));
    }

    #[test]
    fn post_collects_images() {
        let cli = Cli::try_parse_from([
            "social-sync",
            "post",
            "--image",
            "a.png",
            "--image",
            "b.png",
        ])
        .unwrap();
        let Commands::Post { content, images } = cli.command else {
            panic!("expected post");
        };
        assert!(content.is_empty());
        assert_eq!(images, vec!["a.png", "b.png"]);
    }
}
