//! Conversation commands.

use anyhow::Result;
use chrono::{FixedOffset, Utc};
use sync_client::{ConversationStore, RestGateway};
use sync_core::TimelineEntry;
use sync_types::{Dialog, Member, MemberId, Message};

use super::{engine_error, print_json, Context};

fn store(ctx: &Context) -> Result<ConversationStore<RestGateway>> {
    ConversationStore::new(ctx.gateway.clone(), &ctx.config).map_err(engine_error)
}

/// Show the dialog list.
pub async fn dialogs(ctx: &Context, limit: Option<u64>) -> Result<()> {
    let store = store(ctx)?;
    let limit = limit.unwrap_or(ctx.config.dialog_page_size);
    let dialogs = store.load_dialogs(limit).await.map_err(engine_error)?;

    if ctx.json {
        return print_json(&dialogs);
    }
    let offset = ctx.config.utc_offset()?;
    for dialog in &dialogs {
        println!("{}", dialog_line(dialog, offset));
    }
    println!();
    println!("{} unread", store.total_unread().await);
    Ok(())
}

/// Show the conversation with `peer`, `older` extra pages back.
pub async fn thread(ctx: &Context, peer: u64, older: u32) -> Result<()> {
    let store = store(ctx)?;
    let peer = MemberId::new(peer);
    store.select_dialog(peer).await.map_err(engine_error)?;
    for _ in 0..older {
        if !store.has_more_messages().await {
            break;
        }
        store.load_older().await.map_err(engine_error)?;
    }

    if ctx.json {
        return print_json(&store.messages().await);
    }
    for entry in store.grouped_timeline().await {
        match entry {
            TimelineEntry::DateBoundary(date) => {
                println!("--- {} ---", date.format("%A, %d %B %Y"))
            }
            TimelineEntry::Message(message) => {
                println!("{}", message_line(&message, ctx.viewer))
            }
        }
    }
    if store.has_more_messages().await {
        println!();
        println!("(older messages available, use --older)");
    }
    Ok(())
}

/// Send a message to `peer`.
pub async fn send(ctx: &Context, peer: u64, content: &str) -> Result<()> {
    let store = store(ctx)?;
    let message = store
        .send_message(&Member::new(MemberId::new(peer), ""), content)
        .await
        .map_err(engine_error)?;

    if ctx.json {
        return print_json(&message);
    }
    println!("Sent message {} to {}.", message.id, message.peer_of(ctx.viewer));
    Ok(())
}

/// Mark the conversation with `peer` as read.
pub async fn read(ctx: &Context, peer: u64) -> Result<()> {
    let store = store(ctx)?;
    let unread = store
        .mark_read(MemberId::new(peer))
        .await
        .map_err(engine_error)?;
    println!("Marked conversation with {} read ({} unread).", peer, unread);
    Ok(())
}

fn dialog_line(dialog: &Dialog, offset: FixedOffset) -> String {
    let when = dialog
        .last_activity()
        .map(|t| t.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let text = dialog
        .last_message
        .as_ref()
        .map(|m| preview(&m.content))
        .unwrap_or_default();
    let unread = if dialog.unread_count > 0 {
        format!(" [{} unread]", dialog.unread_count)
    } else {
        String::new()
    };
    format!(
        "{} {} ({}){}: {}",
        when,
        dialog.member.display_name(),
        dialog.member.id,
        unread,
        text
    )
}

fn message_line(message: &Message, viewer: MemberId) -> String {
    let who = if message.sender == viewer {
        "me".to_string()
    } else {
        message.sender.to_string()
    };
    let age = Utc::now().signed_duration_since(message.created_at);
    let stamp = if age.num_hours() < 24 {
        message.created_at.format("%H:%M").to_string()
    } else {
        message.created_at.format("%d.%m %H:%M").to_string()
    };
    format!("{} <{}> {}", stamp, who, message.content)
}

fn preview(content: &str) -> String {
    const MAX: usize = 40;
    let flat = content.replace('\n', " ");
    if flat.chars().count() <= MAX {
        flat
    } else {
        let cut: String = flat.chars().take(MAX).collect();
        format!("{}...", cut)
    }
}
