//! Feed, post and comment commands.

use anyhow::Result;
use sync_client::{CommentThread, Feed, Outcome, RestGateway};
use sync_types::{Comment, CommentId, MemberId, Post, PostId};

use super::{engine_error, print_json, report, Context};

fn feed(ctx: &Context, author: Option<u64>) -> Feed<RestGateway> {
    let gateway = ctx.gateway.clone();
    match author {
        Some(author) => Feed::for_author(
            gateway,
            ctx.coordinator.clone(),
            &ctx.config,
            MemberId::new(author),
        ),
        None => Feed::new(gateway, ctx.coordinator.clone(), &ctx.config),
    }
}

/// Show the feed, `pages` pages deep.
pub async fn list(ctx: &Context, author: Option<u64>, pages: u32) -> Result<()> {
    let feed = feed(ctx, author);
    let mut snapshot = feed.load_first().await.map_err(engine_error)?;
    for _ in 1..pages.max(1) {
        if !snapshot.has_more {
            break;
        }
        snapshot = feed.load_more().await.map_err(engine_error)?;
    }

    if ctx.json {
        return print_json(&snapshot);
    }
    for post in &snapshot.items {
        println!("{}", post_line(post));
    }
    println!();
    println!(
        "{} of {} posts{}",
        snapshot.items.len(),
        snapshot.total_count,
        if snapshot.has_more { " (more available)" } else { "" }
    );
    Ok(())
}

/// Like or unlike a post.
pub async fn like(ctx: &Context, post: u64) -> Result<()> {
    let feed = load_containing(ctx, PostId::new(post)).await?;
    let outcome = feed
        .toggle_like(PostId::new(post))
        .await
        .map_err(engine_error)?;
    let done = match &outcome {
        Outcome::Applied(updated) => {
            let verb = if updated.is_liked { "Liked" } else { "Unliked" };
            format!("{} post {} ({} likes).", verb, post, updated.likes_count)
        }
        Outcome::Ignored => String::new(),
    };
    report(&outcome, &done);
    Ok(())
}

/// Repost a post.
pub async fn repost(ctx: &Context, post: u64) -> Result<()> {
    let feed = load_containing(ctx, PostId::new(post)).await?;
    let outcome = feed.repost(PostId::new(post)).await.map_err(engine_error)?;
    report(&outcome, &format!("Reposted post {}.", post));
    Ok(())
}

/// Publish a post.
pub async fn create(ctx: &Context, content: &str, images: Vec<String>) -> Result<()> {
    let feed = feed(ctx, None);
    let post = feed
        .create_post(content, images, Vec::new())
        .await
        .map_err(engine_error)?;
    if ctx.json {
        return print_json(&post);
    }
    println!("Published post {}.", post.id);
    Ok(())
}

/// Delete a post.
pub async fn delete(ctx: &Context, post: u64) -> Result<()> {
    let feed = feed(ctx, None);
    let outcome = feed
        .delete_post(PostId::new(post))
        .await
        .map_err(engine_error)?;
    report(&outcome, &format!("Deleted post {}.", post));
    Ok(())
}

/// Show the comments under a post.
pub async fn comments(ctx: &Context, post: u64) -> Result<()> {
    let thread = thread(ctx, post);
    let mut snapshot = thread.load_first().await.map_err(engine_error)?;
    while snapshot.has_more {
        snapshot = thread.load_more().await.map_err(engine_error)?;
    }

    if ctx.json {
        return print_json(&snapshot);
    }
    for comment in &snapshot.items {
        println!("{}", comment_line(comment));
    }
    println!();
    println!("{} comments", snapshot.items.len());
    Ok(())
}

/// Add a comment to a post.
pub async fn comment(ctx: &Context, post: u64, content: &str) -> Result<()> {
    let comment = thread(ctx, post)
        .add_comment(content)
        .await
        .map_err(engine_error)?;
    if ctx.json {
        return print_json(&comment);
    }
    println!("Added comment {} to post {}.", comment.id, post);
    Ok(())
}

/// Delete a comment.
pub async fn uncomment(ctx: &Context, post: u64, comment: u64) -> Result<()> {
    let outcome = thread(ctx, post)
        .delete_comment(CommentId::new(comment))
        .await
        .map_err(engine_error)?;
    report(&outcome, &format!("Deleted comment {}.", comment));
    Ok(())
}

fn thread(ctx: &Context, post: u64) -> CommentThread<RestGateway> {
    CommentThread::new(
        ctx.gateway.clone(),
        ctx.coordinator.clone(),
        &ctx.config,
        PostId::new(post),
    )
}

// Page through the feed until the post is loaded; like and repost need the
// current flags.
async fn load_containing(ctx: &Context, post: PostId) -> Result<Feed<RestGateway>> {
    let feed = feed(ctx, None);
    let mut snapshot = feed.load_first().await.map_err(engine_error)?;
    while feed.get(post).await.is_none() {
        if !snapshot.has_more {
            anyhow::bail!("Post {} not found in the feed", post);
        }
        snapshot = feed.load_more().await.map_err(engine_error)?;
    }
    Ok(feed)
}

fn post_line(post: &Post) -> String {
    let liked = if post.is_liked { "*" } else { " " };
    format!(
        "[{}] {} {}: {}  ({}{} likes, {} comments, {} reposts)",
        post.id,
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.author.display_name(),
        post.content.replace('\n', " "),
        liked,
        post.likes_count,
        post.comments_count,
        post.reposts_count
    )
}

fn comment_line(comment: &Comment) -> String {
    format!(
        "[{}] {}: {}",
        comment.id,
        comment.author.display_name(),
        comment.content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sync_types::Member;

    #[test]
    fn post_line_marks_liked() {
        let mut author = Member::new(MemberId::new(1), "ann");
        author.first_name = "Ann".into();
        let post = Post {
            id: PostId::new(3),
            author,
            content: "hello\nworld".into(),
            images: vec![],
            videos: vec![],
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            likes_count: 2,
            comments_count: 1,
            reposts_count: 0,
            is_liked: true,
        };

        let line = post_line(&post);

        assert!(line.starts_with("[3] 2024-03-01 10:00 Ann: hello world"));
        assert!(line.contains("*2 likes"));
    }
}
