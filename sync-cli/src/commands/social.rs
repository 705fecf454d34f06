//! Friend request, relationship and social list commands.

use anyhow::Result;
use sync_client::social::{followers, following, friends};
use sync_client::{FriendRequests, Outcome, RelationshipResolver, RestGateway};
use sync_core::{Relationship, RelationshipState};
use sync_types::{Member, MemberId, RequestId};

use super::{engine_error, print_json, report, Context};

/// Relationship-altering actions on one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Send a friend request.
    Befriend,
    /// Accept the member's pending request.
    Accept,
    /// Decline the member's pending request.
    Decline,
    /// End the friendship.
    Unfriend,
    /// Start following.
    Follow,
    /// Stop following.
    Unfollow,
}

/// Show incoming friend requests.
pub async fn requests(ctx: &Context) -> Result<()> {
    let inbox = inbox(ctx);
    let snapshot = inbox.load_first().await.map_err(engine_error)?;

    if ctx.json {
        return print_json(&snapshot);
    }
    if snapshot.items.is_empty() {
        println!("No pending requests.");
        return Ok(());
    }
    for request in &snapshot.items {
        println!(
            "[{}] from {} ({})",
            request.id,
            request.from_member.display_name(),
            request.from_member.id
        );
    }
    Ok(())
}

/// Accept or decline a request from the inbox by request id.
pub async fn decide(ctx: &Context, request: u64, accept: bool) -> Result<()> {
    let inbox = inbox(ctx);
    let mut snapshot = inbox.load_first().await.map_err(engine_error)?;
    let id = RequestId::new(request);
    while !snapshot.items.iter().any(|r| r.id == id) {
        if !snapshot.has_more {
            anyhow::bail!("Request {} is not in the inbox", request);
        }
        snapshot = inbox.load_more().await.map_err(engine_error)?;
    }

    let outcome = if accept {
        inbox.accept(id).await
    } else {
        inbox.decline(id).await
    }
    .map_err(engine_error)?;
    let verb = if accept { "Accepted" } else { "Declined" };
    report(&outcome, &format!("{} request {}.", verb, request));
    Ok(())
}

/// Show the relationship to a member.
pub async fn show(ctx: &Context, member: u64) -> Result<()> {
    let target = lookup_member(ctx, MemberId::new(member)).await?;
    let relationship = resolver(ctx)
        .resolve(&target)
        .await
        .map_err(engine_error)?;

    if ctx.json {
        return print_json(&relationship);
    }
    println!("{}", describe(member, &relationship));
    Ok(())
}

/// Apply a relationship action, then show the re-resolved relationship.
pub async fn act(ctx: &Context, member: u64, action: Action) -> Result<()> {
    let target = lookup_member(ctx, MemberId::new(member)).await?;
    let resolver = resolver(ctx);
    resolver.resolve(&target).await.map_err(engine_error)?;

    let outcome = match action {
        Action::Befriend => resolver.send_request(&target).await,
        Action::Accept => resolver.accept_request(&target).await,
        Action::Decline => resolver.decline_request(&target).await,
        Action::Unfriend => resolver.remove_friend(&target).await,
        Action::Follow => resolver.subscribe(&target).await,
        Action::Unfollow => resolver.unsubscribe(&target).await,
    }
    .map_err(engine_error)?;

    match outcome {
        Outcome::Applied(relationship) if ctx.json => print_json(&relationship)?,
        Outcome::Applied(relationship) => println!("{}", describe(member, &relationship)),
        Outcome::Ignored => report(&outcome, ""),
    }
    Ok(())
}

/// Which social list to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum List {
    /// The viewer's friends.
    Friends,
    /// Members the viewer follows.
    Following,
    /// Members following the viewer.
    Followers,
}

/// Show one social list (first page).
pub async fn list(ctx: &Context, which: List) -> Result<()> {
    let gateway = ctx.gateway.clone();
    let names: Vec<String> = match which {
        List::Friends => {
            let snapshot = friends(gateway, &ctx.config)
                .load_first()
                .await
                .map_err(engine_error)?;
            if ctx.json {
                return print_json(&snapshot);
            }
            snapshot.items.iter().map(member_line).collect()
        }
        List::Following | List::Followers => {
            let collection = if which == List::Following {
                following(gateway, &ctx.config)
            } else {
                followers(gateway, &ctx.config)
            };
            let snapshot = collection.load_first().await.map_err(engine_error)?;
            if ctx.json {
                return print_json(&snapshot);
            }
            snapshot
                .items
                .iter()
                .map(|s| {
                    if which == List::Following {
                        member_line(&s.following)
                    } else {
                        member_line(&s.follower)
                    }
                })
                .collect()
        }
    };

    for name in &names {
        println!("{}", name);
    }
    println!();
    println!("{} members", names.len());
    Ok(())
}

fn inbox(ctx: &Context) -> FriendRequests<RestGateway> {
    FriendRequests::new(ctx.gateway.clone(), ctx.coordinator.clone(), &ctx.config)
}

fn resolver(ctx: &Context) -> RelationshipResolver<RestGateway> {
    RelationshipResolver::new(
        ctx.gateway.clone(),
        ctx.coordinator.clone(),
        ctx.viewer,
        &ctx.config,
    )
}

// The backend has no single-member endpoint the engine reads, so the
// friendship indicator comes from the viewer's friends list.
async fn lookup_member(ctx: &Context, id: MemberId) -> Result<Member> {
    let list = friends(ctx.gateway.clone(), &ctx.config);
    let mut snapshot = list.load_first().await.map_err(engine_error)?;
    loop {
        if let Some(member) = snapshot.items.iter().find(|m| m.id == id) {
            let mut member = member.clone();
            member.is_friend = Some(true);
            return Ok(member);
        }
        if !snapshot.has_more {
            break;
        }
        snapshot = list.load_more().await.map_err(engine_error)?;
    }

    let mut member = Member::new(id, "");
    member.is_friend = Some(false);
    Ok(member)
}

fn member_line(member: &Member) -> String {
    format!("[{}] {} (@{})", member.id, member.display_name(), member.username)
}

fn describe(member: u64, relationship: &Relationship) -> String {
    let state = match relationship.state {
        RelationshipState::None => "no relationship".to_string(),
        RelationshipState::RequestSent { request } => format!("request sent (#{})", request),
        RelationshipState::RequestReceived { request } => {
            format!("request received (#{})", request)
        }
        RelationshipState::Friends => "friends".to_string(),
    };
    let follow = if relationship.is_subscribed {
        "following"
    } else {
        "not following"
    };
    format!("Member {}: {}, {}", member, state, follow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_carries_request_id() {
        let relationship = Relationship {
            state: RelationshipState::RequestReceived {
                request: RequestId::new(9),
            },
            is_subscribed: true,
        };
        assert_eq!(
            describe(42, &relationship),
            "Member 42: request received (#9), following"
        );
    }

    #[test]
    fn describe_none() {
        assert_eq!(
            describe(1, &Relationship::NONE),
            "Member 1: no relationship, not following"
        );
    }

    #[test]
    fn member_line_uses_display_name() {
        let mut member = Member::new(MemberId::new(5), "bob");
        member.last_name = "Builder".into();
        assert_eq!(member_line(&member), "[5] Builder (@bob)");
    }
}
