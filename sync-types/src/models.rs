//! Domain records returned by the backend.
//!
//! Records are immutable once fetched. Mutations never edit a record in
//! place; the owning collection replaces it by identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

use crate::{CommentId, MemberId, MessageId, PostId, RequestId, SubscriptionId};

/// A record with a stable unique identifier.
///
/// Collection windows use this to keep their sequences free of duplicates
/// and to replace or remove items by identity.
pub trait Identified {
    /// The identifier type.
    type Id: Copy + Eq + Hash + Debug + Send + Sync;

    /// The record's identifier.
    fn id(&self) -> Self::Id;
}

/// A member profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member identifier.
    pub id: MemberId,
    /// Unique login name.
    pub username: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Free-form biography.
    #[serde(default)]
    pub bio: String,
    /// Presence flag as last reported.
    #[serde(default)]
    pub is_online: bool,
    /// Number of accepted friendships.
    #[serde(default)]
    pub friends_count: u32,
    /// Number of members following this one.
    #[serde(default)]
    pub followers_count: u32,
    /// Number of members this one follows.
    #[serde(default)]
    pub following_count: u32,
    /// Friendship with the viewer, when the backend reports it.
    #[serde(default)]
    pub is_friend: Option<bool>,
}

impl Member {
    /// Minimal member record (used when only identity is known).
    pub fn new(id: MemberId, username: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            avatar_url: None,
            bio: String::new(),
            is_online: false,
            friends_count: 0,
            followers_count: 0,
            following_count: 0,
            is_friend: None,
        }
    }

    /// "First Last", falling back to the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// The friendship indicator for this member as seen by the viewer.
    ///
    /// Uses the explicit flag when present. Older backends report no
    /// viewer-specific flag, only the member's friend count, so the
    /// fallback reads any member with at least one friend as a friend of
    /// the viewer. Callers that know better (e.g. from the viewer's friends
    /// list) should set `is_friend`.
    pub fn friendship_hint(&self) -> bool {
        self.is_friend.unwrap_or(self.friends_count > 0)
    }
}

impl Identified for Member {
    type Id = MemberId;

    fn id(&self) -> MemberId {
        self.id
    }
}

/// A feed post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post identifier.
    pub id: PostId,
    /// Author profile.
    pub author: Member,
    /// Text body.
    #[serde(default)]
    pub content: String,
    /// Attached image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    /// Attached video URLs.
    #[serde(default)]
    pub videos: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Number of likes.
    #[serde(default)]
    pub likes_count: u32,
    /// Number of comments.
    #[serde(default)]
    pub comments_count: u32,
    /// Number of reposts.
    #[serde(default)]
    pub reposts_count: u32,
    /// Whether the viewer has liked this post.
    #[serde(default, alias = "is_liked_by_user")]
    pub is_liked: bool,
}

impl Identified for Post {
    type Id = PostId;

    fn id(&self) -> PostId {
        self.id
    }
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment identifier.
    pub id: CommentId,
    /// Author profile.
    pub author: Member,
    /// The post this comment belongs to.
    pub post: PostId,
    /// Text body.
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Identified for Comment {
    type Id = CommentId;

    fn id(&self) -> CommentId {
        self.id
    }
}

/// Lifecycle of a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Awaiting the recipient's decision.
    Pending,
    /// Accepted; a friendship exists.
    Accepted,
    /// Declined by the recipient.
    #[serde(alias = "declined")]
    Rejected,
}

/// A friend request between two members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    /// Request identifier.
    pub id: RequestId,
    /// Sender.
    pub from_member: Member,
    /// Recipient.
    pub to_member: Member,
    /// Current status.
    pub status: RequestStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl FriendRequest {
    /// Whether the request is still awaiting a decision.
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

impl Identified for FriendRequest {
    type Id = RequestId;

    fn id(&self) -> RequestId {
        self.id
    }
}

/// A follow relationship: `follower` subscribes to `following`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription identifier.
    pub id: SubscriptionId,
    /// The subscribing member.
    pub follower: Member,
    /// The member being followed.
    #[serde(alias = "to_member")]
    pub following: Member,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Identified for Subscription {
    type Id = SubscriptionId;

    fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// A direct message between two members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Sending member.
    #[serde(deserialize_with = "member_ref")]
    pub sender: MemberId,
    /// Receiving member.
    #[serde(deserialize_with = "member_ref")]
    pub receiver: MemberId,
    /// Text body.
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Whether the receiver has read it.
    #[serde(default)]
    pub is_read: bool,
}

impl Message {
    /// The other participant, seen from `viewer`.
    pub fn peer_of(&self, viewer: MemberId) -> MemberId {
        if self.sender == viewer {
            self.receiver
        } else {
            self.sender
        }
    }
}

impl Identified for Message {
    type Id = MessageId;

    fn id(&self) -> MessageId {
        self.id
    }
}

/// One entry of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    /// The peer this conversation is with.
    pub member: Member,
    /// Most recent message exchanged, if any.
    #[serde(default)]
    pub last_message: Option<Message>,
    /// Messages from the peer the viewer has not read.
    #[serde(default)]
    pub unread_count: u32,
}

impl Dialog {
    /// A dialog with no messages yet.
    pub fn new(member: Member) -> Self {
        Self {
            member,
            last_message: None,
            unread_count: 0,
        }
    }

    /// Timestamp of the last message, if any.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_message.as_ref().map(|m| m.created_at)
    }
}

impl Identified for Dialog {
    type Id = MemberId;

    fn id(&self) -> MemberId {
        self.member.id
    }
}

/// Accepts either a bare member id or a nested member object.
fn member_ref<'de, D>(deserializer: D) -> Result<MemberId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MemberRef {
        Id(MemberId),
        Object { id: MemberId },
    }

    Ok(match MemberRef::deserialize(deserializer)? {
        MemberRef::Id(id) => id,
        MemberRef::Object { id } => id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // Decoding Tests
    // ===========================================

    #[test]
    fn post_decodes_backend_shape() {
        let json = r#"{
            "id": 3,
            "author": {"id": 1, "username": "ann", "friends_count": 2},
            "content": "hello",
            "created_at": "2024-03-01T10:00:00Z",
            "likes_count": 4,
            "is_liked_by_user": true
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, PostId::new(3));
        assert!(post.is_liked);
        assert_eq!(post.likes_count, 4);
        assert_eq!(post.comments_count, 0);
        assert!(post.images.is_empty());
    }

    #[test]
    fn message_accepts_nested_or_bare_members() {
        let nested = r#"{
            "id": 1, "sender": {"id": 5, "username": "a"}, "receiver": 6,
            "content": "hi", "created_at": "2024-03-01T10:00:00Z"
        }"#;
        let msg: Message = serde_json::from_str(nested).unwrap();
        assert_eq!(msg.sender, MemberId::new(5));
        assert_eq!(msg.receiver, MemberId::new(6));
        assert!(!msg.is_read);
    }

    #[test]
    fn request_status_accepts_declined_alias() {
        let status: RequestStatus = serde_json::from_str(r#""declined""#).unwrap();
        assert_eq!(status, RequestStatus::Rejected);
        let status: RequestStatus = serde_json::from_str(r#""pending""#).unwrap();
        assert_eq!(status, RequestStatus::Pending);
    }

    #[test]
    fn subscription_accepts_to_member_alias() {
        let json = r#"{
            "id": 2,
            "follower": {"id": 1, "username": "me"},
            "to_member": {"id": 42, "username": "them"},
            "created_at": "2024-03-01T10:00:00Z"
        }"#;
        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.following.id, MemberId::new(42));
    }

    // ===========================================
    // Helper Tests
    // ===========================================

    #[test]
    fn friendship_hint_prefers_explicit_flag() {
        let mut member = Member::new(MemberId::new(1), "ann");
        member.friends_count = 3;
        assert!(member.friendship_hint());

        member.is_friend = Some(false);
        assert!(!member.friendship_hint());
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut member = Member::new(MemberId::new(1), "ann");
        assert_eq!(member.display_name(), "ann");
        member.first_name = "Ann".into();
        member.last_name = "Lee".into();
        assert_eq!(member.display_name(), "Ann Lee");
    }

    #[test]
    fn peer_of_picks_the_other_side() {
        let msg = Message {
            id: MessageId::new(1),
            sender: MemberId::new(1),
            receiver: MemberId::new(2),
            content: "x".into(),
            created_at: Utc::now(),
            is_read: false,
        };
        assert_eq!(msg.peer_of(MemberId::new(1)), MemberId::new(2));
        assert_eq!(msg.peer_of(MemberId::new(2)), MemberId::new(1));
    }

    #[test]
    fn dialog_identity_is_the_peer() {
        let dialog = Dialog::new(Member::new(MemberId::new(9), "peer"));
        assert_eq!(dialog.id(), MemberId::new(9));
        assert!(dialog.last_activity().is_none());
    }
}
