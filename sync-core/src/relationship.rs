//! Relationship derivation for social-sync.
//!
//! The backend has no single "relationship" entity. The viewer's status
//! toward a target member is derived from three independently paginated
//! sources (outgoing requests, incoming requests, the viewer's
//! subscriptions) plus the target's friendship indicator.
//!
//! Precedence is fixed:
//! 1. a pending outgoing request to the target → `RequestSent`
//! 2. a pending incoming request from the target → `RequestReceived`
//! 3. the friendship indicator → `Friends`
//! 4. otherwise → `None`
//!
//! The subscription flag is orthogonal and never affects the four-way state.

use serde::Serialize;
use sync_types::{FriendRequest, MemberId, RequestId, Subscription};

/// Mutually exclusive viewer → target status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RelationshipState {
    /// No request either way and not friends.
    None,
    /// The viewer has a pending request to the target.
    RequestSent {
        /// The outgoing request, for later cancel actions.
        request: RequestId,
    },
    /// The target has a pending request to the viewer.
    RequestReceived {
        /// The incoming request, for accept/decline.
        request: RequestId,
    },
    /// A friendship exists.
    Friends,
}

impl RelationshipState {
    /// The carried request identifier, if any.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::RequestSent { request } | Self::RequestReceived { request } => Some(*request),
            Self::None | Self::Friends => None,
        }
    }

    /// Short label matching the backend vocabulary.
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::RequestSent { .. } => "request_sent",
            Self::RequestReceived { .. } => "request_received",
            Self::Friends => "friends",
        }
    }
}

/// Resolved relationship plus the orthogonal subscription flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Relationship {
    /// Four-way status.
    pub state: RelationshipState,
    /// Whether the viewer follows the target.
    pub is_subscribed: bool,
}

impl Relationship {
    /// No relationship, not subscribed.
    pub const NONE: Relationship = Relationship {
        state: RelationshipState::None,
        is_subscribed: false,
    };
}

impl Default for Relationship {
    fn default() -> Self {
        Self::NONE
    }
}

/// The three fetched sources, fully collected.
#[derive(Debug, Clone, Default)]
pub struct RelationshipSources {
    /// Requests sent by the viewer.
    pub outgoing: Vec<FriendRequest>,
    /// Requests received by the viewer.
    pub incoming: Vec<FriendRequest>,
    /// Members the viewer follows.
    pub subscriptions: Vec<Subscription>,
}

/// Derive the viewer's relationship to `target`.
///
/// `friendship` is the target's friendship indicator as reported by the
/// backend; it only counts when no pending request exists either way.
pub fn resolve(
    target: MemberId,
    sources: &RelationshipSources,
    friendship: bool,
) -> Relationship {
    let outgoing = sources
        .outgoing
        .iter()
        .find(|req| req.to_member.id == target && req.is_pending());
    let incoming = sources
        .incoming
        .iter()
        .find(|req| req.from_member.id == target && req.is_pending());

    let state = match (outgoing, incoming) {
        (Some(req), _) => RelationshipState::RequestSent { request: req.id },
        (None, Some(req)) => RelationshipState::RequestReceived { request: req.id },
        (None, None) if friendship => RelationshipState::Friends,
        (None, None) => RelationshipState::None,
    };

    let is_subscribed = sources
        .subscriptions
        .iter()
        .any(|sub| sub.following.id == target);

    Relationship {
        state,
        is_subscribed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sync_types::{Member, RequestStatus, SubscriptionId};

    const VIEWER: MemberId = MemberId::new(1);
    const TARGET: MemberId = MemberId::new(42);

    fn request(id: u64, from: MemberId, to: MemberId, status: RequestStatus) -> FriendRequest {
        FriendRequest {
            id: RequestId::new(id),
            from_member: Member::new(from, "from"),
            to_member: Member::new(to, "to"),
            status,
            created_at: Utc::now(),
        }
    }

    fn subscription(id: u64, following: MemberId) -> Subscription {
        Subscription {
            id: SubscriptionId::new(id),
            follower: Member::new(VIEWER, "viewer"),
            following: Member::new(following, "following"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn outgoing_wins_over_contradictory_incoming() {
        let sources = RelationshipSources {
            outgoing: vec![request(5, VIEWER, TARGET, RequestStatus::Pending)],
            incoming: vec![request(9, TARGET, VIEWER, RequestStatus::Pending)],
            subscriptions: vec![],
        };

        let rel = resolve(TARGET, &sources, true);
        assert_eq!(
            rel.state,
            RelationshipState::RequestSent {
                request: RequestId::new(5)
            }
        );
        assert_eq!(rel.state.request_id(), Some(RequestId::new(5)));
    }

    #[test]
    fn incoming_pending_reports_received() {
        let sources = RelationshipSources {
            incoming: vec![request(9, TARGET, VIEWER, RequestStatus::Pending)],
            ..Default::default()
        };

        let rel = resolve(TARGET, &sources, false);
        assert_eq!(
            rel.state,
            RelationshipState::RequestReceived {
                request: RequestId::new(9)
            }
        );
        assert_eq!(rel.state.label(), "request_received");
    }

    #[test]
    fn non_pending_requests_are_ignored() {
        let sources = RelationshipSources {
            outgoing: vec![request(5, VIEWER, TARGET, RequestStatus::Accepted)],
            incoming: vec![request(9, TARGET, VIEWER, RequestStatus::Rejected)],
            subscriptions: vec![],
        };

        assert_eq!(resolve(TARGET, &sources, true).state, RelationshipState::Friends);
        assert_eq!(resolve(TARGET, &sources, false).state, RelationshipState::None);
    }

    #[test]
    fn requests_for_other_members_are_ignored() {
        let other = MemberId::new(7);
        let sources = RelationshipSources {
            outgoing: vec![request(5, VIEWER, other, RequestStatus::Pending)],
            incoming: vec![request(9, other, VIEWER, RequestStatus::Pending)],
            subscriptions: vec![subscription(1, other)],
        };

        assert_eq!(resolve(TARGET, &sources, false), Relationship::NONE);
    }

    #[test]
    fn subscription_is_orthogonal() {
        let sources = RelationshipSources {
            outgoing: vec![request(5, VIEWER, TARGET, RequestStatus::Pending)],
            subscriptions: vec![subscription(3, TARGET)],
            ..Default::default()
        };

        let rel = resolve(TARGET, &sources, false);
        assert!(rel.is_subscribed);
        assert!(matches!(rel.state, RelationshipState::RequestSent { .. }));

        let only_sub = RelationshipSources {
            subscriptions: vec![subscription(3, TARGET)],
            ..Default::default()
        };
        let rel = resolve(TARGET, &only_sub, false);
        assert_eq!(rel.state, RelationshipState::None);
        assert!(rel.is_subscribed);
    }

    #[test]
    fn state_serializes_with_snake_case_tag() {
        let json = serde_json::to_string(&RelationshipState::RequestSent {
            request: RequestId::new(5),
        })
        .unwrap();
        assert_eq!(json, r#"{"state":"request_sent","request":5}"#);
    }
}
