//! Conversation store.
//!
//! Holds the dialog list (one entry per peer) and, for the open
//! conversation, a chronological message timeline.
//!
//! # Ordering
//!
//! - The dialog list keeps server order after a fetch. After the viewer
//!   sends a message it is re-sorted, most recent activity first.
//! - The timeline is oldest-first. The first page fetched is the most
//!   recent one; older pages are prepended as the user scrolls up.
//!
//! # Stale results
//!
//! Switching conversations starts a new selection generation. A message
//! page fetched for a conversation that is no longer open (or was re-opened
//! since) is dropped on arrival.

use chrono::FixedOffset;
use serde_json::json;
use std::sync::Arc;
use sync_core::dialogs;
use sync_core::{ActiveTarget, CollectionWindow, MessageTimeline, TimelineEntry, Ticket};
use sync_types::{Dialog, Member, MemberId, Message, PageParams};
use tokio::sync::Mutex;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::gateway::{decode, decode_page, Gateway, Operation, Resource};

#[derive(Debug, Default)]
struct ConversationState {
    dialogs: CollectionWindow<Dialog>,
    active: ActiveTarget<MemberId>,
    timeline: MessageTimeline,
}

/// Dialog list plus the open conversation's timeline.
pub struct ConversationStore<G: Gateway> {
    gateway: Arc<G>,
    message_page_size: u64,
    utc_offset: FixedOffset,
    state: Mutex<ConversationState>,
    older_gate: Mutex<()>,
}

impl<G: Gateway> ConversationStore<G> {
    /// Create an empty store.
    pub fn new(gateway: Arc<G>, config: &EngineConfig) -> Result<Self, EngineError> {
        let utc_offset = config
            .utc_offset()
            .map_err(|e| EngineError::validation(e.to_string()))?;
        Ok(Self {
            gateway,
            message_page_size: config.message_page_size.max(1),
            utc_offset,
            state: Mutex::new(ConversationState::default()),
            older_gate: Mutex::new(()),
        })
    }

    // ===========================================
    // Dialog list
    // ===========================================

    /// Fetch the dialog list, replacing what is held.
    pub async fn load_dialogs(&self, limit: u64) -> Result<Vec<Dialog>, EngineError> {
        tracing::debug!(limit, "loading dialogs");
        let page = self
            .gateway
            .fetch_page(&Resource::Dialogs, &PageParams::new(0, limit.max(1)))
            .await
            .and_then(decode_page::<Dialog>)
            .map_err(|e| {
                tracing::warn!(error = %e, "dialog load failed");
                EngineError::fetch(e)
            })?;

        let mut state = self.state.lock().await;
        state.dialogs.apply_page(0, page);
        Ok(state.dialogs.items().to_vec())
    }

    /// Dialogs in display order.
    pub async fn dialogs(&self) -> Vec<Dialog> {
        self.state.lock().await.dialogs.items().to_vec()
    }

    /// Sum of every dialog's unread counter.
    pub async fn total_unread(&self) -> u64 {
        dialogs::total_unread(self.state.lock().await.dialogs.items())
    }

    /// Mark the conversation with `peer` as read.
    ///
    /// On success the dialog's unread counter is set to the value the
    /// backend returns, or zero when it returns nothing. On failure nothing
    /// changes.
    pub async fn mark_read(&self, peer: MemberId) -> Result<u32, EngineError> {
        let reply = self
            .gateway
            .mutate(&Resource::Dialogs, peer.value(), Operation::MarkRead, None)
            .await
            .map_err(|e| {
                tracing::warn!(%peer, error = %e, "mark read failed");
                EngineError::mutation(e)
            })?;

        let unread = reply
            .as_ref()
            .and_then(|body| body.get("unread_count"))
            .and_then(|count| count.as_u64())
            .map(|count| u32::try_from(count).unwrap_or(u32::MAX))
            .unwrap_or(0);

        let mut state = self.state.lock().await;
        dialogs::set_unread(&mut state.dialogs, peer, unread);
        tracing::info!(%peer, unread, "conversation marked read");
        Ok(unread)
    }

    // ===========================================
    // Timeline
    // ===========================================

    /// Open the conversation with `peer` and load its most recent page.
    ///
    /// The previous timeline is dropped immediately.
    pub async fn select_dialog(&self, peer: MemberId) -> Result<Vec<Message>, EngineError> {
        let ticket = {
            let mut state = self.state.lock().await;
            state.timeline.reset();
            state.active.select(peer)
        };
        tracing::debug!(%peer, "conversation selected");
        self.fetch_messages(ticket, 0, self.message_page_size).await
    }

    /// Close the open conversation. Fetches in flight are dropped.
    pub async fn close_dialog(&self) {
        let mut state = self.state.lock().await;
        state.active.clear();
        state.timeline.reset();
    }

    /// Load one page of the open conversation with `peer`.
    ///
    /// `offset == 0` replaces the timeline; larger offsets prepend older
    /// messages.
    pub async fn load_messages(
        &self,
        peer: MemberId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Message>, EngineError> {
        let ticket = self.ticket_for(peer).await?;
        self.fetch_messages(ticket, offset, limit).await
    }

    /// Load the page of messages preceding the oldest one held.
    ///
    /// Does nothing (no fetch) when the server reports no older messages.
    pub async fn load_older(&self) -> Result<Vec<Message>, EngineError> {
        let _gate = self.older_gate.lock().await;
        let (ticket, offset) = {
            let state = self.state.lock().await;
            let ticket = state
                .active
                .ticket()
                .ok_or_else(|| EngineError::validation("no conversation is open"))?;
            if !state.timeline.has_more() {
                return Ok(state.timeline.messages().to_vec());
            }
            (ticket, state.timeline.len() as u64)
        };
        self.fetch_messages(ticket, offset, self.message_page_size)
            .await
    }

    /// Poll the open conversation for messages that arrived since it was
    /// loaded, merging them without disturbing older history.
    pub async fn refresh(&self) -> Result<Vec<Message>, EngineError> {
        let ticket = {
            let state = self.state.lock().await;
            state
                .active
                .ticket()
                .ok_or_else(|| EngineError::validation("no conversation is open"))?
        };
        let page = self
            .fetch_page(ticket.target(), 0, self.message_page_size)
            .await?;

        let mut state = self.state.lock().await;
        if !state.active.is_current(&ticket) {
            tracing::warn!(peer = %ticket.target(), "discarding messages for stale conversation");
            return Ok(state.timeline.messages().to_vec());
        }
        let added = state.timeline.merge_latest(page);
        if added > 0 {
            tracing::info!(peer = %ticket.target(), added, "new messages merged");
        }
        Ok(state.timeline.messages().to_vec())
    }

    /// Whether older messages remain for the open conversation.
    pub async fn has_more_messages(&self) -> bool {
        self.state.lock().await.timeline.has_more()
    }

    /// The open conversation's peer.
    pub async fn active_peer(&self) -> Option<MemberId> {
        self.state.lock().await.active.current()
    }

    /// The open conversation's messages, oldest first.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.timeline.messages().to_vec()
    }

    /// The open conversation with a date boundary before each new
    /// calendar day.
    pub async fn grouped_timeline(&self) -> Vec<TimelineEntry> {
        self.state.lock().await.timeline.grouped(self.utc_offset)
    }

    // ===========================================
    // Sending
    // ===========================================

    /// Send `content` to `peer`.
    ///
    /// On success the message is appended to the timeline (if the
    /// conversation is open) and the dialog list is updated and re-sorted.
    pub async fn send_message(&self, peer: &Member, content: &str) -> Result<Message, EngineError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::validation("message content is empty"));
        }

        let body = json!({ "recipient": peer.id, "content": content });
        let message: Message = self
            .gateway
            .create(&Resource::Messages { peer: peer.id }, body)
            .await
            .and_then(decode)
            .map_err(|e| {
                tracing::warn!(peer = %peer.id, error = %e, "send failed");
                EngineError::mutation(e)
            })?;

        let mut state = self.state.lock().await;
        if state.active.current() == Some(peer.id) {
            state.timeline.append(message.clone());
        }
        dialogs::record_message(&mut state.dialogs, peer, message.clone());
        tracing::info!(peer = %peer.id, message = %message.id, "message sent");
        Ok(message)
    }

    async fn ticket_for(&self, peer: MemberId) -> Result<Ticket<MemberId>, EngineError> {
        let state = self.state.lock().await;
        match state.active.ticket() {
            Some(ticket) if ticket.target() == peer => Ok(ticket),
            _ => Err(EngineError::validation(format!(
                "conversation with {} is not open",
                peer
            ))),
        }
    }

    async fn fetch_page(
        &self,
        peer: MemberId,
        offset: u64,
        limit: u64,
    ) -> Result<sync_types::Page<Message>, EngineError> {
        tracing::debug!(%peer, offset, limit, "loading messages");
        self.gateway
            .fetch_page(&Resource::Messages { peer }, &PageParams::new(offset, limit))
            .await
            .and_then(decode_page::<Message>)
            .map_err(|e| {
                tracing::warn!(%peer, offset, error = %e, "message load failed");
                EngineError::fetch(e)
            })
    }

    async fn fetch_messages(
        &self,
        ticket: Ticket<MemberId>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Message>, EngineError> {
        let page = self.fetch_page(ticket.target(), offset, limit).await?;

        let mut state = self.state.lock().await;
        if !state.active.is_current(&ticket) {
            tracing::warn!(
                peer = %ticket.target(),
                offset,
                "discarding messages for stale conversation"
            );
            return Ok(state.timeline.messages().to_vec());
        }
        state.timeline.apply_page(offset, page);
        Ok(state.timeline.messages().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Call, MockGateway};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::Value;
    use sync_types::{GatewayError, MessageId, Page};

    const VIEWER: MemberId = MemberId::new(100);
    const PEER_A: MemberId = MemberId::new(1);
    const PEER_B: MemberId = MemberId::new(2);

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
    }

    fn message_json(id: u64, peer: MemberId, when: DateTime<Utc>) -> Value {
        json!({
            "id": id,
            "sender": VIEWER,
            "receiver": peer,
            "content": format!("m{}", id),
            "created_at": when.to_rfc3339(),
        })
    }

    fn dialog_json(peer: MemberId, last: DateTime<Utc>, unread: u32) -> Value {
        json!({
            "member": {"id": peer, "username": format!("peer{}", peer)},
            "last_message": message_json(peer.value() * 1000, peer, last),
            "unread_count": unread,
        })
    }

    /// Page of a 60-message history with `peer`, newest first.
    fn history_page(peer: MemberId, offset: u64, limit: u64) -> Page<Value> {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let total = 60u64;
        let items = (offset..(offset + limit).min(total))
            .map(|i| {
                let id = total - i;
                message_json(id, peer, base + Duration::minutes(id as i64))
            })
            .collect();
        Page::new(items, total)
    }

    fn store(gateway: &MockGateway) -> ConversationStore<MockGateway> {
        ConversationStore::new(Arc::new(gateway.clone()), &EngineConfig::default()).unwrap()
    }

    fn peers(dialogs: &[Dialog]) -> Vec<MemberId> {
        dialogs.iter().map(|d| d.member.id).collect()
    }

    // ===========================================
    // Dialog List Tests
    // ===========================================

    #[tokio::test]
    async fn dialogs_keep_server_order_and_sum_unread() {
        let gateway = MockGateway::new();
        gateway.queue_page(
            Resource::Dialogs,
            Page::new(
                vec![dialog_json(PEER_B, at(9, 0), 3), dialog_json(PEER_A, at(10, 0), 2)],
                2,
            ),
        );
        let store = store(&gateway);

        let dialogs = store.load_dialogs(50).await.unwrap();

        assert_eq!(peers(&dialogs), vec![PEER_B, PEER_A]);
        assert_eq!(store.total_unread().await, 5);
    }

    #[tokio::test]
    async fn sending_reorders_dialogs_by_recency() {
        let gateway = MockGateway::new();
        gateway.queue_page(
            Resource::Dialogs,
            Page::new(
                vec![dialog_json(PEER_A, at(10, 0), 0), dialog_json(PEER_B, at(9, 0), 0)],
                2,
            ),
        );
        gateway.queue_entity(
            Resource::Messages { peer: PEER_B },
            message_json(500, PEER_B, at(10, 30)),
        );
        let store = store(&gateway);
        store.load_dialogs(50).await.unwrap();

        store
            .send_message(&Member::new(PEER_B, "peer2"), "hello")
            .await
            .unwrap();

        let dialogs = store.dialogs().await;
        assert_eq!(peers(&dialogs), vec![PEER_B, PEER_A]);
        assert_eq!(dialogs[0].last_activity(), Some(at(10, 30)));
        assert_eq!(dialogs[1].last_activity(), Some(at(10, 0)));
    }

    #[tokio::test]
    async fn sending_to_new_peer_creates_dialog() {
        let gateway = MockGateway::new();
        let new_peer = MemberId::new(3);
        gateway.queue_entity(
            Resource::Messages { peer: new_peer },
            message_json(501, new_peer, at(11, 0)),
        );
        let store = store(&gateway);

        store
            .send_message(&Member::new(new_peer, "new"), "hi")
            .await
            .unwrap();

        let dialogs = store.dialogs().await;
        assert_eq!(peers(&dialogs), vec![new_peer]);
        assert_eq!(dialogs[0].unread_count, 0);
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_dispatch() {
        let gateway = MockGateway::new();
        let store = store(&gateway);

        let err = store
            .send_message(&Member::new(PEER_A, "a"), "   ")
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn send_body_names_recipient() {
        let gateway = MockGateway::new();
        gateway.queue_entity(
            Resource::Messages { peer: PEER_A },
            message_json(502, PEER_A, at(12, 0)),
        );
        let store = store(&gateway);

        store
            .send_message(&Member::new(PEER_A, "a"), "  hi there ")
            .await
            .unwrap();

        let Some(Call::Create { body, .. }) = gateway.last_call() else {
            panic!("expected a create");
        };
        assert_eq!(body, json!({"recipient": 1, "content": "hi there"}));
    }

    #[tokio::test]
    async fn failed_send_changes_nothing() {
        let gateway = MockGateway::new();
        gateway.queue_page(
            Resource::Dialogs,
            Page::new(vec![dialog_json(PEER_A, at(10, 0), 0)], 1),
        );
        gateway.queue_error(
            Resource::Messages { peer: PEER_A },
            GatewayError::invalid_field("content", "too long"),
        );
        let store = store(&gateway);
        let before = store.load_dialogs(50).await.unwrap();

        let err = store
            .send_message(&Member::new(PEER_A, "a"), "x")
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Mutation(GatewayError::ValidationFailed { .. })));
        assert_eq!(store.dialogs().await, before);
    }

    #[tokio::test]
    async fn mark_read_uses_server_count() {
        let gateway = MockGateway::new();
        gateway.queue_page(
            Resource::Dialogs,
            Page::new(
                vec![dialog_json(PEER_A, at(10, 0), 4), dialog_json(PEER_B, at(9, 0), 2)],
                2,
            ),
        );
        let store = store(&gateway);
        store.load_dialogs(50).await.unwrap();

        // No body: the conversation is fully read.
        assert_eq!(store.mark_read(PEER_A).await.unwrap(), 0);
        assert_eq!(store.total_unread().await, 2);

        gateway.queue_entity(Resource::Dialogs, json!({"unread_count": 1}));
        assert_eq!(store.mark_read(PEER_B).await.unwrap(), 1);
        assert_eq!(store.total_unread().await, 1);
        assert_eq!(
            gateway.mutation_count(&Resource::Dialogs, 2, Operation::MarkRead),
            1
        );
    }

    #[tokio::test]
    async fn failed_mark_read_keeps_counter() {
        let gateway = MockGateway::new();
        gateway.queue_page(
            Resource::Dialogs,
            Page::new(vec![dialog_json(PEER_A, at(10, 0), 4)], 1),
        );
        gateway.queue_error(Resource::Dialogs, GatewayError::NotFound);
        let store = store(&gateway);
        store.load_dialogs(50).await.unwrap();

        assert!(store.mark_read(PEER_A).await.is_err());
        assert_eq!(store.total_unread().await, 4);
    }

    // ===========================================
    // Timeline Tests
    // ===========================================

    #[tokio::test]
    async fn older_messages_are_prepended_in_order() {
        let gateway = MockGateway::new();
        let resource = Resource::Messages { peer: PEER_A };
        gateway.queue_page(resource.clone(), history_page(PEER_A, 0, 30));
        gateway.queue_page(resource.clone(), history_page(PEER_A, 30, 30));
        let store = store(&gateway);

        let first = store.select_dialog(PEER_A).await.unwrap();
        assert_eq!(first.len(), 30);
        assert!(store.has_more_messages().await);

        let merged = store.load_older().await.unwrap();
        assert_eq!(merged.len(), 60);
        assert!(merged.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert_eq!(merged[0].id, MessageId::new(1));
        assert!(!store.has_more_messages().await);

        // Nothing older: no further fetch.
        store.load_older().await.unwrap();
        assert_eq!(gateway.fetch_count(&resource), 2);
    }

    #[tokio::test]
    async fn switching_conversation_discards_stale_page() {
        let gateway = MockGateway::new();
        let a = Resource::Messages { peer: PEER_A };
        let b = Resource::Messages { peer: PEER_B };
        gateway.queue_page(a.clone(), history_page(PEER_A, 0, 30));
        gateway.queue_page(
            b.clone(),
            Page::new(vec![message_json(900, PEER_B, at(8, 0))], 1),
        );
        gateway.hold(a.clone());
        let store = store(&gateway);

        let open_a = store.select_dialog(PEER_A);
        let open_b = async {
            tokio::task::yield_now().await;
            let messages = store.select_dialog(PEER_B).await;
            gateway.release_all();
            messages
        };
        let (_, b_messages) = tokio::join!(open_a, open_b);

        assert_eq!(b_messages.unwrap().len(), 1);
        let messages = store.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, MessageId::new(900));
        assert_eq!(store.active_peer().await, Some(PEER_B));
    }

    #[tokio::test]
    async fn load_messages_requires_open_conversation() {
        let gateway = MockGateway::new();
        let store = store(&gateway);
        store.select_dialog(PEER_A).await.unwrap();

        let err = store.load_messages(PEER_B, 0, 30).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        store.close_dialog().await;
        assert!(matches!(
            store.load_older().await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn sent_message_lands_at_bottom_without_duplicates() {
        let gateway = MockGateway::new();
        let resource = Resource::Messages { peer: PEER_A };
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        gateway.queue_page(resource.clone(), history_page(PEER_A, 0, 30));
        gateway.queue_entity(
            resource.clone(),
            message_json(61, PEER_A, base + Duration::minutes(61)),
        );
        let store = store(&gateway);
        store.select_dialog(PEER_A).await.unwrap();

        store
            .send_message(&Member::new(PEER_A, "a"), "latest")
            .await
            .unwrap();

        // A poll returns the sent message again alongside the rest.
        let mut latest = history_page(PEER_A, 0, 29);
        latest
            .items
            .insert(0, message_json(61, PEER_A, base + Duration::minutes(61)));
        latest.total_count = 61;
        gateway.queue_page(resource, latest);
        let messages = store.refresh().await.unwrap();

        assert_eq!(messages.len(), 31);
        assert_eq!(messages.last().unwrap().id, MessageId::new(61));
        let ids: std::collections::HashSet<_> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), messages.len());
    }

    #[tokio::test]
    async fn message_sent_during_first_load_is_kept() {
        let gateway = MockGateway::new();
        let resource = Resource::Messages { peer: PEER_A };
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        gateway.queue_page(resource.clone(), history_page(PEER_A, 0, 30));
        gateway.queue_entity(
            resource.clone(),
            message_json(61, PEER_A, base + Duration::minutes(61)),
        );
        gateway.hold(resource.clone());
        let store = store(&gateway);

        let open = store.select_dialog(PEER_A);
        let send = async {
            tokio::task::yield_now().await;
            gateway.release(&resource);
            store
                .send_message(&Member::new(PEER_A, "a"), "while loading")
                .await
        };
        let (opened, sent) = tokio::join!(open, send);

        assert_eq!(sent.unwrap().id, MessageId::new(61));
        assert_eq!(opened.unwrap().len(), 31);
        let messages = store.messages().await;
        assert_eq!(messages.len(), 31);
        assert_eq!(messages.last().unwrap().id, MessageId::new(61));
        assert!(store.has_more_messages().await);
    }

    #[tokio::test]
    async fn grouped_timeline_marks_days() {
        let gateway = MockGateway::new();
        let day_two = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        gateway.queue_page(
            Resource::Messages { peer: PEER_A },
            Page::new(
                vec![
                    message_json(3, PEER_A, day_two),
                    message_json(2, PEER_A, at(18, 0)),
                    message_json(1, PEER_A, at(8, 0)),
                ],
                3,
            ),
        );
        let store = store(&gateway);
        store.select_dialog(PEER_A).await.unwrap();

        let entries = store.grouped_timeline().await;
        let boundaries = entries
            .iter()
            .filter(|e| matches!(e, TimelineEntry::DateBoundary(_)))
            .count();
        assert_eq!(entries.len(), 5);
        assert_eq!(boundaries, 2);
    }

    #[tokio::test]
    async fn failed_message_load_leaves_timeline() {
        let gateway = MockGateway::new();
        let resource = Resource::Messages { peer: PEER_A };
        gateway.queue_page(resource.clone(), history_page(PEER_A, 0, 30));
        gateway.queue_error(resource, GatewayError::Network("reset".into()));
        let store = store(&gateway);
        store.select_dialog(PEER_A).await.unwrap();

        let err = store.load_older().await.unwrap_err();
        assert!(matches!(err, EngineError::Fetch(_)));
        assert_eq!(store.messages().await.len(), 30);
        assert!(store.has_more_messages().await);
    }
}
