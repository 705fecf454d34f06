//! Dialog list ordering and unread accounting.
//!
//! The dialog list keeps server order after a fetch. It is re-sorted
//! locally, newest activity first, only after the viewer sends a message.

use std::cmp::Reverse;
use sync_types::{Dialog, Member, MemberId, Message};

use crate::CollectionWindow;

/// Re-sort dialogs by last-message timestamp, most recent first.
///
/// Dialogs without any message sort as if their last activity were the
/// epoch, i.e. after every dialog that has one.
pub fn sort_by_recency(dialogs: &mut CollectionWindow<Dialog>) {
    dialogs.sort_by(|a, b| recency_key(a).cmp(&recency_key(b)));
}

fn recency_key(dialog: &Dialog) -> Reverse<i64> {
    Reverse(
        dialog
            .last_activity()
            .map(|at| at.timestamp_millis())
            .unwrap_or(0),
    )
}

/// Record a message exchanged with `peer` and re-sort the list.
///
/// Replaces the matching dialog's last-message summary, creating the dialog
/// if the peer had none yet. The unread counter is left alone.
pub fn record_message(dialogs: &mut CollectionWindow<Dialog>, peer: &Member, message: Message) {
    let updated = match dialogs.get(peer.id) {
        Some(existing) => Dialog {
            last_message: Some(message),
            ..existing.clone()
        },
        None => Dialog {
            last_message: Some(message),
            ..Dialog::new(peer.clone())
        },
    };

    if !dialogs.replace(peer.id, updated.clone()) {
        dialogs.insert_created_front(updated);
    }
    sort_by_recency(dialogs);
}

/// Overwrite one dialog's unread counter with a server-supplied value.
///
/// Returns false when no dialog exists for `peer`.
pub fn set_unread(dialogs: &mut CollectionWindow<Dialog>, peer: MemberId, unread: u32) -> bool {
    match dialogs.get(peer) {
        Some(existing) => {
            let updated = Dialog {
                unread_count: unread,
                ..existing.clone()
            };
            dialogs.replace(peer, updated)
        }
        None => false,
    }
}

/// Sum of every dialog's unread counter.
pub fn total_unread(dialogs: &[Dialog]) -> u64 {
    dialogs.iter().map(|d| u64::from(d.unread_count)).sum()
}
