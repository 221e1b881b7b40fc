//! Contact roster and per-contact unread accounting.
//!
//! The directory exclusively owns the contact list and the unread
//! counters. Two rules govern the counters: the active conversation never
//! accrues unread badges (an open transcript is presumed read), and
//! selecting a contact resets its counter.
//!
//! Unread detection for conversations that are NOT open works off the
//! `message_count` the backend reports per contact: the directory keeps
//! the last observed count as a baseline and converts growth into unread
//! increments. The local user can only author messages into the active
//! conversation, so growth on any other conversation is necessarily
//! counterpart-authored.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::backend::ChatBackend;
use crate::error::FetchError;
use crate::models::Contact;

/// `(contact_id, new_total)` pairs for unread counters that changed
/// during a roster ingest.
pub type UnreadDelta = (String, u32);

#[derive(Default)]
struct DirectoryState {
    contacts: Vec<Contact>,
    unread: HashMap<String, u32>,
    /// Last observed total message count per contact; the baseline for
    /// converting roster growth into unread increments.
    seen_counts: HashMap<String, u64>,
    active: Option<String>,
}

impl DirectoryState {
    /// Returns the new total when the counter actually moved.
    fn record(&mut self, contact_id: &str, new_messages: u32) -> Option<u32> {
        if new_messages == 0 || self.active.as_deref() == Some(contact_id) {
            return None;
        }
        let counter = self.unread.entry(contact_id.to_string()).or_insert(0);
        *counter += new_messages;
        Some(*counter)
    }
}

/// Roster and unread counters for one viewer.
pub struct ConversationDirectory {
    backend: Arc<dyn ChatBackend>,
    state: RwLock<DirectoryState>,
}

impl ConversationDirectory {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            state: RwLock::new(DirectoryState::default()),
        }
    }

    /// Fetch a fresh roster. On failure the held list stays untouched and
    /// the error propagates; the caller decides between stale and empty.
    /// No automatic retry; the roster ticker is the retry.
    pub async fn refresh_contacts(&self) -> Result<Vec<UnreadDelta>, FetchError> {
        let contacts = self.backend.list_contacts().await?;
        Ok(self.ingest_roster(contacts))
    }

    /// Store a fetched roster and convert message-count growth into
    /// unread increments. A contact's first observation only sets its
    /// baseline, since existing history is not "new".
    fn ingest_roster(&self, contacts: Vec<Contact>) -> Vec<UnreadDelta> {
        let mut changed = Vec::new();
        let Ok(mut state) = self.state.write() else {
            return changed;
        };
        for contact in &contacts {
            let id = contact.id().to_string();
            let count = contact.message_count();
            if let Some(seen) = state.seen_counts.get(&id).copied() {
                if count > seen {
                    let delta = (count - seen) as u32;
                    if let Some(total) = state.record(&id, delta) {
                        changed.push((id.clone(), total));
                    }
                }
            }
            state.seen_counts.insert(id, count);
        }
        state.contacts = contacts;
        changed
    }

    /// Mark a contact active and reset its unread counter to zero.
    /// Returns the contact, or `None` when the id is not in the roster.
    pub fn select_contact(&self, contact_id: &str) -> Option<Contact> {
        let mut state = self.state.write().ok()?;
        let contact = state
            .contacts
            .iter()
            .find(|c| c.id() == contact_id)
            .cloned()?;
        state.active = Some(contact_id.to_string());
        state.unread.insert(contact_id.to_string(), 0);
        Some(contact)
    }

    /// Clear the active mark (conversation closed or messaging view left).
    pub fn clear_active(&self) {
        if let Ok(mut state) = self.state.write() {
            state.active = None;
        }
    }

    /// Record counterpart messages discovered by a poll tick. Ignored for
    /// the active conversation. Returns the new total when the counter
    /// moved.
    pub fn record_incoming(&self, contact_id: &str, new_messages: u32) -> Option<u32> {
        let mut state = self.state.write().ok()?;
        state.record(contact_id, new_messages)
    }

    // ── Snapshots for rendering ─────────────────────────────

    pub fn contacts(&self) -> Vec<Contact> {
        self.state
            .read()
            .map(|s| s.contacts.clone())
            .unwrap_or_default()
    }

    pub fn unread(&self, contact_id: &str) -> u32 {
        self.state
            .read()
            .map(|s| s.unread.get(contact_id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn unread_counts(&self) -> HashMap<String, u32> {
        self.state
            .read()
            .map(|s| s.unread.clone())
            .unwrap_or_default()
    }

    pub fn active_contact(&self) -> Option<String> {
        self.state.read().ok().and_then(|s| s.active.clone())
    }
}
