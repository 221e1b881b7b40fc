//! The active conversation: history load, optimistic send, reconcile.
//!
//! One message moves through a small state machine: staged (pending) on
//! optimistic insert; then either confirmed (the send receipt is matched
//! back via the correlation key, or the entry is absorbed by the next
//! poll's authoritative overwrite) or removed when the send fails.
//!
//! Every open/close bumps a generation counter. Async results (the
//! initial history load and every poll tick) carry the generation they
//! were issued under and are discarded on mismatch, so a slow response
//! for an abandoned contact can never overwrite a newer view.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::backend::{ChatBackend, OutgoingMessage};
use crate::error::ChatError;
use crate::models::{sort_transcript, ChatMessage, ConversationKey};
use crate::session::AuthSession;

/// Snapshot of the conversation view.
#[derive(Debug, Clone, Default)]
pub struct ConversationView {
    /// At most one active conversation per dashboard instance.
    pub active_contact_id: Option<String>,
    /// Transcript, timestamp-ascending.
    pub messages: Vec<ChatMessage>,
    /// True only during the initial history load of a newly opened
    /// conversation, never during poll refreshes.
    pub loading: bool,
}

/// Result of applying one poll tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Tick applied. Carries the count of genuinely new messages authored
    /// by the counterpart, for unread accounting.
    Applied { new_from_counterpart: usize },
    /// The conversation changed while the fetch was in flight; the result
    /// was discarded and the ticker should retire itself.
    Stale,
}

pub struct ChatController {
    backend: Arc<dyn ChatBackend>,
    session: AuthSession,
    state: RwLock<ConversationView>,
    generation: AtomicU64,
}

impl std::fmt::Debug for ChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("session", &self.session)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl ChatController {
    /// Rejects roles without a messaging dashboard.
    pub fn new(backend: Arc<dyn ChatBackend>, session: AuthSession) -> Result<Self, ChatError> {
        if session.role.counterpart().is_none() {
            return Err(ChatError::UnsupportedRole(session.role));
        }
        Ok(Self {
            backend,
            session,
            state: RwLock::new(ConversationView::default()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn key_for(&self, contact_id: &str) -> Result<ConversationKey, ChatError> {
        self.session
            .conversation_with(contact_id)
            .ok_or(ChatError::UnsupportedRole(self.session.role))
    }

    /// Open a conversation: mark it active, load the full history, and
    /// replace the transcript (timestamp-ascending). Returns the
    /// generation under which the load ran, for tagging the poll ticker.
    ///
    /// On fetch failure the transcript is left as it was (empty on first
    /// open), loading is cleared, and the error propagates; no distinct
    /// error banner is surfaced here.
    pub async fn open(&self, contact_id: &str) -> Result<u64, ChatError> {
        let key = self.key_for(contact_id)?;
        let generation = self.bump_generation();
        {
            let mut view = self.state.write().map_err(|_| ChatError::LockPoisoned)?;
            view.active_contact_id = Some(contact_id.to_string());
            view.loading = true;
        }

        let result = self.backend.conversation_history(&key).await;

        let mut view = self.state.write().map_err(|_| ChatError::LockPoisoned)?;
        if self.generation.load(Ordering::SeqCst) != generation {
            // A later open or close superseded this load; its result must
            // not touch the view, including the loading flag.
            tracing::debug!(contact_id = %contact_id, "Dropped superseded history load");
            return Ok(generation);
        }
        view.loading = false;
        match result {
            Ok(mut history) => {
                sort_transcript(&mut history);
                view.messages = history;
                Ok(generation)
            }
            Err(e) => {
                tracing::warn!(contact_id = %contact_id, error = %e, "History load failed");
                Err(ChatError::Fetch(e))
            }
        }
    }

    /// Close the conversation: clear the active contact and transcript.
    /// Outstanding async results for it become stale via the generation.
    pub fn close(&self) {
        self.bump_generation();
        if let Ok(mut view) = self.state.write() {
            view.active_contact_id = None;
            view.messages.clear();
            view.loading = false;
        }
    }

    /// Validate, optimistically append, then issue the send.
    ///
    /// The append happens before the first await, so the transcript shows
    /// the pending entry immediately. On success the receipt's id is
    /// matched back via the correlation key and the entry flips to
    /// confirmed. On failure the entry is removed: no retry, no
    /// failed-message flag; the user retypes.
    pub async fn send(&self, body: &str) -> Result<(), ChatError> {
        if body.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let contact_id = {
            let view = self.state.read().map_err(|_| ChatError::LockPoisoned)?;
            view.active_contact_id
                .clone()
                .ok_or(ChatError::NoActiveConversation)?
        };

        let local_key = Uuid::new_v4();
        let staged = ChatMessage::staged(&self.session.user_id, &contact_id, body, local_key);
        let outgoing = OutgoingMessage {
            sender_id: staged.sender_id.clone(),
            recipient_id: staged.recipient_id.clone(),
            body: staged.body.clone(),
            timestamp: staged.timestamp,
            local_key,
        };
        {
            let mut view = self.state.write().map_err(|_| ChatError::LockPoisoned)?;
            view.messages.push(staged);
        }

        match self.backend.send_message(&outgoing).await {
            Ok(receipt) => {
                if let Ok(mut view) = self.state.write() {
                    if let Some(entry) = view
                        .messages
                        .iter_mut()
                        .find(|m| m.local_key == Some(local_key))
                    {
                        entry.id = Some(receipt.id);
                        entry.pending = false;
                    }
                }
                Ok(())
            }
            Err(e) => {
                if let Ok(mut view) = self.state.write() {
                    view.messages.retain(|m| m.local_key != Some(local_key));
                }
                tracing::warn!(error = %e, "Send failed, optimistic entry removed");
                Err(ChatError::Fetch(e))
            }
        }
    }

    /// One poll tick: re-fetch the full history for the conversation that
    /// was active at `generation` and reconcile it into the transcript.
    pub async fn poll_active(&self, generation: u64) -> Result<PollOutcome, ChatError> {
        let contact_id = {
            let view = self.state.read().map_err(|_| ChatError::LockPoisoned)?;
            if self.generation.load(Ordering::SeqCst) != generation {
                return Ok(PollOutcome::Stale);
            }
            view.active_contact_id
                .clone()
                .ok_or(ChatError::NoActiveConversation)?
        };
        let key = self.key_for(&contact_id)?;
        let history = self.backend.conversation_history(&key).await?;
        Ok(self.apply_poll(generation, history))
    }

    /// Reconcile one fetched history into the transcript.
    ///
    /// The server list is authoritative and replaces the transcript
    /// wholesale; still-pending optimistic entries without a server
    /// counterpart are carried over so an in-flight send does not vanish
    /// from the view. Applying the same history twice leaves the
    /// transcript content-equal. Stale generations are discarded.
    pub fn apply_poll(&self, generation: u64, mut history: Vec<ChatMessage>) -> PollOutcome {
        let Ok(mut view) = self.state.write() else {
            return PollOutcome::Stale;
        };
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Dropped stale poll result");
            return PollOutcome::Stale;
        }

        let new_from_counterpart = {
            let known: HashSet<&str> = view
                .messages
                .iter()
                .filter_map(|m| m.id.as_deref())
                .collect();
            history
                .iter()
                .filter(|m| !self.session.is_own_message(&m.sender_id))
                .filter(|m| m.id.as_deref().map_or(true, |id| !known.contains(id)))
                .count()
        };

        let in_flight: Vec<ChatMessage> = view
            .messages
            .iter()
            .filter(|m| m.pending && !has_server_copy(&history, m))
            .cloned()
            .collect();

        view.messages = history;
        view.messages.extend(in_flight);
        sort_transcript(&mut view.messages);

        PollOutcome::Applied {
            new_from_counterpart,
        }
    }

    /// Clone-out snapshot for rendering.
    pub fn view(&self) -> ConversationView {
        self.state.read().map(|v| v.clone()).unwrap_or_default()
    }
}

/// Whether the fetched history already contains the server copy of a
/// still-pending optimistic entry.
fn has_server_copy(history: &[ChatMessage], staged: &ChatMessage) -> bool {
    history.iter().any(|stored| {
        if staged.local_key.is_some() && stored.local_key == staged.local_key {
            return true;
        }
        stored.sender_id == staged.sender_id
            && stored.body == staged.body
            && stored.timestamp >= staged.timestamp
    })
}
