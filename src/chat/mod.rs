//! Role-agnostic messaging core shared by the doctor and patient
//! dashboards.
//!
//! Components:
//! - [`ConversationDirectory`]: contact roster and per-contact unread
//!   counters for the current viewer.
//! - [`ChatController`]: the single active conversation: history load,
//!   optimistic send, reconciliation, stale-result guarding.
//! - [`poller`]: the two 5-second tickers used in lieu of a push
//!   transport, with failure backoff.
//! - [`Messenger`]: one facade per mounted dashboard wiring the three
//!   together, parameterized by the injected viewer session so the same
//!   code serves both sides of a conversation.
//!
//! Data flows one way into the UI: directory → selection → controller →
//! ticker → controller → snapshot. The reverse path (a user send) goes
//! through optimistic local insertion and is reconciled by the send
//! receipt or the next poll's overwrite, whichever lands first.

pub mod controller;
pub mod directory;
pub mod poller;

pub use controller::{ChatController, ConversationView, PollOutcome};
pub use directory::ConversationDirectory;
pub use poller::TickerHandle;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::backend::{ChatBackend, HttpBackend};
use crate::config::BackendConfig;
use crate::error::ChatError;
use crate::models::Contact;
use crate::session::AuthSession;

/// Capacity of the UI event channel. Events only nudge the UI; state is
/// read through the snapshot accessors.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events pushed to the surrounding dashboard UI. State itself is read
/// through the snapshot accessors on [`Messenger`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The roster snapshot changed.
    ContactsRefreshed,
    ContactSelected {
        contact_id: String,
    },
    /// New counterpart messages were applied to the open transcript; the
    /// view should scroll to the latest entry.
    TranscriptUpdated {
        contact_id: String,
    },
    UnreadChanged {
        contact_id: String,
        unread: u32,
    },
    /// A send failed and its optimistic entry was removed from the
    /// transcript, which is the only user-visible failure signal.
    SendFailed {
        reason: String,
    },
    ConversationClosed,
}

/// One messaging core per mounted dashboard instance.
pub struct Messenger {
    config: BackendConfig,
    directory: Arc<ConversationDirectory>,
    controller: Arc<ChatController>,
    events: broadcast::Sender<ChatEvent>,
    conversation_ticker: Mutex<Option<TickerHandle>>,
    roster_ticker: Mutex<Option<TickerHandle>>,
}

impl Messenger {
    /// Wire a messaging core for one viewer. Rejects roles without a
    /// messaging dashboard.
    pub fn new(
        config: BackendConfig,
        session: AuthSession,
        backend: Arc<dyn ChatBackend>,
    ) -> Result<Self, ChatError> {
        let controller = Arc::new(ChatController::new(backend.clone(), session)?);
        let directory = Arc::new(ConversationDirectory::new(backend));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            config,
            directory,
            controller,
            events,
            conversation_ticker: Mutex::new(None),
            roster_ticker: Mutex::new(None),
        })
    }

    /// Convenience constructor over the REST backend.
    pub fn over_http(config: BackendConfig, session: AuthSession) -> Result<Self, ChatError> {
        let backend = Arc::new(HttpBackend::new(&config, session.clone()));
        Self::new(config, session, backend)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Enter the messaging view: start the roster ticker, then do the
    /// initial roster fetch. A failed initial fetch propagates, but the
    /// ticker keeps running; polling is the retry mechanism.
    pub async fn start(&self) -> Result<(), ChatError> {
        {
            let mut ticker = self
                .roster_ticker
                .lock()
                .map_err(|_| ChatError::LockPoisoned)?;
            *ticker = Some(poller::spawn_roster_ticker(
                self.directory.clone(),
                self.events.clone(),
                &self.config,
            ));
        }
        self.directory.refresh_contacts().await?;
        let _ = self.events.send(ChatEvent::ContactsRefreshed);
        Ok(())
    }

    /// Leave the messaging view: tear down both tickers and the open
    /// conversation.
    pub fn stop(&self) {
        if let Ok(mut ticker) = self.roster_ticker.lock() {
            *ticker = None;
        }
        self.close_conversation();
    }

    /// Select a contact: cancel the previous conversation's ticker, reset
    /// the contact's unread counter, load its history, and start its poll
    /// ticker. The ticker is only started when the history load succeeds.
    pub async fn select_contact(&self, contact_id: &str) -> Result<(), ChatError> {
        if let Ok(mut ticker) = self.conversation_ticker.lock() {
            *ticker = None;
        }

        let contact = self
            .directory
            .select_contact(contact_id)
            .ok_or_else(|| ChatError::UnknownContact(contact_id.to_string()))?;
        let _ = self.events.send(ChatEvent::ContactSelected {
            contact_id: contact_id.to_string(),
        });

        let generation = self.controller.open(contact.id()).await?;

        let handle = poller::spawn_conversation_ticker(
            self.controller.clone(),
            self.directory.clone(),
            self.events.clone(),
            contact_id.to_string(),
            generation,
            &self.config,
        );
        if let Ok(mut ticker) = self.conversation_ticker.lock() {
            *ticker = Some(handle);
        }
        Ok(())
    }

    /// Send a message into the active conversation. Failures also surface
    /// as a [`ChatEvent::SendFailed`] on the event stream.
    pub async fn send(&self, body: &str) -> Result<(), ChatError> {
        match self.controller.send(body).await {
            Ok(()) => {
                if let Some(contact_id) = self.controller.view().active_contact_id {
                    let _ = self.events.send(ChatEvent::TranscriptUpdated { contact_id });
                }
                Ok(())
            }
            Err(e) => {
                let _ = self.events.send(ChatEvent::SendFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Close the active conversation: stop its ticker, clear the view.
    pub fn close_conversation(&self) {
        if let Ok(mut ticker) = self.conversation_ticker.lock() {
            *ticker = None;
        }
        self.controller.close();
        self.directory.clear_active();
        let _ = self.events.send(ChatEvent::ConversationClosed);
    }

    /// One-off roster refresh outside the ticker cadence.
    pub async fn refresh_contacts(&self) -> Result<(), ChatError> {
        let changed = self.directory.refresh_contacts().await?;
        for (contact_id, unread) in changed {
            let _ = self.events.send(ChatEvent::UnreadChanged { contact_id, unread });
        }
        let _ = self.events.send(ChatEvent::ContactsRefreshed);
        Ok(())
    }

    // ── Snapshots for rendering ─────────────────────────────

    pub fn contacts(&self) -> Vec<Contact> {
        self.directory.contacts()
    }

    pub fn unread_counts(&self) -> HashMap<String, u32> {
        self.directory.unread_counts()
    }

    pub fn conversation(&self) -> ConversationView {
        self.controller.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::models::{ChatMessage, ConversationKey, Contact, DoctorContact, Role};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tokio::task::yield_now;

    fn alice() -> Contact {
        Contact::Doctor(DoctorContact {
            id: "d1".into(),
            name: "Alice".into(),
            specialization: Some("Cardiology".into()),
            message_count: 0,
        })
    }

    fn doctor_contact(id: &str, message_count: u64) -> Contact {
        Contact::Doctor(DoctorContact {
            id: id.into(),
            name: format!("Dr. {id}"),
            specialization: None,
            message_count,
        })
    }

    fn from_doctor(doctor: &str, id: &str, body: &str, secs: i64) -> ChatMessage {
        ChatMessage {
            id: Some(id.into()),
            sender_id: doctor.into(),
            recipient_id: "p1".into(),
            body: body.into(),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            pending: false,
            local_key: None,
        }
    }

    fn patient_messenger(contacts: Vec<Contact>) -> (Arc<MockBackend>, Messenger) {
        let session = AuthSession::new("p1", Role::Patient, "tok");
        let backend = Arc::new(MockBackend::new(session.clone()).with_contacts(contacts));
        let messenger = Messenger::new(
            BackendConfig::new("http://localhost:3001"),
            session,
            backend.clone(),
        )
        .unwrap();
        (backend, messenger)
    }

    #[tokio::test]
    async fn patient_opens_conversation_and_sends() {
        let (backend, messenger) = patient_messenger(vec![alice()]);
        backend.set_history(
            ConversationKey::new("d1", "p1"),
            vec![from_doctor("d1", "1", "hi", 100)],
        );
        messenger.start().await.unwrap();

        messenger.select_contact("d1").await.unwrap();
        let view = messenger.conversation();
        assert_eq!(view.messages.len(), 1);
        assert!(!view.messages[0].pending);
        assert_eq!(view.messages[0].sender_id, "d1");

        // Optimistic append is visible before the send resolves.
        let gate = backend.hold_sends();
        let messenger = Arc::new(messenger);
        let send = {
            let messenger = messenger.clone();
            tokio::spawn(async move { messenger.send("thanks").await })
        };
        yield_now().await;

        let view = messenger.conversation();
        assert_eq!(view.messages.len(), 2);
        let staged = &view.messages[1];
        assert_eq!(staged.sender_id, "p1");
        assert_eq!(staged.body, "thanks");
        assert!(staged.pending);

        gate.open();
        send.await.unwrap().unwrap();
        assert!(!messenger.conversation().messages[1].pending);
    }

    #[tokio::test]
    async fn empty_body_never_reaches_the_backend() {
        let (backend, messenger) = patient_messenger(vec![alice()]);
        messenger.start().await.unwrap();
        messenger.select_contact("d1").await.unwrap();
        let before = messenger.conversation().messages.len();

        let err = messenger.send("   ").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
        assert_eq!(backend.sends(), 0);
        assert_eq!(messenger.conversation().messages.len(), before);
    }

    #[tokio::test]
    async fn selecting_unknown_contact_is_rejected() {
        let (_backend, messenger) = patient_messenger(vec![alice()]);
        messenger.start().await.unwrap();

        let err = messenger.select_contact("d9").await.unwrap_err();
        assert!(matches!(err, ChatError::UnknownContact(_)));
        assert_eq!(messenger.conversation().active_contact_id, None);
    }

    #[tokio::test]
    async fn send_failure_emits_event_and_rolls_back() {
        let (backend, messenger) = patient_messenger(vec![alice()]);
        messenger.start().await.unwrap();
        messenger.select_contact("d1").await.unwrap();
        let mut events = messenger.subscribe();

        backend.fail_send(true);
        assert!(messenger.send("doomed").await.is_err());
        assert!(messenger.conversation().messages.is_empty());

        let event = events.recv().await.unwrap();
        assert!(matches!(event, ChatEvent::SendFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn conversation_ticker_applies_counterpart_messages() {
        let (backend, messenger) = patient_messenger(vec![alice()]);
        messenger.start().await.unwrap();
        messenger.select_contact("d1").await.unwrap();
        assert!(messenger.conversation().messages.is_empty());

        backend.push_history(
            ConversationKey::new("d1", "p1"),
            from_doctor("d1", "2", "checking in", 200),
        );

        // Past one 5s tick (paused clock, so this is deterministic).
        tokio::time::sleep(Duration::from_millis(5_100)).await;

        let view = messenger.conversation();
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.messages[0].body, "checking in");
        // Open conversation never accrues unread badges.
        assert_eq!(messenger.unread_counts().get("d1"), Some(&0));
    }

    #[tokio::test(start_paused = true)]
    async fn roster_ticker_feeds_unread_for_closed_conversations() {
        let (backend, messenger) =
            patient_messenger(vec![doctor_contact("d1", 0), doctor_contact("d2", 3)]);
        messenger.start().await.unwrap();
        messenger.select_contact("d1").await.unwrap();

        // Two messages land on d2's conversation while d1 is open.
        backend.put_contacts(vec![doctor_contact("d1", 0), doctor_contact("d2", 5)]);
        tokio::time::sleep(Duration::from_millis(5_100)).await;

        assert_eq!(messenger.unread_counts().get("d2"), Some(&2));
        assert_eq!(messenger.unread_counts().get("d1").copied().unwrap_or(0), 0);

        // Selecting d2 resets its badge.
        messenger.select_contact("d2").await.unwrap();
        assert_eq!(messenger.unread_counts().get("d2"), Some(&0));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_tears_down_both_tickers() {
        let (backend, messenger) = patient_messenger(vec![alice()]);
        messenger.start().await.unwrap();
        messenger.select_contact("d1").await.unwrap();

        let rosters_before = backend.roster_fetches();
        let histories_before = backend.history_fetches();
        messenger.stop();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.roster_fetches(), rosters_before);
        assert_eq!(backend.history_fetches(), histories_before);
        assert_eq!(messenger.conversation().active_contact_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_contacts_replaces_the_conversation_ticker() {
        let (backend, messenger) =
            patient_messenger(vec![doctor_contact("d1", 0), doctor_contact("d2", 0)]);
        backend.set_history(
            ConversationKey::new("d2", "p1"),
            vec![from_doctor("d2", "9", "from d2", 900)],
        );
        messenger.start().await.unwrap();

        messenger.select_contact("d1").await.unwrap();
        messenger.select_contact("d2").await.unwrap();

        // Only d2's ticker is live: d1's history is never fetched again.
        let d1_fetches = backend.history_fetches();
        backend.push_history(
            ConversationKey::new("d1", "p1"),
            from_doctor("d1", "3", "late for d1", 300),
        );
        tokio::time::sleep(Duration::from_millis(5_100)).await;

        let view = messenger.conversation();
        assert_eq!(view.active_contact_id.as_deref(), Some("d2"));
        assert!(view.messages.iter().all(|m| m.sender_id != "d1"));
        // Exactly one extra fetch happened in that window (d2's tick).
        assert_eq!(backend.history_fetches(), d1_fetches + 1);
    }
}
