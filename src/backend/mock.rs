//! In-memory [`ChatBackend`] double for tests and headless development.
//!
//! Sent messages are stored into the mock's own histories, so a later
//! poll observes them the way it would observe server truth. Individual
//! calls can be held open with a [`Gate`] to exercise in-flight races.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;

use super::{ChatBackend, OutgoingMessage, SendReceipt};
use crate::error::FetchError;
use crate::models::{ChatMessage, Contact, ConversationKey};
use crate::session::AuthSession;

/// Hand-released latch holding a mock call open until the test is ready.
pub struct Gate {
    tx: watch::Sender<bool>,
}

impl Gate {
    /// Release every call waiting on this gate.
    pub fn open(&self) {
        let _ = self.tx.send(true);
    }
}

async fn wait(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[derive(Default)]
struct MockState {
    contacts: Vec<Contact>,
    histories: HashMap<ConversationKey, Vec<ChatMessage>>,
    fail_roster: bool,
    fail_history: bool,
    fail_send: bool,
    /// Per-contact latches for history calls.
    history_gates: HashMap<String, watch::Receiver<bool>>,
    /// Single latch for all send calls.
    send_gate: Option<watch::Receiver<bool>>,
}

/// Scripted in-memory backend bound to one viewer session, mirroring how
/// the HTTP implementation is bound to one authenticated viewer.
pub struct MockBackend {
    session: AuthSession,
    state: Mutex<MockState>,
    roster_calls: AtomicUsize,
    history_calls: AtomicUsize,
    send_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl MockBackend {
    pub fn new(session: AuthSession) -> Self {
        Self {
            session,
            state: Mutex::new(MockState::default()),
            roster_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            next_id: AtomicUsize::new(0),
        }
    }

    pub fn with_contacts(self, contacts: Vec<Contact>) -> Self {
        self.put_contacts(contacts);
        self
    }

    // ── Scripting ───────────────────────────────────────────

    pub fn put_contacts(&self, contacts: Vec<Contact>) {
        if let Ok(mut state) = self.state.lock() {
            state.contacts = contacts;
        }
    }

    pub fn set_history(&self, key: ConversationKey, messages: Vec<ChatMessage>) {
        if let Ok(mut state) = self.state.lock() {
            state.histories.insert(key, messages);
        }
    }

    pub fn push_history(&self, key: ConversationKey, message: ChatMessage) {
        if let Ok(mut state) = self.state.lock() {
            state.histories.entry(key).or_default().push(message);
        }
    }

    pub fn fail_roster(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_roster = fail;
        }
    }

    pub fn fail_history(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_history = fail;
        }
    }

    pub fn fail_send(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_send = fail;
        }
    }

    /// Hold every history call for `contact_id` open until the returned
    /// gate is released.
    pub fn hold_history(&self, contact_id: &str) -> Gate {
        let (tx, rx) = watch::channel(false);
        if let Ok(mut state) = self.state.lock() {
            state.history_gates.insert(contact_id.to_string(), rx);
        }
        Gate { tx }
    }

    /// Hold every send call open until the returned gate is released.
    pub fn hold_sends(&self) -> Gate {
        let (tx, rx) = watch::channel(false);
        if let Ok(mut state) = self.state.lock() {
            state.send_gate = Some(rx);
        }
        Gate { tx }
    }

    // ── Observability ───────────────────────────────────────

    pub fn roster_fetches(&self) -> usize {
        self.roster_calls.load(Ordering::Relaxed)
    }

    pub fn history_fetches(&self) -> usize {
        self.history_calls.load(Ordering::Relaxed)
    }

    pub fn sends(&self) -> usize {
        self.send_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn list_contacts(&self) -> Result<Vec<Contact>, FetchError> {
        self.roster_calls.fetch_add(1, Ordering::Relaxed);
        let (fail, contacts) = {
            let state = self.state.lock().map_err(|_| poisoned())?;
            (state.fail_roster, state.contacts.clone())
        };
        if fail {
            return Err(FetchError::Connect("mock".into()));
        }
        Ok(contacts)
    }

    async fn conversation_history(
        &self,
        key: &ConversationKey,
    ) -> Result<Vec<ChatMessage>, FetchError> {
        self.history_calls.fetch_add(1, Ordering::Relaxed);
        let gate = {
            let state = self.state.lock().map_err(|_| poisoned())?;
            key.other_than(&self.session.user_id)
                .and_then(|contact| state.history_gates.get(contact).cloned())
        };
        if let Some(rx) = gate {
            wait(rx).await;
        }

        let state = self.state.lock().map_err(|_| poisoned())?;
        if state.fail_history {
            return Err(FetchError::Connect("mock".into()));
        }
        Ok(state.histories.get(key).cloned().unwrap_or_default())
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<SendReceipt, FetchError> {
        self.send_calls.fetch_add(1, Ordering::Relaxed);
        let gate = {
            let state = self.state.lock().map_err(|_| poisoned())?;
            state.send_gate.clone()
        };
        if let Some(rx) = gate {
            wait(rx).await;
        }

        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if state.fail_send {
            return Err(FetchError::Connect("mock".into()));
        }

        let id = format!("m{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        if let Some(key) = self.session.conversation_with(&message.recipient_id) {
            state.histories.entry(key).or_default().push(ChatMessage {
                id: Some(id.clone()),
                sender_id: message.sender_id.clone(),
                recipient_id: message.recipient_id.clone(),
                body: message.body.clone(),
                timestamp: message.timestamp,
                pending: false,
                local_key: Some(message.local_key),
            });
        }
        Ok(SendReceipt {
            id,
            local_key: Some(message.local_key),
        })
    }
}

fn poisoned() -> FetchError {
    FetchError::Transport("mock state lock poisoned".into())
}
