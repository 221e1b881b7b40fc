//! Periodic refresh for the messaging view.
//!
//! Two independent tickers, both on the same fixed cadence: one re-fetches
//! the active conversation's history, one re-fetches the contact roster to
//! catch messages arriving on conversations that are not open. Tick
//! failures are logged and swallowed (polling is its own retry), but
//! consecutive failures stretch the interval with a capped, jittered
//! backoff so a degraded backend is not hammered at full cadence.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::controller::{ChatController, PollOutcome};
use super::directory::ConversationDirectory;
use super::ChatEvent;
use crate::config::BackendConfig;
use crate::error::ChatError;

/// Abort-on-drop guard for a spawned ticker.
///
/// Exactly one conversation ticker and one roster ticker may live per
/// mounted dashboard; dropping (or replacing) the owning handle is the
/// teardown.
pub struct TickerHandle {
    task: JoinHandle<()>,
}

impl TickerHandle {
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Interval policy: base cadence while healthy, doubled per consecutive
/// failure up to a ceiling, reset on the first success.
pub(crate) struct PollBackoff {
    base: Duration,
    ceiling: Duration,
    failures: u32,
}

impl PollBackoff {
    pub(crate) fn new(base: Duration, ceiling: Duration) -> Self {
        Self {
            base,
            ceiling,
            failures: 0,
        }
    }

    pub(crate) fn on_success(&mut self) -> Duration {
        self.failures = 0;
        self.base
    }

    pub(crate) fn on_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let exponent = self.failures.min(10);
        let stretched = self
            .base
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.ceiling);
        jitter(stretched)
    }
}

/// Spread a delay by up to +20% so stalled clients do not re-align into
/// synchronized retry bursts.
fn jitter(delay: Duration) -> Duration {
    let ceiling = (delay.as_millis() / 5) as u64;
    if ceiling == 0 {
        return delay;
    }
    let extra = rand::thread_rng().gen_range(0..=ceiling);
    delay + Duration::from_millis(extra)
}

/// Start the per-conversation ticker.
///
/// Each tick re-fetches the active history, reconciles it, and feeds
/// genuinely new counterpart messages to the directory's unread
/// accounting (suppressed there for the active contact). The ticker
/// retires itself as soon as the conversation generation moves.
pub fn spawn_conversation_ticker(
    controller: Arc<ChatController>,
    directory: Arc<ConversationDirectory>,
    events: broadcast::Sender<ChatEvent>,
    contact_id: String,
    generation: u64,
    config: &BackendConfig,
) -> TickerHandle {
    let mut backoff = PollBackoff::new(config.poll_interval, config.backoff_ceiling);
    let task = tokio::spawn(async move {
        let mut delay = backoff.on_success();
        loop {
            tokio::time::sleep(delay).await;
            match controller.poll_active(generation).await {
                Ok(PollOutcome::Applied {
                    new_from_counterpart,
                }) => {
                    if new_from_counterpart > 0 {
                        // Suppressed by the directory while the contact is active.
                        if let Some(unread) =
                            directory.record_incoming(&contact_id, new_from_counterpart as u32)
                        {
                            let _ = events.send(ChatEvent::UnreadChanged {
                                contact_id: contact_id.clone(),
                                unread,
                            });
                        }
                        let _ = events.send(ChatEvent::TranscriptUpdated {
                            contact_id: contact_id.clone(),
                        });
                    }
                    delay = backoff.on_success();
                }
                Ok(PollOutcome::Stale) | Err(ChatError::NoActiveConversation) => {
                    tracing::debug!(contact_id = %contact_id, "Conversation ticker retired");
                    break;
                }
                Err(e) => {
                    tracing::debug!(contact_id = %contact_id, error = %e, "Poll tick failed");
                    delay = backoff.on_failure();
                }
            }
        }
    });
    TickerHandle { task }
}

/// Start the roster ticker: refreshes the whole contact list so unread
/// accounting catches activity on conversations that are not open.
pub fn spawn_roster_ticker(
    directory: Arc<ConversationDirectory>,
    events: broadcast::Sender<ChatEvent>,
    config: &BackendConfig,
) -> TickerHandle {
    let mut backoff = PollBackoff::new(config.poll_interval, config.backoff_ceiling);
    let task = tokio::spawn(async move {
        let mut delay = backoff.on_success();
        loop {
            tokio::time::sleep(delay).await;
            match directory.refresh_contacts().await {
                Ok(changed) => {
                    for (contact_id, unread) in changed {
                        let _ = events.send(ChatEvent::UnreadChanged { contact_id, unread });
                    }
                    let _ = events.send(ChatEvent::ContactsRefreshed);
                    delay = backoff.on_success();
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Roster tick failed");
                    delay = backoff.on_failure();
                }
            }
        }
    });
    TickerHandle { task }
}
