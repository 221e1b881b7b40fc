//! Client-side core for a clinic management application.
//!
//! The crate has two halves:
//! - thin typed service wrappers over the clinic REST backend
//!   ([`services`]), covering login/registration, the admin approval
//!   workflow, doctor roster management, and the treatment catalog;
//! - the messaging core ([`chat`]): contact directory with unread
//!   accounting, the active-conversation controller with optimistic
//!   sends, and the polling tickers that stand in for a push transport.
//!
//! Everything is UI-agnostic: dashboards read state snapshots and listen
//! on an event stream. Identity is injected as an
//! [`AuthSession`](session::AuthSession); there is no ambient global
//! state.

pub mod backend;
pub mod chat;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for an embedding application. Honors `RUST_LOG`,
/// falling back to [`config::default_log_filter`]. Call once at startup.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
