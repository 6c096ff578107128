//! Appointment Bot Library
//!
//! This library provides the Telegram bot, the registration form backend
//! and the scheduled appointment searches, together with the domain
//! logic and infrastructure adapters they share.

pub mod api;
pub mod appointments;
pub mod bot;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod scheduler;
pub mod searches;

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("appointment_bot=info,form_backend=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
