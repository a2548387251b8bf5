//! smtp2http - receive mail over SMTP and forward it to an HTTP webhook.
//!
//! Every completed SMTP transaction is posted to the configured URL as
//! `{"envelope":{"from":...,"to":[...]},"data":...}`.
//!
//! ## Architecture
//!
//! ```text
//! SMTP clients → Listener → Connection/Session (tokio) → Dispatcher queue
//!                                                            ↓
//!                                  worker thread → WebhookClient → HTTP POST
//! ```
//!
//! The SMTP side never waits on HTTP: sessions only enqueue, and a single
//! dedicated thread performs the blocking deliveries in order.

pub mod config;
pub mod delivery;
#[cfg(unix)]
pub mod notify;
pub mod queue;
pub mod smtp;

// Re-export commonly used types
pub use config::{Config, ConfigError, LogFormat, Verbosity};
pub use delivery::{Deliver, DeliveryError, WebhookClient};
pub use queue::{DispatchHandle, Dispatcher, Message, MessageHandler};
pub use smtp::{Listener, Session};
