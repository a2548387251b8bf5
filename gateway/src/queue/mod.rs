//! Hand-off between SMTP sessions and webhook delivery.
//!
//! This module provides:
//! - The [`Message`] type and its JSON wire format
//! - The [`Dispatcher`]: one FIFO queue and one delivery thread
//!
//! ## Architecture
//!
//! ```text
//! Sessions → DispatchHandle::enqueue → queue → worker thread → Deliver
//! ```

pub mod dispatcher;
pub mod types;

pub use dispatcher::{DispatchHandle, Dispatcher, MessageHandler};
pub use types::{Envelope, Message, WebhookPayload};
