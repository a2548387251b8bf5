//! Message types shared between the SMTP side and the delivery worker.
//!
//! A [`Message`] is produced by an SMTP session once a transaction completes
//! and is serialized into a [`WebhookPayload`] right before it is posted.

use serde::Serialize;

/// A completed SMTP transaction.
///
/// Messages are immutable once built; the session hands ownership to the
/// dispatcher queue as soon as the terminating `.` line is seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sender exactly as given after `MAIL FROM:` (including any angle brackets)
    pub from: Option<String>,
    /// Recipients in `RCPT TO:` order, duplicates preserved
    pub to: Vec<String>,
    /// Body lines, each terminated by a single `\n`
    pub data: String,
}

impl Message {
    /// Create a new message.
    pub fn new(from: Option<String>, to: Vec<String>, data: String) -> Self {
        Self { from, to, data }
    }

    /// Borrowing view of this message in the webhook wire format.
    pub fn payload(&self) -> WebhookPayload<'_> {
        WebhookPayload {
            envelope: Envelope {
                from: self.from.as_deref(),
                to: &self.to,
            },
            data: &self.data,
        }
    }

    /// Encode the message as the JSON body posted to the webhook.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.payload())
    }
}

// =============================================================================
// Wire format
// =============================================================================

/// JSON body posted to the webhook:
/// `{"envelope":{"from":...,"to":[...]},"data":...}`.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub envelope: Envelope<'a>,
    pub data: &'a str,
}

/// Envelope part of the webhook body. `from` serializes as `null` when absent.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub from: Option<&'a str>,
    pub to: &'a [String],
}
