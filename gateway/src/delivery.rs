//! Webhook delivery - posting completed messages to the configured URL.
//!
//! Delivery is blocking and runs only on the dispatcher worker thread, so a
//! slow webhook never stalls the SMTP side.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::config::Verbosity;
use crate::queue::Message;

/// Maximum number of redirect hops followed per delivery.
pub const MAX_REDIRECTS: usize = 5;

/// Why a single delivery attempt failed. None of these are retried.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),
}

/// Something that can hand a message to its final destination.
///
/// Implemented by [`WebhookClient`] and by plain closures, which is what the
/// tests use to observe the worker.
pub trait Deliver: Send + 'static {
    fn deliver(&mut self, message: &Message) -> Result<(), DeliveryError>;
}

impl<F> Deliver for F
where
    F: FnMut(&Message) -> Result<(), DeliveryError> + Send + 'static,
{
    fn deliver(&mut self, message: &Message) -> Result<(), DeliveryError> {
        self(message)
    }
}

/// Blocking HTTP client bound to one webhook URL.
///
/// Must be created and dropped outside of an async context; the binary builds
/// it before starting the runtime and the worker thread owns it afterwards.
pub struct WebhookClient {
    client: Client,
    url: Url,
    verbosity: Verbosity,
}

impl WebhookClient {
    /// Build a client posting to `url`. `timeout` of `None` waits forever.
    pub fn new(
        url: Url,
        timeout: Option<Duration>,
        verbosity: Verbosity,
    ) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("smtp2http/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url,
            verbosity,
        })
    }

    /// The webhook this client posts to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Post one message. Only an HTTP 200 counts as delivered.
    pub fn post(&self, message: &Message) -> Result<(), DeliveryError> {
        let body = message.to_json()?;

        debug!(
            url = %self.url,
            from = ?message.from,
            recipients = message.to.len(),
            body_length = body.len(),
            "webhook_delivery_starting"
        );

        if self.verbosity.dumps_traffic() {
            debug!(body = %String::from_utf8_lossy(&body), "webhook_request_body");
        }

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;

        let status = response.status();
        let final_url = response.url().clone();

        if self.verbosity.dumps_traffic() {
            // A body we cannot read is not a delivery failure; the status is all that counts.
            let text = response.text().unwrap_or_default();
            debug!(
                status_code = status.as_u16(),
                url = %final_url,
                body = %text,
                "webhook_response_body"
            );
        }

        if status != StatusCode::OK {
            return Err(DeliveryError::UnexpectedStatus(status.as_u16()));
        }

        info!(
            url = %final_url,
            status_code = status.as_u16(),
            recipients = message.to.len(),
            "webhook_delivered"
        );

        Ok(())
    }
}

impl Deliver for WebhookClient {
    fn deliver(&mut self, message: &Message) -> Result<(), DeliveryError> {
        self.post(message)
    }
}
