//! SMTP session state machine.
//!
//! The session knows nothing about sockets or HTTP. Replies go to a
//! [`ReplySink`] supplied by the caller and completed messages go to the
//! [`MessageHandler`] injected at construction.

use std::fmt;

use tracing::{debug, trace, warn};

use crate::queue::{Message, MessageHandler};

/// One reply line, without the trailing CRLF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    text: String,
    close: bool,
}

impl Reply {
    /// A reply after which the session keeps going.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            close: false,
        }
    }

    /// A reply after which the connection is closed once it has been written.
    pub fn closing(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            close: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the connection must be closed after this reply is flushed.
    pub fn closes(&self) -> bool {
        self.close
    }

    fn ok() -> Self {
        Self::new("250 Ok")
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Where a session's replies go.
pub trait ReplySink {
    fn send(&mut self, reply: Reply);
}

impl ReplySink for Vec<Reply> {
    fn send(&mut self, reply: Reply) {
        self.push(reply);
    }
}

/// Session mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpState {
    /// Waiting for commands
    Command,
    /// Collecting message body lines until a lone `.`
    Data,
}

/// Commands understood in command mode, matched by case-sensitive prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Hello,
    MailFrom(&'a str),
    RcptTo(&'a str),
    Data,
    Reset,
    Noop,
    Quit,
    Unknown,
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        if line.starts_with("HELO") || line.starts_with("EHLO") {
            Command::Hello
        } else if let Some(from) = line.strip_prefix("MAIL FROM:") {
            Command::MailFrom(from)
        } else if let Some(to) = line.strip_prefix("RCPT TO:") {
            Command::RcptTo(to)
        } else if line.starts_with("DATA") {
            Command::Data
        } else if line.starts_with("RSET") {
            Command::Reset
        } else if line.starts_with("NOOP") {
            Command::Noop
        } else if line.starts_with("QUIT") {
            Command::Quit
        } else {
            Command::Unknown
        }
    }
}

/// Per-connection SMTP state.
pub struct Session<H> {
    hostname: String,
    handler: H,
    state: SmtpState,
    from: Option<String>,
    to: Vec<String>,
    body: String,
}

impl<H: MessageHandler> Session<H> {
    pub fn new(hostname: impl Into<String>, handler: H) -> Self {
        Self {
            hostname: hostname.into(),
            handler,
            state: SmtpState::Command,
            from: None,
            to: Vec::new(),
            body: String::new(),
        }
    }

    /// Emit the `220` greeting. Called once, before any input is read.
    pub fn start(&mut self, sink: &mut impl ReplySink) {
        self.reply(sink, Reply::new(format!("220 {}", self.hostname)));
    }

    /// Process one line of input (terminator already removed).
    pub fn receive(&mut self, line: &str, sink: &mut impl ReplySink) {
        trace!(line = %line, "smtp_line_received");

        match self.state {
            SmtpState::Data => self.receive_data(line, sink),
            SmtpState::Command => self.receive_command(line, sink),
        }
    }

    pub fn state(&self) -> SmtpState {
        self.state
    }

    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn to(&self) -> &[String] {
        &self.to
    }

    fn receive_command(&mut self, line: &str, sink: &mut impl ReplySink) {
        let reply = match Command::parse(line) {
            Command::Hello => Reply::new("250 Hello"),
            Command::MailFrom(from) => {
                self.reset();
                self.from = Some(from.to_string());
                Reply::ok()
            }
            Command::RcptTo(to) => {
                self.to.push(to.to_string());
                Reply::ok()
            }
            Command::Data => {
                self.state = SmtpState::Data;
                Reply::new("354 Send data")
            }
            Command::Reset => {
                self.reset();
                Reply::ok()
            }
            Command::Noop => Reply::ok(),
            Command::Quit => Reply::closing("221 Bye"),
            Command::Unknown => {
                debug!(line = %line, "smtp_command_not_implemented");
                Reply::new("502 Command not implemented")
            }
        };

        self.reply(sink, reply);
    }

    fn receive_data(&mut self, line: &str, sink: &mut impl ReplySink) {
        if line != "." {
            self.body.push_str(line);
            self.body.push('\n');
            return;
        }

        self.state = SmtpState::Command;
        self.reply(sink, Reply::ok());

        match self.from.take() {
            Some(from) => {
                let message = Message::new(
                    Some(from),
                    std::mem::take(&mut self.to),
                    std::mem::take(&mut self.body),
                );
                debug!(
                    from = ?message.from,
                    recipients = message.to.len(),
                    body_length = message.data.len(),
                    "smtp_message_received"
                );
                self.handler.handle(message);
            }
            None => {
                warn!(
                    recipients = self.to.len(),
                    body_length = self.body.len(),
                    "smtp_message_dropped_no_sender"
                );
            }
        }

        self.reset();
    }

    fn reset(&mut self) {
        self.from = None;
        self.to.clear();
        self.body.clear();
    }

    fn reply(&self, sink: &mut impl ReplySink, reply: Reply) {
        trace!(reply = %reply, close = reply.closes(), "smtp_reply");
        sink.send(reply);
    }
}
