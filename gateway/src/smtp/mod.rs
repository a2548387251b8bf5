//! SMTP receiving side.
//!
//! ```text
//! socket bytes → LineBuffer → Session → MessageHandler (dispatcher queue)
//!                               ↓
//!                            replies → socket
//! ```

pub mod connection;
pub mod lines;
pub mod listener;
pub mod session;

pub use connection::Connection;
pub use lines::LineBuffer;
pub use listener::Listener;
pub use session::{Command, Reply, ReplySink, Session, SmtpState};
