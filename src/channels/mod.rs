//! Mail transport: IMAP inbound, SMTP outbound.

pub mod mailbox;
pub mod smtp;

pub use mailbox::{ImapMailbox, InboundEmail};
pub use smtp::SmtpNotifier;
