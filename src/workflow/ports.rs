//! Port traits consumed by the workflow engine.
//!
//! Each port is a narrow external capability injected into the engine.
//! The engine is agnostic to whether an implementation is local
//! computation, a remote call, or a cached lookup; it only relies on the
//! contracts documented here. Implementations must resolve within bounded
//! time — timeout and retry policy belongs to them, not to the engine.

use async_trait::async_trait;

use crate::error::{ChannelError, LlmError, RetrievalError};

/// A drafted reply, tagged so the engine can log fallback substitutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftReply {
    pub text: String,
    /// True when the drafter degraded to its fixed fallback notice.
    pub is_fallback: bool,
}

impl DraftReply {
    pub fn drafted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_fallback: false,
        }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_fallback: true,
        }
    }
}

/// Intent classification over an email body.
///
/// Contract: always resolves to some category string from the documented
/// set, even for an empty body. Implementations recover from internal
/// faults by returning the default escalation category; the engine guards
/// the boundary a second time and substitutes the same default on `Err`.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, body: &str) -> Result<String, LlmError>;
}

/// Knowledge lookup for the auto-respond branch.
///
/// Contract: returns an ordered sequence of passages, possibly empty.
/// Zero results is not an error; the engine treats `Err` identically to
/// an empty result set.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn search(&self, body: &str) -> Result<Vec<String>, RetrievalError>;
}

/// Reply drafting from an email body plus retrieved context.
///
/// Contract: returns non-empty response text, or the fixed fallback notice
/// with `is_fallback` set when drafting degrades internally. An `Err` is a
/// contract breach; the engine terminates the case as failed rather than
/// deliver malformed content.
#[async_trait]
pub trait Drafter: Send + Sync {
    async fn draft(&self, body: &str, context: &str) -> Result<DraftReply, LlmError>;
}

/// Outbound delivery. At most one delivery attempt per call.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ChannelError>;
}
