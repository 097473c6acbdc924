//! The per-email processing record.

use serde::Serialize;

/// Terminal disposition of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Sent,
    Escalated,
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Sent => "SENT",
            Self::Escalated => "ESCALATED",
            Self::Failed => "FAILED",
        };
        f.write_str(tag)
    }
}

/// The unit of work, created once per inbound email and owned exclusively
/// by a single workflow execution.
///
/// A case is born with only the identity fields populated; nodes fill in
/// `classification`, `knowledge_context` and `draft` as they run, and every
/// node appends at least one entry to `log`. The engine guarantees that
/// `outcome` is set exactly once before the case is returned.
#[derive(Debug, Clone, Serialize)]
pub struct Case {
    pub email_id: String,
    pub sender: String,
    pub subject: String,
    pub raw_body: String,
    /// Set by the Classify node; once set, never overwritten.
    pub classification: Option<String>,
    /// Set only on the auto-respond branch.
    pub knowledge_context: Option<String>,
    /// Set only on the auto-respond branch, before sending.
    pub draft: Option<String>,
    /// Ordered, append-only processing trail.
    pub log: Vec<String>,
    pub outcome: Option<Outcome>,
}

impl Case {
    /// Create a fresh case for an inbound email.
    pub fn new(
        email_id: impl Into<String>,
        sender: impl Into<String>,
        subject: impl Into<String>,
        raw_body: impl Into<String>,
    ) -> Self {
        Self {
            email_id: email_id.into(),
            sender: sender.into(),
            subject: subject.into(),
            raw_body: raw_body.into(),
            classification: None,
            knowledge_context: None,
            draft: None,
            log: Vec::new(),
            outcome: None,
        }
    }

    /// Append an entry to the processing trail.
    pub fn log(&mut self, entry: impl Into<String>) {
        self.log.push(entry.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_case_has_identity_fields_only() {
        let case = Case::new("id-1", "alice@example.com", "Hello", "body text");
        assert_eq!(case.email_id, "id-1");
        assert_eq!(case.sender, "alice@example.com");
        assert!(case.classification.is_none());
        assert!(case.knowledge_context.is_none());
        assert!(case.draft.is_none());
        assert!(case.log.is_empty());
        assert!(case.outcome.is_none());
    }

    #[test]
    fn log_preserves_order() {
        let mut case = Case::new("id-1", "a@x.com", "s", "b");
        case.log("first");
        case.log("second");
        case.log("third");
        assert_eq!(case.log, vec!["first", "second", "third"]);
    }

    #[test]
    fn outcome_serializes_as_upper_snake() {
        assert_eq!(serde_json::to_value(Outcome::Sent).unwrap(), "SENT");
        assert_eq!(serde_json::to_value(Outcome::Escalated).unwrap(), "ESCALATED");
        assert_eq!(serde_json::to_value(Outcome::Failed).unwrap(), "FAILED");
    }

    #[test]
    fn outcome_display_matches_serialization() {
        assert_eq!(Outcome::Sent.to_string(), "SENT");
        assert_eq!(Outcome::Failed.to_string(), "FAILED");
    }

    #[test]
    fn case_serializes_for_audit() {
        let mut case = Case::new("id-2", "b@x.com", "Refund", "please refund");
        case.classification = Some("escalate_refund_request".into());
        case.outcome = Some(Outcome::Escalated);
        case.log("entry");

        let json = serde_json::to_value(&case).unwrap();
        assert_eq!(json["email_id"], "id-2");
        assert_eq!(json["classification"], "escalate_refund_request");
        assert_eq!(json["outcome"], "ESCALATED");
        assert_eq!(json["log"][0], "entry");
    }
}
