//! The run loop: poll the mailbox, run one workflow execution per message,
//! surface the terminal report.
//!
//! The engine holds no reference to a case after returning it; this loop
//! owns the terminal case just long enough to emit its log and a JSON
//! audit record, then drops it. Poll failures are logged and the loop
//! keeps going.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::channels::{ImapMailbox, InboundEmail};
use crate::workflow::{Case, WorkflowEngine};

/// Spawn the polling loop. Set the returned flag to stop it at the next
/// tick.
pub fn spawn_poller(
    mailbox: Arc<ImapMailbox>,
    engine: Arc<WorkflowEngine>,
    poll_interval_secs: u64,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!("Mail poller started — checking every {poll_interval_secs}s");
        let mut tick = tokio::time::interval(Duration::from_secs(poll_interval_secs));

        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Mail poller shutting down");
                return;
            }

            poll_once(&mailbox, &engine).await;
        }
    });

    (handle, shutdown_flag)
}

/// One poll cycle: fetch unread mail and triage each message.
async fn poll_once(mailbox: &ImapMailbox, engine: &WorkflowEngine) {
    let emails = match mailbox.fetch_unread().await {
        Ok(emails) => emails,
        Err(e) => {
            error!(error = %e, "Mail poll failed");
            return;
        }
    };

    if emails.is_empty() {
        return;
    }
    info!(count = emails.len(), "Processing new email(s)");

    for email in emails {
        let case = case_from_email(&email);
        let case = engine.run(case).await;
        surface_report(&case);
    }
}

/// Build the initial case for one inbound email.
pub fn case_from_email(email: &InboundEmail) -> Case {
    Case::new(
        email.id.clone(),
        email.sender.clone(),
        email.subject.clone(),
        email.body.clone(),
    )
}

/// Emit the terminal case: every log entry, plus one JSON audit record.
pub fn surface_report(case: &Case) {
    for entry in &case.log {
        info!(email_id = %case.email_id, "{entry}");
    }

    match serde_json::to_string(&serde_json::json!({
        "recorded_at": Utc::now(),
        "case": case,
    })) {
        Ok(audit) => info!(target: "audit", "{audit}"),
        Err(e) => error!(error = %e, "Failed to serialize audit record"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Outcome;

    fn sample_email() -> InboundEmail {
        InboundEmail {
            id: "msg-42".into(),
            sender: "alice@example.com".into(),
            subject: "Store hours".into(),
            body: "When do you open?".into(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn case_from_email_copies_identity_fields() {
        let case = case_from_email(&sample_email());
        assert_eq!(case.email_id, "msg-42");
        assert_eq!(case.sender, "alice@example.com");
        assert_eq!(case.subject, "Store hours");
        assert_eq!(case.raw_body, "When do you open?");
        assert!(case.outcome.is_none());
        assert!(case.log.is_empty());
    }

    #[test]
    fn surface_report_handles_terminal_case() {
        let mut case = case_from_email(&sample_email());
        case.log("Email classified as: auto_respondable_store_hours");
        case.outcome = Some(Outcome::Sent);
        // Must not panic regardless of subscriber setup.
        surface_report(&case);
    }
}
