//! The workflow engine — a fixed directed graph of nodes over a [`Case`].
//!
//! Linear transitions FetchBody → Classify → Route; Route branches to
//! RetrieveKnowledge → DraftResponse → SendResponse (terminal) or directly
//! to LogEscalation (terminal). No cycles; no node is revisited.
//!
//! Every fault is absorbed at its originating node boundary, recorded in
//! the case log with an `ERROR:` marker and converted into a locally
//! decided fallback. The engine never returns a case without an outcome.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::workflow::case::{Case, Outcome};
use crate::workflow::ports::{Classifier, Drafter, KnowledgeRetriever, Notifier};
use crate::workflow::routing::{self, Branch, DEFAULT_ESCALATION_CATEGORY};

/// Separator between retrieved passages in the knowledge context.
const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Prefix applied to the original subject when replying.
const REPLY_PREFIX: &str = "Re: ";

/// Executes the triage state machine over one case at a time.
///
/// The engine holds no state between invocations; it is safe to run
/// concurrently for distinct cases as long as the injected ports are
/// themselves safe for concurrent use.
pub struct WorkflowEngine {
    classifier: Arc<dyn Classifier>,
    retriever: Arc<dyn KnowledgeRetriever>,
    drafter: Arc<dyn Drafter>,
    notifier: Arc<dyn Notifier>,
}

impl WorkflowEngine {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        retriever: Arc<dyn KnowledgeRetriever>,
        drafter: Arc<dyn Drafter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            classifier,
            retriever,
            drafter,
            notifier,
        }
    }

    /// Run a case to a terminal outcome.
    pub async fn run(&self, mut case: Case) -> Case {
        debug!(email_id = %case.email_id, sender = %case.sender, "Workflow started");

        self.fetch_body(&mut case);
        self.classify(&mut case).await;

        let category = case
            .classification
            .as_deref()
            .unwrap_or(DEFAULT_ESCALATION_CATEGORY);

        match routing::route(category) {
            Branch::AutoRespond => {
                self.retrieve_knowledge(&mut case).await;
                let drafted = self.draft_response(&mut case).await;
                if drafted {
                    self.send_response(&mut case).await;
                }
            }
            Branch::Escalate => self.log_escalation(&mut case),
        }

        debug_assert!(case.outcome.is_some(), "terminal node must set an outcome");
        if let Some(outcome) = case.outcome {
            info!(email_id = %case.email_id, outcome = %outcome, "Workflow finished");
        }
        case
    }

    /// Entry node. The transport has already decoded the message; an empty
    /// body is logged and tolerated, never a reason to abort.
    fn fetch_body(&self, case: &mut Case) {
        case.log("Processing fetched email.");
        if case.raw_body.trim().is_empty() {
            case.log("ERROR: No readable body found; continuing with empty body.");
        } else {
            case.log("Successfully extracted email body.");
        }
    }

    async fn classify(&self, case: &mut Case) {
        let category = match self.classifier.classify(&case.raw_body).await {
            Ok(category) => category,
            Err(e) => {
                warn!(email_id = %case.email_id, error = %e, "Classification failed");
                case.log(format!(
                    "ERROR: Classification failed ({e}); defaulting to '{DEFAULT_ESCALATION_CATEGORY}'."
                ));
                DEFAULT_ESCALATION_CATEGORY.to_string()
            }
        };
        case.log(format!("Email classified as: {category}"));
        case.classification = Some(category);
    }

    async fn retrieve_knowledge(&self, case: &mut Case) {
        let passages = match self.retriever.search(&case.raw_body).await {
            Ok(passages) => passages,
            Err(e) => {
                warn!(email_id = %case.email_id, error = %e, "Knowledge retrieval failed");
                case.log(format!(
                    "ERROR: Knowledge retrieval failed ({e}); continuing without context."
                ));
                Vec::new()
            }
        };

        case.log(format!(
            "Retrieved {} knowledge passage(s) from the knowledge base.",
            passages.len()
        ));
        case.knowledge_context = Some(passages.join(CONTEXT_SEPARATOR));
    }

    /// Returns false when drafting failed outright, in which case the case
    /// is already terminal and no send must be attempted.
    async fn draft_response(&self, case: &mut Case) -> bool {
        let context = case.knowledge_context.as_deref().unwrap_or_default();
        match self.drafter.draft(&case.raw_body, context).await {
            Ok(reply) => {
                if reply.is_fallback {
                    case.log("WARNING: Drafting degraded; using the standard fallback notice.");
                } else {
                    case.log("Drafted email response.");
                }
                case.draft = Some(reply.text);
                true
            }
            Err(e) => {
                warn!(email_id = %case.email_id, error = %e, "Drafting failed");
                case.log(format!(
                    "ERROR: Could not draft a response ({e}); no reply will be sent."
                ));
                case.outcome = Some(Outcome::Failed);
                false
            }
        }
    }

    async fn send_response(&self, case: &mut Case) {
        let body = case.draft.clone().unwrap_or_default();
        let subject = format!("{REPLY_PREFIX}{}", case.subject);

        match self.notifier.send(&case.sender, &subject, &body).await {
            Ok(()) => {
                case.log(format!("Sent email response to '{}'.", case.sender));
                case.outcome = Some(Outcome::Sent);
            }
            Err(e) => {
                warn!(email_id = %case.email_id, error = %e, "Delivery failed");
                case.log(format!(
                    "ERROR: Failed to deliver response to '{}' ({e}).",
                    case.sender
                ));
                case.outcome = Some(Outcome::Failed);
            }
        }
    }

    fn log_escalation(&self, case: &mut Case) {
        let category = case
            .classification
            .as_deref()
            .unwrap_or(DEFAULT_ESCALATION_CATEGORY);
        case.log(format!(
            "ESCALATION NEEDED: Email from '{}' with subject: '{}'. Reason: Classified as '{}'.",
            case.sender, case.subject, category
        ));
        case.outcome = Some(Outcome::Escalated);
    }
}
