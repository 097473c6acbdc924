//! LLM-backed response drafting.
//!
//! The drafter answers strictly from the retrieved knowledge context and
//! keeps replies short. When the context lacks the answer the model is told
//! to say so politely rather than invent one. Any provider fault resolves
//! to the fixed [`FALLBACK_NOTICE`] — never an error the engine has to
//! unwind, and never a raw error string delivered to a customer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::LlmError;
use crate::llm::LlmProvider;
use crate::workflow::ports::{DraftReply, Drafter};

/// Substituted for a drafted reply when drafting degrades.
pub const FALLBACK_NOTICE: &str = "Thank you for contacting us. We were unable to generate a \
complete answer to your question automatically, so a member of our support team will follow up \
with you shortly.";

/// Drafts customer replies from an email body plus knowledge context.
pub struct ResponseDrafter {
    llm: Arc<dyn LlmProvider>,
}

impl ResponseDrafter {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Drafter for ResponseDrafter {
    async fn draft(&self, body: &str, context: &str) -> Result<DraftReply, LlmError> {
        let system_prompt = build_system_prompt(context);

        match self.llm.complete(&system_prompt, body).await {
            Ok(text) if !text.trim().is_empty() => Ok(DraftReply::drafted(text.trim())),
            Ok(_) => {
                warn!("Drafter returned an empty completion; using fallback notice");
                Ok(DraftReply::fallback(FALLBACK_NOTICE))
            }
            Err(e) => {
                warn!(error = %e, "Draft request failed; using fallback notice");
                Ok(DraftReply::fallback(FALLBACK_NOTICE))
            }
        }
    }
}

fn build_system_prompt(context: &str) -> String {
    format!(
        "You are a helpful customer support agent. Write a clear and concise \
         email reply to the customer's message below. Answer using only the \
         knowledge base context; if the context does not contain the answer, \
         politely say that you could not find the information. Do not make up \
         information. Keep the reply under 150 words, as a single paragraph, \
         not a list of steps.\n\nKnowledge base context:\n{context}"
    )
}
