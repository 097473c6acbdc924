//! LLM-backed intent classification.
//!
//! The model is prompted with the documented category list and asked to
//! return exactly one category name. Model output is normalized: an exact
//! match is accepted as-is, otherwise the output is scanned for a known
//! category (models occasionally wrap the answer in prose). Anything
//! unrecognized, and any provider fault, resolves to the default
//! escalation category — this port never lets a fault escape.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::LlmProvider;
use crate::workflow::ports::Classifier;
use crate::workflow::routing::{
    AUTO_RESPONDABLE_CATEGORIES, DEFAULT_ESCALATION_CATEGORY, ESCALATION_CATEGORIES,
};

/// Classifies email intent against the documented category set.
pub struct IntentClassifier {
    llm: Arc<dyn LlmProvider>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Classifier for IntentClassifier {
    async fn classify(&self, body: &str) -> Result<String, LlmError> {
        let system_prompt = build_system_prompt();

        let category = match self.llm.complete(&system_prompt, body).await {
            Ok(raw) => match normalize_category(&raw) {
                Some(category) => category.to_string(),
                None => {
                    warn!(
                        raw = %raw.chars().take(120).collect::<String>(),
                        "Classifier produced an unrecognized category; defaulting to escalation"
                    );
                    DEFAULT_ESCALATION_CATEGORY.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "Classification request failed; defaulting to escalation");
                DEFAULT_ESCALATION_CATEGORY.to_string()
            }
        };

        debug!(category = %category, "Email intent classified");
        Ok(category)
    }
}

/// All categories the classifier is allowed to produce.
fn known_categories() -> impl Iterator<Item = &'static str> {
    AUTO_RESPONDABLE_CATEGORIES
        .iter()
        .chain(ESCALATION_CATEGORIES.iter())
        .copied()
}

fn build_system_prompt() -> String {
    let categories: Vec<&str> = known_categories().collect();
    format!(
        "You are an email classification engine for a customer-support inbox. \
         Read the customer's email and classify it into exactly one of the \
         following categories:\n\n{}\n\n\
         Respond with the single most appropriate category name and nothing \
         else. If no category fits, respond with '{DEFAULT_ESCALATION_CATEGORY}'.",
        categories.join(", ")
    )
}

/// Map raw model output to a known category, if possible.
///
/// Exact match (after trimming) first; then a containment scan so that
/// output like "The category is: auto_respondable_store_hours." still
/// resolves. Returns `None` for anything else.
fn normalize_category(raw: &str) -> Option<&'static str> {
    let trimmed = raw.trim();
    if let Some(exact) = known_categories().find(|c| *c == trimmed) {
        return Some(exact);
    }
    known_categories().find(|c| trimmed.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockLlm {
        response: Result<&'static str, ()>,
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            match self.response {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "simulated outage".into(),
                }),
            }
        }
    }

    fn classifier(response: Result<&'static str, ()>) -> IntentClassifier {
        IntentClassifier::new(Arc::new(MockLlm { response }))
    }

    #[tokio::test]
    async fn exact_category_passes_through() {
        let c = classifier(Ok("auto_respondable_shipping_status"));
        let category = c.classify("where is my parcel?").await.unwrap();
        assert_eq!(category, "auto_respondable_shipping_status");
    }

    #[tokio::test]
    async fn wrapped_output_is_normalized() {
        let c = classifier(Ok("The best category is auto_respondable_store_hours."));
        let category = c.classify("when do you open?").await.unwrap();
        assert_eq!(category, "auto_respondable_store_hours");
    }

    #[tokio::test]
    async fn whitespace_is_tolerated() {
        let c = classifier(Ok("  escalate_refund_request\n"));
        let category = c.classify("I want my money back").await.unwrap();
        assert_eq!(category, "escalate_refund_request");
    }

    #[tokio::test]
    async fn unrecognized_output_defaults_to_escalation() {
        let c = classifier(Ok("billing_question"));
        let category = c.classify("random").await.unwrap();
        assert_eq!(category, DEFAULT_ESCALATION_CATEGORY);
    }

    #[tokio::test]
    async fn provider_fault_defaults_to_escalation() {
        let c = classifier(Err(()));
        let category = c.classify("anything").await.unwrap();
        assert_eq!(category, DEFAULT_ESCALATION_CATEGORY);
    }

    #[tokio::test]
    async fn empty_body_still_yields_a_category() {
        let c = classifier(Ok("escalate_general_inquiry"));
        let category = c.classify("").await.unwrap();
        assert_eq!(category, "escalate_general_inquiry");
    }

    #[test]
    fn prompt_lists_every_documented_category() {
        let prompt = build_system_prompt();
        for category in known_categories() {
            assert!(prompt.contains(category), "prompt missing {category}");
        }
    }

    #[test]
    fn normalize_rejects_unknown_strings() {
        assert!(normalize_category("").is_none());
        assert!(normalize_category("auto_respondable").is_none());
        assert!(normalize_category("something else entirely").is_none());
    }
}
