//! The triage workflow: case model, ports, routing policy, and the engine.

pub mod case;
pub mod engine;
pub mod ports;
pub mod routing;

pub use case::{Case, Outcome};
pub use engine::WorkflowEngine;
pub use ports::{Classifier, DraftReply, Drafter, KnowledgeRetriever, Notifier};
pub use routing::{
    AUTO_RESPONDABLE_CATEGORIES, Branch, DEFAULT_ESCALATION_CATEGORY, ESCALATION_CATEGORIES, route,
};
