//! Routing policy: category → branch.
//!
//! Exact membership in a closed allow-list, never a substring or prefix
//! test. Any category outside the allow-list routes to escalation,
//! including the default escalation category and anything the classifier
//! has no contract to produce.

/// Categories for which an automated reply is policy-permitted.
pub const AUTO_RESPONDABLE_CATEGORIES: &[&str] = &[
    "auto_respondable_return_policy",
    "auto_respondable_product_question",
    "auto_respondable_shipping_status",
    "auto_respondable_order_cancellation",
    "auto_respondable_warranty_information",
    "auto_respondable_store_hours",
    "auto_respondable_discount_inquiry",
    "auto_respondable_loyalty_program",
    "auto_respondable_subscription_management",
    "auto_respondable_account_update",
    "auto_respondable_feedback_acknowledgement",
];

/// Documented classifier outputs that always route to a human.
pub const ESCALATION_CATEGORIES: &[&str] = &[
    "escalate_refund_request",
    "escalate_complaint",
    "escalate_general_inquiry",
];

/// Category substituted when classification fails or produces an
/// unrecognized value.
pub const DEFAULT_ESCALATION_CATEGORY: &str = "escalate_general_inquiry";

/// The two branches of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    AutoRespond,
    Escalate,
}

/// Map a classification category to a branch. Pure and total.
pub fn route(category: &str) -> Branch {
    if AUTO_RESPONDABLE_CATEGORIES.contains(&category) {
        Branch::AutoRespond
    } else {
        Branch::Escalate
    }
}
