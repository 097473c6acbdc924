//! Support Triage — automated customer-support email triage.

pub mod channels;
pub mod classify;
pub mod config;
pub mod draft;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod poller;
pub mod workflow;
