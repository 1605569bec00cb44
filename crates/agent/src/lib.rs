//! Request-side agent layer for the cadence CRM automation backend.
//!
//! An [`router::IntentRouter`] fronts a fixed table of specialized agents.
//! Requests are validated and rate limited, routed by intent (with keyword
//! heuristics for ambiguous analysis requests), and reclassified at most once
//! when the intent is unknown. Language-model access goes through
//! [`resilient::ResilientCaller`], which makes exhaustion an explicit outcome
//! so agents can degrade to deterministic fallbacks.

pub mod classify;
pub mod llm;
pub mod recommend;
pub mod resilient;
pub mod router;

pub use classify::{Classification, ClassificationAgent, IntentClassifier};
pub use llm::LanguageModel;
pub use recommend::RecommendationAgent;
pub use resilient::{CallOutcome, ResilientCaller};
pub use router::{IntentRouter, RoutingTable, SpecializedAgent, ROUTER_AGENT_ID};
