//! Core of the cadence CRM automation backend: the scheduled-action
//! execution engine and its supporting pieces.
//!
//! The request-side agent layer lives in `cadence-agent`; this crate owns the
//! domain model, the action registry, the scheduler state machine and tick
//! loop, type-dispatched action execution, rate limiting, and recommendation
//! parsing. Persistence, HTTP surface, and authentication are external
//! collaborators consumed through the narrow traits defined here.

pub mod config;
pub mod domain;
pub mod errors;
pub mod executor;
pub mod parser;
pub mod ratelimit;
pub mod scheduler;
pub mod store;
pub mod telemetry;

pub use domain::action::{
    ActionId, ActionStatus, ContactId, OrganizationId, ScheduledAction,
};
pub use domain::recommendation::{action_types, Recommendation};
pub use domain::request::{AgentIntent, AgentRequest, AgentResponse};
pub use errors::{AgentError, DomainError};
pub use executor::{handler_types, ActionTypeHandler, HandlerError, HandlerRegistry};
pub use parser::RecommendationParser;
pub use ratelimit::{RateLimitConfig, RateLimiter};
pub use scheduler::lifecycle::{ActionLifecycle, FailOutcome, LifecycleConfig};
pub use scheduler::{
    RelevanceDecision, RelevanceValidator, Scheduler, SchedulerConfig, SchedulerHandle,
    TickSummary,
};
pub use store::ActionStore;
