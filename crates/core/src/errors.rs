use thiserror::Error;

use crate::domain::action::ActionStatus;
use crate::domain::request::{AgentRequest, AgentResponse};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid action transition from {from:?} to {to:?}")]
    InvalidActionTransition { from: ActionStatus, to: ActionStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failure taxonomy for the request dispatch path and the tick loop.
///
/// Validation, rate-limit, and not-found failures are terminal and surface
/// immediately as structured failure responses. Capability failures feed the
/// resilience/fallback policies, and execution failures drive the scheduler's
/// retry state machine.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("rate limit exceeded for requester `{0}`")]
    RateLimited(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("external capability failure: {0}")]
    Capability(String),
    #[error("action execution failure: {0}")]
    Execution(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AgentError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::RateLimited(_) => "rate_limited",
            Self::NotFound(_) => "not_found",
            Self::Capability(_) => "external_capability_error",
            Self::Execution(_) => "execution_error",
            Self::Domain(_) => "domain_error",
        }
    }

    /// Convert into the structured failure response the dispatch path returns
    /// instead of propagating. Correlation metadata comes from the request.
    pub fn into_response(self, request: &AgentRequest, agent_id: &str) -> AgentResponse {
        let code = self.error_code();
        AgentResponse::failure_for(request, agent_id, self.to_string())
            .with_data("error_code", serde_json::Value::String(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentError, DomainError};
    use crate::domain::action::ActionStatus;
    use crate::domain::request::{AgentIntent, AgentRequest};

    #[test]
    fn rate_limit_error_becomes_terminal_failure_response() {
        let request = AgentRequest::new(AgentIntent::NextBestAction, "user-9");
        let response = AgentError::RateLimited("user-9".to_string())
            .into_response(&request, "router");

        assert!(!response.success);
        assert_eq!(response.request_id, request.request_id);
        assert_eq!(
            response.data.get("error_code").and_then(|value| value.as_str()),
            Some("rate_limited")
        );
    }

    #[test]
    fn domain_error_is_transparent_through_agent_error() {
        let error: AgentError = DomainError::InvalidActionTransition {
            from: ActionStatus::Completed,
            to: ActionStatus::Executing,
        }
        .into();

        assert_eq!(error.error_code(), "domain_error");
        assert!(error.to_string().contains("invalid action transition"));
    }
}
