//! Next-best-action agent: asks the language model for recommendations and
//! degrades to a deterministic rule set when the model is unavailable.

use async_trait::async_trait;
use cadence_core::domain::recommendation::{action_types, Recommendation};
use cadence_core::domain::request::{AgentRequest, AgentResponse};
use cadence_core::errors::AgentError;
use cadence_core::parser::RecommendationParser;
use tracing::{info, warn};

use crate::resilient::{CallOutcome, ResilientCaller};
use crate::router::SpecializedAgent;

const SYSTEM_PROMPT: &str = "You are a CRM assistant for real-estate agents. \
Given the context about a contact, return a JSON object with a \
`recommendations` array; each entry has `title`, `action_type`, `priority` \
(1 is most urgent), and an optional `rationale`.";

/// Confidence reported when recommendations came from the model.
const MODEL_CONFIDENCE: f64 = 0.75;
/// Confidence reported for the rule-based fallback.
const FALLBACK_CONFIDENCE: f64 = 0.3;

pub struct RecommendationAgent {
    caller: ResilientCaller,
    parser: RecommendationParser,
}

impl RecommendationAgent {
    pub fn new(caller: ResilientCaller) -> Self {
        Self { caller, parser: RecommendationParser::new() }
    }

    fn build_prompt(request: &AgentRequest) -> String {
        let mut prompt = String::new();
        if let Some(input) = request.original_user_input.as_deref() {
            prompt.push_str("User request: ");
            prompt.push_str(input);
            prompt.push('\n');
        }
        for (key, value) in &request.context {
            prompt.push_str(key);
            prompt.push_str(": ");
            prompt.push_str(&value.to_string());
            prompt.push('\n');
        }
        if prompt.is_empty() {
            prompt.push_str("No additional context provided.");
        }
        prompt
    }
}

/// Recommendations used when every model attempt failed. Generic enough to
/// apply to any contact, ordered most-urgent first.
fn fallback_recommendations() -> Vec<Recommendation> {
    vec![
        Recommendation {
            title: "Call the contact to check in".to_string(),
            action_type: action_types::CALL.to_string(),
            priority: 1,
            rationale: Some("no recent touch point on record".to_string()),
        },
        Recommendation {
            title: "Send a follow-up email recapping the last conversation".to_string(),
            action_type: action_types::EMAIL.to_string(),
            priority: 2,
            rationale: None,
        },
        Recommendation {
            title: "Schedule a meeting to review their goals".to_string(),
            action_type: action_types::SCHEDULE_MEETING.to_string(),
            priority: 3,
            rationale: None,
        },
    ]
}

#[async_trait]
impl SpecializedAgent for RecommendationAgent {
    fn agent_id(&self) -> &'static str {
        "recommendation_agent"
    }

    async fn handle(&self, request: &AgentRequest) -> Result<AgentResponse, AgentError> {
        let prompt = Self::build_prompt(request);

        let (recommendations, confidence) =
            match self.caller.call(SYSTEM_PROMPT, &prompt).await {
                CallOutcome::Completed(raw) => {
                    (self.parser.parse(&raw), MODEL_CONFIDENCE)
                }
                CallOutcome::Exhausted { attempts, last_error } => {
                    warn!(
                        event_name = "recommendation.model.exhausted",
                        request_id = %request.request_id,
                        attempts,
                        error = %last_error,
                        "falling back to rule-based recommendations"
                    );
                    (fallback_recommendations(), FALLBACK_CONFIDENCE)
                }
            };

        info!(
            event_name = "recommendation.generated",
            request_id = %request.request_id,
            count = recommendations.len(),
            confidence,
            "produced recommendations"
        );

        let actions: Vec<String> =
            recommendations.iter().map(|r| r.action_type.clone()).collect();
        let payload = serde_json::to_value(&recommendations)
            .map_err(|e| AgentError::Execution(e.to_string()))?;

        Ok(AgentResponse::success_for(
            request,
            self.agent_id(),
            format!("{} recommended next steps", recommendations.len()),
        )
        .with_data("recommendations", payload)
        .with_actions(actions)
        .with_confidence(confidence))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use cadence_core::domain::recommendation::action_types;
    use cadence_core::domain::request::{AgentIntent, AgentRequest};

    use super::RecommendationAgent;
    use crate::llm::LanguageModel;
    use crate::resilient::ResilientCaller;
    use crate::router::SpecializedAgent;

    struct CannedModel(&'static str);

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct DownModel;

    #[async_trait]
    impl LanguageModel for DownModel {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    fn agent_with(model: Arc<dyn LanguageModel>) -> RecommendationAgent {
        RecommendationAgent::new(ResilientCaller::with_policy(
            model,
            3,
            Duration::from_millis(0),
        ))
    }

    #[tokio::test]
    async fn structured_model_output_becomes_recommendations() {
        let agent = agent_with(Arc::new(CannedModel(
            r#"{"recommendations": [
                {"title": "Call the Hendersons about their offer", "priority": 1}
            ]}"#,
        )));
        let request = AgentRequest::new(AgentIntent::NextBestAction, "user-1")
            .with_input("what should I do next for the Hendersons?");

        let response = agent.handle(&request).await.unwrap();

        assert!(response.success);
        assert_eq!(response.actions, vec![action_types::CALL.to_string()]);
        let payload = response.data.get("recommendations").unwrap();
        assert_eq!(payload.as_array().unwrap().len(), 1);
        assert_eq!(response.confidence, Some(super::MODEL_CONFIDENCE));
    }

    #[tokio::test]
    async fn model_exhaustion_degrades_to_rule_based_fallback() {
        let agent = agent_with(Arc::new(DownModel));
        let request = AgentRequest::new(AgentIntent::NextBestAction, "user-1");

        let response = agent.handle(&request).await.unwrap();

        assert!(response.success);
        assert_eq!(response.confidence, Some(super::FALLBACK_CONFIDENCE));
        let payload = response.data.get("recommendations").unwrap();
        assert_eq!(payload.as_array().unwrap().len(), 3);
        assert_eq!(response.actions[0], action_types::CALL);
    }

    #[tokio::test]
    async fn free_text_model_output_is_still_usable() {
        let agent = agent_with(Arc::new(CannedModel(
            "1. Email them the new listing sheet\n2. Schedule a showing for Saturday",
        )));
        let request = AgentRequest::new(AgentIntent::NextBestAction, "user-1");

        let response = agent.handle(&request).await.unwrap();

        assert!(response.success);
        assert_eq!(
            response.actions,
            vec![
                action_types::EMAIL.to_string(),
                action_types::SCHEDULE_MEETING.to_string()
            ]
        );
    }
}
