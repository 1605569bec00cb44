//! Intent-based dispatch to specialized agents.
//!
//! Matching precedence: explicit high-signal intents, then keyword
//! heuristics for the ambiguous `data_analysis` intent, then a single
//! reclassification pass for anything unresolved. The router itself never
//! errors; every failure becomes a structured `success:false` response
//! carrying the originating request id.

use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::domain::request::{AgentIntent, AgentRequest, AgentResponse};
use cadence_core::errors::AgentError;
use cadence_core::ratelimit::RateLimiter;
use tracing::{info, warn};

use crate::classify::IntentClassifier;

pub const ROUTER_AGENT_ID: &str = "intent_router";

/// Keywords that pull an ambiguous `data_analysis` request toward the
/// next-best-action route.
const NBA_KEYWORDS: &[&str] =
    &["next best action", "next-best-action", "nba", "recommend", "what should i do"];
const INTERACTION_KEYWORDS: &[&str] =
    &["interaction", "conversation", "call notes", "sentiment"];

#[async_trait]
pub trait SpecializedAgent: Send + Sync {
    fn agent_id(&self) -> &'static str;
    async fn handle(&self, request: &AgentRequest) -> Result<AgentResponse, AgentError>;
}

/// Fixed routing table: one handler per supported route.
pub struct RoutingTable {
    pub recommendation: Arc<dyn SpecializedAgent>,
    pub interaction_analysis: Arc<dyn SpecializedAgent>,
    pub intent_classification: Arc<dyn SpecializedAgent>,
    pub resource_management: Arc<dyn SpecializedAgent>,
}

pub struct IntentRouter {
    table: RoutingTable,
    classifier: Arc<dyn IntentClassifier>,
    rate_limiter: Arc<RateLimiter>,
}

impl IntentRouter {
    pub fn new(
        table: RoutingTable,
        classifier: Arc<dyn IntentClassifier>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self { table, classifier, rate_limiter }
    }

    /// Dispatch a request. Never propagates an error.
    pub async fn dispatch(&self, request: AgentRequest) -> AgentResponse {
        if let Err(error) = validate_request(&request) {
            return error.into_response(&request, ROUTER_AGENT_ID);
        }

        if !self.rate_limiter.allow(&request.requester_id) {
            info!(
                event_name = "router.request.rate_limited",
                request_id = %request.request_id,
                requester_id = %request.requester_id,
                "request denied by rate limiter"
            );
            return AgentError::RateLimited(request.requester_id.clone())
                .into_response(&request, ROUTER_AGENT_ID);
        }

        let input = request.original_user_input.as_deref();
        let mut intent = request.intent.clone();

        // At most two passes: the original intent and one corrected intent
        // from a single classification call. Hard cap against
        // reclassification cycles.
        for pass in 0..2 {
            if let Some(agent) = self.route(&intent, input) {
                return self.invoke(agent, &request, &intent).await;
            }

            if pass > 0 {
                break;
            }
            match self.reclassify(&request).await {
                Some(corrected) if corrected != intent => {
                    info!(
                        event_name = "router.intent.reclassified",
                        request_id = %request.request_id,
                        original_intent = %intent.as_str(),
                        corrected_intent = %corrected.as_str(),
                        "re-dispatching with corrected intent"
                    );
                    intent = corrected;
                }
                _ => break,
            }
        }

        unresolved_response(&request)
    }

    fn route(
        &self,
        intent: &AgentIntent,
        input: Option<&str>,
    ) -> Option<&Arc<dyn SpecializedAgent>> {
        match intent {
            AgentIntent::NextBestAction => Some(&self.table.recommendation),
            AgentIntent::InteractionAnalysis => Some(&self.table.interaction_analysis),
            AgentIntent::IntentClassification => Some(&self.table.intent_classification),
            AgentIntent::ResourceManagement => Some(&self.table.resource_management),
            AgentIntent::DataAnalysis => {
                let lowered = input.map(str::to_ascii_lowercase).unwrap_or_default();
                if NBA_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
                    Some(&self.table.recommendation)
                } else if INTERACTION_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
                    Some(&self.table.interaction_analysis)
                } else {
                    None
                }
            }
            AgentIntent::Unknown(_) => None,
        }
    }

    async fn invoke(
        &self,
        agent: &Arc<dyn SpecializedAgent>,
        request: &AgentRequest,
        intent: &AgentIntent,
    ) -> AgentResponse {
        let routed_request =
            AgentRequest { intent: intent.clone(), ..request.clone() };

        match agent.handle(&routed_request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    event_name = "router.agent.failed",
                    request_id = %request.request_id,
                    agent_id = agent.agent_id(),
                    error = %error,
                    "specialized agent failed; converting to failure response"
                );
                error.into_response(request, agent.agent_id())
            }
        }
    }

    /// One classification attempt per request; failures are swallowed and
    /// leave the intent unresolved.
    async fn reclassify(&self, request: &AgentRequest) -> Option<AgentIntent> {
        let text = request.original_user_input.as_deref()?;

        match self.classifier.classify(text, &request.context).await {
            Ok(classification) if classification.intent.is_known() => {
                Some(classification.intent)
            }
            Ok(_) => None,
            Err(error) => {
                warn!(
                    event_name = "router.reclassification.failed",
                    request_id = %request.request_id,
                    error = %error,
                    "intent classification capability failed"
                );
                None
            }
        }
    }
}

fn validate_request(request: &AgentRequest) -> Result<(), AgentError> {
    if request.request_id.trim().is_empty() {
        return Err(AgentError::Validation("request_id must not be empty".to_string()));
    }
    if request.requester_id.trim().is_empty() {
        return Err(AgentError::Validation("requester_id must not be empty".to_string()));
    }
    if request.conversation_id.trim().is_empty() {
        return Err(AgentError::Validation("conversation_id must not be empty".to_string()));
    }
    Ok(())
}

fn unresolved_response(request: &AgentRequest) -> AgentResponse {
    let suggestions = vec![
        "Ask for the next best actions for a contact".to_string(),
        "Ask for an analysis of a recent interaction".to_string(),
        "Ask to classify what a message is about".to_string(),
        "Ask about team resources or workload".to_string(),
    ];

    AgentResponse::failure_for(
        request,
        ROUTER_AGENT_ID,
        format!("I couldn't route the intent `{}`. Try rephrasing.", request.intent.as_str()),
    )
    .with_data(
        "suggestions",
        serde_json::Value::Array(
            suggestions.into_iter().map(serde_json::Value::String).collect(),
        ),
    )
}
