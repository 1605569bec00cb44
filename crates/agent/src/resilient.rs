//! Bounded retry around the language-model capability.
//!
//! Exhaustion is an explicit outcome, not an exception: callers branch to
//! their deterministic fallback instead of catching errors.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::llm::LanguageModel;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Result of a resilient call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    Completed(String),
    /// All attempts failed or came back empty. The caller must fall back to
    /// its rule-based path rather than surface this to the end user.
    Exhausted { attempts: u32, last_error: String },
}

impl CallOutcome {
    pub fn completed(&self) -> Option<&str> {
        match self {
            Self::Completed(text) => Some(text),
            Self::Exhausted { .. } => None,
        }
    }
}

pub struct ResilientCaller {
    model: Arc<dyn LanguageModel>,
    max_attempts: u32,
    base_delay: Duration,
}

impl ResilientCaller {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model, max_attempts: DEFAULT_MAX_ATTEMPTS, base_delay: DEFAULT_BASE_DELAY }
    }

    pub fn with_policy(
        model: Arc<dyn LanguageModel>,
        max_attempts: u32,
        base_delay: Duration,
    ) -> Self {
        Self { model, max_attempts: max_attempts.max(1), base_delay }
    }

    /// Up to `max_attempts` tries; an empty completion counts as a failure.
    /// Backoff before attempt `n` (1-based) is `base_delay * 2^(n-2)`.
    pub async fn call(&self, system_prompt: &str, user_prompt: &str) -> CallOutcome {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let backoff = self.base_delay * 2_u32.saturating_pow(attempt - 2);
                tokio::time::sleep(backoff).await;
            }

            match self.model.complete(system_prompt, user_prompt).await {
                Ok(text) if !text.trim().is_empty() => return CallOutcome::Completed(text),
                Ok(_) => {
                    last_error = "empty completion".to_string();
                }
                Err(error) => {
                    last_error = error.to_string();
                }
            }

            // Only log a retry when one will actually happen.
            if attempt < self.max_attempts {
                warn!(
                    event_name = "llm.call.retry",
                    attempt,
                    max_attempts = self.max_attempts,
                    error = %last_error,
                    "language model call failed; retrying"
                );
            }
        }

        warn!(
            event_name = "llm.call.exhausted",
            attempts = self.max_attempts,
            error = %last_error,
            "language model call gave up"
        );
        CallOutcome::Exhausted { attempts: self.max_attempts, last_error }
    }
}
