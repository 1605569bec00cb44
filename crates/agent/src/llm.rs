use anyhow::Result;
use async_trait::async_trait;

/// Opaque language-model capability. Implementations may error or return an
/// empty completion; the resilient caller deals with both.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}
