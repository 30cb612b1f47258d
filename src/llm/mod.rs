pub mod gemini;
pub mod scripted;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::GenerationError;

/// Produces free-form narrative text for a prompt.
///
/// Replies are not guaranteed to follow the formatting asked for in the prompt.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(&self, prompt: String) -> Result<String, GenerationError>;
}

#[async_trait]
impl<T: NarrativeGenerator + ?Sized> NarrativeGenerator for Arc<T> {
    async fn generate(&self, prompt: String) -> Result<String, GenerationError> {
        (**self).generate(prompt).await
    }
}

pub use gemini::GeminiClient;
pub use scripted::ScriptedGenerator;

/// A generator with a bounded wait per request
#[derive(Clone)]
pub struct Narrator {
    generator: Arc<dyn NarrativeGenerator>,
    timeout: Duration,
}

impl Narrator {
    pub fn new(generator: Arc<dyn NarrativeGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Sends `prompt` and returns the trimmed reply.
    ///
    /// A blank reply counts as a failure, as does running past the timeout.
    pub async fn request(&self, prompt: String) -> Result<String, GenerationError> {
        let reply = tokio::time::timeout(self.timeout, self.generator.generate(prompt))
            .await
            .map_err(|_| GenerationError::TimedOut(self.timeout.as_millis() as u64))??;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(GenerationError::InvalidResponse("empty reply".to_string()));
        }
        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalling;

    #[async_trait]
    impl NarrativeGenerator for Stalling {
        async fn generate(&self, _prompt: String) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn request_times_out() {
        let narrator = Narrator::new(Arc::new(Stalling), Duration::from_millis(10));
        let result = narrator.request("prompt".to_string()).await;
        assert_eq!(result, Err(GenerationError::TimedOut(10)));
    }

    #[tokio::test]
    async fn request_trims_and_rejects_blank_replies() {
        let generator = ScriptedGenerator::new().reply("  The bee arrived.\n").reply("   ");
        let narrator = Narrator::new(Arc::new(generator), Duration::from_secs(1));

        assert_eq!(
            narrator.request("a".to_string()).await,
            Ok("The bee arrived.".to_string())
        );
        assert!(matches!(
            narrator.request("b".to_string()).await,
            Err(GenerationError::InvalidResponse(_))
        ));
    }
}
