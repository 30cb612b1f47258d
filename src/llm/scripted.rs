use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use super::NarrativeGenerator;
use crate::error::GenerationError;

type Responder = Box<dyn Fn(&str) -> Result<String, GenerationError> + Send + Sync>;

/// Generator that replays canned replies instead of calling a model.
///
/// Queued replies are used first, in order. Once the queue is empty the
/// responder (if any) answers; otherwise every request fails, which makes the
/// engine fall back to its fixed narration.
pub struct ScriptedGenerator {
    queue: Mutex<VecDeque<Result<String, GenerationError>>>,
    responder: Option<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            responder: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request through `responder`
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, GenerationError> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// Queues a successful reply
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queues a failure
    pub fn fail(self, error: GenerationError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, item: Result<String, GenerationError>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(item);
    }

    /// Every prompt received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NarrativeGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: String) -> Result<String, GenerationError> {
        let queued = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let result = match (queued, &self.responder) {
            (Some(item), _) => item,
            (None, Some(responder)) => responder(&prompt),
            (None, None) => Err(GenerationError::NotConfigured(
                "no scripted reply left".to_string(),
            )),
        };

        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_then_responder() {
        let generator = ScriptedGenerator::with_responder(|prompt| Ok(format!("echo: {}", prompt)))
            .reply("first")
            .fail(GenerationError::RequestFailed("quota".to_string()));

        assert_eq!(generator.generate("a".into()).await, Ok("first".to_string()));
        assert!(generator.generate("b".into()).await.is_err());
        assert_eq!(generator.generate("c".into()).await, Ok("echo: c".to_string()));
        assert_eq!(generator.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn empty_script_fails() {
        let generator = ScriptedGenerator::new();
        assert!(matches!(
            generator.generate("x".into()).await,
            Err(GenerationError::NotConfigured(_))
        ));
    }
}
