//! Text-model calls: idea → story and story → screenplay.
//!
//! Both calls share one request shape (system prompt + user message) and one
//! retry loop. Prompt wording lives in [`crate::prompts`].
//!
//! ## Retry Strategy
//!
//! Provider errors (HTTP 429/503, dropped connections) are retried with
//! exponential backoff, `retry_backoff_ms * 2^(attempt-1)`. With the defaults
//! (500 ms, 2 retries) that is 500 ms then 1 s. A response that arrives but
//! carries no text is not retried; it fails the run immediately.

use crate::config::ScreenplayConfig;
use crate::error::StoryScriptError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Text returned by one generation call, with its usage figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
}

/// Run one system + user exchange against the provider.
///
/// `stage` labels logs and errors (`"story"` or `"script"`).
///
/// # Errors
/// - [`StoryScriptError::LlmApiError`] once every retry has failed
/// - [`StoryScriptError::UpstreamGenerationEmpty`] when the reply is blank
pub async fn generate_text(
    provider: &Arc<dyn LLMProvider>,
    stage: &'static str,
    system_prompt: &str,
    user_prompt: &str,
    config: &ScreenplayConfig,
) -> Result<GeneratedText, StoryScriptError> {
    let start = Instant::now();
    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(user_prompt),
    ];
    let options = build_options(config);

    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "{}: retry {}/{} after {}ms",
                stage, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                let duration = start.elapsed();
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    stage, response.prompt_tokens, response.completion_tokens, duration
                );

                if response.content.trim().is_empty() {
                    return Err(StoryScriptError::UpstreamGenerationEmpty { stage });
                }

                return Ok(GeneratedText {
                    content: response.content,
                    input_tokens: response.prompt_tokens as u64,
                    output_tokens: response.completion_tokens as u64,
                    duration_ms: duration.as_millis() as u64,
                });
            }
            Err(e) => {
                let err_msg = format!("{}", e);
                warn!("{}: attempt {} failed: {}", stage, attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
        }
    }

    Err(StoryScriptError::LlmApiError {
        retries: config.max_retries,
        message: last_err.unwrap_or_else(|| "Unknown error".to_string()),
    })
}

/// Build `CompletionOptions` from the screenplay config.
fn build_options(config: &ScreenplayConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edgequake_llm::{LLMResponse, LlmError, MockProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls, then answers with fixed usage figures.
    struct FlakyProvider {
        failures: usize,
        calls: AtomicUsize,
    }

    impl FlakyProvider {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        fn model(&self) -> &str {
            "flaky-model"
        }

        fn max_context_length(&self) -> usize {
            4096
        }

        async fn complete(&self, _prompt: &str) -> edgequake_llm::Result<LLMResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(LlmError::RateLimited("slow down".into()));
            }
            let mut response = LLMResponse::new("INT. ROOM - DAY\nQuiet.", "flaky-model");
            response.prompt_tokens = 120;
            response.completion_tokens = 45;
            Ok(response)
        }

        async fn complete_with_options(
            &self,
            prompt: &str,
            _options: &CompletionOptions,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.complete(prompt).await
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _options: Option<&CompletionOptions>,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.complete("").await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_reports_usage() {
        let flaky = Arc::new(FlakyProvider::new(2));
        let provider: Arc<dyn LLMProvider> = flaky.clone();
        let config = ScreenplayConfig::default();

        let text = generate_text(&provider, "script", "sys", "user", &config)
            .await
            .unwrap();
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(text.content, "INT. ROOM - DAY\nQuiet.");
        assert_eq!(text.input_tokens, 120);
        assert_eq!(text.output_tokens, 45);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_are_api_error() {
        let flaky = Arc::new(FlakyProvider::new(usize::MAX));
        let provider: Arc<dyn LLMProvider> = flaky.clone();
        let config = ScreenplayConfig::builder().max_retries(1).build().unwrap();

        let err = generate_text(&provider, "story", "sys", "user", &config)
            .await
            .unwrap_err();
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
        match err {
            StoryScriptError::LlmApiError { retries, message } => {
                assert_eq!(retries, 1);
                assert!(message.contains("slow down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_reply_is_not_retried() {
        let mock = MockProvider::new();
        mock.add_response("   \n").await;
        mock.add_response("INT. ROOM - DAY").await;
        let provider: Arc<dyn LLMProvider> = Arc::new(mock);

        let err = generate_text(&provider, "script", "sys", "user", &ScreenplayConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoryScriptError::UpstreamGenerationEmpty { stage: "script" }
        ));

        let next = generate_text(&provider, "script", "sys", "user", &ScreenplayConfig::default())
            .await
            .unwrap();
        assert_eq!(next.content, "INT. ROOM - DAY");
    }

    #[test]
    fn build_options_defaults() {
        let config = ScreenplayConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.8));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn build_options_follows_config() {
        let config = ScreenplayConfig::builder()
            .temperature(0.2)
            .max_tokens(1200)
            .build()
            .unwrap();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(1200));
    }
}
