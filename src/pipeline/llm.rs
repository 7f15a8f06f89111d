//! LLM calls with retry/backoff, shared by vision OCR and chat.
//!
//! ## Retry Strategy
//!
//! A local Ollama server answers slowly while it loads a model and may drop
//! the first request; remote providers return 429/503 under load. Both are
//! transient, so every call is retried with exponential backoff
//! (`backoff_ms * 2^attempt`): 500 ms → 1 s → 2 s with the defaults.

use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// How many times to retry and how long to wait first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(
            self.backoff_ms
                .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1))),
        )
    }
}

/// A successful completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub retries: u32,
}

/// Send `messages` to `provider`, retrying transient failures.
///
/// `label` identifies the call in logs (e.g. `"page 3"`, `"chat"`).
/// Returns the last error message once retries are exhausted.
pub async fn chat_with_retry(
    provider: &Arc<dyn LLMProvider>,
    messages: &[ChatMessage],
    options: &CompletionOptions,
    policy: RetryPolicy,
    label: &str,
) -> Result<Completion, String> {
    let start = Instant::now();
    let mut last_err: Option<String> = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let backoff = policy.backoff(attempt);
            warn!(
                "{}: retry {}/{} after {:?}",
                label, attempt, policy.max_retries, backoff
            );
            sleep(backoff).await;
        }

        match provider.chat(messages, Some(options)).await {
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    label,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                return Ok(Completion {
                    content: response.content,
                    input_tokens: response.prompt_tokens as u64,
                    output_tokens: response.completion_tokens as u64,
                    retries: attempt,
                });
            }
            Err(e) => {
                let err_msg = format!("{e}");
                warn!("{}: attempt {} failed: {}", label, attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| "Unknown error".to_string()))
}

/// Build `CompletionOptions` from sampling settings.
pub fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

/// Resolve an LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider**: used as-is.
/// 2. **Named provider**: created with `model` (or `default_model`).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **Local default**: [`crate::config::DEFAULT_PROVIDER`] with
///    `model` or `default_model`.
pub fn resolve_provider(
    provider: Option<&Arc<dyn LLMProvider>>,
    provider_name: Option<&str>,
    model: Option<&str>,
    default_model: &str,
) -> Result<Arc<dyn LLMProvider>, crate::error::Pdf2TextError> {
    if let Some(provider) = provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(name) = provider_name {
        return create_provider(name, model.unwrap_or(default_model));
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, model.unwrap_or(&env_model));
        }
    }

    create_provider(
        crate::config::DEFAULT_PROVIDER,
        model.unwrap_or(default_model),
    )
}

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, crate::error::Pdf2TextError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        crate::error::Pdf2TextError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_carries_sampling_settings() {
        let opts = build_options(0.2, 1024);
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff_ms: 500,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let policy = RetryPolicy {
            max_retries: 100,
            backoff_ms: u64::MAX / 2,
        };
        assert_eq!(policy.backoff(80), Duration::from_millis(u64::MAX));
    }
}
