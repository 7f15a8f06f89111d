//! Question answering over extracted documents.
//!
//! The model is stateless: every call carries the whole
//! [`ConversationLog`] (document text plus earlier exchanges) in its user
//! turn, and the new exchange is appended to the log afterwards.

use crate::config::{ChatConfig, DEFAULT_CHAT_MODEL};
use crate::conversation::ConversationLog;
use crate::error::Pdf2TextError;
use crate::pipeline::llm::{self, RetryPolicy};
use crate::prompts::{chat_user_message, CHAT_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, LLMProvider};
use std::sync::Arc;
use tracing::{debug, info};

/// Resolve the provider for chat from `config`.
///
/// Falls back to the local default (`ollama` / `llama3.2`) when neither the
/// config nor the environment names one.
pub fn resolve_chat_provider(config: &ChatConfig) -> Result<Arc<dyn LLMProvider>, Pdf2TextError> {
    llm::resolve_provider(
        config.provider.as_ref(),
        config.provider_name.as_deref(),
        config.model.as_deref(),
        DEFAULT_CHAT_MODEL,
    )
}

/// System and user text for one question.
pub fn build_prompt(log: &ConversationLog, question: &str, config: &ChatConfig) -> (String, String) {
    let system = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| CHAT_SYSTEM_PROMPT.to_string());
    (system, chat_user_message(log.as_str(), question))
}

pub fn build_messages(log: &ConversationLog, question: &str, config: &ChatConfig) -> Vec<ChatMessage> {
    let (system, user) = build_prompt(log, question, config);
    vec![ChatMessage::system(&system), ChatMessage::user(&user)]
}

/// Ask `question` against `log` and record the exchange.
///
/// The log is only modified when the provider answers.
pub async fn ask(
    provider: &Arc<dyn LLMProvider>,
    log: &mut ConversationLog,
    question: &str,
    config: &ChatConfig,
) -> Result<String, Pdf2TextError> {
    let question = question.trim();
    let messages = build_messages(log, question, config);
    let options = llm::build_options(config.temperature, config.max_tokens);
    let policy = RetryPolicy {
        max_retries: config.max_retries,
        backoff_ms: config.retry_backoff_ms,
    };
    debug!(
        "chat: {} context chars, question {} chars",
        log.len(),
        question.chars().count()
    );

    let completion = llm::chat_with_retry(provider, &messages, &options, policy, "chat")
        .await
        .map_err(|message| Pdf2TextError::LlmApiError {
            retries: config.max_retries,
            message,
        })?;

    let answer = completion.content.trim().to_string();
    info!(
        "chat: answered with {} prompt / {} output tokens ({} retries)",
        completion.input_tokens, completion.output_tokens, completion.retries
    );
    log.record_exchange(question, &answer);
    Ok(answer)
}

/// `exit` (any case, surrounding whitespace ignored) ends the chat loop.
pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}
