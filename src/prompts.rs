//! Prompts for vision OCR and document chat.
//!
//! Centralising prompts here keeps wording changes out of the retry and
//! pipeline code, and lets unit tests inspect them without a live model.
//! Callers can override the chat prompt via
//! [`crate::config::ChatConfig::system_prompt`].

/// System prompt for transcribing a page image with a vision model.
pub const VISION_OCR_PROMPT: &str = r#"You are a precise OCR engine. Transcribe ALL text visible in the page image.

Rules:
- Reproduce the text exactly as printed, in natural reading order
- Keep one output line per printed line; separate paragraphs with a blank line
- Render tables as rows of cells separated by two spaces
- Do NOT describe images, logos, or layout
- Do NOT add commentary, headings, or code fences
- If the page has no text, output nothing"#;

/// Default system prompt for answering questions about loaded documents.
pub const CHAT_SYSTEM_PROMPT: &str = r#"You are an assistant helping a user work with long documents.

- Answer from the conversation history and document text provided
- Focus on the parts of the context most relevant to the question
- For broad questions, summarise the key points before specifics
- If the answer is not in the context, say so and state any assumption you make"#;

/// Build the user turn for a chat request.
///
/// The whole conversation log travels in this one message; the model keeps
/// no state between calls.
pub fn chat_user_message(context: &str, question: &str) -> String {
    format!(
        "Here is the conversation history and document text:\n\"\"\"\n{}\n\"\"\"\n\nQuestion: {}\n\nAnswer:",
        context.trim(),
        question.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_embeds_context_and_question() {
        let msg = chat_user_message("\nPolicy number: 16-17\n", "  What is the policy number? ");
        assert!(msg.contains("\"\"\"\nPolicy number: 16-17\n\"\"\""));
        assert!(msg.contains("Question: What is the policy number?\n"));
        assert!(msg.ends_with("Answer:"));
    }

    #[test]
    fn vision_prompt_forbids_fences() {
        assert!(VISION_OCR_PROMPT.contains("code fences"));
    }
}
