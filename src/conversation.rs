//! Bounded conversation history.
//!
//! The log is a single string that grows by appending and is cut from the
//! front once it exceeds its limit, so the newest text always survives. The
//! caller owns it and passes it by `&mut` into [`crate::chat::ask`].

/// Default maximum length of a [`ConversationLog`], in characters.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 5000;

/// Append-only text log that keeps only its last `max_chars` characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationLog {
    text: String,
    max_chars: usize,
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTEXT_CHARS)
    }
}

impl ConversationLog {
    /// An empty log holding at most `max_chars` characters (minimum 1).
    pub fn new(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            max_chars: max_chars.max(1),
        }
    }

    /// Append `"\n" + text`, then drop characters from the front until the
    /// log fits.
    pub fn append(&mut self, text: &str) {
        self.text.push('\n');
        self.text.push_str(text);
        self.truncate_front();
    }

    /// Append a question/answer pair as `"User: q\nAI: a"`.
    pub fn record_exchange(&mut self, question: &str, answer: &str) {
        self.append(&format!("User: {question}\nAI: {answer}"));
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    fn truncate_front(&mut self) {
        let excess = self.len().saturating_sub(self.max_chars);
        if excess == 0 {
            return;
        }
        // Byte offset of the first kept character.
        let cut = self
            .text
            .char_indices()
            .nth(excess)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len());
        self.text.drain(..cut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_prefixes_newline() {
        let mut log = ConversationLog::new(100);
        log.append("page one");
        log.append("page two");
        assert_eq!(log.as_str(), "\npage one\npage two");
    }

    #[test]
    fn keeps_only_the_tail() {
        let mut log = ConversationLog::new(5);
        log.append("abcdefgh");
        assert_eq!(log.as_str(), "defgh");
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut log = ConversationLog::new(4);
        log.append("ééééé€");
        assert_eq!(log.as_str(), "ééé€");
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn record_exchange_format() {
        let mut log = ConversationLog::default();
        log.record_exchange("What is the total?", "42");
        assert_eq!(log.as_str(), "\nUser: What is the total?\nAI: 42");
        assert_eq!(log.max_chars(), DEFAULT_MAX_CONTEXT_CHARS);
    }

    #[test]
    fn zero_limit_is_raised_to_one() {
        let mut log = ConversationLog::new(0);
        log.append("xyz");
        assert_eq!(log.as_str(), "z");
    }
}
