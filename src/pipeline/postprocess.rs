//! Post-processing: deterministic cleanup of extracted page text.
//!
//! Every backend leaves its own fingerprints on the text it returns:
//!
//! - pdfium reports line breaks as `\r\n` and sometimes emits form feeds
//! - lopdf terminates every text object with a newline, leaving long runs of
//!   blank lines on sparse pages
//! - tesseract pads paragraphs with blank lines and trailing spaces
//!
//! The rules below remove those artefacts without touching content, so the
//! same page yields the same text whichever strategy read it.
//!
//! Vision models also like to wrap a transcription in a ``` fence. That is a
//! property of the model reply, not of the page, so [`strip_code_fences`] is
//! applied by the vision engine only. A text layer that really contains a
//! fenced block keeps it.
//!
//! ## Rule Order
//!
//! Invisible characters are removed before the whitespace passes so a line
//! holding only a zero-width space becomes blank.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw text of one page.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR / form feed → LF)
/// 2. Strip invisible Unicode and NUL bytes
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Trim leading and trailing blank space of the page
///
/// The result is empty exactly when the page carried no visible text.
pub fn clean_page_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{0000}', '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Model replies: strip an outer code fence ─────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*)\n```\s*$").unwrap());

/// Remove a ``` fence wrapping the whole of a model reply.
pub fn strip_code_fences(input: &str) -> String {
    let s = normalise_line_endings(input);
    match RE_OUTER_FENCES.captures(s.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc\u{000C}d"), "a\nb\nc\nd");
    }

    #[test]
    fn test_strip_fences_with_lang() {
        let input = "```text\nPolicy 42\nInsured: ACME\n```";
        assert_eq!(strip_code_fences(input), "Policy 42\nInsured: ACME");
    }

    #[test]
    fn test_no_fences_passthrough() {
        assert_eq!(strip_code_fences("plain\ntext"), "plain\ntext");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar\u{0000}";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn whitespace_only_page_is_empty() {
        assert_eq!(clean_page_text(" \r\n\u{200B}\n\t\n"), "");
    }

    #[test]
    fn clean_is_idempotent() {
        let raw = "Invoice  \r\n\r\n\r\n\r\n\r\nTotal: $335.00\r\n";
        let once = clean_page_text(raw);
        assert_eq!(once, "Invoice\n\n\nTotal: $335.00");
        assert_eq!(clean_page_text(&once), once);
    }

    #[test]
    fn fenced_block_in_a_text_layer_is_kept() {
        let page = "```\nfn main() {}\n```";
        assert_eq!(clean_page_text(page), page);
    }

    #[test]
    fn test_strip_fences_with_crlf_reply() {
        assert_eq!(strip_code_fences("```\r\nTotal: 12\r\n```\r\n"), "Total: 12");
    }
}
