//! Configuration types for text extraction and chat.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]; the chat loop has its own
//! [`ChatConfig`]. Keeping every knob in one struct makes it trivial to share
//! a config across worker tasks and to log exactly what a run used.

use crate::error::Pdf2TextError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default local model used for chat. Served by Ollama.
pub const DEFAULT_CHAT_MODEL: &str = "llama3.2";

/// Default vision model used by [`OcrEngineKind::Vision`].
pub const DEFAULT_VISION_MODEL: &str = "llama3.2-vision";

/// Default provider when nothing else is configured.
pub const DEFAULT_PROVIDER: &str = "ollama";

/// Configuration for one extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2text::{ExtractionConfig, StrategyKind};
///
/// let config = ExtractionConfig::builder()
///     .strategies(vec![StrategyKind::Layout, StrategyKind::Basic])
///     .concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.strategies.len(), 2);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Strategies to try, in order. Default: OCR → layout → basic.
    pub strategies: Vec<StrategyKind>,

    /// Maximum number of pages processed at once inside a strategy. Default: 8.
    pub concurrency: usize,

    /// Rendering DPI used by the OCR strategy. Range: 72–600. Default: 200.
    ///
    /// OCR accuracy drops sharply below ~150 DPI on body text.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 3000.
    ///
    /// Caps memory on oversized pages independently of DPI.
    pub max_rendered_pixels: u32,

    /// Which OCR backend the OCR strategy uses. Default: tesseract.
    pub ocr_engine: OcrEngineKind,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`. Default: `eng`.
    pub ocr_language: String,

    /// Tesseract executable name or path. Default: `tesseract`.
    pub tesseract_binary: String,

    /// Tesseract page segmentation mode. Default: 3 (fully automatic).
    pub tesseract_psm: u8,

    /// PDF user password for encrypted documents (pdfium strategies only).
    pub password: Option<String>,

    /// Vision model for [`OcrEngineKind::Vision`]. Default: `llama3.2-vision`.
    pub vision_model: Option<String>,

    /// Provider name for [`OcrEngineKind::Vision`]. Default: `ollama`.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Maximum retry attempts per page for vision OCR. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Optional progress observer for strategy and page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyKind::default_order(),
            concurrency: 8,
            dpi: 200,
            max_rendered_pixels: 3000,
            ocr_engine: OcrEngineKind::default(),
            ocr_language: "eng".to_string(),
            tesseract_binary: "tesseract".to_string(),
            tesseract_psm: 3,
            password: None,
            vision_model: None,
            provider_name: None,
            provider: None,
            max_retries: 3,
            retry_backoff_ms: 500,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("strategies", &self.strategies)
            .field("concurrency", &self.concurrency)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("ocr_engine", &self.ocr_engine)
            .field("ocr_language", &self.ocr_language)
            .field("tesseract_binary", &self.tesseract_binary)
            .field("tesseract_psm", &self.tesseract_psm)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("vision_model", &self.vision_model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_retries", &self.max_retries)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn strategies(mut self, order: Vec<StrategyKind>) -> Self {
        self.config.strategies = order;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn ocr_engine(mut self, engine: OcrEngineKind) -> Self {
        self.config.ocr_engine = engine;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn tesseract_binary(mut self, binary: impl Into<String>) -> Self {
        self.config.tesseract_binary = binary.into();
        self
    }

    pub fn tesseract_psm(mut self, psm: u8) -> Self {
        self.config.tesseract_psm = psm.min(13);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Pdf2TextError> {
        let c = &self.config;
        if c.strategies.is_empty() {
            return Err(Pdf2TextError::InvalidConfig(
                "At least one extraction strategy is required".into(),
            ));
        }
        for (i, kind) in c.strategies.iter().enumerate() {
            if c.strategies[..i].contains(kind) {
                return Err(Pdf2TextError::InvalidConfig(format!(
                    "Strategy '{kind}' listed more than once"
                )));
            }
        }
        if c.dpi < 72 || c.dpi > 600 {
            return Err(Pdf2TextError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(Pdf2TextError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(Pdf2TextError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Configuration for the chat loop.
#[derive(Clone)]
pub struct ChatConfig {
    /// Chat model. Default: `llama3.2`.
    pub model: Option<String>,

    /// Provider name. Default: `ollama`.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Custom system prompt. If None, uses [`crate::prompts::CHAT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens per answer. Default: 1024.
    pub max_tokens: usize,

    /// Retries per question on a failed call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds. Default: 500.
    pub retry_backoff_ms: u64,

    /// Conversation log cap in characters. Default: 5000.
    pub max_context_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            system_prompt: None,
            temperature: 0.2,
            max_tokens: 1024,
            max_retries: 2,
            retry_backoff_ms: 500,
            max_context_chars: crate::conversation::DEFAULT_MAX_CONTEXT_CHARS,
        }
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("max_context_chars", &self.max_context_chars)
            .finish()
    }
}

impl ChatConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    pub fn with_max_context_chars(mut self, n: usize) -> Self {
        self.max_context_chars = n.max(1);
        self
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Built-in extraction strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Rasterise pages and run OCR on each image.
    Ocr,
    /// Layout-aware text-layer extraction via pdfium, pages in parallel.
    Layout,
    /// Sequential text-layer extraction via lopdf.
    Basic,
}

impl StrategyKind {
    /// OCR → layout → basic.
    pub fn default_order() -> Vec<StrategyKind> {
        vec![StrategyKind::Ocr, StrategyKind::Layout, StrategyKind::Basic]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Ocr => "ocr",
            StrategyKind::Layout => "layout",
            StrategyKind::Basic => "basic",
        }
    }

    /// Parse a comma-separated list such as `"layout,basic"`.
    pub fn parse_list(s: &str) -> Result<Vec<StrategyKind>, Pdf2TextError> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = Pdf2TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ocr" => Ok(StrategyKind::Ocr),
            "layout" | "pdfium" => Ok(StrategyKind::Layout),
            "basic" | "text" => Ok(StrategyKind::Basic),
            other => Err(Pdf2TextError::InvalidConfig(format!(
                "Unknown strategy '{other}' (expected ocr, layout or basic)"
            ))),
        }
    }
}

/// OCR backend used by the OCR strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// Local `tesseract` executable. (default)
    #[default]
    Tesseract,
    /// Vision language model through edgequake-llm.
    Vision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_is_ocr_layout_basic() {
        let config = ExtractionConfig::default();
        assert_eq!(
            config.strategies,
            vec![StrategyKind::Ocr, StrategyKind::Layout, StrategyKind::Basic]
        );
    }

    #[test]
    fn builder_clamps_values() {
        let config = ExtractionConfig::builder()
            .dpi(10)
            .concurrency(0)
            .tesseract_psm(99)
            .build()
            .unwrap();
        assert_eq!(config.dpi, 72);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.tesseract_psm, 13);
    }

    #[test]
    fn build_rejects_empty_strategy_list() {
        let err = ExtractionConfig::builder()
            .strategies(vec![])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("At least one"));
    }

    #[test]
    fn build_rejects_duplicate_strategies() {
        let err = ExtractionConfig::builder()
            .strategies(vec![StrategyKind::Basic, StrategyKind::Basic])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("more than once"), "got: {err}");
    }

    #[test]
    fn build_rejects_blank_language() {
        assert!(ExtractionConfig::builder()
            .ocr_language("  ")
            .build()
            .is_err());
    }

    #[test]
    fn parse_strategy_list() {
        assert_eq!(
            StrategyKind::parse_list("layout, basic").unwrap(),
            vec![StrategyKind::Layout, StrategyKind::Basic]
        );
        assert_eq!(
            StrategyKind::parse_list("OCR").unwrap(),
            vec![StrategyKind::Ocr]
        );
        assert!(StrategyKind::parse_list("ocr,magic").is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let config = ExtractionConfig::builder()
            .password("hunter2")
            .build()
            .unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn chat_config_defaults() {
        let chat = ChatConfig::default().with_max_context_chars(0);
        assert_eq!(chat.max_context_chars, 1);
        assert_eq!(ChatConfig::default().max_context_chars, 5000);
    }
}
