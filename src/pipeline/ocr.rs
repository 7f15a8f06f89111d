//! OCR engines: recognise the text of one rendered page.
//!
//! The OCR strategy fans pages out to an [`OcrEngine`]; two are built in:
//!
//! * [`TesseractOcr`]: local `tesseract` executable, run once per page on
//!   the blocking pool. No network, no model download.
//! * [`VisionOcr`]: a vision language model behind edgequake-llm (a local
//!   Ollama `llama3.2-vision` by default).

use crate::config::{ExtractionConfig, OcrEngineKind, DEFAULT_VISION_MODEL};
use crate::error::{ExtractError, Pdf2TextError};
use crate::pipeline::{encode, postprocess};
use crate::pipeline::llm::{self, RetryPolicy};
use crate::pipeline::render::RenderedPage;
use crate::prompts::VISION_OCR_PROMPT;
use edgequake_llm::{ChatMessage, LLMProvider};
use futures::future::BoxFuture;
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, warn};

/// Recognises the text on a rendered page.
///
/// Takes the page by value so implementations can move it onto a blocking
/// thread without cloning pixel data.
pub trait OcrEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn recognize(&self, page: RenderedPage) -> BoxFuture<'static, Result<String, ExtractError>>;
}

/// Build the engine selected by `config.ocr_engine`.
pub fn engine_from_config(config: &ExtractionConfig) -> Result<Arc<dyn OcrEngine>, Pdf2TextError> {
    match config.ocr_engine {
        OcrEngineKind::Tesseract => {
            let engine = TesseractOcr::new(config);
            if !engine.is_available() {
                return Err(Pdf2TextError::ToolNotFound {
                    tool: engine.binary.clone(),
                    hint: "Install tesseract or pass --tesseract-binary with its full path.".into(),
                });
            }
            Ok(Arc::new(engine))
        }
        OcrEngineKind::Vision => Ok(Arc::new(VisionOcr::from_config(config)?)),
    }
}

// ── Tesseract ────────────────────────────────────────────────────────────────

/// Runs `tesseract <page.png> stdout -l <lang> --psm <psm>`.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    language: String,
    psm: u8,
}

impl TesseractOcr {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            binary: config.tesseract_binary.clone(),
            language: config.ocr_language.clone(),
            psm: config.tesseract_psm,
        }
    }

    /// True when the configured executable can be spawned.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary).arg("--version").output().is_ok()
    }

    fn recognize_blocking(&self, page: &RenderedPage) -> Result<String, ExtractError> {
        let page_num = page.index + 1;
        let ocr_err = |detail: String| ExtractError::OcrFailure {
            page: page_num,
            detail,
        };

        let tmp = tempfile::Builder::new()
            .prefix("pdf2text-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ocr_err(format!("tempfile: {e}")))?;
        encode::write_png(&page.image, tmp.path())
            .map_err(|e| ocr_err(format!("PNG encoding failed: {e}")))?;

        let output = Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .output()
            .map_err(|e| ocr_err(format!("failed to run '{}': {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ocr_err(format!(
                "'{}' exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract: page {} → {} bytes", page_num, text.len());
        Ok(text)
    }
}

impl OcrEngine for TesseractOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, page: RenderedPage) -> BoxFuture<'static, Result<String, ExtractError>> {
        let engine = self.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || engine.recognize_blocking(&page))
                .await
                .map_err(|e| ExtractError::Internal(format!("OCR task panicked: {e}")))?
        })
    }
}

// ── Vision LLM ───────────────────────────────────────────────────────────────

/// Transcribes pages with a vision-capable LLM.
#[derive(Clone)]
pub struct VisionOcr {
    provider: Arc<dyn LLMProvider>,
    policy: RetryPolicy,
    max_tokens: usize,
}

impl VisionOcr {
    pub fn new(provider: Arc<dyn LLMProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            max_tokens: 4096,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Result<Self, Pdf2TextError> {
        let provider = llm::resolve_provider(
            config.provider.as_ref(),
            config.provider_name.as_deref(),
            config.vision_model.as_deref(),
            DEFAULT_VISION_MODEL,
        )?;
        Ok(Self::new(
            provider,
            RetryPolicy {
                max_retries: config.max_retries,
                backoff_ms: config.retry_backoff_ms,
            },
        ))
    }
}

impl OcrEngine for VisionOcr {
    fn name(&self) -> &'static str {
        "vision"
    }

    fn recognize(&self, page: RenderedPage) -> BoxFuture<'static, Result<String, ExtractError>> {
        let engine = self.clone();
        Box::pin(async move {
            let page_num = page.index + 1;
            let image = tokio::task::spawn_blocking(move || encode::encode_page(&page.image))
                .await
                .map_err(|e| ExtractError::Internal(format!("Encode task panicked: {e}")))?
                .map_err(|e| ExtractError::OcrFailure {
                    page: page_num,
                    detail: format!("PNG encoding failed: {e}"),
                })?;

            let messages = vec![
                ChatMessage::system(VISION_OCR_PROMPT),
                ChatMessage::user_with_images("", vec![image]),
            ];
            let options = llm::build_options(0.0, engine.max_tokens);
            let label = format!("vision page {page_num}");

            match llm::chat_with_retry(&engine.provider, &messages, &options, engine.policy, &label)
                .await
            {
                Ok(completion) => Ok(postprocess::strip_code_fences(&completion.content)),
                Err(detail) => {
                    warn!("{label}: giving up after {} retries", engine.policy.max_retries);
                    Err(ExtractError::OcrFailure {
                        page: page_num,
                        detail,
                    })
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn blank_page(index: usize) -> RenderedPage {
        RenderedPage {
            index,
            image: DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255; 4]))),
        }
    }

    #[tokio::test]
    async fn missing_tesseract_binary_is_an_ocr_failure() {
        let config = ExtractionConfig::builder()
            .tesseract_binary("pdf2text-no-such-tesseract-binary")
            .build()
            .unwrap();
        let engine = TesseractOcr::new(&config);
        assert!(!engine.is_available());

        let err = engine.recognize(blank_page(2)).await.unwrap_err();
        match err {
            ExtractError::OcrFailure { page, detail } => {
                assert_eq!(page, 3);
                assert!(detail.contains("failed to run"), "got: {detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_tesseract_disables_the_engine() {
        let config = ExtractionConfig::builder()
            .tesseract_binary("pdf2text-no-such-tesseract-binary")
            .build()
            .unwrap();
        let err = engine_from_config(&config).err().unwrap();
        assert!(matches!(err, Pdf2TextError::ToolNotFound { .. }));
        assert!(err.to_string().contains("pdf2text-no-such-tesseract-binary"));
    }

    #[tokio::test]
    async fn vision_engine_returns_the_model_transcription() {
        let mock = edgequake_llm::MockProvider::new();
        mock.add_response("```text\nPolicy 42\nInsured: ACME\n```").await;
        let engine = VisionOcr::new(
            Arc::new(mock),
            RetryPolicy {
                max_retries: 0,
                backoff_ms: 0,
            },
        );

        let text = engine.recognize(blank_page(0)).await.unwrap();
        assert_eq!(text, "Policy 42\nInsured: ACME");
    }

    #[tokio::test]
    async fn vision_engine_from_config_uses_the_injected_provider() {
        let mock = edgequake_llm::MockProvider::new();
        mock.add_response("Scanned line").await;
        let config = ExtractionConfig::builder()
            .ocr_engine(OcrEngineKind::Vision)
            .provider(Arc::new(mock))
            .build()
            .unwrap();

        let engine = engine_from_config(&config).unwrap();
        assert_eq!(engine.name(), "vision");
        assert_eq!(engine.recognize(blank_page(0)).await.unwrap(), "Scanned line");
    }
}
