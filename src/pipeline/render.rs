//! pdfium access: bind the library, rasterise pages, read page text layers.
//!
//! ## Threading
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is not safe
//! to call from async contexts. Every entry point here is either blocking
//! (called from a `spawn_blocking` worker) or wraps its work in
//! `spawn_blocking` itself.
//!
//! With the `thread_safe` feature a bound [`Pdfium`] holds a process-wide
//! lock until it is dropped, so two pdfium sessions never overlap. Each
//! entry point therefore opens the document once and walks its pages in
//! order; page-level parallelism happens downstream of pdfium (the OCR
//! engines), never inside it.
//!
//! ## Pixel cap
//!
//! Page sizes vary wildly: an A0 poster at 200 DPI would produce a
//! 6,600 × 9,400 px image. `max_rendered_pixels` caps the longest edge
//! regardless of physical size, keeping memory bounded per worker.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::pipeline::input::Document;
use futures::future::BoxFuture;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One rasterised page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 0-based page index.
    pub index: usize,
    pub image: DynamicImage,
}

/// Turns a document into page images for OCR.
///
/// The OCR strategy is written against this trait so the renderer can be
/// swapped (or faked in tests) without touching the OCR fan-out.
pub trait Rasterizer: Send + Sync {
    /// Render every page, in page order.
    fn rasterize<'a>(
        &'a self,
        document: &'a Document,
    ) -> BoxFuture<'a, Result<Vec<RenderedPage>, ExtractError>>;
}

/// [`Rasterizer`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    dpi: u32,
    max_pixels: u32,
    password: Option<String>,
}

impl PdfiumRasterizer {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
        }
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize<'a>(
        &'a self,
        document: &'a Document,
    ) -> BoxFuture<'a, Result<Vec<RenderedPage>, ExtractError>> {
        let path = document.path().to_path_buf();
        let rasterizer = self.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                render_pages_blocking(
                    &path,
                    rasterizer.dpi,
                    rasterizer.max_pixels,
                    rasterizer.password.as_deref(),
                )
            })
            .await
            .map_err(|e| ExtractError::Internal(format!("Render task panicked: {e}")))?
        })
    }
}

/// Bind to the pdfium shared library.
///
/// `PDFIUM_LIB_PATH` may name the library file itself or the directory that
/// holds it; otherwise the system library search path is used.
pub fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => {
            let path = PathBuf::from(p);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            Pdfium::bind_to_library(&lib)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractError::PdfiumUnavailable(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Open a document with pdfium, classifying password problems.
pub fn load_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, String> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{e:?}");
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                format!("wrong password for '{}'", pdf_path.display())
            } else {
                format!("'{}' is encrypted and needs a password", pdf_path.display())
            }
        } else {
            err_str
        }
    })
}

/// Read the text layer of every page with a single pdfium session.
///
/// pdfium serialises all calls process-wide (see the module docs), so the
/// document is opened once and its pages are read in order. The outer error
/// means the document itself could not be opened; per-page failures land in
/// the returned vector at the page's index.
pub fn text_layer_pages_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<Vec<Result<String, ExtractError>>, ExtractError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, pdf_path, password)
        .map_err(|detail| ExtractError::ParseFailure { page: None, detail })?;

    let texts = document
        .pages()
        .iter()
        .enumerate()
        .map(|(index, page)| {
            page.text()
                .map(|text| text.all())
                .map_err(|e| ExtractError::ParseFailure {
                    page: Some(index + 1),
                    detail: format!("{e:?}"),
                })
        })
        .collect();

    Ok(texts)
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<Vec<RenderedPage>, ExtractError> {
    let pdfium = bind_pdfium()?;

    let document = load_document(&pdfium, pdf_path, password)
        .map_err(|detail| ExtractError::RenderFailure { page: 0, detail })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded for rendering: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(total_pages);

    for (index, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ExtractError::RenderFailure {
                page: index + 1,
                detail: format!("{e:?}"),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );

        results.push(RenderedPage { index, image });
    }

    Ok(results)
}
