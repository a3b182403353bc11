use image::GrayImage;
use std::path::Path;
use thiserror::Error;

use crate::types::TextFragment;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image encode error: {0}")]
    ImageEncode(String),
    #[error("OCR engine initialization failed: {0}")]
    Init(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available; rebuild with `--features tesseract`")]
    NotAvailable,
}

/// Abstraction over an OCR backend.
/// Implementations accept a grayscale raster and return the recognized text
/// fragments in the engine's own order.
pub trait OcrBackend {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<TextFragment>, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<TextFragment>, OcrError> {
        (**self).recognize(image)
    }
}

/// Build the engine this binary was compiled with. Construct it once and reuse
/// it for every image.
pub fn system_backend(
    language: &str,
    tessdata_dir: Option<&Path>,
) -> Result<Box<dyn OcrBackend>, OcrError> {
    #[cfg(feature = "tesseract")]
    {
        let engine = tesseract_backend::TesseractRecognizer::new(tessdata_dir, language)?;
        Ok(Box::new(engine))
    }
    #[cfg(not(feature = "tesseract"))]
    {
        let _ = (language, tessdata_dir);
        Err(OcrError::NotAvailable)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns preset fragments — useful for unit testing the extraction pipeline
/// without requiring Tesseract to be installed.
pub struct MockRecognizer {
    pub fragments: Vec<TextFragment>,
}

impl MockRecognizer {
    /// One fragment per non-empty line of `text`.
    pub fn new(text: impl Into<String>) -> Self {
        let fragments = text
            .into()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(TextFragment::text_only)
            .collect();
        Self { fragments }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image: &GrayImage) -> Result<Vec<TextFragment>, OcrError> {
        Ok(self.fragments.clone())
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError};
    use crate::types::{BoundingBox, TextFragment};
    use image::{DynamicImage, GrayImage};
    use leptess::LepTess;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::path::Path;

    /// Holds one initialized engine for the whole run.
    pub struct TesseractRecognizer {
        engine: RefCell<LepTess>,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<&Path>, lang: &str) -> Result<Self, OcrError> {
            let data_path = data_path.map(|p| p.to_string_lossy().into_owned());
            let engine = LepTess::new(data_path.as_deref(), lang)
                .map_err(|e| OcrError::Init(format!("language '{lang}': {e}")))?;
            Ok(Self { engine: RefCell::new(engine) })
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image: &GrayImage) -> Result<Vec<TextFragment>, OcrError> {
            let mut png = Vec::new();
            DynamicImage::ImageLuma8(image.clone())
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(|e| OcrError::ImageEncode(e.to_string()))?;

            let mut lt = self.engine.borrow_mut();
            lt.set_image_from_mem(&png)
                .map_err(|e| OcrError::Engine(e.to_string()))?;

            // None means no text was detected at all.
            let Some(boxes) =
                lt.get_component_boxes(leptess::capi::TessPageIteratorLevel_RIL_TEXTLINE, true)
            else {
                return Ok(Vec::new());
            };

            let mut fragments = Vec::new();
            for b in &boxes {
                let geom = b.get_geometry();
                lt.set_rectangle(geom.x, geom.y, geom.w, geom.h);
                let text = lt
                    .get_utf8_text()
                    .map_err(|e| OcrError::Engine(e.to_string()))?
                    .trim()
                    .to_string();
                if text.is_empty() {
                    continue;
                }
                fragments.push(TextFragment::new(
                    text,
                    BoundingBox { x: geom.x, y: geom.y, width: geom.w, height: geom.h },
                ));
            }
            Ok(fragments)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> GrayImage {
        GrayImage::new(4, 4)
    }

    #[test]
    fn mock_returns_one_fragment_per_line() {
        let r = MockRecognizer::new("RAILWAY TICKET\n\n  No. 0042 \nPrice 12.50");
        let texts: Vec<_> = r.recognize(&blank()).unwrap().into_iter().map(|f| f.text).collect();
        assert_eq!(texts, vec!["RAILWAY TICKET", "No. 0042", "Price 12.50"]);
    }

    #[test]
    fn mock_ignores_image_content() {
        let r = MockRecognizer::new("hello");
        assert_eq!(r.recognize(&blank()).unwrap().len(), 1);
        assert_eq!(r.recognize(&GrayImage::new(1, 1)).unwrap()[0].text, "hello");
    }

    #[test]
    fn boxed_backend_delegates() {
        let r: Box<dyn OcrBackend> = Box::new(MockRecognizer::new("a\nb"));
        assert_eq!(r.recognize(&blank()).unwrap().len(), 2);
    }

    #[cfg(not(feature = "tesseract"))]
    #[test]
    fn system_backend_reports_missing_engine() {
        assert!(matches!(system_backend("eng", None), Err(OcrError::NotAvailable)));
    }
}
