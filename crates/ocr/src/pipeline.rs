use std::path::Path;
use thiserror::Error;

use tallyscan_core::TicketOutcome;

use crate::extract;
use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// Outcome of reading the ticket number from one image.
#[derive(Debug)]
pub enum Extraction {
    Found(u64),
    /// The engine ran but no fragment matched `No. <digits>`.
    NotFound,
    Failed(ReadError),
}

impl Extraction {
    pub fn to_outcome(&self) -> TicketOutcome {
        match self {
            Extraction::Found(n) => TicketOutcome::Found(*n),
            Extraction::NotFound => TicketOutcome::NotFound,
            Extraction::Failed(e) => TicketOutcome::Failed(e.to_string()),
        }
    }
}

/// Orchestrates: preprocess → OCR → extract.
///
/// The recognizer is handed in already constructed; one instance serves every
/// image of a run and is dropped with the reader.
pub struct TicketReader<R: OcrBackend> {
    recognizer: R,
}

impl<R: OcrBackend> TicketReader<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }

    /// Read one file. Errors are logged and returned as [`Extraction::Failed`]
    /// so the caller can carry on with the rest of the batch.
    pub fn read(&self, path: &Path) -> Extraction {
        match self.try_read(path) {
            Ok(Some(n)) => {
                tracing::info!("{}: No. {n}", path.display());
                Extraction::Found(n)
            }
            Ok(None) => {
                tracing::warn!("{}: no ticket number found", path.display());
                Extraction::NotFound
            }
            Err(e) => {
                tracing::warn!("Error processing {}: {e}", path.display());
                Extraction::Failed(e)
            }
        }
    }

    fn try_read(&self, path: &Path) -> Result<Option<u64>, ReadError> {
        let raster = preprocess::preprocess(path)?;
        let fragments = self.recognizer.recognize(&raster)?;
        for f in &fragments {
            tracing::debug!("{}: fragment {:?} at {:?}", path.display(), f.text, f.bbox);
        }
        Ok(extract::first_ticket_number(&fragments))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
