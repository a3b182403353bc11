use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use tallyscan_core::{list_images, list_numbered_jpgs, RenamePlan, ValidatedPlan};
use tallyscan_ocr::{OcrBackend, OcrError, TicketReader};
use tallyscan_pdf::{write_pdf, AssemblyReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameMode {
    Apply,
    DryRun,
    DryRunJson,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameSummary {
    pub ranked: usize,
    pub unplaced: usize,
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameReport {
    /// No candidate images; nothing was read or moved.
    NoImages,
    /// Dry run in a build without an OCR engine: the files that would be read.
    EngineMissing { candidates: Vec<String> },
    Done(RenameSummary),
}

/// Read every image in `dir`, plan the new names, and apply the plan unless this
/// is a dry run. The backend is only built once there is something to read.
pub fn rename<R, F>(dir: &Path, mode: RenameMode, make_backend: F) -> Result<RenameReport>
where
    R: OcrBackend,
    F: FnOnce() -> Result<R, OcrError>,
{
    let images = list_images(dir)?;
    if images.is_empty() {
        return Ok(RenameReport::NoImages);
    }

    // One engine for the whole batch; it lives as long as the reader.
    let backend = match make_backend() {
        Ok(backend) => backend,
        Err(OcrError::NotAvailable) if mode != RenameMode::Apply => {
            return Ok(RenameReport::EngineMissing {
                candidates: images.into_iter().map(|i| i.file_name).collect(),
            });
        }
        Err(e) => return Err(e).context("Failed to start OCR engine"),
    };
    let reader = TicketReader::new(backend);

    let outcomes = images
        .iter()
        .map(|image| (image.file_name.clone(), reader.read(&image.path).to_outcome()))
        .collect();

    let plan = ValidatedPlan::validate(RenamePlan::build(dir, outcomes))
        .context("Rename plan is not safe to apply")?;

    let summary = RenameSummary {
        ranked: plan.plan().ranked().count(),
        unplaced: plan.plan().unplaced().count(),
        applied: mode == RenameMode::Apply,
    };

    match mode {
        RenameMode::Apply => {
            plan.apply().context("Failed to apply rename plan")?;
        }
        RenameMode::DryRun => {
            for step in &plan.plan().steps {
                println!("{step}");
            }
        }
        RenameMode::DryRunJson => {
            println!("{}", serde_json::to_string_pretty(plan.plan())?);
        }
    }
    Ok(RenameReport::Done(summary))
}

/// Bind the `<n>.jpg` files of `dir` into one PDF. Returns `None` and writes
/// nothing when there are no numbered images.
pub fn assemble(dir: &Path, output_name: Option<&str>) -> Result<Option<AssemblyReport>> {
    let images = list_numbered_jpgs(dir)?;
    if images.is_empty() {
        return Ok(None);
    }

    let output = match output_name {
        Some(name) => dir.join(name),
        None => default_pdf_path(dir)?,
    };
    let paths: Vec<&Path> = images.iter().map(|i| i.path.as_path()).collect();
    let report = write_pdf(&paths, &output)
        .with_context(|| format!("Failed to build {}", output.display()))?;
    Ok(Some(report))
}

/// `<dir>/<dir name>.pdf`
pub fn default_pdf_path(dir: &Path) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Cannot derive a PDF name from {}", dir.display()))?;
    Ok(dir.join(format!("{name}.pdf")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Rgb, RgbImage};
    use std::fs;
    use tallyscan_ocr::TextFragment;

    /// Answers by the average shade of the preprocessed raster, so each test
    /// image can carry its own "printed" text.
    struct ShadeRecognizer(Vec<(u8, &'static str)>);

    impl OcrBackend for ShadeRecognizer {
        fn recognize(&self, image: &GrayImage) -> Result<Vec<TextFragment>, OcrError> {
            let n = (u64::from(image.width()) * u64::from(image.height())).max(1);
            let mean = (image.pixels().map(|p| u64::from(p[0])).sum::<u64>() / n) as i32;
            let (_, text) = self
                .0
                .iter()
                .min_by_key(|(shade, _)| (i32::from(*shade) - mean).abs())
                .ok_or_else(|| OcrError::Engine("no shades".into()))?;
            Ok(text.lines().map(TextFragment::text_only).collect())
        }
    }

    fn write_scan(dir: &Path, name: &str, red: u8) -> Vec<u8> {
        let path = dir.join(name);
        let img: RgbImage = ImageBuffer::from_fn(16, 16, |_, _| Rgb([red, 40, 40]));
        img.save(&path).unwrap();
        fs::read(&path).unwrap()
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    fn shades() -> Result<ShadeRecognizer, OcrError> {
        Ok(ShadeRecognizer(vec![
            (30, "TRAM\nNo. 42"),
            (90, "smudged"),
            (150, "No. 7"),
            (210, "RECEIPT\nNo. 100\nNo. 3"),
        ]))
    }

    fn no_engine() -> Result<ShadeRecognizer, OcrError> {
        Err(OcrError::NotAvailable)
    }

    fn completed(report: RenameReport) -> RenameSummary {
        match report {
            RenameReport::Done(summary) => summary,
            other => panic!("expected a completed run, got {other:?}"),
        }
    }

    #[test]
    fn renames_in_ticket_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_scan(dir.path(), "IMG_0001.png", 30);
        let b = write_scan(dir.path(), "IMG_0002.png", 150);
        let c = write_scan(dir.path(), "IMG_0003.PNG", 210);
        let failed = write_scan(dir.path(), "IMG_0004.png", 90);

        let report = rename(dir.path(), RenameMode::Apply, shades).unwrap();
        assert_eq!(completed(report), RenameSummary { ranked: 3, unplaced: 1, applied: true });

        assert_eq!(listing(dir.path()), vec!["1.jpg", "2.jpg", "3.jpg", "zIMG_0004.png"]);
        assert_eq!(fs::read(dir.path().join("1.jpg")).unwrap(), b);
        assert_eq!(fs::read(dir.path().join("2.jpg")).unwrap(), a);
        assert_eq!(fs::read(dir.path().join("3.jpg")).unwrap(), c);
        assert_eq!(fs::read(dir.path().join("zIMG_0004.png")).unwrap(), failed);
    }

    #[test]
    fn rerun_reproduces_names() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_scan(dir.path(), "a.png", 30);
        write_scan(dir.path(), "b.png", 150);

        for _ in 0..2 {
            rename(dir.path(), RenameMode::Apply, shades).unwrap();
        }
        assert_eq!(listing(dir.path()), vec!["1.jpg", "2.jpg"]);
        assert_eq!(fs::read(dir.path().join("2.jpg")).unwrap(), a);
    }

    #[test]
    fn duplicate_numbers_keep_first_name() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_scan(dir.path(), "a.png", 150);
        write_scan(dir.path(), "b.png", 150);

        let summary = completed(rename(dir.path(), RenameMode::Apply, shades).unwrap());
        assert_eq!((summary.ranked, summary.unplaced), (1, 1));
        assert_eq!(listing(dir.path()), vec!["1.jpg", "zb.png"]);
        assert_eq!(fs::read(dir.path().join("1.jpg")).unwrap(), first);
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_scan(dir.path(), "a.png", 30);
        write_scan(dir.path(), "b.png", 90);

        let summary = completed(rename(dir.path(), RenameMode::DryRun, shades).unwrap());
        assert!(!summary.applied);
        assert_eq!(listing(dir.path()), vec!["a.png", "b.png"]);
    }

    #[test]
    fn empty_dir_renames_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        // Never asked for an engine: the failing factory would surface as an error.
        let engine = || Err::<ShadeRecognizer, _>(OcrError::Engine("should not start".into()));
        let report = rename(dir.path(), RenameMode::Apply, engine).unwrap();
        assert_eq!(report, RenameReport::NoImages);
        assert_eq!(listing(dir.path()), vec!["notes.txt"]);
    }

    #[test]
    fn dry_run_without_engine_lists_candidates() {
        let dir = tempfile::tempdir().unwrap();
        write_scan(dir.path(), "b.png", 30);
        write_scan(dir.path(), "a.png", 90);

        let report = rename(dir.path(), RenameMode::DryRunJson, no_engine).unwrap();
        assert_eq!(
            report,
            RenameReport::EngineMissing { candidates: vec!["a.png".into(), "b.png".into()] }
        );
        assert_eq!(listing(dir.path()), vec!["a.png", "b.png"]);
    }

    #[test]
    fn apply_without_engine_fails_untouched() {
        let dir = tempfile::tempdir().unwrap();
        write_scan(dir.path(), "a.png", 30);

        let err = rename(dir.path(), RenameMode::Apply, no_engine).unwrap_err();
        assert!(matches!(err.downcast_ref::<OcrError>(), Some(OcrError::NotAvailable)));
        assert_eq!(listing(dir.path()), vec!["a.png"]);
    }

    #[test]
    fn assemble_numbered_images() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("trip-2024");
        fs::create_dir(&dir).unwrap();
        for name in ["1.jpg", "2.jpg", "3.jpg"] {
            write_scan(&dir, name, 120);
        }
        write_scan(&dir, "zleftover.png", 10);

        let report = assemble(&dir, None).unwrap().unwrap();
        assert_eq!(report.output, dir.join("trip-2024.pdf"));
        assert_eq!((report.pages, report.images), (2, 3));
        let doc = lopdf::Document::load(&report.output).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn assemble_honours_output_name() {
        let dir = tempfile::tempdir().unwrap();
        write_scan(dir.path(), "1.jpg", 120);
        let report = assemble(dir.path(), Some("bound.pdf")).unwrap().unwrap();
        assert_eq!(report.output, dir.path().join("bound.pdf"));
        assert!(report.output.exists());
    }

    #[test]
    fn assemble_without_numbered_images_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_scan(dir.path(), "scan.png", 120);
        assert!(assemble(dir.path(), None).unwrap().is_none());
        assert_eq!(listing(dir.path()), vec!["scan.png"]);
    }
}
