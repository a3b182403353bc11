use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions (lowercase) accepted as renamer input.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A candidate image for the renamer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
    pub file_name: String,
}

/// A file already named `<digits>.jpg`, ready for PDF assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedImage {
    pub path: PathBuf,
    pub file_name: String,
    pub number: u64,
}

/// List the image files (`.jpg`, `.jpeg`, `.png`, any case) directly inside `dir`,
/// sorted by file name.
pub fn list_images(dir: &Path) -> Result<Vec<ImageFile>, ScanError> {
    let mut images: Vec<ImageFile> = regular_files(dir)?
        .into_iter()
        .filter(|(_, name)| has_image_extension(name))
        .map(|(path, file_name)| ImageFile { path, file_name })
        .collect();
    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(images)
}

/// List the `<digits>.jpg` files directly inside `dir`, sorted by numeric value.
/// Equal values (`1.jpg` and `01.jpg`) fall back to name order.
pub fn list_numbered_jpgs(dir: &Path) -> Result<Vec<NumberedImage>, ScanError> {
    let mut images: Vec<NumberedImage> = regular_files(dir)?
        .into_iter()
        .filter_map(|(path, file_name)| {
            let number = numbered_jpg_stem(&file_name)?;
            Some(NumberedImage { path, file_name, number })
        })
        .collect();
    images.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.file_name.cmp(&b.file_name)));
    Ok(images)
}

pub fn has_image_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Parse `"12.jpg"` to `12`. The extension must be exactly `.jpg` and the stem
/// all ASCII digits.
pub fn numbered_jpg_stem(file_name: &str) -> Option<u64> {
    let stem = file_name.strip_suffix(".jpg")?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

fn regular_files(dir: &Path) -> Result<Vec<(PathBuf, String)>, ScanError> {
    let read_err = |source| ScanError::ReadDir { path: dir.to_path_buf(), source };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => files.push((path, name)),
            Err(raw) => tracing::warn!("Skipping file with a non UTF-8 name: {raw:?}"),
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn image_extension_is_case_insensitive() {
        assert!(has_image_extension("a.jpg"));
        assert!(has_image_extension("a.JPEG"));
        assert!(has_image_extension("scan.Png"));
        assert!(!has_image_extension("notes.txt"));
        assert!(!has_image_extension("jpg"));
    }

    #[test]
    fn numbered_stem_requires_digits_and_lowercase_jpg() {
        assert_eq!(numbered_jpg_stem("12.jpg"), Some(12));
        assert_eq!(numbered_jpg_stem("007.jpg"), Some(7));
        assert_eq!(numbered_jpg_stem("12.JPG"), None);
        assert_eq!(numbered_jpg_stem("12.png"), None);
        assert_eq!(numbered_jpg_stem("z12.jpg"), None);
        assert_eq!(numbered_jpg_stem("1a.jpg"), None);
        assert_eq!(numbered_jpg_stem(".jpg"), None);
        assert_eq!(numbered_jpg_stem("-1.jpg"), None);
    }

    #[test]
    fn list_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "c.jpeg", "readme.md", "d.gif"] {
            touch(dir.path(), name);
        }
        fs::create_dir(dir.path().join("nested.jpg")).unwrap();

        let names: Vec<_> = list_images(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.file_name)
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "c.jpeg"]);
    }

    #[test]
    fn list_images_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_images(dir.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.jpg");
        // Some filesystems refuse invalid UTF-8 outright; nothing to check there.
        if fs::write(dir.path().join(OsStr::from_bytes(b"scan\xff.jpg")), b"x").is_err() {
            return;
        }
        let names: Vec<_> = list_images(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.file_name)
            .collect();
        assert_eq!(names, vec!["a.jpg"]);
    }

    #[test]
    fn list_images_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_images(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, ScanError::ReadDir { .. }));
    }

    #[test]
    fn numbered_jpgs_sort_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["10.jpg", "2.jpg", "1.jpg", "z3.jpg", "4.png", "3.JPG"] {
            touch(dir.path(), name);
        }
        let found: Vec<_> = list_numbered_jpgs(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| (f.number, f.file_name))
            .collect();
        assert_eq!(
            found,
            vec![
                (1, "1.jpg".to_string()),
                (2, "2.jpg".to_string()),
                (10, "10.jpg".to_string()),
            ]
        );
    }
}
