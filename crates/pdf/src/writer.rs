use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageError, ImageFormat, ImageReader};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::layout::{self, Placement, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, PT_PER_MM};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Image {0} has no pixels")]
    EmptyImage(PathBuf),
    #[error("Failed to compress image data: {0}")]
    Compress(#[from] std::io::Error),
    #[error("Failed to encode page content: {0}")]
    Content(String),
    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    pub output: PathBuf,
    pub pages: usize,
    pub images: usize,
}

/// Builds an A4 document, two images per page, in the order images are added.
pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    /// Placed images of the page being filled: (resource name, xobject, placement).
    pending: Vec<(String, ObjectId, Placement)>,
    images: usize,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAssembler {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self { doc, pages_id, page_ids: Vec::new(), pending: Vec::new(), images: 0 }
    }

    /// Decode `path` and place it in the next free slot.
    pub fn add_image(&mut self, path: &Path) -> Result<Placement, PdfError> {
        let xobject = image_xobject(path)?;
        let (width, height) = (xobject.width, xobject.height);
        let xobject_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => xobject.color_space,
                "BitsPerComponent" => 8i64,
                "Filter" => xobject.filter,
            },
            xobject.data,
        ));

        self.images += 1;
        let placement = layout::place(self.images, width, height);
        tracing::debug!(
            "{} -> page {} {:?}, {:.1}×{:.1} mm",
            path.display(),
            placement.page,
            placement.slot,
            placement.width_mm,
            placement.height_mm
        );
        self.pending.push((format!("Im{}", self.images), xobject_id, placement));

        if self.pending.len() == layout::IMAGES_PER_PAGE {
            self.flush_page()?;
        }
        Ok(placement)
    }

    fn flush_page(&mut self) -> Result<(), PdfError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut operations = Vec::new();
        let mut xobjects = Dictionary::new();
        for (name, id, placement) in self.pending.drain(..) {
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                placement.pdf_matrix().iter().map(|v| Object::Real(*v)).collect(),
            ));
            operations.push(Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]));
            operations.push(Operation::new("Q", vec![]));
            xobjects.set(name, id);
        }

        let content = Content { operations }
            .encode()
            .map_err(|e| PdfError::Content(e.to_string()))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len() + usize::from(!self.pending.is_empty())
    }

    /// Finish the page tree and return the document.
    pub fn finish(mut self) -> Result<Document, PdfError> {
        self.flush_page()?;

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH_MM * PT_PER_MM),
                Object::Real(PAGE_HEIGHT_MM * PT_PER_MM),
            ],
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        Ok(self.doc)
    }
}

/// Encoded pixel data for one image XObject.
struct ImageXObject {
    width: u32,
    height: u32,
    color_space: &'static str,
    filter: &'static str,
    data: Vec<u8>,
}

/// Gray and RGB JPEGs are embedded byte for byte (`DCTDecode`).
/// Anything else, including a PNG carrying a `.jpg` name, is re-encoded as
/// zlib-compressed RGB.
fn image_xobject(path: &Path) -> Result<ImageXObject, PdfError> {
    let decode_err = |source| PdfError::Decode { path: path.to_path_buf(), source };
    let bytes = fs::read(path).map_err(|e| decode_err(ImageError::IoError(e)))?;

    let reader = ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .map_err(|e| decode_err(ImageError::IoError(e)))?;
    let format = reader.format();
    let decoder = reader.into_decoder().map_err(decode_err)?;
    let original = decoder.original_color_type();
    // Full decode, so a truncated file fails here rather than in the viewer.
    let img = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(PdfError::EmptyImage(path.to_path_buf()));
    }

    let passthrough = match (format, original) {
        (Some(ImageFormat::Jpeg), ExtendedColorType::L8) => Some("DeviceGray"),
        (Some(ImageFormat::Jpeg), ExtendedColorType::Rgb8) => Some("DeviceRGB"),
        _ => None,
    };
    if let Some(color_space) = passthrough {
        return Ok(ImageXObject { width, height, color_space, filter: "DCTDecode", data: bytes });
    }

    let rgb = img.to_rgb8();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(rgb.as_raw())?;
    Ok(ImageXObject {
        width,
        height,
        color_space: "DeviceRGB",
        filter: "FlateDecode",
        data: encoder.finish()?,
    })
}

/// Lay out `images` in order and save the document to `output`, replacing any
/// existing file. The first unreadable image aborts the run.
pub fn write_pdf<P: AsRef<Path>>(images: &[P], output: &Path) -> Result<AssemblyReport, PdfError> {
    let mut assembler = PdfAssembler::new();
    for path in images {
        assembler.add_image(path.as_ref())?;
    }
    let pages = assembler.page_count();
    let mut doc = assembler.finish()?;
    doc.save(output).map_err(|e| PdfError::Write {
        path: output.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::info!("Wrote {} ({pages} pages, {} images)", output.display(), images.len());
    Ok(AssemblyReport { output: output.to_path_buf(), pages, images: images.len() })
}
