/// Pixel rectangle of a recognized fragment, origin top-left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// One piece of recognized text, as returned by an OCR backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFragment {
    pub text: String,
    pub bbox: BoundingBox,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self { text: text.into(), bbox }
    }

    /// A fragment without a known position.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self::new(text, BoundingBox::default())
    }
}
