//! A4 portrait, two images side by side per page. All lengths in millimetres,
//! origin at the top-left corner of the page.

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
/// Left and right page margin, also the gap between the two cells.
pub const MARGIN_MM: f32 = 10.0;
pub const TOP_MM: f32 = 20.0;
/// Automatic page-break margin at the bottom; placed images stay above it.
pub const BOTTOM_BREAK_MM: f32 = 15.0;

pub const CELL_WIDTH_MM: f32 = (PAGE_WIDTH_MM - 3.0 * MARGIN_MM) / 2.0;
pub const CELL_HEIGHT_MM: f32 = PAGE_HEIGHT_MM - 2.0 * TOP_MM;

pub const IMAGES_PER_PAGE: usize = 2;

pub const PT_PER_MM: f32 = 72.0 / 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Left,
    Right,
}

impl Slot {
    /// Odd ranks go left, even ranks right.
    pub fn for_rank(rank: usize) -> Self {
        if rank % 2 == 1 {
            Slot::Left
        } else {
            Slot::Right
        }
    }

    pub fn x_mm(self) -> f32 {
        match self {
            Slot::Left => MARGIN_MM,
            Slot::Right => MARGIN_MM + CELL_WIDTH_MM + MARGIN_MM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// 1-based page number.
    pub page: usize,
    pub slot: Slot,
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

impl Placement {
    /// `cm` operands in PDF points, bottom-left origin.
    pub fn pdf_matrix(&self) -> [f32; 6] {
        let w = self.width_mm * PT_PER_MM;
        let h = self.height_mm * PT_PER_MM;
        let x = self.x_mm * PT_PER_MM;
        let y = (PAGE_HEIGHT_MM - self.y_mm - self.height_mm) * PT_PER_MM;
        [w, 0.0, 0.0, h, x, y]
    }
}

/// Largest uniform scale (mm per pixel) that fits `width × height` pixels in one cell.
pub fn fit_scale(width: u32, height: u32) -> f32 {
    let by_width = CELL_WIDTH_MM / width as f32;
    let by_height = CELL_HEIGHT_MM / height as f32;
    by_width.min(by_height)
}

/// Where the image at 1-based `rank` goes.
pub fn place(rank: usize, width: u32, height: u32) -> Placement {
    let scale = fit_scale(width, height);
    let slot = Slot::for_rank(rank);
    Placement {
        page: rank.div_ceil(IMAGES_PER_PAGE),
        slot,
        x_mm: slot.x_mm(),
        y_mm: TOP_MM,
        width_mm: width as f32 * scale,
        height_mm: height as f32 * scale,
    }
}

pub fn page_count(images: usize) -> usize {
    images.div_ceil(IMAGES_PER_PAGE)
}
