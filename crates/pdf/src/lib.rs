pub mod layout;
pub mod writer;

pub use layout::{fit_scale, page_count, place, Placement, Slot};
pub use writer::{write_pdf, AssemblyReport, PdfAssembler, PdfError};
