pub mod extract;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use extract::{first_ticket_number, ticket_number};
pub use pipeline::{Extraction, ReadError, TicketReader};
pub use preprocess::{preprocess, preprocess_image, PreprocessError};
pub use recognizer::{system_backend, MockRecognizer, OcrBackend, OcrError};
pub use types::{BoundingBox, TextFragment};
