pub mod config;
pub mod plan;
pub mod scan;

pub use config::{OcrSettings, PdfSettings, Settings, SettingsError};
pub use plan::{
    PlanError, RenamePlan, RenameStep, StepKind, TicketOutcome, UnplacedReason, ValidatedPlan,
    STAGING_DIR_NAME, UNPLACED_PREFIX,
};
pub use scan::{list_images, list_numbered_jpgs, ImageFile, NumberedImage, ScanError};
