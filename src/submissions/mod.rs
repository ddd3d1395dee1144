pub mod export;
pub mod store;

pub use export::{CsvExport, ExportArtifact};
pub use store::{
    ClearOutcome, ConfirmGate, LoadOutcome, SubmissionFilter, SubmissionStore, STORAGE_KEY,
};
