pub mod submission;

pub use submission::{SubmissionInput, SubmissionRecord, SubmissionStats, SubmissionStatus};
