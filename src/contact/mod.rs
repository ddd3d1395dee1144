pub mod flow;

pub use flow::{SubmitFlow, SubmitOutcome};
