//! Per-job processing: download, extract, analyse, aggregate.

pub mod context;
pub mod error;
pub mod runner;

pub use context::{PipelineSettings, WorkerContext};
pub use error::PipelineError;
pub use runner::{JobOutcome, JobPipeline};
