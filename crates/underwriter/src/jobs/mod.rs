//! Job records, their store and the rules for changing them.

mod message;
mod model;
mod store;
mod submit;
mod updater;

pub use message::JobMessage;
pub use model::{
    ComprehensiveAnalysis, Job, JobFailure, JobStatus, PageResult, Progress, Risk,
};
pub use store::{JobStore, StoreError, VersionedJob};
pub use submit::{purge_stale_jobs, JobSubmitter, PurgeReport};
pub use updater::{JobUpdate, StateUpdater};
