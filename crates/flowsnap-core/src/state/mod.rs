//! Cross-run job state (the persisted report file).

mod store;

pub use self::store::{JobStateStore, PruneReport, JOB_FILE_NAME};
