//! Domain model (tasks, results, report shapes, progress events).
//!
//! これらの型は実行機構（スケジューラ、バックエンド）から独立しています。
//! 永続化される型（report）は wire format をそのまま表現します。

pub mod events;
pub mod ids;
pub mod outcome;
pub mod report;
pub mod result;
pub mod settings;
pub mod task;
pub mod worker;

pub use self::events::ProgressEvent;
pub use self::ids::RunId;
pub use self::outcome::Outcome;
pub use self::report::{EntryStatus, JobReport, ProcessingInfo, RunMode, Summary, WorkflowEntry};
pub use self::result::TaskResult;
pub use self::settings::RenderSettings;
pub use self::task::RenderTask;
pub use self::worker::{StatusBoard, WorkerPhase, WorkerSlot};
