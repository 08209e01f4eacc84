pub mod model;
pub mod walker;

pub use model::{CallShard, MetadataError, TaskCalls, TaskShape, WorkflowMetadata};
pub use walker::{
    collect_outputs, detect_failure, summarize, tally, StatusTally, SummaryEntry, SummaryReport,
    TaskCategory,
};
