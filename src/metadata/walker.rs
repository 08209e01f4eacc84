use crate::metadata::model::{CallShard, TaskShape, WorkflowMetadata};
use serde_json::Value;
use std::collections::BTreeMap;

pub const KNOWN_SHARD_STATUSES: [&str; 4] = ["Done", "Running", "Failed", "RetryableFailure"];

const STATUS_FAILED: &str = "Failed";
const STATUS_RUNNING: &str = "Running";

/// Per-task shard counts. Unknown statuses are counted but tracked apart so
/// the caller can warn once per walk instead of once per shard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub done: usize,
    pub running: usize,
    pub failed: usize,
    pub retryable_failure: usize,
    pub unknown: usize,
    pub unknown_names: Vec<String>,
}

impl StatusTally {
    /// Fixed presentation order; `RetryableFailure` shards surface to users
    /// as preemptions.
    pub fn summary_fragment(&self) -> String {
        format!(
            "{} Running, {} Done, {} Preempted, {} Failed",
            self.running, self.done, self.retryable_failure, self.failed
        )
    }
}

pub fn tally(shards: &[CallShard]) -> StatusTally {
    let mut tally = StatusTally::default();
    for shard in shards {
        match shard.execution_status.as_deref().unwrap_or("") {
            "Done" => tally.done += 1,
            STATUS_RUNNING => tally.running += 1,
            STATUS_FAILED => tally.failed += 1,
            "RetryableFailure" => tally.retryable_failure += 1,
            other => {
                tally.unknown += 1;
                if !tally.unknown_names.iter().any(|name| name == other) {
                    tally.unknown_names.push(other.to_string());
                }
            }
        }
    }
    tally
}

/// Presentation category for a task, checked in precedence order: a task with
/// no failures and nothing running has succeeded; failures alongside running
/// shards mean the task is failing but still has in-flight work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCategory {
    Succeeded,
    Failing,
    Running,
    Failed,
}

impl TaskCategory {
    pub fn from_tally(tally: &StatusTally) -> Self {
        if tally.failed == 0 && tally.running == 0 {
            TaskCategory::Succeeded
        } else if tally.failed > 0 && tally.running > 0 {
            TaskCategory::Failing
        } else if tally.running > 0 {
            TaskCategory::Running
        } else {
            TaskCategory::Failed
        }
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskCategory::Succeeded => write!(f, "succeeded"),
            TaskCategory::Failing => write!(f, "failing"),
            TaskCategory::Running => write!(f, "running"),
            TaskCategory::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryEntry {
    SubWorkflow {
        indent: usize,
        name: String,
    },
    Task {
        indent: usize,
        name: String,
        tally: StatusTally,
        category: TaskCategory,
        /// Sorted failed shard indices; populated only when the task is
        /// scattered and has failures.
        failed_shards: Vec<i64>,
    },
}

/// Result of one full tree walk. `unknown_statuses` holds the distinct
/// unrecognized status names seen anywhere in the tree; the caller drains the
/// warning after presenting the entries so it never interleaves with them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryReport {
    pub entries: Vec<SummaryEntry>,
    pub unknown_statuses: Vec<String>,
}

impl SummaryReport {
    pub fn unknown_status_warning(&self) -> Option<String> {
        if self.unknown_statuses.is_empty() {
            return None;
        }
        Some(format!(
            "unrecognized task status(es) {}; known statuses are {}",
            self.unknown_statuses
                .iter()
                .map(|name| format!("`{name}`"))
                .collect::<Vec<_>>()
                .join(", "),
            KNOWN_SHARD_STATUSES.join(", "),
        ))
    }
}

pub fn summarize(node: &WorkflowMetadata, expand_subworkflows: bool) -> SummaryReport {
    let mut report = SummaryReport::default();
    walk(node, 0, expand_subworkflows, &mut report);
    report
}

fn walk(node: &WorkflowMetadata, indent: usize, expand: bool, report: &mut SummaryReport) {
    for (name, task) in &node.calls {
        if task.shape == TaskShape::SubWorkflow && expand {
            report.entries.push(SummaryEntry::SubWorkflow {
                indent,
                name: name.clone(),
            });
            for shard in &task.shards {
                if let Some(sub) = &shard.sub_workflow {
                    walk(sub, indent + 1, expand, report);
                }
            }
            continue;
        }

        let tally = tally(&task.shards);
        for unknown in &tally.unknown_names {
            if !report.unknown_statuses.iter().any(|name| name == unknown) {
                report.unknown_statuses.push(unknown.clone());
            }
        }
        let failed_shards = if tally.failed > 0 && is_scattered(&task.shards) {
            failed_shard_indices(&task.shards)
        } else {
            Vec::new()
        };
        let category = TaskCategory::from_tally(&tally);
        report.entries.push(SummaryEntry::Task {
            indent,
            name: name.clone(),
            tally,
            category,
            failed_shards,
        });
    }
}

fn is_scattered(shards: &[CallShard]) -> bool {
    shards.len() > 1 || shards.first().is_some_and(|shard| shard.shard_index != -1)
}

fn failed_shard_indices(shards: &[CallShard]) -> Vec<i64> {
    let mut indices: Vec<i64> = shards
        .iter()
        .filter(|shard| shard.execution_status.as_deref() == Some(STATUS_FAILED))
        .map(|shard| shard.shard_index)
        .collect();
    indices.sort_unstable();
    indices
}

/// Depth-first search for any failure in the tree: a `Failed` workflow status
/// at any level, or a `Failed` shard at any depth. Status fields may be absent
/// at intermediate levels, so every branch is examined.
pub fn detect_failure(node: &WorkflowMetadata) -> bool {
    if node.status.as_deref() == Some(STATUS_FAILED) {
        return true;
    }
    node.calls.values().any(|task| {
        task.shards.iter().any(|shard| {
            if shard.execution_status.as_deref() == Some(STATUS_FAILED) {
                return true;
            }
            shard
                .sub_workflow
                .as_deref()
                .is_some_and(detect_failure)
        })
    })
}

/// Gathers per-shard `outputs` for every task, recursing into sub-workflows:
/// a sub-workflow shard contributes the collected outputs of its nested tree
/// instead of its own `outputs` field.
pub fn collect_outputs(node: &WorkflowMetadata) -> BTreeMap<String, Vec<Value>> {
    let mut collected = BTreeMap::new();
    for (name, task) in &node.calls {
        let values = task
            .shards
            .iter()
            .map(|shard| match (task.shape, &shard.sub_workflow) {
                (TaskShape::SubWorkflow, Some(sub)) => Value::Object(
                    collect_outputs(sub)
                        .into_iter()
                        .map(|(task_name, outputs)| (task_name, Value::Array(outputs)))
                        .collect(),
                ),
                _ => shard.outputs.clone().unwrap_or(Value::Null),
            })
            .collect();
        collected.insert(name.clone(), values);
    }
    collected
}
