use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("workflow metadata did not decode: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("task `{task}` has an empty call list")]
    EmptyCallList { task: String },
}

/// Whether a task's shards carry nested workflow metadata. Decided once at
/// load time from the first shard so traversal dispatches on a tag instead of
/// probing for the key at every level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskShape {
    Leaf,
    SubWorkflow,
}

/// A workflow metadata tree as returned by the execution service, reduced to
/// the fields the client reads. The tree is owned by the server; nothing here
/// is written back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowMetadata {
    pub id: Option<String>,
    pub status: Option<String>,
    pub workflow_name: Option<String>,
    pub calls: BTreeMap<String, TaskCalls>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskCalls {
    pub shape: TaskShape,
    pub shards: Vec<CallShard>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallShard {
    pub execution_status: Option<String>,
    /// `-1` marks an unscattered call; missing on the wire means the same.
    pub shard_index: i64,
    pub sub_workflow: Option<Box<WorkflowMetadata>>,
    pub outputs: Option<Value>,
    pub backend_logs: Option<Value>,
}

impl WorkflowMetadata {
    pub fn from_value(value: Value) -> Result<Self, MetadataError> {
        let raw: RawWorkflow = serde_json::from_value(value).map_err(MetadataError::Decode)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawWorkflow) -> Result<Self, MetadataError> {
        let mut calls = BTreeMap::new();
        for (task, raw_shards) in raw.calls {
            if raw_shards.is_empty() {
                return Err(MetadataError::EmptyCallList { task });
            }
            let shape = if raw_shards[0].sub_workflow_metadata.is_some() {
                TaskShape::SubWorkflow
            } else {
                TaskShape::Leaf
            };
            let mut shards = Vec::with_capacity(raw_shards.len());
            for raw_shard in raw_shards {
                let sub_workflow = match raw_shard.sub_workflow_metadata {
                    Some(nested) => Some(Box::new(Self::from_raw(*nested)?)),
                    None => None,
                };
                shards.push(CallShard {
                    execution_status: raw_shard.execution_status,
                    shard_index: raw_shard.shard_index.unwrap_or(-1),
                    sub_workflow,
                    outputs: raw_shard.outputs,
                    backend_logs: raw_shard.backend_logs,
                });
            }
            calls.insert(task, TaskCalls { shape, shards });
        }
        Ok(Self {
            id: raw.id,
            status: raw.status,
            workflow_name: raw.workflow_name,
            calls,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWorkflow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    workflow_name: Option<String>,
    #[serde(default)]
    calls: BTreeMap<String, Vec<RawShard>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawShard {
    #[serde(default)]
    execution_status: Option<String>,
    #[serde(default)]
    shard_index: Option<i64>,
    #[serde(default)]
    sub_workflow_metadata: Option<Box<RawWorkflow>>,
    #[serde(default)]
    outputs: Option<Value>,
    #[serde(default)]
    backend_logs: Option<Value>,
}
