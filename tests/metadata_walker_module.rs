use cromrun::metadata::{
    collect_outputs, detect_failure, summarize, SummaryEntry, TaskCategory, WorkflowMetadata,
};
use serde_json::json;

fn tree(value: serde_json::Value) -> WorkflowMetadata {
    WorkflowMetadata::from_value(value).expect("decode metadata")
}

#[test]
fn scattered_task_reports_counts_and_sorted_failed_indices() {
    let node = tree(json!({
        "status": "Running",
        "calls": {
            "wf.scatter": [
                {"executionStatus": "Done", "shardIndex": 0},
                {"executionStatus": "Failed", "shardIndex": 3},
                {"executionStatus": "Done", "shardIndex": 2},
                {"executionStatus": "Failed", "shardIndex": 1}
            ]
        }
    }));

    let report = summarize(&node, false);
    assert_eq!(report.entries.len(), 1);
    let SummaryEntry::Task {
        tally,
        category,
        failed_shards,
        ..
    } = &report.entries[0]
    else {
        panic!("expected a task entry");
    };
    assert_eq!(tally.done, 2);
    assert_eq!(tally.failed, 2);
    assert_eq!(tally.summary_fragment(), "0 Running, 2 Done, 0 Preempted, 2 Failed");
    assert_eq!(*category, TaskCategory::Failed);
    assert_eq!(*failed_shards, vec![1, 3]);
}

#[test]
fn unscattered_failed_task_has_no_shard_index_list() {
    let node = tree(json!({
        "calls": {
            "wf.single": [{"executionStatus": "Failed", "shardIndex": -1}]
        }
    }));
    let report = summarize(&node, false);
    let SummaryEntry::Task { failed_shards, category, .. } = &report.entries[0] else {
        panic!("expected a task entry");
    };
    assert_eq!(*category, TaskCategory::Failed);
    assert!(failed_shards.is_empty());
}

#[test]
fn category_prefers_failing_over_running_and_failed() {
    let node = tree(json!({
        "calls": {
            "wf.mixed": [
                {"executionStatus": "Failed", "shardIndex": 0},
                {"executionStatus": "Running", "shardIndex": 1}
            ],
            "wf.ok": [{"executionStatus": "Done", "shardIndex": -1}],
            "wf.busy": [{"executionStatus": "Running", "shardIndex": -1}]
        }
    }));
    let categories: Vec<(String, TaskCategory)> = summarize(&node, false)
        .entries
        .iter()
        .map(|entry| match entry {
            SummaryEntry::Task { name, category, .. } => (name.clone(), *category),
            SummaryEntry::SubWorkflow { .. } => panic!("no sub-workflows here"),
        })
        .collect();
    assert!(categories.contains(&("wf.mixed".to_string(), TaskCategory::Failing)));
    assert!(categories.contains(&("wf.ok".to_string(), TaskCategory::Succeeded)));
    assert!(categories.contains(&("wf.busy".to_string(), TaskCategory::Running)));
}

#[test]
fn expansion_descends_into_sub_workflows_with_deeper_indent() {
    let node = tree(json!({
        "calls": {
            "wf.sub": [{
                "executionStatus": "Running",
                "shardIndex": -1,
                "subWorkflowMetadata": {
                    "calls": {
                        "inner.step": [{"executionStatus": "Done", "shardIndex": -1}]
                    }
                }
            }]
        }
    }));

    let expanded = summarize(&node, true);
    assert_eq!(expanded.entries.len(), 2);
    assert!(matches!(
        &expanded.entries[0],
        SummaryEntry::SubWorkflow { indent: 0, name } if name == "wf.sub"
    ));
    assert!(matches!(
        &expanded.entries[1],
        SummaryEntry::Task { indent: 1, name, .. } if name == "inner.step"
    ));

    // Without expansion the sub-workflow call is tallied as a leaf.
    let flat = summarize(&node, false);
    assert_eq!(flat.entries.len(), 1);
    assert!(matches!(
        &flat.entries[0],
        SummaryEntry::Task { indent: 0, name, tally, .. }
            if name == "wf.sub" && tally.running == 1
    ));
}

#[test]
fn failure_three_levels_down_is_detected() {
    let node = tree(json!({
        "status": "Running",
        "calls": {
            "wf.level1": [{
                "executionStatus": "Running",
                "subWorkflowMetadata": {
                    "calls": {
                        "mid.level2": [{
                            "executionStatus": "Running",
                            "subWorkflowMetadata": {
                                "calls": {
                                    "deep.level3": [
                                        {"executionStatus": "Done"},
                                        {"executionStatus": "Failed"}
                                    ]
                                }
                            }
                        }]
                    }
                }
            }],
            "wf.healthy": [{"executionStatus": "Done"}]
        }
    }));
    assert!(detect_failure(&node));

    let healthy = tree(json!({
        "status": "Running",
        "calls": {"wf.ok": [{"executionStatus": "Done"}]}
    }));
    assert!(!detect_failure(&healthy));

    let failed_status_only = tree(json!({"status": "Failed", "calls": {}}));
    assert!(detect_failure(&failed_status_only));
}

#[test]
fn unknown_statuses_are_counted_and_warned_once_per_walk() {
    let node = tree(json!({
        "calls": {
            "wf.a": [
                {"executionStatus": "Done", "shardIndex": 0},
                {"executionStatus": "WeirdState", "shardIndex": 1}
            ],
            "wf.b": [{"executionStatus": "WeirdState", "shardIndex": -1}]
        }
    }));

    let report = summarize(&node, false);
    assert_eq!(report.unknown_statuses, vec!["WeirdState".to_string()]);

    let SummaryEntry::Task { name, tally, .. } = &report.entries[0] else {
        panic!("expected a task entry");
    };
    assert_eq!(name, "wf.a");
    assert_eq!(tally.unknown, 1);
    assert_eq!(tally.unknown_names, vec!["WeirdState".to_string()]);

    let warning = report.unknown_status_warning().expect("one warning");
    assert!(warning.contains("WeirdState"));
    assert!(warning.contains("RetryableFailure"));
    assert_eq!(warning.matches("WeirdState").count(), 1);
}

#[test]
fn outputs_collection_recurses_through_sub_workflows() {
    let node = tree(json!({
        "calls": {
            "wf.leaf": [
                {"executionStatus": "Done", "shardIndex": 0, "outputs": {"out": "a"}},
                {"executionStatus": "Done", "shardIndex": 1}
            ],
            "wf.sub": [{
                "executionStatus": "Done",
                "subWorkflowMetadata": {
                    "calls": {
                        "inner.step": [{"executionStatus": "Done", "outputs": {"x": 1}}]
                    }
                }
            }]
        }
    }));

    let collected = collect_outputs(&node);
    assert_eq!(collected["wf.leaf"][0], json!({"out": "a"}));
    assert_eq!(collected["wf.leaf"][1], json!(null));
    assert_eq!(
        collected["wf.sub"][0],
        json!({"inner.step": [{"x": 1}]})
    );
}
