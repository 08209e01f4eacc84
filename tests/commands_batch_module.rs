use cromrun::commands::dispatch;
use cromrun::config::Config;
use cromrun::ledger::{LedgerStore, Status, SubmissionRecord};
use cromrun::metadata::WorkflowMetadata;
use cromrun::remote::{MetadataProvider, RemoteError, SubmissionClient, SubmissionResult};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const ID_1: &str = "11111111-1111-1111-1111-111111111111";
const ID_2: &str = "22222222-2222-2222-2222-222222222222";

#[derive(Default)]
struct FakeRemote {
    statuses: BTreeMap<String, String>,
    metadata: BTreeMap<String, serde_json::Value>,
    submit_result: Option<SubmissionResult>,
}

impl MetadataProvider for FakeRemote {
    fn fetch_metadata(
        &self,
        run_id: &str,
        _expand_subworkflows: bool,
    ) -> Result<WorkflowMetadata, RemoteError> {
        let value = self.metadata.get(run_id).cloned().ok_or_else(|| {
            RemoteError::Rejected {
                code: 404,
                body: format!("no metadata for {run_id}"),
            }
        })?;
        Ok(WorkflowMetadata::from_value(value)?)
    }

    fn fetch_status(&self, run_id: &str) -> Result<String, RemoteError> {
        self.statuses
            .get(run_id)
            .cloned()
            .ok_or_else(|| RemoteError::Unavailable(format!("no status for {run_id}")))
    }
}

impl SubmissionClient for FakeRemote {
    fn submit(
        &self,
        _definition: &Path,
        _inputs: Option<&Path>,
    ) -> Result<SubmissionResult, RemoteError> {
        self.submit_result
            .clone()
            .ok_or_else(|| RemoteError::Unavailable("submit disabled".to_string()))
    }

    fn abort(&self, run_id: &str) -> Result<SubmissionResult, RemoteError> {
        Ok(SubmissionResult {
            id: run_id.to_string(),
            status: "Aborting".to_string(),
        })
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|arg| arg.to_string()).collect()
}

fn seed_row(store: &LedgerStore, run_id: &str, status: Status, alias: &str) {
    store
        .append(SubmissionRecord {
            date_time: "20230101_120000".to_string(),
            server_url: "http://host:8000".to_string(),
            run_id: run_id.to_string(),
            source_name: "my.wdl".to_string(),
            status,
            alias: alias.to_string(),
        })
        .expect("seed row");
}

#[test]
fn submit_records_the_new_workflow_in_the_ledger() {
    let temp = tempdir().expect("tempdir");
    let config = Config::new("http://host:8000", temp.path());
    let wdl = temp.path().join("hello.wdl");
    fs::write(&wdl, "workflow hello {}").expect("write wdl");

    let remote = FakeRemote {
        submit_result: Some(SubmissionResult {
            id: ID_1.to_string(),
            status: "Submitted".to_string(),
        }),
        ..FakeRemote::default()
    };

    let output = dispatch(
        args(&["submit", wdl.to_str().expect("utf8 path")]),
        &config,
        &remote,
        &remote,
    )
    .expect("submit");
    assert_eq!(output, format!("{ID_1}\tSubmitted"));

    let rows = LedgerStore::new(config.ledger_path())
        .read_all()
        .expect("read ledger");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].run_id, ID_1);
    assert_eq!(rows[0].source_name, "hello.wdl");
    assert_eq!(rows[0].status, Status::Submitted);
    assert_eq!(rows[0].alias, "");
}

#[test]
fn status_dooms_a_running_workflow_with_a_failed_task() {
    let temp = tempdir().expect("tempdir");
    let config = Config::new("http://host:8000", temp.path());
    let store = LedgerStore::new(config.ledger_path());
    seed_row(&store, ID_1, Status::Running, "");

    let remote = FakeRemote {
        statuses: BTreeMap::from_iter([(ID_1.to_string(), "Running".to_string())]),
        metadata: BTreeMap::from_iter([(
            ID_1.to_string(),
            json!({
                "status": "Running",
                "calls": {
                    "wf.bad": [
                        {"executionStatus": "Failed", "shardIndex": 0},
                        {"executionStatus": "Running", "shardIndex": 1}
                    ]
                }
            }),
        )]),
        ..FakeRemote::default()
    };

    let output = dispatch(args(&["status", "1"]), &config, &remote, &remote).expect("status");
    assert_eq!(output, format!("{ID_1}\tDOOMED"));
    assert_eq!(store.read_all().expect("read")[0].status, Status::Doomed);
}

#[test]
fn batch_status_isolates_failures_per_item() {
    let temp = tempdir().expect("tempdir");
    let config = Config::new("http://host:8000", temp.path());
    let store = LedgerStore::new(config.ledger_path());
    seed_row(&store, ID_1, Status::Running, "good");

    let remote = FakeRemote {
        statuses: BTreeMap::from_iter([(ID_1.to_string(), "Succeeded".to_string())]),
        ..FakeRemote::default()
    };

    let err = dispatch(
        args(&["status", "good", "no-such-alias"]),
        &config,
        &remote,
        &remote,
    )
    .expect_err("one item failed");

    // The good item was still processed and recorded.
    assert!(err.contains(&format!("{ID_1}\tSucceeded")));
    assert!(err.contains("no-such-alias"));
    assert_eq!(store.read_all().expect("read")[0].status, Status::Succeeded);
}

#[test]
fn list_update_refreshes_only_non_terminal_rows() {
    let temp = tempdir().expect("tempdir");
    let config = Config::new("http://host:8000", temp.path());
    let store = LedgerStore::new(config.ledger_path());
    seed_row(&store, ID_1, Status::Succeeded, "");
    seed_row(&store, ID_2, Status::Running, "active");

    // Only ID_2 has a status on the fake; fetching ID_1 would warn.
    let remote = FakeRemote {
        statuses: BTreeMap::from_iter([(ID_2.to_string(), "Failed".to_string())]),
        ..FakeRemote::default()
    };

    let output = dispatch(args(&["list", "--update"]), &config, &remote, &remote).expect("list");
    assert!(!output.contains("WARNING"));
    assert!(output.contains("active"));

    let rows = store.read_all().expect("read");
    assert_eq!(rows[0].status, Status::Succeeded);
    assert_eq!(rows[1].status, Status::Failed);
}

#[test]
fn counts_renders_the_tree_and_defers_unknown_status_warnings() {
    let temp = tempdir().expect("tempdir");
    let config = Config::new("http://host:8000", temp.path());
    let store = LedgerStore::new(config.ledger_path());
    seed_row(&store, ID_1, Status::Running, "");

    let remote = FakeRemote {
        metadata: BTreeMap::from_iter([(
            ID_1.to_string(),
            json!({
                "status": "Running",
                "calls": {
                    "wf.step": [
                        {"executionStatus": "Done", "shardIndex": 0},
                        {"executionStatus": "WeirdState", "shardIndex": 1}
                    ]
                }
            }),
        )]),
        ..FakeRemote::default()
    };

    let output = dispatch(args(&["counts", "-1"]), &config, &remote, &remote).expect("counts");
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], format!("{ID_1}\tRunning"));
    assert!(lines[1].starts_with("wf.step\t0 Running, 1 Done, 0 Preempted, 0 Failed"));
    assert!(lines.last().expect("warning line").contains("WeirdState"));
}

#[test]
fn alias_and_abort_commands_round_trip_through_the_ledger() {
    let temp = tempdir().expect("tempdir");
    let config = Config::new("http://host:8000", temp.path());
    let store = LedgerStore::new(config.ledger_path());
    seed_row(&store, ID_1, Status::Running, "");

    let remote = FakeRemote::default();
    dispatch(args(&["alias", "1", "night-run"]), &config, &remote, &remote).expect("alias");
    assert_eq!(store.read_all().expect("read")[0].alias, "night-run");

    let output =
        dispatch(args(&["abort", "night-run"]), &config, &remote, &remote).expect("abort");
    assert_eq!(output, format!("{ID_1}\tAborting"));
    assert_eq!(store.read_all().expect("read")[0].status, Status::Aborting);
}

#[test]
fn outputs_collects_per_task_shard_outputs_as_json() {
    let temp = tempdir().expect("tempdir");
    let config = Config::new("http://host:8000", temp.path());

    let remote = FakeRemote {
        metadata: BTreeMap::from_iter([(
            ID_1.to_string(),
            json!({
                "status": "Succeeded",
                "calls": {
                    "wf.step": [{"executionStatus": "Done", "outputs": {"out": "value"}}]
                }
            }),
        )]),
        ..FakeRemote::default()
    };

    let output = dispatch(args(&["outputs", ID_1]), &config, &remote, &remote).expect("outputs");
    let parsed: serde_json::Value = serde_json::from_str(&output).expect("json output");
    assert_eq!(parsed["wf.step"][0]["out"], "value");
}

#[test]
fn unknown_commands_fail_with_usage_help() {
    let temp = tempdir().expect("tempdir");
    let config = Config::new("http://host:8000", temp.path());
    let remote = FakeRemote::default();

    let err = dispatch(args(&["frobnicate"]), &config, &remote, &remote).expect_err("unknown verb");
    assert!(err.contains("unknown command"));
    assert!(err.contains("usage: cromrun"));
}
