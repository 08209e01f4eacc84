use crate::alias::set_alias;
use crate::config::Config;
use crate::ledger::migrate::migrate_if_needed;
use crate::ledger::record::{Status, SubmissionRecord};
use crate::ledger::store::LedgerStore;
use crate::metadata::model::WorkflowMetadata;
use crate::metadata::walker::{collect_outputs, detect_failure, summarize, SummaryEntry};
use crate::remote::{HttpCromwellClient, MetadataProvider, SubmissionClient};
use crate::resolver::resolve;
use crate::shared::logging::append_command_log_line;
use chrono::Local;
use serde_json::Value;
use std::path::Path;

const DATE_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Outcome for one workflow reference inside a batch command. Batch commands
/// never abort on a single bad item; the full outcome list is reduced to the
/// process result at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub token: String,
    pub result: Result<String, String>,
}

pub fn run_cli(args: Vec<String>, config: &Config) -> Result<String, String> {
    let client = HttpCromwellClient::new(config);
    dispatch(args, config, &client, &client)
}

pub fn dispatch(
    args: Vec<String>,
    config: &Config,
    provider: &dyn MetadataProvider,
    submitter: &dyn SubmissionClient,
) -> Result<String, String> {
    let mut args = args.into_iter();
    let verb = args.next().unwrap_or_else(|| "help".to_string());
    let rest: Vec<String> = args.collect();
    match verb.as_str() {
        "submit" => cmd_submit(config, &rest, submitter),
        "status" => cmd_status(config, &rest, provider),
        "list" => cmd_list(config, &rest, provider),
        "counts" => cmd_counts(config, &rest, provider),
        "alias" => cmd_alias(config, &rest),
        "abort" => cmd_abort(config, &rest, submitter),
        "outputs" => cmd_outputs(config, &rest, provider),
        "help" | "--help" | "-h" => Ok(help_lines().join("\n")),
        other => Err(format!(
            "unknown command `{other}`\n{}",
            help_lines().join("\n")
        )),
    }
}

pub fn help_lines() -> Vec<String> {
    [
        "usage: cromrun <command> [args]",
        "  submit <workflow.wdl> [inputs.json]   submit a workflow and record it",
        "  status <ref>...                       fetch and record workflow status",
        "  list [--update|-u]                    print the ledger, optionally refreshing statuses",
        "  counts <ref>... [--expand|-x]         per-task status summary, optionally expanding sub-workflows",
        "  alias <ref> <alias>                   set (or clear, with '') a workflow alias",
        "  abort <ref>...                        request abort for each workflow",
        "  outputs <ref>...                      print collected task outputs as json",
        "a <ref> is a run id, a signed relative ledger index (1 is oldest, -1 newest), or an alias",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn open_store(config: &Config) -> Result<LedgerStore, String> {
    migrate_if_needed(config.ledger_path()).map_err(|err| err.to_string())?;
    Ok(LedgerStore::new(config.ledger_path()))
}

fn reduce(outcomes: Vec<ItemOutcome>) -> Result<String, String> {
    let mut lines = Vec::new();
    let mut any_failed = false;
    for outcome in outcomes {
        match outcome.result {
            Ok(text) => lines.push(text),
            Err(err) => {
                any_failed = true;
                lines.push(format!("{}: {err}", outcome.token));
            }
        }
    }
    let body = lines.join("\n");
    if any_failed {
        Err(body)
    } else {
        Ok(body)
    }
}

fn cmd_submit(
    config: &Config,
    args: &[String],
    submitter: &dyn SubmissionClient,
) -> Result<String, String> {
    let (definition, inputs) = match args {
        [definition] => (Path::new(definition), None),
        [definition, inputs] => (Path::new(definition), Some(Path::new(inputs.as_str()))),
        _ => return Err("usage: cromrun submit <workflow.wdl> [inputs.json]".to_string()),
    };
    if !definition.is_file() {
        return Err(format!(
            "workflow file `{}` does not exist",
            definition.display()
        ));
    }
    let store = open_store(config)?;
    let result = submitter
        .submit(definition, inputs)
        .map_err(|err| err.to_string())?;
    let status = Status::parse(&result.status).unwrap_or(Status::Submitted);
    let record = SubmissionRecord {
        date_time: Local::now().format(DATE_TIME_FORMAT).to_string(),
        server_url: config.server_url().to_string(),
        run_id: result.id.clone(),
        source_name: definition
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string(),
        status,
        alias: String::new(),
    };
    store.append(record).map_err(|err| err.to_string())?;
    append_command_log_line(
        config.state_root(),
        &format!(
            "ts={} submit run_id={} source={}",
            Local::now().format(DATE_TIME_FORMAT),
            result.id,
            definition.display()
        ),
    )
    .map_err(|err| err.to_string())?;
    Ok(format!("{}\t{status}", result.id))
}

fn cmd_status(
    config: &Config,
    refs: &[String],
    provider: &dyn MetadataProvider,
) -> Result<String, String> {
    if refs.is_empty() {
        return Err("usage: cromrun status <ref>...".to_string());
    }
    let store = open_store(config)?;
    let mut outcomes = Vec::new();
    for token in refs {
        let result = status_for_reference(token, &store, provider);
        outcomes.push(ItemOutcome {
            token: token.clone(),
            result,
        });
    }
    reduce(outcomes)
}

fn status_for_reference(
    token: &str,
    store: &LedgerStore,
    provider: &dyn MetadataProvider,
) -> Result<String, String> {
    let records = store.read_all().map_err(|err| err.to_string())?;
    let run_id = resolve(token, &records).map_err(|err| err.to_string())?;
    let raw_status = provider
        .fetch_status(&run_id)
        .map_err(|err| err.to_string())?;
    let mut status = Status::parse(&raw_status)?;
    if status == Status::Running {
        let tree = provider
            .fetch_metadata(&run_id, true)
            .map_err(|err| err.to_string())?;
        if detect_failure(&tree) {
            status = Status::Doomed;
        }
    }
    if records.iter().any(|row| row.run_id == run_id) {
        store
            .update_status(&run_id, status)
            .map_err(|err| err.to_string())?;
    }
    Ok(format!("{run_id}\t{status}"))
}

fn cmd_list(
    config: &Config,
    args: &[String],
    provider: &dyn MetadataProvider,
) -> Result<String, String> {
    let update = match args {
        [] => false,
        [flag] if flag == "--update" || flag == "-u" => true,
        _ => return Err("usage: cromrun list [--update|-u]".to_string()),
    };
    let store = open_store(config)?;
    let mut warnings = Vec::new();
    if update {
        for row in store.read_all().map_err(|err| err.to_string())? {
            if row.status.is_terminal() {
                continue;
            }
            match provider.fetch_status(&row.run_id) {
                Ok(raw_status) => {
                    if let Ok(status) = Status::parse(&raw_status) {
                        store
                            .update_status(&row.run_id, status)
                            .map_err(|err| err.to_string())?;
                    } else {
                        warnings.push(format!(
                            "WARNING: server reported unknown status `{raw_status}` for {}",
                            row.run_id
                        ));
                    }
                }
                Err(err) => warnings.push(format!(
                    "WARNING: status refresh failed for {}: {err}",
                    row.run_id
                )),
            }
        }
    }
    let records = store.read_all().map_err(|err| err.to_string())?;
    let mut lines = vec![crate::ledger::LEDGER_COLUMNS.join("\t")];
    lines.extend(records.iter().map(SubmissionRecord::to_line));
    lines.extend(warnings);
    Ok(lines.join("\n"))
}

fn cmd_counts(
    config: &Config,
    args: &[String],
    provider: &dyn MetadataProvider,
) -> Result<String, String> {
    let mut expand = false;
    let mut refs = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--expand" | "-x" => expand = true,
            _ => refs.push(arg.clone()),
        }
    }
    if refs.is_empty() {
        return Err("usage: cromrun counts <ref>... [--expand|-x]".to_string());
    }
    let store = open_store(config)?;
    let mut outcomes = Vec::new();
    for token in &refs {
        let result = counts_for_reference(token, expand, &store, provider);
        outcomes.push(ItemOutcome {
            token: token.clone(),
            result,
        });
    }
    reduce(outcomes)
}

fn counts_for_reference(
    token: &str,
    expand: bool,
    store: &LedgerStore,
    provider: &dyn MetadataProvider,
) -> Result<String, String> {
    let records = store.read_all().map_err(|err| err.to_string())?;
    let run_id = resolve(token, &records).map_err(|err| err.to_string())?;
    let tree = provider
        .fetch_metadata(&run_id, expand)
        .map_err(|err| err.to_string())?;
    refresh_from_metadata(&run_id, &tree, store)?;

    let report = summarize(&tree, expand);
    let mut lines = vec![format!(
        "{run_id}\t{}",
        tree.status.as_deref().unwrap_or("Unknown")
    )];
    for entry in &report.entries {
        match entry {
            SummaryEntry::SubWorkflow { indent, name } => {
                lines.push(format!("{}SubWorkflow {name}", "  ".repeat(*indent)));
            }
            SummaryEntry::Task {
                indent,
                name,
                tally,
                category,
                failed_shards,
            } => {
                let pad = "  ".repeat(*indent);
                lines.push(format!(
                    "{pad}{name}\t{}\t[{category}]",
                    tally.summary_fragment()
                ));
                if !failed_shards.is_empty() {
                    let rendered: Vec<String> =
                        failed_shards.iter().map(|index| index.to_string()).collect();
                    lines.push(format!("{pad}Failed shards: [{}]", rendered.join(", ")));
                }
            }
        }
    }
    if let Some(warning) = report.unknown_status_warning() {
        lines.push(format!("WARNING: {warning}"));
    }
    Ok(lines.join("\n"))
}

/// Ledger refresh shared by metadata-bearing commands: record the tree's own
/// status, downgraded to DOOMED when a reportedly running workflow already
/// contains a failed task. Rows absent from the ledger (raw run-id queries)
/// are left alone.
fn refresh_from_metadata(
    run_id: &str,
    tree: &WorkflowMetadata,
    store: &LedgerStore,
) -> Result<(), String> {
    let Some(raw_status) = tree.status.as_deref() else {
        return Ok(());
    };
    let Ok(mut status) = Status::parse(raw_status) else {
        return Ok(());
    };
    if status == Status::Running && detect_failure(tree) {
        status = Status::Doomed;
    }
    let known = store
        .find(run_id)
        .map_err(|err| err.to_string())?
        .is_some();
    if known {
        store
            .update_status(run_id, status)
            .map_err(|err| err.to_string())?;
    }
    Ok(())
}

fn cmd_alias(config: &Config, args: &[String]) -> Result<String, String> {
    let [token, new_alias] = args else {
        return Err("usage: cromrun alias <ref> <alias>".to_string());
    };
    let store = open_store(config)?;
    let records = store.read_all().map_err(|err| err.to_string())?;
    let run_id = resolve(token, &records).map_err(|err| err.to_string())?;
    let warning = set_alias(&run_id, new_alias, &store).map_err(|err| err.to_string())?;
    let mut lines = Vec::new();
    if let Some(warning) = warning {
        lines.push(format!("WARNING: {warning}"));
    }
    if new_alias.is_empty() {
        lines.push(format!("cleared alias of workflow {run_id}"));
    } else {
        lines.push(format!("workflow {run_id} is now aliased as `{new_alias}`"));
    }
    Ok(lines.join("\n"))
}

fn cmd_abort(
    config: &Config,
    refs: &[String],
    submitter: &dyn SubmissionClient,
) -> Result<String, String> {
    if refs.is_empty() {
        return Err("usage: cromrun abort <ref>...".to_string());
    }
    let store = open_store(config)?;
    let mut outcomes = Vec::new();
    for token in refs {
        let result = abort_reference(token, &store, submitter);
        outcomes.push(ItemOutcome {
            token: token.clone(),
            result,
        });
    }
    reduce(outcomes)
}

fn abort_reference(
    token: &str,
    store: &LedgerStore,
    submitter: &dyn SubmissionClient,
) -> Result<String, String> {
    let records = store.read_all().map_err(|err| err.to_string())?;
    let run_id = resolve(token, &records).map_err(|err| err.to_string())?;
    let result = submitter.abort(&run_id).map_err(|err| err.to_string())?;
    let status = Status::parse(&result.status).unwrap_or(Status::Aborting);
    if records.iter().any(|row| row.run_id == run_id) {
        store
            .update_status(&run_id, status)
            .map_err(|err| err.to_string())?;
    }
    Ok(format!("{run_id}\t{status}"))
}

fn cmd_outputs(
    config: &Config,
    refs: &[String],
    provider: &dyn MetadataProvider,
) -> Result<String, String> {
    if refs.is_empty() {
        return Err("usage: cromrun outputs <ref>...".to_string());
    }
    let store = open_store(config)?;
    let mut outcomes = Vec::new();
    for token in refs {
        let result = outputs_for_reference(token, &store, provider);
        outcomes.push(ItemOutcome {
            token: token.clone(),
            result,
        });
    }
    reduce(outcomes)
}

fn outputs_for_reference(
    token: &str,
    store: &LedgerStore,
    provider: &dyn MetadataProvider,
) -> Result<String, String> {
    let records = store.read_all().map_err(|err| err.to_string())?;
    let run_id = resolve(token, &records).map_err(|err| err.to_string())?;
    let tree = provider
        .fetch_metadata(&run_id, true)
        .map_err(|err| err.to_string())?;
    let outputs = collect_outputs(&tree);
    let value = Value::Object(
        outputs
            .into_iter()
            .map(|(task, values)| (task, Value::Array(values)))
            .collect(),
    );
    serde_json::to_string_pretty(&value).map_err(|err| err.to_string())
}
