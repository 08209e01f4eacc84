use crate::ledger::record::{MutableField, Status, SubmissionRecord};
use crate::shared::fs_atomic::atomic_write_file;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const LEDGER_COLUMNS: [&str; 6] = [
    "DATE",
    "CROMWELL_SERVER",
    "RUN_ID",
    "WDL_NAME",
    "STATUS",
    "ALIAS",
];

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger {path} is corrupt: {reason}")]
    CorruptLedger { path: String, reason: String },
    #[error("run id `{run_id}` already exists in the ledger")]
    DuplicateRunId { run_id: String },
    #[error("run id `{run_id}` not found in the ledger")]
    RunIdNotFound { run_id: String },
    #[error("ledger column `{field}` is immutable")]
    ImmutableField { field: String },
    #[error("invalid status value: {reason}")]
    InvalidStatus { reason: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only tab-delimited submission ledger. Every mutation is a whole-file
/// read-modify-write finished with an atomic rename; concurrent writers racing
/// on the same run id are last-writer-wins.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Result<Vec<SubmissionRecord>, LedgerError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        self.parse(&raw)
    }

    pub fn append(&self, record: SubmissionRecord) -> Result<(), LedgerError> {
        let records = self.read_all()?;
        if records.iter().any(|row| row.run_id == record.run_id) {
            return Err(LedgerError::DuplicateRunId {
                run_id: record.run_id,
            });
        }
        let mut records = records;
        records.push(record);
        self.write_all(&records)
    }

    pub fn update_status(&self, run_id: &str, status: Status) -> Result<(), LedgerError> {
        self.update(run_id, |row| row.status = status)
    }

    pub fn update_alias(&self, run_id: &str, alias: &str) -> Result<(), LedgerError> {
        self.update(run_id, |row| row.alias = alias.to_string())
    }

    /// String-typed mutation surface: rejects anything but the two mutable
    /// columns before touching the file.
    pub fn update_field(
        &self,
        run_id: &str,
        field_name: &str,
        value: &str,
    ) -> Result<(), LedgerError> {
        let field =
            MutableField::parse(field_name).ok_or_else(|| LedgerError::ImmutableField {
                field: field_name.to_string(),
            })?;
        match field {
            MutableField::Status => {
                let status = Status::parse(value)
                    .map_err(|reason| LedgerError::InvalidStatus { reason })?;
                self.update_status(run_id, status)
            }
            MutableField::Alias => self.update_alias(run_id, value),
        }
    }

    pub fn find(&self, run_id: &str) -> Result<Option<SubmissionRecord>, LedgerError> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|row| row.run_id == run_id))
    }

    fn update(
        &self,
        run_id: &str,
        apply: impl FnOnce(&mut SubmissionRecord),
    ) -> Result<(), LedgerError> {
        let mut records = self.read_all()?;
        let row = records
            .iter_mut()
            .find(|row| row.run_id == run_id)
            .ok_or_else(|| LedgerError::RunIdNotFound {
                run_id: run_id.to_string(),
            })?;
        apply(row);
        self.write_all(&records)
    }

    fn parse(&self, raw: &str) -> Result<Vec<SubmissionRecord>, LedgerError> {
        let mut lines = raw.lines();
        let header = lines.next().unwrap_or_default();
        if header != LEDGER_COLUMNS.join("\t") {
            return Err(self.corrupt(format!(
                "header must be the {} tab-separated column names, found `{header}`",
                LEDGER_COLUMNS.len()
            )));
        }
        let mut records = Vec::new();
        for (index, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let record = SubmissionRecord::from_fields(&fields)
                .map_err(|reason| self.corrupt(format!("row {}: {reason}", index + 1)))?;
            records.push(record);
        }
        Ok(records)
    }

    fn write_all(&self, records: &[SubmissionRecord]) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let mut body = LEDGER_COLUMNS.join("\t");
        body.push('\n');
        for record in records {
            body.push_str(&record.to_line());
            body.push('\n');
        }
        atomic_write_file(&self.path, body.as_bytes()).map_err(|source| self.io_error(source))
    }

    fn corrupt(&self, reason: String) -> LedgerError {
        LedgerError::CorruptLedger {
            path: self.path.display().to_string(),
            reason,
        }
    }

    fn io_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
