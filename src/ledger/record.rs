/// Workflow status as tracked in the ledger. `Doomed` is client-synthesized:
/// the server reports `Running` but the metadata tree already contains a
/// failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Submitted,
    Running,
    Succeeded,
    Failed,
    Aborting,
    Aborted,
    Doomed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Submitted => "Submitted",
            Status::Running => "Running",
            Status::Succeeded => "Succeeded",
            Status::Failed => "Failed",
            Status::Aborting => "Aborting",
            Status::Aborted => "Aborted",
            Status::Doomed => "DOOMED",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw {
            "Submitted" => Ok(Status::Submitted),
            "Running" => Ok(Status::Running),
            "Succeeded" => Ok(Status::Succeeded),
            "Failed" => Ok(Status::Failed),
            "Aborting" => Ok(Status::Aborting),
            "Aborted" => Ok(Status::Aborted),
            "DOOMED" => Ok(Status::Doomed),
            other => Err(format!("unknown workflow status `{other}`")),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Succeeded | Status::Failed | Status::Aborted)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only two ledger columns that may change after a row is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutableField {
    Status,
    Alias,
}

impl MutableField {
    pub fn column_name(self) -> &'static str {
        match self {
            MutableField::Status => "STATUS",
            MutableField::Alias => "ALIAS",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "STATUS" => Some(MutableField::Status),
            "ALIAS" => Some(MutableField::Alias),
            _ => None,
        }
    }
}

/// One row of the submission ledger. `run_id` is the primary key; all fields
/// except `status` and `alias` are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub date_time: String,
    pub server_url: String,
    pub run_id: String,
    pub source_name: String,
    pub status: Status,
    pub alias: String,
}

impl SubmissionRecord {
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.date_time,
            self.server_url,
            self.run_id,
            self.source_name,
            self.status,
            self.alias,
        )
    }

    pub fn from_fields(fields: &[&str]) -> Result<Self, String> {
        if fields.len() != 6 {
            return Err(format!("expected 6 fields, found {}", fields.len()));
        }
        Ok(Self {
            date_time: fields[0].to_string(),
            server_url: fields[1].to_string(),
            run_id: fields[2].to_string(),
            source_name: fields[3].to_string(),
            status: Status::parse(fields[4])?,
            alias: fields[5].to_string(),
        })
    }

    pub fn has_alias(&self) -> bool {
        !self.alias.is_empty()
    }
}
