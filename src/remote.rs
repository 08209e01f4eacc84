use crate::config::Config;
use crate::metadata::model::{MetadataError, WorkflowMetadata};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("execution server unreachable: {0}")]
    Unavailable(String),
    #[error("execution server rejected the request ({code}): {body}")]
    Rejected { code: u16, body: String },
    #[error("response from execution server did not decode: {0}")]
    Decode(String),
    #[error("failed to read workflow file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<MetadataError> for RemoteError {
    fn from(value: MetadataError) -> Self {
        RemoteError::Decode(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmissionResult {
    pub id: String,
    pub status: String,
}

/// Seam for fetching a workflow's metadata tree and current status.
pub trait MetadataProvider {
    fn fetch_metadata(
        &self,
        run_id: &str,
        expand_subworkflows: bool,
    ) -> Result<WorkflowMetadata, RemoteError>;

    fn fetch_status(&self, run_id: &str) -> Result<String, RemoteError>;
}

/// Seam for submitting and aborting workflows.
pub trait SubmissionClient {
    fn submit(
        &self,
        definition: &Path,
        inputs: Option<&Path>,
    ) -> Result<SubmissionResult, RemoteError>;

    fn abort(&self, run_id: &str) -> Result<SubmissionResult, RemoteError>;
}

/// Blocking HTTP client for the Cromwell REST API. One request per call, no
/// retries; the caller-supplied timeout comes from `Config`.
#[derive(Debug, Clone)]
pub struct HttpCromwellClient {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpCromwellClient {
    pub fn new(config: &Config) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout())
            .build();
        Self {
            agent,
            base_url: config.server_url().trim_end_matches('/').to_string(),
        }
    }

    fn workflow_url(&self, run_id: &str, leaf: &str) -> String {
        format!(
            "{}/api/workflows/v1/{}/{leaf}",
            self.base_url,
            urlencoding::encode(run_id),
        )
    }

    fn get_json(&self, url: &str) -> Result<Value, RemoteError> {
        let response = self.agent.get(url).call().map_err(map_ureq_error)?;
        response
            .into_json()
            .map_err(|err| RemoteError::Decode(err.to_string()))
    }
}

impl MetadataProvider for HttpCromwellClient {
    fn fetch_metadata(
        &self,
        run_id: &str,
        expand_subworkflows: bool,
    ) -> Result<WorkflowMetadata, RemoteError> {
        let url = format!(
            "{}?expandSubWorkflows={}&excludeKey={}",
            self.workflow_url(run_id, "metadata"),
            expand_subworkflows,
            urlencoding::encode("submittedFiles"),
        );
        let value = self.get_json(&url)?;
        Ok(WorkflowMetadata::from_value(value)?)
    }

    fn fetch_status(&self, run_id: &str) -> Result<String, RemoteError> {
        let value = self.get_json(&self.workflow_url(run_id, "status"))?;
        let envelope: StatusEnvelope =
            serde_json::from_value(value).map_err(|err| RemoteError::Decode(err.to_string()))?;
        Ok(envelope.status)
    }
}

impl SubmissionClient for HttpCromwellClient {
    fn submit(
        &self,
        definition: &Path,
        inputs: Option<&Path>,
    ) -> Result<SubmissionResult, RemoteError> {
        let source = read_file(definition)?;
        let inputs_body = match inputs {
            Some(path) => Some(read_file(path)?),
            None => None,
        };
        let mut form: Vec<(&str, &str)> = vec![("workflowSource", source.as_str())];
        if let Some(body) = &inputs_body {
            form.push(("workflowInputs", body.as_str()));
        }
        let url = format!("{}/api/workflows/v1", self.base_url);
        let response = self
            .agent
            .post(&url)
            .send_form(&form)
            .map_err(map_ureq_error)?;
        response
            .into_json()
            .map_err(|err| RemoteError::Decode(err.to_string()))
    }

    fn abort(&self, run_id: &str) -> Result<SubmissionResult, RemoteError> {
        let response = self
            .agent
            .post(&self.workflow_url(run_id, "abort"))
            .call()
            .map_err(map_ureq_error)?;
        response
            .into_json()
            .map_err(|err| RemoteError::Decode(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    status: String,
}

fn read_file(path: &Path) -> Result<String, RemoteError> {
    fs::read_to_string(path).map_err(|source| RemoteError::ReadFile {
        path: path.display().to_string(),
        source,
    })
}

fn map_ureq_error(err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(code, response) => RemoteError::Rejected {
            code,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => RemoteError::Unavailable(transport.to_string()),
    }
}
