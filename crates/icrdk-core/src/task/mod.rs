//! Package-management tasks: request bodies, handles and status polling.

pub mod poller;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use poller::{PollPolicy, TaskPoller};

use crate::error::{DeployError, Result};

/// Endpoint that accepts task-creating requests.
pub const TASKS_PATH: &str = "/mgmt/shared/iapp/package-management-tasks";

/// Length of the `https://localhost` prefix the appliance puts on every
/// `selfLink`. Stripping it yields the REST path to poll.
pub const SELF_LINK_PREFIX_LEN: usize = "https://localhost".len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskOperation {
    Install,
    Uninstall,
    Query,
}

impl fmt::Display for TaskOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskOperation::Install => "INSTALL",
            TaskOperation::Uninstall => "UNINSTALL",
            TaskOperation::Query => "QUERY",
        };
        f.write_str(name)
    }
}

/// Body posted to [`TASKS_PATH`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub operation: TaskOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
}

impl TaskRequest {
    pub fn install(package_file_path: impl Into<String>) -> Self {
        Self {
            operation: TaskOperation::Install,
            package_file_path: Some(package_file_path.into()),
            package_name: None,
        }
    }

    pub fn uninstall(package_name: impl Into<String>) -> Self {
        Self {
            operation: TaskOperation::Uninstall,
            package_file_path: None,
            package_name: Some(package_name.into()),
        }
    }

    pub fn query() -> Self {
        Self {
            operation: TaskOperation::Query,
            package_file_path: None,
            package_name: None,
        }
    }
}

/// Response to a task-creating request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreated {
    pub id: String,
    #[serde(default)]
    pub self_link: Option<String>,
}

/// Remote task identifier and the path its status is polled on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: String,
    pub poll_path: String,
}

impl TaskHandle {
    /// Derive the handle from a creation response via its `selfLink`.
    pub fn from_created(created: &TaskCreated) -> Result<Self> {
        let link = created
            .self_link
            .as_deref()
            .ok_or_else(|| DeployError::Decode("task response has no selfLink".to_string()))?;
        Ok(Self {
            id: created.id.clone(),
            poll_path: poll_path_from_self_link(link)?,
        })
    }

    /// Like [`from_created`](Self::from_created), falling back to the task
    /// record path when the response carries no `selfLink`.
    pub fn from_created_or_id(created: &TaskCreated) -> Result<Self> {
        match created.self_link.as_deref() {
            Some(_) => Self::from_created(created),
            None => Ok(Self {
                id: created.id.clone(),
                poll_path: format!("{TASKS_PATH}/{}", created.id),
            }),
        }
    }

    /// Path the task's full record (including query results) is fetched from.
    pub fn record_path(&self) -> String {
        format!("{TASKS_PATH}/{}", self.id)
    }
}

/// Strip the fixed [`SELF_LINK_PREFIX_LEN`] prefix from a `selfLink`.
pub fn poll_path_from_self_link(self_link: &str) -> Result<String> {
    match self_link.get(SELF_LINK_PREFIX_LEN..) {
        Some(path) if !path.is_empty() => Ok(path.to_string()),
        _ => Err(DeployError::InvalidSelfLink(self_link.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Started,
    Finished,
    Failed,
    /// Any status the appliance reports beyond the known three. Terminal.
    Other(String),
}

impl TaskState {
    pub fn parse(status: &str) -> Self {
        match status {
            "STARTED" => TaskState::Started,
            "FINISHED" => TaskState::Finished,
            "FAILED" => TaskState::Failed,
            other => TaskState::Other(other.to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TaskState::Started)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Started => f.write_str("STARTED"),
            TaskState::Finished => f.write_str("FINISHED"),
            TaskState::Failed => f.write_str("FAILED"),
            TaskState::Other(status) => f.write_str(status),
        }
    }
}

impl<'de> Deserialize<'de> for TaskState {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let status = String::deserialize(deserializer)?;
        Ok(TaskState::parse(&status))
    }
}

/// A task status as observed by one poll.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    #[serde(rename = "status")]
    pub state: TaskState,
    #[serde(default)]
    pub error_message: Option<String>,
}
