//! Error types for the deployment pipeline.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeployError>;

/// Remediation text shown when no connection profile can be found.
pub const PROFILE_HELP: &str = r#"Please create a file in this directory called 'devconfig.json', it should look like this:
{
    "HOST": "<YOUR BIG IP IP ADDRESS>",
    "USER": "<YOUR BIG IP USERNAME>",
    "PASS": "<YOUR BIG IP PASSWORD>"
}
or export ICRDK_HOST, ICRDK_USER and ICRDK_PASS."#;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Upload,
    TaskSubmit,
    Poll,
    ResultFetch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Upload => "upload",
            Stage::TaskSubmit => "task submission",
            Stage::Poll => "task polling",
            Stage::ResultFetch => "result fetch",
        };
        f.write_str(name)
    }
}

/// Connection profile and settings errors. Always raised before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("connection profile field '{0}' is missing or empty")]
    MissingField(&'static str),

    #[error("no connection profile found (searched: {searched})\n\n{}", PROFILE_HELP)]
    NotFound { searched: String },

    #[error("failed to read connection profile {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse connection profile {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("nothing to do, please specify a package name")]
    EmptyPackageName,

    #[error("artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    #[error("artifact is empty: {0}")]
    EmptyArtifact(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("unexpected response from remote: {0}")]
    Decode(String),

    #[error("task selfLink '{0}' is too short to derive a polling path")]
    InvalidSelfLink(String),

    #[error("task did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("operation cancelled")]
    Cancelled,

    #[error("remote task {id} failed: {message}")]
    TaskFailed { id: String, message: String },

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<DeployError>,
    },
}

impl DeployError {
    pub(crate) fn at(self, stage: Stage) -> Self {
        DeployError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Stage the error was raised in, if it was wrapped by the orchestrator.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DeployError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Innermost error, skipping stage wrappers.
    pub fn root(&self) -> &DeployError {
        match self {
            DeployError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self.root(), DeployError::Transport(_))
    }

    /// HTTP status carried by a remote HTTP error.
    pub fn http_status(&self) -> Option<u16> {
        match self.root() {
            DeployError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for errors raised locally before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self.root(),
            DeployError::Config(_)
                | DeployError::EmptyPackageName
                | DeployError::ArtifactNotFound(_)
                | DeployError::EmptyArtifact(_)
        )
    }
}
