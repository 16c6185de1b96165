//! Connection profile discovery and per-operation deployment settings.

pub mod profile;

use std::time::Duration;

pub use profile::{ConnectionProfile, ENV_HOST, ENV_KEY, ENV_PASS, ENV_USER, PROFILE_FILE_NAME, ProfileLoader};

use crate::error::ConfigError;
use crate::task::PollPolicy;

/// Upload chunk size used by the remote file-transfer endpoint.
pub const DEFAULT_CHUNK_SIZE: u64 = 1_000_000;

/// Settings for a single deployment operation.
///
/// Built explicitly per invocation and never mutated once handed to a
/// [`Deployer`](crate::deploy::Deployer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    /// Maximum bytes per upload request
    pub chunk_size: u64,
    /// Task polling interval and optional deadline
    pub poll: PollPolicy,
    /// Accept self-signed certificates presented by the appliance
    pub accept_invalid_certs: bool,
    /// Per-request timeout; `None` leaves requests unbounded
    pub request_timeout: Option<Duration>,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll: PollPolicy::default(),
            accept_invalid_certs: true,
            request_timeout: None,
        }
    }
}

impl DeploySettings {
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval = interval;
        self
    }

    /// Bound the polling loop. Without a deadline it polls until the task leaves `STARTED`.
    pub fn with_poll_deadline(mut self, deadline: Duration) -> Self {
        self.poll.deadline = Some(deadline);
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "chunk_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
