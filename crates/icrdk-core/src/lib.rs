//! icrdk Core Library
//!
//! Remote deployment pipeline for iControl LX extension packages:
//! chunked artifact upload, package-management task submission and
//! task polling against a remote management appliance.

pub mod artifact;
pub mod config;
pub mod deploy;
pub mod error;
pub mod package;
pub mod progress;
pub mod task;
pub mod transport;
pub mod upload;

pub use error::{ConfigError, DeployError, Result, Stage};

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConnectionProfile, DeploySettings, ProfileLoader};

    // Transport
    pub use crate::transport::{ApiClient, ReqwestTransport, Transport, TransportOptions};

    // Pipeline
    pub use crate::deploy::{Deployer, TaskOutcome};
    pub use crate::task::{PollPolicy, TaskState, TaskStatus};
    pub use crate::upload::{ChunkedUploader, RemotePath};

    // Reporting
    pub use crate::package::PackageRecord;
    pub use crate::progress::{ChannelProgress, NoProgress, ProgressEvent, ProgressSink, TracingProgress};

    pub use crate::error::{DeployError, Stage};
}
