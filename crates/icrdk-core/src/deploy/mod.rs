//! Deployment orchestration: install, uninstall and query.
//!
//! - install: upload -> submit INSTALL -> poll
//! - uninstall: submit UNINSTALL -> poll
//! - query: submit QUERY -> poll -> fetch task record
//!
//! Every network failure is wrapped in [`DeployError::Stage`] naming the
//! step it came from. Nothing here retries a failed request.

mod outcome;

use std::path::Path;

use tokio_util::sync::CancellationToken;

pub use outcome::TaskOutcome;

use crate::config::DeploySettings;
use crate::error::{DeployError, Result, Stage};
use crate::package::{PackageRecord, QueryResponse};
use crate::progress::{NoProgress, ProgressEvent, ProgressSink};
use crate::task::{
    TASKS_PATH, TaskCreated, TaskHandle, TaskOperation, TaskPoller, TaskRequest, TaskState, TaskStatus,
};
use crate::transport::{ApiClient, Transport};
use crate::upload::{ArtifactRef, ChunkedUploader};

#[derive(Debug)]
pub struct Deployer<T, P = NoProgress> {
    client: ApiClient<T>,
    settings: DeploySettings,
    progress: P,
    cancel: CancellationToken,
}

impl<T: Transport> Deployer<T, NoProgress> {
    pub fn new(transport: T, settings: DeploySettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            client: ApiClient::new(transport),
            settings,
            progress: NoProgress,
            cancel: CancellationToken::new(),
        })
    }
}

impl<T: Transport, P: ProgressSink> Deployer<T, P> {
    pub fn with_progress<Q: ProgressSink>(self, progress: Q) -> Deployer<T, Q> {
        Deployer {
            client: self.client,
            settings: self.settings,
            progress,
            cancel: self.cancel,
        }
    }

    /// Stop uploads and polling when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    pub fn settings(&self) -> &DeploySettings {
        &self.settings
    }

    /// Upload `artifact` and install it.
    ///
    /// A `FAILED` install task is returned as a [`TaskOutcome`], not an error.
    pub async fn install(&self, artifact: &Path) -> Result<TaskOutcome> {
        let artifact = ArtifactRef::resolve(artifact)?;
        tracing::info!(artifact = %artifact.path.display(), size = artifact.size, "uploading artifact");

        let uploader = ChunkedUploader::new(self.settings.chunk_size);
        let remote = uploader
            .upload(&self.client, &artifact, &self.progress, &self.cancel)
            .await
            .map_err(|e| e.at(Stage::Upload))?;

        tracing::info!(remote = %remote, "installing package");
        let request = TaskRequest::install(remote.as_str());
        let handle = self.submit(&request).await?;
        let status = self.poll(&handle).await?;
        Ok(TaskOutcome::new(request.operation, handle.id, status))
    }

    /// Remove an installed package by its full package name.
    pub async fn uninstall(&self, package_name: &str) -> Result<TaskOutcome> {
        let package_name = package_name.trim();
        if package_name.is_empty() {
            return Err(DeployError::EmptyPackageName);
        }

        tracing::info!(package = package_name, "uninstalling package");
        let request = TaskRequest::uninstall(package_name);
        let handle = self.submit(&request).await?;
        let status = self.poll(&handle).await?;
        Ok(TaskOutcome::new(request.operation, handle.id, status))
    }

    /// List packages installed on the appliance.
    ///
    /// The result lives on the task record and is fetched with a separate
    /// request once the query task settles.
    pub async fn query(&self) -> Result<Vec<PackageRecord>> {
        let request = TaskRequest::query();
        let handle = self.submit(&request).await?;
        let status = self.poll(&handle).await?;

        if status.state != TaskState::Finished {
            return Err(DeployError::TaskFailed {
                id: handle.id,
                message: status
                    .error_message
                    .unwrap_or_else(|| format!("query task ended in state {}", status.state)),
            });
        }

        let path = handle.record_path();
        let response: QueryResponse = self
            .client
            .get_json(&path)
            .await
            .map_err(|e| e.at(Stage::ResultFetch))?;
        self.progress.emit(ProgressEvent::ResultFetched {
            id: handle.id,
            records: response.query_response.len(),
        });
        Ok(response.query_response)
    }

    async fn submit(&self, request: &TaskRequest) -> Result<TaskHandle> {
        if self.cancel.is_cancelled() {
            return Err(DeployError::Cancelled.at(Stage::TaskSubmit));
        }
        let created: TaskCreated = self
            .client
            .post_json(TASKS_PATH, request)
            .await
            .map_err(|e| e.at(Stage::TaskSubmit))?;

        let handle = match request.operation {
            TaskOperation::Query => TaskHandle::from_created_or_id(&created),
            _ => TaskHandle::from_created(&created),
        }
        .map_err(|e| e.at(Stage::TaskSubmit))?;

        tracing::info!(operation = %request.operation, task = %handle.id, "task submitted");
        self.progress.emit(ProgressEvent::TaskSubmitted {
            operation: request.operation,
            id: handle.id.clone(),
        });
        Ok(handle)
    }

    async fn poll(&self, handle: &TaskHandle) -> Result<TaskStatus> {
        TaskPoller::new(self.settings.poll)
            .poll(&self.client, handle, &self.progress, &self.cancel)
            .await
            .map_err(|e| e.at(Stage::Poll))
    }
}
