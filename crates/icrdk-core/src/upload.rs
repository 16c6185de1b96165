//! Chunked artifact upload to the appliance file-transfer endpoint.
//!
//! The remote side tracks upload state per file, so chunks are sent one
//! at a time in ascending order and each is acknowledged before the next.

use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{DeployError, Result};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::task::poller::until_cancelled;
use crate::transport::{ApiClient, ApiRequest, Transport};

pub const UPLOAD_PATH: &str = "/mgmt/shared/file-transfer/uploads";

/// Directory the appliance lands uploaded files in.
pub const DOWNLOADS_DIR: &str = "/var/config/rest/downloads";

/// Inclusive byte range of one chunk, as framed by `Content-Range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `start-end/total`
    pub fn content_range(&self) -> String {
        format!("{}-{}/{}", self.start, self.end, self.total)
    }

    pub fn is_last(&self) -> bool {
        self.end + 1 == self.total
    }
}

/// Sequential, non-overlapping ranges covering `[0, size - 1]`.
#[derive(Debug, Clone)]
pub struct RangePlan {
    next: u64,
    size: u64,
    chunk: u64,
}

impl Iterator for RangePlan {
    type Item = ByteRange;

    fn next(&mut self) -> Option<ByteRange> {
        if self.next >= self.size {
            return None;
        }
        let start = self.next;
        let end = start.saturating_add(self.chunk - 1).min(self.size - 1);
        self.next = end + 1;
        Some(ByteRange {
            start,
            end,
            total: self.size,
        })
    }
}

/// Plan the chunk ranges for a file of `size` bytes. `chunk` must be non-zero.
pub fn plan_ranges(size: u64, chunk: u64) -> RangePlan {
    RangePlan {
        next: 0,
        size,
        chunk: chunk.max(1),
    }
}

pub fn chunk_count(size: u64, chunk: u64) -> usize {
    size.div_ceil(chunk.max(1)) as usize
}

/// A local artifact, stat'ed once before upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

impl ArtifactRef {
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                DeployError::ArtifactNotFound(path.to_path_buf())
            } else {
                DeployError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        if !metadata.is_file() {
            return Err(DeployError::ArtifactNotFound(path.to_path_buf()));
        }
        if metadata.len() == 0 {
            return Err(DeployError::EmptyArtifact(path.to_path_buf()));
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| DeployError::ArtifactNotFound(path.to_path_buf()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            size: metadata.len(),
        })
    }

    pub fn upload_endpoint(&self) -> String {
        format!("{UPLOAD_PATH}/{}", self.file_name)
    }
}

/// Location of an uploaded file on the appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath(String);

impl RemotePath {
    pub fn for_file(file_name: &str) -> Self {
        Self(format!("{DOWNLOADS_DIR}/{file_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkedUploader {
    chunk_size: u64,
}

impl Default for ChunkedUploader {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ChunkedUploader {
    pub fn new(chunk_size: u64) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Upload `artifact` chunk by chunk. The first failed chunk aborts the
    /// upload; nothing already sent is rolled back.
    pub async fn upload<T, P>(
        &self,
        client: &ApiClient<T>,
        artifact: &ArtifactRef,
        progress: &P,
        cancel: &CancellationToken,
    ) -> Result<RemotePath>
    where
        T: Transport,
        P: ProgressSink + ?Sized,
    {
        let endpoint = artifact.upload_endpoint();
        let mut file = tokio::fs::File::open(&artifact.path)
            .await
            .map_err(|source| DeployError::Io {
                path: artifact.path.clone(),
                source,
            })?;

        progress.emit(ProgressEvent::UploadStarted {
            file: artifact.file_name.clone(),
            size: artifact.size,
            chunks: chunk_count(artifact.size, self.chunk_size),
        });

        for range in plan_ranges(artifact.size, self.chunk_size) {
            if cancel.is_cancelled() {
                return Err(DeployError::Cancelled);
            }
            let body = read_range(&mut file, &artifact.path, range).await?;

            progress.emit(ProgressEvent::ChunkSending(range));
            let request = ApiRequest::post(endpoint.as_str(), body)
                .with_header("Content-Type", "application/octet-stream")
                .with_header("Content-Range", range.content_range())
                .with_header("Content-Length", range.len().to_string())
                .with_header("Connection", "keep-alive");

            let result = until_cancelled(cancel, client.send(request)).await;
            let status = match &result {
                Ok(response) => Some(response.status),
                Err(DeployError::Http { status, .. }) => Some(*status),
                Err(_) => None,
            };
            if let Some(status) = status {
                progress.emit(ProgressEvent::ChunkResponse { range, status });
            }
            if let Err(err) = result {
                tracing::warn!(range = %range.content_range(), error = %err, "chunk rejected");
                return Err(err);
            }
        }

        let remote = RemotePath::for_file(&artifact.file_name);
        tracing::info!(file = %artifact.file_name, remote = %remote, "upload complete");
        progress.emit(ProgressEvent::UploadFinished {
            remote_path: remote.to_string(),
        });
        Ok(remote)
    }
}

async fn read_range(file: &mut tokio::fs::File, path: &Path, range: ByteRange) -> Result<Vec<u8>> {
    let io_err = |source| DeployError::Io {
        path: path.to_path_buf(),
        source,
    };
    file.seek(SeekFrom::Start(range.start)).await.map_err(io_err)?;
    let mut buf = vec![0u8; range.len() as usize];
    file.read_exact(&mut buf).await.map_err(io_err)?;
    Ok(buf)
}
