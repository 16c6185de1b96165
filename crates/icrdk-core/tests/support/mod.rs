//! Shared test doubles for pipeline integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use icrdk_core::progress::{ProgressEvent, ProgressSink};
use icrdk_core::transport::{ApiRequest, RawResponse, Transport};
use icrdk_core::{DeployError, Result};
use tokio::time::Instant;

pub const TASKS_PATH: &str = "/mgmt/shared/iapp/package-management-tasks";

/// A request as seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub request: ApiRequest,
    pub at: Instant,
}

#[derive(Debug)]
enum Reply {
    Response(RawResponse),
    Failure(String),
}

/// Replays scripted responses in order and records every request.
///
/// Running out of script yields a transport error so over-eager callers
/// fail loudly.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    recorded: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Response(RawResponse::new(status, body.into().into_bytes())));
        self
    }

    pub fn respond_ok(self, times: usize) -> Self {
        (0..times).fold(self, |script, _| script.respond(200, "{}"))
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Failure(message.into()));
        self
    }

    pub fn task_created(self, id: &str) -> Self {
        self.respond(200, task_created_body(id))
    }

    pub fn task_status(self, status: &str) -> Self {
        self.respond(200, format!(r#"{{"status":"{status}"}}"#))
    }

    pub fn task_failed(self, message: &str) -> Self {
        self.respond(
            200,
            format!(r#"{{"status":"FAILED","errorMessage":"{message}"}}"#),
        )
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.recorded().into_iter().map(|r| r.request).collect()
    }

    pub fn request_count(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        self.recorded.lock().unwrap().push(Recorded {
            request,
            at: Instant::now(),
        });
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Failure(message)) => Err(DeployError::Transport(message)),
            None => Err(DeployError::Transport("unscripted request".to_string())),
        }
    }
}

/// Collects progress events for assertions. Clones share one event log.
#[derive(Clone, Default)]
pub struct RecordingProgress {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn task_created_body(id: &str) -> String {
    format!(
        r#"{{"id":"{id}","status":"CREATED","selfLink":"https://localhost{TASKS_PATH}/{id}"}}"#
    )
}

/// Write a file of `size` bytes whose content encodes each byte's offset.
pub fn write_artifact(dir: &Path, name: &str, size: usize) -> PathBuf {
    let path = dir.join(name);
    let content: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, content).unwrap();
    path
}

pub fn json_body(request: &ApiRequest) -> serde_json::Value {
    serde_json::from_slice(request.body.as_deref().unwrap_or_default()).unwrap()
}
