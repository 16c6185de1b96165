//! Transport client: single authenticated requests against the appliance.
//!
//! [`Transport`] is the raw request/response seam; [`ApiClient`] layers
//! HTTP-status classification and JSON decoding on top. Neither layer
//! retries.

pub mod https;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use https::{ReqwestTransport, TransportOptions};
pub use reqwest::Method;

use crate::error::{DeployError, Result};

/// A single request relative to the appliance base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute path, e.g. `/mgmt/shared/iapp/package-management-tasks`
    pub path: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn post_json<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| DeployError::Decode(format!("failed to encode request body: {e}")))?;
        Ok(Self::post(path, bytes).with_header("Content-Type", "application/json"))
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, Vec::len)
    }
}

/// Fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends one request and buffers the whole response body.
///
/// Implementations report connection-level failures (DNS, TLS, refused) as
/// [`DeployError::Transport`] and hand back every response, whatever its
/// status.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        (**self).send(request).await
    }
}

/// Classifies transport responses and decodes JSON payloads.
#[derive(Debug)]
pub struct ApiClient<T> {
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a request, turning any status >= 400 into [`DeployError::Http`].
    pub async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let method = request.method.clone();
        let path = request.path.clone();
        let response = self.transport.send(request).await?;
        tracing::debug!(%method, %path, status = response.status, "request completed");

        if response.is_error() {
            return Err(DeployError::Http {
                status: response.status,
                body: response.text(),
            });
        }
        Ok(response)
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let response = self.send(ApiRequest::get(path)).await?;
        decode(path, &response)
    }

    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.send(ApiRequest::post_json(path, body)?).await?;
        decode(path, &response)
    }
}

fn decode<R: DeserializeOwned>(path: &str, response: &RawResponse) -> Result<R> {
    serde_json::from_slice(&response.body)
        .map_err(|e| DeployError::Decode(format!("{path}: {e} (body: {})", response.text())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Mutex;

    struct Canned(Mutex<Option<Result<RawResponse>>>);

    impl Canned {
        fn new(result: Result<RawResponse>) -> Self {
            Self(Mutex::new(Some(result)))
        }
    }

    impl Transport for Canned {
        async fn send(&self, _request: ApiRequest) -> Result<RawResponse> {
            self.0
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(DeployError::Transport("no response".into())))
        }
    }

    #[derive(Debug, Deserialize)]
    struct Status {
        status: String,
    }

    #[tokio::test]
    async fn status_400_and_above_is_http_error() {
        let client = ApiClient::new(Canned::new(Ok(RawResponse::new(401, "Authorization failed"))));
        let err = client.send(ApiRequest::get("/mgmt")).await.unwrap_err();

        match err {
            DeployError::Http { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Authorization failed");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_body_is_returned() {
        let client = ApiClient::new(Canned::new(Ok(RawResponse::new(202, r#"{"status":"STARTED"}"#))));
        let status: Status = client.get_json("/task").await.unwrap();
        assert_eq!(status.status, "STARTED");
    }

    #[tokio::test]
    async fn transport_error_passes_through() {
        let client = ApiClient::new(Canned::new(Err(DeployError::Transport("refused".into()))));
        let err = client.send(ApiRequest::get("/x")).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn malformed_json_is_decode_error() {
        let client = ApiClient::new(Canned::new(Ok(RawResponse::new(200, "<html>"))));
        let err = client.get_json::<Status>("/task").await.unwrap_err();
        assert!(matches!(err, DeployError::Decode(msg) if msg.contains("/task")));
    }

    #[test]
    fn post_json_sets_content_type() {
        let request = ApiRequest::post_json("/tasks", &serde_json::json!({"operation": "QUERY"})).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(br#"{"operation":"QUERY"}"#.as_slice()));
    }
}
