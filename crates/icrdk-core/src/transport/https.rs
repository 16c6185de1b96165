//! reqwest-backed [`Transport`] speaking HTTPS to the appliance.

use std::error::Error as StdError;
use std::time::Duration;

use url::Url;

use super::{ApiRequest, RawResponse, Transport};
use crate::config::{ConnectionProfile, DeploySettings};
use crate::error::{ConfigError, DeployError, Result};

/// Client construction options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// URL scheme; always `https` against a real appliance
    pub scheme: String,
    /// Accept self-signed certificates. Private management networks only.
    pub accept_invalid_certs: bool,
    pub timeout: Option<Duration>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            accept_invalid_certs: true,
            timeout: None,
        }
    }
}

impl TransportOptions {
    pub fn from_settings(settings: &DeploySettings) -> Self {
        Self {
            accept_invalid_certs: settings.accept_invalid_certs,
            timeout: settings.request_timeout,
            ..Self::default()
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Basic-auth HTTPS transport bound to one appliance.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
}

impl ReqwestTransport {
    pub fn new(profile: &ConnectionProfile, options: &TransportOptions) -> Result<Self> {
        profile.validate()?;
        let base_url = base_url(&options.scheme, profile.host())?;

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("icrdk/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(options.accept_invalid_certs);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if options.accept_invalid_certs {
            tracing::debug!(host = profile.host(), "certificate validation disabled for appliance");
        }

        let client = builder
            .build()
            .map_err(|e| DeployError::Transport(format!("could not build HTTP client: {}", describe(&e))))?;

        Ok(Self {
            client,
            base_url,
            username: profile.username().to_string(),
            password: profile.password().to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| DeployError::Transport(format!("invalid request path '{path}': {e}")))
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let url = self.url_for(&request.path)?;

        let mut builder = self
            .client
            .request(request.method, url)
            .basic_auth(&self.username, Some(&self.password));
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DeployError::Transport(describe(&e)))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| DeployError::Transport(format!("failed to read response body: {}", describe(&e))))?;

        Ok(RawResponse::new(status, body.to_vec()))
    }
}

fn base_url(scheme: &str, host: &str) -> Result<Url> {
    let url = Url::parse(&format!("{scheme}://{host}")).map_err(|e| ConfigError::InvalidHost {
        host: host.to_string(),
        reason: e.to_string(),
    })?;
    if url.host_str().is_none() || url.path() != "/" {
        return Err(ConfigError::InvalidHost {
            host: host.to_string(),
            reason: "expected a bare host name or address".to_string(),
        }
        .into());
    }
    Ok(url)
}

/// Render an error together with its source chain.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
