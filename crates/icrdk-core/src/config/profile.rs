//! Connection profile: appliance host and credentials.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub const PROFILE_FILE_NAME: &str = "devconfig.json";

pub const ENV_HOST: &str = "ICRDK_HOST";
pub const ENV_USER: &str = "ICRDK_USER";
pub const ENV_PASS: &str = "ICRDK_PASS";
pub const ENV_KEY: &str = "ICRDK_KEY";

/// Host and basic-auth credentials for the management appliance.
///
/// Read-only once constructed; every field is guaranteed non-empty.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionProfile {
    #[serde(rename = "HOST", default)]
    host: String,
    #[serde(rename = "USER", default)]
    username: String,
    #[serde(rename = "PASS", default)]
    password: String,
    /// SSH key for the legacy secure-copy transfer. Parsed, not used.
    #[serde(rename = "KEY", default)]
    ssh_key: Option<PathBuf>,
}

impl ConnectionProfile {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let profile = Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            ssh_key: None,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn with_ssh_key(mut self, key: impl Into<PathBuf>) -> Self {
        self.ssh_key = Some(key.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingField("HOST"));
        }
        if self.username.is_empty() {
            return Err(ConfigError::MissingField("USER"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::MissingField("PASS"));
        }
        Ok(())
    }

    pub fn host(&self) -> &str {
        self.host.trim()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn ssh_key(&self) -> Option<&Path> {
        self.ssh_key.as_deref()
    }

    /// Parse and validate a profile from JSON text.
    pub fn from_json(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let profile: ConnectionProfile =
            serde_json::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        profile.validate()?;
        Ok(profile)
    }
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ssh_key", &self.ssh_key)
            .finish()
    }
}

/// Locates a connection profile.
///
/// Search order: explicit path, `./devconfig.json`, the global
/// `<config_dir>/icrdk/devconfig.json`, then `ICRDK_*` environment variables.
#[derive(Debug, Clone)]
pub struct ProfileLoader {
    explicit: Option<PathBuf>,
    project_dir: PathBuf,
    global_dir: Option<PathBuf>,
}

impl ProfileLoader {
    pub fn new(project_dir: PathBuf) -> Self {
        let global_dir = dirs::config_dir().map(|p| p.join("icrdk"));
        Self::from_paths(project_dir, global_dir)
    }

    /// Create a loader with a custom global config directory (for testing).
    pub fn from_paths(project_dir: PathBuf, global_dir: Option<PathBuf>) -> Self {
        Self {
            explicit: None,
            project_dir,
            global_dir,
        }
    }

    pub fn with_defaults() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Read {
            path: PathBuf::from("."),
            source,
        })?;
        Ok(Self::new(cwd))
    }

    /// Use this file and nothing else.
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Candidate profile files in search order.
    pub fn candidates(&self) -> Vec<PathBuf> {
        if let Some(path) = &self.explicit {
            return vec![path.clone()];
        }
        let mut paths = vec![self.project_dir.join(PROFILE_FILE_NAME)];
        if let Some(global) = &self.global_dir {
            paths.push(global.join(PROFILE_FILE_NAME));
        }
        paths
    }

    pub fn load(&self) -> Result<ConnectionProfile, ConfigError> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    pub fn load_with_env<F>(&self, env: F) -> Result<ConnectionProfile, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.explicit {
            return read_profile(path);
        }

        for path in self.candidates() {
            if path.is_file() {
                tracing::debug!(path = %path.display(), "loading connection profile");
                return read_profile(&path);
            }
        }

        let host = env(ENV_HOST);
        let user = env(ENV_USER);
        let pass = env(ENV_PASS);
        if host.is_none() && user.is_none() && pass.is_none() {
            let mut searched: Vec<String> = self
                .candidates()
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            searched.push(format!("${ENV_HOST}/${ENV_USER}/${ENV_PASS}"));
            return Err(ConfigError::NotFound {
                searched: searched.join(", "),
            });
        }

        tracing::debug!("loading connection profile from environment");
        let profile = ConnectionProfile::new(
            host.unwrap_or_default(),
            user.unwrap_or_default(),
            pass.unwrap_or_default(),
        )?;
        Ok(match env(ENV_KEY).filter(|k| !k.is_empty()) {
            Some(key) => profile.with_ssh_key(key),
            None => profile,
        })
    }
}

fn read_profile(path: &Path) -> Result<ConnectionProfile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ConnectionProfile::from_json(path, &content)
}
