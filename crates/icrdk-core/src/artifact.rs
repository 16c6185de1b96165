//! Local build-artifact discovery.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{DeployError, Result};

/// Default build output directory, relative to the project root.
pub const BUILD_DIR: &str = "build";

/// The most recently created regular file in `dir`.
///
/// Uses the filesystem creation time where the platform reports one and
/// the modification time otherwise. Equal timestamps are broken by name.
pub fn latest_build(dir: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            DeployError::ArtifactNotFound(dir.to_path_buf())
        } else {
            DeployError::Io {
                path: dir.to_path_buf(),
                source,
            }
        }
    })?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|source| DeployError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let metadata = match entry.metadata() {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(err) => {
                tracing::warn!(path = %entry.path().display(), %err, "skipping unreadable build entry");
                continue;
            }
        };
        let stamp = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let path = entry.path();

        let is_newer = match &newest {
            None => true,
            Some((best_stamp, best_path)) => (stamp, &path) > (*best_stamp, best_path),
        };
        if is_newer {
            newest = Some((stamp, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| DeployError::ArtifactNotFound(dir.to_path_buf()))
}

/// Pick the artifact to deploy.
///
/// An explicit path is used as given (relative paths are taken from `cwd`);
/// otherwise the latest file under `cwd/build` is chosen.
pub fn resolve_artifact(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.is_absolute() => Ok(path.to_path_buf()),
        Some(path) => Ok(cwd.join(path)),
        None => latest_build(&cwd.join(BUILD_DIR)),
    }
}
