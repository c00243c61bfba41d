//! Local filesystem sink (`nature: "fs"`)

use super::SinkReceipt;
use crate::core::persistence::strategy::SinkStrategy;
use crate::domain::{Artifact, SinkError};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Descriptor field holding the path template
pub const FS_PATH_ARG: &str = "fsPath";

/// Path used when the descriptor has no `fsPath`
pub const FS_PATH_DEFAULT: &str = "${cwd()}/ArtifactStore-LocalFsPersistence/${formattedDateNow('yyyy/MM/dd/HH')}/${artifactId}.json";

/// Streams the artifact to the interpolated `fsPath`
///
/// Parent directories are created as needed; concurrent creation of the
/// same directory is harmless.
pub async fn write(sink: &SinkStrategy, artifact: &Artifact) -> Result<SinkReceipt, SinkError> {
    let fs_path = sink.render(artifact, FS_PATH_ARG, FS_PATH_DEFAULT);
    let path = PathBuf::from(&fs_path);
    let io_error = |e: std::io::Error| SinkError::Io {
        path: fs_path.clone(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let mut file = tokio::fs::File::create(&path).await.map_err(io_error)?;
    let mut reader = artifact.reader();
    let written = tokio::io::copy(&mut reader, &mut file)
        .await
        .map_err(io_error)?;
    file.flush().await.map_err(io_error)?;

    let absolute = absolute_path(&path);
    tracing::debug!(
        artifact_id = %artifact.id(),
        path = %absolute.display(),
        bytes = written,
        "Artifact written to local filesystem"
    );

    Ok(SinkReceipt {
        message: format!("[persist-fs {}] {}", artifact.id(), absolute.display()),
        location: fs_path,
    })
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
