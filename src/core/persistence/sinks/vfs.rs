//! Virtual filesystem sink (`nature: "vfs"`)
//!
//! Destinations are URIs whose scheme picks an object-store backend:
//!
//! | scheme    | backend                                   |
//! |-----------|-------------------------------------------|
//! | `file://` | local filesystem, absolute path           |
//! | `tmp://`  | local filesystem under the OS temp dir    |
//! | `mem://`  | in-memory store owned by [`VirtualFileSystems`] |

use super::SinkReceipt;
use crate::core::persistence::strategy::SinkStrategy;
use crate::domain::{Artifact, SinkError};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;
use url::Url;

/// Descriptor field holding the URI template
pub const VFS_URI_ARG: &str = "vfsUri";

/// URI used when the descriptor has no `vfsUri`
pub const VFS_URI_DEFAULT: &str = "tmp://ArtifactStore-VirtualFsPersistence-${artifactId}.json";

/// Scheme registry for virtual filesystem URIs
#[derive(Debug, Clone, Default)]
pub struct VirtualFileSystems {
    memory: Arc<InMemory>,
}

impl VirtualFileSystems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backing store of `mem://` URIs
    pub fn memory(&self) -> &Arc<InMemory> {
        &self.memory
    }

    /// Resolves `uri` to a store and an object location
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::UnsupportedScheme`] for unknown schemes and
    /// [`SinkError::InvalidUri`] for malformed URIs.
    pub fn resolve(&self, uri: &str) -> Result<(Arc<dyn ObjectStore>, ObjectPath), SinkError> {
        let invalid = |message: String| SinkError::InvalidUri {
            uri: uri.to_string(),
            message,
        };

        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme".to_string()))?;

        match scheme.to_ascii_lowercase().as_str() {
            "file" => {
                let url = Url::parse(uri).map_err(|e| invalid(e.to_string()))?;
                let path = url
                    .to_file_path()
                    .map_err(|_| invalid("not an absolute file path".to_string()))?;
                let location =
                    ObjectPath::from_absolute_path(&path).map_err(|e| invalid(e.to_string()))?;
                Ok((Arc::new(LocalFileSystem::new()), location))
            }
            "tmp" => {
                let store = LocalFileSystem::new_with_prefix(std::env::temp_dir())?;
                Ok((Arc::new(store), relative_location(rest).map_err(invalid)?))
            }
            "mem" => {
                let store: Arc<dyn ObjectStore> = self.memory.clone();
                Ok((store, relative_location(rest).map_err(invalid)?))
            }
            other => Err(SinkError::UnsupportedScheme(other.to_string())),
        }
    }
}

fn relative_location(rest: &str) -> Result<ObjectPath, String> {
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        return Err("empty object path".to_string());
    }
    ObjectPath::parse(rest).map_err(|e| e.to_string())
}

/// Writes the artifact to the interpolated `vfsUri`
pub async fn write(
    filesystems: &VirtualFileSystems,
    sink: &SinkStrategy,
    artifact: &Artifact,
) -> Result<SinkReceipt, SinkError> {
    let uri = sink.render(artifact, VFS_URI_ARG, VFS_URI_DEFAULT);
    let (store, location) = filesystems.resolve(&uri)?;

    store
        .put(&location, PutPayload::from(artifact.content().clone()))
        .await
        .map_err(|e| SinkError::Io {
            path: uri.clone(),
            message: e.to_string(),
        })?;

    tracing::debug!(
        artifact_id = %artifact.id(),
        uri = %uri,
        store = %store,
        "Artifact written to virtual filesystem"
    );

    Ok(SinkReceipt {
        message: format!("[persist-vfs {}] {}", artifact.id(), uri),
        location: uri,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::strategy::SinkKind;
    use crate::domain::ArtifactId;
    use serde_json::json;
    use tempfile::TempDir;

    fn sink(uri: &str) -> SinkStrategy {
        let args = json!({"nature": "vfs", "vfsUri": uri});
        SinkStrategy::new(SinkKind::VirtualFs, args.as_object().unwrap().clone())
    }

    fn artifact() -> Artifact {
        Artifact::new(ArtifactId::new("vfs-1").unwrap(), "unit-test", "{\"a\":1}", None)
    }

    #[tokio::test]
    async fn test_mem_scheme_round_trip() {
        let filesystems = VirtualFileSystems::new();
        let receipt = write(&filesystems, &sink("mem://out/${artifactId}.json"), &artifact())
            .await
            .unwrap();

        assert_eq!(receipt.location, "mem://out/vfs-1.json");
        assert_eq!(receipt.message, "[persist-vfs vfs-1] mem://out/vfs-1.json");

        let stored = filesystems
            .memory()
            .get(&ObjectPath::from("out/vfs-1.json"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(stored.as_ref(), b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_file_scheme_writes_absolute_path() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested/${artifactId}.json");
        let uri = format!("file://{}", target.display());

        write(&VirtualFileSystems::new(), &sink(&uri), &artifact())
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("nested/vfs-1.json")).unwrap();
        assert_eq!(written, "{\"a\":1}");
    }

    #[test]
    fn test_unknown_scheme() {
        let err = VirtualFileSystems::new()
            .resolve("ftp://host/file.json")
            .unwrap_err();
        assert!(matches!(err, SinkError::UnsupportedScheme(ref s) if s == "ftp"));
    }

    #[test]
    fn test_malformed_uris() {
        let filesystems = VirtualFileSystems::new();
        assert!(matches!(
            filesystems.resolve("no-scheme.json"),
            Err(SinkError::InvalidUri { .. })
        ));
        assert!(matches!(
            filesystems.resolve("mem://"),
            Err(SinkError::InvalidUri { .. })
        ));
    }
}
