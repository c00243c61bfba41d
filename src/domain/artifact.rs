//! Persistable artifacts
//!
//! An [`Artifact`] is the durable unit handed to a persistence strategy:
//! an identifier, a namespace, the content bytes and a provenance map.
//! Artifacts are immutable once created and cheap to clone.

use crate::domain::ids::ArtifactId;
use crate::domain::Result;
use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::io::Cursor;

/// Immutable persistable unit of content
#[derive(Debug, Clone)]
pub struct Artifact {
    id: ArtifactId,
    namespace: String,
    content: Bytes,
    provenance: Map<String, Value>,
}

impl Artifact {
    /// Creates an artifact from raw content
    pub fn new(
        id: ArtifactId,
        namespace: impl Into<String>,
        content: impl Into<Bytes>,
        provenance: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            id,
            namespace: namespace.into(),
            content: content.into(),
            provenance: provenance.unwrap_or_default(),
        }
    }

    /// Creates an artifact holding the JSON serialization of `value`
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `value` cannot be rendered as JSON.
    ///
    /// # Examples
    ///
    /// ```
    /// use nexus_ingest::domain::{Artifact, ArtifactId};
    /// use serde_json::json;
    ///
    /// let artifact = Artifact::json(
    ///     &json!({"key": "value"}),
    ///     ArtifactId::new("testId").unwrap(),
    ///     "unit-test",
    ///     None,
    /// ).unwrap();
    /// assert_eq!(artifact.text(), r#"{"key":"value"}"#);
    /// ```
    pub fn json<T: Serialize + ?Sized>(
        value: &T,
        id: ArtifactId,
        namespace: impl Into<String>,
        provenance: Option<Map<String, Value>>,
    ) -> Result<Self> {
        let content = serde_json::to_vec(value)?;
        Ok(Self::new(id, namespace, content, provenance))
    }

    /// Returns the artifact id
    pub fn id(&self) -> &ArtifactId {
        &self.id
    }

    /// Returns the artifact namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the provenance annotations
    pub fn provenance(&self) -> &Map<String, Value> {
        &self.provenance
    }

    /// Returns the full content
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Returns a fresh reader over the content
    ///
    /// The reader implements both `std::io::Read` and `tokio::io::AsyncRead`
    /// and can be requested any number of times.
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.content.clone())
    }

    /// Returns the content as text, replacing invalid UTF-8 sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read;

    #[test]
    fn test_json_artifact() {
        let artifact = Artifact::json(
            &json!({"key": "value"}),
            ArtifactId::new("testId").unwrap(),
            "unit-test",
            None,
        )
        .unwrap();

        assert_eq!(artifact.id().as_str(), "testId");
        assert_eq!(artifact.namespace(), "unit-test");
        assert!(artifact.provenance().is_empty());
        assert_eq!(artifact.text(), r#"{"key":"value"}"#);
    }

    #[test]
    fn test_reader_is_repeatable() {
        let artifact = Artifact::new(
            ArtifactId::new("a").unwrap(),
            "ns",
            "HELLO".as_bytes().to_vec(),
            None,
        );

        for _ in 0..2 {
            let mut buf = String::new();
            artifact.reader().read_to_string(&mut buf).unwrap();
            assert_eq!(buf, "HELLO");
        }
    }

    #[test]
    fn test_provenance_is_kept() {
        let mut provenance = Map::new();
        provenance.insert("producer".to_string(), json!("mllp-listener"));
        let artifact = Artifact::new(
            ArtifactId::new("a").unwrap(),
            "ns",
            Bytes::from_static(b"x"),
            Some(provenance),
        );
        assert_eq!(artifact.provenance()["producer"], "mllp-listener");
    }
}
