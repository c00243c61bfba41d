//! Blob store sink (`nature: "aws-s3"`)
//!
//! Without a configured object-store client the sink only reports a
//! placeholder object id, which keeps `aws-s3` descriptors usable in
//! environments that have no bucket.

use super::SinkReceipt;
use crate::core::persistence::strategy::SinkStrategy;
use crate::domain::{Artifact, SinkError};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};

/// Descriptor field holding the object key template
pub const S3_KEY_ARG: &str = "s3Key";

/// Key used when the descriptor has no `s3Key`
pub const S3_KEY_DEFAULT: &str = "${artifactId}.json";

/// Info message reported when no object store is configured
pub const PLACEHOLDER_RESULT: &str = "Result-AWS-S3-ID: AWS-object-id";

/// Uploads the artifact under the interpolated `s3Key`
pub async fn upload(
    store: &dyn ObjectStore,
    sink: &SinkStrategy,
    artifact: &Artifact,
) -> Result<SinkReceipt, SinkError> {
    let key = sink.render(artifact, S3_KEY_ARG, S3_KEY_DEFAULT);
    let location = ObjectPath::parse(key.trim_start_matches('/')).map_err(|e| {
        SinkError::InvalidUri {
            uri: key.clone(),
            message: e.to_string(),
        }
    })?;

    let result = store
        .put(&location, PutPayload::from(artifact.content().clone()))
        .await?;

    tracing::debug!(
        artifact_id = %artifact.id(),
        key = %location,
        e_tag = ?result.e_tag,
        store = %store,
        "Artifact uploaded to object store"
    );

    Ok(SinkReceipt {
        message: format!("[persist-s3 {}] {}", artifact.id(), key),
        location: key,
    })
}
