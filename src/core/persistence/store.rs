//! Artifact store service
//!
//! Owns the strategy cache and the sink backends (mail transport, object
//! store, virtual filesystems). One store is shared by every connection
//! task; `build` is read-mostly and `persist` runs fully in parallel across
//! calls.

use super::reporter::PersistenceReporter;
use super::sinks::{self, vfs::VirtualFileSystems, SinkReceipt};
use super::strategy::{PersistenceStrategy, SinkKind, SinkStrategy};
use crate::adapters::blob::build_object_store;
use crate::adapters::mail::{MailTransport, PickupDirTransport};
use crate::config::PersistenceConfig;
use crate::domain::{Artifact, Result, SinkError};
use futures::future::BoxFuture;
use object_store::ObjectStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound for one sink write
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds and runs persistence strategies
pub struct ArtifactStore {
    cache: RwLock<HashMap<String, Arc<PersistenceStrategy>>>,
    diagnostic: Arc<PersistenceStrategy>,
    always: Option<Arc<PersistenceStrategy>>,
    mail: Option<Arc<dyn MailTransport>>,
    blob: Option<Arc<dyn ObjectStore>>,
    filesystems: VirtualFileSystems,
    sink_timeout: Duration,
}

impl ArtifactStore {
    /// Store with no backends and no always strategy
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    /// Creates a store from fully assembled options
    pub fn with_options(options: StoreOptions) -> Self {
        let StoreOptions {
            always,
            mail,
            blob,
            filesystems,
            sink_timeout,
        } = options;

        Self {
            cache: RwLock::new(HashMap::new()),
            diagnostic: Arc::new(PersistenceStrategy::diagnostic()),
            always: always
                .map(|descriptor| Arc::new(PersistenceStrategy::from_descriptor(&descriptor))),
            mail,
            blob,
            filesystems,
            sink_timeout,
        }
    }

    /// Creates a store from the `[persistence]` configuration section
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the object store cannot be built.
    pub fn from_config(config: &PersistenceConfig) -> Result<Self> {
        Ok(Self::with_options(StoreOptions {
            always: config.always.clone(),
            mail: config.mail.as_ref().map(|mail| {
                Arc::new(PickupDirTransport::new(&mail.pickup_dir)) as Arc<dyn MailTransport>
            }),
            blob: build_object_store(&config.blob)?,
            filesystems: VirtualFileSystems::default(),
            sink_timeout: Duration::from_secs(config.sink_timeout_seconds),
        }))
    }

    /// Returns the strategy for `descriptor`
    ///
    /// `None` yields the always strategy when one is configured, else the
    /// diagnostic strategy. Descriptor text is the cache key: identical text
    /// always returns the same instance, built at most once.
    pub fn build(&self, descriptor: Option<&str>) -> Arc<PersistenceStrategy> {
        let Some(descriptor) = descriptor else {
            return self
                .always
                .clone()
                .unwrap_or_else(|| Arc::clone(&self.diagnostic));
        };

        if let Some(strategy) = self.cache.read().get(descriptor) {
            return Arc::clone(strategy);
        }

        let mut cache = self.cache.write();
        let strategy = cache.entry(descriptor.to_string()).or_insert_with(|| {
            let built = PersistenceStrategy::from_descriptor(descriptor);
            let built = match &self.always {
                Some(always) => built.with_always(Arc::clone(always)),
                None => built,
            };
            tracing::debug!(strategy = %built, "Built persistence strategy");
            Arc::new(built)
        });
        Arc::clone(strategy)
    }

    /// Runs `strategy` for `artifact`
    ///
    /// Never fails: every outcome, including sink errors and timeouts, is
    /// delivered through `reporter`. Aggregate children run sequentially in
    /// declaration order.
    pub fn persist<'a>(
        &'a self,
        strategy: &'a PersistenceStrategy,
        artifact: &'a Artifact,
        reporter: &'a dyn PersistenceReporter,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            match strategy {
                PersistenceStrategy::Diagnostic { identifier } => {
                    reporter.info(&format!("[{identifier}] artifactId: {}", artifact.id()));
                }
                PersistenceStrategy::InvalidNature(nature) => {
                    reporter.issue(&format!(
                        "[InvalidPersistenceNature {nature}] artifactId: {}",
                        artifact.id()
                    ));
                }
                PersistenceStrategy::InvalidDescriptor { descriptor, error } => {
                    tracing::debug!(
                        descriptor = %descriptor,
                        error = %error,
                        "Invalid persistence descriptor"
                    );
                    reporter.issue(&format!(
                        "[InvalidPersistenceStrategy {descriptor}] artifactId: {}",
                        artifact.id()
                    ));
                }
                PersistenceStrategy::Aggregate(children) => {
                    for child in children {
                        self.persist(child, artifact, reporter).await;
                    }
                }
                PersistenceStrategy::Sink(sink)
                    if sink.kind() == SinkKind::BlobStore && self.blob.is_none() =>
                {
                    reporter.info(sinks::blob::PLACEHOLDER_RESULT);
                }
                PersistenceStrategy::Sink(sink) => self.run_sink(sink, artifact, reporter).await,
            }
        })
    }

    async fn run_sink(
        &self,
        sink: &SinkStrategy,
        artifact: &Artifact,
        reporter: &dyn PersistenceReporter,
    ) {
        let outcome = tokio::time::timeout(self.sink_timeout, self.write(sink, artifact))
            .await
            .unwrap_or_else(|_| Err(SinkError::Timeout(self.sink_timeout.as_secs())));

        match outcome {
            Ok(receipt) => {
                reporter.persisted(artifact, std::slice::from_ref(&receipt.location));
                reporter.info(&receipt.message);
            }
            Err(e) => {
                crate::log_error_with_context!(
                    e,
                    format_args!("{} for artifact {}", sink.kind().name(), artifact.id())
                );
                reporter.issue(&e.to_string());
            }
        }
    }

    async fn write(
        &self,
        sink: &SinkStrategy,
        artifact: &Artifact,
    ) -> std::result::Result<SinkReceipt, SinkError> {
        match sink.kind() {
            SinkKind::LocalFs => sinks::fs::write(sink, artifact).await,
            SinkKind::VirtualFs => sinks::vfs::write(&self.filesystems, sink, artifact).await,
            SinkKind::BlobStore => match &self.blob {
                Some(store) => sinks::blob::upload(store.as_ref(), sink, artifact).await,
                None => Err(SinkError::Misconfigured("No object store configured".to_string())),
            },
            SinkKind::Email => sinks::email::send(self.mail.as_deref(), sink, artifact).await,
        }
    }

    /// Drops every cached strategy
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Number of cached descriptors
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    /// The configured always strategy
    pub fn always(&self) -> Option<&Arc<PersistenceStrategy>> {
        self.always.as_ref()
    }

    /// Virtual filesystem backends (exposes the `mem://` store)
    pub fn filesystems(&self) -> &VirtualFileSystems {
        &self.filesystems
    }

    pub fn sink_timeout(&self) -> Duration {
        self.sink_timeout
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("cached", &self.cached_len())
            .field("always", &self.always.as_ref().map(|s| s.to_string()))
            .field("mail", &self.mail.as_ref().map(|m| m.name().to_string()))
            .field("blob", &self.blob.as_ref().map(|b| b.to_string()))
            .field("sink_timeout", &self.sink_timeout)
            .finish()
    }
}

/// Backends and settings for an [`ArtifactStore`]
pub struct StoreOptions {
    /// Descriptor appended to every built strategy
    pub always: Option<String>,
    pub mail: Option<Arc<dyn MailTransport>>,
    pub blob: Option<Arc<dyn ObjectStore>>,
    pub filesystems: VirtualFileSystems,
    /// Upper bound for one leaf sink write
    pub sink_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            always: None,
            mail: None,
            blob: None,
            filesystems: VirtualFileSystems::default(),
            sink_timeout: DEFAULT_SINK_TIMEOUT,
        }
    }
}
