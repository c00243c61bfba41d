//! Persistence strategies and descriptor parsing
//!
//! A descriptor is JSON text: either one object with a `nature` field or an
//! array of such objects. Parsing never fails; malformed descriptors become
//! strategies that report an issue each time they are used.

use crate::core::interpolate::InterpolateEngine;
use crate::domain::Artifact;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Name under which the artifact id is supplied to every template
pub const ARTIFACT_ID_ARG: &str = "artifactId";

/// Identifier used by the default diagnostic strategy
pub const DIAGNOSTIC_IDENTIFIER: &str = "DiagnosticPersistence";

/// Optional descriptor field naming a diagnostic strategy
pub const IDENTIFIER_ARG: &str = "identifier";

/// Built persistence strategy
#[derive(Debug)]
pub enum PersistenceStrategy {
    /// Reports the artifact id without writing anything
    Diagnostic { identifier: String },

    /// Writes through one of the sinks
    Sink(SinkStrategy),

    /// Runs each child in order
    Aggregate(Vec<Arc<PersistenceStrategy>>),

    /// `nature` named no known strategy
    InvalidNature(String),

    /// The descriptor was not valid JSON
    InvalidDescriptor { descriptor: String, error: String },
}

impl PersistenceStrategy {
    /// The default diagnostic strategy
    pub fn diagnostic() -> Self {
        Self::Diagnostic {
            identifier: DIAGNOSTIC_IDENTIFIER.to_string(),
        }
    }

    /// Parses descriptor text into a strategy
    ///
    /// # Examples
    ///
    /// ```
    /// use nexus_ingest::core::persistence::PersistenceStrategy;
    ///
    /// let strategy = PersistenceStrategy::from_descriptor(r#"{"nature": "diags"}"#);
    /// assert_eq!(strategy.name(), "DiagnosticPersistence");
    ///
    /// let strategy = PersistenceStrategy::from_descriptor("not json");
    /// assert_eq!(strategy.name(), "InvalidPersistenceStrategy");
    /// ```
    pub fn from_descriptor(descriptor: &str) -> Self {
        match serde_json::from_str::<Value>(descriptor) {
            Ok(Value::Object(args)) => Self::from_args(args),
            Ok(Value::Array(items)) => Self::Aggregate(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(args) => Arc::new(Self::from_args(args)),
                        other => Arc::new(Self::Diagnostic {
                            identifier: format!(
                                "strategy descriptor element is not an object: {}",
                                json_type(&other)
                            ),
                        }),
                    })
                    .collect(),
            ),
            Ok(other) => Self::Diagnostic {
                identifier: format!(
                    "strategy descriptor is neither an object nor an array: {}",
                    json_type(&other)
                ),
            },
            Err(e) => Self::InvalidDescriptor {
                descriptor: descriptor.to_string(),
                error: e.to_string(),
            },
        }
    }

    /// Builds one strategy from a descriptor object
    pub fn from_args(args: Map<String, Value>) -> Self {
        let nature = match args.get("nature") {
            Some(Value::String(nature)) => nature.clone(),
            other => {
                let kind = other.map(json_type).unwrap_or("null");
                return Self::Diagnostic {
                    identifier: format!("nature is not a string: {kind}"),
                };
            }
        };

        let kind = match nature.as_str() {
            "diags" | "diagnostics" => {
                return match args.get(IDENTIFIER_ARG) {
                    Some(Value::String(identifier)) if !identifier.trim().is_empty() => {
                        Self::Diagnostic {
                            identifier: identifier.clone(),
                        }
                    }
                    _ => Self::diagnostic(),
                };
            }
            "fs" => SinkKind::LocalFs,
            "vfs" => SinkKind::VirtualFs,
            "aws-s3" => SinkKind::BlobStore,
            "email" => SinkKind::Email,
            _ => return Self::InvalidNature(nature),
        };

        Self::Sink(SinkStrategy::new(kind, args))
    }

    /// Class-style name used in logs and tests
    pub fn name(&self) -> &'static str {
        match self {
            Self::Diagnostic { .. } => "DiagnosticPersistence",
            Self::Sink(sink) => sink.kind.name(),
            Self::Aggregate(_) => "AggregatePersistence",
            Self::InvalidNature(_) => "InvalidPersistenceNature",
            Self::InvalidDescriptor { .. } => "InvalidPersistenceStrategy",
        }
    }

    /// Children of an aggregate, empty for every other variant
    pub fn children(&self) -> &[Arc<PersistenceStrategy>] {
        match self {
            Self::Aggregate(children) => children,
            _ => &[],
        }
    }

    /// Appends `always` to this strategy
    ///
    /// An aggregate gets `always` as its last child; anything else becomes
    /// a two-element aggregate.
    pub fn with_always(self, always: Arc<PersistenceStrategy>) -> Self {
        match self {
            Self::Aggregate(mut children) => {
                children.push(always);
                Self::Aggregate(children)
            }
            single => Self::Aggregate(vec![Arc::new(single), always]),
        }
    }
}

impl fmt::Display for PersistenceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diagnostic { identifier } => write!(f, "{}({identifier})", self.name()),
            Self::InvalidNature(nature) => write!(f, "{}({nature})", self.name()),
            Self::Aggregate(children) => write!(f, "{}[{}]", self.name(), children.len()),
            _ => f.write_str(self.name()),
        }
    }
}

/// The writing strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// `nature: "fs"`
    LocalFs,
    /// `nature: "vfs"`
    VirtualFs,
    /// `nature: "aws-s3"`
    BlobStore,
    /// `nature: "email"`
    Email,
}

impl SinkKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LocalFs => "LocalFsPersistence",
            Self::VirtualFs => "VirtualFsPersistence",
            Self::BlobStore => "BlobStorePersistence",
            Self::Email => "EmailPersistence",
        }
    }

    /// Descriptor fields that render a marker when absent
    fn required_args(&self) -> &'static [&'static str] {
        match self {
            Self::VirtualFs => &["vfsUri", ARTIFACT_ID_ARG],
            _ => &[ARTIFACT_ID_ARG],
        }
    }
}

/// A writing strategy with its descriptor arguments
#[derive(Debug, Clone)]
pub struct SinkStrategy {
    kind: SinkKind,
    args: Map<String, Value>,
    engine: InterpolateEngine,
}

impl SinkStrategy {
    pub fn new(kind: SinkKind, args: Map<String, Value>) -> Self {
        let engine = InterpolateEngine::from_json_args(&args, kind.required_args());
        Self { kind, args, engine }
    }

    pub fn kind(&self) -> SinkKind {
        self.kind
    }

    /// Raw descriptor arguments
    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    /// Raw text of argument `key`
    ///
    /// Strings are returned as-is; other non-null values as JSON text.
    pub fn arg(&self, key: &str) -> Option<String> {
        match self.args.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Interpolation engine seeded with the descriptor and the artifact id
    pub fn engine_for(&self, artifact: &Artifact) -> InterpolateEngine {
        self.engine
            .clone()
            .with_value(ARTIFACT_ID_ARG, artifact.id().as_str())
    }

    /// Interpolates argument `key`, or `default` when it is absent
    pub fn render(&self, artifact: &Artifact, key: &str, default: &str) -> String {
        let template = self.arg(key).unwrap_or_else(|| default.to_string());
        self.engine_for(artifact).interpolate(&template)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArtifactId;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(r#"{"nature": "diags"}"#, "DiagnosticPersistence" ; "diags")]
    #[test_case(r#"{"nature": "diagnostics"}"#, "DiagnosticPersistence" ; "diagnostics")]
    #[test_case(r#"{"nature": "fs", "fsPath": "/tmp/x"}"#, "LocalFsPersistence" ; "fs")]
    #[test_case(r#"{"nature": "vfs"}"#, "VirtualFsPersistence" ; "vfs")]
    #[test_case(r#"{"nature": "aws-s3"}"#, "BlobStorePersistence" ; "blob")]
    #[test_case(r#"{"nature": "email"}"#, "EmailPersistence" ; "email")]
    #[test_case(r#"{"nature": "bogus"}"#, "InvalidPersistenceNature" ; "unknown nature")]
    #[test_case("invalid json", "InvalidPersistenceStrategy" ; "invalid json")]
    #[test_case("[]", "AggregatePersistence" ; "empty array")]
    fn test_descriptor_dispatch(descriptor: &str, expected: &str) {
        assert_eq!(PersistenceStrategy::from_descriptor(descriptor).name(), expected);
    }

    #[test]
    fn test_invalid_nature_keeps_value() {
        match PersistenceStrategy::from_descriptor(r#"{"nature": "bogus"}"#) {
            PersistenceStrategy::InvalidNature(nature) => assert_eq!(nature, "bogus"),
            other => panic!("unexpected strategy {other}"),
        }
    }

    #[test]
    fn test_diagnostic_identifier() {
        match PersistenceStrategy::from_descriptor(r#"{"nature": "diags", "identifier": "audit"}"#) {
            PersistenceStrategy::Diagnostic { identifier } => assert_eq!(identifier, "audit"),
            other => panic!("unexpected strategy {other}"),
        }
        match PersistenceStrategy::from_descriptor(r#"{"nature": "diags", "identifier": ""}"#) {
            PersistenceStrategy::Diagnostic { identifier } => {
                assert_eq!(identifier, DIAGNOSTIC_IDENTIFIER)
            }
            other => panic!("unexpected strategy {other}"),
        }
    }

    #[test]
    fn test_non_string_nature_is_diagnostic() {
        match PersistenceStrategy::from_descriptor(r#"{"nature": 42}"#) {
            PersistenceStrategy::Diagnostic { identifier } => {
                assert_eq!(identifier, "nature is not a string: number")
            }
            other => panic!("unexpected strategy {other}"),
        }
        match PersistenceStrategy::from_descriptor(r#"{"fsPath": "/tmp"}"#) {
            PersistenceStrategy::Diagnostic { identifier } => {
                assert_eq!(identifier, "nature is not a string: null")
            }
            other => panic!("unexpected strategy {other}"),
        }
    }

    #[test]
    fn test_scalar_descriptor_is_diagnostic() {
        let strategy = PersistenceStrategy::from_descriptor("\"fs\"");
        assert!(matches!(
            strategy,
            PersistenceStrategy::Diagnostic { ref identifier }
                if identifier.ends_with("neither an object nor an array: string")
        ));
    }

    #[test]
    fn test_array_builds_children_in_order() {
        let strategy = PersistenceStrategy::from_descriptor(
            r#"[{"nature": "fs", "fsPath": "/tmp/${artifactId}.json"}, {"nature": "diagnostics"}, 7]"#,
        );
        let names: Vec<_> = strategy.children().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["LocalFsPersistence", "DiagnosticPersistence", "DiagnosticPersistence"]
        );
    }

    #[test]
    fn test_with_always() {
        let always = Arc::new(PersistenceStrategy::diagnostic());

        let single = PersistenceStrategy::from_descriptor(r#"{"nature": "fs"}"#)
            .with_always(Arc::clone(&always));
        assert_eq!(single.children().len(), 2);
        assert!(Arc::ptr_eq(&single.children()[1], &always));

        let aggregate = PersistenceStrategy::from_descriptor(r#"[{"nature": "fs"}, {"nature": "vfs"}]"#)
            .with_always(Arc::clone(&always));
        assert_eq!(aggregate.children().len(), 3);
    }

    #[test]
    fn test_sink_render_uses_artifact_id() {
        let args = json!({"nature": "fs", "fsPath": "/data/${artifactId}.json", "retries": 3});
        let sink = SinkStrategy::new(SinkKind::LocalFs, args.as_object().unwrap().clone());
        let artifact = Artifact::new(ArtifactId::new("abc").unwrap(), "test", "{}", None);

        assert_eq!(sink.render(&artifact, "fsPath", "unused"), "/data/abc.json");
        assert_eq!(sink.render(&artifact, "missing", "${artifactId}.bak"), "abc.bak");
        assert_eq!(sink.arg("retries").as_deref(), Some("3"));
        assert_eq!(sink.arg("nature").as_deref(), Some("fs"));
    }
}
