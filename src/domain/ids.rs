//! Domain identifier types with validation
//!
//! Newtype wrappers that keep interaction and artifact identifiers from being
//! mixed up with arbitrary strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Interaction identifier newtype wrapper
///
/// One is generated per inbound interaction at ingress entry.
///
/// # Examples
///
/// ```
/// use nexus_ingest::domain::ids::InteractionId;
///
/// let id = InteractionId::generate();
/// assert_eq!(id.as_str().len(), 36);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionId(String);

impl InteractionId {
    /// Creates an InteractionId from an existing identifier
    ///
    /// # Returns
    ///
    /// Returns `Ok(InteractionId)` if the ID is non-blank, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Interaction ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Generates a fresh random (v4 UUID) interaction ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the interaction ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for InteractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InteractionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for InteractionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Artifact identifier newtype wrapper
///
/// Used as the `artifactId` placeholder when sink paths are interpolated, so
/// it must not be blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Creates a new ArtifactId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Artifact ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the artifact ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&InteractionId> for ArtifactId {
    fn from(id: &InteractionId) -> Self {
        Self(id.as_str().to_string())
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArtifactId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ArtifactId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
