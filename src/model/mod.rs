pub mod analysis;
pub mod byte_size;
pub mod fit_note;

use crate::model::byte_size::ByteSize;
use crate::model::fit_note::FitNote;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("artifact id cannot be empty")]
    EmptyId,
    #[error("artifact id is not hexadecimal: {0}")]
    NotHex(String),
}

/// One row of the observation table, kept exactly as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelObservation {
    pub name: String,
    pub id: String,
    pub size: String,
    pub comment: String,
}

impl ModelObservation {
    pub fn new(
        name: impl ToString,
        id: impl ToString,
        size: impl ToString,
        comment: impl ToString,
    ) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            size: size.to_string(),
            comment: comment.to_string(),
        }
    }

    pub fn model_name(&self) -> ModelName {
        ModelName::parse(&self.name)
    }

    pub fn artifact_id(&self) -> Result<ArtifactId, ModelError> {
        ArtifactId::parse(&self.id)
    }

    pub fn parsed_size(&self) -> Option<ByteSize> {
        self.size.parse().ok()
    }

    pub fn fit_note(&self) -> FitNote {
        FitNote::from_comment(&self.comment)
    }
}

/// `hf.co/bartowski/Llama-3.2-1B-Instruct-GGUF:Q4_K_M` split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelName {
    pub namespace: Option<String>,
    pub name: String,
    pub tag: Option<String>,
}

impl ModelName {
    pub fn parse(full: &str) -> Self {
        let full = full.trim();
        let (path, tag) = match full.rsplit_once(':') {
            // A colon inside the namespace (a registry port) is not a tag.
            Some((path, tag)) if !tag.contains('/') && !tag.is_empty() => {
                (path, Some(tag.to_string()))
            }
            _ => (full, None),
        };
        let (namespace, name) = match path.rsplit_once('/') {
            Some((namespace, name)) => (Some(namespace.to_string()), name.to_string()),
            None => (None, path.to_string()),
        };
        Self {
            namespace,
            name,
            tag,
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(namespace) = &self.namespace {
            write!(f, "{}/", namespace)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        Ok(())
    }
}

/// Short content-hash prefix identifying one artifact revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn parse(id: &str) -> Result<Self, ModelError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ModelError::EmptyId);
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ModelError::NotHex(id.to_string()));
        }
        Ok(Self(id.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Either id may be the shorter prefix of the other.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        let prefix = prefix.trim().to_ascii_lowercase();
        !prefix.is_empty() && (self.0.starts_with(&prefix) || prefix.starts_with(&self.0))
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
