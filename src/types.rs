//! Type definitions for the Firma SDK.
//!
//! Request payloads and the well-known multipart field names used by the
//! signing service.

use crate::error::{FirmaError, Result};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::fmt;

/// Multipart field carrying the document bytes.
pub const DOCUMENT_FIELD: &str = "documento";

/// Multipart field carrying the compact JSON metadata of a sign request.
pub const METADATA_FIELD: &str = "datos";

/// A document and, for signing, its metadata.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentPayload {
    document: Vec<u8>,
    metadata: Option<String>,
}

impl DocumentPayload {
    /// A payload carrying only the document.
    pub fn new(document: impl Into<Vec<u8>>) -> Self {
        Self {
            document: document.into(),
            metadata: None,
        }
    }

    /// Attach metadata, serialized as compact JSON.
    pub fn with_metadata<M>(mut self, metadata: &M) -> Result<Self>
    where
        M: Serialize + ?Sized,
    {
        let json = serde_json::to_string(metadata)
            .map_err(|e| FirmaError::Decode(format!("metadata is not serializable: {}", e)))?;
        self.metadata = Some(json);
        Ok(self)
    }

    /// The document bytes.
    pub fn document(&self) -> &[u8] {
        &self.document
    }

    /// The serialized metadata, if any.
    pub fn metadata_json(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    /// Build the multipart form: the document part, then the metadata part
    /// when present.
    pub(crate) fn into_form(self) -> Result<Form> {
        let document = Part::bytes(self.document).mime_str("application/octet-stream")?;
        let form = Form::new().part(DOCUMENT_FIELD, document);

        Ok(match self.metadata {
            Some(json) => form.text(METADATA_FIELD, json),
            None => form,
        })
    }
}

impl fmt::Debug for DocumentPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentPayload")
            .field("document", &format_args!("{} bytes", self.document.len()))
            .field("metadata", &self.metadata)
            .finish()
    }
}
