//! Document operations.
//!
//! This module provides the DocumentsClient for signing documents and for
//! querying the signatures and certificates they carry. Every operation is a
//! single multipart POST; nothing is retried.

use crate::client::{read_body_text, Client};
use crate::error::{FirmaError, Result};
use crate::types::DocumentPayload;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Path of the sign operation.
pub const SIGN_PATH: &str = "/sign-doc";
/// Path of the compare operation.
pub const COMPARE_PATH: &str = "/compare";
/// Path of the signatures query.
pub const SIGNATURES_PATH: &str = "/get-data";
/// Path of the detailed signatures query.
pub const SIGNATURE_DETAILS_PATH: &str = "/get-data/full";
/// Path of the certificates query.
pub const CERTIFICATES_PATH: &str = "/get-data/certificados";

/// Client for document operations.
///
/// Access via `client.documents()`.
pub struct DocumentsClient {
    client: Client,
}

impl DocumentsClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Sign a document.
    ///
    /// # Arguments
    ///
    /// * `document` - The document bytes
    /// * `metadata` - Data sent alongside the document, serialized as compact JSON
    /// * `headers` - Extra request headers
    ///
    /// Returns the signed document.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use firma::{Client, ClientConfig};
    /// use serde_json::json;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = Client::build(&ClientConfig::from_env()?).await?;
    ///
    ///     let document = std::fs::read("contract.pdf")?;
    ///     let signed = client
    ///         .documents()
    ///         .sign(document, &json!({ "reason": "approval" }), None)
    ///         .await?;
    ///
    ///     std::fs::write("contract.signed.pdf", signed)?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn sign<M>(
        &self,
        document: impl Into<Vec<u8>>,
        metadata: &M,
        headers: Option<HeaderMap>,
    ) -> Result<Vec<u8>>
    where
        M: Serialize + ?Sized,
    {
        let payload = DocumentPayload::new(document).with_metadata(metadata)?;
        let response = self.client.post_multipart(SIGN_PATH, payload, headers).await?;
        self.client.read_bytes(response).await
    }

    /// Compare a document against its third-party signatures.
    ///
    /// A 422 answer means the document has no third-party signature to
    /// compare; it is reported as [`FirmaError::NoThirdPartySignature`].
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use firma::{Client, FirmaError};
    ///
    /// # async fn run(client: Client, document: Vec<u8>) -> firma::Result<()> {
    /// match client.documents().compare(document, None).await {
    ///     Ok(result) => println!("comparison: {}", result),
    ///     Err(FirmaError::NoThirdPartySignature { .. }) => println!("nothing to compare"),
    ///     Err(e) => return Err(e),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn compare(
        &self,
        document: impl Into<Vec<u8>>,
        headers: Option<HeaderMap>,
    ) -> Result<Value> {
        self.compare_as(document, headers).await
    }

    /// Like [`compare`](Self::compare), deserializing into `T`.
    pub async fn compare_as<T: DeserializeOwned>(
        &self,
        document: impl Into<Vec<u8>>,
        headers: Option<HeaderMap>,
    ) -> Result<T> {
        let response = self
            .client
            .post_multipart(COMPARE_PATH, DocumentPayload::new(document), headers)
            .await?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            warn!("no third-party signature to compare");
            return Err(FirmaError::NoThirdPartySignature {
                status_code: StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
                body: read_body_text(response).await,
            });
        }

        self.client.read_json(response).await
    }

    /// Get the signatures of a document.
    pub async fn signatures(
        &self,
        document: impl Into<Vec<u8>>,
        headers: Option<HeaderMap>,
    ) -> Result<Value> {
        self.query(SIGNATURES_PATH, document.into(), headers).await
    }

    /// Like [`signatures`](Self::signatures), deserializing into `T`.
    pub async fn signatures_as<T: DeserializeOwned>(
        &self,
        document: impl Into<Vec<u8>>,
        headers: Option<HeaderMap>,
    ) -> Result<T> {
        self.query(SIGNATURES_PATH, document.into(), headers).await
    }

    /// Get the full details of a document's signatures.
    pub async fn signature_details(
        &self,
        document: impl Into<Vec<u8>>,
        headers: Option<HeaderMap>,
    ) -> Result<Value> {
        self.query(SIGNATURE_DETAILS_PATH, document.into(), headers).await
    }

    /// Like [`signature_details`](Self::signature_details), deserializing into `T`.
    pub async fn signature_details_as<T: DeserializeOwned>(
        &self,
        document: impl Into<Vec<u8>>,
        headers: Option<HeaderMap>,
    ) -> Result<T> {
        self.query(SIGNATURE_DETAILS_PATH, document.into(), headers).await
    }

    /// Get the certificates associated with a document's signatures.
    pub async fn certificates(
        &self,
        document: impl Into<Vec<u8>>,
        headers: Option<HeaderMap>,
    ) -> Result<Value> {
        self.query(CERTIFICATES_PATH, document.into(), headers).await
    }

    /// Like [`certificates`](Self::certificates), deserializing into `T`.
    pub async fn certificates_as<T: DeserializeOwned>(
        &self,
        document: impl Into<Vec<u8>>,
        headers: Option<HeaderMap>,
    ) -> Result<T> {
        self.query(CERTIFICATES_PATH, document.into(), headers).await
    }

    async fn query<T: DeserializeOwned>(
        &self,
        path: &str,
        document: Vec<u8>,
        headers: Option<HeaderMap>,
    ) -> Result<T> {
        let response = self
            .client
            .post_multipart(path, DocumentPayload::new(document), headers)
            .await?;
        self.client.read_json(response).await
    }
}
