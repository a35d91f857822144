//! Firma API client.
//!
//! The main entry point for interacting with the signing service.

use crate::config::ClientConfig;
use crate::credential::EncryptedCredential;
use crate::documents::DocumentsClient;
use crate::error::{FirmaError, Result};
use crate::transport::{AuthMode, AuthSettings, Transport, TransportFactory};
use crate::types::DocumentPayload;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Firma API client.
///
/// Holds one immutable [`Transport`]; cloning is cheap and clones share the
/// underlying connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use firma::{Client, ClientConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::build(&ClientConfig {
///         base_url: Some("https://firma.example.com".to_string()),
///         api_key: Some("my-api-key".to_string()),
///         ..Default::default()
///     })
///     .await?;
///
///     let signed = client
///         .documents()
///         .sign(std::fs::read("contract.pdf")?, &serde_json::json!({ "test": "ok" }), None)
///         .await?;
///     std::fs::write("contract.signed.pdf", signed)?;
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    transport: Transport,
}

impl Client {
    /// Build a client from configuration.
    ///
    /// Selects the authentication mode, then loads the public key and
    /// encrypts the API key (credential mode) or loads the TLS material
    /// (mutual TLS mode).
    pub async fn build(config: &ClientConfig) -> Result<Self> {
        let settings = config.auth_settings()?;
        Self::build_with(&settings, &config.transport_factory()).await
    }

    /// Build a client with an explicit factory, e.g. one carrying a custom
    /// trust anchor chain or encryptor.
    pub async fn build_with(settings: &AuthSettings, factory: &TransportFactory) -> Result<Self> {
        let transport = factory.build(settings).await?;
        Ok(Self::from_transport(transport))
    }

    /// Wrap an already built transport.
    pub fn from_transport(transport: Transport) -> Self {
        Self { transport }
    }

    /// Get the base URL for the API.
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// The authentication mode requests are sent with.
    pub fn auth_mode(&self) -> &AuthMode {
        self.transport.auth()
    }

    /// The encrypted API key, in credential mode.
    pub fn encrypted_credential(&self) -> Option<&EncryptedCredential> {
        match self.transport.auth() {
            AuthMode::Credential(credential) => Some(credential),
            AuthMode::MutualTls { .. } => None,
        }
    }

    /// The transport this client sends requests over.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Get the documents client for signing and verification operations.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # async fn run(client: firma::Client) -> firma::Result<()> {
    /// let signatures = client.documents().signatures(b"%PDF-1.7".to_vec(), None).await?;
    /// println!("{}", signatures);
    /// # Ok(())
    /// # }
    /// ```
    pub fn documents(&self) -> DocumentsClient {
        DocumentsClient::new(self.clone())
    }

    /// Send a multipart POST and return the response, whatever its status.
    ///
    /// Caller headers go first; the multipart content type and the
    /// authorization header of the transport mode override them.
    pub(crate) async fn post_multipart(
        &self,
        path: &str,
        payload: DocumentPayload,
        headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response> {
        let form = payload.into_form()?;

        let mut headers = headers.unwrap_or_default();
        headers.remove(CONTENT_TYPE);
        headers.remove(CONTENT_LENGTH);
        headers.remove(AUTHORIZATION);

        debug!(path, mode = self.transport.auth().name(), "sending document operation");

        let response = self
            .transport
            .http()
            .post(self.transport.url(path))
            .headers(headers)
            .multipart(form)
            .header(AUTHORIZATION, self.transport.authorization().clone())
            .send()
            .await?;

        debug!(path, status = response.status().as_u16(), "document operation answered");
        Ok(response)
    }

    /// Read a successful response as raw bytes.
    pub(crate) async fn read_bytes(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        if response.status().is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            Err(self.parse_error(response).await)
        }
    }

    /// Read a successful response as JSON. An empty body reads as `null`.
    pub(crate) async fn read_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            return Err(self.parse_error(response).await);
        }

        let body = response.bytes().await?;
        let body: &[u8] = if body.is_empty() { b"null" } else { &body };
        serde_json::from_slice(body).map_err(|e| FirmaError::Decode(e.to_string()))
    }

    pub(crate) async fn parse_error(&self, response: reqwest::Response) -> FirmaError {
        let status = response.status();
        let message = status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string();

        FirmaError::RemoteOperationFailed {
            status_code: Some(status.as_u16()),
            message,
            body: read_body_text(response).await,
        }
    }
}

/// Response body as text, or `None` when empty or unreadable.
pub(crate) async fn read_body_text(response: reqwest::Response) -> Option<String> {
    match response.bytes().await {
        Ok(bytes) if !bytes.is_empty() => Some(String::from_utf8_lossy(&bytes).into_owned()),
        _ => None,
    }
}
