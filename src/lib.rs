//! # Firma Rust SDK
//!
//! Client for a remote digital-signature service: sign documents, compare
//! third-party signatures, and query the signatures and certificates a
//! document carries.
//!
//! The API key is never sent in the clear over an unauthenticated channel.
//! Two authentication modes are supported:
//!
//! - **Credential mode**: the service's RSA public key is read from a local
//!   file or, failing that, downloaded from `/certs/http/public-key`. The API
//!   key is encrypted once with RSA-OAEP (SHA-256) and the ciphertext is sent
//!   as `Authorization` on every request.
//! - **Mutual TLS mode**: the client presents a certificate and key and only
//!   trusts the configured CA.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use firma::{Client, ClientConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // BASE_URL, API_KEY and optionally CERTS_DIR / CA_CRT
//!     let client = Client::build(&ClientConfig::from_env()?).await?;
//!
//!     let document = std::fs::read("contract.pdf")?;
//!     let signed = client
//!         .documents()
//!         .sign(document, &json!({ "test": "ok" }), None)
//!         .await?;
//!
//!     let signatures = client.documents().signatures(signed, None).await?;
//!     println!("{}", signatures);
//!     Ok(())
//! }
//! ```
//!
//! ## Mutual TLS
//!
//! ```rust,no_run
//! use firma::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::build(&ClientConfig {
//!         base_url: Some("https://firma.example.com".to_string()),
//!         api_key: Some("my-api-key".to_string()),
//!         certs_dir: Some("/etc/firma/certs".into()),
//!         ca_cert: Some("ca.crt".to_string()),
//!         client_cert: Some("client.crt".to_string()),
//!         client_key: Some("client.key".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//!     let certificates = client
//!         .documents()
//!         .certificates(std::fs::read("contract.pdf")?, None)
//!         .await?;
//!     println!("{}", certificates);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, FirmaError>`:
//!
//! ```rust,no_run
//! use firma::{Client, FirmaError};
//!
//! # async fn run(client: Client, document: Vec<u8>) {
//! match client.documents().compare(document, None).await {
//!     Ok(result) => println!("Comparison: {}", result),
//!     Err(FirmaError::NoThirdPartySignature { .. }) => println!("No third-party signature"),
//!     Err(e) if e.status_code() == Some(401) => println!("Invalid API key"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! # }
//! ```

pub mod anchor;
pub mod client;
pub mod config;
pub mod credential;
pub mod documents;
pub mod error;
pub mod paths;
pub mod transport;
pub mod types;

// Re-export main types at the crate root
pub use anchor::{FileSource, RemoteSource, TrustAnchor, TrustAnchorLoader, TrustAnchorSource};
pub use client::Client;
pub use config::ClientConfig;
pub use credential::{ApiKey, CredentialEncryptor, EncryptedCredential, RsaOaepEncryptor};
pub use documents::DocumentsClient;
pub use error::{FirmaError, PathError, Result};
pub use paths::{require_path, require_paths, validate_paths};
pub use transport::{
    AuthMode, AuthSettings, CredentialSettings, MutualTlsSettings, Transport, TransportFactory,
};
pub use types::DocumentPayload;
