//! Transport construction.
//!
//! A [`Transport`] is an HTTP client bound to the service's base URL with a
//! fixed timeout and exactly one [`AuthMode`]:
//!
//! - **Credential**: the API key is encrypted with the service's public key
//!   and sent as `Authorization` on every request. The server is validated
//!   against the built-in roots.
//! - **Mutual TLS**: the client presents a certificate and key, validates the
//!   server against the configured CA only, and sends the plaintext API key
//!   as `Authorization` for service-level authorization.

use crate::anchor::{TrustAnchorLoader, DEFAULT_PUBLIC_KEY_ENDPOINT};
use crate::credential::{ApiKey, CredentialEncryptor, EncryptedCredential, RsaOaepEncryptor};
use crate::error::{FirmaError, Result};
use crate::paths::require_path;
use reqwest::header::HeaderValue;
use reqwest::{Client as HttpClient, ClientBuilder};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// How requests are authenticated. The two modes never mix on one client.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Encrypted API key in the `Authorization` header.
    Credential(EncryptedCredential),
    /// Client certificate at the TLS layer plus the plaintext API key.
    MutualTls {
        /// Key sent as `Authorization`.
        api_key: ApiKey,
    },
}

impl AuthMode {
    /// Short mode name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            AuthMode::Credential(_) => "credential",
            AuthMode::MutualTls { .. } => "mutual-tls",
        }
    }

    fn authorization(&self) -> &str {
        match self {
            AuthMode::Credential(credential) => credential.as_str(),
            AuthMode::MutualTls { api_key } => api_key.expose(),
        }
    }
}

/// Parameters for credential mode.
#[derive(Debug, Clone)]
pub struct CredentialSettings {
    /// Service base URL.
    pub base_url: String,
    /// Plaintext API key, encrypted during construction.
    pub api_key: ApiKey,
    /// Optional local public key, as (directory, file name).
    pub public_key_file: Option<(PathBuf, String)>,
}

/// Parameters for mutual TLS mode.
#[derive(Debug, Clone)]
pub struct MutualTlsSettings {
    /// Service base URL.
    pub base_url: String,
    /// Plaintext API key sent alongside the client certificate.
    pub api_key: ApiKey,
    /// Directory holding the three files below.
    pub certs_dir: PathBuf,
    /// CA certificate (bundle) file name.
    pub ca_cert: String,
    /// Client certificate file name (PEM).
    pub client_cert: String,
    /// Client private key file name (PEM).
    pub client_key: String,
}

/// Construction parameters for one of the two authentication modes.
#[derive(Debug, Clone)]
pub enum AuthSettings {
    /// Encrypted API key mode.
    Credential(CredentialSettings),
    /// Mutual TLS mode.
    MutualTls(MutualTlsSettings),
}

impl AuthSettings {
    /// The base URL of either mode.
    pub fn base_url(&self) -> &str {
        match self {
            AuthSettings::Credential(s) => &s.base_url,
            AuthSettings::MutualTls(s) => &s.base_url,
        }
    }
}

/// A ready HTTP client, base URL and authentication mode.
#[derive(Clone)]
pub struct Transport {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
    auth: AuthMode,
    authorization: HeaderValue,
}

impl Transport {
    /// Assemble a transport from an already configured HTTP client.
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        timeout: Duration,
        auth: AuthMode,
    ) -> Result<Self> {
        let mut authorization = HeaderValue::from_str(auth.authorization()).map_err(|_| {
            FirmaError::ConfigurationInvalid(
                "API key contains characters not allowed in an HTTP header".to_string(),
            )
        })?;
        authorization.set_sensitive(true);

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            auth,
            authorization,
        })
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request timeout applied to every call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Authentication mode of this transport.
    pub fn auth(&self) -> &AuthMode {
        &self.auth
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.http
    }

    pub(crate) fn authorization(&self) -> &HeaderValue {
        &self.authorization
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("auth", &self.auth)
            .finish()
    }
}

/// Builds [`Transport`]s.
///
/// The trust anchor chain and the encryptor can be replaced, which is how
/// tests substitute fixed keys or deterministic encryption.
pub struct TransportFactory {
    timeout: Duration,
    user_agent: String,
    public_key_endpoint: String,
    encryptor: Arc<dyn CredentialEncryptor>,
    anchor_loader: Option<TrustAnchorLoader>,
}

impl Default for TransportFactory {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("firma-rust/{}", env!("CARGO_PKG_VERSION")),
            public_key_endpoint: DEFAULT_PUBLIC_KEY_ENDPOINT.to_string(),
            encryptor: Arc::new(RsaOaepEncryptor),
            anchor_loader: None,
        }
    }
}

impl TransportFactory {
    /// Factory with the default timeout, encryptor and anchor chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header value.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the path the public key is downloaded from.
    pub fn public_key_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.public_key_endpoint = endpoint.into();
        self
    }

    /// Replace the credential encryptor.
    pub fn encryptor(mut self, encryptor: impl CredentialEncryptor + 'static) -> Self {
        self.encryptor = Arc::new(encryptor);
        self
    }

    /// Replace the default file-then-endpoint anchor chain.
    pub fn anchor_loader(mut self, loader: TrustAnchorLoader) -> Self {
        self.anchor_loader = Some(loader);
        self
    }

    /// Build a transport for whichever mode `settings` selects.
    pub async fn build(&self, settings: &AuthSettings) -> Result<Transport> {
        match settings {
            AuthSettings::Credential(s) => self.credential(s).await,
            AuthSettings::MutualTls(s) => self.mutual_tls(s),
        }
    }

    /// Credential mode: load the public key, encrypt the API key once.
    pub async fn credential(&self, settings: &CredentialSettings) -> Result<Transport> {
        require_fields(&[
            ("base_url", settings.base_url.as_str()),
            ("api_key", settings.api_key.expose()),
        ])?;

        let http = self
            .http_builder()
            .build()
            .map_err(|e| FirmaError::ConfigurationInvalid(e.to_string()))?;

        let anchor = match &self.anchor_loader {
            Some(loader) => loader.load().await?,
            None => {
                TrustAnchorLoader::standard(
                    settings.public_key_file.clone(),
                    http.clone(),
                    &settings.base_url,
                    &self.public_key_endpoint,
                )
                .load()
                .await?
            }
        };

        let credential = self
            .encryptor
            .encrypt(settings.api_key.expose(), &anchor)?;
        drop(anchor);

        info!(base_url = %settings.base_url, mode = "credential", "transport ready");
        Transport::new(
            http,
            settings.base_url.clone(),
            self.timeout,
            AuthMode::Credential(credential),
        )
    }

    /// Mutual TLS mode: read the CA, client certificate and key, and pin the
    /// connection to them.
    pub fn mutual_tls(&self, settings: &MutualTlsSettings) -> Result<Transport> {
        require_present(&[
            ("base_url", filled(&settings.base_url)),
            ("api_key", filled(settings.api_key.expose())),
            ("certs_dir", !settings.certs_dir.as_os_str().is_empty()),
            ("ca_cert", filled(&settings.ca_cert)),
            ("client_cert", filled(&settings.client_cert)),
            ("client_key", filled(&settings.client_key)),
        ])?;

        let dir = &settings.certs_dir;
        let cert = read_material(&dir.join(&settings.client_cert))?;
        let key = read_material(&dir.join(&settings.client_key))?;
        let ca = read_material(&dir.join(&settings.ca_cert))?;

        let roots = parse_ca_bundle(&ca)?;

        let mut identity_pem = cert.clone();
        identity_pem.push(b'\n');
        identity_pem.extend_from_slice(&key);
        let identity = reqwest::Identity::from_pem(&identity_pem)
            .map_err(|e| FirmaError::CertificateInvalid(format!("client identity: {}", e)))?;
        check_key_pair(&cert, &key)?;

        let mut builder = self
            .http_builder()
            .tls_built_in_root_certs(false)
            .identity(identity);
        for root in roots {
            builder = builder.add_root_certificate(root);
        }
        let http = builder
            .build()
            .map_err(|e| FirmaError::CertificateInvalid(format!("TLS context: {}", e)))?;

        info!(base_url = %settings.base_url, mode = "mutual-tls", "transport ready");
        Transport::new(
            http,
            settings.base_url.clone(),
            self.timeout,
            AuthMode::MutualTls {
                api_key: settings.api_key.clone(),
            },
        )
    }

    fn http_builder(&self) -> ClientBuilder {
        HttpClient::builder()
            .use_rustls_tls()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
    }
}

impl fmt::Debug for TransportFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportFactory")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("public_key_endpoint", &self.public_key_endpoint)
            .field("anchor_loader", &self.anchor_loader)
            .finish()
    }
}

/// Fail with the names of every blank field.
pub(crate) fn require_fields(fields: &[(&str, &str)]) -> Result<()> {
    let present: Vec<(&str, bool)> = fields
        .iter()
        .map(|(name, value)| (*name, filled(value)))
        .collect();
    require_present(&present)
}

/// Fail with the names of every field marked absent.
pub(crate) fn require_present(fields: &[(&str, bool)]) -> Result<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FirmaError::ConfigurationInvalid(format!(
            "missing required parameters: {}",
            missing.join(", ")
        )))
    }
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

fn read_material(path: &Path) -> Result<Vec<u8>> {
    let path =
        require_path(path).map_err(|e| FirmaError::CertificateUnavailable(e.to_string()))?;
    std::fs::read(&path).map_err(|e| {
        FirmaError::CertificateUnavailable(format!("could not read {}: {}", path.display(), e))
    })
}

/// Check that an RSA client key belongs to the client certificate.
///
/// Non-RSA pairs are left to the TLS handshake, where a mismatch surfaces as
/// a connection failure.
fn check_key_pair(cert_pem: &[u8], key_pem: &[u8]) -> Result<()> {
    let chain = Certificate::load_pem_chain(cert_pem)
        .map_err(|e| FirmaError::CertificateInvalid(format!("client certificate: {}", e)))?;
    let Some(leaf) = chain.into_iter().next() else {
        return Err(FirmaError::CertificateInvalid(
            "client certificate file holds no certificates".to_string(),
        ));
    };
    let spki = leaf
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| FirmaError::CertificateInvalid(format!("client certificate: {}", e)))?;

    let cert_key = RsaPublicKey::from_public_key_der(&spki).ok();
    let private_key = std::str::from_utf8(key_pem).ok().and_then(|text| {
        let text = text.trim();
        RsaPrivateKey::from_pkcs8_pem(text)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(text))
            .ok()
    });

    match (cert_key, private_key) {
        (Some(public), Some(private)) if RsaPublicKey::from(&private) == public => Ok(()),
        (None, None) => Ok(()),
        _ => Err(FirmaError::CertificateInvalid(
            "client key does not match client certificate".to_string(),
        )),
    }
}

/// Parse a PEM bundle or a single DER certificate into TLS roots.
fn parse_ca_bundle(bytes: &[u8]) -> Result<Vec<reqwest::Certificate>> {
    let is_pem = bytes
        .windows(b"-----BEGIN".len())
        .any(|w| w == b"-----BEGIN");

    let certs = if is_pem {
        Certificate::load_pem_chain(bytes)
            .map_err(|e| FirmaError::CertificateInvalid(format!("CA certificate: {}", e)))?
    } else {
        vec![Certificate::from_der(bytes)
            .map_err(|e| FirmaError::CertificateInvalid(format!("CA certificate: {}", e)))?]
    };

    if certs.is_empty() {
        return Err(FirmaError::CertificateInvalid(
            "CA certificate file holds no certificates".to_string(),
        ));
    }

    certs
        .iter()
        .map(|cert| {
            let der = cert
                .to_der()
                .map_err(|e| FirmaError::CertificateInvalid(e.to_string()))?;
            reqwest::Certificate::from_der(&der)
                .map_err(|e| FirmaError::CertificateInvalid(e.to_string()))
        })
        .collect()
}
