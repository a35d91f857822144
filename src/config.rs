//! Client configuration.
//!
//! [`ClientConfig`] collects every setting the client understands. Which
//! authentication mode it describes is decided by [`ClientConfig::auth_settings`]:
//! a client certificate or key selects mutual TLS, anything else selects the
//! encrypted-credential mode.

use crate::anchor::DEFAULT_PUBLIC_KEY_ENDPOINT;
use crate::credential::ApiKey;
use crate::error::{FirmaError, Result};
use crate::transport::{
    require_fields, require_present, AuthSettings, CredentialSettings, MutualTlsSettings,
    TransportFactory, DEFAULT_TIMEOUT_SECS,
};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration options for the client.
#[derive(Clone, Default)]
pub struct ClientConfig {
    /// Base URL of the signing service.
    pub base_url: Option<String>,
    /// Plaintext API key.
    pub api_key: Option<String>,
    /// Directory holding the public key or TLS material.
    pub certs_dir: Option<PathBuf>,
    /// CA certificate file name. In credential mode this is the local public
    /// key tried before the service endpoint.
    pub ca_cert: Option<String>,
    /// Client certificate file name (mutual TLS).
    pub client_cert: Option<String>,
    /// Client private key file name (mutual TLS).
    pub client_key: Option<String>,
    /// Request timeout (default: 10 seconds).
    pub timeout: Option<Duration>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// Path of the public-key endpoint (default: `/certs/http/public-key`).
    pub public_key_endpoint: Option<String>,
}

impl ClientConfig {
    /// Read configuration from the process environment.
    ///
    /// Recognized variables: `BASE_URL`, `API_KEY`, `CERTS_DIR`, `CA_CRT`,
    /// `CLIENT_CRT`, `CLIENT_KEY` and `TIMEOUT_SECS`. Blank values count as
    /// unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from any name-to-value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let timeout = match get("TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(raw.trim().parse().map_err(|_| {
                FirmaError::ConfigurationInvalid(format!(
                    "TIMEOUT_SECS must be a whole number of seconds, got {:?}",
                    raw
                ))
            })?)),
            None => None,
        };

        Ok(Self {
            base_url: get("BASE_URL"),
            api_key: get("API_KEY"),
            certs_dir: get("CERTS_DIR").map(PathBuf::from),
            ca_cert: get("CA_CRT"),
            client_cert: get("CLIENT_CRT"),
            client_key: get("CLIENT_KEY"),
            timeout,
            user_agent: None,
            public_key_endpoint: None,
        })
    }

    /// Returns true if the settings select mutual TLS.
    pub fn is_mutual_tls(&self) -> bool {
        present(&self.client_cert) || present(&self.client_key)
    }

    /// Resolve the authentication mode, checking that every parameter the
    /// mode needs is present.
    pub fn auth_settings(&self) -> Result<AuthSettings> {
        let base_url = text(&self.base_url);
        let api_key = text(&self.api_key);

        if self.is_mutual_tls() {
            let certs_dir = self
                .certs_dir
                .clone()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_default();
            require_present(&[
                ("BASE_URL", !base_url.is_empty()),
                ("API_KEY", !api_key.is_empty()),
                ("CERTS_DIR", !certs_dir.as_os_str().is_empty()),
                ("CA_CRT", present(&self.ca_cert)),
                ("CLIENT_CRT", present(&self.client_cert)),
                ("CLIENT_KEY", present(&self.client_key)),
            ])?;

            return Ok(AuthSettings::MutualTls(MutualTlsSettings {
                base_url: base_url.to_string(),
                api_key: ApiKey::new(api_key),
                certs_dir,
                ca_cert: text(&self.ca_cert).to_string(),
                client_cert: text(&self.client_cert).to_string(),
                client_key: text(&self.client_key).to_string(),
            }));
        }

        require_fields(&[("BASE_URL", base_url), ("API_KEY", api_key)])?;

        let public_key_file = match (&self.certs_dir, &self.ca_cert) {
            (Some(dir), Some(file)) if present(&self.ca_cert) => {
                Some((dir.clone(), file.trim().to_string()))
            }
            _ => None,
        };

        Ok(AuthSettings::Credential(CredentialSettings {
            base_url: base_url.to_string(),
            api_key: ApiKey::new(api_key),
            public_key_file,
        }))
    }

    /// A transport factory carrying this configuration's timeout, user agent
    /// and public-key endpoint.
    pub fn transport_factory(&self) -> TransportFactory {
        let mut factory = TransportFactory::new().timeout(
            self.timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        );
        if let Some(user_agent) = &self.user_agent {
            factory = factory.user_agent(user_agent.clone());
        }
        factory.public_key_endpoint(
            self.public_key_endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_PUBLIC_KEY_ENDPOINT.to_string()),
        )
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("certs_dir", &self.certs_dir)
            .field("ca_cert", &self.ca_cert)
            .field("client_cert", &self.client_cert)
            .field("client_key", &self.client_key)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("public_key_endpoint", &self.public_key_endpoint)
            .finish()
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.trim().is_empty())
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.base_url.is_none());
        assert!(config.timeout.is_none());
        assert!(!config.is_mutual_tls());
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("BASE_URL", "https://firma.test"),
            ("API_KEY", "key"),
            ("CERTS_DIR", "/certs"),
            ("CA_CRT", "ca.crt"),
            ("CLIENT_CRT", ""),
            ("TIMEOUT_SECS", "30"),
        ]))
        .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://firma.test"));
        assert_eq!(config.certs_dir, Some(PathBuf::from("/certs")));
        assert_eq!(config.client_cert, None);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_bad_timeout() {
        let err = ClientConfig::from_lookup(lookup(&[("TIMEOUT_SECS", "ten")])).unwrap_err();
        assert!(
            matches!(err, FirmaError::ConfigurationInvalid(msg) if msg.contains("TIMEOUT_SECS"))
        );
    }

    #[test]
    fn test_credential_mode_selected() {
        let config = ClientConfig {
            base_url: Some("https://firma.test".to_string()),
            api_key: Some("key".to_string()),
            certs_dir: Some(PathBuf::from("/certs")),
            ca_cert: Some("public.pem".to_string()),
            ..Default::default()
        };

        match config.auth_settings().unwrap() {
            AuthSettings::Credential(s) => {
                assert_eq!(s.base_url, "https://firma.test");
                assert_eq!(s.api_key.expose(), "key");
                assert_eq!(
                    s.public_key_file,
                    Some((PathBuf::from("/certs"), "public.pem".to_string()))
                );
            }
            other => panic!("expected credential mode, got {:?}", other),
        }
    }

    #[test]
    fn test_credential_mode_without_local_key() {
        let config = ClientConfig {
            base_url: Some("https://firma.test".to_string()),
            api_key: Some("key".to_string()),
            ca_cert: Some("public.pem".to_string()),
            ..Default::default()
        };

        match config.auth_settings().unwrap() {
            AuthSettings::Credential(s) => assert!(s.public_key_file.is_none()),
            other => panic!("expected credential mode, got {:?}", other),
        }
    }

    #[test]
    fn test_mutual_tls_mode_selected() {
        let config = ClientConfig {
            base_url: Some("https://firma.test".to_string()),
            api_key: Some("key".to_string()),
            certs_dir: Some(PathBuf::from("/certs")),
            ca_cert: Some("ca.crt".to_string()),
            client_cert: Some("client.crt".to_string()),
            client_key: Some("client.key".to_string()),
            ..Default::default()
        };

        assert!(config.is_mutual_tls());
        match config.auth_settings().unwrap() {
            AuthSettings::MutualTls(s) => {
                assert_eq!(s.certs_dir, PathBuf::from("/certs"));
                assert_eq!(s.client_key, "client.key");
            }
            other => panic!("expected mutual TLS mode, got {:?}", other),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_mutual_tls_keeps_non_utf8_certs_dir() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = PathBuf::from(OsStr::from_bytes(b"/etc/firma-\xff/certs"));
        let config = ClientConfig {
            base_url: Some("https://firma.test".to_string()),
            api_key: Some("key".to_string()),
            certs_dir: Some(dir.clone()),
            ca_cert: Some("ca.crt".to_string()),
            client_cert: Some("client.crt".to_string()),
            client_key: Some("client.key".to_string()),
            ..Default::default()
        };

        match config.auth_settings().unwrap() {
            AuthSettings::MutualTls(s) => assert_eq!(s.certs_dir, dir),
            other => panic!("expected mutual TLS mode, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_parameters_are_named() {
        let err = ClientConfig::default().auth_settings().unwrap_err();
        match err {
            FirmaError::ConfigurationInvalid(msg) => {
                assert!(msg.contains("BASE_URL"));
                assert!(msg.contains("API_KEY"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let config = ClientConfig {
            base_url: Some("https://firma.test".to_string()),
            api_key: Some("key".to_string()),
            client_cert: Some("client.crt".to_string()),
            ..Default::default()
        };
        let err = config.auth_settings().unwrap_err();
        match err {
            FirmaError::ConfigurationInvalid(msg) => {
                assert!(msg.contains("CERTS_DIR"));
                assert!(msg.contains("CLIENT_KEY"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ClientConfig {
            api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
