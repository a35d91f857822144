//! Mutual TLS handshakes against a local listener that requires a client
//! certificate signed by the test CA.

use firma::{Client, ClientConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::rustls::server::AllowAnyAuthenticatedClient;
use tokio_rustls::rustls::{Certificate, PrivateKey, RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;

const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
content-length: 11\r\nconnection: close\r\n\r\n{\"ok\":true}";

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mtls")
}

fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(fixtures().join(name)).unwrap()
}

/// What the listener saw on an accepted connection.
struct Accepted {
    client_certificates: usize,
    head: String,
}

fn server_config(cert: &str, key: &str) -> Arc<ServerConfig> {
    let mut roots = RootCertStore::empty();
    roots.add(&Certificate(fixture("ca.der"))).unwrap();

    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_client_cert_verifier(AllowAnyAuthenticatedClient::new(roots).boxed())
        .with_single_cert(vec![Certificate(fixture(cert))], PrivateKey(fixture(key)))
        .unwrap();
    Arc::new(config)
}

/// Serve a single request; `None` if the TLS handshake fails.
async fn serve_once(config: Arc<ServerConfig>) -> (u16, JoinHandle<Option<Accepted>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let acceptor = TlsAcceptor::from(config);

    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.ok()?;
        let mut tls = acceptor.accept(tcp).await.ok()?;
        let client_certificates = tls.get_ref().1.peer_certificates().map_or(0, |c| c.len());

        let head = read_request(&mut tls).await.ok()?;
        tls.write_all(RESPONSE).await.ok()?;
        tls.shutdown().await.ok()?;

        Some(Accepted {
            client_certificates,
            head,
        })
    });

    (port, handle)
}

/// Read one HTTP/1.1 request and return its lower-cased head.
async fn read_request<S: AsyncRead + Unpin>(stream: &mut S) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(String::from_utf8_lossy(&buf).to_ascii_lowercase());
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
        let body = &buf[end + 4..];

        let complete = if head.contains("transfer-encoding: chunked") {
            body.ends_with(b"0\r\n\r\n")
        } else {
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            body.len() >= length
        };
        if complete {
            return Ok(head);
        }
    }
}

fn mtls_config(port: u16) -> ClientConfig {
    ClientConfig {
        base_url: Some(format!("https://localhost:{}", port)),
        api_key: Some("plain-api-key".to_string()),
        certs_dir: Some(fixtures()),
        ca_cert: Some("ca.crt".to_string()),
        client_cert: Some("client.crt".to_string()),
        client_key: Some("client.key".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_handshake_presents_client_certificate() {
    let (port, server) = serve_once(server_config("server.der", "server.key.der")).await;

    let client = Client::build(&mtls_config(port)).await.unwrap();
    let result = client
        .documents()
        .signatures(b"%PDF-1.7".to_vec(), None)
        .await
        .unwrap();
    assert_eq!(result["ok"], true);

    let accepted = server.await.unwrap().expect("handshake should succeed");
    assert_eq!(accepted.client_certificates, 1);
    assert!(accepted.head.starts_with("post /get-data http/1.1"));
    assert!(accepted.head.contains("\r\nauthorization: plain-api-key"));
}

#[tokio::test]
async fn test_server_outside_configured_ca_is_rejected() {
    let (port, server) =
        serve_once(server_config("rogue-server.der", "rogue-server.key.der")).await;

    let client = Client::build(&mtls_config(port)).await.unwrap();
    let err = client
        .documents()
        .signatures(b"%PDF-1.7".to_vec(), None)
        .await
        .unwrap_err();

    assert!(err.is_remote());
    assert_eq!(err.status_code(), None);
    assert!(server.await.unwrap().is_none());
}
