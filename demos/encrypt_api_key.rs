//! Encrypt an API key with the signing service's public key.
//!
//! The public key is read from `CERTS_DIR/CA_CRT` when both are set, and
//! downloaded from `BASE_URL` otherwise. The printed value can be used as a
//! pre-encrypted `Authorization` header.
//!
//! Run with:
//! ```bash
//! BASE_URL=https://firma.example.com cargo run --example encrypt_api_key -- <API_KEY>
//! ```

use firma::{Client, ClientConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(api_key) = std::env::args().nth(1) else {
        eprintln!("Usage: encrypt_api_key <API_KEY>");
        eprintln!("BASE_URL must be set in the environment.");
        std::process::exit(1);
    };

    let result = async {
        let mut config = ClientConfig::from_env()?;
        config.api_key = Some(api_key);
        // Credential mode only, whatever TLS files the environment names.
        config.client_cert = None;
        config.client_key = None;
        Client::build(&config).await
    }
    .await;

    match result {
        Ok(client) => match client.encrypted_credential() {
            Some(credential) => {
                println!("\n--- Encrypted API key (base64) ---");
                println!("{}", credential);
                println!("----------------------------------\n");
            }
            None => {
                eprintln!("Client was not built in credential mode");
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Could not encrypt the API key: {}", e);
            std::process::exit(1);
        }
    }
}
