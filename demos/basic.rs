//! Basic usage example for the Firma SDK.
//!
//! This example demonstrates:
//! - Building a client from the environment
//! - Signing a document
//! - Comparing, listing signatures, signature details and certificates
//!
//! Documents are read from `TEST_DOCS_PATH`: `document.pdf` is signed into
//! `document_nuevo.pdf`; queries run against `document_firmado.pdf`.
//!
//! Run with:
//! ```bash
//! BASE_URL=https://firma.example.com API_KEY=xxx TEST_DOCS_PATH=./docs \
//!     cargo run --example basic -- sign
//! ```
//! Actions: `sign`, `compare`, `signatures`, `signature-details`, `certificates`.

use firma::{Client, ClientConfig, FirmaError};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let docs: PathBuf = std::env::var("TEST_DOCS_PATH")
        .expect("TEST_DOCS_PATH environment variable required")
        .into();
    let action = std::env::args().nth(1).unwrap_or_default();

    println!("Creating Firma client...");
    let client = Client::build(&ClientConfig::from_env()?).await?;
    println!("Client ready ({} mode).", client.auth_mode().name());

    let documents = client.documents();
    let signed_path = docs.join("document_firmado.pdf");

    match action.as_str() {
        "sign" => {
            let original = std::fs::read(docs.join("document.pdf"))?;
            let signed = documents.sign(original, &json!({ "test": "ok" }), None).await?;
            let output = docs.join("document_nuevo.pdf");
            std::fs::write(&output, &signed)?;
            println!("Signed document saved to {} ({} bytes)", output.display(), signed.len());
        }
        "compare" => match documents.compare(std::fs::read(&signed_path)?, None).await {
            Ok(result) => println!("Comparison result: {:#}", result),
            Err(FirmaError::NoThirdPartySignature { status_code, .. }) => {
                println!("Warning: document has no third-party signature ({})", status_code);
            }
            Err(e) => return Err(e.into()),
        },
        "signatures" => {
            let result = documents
                .signatures(std::fs::read(docs.join("document_nuevo.pdf"))?, None)
                .await?;
            println!("Signatures: {:#}", result);
        }
        "signature-details" => {
            let result = documents
                .signature_details(std::fs::read(&signed_path)?, None)
                .await?;
            println!("Signature details: {:#}", result);
        }
        "certificates" => {
            let result = documents
                .certificates(std::fs::read(&signed_path)?, None)
                .await?;
            println!("Certificates: {:#}", result);
        }
        _ => {
            let actions = "sign, compare, signatures, signature-details, certificates";
            println!("No action given. Use one of: {}.", actions);
        }
    }

    Ok(())
}
