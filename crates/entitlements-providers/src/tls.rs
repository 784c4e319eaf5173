// crates/entitlements-providers/src/tls.rs
// ============================================================================
// Module: Outbound HTTP Client
// Description: Process-wide reqwest client with deadline and TLS material.
// Purpose: Validate PEM material at startup and build the shared client.
// Dependencies: entitlements-config, reqwest, rustls-pki-types, thiserror
// ============================================================================

//! ## Overview
//! The shared client carries the per-call deadline used by every upstream
//! call. A configured CA certificate is added as an extra trust root; a
//! certificate/key pair is presented as the client identity (mutual TLS).
//! PEM material is parsed with `rustls-pki-types` first so that malformed
//! input fails startup with a precise message instead of an opaque builder
//! error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use entitlements_config::TlsPem;
use reqwest::Certificate;
use reqwest::Client;
use reqwest::Identity;
use rustls_pki_types::CertificateDer;
use rustls_pki_types::PrivateKeyDer;
use rustls_pki_types::pem::PemObject;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// User agent sent on outbound requests.
const USER_AGENT: &str = concat!("entitlements/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Outbound client construction failures.
#[derive(Debug, Error)]
pub enum ProviderInitError {
    /// TLS material is malformed or incomplete.
    #[error("invalid tls material: {0}")]
    Tls(String),
    /// The HTTP client could not be built.
    #[error("http client build failed: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Builds the shared outbound client.
///
/// # Errors
///
/// Returns [`ProviderInitError`] when PEM material is malformed, a
/// certificate is configured without a key (or the reverse), or the client
/// cannot be built.
pub fn build_http_client(pem: &TlsPem, timeout: Duration) -> Result<Client, ProviderInitError> {
    let mut builder = Client::builder().timeout(timeout).connect_timeout(timeout).user_agent(USER_AGENT);

    if let Some(ca) = &pem.ca {
        validate_certificates("ca certificate", ca)?;
        let roots = Certificate::from_pem_bundle(ca.as_bytes())
            .map_err(|err| ProviderInitError::Tls(format!("ca certificate: {err}")))?;
        for root in roots {
            builder = builder.add_root_certificate(root);
        }
    }

    match (&pem.cert, &pem.key) {
        (Some(cert), Some(key)) => {
            validate_certificates("client certificate", cert)?;
            PrivateKeyDer::from_pem_slice(key.as_bytes())
                .map_err(|err| ProviderInitError::Tls(format!("client key: {err}")))?;
            let identity = Identity::from_pem(format!("{cert}\n{key}").as_bytes())
                .map_err(|err| ProviderInitError::Tls(format!("client identity: {err}")))?;
            builder = builder.identity(identity);
        }
        (Some(_), None) => {
            return Err(ProviderInitError::Tls(
                "client certificate configured without a private key".to_string(),
            ));
        }
        (None, Some(_)) => {
            return Err(ProviderInitError::Tls(
                "private key configured without a client certificate".to_string(),
            ));
        }
        (None, None) => {}
    }

    builder.build().map_err(|err| ProviderInitError::Client(err.to_string()))
}

/// Requires at least one well-formed certificate in `pem`.
fn validate_certificates(label: &str, pem: &str) -> Result<(), ProviderInitError> {
    let certificates = CertificateDer::pem_slice_iter(pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ProviderInitError::Tls(format!("{label}: {err}")))?;
    if certificates.is_empty() {
        return Err(ProviderInitError::Tls(format!("{label}: no certificates found")));
    }
    Ok(())
}
