//! Credential material loading.
//!
//! The session treats certificates as opaque: DER bytes handed to the
//! transport engine, plus the SHA-256 fingerprint embedded in proposals so
//! the remote side knows which identity to expect from the handshake.

use std::fs;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors loading credential material from PEM files.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// The offending path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A PEM file did not contain what it should.
    #[error("invalid PEM in '{path}': {reason}")]
    InvalidPem {
        /// The offending path.
        path: String,
        /// What was wrong.
        reason: String,
    },
}

/// A certificate and private key for the transport engine's encryption
/// handshake.
///
/// The fingerprint is computed once at construction: SHA-256 over the
/// certificate DER, rendered as colon-separated uppercase hex pairs — the
/// standard session-description fingerprint form.
#[derive(Debug, Clone)]
pub struct CredentialMaterial {
    certificate_der: Vec<u8>,
    private_key_der: Vec<u8>,
    fingerprint: String,
}

impl CredentialMaterial {
    /// Load from PEM-encoded certificate and private key files.
    pub fn from_pem_files(cert_path: &str, key_path: &str) -> Result<Self, CredentialError> {
        let cert_pem = fs::read(cert_path).map_err(|source| CredentialError::Io {
            path: cert_path.to_string(),
            source,
        })?;
        let key_pem = fs::read(key_path).map_err(|source| CredentialError::Io {
            path: key_path.to_string(),
            source,
        })?;

        let certs = rustls_pemfile::certs(&mut &cert_pem[..])
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CredentialError::InvalidPem {
                path: cert_path.to_string(),
                reason: e.to_string(),
            })?;
        let certificate = certs.into_iter().next().ok_or_else(|| CredentialError::InvalidPem {
            path: cert_path.to_string(),
            reason: "no certificate found".to_string(),
        })?;

        let key = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|e| CredentialError::InvalidPem {
                path: key_path.to_string(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| CredentialError::InvalidPem {
                path: key_path.to_string(),
                reason: "no private key found".to_string(),
            })?;

        Ok(Self::from_der(certificate.to_vec(), key.secret_der().to_vec()))
    }

    /// Wrap already-decoded DER material.
    pub fn from_der(certificate_der: Vec<u8>, private_key_der: Vec<u8>) -> Self {
        let fingerprint = sha256_fingerprint(&certificate_der);
        Self { certificate_der, private_key_der, fingerprint }
    }

    /// The certificate DER bytes.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// The private key DER bytes.
    pub fn private_key_der(&self) -> &[u8] {
        &self.private_key_der
    }

    /// The certificate's SHA-256 fingerprint, colon-separated uppercase
    /// hex. This is what proposals built for this session embed.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn sha256_fingerprint(der: &[u8]) -> String {
    let digest = Sha256::digest(der);
    let pairs: Vec<String> = digest.iter().map(|b| format!("{b:02X}")).collect();
    pairs.join(":")
}
