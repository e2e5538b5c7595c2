//! Boundary to the external XML-DSig primitive.
//!
//! The cryptography itself (canonicalization, digest, RSA signature) is not
//! implemented here — it belongs to whatever XML-DSig library or HSM bridge
//! the caller wires in. This module only fixes the contract the placement
//! engine signs against.

use std::path::Path;

use crate::core::{DigestAlgorithm, NfseError};

/// Opaque, read-only credential handle. Loading and parsing the PKCS#12
/// material is the caller's concern; handles are created once per signing
/// session and passed into the signer implementation, never inspected here.
#[derive(Clone)]
pub struct CertificateHandle {
    bytes: Vec<u8>,
}

impl CertificateHandle {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for CertificateHandle {
    // Key material never lands in logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateHandle")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Load PKCS#12 key material from disk for a signing session.
///
/// Only the byte-level checks happen here; decrypting and parsing the
/// archive belongs to the [`XmlSigner`] implementation, which receives the
/// password alongside the handle. A missing or unreadable file and a blank
/// password both surface as [`NfseError::Certificate`].
pub fn load_certificate(
    path: impl AsRef<Path>,
    password: &str,
) -> Result<CertificateHandle, NfseError> {
    let path = path.as_ref();
    if password.is_empty() {
        return Err(NfseError::Certificate(
            "certificate password must not be empty".into(),
        ));
    }
    let bytes = std::fs::read(path).map_err(|e| {
        NfseError::Certificate(format!(
            "cannot read certificate file '{}': {e}",
            path.display()
        ))
    })?;
    if bytes.is_empty() {
        return Err(NfseError::Certificate(format!(
            "certificate file '{}' is empty",
            path.display()
        )));
    }
    Ok(CertificateHandle::new(bytes))
}

/// One signing request: the serialized target subtree (input to exclusive
/// canonicalization, no comments) and the `Id` the enveloped `Reference`
/// must point at.
#[derive(Debug, Clone)]
pub struct SignRequest<'a> {
    pub subtree_xml: &'a str,
    pub reference_id: &'a str,
    pub digest: DigestAlgorithm,
}

/// External XML-DSig signing primitive.
///
/// Implementations return a complete `<Signature>` element (as an XML
/// fragment) whose `Reference` carries `URI="#{reference_id}"`. The
/// placement engine verifies that invariant after parsing the fragment.
pub trait XmlSigner {
    fn sign(&self, request: &SignRequest<'_>) -> Result<String, NfseError>;
}
