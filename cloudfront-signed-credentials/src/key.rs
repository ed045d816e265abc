/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::encoding;
use crate::error::SigningError;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Sign, RsaPrivateKey};
use sha1::{Digest, Sha1};
use std::fmt;

/// DER-encoded `DigestInfo` length for SHA-1: 15 bytes of prefix plus the 20-byte digest.
const SHA1_DIGEST_INFO_LEN: usize = 35;

/// PKCS#1 v1.5 needs at least 11 bytes of padding around the `DigestInfo`.
const MIN_MODULUS_LEN: usize = SHA1_DIGEST_INFO_LEN + 11;

/// RSA private key for signing CloudFront URLs and cookies.
///
/// CloudFront only accepts RSASSA-PKCS1-v1_5 over SHA-1 for RSA key pairs,
/// so that is the only scheme this key signs with.
#[derive(Clone)]
pub struct PrivateKey {
    inner: Box<RsaPrivateKey>,
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("modulus_bits", &(self.inner.size() * 8))
            .finish_non_exhaustive()
    }
}

impl PrivateKey {
    /// Loads a private key from PEM-encoded bytes.
    ///
    /// Supports RSA keys in PKCS#1 (`BEGIN RSA PRIVATE KEY`) or PKCS#8
    /// (`BEGIN PRIVATE KEY`) format.
    pub fn from_pem(bytes: &[u8]) -> Result<Self, SigningError> {
        let pem_str = std::str::from_utf8(bytes).map_err(SigningError::invalid_key)?;

        if pem_str.contains("BEGIN RSA PRIVATE KEY") {
            let key = RsaPrivateKey::from_pkcs1_pem(pem_str).map_err(SigningError::invalid_key)?;
            return Self::from_rsa(key);
        }

        if pem_str.contains("BEGIN PRIVATE KEY") {
            let key = RsaPrivateKey::from_pkcs8_pem(pem_str).map_err(SigningError::invalid_key)?;
            return Self::from_rsa(key);
        }

        Err(SigningError::invalid_key(
            "Unsupported key format. Expected RSA in PKCS#1 or PKCS#8 PEM",
        ))
    }

    /// Loads a private key from PKCS#1 DER bytes.
    pub fn from_pkcs1_der(bytes: &[u8]) -> Result<Self, SigningError> {
        let key = RsaPrivateKey::from_pkcs1_der(bytes).map_err(SigningError::invalid_key)?;
        Self::from_rsa(key)
    }

    /// Builds a key from its modulus, public and private exponents, and primes.
    pub fn from_components(
        n: BigUint,
        e: BigUint,
        d: BigUint,
        primes: Vec<BigUint>,
    ) -> Result<Self, SigningError> {
        let key = RsaPrivateKey::from_components(n, e, d, primes)
            .map_err(SigningError::invalid_key)?;
        Self::from_rsa(key)
    }

    /// Wraps an already parsed RSA key, checking it can carry a SHA-1 signature.
    pub fn from_rsa(key: RsaPrivateKey) -> Result<Self, SigningError> {
        key.validate().map_err(SigningError::invalid_key)?;
        if key.size() < MIN_MODULUS_LEN {
            return Err(SigningError::invalid_key(format!(
                "RSA modulus of {} bits is too small for PKCS#1 v1.5 with SHA-1",
                key.size() * 8
            )));
        }
        Ok(Self {
            inner: Box::new(key),
        })
    }

    /// Size of the modulus, and therefore of every signature, in bytes.
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// Signs `message` with RSASSA-PKCS1-v1_5 over its SHA-1 digest.
    ///
    /// The scheme is deterministic: the same key and message always produce
    /// the same signature.
    pub fn sign(&self, message: &[u8]) -> Result<Signature, SigningError> {
        let digest = Sha1::digest(message);

        let signature = self
            .inner
            .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
            .map_err(SigningError::signing_failure)?;

        Ok(Signature(signature))
    }
}

/// A detached RSA-SHA1 signature over the exact bytes of one policy.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// The raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The signature in the form CloudFront expects in `Signature=` and `CloudFront-Signature`.
    pub fn to_cloudfront_base64(&self) -> String {
        encoding::encode(&self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature")
            .field(&self.to_cloudfront_base64())
            .finish()
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rsa::traits::PrivateKeyParts;

    const TEST_RSA_KEY_PEM: &[u8] = include_bytes!("../tests/fixtures/rsa-2048.pem");
    const TEST_RSA_PKCS8_PEM: &[u8] = include_bytes!("../tests/fixtures/rsa-2048-pkcs8.pem");
    const UNDERSIZED_RSA_KEY_PEM: &[u8] = include_bytes!("../tests/fixtures/rsa-256.pem");

    #[test]
    fn test_from_pem_invalid() {
        let err = PrivateKey::from_pem(b"invalid pem data").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
    }

    #[test]
    fn test_from_pem_not_utf8() {
        let err = PrivateKey::from_pem(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
    }

    #[test]
    fn test_pkcs1_parsing() {
        let key = PrivateKey::from_pem(TEST_RSA_KEY_PEM).expect("valid RSA key");
        assert_eq!(key.size(), 256);
    }

    #[test]
    fn test_pkcs8_parsing_matches_pkcs1() {
        let pkcs1 = PrivateKey::from_pem(TEST_RSA_KEY_PEM).unwrap();
        let pkcs8 = PrivateKey::from_pem(TEST_RSA_PKCS8_PEM).expect("valid PKCS#8 key");
        assert_eq!(
            pkcs1.sign(b"message").unwrap(),
            pkcs8.sign(b"message").unwrap()
        );
    }

    #[test]
    fn test_undersized_key_is_rejected() {
        let err = PrivateKey::from_pem(UNDERSIZED_RSA_KEY_PEM).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
    }

    #[test]
    fn test_truncated_der_is_rejected() {
        let err = PrivateKey::from_pkcs1_der(&[0x30, 0x82, 0x01]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
    }

    #[test]
    fn test_from_components_roundtrip() {
        let key = PrivateKey::from_pem(TEST_RSA_KEY_PEM).unwrap();
        let rebuilt = PrivateKey::from_components(
            key.inner.n().clone(),
            key.inner.e().clone(),
            key.inner.d().clone(),
            key.inner.primes().to_vec(),
        )
        .expect("valid components");
        assert_eq!(key.sign(b"abc").unwrap(), rebuilt.sign(b"abc").unwrap());
    }

    #[test]
    fn test_inconsistent_components_are_rejected() {
        let key = PrivateKey::from_pem(TEST_RSA_KEY_PEM).unwrap();
        let result = PrivateKey::from_components(
            key.inner.n().clone(),
            key.inner.e().clone(),
            key.inner.d().clone() + BigUint::from(2u8),
            key.inner.primes().to_vec(),
        );
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidKey);
    }

    #[test]
    fn test_sign_is_deterministic() {
        let key = PrivateKey::from_pem(TEST_RSA_KEY_PEM).unwrap();
        let first = key.sign(b"test message").expect("signing should succeed");
        let second = key.sign(b"test message").expect("signing should succeed");
        assert_eq!(first.as_bytes().len(), 256);
        assert_eq!(first, second);
    }

    #[test]
    fn test_debug_hides_key_material() {
        let key = PrivateKey::from_pem(TEST_RSA_KEY_PEM).unwrap();
        assert_eq!(
            format!("{key:?}"),
            "PrivateKey { modulus_bits: 2048, .. }"
        );
    }
}
