/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_cfg))]
/* End of automatically managed default lints */
//! CloudFront signed URL and signed cookie issuance.
//!
//! CloudFront serves restricted content only when the request carries a
//! policy, an RSA-SHA1 signature over that policy's exact bytes, and the ID
//! of the key pair that produced it. This crate builds all three.
//!
//! ```no_run
//! use aws_smithy_types::DateTime;
//! use cloudfront_signed_credentials::{issue_signed_cookies, PrivateKey};
//!
//! # fn example(pem: &[u8]) -> Result<(), cloudfront_signed_credentials::error::SigningError> {
//! let key = PrivateKey::from_pem(pem)?;
//! let cookies = issue_signed_cookies(
//!     &key,
//!     "K3M7WLN23IL48K",
//!     "https://d111111abcdef8.cloudfront.net/*",
//!     DateTime::from_secs(2_000_000_000),
//! )?;
//! println!("Cookie: {cookies}");
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

/// Issuer configuration.
pub mod config;
/// CloudFront-safe base64.
pub mod encoding;
/// Error types for CloudFront signing operations.
pub mod error;
mod key;
/// Canonical policy documents.
pub mod policy;
mod sign;

pub use config::{Issuer, IssuerConfig, IssuerConfigBuilder};
pub use key::{PrivateKey, Signature};
pub use policy::{build_policy, Policy};
pub use sign::{PolicyForm, SignedCookies, SignedUrl, SigningRequest, SigningRequestBuilder};

use aws_smithy_types::DateTime;
use error::SigningError;

/// Sign a CloudFront URL with canned or custom policy
pub fn sign_url(request: SigningRequest) -> Result<SignedUrl, SigningError> {
    request.sign_url()
}

/// Generate signed cookies with custom policy
pub fn sign_cookies(request: SigningRequest) -> Result<SignedCookies, SigningError> {
    request.sign_cookies()
}

/// Signs `resource_url` with an explicit policy covering it until `expiry`.
///
/// Appends `Policy`, `Signature` and `Key-Pair-Id` to the URL. The URL may
/// contain wildcards, in which case the policy covers every matching object.
///
/// `resource_url` is kept byte for byte in the result and `key_pair_id` is
/// copied as given, empty or not.
pub fn issue_signed_url(
    key: &PrivateKey,
    key_pair_id: &str,
    resource_url: &str,
    expiry: DateTime,
) -> Result<SignedUrl, SigningError> {
    let policy = build_policy(resource_url, expiry)?;
    sign::assemble_url(key, key_pair_id, resource_url, &policy, PolicyForm::Custom)
}

/// Signs `resource_url` with a canned policy.
///
/// Appends `Expires`, `Signature` and `Key-Pair-Id` to the URL. Fails with
/// [`InvalidResource`](error::ErrorKind::InvalidResource) if the URL contains a wildcard.
pub fn issue_canned_signed_url(
    key: &PrivateKey,
    key_pair_id: &str,
    resource_url: &str,
    expiry: DateTime,
) -> Result<SignedUrl, SigningError> {
    let policy = build_policy(resource_url, expiry)?;
    sign::assemble_url(key, key_pair_id, resource_url, &policy, PolicyForm::Canned)
}

/// Issues the three CloudFront cookies granting access to `resource_pattern` until `expiry`.
///
/// `key_pair_id` is opaque and becomes the `CloudFront-Key-Pair-Id` value
/// unchanged; no check is made that it names a registered key.
pub fn issue_signed_cookies(
    key: &PrivateKey,
    key_pair_id: &str,
    resource_pattern: &str,
    expiry: DateTime,
) -> Result<SignedCookies, SigningError> {
    let policy = build_policy(resource_pattern, expiry)?;
    sign::assemble_cookies(key, key_pair_id, &policy)
}
