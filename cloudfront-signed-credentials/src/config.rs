/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Issuer configuration.
//!
//! [`IssuerConfig`] holds the settings shared by every credential a
//! deployment hands out: the distribution domain, the key pair registered
//! with CloudFront, and how far in the future credentials expire.

use crate::error::{ErrorKind, SigningError};
use crate::key::PrivateKey;
use crate::policy;
use crate::sign::{self, PolicyForm, SignedCookies, SignedUrl};
use aws_smithy_async::time::SharedTimeSource;
use aws_smithy_types::DateTime;
use std::time::Duration;
use url::Url;

/// Default lifetime of issued credentials: 35 years.
pub const DEFAULT_EXPIRES_IN: Duration = Duration::from_secs(35 * 365 * 24 * 60 * 60);

/// Object requested by [`Issuer::signed_url`] when the path is empty.
pub const DEFAULT_OBJECT_PATH: &str = "index.html";

/// Settings for an [`Issuer`].
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    domain: Url,
    key_pair_id: String,
    expires_in: Duration,
    time_source: SharedTimeSource,
}

impl IssuerConfig {
    /// Creates a new builder.
    pub fn builder() -> IssuerConfigBuilder {
        IssuerConfigBuilder::default()
    }

    /// The distribution domain, e.g. `https://d111111abcdef8.cloudfront.net/`.
    pub fn domain(&self) -> &Url {
        &self.domain
    }

    /// The CloudFront public key ID.
    pub fn key_pair_id(&self) -> &str {
        &self.key_pair_id
    }

    /// Lifetime of issued credentials.
    pub fn expires_in(&self) -> Duration {
        self.expires_in
    }

    /// The absolute expiry for credentials issued right now.
    ///
    /// Fails with [`InvalidInput`](ErrorKind::InvalidInput) when the clock
    /// plus `expires_in` is past the last representable second.
    pub fn expiry(&self) -> Result<DateTime, SigningError> {
        sign::expiry_after(DateTime::from(self.time_source.now()), self.expires_in)
    }

    /// The wildcard pattern covering the whole distribution: `<domain>/*`.
    pub fn resource_pattern(&self) -> String {
        format!("{}*", self.base())
    }

    /// The URL of one object in the distribution.
    pub fn object_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        let path = if path.is_empty() {
            DEFAULT_OBJECT_PATH
        } else {
            path
        };
        format!("{}{path}", self.base())
    }

    fn base(&self) -> String {
        let domain = self.domain.as_str();
        if domain.ends_with('/') {
            domain.to_owned()
        } else {
            format!("{domain}/")
        }
    }
}

/// Builder for [`IssuerConfig`].
#[derive(Debug, Default)]
pub struct IssuerConfigBuilder {
    domain: Option<String>,
    key_pair_id: Option<String>,
    expires_in: Option<Duration>,
    time_source: Option<SharedTimeSource>,
}

impl IssuerConfigBuilder {
    /// Sets the distribution domain, including the scheme.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the CloudFront public key ID (`Key management -> Public keys -> ID`).
    ///
    /// Required, and copied into every credential as given.
    pub fn key_pair_id(mut self, id: impl Into<String>) -> Self {
        self.key_pair_id = Some(id.into());
        self
    }

    /// Sets the lifetime of issued credentials. Defaults to [`DEFAULT_EXPIRES_IN`].
    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.expires_in = Some(duration);
        self
    }

    /// Sets the clock used to compute expiries. Defaults to the system clock.
    pub fn time_source(mut self, time_source: SharedTimeSource) -> Self {
        self.time_source = Some(time_source);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<IssuerConfig, SigningError> {
        let domain = self
            .domain
            .ok_or_else(|| SigningError::invalid_input("domain is required"))?;
        if policy::has_wildcard(&domain) {
            return Err(SigningError::invalid_resource(
                "domain must not contain wildcards",
            ));
        }
        policy::validate_resource(&domain)?;
        let domain = Url::parse(&domain).map_err(|e| {
            SigningError::new(
                ErrorKind::InvalidResource,
                Some(Box::new(e)),
                Some("failed to parse domain".into()),
            )
        })?;
        if domain.query().is_some() || domain.fragment().is_some() {
            return Err(SigningError::invalid_resource(
                "domain must not carry a query or fragment",
            ));
        }

        let key_pair_id = self
            .key_pair_id
            .ok_or_else(|| SigningError::invalid_input("key_pair_id is required"))?;

        let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        if expires_in.as_secs() == 0 {
            return Err(SigningError::invalid_input(
                "expires_in must be at least one second",
            ));
        }
        if i64::try_from(expires_in.as_secs()).is_err() {
            return Err(SigningError::invalid_input(
                "expires_in is too far in the future",
            ));
        }

        Ok(IssuerConfig {
            domain,
            key_pair_id,
            expires_in,
            time_source: self.time_source.unwrap_or_default(),
        })
    }
}

/// Issues credentials for one distribution with one key.
///
/// Issuing is read-only on the key, so an `Issuer` can be shared between
/// threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Issuer {
    config: IssuerConfig,
    private_key: PrivateKey,
}

impl Issuer {
    /// Creates an issuer from its configuration and signing key.
    pub fn new(config: IssuerConfig, private_key: PrivateKey) -> Self {
        Self {
            config,
            private_key,
        }
    }

    /// The configuration this issuer was built with.
    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// Signed cookies granting access to the whole distribution.
    pub fn signed_cookies(&self) -> Result<SignedCookies, SigningError> {
        let policy =
            policy::build_policy(&self.config.resource_pattern(), self.config.expiry()?)?;
        sign::assemble_cookies(&self.private_key, &self.config.key_pair_id, &policy)
    }

    /// A canned signed URL for one object in the distribution.
    pub fn signed_url(&self, path: &str) -> Result<SignedUrl, SigningError> {
        let resource_url = self.config.object_url(path);
        let policy = policy::build_policy(&resource_url, self.config.expiry()?)?;
        sign::assemble_url(
            &self.private_key,
            &self.config.key_pair_id,
            &resource_url,
            &policy,
            PolicyForm::Canned,
        )
    }
}
