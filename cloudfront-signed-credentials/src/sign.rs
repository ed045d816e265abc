/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::error::{ErrorKind, SigningError};
use crate::key::PrivateKey;
use crate::policy::{self, Policy};
use aws_smithy_async::time::SharedTimeSource;
use aws_smithy_types::DateTime;
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

const COOKIE_POLICY: &str = "CloudFront-Policy";
const COOKIE_SIGNATURE: &str = "CloudFront-Signature";
const COOKIE_KEY_PAIR_ID: &str = "CloudFront-Key-Pair-Id";

const PARAM_POLICY: &str = "Policy";
const PARAM_EXPIRES: &str = "Expires";
const PARAM_SIGNATURE: &str = "Signature";
const PARAM_KEY_PAIR_ID: &str = "Key-Pair-Id";

/// How the policy travels in a signed URL.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolicyForm {
    /// The encoded policy is sent in the `Policy` query parameter.
    #[default]
    Custom,
    /// Only the expiry is sent, in the `Expires` query parameter.
    ///
    /// CloudFront rebuilds the policy from the URL itself, so this form is
    /// limited to one exact object with no extra conditions.
    Canned,
}

#[derive(Debug, Clone)]
enum Expiration {
    DateTime(DateTime),
    Duration(Duration),
}

/// Request to sign a CloudFront URL or generate signed cookies.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub(crate) resource_url: String,
    pub(crate) resource_pattern: Option<String>,
    pub(crate) key_pair_id: String,
    pub(crate) private_key: PrivateKey,
    pub(crate) expiration: DateTime,
    pub(crate) active_date: Option<DateTime>,
    pub(crate) ip_range: Option<String>,
    pub(crate) policy_form: PolicyForm,
}

impl SigningRequest {
    /// Creates a new builder for constructing a signing request.
    pub fn builder() -> SigningRequestBuilder {
        SigningRequestBuilder::default()
    }

    /// The absolute expiry of the credentials this request issues.
    pub fn expiration(&self) -> DateTime {
        self.expiration
    }
}

/// Builder for [`SigningRequest`].
#[derive(Default, Debug)]
pub struct SigningRequestBuilder {
    resource_url: Option<String>,
    resource_pattern: Option<String>,
    key_pair_id: Option<String>,
    private_key: Option<PrivateKey>,
    expiration: Option<Expiration>,
    active_date: Option<DateTime>,
    ip_range: Option<String>,
    policy_form: PolicyForm,
    time_source: Option<SharedTimeSource>,
}

impl SigningRequestBuilder {
    /// Sets the CloudFront resource URL to sign.
    pub fn resource_url(mut self, url: impl Into<String>) -> Self {
        self.resource_url = Some(url.into());
        self
    }

    /// Sets a wildcard pattern for the policy's `Resource` field.
    ///
    /// Use this when the signed URL should grant access to every resource
    /// matching a pattern. If not set, `resource_url` is used in the policy.
    ///
    /// ```
    /// use aws_smithy_types::DateTime;
    /// use cloudfront_signed_credentials::{sign_url, PrivateKey, SigningRequest};
    ///
    /// let key = PrivateKey::from_pem(include_bytes!("../tests/fixtures/rsa-2048.pem"))?;
    /// let request = SigningRequest::builder()
    ///     .resource_url("https://d111111abcdef8.cloudfront.net/videos/intro.mp4")
    ///     .resource_pattern("https://d111111abcdef8.cloudfront.net/videos/*")
    ///     .key_pair_id("K3M7WLN23IL48K")
    ///     .private_key(key)
    ///     .expires_at(DateTime::from_secs(2_000_000_000))
    ///     .build()?;
    /// let url = sign_url(request)?;
    ///
    /// assert!(url.as_str().starts_with("https://d111111abcdef8.cloudfront.net/videos/intro.mp4?Policy="));
    /// # Ok::<(), cloudfront_signed_credentials::error::SigningError>(())
    /// ```
    pub fn resource_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.resource_pattern = Some(pattern.into());
        self
    }

    /// Sets the CloudFront key pair ID.
    ///
    /// Required. The value is opaque and copied into the credentials as
    /// given, so an empty ID is accepted here just as it is by
    /// [`issue_signed_url`](crate::issue_signed_url) and friends.
    pub fn key_pair_id(mut self, id: impl Into<String>) -> Self {
        self.key_pair_id = Some(id.into());
        self
    }

    /// Sets the private key for signing.
    pub fn private_key(mut self, key: PrivateKey) -> Self {
        self.private_key = Some(key);
        self
    }

    /// Sets an absolute expiration time.
    pub fn expires_at(mut self, time: DateTime) -> Self {
        self.expiration = Some(Expiration::DateTime(time));
        self
    }

    /// Sets a relative expiration time from now.
    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.expiration = Some(Expiration::Duration(duration));
        self
    }

    /// Sets an activation time (not-before date) for custom policy.
    pub fn active_at(mut self, time: DateTime) -> Self {
        self.active_date = Some(time);
        self
    }

    /// Sets an IP range restriction (CIDR notation) for custom policy.
    pub fn ip_range(mut self, cidr: impl Into<String>) -> Self {
        self.ip_range = Some(cidr.into());
        self
    }

    /// Selects the policy form used by [`SigningRequest::sign_url`].
    ///
    /// Signed cookies always carry the custom policy.
    pub fn policy_form(mut self, form: PolicyForm) -> Self {
        self.policy_form = form;
        self
    }

    /// Sets the clock that `expires_in` is measured from.
    pub fn time_source(mut self, time_source: SharedTimeSource) -> Self {
        self.time_source = Some(time_source);
        self
    }

    /// Builds the signing request.
    pub fn build(self) -> Result<SigningRequest, SigningError> {
        let resource_url = self
            .resource_url
            .ok_or_else(|| SigningError::invalid_input("resource_url is required"))?;
        policy::validate_resource(&resource_url)?;
        if let Some(ref pattern) = self.resource_pattern {
            policy::validate_resource(pattern)?;
        }

        let key_pair_id = self
            .key_pair_id
            .ok_or_else(|| SigningError::invalid_input("key_pair_id is required"))?;

        let private_key = self
            .private_key
            .ok_or_else(|| SigningError::invalid_input("private_key is required"))?;

        let expiration = self.expiration.ok_or_else(|| {
            SigningError::invalid_input("expiration is required (use expires_at or expires_in)")
        })?;

        let expiration = match expiration {
            Expiration::DateTime(dt) => dt,
            Expiration::Duration(dur) => {
                let time_source = self.time_source.unwrap_or_default();
                expiry_after(DateTime::from(time_source.now()), dur)?
            }
        };

        if let Some(active) = self.active_date {
            if active.secs() >= expiration.secs() {
                return Err(SigningError::invalid_policy(
                    "active_at must be before expiration",
                ));
            }
        }

        if self.policy_form == PolicyForm::Canned {
            if policy::has_wildcard(&resource_url) {
                return Err(SigningError::invalid_resource(
                    "canned policies cannot cover a wildcard resource",
                ));
            }
            if self.resource_pattern.is_some()
                || self.active_date.is_some()
                || self.ip_range.is_some()
            {
                return Err(SigningError::invalid_policy(
                    "canned policies cannot carry a resource pattern, active date or IP range",
                ));
            }
        }

        Ok(SigningRequest {
            resource_url,
            resource_pattern: self.resource_pattern,
            key_pair_id,
            private_key,
            expiration,
            active_date: self.active_date,
            ip_range: self.ip_range,
            policy_form: self.policy_form,
        })
    }
}

/// `now + lifetime`, failing instead of wrapping when the sum leaves the
/// range of [`DateTime`].
pub(crate) fn expiry_after(now: DateTime, lifetime: Duration) -> Result<DateTime, SigningError> {
    i64::try_from(lifetime.as_secs())
        .ok()
        .and_then(|secs| now.secs().checked_add(secs))
        .map(DateTime::from_secs)
        .ok_or_else(|| SigningError::invalid_input("expires_in is too far in the future"))
}

/// A signed CloudFront URL.
///
/// The string form is exactly the resource URL the caller passed in with the
/// signing parameters appended. CloudFront compares it byte for byte against
/// the signed policy, so it is never normalized; [`SignedUrl::as_url`] offers
/// a parsed view for inspection.
#[derive(Debug, Clone)]
pub struct SignedUrl {
    raw: String,
    url: url::Url,
}

impl SignedUrl {
    pub(crate) fn new(raw: String) -> Result<Self, SigningError> {
        let url = url::Url::parse(&raw).map_err(|e| {
            SigningError::new(
                ErrorKind::InvalidResource,
                Some(Box::new(e)),
                Some("failed to parse URL".into()),
            )
        })?;
        Ok(Self { raw, url })
    }

    /// Returns the complete signed URL as a string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns a reference to the parsed URL.
    pub fn as_url(&self) -> &url::Url {
        &self.url
    }

    /// Consumes self and returns the parsed URL.
    ///
    /// Parsing normalizes the URL (host case, default port, dot segments,
    /// percent-encoding), so keep [`SignedUrl::as_str`] for the request.
    pub fn into_url(self) -> url::Url {
        self.url
    }

    /// Returns the value of one of the signing query parameters.
    pub fn query_param(&self, name: &str) -> Option<Cow<'_, str>> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for SignedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for SignedUrl {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl AsRef<url::Url> for SignedUrl {
    fn as_ref(&self) -> &url::Url {
        &self.url
    }
}

/// Signed cookies for CloudFront.
///
/// Always exactly three cookies: `CloudFront-Policy`, `CloudFront-Signature`
/// and `CloudFront-Key-Pair-Id`. CloudFront only honors them together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCookies {
    cookies: [(Cow<'static, str>, String); 3],
}

impl SignedCookies {
    /// Name of the cookie carrying the encoded policy.
    pub const POLICY: &'static str = COOKIE_POLICY;
    /// Name of the cookie carrying the encoded signature.
    pub const SIGNATURE: &'static str = COOKIE_SIGNATURE;
    /// Name of the cookie carrying the key pair ID.
    pub const KEY_PAIR_ID: &'static str = COOKIE_KEY_PAIR_ID;

    pub(crate) fn new(policy: String, signature: String, key_pair_id: String) -> Self {
        Self {
            cookies: [
                (Cow::Borrowed(COOKIE_POLICY), policy),
                (Cow::Borrowed(COOKIE_SIGNATURE), signature),
                (Cow::Borrowed(COOKIE_KEY_PAIR_ID), key_pair_id),
            ],
        }
    }

    /// Returns all cookies as name-value pairs.
    pub fn cookies(&self) -> &[(Cow<'static, str>, String)] {
        &self.cookies
    }

    /// Gets a specific cookie value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns an iterator over cookies.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(n, v)| (n.as_ref(), v.as_str()))
    }

    /// Number of cookies in the set. Always 3.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Always false; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Renders the cookies as a `Cookie` header value:
    /// `CloudFront-Policy=...; CloudFront-Signature=...; CloudFront-Key-Pair-Id=...`.
    pub fn to_header_value(&self) -> String {
        self.iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Renders an nginx `set` directive storing the header value in `$variable`.
    ///
    /// ```text
    /// set $CLOUDFRONT_SIGNED_COOKIES "CloudFront-Policy=...; CloudFront-Signature=...; CloudFront-Key-Pair-Id=...;";
    /// ```
    pub fn to_nginx_directive(&self, variable: &str) -> String {
        format!("set ${variable} \"{};\";", self.to_header_value())
    }
}

impl fmt::Display for SignedCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

impl<'a> IntoIterator for &'a SignedCookies {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl SigningRequest {
    pub(crate) fn sign_url(&self) -> Result<SignedUrl, SigningError> {
        let policy = self.build_policy()?;
        assemble_url(
            &self.private_key,
            &self.key_pair_id,
            &self.resource_url,
            &policy,
            self.policy_form,
        )
    }

    pub(crate) fn sign_cookies(&self) -> Result<SignedCookies, SigningError> {
        let policy = self.build_policy()?;
        assemble_cookies(&self.private_key, &self.key_pair_id, &policy)
    }

    fn build_policy(&self) -> Result<Policy, SigningError> {
        let policy_resource = self.resource_pattern.as_ref().unwrap_or(&self.resource_url);

        let mut builder = Policy::builder()
            .resource(policy_resource)
            .expires_at(self.expiration);

        if let Some(active) = self.active_date {
            builder = builder.starts_at(active);
        }
        if let Some(ref ip) = self.ip_range {
            builder = builder.ip_range(ip);
        }

        builder.build()
    }
}

/// Signs `policy` and appends the signing parameters to `resource_url`.
pub(crate) fn assemble_url(
    key: &PrivateKey,
    key_pair_id: &str,
    resource_url: &str,
    policy: &Policy,
    form: PolicyForm,
) -> Result<SignedUrl, SigningError> {
    if form == PolicyForm::Canned && !policy.is_canned() {
        return Err(if policy::has_wildcard(policy.resource()) {
            SigningError::invalid_resource("canned policies cannot cover a wildcard resource")
        } else {
            SigningError::invalid_policy("canned policies cannot carry extra conditions")
        });
    }

    let policy_json = policy.to_json();
    tracing::trace!(policy = %policy_json, "canonical policy");
    let signature = key.sign(policy_json.as_bytes())?.to_cloudfront_base64();

    let separator = if resource_url.contains('?') { "&" } else { "?" };

    let signed_url = match form {
        PolicyForm::Canned => format!(
            "{resource_url}{separator}{PARAM_EXPIRES}={}&{PARAM_SIGNATURE}={signature}&{PARAM_KEY_PAIR_ID}={key_pair_id}",
            policy.expires_at().secs(),
        ),
        PolicyForm::Custom => format!(
            "{resource_url}{separator}{PARAM_POLICY}={}&{PARAM_SIGNATURE}={signature}&{PARAM_KEY_PAIR_ID}={key_pair_id}",
            policy.to_cloudfront_base64(),
        ),
    };

    tracing::debug!(
        resource = %policy.resource(),
        key_pair_id = %key_pair_id,
        expires_at = policy.expires_at().secs(),
        form = ?form,
        "issued signed URL"
    );
    SignedUrl::new(signed_url)
}

/// Signs `policy` and packages it as the three CloudFront cookies.
pub(crate) fn assemble_cookies(
    key: &PrivateKey,
    key_pair_id: &str,
    policy: &Policy,
) -> Result<SignedCookies, SigningError> {
    let policy_json = policy.to_json();
    tracing::trace!(policy = %policy_json, "canonical policy");
    let signature = key.sign(policy_json.as_bytes())?;

    tracing::debug!(
        resource = %policy.resource(),
        key_pair_id = %key_pair_id,
        expires_at = policy.expires_at().secs(),
        "issued signed cookies"
    );
    Ok(SignedCookies::new(
        policy.to_cloudfront_base64(),
        signature.to_cloudfront_base64(),
        key_pair_id.to_owned(),
    ))
}
