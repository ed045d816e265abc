/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Canonical CloudFront policy documents.
//!
//! CloudFront verifies the signature against the exact bytes of the policy it
//! decodes, so the JSON written here is compact and its key order is fixed:
//! `Statement` → `Resource` → `Condition` → `DateLessThan` →
//! `DateGreaterThan` → `IpAddress`.
//!
//! The output is pure ASCII: characters outside it are written as `\uXXXX`
//! escapes (UTF-16 surrogate pairs above U+FFFF), matching the policies
//! produced by the AWS SDKs for Python and Java.

use crate::encoding;
use crate::error::{ErrorKind, SigningError};
use aws_smithy_json::serialize::JsonObjectWriter;
use aws_smithy_types::{DateTime, Number};
use url::Url;

/// A single-statement CloudFront policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    resource: String,
    expires_at: u64,
    starts_at: Option<u64>,
    ip_range: Option<String>,
}

/// Builds the policy that grants access to `resource` until `expiry`.
///
/// The resulting statement has exactly one condition, `DateLessThan`.
pub fn build_policy(resource: &str, expiry: DateTime) -> Result<Policy, SigningError> {
    Policy::builder()
        .resource(resource)
        .expires_at(expiry)
        .build()
}

impl Policy {
    /// Creates a new builder.
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// The resource URL or pattern the policy covers.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The instant after which CloudFront rejects the credential.
    pub fn expires_at(&self) -> DateTime {
        DateTime::from_secs(self.expires_at as i64)
    }

    /// Returns true when the policy can be expressed in canned form.
    ///
    /// Canned policies carry only an expiry for one exact object, so any
    /// wildcard or extra condition forces the custom form.
    pub fn is_canned(&self) -> bool {
        self.starts_at.is_none() && self.ip_range.is_none() && !has_wildcard(&self.resource)
    }

    /// Serializes the policy to its canonical JSON form.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        let mut root = JsonObjectWriter::new(&mut out);

        let mut statement_array = root.key("Statement").start_array();
        let mut statement = statement_array.value().start_object();

        statement.key("Resource").string(&self.resource);

        let mut condition = statement.key("Condition").start_object();

        let mut date_less = condition.key("DateLessThan").start_object();
        date_less
            .key("AWS:EpochTime")
            .number(Number::PosInt(self.expires_at));
        date_less.finish();

        if let Some(starts) = self.starts_at {
            let mut date_greater = condition.key("DateGreaterThan").start_object();
            date_greater
                .key("AWS:EpochTime")
                .number(Number::PosInt(starts));
            date_greater.finish();
        }

        if let Some(ref ip) = self.ip_range {
            let mut ip_addr = condition.key("IpAddress").start_object();
            ip_addr.key("AWS:SourceIp").string(ip);
            ip_addr.finish();
        }

        condition.finish();
        statement.finish();
        statement_array.finish();
        root.finish();

        escape_non_ascii(out)
    }

    /// The exact bytes that get signed.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_json().into_bytes()
    }

    /// The policy in the form CloudFront expects in `Policy=` and `CloudFront-Policy`.
    pub fn to_cloudfront_base64(&self) -> String {
        encoding::encode(self.to_json().as_bytes())
    }
}

/// Builder for [`Policy`].
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    resource: Option<String>,
    expires_at: Option<DateTime>,
    starts_at: Option<DateTime>,
    ip_range: Option<String>,
}

impl PolicyBuilder {
    /// Sets the resource URL or wildcard pattern.
    pub fn resource(mut self, url: impl Into<String>) -> Self {
        self.resource = Some(url.into());
        self
    }

    /// Sets the expiry (`DateLessThan`).
    pub fn expires_at(mut self, time: DateTime) -> Self {
        self.expires_at = Some(time);
        self
    }

    /// Sets the activation time (`DateGreaterThan`).
    pub fn starts_at(mut self, time: DateTime) -> Self {
        self.starts_at = Some(time);
        self
    }

    /// Restricts the viewer's source address (`IpAddress`), in CIDR notation.
    pub fn ip_range(mut self, cidr: impl Into<String>) -> Self {
        self.ip_range = Some(cidr.into());
        self
    }

    /// Validates the inputs and builds the policy.
    pub fn build(self) -> Result<Policy, SigningError> {
        let resource = self.resource.unwrap_or_default();
        validate_resource(&resource)?;

        let expires_at = self
            .expires_at
            .ok_or_else(|| SigningError::invalid_input("expires_at is required"))?;
        let expires_epoch = epoch_secs(expires_at, "expires_at")?;

        let starts_epoch = match self.starts_at {
            Some(starts) => Some(epoch_secs(starts, "starts_at")?),
            None => None,
        };
        if let Some(starts) = starts_epoch {
            if starts >= expires_epoch {
                return Err(SigningError::invalid_policy(
                    "starts_at must be before expires_at",
                ));
            }
        }

        Ok(Policy {
            resource,
            expires_at: expires_epoch,
            starts_at: starts_epoch,
            ip_range: self.ip_range,
        })
    }
}

/// Rewrites every non-ASCII character (and DEL) of `json` as `\uXXXX`.
///
/// The JSON writer never emits these characters outside string values, so
/// escaping them keeps the document equivalent.
fn escape_non_ascii(json: String) -> String {
    if json.bytes().all(|b| b.is_ascii() && b != 0x7f) {
        return json;
    }
    let mut out = String::with_capacity(json.len() + 16);
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii() && c != '\u{7f}' {
            out.push(c);
            continue;
        }
        for unit in c.encode_utf16(&mut units) {
            out.push_str(&format!("\\u{unit:04x}"));
        }
    }
    out
}

fn epoch_secs(time: DateTime, field: &'static str) -> Result<u64, SigningError> {
    u64::try_from(time.secs()).map_err(|_| {
        SigningError::invalid_policy(format!("{field} must not precede the Unix epoch"))
    })
}

/// Returns true if `resource` contains a CloudFront wildcard.
pub(crate) fn has_wildcard(resource: &str) -> bool {
    resource.contains('*')
}

/// Checks that `resource` is a non-empty URL with a host.
///
/// Wildcards may appear anywhere, including the scheme and host, so they are
/// replaced with a plain character before the URL is parsed.
pub(crate) fn validate_resource(resource: &str) -> Result<(), SigningError> {
    if resource.is_empty() {
        return Err(SigningError::invalid_resource("resource must not be empty"));
    }
    if resource.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(SigningError::invalid_resource(
            "resource must not contain whitespace or control characters",
        ));
    }

    let candidate = resource.replace('*', "a");
    let url = Url::parse(&candidate).map_err(|e| {
        SigningError::new(
            ErrorKind::InvalidResource,
            Some(Box::new(e)),
            Some(format!("`{resource}` is not a valid URL").into()),
        )
    })?;
    if !url.has_host() {
        return Err(SigningError::invalid_resource(format!(
            "`{resource}` has no host"
        )));
    }
    Ok(())
}
