/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! CloudFront-safe base64.
//!
//! CloudFront parses the `Policy` and `Signature` values with the standard
//! base64 alphabet after reversing three substitutions that keep the output
//! safe in query strings and cookie values: `+` → `-`, `=` → `_`, `/` → `~`.

/// Encodes `data` with standard base64, then applies the CloudFront substitutions.
///
/// The output never contains `+`, `=` or `/`.
pub fn encode(data: &[u8]) -> String {
    base64_simd::STANDARD
        .encode_to_string(data)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '=' => '_',
            '/' => '~',
            other => other,
        })
        .collect()
}
