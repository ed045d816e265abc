/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_smithy_types::DateTime;
use cloudfront_signed_credentials::error::ErrorKind;
use cloudfront_signed_credentials::{
    build_policy, issue_canned_signed_url, issue_signed_cookies, issue_signed_url, PrivateKey,
    SignedCookies,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const TEST_RSA_KEY: &[u8] = include_bytes!("fixtures/rsa-2048.pem");

const EXAMPLE_SIGNATURE: &str = "IKVj5siEA57K2czDwwQlr8LrbcwO89DRtYuj7Lnw5D4lIf5TkQP77YmTTTG-TaJOBytBkRcad67GRqyZmqGn-9CNOCL3o0H48q77H90uwoy-rSFWYiOkxUo-sjA1JRGhkMQW0zkDXSPDulKntLPPvHLfkzTVPF~L5k4cUdQstL77WUwKbEnRia5ZKIyeO7vuYE-Zu6YvCtapNk-hYVggOaaBaRgXbZcLSeoyDR-88LWotBt5H35TIszi4DYflS6CmG7YdRVzvLY~plGV8VqJ~174-Fhny5C9aqYxOOvOxvH9o70nTrajCcQ6~-zz1mB7V-0U7ehCOG40kpQ80831lA__";

fn key() -> PrivateKey {
    PrivateKey::from_pem(TEST_RSA_KEY).unwrap()
}

fn one_year_out() -> DateTime {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    DateTime::from_secs(now.as_secs() as i64 + 365 * 24 * 60 * 60)
}

#[test]
fn test_example_policy_signature() {
    let policy = build_policy("https://cdn.example.com/*", DateTime::from_secs(2_000_000_000))
        .unwrap();
    let signature = key().sign(&policy.to_bytes()).unwrap();
    assert_eq!(signature.to_cloudfront_base64(), EXAMPLE_SIGNATURE);
}

#[test]
fn test_signature_binds_to_expiry() {
    let key = key();
    let sign_at = |secs| {
        let policy = build_policy("https://cdn.example.com/*", DateTime::from_secs(secs)).unwrap();
        key.sign(&policy.to_bytes()).unwrap()
    };
    assert_ne!(sign_at(2_000_000_000), sign_at(2_000_000_001));
}

#[test]
fn test_sign_cookies_one_year_out() {
    let cookies = issue_signed_cookies(
        &key(),
        "K3M7WLN23IL48K",
        "https://cdn.example.com/*",
        one_year_out(),
    )
    .unwrap();

    let names: BTreeSet<&str> = cookies.iter().map(|(name, _)| name).collect();
    assert_eq!(
        names,
        BTreeSet::from([
            SignedCookies::POLICY,
            SignedCookies::SIGNATURE,
            SignedCookies::KEY_PAIR_ID,
        ])
    );
    for (_, value) in cookies.iter() {
        assert!(!value.contains(&['+', '=', '/'][..]), "{value}");
    }
}

#[test]
fn test_cookie_set_is_always_complete() {
    let key = key();
    for (resource, key_pair_id) in [
        ("https://cdn.example.com/*", "K3M7WLN23IL48K"),
        ("https://cdn.example.com/index.html", "APKAEXAMPLE"),
        ("https://*.example.com/videos/*.mp4", ""),
        ("https://cdn.example.com/a?b=c", "APKA"),
    ] {
        let cookies =
            issue_signed_cookies(&key, key_pair_id, resource, DateTime::from_secs(2_000_000_000))
                .unwrap();
        assert_eq!(cookies.cookies().len(), 3, "{resource}");
        assert_eq!(cookies.get(SignedCookies::KEY_PAIR_ID), Some(key_pair_id));
    }
}

#[test]
fn test_empty_resource_is_rejected() {
    let key = key();
    let expiry = DateTime::from_secs(2_000_000_000);

    let err = issue_signed_cookies(&key, "K3M7WLN23IL48K", "", expiry).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidResource);
    let err = issue_signed_url(&key, "K3M7WLN23IL48K", "", expiry).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidResource);
    let err = build_policy("", expiry).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidResource);
}

#[test]
fn test_canned_and_custom_forms_sign_the_same_policy() {
    let key = key();
    let resource = "https://cdn.example.com/index.html";
    let expiry = DateTime::from_secs(2_000_000_000);

    let canned = issue_canned_signed_url(&key, "K3M7WLN23IL48K", resource, expiry).unwrap();
    let custom = issue_signed_url(&key, "K3M7WLN23IL48K", resource, expiry).unwrap();

    assert_eq!(canned.query_param("Signature"), custom.query_param("Signature"));
    assert_eq!(canned.query_param("Expires").as_deref(), Some("2000000000"));
    assert!(canned.query_param("Policy").is_none());
    assert_eq!(
        custom.query_param("Policy").as_deref(),
        Some(build_policy(resource, expiry).unwrap().to_cloudfront_base64().as_str())
    );
}

#[test]
fn test_canned_url_rejects_wildcards() {
    let err = issue_canned_signed_url(
        &key(),
        "K3M7WLN23IL48K",
        "https://cdn.example.com/*",
        DateTime::from_secs(2_000_000_000),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidResource);
}

#[test]
fn test_signed_url_passes_key_pair_id_through() {
    let url = issue_signed_url(
        &key(),
        "K3M7WLN23IL48K",
        "https://cdn.example.com/videos/*",
        DateTime::from_secs(1767290400),
    )
    .unwrap();
    assert!(url
        .as_str()
        .starts_with("https://cdn.example.com/videos/*?Policy="));
    assert_eq!(url.query_param("Key-Pair-Id").as_deref(), Some("K3M7WLN23IL48K"));
}

#[test]
fn test_signed_url_is_not_normalized() {
    let key = key();
    let expiry = DateTime::from_secs(2_000_000_000);
    for resource in [
        "https://cdn.example.com:443/a.txt",
        "https://CDN.Example.com/a.txt",
        "https://cdn.example.com/caf\u{e9}.txt",
        "https://cdn.example.com/a/../b.txt",
    ] {
        let custom = issue_signed_url(&key, "K3M7WLN23IL48K", resource, expiry).unwrap();
        let canned = issue_canned_signed_url(&key, "K3M7WLN23IL48K", resource, expiry).unwrap();

        assert!(custom.as_str().starts_with(&format!("{resource}?Policy=")), "{custom}");
        assert!(canned.as_str().starts_with(&format!("{resource}?Expires=")), "{canned}");
        assert_eq!(
            custom.query_param("Policy").as_deref(),
            Some(build_policy(resource, expiry).unwrap().to_cloudfront_base64().as_str())
        );
        assert_eq!(canned.query_param("Signature"), custom.query_param("Signature"));
    }
}

#[test]
fn test_concurrent_issuance_shares_one_key() {
    let key = Arc::new(key());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let key = Arc::clone(&key);
            std::thread::spawn(move || {
                issue_signed_cookies(
                    &key,
                    "K3M7WLN23IL48K",
                    "https://cdn.example.com/*",
                    DateTime::from_secs(2_000_000_000 + i),
                )
                .unwrap()
            })
        })
        .collect();

    let cookies: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(cookies[0].get(SignedCookies::SIGNATURE), Some(EXAMPLE_SIGNATURE));
    let distinct: BTreeSet<_> = cookies
        .iter()
        .map(|c| c.get(SignedCookies::SIGNATURE).unwrap().to_owned())
        .collect();
    assert_eq!(distinct.len(), 4);
}
