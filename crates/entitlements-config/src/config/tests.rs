// crates/entitlements-config/src/config/tests.rs
// ============================================================================
// Module: Entitlements Configuration Tests
// Description: Unit tests for defaults, parsing, and validation.
// Purpose: Ensure invalid environments fail closed.
// Dependencies: entitlements-config, tempfile
// ============================================================================

//! ## Overview
//! Tests drive [`EntitlementsConfig::from_lookup`] with fixed maps instead of
//! the process environment.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions."
)]

use std::collections::HashMap;
use std::io::Write;

use super::*;

fn load(pairs: &[(&str, &str)]) -> Result<EntitlementsConfig, ConfigError> {
    let vars: HashMap<String, String> =
        pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    EntitlementsConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn empty_environment_uses_defaults() {
    let config = load(&[]).unwrap();
    assert_eq!(config.port, 3000);
    assert_eq!(config.subs_host, DEFAULT_SUBS_HOST);
    assert_eq!(config.features_path, "/svcrest/subscription/v5");
    assert_eq!(config.it_services_timeout, Duration::from_secs(10));
    assert_eq!(config.bundle_info_yaml, PathBuf::from("bundles/bundles.yml"));
    assert_eq!(config.paid_feature_suffix, "_paid");
    assert_eq!(config.cache.ttl, Duration::from_secs(1800));
    assert_eq!(config.cache.max_entries, 10_000);
    assert_eq!(config.commit, "unknown");
    assert!(!config.entitle_all);
    assert!(config.tls.is_empty());
    assert!(config.ams.acct_mgmt_11_message.is_none());
    assert!(!config.has_ams_credentials());
    assert_eq!(config.listen_addr().port(), 3000);
}

#[test]
fn overrides_are_applied() {
    let config = load(&[
        ("ENT_PORT", "8080"),
        ("ENT_FEATURES_PATH", "svcrest/v6/"),
        ("ENT_ENTITLE_ALL", "TRUE"),
        ("ENT_DEBUG", "1"),
        ("ENT_PAID_FEATURE_SUFFIX", "-paid"),
        ("ENT_AMS_ACCT_MGMT_11_ERR_MSG", "Contact support."),
        ("ENT_CACHE_TTL_SECONDS", "60"),
    ])
    .unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.features_path, "/svcrest/v6");
    assert!(config.entitle_all);
    assert!(config.debug);
    assert_eq!(config.paid_feature_suffix, "-paid");
    assert_eq!(config.ams.acct_mgmt_11_message.as_deref(), Some("Contact support."));
    assert_eq!(config.cache.ttl, Duration::from_secs(60));
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let config = load(&[("ENT_PORT", "  "), ("ENT_SUBS_HOST", "")]).unwrap();
    assert_eq!(config.port, 3000);
    assert_eq!(config.subs_host, DEFAULT_SUBS_HOST);
}

#[test]
fn malformed_values_are_rejected() {
    for (key, value) in [
        ("ENT_PORT", "http"),
        ("ENT_PORT", "70000"),
        ("ENT_DEBUG", "yes"),
        ("ENT_CACHE_MAX_ENTRIES", "-5"),
    ] {
        let err = load(&[(key, value)]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{key}={value}");
    }
}

#[test]
fn zero_limits_are_rejected() {
    for key in
        ["ENT_PORT", "ENT_IT_SERVICES_TIMEOUT_SECONDS", "ENT_CACHE_TTL_SECONDS", "ENT_CACHE_MAX_ENTRIES"]
    {
        assert!(matches!(load(&[(key, "0")]), Err(ConfigError::Invalid(_))), "{key}");
    }
}

#[test]
fn hosts_must_be_http_urls() {
    assert!(matches!(load(&[("ENT_AMS_HOST", "ftp://ams")]), Err(ConfigError::Invalid(_))));
    assert!(matches!(load(&[("ENT_COMPL_HOST", "not a url")]), Err(ConfigError::Invalid(_))));
    assert!(load(&[("ENT_COMPL_HOST", "http://localhost:9000")]).is_ok());
}

#[test]
fn ams_credentials_must_be_set_together() {
    let err = load(&[("ENT_CLIENT_ID", "client")]).unwrap_err();
    assert!(matches!(err, ConfigError::Missing(_)));
    let config =
        load(&[("ENT_CLIENT_ID", "client"), ("ENT_CLIENT_SECRET", "secret")]).unwrap();
    assert!(config.has_ams_credentials());
    assert!(load(&[("ENT_CLIENT_ID", "client"), ("ENT_AMS_MOCK", "true")]).is_ok());
}

#[test]
fn inline_pem_material_is_read_from_environment() {
    let config = load(&[
        ("ENT_CERTS_FROM_ENV", "true"),
        ("ENT_CA_CERT", "ca-pem"),
        ("ENT_CERT", "cert-pem"),
        ("ENT_KEY", "key-pem"),
        ("ENT_CA_PATH", "/ignored"),
    ])
    .unwrap();
    let pem = config.tls.load_pem().unwrap();
    assert_eq!(pem.ca.as_deref(), Some("ca-pem"));
    assert_eq!(pem.cert.as_deref(), Some("cert-pem"));
    assert_eq!(pem.key.as_deref(), Some("key-pem"));
}

#[test]
fn pem_files_are_read_from_paths() {
    let mut ca = tempfile::NamedTempFile::new().unwrap();
    ca.write_all(b"ca-from-file").unwrap();
    let path = ca.path().to_string_lossy().into_owned();
    let config = load(&[("ENT_CA_PATH", path.as_str()), ("ENT_CERT", "ignored")]).unwrap();
    let pem = config.tls.load_pem().unwrap();
    assert_eq!(pem.ca.as_deref(), Some("ca-from-file"));
    assert!(pem.cert.is_none());
}

#[test]
fn missing_pem_file_is_io_error() {
    let config = load(&[("ENT_CA_PATH", "/nonexistent/ca.pem")]).unwrap();
    assert!(matches!(config.tls.load_pem(), Err(ConfigError::Io(_))));
}

#[test]
fn certificate_without_key_is_rejected() {
    let err = load(&[("ENT_CERTS_FROM_ENV", "1"), ("ENT_CERT", "cert-pem")]).unwrap_err();
    assert!(matches!(err, ConfigError::Missing(_)));
    let err = load(&[("ENT_KEY_PATH", "/tmp/key.pem")]).unwrap_err();
    assert!(matches!(err, ConfigError::Missing(_)));
}
