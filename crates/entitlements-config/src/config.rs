// crates/entitlements-config/src/config.rs
// ============================================================================
// Module: Entitlements Configuration
// Description: `ENT_` environment loading, defaults, and validation.
// Purpose: Provide strict, fail-closed configuration for every service layer.
// Dependencies: thiserror, url
// ============================================================================

//! ## Overview
//! Configuration is read from environment variables with the `ENT_` prefix.
//! Unset and blank variables take their defaults. Values that are set but
//! unparseable are errors rather than silently defaulted, and the assembled
//! configuration is validated before use.
//!
//! PEM material for outbound TLS is either inline in the environment or read
//! from files; [`TlsConfig::load_pem`] resolves both forms to text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;
/// Default feature-status host.
pub const DEFAULT_SUBS_HOST: &str = "https://subscription.qa.api.redhat.com";
/// Default feature-status base path.
pub const DEFAULT_FEATURES_PATH: &str = "/svcrest/subscription/v5";
/// Default outbound call deadline in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
/// Default bundle definition document.
pub const DEFAULT_BUNDLE_INFO_YAML: &str = "bundles/bundles.yml";
/// Default OpenAPI document.
pub const DEFAULT_OPENAPI_SPEC_PATH: &str = "apispec/api.spec.json";
/// Default OAuth2 token endpoint for the accounts system.
pub const DEFAULT_TOKEN_URL: &str =
    "https://sso.redhat.com/auth/realms/redhat-external/protocol/openid-connect/token";
/// Default accounts-system host.
pub const DEFAULT_AMS_HOST: &str = "https://api.openshift.com";
/// Default paid-variant suffix.
pub const DEFAULT_PAID_FEATURE_SUFFIX: &str = "_paid";
/// Default feature-status cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 1800;
/// Default feature-status cache capacity.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
/// Commit reported when none is configured.
pub const DEFAULT_COMMIT: &str = "unknown";
/// Maximum accepted PEM file size in bytes.
const MAX_PEM_FILE_BYTES: u64 = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required value is absent.
    #[error("missing config: {0}")]
    Missing(String),
    /// A value is present but invalid.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Referenced file could not be read.
    #[error("config io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Accounts/quota system settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmsConfig {
    /// Accounts-system base URL.
    pub host: String,
    /// OAuth2 client identifier.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// OAuth2 token endpoint.
    pub token_url: String,
    /// Use the in-memory accounts service.
    pub mock: bool,
    /// Sentence appended to `ACCT-MGMT-11` forbidden messages.
    pub acct_mgmt_11_message: Option<String>,
}

/// User-directory settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BopConfig {
    /// Directory base URL.
    pub url: String,
    /// Directory client identifier.
    pub client_id: String,
    /// Directory API token.
    pub token: String,
    /// Directory environment label.
    pub env: String,
    /// Use the in-memory user directory.
    pub mock: bool,
}

/// Location of one PEM document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PemSource {
    /// PEM text taken from the environment.
    Inline(String),
    /// PEM file on disk.
    File(PathBuf),
}

impl PemSource {
    /// Returns the PEM text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Invalid`] when it is too large or not UTF-8.
    pub fn read(&self) -> Result<String, ConfigError> {
        match self {
            Self::Inline(text) => Ok(text.clone()),
            Self::File(path) => {
                let metadata = fs::metadata(path)
                    .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
                if metadata.len() > MAX_PEM_FILE_BYTES {
                    return Err(ConfigError::Invalid(format!(
                        "{} exceeds pem size limit",
                        path.display()
                    )));
                }
                let bytes = fs::read(path)
                    .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
                String::from_utf8(bytes).map_err(|_| {
                    ConfigError::Invalid(format!("{} must be utf-8", path.display()))
                })
            }
        }
    }
}

/// Outbound TLS material sources.
///
/// # Invariants
/// - After validation `cert` and `key` are either both set or both unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    /// Extra trust root.
    pub ca: Option<PemSource>,
    /// Client certificate chain.
    pub cert: Option<PemSource>,
    /// Client private key.
    pub key: Option<PemSource>,
}

/// Resolved PEM text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsPem {
    /// Extra trust root.
    pub ca: Option<String>,
    /// Client certificate chain.
    pub cert: Option<String>,
    /// Client private key.
    pub key: Option<String>,
}

impl TlsConfig {
    /// Reads every configured PEM document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a document cannot be read.
    pub fn load_pem(&self) -> Result<TlsPem, ConfigError> {
        Ok(TlsPem {
            ca: self.ca.as_ref().map(PemSource::read).transpose()?,
            cert: self.cert.as_ref().map(PemSource::read).transpose()?,
            key: self.key.as_ref().map(PemSource::read).transpose()?,
        })
    }

    /// Returns true when no TLS material is configured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ca.is_none() && self.cert.is_none() && self.key.is_none()
    }
}

/// Feature-status cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Entry lifetime.
    pub ttl: Duration,
    /// Maximum cached orgs.
    pub max_entries: usize,
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementsConfig {
    /// Listen port.
    pub port: u16,
    /// Feature-status host.
    pub subs_host: String,
    /// Feature-status base path, always starting with `/`.
    pub features_path: String,
    /// Deadline applied to every outbound call.
    pub it_services_timeout: Duration,
    /// Bundle definition document.
    pub bundle_info_yaml: PathBuf,
    /// Permit a missing or empty bundle document.
    pub allow_empty_bundles: bool,
    /// OpenAPI document served verbatim.
    pub openapi_spec_path: PathBuf,
    /// Accounts-system settings.
    pub ams: AmsConfig,
    /// User-directory settings.
    pub bop: BopConfig,
    /// Compliance screening host.
    pub compliance_host: String,
    /// Paid-variant bundle suffix.
    pub paid_feature_suffix: String,
    /// Debug logging.
    pub debug: bool,
    /// Global override entitling every bundle.
    pub entitle_all: bool,
    /// Outbound TLS material.
    pub tls: TlsConfig,
    /// Feature-status cache settings.
    pub cache: CacheSettings,
    /// Version reported by `/status`.
    pub api_version: String,
    /// Commit reported by `/status`.
    pub commit: String,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl EntitlementsConfig {
    /// Loads and validates configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is invalid or validation fails.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads and validates configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is invalid or validation fails.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars {
            lookup,
        };
        let certs_from_env = vars.boolean("ENT_CERTS_FROM_ENV", false)?;
        let tls = if certs_from_env {
            TlsConfig {
                ca: vars.optional("ENT_CA_CERT").map(PemSource::Inline),
                cert: vars.optional("ENT_CERT").map(PemSource::Inline),
                key: vars.optional("ENT_KEY").map(PemSource::Inline),
            }
        } else {
            let file = |key: &str| vars.optional(key).map(|path| PemSource::File(PathBuf::from(path)));
            TlsConfig {
                ca: file("ENT_CA_PATH"),
                cert: file("ENT_CERT_PATH"),
                key: file("ENT_KEY_PATH"),
            }
        };
        let config = Self {
            port: vars.number("ENT_PORT", DEFAULT_PORT)?,
            subs_host: vars.string("ENT_SUBS_HOST", DEFAULT_SUBS_HOST),
            features_path: normalize_path(&vars.string("ENT_FEATURES_PATH", DEFAULT_FEATURES_PATH)),
            it_services_timeout: Duration::from_secs(
                vars.number("ENT_IT_SERVICES_TIMEOUT_SECONDS", DEFAULT_TIMEOUT_SECONDS)?,
            ),
            bundle_info_yaml: PathBuf::from(
                vars.string("ENT_BUNDLE_INFO_YAML", DEFAULT_BUNDLE_INFO_YAML),
            ),
            allow_empty_bundles: vars.boolean("ENT_ALLOW_EMPTY_BUNDLES", false)?,
            openapi_spec_path: PathBuf::from(
                vars.string("ENT_OPENAPI_SPEC_PATH", DEFAULT_OPENAPI_SPEC_PATH),
            ),
            ams: AmsConfig {
                host: vars.string("ENT_AMS_HOST", DEFAULT_AMS_HOST),
                client_id: vars.string("ENT_CLIENT_ID", ""),
                client_secret: vars.string("ENT_CLIENT_SECRET", ""),
                token_url: vars.string("ENT_TOKEN_URL", DEFAULT_TOKEN_URL),
                mock: vars.boolean("ENT_AMS_MOCK", false)?,
                acct_mgmt_11_message: vars.optional("ENT_AMS_ACCT_MGMT_11_ERR_MSG"),
            },
            bop: BopConfig {
                url: vars.string("ENT_BOP_URL", ""),
                client_id: vars.string("ENT_BOP_CLIENT_ID", ""),
                token: vars.string("ENT_BOP_TOKEN", ""),
                env: vars.string("ENT_BOP_ENV", ""),
                mock: vars.boolean("ENT_BOP_MOCK", false)?,
            },
            compliance_host: vars.string("ENT_COMPL_HOST", ""),
            paid_feature_suffix: vars.string("ENT_PAID_FEATURE_SUFFIX", DEFAULT_PAID_FEATURE_SUFFIX),
            debug: vars.boolean("ENT_DEBUG", false)?,
            entitle_all: vars.boolean("ENT_ENTITLE_ALL", false)?,
            tls,
            cache: CacheSettings {
                ttl: Duration::from_secs(
                    vars.number("ENT_CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS)?,
                ),
                max_entries: vars.number("ENT_CACHE_MAX_ENTRIES", DEFAULT_CACHE_MAX_ENTRIES)?,
            },
            api_version: vars.string("ENT_API_VERSION", env!("CARGO_PKG_VERSION")),
            commit: vars.string("ENT_COMMIT", DEFAULT_COMMIT),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("ENT_PORT must be greater than zero".to_string()));
        }
        if self.it_services_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "ENT_IT_SERVICES_TIMEOUT_SECONDS must be greater than zero".to_string(),
            ));
        }
        if self.cache.ttl.is_zero() {
            return Err(ConfigError::Invalid(
                "ENT_CACHE_TTL_SECONDS must be greater than zero".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "ENT_CACHE_MAX_ENTRIES must be greater than zero".to_string(),
            ));
        }
        if self.paid_feature_suffix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ENT_PAID_FEATURE_SUFFIX must not be empty".to_string(),
            ));
        }
        validate_url("ENT_SUBS_HOST", &self.subs_host)?;
        validate_url("ENT_AMS_HOST", &self.ams.host)?;
        validate_url("ENT_TOKEN_URL", &self.ams.token_url)?;
        validate_url("ENT_BOP_URL", &self.bop.url)?;
        validate_url("ENT_COMPL_HOST", &self.compliance_host)?;
        if !self.ams.mock {
            self.validate_ams_credentials()?;
        }
        match (&self.tls.cert, &self.tls.key) {
            (Some(_), None) => Err(ConfigError::Missing(
                "client certificate configured without a private key".to_string(),
            )),
            (None, Some(_)) => Err(ConfigError::Missing(
                "private key configured without a client certificate".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Returns the socket address the service listens on.
    #[must_use]
    pub fn listen_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Returns true when the accounts client has credentials.
    #[must_use]
    pub fn has_ams_credentials(&self) -> bool {
        !self.ams.client_id.is_empty()
    }

    /// Requires the AMS credentials to be set together.
    fn validate_ams_credentials(&self) -> Result<(), ConfigError> {
        let fields = [
            ("ENT_CLIENT_ID", self.ams.client_id.is_empty()),
            ("ENT_CLIENT_SECRET", self.ams.client_secret.is_empty()),
            ("ENT_TOKEN_URL", self.ams.token_url.is_empty()),
        ];
        let any_set = !self.ams.client_id.is_empty() || !self.ams.client_secret.is_empty();
        if !any_set {
            return Ok(());
        }
        match fields.iter().find(|(_, empty)| *empty) {
            Some((key, _)) => Err(ConfigError::Missing(format!(
                "{key} must be set together with the other AMS credentials"
            ))),
            None => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Typed access to environment variables.
struct Vars<F> {
    /// Raw key lookup.
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Returns the trimmed value, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
    }

    /// Returns the value or `default`.
    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parses a boolean accepting `true`/`false`/`1`/`0`.
    fn boolean(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        match value.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigError::Invalid(format!("{key} must be true, false, 1, or 0"))),
        }
    }

    /// Parses a number.
    fn number<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{key} must be a non-negative integer")))
        })
    }
}

/// Ensures a leading slash and strips trailing slashes.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.starts_with('/') { trimmed.to_string() } else { format!("/{trimmed}") }
}

/// Validates an optional `http`/`https` URL.
fn validate_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Ok(());
    }
    let url = Url::parse(value)
        .map_err(|err| ConfigError::Invalid(format!("{key} is not a valid url: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::Invalid(format!("{key} uses unsupported scheme {scheme}"))),
    }
}

#[cfg(test)]
mod tests;
