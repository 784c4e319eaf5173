// crates/entitlements-core/src/core/bundle.rs
// ============================================================================
// Module: Bundle Registry
// Description: Bundle definitions, paid/eval expansion, and registry lookup.
// Purpose: Build the immutable bundle registry consulted by the evaluator.
// Dependencies: serde, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! The bundle registry is loaded once from a YAML list of bundle definitions
//! and never mutated afterwards. Every definition carrying paid or eval SKUs
//! produces two entries: the bundle itself with the union of all of its SKUs,
//! and a paid variant (`<name><suffix>`) with only the paid SKUs. SKU lists in
//! every entry are deduplicated and sorted ascending.
//! Load failures are fatal unless the caller explicitly allows an empty
//! registry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default suffix appended to paid bundle variants.
pub const DEFAULT_PAID_SUFFIX: &str = "_paid";
/// Maximum accepted bundle document size in bytes.
const MAX_BUNDLE_FILE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// One entry of the bundle definition document.
///
/// # Invariants
/// - Unknown document fields are ignored.
/// - Missing flags default to `false`; missing SKU lists default to empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BundleDefinition {
    /// Bundle name.
    pub name: String,
    /// Require a valid account number.
    #[serde(default)]
    pub use_valid_acc_num: bool,
    /// Require a valid org identifier.
    #[serde(default)]
    pub use_valid_org_id: bool,
    /// Require an internal caller.
    #[serde(default)]
    pub use_is_internal: bool,
    /// Base SKUs.
    #[serde(default)]
    pub skus: Vec<String>,
    /// Paid SKUs.
    #[serde(default)]
    pub paid_skus: Vec<String>,
    /// Evaluation (trial) SKUs.
    #[serde(default)]
    pub eval_skus: Vec<String>,
}

/// Registry entry describing a bundle and its entitlement rule.
///
/// # Invariants
/// - `skus`, `paid_skus`, and `eval_skus` are strictly ascending.
/// - `paid_variant` is true only for entries derived by paid expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
    /// Bundle name, unique within the registry.
    pub name: String,
    /// Require a valid account number.
    pub use_valid_acc_num: bool,
    /// Require a valid org identifier.
    pub use_valid_org_id: bool,
    /// Require an internal caller.
    pub use_is_internal: bool,
    /// Effective SKUs for this entry.
    pub skus: Vec<String>,
    /// Paid SKUs.
    pub paid_skus: Vec<String>,
    /// Evaluation (trial) SKUs.
    pub eval_skus: Vec<String>,
    /// Entry was derived as the paid variant of another bundle.
    #[serde(skip)]
    pub paid_variant: bool,
}

impl Bundle {
    /// Returns true when the bundle carries paid or eval SKUs.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        !self.paid_skus.is_empty() || !self.eval_skus.is_empty()
    }

    /// Returns true when entitlement depends on upstream feature status.
    ///
    /// Paid variants always depend on upstream status, even when the source
    /// bundle only listed eval SKUs, so they never degrade into
    /// attribute-only bundles.
    #[must_use]
    pub fn is_sku_based(&self) -> bool {
        !self.skus.is_empty() || self.is_paid() || self.paid_variant
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Bundle registry load failures.
#[derive(Debug, Error)]
pub enum BundleError {
    /// Bundle document could not be read.
    #[error("bundle file io error: {0}")]
    Io(String),
    /// Bundle document could not be parsed.
    #[error("bundle file parse error: {0}")]
    Parse(String),
    /// Bundle document is structurally invalid.
    #[error("invalid bundle definition: {0}")]
    Invalid(String),
    /// Two entries resolved to the same name.
    #[error("duplicate bundle name: {0}")]
    Duplicate(String),
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Immutable bundle-name to bundle mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleRegistry {
    /// Entries keyed by bundle name.
    bundles: BTreeMap<String, Bundle>,
}

impl BundleRegistry {
    /// Loads the registry from a YAML bundle document on disk.
    ///
    /// When `allow_empty` is set, a missing or empty document yields an empty
    /// registry instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError`] when the document is missing, unreadable,
    /// malformed, empty (unless allowed), or contains duplicate names.
    pub fn load(path: &Path, paid_suffix: &str, allow_empty: bool) -> Result<Self, BundleError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if allow_empty && err.kind() == ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(BundleError::Io(format!("{}: {err}", path.display())));
            }
        };
        if bytes.len() > MAX_BUNDLE_FILE_BYTES {
            return Err(BundleError::Invalid("bundle file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| BundleError::Invalid("bundle file must be utf-8".to_string()))?;
        Self::from_yaml_str(content, paid_suffix, allow_empty)
    }

    /// Parses the registry from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError`] when parsing or expansion fails.
    pub fn from_yaml_str(
        content: &str,
        paid_suffix: &str,
        allow_empty: bool,
    ) -> Result<Self, BundleError> {
        let definitions: Vec<BundleDefinition> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_yaml::from_str(content).map_err(|err| BundleError::Parse(err.to_string()))?
        };
        if definitions.is_empty() && !allow_empty {
            return Err(BundleError::Invalid("bundle file defines no bundles".to_string()));
        }
        Self::from_definitions(definitions, paid_suffix)
    }

    /// Builds the registry from parsed definitions, applying paid expansion.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError`] when a name is empty, the suffix is empty, or
    /// two entries collide.
    pub fn from_definitions(
        definitions: Vec<BundleDefinition>,
        paid_suffix: &str,
    ) -> Result<Self, BundleError> {
        if paid_suffix.is_empty() {
            return Err(BundleError::Invalid("paid suffix must not be empty".to_string()));
        }
        let mut bundles = BTreeMap::new();
        for definition in definitions {
            if definition.name.trim().is_empty() {
                return Err(BundleError::Invalid("bundle name must not be empty".to_string()));
            }
            for bundle in expand_definition(definition, paid_suffix) {
                if bundles.contains_key(&bundle.name) {
                    return Err(BundleError::Duplicate(bundle.name));
                }
                bundles.insert(bundle.name.clone(), bundle);
            }
        }
        Ok(Self {
            bundles,
        })
    }

    /// Returns the bundle registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Bundle> {
        self.bundles.get(name)
    }

    /// Iterates all bundles in ascending name order.
    pub fn all(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.values()
    }

    /// Returns the names of bundles that depend on upstream feature status.
    #[must_use]
    pub fn sku_based_names(&self) -> Vec<String> {
        self.all().filter(|bundle| bundle.is_sku_based()).map(|bundle| bundle.name.clone()).collect()
    }

    /// Returns the number of registered bundles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Returns true when no bundles are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Expands one definition into its registry entries.
fn expand_definition(definition: BundleDefinition, paid_suffix: &str) -> Vec<Bundle> {
    let paid_skus = dedup_sorted(definition.paid_skus.iter());
    let eval_skus = dedup_sorted(definition.eval_skus.iter());
    let is_paid = !paid_skus.is_empty() || !eval_skus.is_empty();
    let skus = dedup_sorted(
        definition.skus.iter().chain(definition.paid_skus.iter()).chain(definition.eval_skus.iter()),
    );
    let base = Bundle {
        name: definition.name,
        use_valid_acc_num: definition.use_valid_acc_num,
        use_valid_org_id: definition.use_valid_org_id,
        use_is_internal: definition.use_is_internal,
        skus,
        paid_skus: paid_skus.clone(),
        eval_skus,
        paid_variant: false,
    };
    if !is_paid {
        return vec![base];
    }
    let paid = Bundle {
        name: format!("{}{paid_suffix}", base.name),
        use_valid_acc_num: base.use_valid_acc_num,
        use_valid_org_id: base.use_valid_org_id,
        use_is_internal: base.use_is_internal,
        skus: paid_skus.clone(),
        paid_skus,
        eval_skus: Vec::new(),
        paid_variant: true,
    };
    vec![base, paid]
}

/// Deduplicates and sorts SKU identifiers ascending.
fn dedup_sorted<'a>(skus: impl Iterator<Item = &'a String>) -> Vec<String> {
    skus.cloned().collect::<BTreeSet<String>>().into_iter().collect()
}
