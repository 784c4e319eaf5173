// crates/entitlements-core/tests/proptest_bundles.rs
// ============================================================================
// Module: Bundle Registry Property-Based Tests
// Description: Property tests for paid expansion and SKU normalization.
// Purpose: Check registry cardinality and ordering over arbitrary documents.
// ============================================================================

//! Property-based tests for bundle registry invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;

use entitlements_core::BundleDefinition;
use entitlements_core::BundleRegistry;
use proptest::prelude::*;

fn sku_list() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("SKU-[A-E]{1,2}", 0 .. 5)
}

fn definitions() -> impl Strategy<Value = Vec<BundleDefinition>> {
    prop::collection::btree_set("[a-z]{1,6}", 0 .. 8).prop_flat_map(|names| {
        let names: Vec<String> = names.into_iter().collect();
        let count = names.len();
        (
            Just(names),
            prop::collection::vec((sku_list(), sku_list(), sku_list(), any::<[bool; 3]>()), count),
        )
            .prop_map(|(names, lists)| {
                names
                    .into_iter()
                    .zip(lists)
                    .map(|(name, (skus, paid_skus, eval_skus, flags))| BundleDefinition {
                        name,
                        use_valid_acc_num: flags[0],
                        use_valid_org_id: flags[1],
                        use_is_internal: flags[2],
                        skus,
                        paid_skus,
                        eval_skus,
                    })
                    .collect()
            })
    })
}

proptest! {
    #[test]
    fn paid_expansion_produces_one_or_two_entries(definitions in definitions()) {
        let registry = BundleRegistry::from_definitions(definitions.clone(), "_paid").unwrap();
        let mut expected = 0;
        for definition in &definitions {
            let is_paid = !definition.paid_skus.is_empty() || !definition.eval_skus.is_empty();
            prop_assert!(registry.get(&definition.name).is_some());
            let variant = registry.get(&format!("{}_paid", definition.name));
            prop_assert_eq!(variant.is_some(), is_paid);
            if let Some(variant) = variant {
                let paid: BTreeSet<&String> = definition.paid_skus.iter().collect();
                prop_assert_eq!(variant.skus.iter().collect::<BTreeSet<_>>(), paid);
                prop_assert_eq!(variant.use_valid_acc_num, definition.use_valid_acc_num);
                prop_assert_eq!(variant.use_valid_org_id, definition.use_valid_org_id);
                prop_assert_eq!(variant.use_is_internal, definition.use_is_internal);
            }
            expected += if is_paid { 2 } else { 1 };
        }
        prop_assert_eq!(registry.len(), expected);
    }

    #[test]
    fn every_entry_has_strictly_ascending_skus(definitions in definitions()) {
        let registry = BundleRegistry::from_definitions(definitions.clone(), "_paid").unwrap();
        for bundle in registry.all() {
            prop_assert!(bundle.skus.windows(2).all(|pair| pair[0] < pair[1]));
        }
        for definition in &definitions {
            let base = registry.get(&definition.name).unwrap();
            let union: BTreeSet<&String> = definition
                .skus
                .iter()
                .chain(&definition.paid_skus)
                .chain(&definition.eval_skus)
                .collect();
            prop_assert_eq!(base.skus.iter().collect::<BTreeSet<_>>(), union);
        }
    }

    #[test]
    fn registry_iterates_in_name_order(definitions in definitions()) {
        let registry = BundleRegistry::from_definitions(definitions, "_paid").unwrap();
        let names: Vec<&str> = registry.all().map(|bundle| bundle.name.as_str()).collect();
        prop_assert!(names.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
