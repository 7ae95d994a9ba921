//! Property-based test generators using proptest.

use proptest::prelude::*;
use std::collections::BTreeMap;
use strata_core::{Value, Version};

/// Strategy for generating optional record versions.
pub fn version_strategy() -> impl Strategy<Value = Option<Version>> {
    prop::option::of((0i64..1_000).prop_map(Version::new))
}

/// Strategy for generating scalar field values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        prop::string::string_regex("[a-z0-9 ]{0,12}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
    ]
}

/// Strategy for generating `id -> version` maps describing store contents.
///
/// Keys are drawn from `0..max_key` so that independently generated master
/// and replica maps overlap.
pub fn key_version_map_strategy(
    max_key: i64,
    max_len: usize,
) -> impl Strategy<Value = BTreeMap<i64, i64>> {
    prop::collection::btree_map(0..max_key, 1i64..50, 0..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn key_version_maps_respect_bounds(map in key_version_map_strategy(20, 8)) {
            prop_assert!(map.len() <= 8);
            for (key, version) in &map {
                prop_assert!((0..20).contains(key));
                prop_assert!(*version >= 1);
            }
        }

        #[test]
        fn versions_are_non_negative(version in version_strategy()) {
            if let Some(v) = version {
                prop_assert!(v.as_i64() >= 0);
            }
        }
    }
}
