//! Property-based tests for resync passes.

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_core::{MemoryStore, Record, RecordStore, Value, Version};
use strata_resync::{ResyncConfig, ResyncEngine};
use strata_testkit::prelude::*;

/// Versions the replica should end up with after one pass.
fn expected_after_pass(
    master: &BTreeMap<i64, i64>,
    replica: &BTreeMap<i64, i64>,
    in_scope: impl Fn(i64) -> bool,
) -> BTreeMap<i64, Option<i64>> {
    let mut expected = BTreeMap::new();
    for (id, version) in replica {
        if !in_scope(*id) {
            expected.insert(*id, Some(*version));
        }
    }
    for (id, master_version) in master {
        if !in_scope(*id) {
            continue;
        }
        let kept = match replica.get(id) {
            Some(replica_version) if replica_version > master_version => *replica_version,
            _ => *master_version,
        };
        expected.insert(*id, Some(kept));
    }
    expected
}

type Contents = BTreeMap<i64, (Option<Version>, Value)>;

fn contents_strategy() -> impl Strategy<Value = Contents> {
    prop::collection::btree_map(0i64..30, (version_strategy(), value_strategy()), 0..20)
}

fn user(id: i64, (version, payload): &(Option<Version>, Value)) -> Record {
    Record::new("users", id)
        .with_version(*version)
        .with_field("payload", payload.clone())
}

fn store_with(contents: &Contents) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    for (id, entry) in contents {
        store.insert(&users_type(), &user(*id, entry)).unwrap();
    }
    Arc::new(store)
}

/// Records the replica should hold after one pass over the keys `in_scope`
/// admits.
fn expected_records(
    master: &Contents,
    replica: &Contents,
    in_scope: impl Fn(i64) -> bool,
) -> Vec<Record> {
    let mut expected = BTreeMap::new();
    for (id, entry) in replica {
        if !in_scope(*id) {
            expected.insert(*id, user(*id, entry));
        }
    }
    for (id, master_entry) in master {
        if !in_scope(*id) {
            continue;
        }
        let kept = match replica.get(id) {
            Some(replica_entry)
                if matches!((replica_entry.0, master_entry.0), (Some(r), Some(m)) if r >= m) =>
            {
                replica_entry
            }
            _ => master_entry,
        };
        expected.insert(*id, user(*id, kept));
    }
    expected.into_values().collect()
}

fn at_least(entry: Option<&(Option<Version>, Value)>, threshold: i64) -> bool {
    entry.and_then(|(version, _)| *version).is_some_and(|v| v.as_i64() >= threshold)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Versioned and unversioned records with arbitrary payloads converge:
    /// the master copy wins unless both sides are versioned and the replica
    /// is not behind.
    #[test]
    fn mixed_records_converge(
        master in contents_strategy(),
        replica in contents_strategy(),
    ) {
        let users = users_type();
        let engine = ResyncEngine::new(
            store_with(&master),
            store_with(&replica),
            ResyncConfig::default(),
        );

        engine.resync(&users, 1.0, None, &[]).unwrap();

        prop_assert_eq!(
            engine.replica().records(&users),
            expected_records(&master, &replica, |_| true)
        );
    }

    /// A version filter reconciles every key either side admits, against
    /// the other side's copy, and leaves the rest untouched.
    #[test]
    fn version_filter_reconciles_both_sides(
        master in contents_strategy(),
        replica in contents_strategy(),
        threshold in 0i64..1_000,
    ) {
        let users = users_type();
        let engine = ResyncEngine::new(
            store_with(&master),
            store_with(&replica),
            ResyncConfig::default(),
        );

        engine
            .resync(&users, 1.0, Some("version >= ?"), &[Value::Integer(threshold)])
            .unwrap();

        prop_assert_eq!(
            engine.replica().records(&users),
            expected_records(&master, &replica, |id| {
                at_least(master.get(&id), threshold) || at_least(replica.get(&id), threshold)
            })
        );
    }

    /// One pass makes the replica agree with the master, except where the
    /// replica already held a newer version.
    #[test]
    fn pass_converges_replica(
        master in key_version_map_strategy(40, 25),
        replica in key_version_map_strategy(40, 25),
    ) {
        let users = users_type();
        let (m, r) = store_pair(&users, &master, &replica);
        let engine = ResyncEngine::new(m, r, ResyncConfig::default());

        let report = engine.resync(&users, 1.0, None, &[]).unwrap();

        prop_assert_eq!(
            key_versions(engine.replica(), &users),
            expected_after_pass(&master, &replica, |_| true)
        );
        let keys: std::collections::BTreeSet<_> = master.keys().chain(replica.keys()).collect();
        prop_assert_eq!(report.examined, keys.len() as u64);
    }

    /// A second pass over unchanged stores performs no writes.
    #[test]
    fn second_pass_is_idle(
        master in key_version_map_strategy(40, 25),
        replica in key_version_map_strategy(40, 25),
    ) {
        let users = users_type();
        let (m, r) = store_pair(&users, &master, &replica);
        let engine = ResyncEngine::new(m, r, ResyncConfig::default());

        engine.resync(&users, 1.0, None, &[]).unwrap();
        let after_first = engine.replica().records(&users);
        let second = engine.resync(&users, 1.0, None, &[]).unwrap();

        prop_assert_eq!(second.writes(), 0);
        prop_assert_eq!(engine.replica().records(&users), after_first);
    }

    /// Records outside the filter are left exactly as they were.
    #[test]
    fn filter_scopes_the_pass(
        master in key_version_map_strategy(40, 25),
        replica in key_version_map_strategy(40, 25),
        low in 0i64..40,
        width in 0i64..20,
    ) {
        let users = users_type();
        let high = low + width;
        let (m, r) = store_pair(&users, &master, &replica);
        let engine = ResyncEngine::new(m, r, ResyncConfig::default());

        engine
            .resync(
                &users,
                1.0,
                Some("id >= ? AND id < ?"),
                &[Value::Integer(low), Value::Integer(high)],
            )
            .unwrap();

        prop_assert_eq!(
            key_versions(engine.replica(), &users),
            expected_after_pass(&master, &replica, |id| id >= low && id < high)
        );
    }
}
