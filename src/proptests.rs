//! Property tests checking the map against a plain `HashMap` model.

use crate::ConcurrentMap;
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Upsert(String, i64),
    Delete(String),
}

fn key() -> impl Strategy<Value = String> {
    "[a-d]{1,2}"
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (key(), any::<i64>()).prop_map(|(k, v)| Op::Upsert(k, v)),
        1 => key().prop_map(Op::Delete),
    ]
}

fn merge(key: &str, old: &i64) -> i64 {
    old.wrapping_mul(31).wrapping_add(key.len() as i64)
}

proptest! {
    #[test]
    fn test_present_after_insert(k in key(), v in any::<i64>()) {
        let map = ConcurrentMap::new();
        map.insert_or_update(k.clone(), v, |_, old| *old);
        prop_assert_eq!(map.get(&k), Some(v));
        prop_assert!(map.keys().contains(&k));
    }

    #[test]
    fn test_absent_after_delete(k in key(), v in any::<i64>()) {
        let map = ConcurrentMap::new();
        map.insert_or_update(k.clone(), v, |_, old| *old);
        map.delete(&k);
        prop_assert_eq!(map.get(&k), None);
        prop_assert!(!map.keys().contains(&k));
    }

    #[test]
    fn test_merge_applies_to_old_value(k in key(), old in any::<i64>(), new in any::<i64>()) {
        let map = ConcurrentMap::new();
        map.insert_or_update(k.clone(), old, merge);
        map.insert_or_update(k.clone(), new, merge);
        prop_assert_eq!(map.get(&k), Some(merge(&k, &old)));
    }

    #[test]
    fn test_identity_merge_never_changes_value(
        k in key(),
        values in prop::collection::vec(any::<i64>(), 1..20)
    ) {
        let map = ConcurrentMap::new();
        for &v in &values {
            map.insert_or_update(k.clone(), v, |_, old| *old);
        }
        prop_assert_eq!(map.get(&k), Some(values[0]));
    }

    #[test]
    fn test_matches_model(ops in prop::collection::vec(op(), 0..64)) {
        let map = ConcurrentMap::new();
        let mut model: HashMap<String, i64> = HashMap::new();

        for op in ops {
            match op {
                Op::Upsert(k, v) => {
                    map.insert_or_update(k.clone(), v, merge);
                    let next = match model.get(&k) {
                        Some(old) => merge(&k, old),
                        None => v,
                    };
                    model.insert(k, next);
                }
                Op::Delete(k) => {
                    map.delete(&k);
                    model.remove(&k);
                }
            }
        }

        prop_assert_eq!(map.len(), model.len());
        prop_assert_eq!(map.is_empty(), model.is_empty());
        for (k, v) in &model {
            prop_assert_eq!(map.get(k), Some(*v));
        }
        let mut keys = map.keys();
        keys.sort();
        let mut expected: Vec<_> = model.keys().cloned().collect();
        expected.sort();
        prop_assert_eq!(keys, expected);
    }
}
