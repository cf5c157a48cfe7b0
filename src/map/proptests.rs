//! Property-based tests for the map backends using proptest
//!
//! Every backend is driven through random single-threaded operation
//! sequences and compared step by step against `std::collections::HashMap`.

use super::{CoarseMap, ConcurrentMap, SegmentedMap};
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Put(i64, i64),
    Get(i64),
    GetOr(i64, i64),
    Contains(i64),
    Remove(i64),
    PutIfAbsent(i64, i64),
    Len,
    Clear,
}

// A narrow key range keeps collisions between operations frequent.
fn key() -> impl Strategy<Value = i64> {
    prop_oneof![-32i64..32, Just(i64::MIN), Just(i64::MAX)]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (key(), any::<i64>()).prop_map(|(k, v)| Op::Put(k, v)),
        3 => key().prop_map(Op::Get),
        1 => (key(), any::<i64>()).prop_map(|(k, d)| Op::GetOr(k, d)),
        1 => key().prop_map(Op::Contains),
        2 => key().prop_map(Op::Remove),
        2 => (key(), any::<i64>()).prop_map(|(k, v)| Op::PutIfAbsent(k, v)),
        1 => Just(Op::Len),
        1 => prop::bool::weighted(0.05).prop_map(|clear| if clear { Op::Clear } else { Op::Len }),
    ]
}

fn check_against_model<M: ConcurrentMap>(map: &M, ops: &[Op]) -> Result<(), TestCaseError> {
    let mut model: HashMap<i64, i64> = HashMap::new();

    for op in ops {
        match *op {
            Op::Put(k, v) => {
                map.put(k, v).unwrap();
                model.insert(k, v);
            }
            Op::Get(k) => prop_assert_eq!(map.get(k), model.get(&k).copied()),
            Op::GetOr(k, d) => prop_assert_eq!(map.get_or(k, d), *model.get(&k).unwrap_or(&d)),
            Op::Contains(k) => prop_assert_eq!(map.contains_key(k), model.contains_key(&k)),
            Op::Remove(k) => prop_assert_eq!(map.remove(k), model.remove(&k)),
            Op::PutIfAbsent(k, v) => {
                let expected = !model.contains_key(&k);
                if expected {
                    model.insert(k, v);
                }
                prop_assert_eq!(map.put_if_absent(k, v).unwrap(), expected);
            }
            Op::Len => prop_assert_eq!(map.len(), model.len()),
            Op::Clear => {
                map.clear();
                model.clear();
            }
        }
        prop_assert_eq!(map.is_empty(), model.is_empty());
    }

    prop_assert_eq!(map.len(), model.len());
    for (&k, &v) in &model {
        prop_assert_eq!(map.get(k), Some(v));
    }
    Ok(())
}

proptest! {
    #[test]
    fn test_coarse_matches_model(ops in prop::collection::vec(op(), 1..300)) {
        check_against_model(&CoarseMap::new(), &ops)?;
    }

    #[test]
    fn test_segmented_matches_model(
        segments in 1usize..33,
        ops in prop::collection::vec(op(), 1..300),
    ) {
        let map = SegmentedMap::with_segments(segments).unwrap();
        check_against_model(&map, &ops)?;
    }

    #[test]
    fn test_segment_sizes_sum_to_len(
        segments in 1usize..17,
        keys in prop::collection::hash_set(any::<i64>(), 0..200),
    ) {
        let map = SegmentedMap::with_segments(segments).unwrap();
        for &k in &keys {
            map.put(k, k).unwrap();
        }
        let total: usize = (0..segments).filter_map(|i| map.segment_len(i)).sum();
        prop_assert_eq!(total, keys.len());
        prop_assert_eq!(map.len(), keys.len());
        for &k in &keys {
            prop_assert!(map.segment_of(k) < segments);
        }
    }
}
