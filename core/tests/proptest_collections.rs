use kern::{ArrayMap, PersistentSet, Value, abstractions, assoc, conj, count, get, nth};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn element() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::int),
        "[a-z]{1,6}".prop_map(|s| Value::keyword(&s)),
        "[a-z ]{0,6}".prop_map(|s| Value::string(&s)),
    ]
}

fn elements() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(element(), 0..20)
}

fn sequential(items: Vec<Value>, as_vector: bool) -> Value {
    if as_vector {
        Value::vector(items)
    } else {
        Value::list(items)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn conj_adds_one_and_leaves_receiver(items in elements(), v in element(), as_vector in any::<bool>()) {
        let coll = sequential(items.clone(), as_vector);
        let snapshot = coll.to_string();
        let grown = conj(&coll, v).unwrap();
        prop_assert_eq!(count(&grown).unwrap(), count(&coll).unwrap() + 1);
        prop_assert_eq!(count(&coll).unwrap(), items.len());
        prop_assert_eq!(coll.to_string(), snapshot);
    }

    #[test]
    fn conj_fresh_element_grows_set(n in 0usize..20) {
        let set = Value::Set((0..n as i64).map(Value::int).collect::<PersistentSet>());
        let grown = conj(&set, Value::int(-1)).unwrap();
        prop_assert_eq!(count(&grown).unwrap(), n + 1);
        prop_assert_eq!(count(&set).unwrap(), n);
        let same = conj(&grown, Value::int(-1)).unwrap();
        prop_assert_eq!(count(&same).unwrap(), n + 1);
    }

    #[test]
    fn assoc_then_get(keys in prop::collection::vec("[a-z]{1,4}", 1..10), v in any::<i64>()) {
        let mut map = Value::Map(ArrayMap::new());
        for k in &keys {
            map = assoc(&map, Value::keyword(k), Value::int(v)).unwrap();
        }
        for k in &keys {
            prop_assert_eq!(get(&map, &Value::keyword(k), Value::Nil), Value::int(v));
        }
        prop_assert_eq!(get(&map, &Value::string("absent"), Value::Nil), Value::Nil);
    }

    #[test]
    fn vector_nth_matches_source(items in elements()) {
        let vec = Value::vector(items.clone());
        for (i, item) in items.iter().enumerate() {
            prop_assert_eq!(&nth(&vec, &Value::int(i as i64), None).unwrap(), item);
        }
        let past = nth(&vec, &Value::int(items.len() as i64), None);
        prop_assert!(past.is_err());
        prop_assert_eq!(
            nth(&vec, &Value::int(items.len() as i64), Some(Value::Nil)).unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn dissoc_leaves_receiver(keys in prop::collection::vec("[a-z]{1,4}", 1..10)) {
        let mut map = Value::Map(ArrayMap::new());
        for (i, k) in keys.iter().enumerate() {
            map = assoc(&map, Value::keyword(k), Value::int(i as i64)).unwrap();
        }
        let before = count(&map).unwrap();
        let removed = abstractions::dissoc(&map, &Value::keyword(&keys[0])).unwrap();
        prop_assert_eq!(count(&removed).unwrap(), before - 1);
        prop_assert_eq!(count(&map).unwrap(), before);
    }
}

#[test]
fn test_assoc_on_empty_map() {
    let map = assoc(&Value::Map(ArrayMap::new()), Value::keyword("a"), Value::int(1)).unwrap();
    assert_eq!(count(&map).unwrap(), 1);
    assert_eq!(get(&map, &Value::keyword("a"), Value::Nil), Value::int(1));
    assert_eq!(
        get(&map, &Value::keyword("b"), Value::keyword("missing")),
        Value::keyword("missing")
    );
}

#[test]
fn test_assoc_requires_associative_receiver() {
    let err = assoc(&Value::list(vec![]), Value::int(0), Value::int(1)).unwrap_err();
    assert_eq!(err.kind().name(), "TypeError");
}
