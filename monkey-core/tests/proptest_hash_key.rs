// monkey-core - Property-based tests for hash keys
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

//! Property-based tests for the hash-key contract: two hashable values
//! produce the same key exactly when their type tags match and their
//! payloads compare equal.

use monkey_core::Object;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Integer keys round-trip through the two's-complement bit pattern.
    #[test]
    fn integer_keys_match_iff_values_match(a in any::<i64>(), b in any::<i64>()) {
        let key_a = Object::Integer(a).hash_key().unwrap();
        let key_b = Object::Integer(b).hash_key().unwrap();

        prop_assert_eq!(key_a.value, a as u64);
        prop_assert_eq!(key_a == key_b, a == b);
    }

    /// String keys depend only on content.
    #[test]
    fn string_keys_depend_on_content(s in ".*") {
        let key1 = Object::string(s.as_str()).hash_key().unwrap();
        let key2 = Object::string(s.as_str()).hash_key().unwrap();

        prop_assert_eq!(key1, key2);
    }

    /// Distinct strings should produce distinct keys. FNV-1a is not
    /// collision free in principle, so restrict to short inputs where a
    /// collision would indicate a broken implementation.
    #[test]
    fn distinct_short_strings_get_distinct_keys(
        a in "[a-z]{0,8}",
        b in "[a-z]{0,8}",
    ) {
        prop_assume!(a != b);
        let key_a = Object::string(a.as_str()).hash_key().unwrap();
        let key_b = Object::string(b.as_str()).hash_key().unwrap();

        prop_assert_ne!(key_a, key_b);
    }

    /// The type tag participates in the key: an integer never collides
    /// with a boolean or a string of equal numeric payload.
    #[test]
    fn cross_kind_keys_never_collide(n in any::<i64>()) {
        let int_key = Object::Integer(n).hash_key().unwrap();
        let bool_key = Object::Boolean(n != 0).hash_key().unwrap();
        let string_key = Object::string(n.to_string()).hash_key().unwrap();

        prop_assert_ne!(int_key, bool_key);
        prop_assert_ne!(int_key, string_key);
        prop_assert_ne!(bool_key, string_key);
    }

    /// Hash lookup finds exactly the entries whose keys were inserted.
    #[test]
    fn hash_literal_round_trip(
        keys in prop::collection::btree_set(-1_000_000i64..1_000_000, 1..8),
    ) {
        let keys: Vec<i64> = keys.into_iter().collect();
        let pairs: String = keys
            .iter()
            .map(|k| format!("{}: {}", k, k * 2))
            .collect::<Vec<_>>()
            .join(", ");

        for k in &keys {
            let source = format!("{{{}}}[{}]", pairs, k);
            let program = monkey_parser::Parser::new(&source).parse_program().unwrap();
            let result = monkey_core::eval_program(&program, &monkey_core::Environment::new());
            prop_assert_eq!(result, Object::Integer(k * 2));
        }
    }
}
