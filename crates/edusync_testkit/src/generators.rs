//! Property-based test generators using proptest.
//!
//! Provides strategies for generating keys, payloads and update sequences.

use edusync_core::{rule_for, Category, EntityId, Emit, Payload};
use proptest::prelude::*;
use serde_json::Value;

/// Strategy for any category.
pub fn category_strategy() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

/// Strategy for categories whose updates are cached but trigger no rule.
pub fn passive_category_strategy() -> impl Strategy<Value = Category> {
    let passive: Vec<Category> = Category::ALL
        .into_iter()
        .filter(|c| {
            let rule = rule_for(*c);
            rule.invalidates.is_empty() && rule.emit == Emit::Nothing && !rule.parent_cascade
        })
        .collect();
    prop::sample::select(passive)
}

/// Strategy for entity ids such as `student-17`.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    prop::string::string_regex("[a-z]{1,8}-[0-9]{1,4}")
        .expect("Invalid regex")
        .prop_map(EntityId::new)
}

/// Strategy for an optional entity id.
pub fn maybe_entity_strategy() -> impl Strategy<Value = Option<EntityId>> {
    prop::option::of(entity_id_strategy())
}

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// Strategy for flat payloads with up to eight fields.
///
/// Never sets `role` or `moduleId`, so no rule reads it.
pub fn payload_strategy() -> impl Strategy<Value = Payload> {
    prop::collection::btree_map("[a-z]{1,10}", scalar_strategy(), 0..8).prop_map(|fields| {
        let mut payload = Payload::new();
        for (key, value) in fields {
            if key != "role" {
                payload.insert(key, value);
            }
        }
        payload
    })
}

/// Strategy for a sequence of `(category, entity, payload)` updates on
/// passive categories.
pub fn passive_updates_strategy(
    max_len: usize,
) -> impl Strategy<Value = Vec<(Category, Option<EntityId>, Payload)>> {
    prop::collection::vec(
        (passive_category_strategy(), maybe_entity_strategy(), payload_strategy()),
        1..max_len.max(2),
    )
}
