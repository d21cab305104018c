//! Property-based test generators using proptest.

use crate::fixtures::User;
use entiq_core::Id;
use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for generating valid identifiers.
pub fn id_strategy<T: 'static>() -> impl Strategy<Value = Id<T>> {
    any::<u128>().prop_map(|raw| Id::from_uuid(Uuid::from_u128(raw)))
}

/// Strategy for generating usernames from a small, collision-friendly set.
pub fn username_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["alice", "bob", "jane", "john"]).prop_map(str::to_owned)
}

/// Strategy for generating users.
pub fn user_strategy() -> impl Strategy<Value = User> {
    (id_strategy(), username_strategy(), any::<i32>()).prop_map(|(id, username, index)| User {
        id,
        username,
        register_index: i64::from(index),
        roles: Vec::new(),
    })
}

/// Strategy for generating up to `max` users.
pub fn users_strategy(max: usize) -> impl Strategy<Value = Vec<User>> {
    prop::collection::vec(user_strategy(), 0..max)
}
