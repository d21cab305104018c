//! Exactly-once execution of deferred fetches, observed through a manager
//! driving recording store stubs.

use entiq_core::{Comparator, Direction, Manager, Selection, Sign, Specification, Value};
use entiq_testkit::prelude::*;

fn username_is(value: &str) -> Specification {
    Comparator::new("username", Sign::Equality, value).into()
}

fn users() -> Vec<User> {
    vec![
        User::new("alice", 1),
        User::new("bob", 2),
        User::new("jane", 3),
        User::new("john", 4),
        User::new("alice", 5),
    ]
}

#[test]
fn criteria_fetch_hits_the_store_exactly_once() {
    let store = StubStore::new();
    let repository = RecordingRepository::new(users());
    store.register::<User>(repository.clone());
    let manager = Manager::new(store);

    let sequence = manager
        .repository::<User>()
        .matching(username_is("alice"))
        .fetch()
        .unwrap();

    sequence.size().unwrap();
    sequence.size().unwrap();
    sequence.foreach(|_| {}).unwrap();
    assert_eq!(repository.call_count(), 1);
}

#[test]
fn accumulated_paging_reaches_the_store_as_one_call() {
    let store = StubStore::new();
    let repository = RecordingRepository::new(users());
    store.register::<User>(repository.clone());
    let manager = Manager::new(store);

    let sequence = manager
        .repository::<User>()
        .matching(username_is("alice"))
        .fetch()
        .unwrap()
        .drop(3)
        .drop(3)
        .take(5);

    sequence.size().unwrap();
    sequence.size().unwrap();

    let calls = repository.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].drop, Some(6));
    assert_eq!(calls[0].take, Some(5));
    assert_eq!(calls[0].criteria["username"], Value::from("alice"));
}

#[test]
fn matching_pushes_sort_drop_and_take_down_to_the_criteria_call() {
    let store = StubStore::new();
    let repository = RecordingRepository::new(users());
    store.register::<User>(repository.clone());
    let manager = Manager::new(store);

    manager
        .repository::<User>()
        .matching(username_is("alice"))
        .sort("username", Direction::Ascending)
        .sort("registerIndex", Direction::Descending)
        .drop(2)
        .take(10)
        .fetch()
        .unwrap()
        .size()
        .unwrap();

    let calls = repository.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].sort,
        vec![
            ("username".to_owned(), Direction::Ascending),
            ("registerIndex".to_owned(), Direction::Descending),
        ]
    );
    assert_eq!(calls[0].drop, Some(2));
    assert_eq!(calls[0].take, Some(10));
}

#[test]
fn compiled_fetch_hits_the_executor_exactly_once() {
    let store = StubStore::new();
    let executor = RecordingExecutor::new("user", users(), user_metadata());
    store.register::<User>(ExecutorRepository::new(executor.clone()));
    let manager = Manager::new(store);

    let sequence = manager
        .repository::<User>()
        .matching(username_is("alice"))
        .sort("username", Direction::Ascending)
        .drop(1)
        .take(2)
        .fetch()
        .unwrap();

    sequence.size().unwrap();
    sequence.size().unwrap();

    let queries = executor.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(
        queries[0].to_string(),
        "SELECT entity FROM user entity WHERE entity.username = ?1 \
         ORDER BY entity.username asc"
    );
    assert_eq!(queries[0].first_result(), Some(1));
    assert_eq!(queries[0].max_results(), Some(2));
}

#[test]
fn json_typed_columns_compile_through_the_fixture_metadata() {
    let store = StubStore::new();
    let executor = RecordingExecutor::new("user", users(), user_metadata());
    store.register::<User>(ExecutorRepository::new(executor.clone()));
    let manager = Manager::new(store);

    manager
        .repository::<User>()
        .matching(Comparator::new("roles", Sign::Equality, "admin").into())
        .fetch()
        .unwrap()
        .size()
        .unwrap();

    assert_eq!(
        executor.queries()[0].to_string(),
        "SELECT entity FROM user entity WHERE json_value(entity.roles, '$') = ?1"
    );
}

#[test]
fn count_compiles_a_count_query_on_the_rich_path() {
    let store = StubStore::new();
    let executor = RecordingExecutor::new("user", users(), user_metadata());
    store.register::<User>(ExecutorRepository::new(executor.clone()));
    let manager = Manager::new(store);

    let count = manager
        .repository::<User>()
        .count(Some(&username_is("alice")))
        .unwrap();

    assert_eq!(count, users().len());
    let queries = executor.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].selection(), Selection::Count);
    assert_eq!(
        queries[0].to_string(),
        "SELECT COUNT(entity) FROM user entity WHERE entity.username = ?1"
    );
}

#[test]
fn count_falls_back_to_fetch_and_measure_on_the_criteria_path() {
    let store = StubStore::new();
    let repository = RecordingRepository::new(users());
    store.register::<User>(repository.clone());
    let manager = Manager::new(store);

    let count = manager
        .repository::<User>()
        .count(Some(&username_is("alice")))
        .unwrap();

    assert_eq!(count, users().len());
    assert_eq!(repository.call_count(), 1);
}

#[test]
fn writes_reach_the_store_only_inside_a_mutation_context() {
    let store = StubStore::new();
    store.register::<User>(RecordingRepository::new(Vec::new()));
    let manager = Manager::new(store);
    let repository = manager.repository::<User>();

    assert!(repository.add(User::new("alice", 1)).is_err());

    manager
        .mutate(|_| {
            repository
                .add(User::new("alice", 1))
                .map_err(|fault| fault.to_string())
        })
        .unwrap()
        .unwrap();
}
