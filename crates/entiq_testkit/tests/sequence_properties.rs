//! Property-based sequence invariants.

use entiq_core::{Direction, Sequence};
use entiq_testkit::prelude::*;
use proptest::prelude::*;

fn sequence_of(users: &[User]) -> Sequence<User> {
    Sequence::of(users.to_vec())
}

proptest! {
    #[test]
    fn add_grows_the_size_by_one(users in users_strategy(20), user in user_strategy()) {
        let sequence = sequence_of(&users);
        let added = sequence.add(user).unwrap();
        prop_assert_eq!(added.size().unwrap(), sequence.size().unwrap() + 1);
    }

    #[test]
    fn add_makes_the_element_contained(users in users_strategy(20), user in user_strategy()) {
        let sequence = sequence_of(&users);
        prop_assert!(sequence.add(user.clone()).unwrap().contains(&user).unwrap());
    }

    #[test]
    fn an_absent_element_is_not_contained(users in users_strategy(20), user in user_strategy()) {
        prop_assume!(!users.contains(&user));
        prop_assert!(!sequence_of(&users).contains(&user).unwrap());
    }

    #[test]
    fn add_appends_at_the_end(users in users_strategy(20), user in user_strategy()) {
        let sequence = sequence_of(&users);
        let added = sequence.add(user.clone()).unwrap();
        let tail = added.drop(sequence.size().unwrap());
        prop_assert!(tail.equals(&Sequence::of(vec![user])).unwrap());
    }

    #[test]
    fn clear_yields_an_empty_sequence(users in users_strategy(20)) {
        let cleared = sequence_of(&users).clear();
        prop_assert!(cleared.empty().unwrap());
        prop_assert_eq!(cleared.size().unwrap(), 0);
    }

    #[test]
    fn a_sequence_equals_itself(users in users_strategy(20)) {
        let sequence = sequence_of(&users);
        prop_assert!(sequence.equals(&sequence).unwrap());
    }

    #[test]
    fn a_sequence_equals_a_new_sequence_of_the_same_elements(users in users_strategy(20)) {
        prop_assert!(sequence_of(&users).equals(&sequence_of(&users)).unwrap());
    }

    #[test]
    fn size_is_the_number_of_elements(users in users_strategy(20)) {
        prop_assert_eq!(sequence_of(&users).size().unwrap(), users.len());
    }

    #[test]
    fn filter_is_idempotent(users in users_strategy(20)) {
        let sequence = sequence_of(&users);
        let once = sequence.filter(|user| user.register_index % 2 == 0).unwrap();
        let twice = once.filter(|user| user.register_index % 2 == 0).unwrap();
        prop_assert!(once.equals(&twice).unwrap());
    }

    #[test]
    fn filtering_an_empty_sequence_has_no_effect(user in user_strategy()) {
        let empty = Sequence::<User>::of(Vec::new());
        let filtered = empty.filter(|candidate| candidate == &user).unwrap();
        prop_assert!(filtered.empty().unwrap());
    }

    #[test]
    fn drop_is_deterministic(users in users_strategy(20), count in 0usize..30) {
        let sequence = sequence_of(&users);
        prop_assert!(sequence.drop(count).equals(&sequence.drop(count)).unwrap());
    }

    #[test]
    fn dropping_the_size_of_the_sequence_makes_it_empty(users in users_strategy(20)) {
        let sequence = sequence_of(&users);
        prop_assert!(sequence.drop(users.len()).empty().unwrap());
    }

    #[test]
    fn take_never_grows_the_sequence(users in users_strategy(20), count in 0usize..30) {
        let sequence = sequence_of(&users);
        let taken = sequence.take(count);
        prop_assert!(taken.size().unwrap() <= sequence.size().unwrap());
        prop_assert!(taken.size().unwrap() <= count);
    }

    #[test]
    fn taken_elements_are_contained_in_the_source(users in users_strategy(20), count in 0usize..30) {
        let sequence = sequence_of(&users);
        let taken = sequence.take(count).to_vec().unwrap();
        for user in taken {
            prop_assert!(sequence.contains(&user).unwrap());
        }
    }

    #[test]
    fn foreach_visits_elements_in_order(users in users_strategy(20)) {
        let sequence = sequence_of(&users);
        let mut visited = Vec::new();
        sequence.foreach(|user| visited.push(user.clone())).unwrap();
        prop_assert_eq!(visited, users);
    }

    #[test]
    fn map_preserves_the_size(users in users_strategy(20)) {
        let sequence = sequence_of(&users);
        let mapped = sequence.map(|user| user.username.clone()).unwrap();
        prop_assert_eq!(mapped.size().unwrap(), users.len());
    }

    #[test]
    fn append_puts_the_other_elements_strictly_after(
        head in users_strategy(10),
        tail in users_strategy(10),
    ) {
        let appended = sequence_of(&head).append(&sequence_of(&tail)).unwrap();
        let mut expected = head.clone();
        expected.extend(tail);
        prop_assert_eq!(appended.to_vec().unwrap(), expected);
    }

    #[test]
    fn find_returns_the_first_match(users in users_strategy(20)) {
        let sequence = sequence_of(&users);
        match users.iter().find(|user| user.username == "alice") {
            Some(expected) => {
                let found = sequence.find(|user| user.username == "alice").unwrap();
                prop_assert_eq!(&found, expected);
            }
            None => {
                prop_assert!(sequence.find(|user| user.username == "alice").is_err());
            }
        }
    }

    #[test]
    fn sort_is_idempotent_under_repeated_identical_sort(users in users_strategy(20)) {
        let sequence = sequence_of(&users);
        let once = sequence.sort("registerIndex", Direction::Ascending);
        let round_trip = once
            .sort("registerIndex", Direction::Descending)
            .sort("registerIndex", Direction::Ascending);
        prop_assert!(round_trip.equals(&once).unwrap());
    }

    #[test]
    fn sort_orders_by_the_property(users in users_strategy(20)) {
        let sorted = sequence_of(&users)
            .sort("registerIndex", Direction::Ascending)
            .to_vec()
            .unwrap();
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].register_index <= pair[1].register_index);
        }
    }

    #[test]
    fn descending_sort_reverses_the_comparison(users in users_strategy(20)) {
        let sorted = sequence_of(&users)
            .sort("registerIndex", Direction::Descending)
            .to_vec()
            .unwrap();
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].register_index >= pair[1].register_index);
        }
    }

    #[test]
    fn reduce_accumulates_left_to_right(users in users_strategy(20)) {
        let sequence = sequence_of(&users);
        let collected = sequence
            .reduce(Vec::new(), |mut acc, user| {
                acc.push(user.clone());
                acc
            })
            .unwrap();
        prop_assert_eq!(collected, users);
    }
}
