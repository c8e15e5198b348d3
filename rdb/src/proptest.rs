// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for the route table using proptest
//!
//! A plain map of sets serves as the model. The table must agree with the
//! model after any operation sequence, including sequences in which every
//! operation is delivered twice.

#[cfg(test)]
mod proptest {
    use crate::table::{RouteTable, Routes};
    use crate::test::{RecordingSink, SinkCall};
    use crate::Asn;
    use proptest::prelude::*;
    use slog::Logger;

    #[derive(Debug, Clone)]
    enum Op {
        Add(String, Asn),
        Remove(String, Asn),
    }

    // A small domain so operations collide often.
    fn subnet_strategy() -> impl Strategy<Value = String> {
        (0u8..4).prop_map(|i| format!("10.0.{i}.0/24"))
    }

    fn asn_strategy() -> impl Strategy<Value = Asn> {
        64500u32..64504
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (subnet_strategy(), asn_strategy())
                .prop_map(|(s, a)| Op::Add(s, a)),
            (subnet_strategy(), asn_strategy())
                .prop_map(|(s, a)| Op::Remove(s, a)),
        ]
    }

    fn table() -> RouteTable<RecordingSink> {
        let log = Logger::root(slog::Discard, slog::o!());
        RouteTable::new(RecordingSink::default(), log)
    }

    fn apply(t: &mut RouteTable<RecordingSink>, op: &Op) {
        match op {
            Op::Add(s, a) => {
                t.add(s, *a, &[*a]);
            }
            Op::Remove(s, a) => {
                t.remove(s, *a);
            }
        }
    }

    fn model(ops: &[Op]) -> Routes {
        let mut m = Routes::new();
        for op in ops {
            match op {
                Op::Add(s, a) => {
                    m.entry(s.clone()).or_default().insert(*a);
                }
                Op::Remove(s, a) => {
                    if let Some(peers) = m.get_mut(s) {
                        peers.remove(a);
                        if peers.is_empty() {
                            m.remove(s);
                        }
                    }
                }
            }
        }
        m
    }

    fn no_empty_entries(t: &RouteTable<RecordingSink>) -> bool {
        t.routes().values().all(|peers| !peers.is_empty())
    }

    proptest! {
        /// Property: delivering every operation twice leaves the same table
        /// as delivering it once
        #[test]
        fn prop_duplicate_delivery_is_idempotent(
            ops in prop::collection::vec(op_strategy(), 0..64)
        ) {
            let mut t = table();
            for op in &ops {
                apply(&mut t, op);
                apply(&mut t, op);
            }
            prop_assert_eq!(t.routes(), &model(&ops));
            prop_assert!(no_empty_entries(&t));
        }

        /// Property: every add and remove issues exactly one sink call, in
        /// the order the operations were applied
        #[test]
        fn prop_sink_calls_follow_mutations(
            ops in prop::collection::vec(op_strategy(), 0..64)
        ) {
            let mut t = table();
            for op in &ops {
                apply(&mut t, op);
            }
            let expected: Vec<SinkCall> = ops
                .iter()
                .map(|op| match op {
                    Op::Add(s, a) => SinkCall::insert(*a, s, &[*a]),
                    Op::Remove(s, a) => SinkCall::delete(*a, s),
                })
                .collect();
            prop_assert_eq!(t.sink().calls(), expected);
        }

        /// Property: removing an untracked route never changes the table
        #[test]
        fn prop_untracked_remove_is_noop(
            ops in prop::collection::vec(op_strategy(), 0..32),
            subnet in subnet_strategy(),
            asn in asn_strategy(),
        ) {
            let mut t = table();
            for op in &ops {
                apply(&mut t, op);
            }
            prop_assume!(!t.contains(&subnet, asn));

            let before = t.routes().clone();
            prop_assert!(!t.remove(&subnet, asn));
            prop_assert_eq!(t.routes(), &before);
        }

        /// Property: after removing a peer no subnet lists it and no subnet
        /// is left with an empty peer set
        #[test]
        fn prop_remove_all_for_peer_purges_peer(
            ops in prop::collection::vec(op_strategy(), 0..64),
            asn in asn_strategy(),
        ) {
            let mut t = table();
            for op in &ops {
                apply(&mut t, op);
            }
            let tracked = t
                .routes()
                .values()
                .filter(|peers| peers.contains(&asn))
                .count();

            prop_assert_eq!(t.remove_all_for_peer(asn), tracked);
            prop_assert!(
                t.routes().values().all(|peers| !peers.contains(&asn))
            );
            prop_assert!(no_empty_entries(&t));
        }

        /// Property: clear empties the table with exactly one truncate
        #[test]
        fn prop_clear_truncates_once(
            ops in prop::collection::vec(op_strategy(), 0..64)
        ) {
            let mut t = table();
            for op in &ops {
                apply(&mut t, op);
            }
            t.sink().take_calls();

            t.clear();
            prop_assert_eq!(t.len(), 0);
            prop_assert_eq!(t.sink().calls(), vec![SinkCall::Truncate]);
        }
    }
}
