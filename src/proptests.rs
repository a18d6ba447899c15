use std::collections::BTreeSet;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::LearnedArt;

/// Simple model implementation using BTreeSet for comparison. Keys are the
/// big-endian encodings of the tuple identifiers, so set membership is the
/// whole story.
#[derive(Default)]
struct Model {
    set: BTreeSet<u64>,
}

/// Actions to test against both implementations
#[derive(Arbitrary, Debug, Clone)]
enum Action {
    Insert(Tid),
    Lookup(Tid),
    Erase(Tid),
}

/// Tuple identifier with a strategy skewed toward collisions and shared
/// prefixes.
#[derive(Debug, Clone, Copy)]
struct Tid(u64);

impl Arbitrary for Tid {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            // Dense low values collide constantly
            (0u64..16).prop_map(Tid),
            (0u64..4096).prop_map(Tid),
            // Shared high bytes with varying tails exercise path compression
            (0u64..256).prop_map(|low| Tid(0x00ab_cdef_0000_0000 | low)),
            // Anything in the 63-bit space
            any::<u64>().prop_map(|v| Tid(v >> 1)),
        ]
        .boxed()
    }
}

/// Test harness that executes actions on both LearnedArt and Model
#[derive(Default)]
struct Test {
    tree: LearnedArt,
    model: Model,
}

impl Test {
    fn execute(&mut self, action: Action) {
        match action {
            Action::Insert(Tid(tid)) => {
                let key = tid.to_be_bytes();
                let tree_result = self.tree.insert(&key, tid);
                let was_present = !self.model.set.insert(tid);
                assert_eq!(
                    tree_result,
                    was_present.then_some(tid),
                    "insert mismatch for tid={tid}"
                );
            }
            Action::Lookup(Tid(tid)) => {
                let key = tid.to_be_bytes();
                let expected = self.model.set.contains(&tid).then_some(tid);
                assert_eq!(self.tree.lookup(&key), expected, "lookup mismatch for tid={tid}");
                assert_eq!(
                    self.tree.lookup_pessimistic(&key),
                    expected,
                    "pessimistic lookup mismatch for tid={tid}"
                );
            }
            Action::Erase(Tid(tid)) => {
                let key = tid.to_be_bytes();
                let expected = self.model.set.remove(&tid).then_some(tid);
                assert_eq!(self.tree.erase(&key), expected, "erase mismatch for tid={tid}");
            }
        }
        assert_eq!(
            self.tree.len(),
            self.model.set.len(),
            "length mismatch after action"
        );
        assert_eq!(self.tree.is_empty(), self.model.set.is_empty());
        assert_eq!(self.tree.minimum(), self.model.set.first().copied());
        assert_eq!(self.tree.maximum(), self.model.set.last().copied());
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_vs_btreeset(actions in prop::collection::vec(any::<Action>(), 1..64)) {
        let mut test = Test::default();
        for action in actions {
            test.execute(action);
        }
    }

    #[test]
    fn proptest_bulk_load_equals_point_inserts(
        tids in prop::collection::btree_set(any::<u64>().prop_map(|v| v >> 1), 0..400),
        probes in prop::collection::vec(any::<u64>().prop_map(|v| v >> 1), 0..64),
    ) {
        let tids: Vec<u64> = tids.into_iter().collect();
        let mut bulk = LearnedArt::new();
        bulk.bulk_insert(&tids);
        let mut point = LearnedArt::new();
        for &tid in &tids {
            point.insert(&tid.to_be_bytes(), tid);
        }

        prop_assert_eq!(bulk.len(), point.len());
        for &tid in &tids {
            prop_assert_eq!(bulk.lookup(&tid.to_be_bytes()), Some(tid));
        }
        for probe in probes {
            let key = probe.to_be_bytes();
            prop_assert_eq!(bulk.lookup(&key), point.lookup(&key));
            prop_assert_eq!(bulk.lookup_pessimistic(&key), point.lookup_pessimistic(&key));
        }
    }

    #[test]
    fn proptest_erase_all_leaves_an_empty_tree(
        tids in prop::collection::btree_set(any::<u64>().prop_map(|v| v >> 1), 1..200),
    ) {
        let tids: Vec<u64> = tids.into_iter().collect();
        let mut tree = LearnedArt::new();
        tree.bulk_insert(&tids);
        for &tid in &tids {
            prop_assert_eq!(tree.erase(&tid.to_be_bytes()), Some(tid));
        }
        prop_assert!(tree.is_empty());
        prop_assert_eq!(tree.minimum(), None);
    }
}
