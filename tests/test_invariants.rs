mod common;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;

use common::{resource, store, train};
use railflow_core::domain::rail_system_model::block::block::BlockId;
use railflow_core::domain::rail_system_model::conflict::conflict::Conflict;
use railflow_core::domain::rail_system_model::precedence::precedence_compare::PrecedenceCompare;
use railflow_core::domain::rail_system_model::rail_control::RailControl;
use railflow_core::domain::rail_system_model::schedule::block_filter::BlockFilter;
use railflow_core::domain::rail_system_model::schedule::interval_store::IntervalStore;
use railflow_core::domain::rail_system_model::utils::time::TimeInterval;

const TRAINS: [&str; 4] = ["T1", "T2", "T3", "T4"];
const RESOURCES: [&str; 3] = ["P1", "P2", "TA"];

/// Issues `steps` random commands against `store`. Rejected commands are part of the sequence.
fn random_commands(store: &IntervalStore, seed: u64, steps: usize, allow_conflict: bool) {
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..steps {
        let version = store.current_version();
        let blocks: Vec<BlockId> = store.list_blocks(&BlockFilter::All).iter().map(|block| block.id).collect();

        let start = rng.random_range(6 * 60..22 * 60);
        let interval = TimeInterval::new(start, start + rng.random_range(5..45));
        let override_now = allow_conflict && rng.random_bool(0.3);

        let _ = match (rng.random_range(0..4), blocks.choose(&mut rng)) {
            (1, Some(block)) => store.reschedule(version, *block, interval, override_now).map(|_| ()),
            (2, Some(block)) => {
                let target = resource(RESOURCES.choose(&mut rng).copied().unwrap_or("P1"));
                store.move_block(version, *block, &target, override_now).map(|_| ())
            }
            (3, Some(block)) => store.release(version, *block).map(|_| ()),
            _ => {
                let train_id = train(TRAINS.choose(&mut rng).copied().unwrap_or("T1"));
                let resource_id = resource(RESOURCES.choose(&mut rng).copied().unwrap_or("P1"));
                store.assign(version, &train_id, &resource_id, interval, override_now).map(|_| ())
            }
        };
    }
}

#[test]
fn test_no_overlap_without_override() {
    let store = store();
    let mut rng = StdRng::seed_from_u64(11);

    for round in 0..20 {
        random_commands(&store, rng.random(), 25, false);

        let overlaps = store.conflicts().iter().filter(|conflict| conflict.is_overlap()).count();
        assert_eq!(overlaps, 0, "round {}: overlap admitted without override", round);

        for id in ["P1", "P2", "TA"] {
            let blocks = store.list_blocks(&BlockFilter::Resource(resource(id)));
            for pair in blocks.windows(2) {
                assert!(pair[0].end() <= pair[1].start(), "round {}: {} and {} overlap on {}", round, pair[0].id, pair[1].id, id);
            }
        }
    }

    assert!(store.current_version() > 0);
}

#[test]
fn test_equal_command_sequences_give_equal_state() {
    let a = store();
    let b = store();

    random_commands(&a, 2024, 200, true);
    random_commands(&b, 2024, 200, true);

    assert_eq!(a.current_version(), b.current_version());
    assert_eq!(a.list_blocks(&BlockFilter::All), b.list_blocks(&BlockFilter::All));
    assert_eq!(*a.conflicts(), *b.conflicts());
    assert_eq!(*a.resolution(), *b.resolution());

    let window = TimeInterval::hm((6, 0), (23, 0));
    let (mut csv_a, mut csv_b) = (Vec::new(), Vec::new());
    RailControl::new(a).export_resources(&mut csv_a, &window).unwrap();
    RailControl::new(b).export_resources(&mut csv_b, &window).unwrap();
    assert_eq!(csv_a, csv_b);
}

#[test]
fn test_conflicts_are_canonical() {
    let store = store();
    random_commands(&store, 99, 200, true);

    let conflicts = store.conflicts();
    for conflict in conflicts.iter() {
        if let Conflict::Overlap { block_a, block_b, .. } = conflict {
            assert!(block_a < block_b);
        }
    }
}

#[test]
fn test_precedence_order_is_strict() {
    let store = store();
    let slot = TimeInterval::hm((12, 0), (12, 30));

    // Same priority and start: only the train id separates T2 and T4.
    let t4 = store.assign(0, &train("T4"), &resource("P1"), slot, true).unwrap().value;
    let t2 = store.assign(1, &train("T2"), &resource("P1"), slot, true).unwrap().value;
    // Same train twice: only the block id is left.
    let t2_again = store.assign(2, &train("T2"), &resource("P1"), slot, true).unwrap().value;
    let t1 = store.assign(3, &train("T1"), &resource("P1"), slot, true).unwrap().value;

    let resolution = store.resolution();
    assert_eq!(resolution.groups.len(), 1);
    assert_eq!(resolution.groups[0].order, vec![t1, t2, t2_again, t4]);

    let state = store.snapshot();
    let compare = PrecedenceCompare::new(state.trains());
    let blocks = store.list_blocks(&BlockFilter::All);
    for a in &blocks {
        for b in &blocks {
            let forward = compare.compare(a, b);
            assert_eq!(forward, compare.compare(b, a).reverse());
            assert_eq!(forward == Ordering::Equal, a.id == b.id);
        }
    }
}
