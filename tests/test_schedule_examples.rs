mod common;

use common::{control, resource, train};
use railflow_core::domain::rail_system_model::conflict::conflict::Conflict;
use railflow_core::domain::rail_system_model::constraint::constraint_violation::ConstraintViolation;
use railflow_core::domain::rail_system_model::precedence::suggestion::{SuggestedAction, SuggestionChoice};
use railflow_core::domain::rail_system_model::scenario::perturbation::Perturbation;
use railflow_core::domain::rail_system_model::schedule::block_filter::BlockFilter;
use railflow_core::domain::rail_system_model::utils::time::TimeInterval;
use railflow_core::error::{NotFound, ScheduleError};

#[test]
fn test_express_keeps_platform_and_local_is_shifted_to_1630() {
    let control = control();

    let express = control.assign(0, &train("T1"), &resource("P1"), TimeInterval::hm((14, 0), (16, 30)), false).unwrap();
    let local = control.assign(1, &train("T2"), &resource("P1"), TimeInterval::hm((16, 0), (17, 0)), true).unwrap();
    assert_eq!(local.version, 2);

    assert_eq!(
        control.list_conflicts(),
        vec![Conflict::Overlap { resource_id: resource("P1"), block_a: express.value, block_b: local.value, overlap: TimeInterval::hm((16, 0), (16, 30)) }]
    );

    let resolution = control.suggestions();
    assert_eq!(resolution.groups.len(), 1);
    assert_eq!(resolution.groups[0].order, vec![express.value, local.value]);

    assert_eq!(resolution.suggestions.len(), 1);
    let suggestion = &resolution.suggestions[0];
    assert_eq!(suggestion.block_id, local.value);
    assert_eq!(suggestion.rank, 1);
    assert_eq!(suggestion.action, SuggestedAction::Shift { to: TimeInterval::hm((16, 30), (17, 30)) });

    control.accept_suggestion(2, local.value, SuggestionChoice::Shift).unwrap();
    assert!(control.list_conflicts().is_empty());
    assert_eq!(control.store().block(express.value).unwrap().interval, TimeInterval::hm((14, 0), (16, 30)));
}

#[test]
fn test_electrification_violation_leaves_version_unchanged() {
    let control = control();

    let result = control.assign(0, &train("T1"), &resource("TX"), TimeInterval::hm((10, 0), (10, 30)), false);

    assert_eq!(
        result,
        Err(ScheduleError::ConstraintViolation(ConstraintViolation::ElectrificationMismatch { train_id: train("T1"), resource_id: resource("TX") }))
    );
    assert_eq!(control.current_version(), 0);
    assert!(control.list_blocks(&BlockFilter::All).is_empty());
    assert!(control.store().audit_log().is_empty());
}

#[test]
fn test_forked_delay_is_measured_and_discarded() {
    let control = control();
    control.assign(0, &train("T1"), &resource("TA"), TimeInterval::hm((10, 0), (10, 30)), false).unwrap();
    control.assign(1, &train("T1"), &resource("P1"), TimeInterval::hm((10, 30), (11, 0)), false).unwrap();
    let live_before = control.list_blocks(&BlockFilter::All);

    let handle = control.fork_scenario(2, "late express").unwrap();
    control.apply_perturbation(handle, Perturbation::DelayTrain { train_id: train("T1"), minutes: 20 }).unwrap();

    let metrics = control.evaluate_scenario(handle).unwrap();
    assert_eq!(metrics.total_delay_minutes, 40);
    assert_eq!(metrics.conflict_count, 0);

    control.discard_scenario(handle).unwrap();

    assert_eq!(control.list_blocks(&BlockFilter::All), live_before);
    assert_eq!(control.current_version(), 2);
    assert_eq!(control.evaluate_scenario(handle), Err(ScheduleError::NotFound(NotFound::Scenario)));
}

#[test]
fn test_concurrent_reschedule_of_same_version_is_stale() {
    let control = control();
    let block = control.assign(0, &train("T2"), &resource("P2"), TimeInterval::hm((9, 0), (9, 20)), false).unwrap().value;

    let desk_a = control.store().as_actor("desk-a");
    let desk_b = control.store().as_actor("desk-b");

    let first = desk_a.reschedule(1, block, TimeInterval::hm((9, 10), (9, 30)), false).unwrap();
    assert_eq!(first.version, 2);

    let second = desk_b.reschedule(1, block, TimeInterval::hm((9, 40), (10, 0)), false);
    assert_eq!(second, Err(ScheduleError::StaleVersion { expected: 1, current: 2 }));
    assert_eq!(control.store().block(block).unwrap().interval, TimeInterval::hm((9, 10), (9, 30)));
}

#[test]
fn test_threaded_writers_at_same_version_one_wins() {
    let control = control();
    let first_block = control.assign(0, &train("T2"), &resource("P1"), TimeInterval::hm((9, 0), (9, 20)), false).unwrap().value;
    let second_block = control.assign(1, &train("T4"), &resource("P2"), TimeInterval::hm((9, 0), (9, 20)), false).unwrap().value;

    let desk_a = control.store().as_actor("desk-a");
    let desk_b = control.store().as_actor("desk-b");

    let (a, b) = std::thread::scope(|scope| {
        let a = scope.spawn(|| desk_a.reschedule(2, first_block, TimeInterval::hm((9, 30), (9, 50)), false));
        let b = scope.spawn(|| desk_b.reschedule(2, second_block, TimeInterval::hm((10, 0), (10, 20)), false));
        (a.join().unwrap(), b.join().unwrap())
    });

    let stale = Err(ScheduleError::StaleVersion { expected: 2, current: 3 });
    let (winner, moved, kept) = match (&a, &b) {
        (Ok(receipt), loser) => {
            assert_eq!(loser, &stale);
            (receipt.version, first_block, second_block)
        }
        (loser, Ok(receipt)) => {
            assert_eq!(loser, &stale);
            (receipt.version, second_block, first_block)
        }
        _ => panic!("one writer must succeed: {:?} / {:?}", a, b),
    };

    assert_eq!(winner, 3);
    assert_eq!(control.current_version(), 3);
    assert_ne!(control.store().block(moved).unwrap().interval, TimeInterval::hm((9, 0), (9, 20)));
    assert_eq!(control.store().block(kept).unwrap().interval, TimeInterval::hm((9, 0), (9, 20)));
}

#[test]
fn test_weather_derate_stretches_blocks_by_thirty_percent() {
    let control = control();
    control.assign(0, &train("T1"), &resource("TA"), TimeInterval::hm((10, 0), (11, 0)), false).unwrap();

    let handle = control.fork_scenario(1, "storm").unwrap();
    control.apply_perturbation(handle, Perturbation::WeatherDerate { severity: 3.0, affected_resource_ids: vec![resource("TA")] }).unwrap();

    let blocks = control.simulator().list_blocks(handle, &BlockFilter::Resource(resource("TA"))).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].interval, TimeInterval::hm((10, 0), (11, 18)));

    // The live schedule is untouched.
    assert_eq!(control.list_blocks(&BlockFilter::Resource(resource("TA")))[0].interval, TimeInterval::hm((10, 0), (11, 0)));
}
