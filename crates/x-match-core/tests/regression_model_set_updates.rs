// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use x_match_core::{
    AircraftIcaoCode, AircraftModel, MappingRule, MatchStrategy, Matcher, MatcherSetup,
    SimulatedAircraft, StaticRuleProvider,
};

fn a320(name: &str) -> AircraftModel {
    AircraftModel::new(name).with_aircraft_icao(AircraftIcaoCode::new("A320"))
}

fn matcher_with(setup: MatcherSetup, models: Vec<AircraftModel>) -> Matcher {
    let matcher = Matcher::new(
        setup,
        AircraftModel::new("DEFAULT"),
        Box::new(StaticRuleProvider::new(vec![
            MappingRule::for_callsign("DLH1", "A320_A"),
            MappingRule::for_callsign("DLH2", "A320_NEW"),
        ])),
        models,
    )
    .unwrap();
    matcher.init_blocking();
    matcher
}

#[test]
fn test_new_models_resynchronize_rules() {
    let matcher = matcher_with(MatcherSetup::default(), vec![a320("A320_A")]);
    assert_eq!(matcher.count_mapping_rules(), 1);

    let report = matcher.set_installed_models(vec![a320("A320_A"), a320("a320_new"), a320("A320_A")]);
    assert_eq!(report.accepted, 2);
    assert_eq!(report.duplicates.len(), 1);
    assert_eq!(matcher.count_installed_models(), 2);
    assert_eq!(matcher.count_mapping_rules(), 2);

    matcher.set_installed_models(Vec::new());
    assert_eq!(matcher.count_mapping_rules(), 0);
    assert_eq!(matcher.count_installed_models(), 0);
}

#[test]
fn test_models_set_before_init_are_used_by_init() {
    let matcher = Matcher::new(
        MatcherSetup::default(),
        AircraftModel::new("DEFAULT"),
        Box::new(StaticRuleProvider::new(vec![MappingRule::for_callsign("DLH1", "A320_A")])),
        Vec::new(),
    )
    .unwrap();
    matcher.set_installed_models(vec![a320("A320_A")]);
    assert_eq!(matcher.count_mapping_rules(), 0);

    matcher.init_blocking();
    assert_eq!(matcher.count_mapping_rules(), 1);
}

#[test]
fn test_failed_model_is_removed_and_avoided() {
    let matcher = matcher_with(MatcherSetup::default(), vec![a320("A320_A"), a320("A320_B")]);
    let remote = SimulatedAircraft::new("DLH1").with_aircraft_icao(AircraftIcaoCode::new("A320"));
    assert_eq!(matcher.get_closest_match(&remote).model_string, "A320_A");

    assert!(matcher.model_failed("a320_a"));
    assert!(!matcher.model_failed("A320_A"));
    assert_eq!(matcher.count_installed_models(), 1);
    assert_eq!(matcher.count_mapping_rules(), 0);

    let result = matcher.match_aircraft(&remote, None);
    assert_eq!(result.strategy, MatchStrategy::ModelMatching);
    assert_eq!(result.model.model_string, "A320_B");
}

#[test]
fn test_failed_non_ascii_model_is_disabled() {
    let matcher = matcher_with(
        MatcherSetup::default(),
        vec![a320("Café_A320"), a320("A320_B")],
    );

    assert!(matcher.model_failed("CAFÉ_A320"));
    assert_eq!(matcher.count_installed_models(), 1);
    assert!(matcher.model_set().find_by_model_string("café_a320").is_none());
    assert!(!matcher.model_failed("café_a320"));
}

#[test]
fn test_disabled_models_survive_updates_until_restored() {
    let matcher = matcher_with(MatcherSetup::default(), vec![a320("A320_A"), a320("A320_B")]);
    let remote = SimulatedAircraft::new("DLH1").with_aircraft_icao(AircraftIcaoCode::new("A320"));

    assert!(matcher.model_failed("A320_A"));
    let disabled = matcher.disabled_models();
    assert_eq!(disabled.len(), 1);
    assert_eq!(disabled[0].model_string, "A320_A");

    // A fresh model list does not bring the failed model back
    matcher.set_installed_models(vec![a320("A320_A"), a320("A320_B")]);
    assert_eq!(matcher.count_installed_models(), 1);
    assert_eq!(matcher.count_mapping_rules(), 0);
    assert_eq!(matcher.get_closest_match(&remote).model_string, "A320_B");

    assert_eq!(matcher.restore_disabled_models(), 1);
    assert!(matcher.disabled_models().is_empty());
    assert_eq!(matcher.count_installed_models(), 2);
    assert_eq!(matcher.count_mapping_rules(), 1);
    let result = matcher.match_aircraft(&remote, None);
    assert_eq!(result.strategy, MatchStrategy::ModelMapping);
    assert_eq!(result.model.model_string, "A320_A");

    assert_eq!(matcher.restore_disabled_models(), 0);
}

#[test]
fn test_failed_model_kept_when_disabled_or_default() {
    let mut setup = MatcherSetup::default();
    setup.remove_failed_models = false;
    let matcher = matcher_with(setup, vec![a320("A320_A")]);
    assert!(!matcher.model_failed("A320_A"));
    assert_eq!(matcher.count_installed_models(), 1);

    let matcher = matcher_with(MatcherSetup::default(), vec![a320("DEFAULT"), a320("A320_A")]);
    assert!(!matcher.model_failed("default"));
    assert_eq!(matcher.count_installed_models(), 2);
    assert!(matcher.disabled_models().is_empty());
}

#[test]
fn test_queries_never_see_a_half_swapped_snapshot() {
    let matcher = Arc::new(matcher_with(MatcherSetup::default(), vec![a320("A320_A")]));
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let matcher = matcher.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut flip = false;
            while !stop.load(Ordering::Relaxed) {
                let models = if flip {
                    vec![a320("A320_A")]
                } else {
                    vec![a320("A320_B")]
                };
                matcher.set_installed_models(models);
                flip = !flip;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let matcher = matcher.clone();
            thread::spawn(move || {
                let remote =
                    SimulatedAircraft::new("DLH1").with_aircraft_icao(AircraftIcaoCode::new("A320"));
                for _ in 0..500 {
                    let result = matcher.match_aircraft(&remote, None);
                    let pair = (result.strategy, result.model.model_string.as_str());
                    assert!(
                        pair == (MatchStrategy::ModelMapping, "A320_A")
                            || pair == (MatchStrategy::ModelMatching, "A320_B"),
                        "inconsistent result {:?}",
                        pair
                    );
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();

    assert_eq!(matcher.statistics().totals().total(), 2000);
}
