// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use std::fs;
use tempfile::tempdir;
use x_match_core::{
    AircraftIcaoCode, AircraftModel, CachedRuleProvider, CaseSensitivity, InitEvent,
    MappingProvider, MappingRule, MatchStrategy, Matcher, MatcherSetup, ModelSetCache,
    ModelSynchronizer, RuleFileProvider, SimulatedAircraft,
};

const RULES: &str = "\
# Southwest
SWA123      = B738_SWA
b738/swa    = B738_SWA_FLEET
B738/*      = B738_GENERIC

; broken records are skipped
SWA999
C172/ = C172_NOT_INSTALLED
";

fn installed() -> Vec<AircraftModel> {
    vec![
        AircraftModel::new("B738_SWA").with_aircraft_icao(AircraftIcaoCode::new("B738")),
        AircraftModel::new("b738_swa_fleet").with_aircraft_icao(AircraftIcaoCode::new("B738")),
        AircraftModel::new("B738_GENERIC").with_aircraft_icao(AircraftIcaoCode::new("B738")),
    ]
}

#[test]
fn test_rule_file_drives_matcher() {
    let dir = tempdir().unwrap();
    let rules_path = dir.path().join("rules.txt");
    fs::write(&rules_path, RULES).unwrap();

    let matcher = Matcher::new(
        MatcherSetup::default(),
        AircraftModel::new("DEFAULT"),
        Box::new(RuleFileProvider::new(&rules_path)),
        installed(),
    )
    .unwrap();

    assert_eq!(
        matcher.init_blocking(),
        Some(InitEvent::Finished {
            rules_read: 4,
            rules_synchronized: 3,
            provider_ok: true
        })
    );

    let icao = AircraftIcaoCode::new("B738");
    let cases = [("SWA123", "B738_SWA"), ("SWA77", "b738_swa_fleet"), ("N1", "B738_GENERIC")];
    for (callsign, expected) in cases {
        let remote = SimulatedAircraft::new(callsign).with_aircraft_icao(icao.clone());
        let result = matcher.match_aircraft(&remote, None);
        assert_eq!(result.strategy, MatchStrategy::ModelMapping);
        assert_eq!(result.model.model_string, expected);
    }
}

#[test]
fn test_stale_rules_report() {
    let dir = tempdir().unwrap();
    let rules_path = dir.path().join("rules.txt");
    fs::write(&rules_path, RULES).unwrap();

    let mut provider = RuleFileProvider::new(&rules_path);
    provider.read().unwrap();
    assert_eq!(provider.skipped_lines(), 1);

    let (models, _) = x_match_core::ModelSet::from_models(installed());
    let stale = ModelSynchronizer::stale_rules(
        provider.mapping_list(),
        &models.model_names(),
        CaseSensitivity::Insensitive,
    );
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].to_string(), "C172/* = C172_NOT_INSTALLED");
}

#[test]
fn test_cached_rules_and_models_from_disk() {
    let dir = tempdir().unwrap();
    let models_path = dir.path().join("models.json");
    let rules_path = dir.path().join("rules.json");

    ModelSetCache::new("XPlane", installed()).save(&models_path).unwrap();
    CachedRuleProvider::new(&rules_path)
        .store(vec![MappingRule::for_callsign("SWA123", "B738_SWA")])
        .unwrap();

    let matcher = Matcher::new(
        MatcherSetup::default(),
        AircraftModel::new("DEFAULT"),
        Box::new(CachedRuleProvider::new(&rules_path)),
        ModelSetCache::load(&models_path).models,
    )
    .unwrap();
    matcher.init_blocking();

    assert_eq!(matcher.count_installed_models(), 3);
    assert_eq!(matcher.count_mapping_rules(), 1);
    let remote = SimulatedAircraft::new("swa123");
    assert_eq!(matcher.get_closest_match(&remote).model_string, "B738_SWA");
}
