// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// How a model ended up being the answer for a remote aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ModelType {
    #[default]
    InstalledModel,
    FromMappingRule,
    AlgorithmicMatch,
    ManuallySet,
    Default,
}

impl ModelType {
    pub fn short_code(&self) -> &'static str {
        match self {
            ModelType::InstalledModel => "INS",
            ModelType::FromMappingRule => "MAP",
            ModelType::AlgorithmicMatch => "ALG",
            ModelType::ManuallySet => "MAN",
            ModelType::Default => "DEF",
        }
    }
}

/// Models flagged `Exclude` stay in the provider data but never enter a model set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ModelMode {
    #[default]
    Include,
    Exclude,
}

fn designator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z0-9]{2,4}$").unwrap())
}

fn airline_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{3}$").unwrap())
}

// Aircraft type, engine count, engine type. e.g. L2J, H1T, S1P
fn combined_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[LSAHGT][1-8C][JPTER]$").unwrap())
}

// Airline style callsigns: three letter operator followed by a flight number
fn airline_callsign_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z]{3})[0-9][A-Z0-9]*$").unwrap())
}

/// Upper-cased, trimmed form used for every case-insensitive comparison.
pub(crate) fn normalize_key(value: &str) -> String {
    value.trim().to_uppercase()
}

/// True if both codes are present and have the same [`normalize_key`] form.
pub(crate) fn same_code(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() {
        return false;
    }
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    normalize_key(a) == normalize_key(b)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AircraftIcaoCode {
    pub designator: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub combined_type: String,
    /// Wake turbulence category (L, M, H, J)
    #[serde(default)]
    pub wtc: String,
}

impl AircraftIcaoCode {
    pub fn new(designator: &str) -> Self {
        Self {
            designator: normalize_key(designator),
            ..Default::default()
        }
    }

    pub fn with_family(mut self, family: &str) -> Self {
        self.family = normalize_key(family);
        self
    }

    pub fn with_combined_type(mut self, combined_type: &str) -> Self {
        self.combined_type = normalize_key(combined_type);
        self
    }

    pub fn with_wtc(mut self, wtc: &str) -> Self {
        self.wtc = normalize_key(wtc);
        self
    }

    /// A designator that can take part in matching. Garbage counts as missing.
    pub fn has_valid_designator(&self) -> bool {
        designator_regex().is_match(&normalize_key(&self.designator))
    }

    pub fn has_family(&self) -> bool {
        !self.family.trim().is_empty()
    }

    pub fn has_valid_combined_type(&self) -> bool {
        combined_type_regex().is_match(&normalize_key(&self.combined_type))
    }

    pub fn normalized_designator(&self) -> String {
        normalize_key(&self.designator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AirlineIcaoCode {
    pub designator: String,
    #[serde(default)]
    pub name: String,
}

impl AirlineIcaoCode {
    pub fn new(designator: &str) -> Self {
        Self {
            designator: normalize_key(designator),
            name: String::new(),
        }
    }

    pub fn has_valid_designator(&self) -> bool {
        airline_regex().is_match(&normalize_key(&self.designator))
    }
}

/// One renderable model as known to the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AircraftModel {
    pub model_string: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub distributor: String,
    #[serde(default)]
    pub aircraft_icao: AircraftIcaoCode,
    #[serde(default)]
    pub airline_icao: AirlineIcaoCode,
    #[serde(default)]
    pub livery_code: String,
    #[serde(default)]
    pub model_type: ModelType,
    #[serde(default)]
    pub model_mode: ModelMode,
}

impl AircraftModel {
    pub fn new(model_string: &str) -> Self {
        Self {
            model_string: model_string.trim().to_string(),
            ..Default::default()
        }
    }

    pub fn with_aircraft_icao(mut self, icao: AircraftIcaoCode) -> Self {
        self.aircraft_icao = icao;
        self
    }

    pub fn with_airline_icao(mut self, airline: AirlineIcaoCode) -> Self {
        self.airline_icao = airline;
        self
    }

    pub fn with_distributor(mut self, distributor: &str) -> Self {
        self.distributor = distributor.trim().to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_livery_code(mut self, livery: &str) -> Self {
        self.livery_code = livery.trim().to_string();
        self
    }

    pub fn with_model_type(mut self, model_type: ModelType) -> Self {
        self.model_type = model_type;
        self
    }

    pub fn with_model_mode(mut self, mode: ModelMode) -> Self {
        self.model_mode = mode;
        self
    }

    pub fn has_model_string(&self) -> bool {
        !self.model_string.trim().is_empty()
    }

    pub fn matches_model_string(&self, model_string: &str) -> bool {
        same_code(&self.model_string, model_string)
    }

    pub fn is_excluded(&self) -> bool {
        self.model_mode == ModelMode::Exclude
    }

    pub fn model_key(&self) -> String {
        normalize_key(&self.model_string)
    }
}

impl fmt::Display for AircraftModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} {}",
            self.model_string,
            self.model_type.short_code(),
            self.aircraft_icao.designator,
            self.airline_icao.designator
        )
    }
}

/// A remote aircraft as reported by the network layer. Input of every match call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SimulatedAircraft {
    pub callsign: String,
    #[serde(default)]
    pub aircraft_icao: AircraftIcaoCode,
    #[serde(default)]
    pub airline_icao: AirlineIcaoCode,
    #[serde(default)]
    pub livery_code: String,
    /// Model string the aircraft already carries (e.g. sent by the remote pilot's client).
    #[serde(default)]
    pub assigned_model_string: Option<String>,
    /// The assigned model string was picked by the user and overrides matching.
    #[serde(default)]
    pub manually_set: bool,
}

impl SimulatedAircraft {
    pub fn new(callsign: &str) -> Self {
        Self {
            callsign: normalize_key(callsign),
            ..Default::default()
        }
    }

    pub fn with_aircraft_icao(mut self, icao: AircraftIcaoCode) -> Self {
        self.aircraft_icao = icao;
        self
    }

    pub fn with_airline_icao(mut self, airline: AirlineIcaoCode) -> Self {
        self.airline_icao = airline;
        self
    }

    pub fn with_livery_code(mut self, livery: &str) -> Self {
        self.livery_code = livery.trim().to_string();
        self
    }

    pub fn with_assigned_model_string(mut self, model_string: &str) -> Self {
        self.assigned_model_string = Some(model_string.trim().to_string());
        self
    }

    pub fn with_manually_set_model(mut self, model_string: &str) -> Self {
        self.assigned_model_string = Some(model_string.trim().to_string());
        self.manually_set = true;
        self
    }

    pub fn has_callsign(&self) -> bool {
        !self.callsign.trim().is_empty()
    }

    /// The assigned model string, if there is a non blank one.
    pub fn assigned_model_string(&self) -> Option<&str> {
        self.assigned_model_string
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Operator designator of an airline style callsign, `SWA123` -> `SWA`.
    pub fn airline_designator_from_callsign(&self) -> Option<String> {
        let callsign = normalize_key(&self.callsign);
        airline_callsign_regex()
            .captures(&callsign)
            .map(|cap| cap[1].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_designator_validation() {
        assert!(AircraftIcaoCode::new("B738").has_valid_designator());
        assert!(AircraftIcaoCode::new("c172").has_valid_designator());
        assert!(!AircraftIcaoCode::new("").has_valid_designator());
        assert!(!AircraftIcaoCode::new("BOEING 737").has_valid_designator());
    }

    #[test]
    fn test_combined_type_validation() {
        let icao = AircraftIcaoCode::new("B738").with_combined_type("l2j");
        assert!(icao.has_valid_combined_type());
        assert_eq!(icao.combined_type, "L2J");
        assert!(!AircraftIcaoCode::new("B738")
            .with_combined_type("X9Q")
            .has_valid_combined_type());
        assert!(!AircraftIcaoCode::new("B738").has_valid_combined_type());
    }

    #[test]
    fn test_airline_from_callsign() {
        assert_eq!(
            SimulatedAircraft::new("swa123").airline_designator_from_callsign(),
            Some("SWA".to_string())
        );
        assert_eq!(
            SimulatedAircraft::new("DLH4AB").airline_designator_from_callsign(),
            Some("DLH".to_string())
        );
        assert_eq!(
            SimulatedAircraft::new("N12345").airline_designator_from_callsign(),
            None
        );
        assert_eq!(
            SimulatedAircraft::new("DEABC").airline_designator_from_callsign(),
            None
        );
    }

    #[test]
    fn test_assigned_model_string_blank_is_none() {
        let aircraft = SimulatedAircraft::new("SWA1").with_assigned_model_string("   ");
        assert_eq!(aircraft.assigned_model_string(), None);
    }

    #[test]
    fn test_model_string_comparison_ignores_case() {
        let model = AircraftModel::new("B738_SWA");
        assert!(model.matches_model_string("b738_swa"));
        assert!(!model.matches_model_string(""));
        assert_eq!(model.model_key(), "B738_SWA");
    }

    #[test]
    fn test_non_ascii_model_strings_fold_like_keys() {
        let model = AircraftModel::new("Café_B738");
        assert!(model.matches_model_string("CAFÉ_B738"));
        assert_eq!(model.model_key(), "CAFÉ_B738");
        assert!(same_code("straße", "STRASSE"));
        assert!(!same_code("Café", "Cafe"));
    }
}
