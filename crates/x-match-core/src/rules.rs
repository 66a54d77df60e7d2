// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use crate::model::normalize_key;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// What a mapping rule reacts to. Keys are stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RulePattern {
    Callsign {
        callsign: String,
    },
    /// Aircraft designator plus airline. `airline: None` matches any airline.
    IcaoSignature {
        aircraft: String,
        #[serde(default)]
        airline: Option<String>,
    },
}

impl RulePattern {
    pub fn callsign(callsign: &str) -> Self {
        RulePattern::Callsign {
            callsign: normalize_key(callsign),
        }
    }

    /// An empty or `*` airline makes this an aircraft-only signature.
    pub fn icao(aircraft: &str, airline: Option<&str>) -> Self {
        let airline = airline
            .map(normalize_key)
            .filter(|a| !a.is_empty() && a != "*");
        RulePattern::IcaoSignature {
            aircraft: normalize_key(aircraft),
            airline,
        }
    }
}

impl fmt::Display for RulePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulePattern::Callsign { callsign } => write!(f, "{}", callsign),
            RulePattern::IcaoSignature { aircraft, airline } => {
                write!(f, "{}/{}", aircraft, airline.as_deref().unwrap_or("*"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingRule {
    pub pattern: RulePattern,
    pub target_model_string: String,
}

impl MappingRule {
    pub fn new(pattern: RulePattern, target_model_string: &str) -> Self {
        Self {
            pattern,
            target_model_string: target_model_string.trim().to_string(),
        }
    }

    pub fn for_callsign(callsign: &str, target_model_string: &str) -> Self {
        Self::new(RulePattern::callsign(callsign), target_model_string)
    }

    pub fn for_icao(aircraft: &str, airline: Option<&str>, target_model_string: &str) -> Self {
        Self::new(RulePattern::icao(aircraft, airline), target_model_string)
    }
}

impl fmt::Display for MappingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.pattern, self.target_model_string)
    }
}

/// Ordered rule list as delivered by a provider, mutated only by synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingRuleStore {
    rules: Vec<MappingRule>,
}

impl MappingRuleStore {
    pub fn new(rules: Vec<MappingRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    pub fn into_rules(self) -> Vec<MappingRule> {
        self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&MappingRule) -> bool,
    {
        self.rules.retain(keep);
    }
}

/// Lookup tables over a synchronized rule list.
///
/// When several rules share a key the first one in provider order wins.
#[derive(Debug, Clone, Default)]
pub struct MappingIndex {
    rules: Vec<MappingRule>,
    by_callsign: HashMap<String, usize>,
    by_signature: HashMap<(String, String), usize>,
    by_aircraft: HashMap<String, usize>,
}

impl MappingIndex {
    pub fn build(rules: Vec<MappingRule>) -> Self {
        let mut by_callsign = HashMap::new();
        let mut by_signature = HashMap::new();
        let mut by_aircraft = HashMap::new();

        for (idx, rule) in rules.iter().enumerate() {
            match &rule.pattern {
                RulePattern::Callsign { callsign } => {
                    by_callsign.entry(normalize_key(callsign)).or_insert(idx);
                }
                RulePattern::IcaoSignature {
                    aircraft,
                    airline: Some(airline),
                } => {
                    by_signature
                        .entry((normalize_key(aircraft), normalize_key(airline)))
                        .or_insert(idx);
                }
                RulePattern::IcaoSignature {
                    aircraft,
                    airline: None,
                } => {
                    by_aircraft.entry(normalize_key(aircraft)).or_insert(idx);
                }
            }
        }

        Self {
            rules,
            by_callsign,
            by_signature,
            by_aircraft,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    pub fn find_by_callsign(&self, callsign: &str) -> Option<&MappingRule> {
        self.by_callsign
            .get(&normalize_key(callsign))
            .map(|&idx| &self.rules[idx])
    }

    /// Rule for exactly this aircraft and airline pair.
    pub fn find_by_signature(&self, aircraft: &str, airline: &str) -> Option<&MappingRule> {
        self.by_signature
            .get(&(normalize_key(aircraft), normalize_key(airline)))
            .map(|&idx| &self.rules[idx])
    }

    /// Rule for the aircraft designator regardless of airline.
    pub fn find_by_aircraft(&self, aircraft: &str) -> Option<&MappingRule> {
        self.by_aircraft
            .get(&normalize_key(aircraft))
            .map(|&idx| &self.rules[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_normalization() {
        assert_eq!(
            RulePattern::icao("b738", Some("*")),
            RulePattern::IcaoSignature {
                aircraft: "B738".to_string(),
                airline: None
            }
        );
        assert_eq!(RulePattern::icao("b738", Some("swa")).to_string(), "B738/SWA");
        assert_eq!(RulePattern::callsign(" swa123 ").to_string(), "SWA123");
    }

    #[test]
    fn test_index_first_rule_wins() {
        let index = MappingIndex::build(vec![
            MappingRule::for_callsign("SWA123", "FIRST"),
            MappingRule::for_callsign("swa123", "SECOND"),
            MappingRule::for_icao("B738", Some("SWA"), "SIG"),
            MappingRule::for_icao("B738", None, "AIRCRAFT_ONLY"),
        ]);

        assert_eq!(index.len(), 4);
        assert_eq!(
            index.find_by_callsign("Swa123").unwrap().target_model_string,
            "FIRST"
        );
        assert_eq!(
            index.find_by_signature("b738", "swa").unwrap().target_model_string,
            "SIG"
        );
        assert_eq!(
            index.find_by_aircraft("B738").unwrap().target_model_string,
            "AIRCRAFT_ONLY"
        );
        assert!(index.find_by_signature("B738", "DLH").is_none());
    }

    #[test]
    fn test_rule_serde_shape() {
        let rule = MappingRule::for_icao("A320", Some("DLH"), "A320_DLH");
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"kind\":\"icao_signature\""));
        let back: MappingRule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }
}
