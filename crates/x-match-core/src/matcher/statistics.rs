// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use super::MatchStrategy;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StrategyCounts {
    pub manually_set: u64,
    pub exact_match: u64,
    pub model_mapping: u64,
    pub model_matching: u64,
    pub default_model: u64,
}

impl StrategyCounts {
    pub fn add(&mut self, strategy: MatchStrategy) {
        match strategy {
            MatchStrategy::ManuallySet => self.manually_set += 1,
            MatchStrategy::ExactMatch => self.exact_match += 1,
            MatchStrategy::ModelMapping => self.model_mapping += 1,
            MatchStrategy::ModelMatching => self.model_matching += 1,
            MatchStrategy::Default => self.default_model += 1,
        }
    }

    pub fn merge(&mut self, other: &StrategyCounts) {
        self.manually_set += other.manually_set;
        self.exact_match += other.exact_match;
        self.model_mapping += other.model_mapping;
        self.model_matching += other.model_matching;
        self.default_model += other.default_model;
    }

    pub fn total(&self) -> u64 {
        self.manually_set
            + self.exact_match
            + self.model_mapping
            + self.model_matching
            + self.default_model
    }
}

/// Outcome counts, overall and per `AIRCRAFT/AIRLINE` designator pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchingStatistics {
    totals: StrategyCounts,
    by_designators: BTreeMap<String, StrategyCounts>,
}

impl MatchingStatistics {
    pub fn record(&mut self, aircraft: &str, airline: Option<&str>, strategy: MatchStrategy) {
        self.totals.add(strategy);
        let aircraft = if aircraft.trim().is_empty() {
            "?"
        } else {
            aircraft.trim()
        };
        let key = format!("{}/{}", aircraft, airline.unwrap_or("*")).to_uppercase();
        self.by_designators.entry(key).or_default().add(strategy);
    }

    pub fn totals(&self) -> &StrategyCounts {
        &self.totals
    }

    pub fn for_designators(&self, aircraft: &str, airline: Option<&str>) -> Option<&StrategyCounts> {
        let key = format!("{}/{}", aircraft.trim(), airline.unwrap_or("*")).to_uppercase();
        self.by_designators.get(&key)
    }

    pub fn designator_pairs(&self) -> impl Iterator<Item = (&String, &StrategyCounts)> {
        self.by_designators.iter()
    }

    /// Adds the counts of `other` to this one.
    pub fn merge(&mut self, other: &MatchingStatistics) {
        self.totals.merge(&other.totals);
        for (key, counts) in &other.by_designators {
            self.by_designators
                .entry(key.clone())
                .or_default()
                .merge(counts);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.totals.total() == 0
    }
}
