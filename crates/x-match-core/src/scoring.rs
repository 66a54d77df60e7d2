// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

//! Algorithmic candidate scoring.
//!
//! Designator beats family beats combined type; a matching airline adds a
//! bonus on top. Equal scores fall back to the distributor preference list and
//! then to model set order, so the ranking is fully deterministic.

use crate::model::{same_code, AircraftIcaoCode, AircraftModel};
use crate::model_set::ModelSet;
use rayon::prelude::*;
use std::cmp::Reverse;

pub const SCORE_DESIGNATOR: u32 = 100;
pub const SCORE_FAMILY: u32 = 60;
pub const SCORE_COMBINED_TYPE: u32 = 30;
pub const SCORE_AIRLINE: u32 = 20;

// Below this many candidates a sequential scan is faster than splitting work
const PARALLEL_THRESHOLD: usize = 512;

/// The remote aircraft data scoring looks at. Invalid codes are blanked on construction.
#[derive(Debug, Clone, Default)]
pub struct ScoreQuery {
    pub designator: String,
    pub family: String,
    pub combined_type: String,
    pub airline: String,
}

impl ScoreQuery {
    pub fn new(icao: &AircraftIcaoCode, airline: Option<&str>) -> Self {
        let designator = if icao.has_valid_designator() {
            icao.normalized_designator()
        } else {
            String::new()
        };
        let combined_type = if icao.has_valid_combined_type() {
            icao.combined_type.trim().to_uppercase()
        } else {
            String::new()
        };
        Self {
            designator,
            family: icao.family.trim().to_uppercase(),
            combined_type,
            airline: airline.unwrap_or_default().trim().to_uppercase(),
        }
    }

    /// Nothing to score against; every candidate would get zero.
    pub fn is_empty(&self) -> bool {
        self.designator.is_empty()
            && self.family.is_empty()
            && self.combined_type.is_empty()
            && self.airline.is_empty()
    }

    fn same_family(&self, candidate: &AircraftIcaoCode) -> bool {
        if same_code(&self.family, &candidate.family) {
            return true;
        }
        // A designator that names a family, e.g. "A320" against the A32x family
        self.family.is_empty() && same_code(&self.designator, &candidate.family)
    }

    pub fn score(&self, candidate: &AircraftModel) -> u32 {
        let icao = &candidate.aircraft_icao;
        let mut score = if same_code(&self.designator, &icao.designator) {
            SCORE_DESIGNATOR
        } else if self.same_family(icao) {
            SCORE_FAMILY
        } else if same_code(&self.combined_type, &icao.combined_type) {
            SCORE_COMBINED_TYPE
        } else {
            0
        };

        if same_code(&self.airline, &candidate.airline_icao.designator) {
            score += SCORE_AIRLINE;
        }
        score
    }
}

/// One ranked candidate. `index` is the position in model set order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredCandidate<'a> {
    pub model: &'a AircraftModel,
    pub score: u32,
    pub distributor_rank: usize,
    pub index: usize,
}

impl ScoredCandidate<'_> {
    fn sort_key(&self) -> (Reverse<u32>, usize, usize) {
        (Reverse(self.score), self.distributor_rank, self.index)
    }
}

/// Position of `distributor` in the preference list, or past its end if absent.
pub fn distributor_rank(preferences: &[String], distributor: &str) -> usize {
    preferences
        .iter()
        .position(|p| same_code(p, distributor))
        .unwrap_or(preferences.len())
}

pub struct Scorer<'a> {
    query: &'a ScoreQuery,
    preferences: &'a [String],
}

impl<'a> Scorer<'a> {
    pub fn new(query: &'a ScoreQuery, preferences: &'a [String]) -> Self {
        Self { query, preferences }
    }

    fn candidate<'m>(&self, index: usize, model: &'m AircraftModel) -> ScoredCandidate<'m> {
        ScoredCandidate {
            model,
            score: self.query.score(model),
            distributor_rank: distributor_rank(self.preferences, &model.distributor),
            index,
        }
    }

    /// Highest ranked candidate scoring at least `minimum_score`.
    pub fn best_candidate<'m>(
        &self,
        models: &'m ModelSet,
        minimum_score: u32,
    ) -> Option<ScoredCandidate<'m>> {
        let minimum_score = minimum_score.max(1);
        let slice = models.models();

        if slice.len() < PARALLEL_THRESHOLD {
            slice
                .iter()
                .enumerate()
                .map(|(idx, model)| self.candidate(idx, model))
                .filter(|c| c.score >= minimum_score)
                .min_by_key(ScoredCandidate::sort_key)
        } else {
            slice
                .par_iter()
                .enumerate()
                .map(|(idx, model)| self.candidate(idx, model))
                .filter(|c| c.score >= minimum_score)
                .min_by_key(ScoredCandidate::sort_key)
        }
    }

    /// The best `limit` candidates with a non zero score, best first.
    pub fn ranked_candidates<'m>(
        &self,
        models: &'m ModelSet,
        limit: usize,
    ) -> Vec<ScoredCandidate<'m>> {
        let slice = models.models();
        let mut ranked: Vec<ScoredCandidate<'m>> = if slice.len() < PARALLEL_THRESHOLD {
            slice
                .iter()
                .enumerate()
                .map(|(idx, model)| self.candidate(idx, model))
                .filter(|c| c.score > 0)
                .collect()
        } else {
            slice
                .par_iter()
                .enumerate()
                .map(|(idx, model)| self.candidate(idx, model))
                .filter(|c| c.score > 0)
                .collect()
        };
        ranked.sort_by_key(ScoredCandidate::sort_key);
        ranked.truncate(limit);
        ranked
    }
}
