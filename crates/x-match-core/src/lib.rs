// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

//! Picks a locally installed, renderable model for every remote aircraft.
//!
//! Strategies run in a fixed order: a manually set model, an exact model
//! string match, explicit mapping rules, then algorithmic scoring over the
//! installed models. The default model answers when nothing else does.

pub mod cache;
pub mod matcher;
pub mod model;
pub mod model_set;
pub mod provider;
pub mod rules;
pub mod scoring;
pub mod setup;
pub mod synchronizer;

pub use cache::ModelSetCache;
pub use matcher::{
    InitEvent, InitState, MatchResult, MatchStrategy, Matcher, MatcherError, MatchingLog,
    MatchingStatistics,
};
pub use model::{
    AircraftIcaoCode, AircraftModel, AirlineIcaoCode, ModelMode, ModelType, SimulatedAircraft,
};
pub use model_set::{ModelSet, ModelSetReport};
pub use provider::{
    CachedRuleProvider, MappingProvider, ProviderError, RuleFileProvider, StaticRuleProvider,
};
pub use rules::{MappingRule, MappingRuleStore, RulePattern};
pub use setup::{MatcherSetup, MatchingMode, SetupStore};
pub use synchronizer::{CaseSensitivity, ModelSynchronizer};

use std::path::PathBuf;

/// Directory holding the setup file and the JSON caches.
pub fn get_config_root() -> PathBuf {
    directories::ProjectDirs::from("org", "x-match", "X-Match-Oxide")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
