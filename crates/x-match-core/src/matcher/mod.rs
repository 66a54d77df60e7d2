// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

//! The matching engine.
//!
//! Rules and models are published together as an immutable [`MatchSnapshot`].
//! Queries clone the current `Arc` and never hold a lock while matching, so a
//! re-synchronization either finishes before a query starts or after it ends.
//!
//! Initialization reads the mapping provider on a background thread. Each
//! `init` call gets a generation number; a worker whose generation is no longer
//! current (after `cancel_init` or a newer `init`) drops its result.

mod matching_log;
mod statistics;

pub use matching_log::{MatchingLog, MatchingStep, StepSeverity};
pub use statistics::{MatchingStatistics, StrategyCounts};

use crate::model::{AircraftModel, ModelType, SimulatedAircraft};
use crate::model_set::{ModelSet, ModelSetReport};
use crate::provider::MappingProvider;
use crate::rules::{MappingIndex, MappingRule, MappingRuleStore};
use crate::scoring::{ScoreQuery, Scorer};
use crate::setup::{MatcherSetup, MatchingMode};
use crate::synchronizer::{CaseSensitivity, ModelSynchronizer};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const TOP_CANDIDATES_LOGGED: usize = 5;
const STATISTICS_SHARDS: usize = 8;

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("Default model has no model string")]
    MissingDefaultModel,
    #[error("Default model '{0}' is flagged as excluded")]
    ExcludedDefaultModel(String),
}

/// Which step of the decision chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MatchStrategy {
    ManuallySet,
    ExactMatch,
    ModelMapping,
    ModelMatching,
    Default,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchStrategy::ManuallySet => "manually set",
            MatchStrategy::ExactMatch => "exact match",
            MatchStrategy::ModelMapping => "model mapping",
            MatchStrategy::ModelMatching => "model matching",
            MatchStrategy::Default => "default model",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub model: AircraftModel,
    pub strategy: MatchStrategy,
    /// Set for algorithmic matches only.
    pub score: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InitState {
    NotInitialized,
    InitInProgress,
    InitFinished,
}

/// Sent to every subscriber when a background initialization ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitEvent {
    Finished {
        rules_read: usize,
        rules_synchronized: usize,
        provider_ok: bool,
    },
    Cancelled,
}

/// Models and synchronized rules as seen by queries.
#[derive(Debug, Default)]
pub struct MatchSnapshot {
    pub models: Arc<ModelSet>,
    pub rules: MappingIndex,
}

struct InitControl {
    state: InitState,
    generation: u64,
    cancel: Option<Arc<AtomicBool>>,
    /// Provider rules before synchronization, kept for re-synchronizing.
    raw_rules: MappingRuleStore,
    /// Cleaned installed models, including disabled ones.
    installed: Arc<ModelSet>,
    /// Models taken out of matching by `model_failed`, in failure order.
    disabled: Vec<AircraftModel>,
}

impl InitControl {
    /// The installed models minus the disabled ones.
    fn matchable_models(&self) -> Arc<ModelSet> {
        if self.disabled.is_empty() {
            return self.installed.clone();
        }
        let keys: HashSet<String> = self.disabled.iter().map(|m| m.model_key()).collect();
        Arc::new(self.installed.without_keys(&keys))
    }
}

// Lock order: control, then snapshot. Statistics shards and subscribers are leaf locks.
struct Shared {
    snapshot: RwLock<Arc<MatchSnapshot>>,
    control: Mutex<InitControl>,
    /// Signalled whenever `control.state` leaves `InitInProgress`.
    init_done: Condvar,
    statistics: Vec<Mutex<MatchingStatistics>>,
    subscribers: Mutex<Vec<Sender<InitEvent>>>,
}

impl Shared {
    fn current(&self) -> Arc<MatchSnapshot> {
        self.snapshot.read().clone()
    }

    /// Statistics shard of the calling thread.
    fn statistics_shard(&self) -> &Mutex<MatchingStatistics> {
        let mut hasher = DefaultHasher::new();
        thread::current().id().hash(&mut hasher);
        &self.statistics[hasher.finish() as usize % self.statistics.len()]
    }

    /// Synchronizes `raw` against `models` and swaps in the new snapshot.
    /// Callers hold the control lock.
    fn publish(&self, raw: &MappingRuleStore, models: Arc<ModelSet>) -> usize {
        let mut rules = raw.clone();
        let count = ModelSynchronizer::synchronize(
            &mut rules,
            &models.model_names(),
            CaseSensitivity::Insensitive,
        );
        let snapshot = MatchSnapshot {
            models,
            rules: MappingIndex::build(rules.into_rules()),
        };
        *self.snapshot.write() = Arc::new(snapshot);
        count
    }

    fn notify(&self, event: InitEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

type SharedProvider = Arc<Mutex<Box<dyn MappingProvider>>>;

pub struct Matcher {
    setup: MatcherSetup,
    default_model: AircraftModel,
    provider: SharedProvider,
    shared: Arc<Shared>,
}

impl Matcher {
    /// Fails if `default_model` cannot serve as the fallback of every match.
    pub fn new(
        setup: MatcherSetup,
        default_model: AircraftModel,
        provider: Box<dyn MappingProvider>,
        models: Vec<AircraftModel>,
    ) -> Result<Self, MatcherError> {
        if !default_model.has_model_string() {
            return Err(MatcherError::MissingDefaultModel);
        }
        if default_model.is_excluded() {
            return Err(MatcherError::ExcludedDefaultModel(default_model.model_string));
        }
        let default_model = default_model.with_model_type(ModelType::Default);

        let (model_set, report) = ModelSet::from_models(models);
        report.log();
        log::info!(
            "[Matcher] Created with setup {} and default model '{}'",
            setup,
            default_model.model_string
        );

        let installed = Arc::new(model_set);
        let shared = Shared {
            snapshot: RwLock::new(Arc::new(MatchSnapshot {
                models: installed.clone(),
                rules: MappingIndex::default(),
            })),
            control: Mutex::new(InitControl {
                state: InitState::NotInitialized,
                generation: 0,
                cancel: None,
                raw_rules: MappingRuleStore::default(),
                installed,
                disabled: Vec::new(),
            }),
            init_done: Condvar::new(),
            statistics: (0..STATISTICS_SHARDS)
                .map(|_| Mutex::new(MatchingStatistics::default()))
                .collect(),
            subscribers: Mutex::new(Vec::new()),
        };

        Ok(Self {
            setup,
            default_model,
            provider: Arc::new(Mutex::new(provider)),
            shared: Arc::new(shared),
        })
    }

    pub fn setup(&self) -> &MatcherSetup {
        &self.setup
    }

    pub fn default_model(&self) -> &AircraftModel {
        &self.default_model
    }

    pub fn init_state(&self) -> InitState {
        self.shared.control.lock().state
    }

    /// Receives an [`InitEvent`] for every initialization that ends after this call.
    pub fn subscribe(&self) -> Receiver<InitEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.shared.subscribers.lock().push(tx);
        rx
    }

    /// Starts reading the mapping provider on a background thread.
    ///
    /// Does nothing while a load is already running. Returns `false` only if
    /// the worker thread could not be started.
    pub fn init(&self) -> bool {
        let (generation, cancel) = {
            let mut control = self.shared.control.lock();
            if control.state == InitState::InitInProgress {
                log::debug!("[Matcher] Initialization already in progress");
                return true;
            }
            control.generation += 1;
            let cancel = Arc::new(AtomicBool::new(false));
            control.cancel = Some(cancel.clone());
            control.state = InitState::InitInProgress;
            (control.generation, cancel)
        };

        let shared = self.shared.clone();
        let provider = self.provider.clone();
        let spawned = thread::Builder::new()
            .name("x-match-init".to_string())
            .spawn(move || Self::run_init(shared, provider, generation, cancel));

        match spawned {
            Ok(_) => {
                log::info!("[Matcher] Initialization started (generation {})", generation);
                true
            }
            Err(e) => {
                log::error!("[Matcher] Failed to start initialization thread: {}", e);
                let mut control = self.shared.control.lock();
                if control.generation == generation {
                    control.state = InitState::NotInitialized;
                    control.cancel = None;
                    self.shared.init_done.notify_all();
                }
                false
            }
        }
    }

    /// Runs `init` and waits for its outcome. `None` if no worker could be started.
    pub fn init_blocking(&self) -> Option<InitEvent> {
        let events = self.subscribe();
        if !self.init() {
            return None;
        }
        events.recv().ok()
    }

    /// Waits up to `timeout` for a running initialization and returns the state afterwards.
    pub fn wait_for_init(&self, timeout: Duration) -> InitState {
        let deadline = Instant::now() + timeout;
        let mut control = self.shared.control.lock();
        while control.state == InitState::InitInProgress {
            if self
                .shared
                .init_done
                .wait_until(&mut control, deadline)
                .timed_out()
            {
                break;
            }
        }
        control.state
    }

    /// Abandons a running initialization. The worker may still finish its read
    /// but its result is dropped. Returns `false` if nothing was in progress.
    pub fn cancel_init(&self) -> bool {
        {
            let mut control = self.shared.control.lock();
            if control.state != InitState::InitInProgress {
                return false;
            }
            if let Some(flag) = control.cancel.take() {
                flag.store(true, Ordering::Release);
            }
            control.generation += 1;
            control.state = InitState::NotInitialized;
            self.shared.init_done.notify_all();
        }
        log::info!("[Matcher] Initialization cancelled");
        self.shared.notify(InitEvent::Cancelled);
        true
    }

    fn run_init(
        shared: Arc<Shared>,
        provider: SharedProvider,
        generation: u64,
        cancel: Arc<AtomicBool>,
    ) {
        let (rules, rules_read) = {
            let mut provider = provider.lock();
            if cancel.load(Ordering::Acquire) {
                log::debug!("[Matcher] Initialization {} cancelled before reading", generation);
                return;
            }
            match provider.read() {
                Ok(count) => {
                    log::info!(
                        "[Matcher] Read {} mapping rules from {}",
                        count,
                        provider.name()
                    );
                    (Some(provider.mapping_list().to_vec()), count)
                }
                Err(e) => {
                    log::error!(
                        "[Matcher] Reading mapping rules from {} failed: {}",
                        provider.name(),
                        e
                    );
                    (None, 0)
                }
            }
        };

        if cancel.load(Ordering::Acquire) {
            log::debug!("[Matcher] Initialization {} cancelled, result dropped", generation);
            return;
        }

        let provider_ok = rules.is_some();
        let rules_synchronized = {
            let mut control = shared.control.lock();
            if control.generation != generation {
                log::debug!("[Matcher] Initialization {} superseded", generation);
                return;
            }
            if let Some(rules) = rules {
                control.raw_rules = MappingRuleStore::new(rules);
            }
            let models = control.matchable_models();
            let count = shared.publish(&control.raw_rules, models);
            control.state = InitState::InitFinished;
            control.cancel = None;
            shared.init_done.notify_all();
            count
        };

        log::info!(
            "[Matcher] Initialization finished, {} of {} mapping rules usable",
            rules_synchronized,
            rules_read
        );
        shared.notify(InitEvent::Finished {
            rules_read,
            rules_synchronized,
            provider_ok,
        });
    }

    /// Replaces the installed models and re-synchronizes the mapping rules.
    /// Models disabled by [`Matcher::model_failed`] stay out of matching.
    pub fn set_installed_models(&self, models: Vec<AircraftModel>) -> ModelSetReport {
        let (model_set, report) = ModelSet::from_models(models);
        report.log();

        let mut control = self.shared.control.lock();
        control.installed = Arc::new(model_set);
        let count = self
            .shared
            .publish(&control.raw_rules, control.matchable_models());
        if control.state == InitState::InitFinished {
            log::info!(
                "[Matcher] Re-synchronized mapping rules, {} of {} usable",
                count,
                control.raw_rules.len()
            );
        }
        report
    }

    /// The simulator could not render `model_string`. Disables it for matching
    /// when enabled. Returns whether the matchable models changed.
    pub fn model_failed(&self, model_string: &str) -> bool {
        if !self.setup.remove_failed_models {
            log::info!(
                "[Matcher] Model '{}' failed, removal disabled",
                model_string
            );
            return false;
        }
        if self.default_model.matches_model_string(model_string) {
            log::warn!(
                "[Matcher] Default model '{}' failed, it stays the fallback",
                model_string
            );
            return false;
        }

        let mut control = self.shared.control.lock();
        let current = self.shared.current();
        let Some(model) = current.models.find_by_model_string(model_string) else {
            log::debug!("[Matcher] Failed model '{}' is not matchable", model_string);
            return false;
        };

        control.disabled.push(model.clone());
        let models = control.matchable_models();
        let remaining = models.len();
        let count = self.shared.publish(&control.raw_rules, models);
        log::warn!(
            "[Matcher] Disabled failed model '{}', {} models and {} mapping rules left",
            model_string,
            remaining,
            count
        );
        true
    }

    /// Models disabled by [`Matcher::model_failed`], in failure order.
    pub fn disabled_models(&self) -> Vec<AircraftModel> {
        self.shared.control.lock().disabled.clone()
    }

    /// Puts every disabled model back into matching. Returns how many were restored.
    pub fn restore_disabled_models(&self) -> usize {
        let mut control = self.shared.control.lock();
        if control.disabled.is_empty() {
            return 0;
        }
        let restored = std::mem::take(&mut control.disabled).len();
        let count = self
            .shared
            .publish(&control.raw_rules, control.installed.clone());
        log::info!(
            "[Matcher] Restored {} disabled models, {} mapping rules usable",
            restored,
            count
        );
        restored
    }

    pub fn count_mapping_rules(&self) -> usize {
        self.shared.current().rules.len()
    }

    pub fn count_installed_models(&self) -> usize {
        self.shared.current().models.len()
    }

    pub fn model_set(&self) -> Arc<ModelSet> {
        self.shared.current().models.clone()
    }

    /// The synchronized rules currently used by queries.
    pub fn mapping_rules(&self) -> Vec<MappingRule> {
        self.shared.current().rules.rules().to_vec()
    }

    pub fn statistics(&self) -> MatchingStatistics {
        let mut merged = MatchingStatistics::default();
        for shard in &self.shared.statistics {
            merged.merge(&shard.lock());
        }
        merged
    }

    pub fn clear_statistics(&self) {
        for shard in &self.shared.statistics {
            shard.lock().clear();
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    /// Never fails: the default model is the last resort.
    pub fn get_closest_match(&self, aircraft: &SimulatedAircraft) -> AircraftModel {
        self.match_aircraft(aircraft, None).model
    }

    pub fn match_aircraft(
        &self,
        aircraft: &SimulatedAircraft,
        log: Option<&mut MatchingLog>,
    ) -> MatchResult {
        let snapshot = self.shared.current();
        let mut steps = StepLog::new(&aircraft.callsign, log);

        let airline = self.effective_airline(aircraft, &mut steps);
        let result = self.run_chain(&snapshot, aircraft, airline.as_deref(), &mut steps);

        steps.info(format!(
            "Using '{}' ({})",
            result.model.model_string, result.strategy
        ));
        self.shared.statistics_shard().lock().record(
            &aircraft.aircraft_icao.designator,
            airline.as_deref(),
            result.strategy,
        );
        result
    }

    fn effective_airline(
        &self,
        aircraft: &SimulatedAircraft,
        steps: &mut StepLog<'_>,
    ) -> Option<String> {
        if aircraft.airline_icao.has_valid_designator() {
            return Some(aircraft.airline_icao.designator.trim().to_uppercase());
        }
        if !aircraft.airline_icao.designator.trim().is_empty() {
            steps.debug(format!(
                "Ignoring invalid airline designator '{}'",
                aircraft.airline_icao.designator
            ));
        }
        if !self.setup.airline_from_callsign {
            return None;
        }
        let derived = aircraft.airline_designator_from_callsign();
        if let Some(airline) = &derived {
            steps.debug(format!("Airline '{}' derived from callsign", airline));
        }
        derived
    }

    fn run_chain(
        &self,
        snapshot: &MatchSnapshot,
        aircraft: &SimulatedAircraft,
        airline: Option<&str>,
        steps: &mut StepLog<'_>,
    ) -> MatchResult {
        let mode = self.setup.mode;
        if mode.is_empty() {
            steps.debug("All matching strategies disabled".to_string());
        }

        if let Some(result) = self.match_manually_set(snapshot, aircraft, steps) {
            return result;
        }

        if mode.contains(MatchingMode::EXACT_MATCH) {
            if let Some(result) = self.match_exact(snapshot, aircraft, steps) {
                return result;
            }
        }

        if mode.contains(MatchingMode::MODEL_MAPPING) {
            if let Some(result) = self.match_mapping(snapshot, aircraft, airline, steps) {
                return result;
            }
        }

        if mode.contains(MatchingMode::MODEL_MATCHING) {
            if let Some(result) = self.match_algorithmic(snapshot, aircraft, airline, steps) {
                return result;
            }
        }

        MatchResult {
            model: self.default_model.clone(),
            strategy: MatchStrategy::Default,
            score: None,
        }
    }

    fn match_manually_set(
        &self,
        snapshot: &MatchSnapshot,
        aircraft: &SimulatedAircraft,
        steps: &mut StepLog<'_>,
    ) -> Option<MatchResult> {
        if !aircraft.manually_set {
            return None;
        }
        let model_string = aircraft.assigned_model_string()?;
        match snapshot.models.find_by_model_string(model_string) {
            Some(model) => Some(MatchResult {
                model: model.clone().with_model_type(ModelType::ManuallySet),
                strategy: MatchStrategy::ManuallySet,
                score: None,
            }),
            None => {
                steps.warning(format!(
                    "Manually set model '{}' is not installed, matching instead",
                    model_string
                ));
                None
            }
        }
    }

    fn match_exact(
        &self,
        snapshot: &MatchSnapshot,
        aircraft: &SimulatedAircraft,
        steps: &mut StepLog<'_>,
    ) -> Option<MatchResult> {
        let Some(model_string) = aircraft.assigned_model_string() else {
            steps.debug("No assigned model string, skipping exact match".to_string());
            return None;
        };
        match snapshot.models.find_by_model_string(model_string) {
            Some(model) => Some(MatchResult {
                model: model.clone(),
                strategy: MatchStrategy::ExactMatch,
                score: None,
            }),
            None => {
                steps.debug(format!("No installed model '{}'", model_string));
                None
            }
        }
    }

    fn match_mapping(
        &self,
        snapshot: &MatchSnapshot,
        aircraft: &SimulatedAircraft,
        airline: Option<&str>,
        steps: &mut StepLog<'_>,
    ) -> Option<MatchResult> {
        if snapshot.rules.is_empty() {
            steps.debug("No mapping rules".to_string());
            return None;
        }

        let mut found: Vec<(&str, &MappingRule)> = Vec::with_capacity(3);
        if aircraft.has_callsign() {
            if let Some(rule) = snapshot.rules.find_by_callsign(&aircraft.callsign) {
                found.push(("callsign", rule));
            }
        }

        let icao = &aircraft.aircraft_icao;
        if icao.has_valid_designator() {
            let designator = icao.normalized_designator();
            if let Some(airline) = airline {
                if let Some(rule) = snapshot.rules.find_by_signature(&designator, airline) {
                    found.push(("ICAO signature", rule));
                }
            }
            if let Some(rule) = snapshot.rules.find_by_aircraft(&designator) {
                found.push(("aircraft designator", rule));
            }
        } else {
            steps.debug(format!(
                "Aircraft designator '{}' unusable for mapping",
                icao.designator
            ));
        }

        for (kind, rule) in found {
            match snapshot.models.find_by_model_string(&rule.target_model_string) {
                Some(model) => {
                    steps.debug(format!("Mapping rule '{}' matched by {}", rule, kind));
                    return Some(MatchResult {
                        model: model.clone().with_model_type(ModelType::FromMappingRule),
                        strategy: MatchStrategy::ModelMapping,
                        score: None,
                    });
                }
                None => steps.debug(format!("Mapping rule '{}' target not installed", rule)),
            }
        }

        steps.debug("No mapping rule applies".to_string());
        None
    }

    fn match_algorithmic(
        &self,
        snapshot: &MatchSnapshot,
        aircraft: &SimulatedAircraft,
        airline: Option<&str>,
        steps: &mut StepLog<'_>,
    ) -> Option<MatchResult> {
        let query = ScoreQuery::new(&aircraft.aircraft_icao, airline);
        if query.is_empty() {
            steps.debug("No usable ICAO data, skipping model matching".to_string());
            return None;
        }
        if snapshot.models.is_empty() {
            steps.debug("No installed models to score".to_string());
            return None;
        }

        let scorer = Scorer::new(&query, &self.setup.distributor_preferences);
        if steps.is_recording() {
            let ranked = scorer.ranked_candidates(&snapshot.models, TOP_CANDIDATES_LOGGED);
            let summary: Vec<String> = ranked
                .iter()
                .map(|c| format!("{} ({})", c.model.model_string, c.score))
                .collect();
            steps.debug(format!("Top candidates: {}", summary.join(", ")));
        }

        match scorer.best_candidate(&snapshot.models, self.setup.minimum_score) {
            Some(best) => Some(MatchResult {
                model: best.model.clone().with_model_type(ModelType::AlgorithmicMatch),
                strategy: MatchStrategy::ModelMatching,
                score: Some(best.score),
            }),
            None => {
                steps.debug(format!(
                    "No candidate reaches the minimum score {}",
                    self.setup.minimum_score
                ));
                None
            }
        }
    }
}

impl Drop for Matcher {
    fn drop(&mut self) {
        if let Some(flag) = self.shared.control.lock().cancel.take() {
            flag.store(true, Ordering::Release);
        }
    }
}

/// Writes decision steps to the `log` facade and, if given, a [`MatchingLog`].
struct StepLog<'a> {
    callsign: String,
    sink: Option<&'a mut MatchingLog>,
}

impl<'a> StepLog<'a> {
    fn new(callsign: &str, sink: Option<&'a mut MatchingLog>) -> Self {
        let callsign = if callsign.trim().is_empty() {
            "<no callsign>".to_string()
        } else {
            callsign.trim().to_string()
        };
        Self { callsign, sink }
    }

    fn is_recording(&self) -> bool {
        self.sink.is_some()
    }

    fn push(&mut self, severity: StepSeverity, message: String) {
        log::debug!("[Matcher] {}: {}", self.callsign, message);
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.push(severity, format!("{}: {}", self.callsign, message));
        }
    }

    fn debug(&mut self, message: String) {
        self.push(StepSeverity::Debug, message);
    }

    fn info(&mut self, message: String) {
        self.push(StepSeverity::Info, message);
    }

    fn warning(&mut self, message: String) {
        self.push(StepSeverity::Warning, message);
    }
}
