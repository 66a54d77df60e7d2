// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepSeverity {
    Debug,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchingStep {
    pub severity: StepSeverity,
    pub message: String,
}

/// Decision steps of one or more match calls, each message prefixed with the callsign.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchingLog {
    steps: Vec<MatchingStep>,
}

impl MatchingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: StepSeverity, message: String) {
        self.steps.push(MatchingStep { severity, message });
    }

    pub fn steps(&self) -> &[MatchingStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// True if any step message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.steps.iter().any(|s| s.message.contains(needle))
    }
}

impl fmt::Display for MatchingLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            let tag = match step.severity {
                StepSeverity::Debug => "debug",
                StepSeverity::Info => "info",
                StepSeverity::Warning => "warn",
            };
            writeln!(f, "[{:>5}] {}", tag, step.message)?;
        }
        Ok(())
    }
}
