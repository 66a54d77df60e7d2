// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

pub mod cache;
pub mod file;

pub use cache::CachedRuleProvider;
pub use file::RuleFileProvider;

use crate::rules::MappingRule;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Rule source not found: {0}")]
    NotFound(PathBuf),
    #[error("Unsupported rule cache version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

/// A source of mapping rules.
///
/// `read` replaces the provider's list on success. On failure the previous list
/// is left as it was.
pub trait MappingProvider: Send {
    fn name(&self) -> &str;

    /// Loads the rules, returning how many were read.
    fn read(&mut self) -> Result<usize, ProviderError>;

    fn mapping_list(&self) -> &[MappingRule];
}

/// Rules handed over in memory, e.g. by a caller that already holds them.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleProvider {
    rules: Vec<MappingRule>,
}

impl StaticRuleProvider {
    pub fn new(rules: Vec<MappingRule>) -> Self {
        Self { rules }
    }
}

impl MappingProvider for StaticRuleProvider {
    fn name(&self) -> &str {
        "static rules"
    }

    fn read(&mut self) -> Result<usize, ProviderError> {
        Ok(self.rules.len())
    }

    fn mapping_list(&self) -> &[MappingRule] {
        &self.rules
    }
}
