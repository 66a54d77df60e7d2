// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

//! Keeps mapping rules consistent with the installed models.
//!
//! A rule whose target model is not installed can never produce a renderable
//! model, so it is dropped before the rules are published to the matcher.

use crate::model::normalize_key;
use crate::rules::{MappingRule, MappingRuleStore};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseSensitivity {
    Sensitive,
    #[default]
    Insensitive,
}

enum NameLookup<'a> {
    Exact(&'a HashSet<String>),
    Folded(HashSet<String>),
}

impl<'a> NameLookup<'a> {
    fn new(known: &'a HashSet<String>, case: CaseSensitivity) -> Self {
        match case {
            CaseSensitivity::Sensitive => NameLookup::Exact(known),
            CaseSensitivity::Insensitive => {
                NameLookup::Folded(known.iter().map(|n| normalize_key(n)).collect())
            }
        }
    }

    fn contains(&self, name: &str) -> bool {
        match self {
            NameLookup::Exact(names) => names.contains(name),
            NameLookup::Folded(names) => names.contains(&normalize_key(name)),
        }
    }
}

pub struct ModelSynchronizer;

impl ModelSynchronizer {
    /// Drops every rule whose target is not in `known`. Returns the number of surviving rules.
    pub fn synchronize(
        store: &mut MappingRuleStore,
        known: &HashSet<String>,
        case: CaseSensitivity,
    ) -> usize {
        let lookup = NameLookup::new(known, case);
        let before = store.len();
        store.retain(|rule| lookup.contains(&rule.target_model_string));
        let after = store.len();

        if after < before {
            log::info!(
                "[Synchronizer] Dropped {} of {} mapping rules without installed target ({} models known)",
                before - after,
                before,
                known.len()
            );
        } else {
            log::debug!("[Synchronizer] All {} mapping rules resolve", after);
        }
        after
    }

    /// Rules `synchronize` would drop, in provider order.
    pub fn stale_rules<'r>(
        rules: &'r [MappingRule],
        known: &HashSet<String>,
        case: CaseSensitivity,
    ) -> Vec<&'r MappingRule> {
        let lookup = NameLookup::new(known, case);
        rules
            .iter()
            .filter(|rule| !lookup.contains(&rule.target_model_string))
            .collect()
    }
}
