// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

//! Plain text rule files.
//!
//! ```text
//! # comment
//! ; also a comment
//! SWA123      = B738_SWA
//! B738/SWA    = Boeing 737-800 Southwest
//! C172/*      = C172_GENERIC
//! ```
//!
//! A key containing `/` is an ICAO signature `AIRCRAFT/AIRLINE`; an empty or `*`
//! airline matches any operator. Every other key is a callsign.

use super::{MappingProvider, ProviderError};
use crate::rules::{MappingRule, RulePattern};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, space0};
use nom::combinator::{map, opt, rest};
use nom::sequence::{delimited, preceded, separated_pair};
use nom::IResult;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

fn designator(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric())(input)
}

fn callsign_key(input: &str) -> IResult<&str, RulePattern> {
    map(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        RulePattern::callsign,
    )(input)
}

fn icao_signature_key(input: &str) -> IResult<&str, RulePattern> {
    map(
        separated_pair(designator, char('/'), opt(alt((tag("*"), designator)))),
        |(aircraft, airline)| RulePattern::icao(aircraft, airline),
    )(input)
}

fn record(input: &str) -> IResult<&str, (RulePattern, &str)> {
    separated_pair(
        delimited(space0, alt((icao_signature_key, callsign_key)), space0),
        char('='),
        preceded(space0, rest),
    )(input)
}

/// Parses one line. `None` for blank and comment lines, `Some(Err)` for malformed records.
pub fn parse_rule_line(line: &str) -> Option<Result<MappingRule, String>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
        return None;
    }

    let parsed = match record(trimmed) {
        Ok((_, (pattern, target))) => {
            let target = target.trim();
            if target.is_empty() {
                Err(format!("missing target model string in '{}'", trimmed))
            } else {
                Ok(MappingRule::new(pattern, target))
            }
        }
        Err(_) => Err(format!("not a '<key> = <model string>' record: '{}'", trimmed)),
    };
    Some(parsed)
}

/// Parses a whole rule source. Returns the rules and the number of skipped lines.
pub fn parse_rules<R: BufRead>(reader: R) -> io::Result<(Vec<MappingRule>, usize)> {
    let mut rules = Vec::new();
    let mut skipped = 0;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_rule_line(&line) {
            None => {}
            Some(Ok(rule)) => rules.push(rule),
            Some(Err(reason)) => {
                skipped += 1;
                log::warn!("[RuleFile] Skipping line {}: {}", line_no + 1, reason);
            }
        }
    }

    Ok((rules, skipped))
}

pub struct RuleFileProvider {
    path: PathBuf,
    name: String,
    rules: Vec<MappingRule>,
    skipped_lines: usize,
}

impl RuleFileProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = format!("rule file {}", path.display());
        Self {
            path,
            name,
            rules: Vec::new(),
            skipped_lines: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Malformed lines skipped by the last successful read.
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

impl MappingProvider for RuleFileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<usize, ProviderError> {
        if !self.path.exists() {
            return Err(ProviderError::NotFound(self.path.clone()));
        }
        let file = File::open(&self.path)?;
        let (rules, skipped) = parse_rules(BufReader::new(file))?;

        log::info!(
            "[RuleFile] Read {} rules from {:?} ({} lines skipped)",
            rules.len(),
            self.path,
            skipped
        );
        self.rules = rules;
        self.skipped_lines = skipped;
        Ok(self.rules.len())
    }

    fn mapping_list(&self) -> &[MappingRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_callsign_and_signatures() {
        let rule = parse_rule_line("SWA123 = B738_SWA").unwrap().unwrap();
        assert_eq!(rule.pattern, RulePattern::callsign("SWA123"));
        assert_eq!(rule.target_model_string, "B738_SWA");

        let rule = parse_rule_line("  b738/swa=Boeing 737-800 Southwest  ")
            .unwrap()
            .unwrap();
        assert_eq!(rule.pattern, RulePattern::icao("B738", Some("SWA")));
        assert_eq!(rule.target_model_string, "Boeing 737-800 Southwest");

        let rule = parse_rule_line("C172/* = C172_GENERIC").unwrap().unwrap();
        assert_eq!(rule.pattern, RulePattern::icao("C172", None));

        let rule = parse_rule_line("C172/ = C172_GENERIC").unwrap().unwrap();
        assert_eq!(rule.pattern, RulePattern::icao("C172", None));
    }

    #[test]
    fn test_comments_and_blank_lines() {
        assert!(parse_rule_line("").is_none());
        assert!(parse_rule_line("   ").is_none());
        assert!(parse_rule_line("# SWA123 = X").is_none());
        assert!(parse_rule_line("; SWA123 = X").is_none());
    }

    #[test]
    fn test_malformed_lines() {
        assert!(parse_rule_line("SWA123 B738_SWA").unwrap().is_err());
        assert!(parse_rule_line("SWA123 =   ").unwrap().is_err());
        assert!(parse_rule_line("= B738").unwrap().is_err());
    }

    #[test]
    fn test_read_counts_skipped_lines() -> Result<(), ProviderError> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "# Southwest")?;
        writeln!(file, "SWA123 = B738_SWA")?;
        writeln!(file)?;
        writeln!(file, "broken line")?;
        writeln!(file, "B738/SWA = B738_SWA")?;

        let mut provider = RuleFileProvider::new(file.path());
        assert_eq!(provider.read()?, 2);
        assert_eq!(provider.skipped_lines(), 1);
        assert_eq!(provider.mapping_list().len(), 2);
        Ok(())
    }

    #[test]
    fn test_missing_file_keeps_previous_rules() -> Result<(), ProviderError> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "SWA123 = B738_SWA")?;
        let mut provider = RuleFileProvider::new(file.path());
        provider.read()?;

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());

        assert!(matches!(provider.read(), Err(ProviderError::NotFound(_))));
        assert_eq!(provider.mapping_list().len(), 1);
        Ok(())
    }
}
