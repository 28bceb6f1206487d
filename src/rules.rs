use std::collections::HashMap;
use std::fs::File;
use std::hash::Hash;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use crate::error::{PcfgError, Result};
use crate::parser::{parse_count_line, LineError};

/// Pooled pseudo-word standing in for every word the lexicon never saw.
pub const RARE_WORD: &str = "_RARE_";

// --- Rule Structures ---

/// `lhs -> rhs`, where `rhs` is a terminal word (or, in principle, a nonterminal).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnaryRule {
    pub lhs: String,
    pub rhs: String,
}

/// `lhs -> rhs1 rhs2`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinaryRule {
    pub lhs: String,
    pub rhs1: String,
    pub rhs2: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rule {
    Unary(UnaryRule),
    Binary(BinaryRule),
}

impl Rule {
    pub fn lhs(&self) -> &str {
        match self {
            Rule::Unary(rule) => &rule.lhs,
            Rule::Binary(rule) => &rule.lhs,
        }
    }
}

impl UnaryRule {
    pub fn new(lhs: impl Into<String>, rhs: impl Into<String>) -> Self {
        UnaryRule { lhs: lhs.into(), rhs: rhs.into() }
    }
}

impl BinaryRule {
    pub fn new(lhs: impl Into<String>, rhs1: impl Into<String>, rhs2: impl Into<String>) -> Self {
        BinaryRule { lhs: lhs.into(), rhs1: rhs1.into(), rhs2: rhs2.into() }
    }
}

/// One line of an aggregated count file.
#[derive(Debug, Clone, PartialEq)]
pub enum CountRecord {
    NonTerminal { symbol: String, count: f64 },
    Unary { rule: UnaryRule, count: f64 },
    Binary { rule: BinaryRule, count: f64 },
}

/// What a load did with the lines it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub records: usize,
    pub skipped: usize,
}

// --- Rule Counts ---

/// Running frequency totals. Every increment adds to the existing total;
/// nothing is ever removed or reset.
#[derive(Debug, Clone, Default)]
pub struct RuleCounts {
    words: HashMap<String, f64>,
    non_terminals: HashMap<String, f64>,
    unary: HashMap<UnaryRule, f64>,
    binary: HashMap<BinaryRule, f64>,
}

fn bump<K: Hash + Eq>(map: &mut HashMap<K, f64>, key: K, amount: f64) {
    *map.entry(key).or_insert(0.0) += amount;
}

impl RuleCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_word(&mut self, word: impl Into<String>, amount: f64) {
        bump(&mut self.words, word.into(), amount);
    }

    pub fn increment_non_terminal(&mut self, symbol: impl Into<String>, amount: f64) {
        bump(&mut self.non_terminals, symbol.into(), amount);
    }

    pub fn increment_unary(&mut self, rule: UnaryRule, amount: f64) {
        bump(&mut self.unary, rule, amount);
    }

    pub fn increment_binary(&mut self, rule: BinaryRule, amount: f64) {
        bump(&mut self.binary, rule, amount);
    }

    pub fn word_count(&self, word: &str) -> f64 {
        self.words.get(word).copied().unwrap_or(0.0)
    }

    pub fn non_terminal_count(&self, symbol: &str) -> f64 {
        self.non_terminals.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn unary_count(&self, rule: &UnaryRule) -> f64 {
        self.unary.get(rule).copied().unwrap_or(0.0)
    }

    pub fn binary_count(&self, rule: &BinaryRule) -> f64 {
        self.binary.get(rule).copied().unwrap_or(0.0)
    }

    /// Whether `rule` was ever observed, even with a zero count.
    pub fn contains_unary(&self, rule: &UnaryRule) -> bool {
        self.unary.contains_key(rule)
    }

    pub fn words(&self) -> impl Iterator<Item = (&str, f64)> {
        self.words.iter().map(|(w, c)| (w.as_str(), *c))
    }

    pub fn non_terminals(&self) -> impl Iterator<Item = (&str, f64)> {
        self.non_terminals.iter().map(|(nt, c)| (nt.as_str(), *c))
    }

    pub fn unary_rules(&self) -> impl Iterator<Item = (&UnaryRule, f64)> {
        self.unary.iter().map(|(r, c)| (r, *c))
    }

    pub fn binary_rules(&self) -> impl Iterator<Item = (&BinaryRule, f64)> {
        self.binary.iter().map(|(r, c)| (r, *c))
    }

    /// Adds a single record. A unary record also counts its right-hand side as a word.
    pub fn record(&mut self, record: CountRecord) {
        match record {
            CountRecord::NonTerminal { symbol, count } => self.increment_non_terminal(symbol, count),
            CountRecord::Unary { rule, count } => {
                self.increment_word(rule.rhs.clone(), count);
                self.increment_unary(rule, count);
            }
            CountRecord::Binary { rule, count } => self.increment_binary(rule, count),
        }
    }

    pub fn accumulate<I: IntoIterator<Item = CountRecord>>(&mut self, records: I) {
        for record in records {
            self.record(record);
        }
    }

    // --- Loading Counts ---

    pub fn load(&mut self, path: &Path) -> Result<LoadReport> {
        let file = File::open(path)?;
        let report = self.read_from(BufReader::new(file), path)?;
        info!(
            "Loaded {} count records from {:?} ({} skipped)",
            report.records, path, report.skipped
        );
        Ok(report)
    }

    /// Reads count lines from `reader`. `origin` is only used in messages.
    /// A bad count aborts the load; structurally malformed lines are skipped.
    pub fn read_from<R: BufRead>(&mut self, reader: R, origin: &Path) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            match parse_count_line(&line) {
                Ok(Some(record)) => {
                    self.record(record);
                    report.records += 1;
                }
                Ok(None) => {}
                Err(LineError::InvalidCount(value)) => {
                    return Err(PcfgError::InvalidCount {
                        path: origin.to_path_buf(),
                        line: line_num + 1,
                        value,
                    });
                }
                Err(LineError::Malformed) => {
                    warn!("Skipping malformed count line {}: '{}'", line_num + 1, line.trim());
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }
}
