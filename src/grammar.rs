use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::rules::{BinaryRule, LoadReport, Rule, RuleCounts, UnaryRule, RARE_WORD};

/// Dense index of a nonterminal. Ids follow the lexicographic order of the names.
pub type NonTerminalId = usize;

pub const DEFAULT_RARE_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarConfig {
    /// Words whose total count is below this are rare for the upstream
    /// rewriting step. The parser itself never consults it: at parse time a
    /// word falls back to `_RARE_` only when no rule rewrites to it at all.
    pub rare_threshold: u32,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig { rare_threshold: DEFAULT_RARE_THRESHOLD }
    }
}

// --- Grammar Structures ---

/// A binary rule with interned symbols, as the chart parser consumes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryProduction {
    pub lhs: NonTerminalId,
    pub rhs1: NonTerminalId,
    pub rhs2: NonTerminalId,
    pub log_prob: f64,
}

/// Log-probabilities of every nonterminal rewriting to one leaf word.
#[derive(Debug, Clone, Copy)]
pub struct Lexicon<'g> {
    pub log_probs: &'g [f64],
    /// The word had no rule of its own and the `_RARE_` row was used.
    pub rare: bool,
}

/// A maximum-likelihood PCFG. Built once from counts and read-only afterwards,
/// so a single value can be shared by every thread parsing sentences.
#[derive(Debug, Clone)]
pub struct Grammar {
    config: GrammarConfig,
    counts: RuleCounts,
    non_terminals: Vec<String>,
    non_terminal_to_id: HashMap<String, NonTerminalId>,
    binary_rules_by_lhs: Vec<Vec<BinaryProduction>>,
    lexical_log_probs: HashMap<String, Vec<f64>>,
    rare_log_probs: Vec<f64>,
}

fn ln(probability: f64) -> f64 {
    if probability > 0.0 {
        probability.ln()
    } else {
        f64::NEG_INFINITY
    }
}

impl Grammar {
    pub fn from_counts(counts: RuleCounts, config: GrammarConfig) -> Self {
        let names: BTreeSet<&str> = counts
            .non_terminals()
            .filter(|(_, count)| *count > 0.0)
            .map(|(nt, _)| nt)
            .collect();
        let non_terminals: Vec<String> = names.into_iter().map(String::from).collect();
        let non_terminal_to_id: HashMap<String, NonTerminalId> =
            non_terminals.iter().enumerate().map(|(id, nt)| (nt.clone(), id)).collect();

        let mut grammar = Grammar {
            config,
            counts: RuleCounts::new(),
            binary_rules_by_lhs: vec![Vec::new(); non_terminals.len()],
            rare_log_probs: vec![f64::NEG_INFINITY; non_terminals.len()],
            lexical_log_probs: HashMap::new(),
            non_terminals,
            non_terminal_to_id,
        };

        // Binary rules sorted by (lhs, rhs1, rhs2) give the parser its tie-break order.
        let mut binary: Vec<&BinaryRule> = counts.binary_rules().map(|(rule, _)| rule).collect();
        binary.sort();
        for rule in binary {
            let (Some(lhs), Some(rhs1), Some(rhs2)) = (
                grammar.non_terminal_id(&rule.lhs),
                grammar.non_terminal_id(&rule.rhs1),
                grammar.non_terminal_id(&rule.rhs2),
            ) else {
                debug!("Binary rule {:?} mentions an unknown nonterminal, not used for parsing", rule);
                continue;
            };
            let log_prob = ln(Self::binary_probability(&counts, rule));
            if log_prob == f64::NEG_INFINITY {
                continue;
            }
            grammar.binary_rules_by_lhs[lhs].push(BinaryProduction { lhs, rhs1, rhs2, log_prob });
        }

        let labels = grammar.non_terminals.len();
        for (rule, _) in counts.unary_rules() {
            let Some(lhs) = grammar.non_terminal_id(&rule.lhs) else {
                continue;
            };
            let log_prob = ln(Self::unary_probability(&counts, rule));
            grammar
                .lexical_log_probs
                .entry(rule.rhs.clone())
                .or_insert_with(|| vec![f64::NEG_INFINITY; labels])[lhs] = log_prob;
            if rule.rhs == RARE_WORD {
                grammar.rare_log_probs[lhs] = log_prob;
            }
        }

        grammar.counts = counts;
        info!(
            "Built grammar with {} nonterminals, {} binary rules and {} known words",
            grammar.non_terminals.len(),
            grammar.binary_rules_by_lhs.iter().map(Vec::len).sum::<usize>(),
            grammar.lexical_log_probs.len()
        );
        grammar
    }

    /// Loads a count file and builds the grammar from it.
    pub fn load(path: &Path, config: GrammarConfig) -> Result<(Self, LoadReport)> {
        let mut counts = RuleCounts::new();
        let report = counts.load(path)?;
        Ok((Self::from_counts(counts, config), report))
    }

    fn unary_probability(counts: &RuleCounts, rule: &UnaryRule) -> f64 {
        let total = counts.non_terminal_count(&rule.lhs);
        if total > 0.0 {
            counts.unary_count(rule) / total
        } else {
            0.0
        }
    }

    fn binary_probability(counts: &RuleCounts, rule: &BinaryRule) -> f64 {
        let total = counts.non_terminal_count(&rule.lhs);
        if total > 0.0 {
            counts.binary_count(rule) / total
        } else {
            0.0
        }
    }

    /// `count(rule) / count(lhs)`. A left-hand side that was never counted
    /// gives 0 instead of an undefined estimate.
    pub fn rule_probability(&self, rule: &Rule) -> f64 {
        match rule {
            Rule::Unary(rule) => Self::unary_probability(&self.counts, rule),
            Rule::Binary(rule) => Self::binary_probability(&self.counts, rule),
        }
    }

    /// Total probability of all rules with `lhs` on the left.
    pub fn probability_mass(&self, lhs: &str) -> f64 {
        let unary: f64 = self
            .counts
            .unary_rules()
            .filter(|(rule, _)| rule.lhs == lhs)
            .map(|(rule, _)| Self::unary_probability(&self.counts, rule))
            .sum();
        let binary: f64 = self
            .counts
            .binary_rules()
            .filter(|(rule, _)| rule.lhs == lhs)
            .map(|(rule, _)| Self::binary_probability(&self.counts, rule))
            .sum();
        unary + binary
    }

    /// Every nonterminal with a nonzero count, in id order.
    pub fn non_terminals(&self) -> &[String] {
        &self.non_terminals
    }

    pub fn non_terminal_id(&self, name: &str) -> Option<NonTerminalId> {
        self.non_terminal_to_id.get(name).copied()
    }

    pub fn non_terminal_name(&self, id: NonTerminalId) -> &str {
        &self.non_terminals[id]
    }

    /// Binary rules with `lhs` on the left, ordered by `(rhs1, rhs2)` name.
    pub fn binary_rules(&self, lhs: NonTerminalId) -> &[BinaryProduction] {
        &self.binary_rules_by_lhs[lhs]
    }

    pub fn is_known_word(&self, word: &str) -> bool {
        self.lexical_log_probs.contains_key(word)
    }

    /// Leaf probabilities for `word`. Falls back to the `_RARE_` row for every
    /// nonterminal when no nonterminal has a rule for the exact word.
    pub fn lexicon(&self, word: &str) -> Lexicon<'_> {
        match self.lexical_log_probs.get(word) {
            Some(log_probs) => Lexicon { log_probs, rare: false },
            None => Lexicon { log_probs: &self.rare_log_probs, rare: true },
        }
    }

    pub fn is_below_threshold(&self, word: &str) -> bool {
        self.counts.word_count(word) < f64::from(self.config.rare_threshold)
    }

    /// Words counted fewer times than the configured threshold, sorted.
    pub fn rare_words(&self) -> Vec<&str> {
        let mut words: Vec<&str> = self
            .counts
            .words()
            .filter(|(word, _)| *word != RARE_WORD && self.is_below_threshold(word))
            .map(|(word, _)| word)
            .collect();
        words.sort_unstable();
        words
    }

    pub fn counts(&self) -> &RuleCounts {
        &self.counts
    }

    pub fn config(&self) -> GrammarConfig {
        self.config
    }
}
