use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::grammar::{Grammar, NonTerminalId};
use crate::output::{reconstruct_tree, ParseOutcome};

/// A chart cell: tokens `start..=end` (1-indexed) labeled with `label`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub label: NonTerminalId,
}

impl Span {
    pub fn new(start: usize, end: usize, label: NonTerminalId) -> Self {
        Span { start, end, label }
    }
}

/// How the best derivation of a cell was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackPointer {
    /// `label -> word`, where the word is the surface token at the cell's position.
    /// For rare words the probability came from `label -> _RARE_`.
    Terminal,
    /// `label -> left right`, with the left child covering `start..=split_point`.
    Binary {
        split_point: usize,
        left_child_non_terminal_id: NonTerminalId,
        right_child_non_terminal_id: NonTerminalId,
    },
}

impl BackPointer {
    /// Child spans of a binary backpointer stored at `span`.
    pub fn children(&self, span: Span) -> Option<(Span, Span)> {
        match *self {
            BackPointer::Terminal => None,
            BackPointer::Binary { split_point, left_child_non_terminal_id, right_child_non_terminal_id } => Some((
                Span::new(span.start, split_point, left_child_non_terminal_id),
                Span::new(split_point + 1, span.end, right_child_non_terminal_id),
            )),
        }
    }
}

/// Probability and backpointer tables for one sentence. Cells are stored
/// densely by span length, then start; each cell holds one entry per label.
#[derive(Debug, Clone)]
pub struct Chart {
    n: usize,
    labels: usize,
    log_probs: Vec<f64>,
    backpointers: Vec<Option<BackPointer>>,
}

impl Chart {
    fn new(n: usize, labels: usize) -> Self {
        let entries = n * (n + 1) / 2 * labels;
        Chart {
            n,
            labels,
            log_probs: vec![f64::NEG_INFINITY; entries],
            backpointers: vec![None; entries],
        }
    }

    // i and j are 0-indexed, inclusive
    fn index(&self, i: usize, j: usize, label: NonTerminalId) -> usize {
        let length = j - i;
        let cell = length * self.n - length * length.saturating_sub(1) / 2 + i;
        cell * self.labels + label
    }

    fn set(&mut self, i: usize, j: usize, label: NonTerminalId, log_prob: f64, backpointer: Option<BackPointer>) {
        let idx = self.index(i, j, label);
        self.log_probs[idx] = log_prob;
        self.backpointers[idx] = backpointer;
    }

    fn log_prob_at(&self, i: usize, j: usize, label: NonTerminalId) -> f64 {
        self.log_probs[self.index(i, j, label)]
    }

    fn position(&self, span: &Span) -> Option<usize> {
        let valid = span.start >= 1 && span.start <= span.end && span.end <= self.n && span.label < self.labels;
        valid.then(|| self.index(span.start - 1, span.end - 1, span.label))
    }

    /// Sentence length.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Number of (span, label) entries, `n(n+1)/2 * |labels|`.
    pub fn entries(&self) -> usize {
        self.log_probs.len()
    }

    /// Best log-probability for `span`; `-inf` when there is no derivation or
    /// the span lies outside the sentence.
    pub fn log_prob(&self, span: &Span) -> f64 {
        self.position(span).map_or(f64::NEG_INFINITY, |idx| self.log_probs[idx])
    }

    pub fn probability(&self, span: &Span) -> f64 {
        self.log_prob(span).exp()
    }

    pub fn backpointer(&self, span: &Span) -> Option<&BackPointer> {
        self.position(span).and_then(|idx| self.backpointers[idx].as_ref())
    }
}

// --- CKY ---

/// Relative slack under which two log-probabilities count as the same
/// probability. Log sums of equal products can differ in the last bits.
const TIE_TOLERANCE: f64 = 1e-12;

/// Whether `candidate` beats `best` by more than rounding noise.
fn improves(candidate: f64, best: f64) -> bool {
    if best == f64::NEG_INFINITY {
        return candidate > best;
    }
    candidate > best + TIE_TOLERANCE * best.abs().max(1.0)
}

/// Fills the chart bottom-up by span length.
///
/// Ties, up to `TIE_TOLERANCE`, keep the first candidate seen. Candidates are visited by rule in
/// `(rhs1, rhs2)` name order and, within a rule, by ascending split point.
pub fn fill_chart<S: AsRef<str>>(grammar: &Grammar, words: &[S]) -> Chart {
    let n = words.len();
    let labels = grammar.non_terminals().len();
    let mut chart = Chart::new(n, labels);

    // Every label gets a leaf entry, even when its rule was never observed.
    for (i, word) in words.iter().enumerate() {
        let lexicon = grammar.lexicon(word.as_ref());
        if lexicon.rare {
            debug!("Word '{}' at position {} is rare", word.as_ref(), i + 1);
        }
        for (label, log_prob) in lexicon.log_probs.iter().enumerate() {
            chart.set(i, i, label, *log_prob, Some(BackPointer::Terminal));
        }
    }

    for length in 1..n {
        for i in 0..(n - length) {
            let j = i + length;
            for label in 0..labels {
                let mut best = f64::NEG_INFINITY;
                let mut backpointer = None;
                for rule in grammar.binary_rules(label) {
                    for split in i..j {
                        let left = chart.log_prob_at(i, split, rule.rhs1);
                        if left == f64::NEG_INFINITY {
                            continue;
                        }
                        let right = chart.log_prob_at(split + 1, j, rule.rhs2);
                        let candidate = rule.log_prob + left + right;
                        if improves(candidate, best) {
                            best = candidate;
                            backpointer = Some(BackPointer::Binary {
                                split_point: split + 1,
                                left_child_non_terminal_id: rule.rhs1,
                                right_child_non_terminal_id: rule.rhs2,
                            });
                        }
                    }
                }
                chart.set(i, j, label, best, backpointer);
            }
        }
    }

    chart
}

/// Finds the most probable parse of `words` rooted at `root`.
///
/// A sentence the grammar cannot derive is not an error: the outcome carries
/// probability 0 and no tree.
pub fn parse_sentence<S: AsRef<str>>(grammar: &Grammar, words: &[S], root: &str) -> ParseOutcome {
    let sentence: Vec<String> = words.iter().map(|w| w.as_ref().to_string()).collect();
    if sentence.is_empty() {
        return ParseOutcome::no_parse(sentence);
    }
    let Some(root_id) = grammar.non_terminal_id(root) else {
        warn!("Root label '{}' is not a nonterminal of the grammar", root);
        return ParseOutcome::no_parse(sentence);
    };

    let chart = fill_chart(grammar, &sentence);
    let root_span = Span::new(1, sentence.len(), root_id);
    let log_prob = chart.log_prob(&root_span);
    if log_prob == f64::NEG_INFINITY {
        return ParseOutcome::no_parse(sentence);
    }

    let tree = reconstruct_tree(grammar, &chart, root_span, &sentence);
    ParseOutcome { log_prob, tree, sentence }
}

/// Parses every sentence against the shared grammar on a pool of `threads`
/// workers, each sentence with its own chart. Outcomes come back in input order.
pub fn parse_batch(grammar: &Grammar, sentences: &[Vec<String>], root: &str, threads: usize) -> Result<Vec<ParseOutcome>> {
    let parse_one = |(idx, words): (usize, &Vec<String>)| {
        info!("Running CKY on sentence {}", idx + 1);
        parse_sentence(grammar, words.as_slice(), root)
    };

    if threads <= 1 {
        return Ok(sentences.iter().enumerate().map(parse_one).collect());
    }

    let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
    Ok(pool.install(|| sentences.par_iter().enumerate().map(parse_one).collect()))
}
