use std::fmt;
use std::io::{BufWriter, Write};

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::cyk::{BackPointer, Chart, Span};
use crate::error::Result;
use crate::grammar::Grammar;
use crate::structs::OutputFormat;

// --- Parse Trees ---

/// A reconstructed derivation. Serializes as the nested list
/// `["S", ["NP", "dog"], ["VP", "barks"]]`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseTree {
    Leaf { label: String, word: String },
    Branch { label: String, left: Box<ParseTree>, right: Box<ParseTree> },
}

impl ParseTree {
    pub fn label(&self) -> &str {
        match self {
            ParseTree::Leaf { label, .. } | ParseTree::Branch { label, .. } => label,
        }
    }

    /// Surface words in order.
    pub fn words(&self) -> Vec<&str> {
        match self {
            ParseTree::Leaf { word, .. } => vec![word.as_str()],
            ParseTree::Branch { left, right, .. } => {
                let mut words = left.words();
                words.extend(right.words());
                words
            }
        }
    }
}

impl Serialize for ParseTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ParseTree::Leaf { label, word } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(label)?;
                seq.serialize_element(word)?;
                seq.end()
            }
            ParseTree::Branch { label, left, right } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(label)?;
                seq.serialize_element(left)?;
                seq.serialize_element(right)?;
                seq.end()
            }
        }
    }
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseTree::Leaf { label, word } => write!(f, "({} {})", label, word),
            ParseTree::Branch { label, left, right } => write!(f, "({} {} {})", label, left, right),
        }
    }
}

/// The result of parsing one sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    /// Log-probability of the best parse; `-inf` when there is none.
    pub log_prob: f64,
    pub tree: Option<ParseTree>,
    pub sentence: Vec<String>,
}

impl ParseOutcome {
    pub fn no_parse(sentence: Vec<String>) -> Self {
        ParseOutcome { log_prob: f64::NEG_INFINITY, tree: None, sentence }
    }

    pub fn probability(&self) -> f64 {
        self.log_prob.exp()
    }

    pub fn is_parsed(&self) -> bool {
        self.tree.is_some()
    }

    /// Bracketed tree, or `(NOPARSE w1 w2 ...)`.
    pub fn bracketed(&self) -> String {
        match &self.tree {
            Some(tree) => tree.to_string(),
            None if self.sentence.is_empty() => "(NOPARSE)".to_string(),
            None => format!("(NOPARSE {})", self.sentence.join(" ")),
        }
    }
}

impl Serialize for ParseOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.tree {
            Some(tree) => tree.serialize(serializer),
            None => serializer.serialize_seq(Some(0))?.end(),
        }
    }
}

// --- Tree Reconstruction ---

/// Rebuilds the tree under `span` by following backpointers. Returns `None`
/// when a cell on the way has no derivation.
pub fn reconstruct_tree(grammar: &Grammar, chart: &Chart, span: Span, words: &[String]) -> Option<ParseTree> {
    let label = grammar.non_terminal_name(span.label).to_string();
    let backpointer = chart.backpointer(&span)?;

    match backpointer {
        BackPointer::Terminal => Some(ParseTree::Leaf {
            label,
            word: words[span.start - 1].clone(),
        }),
        BackPointer::Binary { .. } => {
            let (left_span, right_span) = backpointer.children(span)?;
            let left = reconstruct_tree(grammar, chart, left_span, words)?;
            let right = reconstruct_tree(grammar, chart, right_span, words)?;
            Some(ParseTree::Branch { label, left: Box::new(left), right: Box::new(right) })
        }
    }
}

// --- Output Writing ---

/// Writes one result per line, JSON or bracketed.
pub fn write_outcomes<W: Write>(writer: W, outcomes: &[ParseOutcome], format: OutputFormat) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    for outcome in outcomes {
        match format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut writer, outcome)?;
                writeln!(writer)?;
            }
            OutputFormat::Bracket => writeln!(writer, "{}", outcome.bracketed())?,
        }
    }
    writer.flush()?;
    Ok(())
}
