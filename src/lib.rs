//! Probabilistic context-free grammars estimated from rule counts, and a
//! CKY parser that finds the most probable tree for a sentence.

pub mod cyk;
pub mod error;
pub mod grammar;
pub mod output;
pub mod parser;
pub mod rules;
pub mod structs;


pub use crate::cyk::{fill_chart, parse_batch, parse_sentence, BackPointer, Chart, Span};
pub use crate::error::{PcfgError, Result};
pub use crate::grammar::{Grammar, GrammarConfig, NonTerminalId};
pub use crate::output::{ParseOutcome, ParseTree};
pub use crate::rules::{BinaryRule, CountRecord, Rule, RuleCounts, UnaryRule, RARE_WORD};
