use clap::Parser;
use std::path::PathBuf;

use crate::grammar::{GrammarConfig, DEFAULT_RARE_THRESHOLD};

// --- Command Line ---

#[derive(Parser, Debug)]
#[command(name = "pcfg_tool", about = "Maximum-likelihood PCFG parsing with the CKY algorithm", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Parses one whitespace-tokenized sentence per input line
    Parse(ParseArgs),
    /// Lists words counted fewer times than the rare threshold
    RareWords(RareWordsArgs),
    /// Prints vocabulary sizes and per-nonterminal probability mass
    Stats(StatsArgs),
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Nested JSON lists, one tree per line
    Json,
    /// Penn-style brackets, one tree per line
    Bracket,
}

#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Aggregated rule count file
    #[arg(long)]
    pub counts: PathBuf,

    /// Label every parse must be rooted at
    #[arg(long, default_value = "SBARQ")]
    pub root: String,

    /// Count below which a word is listed as rare; parsing itself ignores it
    #[arg(long, default_value_t = DEFAULT_RARE_THRESHOLD)]
    pub rare_threshold: u32,

    /// Number of sentences parsed concurrently
    #[arg(long, default_value_t = 1)]
    pub threads: usize,

    /// Output format of the parse results
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write results here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Sentence file; reads stdin when absent
    #[arg()]
    pub input: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct RareWordsArgs {
    /// Aggregated rule count file
    #[arg(long)]
    pub counts: PathBuf,

    /// Words counted fewer times than this are listed
    #[arg(long, default_value_t = DEFAULT_RARE_THRESHOLD)]
    pub rare_threshold: u32,
}

#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Aggregated rule count file
    #[arg(long)]
    pub counts: PathBuf,
}

impl ParseArgs {
    pub fn grammar_config(&self) -> GrammarConfig {
        GrammarConfig { rare_threshold: self.rare_threshold }
    }
}

impl RareWordsArgs {
    pub fn grammar_config(&self) -> GrammarConfig {
        GrammarConfig { rare_threshold: self.rare_threshold }
    }
}
