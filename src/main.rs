use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pcfg::output::write_outcomes;
use pcfg::parser::tokenize;
use pcfg::structs::{Cli, Commands, ParseArgs, RareWordsArgs, StatsArgs};
use pcfg::{parse_batch, Grammar, GrammarConfig, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Parse(args) => run_parse(&args),
        Commands::RareWords(args) => run_rare_words(&args),
        Commands::Stats(args) => run_stats(&args),
    }
}

fn read_sentences<R: BufRead>(reader: R) -> io::Result<Vec<Vec<String>>> {
    reader.lines().map(|line| line.map(|l| tokenize(&l))).collect()
}

fn run_parse(args: &ParseArgs) -> Result<()> {
    let grammar = load_for_report(&args.counts, args.grammar_config())?;

    let sentences = match &args.input {
        Some(path) => read_sentences(BufReader::new(File::open(path)?))?,
        None => read_sentences(io::stdin().lock())?,
    };
    info!("Parsing {} sentences with root '{}'", sentences.len(), args.root);

    let outcomes = parse_batch(&grammar, &sentences, &args.root, args.threads)?;
    let parsed = outcomes.iter().filter(|o| o.is_parsed()).count();
    info!("Found a parse for {} of {} sentences", parsed, outcomes.len());

    match &args.output {
        Some(path) => write_outcomes(File::create(path)?, &outcomes, args.format)?,
        None => write_outcomes(io::stdout().lock(), &outcomes, args.format)?,
    }
    Ok(())
}

fn load_for_report(path: &Path, config: GrammarConfig) -> Result<Grammar> {
    let (grammar, report) = Grammar::load(path, config)?;
    if report.skipped > 0 {
        info!("{} malformed count lines were skipped", report.skipped);
    }
    Ok(grammar)
}

fn run_rare_words(args: &RareWordsArgs) -> Result<()> {
    let grammar = load_for_report(&args.counts, args.grammar_config())?;
    let mut writer = BufWriter::new(io::stdout().lock());
    for word in grammar.rare_words() {
        writeln!(writer, "{}", word)?;
    }
    writer.flush()?;
    Ok(())
}

fn run_stats(args: &StatsArgs) -> Result<()> {
    let grammar = load_for_report(&args.counts, GrammarConfig::default())?;
    let counts = grammar.counts();
    let mut writer = BufWriter::new(io::stdout().lock());
    writeln!(writer, "nonterminals\t{}", grammar.non_terminals().len())?;
    writeln!(writer, "words\t{}", counts.words().count())?;
    writeln!(writer, "unary rules\t{}", counts.unary_rules().count())?;
    writeln!(writer, "binary rules\t{}", counts.binary_rules().count())?;
    for nt in grammar.non_terminals() {
        writeln!(writer, "{}\t{:.6}", nt, grammar.probability_mass(nt))?;
    }
    writer.flush()?;
    Ok(())
}
