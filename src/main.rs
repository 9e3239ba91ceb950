use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use dupegate::config::Config;
use dupegate::corpus::Corpus;
use dupegate::report::{Analysis, AuditFinding, AuditReport, EXIT_OK, EXIT_USAGE};
use dupegate::sentences;
use dupegate::similarity::{self, SimilarityMatrix};
use dupegate::terms::TermIndex;

/// dupegate - Flag repeated sentences and near-duplicate pages before deploy
#[derive(Parser)]
#[command(name = "dupegate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = ".dupegate.toml")]
    config: PathBuf,

    /// Quiet mode - suppress progress and timing output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find sentences repeated inside a page or across pages (exit 2 on failure)
    Phrases {
        /// Root directory to scan
        root: PathBuf,

        /// Minimum words for a sentence to count
        #[arg(short = 'w', long)]
        min_words: Option<usize>,

        /// Compare sentences ignoring case, accents and punctuation
        #[arg(long)]
        normalize: bool,

        /// Offending sentences to show per category
        #[arg(short = 'n', long)]
        show: Option<usize>,
    },

    /// Find page pairs with high TF-IDF similarity (exit 3 on failure)
    Similarity {
        /// Root directory to scan
        root: PathBuf,

        /// Similarity threshold (0.0 to 1.0)
        threshold: Option<f64>,
    },

    /// Run both checks over one scan (exit 2 on repeats, else 3 on similarity)
    Audit {
        /// Root directory to scan
        root: PathBuf,

        /// Similarity threshold (0.0 to 1.0)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Minimum words for a sentence to count
        #[arg(short = 'w', long)]
        min_words: Option<usize>,

        /// Compare sentences ignoring case, accents and punctuation
        #[arg(long)]
        normalize: bool,

        /// Offending sentences to show per category
        #[arg(short = 'n', long)]
        show: Option<usize>,
    },
}

/// Global output switches.
#[derive(Clone, Copy)]
struct Output {
    quiet: bool,
    json: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // usage errors are exit 1; --help and --version are not errors
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_OK };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let output = Output {
        quiet: cli.quiet,
        json: cli.json,
    };

    let result = Config::load(&cli.config).and_then(|config| match cli.command {
        Commands::Phrases { root, min_words, normalize, show } => {
            cmd_phrases(&root, apply_phrase_flags(config, min_words, normalize, show)?, output)
        }
        Commands::Similarity { root, threshold } => {
            cmd_similarity(&root, apply_threshold(config, threshold)?, output)
        }
        Commands::Audit { root, threshold, min_words, normalize, show } => {
            let config = apply_phrase_flags(config, min_words, normalize, show)?;
            cmd_audit(&root, apply_threshold(config, threshold)?, output)
        }
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(EXIT_USAGE);
        }
    }
}

fn apply_phrase_flags(
    mut config: Config,
    min_words: Option<usize>,
    normalize: bool,
    show: Option<usize>,
) -> Result<Config, Box<dyn std::error::Error>> {
    if let Some(min_words) = min_words {
        config.phrases.min_words = min_words;
    }
    if normalize {
        config.phrases.normalize = true;
    }
    if let Some(show) = show {
        config.phrases.show = show;
    }
    config.validate()?;
    Ok(config)
}

fn apply_threshold(
    mut config: Config,
    threshold: Option<f64>,
) -> Result<Config, Box<dyn std::error::Error>> {
    if let Some(threshold) = threshold {
        config.similarity.threshold = threshold;
    }
    config.validate()?;
    Ok(config)
}

fn load_corpus(
    root: &Path,
    config: &Config,
    output: Output,
) -> Result<Corpus, Box<dyn std::error::Error>> {
    let start = Instant::now();

    if !output.quiet {
        eprintln!("{} {}", "Scanning".cyan().bold(), root.display());
    }

    let corpus = Corpus::load(root, &config.corpus_options())?;

    for skipped in &corpus.skipped {
        eprintln!("{}: skipping {}: {}", "warning".yellow().bold(), skipped.path, skipped.reason);
    }

    if !output.quiet {
        eprintln!(
            "  {} documents loaded in {:.2?}",
            corpus.len().to_string().cyan(),
            start.elapsed()
        );
    }

    Ok(corpus)
}

fn similarity_findings(corpus: &Corpus, threshold: f64, output: Output) -> Vec<AuditFinding> {
    let start = Instant::now();
    let index = TermIndex::build(corpus);
    let matrix = SimilarityMatrix::build(&index);

    if !output.quiet {
        eprintln!(
            "  TF-IDF similarity: {:?} ({} pairs, {} terms)",
            start.elapsed(),
            matrix.pair_count(),
            index.vocabulary_len()
        );
    }

    similarity::find_similar(corpus, &matrix, threshold)
}

fn finish(
    report: AuditReport,
    analysis: Analysis,
    show: usize,
    output: Output,
) -> Result<i32, Box<dyn std::error::Error>> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_console(analysis, show);
    }
    Ok(report.exit_code())
}

fn cmd_phrases(
    root: &Path,
    config: Config,
    output: Output,
) -> Result<i32, Box<dyn std::error::Error>> {
    let corpus = load_corpus(root, &config, output)?;
    let findings = sentences::find_repeats(&corpus, &config.phrase_options());
    finish(AuditReport::new(findings), Analysis::Phrases, config.phrases.show, output)
}

fn cmd_similarity(
    root: &Path,
    config: Config,
    output: Output,
) -> Result<i32, Box<dyn std::error::Error>> {
    let corpus = load_corpus(root, &config, output)?;
    let findings = similarity_findings(&corpus, config.similarity.threshold, output);
    finish(AuditReport::new(findings), Analysis::Similarity, config.phrases.show, output)
}

fn cmd_audit(
    root: &Path,
    config: Config,
    output: Output,
) -> Result<i32, Box<dyn std::error::Error>> {
    let corpus = load_corpus(root, &config, output)?;

    // Both detectors only read the corpus.
    let (mut findings, similar) = rayon::join(
        || sentences::find_repeats(&corpus, &config.phrase_options()),
        || similarity_findings(&corpus, config.similarity.threshold, output),
    );
    findings.extend(similar);

    finish(AuditReport::new(findings), Analysis::Audit, config.phrases.show, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_positional_threshold() {
        let cli = Cli::try_parse_from(["dupegate", "similarity", "site", "0.75"]).unwrap();
        match cli.command {
            Commands::Similarity { root, threshold } => {
                assert_eq!(root, PathBuf::from("site"));
                assert_eq!(threshold, Some(0.75));
            }
            _ => panic!("expected similarity command"),
        }
    }

    #[test]
    fn test_cli_requires_root() {
        let err = Cli::try_parse_from(["dupegate", "phrases"]).err().unwrap();
        assert!(err.use_stderr());
    }

    #[test]
    fn test_flags_override_config() {
        let config = apply_phrase_flags(Config::default(), Some(4), true, Some(10)).unwrap();
        assert_eq!(config.phrases.min_words, 4);
        assert!(config.phrases.normalize);
        assert_eq!(config.phrases.show, 10);

        let config = apply_threshold(config, Some(0.5)).unwrap();
        assert_eq!(config.similarity.threshold, 0.5);

        assert!(apply_threshold(Config::default(), Some(f64::NAN)).is_err());
        assert!(apply_phrase_flags(Config::default(), Some(0), false, None).is_err());
    }
}
