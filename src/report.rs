use colored::Colorize;
use serde::Serialize;

pub const EXIT_OK: i32 = 0;
pub const EXIT_USAGE: i32 = 1;
pub const EXIT_DUPLICATE: i32 = 2;
pub const EXIT_SIMILARITY: i32 = 3;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditFinding {
    /// A sentence repeated inside one document
    InternalDuplicate {
        document: String,
        sentence: String,
        count: usize,
    },
    /// A sentence shared by several documents, listed in corpus order
    CrossFileDuplicate {
        sentence: String,
        documents: Vec<String>,
    },
    HighSimilarity {
        document_a: String,
        document_b: String,
        score: f64,
    },
}

impl AuditFinding {
    pub fn is_duplicate(&self) -> bool {
        !matches!(self, AuditFinding::HighSimilarity { .. })
    }
}

/// Which detectors contributed to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analysis {
    Phrases,
    Similarity,
    Audit,
}

impl Analysis {
    fn includes_phrases(self) -> bool {
        matches!(self, Analysis::Phrases | Analysis::Audit)
    }

    fn includes_similarity(self) -> bool {
        matches!(self, Analysis::Similarity | Analysis::Audit)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AuditReport {
    pub findings: Vec<AuditFinding>,
    pub failed: bool,
}

impl AuditReport {
    pub fn new(findings: Vec<AuditFinding>) -> Self {
        let failed = !findings.is_empty();
        AuditReport { findings, failed }
    }

    /// Process exit code for the build gate. Sentence duplicates take
    /// precedence over similarity when a combined audit finds both.
    pub fn exit_code(&self) -> i32 {
        if self.findings.iter().any(AuditFinding::is_duplicate) {
            EXIT_DUPLICATE
        } else if self.failed {
            EXIT_SIMILARITY
        } else {
            EXIT_OK
        }
    }

    pub fn print_console(&self, analysis: Analysis, show: usize) {
        if analysis.includes_phrases() {
            self.print_phrases(show);
        }
        if analysis.includes_phrases() && analysis.includes_similarity() {
            println!();
        }
        if analysis.includes_similarity() {
            self.print_similarity();
        }
    }

    fn print_phrases(&self, show: usize) {
        println!("{}", "Repeated phrases".cyan().bold());

        // (document, sentences) in report order
        let mut internal: Vec<(&str, Vec<(&str, usize)>)> = Vec::new();
        let mut cross: Vec<(&str, &[String])> = Vec::new();

        for finding in &self.findings {
            match finding {
                AuditFinding::InternalDuplicate { document, sentence, count } => {
                    let entry = (sentence.as_str(), *count);
                    let same_document = internal
                        .last()
                        .map_or(false, |(doc, _)| *doc == document.as_str());
                    if same_document {
                        if let Some((_, sentences)) = internal.last_mut() {
                            sentences.push(entry);
                        }
                    } else {
                        internal.push((document.as_str(), vec![entry]));
                    }
                }
                AuditFinding::CrossFileDuplicate { sentence, documents } => {
                    cross.push((sentence.as_str(), documents.as_slice()));
                }
                AuditFinding::HighSimilarity { .. } => {}
            }
        }

        if internal.is_empty() && cross.is_empty() {
            println!("{}", "No repeated phrases found".green());
            return;
        }

        for (document, sentences) in &internal {
            println!("{} {}", "INTERNAL DUP".yellow().bold(), document.cyan());
            for (sentence, count) in sentences.iter().take(show) {
                println!("  {} x{} {}", "~".dimmed(), count, sentence);
            }
            if sentences.len() > show {
                println!("  {}", format!("... and {} more", sentences.len() - show).dimmed());
            }
        }

        if !cross.is_empty() {
            println!(
                "{} {} sentences shared between files",
                "CROSS-FILE DUP".yellow().bold(),
                cross.len()
            );
            for (sentence, documents) in cross.iter().take(show) {
                println!("  {} {}", "~".dimmed(), sentence);
                for document in documents.iter() {
                    println!("      {}", document.dimmed());
                }
            }
            if cross.len() > show {
                println!("  {}", format!("... and {} more", cross.len() - show).dimmed());
            }
        }
    }

    fn print_similarity(&self) {
        println!("{}", "Similarity".cyan().bold());

        let mut any = false;
        for finding in &self.findings {
            if let AuditFinding::HighSimilarity { document_a, document_b, score } = finding {
                any = true;
                println!(
                    "{} ({:.3}) {} <-> {}",
                    "HIGH SIMILARITY".yellow().bold(),
                    score,
                    document_a.cyan(),
                    document_b
                );
            }
        }

        if !any {
            println!("{}", "No high-similarity pairs found".green());
        }
    }
}
