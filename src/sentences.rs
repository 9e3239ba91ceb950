use ahash::AHashMap;
use regex::Regex;
use std::sync::OnceLock;

use crate::corpus::Corpus;
use crate::report::AuditFinding;

/// Settings for the repeated-sentence pass.
#[derive(Debug, Clone)]
pub struct PhraseOptions {
    /// Sentences with fewer whitespace-separated words are ignored
    pub min_words: usize,
    /// Compare sentences after `normalize_sentence` instead of verbatim
    pub normalize: bool,
}

impl Default for PhraseOptions {
    fn default() -> Self {
        PhraseOptions {
            min_words: 6,
            normalize: false,
        }
    }
}

fn boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("boundary pattern is valid"))
}

/// Split on `.`, `!` or `?` followed by whitespace. The punctuation stays
/// with the sentence it ends; empty pieces are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in boundary_re().find_iter(text) {
        // punctuation is a single ASCII byte
        let piece = text[start..m.start() + 1].trim();
        if !piece.is_empty() {
            sentences.push(piece);
        }
        start = m.end();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

pub fn word_count(sentence: &str) -> usize {
    sentence.split_whitespace().count()
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "1 250 000", "12.500", "5,80": a run of digits plus grouped thousands
    RE.get_or_init(|| {
        Regex::new(r"[0-9]+(?:[\s.,\u{202F}][0-9]{3})*").expect("number pattern is valid")
    })
}

/// Lowercase, fold Latin accents, mask numbers as `#`, turn punctuation into
/// spaces and collapse whitespace. Used as the equality key when
/// normalization is enabled, so templated pages that differ only by a rate
/// or a price still collide.
pub fn normalize_sentence(sentence: &str) -> String {
    let masked = number_re().replace_all(sentence, "#");
    let mut out = String::with_capacity(masked.len());
    for c in masked.chars().flat_map(char::to_lowercase) {
        let c = fold_accent(c);
        if c.is_alphanumeric() || c == '#' {
            out.push(c);
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => c,
    }
}

/// Significant sentences of one document, paired with their comparison key.
fn significant<'a>(text: &'a str, options: &PhraseOptions) -> Vec<(String, &'a str)> {
    split_sentences(text)
        .into_iter()
        .filter(|s| word_count(s) >= options.min_words)
        .map(|s| {
            let key = if options.normalize {
                normalize_sentence(s)
            } else {
                s.to_string()
            };
            (key, s)
        })
        .collect()
}

/// Report every significant sentence seen more than once, inside one
/// document and across documents.
///
/// Internal duplicates come first, grouped by document in corpus order and
/// by first appearance inside each document. Cross-file duplicates follow,
/// ordered by where the sentence was first seen. A sentence repeated inside
/// a single document never counts as a cross-file duplicate.
pub fn find_repeats(corpus: &Corpus, options: &PhraseOptions) -> Vec<AuditFinding> {
    let mut internal = Vec::new();

    // key -> slot in `cross`, slots kept in first-seen order
    let mut cross_slots: AHashMap<String, usize> = AHashMap::new();
    let mut cross: Vec<(String, Vec<String>)> = Vec::new();

    for doc in &corpus.documents {
        let mut local_slots: AHashMap<String, usize> = AHashMap::new();
        let mut local: Vec<(String, usize)> = Vec::new();

        for (key, original) in significant(&doc.plain_text, options) {
            // normalized keys report the first spelling seen in the corpus
            let shown = match cross_slots.get(&key) {
                Some(&slot) => {
                    let documents = &mut cross[slot].1;
                    if documents.last() != Some(&doc.path) {
                        documents.push(doc.path.clone());
                    }
                    cross[slot].0.clone()
                }
                None => {
                    cross_slots.insert(key.clone(), cross.len());
                    cross.push((original.to_string(), vec![doc.path.clone()]));
                    original.to_string()
                }
            };

            match local_slots.get(&key) {
                Some(&i) => local[i].1 += 1,
                None => {
                    local_slots.insert(key, local.len());
                    local.push((shown, 1));
                }
            }
        }

        for (sentence, count) in local {
            if count > 1 {
                internal.push(AuditFinding::InternalDuplicate {
                    document: doc.path.clone(),
                    sentence,
                    count,
                });
            }
        }
    }

    let mut findings = internal;
    findings.extend(
        cross
            .into_iter()
            .filter(|(_, documents)| documents.len() > 1)
            .map(|(sentence, documents)| AuditFinding::CrossFileDuplicate { sentence, documents }),
    );
    findings
}
