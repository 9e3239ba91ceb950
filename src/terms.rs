//! Term frequency / document frequency tables over a loaded corpus.
//!
//! Terms are whitespace-delimited tokens taken verbatim: no stemming, no
//! stop words, no case folding. Each term gets a dense id in first-seen
//! order, so every table here is deterministic for a given corpus.

use ahash::AHashMap;

use crate::corpus::Corpus;

pub type TermId = u32;

/// TF-IDF statistics, built once per run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TermIndex {
    vocabulary: Vec<String>,
    ids: AHashMap<String, TermId>,
    /// Per document: (term, count) sorted by term id
    term_frequencies: Vec<Vec<(TermId, usize)>>,
    /// Indexed by term id
    doc_frequencies: Vec<usize>,
    /// Per document: (term, tf * idf) sorted by term id
    vectors: Vec<Vec<(TermId, f64)>>,
    norms: Vec<f64>,
}

pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

impl TermIndex {
    pub fn build(corpus: &Corpus) -> Self {
        let mut index = TermIndex::default();

        for doc in &corpus.documents {
            let mut counts: AHashMap<TermId, usize> = AHashMap::new();
            for token in tokenize(&doc.plain_text) {
                let id = index.intern(token);
                *counts.entry(id).or_insert(0) += 1;
            }

            let mut tf: Vec<(TermId, usize)> = counts.into_iter().collect();
            tf.sort_unstable_by_key(|(id, _)| *id);

            for (id, _) in &tf {
                index.doc_frequencies[*id as usize] += 1;
            }
            index.term_frequencies.push(tf);
        }

        // Weights need the final DF table, so they come in a second pass.
        let total_docs = index.num_documents();
        let idf: Vec<f64> = index
            .doc_frequencies
            .iter()
            .map(|&df| smoothed_idf(total_docs, df))
            .collect();

        for tf in &index.term_frequencies {
            let vector: Vec<(TermId, f64)> = tf
                .iter()
                .map(|&(id, count)| (id, count as f64 * idf[id as usize]))
                .collect();
            let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            index.vectors.push(vector);
            index.norms.push(norm);
        }

        index
    }

    fn intern(&mut self, term: &str) -> TermId {
        if let Some(&id) = self.ids.get(term) {
            return id;
        }
        let id = self.vocabulary.len() as TermId;
        self.vocabulary.push(term.to_string());
        self.ids.insert(term.to_string(), id);
        self.doc_frequencies.push(0);
        id
    }

    pub fn num_documents(&self) -> usize {
        self.term_frequencies.len()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn term(&self, id: TermId) -> Option<&str> {
        self.vocabulary.get(id as usize).map(String::as_str)
    }

    /// Occurrences of `term` in document `doc`; 0 when absent.
    pub fn tf(&self, doc: usize, term: &str) -> usize {
        let (Some(&id), Some(tf)) = (self.ids.get(term), self.term_frequencies.get(doc)) else {
            return 0;
        };
        tf.binary_search_by_key(&id, |(t, _)| *t)
            .map(|i| tf[i].1)
            .unwrap_or(0)
    }

    /// Number of documents containing `term` at least once.
    pub fn df(&self, term: &str) -> usize {
        self.ids
            .get(term)
            .map(|&id| self.doc_frequencies[id as usize])
            .unwrap_or(0)
    }

    /// Inverse document frequency. Unknown terms weigh 0.
    pub fn idf(&self, term: &str) -> f64 {
        match self.df(term) {
            0 => 0.0,
            df => smoothed_idf(self.num_documents(), df),
        }
    }

    pub fn tfidf(&self, doc: usize, term: &str) -> f64 {
        self.tf(doc, term) as f64 * self.idf(term)
    }

    /// Weighted sparse vector of a document, sorted by term id.
    pub fn vector(&self, doc: usize) -> &[(TermId, f64)] {
        self.vectors.get(doc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Euclidean length of `vector(doc)`.
    pub fn norm(&self, doc: usize) -> f64 {
        self.norms.get(doc).copied().unwrap_or(0.0)
    }
}

/// `ln((1 + N) / (1 + df)) + 1`.
///
/// Strictly decreasing in `df`: largest for a term found in one document,
/// bottoming out at 1.0 for a term found in every document.
///
/// The 1.0 floor is deliberate. With `ln(N / df)` a term shared by every
/// page weighs zero, and two pages made of the same boilerplate would score
/// near 0 instead of near 1. Do not replace it with the unsmoothed form.
pub fn smoothed_idf(total_docs: usize, df: usize) -> f64 {
    ((1.0 + total_docs as f64) / (1.0 + df as f64)).ln() + 1.0
}
