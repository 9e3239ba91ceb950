use rayon::prelude::*;

use crate::corpus::Corpus;
use crate::report::AuditFinding;
use crate::terms::{TermId, TermIndex};

/// Cosine similarity of two documents' TF-IDF vectors, in [0, 1].
///
/// The dot product walks both vectors in term-id order, so `cosine(a, b)`
/// and `cosine(b, a)` add the same products in the same order and are
/// bit-for-bit equal. A document with no terms scores 0.
pub fn cosine(index: &TermIndex, a: usize, b: usize) -> f64 {
    let denom = index.norm(a) * index.norm(b);
    if denom == 0.0 {
        return 0.0;
    }
    (dot(index.vector(a), index.vector(b)) / denom).min(1.0)
}

fn dot(a: &[(TermId, f64)], b: &[(TermId, f64)]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

/// Upper triangle of pairwise scores; the diagonal is never computed.
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    size: usize,
    /// Row-major upper triangle: (0,1), (0,2), .., (1,2), ..
    scores: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn build(index: &TermIndex) -> Self {
        let n = index.num_documents();
        let scores: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| ((i + 1)..n).map(move |j| cosine(index, i, j)))
            .collect();
        SimilarityMatrix { size: n, scores }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn pair_count(&self) -> usize {
        self.scores.len()
    }

    /// Score for an unordered pair; `None` for `i == j` or out of range.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i == j || i >= self.size || j >= self.size {
            return None;
        }
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        // rows before i hold (n-1) + (n-2) + .. + (n-i) entries
        let row_start = i * (2 * self.size - i - 1) / 2;
        self.scores.get(row_start + (j - i - 1)).copied()
    }

    /// Every pair scoring at or above `threshold`, in (i, j) order.
    pub fn above(&self, threshold: f64) -> Vec<(usize, usize, f64)> {
        let mut pairs = Vec::new();
        let mut k = 0;
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                let score = self.scores[k];
                if score >= threshold {
                    pairs.push((i, j, score));
                }
                k += 1;
            }
        }
        pairs
    }
}

/// Flag every document pair whose similarity meets `threshold`.
pub fn find_similar(
    corpus: &Corpus,
    matrix: &SimilarityMatrix,
    threshold: f64,
) -> Vec<AuditFinding> {
    matrix
        .above(threshold)
        .into_iter()
        .map(|(i, j, score)| AuditFinding::HighSimilarity {
            document_a: corpus.documents[i].path.clone(),
            document_b: corpus.documents[j].path.clone(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;

    fn corpus(texts: &[String]) -> Corpus {
        Corpus::from_documents(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| Document::new(format!("doc{}.html", i), t.clone()))
                .collect(),
        )
    }

    /// Roughly 500 words of shared boilerplate naming one department.
    fn boilerplate(department: &str) -> String {
        let mut words = Vec::new();
        for round in 0..5 {
            for w in 0..95 {
                words.push(format!("mot{}", w));
            }
            if round % 2 == 0 {
                words.push(department.to_string());
            }
        }
        words.join(" ")
    }

    #[test]
    fn test_near_identical_pages_score_high() {
        let c = corpus(&[boilerplate("Ain"), boilerplate("Aisne")]);
        let idx = TermIndex::build(&c);
        let matrix = SimilarityMatrix::build(&idx);
        let score = matrix.get(0, 1).unwrap();
        assert!(score >= 0.90, "score was {}", score);

        let findings = find_similar(&c, &matrix, 0.90);
        assert_eq!(findings.len(), 1);
        match &findings[0] {
            AuditFinding::HighSimilarity { document_a, document_b, .. } => {
                assert_eq!(document_a, "doc0.html");
                assert_eq!(document_b, "doc1.html");
            }
            other => panic!("unexpected finding {:?}", other),
        }
    }

    #[test]
    fn test_disjoint_vocabulary_scores_zero() {
        let c = corpus(&[
            "alpha beta gamma delta".to_string(),
            "un deux trois quatre".to_string(),
        ]);
        let idx = TermIndex::build(&c);
        let matrix = SimilarityMatrix::build(&idx);
        assert!(matrix.get(0, 1).unwrap().abs() < 1e-12);
        assert!(find_similar(&c, &matrix, 0.90).is_empty());
    }

    #[test]
    fn test_identical_documents_score_one() {
        let text = "le même texte mot pour mot".to_string();
        let c = corpus(&[text.clone(), text, "autre chose".to_string()]);
        let idx = TermIndex::build(&c);
        assert!((cosine(&idx, 0, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_symmetry() {
        let c = corpus(&[
            "a a b c d e".to_string(),
            "a b b b f g h".to_string(),
            "c d d e e e i".to_string(),
            "".to_string(),
        ]);
        let idx = TermIndex::build(&c);
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(cosine(&idx, i, j), cosine(&idx, j, i));
            }
        }
        let matrix = SimilarityMatrix::build(&idx);
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
    }

    #[test]
    fn test_self_pairs_excluded() {
        let c = corpus(&["x y".to_string(), "x y".to_string(), "x z".to_string()]);
        let idx = TermIndex::build(&c);
        let matrix = SimilarityMatrix::build(&idx);
        assert_eq!(matrix.size(), 3);
        assert_eq!(matrix.pair_count(), 3);
        for i in 0..3 {
            assert_eq!(matrix.get(i, i), None);
        }
        assert!(matrix.above(0.0).iter().all(|(i, j, _)| i < j));
        assert_eq!(matrix.get(0, 3), None);
    }

    #[test]
    fn test_matrix_indexing_matches_cosine() {
        let texts: Vec<String> = (0..6)
            .map(|i| format!("commun t{} t{} commun", i, i % 3))
            .collect();
        let c = corpus(&texts);
        let idx = TermIndex::build(&c);
        let matrix = SimilarityMatrix::build(&idx);
        for i in 0..6 {
            for j in (i + 1)..6 {
                assert_eq!(matrix.get(i, j), Some(cosine(&idx, i, j)));
            }
        }
    }

    #[test]
    fn test_threshold_monotonicity() {
        let texts: Vec<String> = (0..5)
            .map(|i| format!("base base partage {} mot{} extra{}", boilerplate("X"), i, i % 2))
            .collect();
        let c = corpus(&texts);
        let idx = TermIndex::build(&c);
        let matrix = SimilarityMatrix::build(&idx);

        let mut previous = usize::MAX;
        for step in 0..=20 {
            let threshold = step as f64 * 0.05;
            let pairs = matrix.above(threshold);
            assert!(pairs.len() <= previous);
            if let Some(higher) = matrix.above(threshold + 0.05).first() {
                assert!(pairs.contains(higher));
            }
            previous = pairs.len();
        }
    }

    #[test]
    fn test_empty_and_single_document() {
        let idx = TermIndex::build(&Corpus::default());
        let matrix = SimilarityMatrix::build(&idx);
        assert_eq!(matrix.pair_count(), 0);
        assert!(matrix.above(0.0).is_empty());

        let c = corpus(&["seul".to_string()]);
        let matrix = SimilarityMatrix::build(&TermIndex::build(&c));
        assert_eq!(matrix.pair_count(), 0);
    }
}
