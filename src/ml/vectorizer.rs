use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// One document as sorted `(column, count)` pairs.
pub type SparseRow = Vec<(usize, f64)>;

/// Bag-of-words token counter over whitespace-separated, pre-cleaned text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountVectorizer {
    vocabulary: HashMap<String, usize>,
}

impl CountVectorizer {
    /// Builds the vocabulary from every token of length >= 2, indexed in
    /// lexicographic order.
    pub fn fit<S: AsRef<str>>(docs: &[S]) -> Self {
        let terms: BTreeSet<&str> = docs
            .iter()
            .flat_map(|doc| doc.as_ref().split_whitespace())
            .filter(|token| is_term(token))
            .collect();

        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(idx, term)| (term.to_string(), idx))
            .collect();
        Self { vocabulary }
    }

    pub fn from_vocabulary(vocabulary: HashMap<String, usize>) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &HashMap<String, usize> {
        &self.vocabulary
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    /// Counts known terms in `doc`; unknown terms are ignored.
    pub fn transform(&self, doc: &str) -> SparseRow {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in doc.split_whitespace().filter(|t| is_term(t)) {
            if let Some(&idx) = self.vocabulary.get(token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        let mut row: SparseRow = counts.into_iter().collect();
        row.sort_unstable_by_key(|(idx, _)| *idx);
        row
    }

    pub fn transform_all<S: AsRef<str>>(&self, docs: &[S]) -> Vec<SparseRow> {
        docs.iter().map(|doc| self.transform(doc.as_ref())).collect()
    }

    /// Every index must fall inside `0..len` with no gaps.
    pub(crate) fn is_consistent(&self) -> bool {
        let mut seen = vec![false; self.vocabulary.len()];
        for &idx in self.vocabulary.values() {
            match seen.get_mut(idx) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        true
    }
}

fn is_term(token: &str) -> bool {
    token.chars().count() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_is_sorted_and_skips_short_tokens() {
        let vec = CountVectorizer::fit(&["zebra apple x", "mango apple"]);
        assert_eq!(vec.len(), 3);
        assert_eq!(vec.vocabulary()["apple"], 0);
        assert_eq!(vec.vocabulary()["mango"], 1);
        assert_eq!(vec.vocabulary()["zebra"], 2);
        assert!(!vec.vocabulary().contains_key("x"));
    }

    #[test]
    fn transform_counts_known_terms() {
        let vec = CountVectorizer::fit(&["free money free", "meeting notes"]);
        let row = vec.transform("free free free unknown money");
        let free = vec.vocabulary()["free"];
        let money = vec.vocabulary()["money"];
        assert_eq!(row.len(), 2);
        assert!(row.contains(&(free, 3.0)));
        assert!(row.contains(&(money, 1.0)));
        assert!(row.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn consistency_check_catches_gaps() {
        let good = CountVectorizer::fit(&["aa bb cc"]);
        assert!(good.is_consistent());

        let bad = CountVectorizer::from_vocabulary(HashMap::from([
            ("aa".to_string(), 0),
            ("bb".to_string(), 2),
        ]));
        assert!(!bad.is_consistent());
    }
}
