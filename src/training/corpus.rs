use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::text::{clean_email, decode_email_bytes};

use super::TrainingError;

const PROGRESS_EVERY: usize = 1000;

/// Cleaned documents with their labels (1 = spam, 0 = ham).
#[derive(Debug, Default)]
pub struct Corpus {
    pub documents: Vec<String>,
    pub labels: Vec<u8>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn spam_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    pub fn ham_count(&self) -> usize {
        self.len() - self.spam_count()
    }
}

/// Reads a TREC-style corpus: `<dataset>/full/index` holds `label path`
/// lines with paths relative to a sibling directory (`../data/inmail.N`).
/// At most `limit` index lines are read.
pub fn load_trec(dataset: &Path, limit: usize) -> Result<Corpus, TrainingError> {
    let index_path = dataset.join("full").join("index");
    let index_bytes = match fs::read(&index_path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(TrainingError::MissingIndex(index_path))
        }
        Err(source) => {
            return Err(TrainingError::Io {
                path: index_path,
                source,
            })
        }
    };
    let index = decode_email_bytes(&index_bytes);
    tracing::info!(target: "train", index = %index_path.display(), limit, "loading corpus");

    let lines: Vec<&str> = index.lines().take(limit).collect();
    let mut corpus = Corpus::default();

    for (i, line) in lines.iter().enumerate() {
        if let Some((label, rel_path)) = parse_index_line(line) {
            let email_path = resolve_email_path(dataset, rel_path);
            match fs::read(&email_path) {
                Ok(bytes) => {
                    let cleaned = clean_email(&decode_email_bytes(&bytes));
                    if !cleaned.trim().is_empty() {
                        corpus.documents.push(cleaned);
                        corpus.labels.push(u8::from(label == "spam"));
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::warn!(
                        target: "train",
                        path = %email_path.display(),
                        error = %err,
                        "skipping unreadable email"
                    );
                }
            }
        }

        if (i + 1) % PROGRESS_EVERY == 0 {
            tracing::info!(target: "train", processed = i + 1, total = lines.len(), "loading emails");
        }
    }

    tracing::info!(
        target: "train",
        loaded = corpus.len(),
        spam = corpus.spam_count(),
        ham = corpus.ham_count(),
        "corpus loaded"
    );
    Ok(corpus)
}

/// `label path...`; paths may contain spaces.
fn parse_index_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let (label, rest) = line.split_once(char::is_whitespace)?;
    let rest = rest.trim();
    (!rest.is_empty()).then_some((label, rest))
}

/// Drops `../` segments and resolves the remainder under `dataset`.
fn resolve_email_path(dataset: &Path, rel_path: &str) -> PathBuf {
    dataset.join(rel_path.replace("../", ""))
}
