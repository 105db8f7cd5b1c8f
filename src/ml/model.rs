use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    error::ModelError,
    logistic::{FitOptions, FitSummary, LogisticRegression},
    vectorizer::CountVectorizer,
};

pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Held-out numbers recorded next to the weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub trained_at: DateTime<Utc>,
    pub train_size: usize,
    pub test_size: usize,
    pub accuracy: Option<f64>,
    pub fit: Option<FitSummary>,
}

/// Vectorizer and classifier fitted together; the unit persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpamModel {
    format_version: u32,
    vectorizer: CountVectorizer,
    classifier: LogisticRegression,
    metadata: ModelMetadata,
}

impl SpamModel {
    pub fn new(
        vectorizer: CountVectorizer,
        classifier: LogisticRegression,
        metadata: ModelMetadata,
    ) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            vectorizer,
            classifier,
            metadata,
        }
    }

    /// Fits the vocabulary on `docs` (already cleaned) and trains the
    /// classifier on their counts.
    pub fn fit(
        docs: &[String],
        labels: &[u8],
        options: FitOptions,
    ) -> Result<(Self, FitSummary), ModelError> {
        let vectorizer = CountVectorizer::fit(docs);
        let rows = vectorizer.transform_all(docs);
        let (classifier, summary) =
            LogisticRegression::fit(&rows, labels, vectorizer.len(), options)?;

        let metadata = ModelMetadata {
            trained_at: Utc::now(),
            train_size: docs.len(),
            test_size: 0,
            accuracy: None,
            fit: Some(summary),
        };
        Ok((Self::new(vectorizer, classifier, metadata), summary))
    }

    pub fn vectorizer(&self) -> &CountVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &LogisticRegression {
        &self.classifier
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ModelMetadata {
        &mut self.metadata
    }

    /// `[p_ham, p_spam]` for one cleaned document.
    pub fn predict_proba(&self, cleaned: &str) -> [f64; 2] {
        let row = self.vectorizer.transform(cleaned);
        self.classifier.predict_proba(&row)
    }

    /// 1 for spam, 0 for ham.
    pub fn predict(&self, cleaned: &str) -> u8 {
        let row = self.vectorizer.transform(cleaned);
        self.classifier.predict(&row)
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let io_err = |source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(ModelError::Encode)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let file = File::open(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| ModelError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: self.format_version,
                expected: MODEL_FORMAT_VERSION,
            });
        }
        if self.classifier.weights().len() != self.vectorizer.len() {
            return Err(ModelError::Incompatible(format!(
                "{} weights for a vocabulary of {} terms",
                self.classifier.weights().len(),
                self.vectorizer.len()
            )));
        }
        if !self.vectorizer.is_consistent() {
            return Err(ModelError::Incompatible(
                "vocabulary indices are not a dense 0..n range".to_string(),
            ));
        }
        Ok(())
    }
}
