//! Offline model building: corpus → stratified split → fit → evaluate → save.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ml::{FitOptions, ModelError, SpamModel};

pub mod corpus;
pub mod report;
pub mod split;

pub use corpus::{load_trec, Corpus};
pub use report::ClassificationReport;
pub use split::{stratified_split, Split};

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("corpus index not found at {0}")]
    MissingIndex(PathBuf),
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no emails could be loaded from the corpus")]
    EmptyCorpus,
    #[error("need at least two emails of each class (spam: {spam}, ham: {ham})")]
    SingleClass { spam: usize, ham: usize },
    #[error("test fraction must be strictly between 0 and 1, got {0}")]
    InvalidTestFraction(f64),
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub dataset: PathBuf,
    pub limit: usize,
    pub test_fraction: f64,
    pub seed: u64,
    pub fit: FitOptions,
}

#[derive(Debug)]
pub struct TrainingOutcome {
    pub model: SpamModel,
    pub report: ClassificationReport,
}

/// Loads the corpus and trains/evaluates a model without touching disk
/// beyond reading the corpus.
pub fn train(options: &TrainingOptions) -> Result<TrainingOutcome, TrainingError> {
    let corpus = load_trec(&options.dataset, options.limit)?;
    train_on_corpus(&corpus, options)
}

pub fn train_on_corpus(
    corpus: &Corpus,
    options: &TrainingOptions,
) -> Result<TrainingOutcome, TrainingError> {
    if corpus.is_empty() {
        return Err(TrainingError::EmptyCorpus);
    }

    let split = stratified_split(&corpus.labels, options.test_fraction, options.seed)?;
    tracing::info!(
        target: "train",
        train = split.train.len(),
        test = split.test.len(),
        "split corpus"
    );

    let (train_docs, train_labels) = select(corpus, &split.train);
    let (test_docs, test_labels) = select(corpus, &split.test);

    tracing::info!(target: "train", max_iter = options.fit.max_iter, c = options.fit.c, "fitting model");
    let (mut model, summary) = SpamModel::fit(&train_docs, &train_labels, options.fit)?;
    tracing::info!(
        target: "train",
        vocabulary = model.vectorizer().len(),
        iterations = summary.iterations,
        converged = summary.converged,
        loss = summary.final_loss,
        "fit finished"
    );
    if !summary.converged {
        tracing::warn!(target: "train", "optimizer stopped at max_iter before converging");
    }

    let predicted: Vec<u8> = test_docs.iter().map(|doc| model.predict(doc)).collect();
    let report = ClassificationReport::from_predictions(&test_labels, &predicted);

    let metadata = model.metadata_mut();
    metadata.test_size = test_docs.len();
    metadata.accuracy = Some(report.accuracy);

    Ok(TrainingOutcome { model, report })
}

pub fn save_model(model: &SpamModel, output: &Path) -> Result<(), TrainingError> {
    model.save(output)?;
    tracing::info!(target: "train", path = %output.display(), "model saved");
    Ok(())
}

fn select(corpus: &Corpus, indices: &[usize]) -> (Vec<String>, Vec<u8>) {
    indices
        .iter()
        .map(|&i| (corpus.documents[i].clone(), corpus.labels[i]))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> TrainingOptions {
        TrainingOptions {
            dataset: PathBuf::from("unused"),
            limit: 100,
            test_fraction: 0.25,
            seed: 42,
            fit: FitOptions::default(),
        }
    }

    fn synthetic_corpus() -> Corpus {
        let spam = [
            "free prize claim cash",
            "cheap pill offer free",
            "win money free prize",
            "claim free offer cash",
            "cash prize win free",
            "cheap offer free money",
            "free cash win claim",
            "prize money offer cheap",
        ];
        let ham = [
            "project meet review tomorrow",
            "lunch team tomorrow note",
            "review project deadlin note",
            "meet team project lunch",
            "note meet review deadlin",
            "tomorrow project team review",
            "deadlin lunch meet note",
            "team review project tomorrow",
        ];
        let mut corpus = Corpus::default();
        for doc in spam {
            corpus.documents.push(doc.to_string());
            corpus.labels.push(1);
        }
        for doc in ham {
            corpus.documents.push(doc.to_string());
            corpus.labels.push(0);
        }
        corpus
    }

    #[test]
    fn trains_and_evaluates_separable_corpus() {
        let outcome = train_on_corpus(&synthetic_corpus(), &options()).unwrap();
        assert_eq!(outcome.report.accuracy, 1.0);
        assert_eq!(outcome.model.metadata().train_size, 12);
        assert_eq!(outcome.model.metadata().test_size, 4);
        assert_eq!(outcome.model.metadata().accuracy, Some(1.0));
    }

    #[test]
    fn empty_corpus_is_an_error() {
        let err = train_on_corpus(&Corpus::default(), &options()).unwrap_err();
        assert!(matches!(err, TrainingError::EmptyCorpus));
    }

    #[test]
    fn saved_model_is_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let outcome = train_on_corpus(&synthetic_corpus(), &options()).unwrap();
        save_model(&outcome.model, &path).unwrap();
        let loaded = SpamModel::load(&path).unwrap();
        assert_eq!(loaded.predict("free cash prize"), 1);
        assert_eq!(loaded.predict("project review tomorrow"), 0);
    }
}
