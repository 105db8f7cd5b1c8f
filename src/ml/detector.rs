use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use serde::Serialize;

use crate::{
    domain::{round2, Label},
    text::{clean_email, preview},
};

use super::model::SpamModel;

const CLEANED_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Spam,
    Ham,
    Error,
}

impl Verdict {
    pub fn label(self) -> Option<Label> {
        match self {
            Verdict::Spam => Some(Label::Spam),
            Verdict::Ham => Some(Label::Ham),
            Verdict::Error => None,
        }
    }
}

/// Result of one prediction. `confidence` is a percentage and `latency` is
/// in milliseconds, both rounded to two decimals.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutcome {
    pub prediction: Verdict,
    pub confidence: f64,
    pub latency: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionOutcome {
    fn error(message: String) -> Self {
        Self {
            prediction: Verdict::Error,
            confidence: 0.0,
            latency: 0.0,
            cleaned_text: None,
            error: Some(message),
        }
    }
}

/// The model shared by every request. Built once at startup and read-only
/// afterwards; a missing model turns every prediction into an error outcome.
#[derive(Debug)]
pub struct SpamDetector {
    model: Option<SpamModel>,
    model_path: PathBuf,
}

impl SpamDetector {
    pub fn load(model_path: &Path) -> Self {
        let model = if !model_path.exists() {
            tracing::warn!(
                target: "model",
                path = %model_path.display(),
                "model file not found; predictions will return errors"
            );
            None
        } else {
            match SpamModel::load(model_path) {
                Ok(model) => {
                    tracing::info!(
                        target: "model",
                        path = %model_path.display(),
                        vocabulary = model.vectorizer().len(),
                        trained_at = %model.metadata().trained_at,
                        "model loaded"
                    );
                    Some(model)
                }
                Err(err) => {
                    tracing::error!(
                        target: "model",
                        path = %model_path.display(),
                        error = %err,
                        "failed to load model"
                    );
                    None
                }
            }
        };

        Self {
            model,
            model_path: model_path.to_path_buf(),
        }
    }

    pub fn with_model(model: SpamModel, model_path: PathBuf) -> Self {
        Self {
            model: Some(model),
            model_path,
        }
    }

    pub fn unloaded(model_path: PathBuf) -> Self {
        Self {
            model: None,
            model_path,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn predict(&self, email_text: &str) -> PredictionOutcome {
        let Some(model) = &self.model else {
            return PredictionOutcome::error(format!(
                "Model not loaded. Make sure {} exists.",
                self.model_path.display()
            ));
        };

        let started = Instant::now();
        let cleaned = clean_email(email_text);
        let [p_ham, p_spam] = model.predict_proba(&cleaned);
        if !p_spam.is_finite() || !p_ham.is_finite() {
            return PredictionOutcome::error("model produced a non-finite probability".to_string());
        }
        let latency = started.elapsed().as_secs_f64() * 1000.0;

        let prediction = if p_spam >= 0.5 {
            Verdict::Spam
        } else {
            Verdict::Ham
        };

        PredictionOutcome {
            prediction,
            confidence: round2(p_ham.max(p_spam) * 100.0),
            latency: round2(latency),
            cleaned_text: Some(preview(&cleaned, CLEANED_PREVIEW_CHARS)),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::tests::tiny_model;

    #[test]
    fn unloaded_detector_reports_error() {
        let detector = SpamDetector::unloaded(PathBuf::from("missing.json"));
        let outcome = detector.predict("Please review the attached report");

        assert_eq!(outcome.prediction, Verdict::Error);
        assert_eq!(outcome.confidence, 0.0);
        assert_eq!(outcome.latency, 0.0);
        assert!(outcome.error.unwrap().contains("missing.json"));
    }

    #[test]
    fn load_degrades_when_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let detector = SpamDetector::load(&dir.path().join("absent.json"));
        assert!(!detector.is_loaded());
    }

    #[test]
    fn loaded_detector_labels_text() {
        let detector = SpamDetector::with_model(tiny_model(), PathBuf::from("m.json"));
        let outcome = detector.predict("Subject: Free prize\n\nClaim your free cash prize!");

        assert_eq!(outcome.prediction, Verdict::Spam);
        assert!((50.0..=100.0).contains(&outcome.confidence));
        assert!(outcome.latency >= 0.0);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.cleaned_text.as_deref(), Some("free prize claim free cash prize"));
    }

    #[test]
    fn long_cleaned_text_is_previewed() {
        let detector = SpamDetector::with_model(tiny_model(), PathBuf::from("m.json"));
        let text = "project review ".repeat(50);
        let cleaned = detector.predict(&text).cleaned_text.unwrap();
        assert!(cleaned.ends_with("..."));
        assert_eq!(cleaned.chars().count(), CLEANED_PREVIEW_CHARS + 3);
    }

    #[test]
    fn verdict_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Verdict::Ham).unwrap(), "\"ham\"");
        assert_eq!(Verdict::Error.label(), None);
        assert_eq!(Verdict::Spam.label(), Some(Label::Spam));
    }
}
