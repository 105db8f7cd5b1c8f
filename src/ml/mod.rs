pub mod detector;
pub mod error;
pub mod logistic;
pub mod model;
pub mod vectorizer;

pub use detector::{PredictionOutcome, SpamDetector, Verdict};
pub use error::ModelError;
pub use logistic::{FitOptions, FitSummary, LogisticRegression};
pub use model::{ModelMetadata, SpamModel};
pub use vectorizer::{CountVectorizer, SparseRow};
