use serde::{Deserialize, Serialize};

use super::{error::ModelError, vectorizer::SparseRow};

#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    /// Inverse regularization strength; the intercept is not penalized.
    pub c: f64,
    pub max_iter: usize,
    /// Stop once every gradient component is below this in absolute value.
    pub tol: f64,
    pub learning_rate: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 2000,
            tol: 1e-4,
            learning_rate: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FitSummary {
    pub iterations: usize,
    pub converged: bool,
    pub final_loss: f64,
}

/// Binary L2-regularized logistic regression over sparse count rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticRegression {
    pub fn from_parts(weights: Vec<f64>, intercept: f64) -> Self {
        Self { weights, intercept }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Minimizes `C * sum(logloss) + ||w||^2 / 2` with Adam on the full batch.
    /// `labels` holds 1 for spam and 0 for ham.
    pub fn fit(
        rows: &[SparseRow],
        labels: &[u8],
        n_features: usize,
        options: FitOptions,
    ) -> Result<(Self, FitSummary), ModelError> {
        if rows.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if rows.len() != labels.len() {
            return Err(ModelError::LabelMismatch {
                rows: rows.len(),
                labels: labels.len(),
            });
        }

        // Objective scaled by 1 / (C * n) so step sizes do not depend on corpus size.
        let n = rows.len() as f64;
        let l2 = 1.0 / (options.c * n);
        let (beta1, beta2, eps) = (0.9_f64, 0.999_f64, 1e-8_f64);

        let mut weights = vec![0.0; n_features];
        let mut intercept = 0.0;
        let mut m_w = vec![0.0; n_features];
        let mut v_w = vec![0.0; n_features];
        let (mut m_b, mut v_b) = (0.0_f64, 0.0_f64);
        let mut grad_w = vec![0.0; n_features];

        let mut summary = FitSummary {
            iterations: 0,
            converged: false,
            final_loss: f64::NAN,
        };

        for iter in 1..=options.max_iter {
            grad_w.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_b = 0.0;
            let mut loss = 0.0;

            for (row, &label) in rows.iter().zip(labels) {
                let z = decision(&weights, intercept, row);
                let p = sigmoid(z);
                let y = f64::from(label.min(1));
                loss += log_loss(z, y);
                let err = (p - y) / n;
                grad_b += err;
                for &(idx, value) in row {
                    if let Some(g) = grad_w.get_mut(idx) {
                        *g += err * value;
                    }
                }
            }

            let penalty: f64 = weights.iter().map(|w| w * w).sum::<f64>() * l2 / 2.0;
            summary.final_loss = loss / n + penalty;
            summary.iterations = iter;

            let mut max_grad = grad_b.abs();
            for (g, w) in grad_w.iter_mut().zip(&weights) {
                *g += l2 * w;
                max_grad = max_grad.max(g.abs());
            }
            if max_grad < options.tol {
                summary.converged = true;
                break;
            }

            let t = iter as i32;
            let correction1 = 1.0 - beta1.powi(t);
            let correction2 = 1.0 - beta2.powi(t);
            let step = |g: f64, m: &mut f64, v: &mut f64| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m / correction1;
                let v_hat = *v / correction2;
                options.learning_rate * m_hat / (v_hat.sqrt() + eps)
            };

            for ((w, g), (m, v)) in weights
                .iter_mut()
                .zip(&grad_w)
                .zip(m_w.iter_mut().zip(v_w.iter_mut()))
            {
                *w -= step(*g, m, v);
            }
            intercept -= step(grad_b, &mut m_b, &mut v_b);
        }

        Ok((Self { weights, intercept }, summary))
    }

    pub fn decision_function(&self, row: &SparseRow) -> f64 {
        decision(&self.weights, self.intercept, row)
    }

    /// `[p_ham, p_spam]`
    pub fn predict_proba(&self, row: &SparseRow) -> [f64; 2] {
        let p_spam = sigmoid(self.decision_function(row));
        [1.0 - p_spam, p_spam]
    }

    pub fn predict(&self, row: &SparseRow) -> u8 {
        u8::from(self.predict_proba(row)[1] >= 0.5)
    }
}

fn decision(weights: &[f64], intercept: f64, row: &SparseRow) -> f64 {
    intercept
        + row
            .iter()
            .filter_map(|&(idx, value)| weights.get(idx).map(|w| w * value))
            .sum::<f64>()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `-[y ln p + (1 - y) ln(1 - p)]` written in terms of the logit.
fn log_loss(z: f64, y: f64) -> f64 {
    let softplus = if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    };
    softplus - y * z
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_corpus() -> (Vec<SparseRow>, Vec<u8>) {
        // column 0: "free", column 1: "meeting", column 2: "today"
        let rows = vec![
            vec![(0, 2.0), (2, 1.0)],
            vec![(0, 1.0)],
            vec![(0, 3.0), (2, 1.0)],
            vec![(1, 1.0), (2, 1.0)],
            vec![(1, 2.0)],
            vec![(1, 1.0)],
        ];
        (rows, vec![1, 1, 1, 0, 0, 0])
    }

    #[test]
    fn separates_toy_corpus() {
        let (rows, labels) = toy_corpus();
        let (model, summary) =
            LogisticRegression::fit(&rows, &labels, 3, FitOptions::default()).unwrap();

        assert!(summary.iterations > 0);
        assert!(summary.final_loss.is_finite());
        for (row, &label) in rows.iter().zip(&labels) {
            assert_eq!(model.predict(row), label);
        }
        assert!(model.weights()[0] > 0.0);
        assert!(model.weights()[1] < 0.0);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let model = LogisticRegression::from_parts(vec![1.5, -2.0], 0.25);
        let [ham, spam] = model.predict_proba(&vec![(0, 1.0), (1, 1.0)]);
        assert!((ham + spam - 1.0).abs() < 1e-12);
        assert!(spam < 0.5);
    }

    #[test]
    fn out_of_range_columns_are_ignored() {
        let model = LogisticRegression::from_parts(vec![1.0], 0.0);
        assert_eq!(model.decision_function(&vec![(0, 2.0), (7, 100.0)]), 2.0);
    }

    #[test]
    fn extreme_logits_stay_finite() {
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert!(log_loss(1000.0, 0.0).is_finite());
        assert!(log_loss(-1000.0, 1.0).is_finite());
    }

    #[test]
    fn rejects_mismatched_labels() {
        let (rows, _) = toy_corpus();
        let err = LogisticRegression::fit(&rows, &[1, 0], 3, FitOptions::default()).unwrap_err();
        assert!(matches!(err, ModelError::LabelMismatch { rows: 6, labels: 2 }));
    }

    #[test]
    fn rejects_empty_input() {
        let err = LogisticRegression::fit(&[], &[], 3, FitOptions::default()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyTrainingSet));
    }
}
