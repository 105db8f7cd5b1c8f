use std::fmt;

use serde::Serialize;

const CLASS_NAMES: [&str; 2] = ["HAM", "SPAM"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision/recall/F1 with macro and support-weighted averages.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub classes: [ClassMetrics; 2],
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn from_predictions(truth: &[u8], predicted: &[u8]) -> Self {
        let total = truth.len().min(predicted.len());
        let pairs = || truth.iter().zip(predicted);

        let correct = pairs().filter(|(t, p)| t == p).count();
        let accuracy = ratio(correct, total);

        let classes = [0u8, 1u8].map(|class| {
            let tp = pairs().filter(|&(&t, &p)| t == class && p == class).count();
            let predicted_pos = pairs().filter(|&(_, &p)| p == class).count();
            let support = pairs().filter(|&(&t, _)| t == class).count();
            let precision = ratio(tp, predicted_pos);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            }
        });

        let macro_avg = average(&classes, |_| 1.0);
        let weighted_avg = average(&classes, |m| m.support as f64);

        Self {
            accuracy,
            classes,
            macro_avg: ClassMetrics {
                support: total,
                ..macro_avg
            },
            weighted_avg: ClassMetrics {
                support: total,
                ..weighted_avg
            },
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn average(classes: &[ClassMetrics; 2], weight: impl Fn(&ClassMetrics) -> f64) -> ClassMetrics {
    let total: f64 = classes.iter().map(&weight).sum();
    if total == 0.0 {
        return ClassMetrics::default();
    }
    let mean = |field: fn(&ClassMetrics) -> f64| {
        classes.iter().map(|m| field(m) * weight(m)).sum::<f64>() / total
    };
    ClassMetrics {
        precision: mean(|m| m.precision),
        recall: mean(|m| m.recall),
        f1: mean(|m| m.f1),
        support: 0,
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (name, m) in CLASS_NAMES.iter().zip(&self.classes) {
            write_metrics_row(f, name, m)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.4} {:>10}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        write_metrics_row(f, "macro avg", &self.macro_avg)?;
        write_metrics_row(f, "weighted avg", &self.weighted_avg)
    }
}

fn write_metrics_row(f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{:>14} {:>10.4} {:>10.4} {:>10.4} {:>10}",
        name, m.precision, m.recall, m.f1, m.support
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_per_class_metrics() {
        // truth:     1 1 1 0 0 0 0
        // predicted: 1 1 0 0 0 1 0
        let report =
            ClassificationReport::from_predictions(&[1, 1, 1, 0, 0, 0, 0], &[1, 1, 0, 0, 0, 1, 0]);

        assert!((report.accuracy - 5.0 / 7.0).abs() < 1e-12);
        let spam = report.classes[1];
        assert!((spam.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((spam.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(spam.support, 3);
        let ham = report.classes[0];
        assert!((ham.precision - 0.75).abs() < 1e-12);
        assert!((ham.recall - 0.75).abs() < 1e-12);
        assert_eq!(ham.support, 4);
        assert_eq!(report.weighted_avg.support, 7);
    }

    #[test]
    fn absent_predictions_give_zero_not_nan() {
        let report = ClassificationReport::from_predictions(&[0, 0, 1], &[0, 0, 0]);
        assert_eq!(report.classes[1].precision, 0.0);
        assert_eq!(report.classes[1].f1, 0.0);
        assert!(report.macro_avg.f1.is_finite());
    }

    #[test]
    fn display_lists_both_classes() {
        let report = ClassificationReport::from_predictions(&[0, 1], &[0, 1]);
        let text = report.to_string();
        assert!(text.contains("HAM"));
        assert!(text.contains("SPAM"));
        assert!(text.contains("1.0000"));
    }
}
