use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const EMAIL_CONTENT_MAX_CHARS: usize = 1000;
pub const USER_AGENT_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Spam,
    Ham,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Spam => "spam",
            Label::Ham => "ham",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "spam" => Ok(Label::Spam),
            "ham" => Ok(Label::Ham),
            other => Err(format!("unknown label {other:?}")),
        }
    }
}

/// A row about to be inserted. Construct with [`NewAnalysis::new`] so the
/// text columns are cut to their maximum widths.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub email_content: String,
    pub prediction: Label,
    /// Fraction in `[0, 1]`.
    pub confidence: f64,
    pub latency_ms: f64,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: String,
}

impl NewAnalysis {
    pub fn new(
        email_text: &str,
        prediction: Label,
        confidence: f64,
        latency_ms: f64,
        ip_address: Option<String>,
        user_agent: &str,
    ) -> Self {
        Self {
            email_content: crate::text::truncate_chars(email_text, EMAIL_CONTENT_MAX_CHARS)
                .to_string(),
            prediction,
            confidence: confidence.clamp(0.0, 1.0),
            latency_ms,
            created_at: Utc::now(),
            ip_address,
            user_agent: crate::text::truncate_chars(user_agent, USER_AGENT_MAX_CHARS).to_string(),
        }
    }
}

/// A stored analysis. Rows are never updated or deleted.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub email_content: String,
    pub prediction: Label,
    pub confidence: f64,
    pub latency_ms: f64,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: String,
}

impl AnalysisRecord {
    pub fn confidence_percentage(&self) -> f64 {
        round2(self.confidence * 100.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WindowCounts {
    pub total: i64,
    pub spam: i64,
    pub ham: i64,
}

/// Aggregates over the whole table plus a trailing 24 hour window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalysisStatistics {
    pub total: i64,
    pub spam: i64,
    pub ham: i64,
    /// Mean confidence as a fraction, `None` on an empty table.
    pub avg_confidence: Option<f64>,
    pub avg_latency_ms: Option<f64>,
    pub last_24h: WindowCounts,
}

impl AnalysisStatistics {
    pub fn spam_percentage(&self) -> f64 {
        percentage(self.spam, self.total)
    }

    pub fn ham_percentage(&self) -> f64 {
        percentage(self.ham, self.total)
    }
}

fn percentage(part: i64, total: i64) -> f64 {
    if total > 0 {
        round2(part as f64 / total as f64 * 100.0)
    } else {
        0.0
    }
}

/// Two decimals, halves to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
