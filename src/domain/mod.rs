pub mod analysis;

pub use analysis::{
    round2, AnalysisRecord, AnalysisStatistics, Label, NewAnalysis, WindowCounts,
    EMAIL_CONTENT_MAX_CHARS, USER_AGENT_MAX_CHARS,
};
