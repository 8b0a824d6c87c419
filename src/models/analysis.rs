//! Analytics request/response models for staff roles.

use serde::{Deserialize, Serialize};

/// Which staff analysis is being asked for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisKind {
    SchoolHeadOperational,
    TeacherPerformance,
    CountyStrategic,
}

impl AnalysisKind {
    /// Path segment on the intermediary service.
    pub fn endpoint(&self) -> &'static str {
        match self {
            AnalysisKind::SchoolHeadOperational => "school-head",
            AnalysisKind::TeacherPerformance => "teacher",
            AnalysisKind::CountyStrategic => "county-strategic",
        }
    }

    /// Text returned to the user when the analysis cannot be produced.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            AnalysisKind::SchoolHeadOperational => "Unable to analyze the data at this time.",
            AnalysisKind::TeacherPerformance => "Unable to generate insights at this time.",
            AnalysisKind::CountyStrategic => "Unable to generate report at this time.",
        }
    }
}

/// Request body for a staff analysis query.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisQuery {
    pub query: String,
}

/// Narrative answer to a staff analysis query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisAnswer {
    pub analysis: String,
    /// True when the text is the fixed fallback rather than a model answer
    pub degraded: bool,
}

/// Strength of the resource/score relationship in a ward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Correlation {
    Strong,
    Moderate,
    Weak,
}

impl Correlation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strong" => Some(Correlation::Strong),
            "moderate" => Some(Correlation::Moderate),
            "weak" => Some(Correlation::Weak),
            _ => None,
        }
    }
}

/// One row of the county equity heatmap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapEntry {
    pub ward: String,
    pub resource_level: super::ResourceLevel,
    pub avg_score: f64,
    pub correlation: Correlation,
}

/// Request body for the equity heatmap. Defaults to the caller's county.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EquityQuery {
    #[serde(default)]
    pub county: Option<String>,
}
