use serde::{Deserialize, Serialize};

use crate::error::ErrorPayload;
use crate::types::{
    CalibrationResult, ComparisonResult, LayoutStatistics, NodeGroup, SemanticGroup,
    ThresholdEvaluation,
};
use crate::viewport::Viewport;

/// Schema version for output payloads.
pub const LVR_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum LvrOutput {
    Compare(CompareOutput),
    Calibrate(CalibrateOutput),
    Analyze(AnalyzeOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    #[default]
    Elements,
    Semantic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareOutput {
    pub version: String,
    pub baseline: String,
    pub current: String,
    pub compare_mode: CompareMode,
    pub viewport: Viewport,
    pub passed: bool,
    pub result: ComparisonResult,
    pub evaluation: ThresholdEvaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrateOutput {
    pub version: String,
    pub samples: Vec<String>,
    pub calibration: CalibrationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOutput {
    pub version: String,
    pub snapshot: String,
    pub viewport: Viewport,
    pub statistics: LayoutStatistics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<SemanticGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clusters: Vec<NodeGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}

impl ErrorOutput {
    pub fn from_payload(error: ErrorPayload) -> Self {
        Self {
            version: LVR_OUTPUT_VERSION.to_string(),
            message: Some(error.message.clone()),
            error,
        }
    }
}
