//! Structured reports returned by the reasoning service.
//!
//! Both reports travel as camelCase JSON. [`parse_analysis`] and
//! [`parse_feedback`] are the only way a report enters the system: they
//! tolerate a markdown fence around the document, reject anything that misses
//! a required field or carries an out-of-range score, and normalise the
//! derived feedback total.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::ReasoningError;
use crate::Result;

/// Fact-check outcome for one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Verified,
    Exaggerated,
    Missing,
    Uncertain,
}

/// A candidate claim paired with its verdict and a pressure question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedClaim {
    pub topic: String,
    pub resume_claim: String,
    pub code_observation: String,
    /// Link between the JD requirement, the code and the question
    pub question_basis: String,
    pub verdict: Verdict,
    pub interview_question: String,
    /// Confidence of mismatch, 0-100
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub score: f64,
    pub reason: String,
}

/// The seven technical criteria, each scored 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetrics {
    pub architecture: MetricScore,
    pub code_quality: MetricScore,
    pub problem_solving: MetricScore,
    pub tech_proficiency: MetricScore,
    pub project_completeness: MetricScore,
    pub consistency: MetricScore,
    pub growth_potential: MetricScore,
}

impl EvaluationMetrics {
    /// `(wire name, metric)` in display order.
    pub fn entries(&self) -> [(&'static str, &MetricScore); 7] {
        [
            ("architecture", &self.architecture),
            ("codeQuality", &self.code_quality),
            ("problemSolving", &self.problem_solving),
            ("techProficiency", &self.tech_proficiency),
            ("projectCompleteness", &self.project_completeness),
            ("consistency", &self.consistency),
            ("growthPotential", &self.growth_potential),
        ]
    }

    pub fn average(&self) -> f64 {
        let entries = self.entries();
        entries.iter().map(|(_, m)| m.score).sum::<f64>() / entries.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticalTips {
    pub expected_questions: Vec<String>,
    pub improvements: Vec<String>,
    pub answer_tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub jd_analysis: String,
    pub alignment_analysis: String,
    pub practical_tips: PracticalTips,
}

/// Output of the analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub items: Vec<FlaggedClaim>,
    pub evaluation: EvaluationMetrics,
    pub summary: AnalysisSummary,
}

impl AnalysisReport {
    pub fn validate(&self) -> Result<()> {
        for (name, metric) in self.evaluation.entries() {
            check_range(name, metric.score, 100.0)?;
        }
        for (idx, item) in self.items.iter().enumerate() {
            check_range(&format!("items[{idx}].score"), item.score, 100.0)?;
        }
        Ok(())
    }
}

/// Output of the feedback stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReport {
    /// Derived total, always `logic_score + solution_score`
    pub defense_score: f64,
    pub logic_score: f64,
    pub logic_reasoning: String,
    pub logic_improvement: String,
    pub solution_score: f64,
    pub solution_reasoning: String,
    pub solution_improvement: String,
    pub feedback_summary: String,
    pub positive_feedback: Vec<String>,
    pub constructive_feedback: Vec<String>,
    pub action_items: Vec<String>,
}

impl FeedbackReport {
    /// Check sub-score ranges and recompute the total from them.
    pub fn validated(mut self) -> Result<Self> {
        check_range("logicScore", self.logic_score, 5.0)?;
        check_range("solutionScore", self.solution_score, 5.0)?;

        let total = self.logic_score + self.solution_score;
        if (self.defense_score - total).abs() > f64::EPSILON {
            warn!(
                reported = self.defense_score,
                normalised = total,
                "defense score disagrees with its parts"
            );
            self.defense_score = total;
        }
        Ok(self)
    }
}

fn check_range(field: &str, value: f64, max: f64) -> Result<()> {
    if value.is_finite() && (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(ReasoningError::MalformedResponse(format!(
            "{field} = {value} is outside 0..={max}"
        )))
    }
}

/// Parse and validate an analysis document.
pub fn parse_analysis(text: &str) -> Result<AnalysisReport> {
    let report: AnalysisReport = parse_document(text)?;
    report.validate()?;
    Ok(report)
}

/// Parse, validate and normalise a feedback document.
pub fn parse_feedback(text: &str) -> Result<FeedbackReport> {
    parse_document::<FeedbackReport>(text)?.validated()
}

fn parse_document<T: DeserializeOwned>(text: &str) -> Result<T> {
    match serde_json::from_str::<T>(text.trim()) {
        Ok(value) => Ok(value),
        Err(first) => match strip_markdown_fences(text) {
            Some(inner) => serde_json::from_str::<T>(&inner)
                .map_err(|e| ReasoningError::MalformedResponse(e.to_string())),
            None => Err(ReasoningError::MalformedResponse(first.to_string())),
        },
    }
}

fn strip_markdown_fences(content: &str) -> Option<String> {
    let without_open = content.trim().strip_prefix("```")?;
    let body = match without_open.find('\n') {
        Some(idx) => &without_open[idx + 1..],
        None => without_open,
    };
    let end = body.rfind("```")?;
    Some(body[..end].trim().to_string())
}

fn metric_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "score": {"type": "NUMBER"},
            "reason": {"type": "STRING"}
        },
        "required": ["score", "reason"]
    })
}

fn string_list() -> Value {
    json!({"type": "ARRAY", "items": {"type": "STRING"}})
}

/// Response-shape contract for [`AnalysisReport`].
pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "items": {
                "type": "ARRAY",
                "description": "Claims from the candidate document fact-checked against the code and the job description.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "topic": {"type": "STRING"},
                        "resumeClaim": {"type": "STRING"},
                        "codeObservation": {"type": "STRING"},
                        "questionBasis": {
                            "type": "STRING",
                            "description": "Structured text: '[JD requirement]: ... [Code status]: ... [Interviewer intent]: ...'"
                        },
                        "verdict": {
                            "type": "STRING",
                            "enum": ["VERIFIED", "EXAGGERATED", "MISSING", "UNCERTAIN"]
                        },
                        "interviewQuestion": {
                            "type": "STRING",
                            "description": "Specific pressure question. Must mention the time limit if one is set."
                        },
                        "score": {"type": "NUMBER"}
                    },
                    "required": [
                        "topic", "resumeClaim", "codeObservation", "questionBasis",
                        "verdict", "interviewQuestion", "score"
                    ]
                }
            },
            "evaluation": {
                "type": "OBJECT",
                "description": "Score the candidate on 7 technical criteria (0-100).",
                "properties": {
                    "architecture": metric_schema(),
                    "codeQuality": metric_schema(),
                    "problemSolving": metric_schema(),
                    "techProficiency": metric_schema(),
                    "projectCompleteness": metric_schema(),
                    "consistency": metric_schema(),
                    "growthPotential": metric_schema()
                },
                "required": [
                    "architecture", "codeQuality", "problemSolving", "techProficiency",
                    "projectCompleteness", "consistency", "growthPotential"
                ]
            },
            "summary": {
                "type": "OBJECT",
                "properties": {
                    "jdAnalysis": {"type": "STRING"},
                    "alignmentAnalysis": {"type": "STRING"},
                    "practicalTips": {
                        "type": "OBJECT",
                        "properties": {
                            "expectedQuestions": string_list(),
                            "improvements": string_list(),
                            "answerTips": string_list()
                        },
                        "required": ["expectedQuestions", "improvements", "answerTips"]
                    }
                },
                "required": ["jdAnalysis", "alignmentAnalysis", "practicalTips"]
            }
        },
        "required": ["items", "evaluation", "summary"]
    })
}

/// Response-shape contract for [`FeedbackReport`].
pub fn feedback_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "defenseScore": {"type": "NUMBER"},
            "logicScore": {"type": "NUMBER"},
            "logicReasoning": {"type": "STRING"},
            "logicImprovement": {"type": "STRING"},
            "solutionScore": {"type": "NUMBER"},
            "solutionReasoning": {"type": "STRING"},
            "solutionImprovement": {"type": "STRING"},
            "feedbackSummary": {"type": "STRING"},
            "positiveFeedback": string_list(),
            "constructiveFeedback": string_list(),
            "actionItems": string_list()
        },
        "required": [
            "defenseScore",
            "logicScore", "logicReasoning", "logicImprovement",
            "solutionScore", "solutionReasoning", "solutionImprovement",
            "feedbackSummary", "positiveFeedback", "constructiveFeedback", "actionItems"
        ]
    })
}
