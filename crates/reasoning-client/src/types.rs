//! Candidate input model and interview transcript types.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Seniority the candidate is interviewed at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewLevel {
    Intern,
    #[default]
    Junior,
    /// About three years of experience
    Mid3,
    /// Five years or more
    Mid5,
}

impl InterviewLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewLevel::Intern => "intern",
            InterviewLevel::Junior => "junior",
            InterviewLevel::Mid3 => "mid3",
            InterviewLevel::Mid5 => "mid5",
        }
    }

    /// Level-specific focus for question generation.
    pub fn instructions(&self) -> &'static str {
        match self {
            InterviewLevel::Intern => {
                "Level: Intern. Focus on terminology, basic usage and willingness to learn. Keep questions fundamental."
            }
            InterviewLevel::Junior => {
                "Level: Junior (new grad). Verify basic CS knowledge, project role and actual contribution to the code. Check they understand what they copied."
            }
            InterviewLevel::Mid3 => {
                "Level: Mid-level (3 years). Focus on architecture, troubleshooting and operational experience. Ask why this stack and how errors were handled."
            }
            InterviewLevel::Mid5 => {
                "Level: Senior/Lead (5+ years). Dig into design patterns, bottleneck resolution, non-reproducible bugs and trade-offs. Question design intent rigorously."
            }
        }
    }

    /// Senior levels get a more critical interviewer.
    pub fn is_senior(&self) -> bool {
        matches!(self, InterviewLevel::Mid3 | InterviewLevel::Mid5)
    }
}

impl fmt::Display for InterviewLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intern" => Ok(InterviewLevel::Intern),
            "junior" => Ok(InterviewLevel::Junior),
            "mid3" => Ok(InterviewLevel::Mid3),
            "mid5" => Ok(InterviewLevel::Mid5),
            other => Err(format!("unknown interview level: {other}")),
        }
    }
}

/// Presentation style of generated text. Never affects scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Neutral,
    Direct,
    Analytical,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Neutral => "neutral",
            Tone::Direct => "direct",
            Tone::Analytical => "analytical",
        }
    }

    /// Single style line included in every prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Tone::Neutral => "Tone: Professional and even. Be clear and fair.",
            Tone::Direct => {
                "Tone: Bright, direct, crisp. Be sharp but encouraging, like a supportive senior mentor."
            }
            Tone::Analytical => {
                "Tone: Calm, deep, analytical. Be serious and critical, like a strict code reviewer."
            }
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neutral" => Ok(Tone::Neutral),
            "direct" => Ok(Tone::Direct),
            "analytical" => Ok(Tone::Analytical),
            other => Err(format!("unknown tone: {other}")),
        }
    }
}

/// Binary document sent inline with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub mime_type: String,
    pub data_base64: String,
}

impl Attachment {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Attachment {
            mime_type: mime_type.into(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Accepts `data:<mime>;base64,<payload>` URLs or a bare payload.
    pub fn from_data_url(data: &str, fallback_mime: &str) -> Self {
        match data.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
            Some((header, payload)) => {
                let mime = header.split(';').next().filter(|m| !m.is_empty());
                Attachment {
                    mime_type: mime.unwrap_or(fallback_mime).to_string(),
                    data_base64: payload.to_string(),
                }
            }
            None => Attachment {
                mime_type: fallback_mime.to_string(),
                data_base64: data.to_string(),
            },
        }
    }
}

/// Requirements of the role being hired for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobDescription {
    Text { text: String },
    /// The service may not be able to open the URL.
    Url { url: String },
    File { attachment: Attachment },
}

/// One question/answer pair of a cover letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverLetterItem {
    pub question: String,
    pub answer: String,
}

/// The document the candidate's claims are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CandidateDocument {
    Resume {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        attachment: Option<Attachment>,
    },
    CoverLetter { items: Vec<CoverLetterItem> },
}

impl CandidateDocument {
    pub fn kind(&self) -> &'static str {
        match self {
            CandidateDocument::Resume { .. } => "resume",
            CandidateDocument::CoverLetter { .. } => "coverLetter",
        }
    }

    /// Textual part of the document, with a section header.
    pub fn render(&self) -> String {
        match self {
            CandidateDocument::Resume { text, .. } => format!(
                "--- RESUME/PORTFOLIO ---\n{}",
                text.as_deref().unwrap_or_default()
            ),
            CandidateDocument::CoverLetter { items } => {
                let body = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        format!("Q{n}: {}\nA{n}: {}", item.question, item.answer, n = i + 1)
                    })
                    .collect::<Vec<_>>()
                    .join("\n\n");
                format!("--- COVER LETTER (Q&A) ---\n{body}")
            }
        }
    }
}

/// Everything the analysis stage needs apart from the code evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisInput {
    #[serde(default)]
    pub level: InterviewLevel,
    /// Per-turn answer limit for the interview, in seconds
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
    #[serde(default)]
    pub tone: Tone,
    /// What the company looks for in a hire
    #[serde(default)]
    pub talent_ideal: String,
    pub job_description: JobDescription,
    pub candidate: CandidateDocument,
    /// Repository URLs as supplied by the candidate
    #[serde(default)]
    pub repositories: Vec<String>,
}

/// Who produced a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Interviewer,
    Candidate,
}

/// One immutable entry of an interview transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl InterviewTurn {
    pub fn interviewer(text: impl Into<String>) -> Self {
        InterviewTurn {
            speaker: Speaker::Interviewer,
            text: text.into(),
        }
    }

    pub fn candidate(text: impl Into<String>) -> Self {
        InterviewTurn {
            speaker: Speaker::Candidate,
            text: text.into(),
        }
    }
}
