//! Request assembly for the three reasoning calls.
//!
//! Tone contributes exactly one line to each prompt and never touches the
//! scoring rules.

use serde::{Deserialize, Serialize};

use crate::client::{Content, Part, ReasoningRequest};
use crate::report::{analysis_schema, feedback_schema, FlaggedClaim};
use crate::types::{AnalysisInput, CandidateDocument, InterviewLevel, InterviewTurn, JobDescription, Tone};

/// Canonical phrase the interviewer uses to end an interview.
pub const TERMINATION_PHRASE: &str = "This concludes the interview.";

pub const ANALYSIS_TEMPERATURE: f32 = 0.3;
pub const FEEDBACK_TEMPERATURE: f32 = 0.5;

/// Fixed settings of one interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewContext {
    pub claim: FlaggedClaim,
    pub level: InterviewLevel,
    pub time_limit_secs: Option<u64>,
    pub tone: Tone,
}

/// Instruction prefixed to every generated question when a limit is set.
pub fn time_limit_instruction(time_limit_secs: Option<u64>) -> String {
    match time_limit_secs {
        Some(secs) => format!(
            "TIME LIMIT MODE: every generated question MUST begin with: \"This question must be answered within {secs} seconds.\""
        ),
        None => String::new(),
    }
}

fn job_description_context(jd: &JobDescription, level: InterviewLevel) -> String {
    match jd {
        JobDescription::Text { text } => text.clone(),
        JobDescription::Url { url } => format!(
            "[JD URL]: {url}\n(If you cannot open this URL, assume standard requirements for a '{level}' role. Do NOT summarise the candidate document as the JD.)"
        ),
        JobDescription::File { .. } => "Provided as an attached file.".to_string(),
    }
}

/// Analysis call: claims plus code evidence against the JD.
pub fn analysis_request(input: &AnalysisInput, evidence: &str) -> ReasoningRequest {
    let level = input.level;
    let jd = job_description_context(&input.job_description, level);
    let talent = if input.talent_ideal.trim().is_empty() {
        "Not specified"
    } else {
        input.talent_ideal.as_str()
    };

    let prompt = format!(
        r#"You are a strict Technical Lead Interviewer (FactCheck AI).
Analyse the candidate's documents against the codebase and the job description (JD).

Configuration:
1. Target level: {level}
2. Level instruction: {level_instruction}
3. {tone}
4. {time_limit}

Context:
- Company ideal: {talent}
- Candidate document: {doc_kind}

TASK 1: Score the 7 criteria (0-100) from technical evidence in the code.
Score the quality and depth of the code, not the number of suspicious claims.
1. architecture: system design, directory structure, separation of concerns.
2. codeQuality: clean code, naming, modularity, dead code.
3. problemSolving: logic complexity, algorithms, edge cases.
4. techProficiency: depth of library and framework usage.
5. projectCompleteness: runnable state, README, tests, CI/CD.
6. consistency: does the code actually contain what the document claims?
7. growthPotential: modern practices, ambitious attempts, evidence of learning.

TASK 2: Fact-check items.
- Identify specific claims in the candidate document.
- Assign a verdict: VERIFIED, EXAGGERATED, MISSING or UNCERTAIN.

TASK 3: Summary and questions.
- JD analysis: narrative summary of the company's core requirements. If the JD is missing or unreadable, say that standard {level} requirements were applied instead.
- Alignment: fact check, exaggeration, code evidence, stack consistency, depth versus level, job fit.
- Tips: 3 probable questions, 3 weaknesses, 3 answer tips.
- Questions: pressure questions based on missing evidence or exaggeration.

For machine-learning repositories also check model architecture, the training loop, data processing, visible hyperparameters and whether imported libraries are justified.

[Job Description]
{jd}

[Candidate Document]
{candidate}

[Codebase Evidence]
(Comments and documentation in the code reveal intent.)
{evidence}
"#,
        level_instruction = level.instructions(),
        tone = input.tone.instruction(),
        time_limit = time_limit_instruction(input.time_limit_secs),
        doc_kind = input.candidate.kind(),
        candidate = input.candidate.render(),
    );

    let mut parts = vec![Part::text(prompt)];
    if let JobDescription::File { attachment } = &input.job_description {
        parts.push(Part::attachment(attachment));
        parts.push(Part::text("\n(JD file provided above)"));
    }
    if let CandidateDocument::Resume {
        attachment: Some(attachment),
        ..
    } = &input.candidate
    {
        parts.push(Part::attachment(attachment));
        parts.push(Part::text("\n(Candidate resume file provided above)"));
    }

    ReasoningRequest::new(vec![Content::user(parts)])
        .with_schema(analysis_schema())
        .with_temperature(ANALYSIS_TEMPERATURE)
}

/// Next interviewer turn given the transcript so far.
pub fn interviewer_request(ctx: &InterviewContext, transcript: &[InterviewTurn]) -> ReasoningRequest {
    let claim = &ctx.claim;
    let level_rule = if ctx.level.is_senior() {
        "Be critical. Ask for architectural reasons and trade-offs."
    } else {
        "Be encouraging but verify the basics."
    };
    let time_limit = match ctx.time_limit_secs {
        Some(secs) => format!("{secs} seconds"),
        None => "None".to_string(),
    };
    let verbose_rule = match ctx.time_limit_secs {
        Some(secs) => format!(
            "A {secs}s time limit is active. If the answer is long-winded, remind the candidate to answer with the key point only."
        ),
        None => "No time limit is active.".to_string(),
    };

    let system = format!(
        r#"You are a sharp, skeptical technical interviewer.
The candidate is defending this claim: "{resume_claim}".

Context:
- Topic: {topic}
- Code reality: {observation}
- Verdict: {verdict:?}
- Candidate level: {level}
- Time limit: {time_limit}
- {tone}

Rules:
1. Level adjustment: {level_rule}
2. {verbose_rule}
3. Flow: if the explanation matches the code, say it has been sufficiently explained and end with exactly "{TERMINATION_PHRASE}". If the answer is vague, press for details.
"#,
        resume_claim = claim.resume_claim,
        topic = claim.topic,
        observation = claim.code_observation,
        verdict = claim.verdict,
        level = ctx.level,
        tone = ctx.tone.instruction(),
    );

    let mut contents = Vec::with_capacity(transcript.len() + 1);
    contents.push(Content::user(vec![Part::text(system)]));
    contents.extend(transcript.iter().map(Content::from_turn));
    ReasoningRequest::new(contents)
}

/// Render a transcript as `role: text` lines.
pub fn render_transcript(transcript: &[InterviewTurn]) -> String {
    transcript
        .iter()
        .map(|t| {
            let role = match t.speaker {
                crate::types::Speaker::Interviewer => "interviewer",
                crate::types::Speaker::Candidate => "candidate",
            };
            format!("{role}: {}", t.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Feedback call over a finished transcript.
pub fn feedback_request(ctx: &InterviewContext, transcript: &[InterviewTurn]) -> ReasoningRequest {
    let prompt = format!(
        r#"Analyse the interview transcript and produce a detailed feedback report.

Target level: {level}
{tone}

Rules:
1. logicScore (0-5): is the reasoning coherent and consistent with the code?
2. solutionScore (0-5): did the candidate propose workable solutions?
3. defenseScore is logicScore + solutionScore (0-10).
4. Judge the transcript as a whole against the expectations for a {level} candidate. Did they prove their contribution?
5. Give exactly 3 positive points, 3 constructive points and 3 action items.

Context:
- Topic: {topic}
- Conversation:
{conversation}
"#,
        level = ctx.level,
        tone = ctx.tone.instruction(),
        topic = ctx.claim.topic,
        conversation = render_transcript(transcript),
    );

    ReasoningRequest::new(vec![Content::user(vec![Part::text(prompt)])])
        .with_schema(feedback_schema())
        .with_temperature(FEEDBACK_TEMPERATURE)
}
