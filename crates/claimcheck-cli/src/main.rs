//! ClaimCheck CLI
//!
//! The `claimcheck` command fact-checks a candidate's claims against the
//! code in their repositories and runs a follow-up interview.
//!
//! ## Commands
//!
//! - `analyze`: Collect evidence and produce the fact-check report
//! - `evidence`: Print the evidence text that analysis would send
//! - `interview`: Defend one flagged claim, then print feedback
//! - `score`: Show importance scores for file paths

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use claimcheck_core::reasoning_client::{AnalysisInput, AnalysisReport, FeedbackReport};
use claimcheck_core::repo_evidence::{render_evidence, score_path};
use claimcheck_core::{
    Analysis, FinishedInterview, InterviewSession, Pipeline, PipelineConfig, PipelineError,
    SessionEvent, SubmitOutcome, TIME_EXCEEDED_MARKER,
};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "claimcheck")]
#[command(author = "ClaimCheck Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fact-check candidate claims against their code", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect repository evidence and produce the fact-check report
    Analyze {
        /// Candidate input file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Additional repository URL (repeatable)
        #[arg(short, long = "repo")]
        repos: Vec<String>,

        /// GitHub access token for private repositories
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Write the report as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip repositories that cannot be read instead of failing
        #[arg(long)]
        partial: bool,
    },

    /// Print the evidence text for one or more repositories
    Evidence {
        /// Repository URL (repeatable)
        #[arg(short, long = "repo", required = true)]
        repos: Vec<String>,

        /// GitHub access token for private repositories
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Skip repositories that cannot be read instead of failing
        #[arg(long)]
        partial: bool,
    },

    /// Interview over one flagged claim of a saved report
    Interview {
        /// Candidate input file (JSON), for level, time limit and tone
        #[arg(short, long)]
        input: PathBuf,

        /// Report written by `analyze --output`
        #[arg(short, long)]
        report: PathBuf,

        /// Index of the flagged claim to defend
        #[arg(short, long, default_value = "0")]
        claim: usize,

        /// Write the feedback report as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show importance scores for file paths
    Score {
        /// Paths to score
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    claimcheck_core::init_tracing(cli.json, level);

    let config = PipelineConfig::from_env();

    match cli.command {
        Commands::Analyze {
            input,
            repos,
            token,
            output,
            partial,
        } => {
            let config = with_overrides(config, token, partial);
            cmd_analyze(&config, &input, &repos, output.as_deref()).await
        }
        Commands::Evidence {
            repos,
            token,
            partial,
        } => {
            let config = with_overrides(config, token, partial);
            cmd_evidence(&config, &repos).await
        }
        Commands::Interview {
            input,
            report,
            claim,
            output,
        } => cmd_interview(&config, &input, &report, claim, output.as_deref()).await,
        Commands::Score { paths } => {
            for line in score_lines(&paths) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn with_overrides(
    mut config: PipelineConfig,
    token: Option<String>,
    partial: bool,
) -> PipelineConfig {
    if token.is_some() {
        config.github.token = token;
    }
    config.partial_tolerance |= partial;
    config
}

/// Attach the one-line user message to a pipeline failure.
fn user_error(err: PipelineError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

/// Fact-check a candidate
async fn cmd_analyze(
    config: &PipelineConfig,
    input_path: &Path,
    extra_repos: &[String],
    output: Option<&Path>,
) -> Result<()> {
    let input = load_input(input_path, extra_repos)?;
    let pipeline = Pipeline::from_config(config).map_err(user_error)?;

    info!("Analysing {} repositories", input.repositories.len());
    let analysis = pipeline
        .analyze(&input, config.github.credential())
        .await
        .map_err(user_error)?;

    for (repo, err) in &analysis.skipped {
        eprintln!("Skipped {repo}: {}", err.user_message());
    }

    match output {
        Some(path) => {
            write_json_file(path, &analysis.report)?;
            println!("Report written to {}", path.display());
        }
        None => println!("{}", render_analysis_text(&analysis)),
    }
    Ok(())
}

/// Print the evidence text without calling the reasoning service
async fn cmd_evidence(config: &PipelineConfig, repos: &[String]) -> Result<()> {
    let pipeline = Pipeline::from_config(config).map_err(user_error)?;
    let outcome = pipeline
        .collect_evidence(repos, config.github.credential())
        .await
        .map_err(user_error)?;

    for (repo, err) in &outcome.failures {
        eprintln!("Skipped {repo}: {}", err.user_message());
    }
    println!("{}", render_evidence(&outcome.bundles));
    Ok(())
}

/// Run an interactive interview on stdin/stdout
async fn cmd_interview(
    config: &PipelineConfig,
    input_path: &Path,
    report_path: &Path,
    claim: usize,
    output: Option<&Path>,
) -> Result<()> {
    let input: AnalysisInput = read_json_file(input_path)?;
    let report: AnalysisReport = read_json_file(report_path)?;
    let pipeline = Pipeline::from_config(config).map_err(user_error)?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session = pipeline
        .start_interview_observed(&report, claim, &input, Some(tx))
        .map_err(user_error)?;

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let SessionEvent::CountdownTick { remaining } = event {
                println!("  ... {remaining}");
            }
        }
    });

    let topic = &session.context().claim.topic;
    println!("Interview on \"{topic}\". Type /finish to end early or /quit to leave.");
    if let Some(opening) = session.transcript().first() {
        println!("Interviewer: {}", opening.text);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let finished = match run_interview(&mut session, &mut lines).await? {
        Some(finished) => finished,
        None => {
            session.cancel();
            println!("Interview cancelled; no feedback was produced.");
            return Ok(());
        }
    };
    drop(session);
    printer.await.ok();

    println!("Generating feedback...");
    let feedback = pipeline
        .request_feedback(&finished)
        .await
        .map_err(user_error)?;

    match output {
        Some(path) => {
            write_json_file(path, &feedback)?;
            println!("Feedback written to {}", path.display());
        }
        None => println!("{}", render_feedback_text(&feedback)),
    }
    Ok(())
}

/// Drive the session until it finishes. `None` means the candidate quit.
async fn run_interview<R>(
    session: &mut InterviewSession,
    lines: &mut Lines<R>,
) -> Result<Option<FinishedInterview>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let progress = format!(
            "{}/{}",
            session.question_count(),
            session.target_question_count()
        );
        match session.turn_deadline() {
            Some(deadline) => {
                let secs = (deadline - Utc::now()).num_seconds().max(0);
                print!("[{progress} | {secs}s] > ");
            }
            None => print!("[{progress}] > "),
        }
        std::io::stdout().flush().ok();

        let answer = match read_answer(lines, session.turn_deadline()).await? {
            Answer::Line(line) => line,
            Answer::TimedOut => {
                println!("\n(time is up)");
                TIME_EXCEEDED_MARKER.to_string()
            }
            Answer::Closed => return Ok(None),
        };

        match answer.trim() {
            "/quit" => return Ok(None),
            "/finish" => return Ok(Some(session.force_finish()?)),
            _ => {}
        }

        match session.submit(&answer).await {
            Ok(SubmitOutcome::Concluding { reply }) => {
                println!("Interviewer: {}", reply.text);
                println!("The interview ends in a few seconds.");
                return Ok(Some(session.conclude().await?));
            }
            Ok(outcome) => println!("Interviewer: {}", outcome.reply().text),
            Err(err) => eprintln!("{}", err.user_message()),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Answer {
    Line(String),
    TimedOut,
    Closed,
}

/// Read one line, giving up at `deadline` when one is set.
async fn read_answer<R>(lines: &mut Lines<R>, deadline: Option<DateTime<Utc>>) -> Result<Answer>
where
    R: AsyncBufRead + Unpin,
{
    let line = match deadline {
        Some(deadline) => {
            let remaining = (deadline - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            match tokio::time::timeout(remaining, lines.next_line()).await {
                Ok(line) => line,
                Err(_elapsed) => return Ok(Answer::TimedOut),
            }
        }
        None => lines.next_line().await,
    };

    Ok(match line.context("Failed to read from stdin")? {
        Some(line) => Answer::Line(line),
        None => Answer::Closed,
    })
}

fn load_input(path: &Path, extra_repos: &[String]) -> Result<AnalysisInput> {
    let mut input: AnalysisInput = read_json_file(path)?;
    input.repositories.extend(extra_repos.iter().cloned());
    if input.repositories.is_empty() {
        bail!("No repositories given; add them to {:?} or pass --repo", path);
    }
    Ok(input)
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))
}

fn score_lines(paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .map(|p| format!("{:>3}  {}", score_path(p), p))
        .collect()
}

fn render_analysis_text(analysis: &Analysis) -> String {
    let report = &analysis.report;
    let mut out = String::new();

    out.push_str(&format!("Sources: {}\n", analysis.sources));
    out.push_str(&format!(
        "Overall: {:.0}/100\n\n",
        report.evaluation.average()
    ));
    for (name, metric) in report.evaluation.entries() {
        out.push_str(&format!("  {name:<20} {:>3.0}  {}\n", metric.score, metric.reason));
    }

    out.push_str("\nFlagged claims:\n");
    for (idx, item) in report.items.iter().enumerate() {
        out.push_str(&format!(
            "  [{idx}] {:?} {} ({:.0})\n      claim: {}\n      code:  {}\n      ask:   {}\n",
            item.verdict,
            item.topic,
            item.score,
            item.resume_claim,
            item.code_observation,
            item.interview_question
        ));
    }

    out.push_str(&format!("\nJob description: {}\n", report.summary.jd_analysis));
    out.push_str(&format!("Alignment: {}\n", report.summary.alignment_analysis));
    out
}

fn render_feedback_text(feedback: &FeedbackReport) -> String {
    let list = |items: &[String]| {
        items
            .iter()
            .map(|i| format!("  - {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Defense score: {:.1}/10\n\
         Logic: {:.1}/5  {}\n  improve: {}\n\
         Solution: {:.1}/5  {}\n  improve: {}\n\n\
         {}\n\nWhat went well:\n{}\n\nWhat to work on:\n{}\n\nNext steps:\n{}",
        feedback.defense_score,
        feedback.logic_score,
        feedback.logic_reasoning,
        feedback.logic_improvement,
        feedback.solution_score,
        feedback.solution_reasoning,
        feedback.solution_improvement,
        feedback.feedback_summary,
        list(&feedback.positive_feedback),
        list(&feedback.constructive_feedback),
        list(&feedback.action_items),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use claimcheck_core::reasoning_client::{
        self, FlaggedClaim, InterviewContext, InterviewLevel, ReasoningError, ReasoningRequest,
        ReasoningService, Speaker, Tone, Verdict, TERMINATION_PHRASE,
    };
    use claimcheck_core::{EndedBy, InvocationPolicy, ResilientInvoker, SessionState};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::io::AsyncWriteExt;

    fn input_json() -> serde_json::Value {
        json!({
            "level": "junior",
            "jobDescription": {"type": "url", "url": "https://example.com/jobs/1"},
            "candidate": {"type": "coverLetter", "items": [
                {"question": "Why us?", "answer": "I like queues"}
            ]},
            "repositories": ["https://github.com/octo/queue"]
        })
    }

    #[test]
    fn test_load_input_appends_repositories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("input.json");
        std::fs::write(&path, input_json().to_string()).unwrap();

        let input = load_input(&path, &["https://github.com/octo/extra".to_string()]).unwrap();
        assert_eq!(
            input.repositories,
            vec![
                "https://github.com/octo/queue".to_string(),
                "https://github.com/octo/extra".to_string()
            ]
        );
        assert_eq!(input.time_limit_secs, None);
    }

    #[test]
    fn test_load_input_requires_a_repository() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("input.json");
        let mut value = input_json();
        value["repositories"] = json!([]);
        std::fs::write(&path, value.to_string()).unwrap();

        let err = load_input(&path, &[]).unwrap_err();
        assert!(format!("{err:#}").contains("No repositories given"));
    }

    #[test]
    fn test_invalid_json_is_reported_with_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = read_json_file::<AnalysisInput>(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid JSON"));
    }

    #[test]
    fn test_score_lines_are_aligned() {
        let lines = score_lines(&[
            "README.md".to_string(),
            "src/index.ts".to_string(),
            "tests/foo.spec.ts".to_string(),
        ]);
        assert_eq!(
            lines,
            vec!["100  README.md", " 50  src/index.ts", " 20  tests/foo.spec.ts"]
        );
    }

    #[test]
    fn test_overrides_keep_env_token_when_flag_absent() {
        let mut config = PipelineConfig::default();
        config.github.token = Some("from-env".to_string());

        let config = with_overrides(config, None, true);
        assert_eq!(config.github.credential(), Some("from-env"));
        assert!(config.partial_tolerance);
    }

    #[tokio::test]
    async fn test_read_answer_returns_line_and_close() {
        let mut lines = BufReader::new(&b"my answer\n"[..]).lines();
        assert_eq!(
            read_answer(&mut lines, None).await.unwrap(),
            Answer::Line("my answer".to_string())
        );
        assert_eq!(read_answer(&mut lines, None).await.unwrap(), Answer::Closed);
    }

    #[tokio::test]
    async fn test_read_answer_times_out_at_deadline() {
        // Writer stays open and silent.
        let (_writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();
        let deadline = Utc::now() + chrono::Duration::milliseconds(50);

        assert_eq!(
            read_answer(&mut lines, Some(deadline)).await.unwrap(),
            Answer::TimedOut
        );
    }

    /// Replays scripted interviewer replies.
    struct ScriptedService {
        replies: Mutex<VecDeque<Result<String, ReasoningError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedService {
        fn new(replies: Vec<Result<String, ReasoningError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReasoningService for ScriptedService {
        async fn generate(&self, _request: &ReasoningRequest) -> reasoning_client::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ReasoningError::EmptyResponse))
        }
    }

    fn session_with(
        service: Arc<ScriptedService>,
        time_limit_secs: Option<u64>,
    ) -> InterviewSession {
        let context = InterviewContext {
            claim: FlaggedClaim {
                topic: "Caching".into(),
                resume_claim: "Cut latency 80% with Redis".into(),
                code_observation: "No cache client in the repository".into(),
                question_basis: "JD lists Redis".into(),
                verdict: Verdict::Missing,
                interview_question: "Where does the cache sit?".into(),
                score: 40.0,
            },
            level: InterviewLevel::Junior,
            time_limit_secs,
            tone: Tone::Neutral,
        };
        InterviewSession::start(
            context,
            service,
            ResilientInvoker::new(InvocationPolicy::new(1, 0)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_interview_submits_time_exceeded_on_deadline() {
        let service = ScriptedService::new(vec![]);
        let mut session = session_with(service.clone(), Some(10));

        // Silent until well past the first deadline, then end early.
        let (mut writer, reader) = tokio::io::duplex(64);
        let typist = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            writer.write_all(b"/finish\n").await.unwrap();
            writer
        });
        let mut lines = BufReader::new(reader).lines();

        let finished = run_interview(&mut session, &mut lines)
            .await
            .unwrap()
            .unwrap();
        drop(typist.await.unwrap());

        assert_eq!(finished.ended_by, EndedBy::Forced);
        assert_eq!(finished.transcript.len(), 3);
        assert_eq!(finished.transcript[1].speaker, Speaker::Candidate);
        assert_eq!(finished.transcript[1].text, TIME_EXCEEDED_MARKER);
        assert!(finished.transcript[2].text.starts_with("Time is up."));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_interview_finish_returns_forced_transcript() {
        let service = ScriptedService::new(vec![Ok("And on eviction?".into())]);
        let mut session = session_with(service.clone(), None);
        let mut lines = BufReader::new(&b"In front of the DB\n/finish\n"[..]).lines();

        let finished = run_interview(&mut session, &mut lines)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(finished.ended_by, EndedBy::Forced);
        assert_eq!(finished.transcript.len(), 3);
        assert_eq!(finished.transcript[2].text, "And on eviction?");
        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[tokio::test]
    async fn test_run_interview_quit_and_eof_yield_nothing() {
        let service = ScriptedService::new(vec![]);
        let mut session = session_with(service.clone(), None);
        let mut lines = BufReader::new(&b"/quit\n"[..]).lines();
        assert!(run_interview(&mut session, &mut lines).await.unwrap().is_none());
        assert_eq!(session.state(), SessionState::AwaitingAnswer);

        let mut session = session_with(service.clone(), None);
        let mut lines = BufReader::new(&b""[..]).lines();
        assert!(run_interview(&mut session, &mut lines).await.unwrap().is_none());
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_interview_continues_after_failed_turn() {
        let service = ScriptedService::new(vec![
            Err(ReasoningError::Api {
                status: 400,
                message: "bad request".into(),
            }),
            Ok("Which eviction policy?".into()),
        ]);
        let mut session = session_with(service.clone(), None);
        let mut lines =
            BufReader::new(&b"first answer\nsecond answer\n/finish\n"[..]).lines();

        let finished = run_interview(&mut session, &mut lines)
            .await
            .unwrap()
            .unwrap();

        let texts: Vec<&str> = finished.transcript.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Where does the cache sit?",
                "first answer",
                "second answer",
                "Which eviction policy?"
            ]
        );
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_interview_concludes_on_termination_phrase() {
        let service = ScriptedService::new(vec![Ok(format!("Thanks. {TERMINATION_PHRASE}"))]);
        let mut session = session_with(service, Some(60));
        let mut lines = BufReader::new(&b"It sits in front of Postgres\n"[..]).lines();
        let start = tokio::time::Instant::now();

        let finished = run_interview(&mut session, &mut lines)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(finished.ended_by, EndedBy::Concluded);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(finished.transcript.len(), 3);
        assert_eq!(session.turn_deadline(), None);
    }
}
