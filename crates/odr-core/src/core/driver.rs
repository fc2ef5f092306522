//! The session loop: rounds, clarification exchanges, the final report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::core::demux::{self, RoundOptions};
use crate::core::history::ConversationHistory;
use crate::core::outcome::{NoResultError, RoundOutcome, evaluate};
use crate::core::sink::{OutputSink, save_report};
use crate::engine::{ResearchEngine, ResearchKnobs};

/// Reply recorded when the operator skips a clarification. Lets the operator
/// defer explicitly without aborting the session.
pub const FALLBACK_REPLY: &str = "Please proceed with comprehensive research on all aspects.";

/// Banner width for the clarification and report blocks.
const BANNER_WIDTH: usize = 60;

/// The human on the other side of a clarification exchange.
///
/// The CLI reads stdin; tests script replies.
#[allow(async_fn_in_trait)]
pub trait Operator {
    /// Asked once per clarification round. An empty reply means "skip".
    async fn clarification_reply(&mut self, question: &str) -> Result<String>;
}

/// What a completed session produced.
#[derive(Debug)]
pub struct SessionResult {
    /// The final report text, verbatim.
    pub report: String,
    /// Where the report artifact was saved, when persistence was on.
    pub report_path: Option<PathBuf>,
}

/// Runs research sessions against one engine.
///
/// Owns the conversation history for the duration of a session; each round
/// gets a fresh tracker and step history, so progress is round-relative.
pub struct SessionDriver<'a, E> {
    engine: &'a E,
    config: &'a Config,
    verbose: bool,
    reports_dir: Option<PathBuf>,
}

impl<'a, E: ResearchEngine> SessionDriver<'a, E> {
    pub fn new(engine: &'a E, config: &'a Config, verbose: bool) -> Self {
        Self {
            engine,
            config,
            verbose,
            reports_dir: None,
        }
    }

    /// Persists final reports under this directory.
    #[must_use]
    pub fn with_reports_dir(mut self, dir: PathBuf) -> Self {
        self.reports_dir = Some(dir);
        self
    }

    /// Runs one session to completion: rounds until the engine produces a
    /// report, looping through clarification exchanges in between.
    pub async fn run(
        &self,
        question: &str,
        operator: &mut impl Operator,
        sink: &mut OutputSink,
    ) -> Result<SessionResult> {
        let mut history = ConversationHistory::seed(question);
        let knobs = ResearchKnobs::from(self.config);
        let options = RoundOptions {
            verbose: self.verbose,
            max_researcher_iterations: self.config.max_researcher_iterations,
            max_react_tool_calls: self.config.max_react_tool_calls,
        };

        sink.write(&format!("🔬 Starting Research: {question}"), true, true);
        info!(question, "session started");

        loop {
            sink.write("🚀 Running research agent...", true, true);
            let round = async {
                let stream = self
                    .engine
                    .open_round(history.turns(), &knobs)
                    .await
                    .context("open research round")?;
                demux::run_round(stream, sink, &options).await
            };
            let log = match round.await {
                Ok(log) => log,
                Err(err) => {
                    sink.flush();
                    return Err(err);
                }
            };

            match evaluate(&log) {
                RoundOutcome::ClarificationRequested { question: asked } => {
                    info!(steps = log.steps.len(), "round ended asking for clarification");
                    self.banner(sink, "💬 CLARIFICATION NEEDED");
                    sink.write(&asked, true, true);
                    sink.write("", true, false);

                    let reply = operator.clarification_reply(&asked).await?;
                    let reply = reply.trim();
                    if reply.is_empty() {
                        sink.write(
                            "⏭️  Skipping clarification and proceeding with research...",
                            true,
                            true,
                        );
                        history.push_clarification(asked, FALLBACK_REPLY);
                    } else {
                        sink.write("📝 Continuing research with your clarification...", true, true);
                        history.push_clarification(asked, reply);
                    }
                }
                RoundOutcome::FinalReport { text } => {
                    info!(steps = log.steps.len(), "round ended with a report");
                    self.banner(sink, "📊 FINAL RESEARCH REPORT");
                    sink.write(&text, true, true);

                    let report_path = match &self.reports_dir {
                        Some(dir) => {
                            let path = save_report(dir, history.question(), &text)?;
                            sink.write(
                                &format!("\n💾 Report saved to {}", path.display()),
                                true,
                                true,
                            );
                            Some(path)
                        }
                        None => None,
                    };
                    sink.flush();
                    return Ok(SessionResult {
                        report: text,
                        report_path,
                    });
                }
                RoundOutcome::NoResult => {
                    sink.write("⚠️  No report generated.", true, true);
                    sink.flush();
                    return Err(NoResultError.into());
                }
            }
        }
    }

    fn banner(&self, sink: &mut OutputSink, title: &str) {
        let rule = "=".repeat(BANNER_WIDTH);
        sink.write("", true, false);
        sink.write(&rule, true, true);
        sink.write(title, true, true);
        sink.write(&rule, true, true);
    }
}
