//! End-of-round evaluation: did the engine stop to ask, or did it finish?
//!
//! The engine emits no halt-reason flag; its only observable contract is the
//! step history plus the last message it published. Intent is therefore
//! inferred: a round whose history shows clarification but no research
//! activity stopped to ask, anything else that produced a message finished.

use crate::core::classify::StepCategory;
use crate::core::demux::RoundLog;

/// The result of one streaming round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The engine paused to ask the operator this question.
    ClarificationRequested { question: String },
    /// The engine finished; this is the report.
    FinalReport { text: String },
    /// The stream ended without producing any message.
    NoResult,
}

/// Applies the clarify-vs-done heuristic to a finished round.
///
/// When a round contains both a clarify step and research activity, the
/// engine proceeded past clarification, so the round counts as done — a
/// produced report is never discarded in favor of re-asking.
pub fn evaluate(log: &RoundLog) -> RoundOutcome {
    let Some(message) = log.final_message.as_deref().map(str::trim) else {
        return RoundOutcome::NoResult;
    };
    if message.is_empty() {
        return RoundOutcome::NoResult;
    }

    let clarify_ran = log
        .steps
        .iter()
        .any(|step| step.category == StepCategory::Clarify);
    let research_ran = log
        .steps
        .iter()
        .any(|step| step.category.is_research_activity());

    if clarify_ran && !research_ran {
        RoundOutcome::ClarificationRequested {
            question: message.to_string(),
        }
    } else {
        RoundOutcome::FinalReport {
            text: message.to_string(),
        }
    }
}

/// The stream ended with no final message at all. A distinct failure, never
/// silently folded into clarification or completion.
#[derive(Debug)]
pub struct NoResultError;

impl std::fmt::Display for NoResultError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "The research round produced no result")
    }
}

impl std::error::Error for NoResultError {}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::core::classify::{ExtractedInfo, classify};
    use crate::core::progress::StepRecord;

    fn step(name: &str) -> StepRecord {
        StepRecord {
            name: name.to_string(),
            category: classify(name),
            started_at: Instant::now(),
            duration: Duration::from_secs(1),
            info: ExtractedInfo::default(),
        }
    }

    fn log(names: &[&str], final_message: Option<&str>) -> RoundLog {
        RoundLog {
            steps: names.iter().map(|name| step(name)).collect(),
            final_message: final_message.map(str::to_string),
        }
    }

    #[test]
    fn test_clarify_only_requests_clarification() {
        let outcome = evaluate(&log(&["clarify_with_user"], Some("What time frame?")));

        assert_eq!(
            outcome,
            RoundOutcome::ClarificationRequested {
                question: "What time frame?".to_string()
            }
        );
    }

    #[test]
    fn test_research_step_overrides_clarify() {
        let outcome = evaluate(&log(
            &["clarify_with_user", "write_report"],
            Some("## Findings..."),
        ));

        assert_eq!(
            outcome,
            RoundOutcome::FinalReport {
                text: "## Findings...".to_string()
            }
        );
    }

    #[test]
    fn test_full_round_is_final_report() {
        let outcome = evaluate(&log(
            &[
                "write_research_brief",
                "research_supervisor",
                "supervisor_tools",
                "researcher",
                "compress_research",
                "write_report",
            ],
            Some("## Findings"),
        ));

        assert!(matches!(outcome, RoundOutcome::FinalReport { .. }));
    }

    #[test]
    fn test_no_message_is_no_result() {
        assert_eq!(evaluate(&log(&[], None)), RoundOutcome::NoResult);
        assert_eq!(
            evaluate(&log(&["write_research_brief"], None)),
            RoundOutcome::NoResult
        );
    }

    #[test]
    fn test_blank_message_is_no_result() {
        assert_eq!(
            evaluate(&log(&["clarify_with_user"], Some("   \n"))),
            RoundOutcome::NoResult
        );
    }

    #[test]
    fn test_clarify_with_supervise_only_still_asks() {
        // Supervision planned but nothing researched: the engine stopped to ask.
        let outcome = evaluate(&log(
            &["clarify_with_user", "research_supervisor"],
            Some("Which region?"),
        ));

        assert!(matches!(
            outcome,
            RoundOutcome::ClarificationRequested { .. }
        ));
    }
}
