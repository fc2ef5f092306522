//! One round of stream consumption: raw engine items in, a round log out.
//!
//! Every raw item is decoded once ([`crate::core::events::decode_item`]) and
//! routed: step updates are timed, classified and rendered; token fragments go
//! straight to the console, in arrival order, never buffered. Any active
//! status animation is stopped before an item produces output, so animation
//! frames and line-oriented output never interleave.

use anyhow::Result;
use futures_util::StreamExt;
use tokio::time::{Duration, timeout};
use tracing::debug;

use crate::core::animator::AnimatorHandle;
use crate::core::classify::{
    ExtractedInfo, StepCategory, classify, extract_info, last_message_text, preview,
};
use crate::core::events::{StreamItem, decode_item};
use crate::core::interrupt::{self, InterruptedError};
use crate::core::progress::{ProgressTracker, StepRecord, format_mmss, progress_bar};
use crate::core::sink::OutputSink;
use crate::engine::EngineStream;

/// How long one stream poll may block before we look for interrupts.
const STREAM_POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// Progress-bar width in the verbose renderer.
const BAR_WIDTH: usize = 20;

/// Bound on verbose message previews.
const MESSAGE_PREVIEW_CHARS: usize = 200;

/// Display settings for one round.
#[derive(Debug, Clone)]
pub struct RoundOptions {
    /// Per-step detail lines instead of dot progress.
    pub verbose: bool,
    /// Denominator for the iteration progress bar and the ETA projection.
    pub max_researcher_iterations: u32,
    /// Denominator for the researcher tool-call counter.
    pub max_react_tool_calls: u32,
}

/// What one round produced: the sealed step history and the last message the
/// engine published, if any.
#[derive(Debug)]
pub struct RoundLog {
    pub steps: Vec<StepRecord>,
    pub final_message: Option<String>,
}

/// One step update, ready to render.
struct StepView<'a> {
    index: usize,
    name: &'a str,
    info: &'a ExtractedInfo,
    message: Option<&'a str>,
}

/// Consumes one round's stream to exhaustion.
///
/// Errors from the stream end the round; the animator is stopped before the
/// error propagates, so the console is left on a clean line either way.
pub async fn run_round(
    mut stream: EngineStream,
    sink: &mut OutputSink,
    options: &RoundOptions,
) -> Result<RoundLog> {
    let mut tracker = ProgressTracker::new();
    let mut animator: Option<AnimatorHandle> = None;
    let mut final_message: Option<String> = None;
    let mut dots_open = false;
    let mut step_index = 0usize;

    let exhausted = loop {
        if interrupt::is_interrupted() || interrupt::should_terminate() {
            break Err(anyhow::Error::new(InterruptedError));
        }
        let raw = match timeout(STREAM_POLL_TIMEOUT, stream.next()).await {
            Ok(Some(Ok(raw))) => raw,
            Ok(Some(Err(err))) => {
                break Err(anyhow::Error::new(err).context("research stream failed"));
            }
            Ok(None) => break Ok(()),
            Err(_) => continue,
        };
        let Some(item) = decode_item(&raw) else {
            debug!(item = %raw, "skipping unrecognized stream item");
            continue;
        };

        // Discrete output and animation must not interleave: the animation
        // line is erased before this item writes anything.
        if let Some(active) = animator.take() {
            active.stop().await;
        }

        match item {
            StreamItem::TokenFragment { text } => sink.fragment(&text),
            StreamItem::StepUpdate { name, state } => {
                tracker.end_step();
                let category = classify(&name);
                let info = extract_info(&state);
                let step_message = last_message_text(&state);
                if let Some(text) = &step_message {
                    final_message = Some(text.clone());
                }
                step_index += 1;
                render_step(
                    sink,
                    options,
                    &tracker,
                    &StepView {
                        index: step_index,
                        name: &name,
                        info: &info,
                        message: step_message.as_deref(),
                    },
                    &mut dots_open,
                );

                let round_started = tracker.started_at();
                tracker.start_step(name, category, info.clone());
                if category == StepCategory::Dispatch {
                    if dots_open {
                        sink.fragment("\n");
                        dots_open = false;
                    }
                    animator = Some(AnimatorHandle::start(
                        sink.console(),
                        dispatch_label(&info),
                        round_started.into(),
                    ));
                }
            }
        }
    };

    if let Some(active) = animator.take() {
        active.stop().await;
    }
    if dots_open {
        sink.fragment("\n");
    }
    exhausted?;

    Ok(RoundLog {
        steps: tracker.finish(),
        final_message,
    })
}

/// Status-line label for the span after research units were dispatched.
fn dispatch_label(info: &ExtractedInfo) -> String {
    match info.topics.len() {
        0 => "Researching".to_string(),
        1 => "Researching 1 unit".to_string(),
        n => format!("Researching {n} units"),
    }
}

/// Renders one step update. Dots mode prints one dot per step to the console
/// and keeps the full line in the durable log; verbose mode prints the full
/// line plus detail everywhere.
fn render_step(
    sink: &mut OutputSink,
    options: &RoundOptions,
    tracker: &ProgressTracker,
    view: &StepView<'_>,
    dots_open: &mut bool,
) {
    let line = format!("  [{}] {}", view.index, view.name);
    if !options.verbose {
        if !*dots_open {
            sink.fragment("Progress: ");
            *dots_open = true;
        }
        sink.fragment(".");
        sink.write(&line, false, true);
        return;
    }

    sink.write(&line, true, true);
    if let Some(iteration) = view.info.iteration {
        let max = options.max_researcher_iterations;
        sink.write(
            &format!(
                "      Iteration: {} {iteration}/{max}",
                progress_bar(iteration, max, BAR_WIDTH)
            ),
            true,
            true,
        );
        let eta = match tracker.estimate_remaining(iteration, max) {
            Some(remaining) => format!("~{}", format_mmss(remaining)),
            None => "unknown".to_string(),
        };
        sink.write(
            &format!("      Elapsed: {} | ETA: {eta}", format_mmss(tracker.elapsed())),
            true,
            true,
        );
    }
    if let Some(tool_calls) = view.info.tool_calls {
        sink.write(
            &format!("      Tool calls: {tool_calls}/{}", options.max_react_tool_calls),
            true,
            true,
        );
    }
    if let Some(notes) = view.info.notes_count {
        sink.write(&format!("      Notes collected: {notes}"), true, true);
    }
    for topic in &view.info.topics {
        sink.write(&format!("      Topic: {topic}"), true, true);
    }
    if let Some(message) = view.message {
        sink.write(
            &format!("      Message: {}", preview(message, MESSAGE_PREVIEW_CHARS)),
            true,
            true,
        );
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;
    use serde_json::{Value, json};

    use super::*;
    use crate::core::sink::console_over;
    use crate::core::testing::SharedBuf;
    use crate::engine::{EngineError, EngineResult};

    fn options(verbose: bool) -> RoundOptions {
        RoundOptions {
            verbose,
            max_researcher_iterations: 6,
            max_react_tool_calls: 10,
        }
    }

    fn ready_stream(items: Vec<EngineResult<Value>>) -> EngineStream {
        stream::iter(items).boxed()
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_history_counts_step_updates_only() {
        let buf = SharedBuf::default();
        let mut sink = OutputSink::new(console_over(buf.clone()));
        let stream = ready_stream(vec![
            Ok(json!({"clarify_with_user": {}})),
            Ok(json!(["messages", "partial "])),
            Ok(json!(["messages", "report"])),
            Ok(json!({"write_research_brief": {}})),
            Ok(json!({"write_report": {"messages": [{"content": "## Findings"}]}})),
        ]);

        let log = run_round(stream, &mut sink, &options(false)).await.unwrap();

        assert_eq!(log.steps.len(), 3);
        assert_eq!(log.steps[0].name, "clarify_with_user");
        assert_eq!(log.steps[2].category, StepCategory::Report);
        assert_eq!(log.final_message.as_deref(), Some("## Findings"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragments_stream_raw_in_arrival_order() {
        let buf = SharedBuf::default();
        let mut sink = OutputSink::new(console_over(buf.clone()));
        let stream = ready_stream(vec![
            Ok(json!(["messages", "one "])),
            Ok(json!(["messages", {"content": "two "}])),
            Ok(json!(["messages", [{"content": "three"}, "!"]])),
        ]);

        run_round(stream, &mut sink, &options(true)).await.unwrap();

        assert_eq!(buf.contents(), "one two three!");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_items_are_skipped_not_fatal() {
        let buf = SharedBuf::default();
        let mut sink = OutputSink::new(console_over(buf.clone()));
        let stream = ready_stream(vec![
            Ok(json!(42)),
            Ok(json!({"a": {}, "b": {}})),
            Ok(json!({"write_report": {"messages": [{"content": "done"}]}})),
        ]);

        let log = run_round(stream, &mut sink, &options(false)).await.unwrap();

        assert_eq!(log.steps.len(), 1);
        assert_eq!(log.final_message.as_deref(), Some("done"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dots_mode_prints_one_dot_per_step() {
        let buf = SharedBuf::default();
        let mut sink = OutputSink::new(console_over(buf.clone()));
        let stream = ready_stream(vec![
            Ok(json!({"clarify_with_user": {}})),
            Ok(json!({"write_research_brief": {}})),
            Ok(json!({"research_supervisor": {}})),
        ]);

        run_round(stream, &mut sink, &options(false)).await.unwrap();

        assert_eq!(buf.contents(), "Progress: ...\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_verbose_mode_renders_step_detail() {
        let buf = SharedBuf::default();
        let mut sink = OutputSink::new(console_over(buf.clone()));
        let stream = ready_stream(vec![Ok(json!({"research_supervisor": {
            "research_iterations": 2,
            "notes": ["n1", "n2", "n3"],
        }}))]);

        run_round(stream, &mut sink, &options(true)).await.unwrap();

        let output = buf.contents();
        assert!(output.contains("  [1] research_supervisor"), "{output}");
        assert!(output.contains("Iteration: ["), "{output}");
        assert!(output.contains(" 2/6"), "{output}");
        assert!(output.contains("ETA: unknown"), "{output}");
        assert!(output.contains("Notes collected: 3"), "{output}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_animator_erased_before_next_step_output() {
        let buf = SharedBuf::default();
        let mut sink = OutputSink::new(console_over(buf.clone()));
        // The dispatch step starts the animation; the next step arrives only
        // after several animation ticks.
        let stream = stream::unfold(0u8, |i| async move {
            match i {
                0 => Some((Ok(json!({"supervisor_tools": {}})), 1)),
                1 => {
                    tokio::time::sleep(Duration::from_millis(600)).await;
                    Some((Ok(json!({"compress_research": {}})), 2))
                }
                _ => None,
            }
        })
        .boxed();

        run_round(stream, &mut sink, &options(true)).await.unwrap();

        let output = buf.contents();
        assert!(output.contains('\r'), "animator never drew: {output:?}");
        // Everything after the final carriage return is clean line output.
        let tail = output.rsplit('\r').next().unwrap();
        assert!(
            tail.starts_with("  [2] compress_research"),
            "step line not on a clean column: {tail:?}"
        );
        // The erase blank precedes it.
        let blank = output.rsplit('\r').nth(1).unwrap();
        assert!(blank.chars().all(|c| c == ' '), "not blanked: {blank:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_error_stops_animator_then_surfaces() {
        let buf = SharedBuf::default();
        let mut sink = OutputSink::new(console_over(buf.clone()));
        let stream = stream::unfold(0u8, |i| async move {
            match i {
                0 => Some((Ok(json!({"supervisor_tools": {}})), 1)),
                1 => {
                    tokio::time::sleep(Duration::from_millis(350)).await;
                    Some((Err(EngineError::stream("connection reset")), 2))
                }
                _ => None,
            }
        })
        .boxed();

        let err = run_round(stream, &mut sink, &options(true))
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("connection reset"));
        let output = buf.contents();
        if output.contains('\r') {
            // The animation line was erased before the error propagated.
            assert_eq!(output.rsplit('\r').next().unwrap(), "");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_stream_yields_empty_round() {
        let buf = SharedBuf::default();
        let mut sink = OutputSink::new(console_over(buf.clone()));

        let log = run_round(ready_stream(vec![]), &mut sink, &options(false))
            .await
            .unwrap();

        assert!(log.steps.is_empty());
        assert_eq!(log.final_message, None);
    }
}
