//! Step classification and salient-field extraction.
//!
//! Steps are classified by name: exact lifecycle names first, then a
//! substring fallback for researcher subgraphs, then [`StepCategory::Unknown`]
//! for everything else. Unknown steps still render generically; nothing the
//! engine reports is dropped. Field extraction from the opaque step state is
//! tolerant throughout: absent keys default, they never fail.

use serde_json::Value;

/// Tool name the supervisor uses to delegate a research unit.
const CONDUCT_RESEARCH_TOOL: &str = "ConductResearch";

/// Bound on dispatched-topic previews.
const TOPIC_PREVIEW_CHARS: usize = 60;

/// Display category of an engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCategory {
    /// The engine paused to ask the operator a question.
    Clarify,
    /// The question was distilled into a research brief.
    Brief,
    /// The supervisor planned the next research iteration.
    Supervise,
    /// The supervisor dispatched concurrent research units.
    Dispatch,
    /// A researcher subgraph worked a unit.
    Research,
    /// Collected findings were compressed.
    Compress,
    /// The final report was written.
    Report,
    /// Not a known lifecycle step; rendered generically.
    Unknown,
}

impl StepCategory {
    /// Whether this step means research actually proceeded this round.
    pub fn is_research_activity(self) -> bool {
        matches!(
            self,
            StepCategory::Research | StepCategory::Compress | StepCategory::Report
        )
    }
}

/// Maps a step name to its display category.
pub fn classify(name: &str) -> StepCategory {
    match name {
        "clarify_with_user" => StepCategory::Clarify,
        "write_research_brief" => StepCategory::Brief,
        "research_supervisor" | "supervisor" => StepCategory::Supervise,
        "supervisor_tools" => StepCategory::Dispatch,
        "compress_research" => StepCategory::Compress,
        "write_report" => StepCategory::Report,
        _ if name.contains("researcher") => StepCategory::Research,
        _ => StepCategory::Unknown,
    }
}

/// Salient fields pulled from a step's state, all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedInfo {
    /// Supervisory iteration count (`research_iterations`).
    pub iteration: Option<u32>,
    /// Tool calls made by the current researcher (`tool_call_iterations`).
    pub tool_calls: Option<u32>,
    /// Number of collected research notes.
    pub notes_count: Option<usize>,
    /// Dispatched research topics, most recent last, previews bounded.
    pub topics: Vec<String>,
}

/// Probes a step state for display fields. Absent keys default.
pub fn extract_info(state: &Value) -> ExtractedInfo {
    let mut topics = Vec::new();

    if let Some(topic) = state.get("research_topic").and_then(Value::as_str) {
        topics.push(preview(topic, TOPIC_PREVIEW_CHARS));
    }

    if let Some(messages) = state.get("supervisor_messages").and_then(Value::as_array) {
        for message in messages {
            let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) else {
                continue;
            };
            for call in tool_calls {
                if call.get("name").and_then(Value::as_str) != Some(CONDUCT_RESEARCH_TOOL) {
                    continue;
                }
                if let Some(topic) = call
                    .get("args")
                    .and_then(|args| args.get("research_topic"))
                    .and_then(Value::as_str)
                {
                    topics.push(preview(topic, TOPIC_PREVIEW_CHARS));
                }
            }
        }
    }

    ExtractedInfo {
        iteration: state
            .get("research_iterations")
            .and_then(Value::as_u64)
            .map(|n| n as u32),
        tool_calls: state
            .get("tool_call_iterations")
            .and_then(Value::as_u64)
            .map(|n| n as u32),
        notes_count: state.get("notes").and_then(Value::as_array).map(Vec::len),
        topics,
    }
}

/// Content of the last message in a step state, if any.
///
/// This is the engine's only terminal-output channel: the final report or a
/// clarification question both arrive as the last `messages` entry.
pub fn last_message_text(state: &Value) -> Option<String> {
    let messages = state.get("messages")?.as_array()?;
    content_text(messages.last()?.get("content")?)
}

/// Text of a message `content` field: the string itself, or the joined
/// `text` fields when the content is a block array.
fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(blocks) => Some(
            blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect(),
        ),
        _ => None,
    }
}

/// Bounded single-line preview of a potentially long text.
pub fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let truncated: String = text.chars().take(limit).collect();
    format!("{truncated}...")
}
