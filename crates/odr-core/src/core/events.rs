//! Decoded shapes of the engine's round stream.
//!
//! The engine multiplexes two payload kinds over one stream: step updates
//! (`{stepName: stepState}` single-entry mappings) and token fragments
//! (`["messages", fragment | [fragment, ...]]` tagged pairs). Raw items are
//! decoded exactly once, here; downstream code matches on [`StreamItem`]
//! instead of probing JSON shapes.

use serde_json::Value;

/// Channel tag marking token-fragment deliveries.
const TOKEN_CHANNEL: &str = "messages";

/// One decoded item from the engine's round stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// The engine finished the named unit of work and published its state.
    StepUpdate { name: String, state: Value },
    /// An incremental piece of generated text, independent of step boundaries.
    TokenFragment { text: String },
}

/// Decodes one raw stream item into its explicit shape.
///
/// Returns `None` for items matching neither shape; callers log and skip
/// those rather than aborting the round.
pub fn decode_item(raw: &Value) -> Option<StreamItem> {
    match raw {
        Value::Array(pair) => {
            if pair.len() == 2 && pair[0].as_str() == Some(TOKEN_CHANNEL) {
                return Some(StreamItem::TokenFragment {
                    text: fragment_text(&pair[1]),
                });
            }
            None
        }
        Value::Object(map) if map.len() == 1 => {
            let (name, state) = map.iter().next()?;
            Some(StreamItem::StepUpdate {
                name: name.clone(),
                state: state.clone(),
            })
        }
        _ => None,
    }
}

/// Extracts display text from a fragment payload.
///
/// The payload is either one fragment or an ordered sequence of fragments;
/// sequences concatenate with no separator.
fn fragment_text(payload: &Value) -> String {
    match payload {
        Value::Array(fragments) => fragments.iter().map(single_fragment_text).collect(),
        other => single_fragment_text(other),
    }
}

/// Text of one fragment: its `content` string, the joined `text` fields when
/// `content` is a block array, or the fragment itself when it is a bare
/// string.
fn single_fragment_text(fragment: &Value) -> String {
    match fragment {
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get("content") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Array(blocks)) => blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect(),
            _ => map
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        _ => String::new(),
    }
}
