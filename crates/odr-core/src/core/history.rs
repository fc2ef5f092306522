//! Conversation state shared with the engine across rounds.

use serde::{Deserialize, Serialize};

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The human operator driving the session.
    #[serde(rename = "user")]
    Operator,
    /// The hosted research engine.
    #[serde(rename = "assistant")]
    Engine,
}

/// One conversation turn in the engine's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn operator(content: impl Into<String>) -> Self {
        Self {
            role: Role::Operator,
            content: content.into(),
        }
    }

    pub fn engine(content: impl Into<String>) -> Self {
        Self {
            role: Role::Engine,
            content: content.into(),
        }
    }
}

/// Ordered conversation between the operator and the engine.
///
/// Seeded with the operator's question and extended only at round boundaries
/// (a clarification question plus the operator's reply). Roles alternate
/// starting with the operator; the sequence is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    /// Starts a conversation from the operator's initial question.
    pub fn seed(question: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::operator(question)],
        }
    }

    /// Appends a clarification exchange: the engine's question, then the
    /// operator's reply.
    pub fn push_clarification(&mut self, question: impl Into<String>, reply: impl Into<String>) {
        self.turns.push(Turn::engine(question));
        self.turns.push(Turn::operator(reply));
    }

    /// The turns in wire order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The operator's original question (the first turn).
    pub fn question(&self) -> &str {
        &self.turns[0].content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_starts_with_operator() {
        let history = ConversationHistory::seed("why is the sky blue?");

        assert_eq!(history.turns().len(), 1);
        assert_eq!(history.turns()[0].role, Role::Operator);
        assert_eq!(history.question(), "why is the sky blue?");
    }

    #[test]
    fn test_clarification_appends_engine_then_operator() {
        let mut history = ConversationHistory::seed("compare solar panel tech");
        history.push_clarification("Residential or utility scale?", "residential");

        let turns = history.turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].role, Role::Engine);
        assert_eq!(turns[1].content, "Residential or utility scale?");
        assert_eq!(turns[2].role, Role::Operator);
        assert_eq!(turns[2].content, "residential");
    }

    #[test]
    fn test_roles_alternate_starting_with_operator() {
        let mut history = ConversationHistory::seed("q");
        history.push_clarification("c1", "r1");
        history.push_clarification("c2", "r2");

        for (i, turn) in history.turns().iter().enumerate() {
            let expected = if i % 2 == 0 {
                Role::Operator
            } else {
                Role::Engine
            };
            assert_eq!(turn.role, expected, "turn {i}");
        }
    }

    #[test]
    fn test_turns_serialize_to_wire_roles() {
        let mut history = ConversationHistory::seed("q");
        history.push_clarification("which era?", "medieval");

        let wire = serde_json::to_value(history.turns()).unwrap();
        assert_eq!(wire[0]["role"], "user");
        assert_eq!(wire[1]["role"], "assistant");
        assert_eq!(wire[2]["content"], "medieval");
    }
}
