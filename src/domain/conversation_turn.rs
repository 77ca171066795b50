use serde::{Deserialize, Serialize};

use super::{ContentPart, TurnId, TurnRole};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub role: TurnRole,
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, parts: Vec<ContentPart>) -> Self {
        Self {
            id: TurnId::new(),
            role,
            parts,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, vec![ContentPart::text(text)])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, vec![ContentPart::text(text)])
    }

    pub fn welcome(text: impl Into<String>) -> Self {
        Self {
            id: TurnId::welcome(),
            role: TurnRole::Assistant,
            parts: vec![ContentPart::text(text)],
        }
    }

    /// Concatenation of all text parts, in order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}
