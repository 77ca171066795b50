use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const WELCOME_TURN_ID: &str = "welcome";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(String);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Id of the seeded assistant greeting.
    pub fn welcome() -> Self {
        Self(WELCOME_TURN_ID.to_string())
    }

    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_welcome(&self) -> bool {
        self.0 == WELCOME_TURN_ID
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
